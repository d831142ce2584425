use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::base::post_query::PostQuery;
use crate::models::{
    Category, CategoryId, Comment, CommentId, CommentView, Location, LocationId, NewPost, Post,
    PostId, PostView, Session, User, UserId,
};

/// Storage for user accounts
pub trait UserRepository: Send + Sync {
    /// Retrieves a user by its ID
    fn get_user_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Retrieves a user by its exact username
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Inserts a new user and returns the assigned ID
    fn save_user(&self, user: &User) -> Result<UserId>;

    /// Updates the profile fields and password of an existing user
    fn update_user(&self, user: &User) -> Result<()>;
}

/// Storage for categories
pub trait CategoryRepository: Send + Sync {
    fn get_category_by_id(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Retrieves a category by slug, whether published or not
    fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    fn get_all_categories(&self) -> Result<Vec<Category>>;

    fn save_category(&self, category: &Category) -> Result<CategoryId>;
}

/// Storage for locations
pub trait LocationRepository: Send + Sync {
    fn get_location_by_id(&self, id: LocationId) -> Result<Option<Location>>;

    fn get_all_locations(&self) -> Result<Vec<Location>>;

    fn save_location(&self, location: &Location) -> Result<LocationId>;
}

/// Storage for posts
pub trait PostRepository: Send + Sync {
    /// Retrieves the raw post row
    fn get_post(&self, id: PostId) -> Result<Option<Post>>;

    /// Retrieves a post joined with author, category, location and comment count
    fn get_post_view(&self, id: PostId) -> Result<Option<PostView>>;

    /// Counts the posts matching `query`
    fn count_posts(&self, query: &PostQuery) -> Result<usize>;

    /// Lists the posts matching `query`, newest first
    fn list_posts(&self, query: &PostQuery, limit: usize, offset: usize) -> Result<Vec<PostView>>;

    /// Inserts a post written by `author_id` and returns the assigned ID
    fn save_post(&self, author_id: UserId, post: &NewPost) -> Result<PostId>;

    /// Updates the editable fields of an existing post
    fn update_post(&self, post: &Post) -> Result<()>;

    /// Deletes a post together with its comments
    fn delete_post(&self, id: PostId) -> Result<()>;
}

/// Storage for comments
pub trait CommentRepository: Send + Sync {
    fn get_comment(&self, id: CommentId) -> Result<Option<Comment>>;

    /// Lists the comments of a post, oldest first
    fn get_comments_for_post(&self, post_id: PostId) -> Result<Vec<CommentView>>;

    fn save_comment(&self, comment: &Comment) -> Result<CommentId>;

    fn update_comment(&self, comment: &Comment) -> Result<()>;

    fn delete_comment(&self, id: CommentId) -> Result<()>;
}

/// Storage for login sessions
pub trait SessionRepository: Send + Sync {
    fn save_session(&self, session: &Session) -> Result<()>;

    fn get_session(&self, token: &str) -> Result<Option<Session>>;

    fn delete_session(&self, token: &str) -> Result<()>;

    /// Removes sessions that expired before `now`, returning how many were removed
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize>;
}
