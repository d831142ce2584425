use chrono::Utc;
use log::debug;
use serde::Serialize;
use std::sync::Arc;

use crate::base::{CategoryRepository, CommentRepository, PostQuery, PostRepository, UserRepository};
use crate::error::{BlogError, BlogResult};
use crate::models::{Category, CommentView, Page, Paginator, PostId, PostView, PublicProfile, UserId};

/// Posts of one category
#[derive(Debug, Serialize)]
pub struct CategoryPage {
    pub category: Category,
    pub page_obj: Page<PostView>,
}

/// Posts of one author
#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub profile: PublicProfile,
    pub page_obj: Page<PostView>,
}

/// A single post with its comments
#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

/// Read-only listings and detail pages
#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
    paginator: Paginator,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            categories,
            comments,
            users,
            paginator,
        }
    }

    fn paginate(&self, query: &PostQuery, page: Option<&str>) -> BlogResult<Page<PostView>> {
        let count = self.posts.count_posts(query)?;
        let number = self.paginator.resolve(page, count);
        let items = self.posts.list_posts(
            query,
            self.paginator.per_page(),
            self.paginator.offset(number),
        )?;
        debug!("Page {} of {} posts", number, count);
        Ok(Page::new(items, number, count, &self.paginator))
    }

    /// Publicly visible posts, newest first
    pub fn index(&self, page: Option<&str>) -> BlogResult<Page<PostView>> {
        self.paginate(&PostQuery::visible(Utc::now()), page)
    }

    /// Publicly visible posts of a published category
    pub fn category_posts(&self, slug: &str, page: Option<&str>) -> BlogResult<CategoryPage> {
        let category = self
            .categories
            .get_category_by_slug(slug)?
            .filter(|category| category.is_published)
            .ok_or(BlogError::NotFound)?;

        let query = PostQuery::visible(Utc::now()).in_category(category.id);
        let page_obj = self.paginate(&query, page)?;
        Ok(CategoryPage { category, page_obj })
    }

    /// An author's posts; drafts are only listed for the author themselves
    pub fn profile(
        &self,
        username: &str,
        viewer: Option<UserId>,
        page: Option<&str>,
    ) -> BlogResult<ProfilePage> {
        let user = self
            .users
            .get_user_by_username(username)?
            .ok_or(BlogError::NotFound)?;

        let is_owner = viewer == Some(user.id);
        let query = if is_owner {
            PostQuery::all().by_author(user.id)
        } else {
            PostQuery::visible(Utc::now()).by_author(user.id)
        };
        let page_obj = self.paginate(&query, page)?;
        Ok(ProfilePage {
            profile: PublicProfile::of(&user, is_owner),
            page_obj,
        })
    }

    /// A post its author can always read and others only once it is visible
    pub fn post_detail(&self, id: PostId, viewer: Option<UserId>) -> BlogResult<PostDetail> {
        let post = self
            .posts
            .get_post_view(id)?
            .ok_or(BlogError::NotFound)?;

        let is_author = viewer.is_some_and(|viewer| post.is_authored_by(viewer));
        if !is_author && !post.is_visible_at(Utc::now()) {
            return Err(BlogError::NotFound);
        }

        let comments = self.comments.get_comments_for_post(id)?;
        Ok(PostDetail { post, comments })
    }
}
