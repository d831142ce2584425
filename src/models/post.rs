use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::CategoryId;
use super::location::LocationId;
use super::user::UserId;

/// Unique identifier for posts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximum length of a post title
pub const TITLE_MAX_LEN: usize = 256;

/// URL prefix under which uploaded images are served
pub const MEDIA_URL: &str = "/media/";

/// A stored blog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub text: String,
    /// Posts dated in the future stay hidden until that moment
    pub pub_date: DateTime<Utc>,
    pub author_id: UserId,
    pub location_id: Option<LocationId>,
    pub category_id: Option<CategoryId>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    /// Uploaded image, relative to the media directory
    pub image: Option<String>,
}

/// Author-editable fields of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub location_id: Option<LocationId>,
    pub category_id: Option<CategoryId>,
    pub is_published: bool,
    pub image: Option<String>,
}

impl Post {
    /// Overwrites the editable fields with `changes`
    pub fn apply(&mut self, changes: NewPost) {
        self.title = changes.title;
        self.text = changes.text;
        self.pub_date = changes.pub_date;
        self.location_id = changes.location_id;
        self.category_id = changes.category_id;
        self.is_published = changes.is_published;
        self.image = changes.image;
    }

    /// The editable fields of this post
    pub fn to_new_post(&self) -> NewPost {
        NewPost {
            title: self.title.clone(),
            text: self.text.clone(),
            pub_date: self.pub_date,
            location_id: self.location_id,
            category_id: self.category_id,
            is_published: self.is_published,
            image: self.image.clone(),
        }
    }
}

/// Author as shown next to a post or comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: UserId,
    pub username: String,
}

/// Category as shown next to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

/// A post joined with its author, category, location and comment count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: PostId,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub author: AuthorRef,
    pub category: Option<CategoryRef>,
    /// Name of the location, present only while the location is published
    pub location: Option<String>,
    pub comment_count: i64,
    /// URL of the uploaded image
    pub image: Option<String>,
}

impl PostView {
    /// Whether anyone, not just the author, may read this post at `now`
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_published
            && self.category.as_ref().is_some_and(|c| c.is_published)
            && self.pub_date <= now
    }

    pub fn is_authored_by(&self, user_id: UserId) -> bool {
        self.author.id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn view(is_published: bool, category_published: Option<bool>, offset: Duration) -> PostView {
        let now = Utc::now();
        PostView {
            id: PostId(1),
            title: "Title".to_string(),
            text: "Text".to_string(),
            pub_date: now + offset,
            is_published,
            created_at: now,
            author: AuthorRef {
                id: UserId(7),
                username: "author".to_string(),
            },
            category: category_published.map(|is_published| CategoryRef {
                id: CategoryId(3),
                title: "Category".to_string(),
                slug: "category".to_string(),
                is_published,
            }),
            location: None,
            comment_count: 0,
            image: None,
        }
    }

    #[test]
    fn test_visible_when_everything_published() {
        let post = view(true, Some(true), Duration::hours(-1));
        assert!(post.is_visible_at(Utc::now()));
    }

    #[test]
    fn test_hidden_when_any_condition_fails() {
        let now = Utc::now();
        assert!(!view(false, Some(true), Duration::hours(-1)).is_visible_at(now));
        assert!(!view(true, Some(false), Duration::hours(-1)).is_visible_at(now));
        assert!(!view(true, None, Duration::hours(-1)).is_visible_at(now));
        assert!(!view(true, Some(true), Duration::hours(1)).is_visible_at(now));
    }

    #[test]
    fn test_authorship() {
        let post = view(true, Some(true), Duration::zero());
        assert!(post.is_authored_by(UserId(7)));
        assert!(!post.is_authored_by(UserId(8)));
    }

    #[test]
    fn test_apply_changes() {
        let now = Utc::now();
        let mut post = Post {
            id: PostId(1),
            title: "Old".to_string(),
            text: "Old text".to_string(),
            pub_date: now,
            author_id: UserId(1),
            location_id: Some(LocationId(2)),
            category_id: Some(CategoryId(3)),
            is_published: true,
            created_at: now,
            image: Some("posts_images/old.png".to_string()),
        };
        let mut changes = post.to_new_post();
        changes.title = "New".to_string();
        changes.location_id = None;
        changes.is_published = false;
        changes.image = None;

        post.apply(changes);

        assert_eq!(post.title, "New");
        assert_eq!(post.location_id, None);
        assert!(!post.is_published);
        assert_eq!(post.image, None);
        assert_eq!(post.author_id, UserId(1));
    }
}
