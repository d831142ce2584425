pub mod auth;
pub mod blog;
pub mod catalog;
pub mod comment;
pub mod media;
pub mod post;
pub mod profile;

pub use auth::AuthService;
pub use blog::BlogService;
pub use catalog::CatalogService;
pub use comment::CommentService;
pub use media::MediaStore;
pub use post::PostService;
pub use profile::ProfileService;

use anyhow::{Context, Result};
use chrono::Duration;

use crate::config::Settings;
use crate::data::Database;
use crate::models::Paginator;

/// Every service, wired to one database
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub blog: BlogService,
    pub catalog: CatalogService,
    pub comments: CommentService,
    pub posts: PostService,
    pub profiles: ProfileService,
}

impl Services {
    pub fn new(database: &Database, settings: &Settings) -> Result<Self> {
        let session_lifetime = Duration::try_days(settings.session_days)
            .with_context(|| format!("Session lifetime of {} days is out of range", settings.session_days))?;

        Ok(Self {
            auth: AuthService::new(
                database.user_repository(),
                database.session_repository(),
                session_lifetime,
            ),
            blog: BlogService::new(
                database.post_repository(),
                database.category_repository(),
                database.comment_repository(),
                database.user_repository(),
                Paginator::new(settings.posts_per_page),
            ),
            catalog: CatalogService::new(
                database.category_repository(),
                database.location_repository(),
            ),
            comments: CommentService::new(database.post_repository(), database.comment_repository()),
            posts: PostService::new(
                database.post_repository(),
                database.category_repository(),
                database.location_repository(),
                MediaStore::new(&settings.media_dir),
            ),
            profiles: ProfileService::new(database.user_repository()),
        })
    }
}
