pub mod auth;
pub mod blog;
pub mod comments;
pub mod posts;
pub mod profile;
pub mod response;
pub mod session;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::services::ServeDir;

use crate::config::Settings;
use crate::error::{BlogError, BlogResult};
use crate::services::Services;

/// Largest accepted request body, sized for image uploads
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

/// Runs blocking service work off the async runtime
pub async fn blocking<T, F>(work: F) -> BlogResult<T>
where
    F: FnOnce() -> BlogResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BlogError::Internal(e.into()))?
}

/// Numeric path segment; anything else does not name a resource
pub fn parse_id(raw: &str) -> BlogResult<i64> {
    raw.parse::<i64>().map_err(|_| BlogError::NotFound)
}

/// `?page=` of paginated listings
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

async fn not_found() -> BlogError {
    BlogError::NotFound
}

/// Every blog route, plus static files under `/static` and uploads under `/media`
pub fn router(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .route("/", get(blog::index))
        .route("/posts/create/", get(posts::create_form).post(posts::create))
        .route("/posts/:pk/", get(blog::post_detail))
        .route("/posts/:pk/edit/", get(posts::edit_form).post(posts::edit))
        .route("/posts/:pk/delete/", get(posts::delete_form).post(posts::delete))
        .route("/posts/:pk/comment/", post(comments::add))
        .route(
            "/posts/:pk/edit_comment/:comment_id/",
            get(comments::edit_form).post(comments::edit),
        )
        .route(
            "/posts/:pk/delete_comment/:comment_id/",
            get(comments::delete_form).post(comments::delete),
        )
        .route("/category/:category_slug/", get(blog::category_posts))
        .route("/profile/edit/", get(profile::edit_form).post(profile::edit))
        .route("/profile/:username/", get(blog::profile))
        .route("/auth/registration/", get(auth::registration_form).post(auth::register))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", post(auth::logout))
        .nest_service("/static", ServeDir::new(&settings.static_dir))
        .nest_service("/media", ServeDir::new(&settings.media_dir))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
