use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;

use crate::error::BlogError;
use crate::models::PostId;

/// 302 redirect to a local path
pub fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub fn post_detail_path(id: PostId) -> String {
    format!("/posts/{}/", id)
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{}/", username)
}

/// Login page that sends the user back to `next` (path and query) afterwards
pub fn login_path(next: &str) -> String {
    let next: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("/auth/login/?next={}", next)
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        match self {
            BlogError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
            }
            BlogError::NotAuthor(post_id) => redirect(&post_detail_path(post_id)),
            BlogError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"errors": errors}))).into_response()
            }
            BlogError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"errors": {"__all__": [BlogError::InvalidCredentials.to_string()]}})),
            )
                .into_response(),
            BlogError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal server error"})),
                )
                    .into_response()
            }
        }
    }
}
