use thiserror::Error;

use crate::forms::FormErrors;
use crate::models::PostId;

/// Failures surfaced by the blog services
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("not found")]
    NotFound,

    /// The requester does not own the post (or the comment on it) they tried to change
    #[error("only the author may modify content on post {0}")]
    NotAuthor(PostId),

    #[error("form did not validate")]
    Validation(FormErrors),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type BlogResult<T> = std::result::Result<T, BlogError>;

impl BlogError {
    /// Validation failure on a single field
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FormErrors::default();
        errors.add(field, message);
        BlogError::Validation(errors)
    }
}
