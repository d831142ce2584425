use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::models::User;
use crate::web::response::{login_path, redirect};
use crate::web::{blocking, AppState};

pub const SESSION_COOKIE: &str = "sessionid";

/// Session token from the `sessionid` cookie or a bearer `Authorization` header
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
    })
    .filter(|token| !token.is_empty())
}

pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        max_age_secs.max(0)
    )
}

pub fn expired_session_cookie() -> String {
    session_cookie("", 0)
}

/// The requesting user, if logged in
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match session_token(&parts.headers) {
            Some(token) => token,
            None => return Ok(MaybeUser(None)),
        };
        let auth = state.services.auth.clone();
        let user = blocking(move || Ok(auth.authenticate(&token)?))
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(MaybeUser(user))
    }
}

/// The requesting user; anonymous requests are sent to the login page
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await? {
            MaybeUser(Some(user)) => Ok(CurrentUser(user)),
            MaybeUser(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|target| target.as_str())
                    .unwrap_or_else(|| parts.uri.path());
                Err(redirect(&login_path(next)))
            }
        }
    }
}
