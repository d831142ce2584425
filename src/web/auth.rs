use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::BlogResult;
use crate::forms::{safe_next, LoginForm, RegistrationForm};
use crate::web::response::redirect;
use crate::web::session::{expired_session_cookie, session_cookie, session_token};
use crate::web::{blocking, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct NextParams {
    pub next: Option<String>,
}

pub async fn registration_form() -> Response {
    Json(json!({ "form": { "username": "", "password1": "", "password2": "" } })).into_response()
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> BlogResult<Response> {
    let auth = state.services.auth.clone();
    blocking(move || auth.register(&form)).await?;
    Ok(redirect("/auth/login/"))
}

pub async fn login_form(Query(params): Query<NextParams>) -> Response {
    Json(json!({
        "form": { "username": "", "password": "" },
        "next": safe_next(params.next.as_deref()),
    }))
    .into_response()
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> BlogResult<Response> {
    let target = form.redirect_target();
    let auth = state.services.auth.clone();
    let session = blocking(move || auth.login(&form)).await?;

    let max_age = (session.expires_at - Utc::now()).num_seconds();
    let mut response = redirect(&target);
    if let Ok(cookie) = session_cookie(&session.token, max_age).parse() {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> BlogResult<Response> {
    if let Some(token) = session_token(&headers) {
        let auth = state.services.auth.clone();
        blocking(move || Ok(auth.logout(&token)?)).await?;
    }

    let mut response = redirect("/");
    if let Ok(cookie) = expired_session_cookie().parse() {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}
