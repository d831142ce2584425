use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::json;

use crate::error::BlogResult;
use crate::forms::UserForm;
use crate::web::response::{profile_path, redirect};
use crate::web::session::CurrentUser;
use crate::web::{blocking, AppState};

pub async fn edit_form(CurrentUser(user): CurrentUser) -> Response {
    Json(json!({ "form": UserForm::from_user(&user) })).into_response()
}

pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<UserForm>,
) -> BlogResult<Response> {
    let profiles = state.services.profiles.clone();
    let updated = blocking(move || profiles.update_profile(user.id, &form)).await?;
    Ok(redirect(&profile_path(&updated.username)))
}
