use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::json;

use crate::error::BlogResult;
use crate::forms::CommentForm;
use crate::models::{CommentId, PostId};
use crate::web::response::{post_detail_path, redirect};
use crate::web::session::CurrentUser;
use crate::web::{blocking, parse_id, AppState};

fn ids(pk: &str, comment_id: &str) -> BlogResult<(PostId, CommentId)> {
    Ok((PostId(parse_id(pk)?), CommentId(parse_id(comment_id)?)))
}

pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(pk): Path<String>,
    Form(form): Form<CommentForm>,
) -> BlogResult<Response> {
    let post_id = PostId(parse_id(&pk)?);
    let comments = state.services.comments.clone();
    blocking(move || comments.add_comment(post_id, user.id, &form)).await?;
    Ok(redirect(&post_detail_path(post_id)))
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((pk, comment_id)): Path<(String, String)>,
) -> BlogResult<Response> {
    let (post_id, comment_id) = ids(&pk, &comment_id)?;
    let comments = state.services.comments.clone();
    let comment = blocking(move || comments.owned_comment(post_id, comment_id, user.id)).await?;
    Ok(Json(json!({
        "form": CommentForm::from_comment(&comment),
        "comment": comment,
        "is_edit": true,
    }))
    .into_response())
}

pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((pk, comment_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> BlogResult<Response> {
    let (post_id, comment_id) = ids(&pk, &comment_id)?;
    let comments = state.services.comments.clone();
    blocking(move || comments.update_comment(post_id, comment_id, user.id, &form)).await?;
    Ok(redirect(&post_detail_path(post_id)))
}

pub async fn delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((pk, comment_id)): Path<(String, String)>,
) -> BlogResult<Response> {
    let (post_id, comment_id) = ids(&pk, &comment_id)?;
    let comments = state.services.comments.clone();
    let comment = blocking(move || comments.owned_comment(post_id, comment_id, user.id)).await?;
    Ok(Json(json!({ "comment": comment })).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((pk, comment_id)): Path<(String, String)>,
) -> BlogResult<Response> {
    let (post_id, comment_id) = ids(&pk, &comment_id)?;
    let comments = state.services.comments.clone();
    blocking(move || comments.delete_comment(post_id, comment_id, user.id)).await?;
    Ok(redirect(&post_detail_path(post_id)))
}
