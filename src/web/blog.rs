use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::BlogResult;
use crate::forms::CommentForm;
use crate::models::PostId;
use crate::web::session::MaybeUser;
use crate::web::{blocking, parse_id, AppState, PageParams};

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> BlogResult<Response> {
    let blog = state.services.blog.clone();
    let page_obj = blocking(move || blog.index(params.page.as_deref())).await?;
    Ok(Json(json!({ "page_obj": page_obj })).into_response())
}

pub async fn category_posts(
    State(state): State<AppState>,
    Path(category_slug): Path<String>,
    Query(params): Query<PageParams>,
) -> BlogResult<Response> {
    let blog = state.services.blog.clone();
    let page = blocking(move || blog.category_posts(&category_slug, params.page.as_deref())).await?;
    Ok(Json(page).into_response())
}

pub async fn profile(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> BlogResult<Response> {
    let blog = state.services.blog.clone();
    let viewer = viewer.map(|user| user.id);
    let page = blocking(move || blog.profile(&username, viewer, params.page.as_deref())).await?;
    Ok(Json(page).into_response())
}

pub async fn post_detail(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(pk): Path<String>,
) -> BlogResult<Response> {
    let id = PostId(parse_id(&pk)?);
    let blog = state.services.blog.clone();
    let viewer = viewer.map(|user| user.id);
    let detail = blocking(move || blog.post_detail(id, viewer)).await?;
    Ok(Json(json!({
        "post": detail.post,
        "comments": detail.comments,
        "form": CommentForm::default(),
    }))
    .into_response())
}
