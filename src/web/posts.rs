use axum::async_trait;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::json;

use crate::error::BlogResult;
use crate::forms::{ImageUpload, PostForm};
use crate::models::PostId;
use crate::web::response::{post_detail_path, profile_path, redirect};
use crate::web::session::CurrentUser;
use crate::web::{blocking, parse_id, AppState};

/// Post form body, either urlencoded or multipart with an optional `image` file
pub struct PostSubmission {
    pub form: PostForm,
    pub image: Option<ImageUpload>,
}

#[async_trait]
impl FromRequest<AppState> for PostSubmission {
    type Rejection = Response;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));
        if !is_multipart {
            let Form(form) = Form::<PostForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self { form, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let mut form = PostForm::default();
        let mut image = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
                // Browsers send an empty part when no file was chosen
                if !bytes.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await.map_err(IntoResponse::into_response)?;
                form.set_field(&name, value);
            }
        }
        Ok(Self { form, image })
    }
}

pub async fn create_form(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> BlogResult<Response> {
    let posts = state.services.posts.clone();
    let choices = blocking(move || posts.form_choices()).await?;
    Ok(Json(json!({ "form": PostForm::default(), "choices": choices })).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    submission: PostSubmission,
) -> BlogResult<Response> {
    let posts = state.services.posts.clone();
    let author = user.id;
    blocking(move || posts.create_post(author, &submission.form, submission.image.as_ref())).await?;
    Ok(redirect(&profile_path(&user.username)))
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(pk): Path<String>,
) -> BlogResult<Response> {
    let id = PostId(parse_id(&pk)?);
    let posts = state.services.posts.clone();
    let (post, choices) = blocking(move || {
        let post = posts.owned_post(id, user.id)?;
        Ok((post, posts.form_choices()?))
    })
    .await?;
    Ok(Json(json!({
        "form": PostForm::from_post(&post),
        "post": post,
        "choices": choices,
        "is_edit": true,
    }))
    .into_response())
}

pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(pk): Path<String>,
    submission: PostSubmission,
) -> BlogResult<Response> {
    let id = PostId(parse_id(&pk)?);
    let posts = state.services.posts.clone();
    blocking(move || {
        posts.update_post(id, user.id, &submission.form, submission.image.as_ref())
    })
    .await?;
    Ok(redirect(&post_detail_path(id)))
}

pub async fn delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(pk): Path<String>,
) -> BlogResult<Response> {
    let id = PostId(parse_id(&pk)?);
    let posts = state.services.posts.clone();
    let post = blocking(move || posts.owned_post(id, user.id)).await?;
    Ok(Json(json!({ "form": PostForm::from_post(&post), "post": post })).into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(pk): Path<String>,
) -> BlogResult<Response> {
    let id = PostId(parse_id(&pk)?);
    let posts = state.services.posts.clone();
    blocking(move || posts.delete_post(id, user.id)).await?;
    Ok(redirect("/"))
}
