//! Public JSON endpoints: image listing, comments and likes.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::blocking;
use crate::db::{Comment, Image, ImageSort, LikeOutcome};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::validation::{parse_comment_text, parse_email, ValidationError};

const IMAGE_NOT_FOUND: &str = "Image not found";

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LikeRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Non-numeric ids cannot name an image.
fn image_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::NotFound(IMAGE_NOT_FOUND))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!("Rejected request body: {}", rejection.body_text());
        AppError::Validation(ValidationError::MalformedBody)
    })
}

pub async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> AppResult<Json<Vec<Image>>> {
    let sort = ImageSort::parse(query.sort.as_deref().unwrap_or("recent"));
    let db = state.db.clone();
    let images = blocking(move || Ok(db.list_images(sort, query.search.as_deref())?)).await?;
    Ok(Json(images))
}

pub async fn list_comments(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Vec<Comment>>> {
    let image_id = image_id(path)?;
    let db = state.db.clone();
    let comments = blocking(move || Ok(db.recent_comments(image_id)?)).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let image_id = image_id(path)?;
    let request = json_body(payload)?;
    let email = parse_email(request.email.as_deref())?;
    let text = parse_comment_text(request.text.as_deref())?;

    let db = state.db.clone();
    let inserted = blocking(move || Ok(db.add_comment(image_id, &email, &text)?)).await?;
    match inserted {
        Some(_) => Ok(Json(json!({ "success": true }))),
        None => Err(AppError::NotFound(IMAGE_NOT_FOUND)),
    }
}

pub async fn toggle_like(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<LikeRequest>, JsonRejection>,
) -> AppResult<Json<LikeOutcome>> {
    let image_id = image_id(path)?;
    let request = json_body(payload)?;
    let email = parse_email(request.email.as_deref())?;

    let db = state.db.clone();
    let outcome = blocking(move || Ok(db.toggle_like(image_id, &email)?)).await?;
    outcome.map(Json).ok_or(AppError::NotFound(IMAGE_NOT_FOUND))
}
