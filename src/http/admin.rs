//! Admin login, dashboard, uploads, deletion and allow-list management.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::{blocking, session_cookie, views};
use crate::auth;
use crate::db::{ImageSort, NewImage, PermissionInsert};
use crate::error::{AppError, AppResult};
use crate::session::{AdminSession, SESSION_COOKIE};
use crate::state::AppState;
use crate::validation::{normalize_email, parse_email, UploadForm, UploadedFile, ValidationError};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub permission_error: Option<String>,
    pub permission_success: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PermissionForm {
    #[serde(default)]
    pub upload_email: Option<String>,
}

fn session_set_cookie(value: &str, max_age_secs: u64) -> String {
    format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

fn session_clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Redirect to the dashboard with a flash message in the query string.
/// Messages are plain ASCII words, so only spaces need encoding.
fn flash(kind: &str, message: &str) -> Redirect {
    Redirect::to(&format!("/admin?{kind}={}", message.replace(' ', "+")))
}

pub async fn login_page() -> Html<String> {
    Html(views::login_page(None))
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> AppResult<Response> {
    let db = state.db.clone();
    let username = form.username.trim().to_string();
    let password = form.password;
    let lookup_name = username.clone();
    let admin = blocking(move || Ok(auth::authenticate(&db, &lookup_name, &password)?)).await?;

    let Some(admin) = admin else {
        warn!("Rejected login for {:?}", username);
        return Ok((
            StatusCode::UNAUTHORIZED,
            Html(views::login_page(Some(INVALID_CREDENTIALS))),
        )
            .into_response());
    };

    let cookie = state.sessions.create(admin.id, &admin.username).await;
    info!("Admin {} logged in", admin.username);
    Ok((
        [(SET_COOKIE, session_set_cookie(&cookie, state.sessions.ttl().as_secs()))],
        Redirect::to("/admin"),
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(cookie) = session_cookie(&headers) {
        state.sessions.destroy(cookie).await;
    }
    ([(SET_COOKIE, session_clear_cookie())], Redirect::to("/")).into_response()
}

pub async fn dashboard(
    session: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Html<String>> {
    let db = state.db.clone();
    let (stats, images, permissions) = blocking(move || {
        Ok((
            db.dashboard_stats()?,
            db.list_images(ImageSort::Recent, None)?,
            db.list_upload_permissions()?,
        ))
    })
    .await?;

    Ok(Html(views::dashboard_page(&views::DashboardView {
        username: &session.username,
        stats: &stats,
        images: &images,
        permissions: &permissions,
        permission_error: query.permission_error.as_deref(),
        permission_success: query.permission_success.as_deref(),
    })))
}

pub async fn upload_page(_session: AdminSession) -> Html<String> {
    Html(views::upload_page(None, ""))
}

async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, MultipartError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "title" => form.title = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "uploader_email" => form.uploader_email = Some(field.text().await?),
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?.to_vec();
                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }
    Ok(form)
}

pub async fn upload(
    session: AdminSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            let error = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ValidationError::PayloadTooLarge
            } else {
                ValidationError::MalformedBody
            };
            return Ok(upload_rejected(&error, ""));
        }
    };
    let entered_email = normalize_email(form.uploader_email.as_deref());

    let db = state.db.clone();
    let uploads = state.uploads.clone();
    let result = blocking(move || {
        let upload = form.validate(|email| db.is_upload_email_allowed(email))??;

        let stored = uploads.reserve(&upload.file.filename)?;
        let image = NewImage {
            title: upload.title,
            filename: stored.clone(),
            description: Some(upload.description),
        };

        match db.insert_image(&image, || uploads.write(&stored, &upload.file.bytes)) {
            Ok(image) => Ok((image, upload.uploader_email)),
            Err(e) => {
                if let Err(cleanup) = uploads.remove(&stored) {
                    warn!("Failed to remove {:?} after aborted upload: {:#}", stored, cleanup);
                }
                Err(e.into())
            }
        }
    })
    .await;

    match result {
        Ok((image, uploader)) => {
            info!(
                "Admin {} uploaded image {} ({:?}) on behalf of {}",
                session.username, image.id, image.filename, uploader
            );
            Ok(Redirect::to("/admin").into_response())
        }
        Err(AppError::Validation(error)) => Ok(upload_rejected(&error, &entered_email)),
        Err(e) => Err(e),
    }
}

fn upload_rejected(error: &ValidationError, uploader_email: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(views::upload_page(Some(&error.to_string()), uploader_email)),
    )
        .into_response()
}

pub async fn delete_image(
    session: AdminSession,
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
) -> AppResult<Redirect> {
    let db = state.db.clone();
    let uploads = state.uploads.clone();
    let deleted = blocking(move || {
        let Some(image) = db.delete_image(image_id)? else {
            return Ok(None);
        };
        match uploads.remove(&image.filename) {
            Ok(true) => {}
            Ok(false) => warn!("Backing file {:?} was already missing", image.filename),
            // The row is gone; the startup sweep picks the file up later.
            Err(e) => warn!("Failed to remove {:?}: {:#}", image.filename, e),
        }
        Ok(Some(image))
    })
    .await?;

    if let Some(image) = deleted {
        info!("Admin {} deleted image {} ({:?})", session.username, image.id, image.title);
    }
    Ok(Redirect::to("/admin"))
}

pub async fn add_permission(
    session: AdminSession,
    State(state): State<AppState>,
    Form(form): Form<PermissionForm>,
) -> AppResult<Redirect> {
    let email = match parse_email(form.upload_email.as_deref()) {
        Ok(email) => email,
        Err(e) => return Ok(flash("permission_error", &e.to_string())),
    };

    let db = state.db.clone();
    let created_by = session.username.clone();
    let added_email = email.clone();
    let outcome =
        blocking(move || Ok(db.add_upload_permission(&added_email, &created_by)?)).await?;

    Ok(match outcome {
        PermissionInsert::Added(id) => {
            info!("Admin {} allowed {} to upload (permission {})", session.username, email, id);
            flash("permission_success", "Email allowed to upload")
        }
        PermissionInsert::AlreadyPresent => flash("permission_error", "Email already allowed"),
    })
}

pub async fn remove_permission(
    session: AdminSession,
    State(state): State<AppState>,
    Path(permission_id): Path<i64>,
) -> AppResult<Redirect> {
    let db = state.db.clone();
    let removed = blocking(move || Ok(db.remove_upload_permission(permission_id)?)).await?;
    if removed {
        info!("Admin {} removed upload permission {}", session.username, permission_id);
    }
    Ok(flash("permission_success", "Permission removed"))
}
