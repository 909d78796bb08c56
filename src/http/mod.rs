//! HTTP surface: public JSON API, admin pages and static uploads.

pub mod admin;
pub mod api;
pub mod views;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{header::COOKIE, request::Parts, HeaderMap},
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::error::{AppError, AppResult};
use crate::session::{AdminSession, SESSION_COOKIE};
use crate::state::AppState;
use crate::validation::MAX_UPLOAD_BYTES;

/// Room for the form fields and multipart framing on top of the file itself.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads.dir());

    Router::new()
        .route("/", get(views::index))
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/images", get(api::list_images))
        .route(
            "/api/comments/:image_id",
            get(api::list_comments).post(api::add_comment),
        )
        .route("/api/like/:image_id", post(api::toggle_like))
        .route("/login", get(admin::login_page).post(admin::login))
        .route("/logout", get(admin::logout))
        .route("/admin", get(admin::dashboard))
        .route(
            "/upload",
            get(admin::upload_page)
                .post(admin::upload)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/delete/:image_id", post(admin::delete_image))
        .route("/admin/upload-permissions", post(admin::add_permission))
        .route(
            "/admin/upload-permissions/delete/:permission_id",
            post(admin::remove_permission),
        )
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run store and file work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Blocking task failed: {e}")))?
}

/// Value of the session cookie, if the request carries one.
pub(crate) fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// Admin-only handlers take an `AdminSession`; without a live session the
/// request is redirected to the login page.
#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(cookie) = session_cookie(&parts.headers) else {
            return Err(AppError::AuthRequired);
        };
        state
            .sessions
            .resolve(cookie)
            .await
            .ok_or(AppError::AuthRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_cookie_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);

        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; gallery_session=abc.def ; other=1"),
        );
        assert_eq!(session_cookie(&headers), Some("abc.def"));
    }

    #[test]
    fn test_session_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("gallery_session=tok.sig"));
        assert_eq!(session_cookie(&headers), Some("tok.sig"));
    }
}
