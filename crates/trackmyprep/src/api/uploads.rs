use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use super::{ApiError, AppState};

/// Serves a stored resume by filename. Anything that is not a plain stored
/// filename is a 404, same as a missing file.
pub(crate) async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::new(StatusCode::NOT_FOUND, "File not found");

    let path = state.storage.resolve(&filename).ok_or_else(not_found)?;
    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            tracing::error!(error = %e, file = %filename, "reading upload failed");
            return Err(ApiError::internal("Failed to read file"));
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let mut response = content.into_response();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    Ok(response)
}
