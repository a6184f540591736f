//! File uploads: store logo, cover images and score PDFs.
//!
//! Each endpoint reads the multipart field `file`, stops reading once the
//! limit for its kind is passed, then lets [`UploadStore`] sniff the type
//! and write the file.
//!
//! [`UploadStore`]: crate::services::UploadStore

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use tracing::instrument;

use partitur_core::{ApiResponse, settings::LOGO_URL};

use crate::db::SettingsRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireEditor;
use crate::services::{StoredFile, UploadError, UploadKind};
use crate::state::AppState;

/// Multipart field holding the file.
pub const FILE_FIELD: &str = "file";

/// `POST /api/upload-logo`: store the logo and point `logo_url` at it.
///
/// # Errors
///
/// Returns 400 without a `file` field, 413 above the image limit and 415
/// for anything but PNG, JPEG or WebP.
#[instrument(skip(admin, state, multipart), fields(admin_id = %admin.id))]
pub async fn logo(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<StoredFile>>)> {
    let stored = receive(&state, UploadKind::Logo, multipart).await?;

    if let Some(url) = &stored.url {
        SettingsRepository::new(state.pool())
            .set(LOGO_URL, &serde_json::Value::String(url.clone()))
            .await?;
    }
    add_breadcrumb("settings", "Logo uploaded", Some(&[("path", stored.path.as_str())]));

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(stored))))
}

/// `POST /api/upload/image`: product cover or composer photo.
///
/// # Errors
///
/// As [`logo`].
#[instrument(skip(admin, state, multipart), fields(admin_id = %admin.id))]
pub async fn image(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<StoredFile>>)> {
    let stored = receive(&state, UploadKind::Image, multipart).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(stored))))
}

/// `POST /api/upload/score`: score PDF. The response carries the storage
/// path to put in a product's `pdf_path`; there is no public URL.
///
/// # Errors
///
/// Returns 400 without a `file` field, 413 above the PDF limit and 415 for
/// anything but a PDF.
#[instrument(skip(admin, state, multipart), fields(admin_id = %admin.id))]
pub async fn score(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<StoredFile>>)> {
    let stored = receive(&state, UploadKind::Score, multipart).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(stored))))
}

async fn receive(
    state: &AppState,
    kind: UploadKind,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<StoredFile> {
    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let limit = kind.max_bytes(state.uploads().limits());
    let bytes = read_file_field(multipart, limit).await?;
    Ok(state.uploads().store(kind, &bytes).await?)
}

/// Read the `file` field, failing as soon as it grows past `limit`.
async fn read_file_field(mut multipart: Multipart, limit: usize) -> std::result::Result<Vec<u8>, UploadError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(&e, limit))? {
            if bytes.len() + chunk.len() > limit {
                return Err(UploadError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(UploadError::MissingFile)
}

fn multipart_error(err: &MultipartError, limit: usize) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { limit }
    } else {
        UploadError::Malformed(err.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};

    use super::*;
    use crate::routes::tests::{login_as, send, test_app};

    const BOUNDARY: &str = "partiturboundary";

    fn multipart_request(uri: &str, cookie: &str, field: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn png(len: usize) -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.resize(len, 0);
        bytes
    }

    #[tokio::test]
    async fn test_image_upload_stored() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;
        let (status, body) = send(&app, multipart_request("/api/upload/image", &cookie, "file", &png(100))).await;
        assert_eq!(status, StatusCode::CREATED);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let url = json["data"]["url"].as_str().unwrap();
        assert!(url.starts_with("http://localhost:3000/media/images/"));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_score_upload_has_no_public_url() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;
        let (status, body) = send(
            &app,
            multipart_request("/api/upload/score", &cookie, "file", b"%PDF-1.4\n1 0 obj\n"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["data"]["path"].as_str().unwrap().starts_with("scores/"));
        assert!(json["data"].get("url").is_none());
    }

    #[tokio::test]
    async fn test_wrong_type_is_415() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;
        let (status, _) = send(&app, multipart_request("/api/upload/score", &cookie, "file", &png(100))).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_too_large_is_413() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;
        // Test limit for images is 1024 bytes.
        let (status, _) = send(&app, multipart_request("/api/upload/image", &cookie, "file", &png(2000))).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_missing_field_is_400() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;
        let (status, _) = send(&app, multipart_request("/api/upload/image", &cookie, "image", &png(100))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_viewer_cannot_upload() {
        let app = test_app();
        let cookie = login_as(&app, "viewer").await;
        let (status, _) = send(&app, multipart_request("/api/upload/image", &cookie, "file", &png(100))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
