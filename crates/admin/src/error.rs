//! Unified error handling with Sentry integration.
//!
//! Every error renders the JSON envelope `{"success": false, "message": "..."}`;
//! server errors are captured to Sentry first.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use partitur_core::ApiResponse;

use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::{AuthError, UploadError};

/// Application-level error type for the back-office.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not logged in.
    #[error("Unauthorized")]
    Unauthorized,

    /// Logged in without the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.0)
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_))
            | Self::Auth(AuthError::UserAlreadyExists)
            | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(RepositoryError::InvalidReference(_))
            | Self::Auth(
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) | AuthError::InvalidName(_),
            )
            | Self::Upload(UploadError::MissingFile | UploadError::Malformed(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::InvalidCredentials) | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upload(UploadError::UnsupportedType { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::Database(_)
            | Self::Auth(_)
            | Self::Upload(UploadError::Io(_))
            | Self::Session(_)
            | Self::Template(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg) | RepositoryError::InvalidReference(msg))
            | Self::NotFound(msg)
            | Self::BadRequest(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid email or password".to_string(),
            Self::Unauthorized => "Authentication required".to_string(),
            Self::Auth(
                err @ (AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::InvalidName(_)
                | AuthError::UserAlreadyExists),
            ) => err.to_string(),
            Self::Upload(UploadError::Io(_)) => "Internal server error".to_string(),
            Self::Upload(err) => err.to_string(),
            Self::Database(_)
            | Self::Auth(_)
            | Self::Session(_)
            | Self::Template(_)
            | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(ApiResponse::<()>::error(self.public_message()))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Record a staff action as a Sentry breadcrumb.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Database(RepositoryError::Conflict("slug".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Database(RepositoryError::InvalidReference("composer".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Upload(UploadError::TooLarge { limit: 10 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Upload(UploadError::UnsupportedType { expected: "PDF" }).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            AppError::Upload(UploadError::MissingFile).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::PasswordHash).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Forbidden("viewer".into()).status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_login_failure_is_generic() {
        let (status, json) = body_json(AppError::Auth(AuthError::InvalidCredentials)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let (status, json) =
            body_json(AppError::Database(RepositoryError::DataCorruption("bad row".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_error_becomes_bad_request() {
        let err: AppError = ValidationError("title is required".to_string()).into();
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "title is required");
    }
}
