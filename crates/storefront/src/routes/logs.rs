//! Browser log intake.
//!
//! The front end batches console errors and notable events and posts them
//! here; each entry is re-emitted as a `tracing` event with target `client`
//! so it lands in the same pipeline (and Sentry) as server logs.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
};
use serde::Deserialize;

use partitur_core::ApiResponse;

use crate::error::{AppError, Result};
use crate::midtrans::types::truncate_chars;

/// Most entries accepted per request.
pub const MAX_ENTRIES: usize = 50;

/// Longest message kept; the rest is cut.
pub const MAX_MESSAGE_CHARS: usize = 2000;

const MAX_URL_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct LogBatch {
    pub entries: Vec<ClientLogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ClientLogEntry {
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl ClientLevel {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("debug" | "trace") => Self::Debug,
            Some("warn" | "warning") => Self::Warn,
            Some("error") => Self::Error,
            _ => Self::Info,
        }
    }
}

fn emit(entry: &ClientLogEntry) {
    let message = truncate_chars(&entry.message, MAX_MESSAGE_CHARS);
    let url = entry
        .url
        .as_deref()
        .map(|u| truncate_chars(u, MAX_URL_CHARS))
        .unwrap_or_default();
    let timestamp = entry.timestamp.as_deref().unwrap_or_default();
    let context = entry
        .context
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    match ClientLevel::parse(entry.level.as_deref()) {
        ClientLevel::Debug => {
            tracing::debug!(target: "client", %url, %timestamp, %context, "{message}");
        }
        ClientLevel::Info => {
            tracing::info!(target: "client", %url, %timestamp, %context, "{message}");
        }
        ClientLevel::Warn => {
            tracing::warn!(target: "client", %url, %timestamp, %context, "{message}");
        }
        ClientLevel::Error => {
            tracing::error!(target: "client", %url, %timestamp, %context, "{message}");
        }
    }
}

/// `POST /api/logs`.
///
/// # Errors
///
/// Returns 400 for a malformed body, no entries or more than
/// [`MAX_ENTRIES`].
pub async fn ingest(
    payload: std::result::Result<Json<LogBatch>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<()>>)> {
    let Json(batch) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    if batch.entries.is_empty() {
        return Err(AppError::BadRequest("No log entries".to_string()));
    }
    if batch.entries.len() > MAX_ENTRIES {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_ENTRIES} entries per request"
        )));
    }

    for entry in &batch.entries {
        emit(entry);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::<()>::message(format!(
            "{} entries accepted",
            batch.entries.len()
        ))),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use serde_json::json;

    use super::*;
    use crate::routes::tests::send;

    fn post(body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/logs")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(ClientLevel::parse(Some("ERROR")), ClientLevel::Error);
        assert_eq!(ClientLevel::parse(Some("warning")), ClientLevel::Warn);
        assert_eq!(ClientLevel::parse(Some("debug")), ClientLevel::Debug);
        assert_eq!(ClientLevel::parse(Some("fatal")), ClientLevel::Info);
        assert_eq!(ClientLevel::parse(None), ClientLevel::Info);
    }

    #[tokio::test]
    async fn test_ingest_accepts_batch() {
        let body = json!({
            "entries": [
                {"level": "error", "message": "Snap failed to load", "url": "https://partitur.id/cart"},
                {"message": "checkout opened", "context": {"items": 2}}
            ]
        });
        let (status, body) = send(post(&body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_batch() {
        let (status, _) = send(post(&json!({"entries": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ingest_rejects_oversized_batch() {
        let entries: Vec<_> = (0..=MAX_ENTRIES)
            .map(|i| json!({"message": format!("entry {i}")}))
            .collect();
        let (status, _) = send(post(&json!({ "entries": entries }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
