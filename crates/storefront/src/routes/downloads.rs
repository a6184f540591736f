//! Download route handlers.
//!
//! A paid transaction's `download_token` is the only credential: anyone with
//! the link can fetch the scores of that order, nothing else.

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use partitur_core::storage::resolve_score_path;
use partitur_core::{ApiResponse, OrderId, ProductId};

use crate::db::TransactionRepository;
use crate::error::{AppError, Result};
use crate::models::Transaction;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub token: Uuid,
}

/// A purchased score and its download link.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLink {
    pub product_id: ProductId,
    pub title: String,
    pub url: String,
}

/// Download links for every score of a paid transaction.
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub(crate) async fn download_links(
    state: &AppState,
    transaction: &Transaction,
) -> Result<Vec<DownloadLink>> {
    let files = TransactionRepository::new(state.pool())
        .download_files(transaction.id)
        .await?;
    let base_url = &state.config().base_url;

    Ok(files
        .into_iter()
        .map(|file| DownloadLink {
            url: format!(
                "{base_url}/download/{}/{}",
                transaction.download_token, file.product_id
            ),
            product_id: file.product_id,
            title: file.title,
        })
        .collect())
}

/// Scores of a paid order.
///
/// # Errors
///
/// Returns 404 for an unknown order and 403 for a wrong token or an order
/// that is not paid.
#[instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<ApiResponse<Vec<DownloadLink>>>> {
    let not_found = || AppError::NotFound(format!("Order {order_id} not found"));
    let parsed = OrderId::parse(&order_id).map_err(|_| not_found())?;

    let transaction = TransactionRepository::new(state.pool())
        .find_by_order_id(&parsed)
        .await?
        .ok_or_else(not_found)?;

    if transaction.download_token != query.token {
        return Err(AppError::Forbidden("Invalid download token".to_string()));
    }
    if !transaction.status.grants_download() {
        return Err(AppError::Forbidden(format!(
            "Order is {}",
            transaction.status.label().to_lowercase()
        )));
    }

    Ok(Json(ApiResponse::ok(download_links(&state, &transaction).await?)))
}

/// Stream a purchased PDF.
///
/// # Errors
///
/// - 404 for an unknown token, a product outside the order or a missing file
/// - 403 if the order is not paid (or was refunded)
#[instrument(skip(state, token))]
pub async fn file(
    State(state): State<AppState>,
    Path((token, product_id)): Path<(Uuid, ProductId)>,
) -> Result<Response> {
    let repo = TransactionRepository::new(state.pool());
    let transaction = repo
        .find_by_download_token(token)
        .await?
        .ok_or_else(|| AppError::NotFound("Download not found".to_string()))?;

    if !transaction.status.grants_download() {
        return Err(AppError::Forbidden(
            "This order does not allow downloads".to_string(),
        ));
    }

    let download = repo
        .download_file(transaction.id, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Download not found".to_string()))?;

    let Some(path) = download
        .pdf_path
        .as_deref()
        .and_then(|relative| resolve_score_path(&state.config().storage_dir, relative))
    else {
        warn!(%product_id, "Product has no downloadable file");
        return Err(AppError::NotFound("File not available".to_string()));
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(%product_id, path = %path.display(), "Score file missing on disk");
            return Err(AppError::NotFound("File not available".to_string()));
        }
        Err(e) => return Err(AppError::Internal(format!("Failed to open score: {e}"))),
    };
    let length = file
        .metadata()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to stat score: {e}")))?
        .len();

    info!(
        order_id = %transaction.order_id,
        %product_id,
        "Serving download"
    );

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}.pdf\"",
        download.slug
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
            (header::CACHE_CONTROL, HeaderValue::from_static("private, no-store")),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::routes::tests::{get, send};

    #[tokio::test]
    async fn test_file_rejects_malformed_token() {
        let (status, _) = send(get("/download/not-a-uuid/3")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_index_requires_token() {
        let (status, _) = send(get("/api/orders/PTR-20261018093000-4F2A/downloads")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
