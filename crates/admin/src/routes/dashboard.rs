//! Dashboard figures.

use axum::{Json, extract::State};
use tracing::instrument;

use partitur_core::ApiResponse;

use crate::db::DashboardRepository;
use crate::error::Result;
use crate::middleware::RequireAdminAuth;
use crate::models::DashboardStats;
use crate::state::AppState;

/// `GET /api/dashboard`.
///
/// # Errors
///
/// Returns 500 if a query fails.
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardStats>>> {
    let stats = DashboardRepository::new(state.pool()).stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}
