//! Composer management.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::instrument;

use partitur_core::{ApiResponse, ComposerId};

use crate::db::ComposerRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdminAuth, RequireEditor};
use crate::models::{Composer, ComposerDraft, ComposerInput};
use crate::state::AppState;

/// `GET /api/composers`.
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Composer>>>> {
    let composers = ComposerRepository::new(state.pool()).list().await?;
    Ok(Json(ApiResponse::ok(composers)))
}

/// `GET /api/composers/{id}`.
///
/// # Errors
///
/// Returns 404 for an unknown id.
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ComposerId>,
) -> Result<Json<ApiResponse<Composer>>> {
    let composer = ComposerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Composer {id} not found")))?;
    Ok(Json(ApiResponse::ok(composer)))
}

/// `POST /api/composers`.
///
/// # Errors
///
/// Returns 400 for invalid input and 409 for a taken slug.
#[instrument(skip(admin, state, payload), fields(admin_id = %admin.id))]
pub async fn create(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    payload: std::result::Result<Json<ComposerInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Composer>>)> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let draft = ComposerDraft::validate(input)?;
    let composer = ComposerRepository::new(state.pool()).create(&draft).await?;
    tracing::info!(composer_id = %composer.id, slug = %composer.slug, "Composer created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(composer))))
}

/// `PUT /api/composers/{id}`.
///
/// # Errors
///
/// Returns 404 for an unknown id, 400 for invalid input and 409 for a taken
/// slug.
#[instrument(skip(admin, state, payload), fields(admin_id = %admin.id))]
pub async fn update(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<ComposerId>,
    payload: std::result::Result<Json<ComposerInput>, JsonRejection>,
) -> Result<Json<ApiResponse<Composer>>> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let draft = ComposerDraft::validate(input)?;
    let composer = ComposerRepository::new(state.pool()).update(id, &draft).await?;
    Ok(Json(ApiResponse::ok(composer)))
}

/// `DELETE /api/composers/{id}`.
///
/// # Errors
///
/// Returns 404 for an unknown id and 409 while products still reference
/// the composer.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<ComposerId>,
) -> Result<Json<ApiResponse<()>>> {
    ComposerRepository::new(state.pool()).delete(id).await?;
    tracing::info!(composer_id = %id, "Composer deleted");
    Ok(Json(ApiResponse::<()>::message("Composer deleted")))
}
