//! Product management.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::instrument;

use partitur_core::{ApiResponse, Page, ProductId};

use crate::db::ProductRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdminAuth, RequireEditor};
use crate::models::{Product, ProductDraft, ProductInput, ProductListParams, ProductQuery};
use crate::state::AppState;

/// `GET /api/products`.
///
/// # Errors
///
/// Returns 500 if the query fails.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<ApiResponse<Page<Product>>>> {
    let query = ProductQuery::from(params);
    let page = ProductRepository::new(state.pool()).list(&query).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// `GET /api/products/{id}`.
///
/// # Errors
///
/// Returns 404 for an unknown id.
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))?;
    Ok(Json(ApiResponse::ok(product)))
}

/// `POST /api/products`.
///
/// # Errors
///
/// Returns 400 for invalid input or an unknown composer, 409 for a taken
/// slug.
#[instrument(skip(admin, state, payload), fields(admin_id = %admin.id))]
pub async fn create(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let draft = ProductDraft::validate(input)?;

    let product = ProductRepository::new(state.pool()).create(&draft).await?;

    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    add_breadcrumb("catalog", "Product created", Some(&[("slug", product.slug.as_str())]));

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(product))))
}

/// `PUT /api/products/{id}`.
///
/// # Errors
///
/// Returns 404 for an unknown id, otherwise as [`create`].
#[instrument(skip(admin, state, payload), fields(admin_id = %admin.id))]
pub async fn update(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    payload: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<ApiResponse<Product>>> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let draft = ProductDraft::validate(input)?;

    let product = ProductRepository::new(state.pool()).update(id, &draft).await?;

    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(ApiResponse::ok(product)))
}

/// `DELETE /api/products/{id}`.
///
/// Past transactions keep their line items.
///
/// # Errors
///
/// Returns 404 for an unknown id.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ApiResponse<()>>> {
    ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(ApiResponse::<()>::message("Product deleted")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use serde_json::json;

    use super::*;
    use crate::routes::tests::{json_body, login_as, request, send, test_app};

    #[tokio::test]
    async fn test_viewer_cannot_create() {
        let app = test_app();
        let cookie = login_as(&app, "viewer").await;
        let body = json!({
            "title": "Gloria", "category": "Liturgi", "voicing": "satb", "price": 30000
        });
        let (status, _) = send(&app, json_body(&body, request("POST", "/api/products", Some(&cookie)))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_product_rejected_before_database() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;
        let body = json!({
            "title": "", "category": "Liturgi", "voicing": "satb", "price": 30000
        });
        let (status, body) =
            send(&app, json_body(&body, request("POST", "/api/products", Some(&cookie)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "title is required");
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;
        let body = json!({
            "title": "Gloria", "category": "Liturgi", "voicing": "satb", "price": -5
        });
        let (status, _) = send(
            &app,
            json_body(&body, request("PUT", "/api/products/3", Some(&cookie))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_viewer_cannot_delete() {
        let app = test_app();
        let cookie = login_as(&app, "viewer").await;
        let (status, _) = send(
            &app,
            request("DELETE", "/api/products/3", Some(&cookie)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
