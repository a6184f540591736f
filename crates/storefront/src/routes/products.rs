//! Product route handlers.

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Serialize;
use tracing::instrument;

use partitur_core::Page;

use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::models::{Category, ProductDetail, ProductFilter, ProductListParams, ProductSummary};
use crate::routes::{cached, public_json, store_settings};
use crate::seo::PageMeta;
use crate::state::AppState;

/// Number of featured products on the home page.
const FEATURED_LIMIT: i64 = 8;

/// Product detail response.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub product: ProductDetail,
    pub meta: PageMeta,
}

/// Listing response.
#[derive(Debug, Serialize)]
pub struct ProductListPage {
    #[serde(flatten)]
    pub page: Page<ProductSummary>,
    pub meta: PageMeta,
}

/// Filtered, paginated listing of published products.
///
/// # Errors
///
/// Returns 400 for an unknown `voicing`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Response> {
    let filter = ProductFilter::from_params(params).map_err(AppError::BadRequest)?;

    let page: Page<ProductSummary> = cached(&state, &filter.cache_key(), || async {
        Ok(CatalogRepository::new(state.pool())
            .list_products(&filter)
            .await?)
    })
    .await?;

    let settings = store_settings(&state).await?;
    let meta = PageMeta::listing(
        &settings.store_name,
        &state.config().base_url,
        "/products",
        "Choir Sheet Music",
        settings
            .tagline
            .as_deref()
            .unwrap_or("Digital choir scores from Indonesian composers."),
    );

    Ok(public_json(ProductListPage { page, meta }))
}

/// Newest featured products.
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(state))]
pub async fn featured(State(state): State<AppState>) -> Result<Response> {
    let products: Vec<ProductSummary> = cached(&state, "products:featured", || async {
        Ok(CatalogRepository::new(state.pool())
            .featured(FEATURED_LIMIT)
            .await?)
    })
    .await?;

    Ok(public_json(products))
}

/// A published product with its page metadata.
///
/// # Errors
///
/// Returns 404 if the product does not exist or is unpublished.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Response> {
    let key = format!("product:{}", slug.to_lowercase());

    // Misses are not cached so a newly published product shows up at once
    let product = if let Some(product) = state.cache().get_json::<ProductDetail>(&key).await {
        product
    } else {
        let product = CatalogRepository::new(state.pool())
            .product_by_slug(&slug.to_lowercase())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {slug} not found")))?;
        state.cache().set_json(&key, &product).await;
        product
    };

    let settings = store_settings(&state).await?;
    let meta = PageMeta::product(&settings.store_name, &state.config().base_url, &product);

    Ok(public_json(ProductPage { product, meta }))
}

/// Categories of published products.
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Response> {
    let categories: Vec<Category> = cached(&state, "categories", || async {
        Ok(CatalogRepository::new(state.pool()).categories().await?)
    })
    .await?;

    Ok(public_json(categories))
}
