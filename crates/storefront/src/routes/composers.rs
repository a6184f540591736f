//! Composer route handlers.

use axum::{
    extract::{Path, State},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::models::{ComposerDetail, ComposerSummary, ProductSummary};
use crate::routes::{cached, public_json, store_settings};
use crate::seo::PageMeta;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ComposerWithProducts {
    composer: ComposerDetail,
    products: Vec<ProductSummary>,
}

/// Composer profile response.
#[derive(Debug, Serialize)]
pub struct ComposerPage {
    pub composer: ComposerDetail,
    pub products: Vec<ProductSummary>,
    pub meta: PageMeta,
}

/// All composers with their published product counts.
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Response> {
    let composers: Vec<ComposerSummary> = cached(&state, "composers", || async {
        Ok(CatalogRepository::new(state.pool()).composers().await?)
    })
    .await?;

    Ok(public_json(composers))
}

/// A composer's profile and published scores.
///
/// # Errors
///
/// Returns 404 if no composer has this slug.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Response> {
    let slug = slug.to_lowercase();
    let key = format!("composer:{slug}");

    let found = if let Some(found) = state.cache().get_json::<ComposerWithProducts>(&key).await {
        found
    } else {
        let repo = CatalogRepository::new(state.pool());
        let composer = repo
            .composer_by_slug(&slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Composer {slug} not found")))?;
        let products = repo.products_by_composer(composer.id).await?;
        let found = ComposerWithProducts { composer, products };
        state.cache().set_json(&key, &found).await;
        found
    };

    let settings = store_settings(&state).await?;
    let meta = PageMeta::composer(&settings.store_name, &state.config().base_url, &found.composer);

    Ok(public_json(ComposerPage {
        composer: found.composer,
        products: found.products,
        meta,
    }))
}
