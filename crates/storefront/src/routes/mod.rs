//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database ping)
//!
//! # Catalog
//! GET  /api/products                        - Filtered, paginated listing
//! GET  /api/products/featured               - Featured scores
//! GET  /api/products/{slug}                 - Product detail + page meta
//! GET  /api/categories                      - Categories with counts
//! GET  /api/composers                       - Composers with counts
//! GET  /api/composers/{slug}                - Composer profile + scores
//!
//! # Cart (session)
//! GET    /api/cart                          - Current cart
//! DELETE /api/cart                          - Empty the cart
//! POST   /api/cart/items                    - Add a score
//! PATCH  /api/cart/items/{product_id}       - Change quantity
//! DELETE /api/cart/items/{product_id}       - Remove a score
//!
//! # Payment
//! POST /api/payment/create                  - Checkout, returns Snap token
//! GET  /api/payment/status/{order_id}       - Status (refreshed from Midtrans)
//! POST /api/payment/notification            - Midtrans HTTP notification
//! GET  /payment/finish|unfinish|error       - Result pages (HTML)
//!
//! # Downloads
//! GET  /api/orders/{order_id}/downloads     - Files of a paid order
//! GET  /download/{token}/{product_id}       - Stream a PDF
//!
//! # Misc
//! GET  /api/site-config                     - Store settings for the front end
//! POST /api/logs                            - Browser log intake
//! GET  /sitemap.xml, /robots.txt            - SEO
//! GET  /media/images/*                      - Uploaded covers, photos, logo
//! ```

pub mod cart;
pub mod composers;
pub mod downloads;
pub mod logs;
pub mod payment;
pub mod products;
pub mod seo;
pub mod site_config;

use std::future::Future;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use partitur_core::storage::IMAGES_DIR;
use partitur_core::{ApiResponse, StoreSettings};

use crate::db::SettingsRepository;
use crate::error::{AppError, Result};
use crate::middleware::{
    client_log_rate_limiter, cors_layer, create_session_layer, payment_rate_limiter,
    request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Browser cache lifetime for public catalog responses.
const PUBLIC_MAX_AGE: &str = "public, max-age=60";

const SETTINGS_CACHE_KEY: &str = "settings";

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/featured", get(products::featured))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(products::categories))
        .route("/composers", get(composers::index))
        .route("/composers/{slug}", get(composers::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            patch(cart::update).delete(cart::remove),
        )
}

/// Create the payment API routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/create",
            post(payment::create).layer(payment_rate_limiter()),
        )
        .route("/status/{order_id}", get(payment::status))
        .route("/notification", post(payment::notification))
}

/// Create all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/payment", payment_routes())
        .route("/orders/{order_id}/downloads", get(downloads::index))
        .route("/site-config", get(site_config::show))
        .route("/logs", post(logs::ingest).layer(client_log_rate_limiter()))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        .route("/payment/finish", get(payment::finish_page))
        .route("/payment/unfinish", get(payment::unfinish_page))
        .route("/payment/error", get(payment::error_page))
        .route("/download/{token}/{product_id}", get(downloads::file))
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/robots.txt", get(seo::robots))
        .fallback(not_found)
}

/// Public path prefix of uploaded images.
pub const MEDIA_IMAGES_PATH: &str = "/media/images";

/// The complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());
    let cors = cors_layer(&state.config().cors_allowed_origins);
    let images = ServeDir::new(state.config().storage_dir.join(IMAGES_DIR));

    routes()
        .nest_service(MEDIA_IMAGES_PATH, images)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// JSON success envelope with a public cache policy.
pub(crate) fn public_json<T: Serialize>(data: T) -> Response {
    (
        [(header::CACHE_CONTROL, HeaderValue::from_static(PUBLIC_MAX_AGE))],
        Json(ApiResponse::ok(data)),
    )
        .into_response()
}

/// Read through the store cache.
pub(crate) async fn cached<T, F, Fut>(state: &AppState, key: &str, load: F) -> Result<T>
where
    T: Serialize + DeserializeOwned + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Some(value) = state.cache().get_json(key).await {
        return Ok(value);
    }
    let value = load().await?;
    state.cache().set_json(key, &value).await;
    Ok(value)
}

/// Store settings, cached.
pub(crate) async fn store_settings(state: &AppState) -> Result<StoreSettings> {
    cached(state, SETTINGS_CACHE_KEY, || async {
        Ok(SettingsRepository::new(state.pool()).load().await?)
    })
    .await
}
