//! HTTP route handlers for the back-office.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                - Liveness
//! GET  /health/ready                          - Readiness (database ping)
//!
//! # Auth
//! POST /api/auth/login                        - Email + password login
//! POST /api/auth/logout                       - End the session
//! GET  /api/auth/me                           - Current admin
//!
//! # Dashboard
//! GET  /api/dashboard                         - Counts, revenue, recent transactions
//!
//! # Catalog (writes need an editor)
//! GET    /api/products                        - All products, filterable
//! POST   /api/products                        - Create
//! GET    /api/products/{id}                   - Detail
//! PUT    /api/products/{id}                   - Replace
//! DELETE /api/products/{id}                   - Delete
//! GET|POST /api/composers, GET|PUT|DELETE /api/composers/{id}
//!
//! # Transactions
//! GET   /api/transactions                     - Filterable listing
//! GET   /api/transactions/{order_id}          - Detail with items
//! PATCH /api/transactions/{order_id}/status   - Manual status change (editor)
//! GET   /transactions/{order_id}/receipt      - Printable HTML receipt
//!
//! # Uploads (editor, multipart field `file`)
//! POST /api/upload-logo                       - Store logo, set `logo_url`
//! POST /api/upload/image                      - Cover or composer photo
//! POST /api/upload/score                      - Score PDF (private)
//!
//! # Settings
//! GET /api/settings, PUT /api/settings (editor)
//!
//! # Admin users (super admin)
//! GET    /api/admin-users
//! POST   /api/admin-users
//! DELETE /api/admin-users/{id}
//! ```

pub mod admin_users;
pub mod auth;
pub mod composers;
pub mod dashboard;
pub mod products;
pub mod settings;
pub mod transactions;
pub mod uploads;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::AdminConfig;
use crate::error::AppError;
use crate::middleware::{create_session_layer, security_headers_middleware};
use crate::state::AppState;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route(
            "/products/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/composers", get(composers::index).post(composers::create))
        .route(
            "/composers/{id}",
            get(composers::show)
                .put(composers::update)
                .delete(composers::destroy),
        )
}

fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(transactions::index))
        .route("/transactions/{order_id}", get(transactions::show))
        .route(
            "/transactions/{order_id}/status",
            patch(transactions::update_status),
        )
}

/// Upload routes; the body limit sits just above the largest accepted file
/// so the handler can answer 413 itself.
fn upload_routes(config: &AdminConfig) -> Router<AppState> {
    Router::new()
        .route("/upload-logo", post(uploads::logo))
        .route("/upload/image", post(uploads::image))
        .route("/upload/score", post(uploads::score))
        .layer(DefaultBodyLimit::max(config.uploads.body_limit()))
}

fn api_routes(config: &AdminConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .route("/dashboard", get(dashboard::show))
        .merge(catalog_routes())
        .merge(transaction_routes())
        .merge(upload_routes(config))
        .route("/settings", get(settings::show).put(settings::update))
        .route(
            "/admin-users",
            get(admin_users::index).post(admin_users::create),
        )
        .route("/admin-users/{id}", delete(admin_users::destroy))
}

/// All back-office routes, without session or tracing layers.
pub fn routes(config: &AdminConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(config))
        .route(
            "/transactions/{order_id}/receipt",
            get(transactions::receipt),
        )
        .fallback(not_found)
}

/// The complete application with its middleware stack.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    routes(state.config())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint; 503 when the database is unreachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use axum::{
        Json,
        body::Body,
        extract::Path,
        http::{Request, header},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

    use partitur_core::{AdminUserId, Email};

    use super::*;
    use crate::config::tests::test_config;
    use crate::middleware::set_current_admin;
    use crate::models::{AdminRole, CurrentAdmin};

    /// State whose pool never connects; only for requests that are answered
    /// before touching the database.
    pub(crate) fn test_state() -> AppState {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/partitur_test")
            .unwrap();
        AppState::new(test_config(), pool)
    }

    /// Test-only login that puts an admin of the given role in the session.
    async fn fake_login(session: Session, Path(role): Path<String>) -> Json<()> {
        let admin = CurrentAdmin {
            id: AdminUserId::new(7),
            email: Email::parse("staf@partitur.id").unwrap(),
            name: "Staf".to_string(),
            role: role.parse::<AdminRole>().unwrap(),
        };
        set_current_admin(&session, &admin).await.unwrap();
        Json(())
    }

    /// Router with in-memory sessions.
    pub(crate) fn test_app() -> Router {
        let state = test_state();
        routes(state.config())
            .route("/test/login/{role}", post(fake_login))
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state)
    }

    /// Session cookie of a freshly logged-in admin with `role`.
    pub(crate) async fn login_as(app: &Router, role: &str) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/test/login/{role}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    pub(crate) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    pub(crate) fn request(method: &str, uri: &str, cookie: Option<&str>) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    pub(crate) fn json_body(value: &serde_json::Value, builder: axum::http::request::Builder) -> Request<Body> {
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, request("GET", "/health", None).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let app = test_app();
        let (status, body) = send(&app, request("GET", "/api/nope", None).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_protected_routes_require_login() {
        let app = test_app();
        for (method, uri) in [
            ("GET", "/api/dashboard"),
            ("GET", "/api/products"),
            ("GET", "/api/transactions"),
            ("GET", "/api/settings"),
            ("GET", "/api/admin-users"),
            ("GET", "/api/auth/me"),
            ("GET", "/transactions/PTR-20261001120000-ABCD/receipt"),
        ] {
            let (status, body) = send(&app, request(method, uri, None).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["message"], "Authentication required");
        }
    }

    #[tokio::test]
    async fn test_me_returns_session_admin() {
        let app = test_app();
        let cookie = login_as(&app, "viewer").await;
        let (status, body) = send(
            &app,
            request("GET", "/api/auth/me", Some(&cookie)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["data"]["email"], "staf@partitur.id");
        assert_eq!(json["data"]["role"], "viewer");
    }

    #[tokio::test]
    async fn test_security_headers() {
        let app = test_app();
        let response = app
            .oneshot(request("GET", "/health", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["cache-control"], "no-store");
    }
}
