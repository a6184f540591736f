//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (browser front end on another origin)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Security headers (CSP, framing, referrer)
//! 7. Rate limiting (governor) on payment creation and log intake

pub mod cors;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use cors::cors_layer;
pub use rate_limit::{client_log_rate_limiter, payment_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
