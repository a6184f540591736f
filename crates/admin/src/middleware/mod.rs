//! HTTP middleware stack for the back-office.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//! 4. Security headers (strict CSP, no caching)
//! 5. Auth extractors on each protected handler

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{
    RequireAdminAuth, RequireEditor, RequireSuperAdmin, clear_current_admin, set_current_admin,
};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
