//! Database operations for the storefront.
//!
//! # Tables
//!
//! - `products`, `composers` - the catalog (read-only here)
//! - `transactions`, `transaction_items` - purchases created at checkout
//! - `settings` - store name, tagline, contact and logo
//! - `tower_sessions.session` - session storage (carts)
//!
//! # Migrations
//!
//! Migrations live in the workspace `migrations/` directory and are run via:
//! ```bash
//! cargo run -p partitur-cli -- migrate
//! ```

pub mod catalog;
pub mod settings;
pub mod transactions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::CatalogRepository;
pub use settings::SettingsRepository;
pub use transactions::{GatewayUpdate, NewTransaction, NewTransactionItem, TransactionRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate order id).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
