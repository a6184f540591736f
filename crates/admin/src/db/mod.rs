//! Database operations for the back-office.
//!
//! The admin shares the storefront's database.
//!
//! # Tables
//!
//! - `admin_users` - staff accounts (argon2 password hashes)
//! - `products`, `composers` - the catalog, including unpublished products
//! - `transactions`, `transaction_items` - purchases and manual status changes
//! - `settings` - store name, tagline, contact and logo
//! - `tower_sessions.admin_session` - admin session storage
//!
//! # Migrations
//!
//! Migrations live in the workspace `migrations/` directory and are run via:
//! ```bash
//! cargo run -p partitur-cli -- migrate
//! ```

pub mod admin_users;
pub mod composers;
pub mod dashboard;
pub mod products;
pub mod settings;
pub mod transactions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use composers::ComposerRepository;
pub use dashboard::DashboardRepository;
pub use products::ProductRepository;
pub use settings::SettingsRepository;
pub use transactions::TransactionRepository;

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

    /// Constraint violation (e.g., duplicate slug, composer still in use).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A referenced row does not exist (e.g., unknown composer id).
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

/// Map unique and foreign-key violations on a write to their repository errors.
fn write_error(e: sqlx::Error, unique: &str, reference: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(unique.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::InvalidReference(reference.to_owned());
        }
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
