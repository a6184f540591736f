//! Database migration command.
//!
//! Both servers share one database; the migrations live in the workspace
//! `migrations/` directory and are embedded at compile time. The servers
//! never migrate on startup.

use sqlx::migrate::MigrateError;

use super::{ConnectError, connect};

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrateError),
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration
/// fails; a failed migration is rolled back.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    let migrator = sqlx::migrate!("../../migrations");
    tracing::info!(available = migrator.iter().count(), "Running migrations...");
    migrator.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
