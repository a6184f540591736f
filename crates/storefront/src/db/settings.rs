//! Store settings (read-only on the storefront).

use sqlx::PgPool;

use partitur_core::StoreSettings;

use super::RepositoryError;

pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load all settings, falling back to defaults for missing keys.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn load(&self) -> Result<StoreSettings, RepositoryError> {
        let rows: Vec<(String, serde_json::Value)> =
            sqlx::query_as("SELECT key, value FROM settings")
                .fetch_all(self.pool)
                .await?;

        Ok(StoreSettings::from_pairs(rows))
    }
}
