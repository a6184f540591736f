//! Store settings.
//!
//! One row per key with a JSONB value; see [`StoreSettings`].

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

    /// Store every setting in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a write fails; nothing is saved.
    pub async fn save(&self, settings: &StoreSettings) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in settings.to_pairs() {
            upsert(&mut *tx, key, &value).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Store a single key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError> {
        upsert(self.pool, key, value).await
    }
}

async fn upsert<'e, E>(executor: E, key: &str, value: &serde_json::Value) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r"
        INSERT INTO settings (key, value, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;
    Ok(())
}
