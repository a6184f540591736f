//! Composer repository for the back-office.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use partitur_core::ComposerId;

use super::{RepositoryError, write_error};
use crate::models::catalog::{Composer, ComposerDraft};

const COMPOSER_SELECT: &str = r"
    SELECT c.id, c.name, c.slug, c.bio, c.photo_url, c.created_at, c.updated_at,
           (SELECT COUNT(*) FROM products p WHERE p.composer_id = c.id) AS product_count
    FROM composers c
";

#[derive(sqlx::FromRow)]
struct ComposerRow {
    id: ComposerId,
    name: String,
    slug: String,
    bio: Option<String>,
    photo_url: Option<String>,
    product_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ComposerRow> for Composer {
    fn from(row: ComposerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            bio: row.bio,
            photo_url: row.photo_url,
            product_count: row.product_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct ComposerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ComposerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All composers by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Composer>, RepositoryError> {
        let rows: Vec<ComposerRow> =
            sqlx::query_as(&format!("{COMPOSER_SELECT} ORDER BY LOWER(c.name), c.id"))
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(Composer::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ComposerId) -> Result<Option<Composer>, RepositoryError> {
        let row: Option<ComposerRow> = sqlx::query_as(&format!("{COMPOSER_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Composer::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, draft: &ComposerDraft) -> Result<Composer, RepositoryError> {
        let id: ComposerId = sqlx::query_scalar(
            r"
            INSERT INTO composers (name, slug, bio, photo_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&draft.name)
        .bind(draft.slug.as_str())
        .bind(draft.bio.as_deref())
        .bind(draft.photo_url.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| write_error(e, "slug already exists", "invalid reference"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Insert a composer or overwrite the one with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn upsert_by_slug(&self, draft: &ComposerDraft) -> Result<ComposerId, RepositoryError> {
        Ok(sqlx::query_scalar(
            r"
            INSERT INTO composers (name, slug, bio, photo_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE
            SET name = EXCLUDED.name, bio = EXCLUDED.bio, photo_url = EXCLUDED.photo_url,
                updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(&draft.name)
        .bind(draft.slug.as_str())
        .bind(draft.bio.as_deref())
        .bind(draft.photo_url.as_deref())
        .fetch_one(self.pool)
        .await?)
    }

    /// Id of the composer with `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn id_by_slug(&self, slug: &str) -> Result<Option<ComposerId>, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT id FROM composers WHERE slug = $1")
            .bind(slug)
            .fetch_optional(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the composer does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: ComposerId,
        draft: &ComposerDraft,
    ) -> Result<Composer, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE composers
            SET name = $2, slug = $3, bio = $4, photo_url = $5, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(draft.slug.as_str())
        .bind(draft.bio.as_deref())
        .bind(draft.photo_url.as_deref())
        .execute(self.pool)
        .await
        .map_err(|e| write_error(e, "slug already exists", "invalid reference"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a composer with no products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the composer does not exist.
    /// Returns `RepositoryError::Conflict` if products still reference it.
    pub async fn delete(&self, id: ComposerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM composers WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict(
                        "composer still has products".to_owned(),
                    );
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
