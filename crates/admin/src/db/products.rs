//! Product repository for the back-office.
//!
//! Unlike the storefront, every query here sees unpublished products too.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use partitur_core::search::like_pattern;
use partitur_core::{ComposerId, Page, ProductId, Rupiah, Voicing};

use super::{RepositoryError, write_error};
use crate::models::catalog::{ComposerRef, Product, ProductDraft, ProductQuery};

const PRODUCT_COLUMNS: &str = "p.id, p.title, p.slug, p.description, p.composer_id, \
     c.name AS composer_name, p.arranger, p.category, p.voicing, p.price, p.page_count, \
     p.cover_image_url, p.preview_url, p.pdf_path, p.is_published, p.is_featured, p.in_stock, \
     p.created_at, p.updated_at";

const PRODUCT_FROM: &str = "FROM products p LEFT JOIN composers c ON c.id = p.composer_id";

const SLUG_TAKEN: &str = "slug already exists";
const UNKNOWN_COMPOSER: &str = "composer does not exist";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    slug: String,
    description: String,
    composer_id: Option<ComposerId>,
    composer_name: Option<String>,
    arranger: Option<String>,
    category: String,
    voicing: Voicing,
    price: Rupiah,
    page_count: Option<i32>,
    cover_image_url: Option<String>,
    preview_url: Option<String>,
    pdf_path: Option<String>,
    is_published: bool,
    is_featured: bool,
    in_stock: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let composer = row
            .composer_id
            .zip(row.composer_name)
            .map(|(id, name)| ComposerRef { id, name });

        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            composer,
            arranger: row.arranger,
            category: row.category,
            voicing: row.voicing,
            price: row.price,
            price_display: row.price.display(),
            page_count: row.page_count,
            cover_image_url: row.cover_image_url,
            preview_url: row.preview_url,
            pdf_path: row.pdf_path,
            is_published: row.is_published,
            is_featured: row.is_featured,
            in_stock: row.in_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product writes and unfiltered reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, query: &ProductQuery) -> Result<Page<Product>, RepositoryError> {
        let mut count_query = QueryBuilder::new(format!("SELECT COUNT(*) {PRODUCT_FROM}"));
        push_filters(&mut count_query, query);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut select = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM}"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(i64::from(query.per_page))
            .push(" OFFSET ")
            .push_bind(Page::<()>::offset(query.page, query.per_page));

        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(Product::from).collect(),
            query.page,
            query.per_page,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::InvalidReference` if the composer does not exist.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO products
                (title, slug, description, composer_id, arranger, category, voicing, price,
                 page_count, cover_image_url, preview_url, pdf_path,
                 is_published, is_featured, in_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            ",
        )
        .bind(&draft.title)
        .bind(draft.slug.as_str())
        .bind(&draft.description)
        .bind(draft.composer_id)
        .bind(draft.arranger.as_deref())
        .bind(&draft.category)
        .bind(draft.voicing)
        .bind(draft.price)
        .bind(draft.page_count)
        .bind(draft.cover_image_url.as_deref())
        .bind(draft.preview_url.as_deref())
        .bind(draft.pdf_path.as_deref())
        .bind(draft.is_published)
        .bind(draft.is_featured)
        .bind(draft.in_stock)
        .fetch_one(self.pool)
        .await
        .map_err(|e| write_error(e, SLUG_TAKEN, UNKNOWN_COMPOSER))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Insert a product or overwrite the one with the same slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference` if the composer does not exist.
    pub async fn upsert_by_slug(&self, draft: &ProductDraft) -> Result<ProductId, RepositoryError> {
        sqlx::query_scalar(
            r"
            INSERT INTO products
                (title, slug, description, composer_id, arranger, category, voicing, price,
                 page_count, cover_image_url, preview_url, pdf_path,
                 is_published, is_featured, in_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (slug) DO UPDATE
            SET title = EXCLUDED.title, description = EXCLUDED.description,
                composer_id = EXCLUDED.composer_id, arranger = EXCLUDED.arranger,
                category = EXCLUDED.category, voicing = EXCLUDED.voicing,
                price = EXCLUDED.price, page_count = EXCLUDED.page_count,
                cover_image_url = EXCLUDED.cover_image_url,
                preview_url = EXCLUDED.preview_url, pdf_path = EXCLUDED.pdf_path,
                is_published = EXCLUDED.is_published, is_featured = EXCLUDED.is_featured,
                in_stock = EXCLUDED.in_stock, updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(&draft.title)
        .bind(draft.slug.as_str())
        .bind(&draft.description)
        .bind(draft.composer_id)
        .bind(draft.arranger.as_deref())
        .bind(&draft.category)
        .bind(draft.voicing)
        .bind(draft.price)
        .bind(draft.page_count)
        .bind(draft.cover_image_url.as_deref())
        .bind(draft.preview_url.as_deref())
        .bind(draft.pdf_path.as_deref())
        .bind(draft.is_published)
        .bind(draft.is_featured)
        .bind(draft.in_stock)
        .fetch_one(self.pool)
        .await
        .map_err(|e| write_error(e, SLUG_TAKEN, UNKNOWN_COMPOSER))
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::InvalidReference` if the composer does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET title = $2, slug = $3, description = $4, composer_id = $5, arranger = $6,
                category = $7, voicing = $8, price = $9, page_count = $10,
                cover_image_url = $11, preview_url = $12, pdf_path = $13,
                is_published = $14, is_featured = $15, in_stock = $16,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&draft.title)
        .bind(draft.slug.as_str())
        .bind(&draft.description)
        .bind(draft.composer_id)
        .bind(draft.arranger.as_deref())
        .bind(&draft.category)
        .bind(draft.voicing)
        .bind(draft.price)
        .bind(draft.page_count)
        .bind(draft.cover_image_url.as_deref())
        .bind(draft.preview_url.as_deref())
        .bind(draft.pdf_path.as_deref())
        .bind(draft.is_published)
        .bind(draft.is_featured)
        .bind(draft.in_stock)
        .execute(self.pool)
        .await
        .map_err(|e| write_error(e, SLUG_TAKEN, UNKNOWN_COMPOSER))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Past transaction items keep their title and price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE TRUE");

    if let Some(published) = query.published {
        builder.push(" AND p.is_published = ").push_bind(published);
    }

    if let Some(q) = &query.q {
        let pattern = like_pattern(q);
        builder
            .push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.slug ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
