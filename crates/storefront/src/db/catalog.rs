//! Catalog queries: published products, composers and categories.
//!
//! Listing filters are assembled with `sqlx::QueryBuilder` so that every
//! user-supplied value is bound, never interpolated.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use partitur_core::search::like_pattern;
use partitur_core::{ComposerId, Page, ProductId, Rupiah, Voicing};

use super::RepositoryError;
use crate::models::{
    Category, ComposerDetail, ComposerRef, ComposerSummary, ProductDetail, ProductFilter,
    ProductSummary, PurchasableProduct, SitemapEntry,
};

const PRODUCT_COLUMNS: &str = "p.id, p.title, p.slug, p.composer_id, \
     c.name AS composer_name, c.slug AS composer_slug, p.arranger, p.category, \
     p.voicing, p.price, p.cover_image_url, p.is_featured, p.in_stock, p.created_at";

const PRODUCT_FROM: &str = "FROM products p LEFT JOIN composers c ON c.id = p.composer_id";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    slug: String,
    composer_id: Option<ComposerId>,
    composer_name: Option<String>,
    composer_slug: Option<String>,
    arranger: Option<String>,
    category: String,
    voicing: Voicing,
    price: Rupiah,
    cover_image_url: Option<String>,
    is_featured: bool,
    in_stock: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductSummary {
    fn from(row: ProductRow) -> Self {
        let composer = match (row.composer_id, row.composer_name, row.composer_slug) {
            (Some(id), Some(name), Some(slug)) => Some(ComposerRef { id, name, slug }),
            _ => None,
        };

        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            composer,
            arranger: row.arranger,
            category: row.category,
            voicing: row.voicing,
            voicing_label: row.voicing.label().to_string(),
            price: row.price,
            price_display: row.price.display(),
            cover_image_url: row.cover_image_url,
            is_featured: row.is_featured,
            in_stock: row.in_stock,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductDetailRow {
    #[sqlx(flatten)]
    base: ProductRow,
    description: String,
    page_count: Option<i32>,
    preview_url: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<ProductDetailRow> for ProductDetail {
    fn from(row: ProductDetailRow) -> Self {
        Self {
            summary: row.base.into(),
            description: row.description,
            page_count: row.page_count,
            preview_url: row.preview_url,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PurchasableRow {
    id: ProductId,
    title: String,
    slug: String,
    composer_name: Option<String>,
    price: Rupiah,
    cover_image_url: Option<String>,
    is_published: bool,
    in_stock: bool,
}

impl From<PurchasableRow> for PurchasableProduct {
    fn from(row: PurchasableRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            composer_name: row.composer_name,
            price: row.price,
            cover_image_url: row.cover_image_url,
            is_published: row.is_published,
            in_stock: row.in_stock,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ComposerSummaryRow {
    id: ComposerId,
    name: String,
    slug: String,
    photo_url: Option<String>,
    product_count: i64,
}

#[derive(sqlx::FromRow)]
struct ComposerDetailRow {
    id: ComposerId,
    name: String,
    slug: String,
    bio: Option<String>,
    photo_url: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List published products matching a filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Page<ProductSummary>, RepositoryError> {
        let mut count_query = QueryBuilder::new(format!("SELECT COUNT(*) {PRODUCT_FROM}"));
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM}"));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(i64::from(filter.per_page))
            .push(" OFFSET ")
            .push_bind(Page::<()>::offset(filter.page, filter.per_page));

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(ProductSummary::from).collect(),
            filter.page,
            filter.per_page,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Newest featured products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM} \
             WHERE p.is_published AND p.is_featured \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductSummary::from).collect())
    }

    /// A published product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let row: Option<ProductDetailRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS}, p.description, p.page_count, p.preview_url, p.updated_at \
             {PRODUCT_FROM} WHERE p.slug = $1 AND p.is_published"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(ProductDetail::from))
    }

    /// Published products of one composer, by title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products_by_composer(
        &self,
        composer_id: ComposerId,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} {PRODUCT_FROM} \
             WHERE p.is_published AND p.composer_id = $1 \
             ORDER BY LOWER(p.title), p.id"
        ))
        .bind(composer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductSummary::from).collect())
    }

    /// Current price and availability of a product, published or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purchasable(
        &self,
        id: ProductId,
    ) -> Result<Option<PurchasableProduct>, RepositoryError> {
        Ok(self.purchasable_many(&[id]).await?.into_iter().next())
    }

    /// Current price and availability of several products.
    ///
    /// Missing ids are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purchasable_many(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<PurchasableProduct>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<PurchasableRow> = sqlx::query_as(
            r"
            SELECT p.id, p.title, p.slug, c.name AS composer_name, p.price,
                   p.cover_image_url, p.is_published, p.in_stock
            FROM products p
            LEFT JOIN composers c ON c.id = p.composer_id
            WHERE p.id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(PurchasableProduct::from).collect())
    }

    /// Categories of published products with counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT category, COUNT(*) AS product_count
            FROM products
            WHERE is_published
            GROUP BY category
            ORDER BY LOWER(category)
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, product_count)| Category {
                name,
                product_count,
            })
            .collect())
    }

    /// All composers with the number of published products each.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn composers(&self) -> Result<Vec<ComposerSummary>, RepositoryError> {
        let rows: Vec<ComposerSummaryRow> = sqlx::query_as(
            r"
            SELECT c.id, c.name, c.slug, c.photo_url,
                   COUNT(p.id) FILTER (WHERE p.is_published) AS product_count
            FROM composers c
            LEFT JOIN products p ON p.composer_id = c.id
            GROUP BY c.id
            ORDER BY LOWER(c.name)
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ComposerSummary {
                id: r.id,
                name: r.name,
                slug: r.slug,
                photo_url: r.photo_url,
                product_count: r.product_count,
            })
            .collect())
    }

    /// A composer by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn composer_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ComposerDetail>, RepositoryError> {
        let row: Option<ComposerDetailRow> = sqlx::query_as(
            "SELECT id, name, slug, bio, photo_url, updated_at FROM composers WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| ComposerDetail {
            id: r.id,
            name: r.name,
            slug: r.slug,
            bio: r.bio,
            photo_url: r.photo_url,
            updated_at: r.updated_at,
        }))
    }

    /// Product and composer pages for the sitemap.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn sitemap_entries(&self) -> Result<Vec<SitemapEntry>, RepositoryError> {
        let products: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT slug, updated_at FROM products WHERE is_published ORDER BY slug",
        )
        .fetch_all(self.pool)
        .await?;

        let composers: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT c.slug, GREATEST(c.updated_at, MAX(p.updated_at)) AS updated_at
            FROM composers c
            JOIN products p ON p.composer_id = c.id AND p.is_published
            GROUP BY c.id
            ORDER BY c.slug
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let products = products.into_iter().map(|(slug, updated_at)| SitemapEntry {
            path: format!("/products/{slug}"),
            last_modified: Some(updated_at),
        });
        let composers = composers.into_iter().map(|(slug, updated_at)| SitemapEntry {
            path: format!("/composers/{slug}"),
            last_modified: Some(updated_at),
        });

        Ok(products.chain(composers).collect())
    }
}

/// Append the `WHERE` clause shared by the listing and its count.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    query.push(" WHERE p.is_published");

    if let Some(term) = &filter.q {
        let pattern = like_pattern(term);
        query
            .push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.arranger ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &filter.category {
        query
            .push(" AND LOWER(p.category) = LOWER(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(voicing) = filter.voicing {
        query.push(" AND p.voicing = ").push_bind(voicing);
    }
    if let Some(composer) = &filter.composer {
        query.push(" AND c.slug = ").push_bind(composer.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductSort;

    #[test]
    fn test_push_filters_binds_every_value() {
        let filter = ProductFilter {
            q: Some("gloria".to_string()),
            category: Some("Rohani".to_string()),
            voicing: Some(Voicing::Satb),
            composer: Some("ananda-sukarlan".to_string()),
            sort: ProductSort::Title,
            page: 1,
            per_page: 12,
        };
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT 1 FROM products p");
        push_filters(&mut query, &filter);
        let sql = query.sql();

        assert!(sql.contains("p.title ILIKE $1"));
        assert!(sql.contains("p.arranger ILIKE $3"));
        assert!(sql.contains("LOWER(p.category) = LOWER($4)"));
        assert!(sql.contains("p.voicing = $5"));
        assert!(sql.contains("c.slug = $6"));
        assert!(!sql.contains("gloria"));
    }

    #[test]
    fn test_push_filters_default_only_published() {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT 1 FROM products p");
        push_filters(&mut query, &ProductFilter::default());
        assert_eq!(query.sql(), "SELECT 1 FROM products p WHERE p.is_published");
    }
}
