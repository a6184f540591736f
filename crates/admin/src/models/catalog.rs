//! Catalog types for the back-office: products (published or not) and
//! composers, plus the validated drafts used for writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use partitur_core::storage::{SCORES_DIR, is_score_path};
use partitur_core::{ComposerId, ProductId, Rupiah, Slug, Voicing};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

const MAX_TITLE_CHARS: usize = 200;
const MAX_CATEGORY_CHARS: usize = 60;
const MAX_COMPOSER_NAME_CHARS: usize = 120;
const MAX_QUERY_CHARS: usize = 100;

/// Input rejected before it reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComposerRef {
    pub id: ComposerId,
    pub name: String,
}

/// A product with every column the back-office edits.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub composer: Option<ComposerRef>,
    pub arranger: Option<String>,
    pub category: String,
    pub voicing: Voicing,
    pub price: Rupiah,
    pub price_display: String,
    pub page_count: Option<i32>,
    pub cover_image_url: Option<String>,
    pub preview_url: Option<String>,
    /// Relative to the storage root.
    pub pdf_path: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `POST /api/products` and `PUT /api/products/{id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub composer_id: Option<ComposerId>,
    #[serde(default)]
    pub arranger: Option<String>,
    pub category: String,
    pub voicing: String,
    pub price: i64,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

const fn default_true() -> bool {
    true
}

/// A product ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub title: String,
    pub slug: Slug,
    pub description: String,
    pub composer_id: Option<ComposerId>,
    pub arranger: Option<String>,
    pub category: String,
    pub voicing: Voicing,
    pub price: Rupiah,
    pub page_count: Option<i32>,
    pub cover_image_url: Option<String>,
    pub preview_url: Option<String>,
    pub pdf_path: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub in_stock: bool,
}

impl ProductDraft {
    /// Validate and normalise product input.
    ///
    /// The slug is derived from the title when absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first bad field.
    pub fn validate(input: ProductInput) -> Result<Self, ValidationError> {
        let title = required(&input.title, "title", MAX_TITLE_CHARS)?;
        let category = required(&input.category, "category", MAX_CATEGORY_CHARS)?;
        let slug = slug_or_title(input.slug.as_deref(), &title)?;
        let voicing = input
            .voicing
            .parse::<Voicing>()
            .map_err(ValidationError::new)?;
        let price = Rupiah::new(input.price)
            .map_err(|_| ValidationError::new("price cannot be negative"))?;

        if input.page_count.is_some_and(|n| n <= 0) {
            return Err(ValidationError::new("page_count must be positive"));
        }

        let pdf_path = optional(input.pdf_path);
        if let Some(path) = &pdf_path
            && !is_score_path(path)
        {
            return Err(ValidationError::new(format!(
                "pdf_path must be a file under {SCORES_DIR}/"
            )));
        }

        if input.is_published && pdf_path.is_none() {
            return Err(ValidationError::new(
                "a published product needs a score file",
            ));
        }

        // Midtrans refuses payments below 1 rupiah.
        if input.is_published && price == Rupiah::ZERO {
            return Err(ValidationError::new(
                "a published product needs a price of at least 1",
            ));
        }

        Ok(Self {
            title,
            slug,
            description: input.description.unwrap_or_default().trim().to_string(),
            composer_id: input.composer_id,
            arranger: optional(input.arranger),
            category,
            voicing,
            price,
            page_count: input.page_count,
            cover_image_url: optional(input.cover_image_url),
            preview_url: optional(input.preview_url),
            pdf_path,
            is_published: input.is_published,
            is_featured: input.is_featured,
            in_stock: input.in_stock,
        })
    }
}

/// Raw `/api/products` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    pub q: Option<String>,
    pub published: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Normalised back-office product listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub published: Option<bool>,
    pub page: u32,
    pub per_page: u32,
}

impl From<ProductListParams> for ProductQuery {
    fn from(params: ProductListParams) -> Self {
        let (page, per_page) = paging(params.page, params.per_page);
        Self {
            q: search_term(params.q),
            published: params.published,
            page,
            per_page,
        }
    }
}

// =============================================================================
// Composers
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Composer {
    pub id: ComposerId,
    pub name: String,
    pub slug: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    /// Products of any publication state.
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposerInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerDraft {
    pub name: String,
    pub slug: Slug,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

impl ComposerDraft {
    /// Validate and normalise composer input.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first bad field.
    pub fn validate(input: ComposerInput) -> Result<Self, ValidationError> {
        let name = required(&input.name, "name", MAX_COMPOSER_NAME_CHARS)?;
        let slug = slug_or_title(input.slug.as_deref(), &name)?;
        Ok(Self {
            name,
            slug,
            bio: optional(input.bio),
            photo_url: optional(input.photo_url),
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// 1-based page and clamped page size.
#[must_use]
pub fn paging(page: Option<u32>, per_page: Option<u32>) -> (u32, u32) {
    (
        page.unwrap_or(1).max(1),
        per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
    )
}

/// Trimmed, length-capped search term; blank means no filter.
#[must_use]
pub fn search_term(q: Option<String>) -> Option<String> {
    q.map(|q| q.trim().chars().take(MAX_QUERY_CHARS).collect::<String>())
        .filter(|q| !q.is_empty())
}

fn required(value: &str, field: &str, max: usize) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::new(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(ValidationError::new(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn slug_or_title(slug: Option<&str>, title: &str) -> Result<Slug, ValidationError> {
    match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => Slug::parse(slug).map_err(|e| ValidationError::new(format!("slug: {e}"))),
        None => Slug::from_title(title).map_err(|e| ValidationError::new(format!("slug: {e}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            title: "  Ave Verum Corpus ".to_string(),
            slug: None,
            description: None,
            composer_id: Some(ComposerId::new(1)),
            arranger: Some("  ".to_string()),
            category: "Liturgi".to_string(),
            voicing: "SATB".to_string(),
            price: 45_000,
            page_count: Some(4),
            cover_image_url: None,
            preview_url: None,
            pdf_path: Some("scores/ave-verum.pdf".to_string()),
            is_published: true,
            is_featured: false,
            in_stock: true,
        }
    }

    #[test]
    fn test_product_draft_derives_slug_and_trims() {
        let draft = ProductDraft::validate(input()).unwrap();
        assert_eq!(draft.title, "Ave Verum Corpus");
        assert_eq!(draft.slug.as_str(), "ave-verum-corpus");
        assert_eq!(draft.voicing, Voicing::Satb);
        assert_eq!(draft.arranger, None);
        assert_eq!(draft.price.amount(), 45_000);
    }

    #[test]
    fn test_product_draft_rejects_bad_fields() {
        let mut bad = input();
        bad.title = " ".to_string();
        assert_eq!(
            ProductDraft::validate(bad).unwrap_err().0,
            "title is required"
        );

        let mut bad = input();
        bad.price = -1;
        assert!(ProductDraft::validate(bad).is_err());

        let mut free = input();
        free.price = 0;
        assert_eq!(
            ProductDraft::validate(free.clone()).unwrap_err().0,
            "a published product needs a price of at least 1"
        );
        free.is_published = false;
        assert!(ProductDraft::validate(free).is_ok());

        let mut bad = input();
        bad.voicing = "orchestra".to_string();
        assert!(ProductDraft::validate(bad).is_err());

        let mut bad = input();
        bad.category = "x".repeat(61);
        assert!(ProductDraft::validate(bad).is_err());

        let mut bad = input();
        bad.slug = Some("Not A Slug".to_string());
        assert!(ProductDraft::validate(bad).is_err());
    }

    #[test]
    fn test_product_draft_checks_score_path() {
        let mut bad = input();
        bad.pdf_path = Some("scores/../../etc/passwd".to_string());
        assert!(ProductDraft::validate(bad).is_err());

        let mut unpublished = input();
        unpublished.pdf_path = None;
        unpublished.is_published = false;
        assert!(ProductDraft::validate(unpublished.clone()).is_ok());

        unpublished.is_published = true;
        assert!(ProductDraft::validate(unpublished).is_err());
    }

    #[test]
    fn test_composer_draft() {
        let draft = ComposerDraft::validate(ComposerInput {
            name: "Pontas Purba".to_string(),
            slug: None,
            bio: Some(String::new()),
            photo_url: None,
        })
        .unwrap();
        assert_eq!(draft.slug.as_str(), "pontas-purba");
        assert_eq!(draft.bio, None);

        assert!(
            ComposerDraft::validate(ComposerInput {
                name: String::new(),
                slug: None,
                bio: None,
                photo_url: None,
            })
            .is_err()
        );
    }

    #[test]
    fn test_paging_and_search_term() {
        assert_eq!(paging(None, None), (1, DEFAULT_PER_PAGE));
        assert_eq!(paging(Some(0), Some(1000)), (1, MAX_PER_PAGE));
        assert_eq!(search_term(Some("  ".to_string())), None);
        assert_eq!(search_term(Some(" gloria ".to_string())).as_deref(), Some("gloria"));
    }
}
