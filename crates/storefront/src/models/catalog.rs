//! Catalog domain types: scores, composers and listing filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partitur_core::{ComposerId, ProductId, Rupiah, Voicing};

/// Default page size for product listings.
pub const DEFAULT_PER_PAGE: u32 = 12;
/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 48;
/// Longest search term accepted; longer input is cut.
const MAX_QUERY_CHARS: usize = 100;

/// Product card shown in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub composer: Option<ComposerRef>,
    pub arranger: Option<String>,
    pub category: String,
    pub voicing: Voicing,
    pub voicing_label: String,
    pub price: Rupiah,
    pub price_display: String,
    pub cover_image_url: Option<String>,
    pub is_featured: bool,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
}

/// Full product page data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub summary: ProductSummary,
    pub description: String,
    pub page_count: Option<i32>,
    pub preview_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Name and slug of a product's composer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposerRef {
    pub id: ComposerId,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerSummary {
    pub id: ComposerId,
    pub name: String,
    pub slug: String,
    pub photo_url: Option<String>,
    pub product_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerDetail {
    pub id: ComposerId,
    pub name: String,
    pub slug: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub product_count: i64,
}

/// Current sellable state of a product, used when adding to the cart and at
/// checkout.
#[derive(Debug, Clone)]
pub struct PurchasableProduct {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub composer_name: Option<String>,
    pub price: Rupiah,
    pub cover_image_url: Option<String>,
    pub is_published: bool,
    pub in_stock: bool,
}

impl PurchasableProduct {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.is_published && self.in_stock
    }
}

/// One `<url>` in the sitemap.
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    pub path: String,
    pub last_modified: Option<DateTime<Utc>>,
}

// =============================================================================
// Listing filters
// =============================================================================

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Title,
}

impl ProductSort {
    /// Parse a `sort` query value; unknown values fall back to newest.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("price_asc") => Self::PriceAsc,
            Some("price_desc") => Self::PriceDesc,
            Some("title") => Self::Title,
            _ => Self::Newest,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Title => "title",
        }
    }

    /// `ORDER BY` clause for the products query.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id DESC",
            Self::Title => "LOWER(p.title) ASC, p.id ASC",
        }
    }
}

/// Raw `/api/products` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub voicing: Option<String>,
    pub composer: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Normalised listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub voicing: Option<Voicing>,
    /// Composer slug.
    pub composer: Option<String>,
    pub sort: ProductSort,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            q: None,
            category: None,
            voicing: None,
            composer: None,
            sort: ProductSort::Newest,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ProductFilter {
    /// Normalise query parameters.
    ///
    /// Blank values are dropped, the page is at least 1 and the page size is
    /// clamped to `1..=48`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the bad value when `voicing` is not a known
    /// arrangement.
    pub fn from_params(params: ProductListParams) -> Result<Self, String> {
        let voicing = non_blank(params.voicing)
            .map(|v| v.parse::<Voicing>())
            .transpose()?;

        Ok(Self {
            q: non_blank(params.q).map(|q| q.chars().take(MAX_QUERY_CHARS).collect()),
            category: non_blank(params.category),
            voicing,
            composer: non_blank(params.composer).map(|c| c.to_lowercase()),
            sort: ProductSort::parse(params.sort.as_deref()),
            page: params.page.unwrap_or(1).max(1),
            per_page: params
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        })
    }

    /// Cache key that is identical for equivalent filters.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "products:q={}|category={}|voicing={}|composer={}|sort={}|page={}|per_page={}",
            self.q.as_deref().unwrap_or_default().to_lowercase(),
            self.category.as_deref().unwrap_or_default().to_lowercase(),
            self.voicing.map(Voicing::as_str).unwrap_or_default(),
            self.composer.as_deref().unwrap_or_default(),
            self.sort.as_str(),
            self.page,
            self.per_page,
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        let filter = ProductFilter::from_params(ProductListParams::default()).unwrap();
        assert_eq!(filter, ProductFilter::default());
    }

    #[test]
    fn test_filter_clamps_paging() {
        let filter = ProductFilter::from_params(ProductListParams {
            page: Some(0),
            per_page: Some(500),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, MAX_PER_PAGE);

        let filter = ProductFilter::from_params(ProductListParams {
            per_page: Some(0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.per_page, 1);
    }

    #[test]
    fn test_filter_drops_blank_values() {
        let filter = ProductFilter::from_params(ProductListParams {
            q: Some("   ".to_string()),
            category: Some(String::new()),
            voicing: Some(" ".to_string()),
            composer: Some(" Ananda-Sukarlan ".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter.q, None);
        assert_eq!(filter.category, None);
        assert_eq!(filter.voicing, None);
        assert_eq!(filter.composer.as_deref(), Some("ananda-sukarlan"));
    }

    #[test]
    fn test_filter_rejects_unknown_voicing() {
        let result = ProductFilter::from_params(ProductListParams {
            voicing: Some("octet".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(ProductSort::parse(Some("price_asc")), ProductSort::PriceAsc);
        assert_eq!(ProductSort::parse(Some("price_desc")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::parse(Some("title")), ProductSort::Title);
        assert_eq!(ProductSort::parse(Some("random")), ProductSort::Newest);
        assert_eq!(ProductSort::parse(None), ProductSort::Newest);
    }

    #[test]
    fn test_cache_key_is_case_insensitive_for_search() {
        let a = ProductFilter::from_params(ProductListParams {
            q: Some("Gloria".to_string()),
            voicing: Some("SATB".to_string()),
            ..Default::default()
        })
        .unwrap();
        let b = ProductFilter::from_params(ProductListParams {
            q: Some(" gloria ".to_string()),
            voicing: Some("satb".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert!(a.cache_key().contains("voicing=satb"));
    }
}
