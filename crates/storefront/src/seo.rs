//! Page metadata for search engines and link previews.
//!
//! Catalog endpoints return a [`PageMeta`] next to their data so the front
//! end can render `<title>`, Open Graph tags and JSON-LD without knowing the
//! store's URLs.

use serde::Serialize;
use serde_json::json;

use crate::models::{ComposerDetail, ProductDetail};

/// Longest meta description search engines show.
pub const MAX_DESCRIPTION_CHARS: usize = 160;

/// Metadata for one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    pub og_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_ld: Option<serde_json::Value>,
}

impl PageMeta {
    /// Metadata for a listing page such as `/products`.
    #[must_use]
    pub fn listing(store_name: &str, base_url: &str, path: &str, title: &str, description: &str) -> Self {
        Self {
            title: format!("{title} | {store_name}"),
            description: meta_description(description),
            canonical_url: absolute_url(base_url, path),
            og_image: None,
            og_type: "website",
            json_ld: None,
        }
    }

    /// Metadata for a product page, with a schema.org `Product`.
    #[must_use]
    pub fn product(store_name: &str, base_url: &str, product: &ProductDetail) -> Self {
        let summary = &product.summary;
        let canonical_url = absolute_url(base_url, &format!("/products/{}", summary.slug));

        let description_source = if product.description.trim().is_empty() {
            let composer = summary
                .composer
                .as_ref()
                .map_or_else(String::new, |c| format!(" by {}", c.name));
            format!(
                "{}{composer}. {} score for {} choir.",
                summary.title, summary.category, summary.voicing_label
            )
        } else {
            product.description.clone()
        };
        let description = meta_description(&description_source);

        let availability = if summary.in_stock {
            "https://schema.org/InStock"
        } else {
            "https://schema.org/OutOfStock"
        };

        let mut ld = json!({
            "@context": "https://schema.org",
            "@type": "Product",
            "name": summary.title,
            "description": description,
            "sku": summary.id.to_string(),
            "category": summary.category,
            "url": canonical_url,
            "offers": {
                "@type": "Offer",
                "price": summary.price.amount().to_string(),
                "priceCurrency": "IDR",
                "availability": availability,
                "url": canonical_url,
            },
        });
        if let Some(composer) = &summary.composer {
            ld["brand"] = json!({ "@type": "Brand", "name": composer.name });
            ld["author"] = json!({
                "@type": "Person",
                "name": composer.name,
                "url": absolute_url(base_url, &format!("/composers/{}", composer.slug)),
            });
        }
        if let Some(image) = &summary.cover_image_url {
            ld["image"] = json!(image);
        }

        Self {
            title: format!("{} | {store_name}", summary.title),
            description,
            canonical_url,
            og_image: summary.cover_image_url.clone(),
            og_type: "product",
            json_ld: Some(ld),
        }
    }

    /// Metadata for a composer profile, with a schema.org `Person`.
    #[must_use]
    pub fn composer(store_name: &str, base_url: &str, composer: &ComposerDetail) -> Self {
        let canonical_url = absolute_url(base_url, &format!("/composers/{}", composer.slug));
        let description = meta_description(composer.bio.as_deref().unwrap_or_default());
        let description = if description.is_empty() {
            format!("Choir scores by {} at {store_name}.", composer.name)
        } else {
            description
        };

        let mut ld = json!({
            "@context": "https://schema.org",
            "@type": "Person",
            "name": composer.name,
            "url": canonical_url,
            "description": description,
        });
        if let Some(photo) = &composer.photo_url {
            ld["image"] = json!(photo);
        }

        Self {
            title: format!("{} | {store_name}", composer.name),
            description,
            canonical_url,
            og_image: composer.photo_url.clone(),
            og_type: "profile",
            json_ld: Some(ld),
        }
    }
}

/// Collapse whitespace and cut at a word boundary to
/// [`MAX_DESCRIPTION_CHARS`], appending `…` when cut.
#[must_use]
pub fn meta_description(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_DESCRIPTION_CHARS {
        return collapsed;
    }

    // Leave room for the ellipsis.
    let limit = MAX_DESCRIPTION_CHARS - 1;
    let cut: String = collapsed.chars().take(limit).collect();
    let next_is_space = collapsed.chars().nth(limit) == Some(' ');

    let trimmed = if next_is_space {
        cut.as_str()
    } else {
        cut.rfind(' ').map_or(cut.as_str(), |idx| &cut[..idx])
    };

    format!(
        "{}…",
        trimmed.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '.'))
    )
}

/// Join the public base URL and a path.
#[must_use]
pub fn absolute_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `robots.txt` body.
#[must_use]
pub fn robots_txt(base_url: &str) -> String {
    format!(
        "User-agent: *\n\
         Allow: /\n\
         Disallow: /api/\n\
         Disallow: /payment/\n\
         Disallow: /download/\n\
         \n\
         Sitemap: {}\n",
        absolute_url(base_url, "/sitemap.xml")
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use partitur_core::{ComposerId, ProductId, Rupiah, Voicing};

    use super::*;
    use crate::models::{ComposerRef, ProductSummary};

    fn product(description: &str, in_stock: bool) -> ProductDetail {
        let now = Utc::now();
        ProductDetail {
            summary: ProductSummary {
                id: ProductId::new(7),
                title: "Gloria".to_string(),
                slug: "gloria".to_string(),
                composer: Some(ComposerRef {
                    id: ComposerId::new(2),
                    name: "Alfred Simanjuntak".to_string(),
                    slug: "alfred-simanjuntak".to_string(),
                }),
                arranger: None,
                category: "Liturgi".to_string(),
                voicing: Voicing::Satb,
                voicing_label: "SATB".to_string(),
                price: Rupiah::new(150_000).unwrap(),
                price_display: "Rp 150.000".to_string(),
                cover_image_url: Some("https://cdn.partitur.id/gloria.webp".to_string()),
                is_featured: false,
                in_stock,
                created_at: now,
            },
            description: description.to_string(),
            page_count: Some(8),
            preview_url: None,
            updated_at: now,
        }
    }

    #[test]
    fn test_short_description_unchanged() {
        assert_eq!(meta_description("  Ave   Maria\n for SATB "), "Ave Maria for SATB");
    }

    #[test]
    fn test_long_description_cut_at_word() {
        let text = "kata ".repeat(60);
        let out = meta_description(&text);
        assert!(out.chars().count() <= MAX_DESCRIPTION_CHARS);
        assert!(out.ends_with("kata…"));
    }

    #[test]
    fn test_long_single_word_is_hard_cut() {
        let out = meta_description(&"a".repeat(300));
        assert_eq!(out.chars().count(), MAX_DESCRIPTION_CHARS);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_product_json_ld() {
        let meta = PageMeta::product("Partitur", "https://partitur.id/", &product("", true));
        assert_eq!(meta.canonical_url, "https://partitur.id/products/gloria");
        assert_eq!(meta.title, "Gloria | Partitur");
        assert_eq!(meta.og_type, "product");
        assert!(meta.description.contains("Alfred Simanjuntak"));

        let ld = meta.json_ld.unwrap();
        assert_eq!(ld["@type"], "Product");
        assert_eq!(ld["offers"]["priceCurrency"], "IDR");
        assert_eq!(ld["offers"]["price"], "150000");
        assert_eq!(ld["offers"]["availability"], "https://schema.org/InStock");
        assert_eq!(ld["author"]["@type"], "Person");
    }

    #[test]
    fn test_product_out_of_stock() {
        let meta = PageMeta::product("Partitur", "https://partitur.id", &product("Lagu natal.", false));
        let ld = meta.json_ld.unwrap();
        assert_eq!(ld["offers"]["availability"], "https://schema.org/OutOfStock");
        assert_eq!(meta.description, "Lagu natal.");
    }

    #[test]
    fn test_composer_meta() {
        let composer = ComposerDetail {
            id: ComposerId::new(2),
            name: "Alfred Simanjuntak".to_string(),
            slug: "alfred-simanjuntak".to_string(),
            bio: None,
            photo_url: None,
            updated_at: Utc::now(),
        };
        let meta = PageMeta::composer("Partitur", "https://partitur.id", &composer);
        assert_eq!(meta.json_ld.unwrap()["@type"], "Person");
        assert_eq!(meta.description, "Choir scores by Alfred Simanjuntak at Partitur.");
    }

    #[test]
    fn test_robots_txt() {
        let robots = robots_txt("https://partitur.id");
        assert!(robots.contains("Disallow: /api/"));
        assert!(robots.contains("Disallow: /download/"));
        assert!(robots.contains("Sitemap: https://partitur.id/sitemap.xml"));
    }
}
