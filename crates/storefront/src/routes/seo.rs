//! Sitemap and robots.txt.

use askama::Template;
use axum::{
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::models::SitemapEntry;
use crate::seo::{absolute_url, robots_txt};
use crate::state::AppState;

const SITEMAP_MAX_AGE: &str = "public, max-age=3600";

/// Pages listed before the catalog entries.
const STATIC_PATHS: &[&str] = &["/", "/products", "/composers"];

pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<String>,
}

#[derive(Template)]
#[template(path = "sitemap.xml")]
pub struct SitemapTemplate {
    pub urls: Vec<SitemapUrl>,
}

fn sitemap_urls(base_url: &str, entries: Vec<SitemapEntry>) -> Vec<SitemapUrl> {
    let fixed = STATIC_PATHS.iter().map(|path| SitemapUrl {
        loc: absolute_url(base_url, path),
        lastmod: None,
    });
    let catalog = entries.into_iter().map(|entry| SitemapUrl {
        loc: absolute_url(base_url, &entry.path),
        lastmod: entry
            .last_modified
            .map(|at| at.format("%Y-%m-%d").to_string()),
    });
    fixed.chain(catalog).collect()
}

/// `GET /sitemap.xml`.
///
/// # Errors
///
/// Returns 500 if the database query or rendering fails.
#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> Result<Response> {
    let entries = CatalogRepository::new(state.pool())
        .sitemap_entries()
        .await?;

    let xml = SitemapTemplate {
        urls: sitemap_urls(&state.config().base_url, entries),
    }
    .render()
    .map_err(|e| AppError::Internal(format!("Sitemap rendering failed: {e}")))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/xml; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static(SITEMAP_MAX_AGE)),
        ],
        xml,
    )
        .into_response())
}

/// `GET /robots.txt`.
pub async fn robots(State(state): State<AppState>) -> Response {
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static(SITEMAP_MAX_AGE)),
        ],
        robots_txt(&state.config().base_url),
    )
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn test_sitemap_lists_static_pages_first() {
        let entries = vec![SitemapEntry {
            path: "/products/ave-verum".to_string(),
            last_modified: Some(Utc.with_ymd_and_hms(2026, 9, 30, 8, 0, 0).unwrap()),
        }];
        let urls = sitemap_urls("https://partitur.id", entries);

        assert_eq!(urls.len(), 4);
        assert_eq!(urls[0].loc, "https://partitur.id/");
        assert_eq!(urls[3].loc, "https://partitur.id/products/ave-verum");
        assert_eq!(urls[3].lastmod.as_deref(), Some("2026-09-30"));
    }

    #[test]
    fn test_sitemap_renders_xml() {
        let xml = SitemapTemplate {
            urls: vec![
                SitemapUrl {
                    loc: "https://partitur.id/".to_string(),
                    lastmod: None,
                },
                SitemapUrl {
                    loc: "https://partitur.id/composers/pontas-purba".to_string(),
                    lastmod: Some("2026-10-01".to_string()),
                },
            ],
        }
        .render()
        .unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://partitur.id/composers/pontas-purba</loc>"));
        assert!(xml.contains("<lastmod>2026-10-01</lastmod>"));
        assert_eq!(xml.matches("<lastmod>").count(), 1);
    }
}
