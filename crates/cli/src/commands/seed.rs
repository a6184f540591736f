//! Seed the catalog from a YAML file.
//!
//! Composers and products are matched by slug: existing rows are
//! overwritten, new ones inserted, nothing is deleted. A product names its
//! composer by slug, either one from the same file or one already in the
//! database.
//!
//! The whole file is validated before connecting to the database.
//! See `crates/cli/seed/catalog.yaml` for the format.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use partitur_admin::db::{ComposerRepository, ProductRepository};
use partitur_admin::models::{ComposerDraft, ComposerInput, ProductDraft, ProductInput};
use partitur_core::ComposerId;

use super::connect;

/// Top level of a catalog seed file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub composers: Vec<ComposerInput>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// A product entry; takes every product field plus `composer`.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    /// Composer slug.
    #[serde(default)]
    pub composer: Option<String>,
    #[serde(flatten)]
    pub product: ProductInput,
}

/// A validated seed file.
#[derive(Debug)]
pub struct CatalogSeed {
    pub composers: Vec<ComposerDraft>,
    /// Each product with the slug of its composer.
    pub products: Vec<(Option<String>, ProductDraft)>,
}

/// Counts reported after seeding.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub composers: usize,
    pub products: usize,
}

/// Validate every entry, collecting all problems instead of stopping at the
/// first.
///
/// # Errors
///
/// Returns one message per invalid entry or duplicated slug.
pub fn validate(file: CatalogFile) -> Result<CatalogSeed, Vec<String>> {
    let mut errors = Vec::new();

    let mut composers = Vec::with_capacity(file.composers.len());
    let mut composer_slugs = HashSet::new();
    for (i, input) in file.composers.into_iter().enumerate() {
        match ComposerDraft::validate(input) {
            Ok(draft) => {
                if !composer_slugs.insert(draft.slug.as_str().to_owned()) {
                    errors.push(format!("composers[{i}]: duplicate slug `{}`", draft.slug.as_str()));
                }
                composers.push(draft);
            }
            Err(e) => errors.push(format!("composers[{i}]: {e}")),
        }
    }

    let mut products = Vec::with_capacity(file.products.len());
    let mut product_slugs = HashSet::new();
    for (i, entry) in file.products.into_iter().enumerate() {
        let composer = entry
            .composer
            .map(|slug| slug.trim().to_owned())
            .filter(|slug| !slug.is_empty());
        match ProductDraft::validate(entry.product) {
            Ok(draft) => {
                if !product_slugs.insert(draft.slug.as_str().to_owned()) {
                    errors.push(format!("products[{i}]: duplicate slug `{}`", draft.slug.as_str()));
                }
                products.push((composer, draft));
            }
            Err(e) => errors.push(format!("products[{i}]: {e}")),
        }
    }

    if errors.is_empty() {
        Ok(CatalogSeed {
            composers,
            products,
        })
    } else {
        Err(errors)
    }
}

/// Parse a seed file's contents.
///
/// # Errors
///
/// Returns the YAML error for malformed input.
pub fn parse(content: &str) -> Result<CatalogFile, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Seed composers and products from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, a product names an unknown composer, or a database write fails.
pub async fn catalog(path: &Path) -> Result<SeedResult, Box<dyn std::error::Error>> {
    info!(path = %path.display(), "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let file = parse(&content)?;

    let seed = match validate(file) {
        Ok(seed) => seed,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(
        composers = seed.composers.len(),
        products = seed.products.len(),
        "Catalog validated"
    );

    let pool = connect().await?;
    let composer_repo = ComposerRepository::new(&pool);
    let product_repo = ProductRepository::new(&pool);

    let mut result = SeedResult::default();
    let mut composer_ids: HashMap<String, ComposerId> = HashMap::new();

    for draft in &seed.composers {
        let id = composer_repo.upsert_by_slug(draft).await?;
        composer_ids.insert(draft.slug.as_str().to_owned(), id);
        result.composers += 1;
    }

    for (composer, mut draft) in seed.products {
        if let Some(slug) = composer {
            let id = match composer_ids.get(&slug) {
                Some(id) => *id,
                None => composer_repo
                    .id_by_slug(&slug)
                    .await?
                    .ok_or_else(|| format!("product `{}`: unknown composer `{slug}`", draft.slug.as_str()))?,
            };
            composer_ids.insert(slug, id);
            draft.composer_id = Some(id);
        }
        product_repo.upsert_by_slug(&draft).await?;
        result.products += 1;
    }

    info!("Seeding complete!");
    info!("  Composers upserted: {}", result.composers);
    info!("  Products upserted: {}", result.products);

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use partitur_core::Voicing;

    use super::*;

    #[test]
    fn test_sample_file_is_valid() {
        let file = parse(include_str!("../../seed/catalog.yaml")).unwrap();
        let seed = validate(file).unwrap();
        assert!(!seed.composers.is_empty());
        assert!(!seed.products.is_empty());
        assert!(seed.products.iter().any(|(composer, _)| composer.is_some()));
    }

    #[test]
    fn test_product_fields_and_composer_slug() {
        let file = parse(
            r#"
composers:
  - name: Ansgar Sinaga
products:
  - title: Gloria Patri
    composer: ansgar-sinaga
    category: Liturgi
    voicing: ssaa
    price: 45000
"#,
        )
        .unwrap();
        let seed = validate(file).unwrap();
        assert_eq!(seed.composers[0].slug.as_str(), "ansgar-sinaga");
        let (composer, product) = &seed.products[0];
        assert_eq!(composer.as_deref(), Some("ansgar-sinaga"));
        assert_eq!(product.slug.as_str(), "gloria-patri");
        assert_eq!(product.voicing, Voicing::Ssaa);
        assert_eq!(product.price.amount(), 45_000);
        assert!(product.in_stock);
        assert!(!product.is_published);
    }

    #[test]
    fn test_collects_every_error() {
        let file = parse(
            r#"
composers:
  - name: "  "
products:
  - title: Ave Maria
    category: Liturgi
    voicing: satb
    price: -1
  - title: Ave Maria
    category: Liturgi
    voicing: quartet
    price: 1000
"#,
        )
        .unwrap();
        let errors = validate(file).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("composers[0]"));
        assert!(errors[1].starts_with("products[0]"));
        assert!(errors[2].starts_with("products[1]"));
    }

    #[test]
    fn test_duplicate_slugs_rejected() {
        let file = parse(
            r"
products:
  - title: Ave Verum
    category: Liturgi
    voicing: satb
    price: 1000
  - title: Ave Verum Corpus
    slug: ave-verum
    category: Liturgi
    voicing: satb
    price: 2000
",
        )
        .unwrap();
        let errors = validate(file).unwrap_err();
        assert_eq!(errors, vec!["products[1]: duplicate slug `ave-verum`".to_string()]);
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        assert!(parse("songs: []").is_err());
    }
}
