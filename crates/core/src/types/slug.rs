//! URL slugs for product and composer pages.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugError {
    #[error("slug cannot be empty")]
    Empty,
    #[error("slug must be at most {0} characters")]
    TooLong(usize),
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidCharacters,
}

/// A URL-safe identifier such as `indonesia-pusaka-satb`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub const MAX_LENGTH: usize = 120;

    /// Validate an existing slug.
    ///
    /// # Errors
    ///
    /// Returns a [`SlugError`] if the value is empty, too long, or not in
    /// canonical form.
    pub fn parse(value: &str) -> Result<Self, SlugError> {
        if value.is_empty() {
            return Err(SlugError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong(Self::MAX_LENGTH));
        }
        let valid_chars = value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_chars || value.starts_with('-') || value.ends_with('-') || value.contains("--")
        {
            return Err(SlugError::InvalidCharacters);
        }
        Ok(Self(value.to_string()))
    }

    /// Derive a slug from a human title.
    ///
    /// Accented Latin letters are folded to ASCII, everything else that is
    /// not alphanumeric becomes a separator.
    ///
    /// ```
    /// use partitur_core::Slug;
    ///
    /// let slug = Slug::from_title("Ave María (SATB) - arr. Budi").unwrap();
    /// assert_eq!(slug.as_str(), "ave-maria-satb-arr-budi");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `SlugError::Empty` when nothing usable remains.
    pub fn from_title(title: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(title.len());
        let mut pending_separator = false;

        for ch in title.chars().map(fold_accent) {
            if ch.is_ascii_alphanumeric() {
                if pending_separator && !slug.is_empty() {
                    slug.push('-');
                }
                pending_separator = false;
                slug.push(ch.to_ascii_lowercase());
            } else if ch != '\'' {
                pending_separator = true;
            }
        }

        if slug.len() > Self::MAX_LENGTH {
            slug.truncate(Self::MAX_LENGTH);
            while slug.ends_with('-') {
                slug.pop();
            }
        }

        Self::parse(&slug)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Map common accented Latin letters to their ASCII base.
const fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ñ' | 'Ñ' => 'n',
        'ç' | 'Ç' => 'c',
        other => other,
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_title() {
        assert_eq!(
            Slug::from_title("Indonesia Pusaka").unwrap().as_str(),
            "indonesia-pusaka"
        );
        assert_eq!(
            Slug::from_title("  Gloria!!  in Excelsis -- Deo ").unwrap().as_str(),
            "gloria-in-excelsis-deo"
        );
        assert_eq!(
            Slug::from_title("O'Sole Mio").unwrap().as_str(),
            "osole-mio"
        );
    }

    #[test]
    fn test_from_title_empty() {
        assert_eq!(Slug::from_title("!!! ???"), Err(SlugError::Empty));
    }

    #[test]
    fn test_from_title_truncates() {
        let slug = Slug::from_title(&"ab ".repeat(100)).unwrap();
        assert!(slug.as_str().len() <= Slug::MAX_LENGTH);
        assert!(!slug.as_str().ends_with('-'));
    }

    #[test]
    fn test_parse() {
        assert!(Slug::parse("ampar-ampar-pisang").is_ok());
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("Ada-Huruf-Besar"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("-awal"), Err(SlugError::InvalidCharacters));
        assert_eq!(Slug::parse("dua--strip"), Err(SlugError::InvalidCharacters));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Slug>("\"bengawan-solo\"").is_ok());
        assert!(serde_json::from_str::<Slug>("\"Bengawan Solo\"").is_err());
    }
}
