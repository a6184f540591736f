//! Indonesian mobile phone numbers.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone number contains invalid characters")]
    InvalidCharacters,
    #[error("phone number must start with 08, 628 or +628")]
    NotIndonesianMobile,
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength { min: usize, max: usize },
}

/// A mobile number normalized to international form without the plus,
/// e.g. `6281234567890`.
///
/// Accepts the spellings customers actually type: `0812-3456-7890`,
/// `+62 812 3456 7890`, `6281234567890`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    const MIN_DIGITS: usize = 10;
    const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] when the input is not an Indonesian mobile number.
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        let trimmed = input.trim();
        let (has_plus, rest) = trimmed
            .strip_prefix('+')
            .map_or((false, trimmed), |rest| (true, rest));

        let mut digits = String::with_capacity(rest.len());
        for ch in rest.chars() {
            match ch {
                '0'..='9' => digits.push(ch),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacters),
            }
        }

        let normalized = if let Some(local) = digits.strip_prefix("08").filter(|_| !has_plus) {
            format!("628{local}")
        } else if digits.starts_with("628") {
            digits
        } else {
            return Err(PhoneError::NotIndonesianMobile);
        };

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&normalized.len()) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local spelling with a leading zero, e.g. `081234567890`.
    #[must_use]
    pub fn local(&self) -> String {
        format!("0{}", self.0.get(2..).unwrap_or_default())
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_common_spellings() {
        for input in [
            "081234567890",
            "0812-3456-7890",
            "+62 812 3456 7890",
            "6281234567890",
            "+62 (812) 3456.7890",
        ] {
            assert_eq!(PhoneNumber::parse(input).unwrap().as_str(), "6281234567890", "{input}");
        }
    }

    #[test]
    fn test_local_and_display() {
        let phone = PhoneNumber::parse("081234567890").unwrap();
        assert_eq!(phone.local(), "081234567890");
        assert_eq!(phone.to_string(), "+6281234567890");
    }

    #[test]
    fn test_rejects_non_mobile() {
        assert_eq!(
            PhoneNumber::parse("0215551234"),
            Err(PhoneError::NotIndonesianMobile)
        );
        assert_eq!(
            PhoneNumber::parse("+6581234567"),
            Err(PhoneError::NotIndonesianMobile)
        );
        assert_eq!(
            PhoneNumber::parse("+081234567890"),
            Err(PhoneError::NotIndonesianMobile)
        );
    }

    #[test]
    fn test_rejects_bad_characters_and_lengths() {
        assert_eq!(
            PhoneNumber::parse("0812abc"),
            Err(PhoneError::InvalidCharacters)
        );
        assert!(matches!(
            PhoneNumber::parse("08123"),
            Err(PhoneError::InvalidLength { .. })
        ));
        assert!(matches!(
            PhoneNumber::parse("0812345678901234"),
            Err(PhoneError::InvalidLength { .. })
        ));
    }
}
