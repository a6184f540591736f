//! Gateway order identifiers.
//!
//! Every transaction carries an order id that is sent to Midtrans and comes
//! back in notifications and status lookups. Midtrans limits order ids to 50
//! characters from `[A-Za-z0-9-_.~]`.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderIdError {
    #[error("order id cannot be empty")]
    Empty,
    #[error("order id must be at most {0} characters")]
    TooLong(usize),
    #[error("order id contains characters the payment gateway does not accept")]
    InvalidCharacters,
}

/// A payment-gateway order id such as `PTR-20261018093000-4F2A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId(String);

impl OrderId {
    pub const MAX_LENGTH: usize = 50;
    pub const PREFIX: &'static str = "PTR";

    /// Generate a fresh order id stamped with `now` (UTC).
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: u16 = rand::random();
        Self(format!(
            "{}-{}-{suffix:04X}",
            Self::PREFIX,
            now.format("%Y%m%d%H%M%S")
        ))
    }

    /// Validate an order id received from a client or the gateway.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderIdError`] for empty, oversized or malformed ids.
    pub fn parse(value: &str) -> Result<Self, OrderIdError> {
        if value.is_empty() {
            return Err(OrderIdError::Empty);
        }
        if value.len() > Self::MAX_LENGTH {
            return Err(OrderIdError::TooLong(Self::MAX_LENGTH));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
        {
            return Err(OrderIdError::InvalidCharacters);
        }
        Ok(Self(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderId {
    type Error = OrderIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_generate_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let id = OrderId::generate(now);
        let s = id.as_str();
        assert!(s.starts_with("PTR-20261018093000-"), "{s}");
        assert_eq!(s.len(), "PTR-20261018093000-".len() + 4);
        assert!(OrderId::parse(s).is_ok());
    }

    #[test]
    fn test_parse_rejects_bad_ids() {
        assert_eq!(OrderId::parse(""), Err(OrderIdError::Empty));
        assert_eq!(
            OrderId::parse(&"A".repeat(51)),
            Err(OrderIdError::TooLong(50))
        );
        assert_eq!(
            OrderId::parse("PTR 123"),
            Err(OrderIdError::InvalidCharacters)
        );
        assert_eq!(
            OrderId::parse("../etc/passwd"),
            Err(OrderIdError::InvalidCharacters)
        );
    }

    #[test]
    fn test_parse_accepts_gateway_alphabet() {
        assert!(OrderId::parse("order_1.2~3-x").is_ok());
    }
}
