//! Indonesian rupiah amounts.
//!
//! Prices are whole rupiah. The payment gateway only accepts integer IDR
//! amounts, and reports them back as decimal strings such as `"150000.00"`.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors produced by rupiah arithmetic and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("amount cannot be negative")]
    Negative,
    #[error("amount overflow")]
    Overflow,
    #[error("amount must be a whole number of rupiah")]
    Fractional,
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// A non-negative amount of Indonesian rupiah.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rupiah(i64);

impl Rupiah {
    pub const ZERO: Self = Self(0);

    /// Create an amount.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for negative input.
    pub const fn new(amount: i64) -> Result<Self, MoneyError> {
        if amount < 0 {
            return Err(MoneyError::Negative);
        }
        Ok(Self(amount))
    }

    /// The amount in whole rupiah.
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the sum does not fit.
    pub const fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        match self.0.checked_add(other.0) {
            Some(sum) => Ok(Self(sum)),
            None => Err(MoneyError::Overflow),
        }
    }

    /// Multiply by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the product does not fit.
    pub fn checked_mul(self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Self)
            .ok_or(MoneyError::Overflow)
    }

    /// Sum an iterator of amounts without overflowing.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` when the total does not fit.
    pub fn try_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Result<Self, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// Parse an amount as reported by the payment gateway (`"150000.00"`).
    ///
    /// # Errors
    ///
    /// Rejects malformed, negative and fractional amounts.
    pub fn from_gateway_amount(value: &str) -> Result<Self, MoneyError> {
        let decimal = Decimal::from_str(value.trim())
            .map_err(|_| MoneyError::Invalid(value.to_string()))?;
        if decimal.is_sign_negative() && !decimal.is_zero() {
            return Err(MoneyError::Negative);
        }
        if decimal.fract() != Decimal::ZERO {
            return Err(MoneyError::Fractional);
        }
        decimal.to_i64().map(Self).ok_or(MoneyError::Overflow)
    }

    /// Format for people, e.g. `Rp 150.000`.
    #[must_use]
    pub fn display(self) -> String {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        format!("Rp {grouped}")
    }
}

impl fmt::Display for Rupiah {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl TryFrom<i64> for Rupiah {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Rupiah {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = i64::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rupiah {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rupiah {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rupiah {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Rupiah::new(0).unwrap().display(), "Rp 0");
        assert_eq!(Rupiah::new(500).unwrap().display(), "Rp 500");
        assert_eq!(Rupiah::new(1_000).unwrap().display(), "Rp 1.000");
        assert_eq!(Rupiah::new(150_000).unwrap().display(), "Rp 150.000");
        assert_eq!(Rupiah::new(1_250_000).unwrap().display(), "Rp 1.250.000");
    }

    #[test]
    fn test_negative_rejected() {
        assert_eq!(Rupiah::new(-1), Err(MoneyError::Negative));
        assert!(serde_json::from_str::<Rupiah>("-5").is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Rupiah::new(35_000).unwrap();
        assert_eq!(price.checked_mul(3).unwrap().amount(), 105_000);
        assert_eq!(
            Rupiah::new(i64::MAX).unwrap().checked_add(price),
            Err(MoneyError::Overflow)
        );
        let total = Rupiah::try_sum([price, price, Rupiah::ZERO]).unwrap();
        assert_eq!(total.amount(), 70_000);
        assert_eq!(
            Rupiah::try_sum([Rupiah::new(i64::MAX).unwrap(), price]),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_from_gateway_amount() {
        assert_eq!(Rupiah::from_gateway_amount("150000.00").unwrap().amount(), 150_000);
        assert_eq!(Rupiah::from_gateway_amount("75000").unwrap().amount(), 75_000);
        assert_eq!(
            Rupiah::from_gateway_amount("100.50"),
            Err(MoneyError::Fractional)
        );
        assert_eq!(Rupiah::from_gateway_amount("-10.00"), Err(MoneyError::Negative));
        assert!(matches!(
            Rupiah::from_gateway_amount("abc"),
            Err(MoneyError::Invalid(_))
        ));
    }
}
