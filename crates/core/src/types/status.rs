//! Status and classification enums.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a purchase.
///
/// Derived from the gateway's `transaction_status`/`fraud_status` pair by
/// [`TransactionStatus::from_gateway`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "transaction_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created, waiting for the customer to pay.
    #[default]
    Pending,
    /// Card payment held for fraud review.
    Challenge,
    /// Money received; downloads unlocked.
    Paid,
    /// Denied or failed at the gateway.
    Failed,
    /// The payment window elapsed.
    Expired,
    /// Cancelled by the customer, the merchant or the gateway.
    Cancelled,
    /// Refunded or charged back after payment.
    Refunded,
}

/// Coarse outcome shown on the payment result pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Pending,
    Failed,
}

impl TransactionStatus {
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Challenge,
        Self::Paid,
        Self::Failed,
        Self::Expired,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Map the gateway's `transaction_status` and `fraud_status` to a status.
    ///
    /// Returns `None` for values the gateway may add in the future; callers
    /// should leave the stored status untouched in that case.
    #[must_use]
    pub fn from_gateway(transaction_status: &str, fraud_status: Option<&str>) -> Option<Self> {
        let status = match transaction_status {
            "capture" => match fraud_status {
                Some("challenge") => Self::Challenge,
                Some("deny") => Self::Failed,
                _ => Self::Paid,
            },
            "settlement" => Self::Paid,
            "pending" | "authorize" => Self::Pending,
            "deny" | "failure" => Self::Failed,
            "cancel" => Self::Cancelled,
            "expire" => Self::Expired,
            "refund" | "partial_refund" | "chargeback" | "partial_chargeback" => Self::Refunded,
            _ => return None,
        };
        Some(status)
    }

    /// Whether the gateway can still move this transaction on its own.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Challenge)
    }

    /// Whether the purchased scores may be downloaded.
    #[must_use]
    pub const fn grants_download(self) -> bool {
        matches!(self, Self::Paid)
    }

    #[must_use]
    pub const fn outcome(self) -> PaymentOutcome {
        match self {
            Self::Paid => PaymentOutcome::Success,
            Self::Pending | Self::Challenge => PaymentOutcome::Pending,
            Self::Failed | Self::Expired | Self::Cancelled | Self::Refunded => {
                PaymentOutcome::Failed
            }
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Open transactions may move anywhere. Once closed, a transaction never
    /// reopens; the only forward moves are a late settlement of a closed
    /// unpaid transaction and a refund of a paid one.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending | Self::Challenge, _) => true,
            (Self::Paid, Self::Refunded)
            | (Self::Failed | Self::Expired | Self::Cancelled, Self::Paid) => true,
            _ => false,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Challenge => "challenge",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Indonesian label for customer-facing pages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Menunggu pembayaran",
            Self::Challenge => "Sedang diverifikasi",
            Self::Paid => "Lunas",
            Self::Failed => "Gagal",
            Self::Expired => "Kedaluwarsa",
            Self::Cancelled => "Dibatalkan",
            Self::Refunded => "Dikembalikan",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid transaction status: {s}"))
    }
}

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Everything, including managing other admins.
    SuperAdmin,
    /// Catalog, transaction and settings management.
    Admin,
    /// Read-only access.
    Viewer,
}

impl AdminRole {
    #[must_use]
    pub const fn can_write(self) -> bool {
        !matches!(self, Self::Viewer)
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuperAdmin => write!(f, "super_admin"),
            Self::Admin => write!(f, "admin"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

/// Choir arrangement a score is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "voicing", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Voicing {
    Satb,
    Ssaa,
    Ssa,
    Sa,
    Ttbb,
    Tb,
    Sab,
    Unison,
    Other,
}

impl Voicing {
    pub const ALL: [Self; 9] = [
        Self::Satb,
        Self::Ssaa,
        Self::Ssa,
        Self::Sa,
        Self::Ttbb,
        Self::Tb,
        Self::Sab,
        Self::Unison,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Satb => "satb",
            Self::Ssaa => "ssaa",
            Self::Ssa => "ssa",
            Self::Sa => "sa",
            Self::Ttbb => "ttbb",
            Self::Tb => "tb",
            Self::Sab => "sab",
            Self::Unison => "unison",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Satb => "SATB",
            Self::Ssaa => "SSAA",
            Self::Ssa => "SSA",
            Self::Sa => "SA",
            Self::Ttbb => "TTBB",
            Self::Tb => "TB",
            Self::Sab => "SAB",
            Self::Unison => "Unisono",
            Self::Other => "Lainnya",
        }
    }
}

impl fmt::Display for Voicing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Voicing {
    type Err = String;

    /// Accepts both the stored form (`satb`) and the label (`SATB`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == lower)
            .ok_or_else(|| format!("invalid voicing: {s}"))
    }
}
