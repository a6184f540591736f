//! Midtrans request and response bodies.
//!
//! Amounts are whole rupiah; Midtrans rejects IDR amounts with decimals.

use serde::{Deserialize, Serialize};

/// Longest item name Midtrans accepts.
pub const MAX_ITEM_NAME_CHARS: usize = 50;

/// `POST /snap/v1/transactions` body.
#[derive(Debug, Clone, Serialize)]
pub struct SnapRequest {
    pub transaction_details: TransactionDetails,
    pub item_details: Vec<ItemDetails>,
    pub customer_details: CustomerDetails,
    pub callbacks: SnapCallbacks,
    /// Choir name, shown in the Midtrans dashboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_field1: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDetails {
    pub id: String,
    pub price: i64,
    pub quantity: u32,
    pub name: String,
}

impl ItemDetails {
    /// Build an item, cutting the name to the gateway's limit.
    #[must_use]
    pub fn new(id: impl Into<String>, name: &str, price: i64, quantity: u32) -> Self {
        Self {
            id: id.into(),
            price,
            quantity,
            name: truncate_chars(name, MAX_ITEM_NAME_CHARS),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub first_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapCallbacks {
    pub finish: String,
}

/// Successful Snap response.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapResponse {
    pub token: String,
    pub redirect_url: String,
}

/// Error body returned by Snap and the core API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub status_message: Option<String>,
}

impl ErrorResponse {
    #[must_use]
    pub fn message(&self) -> String {
        if self.error_messages.is_empty() {
            self.status_message
                .clone()
                .unwrap_or_else(|| "unknown error".to_string())
        } else {
            self.error_messages.join("; ")
        }
    }
}

/// Transaction status as sent in HTTP notifications and returned by
/// `GET /v2/{order_id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub order_id: String,
    pub status_code: String,
    /// Decimal string such as `"150000.00"`.
    pub gross_amount: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub signature_key: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub transaction_time: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
}

/// Cut a string to at most `max` characters without splitting a character.
#[must_use]
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
