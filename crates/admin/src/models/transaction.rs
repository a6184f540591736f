//! Transactions as seen by staff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use partitur_core::{OrderId, ProductId, Rupiah, TransactionId, TransactionStatus};

use super::catalog::{paging, search_term};

/// One row of the transaction list.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionSummary {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub choir_name: Option<String>,
    pub gross_amount: Rupiah,
    pub gross_amount_display: String,
    pub status: TransactionStatus,
    pub status_label: &'static str,
    pub payment_type: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A transaction with its gateway fields and items.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub summary: TransactionSummary,
    pub customer_phone: Option<String>,
    pub gateway_status: Option<String>,
    pub fraud_status: Option<String>,
    pub download_token: Uuid,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<TransactionItemView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionItemView {
    /// `None` once the product has been deleted.
    pub product_id: Option<ProductId>,
    pub title: String,
    pub unit_price: Rupiah,
    pub unit_price_display: String,
    pub quantity: i32,
    pub line_total_display: String,
}

impl TransactionItemView {
    #[must_use]
    pub fn new(product_id: Option<ProductId>, title: String, unit_price: Rupiah, quantity: i32) -> Self {
        let line_total = u32::try_from(quantity)
            .ok()
            .and_then(|q| unit_price.checked_mul(q).ok())
            .unwrap_or(unit_price);
        Self {
            product_id,
            title,
            unit_price,
            unit_price_display: unit_price.display(),
            quantity,
            line_total_display: line_total.display(),
        }
    }
}

/// Raw `/api/transactions` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListParams {
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub status: Option<TransactionStatus>,
    /// Matches order id, customer name, email or choir.
    pub q: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl TryFrom<TransactionListParams> for TransactionQuery {
    type Error = String;

    fn try_from(params: TransactionListParams) -> Result<Self, Self::Error> {
        let status = params
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<TransactionStatus>)
            .transpose()?;
        let (page, per_page) = paging(params.page, params.per_page);
        Ok(Self {
            status,
            q: search_term(params.q),
            page,
            per_page,
        })
    }
}

/// `PATCH /api/transactions/{order_id}/status` body.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: TransactionStatus,
}
