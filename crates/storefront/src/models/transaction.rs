//! Purchase records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use partitur_core::{OrderId, ProductId, Rupiah, TransactionId, TransactionStatus};

/// A purchase tied to a gateway order id.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub choir_name: Option<String>,
    pub gross_amount: Rupiah,
    pub status: TransactionStatus,
    pub payment_type: Option<String>,
    pub snap_token: Option<String>,
    pub redirect_url: Option<String>,
    pub download_token: Uuid,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchased line.
///
/// `product_id` is `None` when the product was deleted after the sale.
#[derive(Debug, Clone)]
pub struct TransactionItem {
    pub product_id: Option<ProductId>,
    pub title: String,
    pub unit_price: Rupiah,
    pub quantity: i32,
}

/// A PDF unlocked by a paid transaction.
#[derive(Debug, Clone)]
pub struct DownloadFile {
    pub product_id: ProductId,
    pub title: String,
    pub slug: String,
    /// Relative to the storage root.
    pub pdf_path: Option<String>,
}
