//! Transaction repository: checkout writes and payment status updates.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use partitur_core::{
    Email, OrderId, PhoneNumber, ProductId, Rupiah, TransactionId, TransactionStatus,
};

use super::RepositoryError;
use crate::models::{DownloadFile, Transaction, TransactionItem};

const TRANSACTION_COLUMNS: &str = "id, order_id, customer_name, customer_email, customer_phone, \
     choir_name, gross_amount, status, payment_type, snap_token, redirect_url, download_token, \
     paid_at, created_at, updated_at";

/// A transaction about to be created at checkout.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub order_id: OrderId,
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: Option<PhoneNumber>,
    pub choir_name: Option<String>,
    pub gross_amount: Rupiah,
    pub download_token: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewTransactionItem {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Rupiah,
    pub quantity: u32,
}

/// Status reported by the gateway, already mapped to our lifecycle.
#[derive(Debug, Clone)]
pub struct GatewayUpdate {
    pub status: TransactionStatus,
    pub gateway_status: String,
    pub fraud_status: Option<String>,
    pub payment_type: Option<String>,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: TransactionId,
    order_id: String,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    choir_name: Option<String>,
    gross_amount: Rupiah,
    status: TransactionStatus,
    payment_type: Option<String>,
    snap_token: Option<String>,
    redirect_url: Option<String>,
    download_token: Uuid,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let order_id = OrderId::parse(&row.order_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order id in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            order_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            choir_name: row.choir_name,
            gross_amount: row.gross_amount,
            status: row.status,
            payment_type: row.payment_type,
            snap_token: row.snap_token,
            redirect_url: row.redirect_url,
            download_token: row.download_token,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    product_id: Option<ProductId>,
    title: String,
    unit_price: Rupiah,
    quantity: i32,
}

#[derive(sqlx::FromRow)]
struct DownloadRow {
    product_id: ProductId,
    title: String,
    slug: String,
    pdf_path: Option<String>,
}

impl From<DownloadRow> for DownloadFile {
    fn from(row: DownloadRow) -> Self {
        Self {
            product_id: row.product_id,
            title: row.title,
            slug: row.slug,
            pdf_path: row.pdf_path,
        }
    }
}

/// Repository for transaction database operations.
pub struct TransactionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TransactionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending transaction and its items atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order id already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        new: &NewTransaction,
        items: &[NewTransactionItem],
    ) -> Result<Transaction, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: TransactionRow = sqlx::query_as(&format!(
            r"
            INSERT INTO transactions
                (order_id, customer_name, customer_email, customer_phone, choir_name,
                 gross_amount, status, download_token)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING {TRANSACTION_COLUMNS}
            "
        ))
        .bind(new.order_id.as_str())
        .bind(&new.customer_name)
        .bind(new.customer_email.as_str())
        .bind(new.customer_phone.as_ref().map(PhoneNumber::as_str))
        .bind(new.choir_name.as_deref())
        .bind(new.gross_amount)
        .bind(new.download_token)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("order id already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        for item in items {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| RepositoryError::Conflict("quantity out of range".to_owned()))?;
            sqlx::query(
                r"
                INSERT INTO transaction_items (transaction_id, product_id, title, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(&item.title)
            .bind(item.unit_price)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.try_into()
    }

    /// Store the Snap token and redirect URL returned by the gateway.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_snap_token(
        &self,
        order_id: &OrderId,
        token: &str,
        redirect_url: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE transactions
            SET snap_token = $2, redirect_url = $3, updated_at = NOW()
            WHERE order_id = $1
            ",
        )
        .bind(order_id.as_str())
        .bind(token)
        .bind(redirect_url)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Mark a still-pending transaction as failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_failed(&self, order_id: &OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE transactions
            SET status = 'failed', updated_at = NOW()
            WHERE order_id = $1 AND status = 'pending'
            ",
        )
        .bind(order_id.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get a transaction by its gateway order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored order id is invalid.
    pub async fn find_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE order_id = $1"
        ))
        .bind(order_id.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    /// Get a transaction by its download token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_download_token(
        &self,
        token: Uuid,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE download_token = $1"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    /// Items of a transaction, in purchase order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<TransactionItem>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT product_id, title, unit_price, quantity
            FROM transaction_items
            WHERE transaction_id = $1
            ORDER BY id
            ",
        )
        .bind(transaction_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TransactionItem {
                product_id: r.product_id,
                title: r.title,
                unit_price: r.unit_price,
                quantity: r.quantity,
            })
            .collect())
    }

    /// Products of a transaction that still exist, one entry per product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn download_files(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Vec<DownloadFile>, RepositoryError> {
        let rows: Vec<DownloadRow> = sqlx::query_as(
            r"
            SELECT DISTINCT ON (p.id) p.id AS product_id, ti.title, p.slug, p.pdf_path
            FROM transaction_items ti
            JOIN products p ON p.id = ti.product_id
            WHERE ti.transaction_id = $1
            ORDER BY p.id
            ",
        )
        .bind(transaction_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(DownloadFile::from).collect())
    }

    /// One purchased product of a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn download_file(
        &self,
        transaction_id: TransactionId,
        product_id: ProductId,
    ) -> Result<Option<DownloadFile>, RepositoryError> {
        let row: Option<DownloadRow> = sqlx::query_as(
            r"
            SELECT p.id AS product_id, ti.title, p.slug, p.pdf_path
            FROM transaction_items ti
            JOIN products p ON p.id = ti.product_id
            WHERE ti.transaction_id = $1 AND p.id = $2
            LIMIT 1
            ",
        )
        .bind(transaction_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(DownloadFile::from))
    }

    /// Apply a gateway status, but only if the stored status is still
    /// `expected`.
    ///
    /// Returns `false` when another writer changed the status first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn apply_gateway_update(
        &self,
        order_id: &OrderId,
        expected: TransactionStatus,
        update: &GatewayUpdate,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE transactions
            SET status = $3,
                gateway_status = $4,
                fraud_status = $5,
                payment_type = COALESCE($6, payment_type),
                paid_at = CASE WHEN $3 = 'paid'::transaction_status
                               THEN COALESCE(paid_at, NOW())
                               ELSE paid_at END,
                updated_at = NOW()
            WHERE order_id = $1 AND status = $2
            ",
        )
        .bind(order_id.as_str())
        .bind(expected)
        .bind(update.status)
        .bind(&update.gateway_status)
        .bind(update.fraud_status.as_deref())
        .bind(update.payment_type.as_deref())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record the raw gateway status without changing our status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_gateway_status(
        &self,
        order_id: &OrderId,
        update: &GatewayUpdate,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE transactions
            SET gateway_status = $2,
                fraud_status = $3,
                payment_type = COALESCE($4, payment_type),
                updated_at = NOW()
            WHERE order_id = $1
            ",
        )
        .bind(order_id.as_str())
        .bind(&update.gateway_status)
        .bind(update.fraud_status.as_deref())
        .bind(update.payment_type.as_deref())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Transactions in `status` created before `cutoff`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn open_before(
        &self,
        status: TransactionStatus,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r"
            SELECT {TRANSACTION_COLUMNS}
            FROM transactions
            WHERE status = $1 AND created_at < $2
            ORDER BY created_at
            LIMIT $3
            "
        ))
        .bind(status)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    /// Expire a transaction that is still pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn expire_if_pending(&self, order_id: &OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE transactions
            SET status = 'expired', updated_at = NOW()
            WHERE order_id = $1 AND status = 'pending'
            ",
        )
        .bind(order_id.as_str())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
