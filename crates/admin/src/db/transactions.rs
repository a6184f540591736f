//! Transaction reads and manual status changes.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use partitur_core::search::like_pattern;
use partitur_core::{OrderId, Page, ProductId, Rupiah, TransactionId, TransactionStatus};

use super::RepositoryError;
use crate::models::transaction::{
    TransactionDetail, TransactionItemView, TransactionQuery, TransactionSummary,
};

pub(crate) const SUMMARY_COLUMNS: &str = "id, order_id, customer_name, customer_email, \
     choir_name, gross_amount, status, payment_type, paid_at, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct SummaryRow {
    id: TransactionId,
    order_id: String,
    customer_name: String,
    customer_email: String,
    choir_name: Option<String>,
    gross_amount: Rupiah,
    status: TransactionStatus,
    payment_type: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for TransactionSummary {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        let order_id = OrderId::parse(&row.order_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order id in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            order_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            choir_name: row.choir_name,
            gross_amount: row.gross_amount,
            gross_amount_display: row.gross_amount.display(),
            status: row.status,
            status_label: row.status.label(),
            payment_type: row.payment_type,
            paid_at: row.paid_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    #[sqlx(flatten)]
    summary: SummaryRow,
    customer_phone: Option<String>,
    gateway_status: Option<String>,
    fraud_status: Option<String>,
    download_token: Uuid,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    product_id: Option<ProductId>,
    title: String,
    unit_price: Rupiah,
    quantity: i32,
}

/// Repository for back-office transaction access.
pub struct TransactionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TransactionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored order id is invalid.
    pub async fn list(
        &self,
        query: &TransactionQuery,
    ) -> Result<Page<TransactionSummary>, RepositoryError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM transactions");
        push_filters(&mut count_query, query);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut select = QueryBuilder::new(format!("SELECT {SUMMARY_COLUMNS} FROM transactions"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(query.per_page))
            .push(" OFFSET ")
            .push_bind(Page::<()>::offset(query.page, query.per_page));

        let rows: Vec<SummaryRow> = select.build_query_as().fetch_all(self.pool).await?;
        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(
            items,
            query.page,
            query.per_page,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// A transaction with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, order_id: &OrderId) -> Result<Option<TransactionDetail>, RepositoryError> {
        let row: Option<DetailRow> = sqlx::query_as(&format!(
            r"
            SELECT {SUMMARY_COLUMNS}, customer_phone, gateway_status, fraud_status,
                   download_token, updated_at
            FROM transactions WHERE order_id = $1
            "
        ))
        .bind(order_id.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT product_id, title, unit_price, quantity
            FROM transaction_items
            WHERE transaction_id = $1
            ORDER BY id
            ",
        )
        .bind(row.summary.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(TransactionDetail {
            summary: row.summary.try_into()?,
            customer_phone: row.customer_phone,
            gateway_status: row.gateway_status,
            fraud_status: row.fraud_status,
            download_token: row.download_token,
            updated_at: row.updated_at,
            items: items
                .into_iter()
                .map(|i| TransactionItemView::new(i.product_id, i.title, i.unit_price, i.quantity))
                .collect(),
        }))
    }

    /// Move a transaction from `expected` to `next`.
    ///
    /// Returns `false` when the status changed underneath us. `paid_at` is
    /// set the first time a transaction becomes paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE transactions
            SET status = $3,
                paid_at = CASE WHEN $3 = 'paid'::transaction_status
                               THEN COALESCE(paid_at, NOW())
                               ELSE paid_at END,
                updated_at = NOW()
            WHERE order_id = $1 AND status = $2
            ",
        )
        .bind(order_id.as_str())
        .bind(expected)
        .bind(next)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &TransactionQuery) {
    builder.push(" WHERE TRUE");

    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }

    if let Some(q) = &query.q {
        let pattern = like_pattern(q);
        builder
            .push(" AND (order_id ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR customer_email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR choir_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
