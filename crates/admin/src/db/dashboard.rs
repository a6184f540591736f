//! Aggregate queries for the dashboard.

use sqlx::PgPool;

use partitur_core::{Rupiah, TransactionStatus};

use super::RepositoryError;
use super::transactions::{SUMMARY_COLUMNS, SummaryRow};
use crate::models::dashboard::{
    DashboardStats, RECENT_TRANSACTIONS, REVENUE_WINDOW_DAYS, status_counts,
};

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Catalog counts, transactions per status, paid revenue and the latest
    /// transactions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored amount is invalid.
    pub async fn stats(&self) -> Result<DashboardStats, RepositoryError> {
        let (product_count, published_product_count, composer_count): (i64, i64, i64) =
            sqlx::query_as(
                r"
                SELECT (SELECT COUNT(*) FROM products),
                       (SELECT COUNT(*) FROM products WHERE is_published),
                       (SELECT COUNT(*) FROM composers)
                ",
            )
            .fetch_one(self.pool)
            .await?;

        let counts: Vec<(TransactionStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM transactions GROUP BY status")
                .fetch_all(self.pool)
                .await?;

        let (total, recent_total): (i64, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(gross_amount), 0)::BIGINT,
                   COALESCE(SUM(gross_amount) FILTER (
                       WHERE paid_at >= NOW() - make_interval(days => $1)
                   ), 0)::BIGINT
            FROM transactions
            WHERE status = 'paid'
            ",
        )
        .bind(REVENUE_WINDOW_DAYS)
        .fetch_one(self.pool)
        .await?;

        let revenue_total = rupiah(total)?;
        let revenue_last_30_days = rupiah(recent_total)?;

        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM transactions ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(RECENT_TRANSACTIONS)
        .fetch_all(self.pool)
        .await?;

        Ok(DashboardStats {
            product_count,
            published_product_count,
            composer_count,
            transactions_by_status: status_counts(&counts),
            revenue_total,
            revenue_total_display: revenue_total.display(),
            revenue_last_30_days,
            revenue_last_30_days_display: revenue_last_30_days.display(),
            recent_transactions: rows
                .into_iter()
                .map(TryInto::try_into)
                .collect::<Result<_, _>>()?,
        })
    }
}

fn rupiah(amount: i64) -> Result<Rupiah, RepositoryError> {
    Rupiah::new(amount)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid revenue total: {e}")))
}
