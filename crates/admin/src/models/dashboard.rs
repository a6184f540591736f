//! Dashboard figures.

use serde::Serialize;

use partitur_core::{Rupiah, TransactionStatus};

use super::transaction::TransactionSummary;

/// Number of recent transactions shown on the dashboard.
pub const RECENT_TRANSACTIONS: i64 = 10;

/// Revenue window in days.
pub const REVENUE_WINDOW_DAYS: i32 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: TransactionStatus,
    pub label: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub product_count: i64,
    pub published_product_count: i64,
    pub composer_count: i64,
    /// One entry per status, zero counts included.
    pub transactions_by_status: Vec<StatusCount>,
    /// Paid transactions only.
    pub revenue_total: Rupiah,
    pub revenue_total_display: String,
    pub revenue_last_30_days: Rupiah,
    pub revenue_last_30_days_display: String,
    pub recent_transactions: Vec<TransactionSummary>,
}

/// Fill in zero counts for statuses missing from `counts`, in lifecycle order.
#[must_use]
pub fn status_counts(counts: &[(TransactionStatus, i64)]) -> Vec<StatusCount> {
    TransactionStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            label: status.label(),
            count: counts
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, n)| *n),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_fills_missing() {
        let counts = status_counts(&[(TransactionStatus::Paid, 4), (TransactionStatus::Pending, 2)]);
        assert_eq!(counts.len(), TransactionStatus::ALL.len());

        let paid = counts
            .iter()
            .find(|c| c.status == TransactionStatus::Paid)
            .map(|c| c.count);
        assert_eq!(paid, Some(4));

        let refunded = counts
            .iter()
            .find(|c| c.status == TransactionStatus::Refunded)
            .map(|c| c.count);
        assert_eq!(refunded, Some(0));
    }
}
