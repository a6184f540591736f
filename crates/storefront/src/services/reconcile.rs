//! Background payment reconciliation.
//!
//! Notifications can be lost. On a fixed interval, open transactions older
//! than a short grace period are refreshed from the status API, and those
//! still pending past the configured timeout are expired.
//!
//! Pending transactions fill each batch first. Challenged ones wait on a
//! fraud review and never expire here, so they only get the leftover room.

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use partitur_core::TransactionStatus;

use crate::db::{RepositoryError, TransactionRepository};
use crate::models::Transaction;
use crate::services::payment;
use crate::state::AppState;

/// Transactions younger than this are left to the notification.
const GRACE_PERIOD_MINUTES: i64 = 2;

/// Transactions refreshed per run.
const BATCH_SIZE: i64 = 100;

/// Room left in a batch after `pending` pending transactions.
fn challenge_capacity(pending: usize) -> i64 {
    let pending = i64::try_from(pending).unwrap_or(i64::MAX);
    (BATCH_SIZE - pending).max(0)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub updated: usize,
    pub expired: usize,
}

/// Run until `shutdown` is cancelled.
pub async fn run(state: AppState, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(state.config().reconcile.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        interval_secs = state.config().reconcile.interval.as_secs(),
        "Payment reconciler started"
    );

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                match reconcile_once(&state, Utc::now()).await {
                    Ok(summary) if summary.checked > 0 => {
                        info!(
                            checked = summary.checked,
                            updated = summary.updated,
                            expired = summary.expired,
                            "Reconciled open transactions"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Payment reconciliation failed"),
                }
            }
        }
    }

    info!("Payment reconciler stopped");
}

/// One reconciliation pass.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if listing open transactions fails.
/// Failures on individual transactions are logged and skipped.
#[instrument(skip(state))]
pub async fn reconcile_once(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<ReconcileSummary, RepositoryError> {
    let repo = TransactionRepository::new(state.pool());
    let cutoff = now - chrono::Duration::minutes(GRACE_PERIOD_MINUTES);
    let mut open = repo
        .open_before(TransactionStatus::Pending, cutoff, BATCH_SIZE)
        .await?;
    let room = challenge_capacity(open.len());
    if room > 0 {
        open.extend(
            repo.open_before(TransactionStatus::Challenge, cutoff, room)
                .await?,
        );
    }

    let mut summary = ReconcileSummary::default();
    for transaction in open {
        summary.checked += 1;
        let before = transaction.status;
        let order_id = transaction.order_id.clone();

        let refreshed = match payment::refresh_status(state, transaction).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Failed to refresh transaction");
                continue;
            }
        };

        if refreshed.status != before {
            summary.updated += 1;
        }

        if is_stale(&refreshed, now, state.config().reconcile.pending_timeout) {
            match repo.expire_if_pending(&order_id).await {
                Ok(true) => {
                    info!(order_id = %order_id, "Expired stale pending transaction");
                    summary.expired += 1;
                }
                Ok(false) => {}
                Err(e) => warn!(order_id = %order_id, error = %e, "Failed to expire transaction"),
            }
        }
    }

    Ok(summary)
}

/// Whether a transaction has been pending longer than `timeout`.
fn is_stale(transaction: &Transaction, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
    transaction.status == TransactionStatus::Pending && transaction.created_at < now - timeout
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use partitur_core::{OrderId, Rupiah, TransactionId};

    use super::*;

    fn transaction(status: TransactionStatus, age_hours: i64, now: DateTime<Utc>) -> Transaction {
        let created = now - chrono::Duration::hours(age_hours);
        Transaction {
            id: TransactionId::new(1),
            order_id: OrderId::parse("PTR-20261017093000-0001").unwrap(),
            customer_name: "Budi".to_string(),
            customer_email: "budi@example.com".to_string(),
            customer_phone: None,
            choir_name: None,
            gross_amount: Rupiah::new(75_000).unwrap(),
            status,
            payment_type: None,
            snap_token: None,
            redirect_url: None,
            download_token: Uuid::new_v4(),
            paid_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_is_stale() {
        let now = Utc::now();
        let timeout = chrono::Duration::hours(24);

        assert!(is_stale(&transaction(TransactionStatus::Pending, 25, now), now, timeout));
        assert!(!is_stale(&transaction(TransactionStatus::Pending, 23, now), now, timeout));
        assert!(!is_stale(&transaction(TransactionStatus::Challenge, 48, now), now, timeout));
        assert!(!is_stale(&transaction(TransactionStatus::Paid, 48, now), now, timeout));
    }

    #[test]
    fn test_pending_transactions_fill_the_batch_first() {
        assert_eq!(challenge_capacity(0), BATCH_SIZE);
        assert_eq!(challenge_capacity(30), BATCH_SIZE - 30);
        assert_eq!(challenge_capacity(100), 0);
        assert_eq!(challenge_capacity(usize::MAX), 0);
    }
}
