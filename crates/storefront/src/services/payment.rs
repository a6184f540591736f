//! Payment status updates from Midtrans.
//!
//! Status arrives two ways: HTTP notifications pushed by Midtrans, and the
//! status API we poll for open transactions. Both end in [`apply_status`],
//! which maps the gateway status and only writes allowed transitions.

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use partitur_core::{OrderId, Rupiah, TransactionStatus};

use crate::db::{GatewayUpdate, RepositoryError, TransactionRepository};
use crate::error::AppError;
use crate::midtrans::{GatewayStatus, MidtransError, verify_notification_signature};
use crate::models::Transaction;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid notification signature")]
    InvalidSignature,

    #[error("unknown order {0}")]
    UnknownOrder(String),

    #[error("gross amount {received} does not match order {order_id}")]
    AmountMismatch { order_id: String, received: String },

    #[error(transparent)]
    Database(#[from] RepositoryError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidSignature => Self::Gateway(MidtransError::InvalidSignature),
            PaymentError::UnknownOrder(order_id) => {
                Self::NotFound(format!("Order {order_id} not found"))
            }
            PaymentError::AmountMismatch { .. } => {
                Self::BadRequest("Gross amount does not match".to_string())
            }
            PaymentError::Database(e) => Self::Database(e),
        }
    }
}

/// Result of applying a gateway status to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Status moved.
    Applied {
        from: TransactionStatus,
        to: TransactionStatus,
    },
    /// Gateway reported the status we already had.
    Unchanged(TransactionStatus),
    /// Unknown gateway status, a disallowed transition, or a concurrent
    /// writer won; nothing changed.
    Ignored,
}

/// What [`apply_status`] should do, decided without touching the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Apply(TransactionStatus),
    Record,
    Reject,
}

fn decide(current: TransactionStatus, gateway: &GatewayStatus) -> Decision {
    let Some(next) = TransactionStatus::from_gateway(
        &gateway.transaction_status,
        gateway.fraud_status.as_deref(),
    ) else {
        return Decision::Record;
    };

    if next == current {
        Decision::Record
    } else if current.can_transition_to(next) {
        Decision::Apply(next)
    } else {
        Decision::Reject
    }
}

/// Apply a gateway status to a stored transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn apply_status(
    repo: &TransactionRepository<'_>,
    transaction: &Transaction,
    gateway: &GatewayStatus,
) -> Result<StatusChange, RepositoryError> {
    let current = transaction.status;
    let decision = decide(current, gateway);
    let mapped = TransactionStatus::from_gateway(
        &gateway.transaction_status,
        gateway.fraud_status.as_deref(),
    );

    let update = GatewayUpdate {
        status: mapped.unwrap_or(current),
        gateway_status: gateway.transaction_status.clone(),
        fraud_status: gateway.fraud_status.clone(),
        payment_type: gateway.payment_type.clone(),
    };

    match decision {
        Decision::Record => {
            if mapped.is_none() {
                warn!(
                    order_id = %transaction.order_id,
                    gateway_status = %gateway.transaction_status,
                    "Unknown gateway status, keeping stored status"
                );
            }
            repo.record_gateway_status(&transaction.order_id, &update)
                .await?;
            Ok(if mapped.is_some() {
                StatusChange::Unchanged(current)
            } else {
                StatusChange::Ignored
            })
        }
        Decision::Reject => {
            warn!(
                order_id = %transaction.order_id,
                from = current.as_str(),
                to = update.status.as_str(),
                "Ignoring disallowed status transition"
            );
            Ok(StatusChange::Ignored)
        }
        Decision::Apply(next) => {
            if repo
                .apply_gateway_update(&transaction.order_id, current, &update)
                .await?
            {
                info!(
                    order_id = %transaction.order_id,
                    from = current.as_str(),
                    to = next.as_str(),
                    "Transaction status updated"
                );
                Ok(StatusChange::Applied {
                    from: current,
                    to: next,
                })
            } else {
                debug!(order_id = %transaction.order_id, "Status changed concurrently");
                Ok(StatusChange::Ignored)
            }
        }
    }
}

/// Handle an HTTP notification from Midtrans.
///
/// # Errors
///
/// - `InvalidSignature` when `signature_key` is missing or wrong
/// - `UnknownOrder` when the order id is not ours
/// - `AmountMismatch` when the amount differs from the stored gross amount
#[instrument(skip(state, notification), fields(order_id = %notification.order_id))]
pub async fn handle_notification(
    state: &AppState,
    notification: &GatewayStatus,
) -> Result<StatusChange, PaymentError> {
    let signature = notification
        .signature_key
        .as_deref()
        .ok_or(PaymentError::InvalidSignature)?;

    verify_notification_signature(
        &notification.order_id,
        &notification.status_code,
        &notification.gross_amount,
        signature,
        state.midtrans().server_key(),
    )
    .map_err(|_| {
        warn!("Rejected notification with bad signature");
        PaymentError::InvalidSignature
    })?;

    let unknown = || PaymentError::UnknownOrder(notification.order_id.clone());
    let order_id = OrderId::parse(&notification.order_id).map_err(|_| unknown())?;

    let repo = TransactionRepository::new(state.pool());
    let transaction = repo
        .find_by_order_id(&order_id)
        .await?
        .ok_or_else(unknown)?;

    check_amount(&transaction, &notification.gross_amount)?;

    apply_status(&repo, &transaction, notification)
        .await
        .map_err(PaymentError::from)
}

/// Refresh an open transaction from the status API.
///
/// Terminal transactions are returned as they are. A gateway failure is
/// logged and the stored transaction is returned unchanged.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if reading or writing fails.
#[instrument(skip(state, transaction), fields(order_id = %transaction.order_id))]
pub async fn refresh_status(
    state: &AppState,
    transaction: Transaction,
) -> Result<Transaction, RepositoryError> {
    if transaction.status.is_terminal() {
        return Ok(transaction);
    }

    let gateway = match state.midtrans().transaction_status(&transaction.order_id).await {
        Ok(gateway) => gateway,
        Err(MidtransError::Api { status: 404, .. }) => {
            debug!("Order not known to Midtrans yet");
            return Ok(transaction);
        }
        Err(e) => {
            warn!(error = %e, "Status refresh failed, using stored status");
            return Ok(transaction);
        }
    };

    if let Err(e) = check_amount(&transaction, &gateway.gross_amount) {
        warn!(error = %e, "Status API amount mismatch, ignoring");
        return Ok(transaction);
    }

    let repo = TransactionRepository::new(state.pool());
    match apply_status(&repo, &transaction, &gateway).await? {
        StatusChange::Applied { .. } => Ok(repo
            .find_by_order_id(&transaction.order_id)
            .await?
            .unwrap_or(transaction)),
        StatusChange::Unchanged(_) | StatusChange::Ignored => Ok(transaction),
    }
}

fn check_amount(transaction: &Transaction, gross_amount: &str) -> Result<(), PaymentError> {
    match Rupiah::from_gateway_amount(gross_amount) {
        Ok(amount) if amount == transaction.gross_amount => Ok(()),
        _ => Err(PaymentError::AmountMismatch {
            order_id: transaction.order_id.to_string(),
            received: gross_amount.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use partitur_core::TransactionId;

    use super::*;

    fn gateway(status: &str, fraud: Option<&str>) -> GatewayStatus {
        GatewayStatus {
            order_id: "PTR-20261018093000-4F2A".to_string(),
            status_code: "200".to_string(),
            gross_amount: "150000.00".to_string(),
            transaction_status: status.to_string(),
            fraud_status: fraud.map(String::from),
            payment_type: Some("qris".to_string()),
            signature_key: None,
            transaction_id: None,
            transaction_time: None,
            status_message: None,
        }
    }

    fn transaction(status: TransactionStatus) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId::new(1),
            order_id: OrderId::parse("PTR-20261018093000-4F2A").unwrap(),
            customer_name: "Rina".to_string(),
            customer_email: "rina@example.com".to_string(),
            customer_phone: None,
            choir_name: None,
            gross_amount: Rupiah::new(150_000).unwrap(),
            status,
            payment_type: None,
            snap_token: None,
            redirect_url: None,
            download_token: Uuid::new_v4(),
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_decide_settlement_pays_pending() {
        assert_eq!(
            decide(TransactionStatus::Pending, &gateway("settlement", None)),
            Decision::Apply(TransactionStatus::Paid)
        );
        assert_eq!(
            decide(TransactionStatus::Pending, &gateway("capture", Some("challenge"))),
            Decision::Apply(TransactionStatus::Challenge)
        );
    }

    #[test]
    fn test_decide_same_status_records_only() {
        assert_eq!(
            decide(TransactionStatus::Paid, &gateway("settlement", None)),
            Decision::Record
        );
    }

    #[test]
    fn test_decide_paid_never_regresses() {
        assert_eq!(
            decide(TransactionStatus::Paid, &gateway("pending", None)),
            Decision::Reject
        );
        assert_eq!(
            decide(TransactionStatus::Paid, &gateway("expire", None)),
            Decision::Reject
        );
        assert_eq!(
            decide(TransactionStatus::Paid, &gateway("refund", None)),
            Decision::Apply(TransactionStatus::Refunded)
        );
    }

    #[test]
    fn test_decide_unknown_status() {
        assert_eq!(
            decide(TransactionStatus::Pending, &gateway("teleported", None)),
            Decision::Record
        );
    }

    #[test]
    fn test_check_amount() {
        let tx = transaction(TransactionStatus::Pending);
        assert!(check_amount(&tx, "150000.00").is_ok());
        assert!(check_amount(&tx, "150000").is_ok());
        assert!(matches!(
            check_amount(&tx, "1500.00"),
            Err(PaymentError::AmountMismatch { .. })
        ));
        assert!(check_amount(&tx, "abc").is_err());
    }

    #[test]
    fn test_payment_error_status_codes() {
        use axum::http::StatusCode;

        assert_eq!(
            AppError::from(PaymentError::InvalidSignature).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(PaymentError::UnknownOrder("x".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(PaymentError::AmountMismatch {
                order_id: "x".to_string(),
                received: "1".to_string()
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
