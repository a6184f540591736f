//! Payment route handlers: checkout, status, gateway notifications and the
//! result pages Midtrans redirects to.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};
use uuid::Uuid;

use partitur_core::{ApiResponse, OrderId, PaymentOutcome, Rupiah, TransactionStatus};

use crate::db::TransactionRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::midtrans::GatewayStatus;
use crate::models::session::MAX_REMEMBERED_ORDERS;
use crate::models::{Transaction, session_keys};
use crate::routes::cart::{load_cart, save_cart};
use crate::routes::downloads::download_links;
use crate::routes::store_settings;
use crate::services::checkout::{self, CheckoutRequest, Customer, PaymentSession};
use crate::services::payment;
use crate::state::AppState;

/// Seconds between automatic reloads of a pending result page.
const RESULT_REFRESH_SECONDS: u32 = 30;

/// `GET /api/payment/status/{order_id}` response.
#[derive(Debug, Serialize)]
pub struct PaymentStatusView {
    pub order_id: OrderId,
    pub status: TransactionStatus,
    pub status_label: &'static str,
    pub outcome: PaymentOutcome,
    pub gross_amount: Rupiah,
    pub gross_amount_display: String,
    pub payment_type: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Only for paid orders checked out in the requesting session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_token: Option<Uuid>,
}

impl PaymentStatusView {
    fn new(transaction: &Transaction, reveal_token: bool) -> Self {
        Self {
            order_id: transaction.order_id.clone(),
            status: transaction.status,
            status_label: transaction.status.label(),
            outcome: transaction.status.outcome(),
            gross_amount: transaction.gross_amount,
            gross_amount_display: transaction.gross_amount.display(),
            payment_type: transaction.payment_type.clone(),
            paid_at: transaction.paid_at,
            download_token: (reveal_token && transaction.status.grants_download())
                .then_some(transaction.download_token),
        }
    }
}

/// Create a pending transaction from the session cart and open a Snap
/// payment.
///
/// # Errors
///
/// - 400 for invalid buyer details or an empty cart
/// - 409 if a score is no longer for sale
/// - 502 if Midtrans rejects the transaction
#[instrument(skip(state, session, payload))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<PaymentSession>>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let customer = Customer::validate(&request)?;

    let mut cart = load_cart(&session).await?;
    let payment = checkout::create_payment(&state, &cart, &customer).await?;

    cart.clear();
    save_cart(&session, &cart).await?;
    remember_order(&session, &payment.order_id).await?;

    add_breadcrumb(
        "checkout",
        "Payment created",
        Some(&[("order_id", payment.order_id.as_str())]),
    );

    Ok(Json(ApiResponse::ok(payment)))
}

/// Current status of an order, refreshed from Midtrans while it is open.
///
/// # Errors
///
/// Returns 404 for an unknown order.
#[instrument(skip(state, session))]
pub async fn status(
    State(state): State<AppState>,
    session: Session,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<PaymentStatusView>>> {
    let transaction = find_and_refresh(&state, &order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

    let reveal = session_owns_order(&session, &transaction.order_id).await?;

    Ok(Json(ApiResponse::ok(PaymentStatusView::new(
        &transaction,
        reveal,
    ))))
}

/// Midtrans HTTP notification.
///
/// Answers 200 for every accepted notification, including ones that change
/// nothing, so Midtrans stops retrying.
///
/// # Errors
///
/// - 401 for a missing or wrong signature
/// - 404 for an unknown order
/// - 400 for an amount that does not match the order
#[instrument(skip(state, payload))]
pub async fn notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GatewayStatus>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>> {
    let Json(notification) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let change = payment::handle_notification(&state, &notification).await?;
    info!(
        order_id = %notification.order_id,
        gateway_status = %notification.transaction_status,
        ?change,
        "Notification processed"
    );

    Ok(Json(ApiResponse::<()>::message("OK")))
}

// =============================================================================
// Result pages
// =============================================================================

/// Query Midtrans appends to the finish/unfinish/error redirects.
#[derive(Debug, Deserialize)]
pub struct ResultQuery {
    pub order_id: Option<String>,
}

/// Which redirect brought the customer here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Finish,
    Unfinish,
    Error,
}

pub struct ResultDownload {
    pub title: String,
    pub url: String,
}

pub struct ResultOrder {
    pub order_id: String,
    pub outcome: &'static str,
    pub status_label: &'static str,
    pub amount_display: String,
    pub payment_type: Option<String>,
    pub downloads: Vec<ResultDownload>,
}

/// Payment result page.
#[derive(Template, WebTemplate)]
#[template(path = "payment/result.html")]
pub struct PaymentResultTemplate {
    pub store_name: String,
    pub home_url: String,
    pub heading: String,
    pub message: String,
    pub order: Option<ResultOrder>,
    pub refresh_seconds: Option<u32>,
}

/// Heading and message for a result page.
fn result_copy(kind: ResultKind, outcome: Option<PaymentOutcome>) -> (&'static str, &'static str) {
    match (outcome, kind) {
        (None, _) => (
            "Order not found",
            "We could not find this order. If you were charged, please contact us.",
        ),
        (Some(PaymentOutcome::Success), _) => (
            "Thank you!",
            "Your payment is confirmed. Your scores are ready to download.",
        ),
        (Some(PaymentOutcome::Pending), ResultKind::Unfinish) => (
            "Payment not finished",
            "You left the payment page before paying. Complete the payment with the \
             instructions you received, or start a new checkout.",
        ),
        (Some(PaymentOutcome::Pending), _) => (
            "Waiting for payment",
            "We are waiting for confirmation from the payment provider.",
        ),
        (Some(PaymentOutcome::Failed), ResultKind::Error) => (
            "Payment error",
            "The payment could not be processed. No money was taken.",
        ),
        (Some(PaymentOutcome::Failed), _) => (
            "Payment failed",
            "The payment was not completed. You can try again from your cart.",
        ),
    }
}

/// `GET /payment/finish`.
///
/// # Errors
///
/// Returns 500 if the database fails.
pub async fn finish_page(
    state: State<AppState>,
    session: Session,
    query: Query<ResultQuery>,
) -> Result<Response> {
    result_page(state, session, query, ResultKind::Finish).await
}

/// `GET /payment/unfinish`.
///
/// # Errors
///
/// Returns 500 if the database fails.
pub async fn unfinish_page(
    state: State<AppState>,
    session: Session,
    query: Query<ResultQuery>,
) -> Result<Response> {
    result_page(state, session, query, ResultKind::Unfinish).await
}

/// `GET /payment/error`.
///
/// # Errors
///
/// Returns 500 if the database fails.
pub async fn error_page(
    state: State<AppState>,
    session: Session,
    query: Query<ResultQuery>,
) -> Result<Response> {
    result_page(state, session, query, ResultKind::Error).await
}

#[instrument(skip(state, session))]
async fn result_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ResultQuery>,
    kind: ResultKind,
) -> Result<Response> {
    let order_id = match query.order_id.filter(|id| !id.is_empty()) {
        Some(id) => Some(id),
        None => session.get::<String>(session_keys::LAST_ORDER_ID).await?,
    };

    let transaction = match &order_id {
        Some(id) => find_and_refresh(&state, id).await?,
        None => None,
    };

    let settings = store_settings(&state).await?;
    let outcome = transaction.as_ref().map(|t| t.status.outcome());
    let (heading, message) = result_copy(kind, outcome);

    let order = match transaction {
        Some(transaction) => {
            let downloads = if transaction.status.grants_download()
                && session_owns_order(&session, &transaction.order_id).await?
            {
                download_links(&state, &transaction)
                    .await?
                    .into_iter()
                    .map(|link| ResultDownload {
                        title: link.title,
                        url: link.url,
                    })
                    .collect()
            } else {
                Vec::new()
            };

            Some(ResultOrder {
                order_id: transaction.order_id.to_string(),
                outcome: outcome_class(transaction.status.outcome()),
                status_label: transaction.status.label(),
                amount_display: transaction.gross_amount.display(),
                payment_type: transaction.payment_type.clone(),
                downloads,
            })
        }
        None => None,
    };

    let refresh_seconds =
        (outcome == Some(PaymentOutcome::Pending)).then_some(RESULT_REFRESH_SECONDS);

    Ok(PaymentResultTemplate {
        store_name: settings.store_name,
        home_url: state.config().base_url.clone(),
        heading: heading.to_string(),
        message: message.to_string(),
        order,
        refresh_seconds,
    }
    .into_response())
}

const fn outcome_class(outcome: PaymentOutcome) -> &'static str {
    match outcome {
        PaymentOutcome::Success => "success",
        PaymentOutcome::Pending => "pending",
        PaymentOutcome::Failed => "failed",
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Look up an order and refresh it from Midtrans if it is still open.
///
/// Malformed order ids are treated as unknown.
async fn find_and_refresh(state: &AppState, order_id: &str) -> Result<Option<Transaction>> {
    let Ok(order_id) = OrderId::parse(order_id) else {
        return Ok(None);
    };

    let Some(transaction) = TransactionRepository::new(state.pool())
        .find_by_order_id(&order_id)
        .await?
    else {
        return Ok(None);
    };

    Ok(Some(payment::refresh_status(state, transaction).await?))
}

async fn remember_order(session: &Session, order_id: &OrderId) -> Result<()> {
    let mut orders: Vec<String> = session
        .get(session_keys::ORDER_IDS)
        .await?
        .unwrap_or_default();
    orders.push(order_id.to_string());
    if orders.len() > MAX_REMEMBERED_ORDERS {
        orders.drain(..orders.len() - MAX_REMEMBERED_ORDERS);
    }

    session.insert(session_keys::ORDER_IDS, orders).await?;
    session
        .insert(session_keys::LAST_ORDER_ID, order_id.to_string())
        .await?;
    Ok(())
}

async fn session_owns_order(session: &Session, order_id: &OrderId) -> Result<bool> {
    let orders: Vec<String> = session
        .get(session_keys::ORDER_IDS)
        .await?
        .unwrap_or_default();
    Ok(orders.iter().any(|id| id == order_id.as_str()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};

    use super::*;
    use crate::routes::tests::send;

    fn transaction(status: TransactionStatus) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: partitur_core::TransactionId::new(9),
            order_id: OrderId::parse("PTR-20261018093000-4F2A").unwrap(),
            customer_name: "Rina".to_string(),
            customer_email: "rina@example.com".to_string(),
            customer_phone: None,
            choir_name: None,
            gross_amount: Rupiah::new(150_000).unwrap(),
            status,
            payment_type: Some("gopay".to_string()),
            snap_token: None,
            redirect_url: None,
            download_token: Uuid::new_v4(),
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_view_hides_token_unless_paid_and_owned() {
        let paid = transaction(TransactionStatus::Paid);
        assert!(PaymentStatusView::new(&paid, true).download_token.is_some());
        assert!(PaymentStatusView::new(&paid, false).download_token.is_none());

        let pending = transaction(TransactionStatus::Pending);
        assert!(PaymentStatusView::new(&pending, true).download_token.is_none());
    }

    #[test]
    fn test_status_view_json() {
        let view = PaymentStatusView::new(&transaction(TransactionStatus::Pending), false);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["outcome"], "pending");
        assert_eq!(json["gross_amount"], 150_000);
        assert_eq!(json["gross_amount_display"], "Rp 150.000");
        assert!(json.get("download_token").is_none());
    }

    #[test]
    fn test_result_copy() {
        assert_eq!(result_copy(ResultKind::Finish, None).0, "Order not found");
        assert_eq!(
            result_copy(ResultKind::Unfinish, Some(PaymentOutcome::Pending)).0,
            "Payment not finished"
        );
        assert_eq!(
            result_copy(ResultKind::Error, Some(PaymentOutcome::Success)).0,
            "Thank you!"
        );
    }

    #[test]
    fn test_result_template_refreshes_while_pending() {
        let page = PaymentResultTemplate {
            store_name: "Partitur".to_string(),
            home_url: "https://partitur.id".to_string(),
            heading: "Waiting for payment".to_string(),
            message: "Waiting".to_string(),
            order: Some(ResultOrder {
                order_id: "PTR-20261018093000-4F2A".to_string(),
                outcome: "pending",
                status_label: "Pending",
                amount_display: "Rp 150.000".to_string(),
                payment_type: None,
                downloads: Vec::new(),
            }),
            refresh_seconds: Some(RESULT_REFRESH_SECONDS),
        };
        let html = page.render().unwrap();
        assert!(html.contains(r#"<meta http-equiv="refresh" content="30">"#));
        assert!(html.contains("PTR-20261018093000-4F2A"));
        assert!(html.contains("Rp 150.000"));
    }

    #[test]
    fn test_result_template_lists_downloads() {
        let page = PaymentResultTemplate {
            store_name: "Partitur".to_string(),
            home_url: "https://partitur.id".to_string(),
            heading: "Thank you!".to_string(),
            message: "Paid".to_string(),
            order: Some(ResultOrder {
                order_id: "PTR-20261018093000-4F2A".to_string(),
                outcome: "success",
                status_label: "Paid",
                amount_display: "Rp 150.000".to_string(),
                payment_type: Some("qris".to_string()),
                downloads: vec![ResultDownload {
                    title: "Gloria <SATB>".to_string(),
                    url: "https://partitur.id/download/t/1".to_string(),
                }],
            }),
            refresh_seconds: None,
        };
        let html = page.render().unwrap();
        assert!(!html.contains("http-equiv=\"refresh\""));
        assert!(html.contains("Gloria &#60;SATB&#62;") || html.contains("Gloria &lt;SATB&gt;"));
    }

    #[tokio::test]
    async fn test_notification_rejects_malformed_body() {
        let (status, body) = send(
            Request::builder()
                .method("POST")
                .uri("/api/payment/notification")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"order_id": 5}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_notification_rejects_bad_signature_before_database() {
        let body = serde_json::json!({
            "order_id": "PTR-20261018093000-4F2A",
            "status_code": "200",
            "gross_amount": "150000.00",
            "transaction_status": "settlement",
            "signature_key": "deadbeef",
        });
        let (status, _) = send(
            Request::builder()
                .method("POST")
                .uri("/api/payment/notification")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
