//! Transaction listing, detail, manual status changes and receipts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use tracing::instrument;

use partitur_core::{ApiResponse, OrderId, Page, TransactionStatus};

use crate::db::{SettingsRepository, TransactionRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdminAuth, RequireEditor};
use crate::models::{
    StatusUpdate, TransactionDetail, TransactionItemView, TransactionListParams, TransactionQuery,
    TransactionSummary,
};
use crate::state::AppState;

const RECEIPT_DATE_FORMAT: &str = "%d-%m-%Y %H:%M UTC";

/// `GET /api/transactions`.
///
/// # Errors
///
/// Returns 400 for an unknown status filter.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<ApiResponse<Page<TransactionSummary>>>> {
    let query = TransactionQuery::try_from(params).map_err(AppError::BadRequest)?;
    let page = TransactionRepository::new(state.pool()).list(&query).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// `GET /api/transactions/{order_id}`.
///
/// # Errors
///
/// Returns 404 for an unknown or malformed order id.
#[instrument(skip(_admin, state))]
pub async fn show(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<ApiResponse<TransactionDetail>>> {
    let detail = load(&state, &order_id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

/// `PATCH /api/transactions/{order_id}/status`.
///
/// Only moves allowed by [`TransactionStatus::can_transition_to`] are
/// accepted; a concurrent change (e.g. a payment notification) wins.
/// Setting the current status again changes nothing.
///
/// # Errors
///
/// Returns 404 for an unknown order, 400 for a malformed body and 409 for a
/// disallowed or raced transition.
#[instrument(skip(admin, state, payload), fields(admin_id = %admin.id))]
pub async fn update_status(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    payload: std::result::Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<ApiResponse<TransactionDetail>>> {
    let Json(update) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let order_id = parse_order_id(&order_id)?;
    let repo = TransactionRepository::new(state.pool());

    let detail = repo
        .get(&order_id)
        .await?
        .ok_or_else(|| not_found(order_id.as_str()))?;
    let current = detail.summary.status;

    if current == update.status {
        return Ok(Json(ApiResponse::ok_with_message(detail, "Status unchanged")));
    }
    check_transition(current, update.status)?;

    if !repo.update_status(&order_id, current, update.status).await? {
        return Err(AppError::Conflict(
            "Transaction status changed meanwhile, reload and try again".to_string(),
        ));
    }

    tracing::info!(
        order_id = %order_id,
        from = current.as_str(),
        to = update.status.as_str(),
        "Transaction status changed by admin"
    );
    add_breadcrumb(
        "transactions",
        "Status changed",
        Some(&[("order_id", order_id.as_str()), ("status", update.status.as_str())]),
    );

    let detail = repo
        .get(&order_id)
        .await?
        .ok_or_else(|| not_found(order_id.as_str()))?;
    Ok(Json(ApiResponse::ok_with_message(detail, "Status updated")))
}

/// Printable receipt.
#[derive(Template, WebTemplate)]
#[template(path = "receipt.html")]
pub struct ReceiptTemplate {
    pub store_name: String,
    pub tagline: Option<String>,
    pub contact_whatsapp: Option<String>,
    pub logo_url: Option<String>,
    pub order: TransactionSummary,
    pub items: Vec<TransactionItemView>,
    pub created_at: String,
    pub paid_at: Option<String>,
}

/// `GET /transactions/{order_id}/receipt`.
///
/// # Errors
///
/// Returns 404 for an unknown or malformed order id.
#[instrument(skip(_admin, state))]
pub async fn receipt(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<ReceiptTemplate> {
    let detail = load(&state, &order_id).await?;
    let settings = SettingsRepository::new(state.pool()).load().await?;

    Ok(ReceiptTemplate {
        store_name: settings.store_name,
        tagline: settings.tagline,
        contact_whatsapp: settings.contact_whatsapp,
        logo_url: settings.logo_url,
        created_at: detail
            .summary
            .created_at
            .format(RECEIPT_DATE_FORMAT)
            .to_string(),
        paid_at: detail
            .summary
            .paid_at
            .map(|t| t.format(RECEIPT_DATE_FORMAT).to_string()),
        order: detail.summary,
        items: detail.items,
    })
}

async fn load(state: &AppState, raw_order_id: &str) -> Result<TransactionDetail> {
    let order_id = parse_order_id(raw_order_id)?;
    TransactionRepository::new(state.pool())
        .get(&order_id)
        .await?
        .ok_or_else(|| not_found(order_id.as_str()))
}

/// Malformed ids cannot exist, so they are reported as missing.
fn parse_order_id(raw: &str) -> Result<OrderId> {
    OrderId::parse(raw).map_err(|_| not_found(raw))
}

fn not_found(order_id: &str) -> AppError {
    AppError::NotFound(format!("Transaction {order_id} not found"))
}

fn check_transition(current: TransactionStatus, next: TransactionStatus) -> Result<()> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "Cannot change status from {} to {}",
            current.label(),
            next.label()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use partitur_core::{Rupiah, TransactionId};

    use super::*;
    use crate::routes::tests::{json_body, login_as, request, send, test_app};

    fn summary() -> TransactionSummary {
        let amount = Rupiah::new(75_000).unwrap();
        TransactionSummary {
            id: TransactionId::new(1),
            order_id: OrderId::parse("PTR-20261001120000-AB12").unwrap(),
            customer_name: "Rina".to_string(),
            customer_email: "rina@example.com".to_string(),
            choir_name: Some("PSM Cantate".to_string()),
            gross_amount: amount,
            gross_amount_display: amount.display(),
            status: TransactionStatus::Paid,
            status_label: TransactionStatus::Paid.label(),
            payment_type: Some("qris".to_string()),
            paid_at: Some(Utc.with_ymd_and_hms(2026, 10, 1, 12, 5, 0).unwrap()),
            created_at: Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_receipt_renders() {
        let template = ReceiptTemplate {
            store_name: "Partitur".to_string(),
            tagline: None,
            contact_whatsapp: Some("6281234567890".to_string()),
            logo_url: None,
            order: summary(),
            items: vec![TransactionItemView::new(
                None,
                "Ave Maria <SATB>".to_string(),
                Rupiah::new(25_000).unwrap(),
                3,
            )],
            created_at: "01-10-2026 12:00 UTC".to_string(),
            paid_at: Some("01-10-2026 12:05 UTC".to_string()),
        };
        let html = template.render().unwrap();
        assert!(html.contains("PTR-20261001120000-AB12"));
        assert!(html.contains("Rp 75.000"));
        assert!(html.contains("PSM Cantate"));
        assert!(html.contains("Ave Maria &lt;SATB&gt;"));
        assert!(html.contains("+6281234567890"));
    }

    #[test]
    fn test_check_transition() {
        assert!(check_transition(TransactionStatus::Pending, TransactionStatus::Paid).is_ok());
        assert!(check_transition(TransactionStatus::Paid, TransactionStatus::Refunded).is_ok());
        let err = check_transition(TransactionStatus::Refunded, TransactionStatus::Paid).unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_malformed_order_id_is_not_found() {
        assert_eq!(parse_order_id("../etc").unwrap_err().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_viewer_cannot_change_status() {
        let app = test_app();
        let cookie = login_as(&app, "viewer").await;
        let (status, _) = send(
            &app,
            json_body(
                &json!({"status": "paid"}),
                request("PATCH", "/api/transactions/PTR-20261001120000-AB12/status", Some(&cookie)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_status_filter_rejected() {
        let app = test_app();
        let cookie = login_as(&app, "viewer").await;
        let (status, _) = send(
            &app,
            request("GET", "/api/transactions?status=shipped", Some(&cookie))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
