//! Checkout: turn a session cart into a pending transaction and a Snap
//! payment session.
//!
//! Cart prices are display snapshots. Every line is re-priced from the
//! catalog here, and the gross amount sent to Midtrans is always the sum of
//! the item lines it receives.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use partitur_core::{
    Cart, CartError, Email, MoneyError, OrderId, PhoneNumber, ProductId, Rupiah,
};

use crate::db::{
    CatalogRepository, NewTransaction, NewTransactionItem, RepositoryError, TransactionRepository,
};
use crate::midtrans::{
    CustomerDetails, ItemDetails, MidtransError, SnapCallbacks, SnapRequest, TransactionDetails,
};
use crate::models::PurchasableProduct;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 100;
const MAX_CHOIR_NAME_CHARS: usize = 100;
const ORDER_ID_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Invalid(String),

    #[error("\"{0}\" is no longer available")]
    Unavailable(String),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Database(#[from] RepositoryError),

    #[error(transparent)]
    Gateway(#[from] MidtransError),
}

impl From<MoneyError> for CheckoutError {
    fn from(err: MoneyError) -> Self {
        Self::Cart(CartError::Money(err))
    }
}

/// `POST /api/payment/create` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub choir_name: Option<String>,
}

/// Validated buyer details.
#[derive(Debug, Clone)]
pub struct Customer {
    pub name: String,
    pub email: Email,
    pub phone: Option<PhoneNumber>,
    pub choir_name: Option<String>,
}

impl Customer {
    /// Validate a checkout form.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Invalid` naming the first bad field.
    pub fn validate(request: &CheckoutRequest) -> Result<Self, CheckoutError> {
        let name = request.customer_name.trim();
        if name.is_empty() {
            return Err(CheckoutError::Invalid("Name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(CheckoutError::Invalid(format!(
                "Name must be at most {MAX_NAME_CHARS} characters"
            )));
        }

        let email = Email::parse(&request.email)
            .map_err(|e| CheckoutError::Invalid(format!("Email is invalid: {e}")))?;

        let phone = match request.phone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                PhoneNumber::parse(raw)
                    .map_err(|e| CheckoutError::Invalid(format!("Phone is invalid: {e}")))?,
            ),
        };

        let choir_name = match request.choir_name.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(choir) if choir.chars().count() > MAX_CHOIR_NAME_CHARS => {
                return Err(CheckoutError::Invalid(format!(
                    "Choir name must be at most {MAX_CHOIR_NAME_CHARS} characters"
                )));
            }
            Some(choir) => Some(choir.to_string()),
        };

        Ok(Self {
            name: name.to_string(),
            email,
            phone,
            choir_name,
        })
    }
}

/// Snap session handed to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSession {
    pub order_id: OrderId,
    pub token: String,
    pub redirect_url: String,
    pub client_key: String,
    pub snap_js_url: String,
}

/// Re-price cart lines against current catalog data.
///
/// # Errors
///
/// Returns `CheckoutError::Unavailable` for a line whose product was deleted,
/// unpublished or marked out of stock.
pub fn reprice(
    cart: &Cart,
    products: &[PurchasableProduct],
) -> Result<Vec<NewTransactionItem>, CheckoutError> {
    cart.items()
        .iter()
        .map(|line| {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .filter(|p| p.is_available())
                .ok_or_else(|| CheckoutError::Unavailable(line.title.clone()))?;

            Ok(NewTransactionItem {
                product_id: product.id,
                title: product.title.clone(),
                unit_price: product.price,
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Sum of item lines.
///
/// Midtrans refuses gross amounts below 1 rupiah, so a free cart is an
/// input error rather than a gateway failure.
///
/// # Errors
///
/// Returns `CheckoutError::Invalid` for a zero total and an error if the
/// total overflows.
pub fn gross_amount(items: &[NewTransactionItem]) -> Result<Rupiah, CheckoutError> {
    let lines = items
        .iter()
        .map(|item| item.unit_price.checked_mul(item.quantity))
        .collect::<Result<Vec<_>, _>>()?;
    let total = Rupiah::try_sum(lines)?;
    if total == Rupiah::ZERO {
        return Err(CheckoutError::Invalid(
            "The order total must be at least Rp 1".to_string(),
        ));
    }
    Ok(total)
}

/// Build the Snap request for a transaction.
#[must_use]
pub fn build_snap_request(
    order_id: &OrderId,
    customer: &Customer,
    items: &[NewTransactionItem],
    gross_amount: Rupiah,
    finish_url: String,
) -> SnapRequest {
    SnapRequest {
        transaction_details: TransactionDetails {
            order_id: order_id.as_str().to_string(),
            gross_amount: gross_amount.amount(),
        },
        item_details: items
            .iter()
            .map(|item| {
                ItemDetails::new(
                    item.product_id.to_string(),
                    &item.title,
                    item.unit_price.amount(),
                    item.quantity,
                )
            })
            .collect(),
        customer_details: CustomerDetails {
            first_name: customer.name.clone(),
            email: customer.email.as_str().to_string(),
            phone: customer.phone.as_ref().map(PhoneNumber::local),
        },
        callbacks: SnapCallbacks { finish: finish_url },
        custom_field1: customer.choir_name.clone(),
    }
}

/// Create a pending transaction and its Snap session.
///
/// The caller clears the cart on success.
///
/// # Errors
///
/// - `EmptyCart` / `Invalid` / `Unavailable` for bad input, including a
///   zero total; nothing is stored in that case
/// - `Gateway` if Midtrans rejects the request; the transaction is then
///   marked failed
#[instrument(skip(state, cart, customer), fields(lines = cart.items().len()))]
pub async fn create_payment(
    state: &AppState,
    cart: &Cart,
    customer: &Customer,
) -> Result<PaymentSession, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let ids: Vec<ProductId> = cart.items().iter().map(|line| line.product_id).collect();
    let products = CatalogRepository::new(state.pool())
        .purchasable_many(&ids)
        .await?;
    let items = reprice(cart, &products)?;
    let gross = gross_amount(&items)?;

    let repo = TransactionRepository::new(state.pool());
    let transaction = insert_with_fresh_order_id(&repo, customer, &items, gross).await?;
    let order_id = transaction.order_id;

    let finish_url = format!("{}/payment/finish", state.config().base_url);
    let request = build_snap_request(&order_id, customer, &items, gross, finish_url);

    let snap = match state.midtrans().create_snap_transaction(&request).await {
        Ok(snap) => snap,
        Err(e) => {
            error!(order_id = %order_id, error = %e, "Snap transaction failed");
            if let Err(db_err) = repo.mark_failed(&order_id).await {
                warn!(order_id = %order_id, error = %db_err, "Failed to mark transaction failed");
            }
            return Err(e.into());
        }
    };

    repo.set_snap_token(&order_id, &snap.token, &snap.redirect_url)
        .await?;

    info!(order_id = %order_id, gross_amount = gross.amount(), "Payment created");

    Ok(PaymentSession {
        order_id,
        token: snap.token,
        redirect_url: snap.redirect_url,
        client_key: state.midtrans().client_key().to_string(),
        snap_js_url: state.midtrans().snap_js_url(),
    })
}

/// Order ids carry a 16-bit random suffix, so two checkouts in the same
/// second can collide. Retry with a new id on a unique violation.
async fn insert_with_fresh_order_id(
    repo: &TransactionRepository<'_>,
    customer: &Customer,
    items: &[NewTransactionItem],
    gross: Rupiah,
) -> Result<crate::models::Transaction, CheckoutError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let new = NewTransaction {
            order_id: OrderId::generate(Utc::now()),
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            customer_phone: customer.phone.clone(),
            choir_name: customer.choir_name.clone(),
            gross_amount: gross,
            download_token: Uuid::new_v4(),
        };

        match repo.create(&new, items).await {
            Err(RepositoryError::Conflict(_)) if attempt < ORDER_ID_ATTEMPTS => {
                warn!(order_id = %new.order_id, "Order id collision, retrying");
            }
            result => return Ok(result?),
        }
    }
}
