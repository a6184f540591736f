//! Cart route handlers.
//!
//! The cart lives in the session. Every mutation answers with the updated
//! cart so the front end never has to re-fetch.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use partitur_core::{ApiResponse, Cart, CartError, CartItem, ProductId, Rupiah};

use crate::db::CatalogRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::session_keys;
use crate::state::AppState;

/// One cart line with its computed total.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub item: CartItem,
    pub unit_price_display: String,
    pub line_total: Rupiah,
    pub line_total_display: String,
}

/// Cart as returned by every cart endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u32,
    pub total: Rupiah,
    pub total_display: String,
}

impl CartView {
    /// Build the view, computing line and cart totals.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Money` if a total overflows.
    pub fn from_cart(cart: &Cart) -> std::result::Result<Self, CartError> {
        let items = cart
            .items()
            .iter()
            .map(|item| {
                let line_total = item.line_total()?;
                Ok(CartLineView {
                    item: item.clone(),
                    unit_price_display: item.unit_price.display(),
                    line_total,
                    line_total_display: line_total.display(),
                })
            })
            .collect::<std::result::Result<Vec<_>, CartError>>()?;
        let total = cart.total()?;

        Ok(Self {
            items,
            item_count: cart.item_count(),
            total,
            total_display: total.display(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

pub(crate) async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

fn respond(cart: &Cart) -> Result<Json<ApiResponse<CartView>>> {
    Ok(Json(ApiResponse::ok(CartView::from_cart(cart)?)))
}

/// Current cart.
///
/// # Errors
///
/// Returns 500 if the session store fails.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<ApiResponse<CartView>>> {
    respond(&load_cart(&session).await?)
}

/// Add a score to the cart.
///
/// # Errors
///
/// Returns 404 if the product is unknown or unpublished, 409 if it is out
/// of stock, 400 for a bad quantity or a full cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<ApiResponse<CartView>>> {
    let product = CatalogRepository::new(state.pool())
        .purchasable(request.product_id)
        .await?
        .filter(|p| p.is_published)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    if !product.in_stock {
        return Err(AppError::Conflict(format!(
            "\"{}\" is out of stock",
            product.title
        )));
    }

    let mut cart = load_cart(&session).await?;
    cart.add(CartItem {
        product_id: product.id,
        slug: product.slug,
        title: product.title,
        composer_name: product.composer_name,
        unit_price: product.price,
        quantity: request.quantity,
        cover_image_url: product.cover_image_url,
    })?;
    save_cart(&session, &cart).await?;

    let product_id = product.id.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));

    respond(&cart)
}

/// Change the quantity of a line (0 removes it).
///
/// # Errors
///
/// Returns 404 if the product is not in the cart, 400 for a bad quantity.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Path(product_id): Path<ProductId>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<CartView>>> {
    let mut cart = load_cart(&session).await?;
    cart.set_quantity(product_id, request.quantity)?;
    save_cart(&session, &cart).await?;
    respond(&cart)
}

/// Remove a line.
///
/// # Errors
///
/// Returns 404 if the product is not in the cart.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ApiResponse<CartView>>> {
    let mut cart = load_cart(&session).await?;
    cart.remove(product_id)?;
    save_cart(&session, &cart).await?;
    respond(&cart)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns 500 if the session store fails.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<ApiResponse<CartView>>> {
    let cart = Cart::new();
    save_cart(&session, &cart).await?;
    respond(&cart)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, price: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            slug: format!("score-{id}"),
            title: format!("Score {id}"),
            composer_name: Some("Pontas Purba".to_string()),
            unit_price: Rupiah::new(price).unwrap(),
            quantity,
            cover_image_url: None,
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let mut cart = Cart::new();
        cart.add(item(1, 50_000, 2)).unwrap();
        cart.add(item(2, 35_000, 1)).unwrap();

        let view = CartView::from_cart(&cart).unwrap();
        assert_eq!(view.item_count, 3);
        assert_eq!(view.total.amount(), 135_000);
        assert_eq!(view.total_display, "Rp 135.000");
        assert_eq!(view.items[0].line_total_display, "Rp 100.000");
    }

    #[test]
    fn test_cart_view_serializes_flat_lines() {
        let mut cart = Cart::new();
        cart.add(item(1, 50_000, 1)).unwrap();
        let json = serde_json::to_value(CartView::from_cart(&cart).unwrap()).unwrap();
        assert_eq!(json["items"][0]["product_id"], 1);
        assert_eq!(json["items"][0]["title"], "Score 1");
        assert_eq!(json["total"], 50_000);
    }

    #[test]
    fn test_add_request_defaults_quantity() {
        let req: AddItemRequest = serde_json::from_str(r#"{"product_id": 4}"#).unwrap();
        assert_eq!(req.quantity, 1);
    }
}
