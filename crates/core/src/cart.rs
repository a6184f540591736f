//! Shopping cart kept in the customer's session.
//!
//! Lines are keyed by product. Quantity is the number of licensed copies of a
//! score; adding a product that is already in the cart adds to its quantity.
//! Prices stored here are display snapshots only - checkout re-prices every
//! line from the catalog.

use serde::{Deserialize, Serialize};

use crate::types::{MoneyError, ProductId, Rupiah};

/// Maximum licensed copies per line.
pub const MAX_QUANTITY: u32 = 99;

/// Maximum distinct products in one cart.
pub const MAX_LINES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("quantity must be between 1 and {MAX_QUANTITY}")]
    InvalidQuantity,
    #[error("a cart can hold at most {MAX_LINES} different scores")]
    TooManyLines,
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// One product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub slug: String,
    pub title: String,
    pub composer_name: Option<String>,
    pub unit_price: Rupiah,
    pub quantity: u32,
    pub cover_image_url: Option<String>,
}

impl CartItem {
    /// Price of the line (unit price × quantity).
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the multiplication overflows.
    pub fn line_total(&self) -> Result<Rupiah, MoneyError> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Session cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line, merging with an existing line for the same product.
    ///
    /// The merged line takes the newer price and title snapshot.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` if the resulting quantity is out of range,
    /// `TooManyLines` if a new line would exceed [`MAX_LINES`].
    pub fn add(&mut self, item: CartItem) -> Result<(), CartError> {
        validate_quantity(item.quantity)?;

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|line| line.product_id == item.product_id)
        {
            let quantity = existing.quantity.saturating_add(item.quantity);
            validate_quantity(quantity)?;
            *existing = CartItem { quantity, ..item };
            return Ok(());
        }

        if self.items.len() >= MAX_LINES {
            return Err(CartError::TooManyLines);
        }
        self.items.push(item);
        Ok(())
    }

    /// Set the quantity of a line; zero removes it.
    ///
    /// # Errors
    ///
    /// `NotInCart` if the product has no line, `InvalidQuantity` if out of range.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(product_id);
        }
        validate_quantity(quantity)?;
        let line = self
            .items
            .iter_mut()
            .find(|line| line.product_id == product_id)
            .ok_or(CartError::NotInCart(product_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// `NotInCart` if the product has no line.
    pub fn remove(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|line| line.product_id != product_id);
        if self.items.len() == before {
            return Err(CartError::NotInCart(product_id));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of copies across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Cart total at snapshot prices.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Money` on overflow.
    pub fn total(&self) -> Result<Rupiah, CartError> {
        let lines = self
            .items
            .iter()
            .map(CartItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Rupiah::try_sum(lines)?)
    }
}

const fn validate_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 || quantity > MAX_QUANTITY {
        return Err(CartError::InvalidQuantity);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, price: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            slug: format!("lagu-{id}"),
            title: format!("Lagu {id}"),
            composer_name: Some("Ananda Sukarlan".to_string()),
            unit_price: Rupiah::new(price).unwrap(),
            quantity,
            cover_image_url: None,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        cart.add(item(1, 50_000, 1)).unwrap();
        cart.add(item(1, 55_000, 2)).unwrap();

        assert_eq!(cart.items().len(), 1);
        let line = &cart.items()[0];
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price.amount(), 55_000);
    }

    #[test]
    fn test_total_and_count() {
        let mut cart = Cart::new();
        cart.add(item(1, 50_000, 2)).unwrap();
        cart.add(item(2, 35_000, 1)).unwrap();
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total().unwrap().amount(), 135_000);
    }

    #[test]
    fn test_quantity_limits() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(item(1, 1_000, 0)), Err(CartError::InvalidQuantity));
        cart.add(item(1, 1_000, MAX_QUANTITY)).unwrap();
        assert_eq!(cart.add(item(1, 1_000, 1)), Err(CartError::InvalidQuantity));
        assert_eq!(cart.items()[0].quantity, MAX_QUANTITY);
    }

    #[test]
    fn test_line_limit() {
        let mut cart = Cart::new();
        for id in 0..i32::try_from(MAX_LINES).unwrap() {
            cart.add(item(id, 1_000, 1)).unwrap();
        }
        assert_eq!(cart.add(item(999, 1_000, 1)), Err(CartError::TooManyLines));
        cart.add(item(0, 1_000, 1)).unwrap();
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let mut cart = Cart::new();
        cart.add(item(1, 10_000, 1)).unwrap();
        cart.add(item(2, 20_000, 1)).unwrap();

        cart.set_quantity(ProductId::new(1), 4).unwrap();
        assert_eq!(cart.items()[0].quantity, 4);

        cart.set_quantity(ProductId::new(1), 0).unwrap();
        assert_eq!(cart.items().len(), 1);

        assert_eq!(
            cart.remove(ProductId::new(1)),
            Err(CartError::NotInCart(ProductId::new(1)))
        );
        assert_eq!(
            cart.set_quantity(ProductId::new(7), 2),
            Err(CartError::NotInCart(ProductId::new(7)))
        );

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total().unwrap(), Rupiah::ZERO);
    }
}
