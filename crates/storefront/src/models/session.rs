//! Session-stored state.

/// Session keys.
pub mod keys {
    /// The customer's cart (`partitur_core::Cart`).
    pub const CART: &str = "cart";

    /// Order id of the most recent checkout, used by the result pages when
    /// the gateway redirect omits it.
    pub const LAST_ORDER_ID: &str = "last_order_id";

    /// Order ids checked out in this session (`Vec<String>`, newest last).
    /// Only these orders reveal their download token on the status endpoint.
    pub const ORDER_IDS: &str = "order_ids";
}

/// Orders remembered per session.
pub const MAX_REMEMBERED_ORDERS: usize = 20;
