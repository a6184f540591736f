//! Midtrans payment gateway.
//!
//! - [`client`] - Snap transaction creation and the status API
//! - [`types`] - request and response bodies
//! - [`signature`] - HTTP notification signature checks

pub mod client;
pub mod signature;
pub mod types;

use thiserror::Error;

pub use client::MidtransClient;
pub use signature::verify_notification_signature;
pub use types::{
    CustomerDetails, GatewayStatus, ItemDetails, SnapCallbacks, SnapRequest, SnapResponse,
    TransactionDetails,
};

/// Errors that can occur when talking to Midtrans.
#[derive(Debug, Error)]
pub enum MidtransError {
    /// HTTP request failed before a response arrived.
    #[error("Midtrans request failed: {0}")]
    Request(String),

    /// Response body could not be parsed.
    #[error("Midtrans response error: {0}")]
    Response(String),

    /// Midtrans answered with an error status.
    #[error("Midtrans API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Notification signature did not match.
    #[error("Invalid Midtrans signature")]
    InvalidSignature,
}
