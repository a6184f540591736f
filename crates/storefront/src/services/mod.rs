//! Business logic services for storefront.
//!
//! # Services
//!
//! - `checkout` - cart validation, re-pricing and Snap session creation
//! - `payment` - gateway notifications and status refreshes
//! - `reconcile` - background refresh and expiry of open transactions

pub mod checkout;
pub mod payment;
pub mod reconcile;
