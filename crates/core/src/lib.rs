//! Partitur Core - shared domain types.
//!
//! This crate provides the types used by every Partitur component:
//! - `storefront` - public catalog, cart and Midtrans checkout
//! - `admin` - back-office for products, composers and transactions
//! - `cli` - migrations, admin users and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Database encoding for ids and enums is available
//! behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - ids, money, contact details, slugs, order ids, statuses
//! - [`cart`] - session cart arithmetic
//! - [`settings`] - store-wide settings shared by both servers
//! - [`storage`] - layout of the upload directory and score path rules
//! - [`search`] - `ILIKE` pattern escaping
//! - [`api`] - the JSON response envelope shared by both servers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod search;
pub mod settings;
pub mod storage;
pub mod types;

pub use api::{ApiResponse, Page};
pub use cart::{Cart, CartError, CartItem};
pub use settings::StoreSettings;
pub use types::*;
