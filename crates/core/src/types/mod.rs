//! Core domain types for Partitur.
//!
//! Type-safe wrappers for the concepts shared by the storefront and admin.

pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod phone;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{MoneyError, Rupiah};
pub use order::{OrderId, OrderIdError};
pub use phone::{PhoneError, PhoneNumber};
pub use slug::{Slug, SlugError};
pub use status::*;
