//! Domain models for the back-office.

pub mod admin_user;
pub mod catalog;
pub mod dashboard;
pub mod session;
pub mod transaction;

pub use admin_user::{AdminRole, AdminUser, AdminUserView, CreateAdminUser, LoginRequest};
pub use catalog::{
    Composer, ComposerDraft, ComposerInput, ComposerRef, Product, ProductDraft, ProductInput,
    ProductListParams, ProductQuery, ValidationError,
};
pub use dashboard::{DashboardStats, StatusCount};
pub use session::{CurrentAdmin, keys as session_keys};
pub use transaction::{
    StatusUpdate, TransactionDetail, TransactionItemView, TransactionListParams, TransactionQuery,
    TransactionSummary,
};
