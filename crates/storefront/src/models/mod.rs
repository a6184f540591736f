//! Domain models for the storefront.
//!
//! Database rows are converted into these types in the `db` layer, so route
//! handlers never see storage-only columns such as a score's PDF path.

pub mod catalog;
pub mod session;
pub mod transaction;

pub use catalog::{
    Category, ComposerDetail, ComposerRef, ComposerSummary, ProductDetail, ProductFilter,
    ProductListParams, ProductSort, ProductSummary, PurchasableProduct, SitemapEntry,
};
pub use session::keys as session_keys;
pub use transaction::{DownloadFile, Transaction, TransactionItem};
