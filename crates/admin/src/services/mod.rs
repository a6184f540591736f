//! Business logic for the back-office.

pub mod auth;
pub mod uploads;

pub use auth::{AuthError, AuthService};
pub use uploads::{FileKind, StoredFile, UploadError, UploadKind, UploadStore};
