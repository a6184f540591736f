//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! PARTITUR_ADMIN_PASSWORD='...' partitur-cli admin create \
//!     -e admin@partitur.id -n "Admin Name" -r super_admin
//! ```
//!
//! The first super admin has to be created here; later accounts can be
//! managed from the back-office.

use partitur_admin::services::{AuthError, AuthService};
use partitur_core::{AdminRole, AdminUserId};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a new admin user.
///
/// # Errors
///
/// Returns `AdminError::InvalidRole` for an unknown role and
/// `AdminError::Auth` for an invalid email, name or password or an email
/// that is already registered.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<AdminUserId, AdminError> {
    let role = parse_role(role)?;
    let pool = connect().await?;

    tracing::info!("Creating admin user: {} ({})", email, role);

    let user = AuthService::new(&pool)
        .create_admin(email, name, role, password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}

fn parse_role(role: &str) -> Result<AdminRole, AdminError> {
    role.parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("super_admin").unwrap(), AdminRole::SuperAdmin);
        assert_eq!(parse_role("viewer").unwrap(), AdminRole::Viewer);
        assert!(matches!(parse_role("owner"), Err(AdminError::InvalidRole(r)) if r == "owner"));
    }
}
