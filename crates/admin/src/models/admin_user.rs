//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partitur_core::{AdminUserId, Email};

// Re-export AdminRole from core for convenience
pub use partitur_core::AdminRole;

/// An admin user (domain type).
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin user as returned by the API (never includes the password hash).
#[derive(Debug, Clone, Serialize)]
pub struct AdminUserView {
    pub id: AdminUserId,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&AdminUser> for AdminUserView {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id,
            email: user.email.to_string(),
            name: user.name.clone(),
            role: user.role,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// `POST /api/admin-users` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdminUser {
    pub email: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: AdminRole,
    pub password: String,
}

const fn default_role() -> AdminRole {
    AdminRole::Admin
}

/// `POST /api/auth/login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
