//! Authentication extractors for the back-office API.
//!
//! Rejections are [`AppError`]s, so they render the usual JSON envelope:
//! 401 when nobody is logged in, 403 when the role is insufficient.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{AdminRole, CurrentAdmin, session_keys};

/// Extractor that requires a logged-in admin of any role.
///
/// ```rust,ignore
/// async fn handler(RequireAdminAuth(admin): RequireAdminAuth) -> String {
///     format!("Halo, {}!", admin.name)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_admin(parts).await.map(Self)
    }
}

/// Extractor that requires a role allowed to change data (not a viewer).
pub struct RequireEditor(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireEditor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = current_admin(parts).await?;
        if !admin.role.can_write() {
            return Err(AppError::Forbidden(
                "Viewers cannot change data".to_string(),
            ));
        }
        Ok(Self(admin))
    }
}

/// Extractor that requires a super admin.
pub struct RequireSuperAdmin(pub CurrentAdmin);

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = current_admin(parts).await?;
        if admin.role != AdminRole::SuperAdmin {
            return Err(AppError::Forbidden(
                "Only super admins can access this resource".to_string(),
            ));
        }
        Ok(Self(admin))
    }
}

async fn current_admin(parts: &Parts) -> Result<CurrentAdmin, AppError> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AppError::Unauthorized)?;

    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?
        .ok_or(AppError::Unauthorized)
}

/// Store the logged-in admin in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// End the admin session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
