//! Password authentication for admin users.
//!
//! Hashes are Argon2id in PHC string format. Login failures are reported
//! as [`AuthError::InvalidCredentials`] whether the email is unknown or the
//! password is wrong.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use thiserror::Error;

use partitur_core::{Email, EmailError};

use crate::db::{AdminUserRepository, RepositoryError};
use crate::models::admin_user::{AdminRole, AdminUser};

/// Minimum password length for admin accounts.
pub const MIN_PASSWORD_LENGTH: usize = 10;

const MAX_NAME_CHARS: usize = 120;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("admin user already exists")]
    UserAlreadyExists,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}

pub struct AuthService<'a> {
    pool: &'a PgPool,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Check an email and password and record the login.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email, a
    /// malformed email or a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminUser, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let repo = AdminUserRepository::new(self.pool);

        let Some((user, hash)) = repo.get_credentials_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &hash)?;
        repo.touch_last_login(user.id).await?;

        Ok(user)
    }

    /// Create an admin user with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `InvalidName` or `WeakPassword`
    /// for bad input and `AuthError::UserAlreadyExists` for a taken email.
    pub async fn create_admin(
        &self,
        email: &str,
        name: &str,
        role: AdminRole,
        password: &str,
    ) -> Result<AdminUser, AuthError> {
        let email = Email::parse(email)?;
        let name = validate_name(name)?;
        validate_password(password)?;
        let hash = hash_password(password)?;

        AdminUserRepository::new(self.pool)
            .create(&email, &name, role, &hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AuthError::InvalidName(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

/// Reject passwords shorter than [`MIN_PASSWORD_LENGTH`] characters.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the requirement.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unreadable hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
