//! Authentication service.
//!
//! Registration and credential verification over the user repository.
//! Password handling lives in [`password`]; plaintext is discarded as soon
//! as it is hashed.

mod error;
pub mod password;

pub use error::AuthError;

use sqlx::PgPool;

use market_core::{Email, Username};

use crate::db::users::{CreateUserError, UserRepository};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Authentication service.
///
/// Handles user registration and login-time credential checks.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with username, email, and password.
    ///
    /// The new account starts with the default budget. Uniqueness is decided
    /// by the insert itself, so two concurrent registrations of the same
    /// name cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` / `InvalidEmail` /
    /// `WeakPassword` if a field fails shape validation,
    /// `AuthError::DuplicateName` / `DuplicateEmail` if already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let name = Username::parse(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = password::hash_password(password)?;

        let user = self
            .users
            .create(&name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                CreateUserError::DuplicateName => AuthError::DuplicateName,
                CreateUserError::DuplicateEmail => AuthError::DuplicateEmail,
                CreateUserError::Repository(other) => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "registered new user");

        Ok(user)
    }

    /// Verify a username/password pair and return the matching user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown username and
    /// for a wrong password alike; callers cannot tell the two apart.
    pub async fn verify_credentials(
        &self,
        name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        // A name that doesn't parse can't be registered, so it is the same
        // unified failure as an unknown user.
        let name = Username::parse(name).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&name)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(&password_hash, password) {
            tracing::warn!(user_id = %user.id, "rejected login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: market_core::UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("12345"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_minimum_password_accepted() {
        assert!(validate_password("123456").is_ok());
    }
}
