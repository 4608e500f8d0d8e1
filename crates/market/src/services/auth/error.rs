//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// `DuplicateName` and `DuplicateEmail` are safe to show on the registration
/// form; login failures collapse into the single `InvalidCredentials` so the
/// response never reveals whether the username exists.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid username shape.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] market_core::UsernameError),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] market_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Username already taken.
    #[error("username already exists")]
    DuplicateName,

    /// Email address already registered.
    #[error("email address already exists")]
    DuplicateEmail,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
