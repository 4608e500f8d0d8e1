//! Password hashing primitives.
//!
//! One-way Argon2id hashing with a random per-call salt. Verification is
//! total: a malformed stored digest is a failed verification, never a panic,
//! so corrupted data degrades to "login denied".

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use super::AuthError;

/// Hash a password using Argon2id.
///
/// The salt is generated internally, so hashing the same input twice yields
/// different digests.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` on internal hasher failure. This is not
/// a user-recoverable condition.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a candidate password against a stored digest.
///
/// Returns `false` for a wrong password and for a digest that does not parse
/// as a PHC string.
#[must_use]
pub fn verify_password(digest: &str, candidate: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(digest) else {
        return false;
    };

    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed_hash)
        .is_ok()
}
