//! Session token service.
//!
//! Stateless signed tokens: `base64url(claims) . base64url(hmac-sha256)`.
//! The claims carry only the user id and an expiry timestamp; there is no
//! server-side session table, so signature validity is the single source of
//! truth. The token proves identity without embedding anything sensitive.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use market_core::UserId;

use crate::models::Identity;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when issuing a session token.
///
/// Resolution never errors; invalid tokens degrade to
/// [`Identity::Anonymous`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Token signing failed. Not user-recoverable.
    #[error("token signing failed")]
    Signing,
}

/// Signed token claims.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject: the authenticated user's id.
    sub: i32,
    /// Expiry as unix seconds.
    exp: i64,
}

/// Issues and resolves signed session tokens.
pub struct SessionService {
    secret: SecretString,
    ttl: Duration,
}

impl SessionService {
    /// Create a session service signing with `secret`, issuing tokens valid
    /// for `ttl_days`.
    #[must_use]
    pub fn new(secret: SecretString, ttl_days: i64) -> Self {
        Self {
            secret,
            ttl: Duration::days(ttl_days),
        }
    }

    /// Issue a token binding to `user_id`, valid for the configured TTL.
    ///
    /// Called after a successful credential check or registration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Signing` on internal failure.
    pub fn establish(&self, user_id: UserId) -> Result<String, SessionError> {
        let claims = Claims {
            sub: user_id.as_i32(),
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| SessionError::Signing)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Resolve a token to a caller identity.
    ///
    /// Every failure mode - missing token, undecodable parts, bad signature,
    /// unparseable claims, expiry in the past - yields
    /// [`Identity::Anonymous`]. An invalid session is "not logged in", never
    /// a fault.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Identity {
        let Some((payload_b64, signature_b64)) = token.split_once('.') else {
            return Identity::Anonymous;
        };

        let Ok(payload) = URL_SAFE_NO_PAD.decode(payload_b64) else {
            return Identity::Anonymous;
        };
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature_b64) else {
            return Identity::Anonymous;
        };

        let Ok(mut mac) = self.mac() else {
            return Identity::Anonymous;
        };
        mac.update(&payload);
        // Constant-time comparison.
        if mac.verify_slice(&signature).is_err() {
            return Identity::Anonymous;
        }

        let Ok(claims) = serde_json::from_slice::<Claims>(&payload) else {
            return Identity::Anonymous;
        };

        if claims.exp <= Utc::now().timestamp() {
            return Identity::Anonymous;
        }

        Identity::Authenticated(UserId::new(claims.sub))
    }

    /// Invalidate a session on the client.
    ///
    /// With no server-side session list, revocation is client-local: the
    /// held token is replaced with the empty value, which can never resolve.
    /// Other sessions of the same user are unaffected, and a token stolen
    /// before revocation remains valid until its natural expiry.
    #[must_use]
    pub const fn revoke(_token: &str) -> &'static str {
        ""
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        // HMAC accepts keys of any length; this fails only if the hmac
        // crate's invariants change.
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SessionError::Signing)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service() -> SessionService {
        SessionService::new(SecretString::from("kQ9vR2mX8pL4nW7jC3hF6dT1bY5gZ0aU"), 14)
    }

    #[test]
    fn test_establish_resolve_roundtrip() {
        let sessions = service();
        let token = sessions.establish(UserId::new(7)).unwrap();
        assert_eq!(
            sessions.resolve(&token),
            Identity::Authenticated(UserId::new(7))
        );
    }

    #[test]
    fn test_resolve_is_stable_across_calls() {
        let sessions = service();
        let token = sessions.establish(UserId::new(3)).unwrap();
        assert_eq!(sessions.resolve(&token), sessions.resolve(&token));
    }

    #[test]
    fn test_garbage_resolves_anonymous() {
        let sessions = service();
        assert_eq!(sessions.resolve(""), Identity::Anonymous);
        assert_eq!(sessions.resolve("no-dot-here"), Identity::Anonymous);
        assert_eq!(sessions.resolve("not!base64.not!base64"), Identity::Anonymous);
    }

    #[test]
    fn test_tampered_payload_resolves_anonymous() {
        let sessions = service();
        let token = sessions.establish(UserId::new(7)).unwrap();
        let (payload, signature) = token.split_once('.').unwrap();

        // Swap the subject to another user id, keeping the old signature.
        let claims = String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        let forged = claims.replace("\"sub\":7", "\"sub\":1");
        let forged_token = format!("{}.{signature}", URL_SAFE_NO_PAD.encode(forged));

        assert_eq!(sessions.resolve(&forged_token), Identity::Anonymous);
    }

    #[test]
    fn test_foreign_secret_resolves_anonymous() {
        let sessions = service();
        let other = SessionService::new(
            SecretString::from("aU0Zg5Yb1Td6Fh3Cj7Wn4Lp8Xm2Rv9Qk"),
            14,
        );
        let token = other.establish(UserId::new(7)).unwrap();
        assert_eq!(sessions.resolve(&token), Identity::Anonymous);
    }

    #[test]
    fn test_expired_token_resolves_anonymous() {
        let expired = SessionService::new(
            SecretString::from("kQ9vR2mX8pL4nW7jC3hF6dT1bY5gZ0aU"),
            -1,
        );
        let token = expired.establish(UserId::new(7)).unwrap();
        assert_eq!(expired.resolve(&token), Identity::Anonymous);
    }

    #[test]
    fn test_revoke_is_client_local() {
        let sessions = service();
        let token = sessions.establish(UserId::new(7)).unwrap();
        let cleared = SessionService::revoke(&token);

        assert_eq!(sessions.resolve(cleared), Identity::Anonymous);
        // The original token is still valid; nothing server-side changed.
        assert_eq!(
            sessions.resolve(&token),
            Identity::Authenticated(UserId::new(7))
        );
    }
}
