//! Session-identity types.

use serde::{Deserialize, Serialize};

use market_core::UserId;

/// The caller identity derived from a session token.
///
/// Ephemeral: reconstructed from the token on every request, never persisted.
/// Any token failure (missing, tampered, expired, unparseable) degrades to
/// `Anonymous` rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// No valid session.
    Anonymous,
    /// A verified session bound to this user.
    Authenticated(UserId),
}

impl Identity {
    /// Whether this identity carries a verified user.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The verified user ID, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(id) => Some(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous() {
        assert!(!Identity::Anonymous.is_authenticated());
        assert_eq!(Identity::Anonymous.user_id(), None);
    }

    #[test]
    fn test_authenticated() {
        let identity = Identity::Authenticated(UserId::new(7));
        assert!(identity.is_authenticated());
        assert_eq!(identity.user_id(), Some(UserId::new(7)));
    }
}
