//! User domain types.

use chrono::{DateTime, Utc};

use market_core::{Email, UserId, Username};

/// A registered market user (domain type).
///
/// The password hash lives only in the credential store; it is never part of
/// this type, so a `User` can cross the service boundary freely.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub name: Username,
    /// User's email address.
    pub email: Email,
    /// Spendable balance in whole currency units. Never negative.
    pub budget: i64,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Budget assigned to every new account.
    pub const STARTING_BUDGET: i64 = 1000;

    /// Budget formatted with thousands separators, e.g. `1,000$`.
    #[must_use]
    pub fn pretty_budget(&self) -> String {
        let digits = self.budget.unsigned_abs().to_string();
        let len = digits.len();

        let mut pretty = String::with_capacity(len + len / 3 + 2);
        if self.budget < 0 {
            pretty.push('-');
        }
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                pretty.push(',');
            }
            pretty.push(c);
        }
        pretty.push('$');
        pretty
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user_with_budget(budget: i64) -> User {
        User {
            id: UserId::new(1),
            name: Username::parse("rahul").unwrap(),
            email: Email::parse("rahul@example.com").unwrap(),
            budget,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pretty_budget_small() {
        assert_eq!(user_with_budget(500).pretty_budget(), "500$");
    }

    #[test]
    fn test_pretty_budget_thousands() {
        assert_eq!(user_with_budget(1000).pretty_budget(), "1,000$");
        assert_eq!(user_with_budget(12500).pretty_budget(), "12,500$");
        assert_eq!(user_with_budget(1_234_567).pretty_budget(), "1,234,567$");
    }

    #[test]
    fn test_pretty_budget_negative_keeps_sign_placement() {
        // Committed budgets are never negative; the formatter still must not
        // scramble one if it ever sees it.
        assert_eq!(user_with_budget(-100).pretty_budget(), "-100$");
        assert_eq!(user_with_budget(-1000).pretty_budget(), "-1,000$");
    }
}
