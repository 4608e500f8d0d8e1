//! Trade error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::db::users::BudgetError;

/// Errors that can occur during a purchase or sale.
///
/// The business variants are not security-sensitive and may be shown to the
/// caller verbatim.
#[derive(Debug, Error)]
pub enum TradeError {
    /// No item with the submitted name exists.
    #[error("item not found")]
    ItemNotFound,

    /// The item already has an owner.
    #[error("item is already owned")]
    AlreadyOwned,

    /// The caller does not own the item they are trying to sell.
    #[error("item is not owned by you")]
    NotOwner,

    /// The buyer's budget does not cover the price.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<BudgetError> for TradeError {
    fn from(e: BudgetError) -> Self {
        match e {
            BudgetError::InsufficientFunds => Self::InsufficientFunds,
            BudgetError::UserNotFound => Self::Repository(RepositoryError::NotFound),
            BudgetError::Repository(other) => Self::Repository(other),
        }
    }
}
