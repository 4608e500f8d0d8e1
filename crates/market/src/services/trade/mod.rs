//! Trade engine: atomic buy/sell state transitions.
//!
//! Both operations mutate the (budget, owner) pair inside one database
//! transaction, so ownership and payment can never diverge: no item "paid
//! for but unowned" and none "owned but unpaid". The engine is the only
//! component that writes either field during normal operation.
//!
//! Locking protocol, shared by purchase and sell: the item row is locked
//! first, then the user row. A consistent order across both operations
//! keeps concurrent trades deadlock-free. On top of the locks, the actual
//! writes are conditional (`owner_id IS NULL`, `budget + delta >= 0`), so
//! a blind overwrite is impossible even if the locking above were wrong.

mod error;

pub use error::TradeError;

use sqlx::PgPool;

use market_core::{ItemName, UserId};

use crate::db::RepositoryError;
use crate::db::items::ItemRepository;
use crate::db::users::UserRepository;
use crate::models::{Item, User};

/// Post-commit snapshots returned by a successful trade.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    /// The item with its new owner state.
    pub item: Item,
    /// The counterparty with their new budget.
    pub user: User,
}

/// Executes purchases and sales as atomic state transitions.
pub struct TradeService<'a> {
    pool: &'a PgPool,
}

impl<'a> TradeService<'a> {
    /// Create a new trade service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Purchase the named item on behalf of `buyer`.
    ///
    /// The item is re-queried (and locked) inside the transaction rather
    /// than trusted from an earlier fetch, so the price and ownership
    /// checks always see current committed state. Among concurrent buyers
    /// of the same item, exactly one succeeds; the rest observe
    /// [`TradeError::AlreadyOwned`].
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound`, `AlreadyOwned`, or `InsufficientFunds` as
    /// business outcomes; `Repository` for storage faults. Every error path
    /// rolls the transaction back, leaving both records untouched.
    pub async fn purchase(
        &self,
        buyer: UserId,
        item_name: &ItemName,
    ) -> Result<TradeOutcome, TradeError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let item = ItemRepository::fetch_by_name_for_update(&mut *tx, item_name)
            .await?
            .ok_or(TradeError::ItemNotFound)?;

        if item.owner.is_some() {
            return Err(TradeError::AlreadyOwned);
        }

        let user = UserRepository::fetch_for_update(&mut *tx, buyer)
            .await?
            .ok_or(TradeError::Repository(RepositoryError::NotFound))?;

        if user.budget < item.price {
            tracing::debug!(
                user_id = %buyer,
                item = %item.name,
                "purchase rejected: insufficient funds"
            );
            return Err(TradeError::InsufficientFunds);
        }

        let (budget, updated_at) =
            UserRepository::adjust_budget(&mut *tx, buyer, -item.price).await?;

        if !ItemRepository::claim(&mut *tx, item.id, buyer).await? {
            // Unreachable while the row lock holds; the conditional write is
            // still the final authority on ownership.
            return Err(TradeError::AlreadyOwned);
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %buyer, item = %item.name, price = item.price, "purchase committed");

        Ok(TradeOutcome {
            item: Item {
                owner: Some(buyer),
                ..item
            },
            user: User {
                budget,
                updated_at,
                ..user
            },
        })
    }

    /// Sell the named item back to the market on behalf of `seller`.
    ///
    /// Clears ownership and credits the full price in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or `NotOwner` as business outcomes;
    /// `Repository` for storage faults. Every error path rolls the
    /// transaction back.
    pub async fn sell(
        &self,
        seller: UserId,
        item_name: &ItemName,
    ) -> Result<TradeOutcome, TradeError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let item = ItemRepository::fetch_by_name_for_update(&mut *tx, item_name)
            .await?
            .ok_or(TradeError::ItemNotFound)?;

        if !item.is_owned_by(seller) {
            return Err(TradeError::NotOwner);
        }

        let user = UserRepository::fetch_for_update(&mut *tx, seller)
            .await?
            .ok_or(TradeError::Repository(RepositoryError::NotFound))?;

        if !ItemRepository::release(&mut *tx, item.id, seller).await? {
            return Err(TradeError::NotOwner);
        }

        let (budget, updated_at) =
            UserRepository::adjust_budget(&mut *tx, seller, item.price).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %seller, item = %item.name, price = item.price, "sale committed");

        Ok(TradeOutcome {
            item: Item { owner: None, ..item },
            user: User {
                budget,
                updated_at,
                ..user
            },
        })
    }
}
