//! Item domain types.

use chrono::{DateTime, Utc};

use market_core::{ItemId, ItemName, UserId};

/// A market item (domain type).
///
/// `owner == None` means the item is unowned and eligible for purchase.
#[derive(Debug, Clone)]
pub struct Item {
    /// Unique item ID.
    pub id: ItemId,
    /// Unique display name, doubles as the purchase lookup key.
    pub name: ItemName,
    /// Price in whole currency units. Immutable after creation.
    pub price: i64,
    /// Unique 12-character product barcode.
    pub barcode: String,
    /// Free-text description.
    pub description: String,
    /// Current owner, if any.
    pub owner: Option<UserId>,
    /// When the item was created.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Whether the item is available for purchase.
    #[must_use]
    pub const fn is_unowned(&self) -> bool {
        self.owner.is_none()
    }

    /// Whether the given user currently owns this item.
    #[must_use]
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner == Some(user_id)
    }
}
