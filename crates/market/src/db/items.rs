//! Item repository for database operations.
//!
//! The ownership ledger: `market.item` rows carry the current owner as a
//! nullable foreign key. Only the trade engine mutates the owner column in
//! normal operation; the conditional writes here are its building blocks.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use market_core::{ItemId, ItemName, UserId};

use super::RepositoryError;
use crate::models::Item;

/// Raw `market.item` row.
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i32,
    name: String,
    price: i64,
    barcode: String,
    description: String,
    owner_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_domain(self) -> Result<Item, RepositoryError> {
        let name = ItemName::parse(&self.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid item name in database: {e}"))
        })?;

        Ok(Item {
            id: ItemId::new(self.id),
            name,
            price: self.price,
            barcode: self.barcode,
            description: self.description,
            owner: self.owner_id.map(UserId::new),
            created_at: self.created_at,
        })
    }
}

const ITEM_COLUMNS: &str = "id, name, price, barcode, description, owner_id, created_at";

/// Repository for item database operations.
pub struct ItemRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new item, unowned.
    ///
    /// Seeding/admin entry point; the trade engine never creates items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or barcode already
    /// exists, `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &ItemName,
        price: i64,
        barcode: &str,
        description: &str,
    ) -> Result<Item, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(
            r#"
            INSERT INTO market.item (name, price, barcode, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, price, barcode, description, owner_id, created_at
            "#,
        )
        .bind(name.as_str())
        .bind(price)
        .bind(barcode)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("item name or barcode already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_domain()
    }

    /// Get an item by its name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_name(&self, name: &ItemName) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM market.item WHERE name = $1"
        ))
        .bind(name.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(ItemRow::into_domain).transpose()
    }

    /// Get an item by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM market.item WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(ItemRow::into_domain).transpose()
    }

    /// List all items currently available for purchase.
    ///
    /// A fresh query each call; the listing reflects the committed state at
    /// query time and can be re-run at will.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any stored row is invalid.
    pub async fn list_unowned(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM market.item WHERE owner_id IS NULL ORDER BY name ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ItemRow::into_domain).collect()
    }

    /// Assign or clear an item's owner unconditionally.
    ///
    /// Admin escape hatch; the trade engine uses the conditional
    /// [`claim`](Self::claim) and [`release`](Self::release) instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_owner(
        &self,
        id: ItemId,
        owner: Option<UserId>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE market.item SET owner_id = $2 WHERE id = $1")
            .bind(id.as_i32())
            .bind(owner.map(|o| o.as_i32()))
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Look up an item by name and lock its row for the remainder of the
    /// enclosing transaction.
    ///
    /// The trade engine re-queries here rather than trusting an item fetched
    /// earlier, so price and ownership are never stale at decision time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn fetch_by_name_for_update(
        conn: &mut PgConnection,
        name: &ItemName,
    ) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM market.item WHERE name = $1 FOR UPDATE"
        ))
        .bind(name.as_str())
        .fetch_optional(conn)
        .await?;

        row.map(ItemRow::into_domain).transpose()
    }

    /// Conditionally assign an owner to an unowned item.
    ///
    /// Returns `true` if this call won the assignment. The `owner_id IS
    /// NULL` guard means a concurrent claim can never silently overwrite an
    /// existing owner, independent of any row locking above it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim(
        conn: &mut PgConnection,
        id: ItemId,
        buyer: UserId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE market.item SET owner_id = $2 WHERE id = $1 AND owner_id IS NULL")
                .bind(id.as_i32())
                .bind(buyer.as_i32())
                .execute(conn)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Conditionally clear ownership, only if `owner` currently holds the
    /// item.
    ///
    /// Returns `true` if the item was released.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn release(
        conn: &mut PgConnection,
        id: ItemId,
        owner: UserId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE market.item SET owner_id = NULL WHERE id = $1 AND owner_id = $2")
                .bind(id.as_i32())
                .bind(owner.as_i32())
                .execute(conn)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
