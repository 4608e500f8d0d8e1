//! User repository for database operations.
//!
//! Maps between `market.user` rows and the [`User`] domain type. Uniqueness
//! is enforced by insert-then-reject: the database unique constraints are the
//! only authority, so concurrent registrations cannot race past a pre-check.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use market_core::{Email, UserId, Username};

use super::RepositoryError;
use crate::models::User;

/// Unique constraint names from the schema, used to tell apart which field
/// collided on insert.
const NAME_CONSTRAINT: &str = "user_name_key";
const EMAIL_CONSTRAINT: &str = "user_email_key";

/// Errors from [`UserRepository::create`].
#[derive(Debug, Error)]
pub enum CreateUserError {
    /// The username is already taken.
    #[error("username already taken")]
    DuplicateName,

    /// The email address is already registered.
    #[error("email address already registered")]
    DuplicateEmail,

    /// Any other repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from [`UserRepository::adjust_budget`].
#[derive(Debug, Error)]
pub enum BudgetError {
    /// The adjustment would take the budget below zero. Nothing was mutated.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// The user row does not exist.
    #[error("user not found")]
    UserNotFound,

    /// Any other repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Raw `market.user` row.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    budget: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert a row into the domain type.
    ///
    /// Stored values should always re-validate; a failure here means the
    /// database contains data this code never wrote.
    fn into_domain(self) -> Result<User, RepositoryError> {
        let name = Username::parse(&self.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(User {
            id: UserId::new(self.id),
            name,
            email,
            budget: self.budget,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, budget, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user with the default starting budget.
    ///
    /// The plaintext password never reaches this layer; callers hash first.
    ///
    /// # Errors
    ///
    /// Returns `CreateUserError::DuplicateName` / `DuplicateEmail` if the
    /// corresponding unique constraint is violated, `Repository` for other
    /// database errors.
    pub async fn create(
        &self,
        name: &Username,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, CreateUserError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO market."user" (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, budget, created_at, updated_at
            "#,
        )
        .bind(name.as_str())
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return match db_err.constraint() {
                    Some(NAME_CONSTRAINT) => CreateUserError::DuplicateName,
                    Some(EMAIL_CONSTRAINT) => CreateUserError::DuplicateEmail,
                    _ => CreateUserError::Repository(RepositoryError::Conflict(
                        "unexpected unique violation on user insert".to_owned(),
                    )),
                };
            }
            CreateUserError::Repository(RepositoryError::Database(e))
        })?;

        Ok(row.into_domain()?)
    }

    /// Get a user by their login name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_name(&self, name: &Username) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM market."user" WHERE name = $1"#
        ))
        .bind(name.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_domain).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM market."user" WHERE id = $1"#
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_domain).transpose()
    }

    /// Get a user together with their stored password hash, by login name.
    ///
    /// Returns `None` if no such user exists; the caller treats that the
    /// same as a wrong password so the two cases stay indistinguishable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        name: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct UserWithHashRow {
            #[sqlx(flatten)]
            user: UserRow,
            password_hash: String,
        }

        let row = sqlx::query_as::<_, UserWithHashRow>(
            r#"
            SELECT id, name, email, budget, created_at, updated_at, password_hash
            FROM market."user"
            WHERE name = $1
            "#,
        )
        .bind(name.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        Ok(Some((r.user.into_domain()?, r.password_hash)))
    }

    /// Lock a user row for the remainder of the enclosing transaction and
    /// return the current snapshot.
    ///
    /// Serializes concurrent budget mutations on the same user; callers must
    /// hold an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn fetch_for_update(
        conn: &mut PgConnection,
        id: UserId,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"SELECT {USER_COLUMNS} FROM market."user" WHERE id = $1 FOR UPDATE"#
        ))
        .bind(id.as_i32())
        .fetch_optional(conn)
        .await?;

        row.map(UserRow::into_domain).transpose()
    }

    /// Apply `delta` to a user's budget, only if the result stays `>= 0`.
    ///
    /// Negative for a purchase, positive for a sale. The guard is part of
    /// the `UPDATE` itself, so a stale in-process budget snapshot can never
    /// overdraw the account. Takes a connection rather than the pool so the
    /// trade engine can run it inside its transaction.
    ///
    /// Returns the new budget and row timestamp on success.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InsufficientFunds` if the adjustment would go
    /// negative (no mutation), `BudgetError::UserNotFound` if the row does
    /// not exist.
    pub async fn adjust_budget(
        conn: &mut PgConnection,
        id: UserId,
        delta: i64,
    ) -> Result<(i64, DateTime<Utc>), BudgetError> {
        let updated: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            UPDATE market."user"
            SET budget = budget + $2, updated_at = now()
            WHERE id = $1 AND budget + $2 >= 0
            RETURNING budget, updated_at
            "#,
        )
        .bind(id.as_i32())
        .bind(delta)
        .fetch_optional(&mut *conn)
        .await
        .map_err(RepositoryError::from)?;

        if let Some(row) = updated {
            return Ok(row);
        }

        // Distinguish a missing row from a rejected overdraw.
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM market."user" WHERE id = $1)"#)
                .bind(id.as_i32())
                .fetch_one(conn)
                .await
                .map_err(RepositoryError::from)?;

        if exists {
            Err(BudgetError::InsufficientFunds)
        } else {
            Err(BudgetError::UserNotFound)
        }
    }
}
