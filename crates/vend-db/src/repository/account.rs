//! # Account Repository
//!
//! Database operations for buyer and seller accounts.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vend_core::{Account, Money, Role};

const ACCOUNT_COLUMNS: &str =
    "id, username, balance_cents, role, version, created_at, updated_at";

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Gets an account by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Gets an account by username.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE username = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Lists all accounts, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts ORDER BY created_at, username",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = accounts.len(), "Listed accounts");
        Ok(accounts)
    }

    /// Inserts an account record as-is.
    pub async fn insert(&self, account: &Account) -> DbResult<()> {
        debug!(id = %account.id, username = %account.username, "Inserting account");

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, username, balance_cents, role, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(account.balance_cents)
        .bind(account.role)
        .bind(account.version)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &account.username),
            other => other,
        })?;

        Ok(())
    }

    /// Creates a new account with a fresh UUID and zero balance.
    pub async fn create(&self, username: &str, role: Role) -> DbResult<Account> {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            balance_cents: 0,
            role,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.insert(&account).await?;
        Ok(account)
    }

    /// Sets the balance unconditionally.
    ///
    /// A single UPDATE, so it cannot interleave with another writer.
    pub async fn set_balance(&self, id: &str, balance: Money) -> DbResult<()> {
        debug!(id = %id, balance = %balance, "Setting balance");

        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                balance_cents = ?2,
                version = version + 1,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(balance.cents())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        Ok(())
    }

    /// Sets the balance only if the row is still at `expected_version`.
    ///
    /// Runs on the caller's connection so it can share a transaction with
    /// other writes.
    pub async fn set_balance_if_version(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        expected_version: i64,
        balance: Money,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                balance_cents = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(balance.cents())
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            debug!(id = %id, expected_version, "Account version check lost");
            return Err(DbError::conflict("Account", id));
        }

        Ok(())
    }

    /// Changes the username.
    pub async fn update_username(&self, id: &str, username: &str) -> DbResult<()> {
        debug!(id = %id, username = %username, "Updating username");

        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                username = ?2,
                version = version + 1,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, username),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        Ok(())
    }

    /// Deletes an account. The seller's products go with it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting account");

        let result = sqlx::query("DELETE FROM accounts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }

        Ok(())
    }

    /// Counts all accounts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> AccountRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().accounts()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let accounts = repo().await;
        let created = accounts.create("buyer1", Role::Buyer).await.unwrap();

        let fetched = accounts.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "buyer1");
        assert_eq!(fetched.balance_cents, 0);
        assert_eq!(fetched.role, Role::Buyer);
        assert_eq!(fetched.version, 0);

        let by_name = accounts.get_by_username("buyer1").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);

        assert!(accounts.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let accounts = repo().await;
        accounts.create("seller1", Role::Seller).await.unwrap();

        let err = accounts.create("seller1", Role::Buyer).await.unwrap_err();
        match err {
            DbError::UniqueViolation { value, .. } => assert_eq!(value, "seller1"),
            other => panic!("expected UniqueViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_balance_bumps_version() {
        let accounts = repo().await;
        let account = accounts.create("buyer1", Role::Buyer).await.unwrap();

        accounts
            .set_balance(&account.id, Money::from_cents(250))
            .await
            .unwrap();

        let fetched = accounts.get(&account.id).await.unwrap().unwrap();
        assert_eq!(fetched.balance_cents, 250);
        assert_eq!(fetched.version, 1);

        let err = accounts
            .set_balance("missing", Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict() {
        let accounts = repo().await;
        let account = accounts.create("buyer1", Role::Buyer).await.unwrap();
        let mut conn = accounts.pool.acquire().await.unwrap();

        accounts
            .set_balance_if_version(&mut conn, &account.id, 0, Money::from_cents(100))
            .await
            .unwrap();

        let err = accounts
            .set_balance_if_version(&mut conn, &account.id, 0, Money::from_cents(200))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        drop(conn);

        let fetched = accounts.get(&account.id).await.unwrap().unwrap();
        assert_eq!(fetched.balance_cents, 100);
    }

    #[tokio::test]
    async fn test_check_constraint_backs_balance_invariant() {
        let accounts = repo().await;
        let account = accounts.create("buyer1", Role::Buyer).await.unwrap();

        let err = accounts
            .set_balance(&account.id, Money::from_cents(7))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let accounts = repo().await;
        let account = accounts.create("buyer1", Role::Buyer).await.unwrap();

        accounts.update_username(&account.id, "buyer_one").await.unwrap();
        let fetched = accounts.get(&account.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "buyer_one");

        assert_eq!(accounts.count().await.unwrap(), 1);
        accounts.delete(&account.id).await.unwrap();
        assert_eq!(accounts.count().await.unwrap(), 0);
        assert!(accounts.delete(&account.id).await.is_err());
    }
}
