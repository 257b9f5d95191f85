//! # Vending Engine
//!
//! Entry points the hosting layer calls: deposit, purchase, reset, and the
//! product/account mutations. Each one takes the authenticated [`Caller`]
//! explicitly.
//!
//! ## Anatomy of a Purchase
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  purchase(caller, product_id, qty)                                     │
//! │       │                                                                 │
//! │       ├── role == buyer? qty >= 1? product_id >= 1?   (no I/O yet)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────── attempt (repeated on conflict) ─────────────────┐   │
//! │  │  read account (balance, version)   → AccountNotFound            │   │
//! │  │  read product (stock, version)     → ProductNotFound            │   │
//! │  │  plan_purchase (vend-core)         → InsufficientStock / Funds  │   │
//! │  │  build receipt (before any write)                               │   │
//! │  │  BEGIN                                                          │   │
//! │  │    UPDATE products SET stock   WHERE id AND version             │   │
//! │  │    UPDATE accounts SET balance WHERE id AND version             │   │
//! │  │  COMMIT                                                         │   │
//! │  │  either UPDATE matched 0 rows → rollback → Conflict             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ├── Conflict and attempts left → backoff, retry from the top     │
//! │       ├── Conflict and none left     → ConcurrencyConflict             │
//! │       └── whole thing > timeout      → Timeout                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Preconditions are re-checked against fresh rows on every attempt, so a
//! decision is never committed on a stale read.

pub mod error;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use tracing::{debug, error, info, warn};

use vend_core::policy::{authorize_account_mutation, authorize_product_mutation, require_role};
use vend_core::validation::{
    validate_new_product, validate_product_id, validate_product_patch, validate_quantity,
    validate_username,
};
use vend_core::{
    plan_purchase, validate_deposit, Account, AccountPatch, Caller, CoinInput, CoreError,
    DepositReceipt, Money, NewProduct, Product, ProductPatch, PurchaseReceipt, Role,
    ValidationError,
};

use crate::config::EngineSettings;
use crate::error::DbError;
use crate::pool::Database;
use crate::repository::account::AccountRepository;
use crate::repository::product::ProductRepository;

pub use self::error::{EngineError, EngineResult, ErrorKind};

/// The transaction engine.
///
/// Cheap to clone; clones share the database pool.
#[derive(Debug, Clone)]
pub struct VendingEngine {
    db: Database,
    accounts: AccountRepository,
    products: ProductRepository,
    settings: EngineSettings,
}

impl VendingEngine {
    /// Creates an engine over `db`.
    pub fn new(db: Database, settings: EngineSettings) -> Self {
        VendingEngine {
            accounts: db.accounts(),
            products: db.products(),
            db,
            settings,
        }
    }

    /// Returns the retry and timeout settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // =========================================================================
    // Money Operations
    // =========================================================================

    /// Adds a batch of coins to the caller's balance.
    ///
    /// ## Order of Checks
    /// 1. Caller is a buyer → `InvalidRole`
    /// 2. Coins are valid → `InvalidCoinDenomination` / `NonPositiveCoinCount`
    /// 3. Account exists → `AccountNotFound`
    ///
    /// The balance is left untouched on any failure.
    pub async fn deposit(&self, caller: &Caller, coins: &CoinInput) -> EngineResult<DepositReceipt> {
        require_role(caller, Role::Buyer, "deposit")?;
        let amount = validate_deposit(coins)?;

        let receipt = self
            .run("deposit", move || self.try_deposit(caller, amount))
            .await?;

        info!(
            user_id = %caller.user_id,
            deposited = amount.cents(),
            new_balance = receipt.new_balance.cents(),
            "Deposit accepted"
        );
        Ok(receipt)
    }

    /// Buys `quantity` units of a product with the caller's whole balance.
    ///
    /// The surplus comes back as coins in the receipt and the balance is
    /// set to zero. Stock and balance change together or not at all.
    pub async fn purchase(
        &self,
        caller: &Caller,
        product_id: i64,
        quantity: i64,
    ) -> EngineResult<PurchaseReceipt> {
        require_role(caller, Role::Buyer, "buy")?;
        validate_quantity(quantity)?;
        validate_product_id(product_id)?;

        let receipt = self
            .run("purchase", move || {
                self.try_purchase(caller, product_id, quantity)
            })
            .await?;

        info!(
            user_id = %caller.user_id,
            product_id,
            quantity,
            total_spent = receipt.total_spent.cents(),
            change = receipt.change.total().cents(),
            "Purchase completed"
        );
        Ok(receipt)
    }

    /// Discards the caller's balance. No coins are returned.
    pub async fn reset_deposit(&self, caller: &Caller) -> EngineResult<()> {
        require_role(caller, Role::Buyer, "reset")?;

        self.run("reset", move || self.try_reset(caller)).await?;

        info!(user_id = %caller.user_id, "Deposit reset");
        Ok(())
    }

    // =========================================================================
    // Product Operations
    // =========================================================================

    /// Lists a new product owned by the caller.
    pub async fn create_product(&self, caller: &Caller, product: &NewProduct) -> EngineResult<Product> {
        require_role(caller, Role::Seller, "create product")?;
        validate_new_product(product)?;

        let created = self
            .run("create product", move || {
                self.try_create_product(caller, product)
            })
            .await?;

        info!(
            seller_id = %caller.user_id,
            product_id = created.id,
            name = %created.name,
            "Product created"
        );
        Ok(created)
    }

    /// Applies a partial update to one of the caller's products.
    ///
    /// A missing product is reported before ownership, so `ProductNotFound`
    /// wins over `Unauthorized`.
    pub async fn update_product(
        &self,
        caller: &Caller,
        product_id: i64,
        patch: &ProductPatch,
    ) -> EngineResult<Product> {
        require_role(caller, Role::Seller, "update product")?;
        validate_product_id(product_id)?;
        validate_product_patch(patch)?;

        let updated = self
            .run("update product", move || {
                self.try_update_product(caller, product_id, patch)
            })
            .await?;

        info!(
            seller_id = %caller.user_id,
            product_id,
            version = updated.version,
            "Product updated"
        );
        Ok(updated)
    }

    /// Deletes one of the caller's products.
    pub async fn delete_product(&self, caller: &Caller, product_id: i64) -> EngineResult<()> {
        require_role(caller, Role::Seller, "delete product")?;
        validate_product_id(product_id)?;

        self.run("delete product", move || {
            self.try_delete_product(caller, product_id)
        })
        .await?;

        info!(seller_id = %caller.user_id, product_id, "Product deleted");
        Ok(())
    }

    /// Gets a product by id.
    pub async fn get_product(&self, product_id: i64) -> EngineResult<Product> {
        self.load_product(product_id).await
    }

    /// Lists every product.
    pub async fn list_products(&self) -> EngineResult<Vec<Product>> {
        Ok(self.products.list().await?)
    }

    /// Lists the products a seller owns.
    pub async fn list_products_by_seller(&self, seller_id: &str) -> EngineResult<Vec<Product>> {
        Ok(self.products.list_by_seller(seller_id).await?)
    }

    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Creates an account with a zero balance.
    ///
    /// Credentials are the identity subsystem's business; this only records
    /// the username and role.
    pub async fn register_account(&self, username: &str, role: Role) -> EngineResult<Account> {
        validate_username(username)?;
        let username = username.trim();

        let account = self
            .run("register account", move || {
                self.try_register_account(username, role)
            })
            .await?;

        info!(user_id = %account.id, username = %account.username, role = %role, "Account registered");
        Ok(account)
    }

    /// Gets an account by id.
    pub async fn get_account(&self, user_id: &str) -> EngineResult<Account> {
        self.load_account(user_id).await
    }

    /// Updates the caller's own account.
    pub async fn update_account(
        &self,
        caller: &Caller,
        target_user_id: &str,
        patch: &AccountPatch,
    ) -> EngineResult<Account> {
        authorize_account_mutation(caller, target_user_id)?;

        let username = patch
            .username
            .as_deref()
            .ok_or_else(|| ValidationError::Required {
                field: "username".to_string(),
            })?;
        validate_username(username)?;
        let username = username.trim();

        let account = self
            .run("update account", move || {
                self.try_update_username(target_user_id, username)
            })
            .await?;

        info!(user_id = %account.id, username = %account.username, "Account updated");
        Ok(account)
    }

    /// Deletes the caller's own account. A seller's products go with it.
    pub async fn delete_account(&self, caller: &Caller, target_user_id: &str) -> EngineResult<()> {
        authorize_account_mutation(caller, target_user_id)?;

        self.run("delete account", move || {
            self.try_delete_account(target_user_id)
        })
        .await?;

        info!(user_id = %target_user_id, "Account deleted");
        Ok(())
    }

    // =========================================================================
    // Single Attempts
    // =========================================================================

    async fn try_deposit(&self, caller: &Caller, amount: Money) -> EngineResult<DepositReceipt> {
        let account = self.load_account(&caller.user_id).await?;

        let new_balance = account
            .balance()
            .checked_add(amount)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "balance".to_string(),
                min: 0,
                max: i64::MAX,
            })?;

        let mut conn = self.db.pool().acquire().await?;
        self.accounts
            .set_balance_if_version(&mut *conn, &account.id, account.version, new_balance)
            .await?;

        Ok(DepositReceipt::new(amount, new_balance))
    }

    async fn try_purchase(
        &self,
        caller: &Caller,
        product_id: i64,
        quantity: i64,
    ) -> EngineResult<PurchaseReceipt> {
        let account = self.load_account(&caller.user_id).await?;
        let product = self.load_product(product_id).await?;

        let plan = plan_purchase(&account, &product, quantity).map_err(flag_invariant_violation)?;

        // Products cascade with their seller, so a missing seller means the
        // product is gone too.
        let seller = self
            .accounts
            .get(&product.seller_id)
            .await?
            .ok_or(CoreError::ProductNotFound(product_id))?;

        // Built before the commit so nothing can fail once money has moved.
        let receipt = plan.receipt(&product, &seller.username);

        debug!(
            product_id,
            product_version = product.version,
            account_version = account.version,
            total = plan.total_cost.cents(),
            "Committing purchase"
        );

        let mut tx = self.db.pool().begin().await?;
        self.products
            .set_stock_if_version(&mut *tx, product.id, product.version, plan.remaining_stock)
            .await?;
        self.accounts
            .set_balance_if_version(&mut *tx, &account.id, account.version, plan.new_balance)
            .await?;
        tx.commit().await?;

        Ok(receipt)
    }

    async fn try_reset(&self, caller: &Caller) -> EngineResult<()> {
        self.accounts
            .set_balance(&caller.user_id, Money::zero())
            .await
            .map_err(|e| not_found_as(e, CoreError::AccountNotFound(caller.user_id.clone())))
    }

    async fn try_create_product(&self, caller: &Caller, product: &NewProduct) -> EngineResult<Product> {
        let seller = self.load_account(&caller.user_id).await?;
        Ok(self.products.insert(&seller.id, product).await?)
    }

    async fn try_update_product(
        &self,
        caller: &Caller,
        product_id: i64,
        patch: &ProductPatch,
    ) -> EngineResult<Product> {
        let product = self.load_product(product_id).await?;
        authorize_product_mutation(caller, &product)?;

        let updated = patch.apply_to(&product);
        Ok(self.products.update_if_version(&updated).await?)
    }

    async fn try_delete_product(&self, caller: &Caller, product_id: i64) -> EngineResult<()> {
        let product = self.load_product(product_id).await?;
        authorize_product_mutation(caller, &product)?;

        self.products
            .delete_owned(product.id, &caller.user_id)
            .await
            .map_err(|e| not_found_as(e, CoreError::ProductNotFound(product_id)))
    }

    async fn try_register_account(&self, username: &str, role: Role) -> EngineResult<Account> {
        self.accounts
            .create(username, role)
            .await
            .map_err(|e| duplicate_as(e, username))
    }

    async fn try_update_username(&self, user_id: &str, username: &str) -> EngineResult<Account> {
        self.accounts
            .update_username(user_id, username)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => duplicate_as(e, username),
                other => not_found_as(other, CoreError::AccountNotFound(user_id.to_string())),
            })?;

        self.load_account(user_id).await
    }

    async fn try_delete_account(&self, user_id: &str) -> EngineResult<()> {
        self.accounts
            .delete(user_id)
            .await
            .map_err(|e| not_found_as(e, CoreError::AccountNotFound(user_id.to_string())))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_account(&self, user_id: &str) -> EngineResult<Account> {
        self.accounts
            .get(user_id)
            .await?
            .ok_or_else(|| CoreError::AccountNotFound(user_id.to_string()).into())
    }

    async fn load_product(&self, product_id: i64) -> EngineResult<Product> {
        self.products
            .get(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id).into())
    }

    /// Runs `attempt` until it stops reporting a conflict, within the
    /// operation timeout.
    ///
    /// ## Outcomes
    /// - anything other than a conflict → returned as-is
    /// - conflict with attempts left → sleep (exponential backoff), retry
    /// - conflict on the last attempt → `ConcurrencyConflict`
    /// - timeout first → `Timeout`; the in-flight attempt is dropped, which
    ///   rolls back any open transaction
    async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut backoff = self.create_backoff();

        let retrying = async {
            let mut attempts = 0u32;
            loop {
                attempts += 1;
                match attempt().await {
                    Err(err) if err.is_conflict() => {
                        if attempts >= max_attempts {
                            warn!(operation, attempts, "Giving up after repeated conflicts");
                            return Err(EngineError::ConcurrencyConflict { attempts });
                        }

                        let delay = backoff
                            .next_backoff()
                            .unwrap_or_else(|| self.settings.max_backoff());
                        warn!(operation, attempt = attempts, ?delay, "Concurrent update detected, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    result => return result,
                }
            }
        };

        match tokio::time::timeout(self.settings.operation_timeout(), retrying).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.settings.operation_timeout_ms,
                    "Operation timed out"
                );
                Err(EngineError::Timeout {
                    after_ms: self.settings.operation_timeout_ms,
                })
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.settings.initial_backoff(),
            initial_interval: self.settings.initial_backoff(),
            max_interval: self.settings.max_backoff(),
            multiplier: 2.0,
            // Bounded by max_attempts and the operation timeout instead.
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Maps a store-level NotFound to the domain error, passing others through.
fn not_found_as(err: DbError, missing: CoreError) -> EngineError {
    match err {
        DbError::NotFound { .. } => missing.into(),
        other => other.into(),
    }
}

fn duplicate_as(err: DbError, username: &str) -> EngineError {
    match err {
        DbError::UniqueViolation { .. } => EngineError::DuplicateUsername(username.to_string()),
        other => other.into(),
    }
}

fn flag_invariant_violation(err: CoreError) -> CoreError {
    if let CoreError::UnrepresentableAmount { amount, remainder } = &err {
        error!(amount, remainder, "Stored balance cannot be paid out in coins");
    }
    err
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    async fn engine_with(settings: EngineSettings) -> VendingEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.engine(settings)
    }

    fn fast_settings() -> EngineSettings {
        EngineSettings {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            operation_timeout_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn test_run_retries_conflicts_then_succeeds() {
        let engine = engine_with(fast_settings()).await;
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = engine
            .run("test", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(EngineError::from(DbError::conflict("Product", "1")))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let engine = engine_with(fast_settings()).await;
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: EngineResult<()> = engine
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(EngineError::from(DbError::conflict("Account", "a")))
            })
            .await;

        assert!(matches!(
            result,
            Err(EngineError::ConcurrencyConflict { attempts: 3 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_domain_errors() {
        let engine = engine_with(fast_settings()).await;
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: EngineResult<()> = engine
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(EngineError::from(CoreError::ProductNotFound(9)))
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ProductNotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_times_out_with_retryable_error() {
        let engine = engine_with(EngineSettings {
            operation_timeout_ms: 20,
            ..fast_settings()
        })
        .await;

        let result: EngineResult<()> = engine
            .run("test", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<(), EngineError>(())
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, EngineError::Timeout { after_ms: 20 }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_not_found_mapping() {
        let err = not_found_as(
            DbError::not_found("Account", "a"),
            CoreError::AccountNotFound("a".into()),
        );
        assert_eq!(err.kind(), ErrorKind::AccountNotFound);

        let err = not_found_as(DbError::PoolExhausted, CoreError::AccountNotFound("a".into()));
        assert_eq!(err.kind(), ErrorKind::DatabaseError);
    }
}
