//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations
//! - Ownership queries by seller
//! - Versioned stock updates for purchases
//!
//! ## Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Engine read:  Pepsi  stock 15  version 4                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE products SET stock = 12, version = 5                           │
//! │  WHERE id = 2 AND version = 4                                          │
//! │       │                                                                 │
//! │       ├── 1 row  → stock is 12, nobody raced us                        │
//! │       └── 0 rows → someone else wrote first → Conflict, re-read        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use vend_core::{NewProduct, Product};

const PRODUCT_COLUMNS: &str =
    "id, name, cost_cents, stock, seller_id, version, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.insert(&seller.id, &new_product).await?;
/// let mine = repo.list_by_seller(&seller.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products by id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Lists the products owned by one seller.
    pub async fn list_by_seller(&self, seller_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE seller_id = ?1 ORDER BY id",
            PRODUCT_COLUMNS
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(seller_id = %seller_id, count = products.len(), "Listed seller products");
        Ok(products)
    }

    /// Inserts a product for `seller_id` and returns it with its new id.
    pub async fn insert(&self, seller_id: &str, product: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let name = product.name.trim();

        debug!(seller_id = %seller_id, name = %name, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                name, cost_cents, stock, seller_id, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
            "#,
        )
        .bind(name)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(seller_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            cost_cents: product.cost_cents,
            stock: product.stock,
            seller_id: seller_id.to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Writes name, cost and stock from `product` if the row is still at
    /// `product.version`. Returns the stored row.
    pub async fn update_if_version(&self, product: &Product) -> DbResult<Product> {
        let now = Utc::now();

        debug!(id = product.id, version = product.version, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3,
                cost_cents = ?4,
                stock = ?5,
                version = version + 1,
                updated_at = ?6
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(product.id)
        .bind(product.version)
        .bind(&product.name)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Product", product.id.to_string()));
        }

        Ok(Product {
            version: product.version + 1,
            updated_at: now,
            ..product.clone()
        })
    }

    /// Sets the stock unconditionally.
    pub async fn set_stock(&self, id: i64, stock: i64) -> DbResult<()> {
        debug!(id, stock, "Setting stock");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock = ?2,
                version = version + 1,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }

        Ok(())
    }

    /// Sets the stock only if the row is still at `expected_version`.
    ///
    /// Runs on the caller's connection so it can share a transaction with
    /// the buyer's balance update.
    pub async fn set_stock_if_version(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        expected_version: i64,
        stock: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                stock = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(stock)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            debug!(id, expected_version, "Product version check lost");
            return Err(DbError::conflict("Product", id.to_string()));
        }

        Ok(())
    }

    /// Deletes a product if `seller_id` owns it.
    pub async fn delete_owned(&self, id: i64, seller_id: &str) -> DbResult<()> {
        debug!(id, seller_id = %seller_id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1 AND seller_id = ?2")
            .bind(id)
            .bind(seller_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id.to_string()));
        }

        Ok(())
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
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
    use vend_core::Role;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let seller = db.accounts().create("seller1", Role::Seller).await.unwrap();
        (db, seller.id)
    }

    fn cola() -> NewProduct {
        NewProduct {
            name: "Coca Cola".to_string(),
            cost_cents: 100,
            stock: 10,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let (db, seller_id) = setup().await;
        let products = db.products();

        let first = products.insert(&seller_id, &cola()).await.unwrap();
        let second = products
            .insert(
                &seller_id,
                &NewProduct {
                    name: "Pepsi".to_string(),
                    cost_cents: 95,
                    stock: 15,
                },
            )
            .await
            .unwrap();

        assert!(first.id >= 1);
        assert!(second.id > first.id);

        let fetched = products.get(first.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Coca Cola");
        assert_eq!(fetched.seller_id, seller_id);
        assert_eq!(products.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_for_unknown_seller_fails() {
        let (db, _) = setup().await;
        let err = db.products().insert("nobody", &cola()).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_by_seller() {
        let (db, seller_id) = setup().await;
        let other = db.accounts().create("seller2", Role::Seller).await.unwrap();
        let products = db.products();

        products.insert(&seller_id, &cola()).await.unwrap();
        products.insert(&other.id, &cola()).await.unwrap();

        assert_eq!(products.list().await.unwrap().len(), 2);
        let mine = products.list_by_seller(&seller_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].seller_id, seller_id);
    }

    #[tokio::test]
    async fn test_versioned_update() {
        let (db, seller_id) = setup().await;
        let products = db.products();
        let product = products.insert(&seller_id, &cola()).await.unwrap();

        let renamed = Product {
            name: "Coke".to_string(),
            ..product.clone()
        };
        let stored = products.update_if_version(&renamed).await.unwrap();
        assert_eq!(stored.version, 1);

        // Same stale version again loses.
        let err = products.update_if_version(&renamed).await.unwrap_err();
        assert!(err.is_conflict());

        let fetched = products.get(product.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Coke");
        assert_eq!(fetched.version, 1);
    }

    #[tokio::test]
    async fn test_set_stock() {
        let (db, seller_id) = setup().await;
        let products = db.products();
        let product = products.insert(&seller_id, &cola()).await.unwrap();

        products.set_stock(product.id, 3).await.unwrap();
        let fetched = products.get(product.id).await.unwrap().unwrap();
        assert_eq!(fetched.stock, 3);
        assert_eq!(fetched.version, 1);

        let err = products.set_stock(999, 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_negative_stock_is_rejected_by_schema() {
        let (db, seller_id) = setup().await;
        let products = db.products();
        let product = products.insert(&seller_id, &cola()).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let err = products
            .set_stock_if_version(&mut conn, product.id, 0, -1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_owned_checks_owner() {
        let (db, seller_id) = setup().await;
        let products = db.products();
        let product = products.insert(&seller_id, &cola()).await.unwrap();

        assert!(products.delete_owned(product.id, "someone-else").await.is_err());
        products.delete_owned(product.id, &seller_id).await.unwrap();
        assert!(products.get(product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_products_cascade_with_seller() {
        let (db, seller_id) = setup().await;
        db.products().insert(&seller_id, &cola()).await.unwrap();

        db.accounts().delete(&seller_id).await.unwrap();
        assert_eq!(db.products().count().await.unwrap(), 0);
    }
}
