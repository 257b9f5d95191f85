//! # Purchase Planning
//!
//! The decision half of a purchase: given the account and product as they
//! were read, decide whether the purchase may proceed and what it produces.
//! Committing the plan is the engine's job.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Account (balance 275)    Product (Coca Cola, 100, stock 10)   qty 1   │
//! │         │                          │                             │      │
//! │         └──────────────┬───────────┴─────────────────────────────┘      │
//! │                        ▼                                                │
//! │              plan_purchase ← THIS MODULE                                │
//! │                        │                                                │
//! │    ├── qty out of range?   → Validation(OutOfRange)                    │
//! │    ├── stock < qty?        → InsufficientStock                         │
//! │    ├── cost × qty overflow → Validation(OutOfRange)                    │
//! │    ├── balance < total?    → InsufficientFunds                         │
//! │    └── OK                                                               │
//! │                        ▼                                                │
//! │   PurchasePlan { total 100, change {100:1,50:1,20:1,5:1},              │
//! │                  remaining_stock 9, new_balance 0 }                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Account and product existence are checked by the engine before planning,
//! since they need a lookup.

use crate::coins::{calculate_change, CoinBatch};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Account, Product, ProductSnapshot, PurchaseReceipt};
use crate::validation::validate_quantity;

/// Everything a purchase will change, computed from one consistent read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasePlan {
    pub quantity: i64,
    pub total_cost: Money,
    /// Surplus returned as coins. The balance is always emptied.
    pub change: CoinBatch,
    pub remaining_stock: i64,
    /// Balance to store after the purchase. Always zero.
    pub new_balance: Money,
}

/// Checks stock then funds and computes the outcome of buying `quantity`
/// units of `product` from `account`'s balance.
///
/// Checks run in a fixed order and the first failure wins:
/// 0. `1 <= quantity <= MAX_PURCHASE_QUANTITY`
/// 1. `product.stock >= quantity`
/// 2. `product.cost * quantity` does not overflow
/// 3. `account.balance >= total`
///
/// ## Example
/// ```rust
/// # use chrono::Utc;
/// use vend_core::{plan_purchase, Account, Product, Role};
///
/// # let now = Utc::now();
/// let account = Account {
///     id: "b-1".into(), username: "buyer1".into(), balance_cents: 275,
///     role: Role::Buyer, version: 0, created_at: now, updated_at: now,
/// };
/// let product = Product {
///     id: 1, name: "Coca Cola".into(), cost_cents: 100, stock: 10,
///     seller_id: "s-1".into(), version: 0, created_at: now, updated_at: now,
/// };
///
/// let plan = plan_purchase(&account, &product, 1).unwrap();
/// assert_eq!(plan.total_cost.cents(), 100);
/// assert_eq!(plan.change.total().cents(), 175);
/// assert_eq!(plan.remaining_stock, 9);
/// ```
pub fn plan_purchase(account: &Account, product: &Product, quantity: i64) -> CoreResult<PurchasePlan> {
    validate_quantity(quantity)?;

    if product.stock < quantity {
        return Err(CoreError::InsufficientStock {
            product_name: product.name.clone(),
            requested: quantity,
            available: product.stock,
        });
    }

    let total_cost = product
        .cost()
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::MAX / product.cost_cents.max(1),
        })?;

    let balance = account.balance();
    if balance < total_cost {
        return Err(CoreError::InsufficientFunds {
            required: total_cost,
            available: balance,
        });
    }

    let change = calculate_change(balance - total_cost)?;

    Ok(PurchasePlan {
        quantity,
        total_cost,
        change,
        remaining_stock: product.stock - quantity,
        new_balance: Money::zero(),
    })
}

impl PurchasePlan {
    /// Builds the buyer's receipt: one snapshot per unit bought, each
    /// showing the stock left after this purchase.
    ///
    /// `quantity` is capped by [`MAX_PURCHASE_QUANTITY`](crate::MAX_PURCHASE_QUANTITY),
    /// so the snapshot list stays small.
    pub fn receipt(&self, product: &Product, seller_username: &str) -> PurchaseReceipt {
        let snapshot = ProductSnapshot {
            product_id: product.id,
            name: product.name.clone(),
            cost_cents: product.cost_cents,
            stock: self.remaining_stock,
            seller_id: product.seller_id.clone(),
            seller_username: seller_username.to_string(),
        };

        PurchaseReceipt {
            total_spent: self.total_cost,
            products_purchased: vec![snapshot; self.quantity as usize],
            change: self.change.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::Utc;
    use proptest::prelude::*;

    fn account(balance: i64) -> Account {
        let now = Utc::now();
        Account {
            id: "b-1".to_string(),
            username: "buyer1".to_string(),
            balance_cents: balance,
            role: Role::Buyer,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(cost: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            name: "Coca Cola".to_string(),
            cost_cents: cost,
            stock,
            seller_id: "s-1".to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_purchase_empties_balance_and_returns_change() {
        let plan = plan_purchase(&account(275), &product(100, 10), 1).unwrap();
        assert_eq!(plan.total_cost, Money::from_cents(100));
        assert_eq!(plan.change.total(), Money::from_cents(175));
        assert_eq!(plan.new_balance, Money::zero());
        assert_eq!(plan.remaining_stock, 9);
    }

    #[test]
    fn test_exact_payment_yields_no_change() {
        let plan = plan_purchase(&account(285), &product(95, 3), 3).unwrap();
        assert!(plan.change.is_empty());
        assert_eq!(plan.remaining_stock, 0);
    }

    #[test]
    fn test_stock_is_checked_before_funds() {
        // Both checks fail; stock wins.
        let err = plan_purchase(&account(0), &product(100, 1), 2).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product_name: "Coca Cola".to_string(),
                requested: 2,
                available: 1,
            }
        );
    }

    #[test]
    fn test_insufficient_funds() {
        let err = plan_purchase(&account(50), &product(100, 5), 1).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientFunds {
                required: Money::from_cents(100),
                available: Money::from_cents(50),
            }
        );
    }

    #[test]
    fn test_cost_overflow_is_rejected() {
        let err = plan_purchase(&account(100), &product(i64::MAX - 2, i64::MAX), 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_oversized_quantity_is_rejected_before_planning() {
        let huge = 1i64 << 40;
        let err = plan_purchase(&account(i64::MAX - 2), &product(5, huge), huge).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { field, .. }) if field == "quantity"
        ));
    }

    #[test]
    fn test_corrupt_balance_fails_loudly() {
        let err = plan_purchase(&account(103), &product(100, 5), 1).unwrap_err();
        assert!(matches!(err, CoreError::UnrepresentableAmount { remainder: 3, .. }));
    }

    #[test]
    fn test_receipt_has_one_snapshot_per_unit() {
        let p = product(50, 20);
        let plan = plan_purchase(&account(200), &p, 3).unwrap();
        let receipt = plan.receipt(&p, "seller1");

        assert_eq!(receipt.products_purchased.len(), 3);
        assert!(receipt
            .products_purchased
            .iter()
            .all(|s| s.stock == 17 && s.seller_username == "seller1"));
        assert_eq!(receipt.total_spent, Money::from_cents(150));
        assert_eq!(receipt.change.total(), Money::from_cents(50));
    }

    proptest! {
        #[test]
        fn prop_money_is_conserved(
            balance_steps in 0i64..2_000,
            cost_steps in 1i64..100,
            qty in 1i64..10,
        ) {
            let balance = balance_steps * 5;
            let cost = cost_steps * 5;
            match plan_purchase(&account(balance), &product(cost, 100), qty) {
                Ok(plan) => {
                    prop_assert_eq!(plan.total_cost + plan.change.total(), Money::from_cents(balance));
                }
                Err(CoreError::InsufficientFunds { .. }) => prop_assert!(cost * qty > balance),
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }
    }
}
