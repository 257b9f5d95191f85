//! # Domain Types
//!
//! Core domain types used throughout the vending engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │   │    Product      │   │     Caller      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (integer)   │   │  user_id        │       │
//! │  │  username       │   │  name           │   │  role           │       │
//! │  │  balance_cents  │   │  cost_cents     │   └─────────────────┘       │
//! │  │  role           │   │  stock          │                              │
//! │  │  version        │   │  seller_id (FK) │   ┌─────────────────┐       │
//! │  └─────────────────┘   │  version        │   │      Role       │       │
//! │                        └─────────────────┘   │  Buyer | Seller │       │
//! │                                               └─────────────────┘       │
//! │  Receipts: DepositReceipt, PurchaseReceipt (with ProductSnapshot)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Row Versions
//! `Account` and `Product` carry a `version` counter. Every write bumps it,
//! and every compare-and-set write matches on it, so a decision made from a
//! stale read can never be committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::coins::CoinBatch;
use crate::error::{CoreError, ValidationError};
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// What an account is allowed to do. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Deposits coins and buys products.
    Buyer,
    /// Lists and manages products.
    Seller,
}

impl Role {
    /// Lowercase name as stored and displayed.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            other => Err(ValidationError::InvalidFormat {
                field: "role".to_string(),
                reason: format!("'{}' is not one of: buyer, seller", other),
            }
            .into()),
        }
    }
}

// =============================================================================
// Caller
// =============================================================================

/// The authenticated identity behind a request.
///
/// Supplied by the hosting layer after it has verified credentials; the
/// engine takes it as an ordinary parameter on every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Caller {
            user_id: user_id.into(),
            role,
        }
    }

    /// Caller acting as the given account.
    pub fn from_account(account: &Account) -> Self {
        Caller::new(account.id.clone(), account.role)
    }
}

// =============================================================================
// Account
// =============================================================================

/// A buyer or seller account.
///
/// `balance_cents` only changes by adding a validated deposit total or by
/// being set to zero (purchase, reset), so it is always a multiple of 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Account {
    pub id: String,
    pub username: String,
    pub balance_cents: i64,
    pub role: Role,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Current balance as Money.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// Changes an account holder may make to their own account.
///
/// Credentials live with the identity subsystem, so only the username is
/// editable here. The role is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPatch {
    pub username: Option<String>,
}

// =============================================================================
// Product
// =============================================================================

/// A product listed by a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub cost_cents: i64,
    pub stock: i64,
    pub seller_id: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit cost as Money.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Checks whether the given account owns this product.
    #[inline]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.seller_id == user_id
    }
}

/// Input for listing a new product. The seller is always the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub cost_cents: i64,
    pub stock: i64,
}

/// Partial product update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub cost_cents: Option<i64>,
    pub stock: Option<i64>,
}

impl ProductPatch {
    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.cost_cents.is_none() && self.stock.is_none()
    }

    /// Applies the patch to a copy of `product`.
    ///
    /// Only field values change; id, owner, version and timestamps are left
    /// for the store to manage.
    pub fn apply_to(&self, product: &Product) -> Product {
        let mut updated = product.clone();
        if let Some(name) = &self.name {
            updated.name = name.trim().to_string();
        }
        if let Some(cost) = self.cost_cents {
            updated.cost_cents = cost;
        }
        if let Some(stock) = self.stock {
            updated.stock = stock;
        }
        updated
    }
}

// =============================================================================
// Receipts
// =============================================================================

/// Product state as seen by a buyer at the moment of purchase.
///
/// Frozen copy: later edits to the product do not change a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: i64,
    pub name: String,
    pub cost_cents: i64,
    /// Stock after the purchase was applied.
    pub stock: i64,
    pub seller_id: String,
    pub seller_username: String,
}

/// Result of a successful purchase.
///
/// ## Money Conservation
/// ```text
/// total_spent + change.total() == balance before the purchase
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub total_spent: Money,
    /// One entry per unit bought.
    pub products_purchased: Vec<ProductSnapshot>,
    pub change: CoinBatch,
}

/// Result of a successful deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub deposited: Money,
    pub new_balance: Money,
    pub message: String,
}

impl DepositReceipt {
    pub fn new(deposited: Money, new_balance: Money) -> Self {
        DepositReceipt {
            deposited,
            new_balance,
            message: format!(
                "Successfully deposited {} cents. New balance: {} cents.",
                deposited.cents(),
                new_balance.cents()
            ),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
