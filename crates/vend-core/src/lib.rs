//! # vend-core: Pure Business Logic for the Vending Engine
//!
//! This crate holds the transaction rules of the vending machine as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vend Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Hosting layer (HTTP, auth, JWT) - external             │   │
//! │  │    POST /deposit ──► POST /buy ──► POST /reset                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Caller { user_id, role }               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 vend-db::VendingEngine                          │   │
//! │  │    read rows ─► decide (vend-core) ─► compare-and-set commit    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vend-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   coins   │  │ purchase  │  │  policy   │  │ validation│  │   │
//! │  │   │ Deposit   │  │  plan     │  │ ownership │  │  fields   │  │   │
//! │  │   │ Change    │  │  receipt  │  │  roles    │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`coins`] - Denominations, coin batches, deposit validation, change
//! - [`purchase`] - Purchase preconditions and receipts
//! - [`policy`] - Ownership and role rules for mutations
//! - [`types`] - Domain types (Account, Product, Caller, receipts)
//! - [`money`] - Integer-cent money type
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use vend_core::coins::calculate_change;
//! use vend_core::money::Money;
//!
//! let change = calculate_change(Money::from_cents(175)).unwrap();
//! assert_eq!(change.total().cents(), 175);
//! assert_eq!(change.coin_count(), 4); // 100 + 50 + 20 + 5
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coins;
pub mod error;
pub mod money;
pub mod policy;
pub mod purchase;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coins::{calculate_change, validate_deposit, CoinBatch, CoinInput, Denomination};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use purchase::{plan_purchase, PurchasePlan};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Smallest coin the machine accepts, in cents.
///
/// Product costs and balances are always multiples of this value.
pub const SMALLEST_DENOMINATION_CENTS: i64 = 5;

/// Minimum product cost in cents.
pub const MIN_PRODUCT_COST_CENTS: i64 = 5;

/// Most units a single product listing may hold.
pub const MAX_PRODUCT_STOCK: i64 = 10_000;

/// Most units a single purchase may request.
pub const MAX_PURCHASE_QUANTITY: i64 = MAX_PRODUCT_STOCK;

/// Maximum product name length (characters).
pub const MAX_PRODUCT_NAME_LEN: usize = 100;

/// Username length bounds (characters).
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;
