//! # Repository Module
//!
//! The account and product stores.
//!
//! ## Two Kinds of Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Plain writes (on the pool)                                            │
//! │  ├── insert, delete, set_balance                                       │
//! │  └── single statement, atomic on its own                               │
//! │                                                                         │
//! │  Compare-and-set writes (on a caller-supplied connection)              │
//! │  ├── set_balance_if_version, set_stock_if_version                      │
//! │  ├── UPDATE ... WHERE id = ? AND version = ?                           │
//! │  ├── zero rows matched → DbError::Conflict                             │
//! │  └── the engine runs several inside one transaction                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`AccountRepository`](account::AccountRepository) - balances and account records
//! - [`ProductRepository`](product::ProductRepository) - inventory and ownership

pub mod account;
pub mod product;
