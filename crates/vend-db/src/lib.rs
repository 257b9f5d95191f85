//! # vend-db: Persistence and Transaction Engine
//!
//! Stores accounts and products in SQLite (via sqlx) and runs the
//! [`VendingEngine`], which applies vend-core decisions atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vending Data Flow                                │
//! │                                                                         │
//! │  Hosting layer (HTTP handler, CLI, ...) with an authenticated Caller   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vend-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ VendingEngine │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (engine/)    │───►│ AccountRepo   │    │  (embedded)  │  │   │
//! │  │   │ retry+timeout │    │ ProductRepo   │    │ 001_init.sql │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │ vend-core rules    │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │   plan_purchase, validate_deposit, policy     Database (pool)  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML configuration with environment overrides
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Account and product stores
//! - [`engine`] - Deposit, purchase, reset and ownership-checked mutations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vend_core::{Caller, Role};
//! use vend_db::{Database, VendConfig};
//!
//! let config = VendConfig::load_or_default(None);
//! let db = Database::new(config.db_config()).await?;
//! let engine = db.engine(config.engine.clone());
//!
//! let buyer = engine.register_account("buyer1", Role::Buyer).await?;
//! let caller = Caller::from_account(&buyer);
//! engine.deposit(&caller, &[(100, 2), (50, 1)].into()).await?;
//! let receipt = engine.purchase(&caller, 1, 1).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineSettings, VendConfig};
pub use engine::{EngineError, EngineResult, ErrorKind, VendingEngine};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::account::AccountRepository;
pub use repository::product::ProductRepository;

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=vend_db=trace` - Show trace for this crate only
/// - Default: `info,vend_db=debug,sqlx=warn`
///
/// Calling it twice is harmless; the second call does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vend_db=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
