//! # Engine Error Type
//!
//! The single error type returned by [`VendingEngine`](super::VendingEngine)
//! operations, with a machine-readable [`ErrorKind`] for the hosting layer.
//!
//! ## Mapping to Transport Responses
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ErrorKind                  Typical HTTP      Retry?                    │
//! │  ─────────────────────────  ────────────      ──────                    │
//! │  ACCOUNT_NOT_FOUND          404               no                        │
//! │  PRODUCT_NOT_FOUND          404               no                        │
//! │  UNAUTHORIZED               403               no                        │
//! │  INVALID_ROLE               403               no                        │
//! │  INSUFFICIENT_FUNDS         400               no                        │
//! │  INSUFFICIENT_STOCK         400               no                        │
//! │  INVALID_COIN_DENOMINATION  400               no                        │
//! │  NON_POSITIVE_COIN_COUNT    400               no                        │
//! │  VALIDATION_ERROR           400               no                        │
//! │  DUPLICATE_USERNAME         409               no                        │
//! │  CONCURRENCY_CONFLICT       409 / 503         yes                       │
//! │  UNREPRESENTABLE_AMOUNT     500               no (data defect)          │
//! │  DATABASE_ERROR             500               no                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use vend_core::CoreError;

use crate::error::DbError;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AccountNotFound,
    ProductNotFound,
    Unauthorized,
    InvalidRole,
    InsufficientFunds,
    InsufficientStock,
    InvalidCoinDenomination,
    NonPositiveCoinCount,
    UnrepresentableAmount,
    ValidationError,
    DuplicateUsername,
    ConcurrencyConflict,
    DatabaseError,
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the operation. Nothing was written.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The database failed in a way retrying won't fix.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Every attempt lost an optimistic-concurrency race.
    ///
    /// ## When This Occurs
    /// - Many concurrent purchases hammer the same product or account and
    ///   this request lost `attempts` times in a row
    #[error("Operation conflicted with concurrent updates {attempts} times; please retry.")]
    ConcurrencyConflict { attempts: u32 },

    /// The operation did not finish within its time budget.
    ///
    /// Any in-flight transaction was rolled back.
    #[error("Operation timed out after {after_ms} ms; please retry.")]
    Timeout { after_ms: u64 },

    /// Username is taken by another account.
    #[error("Username '{0}' is already taken.")]
    DuplicateUsername(String),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(err.into())
    }
}

impl From<vend_core::ValidationError> for EngineError {
    fn from(err: vend_core::ValidationError) -> Self {
        EngineError::Core(err.into())
    }
}

impl EngineError {
    /// Returns the category the hosting layer maps to a response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Core(err) => match err {
                CoreError::AccountNotFound(_) => ErrorKind::AccountNotFound,
                CoreError::ProductNotFound(_) => ErrorKind::ProductNotFound,
                CoreError::Unauthorized { .. } => ErrorKind::Unauthorized,
                CoreError::InvalidRole { .. } => ErrorKind::InvalidRole,
                CoreError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                CoreError::InvalidCoinDenomination(_) => ErrorKind::InvalidCoinDenomination,
                CoreError::NonPositiveCoinCount { .. } => ErrorKind::NonPositiveCoinCount,
                CoreError::UnrepresentableAmount { .. } => ErrorKind::UnrepresentableAmount,
                CoreError::Validation(_) => ErrorKind::ValidationError,
            },
            EngineError::Db(DbError::Conflict { .. }) => ErrorKind::ConcurrencyConflict,
            EngineError::Db(_) => ErrorKind::DatabaseError,
            EngineError::ConcurrencyConflict { .. } | EngineError::Timeout { .. } => {
                ErrorKind::ConcurrencyConflict
            }
            EngineError::DuplicateUsername(_) => ErrorKind::DuplicateUsername,
        }
    }

    /// Returns true if the caller may safely retry the same request.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyConflict
    }

    /// Returns true for a lost version check that the engine itself retries.
    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Db(err) if err.is_conflict())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use vend_core::Money;

    #[test]
    fn test_kinds_for_core_errors() {
        let err: EngineError = CoreError::InsufficientFunds {
            required: Money::from_cents(100),
            available: Money::from_cents(50),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert!(!err.is_retryable());

        let err: EngineError = CoreError::AccountNotFound("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::AccountNotFound);
        assert_eq!(err.to_string(), "User with ID 'x' was not found.");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(EngineError::ConcurrencyConflict { attempts: 5 }.is_retryable());
        assert!(EngineError::Timeout { after_ms: 5000 }.is_retryable());
        assert!(EngineError::Db(DbError::conflict("Product", "1")).is_retryable());

        assert!(!EngineError::Db(DbError::PoolExhausted).is_retryable());
        assert!(!EngineError::DuplicateUsername("buyer1".into()).is_retryable());
    }

    #[test]
    fn test_conflict_detection() {
        assert!(EngineError::Db(DbError::conflict("Account", "a")).is_conflict());
        assert!(!EngineError::ConcurrencyConflict { attempts: 1 }.is_conflict());
    }

    #[test]
    fn test_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
