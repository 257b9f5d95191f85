//! # Error Types
//!
//! Domain-specific error types for vend-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vend-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  vend-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - What the hosting layer sees (with ErrorKind)   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → transport response  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is a value-level failure returned to the caller; nothing is
/// swallowed or replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Account id doesn't exist.
    #[error("User with ID '{0}' was not found.")]
    AccountNotFound(String),

    /// Product id doesn't exist.
    #[error("Product with ID '{0}' was not found.")]
    ProductNotFound(i64),

    /// Caller does not own the resource being mutated.
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Caller's role does not permit the action.
    #[error("Action '{action}' requires '{required}' role.")]
    InvalidRole { action: String, required: String },

    /// Balance does not cover the total cost.
    ///
    /// ## User Workflow
    /// ```text
    /// Balance: 50 cents, buy 1 × Coca Cola (100 cents)
    ///      │
    ///      ▼
    /// InsufficientFunds { required: 100, available: 50 }
    ///      │
    ///      ▼
    /// Balance and stock unchanged
    /// ```
    #[error("Insufficient funds. Required: {} cents, Available: {} cents.", .required.cents(), .available.cents())]
    InsufficientFunds { required: Money, available: Money },

    /// Not enough units in stock.
    #[error("Insufficient stock for '{product_name}'. Requested: {requested}, Available: {available}.")]
    InsufficientStock {
        product_name: String,
        requested: i64,
        available: i64,
    },

    /// Coin value outside the fixed denomination set.
    #[error("Invalid coin denomination: {0}. Valid denominations are: 5, 10, 20, 50, 100 cents.")]
    InvalidCoinDenomination(i64),

    /// Zero or negative coin count in a batch.
    #[error("Coin count must be positive for denomination {denomination}, got {count}")]
    NonPositiveCoinCount { denomination: i64, count: i64 },

    /// Amount cannot be expressed in coins.
    ///
    /// Only reachable if a non-multiple-of-5 balance was ever stored, which
    /// is an upstream data defect, not a user input error.
    #[error("Amount {amount} cents cannot be represented in coins (remainder {remainder})")]
    UnrepresentableAmount { amount: i64, remainder: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an Unauthorized error.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        CoreError::Unauthorized {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be a multiple of a step (e.g. cost in 5-cent steps).
    #[error("{field} must be a multiple of {step}")]
    NotMultipleOf { field: String, step: i64 },

    /// Invalid format (e.g. invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_name: "Pepsi".to_string(),
            requested: 5,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 'Pepsi'. Requested: 5, Available: 3."
        );

        let err = CoreError::InsufficientFunds {
            required: Money::from_cents(100),
            available: Money::from_cents(50),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds. Required: 100 cents, Available: 50 cents."
        );

        let err = CoreError::InvalidCoinDenomination(15);
        assert!(err.to_string().starts_with("Invalid coin denomination: 15."));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::NotMultipleOf {
            field: "cost".to_string(),
            step: 5,
        };
        assert_eq!(err.to_string(), "cost must be a multiple of 5");

        let err = ValidationError::TooShort {
            field: "username".to_string(),
            min: 3,
        };
        assert_eq!(err.to_string(), "username must be at least 3 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
