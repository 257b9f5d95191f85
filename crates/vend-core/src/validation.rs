//! # Validation Module
//!
//! Field validation for engine inputs.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Hosting layer (external)                                              │
//! │  └── Request shape, deserialization                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Engine entry point                                                    │
//! │  └── THIS MODULE: field rules, checked before any database access      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  SQLite CHECK constraints                                              │
//! │  ├── balance_cents >= 0, multiple of 5                                 │
//! │  ├── cost_cents >= 5, multiple of 5                                    │
//! │  └── stock >= 0                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{NewProduct, ProductPatch};
use crate::{
    MAX_PRODUCT_NAME_LEN, MAX_PRODUCT_STOCK, MAX_PURCHASE_QUANTITY, MAX_USERNAME_LEN,
    MIN_PRODUCT_COST_CENTS, MIN_USERNAME_LEN, SMALLEST_DENOMINATION_CENTS,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 100 characters
///
/// ## Example
/// ```rust
/// use vend_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Coca Cola").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// assert!(validate_product_name(&"A".repeat(101)).is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_PRODUCT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_PRODUCT_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a username.
///
/// ## Rules
/// - 3 to 50 characters after trimming
/// - Letters, digits, `_`, `-` and `.` only
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: MIN_USERNAME_LEN,
        });
    }
    if len > MAX_USERNAME_LEN {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: MAX_USERNAME_LEN,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, '_', '-' and '.'".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a product cost in cents.
///
/// ## Rules
/// - At least 5
/// - A multiple of 5, so change can always be paid in coins
///
/// ## Example
/// ```rust
/// use vend_core::validation::validate_product_cost;
///
/// assert!(validate_product_cost(95).is_ok());
/// assert!(validate_product_cost(0).is_err());
/// assert!(validate_product_cost(97).is_err());
/// ```
pub fn validate_product_cost(cents: i64) -> ValidationResult<()> {
    if cents < MIN_PRODUCT_COST_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "cost".to_string(),
            min: MIN_PRODUCT_COST_CENTS,
            max: i64::MAX,
        });
    }

    if cents % SMALLEST_DENOMINATION_CENTS != 0 {
        return Err(ValidationError::NotMultipleOf {
            field: "cost".to_string(),
            step: SMALLEST_DENOMINATION_CENTS,
        });
    }

    Ok(())
}

/// Validates a stock count. Zero is allowed (sold out).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRODUCT_STOCK).contains(&stock) {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: MAX_PRODUCT_STOCK,
        });
    }

    Ok(())
}

/// Validates a purchase quantity.
///
/// ## User Workflow
/// ```text
/// Buyer asks for 3 × Pepsi
///      │
///      ▼
/// validate_quantity(3) ← THIS FUNCTION
///      │
///      ├── qty <= 0?      → Error: "quantity must be positive"
///      ├── qty > 10,000?  → Error: out of range
///      │
///      └── OK → load account and product
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_PURCHASE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_PURCHASE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a product id (must be ≥ 1).
pub fn validate_product_id(id: i64) -> ValidationResult<()> {
    if id < 1 {
        return Err(ValidationError::MustBePositive {
            field: "product id".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every field of a new product listing.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_product_cost(product.cost_cents)?;
    validate_stock(product.stock)?;
    Ok(())
}

/// Validates the fields a patch sets. An empty patch is rejected.
pub fn validate_product_patch(patch: &ProductPatch) -> ValidationResult<()> {
    if patch.is_empty() {
        return Err(ValidationError::Required {
            field: "at least one of name, cost, stock".to_string(),
        });
    }

    if let Some(name) = &patch.name {
        validate_product_name(name)?;
    }
    if let Some(cost) = patch.cost_cents {
        validate_product_cost(cost)?;
    }
    if let Some(stock) = patch.stock {
        validate_stock(stock)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Snickers").is_ok());
        assert!(validate_product_name(&"A".repeat(100)).is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(101)).is_err());
    }

    #[test]
    fn test_product_name_counts_characters_not_bytes() {
        // 100 two-byte characters is still 100 characters.
        assert!(validate_product_name(&"é".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("buyer1").is_ok());
        assert!(validate_username("first.last").is_ok());
        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::TooShort { min: 3, .. })
        ));
        assert!(matches!(
            validate_username(&"a".repeat(51)),
            Err(ValidationError::TooLong { max: 50, .. })
        ));
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_validate_product_cost() {
        assert!(validate_product_cost(5).is_ok());
        assert!(validate_product_cost(120).is_ok());
        assert!(matches!(
            validate_product_cost(0),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_product_cost(-5),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_product_cost(101),
            Err(ValidationError::NotMultipleOf { step: 5, .. })
        ));
    }

    #[test]
    fn test_validate_stock_and_quantity() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_product_id(1).is_ok());
        assert!(validate_product_id(0).is_err());
    }

    #[test]
    fn test_stock_and_quantity_are_capped() {
        assert!(validate_stock(MAX_PRODUCT_STOCK).is_ok());
        assert!(matches!(
            validate_stock(MAX_PRODUCT_STOCK + 1),
            Err(ValidationError::OutOfRange { max: MAX_PRODUCT_STOCK, .. })
        ));
        assert!(validate_stock(1 << 40).is_err());

        assert!(validate_quantity(MAX_PURCHASE_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(MAX_PURCHASE_QUANTITY + 1),
            Err(ValidationError::OutOfRange { max: MAX_PURCHASE_QUANTITY, .. })
        ));
        assert!(validate_quantity(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_product_patch() {
        assert!(validate_product_patch(&ProductPatch::default()).is_err());
        assert!(validate_product_patch(&ProductPatch {
            stock: Some(0),
            ..Default::default()
        })
        .is_ok());
        assert!(validate_product_patch(&ProductPatch {
            name: Some("Water".to_string()),
            cost_cents: Some(52),
            stock: None,
        })
        .is_err());
    }

    #[test]
    fn test_validate_new_product() {
        let ok = NewProduct {
            name: "Chips".to_string(),
            cost_cents: 75,
            stock: 12,
        };
        assert!(validate_new_product(&ok).is_ok());

        let bad = NewProduct { stock: -1, ..ok };
        assert!(validate_new_product(&bad).is_err());
    }
}
