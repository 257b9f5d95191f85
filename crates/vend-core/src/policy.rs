//! # Transaction Policy
//!
//! Who may do what. Every check here is a pure predicate over values the
//! engine already holds, evaluated before any state is touched.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Action                      Required role    Ownership                 │
//! │  ──────────────────────────  ─────────────    ───────────────────────   │
//! │  deposit / buy / reset       buyer            own account               │
//! │  create product              seller           seller_id := caller       │
//! │  update / delete product     seller           product.seller_id==caller │
//! │  update / delete account     any              target == caller          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{Caller, Product, Role};

/// Fails with `InvalidRole` unless the caller holds `required`.
///
/// ## Example
/// ```rust
/// use vend_core::policy::require_role;
/// use vend_core::{Caller, Role};
///
/// let seller = Caller::new("s-1", Role::Seller);
/// assert!(require_role(&seller, Role::Seller, "create product").is_ok());
/// assert!(require_role(&seller, Role::Buyer, "deposit").is_err());
/// ```
pub fn require_role(caller: &Caller, required: Role, action: &str) -> CoreResult<()> {
    if caller.role != required {
        return Err(CoreError::InvalidRole {
            action: action.to_string(),
            required: required.to_string(),
        });
    }
    Ok(())
}

/// Product mutation is allowed only for the product's seller.
pub fn authorize_product_mutation(caller: &Caller, product: &Product) -> CoreResult<()> {
    if !product.is_owned_by(&caller.user_id) {
        return Err(CoreError::unauthorized(format!(
            "product {} belongs to another seller",
            product.id
        )));
    }
    Ok(())
}

/// Account update/delete is allowed only on the caller's own account.
///
/// Deposit, purchase and reset always act on the caller's own account, so
/// they never go through this check.
pub fn authorize_account_mutation(caller: &Caller, target_user_id: &str) -> CoreResult<()> {
    if caller.user_id != target_user_id {
        return Err(CoreError::unauthorized(
            "accounts can only be modified by their owner",
        ));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product_owned_by(seller: &str) -> Product {
        let now = Utc::now();
        Product {
            id: 7,
            name: "Water".to_string(),
            cost_cents: 50,
            stock: 20,
            seller_id: seller.to_string(),
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_require_role() {
        let buyer = Caller::new("b-1", Role::Buyer);
        assert!(require_role(&buyer, Role::Buyer, "buy").is_ok());

        let err = require_role(&buyer, Role::Seller, "create product").unwrap_err();
        assert_eq!(err.to_string(), "Action 'create product' requires 'seller' role.");
    }

    #[test]
    fn test_owner_may_mutate_product() {
        let caller = Caller::new("s-1", Role::Seller);
        assert!(authorize_product_mutation(&caller, &product_owned_by("s-1")).is_ok());
    }

    #[test]
    fn test_other_seller_may_not_mutate_product() {
        let caller = Caller::new("s-2", Role::Seller);
        let err = authorize_product_mutation(&caller, &product_owned_by("s-1")).unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized { .. }));
    }

    #[test]
    fn test_account_mutation_requires_self() {
        let caller = Caller::new("u-1", Role::Buyer);
        assert!(authorize_account_mutation(&caller, "u-1").is_ok());
        assert!(matches!(
            authorize_account_mutation(&caller, "u-2"),
            Err(CoreError::Unauthorized { .. })
        ));
    }
}
