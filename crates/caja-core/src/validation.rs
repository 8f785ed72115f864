//! # Validation Module
//!
//! Small field validators shared by the inventory store and the engine.
//! Raw input parsing is the caller's job - these check the business-rule
//! shape of already-typed values (non-blank names, positive amounts).

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation checks.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Requires a non-blank string field.
pub fn require_field(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

/// Requires a strictly positive monetary amount.
pub fn require_positive_amount(field: &'static str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive { field });
    }
    Ok(())
}

/// Requires a strictly positive quantity within the sanity ceiling.
pub fn require_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive { field: "quantity" });
    }
    if qty > crate::MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: crate::MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
