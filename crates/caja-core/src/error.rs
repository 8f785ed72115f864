//! # Error Types
//!
//! Domain errors for caja-core.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ValidationError  - a field failed a shape check                    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  EngineError      - a business precondition failed; the snapshot    │
//! │       │             is guaranteed untouched when one is returned    │
//! │       ▼                                                             │
//! │  caller (UI / store layer) decides presentation                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual impls
//! 2. Errors carry context (account name, amounts, ids)
//! 3. Errors are enum variants, never bare strings
//! 4. An engine operation returns exactly one error and mutates nothing

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Engine Error
// =============================================================================

/// Business rule violations raised by the Transaction Engine, the Account
/// Ledger, or the Inventory Store.
///
/// Every variant maps to a precondition in the commit protocol: when one
/// is returned, no balance, stock count, or log was modified.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The paying account does not hold enough to cover the debit.
    #[error("insufficient funds in {account}: need {needed}, available {available}")]
    InsufficientFunds {
        account: String,
        needed: Money,
        available: Money,
    },

    /// Live product stock is below the requested quantity.
    ///
    /// Raised at commit time even if the cart accepted the quantity
    /// earlier - stock may have moved underneath the cart.
    #[error("insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// No account with the given name exists in the ledger.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// No product with the given id exists in inventory.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// A transactional record (loan, presale, reservation) was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A required field was missing or malformed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Transfer source and destination are the same account.
    #[error("transfer source and destination are the same account: {0}")]
    SameAccount(String),

    /// A sale was attempted with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A product with zero stock was added to the cart.
    #[error("{0} is out of stock")]
    OutOfStock(String),

    /// A cart quantity request exceeds the product's current stock.
    #[error("quantity for {product} exceeds stock: available {available}, requested {requested}")]
    StockExceeded {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A generated identifier collided with an existing record.
    /// Defensive: with UUID v4 ids this should never fire.
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// The record is not in the status the operation requires,
    /// e.g. paying a cancelled loan or completing a delivered presale.
    #[error("{entity} {id} is {status}, operation not permitted")]
    InvalidState {
        entity: &'static str,
        id: String,
        status: String,
    },

    /// An account cannot be removed while records still reference it
    /// or while it holds a balance.
    #[error("account {name} is in use ({references} reference(s))")]
    AccountInUse { name: String, references: usize },
}

impl EngineError {
    /// Creates a `NotFound` for a transactional record.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an `InvalidState` with a rendered status.
    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        status: impl ToString,
    ) -> Self {
        EngineError::InvalidState {
            entity,
            id: id.into(),
            status: status.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-shape failures, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A numeric field must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// A numeric field is outside its allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    /// A deposit larger than the presale total, a payment above the
    /// remaining loan balance, and similar cross-field breaches.
    #[error("{field} has invalid value: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Duplicate business key (account name, settings entry).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: &'static str, value: String },

    /// A settings entry is still referenced by products.
    #[error("{field} '{value}' is used by {count} product(s)")]
    InUse {
        field: &'static str,
        value: String,
        count: usize,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
