//! # caja-core: Pure Business Logic for Caja
//!
//! This crate is the **heart** of Caja, a point-of-sale and inventory
//! ledger for a small trading-card shop. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Caja Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      Caller / UI Layer                          │   │
//! │  │     builds commands, renders reports, confirms destructive ops  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  engine   │  │  ledger   │  │ inventory │  │   money   │  │   │
//! │  │   │ 8 tx kinds│  │ accounts  │  │ products  │  │   pesos   │  │   │
//! │  │   │ validate  │  │ movements │  │  history  │  │ Discount  │  │   │
//! │  │   │ then apply│  │           │  │           │  │  TaxRate  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   cart    │  │ snapshot  │  │  report   │  │   │
//! │  │   │  records  │  │  frozen   │  │ whole app │  │ dashboard │  │   │
//! │  │   │           │  │  prices   │  │   state   │  │  monthly  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  caja-store (Persistence Layer)                 │   │
//! │  │          JSON snapshot file, backups, CSV export, seeding       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The transaction engine: one atomic operation per kind
//! - [`ledger`] - Cash accounts with append-only movement logs
//! - [`inventory`] - Products with per-unit stock history
//! - [`money`] - Integer peso arithmetic, discounts, tax rates
//! - [`cart`] - Pre-commit staging with frozen prices
//! - [`snapshot`] - The whole-application state and its invariant checks
//! - [`report`] - Read-only dashboard and monthly projections
//! - [`types`] - Transaction record types
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level business rule checks
//!
//! ## Design Principles
//!
//! 1. **Validate-then-apply**: an operation that fails mutates nothing
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are whole pesos (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//! 5. **Paired history**: every stock change writes a history entry,
//!    every balance change writes a movement
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::engine::{self, TransferCommand};
//! use caja_core::money::Money;
//! use caja_core::snapshot::Snapshot;
//!
//! let mut snapshot = Snapshot::default_state(Money::from_pesos(500_000));
//!
//! engine::record_transfer(
//!     &mut snapshot,
//!     TransferCommand {
//!         from: "Efectivo".to_string(),
//!         to: "Nequi".to_string(),
//!         amount: Money::from_pesos(200_000),
//!         notes: String::new(),
//!     },
//! )
//! .unwrap();
//!
//! // Money moved, none created or destroyed.
//! assert_eq!(snapshot.ledger.total_balance(), Money::from_pesos(500_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod money;
pub mod report;
pub mod snapshot;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use caja_core::Money` instead of
// `use caja_core::money::Money`

pub use cart::Cart;
pub use error::{EngineError, EngineResult, ValidationError};
pub use inventory::{Inventory, Product};
pub use ledger::{Account, Ledger};
pub use money::{Discount, Money, TaxRate};
pub use snapshot::Snapshot;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tax rate in basis points: 19%, the Colombian IVA.
///
/// Purchases opt in per line item; the stored settings can override the
/// rate, this constant only seeds it.
pub const DEFAULT_TAX_BPS: u32 = 1900;

/// Default sale-price markup in basis points: cost × 1.30.
///
/// Applied when a purchase creates a product without a manual price.
pub const DEFAULT_MARKUP_BPS: u32 = 3000;

/// Default reservation hold window in days.
pub const DEFAULT_RESERVATION_DAYS: i64 = 7;

/// Maximum quantity of a single item per line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;
