//! # Domain Types
//!
//! The transactional records owned by the Transaction Engine, plus their
//! status enums and the unified `Transaction` sum type used by reporting.
//!
//! ## Record Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Account Ledger    owns  Account + Movement        (ledger.rs)      │
//! │  Inventory Store   owns  Product + HistoryEntry    (inventory.rs)   │
//! │  Transaction Engine owns Sale, Purchase, Expense, Transfer, Loan,   │
//! │                          Presale, Reservation      (this file)      │
//! │                                                                     │
//! │  Only the engine may mutate balances or stock as a side effect      │
//! │  of appending one of these records.                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every record has a UUID v4 `id` used for relations; human-facing codes
//! (SKU, account name) are display attributes, never join keys.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Sale
// =============================================================================

/// A committed sale. Immutable once appended - there is no edit operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    /// Ordered line items with price/cost frozen at sale time.
    pub lines: Vec<SaleLine>,
    /// Percentage discount in basis points (1000 = 10%).
    pub discount_percent_bps: u32,
    /// Fixed discount applied after the percentage.
    pub discount_fixed: Money,
    pub subtotal: Money,
    /// `max(0, subtotal - percent - fixed)`.
    pub total: Money,
    /// Stable join key to the credited account.
    pub account_id: String,
    /// Account name at sale time, display only.
    pub account_name: String,
    /// Business date of the sale (may be backdated).
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// True when `occurred_at` was supplied by the operator.
    pub custom_date: bool,
    /// Present when this sale was synthesized from a presale completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presale_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A line item in a sale.
/// Snapshot pattern: name, price, and cost are frozen at sale time, so
/// profit reports stay correct when the product is later edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    /// Product name at sale time (frozen).
    pub name: String,
    pub quantity: i64,
    /// Unit sale price at sale time (frozen).
    pub unit_price: Money,
    /// Unit cost at sale time (frozen) - required for profit reporting.
    pub unit_cost: Money,
}

impl SaleLine {
    /// Line total before discounts.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Cost of the goods in this line.
    #[inline]
    pub fn line_cost(&self) -> Money {
        self.unit_cost.multiply_quantity(self.quantity)
    }
}

impl Sale {
    /// Profit of this sale: discounted total minus frozen cost of goods.
    pub fn profit(&self) -> Money {
        self.total - self.lines.iter().map(SaleLine::line_cost).sum()
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// What a purchase did to inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseKind {
    /// Added stock to an existing product.
    Restock,
    /// Created a new product with opening stock.
    NewProduct,
}

/// A committed purchase (restock or new product). Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub kind: PurchaseKind,
    pub product_id: String,
    /// Product name at purchase time, display only.
    pub product_name: String,
    pub quantity: i64,
    /// Tax-inclusive unit cost when IVA applied, raw cost otherwise.
    pub unit_cost: Money,
    pub total: Money,
    pub account_id: String,
    pub account_name: String,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Expense
// =============================================================================

/// A committed operating expense. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub concept: String,
    pub amount: Money,
    pub category: String,
    pub account_id: String,
    pub account_name: String,
    pub notes: String,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Transfer
// =============================================================================

/// An inter-account transfer. One record, two movements
/// (a debit on the source, a credit on the destination). Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub from_account_id: String,
    pub from_account_name: String,
    pub to_account_id: String,
    pub to_account_name: String,
    pub amount: Money,
    pub notes: String,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Loan
// =============================================================================

/// Which way the principal moved at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanDirection {
    /// Cash lent to a person - principal debits the account.
    LentCash,
    /// Money lent through a payment app - principal debits the account.
    LentApp,
    /// Money borrowed from a person - principal credits the account.
    Borrowed,
}

impl LoanDirection {
    /// True when the principal left one of our accounts at issuance.
    #[inline]
    pub fn is_outbound(&self) -> bool {
        matches!(self, LoanDirection::LentCash | LoanDirection::LentApp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Paid,
    Cancelled,
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanStatus::Active => write!(f, "active"),
            LoanStatus::Paid => write!(f, "paid"),
            LoanStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A partial or full payment against a loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPayment {
    pub id: String,
    pub amount: Money,
    pub date: DateTime<Utc>,
    pub account_id: String,
    pub account_name: String,
}

/// A tracked external debt or credit with partial-payment accrual.
///
/// ## Invariant
/// `0 <= paid_amount <= amount`; status becomes `Paid` exactly when
/// `paid_amount == amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub direction: LoanDirection,
    pub person: String,
    /// Principal.
    pub amount: Money,
    pub account_id: String,
    pub account_name: String,
    pub notes: String,
    pub status: LoanStatus,
    pub paid_amount: Money,
    pub payments: Vec<LoanPayment>,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_payment_date: Option<DateTime<Utc>>,
    /// Set when the loan reached `Paid` or `Cancelled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// Unpaid principal.
    #[inline]
    pub fn remaining(&self) -> Money {
        self.amount - self.paid_amount
    }
}

// =============================================================================
// Presale
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresaleStatus {
    Pending,
    Delivered,
}

impl std::fmt::Display for PresaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresaleStatus::Pending => write!(f, "pending"),
            PresaleStatus::Delivered => write!(f, "delivered"),
        }
    }
}

/// A sale agreed and partially funded before delivery.
///
/// `balance = total - deposit` is owed at completion. The product
/// reference is either an inventory id or free text for items not yet
/// stocked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presale {
    pub id: String,
    pub client: String,
    /// Inventory link; `None` for free-text products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub product_name: String,
    pub total: Money,
    /// `0 <= deposit <= total`, credited at creation.
    pub deposit: Money,
    /// Remaining amount due at completion.
    pub balance: Money,
    pub delivery_date: NaiveDate,
    pub status: PresaleStatus,
    /// Account that received the deposit.
    pub account_id: String,
    pub account_name: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Account that received the remaining balance, set at completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_payment_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_payment_amount: Option<Money>,
}

// =============================================================================
// Reservation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Held,
    Cancelled,
    Completed,
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationStatus::Held => write!(f, "held"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
            ReservationStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A temporary stock hold for a client without an immediate sale.
///
/// ## Invariant
/// A `Held` reservation's quantity has already been decremented from the
/// product's stock; cancellation restores exactly that quantity,
/// completion leaves stock as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub client: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    /// Hold duration in days.
    pub duration_days: i64,
    pub notes: String,
    pub status: ReservationStatus,
    pub date: DateTime<Utc>,
}

impl Reservation {
    /// When this hold lapses. Expiry is advisory - nothing releases the
    /// stock automatically; the operator cancels or completes.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.date + chrono::Duration::days(self.duration_days)
    }
}

// =============================================================================
// Transaction Sum Type
// =============================================================================

/// A unified, discriminated view over every transaction kind, borrowed
/// from the snapshot. Reporting iterates these instead of poking at
/// seven separate vectors.
#[derive(Debug, Clone, Copy)]
pub enum Transaction<'a> {
    Sale(&'a Sale),
    Purchase(&'a Purchase),
    Expense(&'a Expense),
    Transfer(&'a Transfer),
    Loan(&'a Loan),
    Presale(&'a Presale),
    Reservation(&'a Reservation),
}

impl Transaction<'_> {
    /// Business date of the underlying record.
    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Transaction::Sale(s) => s.occurred_at,
            Transaction::Purchase(p) => p.date,
            Transaction::Expense(e) => e.date,
            Transaction::Transfer(t) => t.date,
            Transaction::Loan(l) => l.date,
            Transaction::Presale(p) => p.date,
            Transaction::Reservation(r) => r.date,
        }
    }

    /// Record id of the underlying record.
    pub fn id(&self) -> &str {
        match self {
            Transaction::Sale(s) => &s.id,
            Transaction::Purchase(p) => &p.id,
            Transaction::Expense(e) => &e.id,
            Transaction::Transfer(t) => &t.id,
            Transaction::Loan(l) => &l.id,
            Transaction::Presale(p) => &p.id,
            Transaction::Reservation(r) => &r.id,
        }
    }

    /// Discriminant label for logging and export.
    pub fn kind(&self) -> &'static str {
        match self {
            Transaction::Sale(_) => "sale",
            Transaction::Purchase(_) => "purchase",
            Transaction::Expense(_) => "expense",
            Transaction::Transfer(_) => "transfer",
            Transaction::Loan(_) => "loan",
            Transaction::Presale(_) => "presale",
            Transaction::Reservation(_) => "reservation",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
