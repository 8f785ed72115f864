//! # Snapshot
//!
//! The full current state of all ledger/inventory aggregates, treated as
//! a value passed into and returned from engine operations.
//!
//! ## State-Passing Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  caller                      engine                    store        │
//! │    │                           │                         │          │
//! │    │  load() ─────────────────────────────────────────►  │          │
//! │    │  ◄───────────── Snapshot ─────────────────────────  │          │
//! │    │                           │                         │          │
//! │    │  record_sale(&mut snap, cmd)                        │          │
//! │    │ ─────────────────────────►│ validate-then-apply     │          │
//! │    │  ◄── Ok(id) / EngineError │ (atomic, synchronous)   │          │
//! │    │                           │                         │          │
//! │    │  save(&snap) ─────────────────────────────────────► │          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! No ambient global state: every operation takes the snapshot as an
//! explicit argument. The caller serializes operations against one
//! snapshot (single-writer model).

use serde::{Deserialize, Serialize};

use crate::inventory::Inventory;
use crate::ledger::{Account, Ledger};
use crate::money::{Money, TaxRate};
use crate::types::{Expense, Loan, Presale, Purchase, Reservation, Sale, Transaction, Transfer};

// =============================================================================
// Settings
// =============================================================================

/// Read-only configuration referenced by the engine: the tax rate feeds
/// purchase/price calculations, the account-name list is the valid target
/// set for account-referencing operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub tax: TaxRate,
    pub languages: Vec<String>,
    pub categories: Vec<String>,
    pub product_types: Vec<String>,
    /// Account display names, kept in step with the ledger by the
    /// engine's account operations.
    pub accounts: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tax: TaxRate::from_bps(crate::DEFAULT_TAX_BPS),
            languages: vec!["ES".into(), "EN".into(), "JA".into()],
            categories: vec![
                "Pokémon".into(),
                "Funko Pop".into(),
                "Tecnología".into(),
                "Accesorios".into(),
            ],
            product_types: vec!["Carta".into(), "Funko".into(), "Otro".into()],
            accounts: vec![
                "Efectivo".into(),
                "Nequi".into(),
                "NU".into(),
                "Bancolombia".into(),
            ],
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// The whole-state aggregate the store persists as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub settings: Settings,
    pub inventory: Inventory,
    pub ledger: Ledger,
    pub sales: Vec<Sale>,
    pub purchases: Vec<Purchase>,
    pub expenses: Vec<Expense>,
    pub transfers: Vec<Transfer>,
    pub loans: Vec<Loan>,
    pub presales: Vec<Presale>,
    pub reservations: Vec<Reservation>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::default_state(Money::zero())
    }
}

impl Snapshot {
    /// Builds the initial state: empty logs, the seed accounts, and an
    /// opening cash balance in Efectivo. Every settings account name has
    /// a matching ledger account - the engine keeps the two in step.
    pub fn default_state(initial_cash: Money) -> Self {
        let settings = Settings::default();
        let accounts = settings
            .accounts
            .iter()
            .map(|name| {
                let opening = if name == "Efectivo" {
                    initial_cash
                } else {
                    Money::zero()
                };
                Account::new(name.clone(), opening)
            })
            .collect();

        Snapshot {
            settings,
            inventory: Inventory::default(),
            ledger: Ledger { accounts },
            sales: Vec::new(),
            purchases: Vec::new(),
            expenses: Vec::new(),
            transfers: Vec::new(),
            loans: Vec::new(),
            presales: Vec::new(),
            reservations: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Record lookup
    // -------------------------------------------------------------------------

    pub fn find_loan(&self, id: &str) -> Option<&Loan> {
        self.loans.iter().find(|l| l.id == id)
    }

    pub fn find_presale(&self, id: &str) -> Option<&Presale> {
        self.presales.iter().find(|p| p.id == id)
    }

    pub fn find_reservation(&self, id: &str) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    /// Number of sales whose lines reference a product. Used for the
    /// deletion warning - removal orphans these references.
    pub fn sales_referencing(&self, product_id: &str) -> usize {
        self.sales
            .iter()
            .filter(|s| s.lines.iter().any(|l| l.product_id == product_id))
            .count()
    }

    /// True when an id is already taken by any transaction record.
    /// Defensive backing for the engine's `DuplicateIdentifier` check.
    pub fn id_in_use(&self, id: &str) -> bool {
        self.sales.iter().any(|r| r.id == id)
            || self.purchases.iter().any(|r| r.id == id)
            || self.expenses.iter().any(|r| r.id == id)
            || self.transfers.iter().any(|r| r.id == id)
            || self.loans.iter().any(|r| r.id == id)
            || self.presales.iter().any(|r| r.id == id)
            || self.reservations.iter().any(|r| r.id == id)
    }

    // -------------------------------------------------------------------------
    // Journal
    // -------------------------------------------------------------------------

    /// All transaction records as discriminated variants, ordered by
    /// business date. Read-only projection.
    pub fn journal(&self) -> Vec<Transaction<'_>> {
        let mut entries: Vec<Transaction<'_>> = self
            .sales
            .iter()
            .map(Transaction::Sale)
            .chain(self.purchases.iter().map(Transaction::Purchase))
            .chain(self.expenses.iter().map(Transaction::Expense))
            .chain(self.transfers.iter().map(Transaction::Transfer))
            .chain(self.loans.iter().map(Transaction::Loan))
            .chain(self.presales.iter().map(Transaction::Presale))
            .chain(self.reservations.iter().map(Transaction::Reservation))
            .collect();
        entries.sort_by_key(|t| t.date());
        entries
    }

    // -------------------------------------------------------------------------
    // Invariant verification
    // -------------------------------------------------------------------------

    /// Checks the cross-entity invariants the engine maintains. Returns
    /// every violation found; an empty list means the snapshot is
    /// consistent. Used by tests and by backup restore.
    ///
    /// Accounts created with an opening balance have no movement for it,
    /// so the balance check is `balance - movement_sum >= 0` only for
    /// accounts that ever moved money; a stricter equality would need the
    /// opening balance stored separately.
    pub fn verify(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for product in &self.inventory.products {
            if product.stock < 0 {
                violations.push(format!(
                    "product {} has negative stock {}",
                    product.id, product.stock
                ));
            }
        }

        for loan in &self.loans {
            if loan.paid_amount.is_negative() || loan.paid_amount > loan.amount {
                violations.push(format!(
                    "loan {} paid_amount {} outside 0..={}",
                    loan.id,
                    loan.paid_amount,
                    loan.amount
                ));
            }
        }

        for presale in &self.presales {
            if presale.deposit.is_negative() || presale.deposit > presale.total {
                violations.push(format!(
                    "presale {} deposit {} outside 0..={}",
                    presale.id, presale.deposit, presale.total
                ));
            }
        }

        for account in &self.ledger.accounts {
            let implied_opening = account.balance - account.movement_sum();
            if implied_opening.is_negative() {
                violations.push(format!(
                    "account {} balance {} below its movement sum {}",
                    account.name,
                    account.balance,
                    account.movement_sum()
                ));
            }
        }

        violations
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
