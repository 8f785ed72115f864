//! # Transaction Engine
//!
//! One operation per transaction kind. Each operation atomically
//! validates and mutates the Account Ledger and/or the Inventory Store
//! and appends exactly one transaction record.
//!
//! ## Commit Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  1. Validate EVERY precondition against the live snapshot           │
//! │     (never a cached cart/form value)                                │
//! │  2. Any precondition fails → return the typed error, apply NOTHING  │
//! │  3. Otherwise apply all ledger/inventory mutations and append the   │
//! │     record - no partial application is observable by callers        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations are synchronous and never suspend between validation and
//! application; if the surrounding system is multi-threaded, the caller
//! must serialize operations against one snapshot (mutex or a per-
//! snapshot command queue).
//!
//! ## Concept Strings
//! Movement concepts are user-facing Spanish, matching what operators of
//! this system read in their account statements ("Venta", "Abono
//! preventa", ...).

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::inventory::{Product, ProductStatus, StockEventKind};
use crate::money::{Discount, Money};
use crate::snapshot::Snapshot;
use crate::types::{
    Expense, Loan, LoanDirection, LoanPayment, LoanStatus, Presale, PresaleStatus, Purchase,
    PurchaseKind, Reservation, ReservationStatus, Sale, SaleLine, Transfer,
};
use crate::validation::{require_field, require_positive_amount, require_quantity};

// =============================================================================
// Confirmation Tokens
// =============================================================================

/// Explicit acknowledgement for destructive operations (loan
/// cancellation). The engine never assumes interactive confirmation; the
/// caller constructs this token only after its own confirmation flow.
#[derive(Debug, Clone, Copy)]
pub struct Confirmation(());

impl Confirmation {
    pub fn acknowledge() -> Self {
        Confirmation(())
    }
}

/// Token gating the full wipe. Only constructible from the exact
/// confirmation phrase, so no caller can reset a ledger by accident.
#[derive(Debug, Clone, Copy)]
pub struct WipeToken(());

impl WipeToken {
    /// The phrase the operator must type, unchanged from the original
    /// system's emergency-delete dialog.
    pub const PHRASE: &'static str = "BORRAR TODO";

    pub fn from_phrase(phrase: &str) -> Option<Self> {
        (phrase == Self::PHRASE).then_some(WipeToken(()))
    }
}

/// What to do with the untouched balance effect when cancelling an
/// active loan. The original system never reversed (write-off); whether
/// that was intentional is an open question, so the policy is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanCancelPolicy {
    /// Keep the books as they are; the unpaid remainder is written off.
    WriteOff,
    /// Undo the unpaid remainder's balance effect.
    Reverse,
}

// =============================================================================
// Commands
// =============================================================================

/// A sale commit request. Prices/costs come frozen in the cart lines;
/// stock is re-validated live.
#[derive(Debug, Clone)]
pub struct SaleCommand {
    pub cart: Cart,
    pub discount: Discount,
    /// Paying account display name from the settings list.
    pub account: String,
    /// Backdated business date; `None` means now.
    pub occurred_at: Option<DateTime<Utc>>,
}

/// What a purchase targets.
#[derive(Debug, Clone)]
pub enum PurchaseTarget {
    /// Add stock to an existing product (its cost and tax flag are
    /// overwritten with the purchase's).
    Restock { product_id: String },
    /// Create a new product with this purchase as opening stock.
    NewProduct {
        name: String,
        language: String,
        category: String,
        kind: String,
        supplier: String,
        /// Manual sale price; `None` applies the default 30% markup.
        manual_price: Option<Money>,
    },
}

#[derive(Debug, Clone)]
pub struct PurchaseCommand {
    pub target: PurchaseTarget,
    pub quantity: i64,
    /// Raw unit cost; tax is added on top when `apply_tax` is set.
    pub unit_cost: Money,
    pub apply_tax: bool,
    pub account: String,
}

#[derive(Debug, Clone)]
pub struct ExpenseCommand {
    pub concept: String,
    pub amount: Money,
    pub category: String,
    pub account: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub from: String,
    pub to: String,
    pub amount: Money,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct LoanCommand {
    pub direction: LoanDirection,
    pub person: String,
    pub amount: Money,
    pub account: String,
    pub notes: String,
}

/// Replacement data for an active loan. The funding account is fixed at
/// issuance; only direction, person, amount, and notes can change.
#[derive(Debug, Clone)]
pub struct EditLoanCommand {
    pub direction: LoanDirection,
    pub person: String,
    pub amount: Money,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub enum PresaleProduct {
    /// Link to an inventory product (flips it to `InTransit`).
    Inventory { product_id: String },
    /// Free text for an item not yet stocked.
    Custom { name: String },
}

#[derive(Debug, Clone)]
pub struct PresaleCommand {
    pub client: String,
    pub product: PresaleProduct,
    pub total: Money,
    pub deposit: Money,
    pub delivery_date: NaiveDate,
    /// Account receiving the deposit.
    pub account: String,
}

#[derive(Debug, Clone)]
pub struct ReservationCommand {
    pub client: String,
    pub product_id: String,
    pub quantity: i64,
    /// Hold duration; zero or negative falls back to the default 7 days.
    pub duration_days: i64,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct IncomeCommand {
    pub amount: Money,
    pub concept: String,
    pub account: String,
    pub notes: String,
}

// =============================================================================
// Id Generation
// =============================================================================

/// Generates a fresh record id and runs the defensive collision check.
fn new_record_id(snapshot: &Snapshot) -> EngineResult<String> {
    let id = Uuid::new_v4().to_string();
    if snapshot.id_in_use(&id) {
        return Err(EngineError::DuplicateIdentifier(id));
    }
    Ok(id)
}

// =============================================================================
// Sale
// =============================================================================

/// Commits a sale: credits the paying account with the discounted total
/// and decrements stock for every line.
///
/// Stock is re-validated against the live snapshot for every line - the
/// cart's add-time checks are not trusted. Fails with `EmptyCart` or
/// `InsufficientStock` without mutating anything.
pub fn record_sale(snapshot: &mut Snapshot, cmd: SaleCommand) -> EngineResult<String> {
    debug!(lines = cmd.cart.lines.len(), account = %cmd.account, "record_sale");

    // ---- validate ----
    if cmd.cart.is_empty() {
        return Err(EngineError::EmptyCart);
    }
    let account = snapshot.ledger.resolve(&cmd.account)?;
    let (account_id, account_name) = (account.id.clone(), account.name.clone());

    for line in &cmd.cart.lines {
        require_quantity(line.quantity)?;
        let product = snapshot.inventory.resolve(&line.product_id)?;
        if product.stock < line.quantity {
            return Err(EngineError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: line.quantity,
            });
        }
    }

    let (subtotal, total) = cmd.cart.totals(cmd.discount);
    let sale_id = new_record_id(snapshot)?;
    let now = Utc::now();
    let occurred_at = cmd.occurred_at.unwrap_or(now);

    // ---- apply ----
    for line in &cmd.cart.lines {
        snapshot.inventory.decrease_stock(
            &line.product_id,
            line.quantity,
            StockEventKind::Sale,
            sale_id.clone(),
            occurred_at,
        )?;
    }
    snapshot.ledger.credit(
        &account_id,
        total,
        format!("Venta #{}", sale_id),
        occurred_at,
    )?;

    let lines: Vec<SaleLine> = cmd
        .cart
        .lines
        .iter()
        .map(|l| SaleLine {
            product_id: l.product_id.clone(),
            name: l.name.clone(),
            quantity: l.quantity,
            unit_price: l.unit_price,
            unit_cost: l.unit_cost,
        })
        .collect();

    snapshot.sales.push(Sale {
        id: sale_id.clone(),
        lines,
        discount_percent_bps: cmd.discount.percent_bps,
        discount_fixed: cmd.discount.fixed,
        subtotal,
        total,
        account_id,
        account_name,
        occurred_at,
        created_at: now,
        custom_date: cmd.occurred_at.is_some(),
        presale_id: None,
        notes: None,
    });

    info!(sale_id = %sale_id, total = %total, "sale committed");
    Ok(sale_id)
}

// =============================================================================
// Purchase
// =============================================================================

/// Commits a purchase: debits the paying account for the (optionally
/// tax-inclusive) total and either restocks an existing product or
/// creates a new one.
pub fn record_purchase(snapshot: &mut Snapshot, cmd: PurchaseCommand) -> EngineResult<String> {
    debug!(account = %cmd.account, quantity = cmd.quantity, "record_purchase");

    // ---- validate ----
    require_quantity(cmd.quantity)?;
    if cmd.unit_cost.is_negative() {
        return Err(ValidationError::MustBePositive { field: "unit cost" }.into());
    }

    let unit_cost = if cmd.apply_tax {
        cmd.unit_cost.with_tax(snapshot.settings.tax)
    } else {
        cmd.unit_cost
    };
    let total = unit_cost.multiply_quantity(cmd.quantity);

    let account = snapshot.ledger.resolve(&cmd.account)?;
    if account.balance < total {
        return Err(EngineError::InsufficientFunds {
            account: account.name.clone(),
            needed: total,
            available: account.balance,
        });
    }
    let (account_id, account_name) = (account.id.clone(), account.name.clone());

    let purchase_id = new_record_id(snapshot)?;
    let now = Utc::now();

    let (kind, product_id, product_name, concept) = match &cmd.target {
        PurchaseTarget::Restock { product_id } => {
            let product = snapshot.inventory.resolve(product_id)?;
            (
                PurchaseKind::Restock,
                product.id.clone(),
                product.name.clone(),
                "Compra stock",
            )
        }
        PurchaseTarget::NewProduct {
            name,
            language,
            category,
            kind,
            manual_price,
            ..
        } => {
            require_field("name", name)?;
            require_field("language", language)?;
            require_field("category", category)?;
            require_field("type", kind)?;
            if let Some(price) = manual_price {
                require_positive_amount("price", *price)?;
            }
            (
                PurchaseKind::NewProduct,
                Uuid::new_v4().to_string(),
                name.clone(),
                "Compra nuevo producto",
            )
        }
    };

    // ---- apply ----
    match cmd.target {
        PurchaseTarget::Restock { .. } => {
            snapshot.inventory.increase_stock(
                &product_id,
                cmd.quantity,
                StockEventKind::Restock,
                purchase_id.clone(),
                now,
            )?;
            // Restock overwrites the unit cost and tax flag.
            if let Some(product) = snapshot
                .inventory
                .products
                .iter_mut()
                .find(|p| p.id == product_id)
            {
                product.cost = unit_cost;
                product.apply_tax = cmd.apply_tax;
            }
        }
        PurchaseTarget::NewProduct {
            name,
            language,
            category,
            kind,
            supplier,
            manual_price,
        } => {
            let price =
                manual_price.unwrap_or_else(|| unit_cost.with_markup(crate::DEFAULT_MARKUP_BPS));
            snapshot.inventory.upsert(Product {
                id: product_id.clone(),
                sku: Product::generate_sku(&product_id),
                name,
                description: "Producto nuevo".to_string(),
                language,
                category,
                kind,
                stock: 0,
                cost: unit_cost,
                price,
                supplier,
                tags: vec![],
                images: vec![],
                apply_tax: cmd.apply_tax,
                status: ProductStatus::Available,
                history: vec![],
            })?;
            snapshot.inventory.increase_stock(
                &product_id,
                cmd.quantity,
                StockEventKind::Restock,
                purchase_id.clone(),
                now,
            )?;
        }
    }

    snapshot.ledger.debit(&account_id, total, concept, now)?;

    snapshot.purchases.push(Purchase {
        id: purchase_id.clone(),
        kind,
        product_id,
        product_name,
        quantity: cmd.quantity,
        unit_cost,
        total,
        account_id,
        account_name,
        date: now,
    });

    info!(purchase_id = %purchase_id, total = %total, ?kind, "purchase committed");
    Ok(purchase_id)
}

// =============================================================================
// Expense
// =============================================================================

/// Commits an operating expense: debits the paying account.
pub fn record_expense(snapshot: &mut Snapshot, cmd: ExpenseCommand) -> EngineResult<String> {
    debug!(account = %cmd.account, amount = %cmd.amount, "record_expense");

    // ---- validate ----
    require_field("concept", &cmd.concept)?;
    require_field("category", &cmd.category)?;
    require_positive_amount("amount", cmd.amount)?;

    let account = snapshot.ledger.resolve(&cmd.account)?;
    if account.balance < cmd.amount {
        return Err(EngineError::InsufficientFunds {
            account: account.name.clone(),
            needed: cmd.amount,
            available: account.balance,
        });
    }
    let (account_id, account_name) = (account.id.clone(), account.name.clone());

    let expense_id = new_record_id(snapshot)?;
    let now = Utc::now();

    // ---- apply ----
    snapshot
        .ledger
        .debit(&account_id, cmd.amount, format!("Gasto: {}", cmd.concept), now)?;

    snapshot.expenses.push(Expense {
        id: expense_id.clone(),
        concept: cmd.concept,
        amount: cmd.amount,
        category: cmd.category,
        account_id,
        account_name,
        notes: cmd.notes,
        date: now,
    });

    info!(expense_id = %expense_id, amount = %cmd.amount, "expense committed");
    Ok(expense_id)
}

// =============================================================================
// Transfer
// =============================================================================

/// Commits an inter-account transfer: one record, two movements.
pub fn record_transfer(snapshot: &mut Snapshot, cmd: TransferCommand) -> EngineResult<String> {
    debug!(from = %cmd.from, to = %cmd.to, amount = %cmd.amount, "record_transfer");

    // ---- validate ----
    require_positive_amount("amount", cmd.amount)?;
    if cmd.from == cmd.to {
        return Err(EngineError::SameAccount(cmd.from));
    }

    let from = snapshot.ledger.resolve(&cmd.from)?;
    if from.balance < cmd.amount {
        return Err(EngineError::InsufficientFunds {
            account: from.name.clone(),
            needed: cmd.amount,
            available: from.balance,
        });
    }
    let (from_id, from_name) = (from.id.clone(), from.name.clone());
    let to = snapshot.ledger.resolve(&cmd.to)?;
    let (to_id, to_name) = (to.id.clone(), to.name.clone());

    let transfer_id = new_record_id(snapshot)?;
    let now = Utc::now();

    // ---- apply ----
    snapshot.ledger.debit(
        &from_id,
        cmd.amount,
        format!("Transferencia a {}", to_name),
        now,
    )?;
    snapshot.ledger.credit(
        &to_id,
        cmd.amount,
        format!("Transferencia de {}", from_name),
        now,
    )?;

    snapshot.transfers.push(Transfer {
        id: transfer_id.clone(),
        from_account_id: from_id,
        from_account_name: from_name,
        to_account_id: to_id,
        to_account_name: to_name,
        amount: cmd.amount,
        notes: cmd.notes,
        date: now,
    });

    info!(transfer_id = %transfer_id, amount = %cmd.amount, "transfer committed");
    Ok(transfer_id)
}

// =============================================================================
// Loans
// =============================================================================

/// Issues a loan. Outbound directions (`LentCash`/`LentApp`) debit the
/// account for the principal; `Borrowed` credits it.
pub fn issue_loan(snapshot: &mut Snapshot, cmd: LoanCommand) -> EngineResult<String> {
    debug!(person = %cmd.person, amount = %cmd.amount, ?cmd.direction, "issue_loan");

    // ---- validate ----
    require_field("person", &cmd.person)?;
    require_positive_amount("amount", cmd.amount)?;

    let account = snapshot.ledger.resolve(&cmd.account)?;
    if cmd.direction.is_outbound() && account.balance < cmd.amount {
        return Err(EngineError::InsufficientFunds {
            account: account.name.clone(),
            needed: cmd.amount,
            available: account.balance,
        });
    }
    let (account_id, account_name) = (account.id.clone(), account.name.clone());

    let loan_id = new_record_id(snapshot)?;
    let now = Utc::now();

    // ---- apply ----
    if cmd.direction.is_outbound() {
        snapshot.ledger.debit(
            &account_id,
            cmd.amount,
            format!("Préstamo a {}", cmd.person),
            now,
        )?;
    } else {
        snapshot.ledger.credit(
            &account_id,
            cmd.amount,
            format!("Préstamo recibido de {}", cmd.person),
            now,
        )?;
    }

    snapshot.loans.push(Loan {
        id: loan_id.clone(),
        direction: cmd.direction,
        person: cmd.person,
        amount: cmd.amount,
        account_id,
        account_name,
        notes: cmd.notes,
        status: LoanStatus::Active,
        paid_amount: Money::zero(),
        payments: vec![],
        date: now,
        last_payment_date: None,
        settled_at: None,
    });

    info!(loan_id = %loan_id, amount = %cmd.amount, "loan issued");
    Ok(loan_id)
}

/// Edits an active loan. The old principal's balance effect is reversed
/// and the new one applied, as two logged movements; the precondition
/// covers only the incremental funding requirement.
pub fn edit_loan(
    snapshot: &mut Snapshot,
    loan_id: &str,
    cmd: EditLoanCommand,
) -> EngineResult<()> {
    debug!(loan_id = %loan_id, new_amount = %cmd.amount, "edit_loan");

    // ---- validate ----
    require_field("person", &cmd.person)?;
    require_positive_amount("amount", cmd.amount)?;

    let loan = snapshot
        .find_loan(loan_id)
        .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
    if loan.status != LoanStatus::Active {
        return Err(EngineError::invalid_state("loan", loan_id, loan.status));
    }
    if cmd.amount < loan.paid_amount {
        return Err(ValidationError::Invalid {
            field: "amount",
            reason: format!(
                "new principal {} is below the {} already paid",
                cmd.amount, loan.paid_amount
            ),
        }
        .into());
    }

    let old_amount = loan.amount;
    let old_direction = loan.direction;
    let account_id = loan.account_id.clone();
    let person = loan.person.clone();

    let account = snapshot
        .ledger
        .find(&account_id)
        .ok_or_else(|| EngineError::AccountNotFound(account_id.clone()))?;

    // Balance after undoing the old principal, before applying the new.
    let after_reversal = if old_direction.is_outbound() {
        account.balance + old_amount
    } else {
        account.balance - old_amount
    };
    if after_reversal.is_negative() {
        return Err(EngineError::InsufficientFunds {
            account: account.name.clone(),
            needed: old_amount,
            available: account.balance,
        });
    }
    if cmd.direction.is_outbound() && after_reversal < cmd.amount {
        return Err(EngineError::InsufficientFunds {
            account: account.name.clone(),
            needed: cmd.amount,
            available: after_reversal,
        });
    }

    let now = Utc::now();

    // ---- apply ----
    // Reversal of the old principal's effect.
    if old_direction.is_outbound() {
        snapshot.ledger.credit(
            &account_id,
            old_amount,
            format!("Ajuste préstamo (reversión): {}", person),
            now,
        )?;
    } else {
        snapshot.ledger.debit(
            &account_id,
            old_amount,
            format!("Ajuste préstamo (reversión): {}", person),
            now,
        )?;
    }
    // New principal's effect.
    if cmd.direction.is_outbound() {
        snapshot.ledger.debit(
            &account_id,
            cmd.amount,
            format!("Préstamo editado: {}", cmd.person),
            now,
        )?;
    } else {
        snapshot.ledger.credit(
            &account_id,
            cmd.amount,
            format!("Préstamo editado: {}", cmd.person),
            now,
        )?;
    }

    let loan = snapshot
        .loans
        .iter_mut()
        .find(|l| l.id == loan_id)
        .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
    loan.direction = cmd.direction;
    loan.person = cmd.person;
    loan.amount = cmd.amount;
    loan.notes = cmd.notes;

    info!(loan_id = %loan_id, old = %old_amount, new = %loan.amount, "loan edited");
    Ok(())
}

/// Records a partial payment against an active loan.
///
/// Payments move money opposite to issuance: an outbound loan's payment
/// credits the account (the principal coming back), a borrowed loan's
/// payment debits it and requires sufficient balance.
pub fn pay_loan_partial(
    snapshot: &mut Snapshot,
    loan_id: &str,
    amount: Money,
    account: &str,
) -> EngineResult<()> {
    let account_id = snapshot.ledger.resolve(account)?.id.clone();
    apply_loan_payment(snapshot, loan_id, Some(amount), &account_id)
}

/// Settles the full remaining balance of an active loan. `account` of
/// `None` pays through the loan's own account.
pub fn pay_loan_full(
    snapshot: &mut Snapshot,
    loan_id: &str,
    account: Option<&str>,
) -> EngineResult<()> {
    let account_id = match account {
        Some(name) => snapshot.ledger.resolve(name)?.id.clone(),
        None => {
            let loan = snapshot
                .find_loan(loan_id)
                .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
            loan.account_id.clone()
        }
    };
    apply_loan_payment(snapshot, loan_id, None, &account_id)
}

/// Shared payment path. `amount` of `None` means the full remainder.
fn apply_loan_payment(
    snapshot: &mut Snapshot,
    loan_id: &str,
    amount: Option<Money>,
    account_id: &str,
) -> EngineResult<()> {
    // ---- validate ----
    let loan = snapshot
        .find_loan(loan_id)
        .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
    if loan.status != LoanStatus::Active {
        return Err(EngineError::invalid_state("loan", loan_id, loan.status));
    }

    let remaining = loan.remaining();
    let amount = amount.unwrap_or(remaining);
    debug!(loan_id = %loan_id, amount = %amount, remaining = %remaining, "loan payment");

    require_positive_amount("payment", amount)?;
    if amount > remaining {
        return Err(ValidationError::Invalid {
            field: "payment",
            reason: format!("{} exceeds the {} outstanding", amount, remaining),
        }
        .into());
    }

    let direction = loan.direction;
    let person = loan.person.clone();

    let account = snapshot
        .ledger
        .find(account_id)
        .ok_or_else(|| EngineError::AccountNotFound(account_id.to_string()))?;
    if !direction.is_outbound() && account.balance < amount {
        return Err(EngineError::InsufficientFunds {
            account: account.name.clone(),
            needed: amount,
            available: account.balance,
        });
    }
    let account_name = account.name.clone();

    let now = Utc::now();

    // ---- apply ----
    if direction.is_outbound() {
        snapshot.ledger.credit(
            account_id,
            amount,
            format!("Abono recibido de {}", person),
            now,
        )?;
    } else {
        snapshot.ledger.debit(
            account_id,
            amount,
            format!("Abono préstamo: {}", person),
            now,
        )?;
    }

    let loan = snapshot
        .loans
        .iter_mut()
        .find(|l| l.id == loan_id)
        .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
    loan.paid_amount += amount;
    loan.last_payment_date = Some(now);
    loan.payments.push(LoanPayment {
        id: Uuid::new_v4().to_string(),
        amount,
        date: now,
        account_id: account_id.to_string(),
        account_name,
    });
    if loan.paid_amount == loan.amount {
        loan.status = LoanStatus::Paid;
        loan.settled_at = Some(now);
    }

    info!(loan_id = %loan_id, amount = %amount, status = %loan.status, "loan payment committed");
    Ok(())
}

/// Cancels an active loan under the given policy.
///
/// `WriteOff` replicates the original system (no balance reversal);
/// `Reverse` undoes the unpaid remainder's effect.
pub fn cancel_loan(
    snapshot: &mut Snapshot,
    loan_id: &str,
    policy: LoanCancelPolicy,
    _confirm: Confirmation,
) -> EngineResult<()> {
    // ---- validate ----
    let loan = snapshot
        .find_loan(loan_id)
        .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
    if loan.status != LoanStatus::Active {
        return Err(EngineError::invalid_state("loan", loan_id, loan.status));
    }

    let remaining = loan.remaining();
    let direction = loan.direction;
    let account_id = loan.account_id.clone();
    let person = loan.person.clone();

    if policy == LoanCancelPolicy::Reverse && !direction.is_outbound() && remaining.is_positive() {
        // Reversing a borrowed loan debits the money back out.
        let account = snapshot
            .ledger
            .find(&account_id)
            .ok_or_else(|| EngineError::AccountNotFound(account_id.clone()))?;
        if account.balance < remaining {
            return Err(EngineError::InsufficientFunds {
                account: account.name.clone(),
                needed: remaining,
                available: account.balance,
            });
        }
    }

    let now = Utc::now();

    // ---- apply ----
    if policy == LoanCancelPolicy::Reverse && remaining.is_positive() {
        let concept = format!("Cancelación préstamo: {}", person);
        if direction.is_outbound() {
            snapshot.ledger.credit(&account_id, remaining, concept, now)?;
        } else {
            snapshot.ledger.debit(&account_id, remaining, concept, now)?;
        }
    }

    let loan = snapshot
        .loans
        .iter_mut()
        .find(|l| l.id == loan_id)
        .ok_or_else(|| EngineError::not_found("loan", loan_id))?;
    loan.status = LoanStatus::Cancelled;
    loan.settled_at = Some(now);

    info!(loan_id = %loan_id, ?policy, "loan cancelled");
    Ok(())
}

// =============================================================================
// Presales
// =============================================================================

/// Creates a presale: credits the deposit (if any) and flips a linked
/// inventory product to `InTransit`. Stock is untouched until completion.
pub fn create_presale(snapshot: &mut Snapshot, cmd: PresaleCommand) -> EngineResult<String> {
    debug!(client = %cmd.client, total = %cmd.total, "create_presale");

    // ---- validate ----
    require_field("client", &cmd.client)?;
    require_positive_amount("total", cmd.total)?;
    if cmd.deposit.is_negative() || cmd.deposit > cmd.total {
        return Err(ValidationError::Invalid {
            field: "deposit",
            reason: format!("{} outside 0..={}", cmd.deposit, cmd.total),
        }
        .into());
    }

    let account = snapshot.ledger.resolve(&cmd.account)?;
    let (account_id, account_name) = (account.id.clone(), account.name.clone());

    let (product_id, product_name) = match &cmd.product {
        PresaleProduct::Inventory { product_id } => {
            let product = snapshot.inventory.resolve(product_id)?;
            (Some(product.id.clone()), product.name.clone())
        }
        PresaleProduct::Custom { name } => {
            require_field("product", name)?;
            (None, name.clone())
        }
    };

    let presale_id = new_record_id(snapshot)?;
    let now = Utc::now();

    // ---- apply ----
    if let Some(id) = &product_id {
        snapshot.inventory.set_status(id, ProductStatus::InTransit)?;
    }
    if cmd.deposit.is_positive() {
        snapshot.ledger.credit(
            &account_id,
            cmd.deposit,
            format!("Abono preventa: {} - {}", cmd.client, product_name),
            now,
        )?;
    }

    snapshot.presales.push(Presale {
        id: presale_id.clone(),
        client: cmd.client,
        product_id,
        product_name,
        total: cmd.total,
        deposit: cmd.deposit,
        balance: cmd.total - cmd.deposit,
        delivery_date: cmd.delivery_date,
        status: PresaleStatus::Pending,
        account_id,
        account_name,
        date: now,
        completed_at: None,
        final_payment_account: None,
        final_payment_amount: None,
    });

    info!(presale_id = %presale_id, deposit = %cmd.deposit, "presale created");
    Ok(presale_id)
}

/// Completes a pending presale: credits the remaining balance, delivers
/// one unit of the linked product, and synthesizes an immutable sale
/// record mirroring the presale so it shows up in sales reporting.
///
/// The synthesized sale carries `unit_cost` zero - the original cost was
/// never tracked on presales, a known approximation.
///
/// `payment_account` of `None` receives the remainder on the presale's
/// deposit account.
pub fn complete_presale(
    snapshot: &mut Snapshot,
    presale_id: &str,
    payment_account: Option<&str>,
) -> EngineResult<String> {
    debug!(presale_id = %presale_id, "complete_presale");

    // ---- validate ----
    let presale = snapshot
        .find_presale(presale_id)
        .ok_or_else(|| EngineError::not_found("presale", presale_id))?;
    if presale.status != PresaleStatus::Pending {
        return Err(EngineError::invalid_state(
            "presale",
            presale_id,
            presale.status,
        ));
    }

    let remaining = presale.balance;
    let client = presale.client.clone();
    let product_name = presale.product_name.clone();
    let product_id = presale.product_id.clone();
    let presale_total = presale.total;
    let presale_deposit = presale.deposit;
    let deposit_account_name = presale.account_name.clone();

    let pay_account = match payment_account {
        Some(name) => snapshot.ledger.resolve(name)?,
        None => snapshot
            .ledger
            .find(&presale.account_id)
            .ok_or_else(|| EngineError::AccountNotFound(deposit_account_name.clone()))?,
    };
    let (pay_account_id, pay_account_name) = (pay_account.id.clone(), pay_account.name.clone());

    if let Some(id) = &product_id {
        let product = snapshot.inventory.resolve(id)?;
        if product.stock < 1 {
            return Err(EngineError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: 1,
            });
        }
    }

    let sale_id = new_record_id(snapshot)?;
    let now = Utc::now();

    // ---- apply ----
    if remaining.is_positive() {
        snapshot.ledger.credit(
            &pay_account_id,
            remaining,
            format!("Pago restante preventa: {} - {}", client, product_name),
            now,
        )?;
    }
    if let Some(id) = &product_id {
        snapshot.inventory.decrease_stock(
            id,
            1,
            StockEventKind::PresaleDelivery,
            presale_id.to_string(),
            now,
        )?;
        snapshot.inventory.set_status(id, ProductStatus::Available)?;
    }

    snapshot.sales.push(Sale {
        id: sale_id.clone(),
        lines: vec![SaleLine {
            product_id: product_id.unwrap_or_else(|| format!("custom_{}", sale_id)),
            name: product_name,
            quantity: 1,
            unit_price: presale_total,
            // Original cost was never captured on the presale.
            unit_cost: Money::zero(),
        }],
        discount_percent_bps: 0,
        discount_fixed: Money::zero(),
        subtotal: presale_total,
        total: presale_total,
        account_id: pay_account_id,
        account_name: pay_account_name.clone(),
        occurred_at: now,
        created_at: now,
        custom_date: false,
        presale_id: Some(presale_id.to_string()),
        notes: Some(format!(
            "Preventa completada. Abono inicial: {} en {}",
            presale_deposit, deposit_account_name
        )),
    });

    let presale = snapshot
        .presales
        .iter_mut()
        .find(|p| p.id == presale_id)
        .ok_or_else(|| EngineError::not_found("presale", presale_id))?;
    presale.status = PresaleStatus::Delivered;
    presale.completed_at = Some(now);
    presale.final_payment_account = Some(pay_account_name);
    presale.final_payment_amount = Some(remaining);

    info!(presale_id = %presale_id, sale_id = %sale_id, remaining = %remaining, "presale completed");
    Ok(sale_id)
}

// =============================================================================
// Reservations
// =============================================================================

/// Creates a stock hold: decrements the product's stock immediately.
pub fn create_reservation(
    snapshot: &mut Snapshot,
    cmd: ReservationCommand,
) -> EngineResult<String> {
    debug!(client = %cmd.client, product = %cmd.product_id, qty = cmd.quantity, "create_reservation");

    // ---- validate ----
    require_field("client", &cmd.client)?;
    require_quantity(cmd.quantity)?;
    let product = snapshot.inventory.resolve(&cmd.product_id)?;
    if product.stock < cmd.quantity {
        return Err(EngineError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested: cmd.quantity,
        });
    }
    let product_name = product.name.clone();

    let reservation_id = new_record_id(snapshot)?;
    let now = Utc::now();
    let duration_days = if cmd.duration_days > 0 {
        cmd.duration_days
    } else {
        crate::DEFAULT_RESERVATION_DAYS
    };

    // ---- apply ----
    snapshot.inventory.decrease_stock(
        &cmd.product_id,
        cmd.quantity,
        StockEventKind::ReservationHold,
        reservation_id.clone(),
        now,
    )?;

    snapshot.reservations.push(Reservation {
        id: reservation_id.clone(),
        client: cmd.client,
        product_id: cmd.product_id,
        product_name,
        quantity: cmd.quantity,
        duration_days,
        notes: cmd.notes,
        status: ReservationStatus::Held,
        date: now,
    });

    info!(reservation_id = %reservation_id, qty = cmd.quantity, "reservation held");
    Ok(reservation_id)
}

/// Cancels a held reservation, restoring exactly the held quantity.
pub fn cancel_reservation(snapshot: &mut Snapshot, reservation_id: &str) -> EngineResult<()> {
    // ---- validate ----
    let reservation = snapshot
        .find_reservation(reservation_id)
        .ok_or_else(|| EngineError::not_found("reservation", reservation_id))?;
    if reservation.status != ReservationStatus::Held {
        return Err(EngineError::invalid_state(
            "reservation",
            reservation_id,
            reservation.status,
        ));
    }
    let (product_id, quantity) = (reservation.product_id.clone(), reservation.quantity);
    // The product must still exist to take its stock back.
    snapshot.inventory.resolve(&product_id)?;

    let now = Utc::now();

    // ---- apply ----
    snapshot.inventory.increase_stock(
        &product_id,
        quantity,
        StockEventKind::ReservationReturn,
        reservation_id.to_string(),
        now,
    )?;
    let reservation = snapshot
        .reservations
        .iter_mut()
        .find(|r| r.id == reservation_id)
        .ok_or_else(|| EngineError::not_found("reservation", reservation_id))?;
    reservation.status = ReservationStatus::Cancelled;

    info!(reservation_id = %reservation_id, qty = quantity, "reservation cancelled, stock restored");
    Ok(())
}

/// Marks a held reservation delivered. Stock was decremented at
/// creation; no further stock change.
pub fn complete_reservation(snapshot: &mut Snapshot, reservation_id: &str) -> EngineResult<()> {
    let reservation = snapshot
        .reservations
        .iter_mut()
        .find(|r| r.id == reservation_id)
        .ok_or_else(|| EngineError::not_found("reservation", reservation_id))?;
    if reservation.status != ReservationStatus::Held {
        return Err(EngineError::invalid_state(
            "reservation",
            reservation_id,
            reservation.status,
        ));
    }
    reservation.status = ReservationStatus::Completed;

    info!(reservation_id = %reservation_id, "reservation completed");
    Ok(())
}

// =============================================================================
// Occasional Income
// =============================================================================

/// Credits an account outside any sale - a gift, a refund, found money.
/// The movement log is the only record; there is no separate top-level
/// transaction list for these.
pub fn record_occasional_income(snapshot: &mut Snapshot, cmd: IncomeCommand) -> EngineResult<()> {
    // ---- validate ----
    require_field("concept", &cmd.concept)?;
    require_positive_amount("amount", cmd.amount)?;
    let account_id = snapshot.ledger.resolve(&cmd.account)?.id.clone();

    // ---- apply ----
    let concept = if cmd.notes.trim().is_empty() {
        format!("Ingreso ocasional: {}", cmd.concept)
    } else {
        format!("Ingreso ocasional: {} - {}", cmd.concept, cmd.notes)
    };
    snapshot
        .ledger
        .credit(&account_id, cmd.amount, concept, Utc::now())?;

    info!(account = %cmd.account, amount = %cmd.amount, "occasional income committed");
    Ok(())
}

// =============================================================================
// Account & Settings Management
// =============================================================================

/// Adds a cash account, keeping the settings name list and the ledger in
/// step. Fails on a duplicate name.
pub fn add_account(snapshot: &mut Snapshot, name: &str) -> EngineResult<String> {
    let name = name.trim();
    require_field("account", name)?;
    if snapshot.ledger.find_by_name(name).is_some()
        || snapshot.settings.accounts.iter().any(|a| a == name)
    {
        return Err(ValidationError::Duplicate {
            field: "account",
            value: name.to_string(),
        }
        .into());
    }

    let account = crate::ledger::Account::new(name, Money::zero());
    let id = account.id.clone();
    snapshot.settings.accounts.push(name.to_string());
    snapshot.ledger.accounts.push(account);

    info!(account = %name, "account added");
    Ok(id)
}

/// Removes a cash account. Refused while any transfer, purchase,
/// expense, loan, sale, or presale references it, or while it holds a
/// balance - deleting a funded account would silently destroy money.
pub fn remove_account(snapshot: &mut Snapshot, name: &str) -> EngineResult<()> {
    let account = snapshot.ledger.resolve(name)?;
    let id = account.id.clone();

    let references = snapshot
        .transfers
        .iter()
        .filter(|t| t.from_account_id == id || t.to_account_id == id)
        .count()
        + snapshot.purchases.iter().filter(|p| p.account_id == id).count()
        + snapshot.expenses.iter().filter(|e| e.account_id == id).count()
        + snapshot.loans.iter().filter(|l| l.account_id == id).count()
        + snapshot.sales.iter().filter(|s| s.account_id == id).count()
        + snapshot.presales.iter().filter(|p| p.account_id == id).count();
    if references > 0 {
        return Err(EngineError::AccountInUse {
            name: name.to_string(),
            references,
        });
    }
    if !snapshot.ledger.find(&id).map_or(true, |a| a.balance.is_zero()) {
        return Err(ValidationError::Invalid {
            field: "account",
            reason: "balance must be zero before removal".to_string(),
        }
        .into());
    }

    snapshot.settings.accounts.retain(|a| a != name);
    snapshot.ledger.accounts.retain(|a| a.id != id);

    info!(account = %name, "account removed");
    Ok(())
}

/// Removes a settings list entry (language, category, or product type).
/// `in_use` is the number of products still carrying the value.
fn remove_settings_entry(
    list: &mut Vec<String>,
    field: &'static str,
    value: &str,
    in_use: usize,
) -> EngineResult<()> {
    if in_use > 0 {
        return Err(ValidationError::InUse {
            field,
            value: value.to_string(),
            count: in_use,
        }
        .into());
    }
    list.retain(|v| v != value);
    Ok(())
}

pub fn remove_language(snapshot: &mut Snapshot, language: &str) -> EngineResult<()> {
    let count = snapshot
        .inventory
        .products
        .iter()
        .filter(|p| p.language == language)
        .count();
    remove_settings_entry(&mut snapshot.settings.languages, "language", language, count)
}

pub fn remove_category(snapshot: &mut Snapshot, category: &str) -> EngineResult<()> {
    let count = snapshot
        .inventory
        .products
        .iter()
        .filter(|p| p.category == category)
        .count();
    remove_settings_entry(&mut snapshot.settings.categories, "category", category, count)
}

pub fn remove_product_type(snapshot: &mut Snapshot, kind: &str) -> EngineResult<()> {
    let count = snapshot
        .inventory
        .products
        .iter()
        .filter(|p| p.kind == kind)
        .count();
    remove_settings_entry(&mut snapshot.settings.product_types, "product type", kind, count)
}

/// Adds an entry to a settings list, rejecting blanks and duplicates.
fn add_settings_entry(
    list: &mut Vec<String>,
    field: &'static str,
    value: &str,
) -> EngineResult<()> {
    let value = value.trim();
    require_field(field, value)?;
    if list.iter().any(|v| v == value) {
        return Err(ValidationError::Duplicate {
            field,
            value: value.to_string(),
        }
        .into());
    }
    list.push(value.to_string());
    Ok(())
}

/// Language codes are stored uppercased, two letters ("ES", "EN", ...).
pub fn add_language(snapshot: &mut Snapshot, code: &str) -> EngineResult<()> {
    let code = code.trim().to_uppercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::Invalid {
            field: "language",
            reason: "must be a two-letter code".to_string(),
        }
        .into());
    }
    add_settings_entry(&mut snapshot.settings.languages, "language", &code)
}

pub fn add_category(snapshot: &mut Snapshot, category: &str) -> EngineResult<()> {
    add_settings_entry(&mut snapshot.settings.categories, "category", category)
}

pub fn add_product_type(snapshot: &mut Snapshot, kind: &str) -> EngineResult<()> {
    add_settings_entry(&mut snapshot.settings.product_types, "product type", kind)
}

/// Deletes a product. Refused while any sale line references it (the
/// journal must keep resolving) or while a held reservation would have
/// no stock to return to.
pub fn delete_product(snapshot: &mut Snapshot, product_id: &str) -> EngineResult<()> {
    snapshot.inventory.resolve(product_id)?;
    let sale_refs = snapshot.sales_referencing(product_id);
    if sale_refs > 0 {
        return Err(ValidationError::InUse {
            field: "product",
            value: product_id.to_string(),
            count: sale_refs,
        }
        .into());
    }
    let held = snapshot
        .reservations
        .iter()
        .filter(|r| r.status == ReservationStatus::Held && r.product_id == product_id)
        .count();
    if held > 0 {
        return Err(ValidationError::InUse {
            field: "product",
            value: product_id.to_string(),
            count: held,
        }
        .into());
    }
    snapshot.inventory.remove(product_id)?;
    info!(product_id = %product_id, "product deleted");
    Ok(())
}

// =============================================================================
// Full Wipe
// =============================================================================

/// Replaces everything with a fresh default state holding the given
/// opening cash. Only reachable through the phrase-gated [`WipeToken`].
pub fn reset(initial_cash: Money, _token: WipeToken) -> Snapshot {
    info!(initial_cash = %initial_cash, "full wipe - new default state");
    Snapshot::default_state(initial_cash)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::test_product;

    const CASH: &str = "Efectivo";

    fn snap_with_product(stock: i64) -> Snapshot {
        let mut snap = Snapshot::default_state(Money::from_pesos(1_000_000));
        snap.inventory.products.push(test_product("p1", stock));
        snap
    }

    fn balance(snap: &Snapshot, name: &str) -> Money {
        snap.ledger.resolve(name).unwrap().balance
    }

    fn stock(snap: &Snapshot, id: &str) -> i64 {
        snap.inventory.resolve(id).unwrap().stock
    }

    fn cart_with(snap: &Snapshot, product_id: &str, qty: i64) -> Cart {
        let product = snap.inventory.resolve(product_id).unwrap().clone();
        let mut cart = Cart::default();
        cart.add(&product, qty).unwrap();
        cart
    }

    fn sale_cmd(cart: Cart, discount: Discount) -> SaleCommand {
        SaleCommand {
            cart,
            discount,
            account: CASH.to_string(),
            occurred_at: None,
        }
    }

    // ---- sales ----

    #[test]
    fn test_sale_credits_account_and_decrements_stock() {
        let mut snap = snap_with_product(5);
        let cart = cart_with(&snap, "p1", 2);

        let sale_id = record_sale(&mut snap, sale_cmd(cart, Discount::none())).unwrap();

        // 2 × 95_000 at the test product's price
        assert_eq!(balance(&snap, CASH), Money::from_pesos(1_190_000));
        assert_eq!(stock(&snap, "p1"), 3);
        assert_eq!(snap.sales.len(), 1);
        let sale = &snap.sales[0];
        assert_eq!(sale.id, sale_id);
        assert_eq!(sale.total, Money::from_pesos(190_000));
        assert!(!sale.custom_date);
        // stock delta logged against the sale id
        let product = snap.inventory.resolve("p1").unwrap();
        assert_eq!(product.history.len(), 1);
        assert_eq!(product.history[0].reference, sale_id);
        assert_eq!(product.history[0].kind, StockEventKind::Sale);
    }

    #[test]
    fn test_sale_applies_discount() {
        let mut snap = snap_with_product(5);
        let mut cart = Cart::default();
        let product = {
            let mut p = test_product("p2", 10);
            p.price = Money::from_pesos(50_000);
            snap.inventory.products.push(p.clone());
            p
        };
        cart.add(&product, 2).unwrap();

        // subtotal 100_000, 10% + 5_000 fixed → 85_000
        let discount = Discount::new(1000, Money::from_pesos(5_000));
        record_sale(&mut snap, sale_cmd(cart, discount)).unwrap();

        let sale = &snap.sales[0];
        assert_eq!(sale.subtotal, Money::from_pesos(100_000));
        assert_eq!(sale.total, Money::from_pesos(85_000));
        assert_eq!(balance(&snap, CASH), Money::from_pesos(1_085_000));
    }

    #[test]
    fn test_sale_empty_cart_rejected() {
        let mut snap = snap_with_product(5);
        let err = record_sale(&mut snap, sale_cmd(Cart::default(), Discount::none()));
        assert!(matches!(err, Err(EngineError::EmptyCart)));
    }

    #[test]
    fn test_sale_unknown_account_rejected() {
        let mut snap = snap_with_product(5);
        let cart = cart_with(&snap, "p1", 1);
        let cmd = SaleCommand {
            account: "Davivienda".to_string(),
            ..sale_cmd(cart, Discount::none())
        };
        assert!(matches!(
            record_sale(&mut snap, cmd),
            Err(EngineError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_sale_stale_cart_fails_without_mutation() {
        let mut snap = snap_with_product(5);
        let cart = cart_with(&snap, "p1", 4);
        // Stock drops after the cart was filled.
        snap.inventory
            .decrease_stock("p1", 3, StockEventKind::Sale, "other", Utc::now())
            .unwrap();

        let err = record_sale(&mut snap, sale_cmd(cart, Discount::none()));
        assert!(matches!(err, Err(EngineError::InsufficientStock { .. })));
        assert_eq!(stock(&snap, "p1"), 2);
        assert_eq!(balance(&snap, CASH), Money::from_pesos(1_000_000));
        assert!(snap.sales.is_empty());
    }

    #[test]
    fn test_sale_multi_line_atomicity() {
        let mut snap = snap_with_product(5);
        snap.inventory.products.push(test_product("p2", 1));

        let p1 = snap.inventory.resolve("p1").unwrap().clone();
        let p2 = snap.inventory.resolve("p2").unwrap().clone();
        let mut cart = Cart::default();
        cart.add(&p1, 2).unwrap();
        cart.add(&p2, 1).unwrap();
        // Second line goes stale.
        snap.inventory
            .decrease_stock("p2", 1, StockEventKind::Sale, "other", Utc::now())
            .unwrap();

        let err = record_sale(&mut snap, sale_cmd(cart, Discount::none()));
        assert!(matches!(err, Err(EngineError::InsufficientStock { .. })));
        // First line untouched even though it validated fine.
        assert_eq!(stock(&snap, "p1"), 5);
        assert!(snap.sales.is_empty());
        assert_eq!(balance(&snap, CASH), Money::from_pesos(1_000_000));
    }

    // ---- purchases ----

    #[test]
    fn test_purchase_restock_with_tax() {
        let mut snap = snap_with_product(5);
        let id = record_purchase(
            &mut snap,
            PurchaseCommand {
                target: PurchaseTarget::Restock {
                    product_id: "p1".to_string(),
                },
                quantity: 3,
                unit_cost: Money::from_pesos(50_000),
                apply_tax: true,
                account: CASH.to_string(),
            },
        )
        .unwrap();

        // unit cost 50_000 * 1.19 = 59_500, total 178_500
        assert_eq!(balance(&snap, CASH), Money::from_pesos(821_500));
        assert_eq!(stock(&snap, "p1"), 8);
        let product = snap.inventory.resolve("p1").unwrap();
        assert_eq!(product.cost, Money::from_pesos(59_500));
        assert!(product.apply_tax);
        assert_eq!(product.history[0].reference, id);
        assert_eq!(product.history[0].kind, StockEventKind::Restock);
        assert_eq!(snap.purchases.len(), 1);
        assert_eq!(snap.purchases[0].kind, PurchaseKind::Restock);
    }

    #[test]
    fn test_purchase_insufficient_funds_leaves_state() {
        let mut snap = snap_with_product(5);
        let err = record_purchase(
            &mut snap,
            PurchaseCommand {
                target: PurchaseTarget::Restock {
                    product_id: "p1".to_string(),
                },
                quantity: 100,
                unit_cost: Money::from_pesos(50_000),
                apply_tax: false,
                account: CASH.to_string(),
            },
        );
        assert!(matches!(err, Err(EngineError::InsufficientFunds { .. })));
        assert_eq!(stock(&snap, "p1"), 5);
        assert_eq!(balance(&snap, CASH), Money::from_pesos(1_000_000));
        assert!(snap.purchases.is_empty());
    }

    #[test]
    fn test_purchase_new_product_default_markup() {
        let mut snap = Snapshot::default_state(Money::from_pesos(1_000_000));
        record_purchase(
            &mut snap,
            PurchaseCommand {
                target: PurchaseTarget::NewProduct {
                    name: "Charizard EX".to_string(),
                    language: "EN".to_string(),
                    category: "Pokémon".to_string(),
                    kind: "Carta".to_string(),
                    supplier: "Distribuidor".to_string(),
                    manual_price: None,
                },
                quantity: 2,
                unit_cost: Money::from_pesos(50_000),
                apply_tax: true,
                account: CASH.to_string(),
            },
        )
        .unwrap();

        assert_eq!(snap.inventory.products.len(), 1);
        let product = &snap.inventory.products[0];
        assert_eq!(product.stock, 2);
        assert_eq!(product.cost, Money::from_pesos(59_500));
        // 59_500 * 1.30 = 77_350
        assert_eq!(product.price, Money::from_pesos(77_350));
        assert!(product.sku.starts_with("PRD-"));
        assert_eq!(product.history.len(), 1);
        assert_eq!(balance(&snap, CASH), Money::from_pesos(881_000));
    }

    #[test]
    fn test_purchase_new_product_manual_price() {
        let mut snap = Snapshot::default_state(Money::from_pesos(1_000_000));
        record_purchase(
            &mut snap,
            PurchaseCommand {
                target: PurchaseTarget::NewProduct {
                    name: "Funko Eevee".to_string(),
                    language: "ES".to_string(),
                    category: "Funko Pop".to_string(),
                    kind: "Funko".to_string(),
                    supplier: String::new(),
                    manual_price: Some(Money::from_pesos(120_000)),
                },
                quantity: 1,
                unit_cost: Money::from_pesos(80_000),
                apply_tax: false,
                account: CASH.to_string(),
            },
        )
        .unwrap();
        assert_eq!(snap.inventory.products[0].price, Money::from_pesos(120_000));
    }

    // ---- expense / transfer / income ----

    #[test]
    fn test_expense_debits_account() {
        let mut snap = Snapshot::default_state(Money::from_pesos(100_000));
        record_expense(
            &mut snap,
            ExpenseCommand {
                concept: "Envíos".to_string(),
                amount: Money::from_pesos(25_000),
                category: "Logística".to_string(),
                account: CASH.to_string(),
                notes: String::new(),
            },
        )
        .unwrap();
        assert_eq!(balance(&snap, CASH), Money::from_pesos(75_000));
        assert_eq!(snap.expenses.len(), 1);
    }

    #[test]
    fn test_transfer_conserves_total_balance() {
        let mut snap = Snapshot::default_state(Money::from_pesos(500_000));
        let before = snap.ledger.total_balance();
        record_transfer(
            &mut snap,
            TransferCommand {
                from: CASH.to_string(),
                to: "Nequi".to_string(),
                amount: Money::from_pesos(200_000),
                notes: String::new(),
            },
        )
        .unwrap();

        assert_eq!(balance(&snap, CASH), Money::from_pesos(300_000));
        assert_eq!(balance(&snap, "Nequi"), Money::from_pesos(200_000));
        assert_eq!(snap.ledger.total_balance(), before);
        assert_eq!(snap.transfers.len(), 1);
        // Each side carries a movement.
        assert_eq!(snap.ledger.resolve("Nequi").unwrap().movements.len(), 1);
    }

    #[test]
    fn test_transfer_same_account_rejected() {
        let mut snap = Snapshot::default_state(Money::from_pesos(500_000));
        let err = record_transfer(
            &mut snap,
            TransferCommand {
                from: CASH.to_string(),
                to: CASH.to_string(),
                amount: Money::from_pesos(1_000),
                notes: String::new(),
            },
        );
        assert!(matches!(err, Err(EngineError::SameAccount(_))));
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let mut snap = Snapshot::default_state(Money::from_pesos(10_000));
        let err = record_transfer(
            &mut snap,
            TransferCommand {
                from: CASH.to_string(),
                to: "Nequi".to_string(),
                amount: Money::from_pesos(50_000),
                notes: String::new(),
            },
        );
        assert!(matches!(err, Err(EngineError::InsufficientFunds { .. })));
        assert_eq!(balance(&snap, CASH), Money::from_pesos(10_000));
    }

    #[test]
    fn test_occasional_income_is_movement_only() {
        let mut snap = Snapshot::default_state(Money::zero());
        record_occasional_income(
            &mut snap,
            IncomeCommand {
                amount: Money::from_pesos(30_000),
                concept: "Regalo".to_string(),
                account: CASH.to_string(),
                notes: String::new(),
            },
        )
        .unwrap();
        assert_eq!(balance(&snap, CASH), Money::from_pesos(30_000));
        assert!(snap.sales.is_empty());
        assert!(snap.expenses.is_empty());
    }

    // ---- loans ----

    fn issue(snap: &mut Snapshot, direction: LoanDirection, amount: i64) -> String {
        issue_loan(
            snap,
            LoanCommand {
                direction,
                person: "Andrés".to_string(),
                amount: Money::from_pesos(amount),
                account: CASH.to_string(),
                notes: String::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_loan_lifecycle_restores_balance() {
        let mut snap = Snapshot::default_state(Money::from_pesos(500_000));
        let loan_id = issue(&mut snap, LoanDirection::LentCash, 100_000);
        assert_eq!(balance(&snap, CASH), Money::from_pesos(400_000));

        pay_loan_partial(&mut snap, &loan_id, Money::from_pesos(50_000), CASH).unwrap();
        assert_eq!(balance(&snap, CASH), Money::from_pesos(450_000));
        let loan = snap.find_loan(&loan_id).unwrap();
        assert_eq!(loan.remaining(), Money::from_pesos(50_000));
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.payments.len(), 1);

        pay_loan_full(&mut snap, &loan_id, None).unwrap();
        assert_eq!(balance(&snap, CASH), Money::from_pesos(500_000));
        let loan = snap.find_loan(&loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Paid);
        assert!(loan.settled_at.is_some());
    }

    #[test]
    fn test_borrowed_loan_payment_debits() {
        let mut snap = Snapshot::default_state(Money::zero());
        let loan_id = issue(&mut snap, LoanDirection::Borrowed, 100_000);
        assert_eq!(balance(&snap, CASH), Money::from_pesos(100_000));

        pay_loan_partial(&mut snap, &loan_id, Money::from_pesos(40_000), CASH).unwrap();
        assert_eq!(balance(&snap, CASH), Money::from_pesos(60_000));

        // Can no longer cover the remainder after spending the cash.
        record_expense(
            &mut snap,
            ExpenseCommand {
                concept: "Compras".to_string(),
                amount: Money::from_pesos(50_000),
                category: "Otros".to_string(),
                account: CASH.to_string(),
                notes: String::new(),
            },
        )
        .unwrap();
        let err = pay_loan_full(&mut snap, &loan_id, None);
        assert!(matches!(err, Err(EngineError::InsufficientFunds { .. })));
        let loan = snap.find_loan(&loan_id).unwrap();
        assert_eq!(loan.paid_amount, Money::from_pesos(40_000));
    }

    #[test]
    fn test_loan_overpayment_rejected() {
        let mut snap = Snapshot::default_state(Money::from_pesos(500_000));
        let loan_id = issue(&mut snap, LoanDirection::LentApp, 100_000);
        let err = pay_loan_partial(&mut snap, &loan_id, Money::from_pesos(150_000), CASH);
        assert!(matches!(err, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_loan_issue_insufficient_funds() {
        let mut snap = Snapshot::default_state(Money::from_pesos(50_000));
        let err = issue_loan(
            &mut snap,
            LoanCommand {
                direction: LoanDirection::LentCash,
                person: "Andrés".to_string(),
                amount: Money::from_pesos(100_000),
                account: CASH.to_string(),
                notes: String::new(),
            },
        );
        assert!(matches!(err, Err(EngineError::InsufficientFunds { .. })));
        assert!(snap.loans.is_empty());
    }

    #[test]
    fn test_edit_loan_applies_difference() {
        let mut snap = Snapshot::default_state(Money::from_pesos(500_000));
        let loan_id = issue(&mut snap, LoanDirection::LentCash, 100_000);
        assert_eq!(balance(&snap, CASH), Money::from_pesos(400_000));

        edit_loan(
            &mut snap,
            &loan_id,
            EditLoanCommand {
                direction: LoanDirection::LentCash,
                person: "Andrés".to_string(),
                amount: Money::from_pesos(150_000),
                notes: String::new(),
            },
        )
        .unwrap();

        // Net effect is the 50_000 difference, via two movements.
        assert_eq!(balance(&snap, CASH), Money::from_pesos(350_000));
        let loan = snap.find_loan(&loan_id).unwrap();
        assert_eq!(loan.amount, Money::from_pesos(150_000));
        let account = snap.ledger.resolve(CASH).unwrap();
        assert_eq!(account.movements.len(), 3);
    }

    #[test]
    fn test_edit_loan_below_paid_rejected() {
        let mut snap = Snapshot::default_state(Money::from_pesos(500_000));
        let loan_id = issue(&mut snap, LoanDirection::LentCash, 100_000);
        pay_loan_partial(&mut snap, &loan_id, Money::from_pesos(60_000), CASH).unwrap();

        let err = edit_loan(
            &mut snap,
            &loan_id,
            EditLoanCommand {
                direction: LoanDirection::LentCash,
                person: "Andrés".to_string(),
                amount: Money::from_pesos(50_000),
                notes: String::new(),
            },
        );
        assert!(matches!(err, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_cancel_loan_write_off_keeps_balance() {
        let mut snap = Snapshot::default_state(Money::from_pesos(500_000));
        let loan_id = issue(&mut snap, LoanDirection::LentCash, 100_000);

        cancel_loan(
            &mut snap,
            &loan_id,
            LoanCancelPolicy::WriteOff,
            Confirmation::acknowledge(),
        )
        .unwrap();

        assert_eq!(balance(&snap, CASH), Money::from_pesos(400_000));
        let loan = snap.find_loan(&loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Cancelled);

        // No further payments against a cancelled loan.
        let err = pay_loan_partial(&mut snap, &loan_id, Money::from_pesos(1_000), CASH);
        assert!(matches!(err, Err(EngineError::InvalidState { .. })));
    }

    #[test]
    fn test_cancel_loan_reverse_restores_remainder() {
        let mut snap = Snapshot::default_state(Money::from_pesos(500_000));
        let loan_id = issue(&mut snap, LoanDirection::LentCash, 100_000);
        pay_loan_partial(&mut snap, &loan_id, Money::from_pesos(30_000), CASH).unwrap();

        cancel_loan(
            &mut snap,
            &loan_id,
            LoanCancelPolicy::Reverse,
            Confirmation::acknowledge(),
        )
        .unwrap();

        // -100_000 issue, +30_000 payment, +70_000 reversal
        assert_eq!(balance(&snap, CASH), Money::from_pesos(500_000));
    }

    // ---- presales ----

    #[test]
    fn test_presale_deposit_then_completion() {
        let mut snap = snap_with_product(5);
        let presale_id = create_presale(
            &mut snap,
            PresaleCommand {
                client: "Laura".to_string(),
                product: PresaleProduct::Inventory {
                    product_id: "p1".to_string(),
                },
                total: Money::from_pesos(100_000),
                deposit: Money::from_pesos(30_000),
                delivery_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
                account: CASH.to_string(),
            },
        )
        .unwrap();

        assert_eq!(balance(&snap, CASH), Money::from_pesos(1_030_000));
        assert_eq!(
            snap.inventory.resolve("p1").unwrap().status,
            ProductStatus::InTransit
        );
        // Stock untouched until delivery.
        assert_eq!(stock(&snap, "p1"), 5);

        let sale_id = complete_presale(&mut snap, &presale_id, Some("Nequi")).unwrap();

        assert_eq!(balance(&snap, "Nequi"), Money::from_pesos(70_000));
        assert_eq!(stock(&snap, "p1"), 4);
        assert_eq!(
            snap.inventory.resolve("p1").unwrap().status,
            ProductStatus::Available
        );

        let presale = snap.find_presale(&presale_id).unwrap();
        assert_eq!(presale.status, PresaleStatus::Delivered);
        assert_eq!(presale.final_payment_amount, Some(Money::from_pesos(70_000)));

        let sale = snap.sales.iter().find(|s| s.id == sale_id).unwrap();
        assert_eq!(sale.total, Money::from_pesos(100_000));
        assert_eq!(sale.lines[0].unit_cost, Money::zero());
        assert_eq!(sale.presale_id.as_deref(), Some(presale_id.as_str()));
    }

    #[test]
    fn test_presale_deposit_above_total_rejected() {
        let mut snap = snap_with_product(5);
        let err = create_presale(
            &mut snap,
            PresaleCommand {
                client: "Laura".to_string(),
                product: PresaleProduct::Custom {
                    name: "Booster Box".to_string(),
                },
                total: Money::from_pesos(50_000),
                deposit: Money::from_pesos(60_000),
                delivery_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
                account: CASH.to_string(),
            },
        );
        assert!(matches!(err, Err(EngineError::Validation(_))));
        assert_eq!(balance(&snap, CASH), Money::from_pesos(1_000_000));
    }

    #[test]
    fn test_presale_complete_twice_rejected() {
        let mut snap = snap_with_product(5);
        let presale_id = create_presale(
            &mut snap,
            PresaleCommand {
                client: "Laura".to_string(),
                product: PresaleProduct::Custom {
                    name: "Booster Box".to_string(),
                },
                total: Money::from_pesos(50_000),
                deposit: Money::from_pesos(50_000),
                delivery_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
                account: CASH.to_string(),
            },
        )
        .unwrap();

        complete_presale(&mut snap, &presale_id, None).unwrap();
        let err = complete_presale(&mut snap, &presale_id, None);
        assert!(matches!(err, Err(EngineError::InvalidState { .. })));
    }

    #[test]
    fn test_presale_fully_paid_upfront_no_final_credit() {
        let mut snap = Snapshot::default_state(Money::zero());
        let presale_id = create_presale(
            &mut snap,
            PresaleCommand {
                client: "Laura".to_string(),
                product: PresaleProduct::Custom {
                    name: "Booster Box".to_string(),
                },
                total: Money::from_pesos(80_000),
                deposit: Money::from_pesos(80_000),
                delivery_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
                account: CASH.to_string(),
            },
        )
        .unwrap();
        assert_eq!(balance(&snap, CASH), Money::from_pesos(80_000));

        complete_presale(&mut snap, &presale_id, None).unwrap();
        // No second credit.
        assert_eq!(balance(&snap, CASH), Money::from_pesos(80_000));
        assert_eq!(snap.sales.len(), 1);
    }

    // ---- reservations ----

    #[test]
    fn test_reservation_round_trip_restores_stock() {
        let mut snap = snap_with_product(10);
        let reservation_id = create_reservation(
            &mut snap,
            ReservationCommand {
                client: "Camilo".to_string(),
                product_id: "p1".to_string(),
                quantity: 3,
                duration_days: 0,
                notes: String::new(),
            },
        )
        .unwrap();

        assert_eq!(stock(&snap, "p1"), 7);
        let reservation = snap.find_reservation(&reservation_id).unwrap();
        assert_eq!(reservation.duration_days, crate::DEFAULT_RESERVATION_DAYS);

        cancel_reservation(&mut snap, &reservation_id).unwrap();
        assert_eq!(stock(&snap, "p1"), 10);

        // Held quantity is logged both ways.
        let history = &snap.inventory.resolve("p1").unwrap().history;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, StockEventKind::ReservationHold);
        assert_eq!(history[1].kind, StockEventKind::ReservationReturn);
    }

    #[test]
    fn test_reservation_complete_keeps_stock_out() {
        let mut snap = snap_with_product(10);
        let reservation_id = create_reservation(
            &mut snap,
            ReservationCommand {
                client: "Camilo".to_string(),
                product_id: "p1".to_string(),
                quantity: 3,
                duration_days: 14,
                notes: String::new(),
            },
        )
        .unwrap();

        complete_reservation(&mut snap, &reservation_id).unwrap();
        assert_eq!(stock(&snap, "p1"), 7);

        // Cancelling after delivery must not resurrect stock.
        let err = cancel_reservation(&mut snap, &reservation_id);
        assert!(matches!(err, Err(EngineError::InvalidState { .. })));
        assert_eq!(stock(&snap, "p1"), 7);
    }

    #[test]
    fn test_reservation_over_stock_rejected() {
        let mut snap = snap_with_product(2);
        let err = create_reservation(
            &mut snap,
            ReservationCommand {
                client: "Camilo".to_string(),
                product_id: "p1".to_string(),
                quantity: 3,
                duration_days: 7,
                notes: String::new(),
            },
        );
        assert!(matches!(err, Err(EngineError::InsufficientStock { .. })));
        assert_eq!(stock(&snap, "p1"), 2);
    }

    // ---- accounts & settings ----

    #[test]
    fn test_add_and_remove_account() {
        let mut snap = Snapshot::default_state(Money::zero());
        add_account(&mut snap, "Daviplata").unwrap();
        assert!(snap.ledger.find_by_name("Daviplata").is_some());
        assert!(snap.settings.accounts.iter().any(|a| a == "Daviplata"));

        assert!(matches!(
            add_account(&mut snap, "Daviplata"),
            Err(EngineError::Validation(ValidationError::Duplicate { .. }))
        ));

        remove_account(&mut snap, "Daviplata").unwrap();
        assert!(snap.ledger.find_by_name("Daviplata").is_none());
        assert!(!snap.settings.accounts.iter().any(|a| a == "Daviplata"));
    }

    #[test]
    fn test_remove_referenced_account_rejected() {
        let mut snap = Snapshot::default_state(Money::from_pesos(100_000));
        record_expense(
            &mut snap,
            ExpenseCommand {
                concept: "Envíos".to_string(),
                amount: Money::from_pesos(10_000),
                category: "Logística".to_string(),
                account: CASH.to_string(),
                notes: String::new(),
            },
        )
        .unwrap();

        let err = remove_account(&mut snap, CASH);
        assert!(matches!(err, Err(EngineError::AccountInUse { .. })));
    }

    #[test]
    fn test_remove_account_with_presale_rejected() {
        let mut snap = Snapshot::default_state(Money::zero());
        // Zero deposit leaves no movement on Nequi; the presale record
        // itself must still pin the account.
        create_presale(
            &mut snap,
            PresaleCommand {
                client: "Laura".to_string(),
                product: PresaleProduct::Custom {
                    name: "Booster Box Paldea".to_string(),
                },
                total: Money::from_pesos(100_000),
                deposit: Money::zero(),
                delivery_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
                account: "Nequi".to_string(),
            },
        )
        .unwrap();

        let err = remove_account(&mut snap, "Nequi");
        assert!(matches!(
            err,
            Err(EngineError::AccountInUse { references: 1, .. })
        ));
        assert!(snap.ledger.find_by_name("Nequi").is_some());
    }

    #[test]
    fn test_remove_funded_account_rejected() {
        let mut snap = Snapshot::default_state(Money::from_pesos(100_000));
        let err = remove_account(&mut snap, CASH);
        assert!(matches!(err, Err(EngineError::Validation(_))));
    }

    #[test]
    fn test_settings_entry_in_use_rejected() {
        let mut snap = snap_with_product(1);
        // test_product carries language ES / category Pokémon
        let err = remove_language(&mut snap, "ES");
        assert!(matches!(
            err,
            Err(EngineError::Validation(ValidationError::InUse { .. }))
        ));
        remove_language(&mut snap, "JA").unwrap();
        assert!(!snap.settings.languages.iter().any(|l| l == "JA"));
    }

    #[test]
    fn test_add_language_normalizes_and_validates() {
        let mut snap = Snapshot::default_state(Money::zero());
        add_language(&mut snap, "fr").unwrap();
        assert!(snap.settings.languages.iter().any(|l| l == "FR"));
        assert!(add_language(&mut snap, "FRA").is_err());
        assert!(add_language(&mut snap, "FR").is_err());
    }

    #[test]
    fn test_delete_product_guards() {
        let mut snap = snap_with_product(5);
        let cart = cart_with(&snap, "p1", 1);
        record_sale(&mut snap, sale_cmd(cart, Discount::none())).unwrap();

        let err = delete_product(&mut snap, "p1");
        assert!(matches!(
            err,
            Err(EngineError::Validation(ValidationError::InUse { .. }))
        ));

        snap.inventory.products.push(test_product("p2", 3));
        delete_product(&mut snap, "p2").unwrap();
        assert!(snap.inventory.find("p2").is_none());
    }

    // ---- wipe & invariants ----

    #[test]
    fn test_wipe_token_requires_exact_phrase() {
        assert!(WipeToken::from_phrase("borrar todo").is_none());
        assert!(WipeToken::from_phrase("").is_none());
        let token = WipeToken::from_phrase(WipeToken::PHRASE).unwrap();
        let snap = reset(Money::from_pesos(200_000), token);
        assert_eq!(snap.ledger.resolve(CASH).unwrap().balance, Money::from_pesos(200_000));
        assert!(snap.sales.is_empty());
        assert!(snap.inventory.products.is_empty());
    }

    #[test]
    fn test_mixed_operations_keep_snapshot_consistent() {
        let mut snap = snap_with_product(10);
        let cart = cart_with(&snap, "p1", 2);
        record_sale(&mut snap, sale_cmd(cart, Discount::none())).unwrap();
        record_transfer(
            &mut snap,
            TransferCommand {
                from: CASH.to_string(),
                to: "NU".to_string(),
                amount: Money::from_pesos(100_000),
                notes: String::new(),
            },
        )
        .unwrap();
        let loan_id = issue(&mut snap, LoanDirection::LentCash, 50_000);
        pay_loan_partial(&mut snap, &loan_id, Money::from_pesos(20_000), CASH).unwrap();

        assert!(snap.verify().is_empty());
        // Journal covers every record kind touched above.
        let journal = snap.journal();
        assert_eq!(journal.len(), 3);
    }
}
