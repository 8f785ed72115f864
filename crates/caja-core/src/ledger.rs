//! # Account Ledger
//!
//! Owns named cash accounts, their balances, and their ordered movement
//! logs. Leaf dependency of every money-moving engine operation.
//!
//! ## Invariant
//! ```text
//! balance == opening_balance + Σ(in movements) - Σ(out movements)
//! ```
//! The ledger enforces this structurally: a balance write and its log
//! append happen in the same call, together or not at all. The engine is
//! responsible for checking sufficiency BEFORE calling `debit` as part of
//! its validate-then-apply protocol; `debit` re-checks anyway and refuses
//! to overdraw.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::money::Money;

// =============================================================================
// Movement
// =============================================================================

/// Direction of a single ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    /// Money entering the account (credit).
    In,
    /// Money leaving the account (debit).
    Out,
}

/// A single signed entry in an account's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub direction: MovementDirection,
    /// Always non-negative; the direction carries the sign.
    pub amount: Money,
    pub concept: String,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Account
// =============================================================================

/// A named cash account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier - the join key for every cross-entity reference.
    pub id: String,
    /// Display name. Renaming an account must not orphan history, so the
    /// name is never used as a join key.
    pub name: String,
    pub balance: Money,
    /// Ordered movement log since account creation.
    pub movements: Vec<Movement>,
}

impl Account {
    pub fn new(name: impl Into<String>, opening_balance: Money) -> Self {
        Account {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            balance: opening_balance,
            movements: Vec::new(),
        }
    }

    /// Recomputes the balance from the movement log. Used by invariant
    /// verification; the opening balance is whatever the log does not
    /// account for.
    pub fn movement_sum(&self) -> Money {
        self.movements
            .iter()
            .map(|m| match m.direction {
                MovementDirection::In => m.amount,
                MovementDirection::Out => Money::zero() - m.amount,
            })
            .sum()
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// The set of all accounts. Serializes transparently as an array, the
/// shape the snapshot format expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    pub accounts: Vec<Account>,
}

impl Ledger {
    /// Looks an account up by its stable id.
    pub fn find(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    /// Looks an account up by display name. Absence is the caller's
    /// `AccountNotFound` condition - command payloads arrive with names
    /// from the settings list, which the engine resolves to ids here.
    pub fn find_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// Resolves a name to an account or fails with `AccountNotFound`.
    pub fn resolve(&self, name: &str) -> EngineResult<&Account> {
        self.find_by_name(name)
            .ok_or_else(|| EngineError::AccountNotFound(name.to_string()))
    }

    fn find_mut(&mut self, account_id: &str) -> EngineResult<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| EngineError::AccountNotFound(account_id.to_string()))
    }

    /// Increases the balance and appends an `in` movement.
    ///
    /// Credits never fail on amount grounds; the engine validates
    /// `amount > 0` before calling.
    pub fn credit(
        &mut self,
        account_id: &str,
        amount: Money,
        concept: impl Into<String>,
        when: DateTime<Utc>,
    ) -> EngineResult<()> {
        let account = self.find_mut(account_id)?;
        account.balance += amount;
        account.movements.push(Movement {
            direction: MovementDirection::In,
            amount,
            concept: concept.into(),
            date: when,
        });
        Ok(())
    }

    /// Decreases the balance and appends an `out` movement.
    ///
    /// Fails with `InsufficientFunds` when the balance cannot cover the
    /// amount, leaving the account untouched.
    pub fn debit(
        &mut self,
        account_id: &str,
        amount: Money,
        concept: impl Into<String>,
        when: DateTime<Utc>,
    ) -> EngineResult<()> {
        let account = self.find_mut(account_id)?;
        if account.balance < amount {
            return Err(EngineError::InsufficientFunds {
                account: account.name.clone(),
                needed: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        account.movements.push(Movement {
            direction: MovementDirection::Out,
            amount,
            concept: concept.into(),
            date: when,
        });
        Ok(())
    }

    /// Sum of all account balances.
    pub fn total_balance(&self) -> Money {
        self.accounts.iter().map(|a| a.balance).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(name: &str, balance: i64) -> (Ledger, String) {
        let account = Account::new(name, Money::from_pesos(balance));
        let id = account.id.clone();
        (
            Ledger {
                accounts: vec![account],
            },
            id,
        )
    }

    #[test]
    fn test_credit_appends_in_movement() {
        let (mut ledger, id) = ledger_with("Efectivo", 0);
        ledger
            .credit(&id, Money::from_pesos(95_000), "Venta #1", Utc::now())
            .unwrap();

        let account = ledger.find(&id).unwrap();
        assert_eq!(account.balance.pesos(), 95_000);
        assert_eq!(account.movements.len(), 1);
        assert_eq!(account.movements[0].direction, MovementDirection::In);
        assert_eq!(account.movements[0].concept, "Venta #1");
    }

    #[test]
    fn test_debit_checks_balance() {
        let (mut ledger, id) = ledger_with("Nequi", 10_000);

        let err = ledger
            .debit(&id, Money::from_pesos(50_000), "Compra", Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));

        // Nothing applied on failure.
        let account = ledger.find(&id).unwrap();
        assert_eq!(account.balance.pesos(), 10_000);
        assert!(account.movements.is_empty());

        ledger
            .debit(&id, Money::from_pesos(10_000), "Compra", Utc::now())
            .unwrap();
        assert_eq!(ledger.find(&id).unwrap().balance.pesos(), 0);
    }

    #[test]
    fn test_balance_equals_movement_sum() {
        let (mut ledger, id) = ledger_with("Efectivo", 0);
        let now = Utc::now();
        ledger.credit(&id, Money::from_pesos(100_000), "a", now).unwrap();
        ledger.debit(&id, Money::from_pesos(30_000), "b", now).unwrap();
        ledger.credit(&id, Money::from_pesos(5_000), "c", now).unwrap();

        let account = ledger.find(&id).unwrap();
        assert_eq!(account.balance, account.movement_sum());
        assert_eq!(account.balance.pesos(), 75_000);
    }

    #[test]
    fn test_resolve_by_name() {
        let (ledger, id) = ledger_with("Bancolombia", 0);
        assert_eq!(ledger.resolve("Bancolombia").unwrap().id, id);
        assert!(matches!(
            ledger.resolve("Davivienda").unwrap_err(),
            EngineError::AccountNotFound(_)
        ));
    }
}
