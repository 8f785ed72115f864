//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point:                                                 │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  A ledger that accumulates float error drifts away from the sum     │
//! │  of its own movement log - the one invariant this system lives by.  │
//! │                                                                     │
//! │  OUR SOLUTION: integer pesos (COP has no decimal subunit in         │
//! │  practice). All percentage math happens in basis points with        │
//! │  explicit rounding.                                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::{Money, TaxRate};
//!
//! let cost = Money::from_pesos(50_000);
//! let with_iva = cost.with_tax(TaxRate::from_bps(1900)); // 19% IVA
//! assert_eq!(with_iva.pesos(), 59_500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole pesos (COP).
///
/// ## Design Decisions
/// - **i64 (signed)**: balances can legitimately go negative only through
///   deserialization of historic data; engine rules keep them >= debits
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Transparent serde**: serializes as a bare number, matching the
///   snapshot format the original system persisted
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole pesos.
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos)
    }

    /// Returns the value in pesos.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the larger of `self` and `other`.
    #[inline]
    pub const fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    /// Calculates the tax amount for this value at the given rate.
    ///
    /// Integer math with half-up rounding: `(amount * bps + 5000) / 10000`.
    /// i128 intermediate prevents overflow on large amounts.
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money(tax as i64)
    }

    /// Returns this value plus tax at the given rate.
    ///
    /// Used for tax-inclusive unit costs on purchases:
    /// `50_000 * (1 + 19%) = 59_500`.
    pub fn with_tax(&self, rate: TaxRate) -> Money {
        *self + self.calculate_tax(rate)
    }

    /// Applies a percentage markup, e.g. the default 30% sale-price policy
    /// on newly purchased products (`markup_bps = 3000`).
    pub fn with_markup(&self, markup_bps: u32) -> Money {
        let markup = (self.0 as i128 * markup_bps as i128 + 5000) / 10000;
        Money(self.0 + markup as i64)
    }

    /// Returns the discount amount for a percentage expressed in basis
    /// points (1000 bps = 10%).
    pub fn percentage(&self, bps: u32) -> Money {
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(part as i64)
    }

    /// Multiplies by a quantity (line totals).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// A sale-level discount: a percentage (basis points) plus a fixed amount.
///
/// The total formula is the single most important number in the system:
///
/// ```text
/// total = max(0, subtotal - subtotal * percent - fixed)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Percentage discount in basis points (1000 = 10%).
    pub percent_bps: u32,
    /// Fixed discount subtracted after the percentage.
    pub fixed: Money,
}

impl Discount {
    pub const fn none() -> Self {
        Discount {
            percent_bps: 0,
            fixed: Money::zero(),
        }
    }

    pub const fn new(percent_bps: u32, fixed: Money) -> Self {
        Discount { percent_bps, fixed }
    }

    /// Applies this discount to a subtotal. Never returns a negative total.
    pub fn apply(&self, subtotal: Money) -> Money {
        let after_percent = subtotal - subtotal.percentage(self.percent_bps);
        (after_percent - self.fixed).max(Money::zero())
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (bps). 1900 bps = 19%, the Colombian IVA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Rate as a percentage, display only.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_BPS)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. UI formatting (thousands separators, locale)
/// belongs to the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
