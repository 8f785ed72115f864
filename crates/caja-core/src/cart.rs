//! # Cart
//!
//! Transient, single-session staging area accumulating line items before
//! a sale is committed. Never persisted in the snapshot.
//!
//! ## Staleness Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Cart quantities are bounded by product stock AT ADD TIME only.     │
//! │                                                                     │
//! │  Stock may change underneath the cart (a reservation, another       │
//! │  sale). The cart is NOT re-validated implicitly - the engine        │
//! │  re-checks every line against live stock at commit time and the     │
//! │  sale fails atomically if any line no longer fits.                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult, ValidationError};
use crate::inventory::Product;
use crate::money::{Discount, Money};

/// A line in the cart.
///
/// Snapshot pattern: name, price, and cost are frozen when the product is
/// added, so the committed sale records what the customer was shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    /// Product name at add time (frozen).
    pub name: String,
    /// Unit sale price at add time (frozen).
    pub unit_price: Money,
    /// Unit cost at add time (frozen) - carried into the sale record.
    pub unit_cost: Money,
    pub quantity: i64,
}

impl CartLine {
    fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price,
            unit_cost: product.cost,
            quantity,
        }
    }

    /// Line total before discounts.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product again
///   increments its quantity)
/// - Quantities are > 0 (setting a quantity to zero removes the line)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Adds `qty` units of a product, or increments an existing line.
    ///
    /// Fails with `MustBePositive` when `qty` is zero or negative, with
    /// `OutOfStock` when the product has no stock at all, and with
    /// `StockExceeded` when the resulting quantity would pass the
    /// product's stock at add time.
    pub fn add(&mut self, product: &Product, qty: i64) -> EngineResult<()> {
        if qty <= 0 {
            return Err(ValidationError::MustBePositive { field: "quantity" }.into());
        }
        if product.stock == 0 {
            return Err(EngineError::OutOfStock(product.name.clone()));
        }

        let current = self
            .lines
            .iter()
            .find(|l| l.product_id == product.id)
            .map_or(0, |l| l.quantity);
        let requested = current + qty;

        if requested > product.stock {
            return Err(EngineError::StockExceeded {
                product: product.name.clone(),
                available: product.stock,
                requested,
            });
        }

        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = requested,
            None => self.lines.push(CartLine::from_product(product, qty)),
        }
        Ok(())
    }

    /// Sets the quantity of an existing line. Zero or negative removes
    /// the line; above the product's stock fails with `StockExceeded`.
    pub fn set_quantity(&mut self, product: &Product, qty: i64) -> EngineResult<()> {
        if qty <= 0 {
            self.remove(&product.id);
            return Ok(());
        }
        if qty > product.stock {
            return Err(EngineError::StockExceeded {
                product: product.name.clone(),
                available: product.stock,
                requested: qty,
            });
        }
        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => {
                line.quantity = qty;
                Ok(())
            }
            None => Err(EngineError::ProductNotFound(product.id.clone())),
        }
    }

    /// Removes a line by product id. Removing an absent line is a no-op.
    pub fn remove(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Subtotal before discounts.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// `(subtotal, total)` under the given discount. Pure, no mutation.
    pub fn totals(&self, discount: Discount) -> (Money, Money) {
        let subtotal = self.subtotal();
        (subtotal, discount.apply(subtotal))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::ProductStatus;

    fn product(id: &str, stock: i64, price: i64) -> Product {
        Product {
            id: id.to_string(),
            sku: format!("PKM-{}", id),
            name: format!("Product {}", id),
            description: String::new(),
            language: "ES".to_string(),
            category: "Pokémon".to_string(),
            kind: "Carta".to_string(),
            stock,
            cost: Money::from_pesos(price / 2),
            price: Money::from_pesos(price),
            supplier: String::new(),
            tags: vec![],
            images: vec![],
            apply_tax: false,
            status: ProductStatus::Available,
            history: vec![],
        }
    }

    #[test]
    fn test_add_and_subtotal() {
        let mut cart = Cart::new();
        let p = product("p1", 10, 95_000);

        cart.add(&p, 2).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.subtotal().pesos(), 190_000);
    }

    #[test]
    fn test_add_same_product_increments() {
        let mut cart = Cart::new();
        let p = product("p1", 10, 1_000);

        cart.add(&p, 2).unwrap();
        cart.add(&p, 3).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_add_rejects_nonpositive_quantity() {
        let mut cart = Cart::new();
        let p = product("p1", 10, 1_000);

        for qty in [0, -1] {
            assert!(matches!(
                cart.add(&p, qty).unwrap_err(),
                EngineError::Validation(ValidationError::MustBePositive { field: "quantity" })
            ));
        }
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal().pesos(), 0);
    }

    #[test]
    fn test_add_out_of_stock() {
        let mut cart = Cart::new();
        let p = product("p1", 0, 1_000);

        assert!(matches!(
            cart.add(&p, 1).unwrap_err(),
            EngineError::OutOfStock(_)
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_beyond_stock_exceeds() {
        let mut cart = Cart::new();
        let p = product("p1", 3, 1_000);

        cart.add(&p, 3).unwrap();
        assert!(matches!(
            cart.add(&p, 1).unwrap_err(),
            EngineError::StockExceeded { requested: 4, .. }
        ));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        let p = product("p1", 5, 1_000);

        cart.add(&p, 2).unwrap();
        cart.set_quantity(&p, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_above_stock_fails() {
        let mut cart = Cart::new();
        let p = product("p1", 5, 1_000);

        cart.add(&p, 2).unwrap();
        assert!(matches!(
            cart.set_quantity(&p, 6).unwrap_err(),
            EngineError::StockExceeded { .. }
        ));
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_totals_with_discount() {
        let mut cart = Cart::new();
        let p = product("p1", 10, 50_000);

        cart.add(&p, 2).unwrap();
        let (subtotal, total) =
            cart.totals(Discount::new(1000, Money::from_pesos(5_000)));
        assert_eq!(subtotal.pesos(), 100_000);
        assert_eq!(total.pesos(), 85_000);
    }

    #[test]
    fn test_price_frozen_at_add_time() {
        let mut cart = Cart::new();
        let mut p = product("p1", 10, 95_000);

        cart.add(&p, 1).unwrap();
        p.price = Money::from_pesos(120_000);

        // The cart keeps the price the customer was shown.
        assert_eq!(cart.subtotal().pesos(), 95_000);
    }
}
