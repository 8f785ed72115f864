//! # Inventory Store
//!
//! Owns products, their stock counts, and their per-product history logs.
//! Leaf dependency of every stock-moving engine operation.
//!
//! ## Invariant
//! `stock >= 0` at all times. Every stock delta - increase or decrease -
//! is paired with a history entry recording kind, quantity, date, and the
//! originating record id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult, ValidationError};
use crate::money::Money;
use crate::validation::require_field;

// =============================================================================
// Product
// =============================================================================

/// Availability status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Normal state, sellable.
    Available,
    /// Committed to a pending presale and on its way.
    InTransit,
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Available => write!(f, "available"),
            ProductStatus::InTransit => write!(f, "in_transit"),
        }
    }
}

/// What caused a stock delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockEventKind {
    /// Purchase added stock.
    Restock,
    /// A committed sale removed stock.
    Sale,
    /// A presale completion removed one unit.
    PresaleDelivery,
    /// A reservation hold removed stock.
    ReservationHold,
    /// A cancelled reservation returned its held stock.
    ReservationReturn,
}

/// A single stock-affecting event on a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: StockEventKind,
    pub quantity: i64,
    pub date: DateTime<Utc>,
    /// Id of the originating sale/purchase/presale/reservation.
    pub reference: String,
}

/// A product in inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Stable identifier (UUID v4).
    pub id: String,
    /// Display code. Expected unique in practice, not enforced globally.
    pub sku: String,
    pub name: String,
    pub description: String,
    /// Language tag for collectibles (ES, EN, JA, ...).
    pub language: String,
    pub category: String,
    /// Product type from the settings list (card, figure, ...).
    pub kind: String,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Current unit cost, overwritten on restock.
    pub cost: Money,
    /// Current unit sale price.
    pub price: Money,
    pub supplier: String,
    pub tags: Vec<String>,
    /// Image references, display only.
    pub images: Vec<String>,
    /// Whether IVA applies to this product's cost.
    pub apply_tax: bool,
    pub status: ProductStatus,
    /// Ordered log of stock-affecting events.
    pub history: Vec<HistoryEntry>,
}

impl Product {
    /// Generates the human-facing SKU for a product created by purchase,
    /// `PRD-` plus the first uuid segment.
    pub fn generate_sku(id: &str) -> String {
        let short = id.split('-').next().unwrap_or(id);
        format!("PRD-{}", short.to_uppercase())
    }

    /// Value of stock on hand at cost.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.cost.multiply_quantity(self.stock)
    }

    /// Revenue if all stock sold at the current price.
    #[inline]
    pub fn potential_revenue(&self) -> Money {
        self.price.multiply_quantity(self.stock)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// The set of all products. Serializes transparently as an array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    pub products: Vec<Product>,
}

impl Inventory {
    pub fn find(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    /// Resolves a product id or fails with `ProductNotFound`.
    pub fn resolve(&self, product_id: &str) -> EngineResult<&Product> {
        self.find(product_id)
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))
    }

    fn resolve_mut(&mut self, product_id: &str) -> EngineResult<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))
    }

    /// Increases stock and appends the paired history entry.
    pub fn increase_stock(
        &mut self,
        product_id: &str,
        qty: i64,
        kind: StockEventKind,
        reference: impl Into<String>,
        when: DateTime<Utc>,
    ) -> EngineResult<()> {
        if qty <= 0 {
            return Err(ValidationError::MustBePositive { field: "quantity" }.into());
        }
        let product = self.resolve_mut(product_id)?;
        product.stock += qty;
        product.history.push(HistoryEntry {
            kind,
            quantity: qty,
            date: when,
            reference: reference.into(),
        });
        Ok(())
    }

    /// Decreases stock and appends the paired history entry tagged with
    /// its cause. Fails with `InsufficientStock` before mutating when the
    /// product cannot cover the quantity.
    pub fn decrease_stock(
        &mut self,
        product_id: &str,
        qty: i64,
        kind: StockEventKind,
        reference: impl Into<String>,
        when: DateTime<Utc>,
    ) -> EngineResult<()> {
        if qty <= 0 {
            return Err(ValidationError::MustBePositive { field: "quantity" }.into());
        }
        let product = self.resolve_mut(product_id)?;
        if product.stock < qty {
            return Err(EngineError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: qty,
            });
        }
        product.stock -= qty;
        product.history.push(HistoryEntry {
            kind,
            quantity: qty,
            date: when,
            reference: reference.into(),
        });
        Ok(())
    }

    pub fn set_status(&mut self, product_id: &str, status: ProductStatus) -> EngineResult<()> {
        self.resolve_mut(product_id)?.status = status;
        Ok(())
    }

    /// Creates or fully replaces a product. Rejects blank name, language,
    /// category, or type.
    pub fn upsert(&mut self, product: Product) -> EngineResult<()> {
        require_field("name", &product.name)?;
        require_field("language", &product.language)?;
        require_field("category", &product.category)?;
        require_field("type", &product.kind)?;

        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
        Ok(())
    }

    /// Removes a product. Deletion is permitted even when sales reference
    /// the product; callers should first check `Snapshot::sales_referencing`
    /// and warn, because removal orphans those historical references.
    pub fn remove(&mut self, product_id: &str) -> EngineResult<Product> {
        let idx = self
            .products
            .iter()
            .position(|p| p.id == product_id)
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;
        Ok(self.products.remove(idx))
    }

    /// Total inventory value at cost.
    pub fn stock_value(&self) -> Money {
        self.products.iter().map(Product::stock_value).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

/// Shared test fixture: a card product with the given stock,
/// cost 50 000 and price 95 000.
#[cfg(test)]
pub(crate) fn test_product(id: &str, stock: i64) -> Product {
    Product {
        id: id.to_string(),
        sku: format!("PKM-{}", id),
        name: format!("Product {}", id),
        description: String::new(),
        language: "ES".to_string(),
        category: "Pokémon".to_string(),
        kind: "Carta".to_string(),
        stock,
        cost: Money::from_pesos(50_000),
        price: Money::from_pesos(95_000),
        supplier: String::new(),
        tags: vec![],
        images: vec![],
        apply_tax: true,
        status: ProductStatus::Available,
        history: vec![],
    }
}
