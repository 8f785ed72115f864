//! # CSV Export
//!
//! Pure string projections of a snapshot, ready to write wherever the
//! caller wants. No file I/O here; the store stays in charge of paths.

use caja_core::snapshot::Snapshot;

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders the product list as CSV.
pub fn products_csv(snapshot: &Snapshot) -> String {
    let mut out = String::from("sku,name,language,category,type,stock,cost,price,status\n");
    for product in &snapshot.inventory.products {
        out.push_str(&csv_row(&[
            product.sku.clone(),
            product.name.clone(),
            product.language.clone(),
            product.category.clone(),
            product.kind.clone(),
            product.stock.to_string(),
            product.cost.pesos().to_string(),
            product.price.pesos().to_string(),
            product.status.to_string(),
        ]));
        out.push('\n');
    }
    out
}

/// Renders the sales history as CSV, one row per sale with its lines
/// joined into a single column.
pub fn sales_csv(snapshot: &Snapshot) -> String {
    let mut out = String::from("date,products,subtotal,total,profit,account\n");
    for sale in &snapshot.sales {
        let products = sale
            .lines
            .iter()
            .map(|l| format!("{} x{}", l.name, l.quantity))
            .collect::<Vec<_>>()
            .join("; ");
        out.push_str(&csv_row(&[
            sale.occurred_at.format("%Y-%m-%d %H:%M").to_string(),
            products,
            sale.subtotal.pesos().to_string(),
            sale.total.pesos().to_string(),
            sale.profit().pesos().to_string(),
            sale.account_name.clone(),
        ]));
        out.push('\n');
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
