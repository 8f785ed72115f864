//! # Reporting Module
//!
//! Read-only projections over a snapshot: the dashboard summary, monthly
//! figures, and due-date views for presales and reservations. Nothing
//! here mutates state; every number is recomputed from the records on
//! each call, so reports can never drift from the ledger.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::money::Money;
use crate::snapshot::Snapshot;
use crate::types::{LoanStatus, Presale, PresaleStatus, Reservation, ReservationStatus};

// =============================================================================
// Dashboard
// =============================================================================

/// The headline numbers shown on the main screen.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    /// Sum of all account balances.
    pub total_balance: Money,
    /// Inventory valued at cost.
    pub inventory_value: Money,
    /// Inventory valued at sale price.
    pub potential_revenue: Money,
    /// Lifetime purchase spend.
    pub total_invested: Money,
    /// Lifetime sales revenue (discounted totals).
    pub total_sold: Money,
    /// Lifetime operating expenses.
    pub total_expenses: Money,
    /// Lifetime sale profit (revenue minus frozen line costs).
    pub total_profit: Money,
    pub active_loans: usize,
    pub pending_presales: usize,
    pub held_reservations: usize,
}

/// Builds the dashboard summary.
pub fn dashboard(snapshot: &Snapshot) -> DashboardSummary {
    DashboardSummary {
        total_balance: snapshot.ledger.total_balance(),
        inventory_value: snapshot.inventory.stock_value(),
        potential_revenue: snapshot
            .inventory
            .products
            .iter()
            .map(|p| p.potential_revenue())
            .sum(),
        total_invested: snapshot.purchases.iter().map(|p| p.total).sum(),
        total_sold: snapshot.sales.iter().map(|s| s.total).sum(),
        total_expenses: snapshot.expenses.iter().map(|e| e.amount).sum(),
        total_profit: snapshot.sales.iter().map(|s| s.profit()).sum(),
        active_loans: snapshot
            .loans
            .iter()
            .filter(|l| l.status == LoanStatus::Active)
            .count(),
        pending_presales: snapshot
            .presales
            .iter()
            .filter(|p| p.status == PresaleStatus::Pending)
            .count(),
        held_reservations: snapshot
            .reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Held)
            .count(),
    }
}

// =============================================================================
// Monthly Report
// =============================================================================

/// One calendar month's trading figures. Sales bucket by their business
/// date (`occurred_at`), so backdated sales land in the right month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub sales_count: usize,
    pub sold: Money,
    pub profit: Money,
    pub invested: Money,
    pub expenses: Money,
    /// sold - invested - expenses
    pub net: Money,
}

/// Builds the report for one month.
pub fn monthly(snapshot: &Snapshot, year: i32, month: u32) -> MonthlyReport {
    let in_month = |date: chrono::DateTime<chrono::Utc>| {
        date.year() == year && date.month() == month
    };

    let month_sales: Vec<_> = snapshot
        .sales
        .iter()
        .filter(|s| in_month(s.occurred_at))
        .collect();
    let sold = month_sales.iter().map(|s| s.total).sum();
    let profit = month_sales.iter().map(|s| s.profit()).sum();
    let invested: Money = snapshot
        .purchases
        .iter()
        .filter(|p| in_month(p.date))
        .map(|p| p.total)
        .sum();
    let expenses: Money = snapshot
        .expenses
        .iter()
        .filter(|e| in_month(e.date))
        .map(|e| e.amount)
        .sum();

    MonthlyReport {
        year,
        month,
        sales_count: month_sales.len(),
        sold,
        profit,
        invested,
        expenses,
        net: sold - invested - expenses,
    }
}

// =============================================================================
// Due-Date Views
// =============================================================================

/// Pending presales due on or before the given date, soonest first.
pub fn presales_due_by(snapshot: &Snapshot, date: NaiveDate) -> Vec<&Presale> {
    let mut due: Vec<&Presale> = snapshot
        .presales
        .iter()
        .filter(|p| p.status == PresaleStatus::Pending && p.delivery_date <= date)
        .collect();
    due.sort_by_key(|p| p.delivery_date);
    due
}

/// Held reservations whose hold window has lapsed by the given date.
/// Expiry is advisory: the hold stays until someone cancels or completes
/// it, this view just surfaces the candidates.
pub fn expired_reservations(snapshot: &Snapshot, today: NaiveDate) -> Vec<&Reservation> {
    snapshot
        .reservations
        .iter()
        .filter(|r| r.status == ReservationStatus::Held && r.expires_at().date_naive() < today)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::engine::{self, SaleCommand};
    use crate::inventory::test_product;
    use crate::money::Discount;
    use chrono::{Duration, TimeZone, Utc};

    fn snap_with_sale() -> Snapshot {
        let mut snap = Snapshot::default_state(Money::from_pesos(1_000_000));
        snap.inventory.products.push(test_product("p1", 10));
        let product = snap.inventory.resolve("p1").unwrap().clone();
        let mut cart = Cart::default();
        cart.add(&product, 2).unwrap();
        engine::record_sale(
            &mut snap,
            SaleCommand {
                cart,
                discount: Discount::none(),
                account: "Efectivo".to_string(),
                occurred_at: None,
            },
        )
        .unwrap();
        snap
    }

    #[test]
    fn test_dashboard_counts_and_sums() {
        let snap = snap_with_sale();
        let summary = dashboard(&snap);

        assert_eq!(summary.total_balance, Money::from_pesos(1_190_000));
        // 8 units left at cost 50_000 / price 95_000
        assert_eq!(summary.inventory_value, Money::from_pesos(400_000));
        assert_eq!(summary.potential_revenue, Money::from_pesos(760_000));
        assert_eq!(summary.total_sold, Money::from_pesos(190_000));
        // 2 × (95_000 - 50_000)
        assert_eq!(summary.total_profit, Money::from_pesos(90_000));
        assert_eq!(summary.active_loans, 0);
    }

    #[test]
    fn test_monthly_buckets_by_business_date() {
        let mut snap = Snapshot::default_state(Money::from_pesos(1_000_000));
        snap.inventory.products.push(test_product("p1", 10));
        let product = snap.inventory.resolve("p1").unwrap().clone();

        let backdated = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let mut cart = Cart::default();
        cart.add(&product, 1).unwrap();
        engine::record_sale(
            &mut snap,
            SaleCommand {
                cart,
                discount: Discount::none(),
                account: "Efectivo".to_string(),
                occurred_at: Some(backdated),
            },
        )
        .unwrap();

        let march = monthly(&snap, 2026, 3);
        assert_eq!(march.sales_count, 1);
        assert_eq!(march.sold, Money::from_pesos(95_000));
        assert_eq!(march.net, Money::from_pesos(95_000));

        let april = monthly(&snap, 2026, 4);
        assert_eq!(april.sales_count, 0);
        assert_eq!(april.sold, Money::zero());
    }

    #[test]
    fn test_expired_reservations_view() {
        let mut snap = Snapshot::default_state(Money::zero());
        snap.inventory.products.push(test_product("p1", 10));
        let id = engine::create_reservation(
            &mut snap,
            engine::ReservationCommand {
                client: "Camilo".to_string(),
                product_id: "p1".to_string(),
                quantity: 1,
                duration_days: 7,
                notes: String::new(),
            },
        )
        .unwrap();

        let today = Utc::now().date_naive();
        assert!(expired_reservations(&snap, today).is_empty());

        let after_window = (Utc::now() + Duration::days(8)).date_naive();
        let expired = expired_reservations(&snap, after_window);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, id);
    }

    #[test]
    fn test_presales_due_sorted() {
        let mut snap = Snapshot::default_state(Money::zero());
        for (client, day) in [("A", 20), ("B", 10)] {
            engine::create_presale(
                &mut snap,
                engine::PresaleCommand {
                    client: client.to_string(),
                    product: engine::PresaleProduct::Custom {
                        name: "Booster Box".to_string(),
                    },
                    total: Money::from_pesos(10_000),
                    deposit: Money::zero(),
                    delivery_date: NaiveDate::from_ymd_opt(2026, 9, day).unwrap(),
                    account: "Efectivo".to_string(),
                },
            )
            .unwrap();
        }

        let due = presales_due_by(&snap, NaiveDate::from_ymd_opt(2026, 9, 30).unwrap());
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].client, "B");

        let early = presales_due_by(&snap, NaiveDate::from_ymd_opt(2026, 9, 15).unwrap());
        assert_eq!(early.len(), 1);
    }
}
