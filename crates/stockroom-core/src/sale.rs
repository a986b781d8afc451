//! # Sale Aggregate Rules
//!
//! The sale status state machine and sale planning, as pure functions.
//!
//! ## Status State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │             payment              payment (paid ≥ total)                 │
//! │   UNPAID ───────────► PARTIAL ─────────────────────► PAID               │
//! │     │  └──────────────────────────────────────────────▲ │               │
//! │     │            payment (paid ≥ total)                 │               │
//! │     │                    │                              │               │
//! │     └────── void ────────┴──────── void ────────────────┘               │
//! │                          ▼                                              │
//! │                       VOIDED (terminal: no payments, no second void)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Voiding a paid sale is allowed. Payments are kept as a financial record;
//! only stock is restored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ledger;
use crate::money::Money;
use crate::types::{NewSale, Product, Sale, SaleStatus};
use crate::validation;

// =============================================================================
// Status transitions
// =============================================================================

/// Status implied by a paid amount against a total.
///
/// ```rust
/// use stockroom_core::money::Money;
/// use stockroom_core::sale::status_for;
/// use stockroom_core::SaleStatus;
///
/// let total = Money::from_cents(2000);
/// assert_eq!(status_for(Money::zero(), total), SaleStatus::Unpaid);
/// assert_eq!(status_for(Money::from_cents(500), total), SaleStatus::Partial);
/// assert_eq!(status_for(Money::from_cents(2000), total), SaleStatus::Paid);
/// ```
pub fn status_for(paid: Money, total: Money) -> SaleStatus {
    if paid >= total {
        SaleStatus::Paid
    } else if paid.is_positive() {
        SaleStatus::Partial
    } else {
        SaleStatus::Unpaid
    }
}

/// Whether `from → to` is an allowed status change.
pub fn can_transition(from: SaleStatus, to: SaleStatus) -> bool {
    match (from, to) {
        (SaleStatus::Voided, _) => false,
        (_, SaleStatus::Voided) => true,
        (from, to) => to.rank() >= from.rank(),
    }
}

/// Result of applying a payment to a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub paid_amount: Money,
    pub status: SaleStatus,
}

/// Applies a payment of `amount` to `sale`.
///
/// ## Rules
/// - voided sales accept no payments (`SaleVoided`)
/// - `amount` must be positive (`InvalidAmount`)
/// - the status never moves backwards along `unpaid → partial → paid`
pub fn settle(sale: &Sale, amount: Money) -> CoreResult<Settlement> {
    if sale.status == SaleStatus::Voided {
        return Err(CoreError::SaleVoided {
            invoice_number: sale.invoice_number.clone(),
        });
    }

    if !amount.is_positive() {
        return Err(CoreError::invalid_amount(format!(
            "payment amount must be positive, got {}",
            amount.cents()
        )));
    }

    let paid_amount = sale
        .paid()
        .checked_add(amount)
        .ok_or_else(|| CoreError::invalid_amount("paid amount overflows"))?;

    let implied = status_for(paid_amount, sale.total());
    let status = if can_transition(sale.status, implied) {
        implied
    } else {
        sale.status
    };

    Ok(Settlement {
        paid_amount,
        status,
    })
}

/// Checks that a sale may be voided.
pub fn ensure_voidable(sale: &Sale) -> CoreResult<()> {
    if sale.status == SaleStatus::Voided {
        return Err(CoreError::AlreadyVoided {
            invoice_number: sale.invoice_number.clone(),
        });
    }
    Ok(())
}

// =============================================================================
// Sale planning
// =============================================================================

/// One validated line of a sale about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// A fully validated sale: every product exists, stock suffices, and the
/// total is the exact sum of line subtotals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    pub lines: Vec<PlannedLine>,
    pub total: Money,
}

/// Validates a new sale against the current products and prices it.
///
/// ## Checks (in order)
/// 1. Field validation (at least one item, positive quantities and prices)
/// 2. Every referenced product exists
/// 3. Stock suffices per product, summing lines that repeat a product
///
/// The database layer re-checks stock with a conditional update inside
/// the write transaction; this pass produces the user-facing error before
/// any write starts.
pub fn plan_sale(new_sale: &NewSale, products: &[Product]) -> CoreResult<SalePlan> {
    validation::validate_new_sale(new_sale)?;

    let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut lines = Vec::with_capacity(new_sale.items.len());
    let mut requested: HashMap<&str, i64> = HashMap::new();
    let mut total = Money::zero();

    for item in &new_sale.items {
        let product = by_id
            .get(item.product_id.as_str())
            .copied()
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        let unit_price = Money::from_cents(item.unit_price_cents);
        let subtotal = unit_price
            .checked_mul_quantity(item.quantity)
            .ok_or_else(|| CoreError::invalid_amount(format!("subtotal for {} overflows", product.sku)))?;
        total = total
            .checked_add(subtotal)
            .ok_or_else(|| CoreError::invalid_amount("sale total overflows"))?;

        *requested.entry(product.id.as_str()).or_insert(0) += item.quantity;

        lines.push(PlannedLine {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            quantity: item.quantity,
            unit_price,
            subtotal,
        });
    }

    for item in &new_sale.items {
        let product = by_id[item.product_id.as_str()];
        let wanted = requested[product.id.as_str()];
        if wanted > product.current_stock {
            return Err(ledger::insufficient(product, wanted));
        }
    }

    Ok(SalePlan { lines, total })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleLine;
    use chrono::Utc;

    fn sale(total: i64, paid: i64, status: SaleStatus) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s-1".to_string(),
            invoice_number: "INV-2026-0001".to_string(),
            customer_name: None,
            customer_phone: None,
            total_amount_cents: total,
            paid_amount_cents: paid,
            status,
            due_date: None,
            notes: None,
            user_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(id: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: format!("SKU-{id}"),
            name: format!("Product {id}"),
            description: None,
            category: None,
            unit: "pcs".to_string(),
            base_price_cents: 500,
            selling_price_cents: 1000,
            min_stock: 0,
            current_stock: stock,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(product_id: &str, quantity: i64, unit_price_cents: i64) -> SaleLine {
        SaleLine {
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents,
        }
    }

    #[test]
    fn test_settle_progression() {
        let s = sale(2000, 0, SaleStatus::Unpaid);
        let first = settle(&s, Money::from_cents(500)).unwrap();
        assert_eq!(first.status, SaleStatus::Partial);
        assert_eq!(first.paid_amount.cents(), 500);

        let s = sale(2000, 500, SaleStatus::Partial);
        let second = settle(&s, Money::from_cents(1500)).unwrap();
        assert_eq!(second.status, SaleStatus::Paid);
        assert_eq!(second.paid_amount.cents(), 2000);
    }

    #[test]
    fn test_settle_straight_to_paid_and_overpay() {
        let s = sale(2000, 0, SaleStatus::Unpaid);
        assert_eq!(settle(&s, Money::from_cents(2000)).unwrap().status, SaleStatus::Paid);

        let s = sale(2000, 2000, SaleStatus::Paid);
        let extra = settle(&s, Money::from_cents(100)).unwrap();
        assert_eq!(extra.status, SaleStatus::Paid);
        assert_eq!(extra.paid_amount.cents(), 2100);
    }

    #[test]
    fn test_settle_rejects_voided_and_non_positive() {
        let voided = sale(2000, 0, SaleStatus::Voided);
        assert!(matches!(
            settle(&voided, Money::from_cents(100)),
            Err(CoreError::SaleVoided { .. })
        ));

        let open = sale(2000, 0, SaleStatus::Unpaid);
        assert!(matches!(
            settle(&open, Money::zero()),
            Err(CoreError::InvalidAmount { .. })
        ));
        assert!(matches!(
            settle(&open, Money::from_cents(-5)),
            Err(CoreError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_transitions_never_reverse() {
        use SaleStatus::*;
        let all = [Unpaid, Partial, Paid, Voided];
        for from in all {
            for to in all {
                let allowed = can_transition(from, to);
                match (from, to) {
                    (Voided, _) => assert!(!allowed),
                    (_, Voided) => assert!(allowed),
                    (Partial, Unpaid) | (Paid, Unpaid) | (Paid, Partial) => assert!(!allowed),
                    _ => assert!(allowed),
                }
            }
        }
    }

    #[test]
    fn test_ensure_voidable() {
        assert!(ensure_voidable(&sale(2000, 2000, SaleStatus::Paid)).is_ok());
        assert!(matches!(
            ensure_voidable(&sale(2000, 0, SaleStatus::Voided)),
            Err(CoreError::AlreadyVoided { .. })
        ));
    }

    #[test]
    fn test_plan_sale_totals() {
        let products = [product("a", 15), product("b", 4)];
        let new_sale = NewSale {
            items: vec![line("a", 2, 1000), line("b", 3, 250)],
            ..Default::default()
        };

        let plan = plan_sale(&new_sale, &products).unwrap();
        assert_eq!(plan.total.cents(), 2750);
        assert_eq!(plan.lines[0].subtotal.cents(), 2000);
        assert_eq!(plan.lines[1].subtotal.cents(), 750);
        assert_eq!(plan.lines[1].sku, "SKU-b");
    }

    #[test]
    fn test_plan_sale_insufficient_names_product() {
        let products = [product("a", 15), product("b", 1)];
        let new_sale = NewSale {
            items: vec![line("a", 2, 1000), line("b", 3, 250)],
            ..Default::default()
        };

        match plan_sale(&new_sale, &products) {
            Err(CoreError::InsufficientStock { sku, available, requested, .. }) => {
                assert_eq!(sku, "SKU-b");
                assert_eq!(available, 1);
                assert_eq!(requested, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_sale_sums_repeated_product() {
        let products = [product("a", 10)];
        let new_sale = NewSale {
            items: vec![line("a", 6, 1000), line("a", 6, 900)],
            ..Default::default()
        };

        assert!(matches!(
            plan_sale(&new_sale, &products),
            Err(CoreError::InsufficientStock { requested: 12, .. })
        ));
    }

    #[test]
    fn test_plan_sale_unknown_product_and_empty() {
        let products = [product("a", 10)];
        let new_sale = NewSale {
            items: vec![line("zzz", 1, 1000)],
            ..Default::default()
        };
        assert!(matches!(
            plan_sale(&new_sale, &products),
            Err(CoreError::ProductNotFound(_))
        ));

        assert!(matches!(
            plan_sale(&NewSale::default(), &products),
            Err(CoreError::EmptySale)
        ));
    }
}
