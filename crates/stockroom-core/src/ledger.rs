//! # Stock Ledger
//!
//! Pure rules for the product stock ledger.
//!
//! ## The Ledger Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Product.current_stock == Σ quantity(in) − Σ quantity(out)             │
//! │                                                                         │
//! │   StockMovement rows are append-only. The counter on the product is a   │
//! │   cached fold of its movements, and is only changed together with a     │
//! │   new movement row in the same transaction.                             │
//! │                                                                         │
//! │   Opening stock   ──► in  (product creation)                            │
//! │   Purchase        ──► in                                                │
//! │   Sale            ──► out (one per sale item)                           │
//! │   Void            ──► in  (compensating entry per sale item)            │
//! │   Stock take      ──► in | out of the difference (correction)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{MovementType, Product, StockMovement, StockOverview};

/// Folds a movement history into the stock level it implies.
///
/// ```rust
/// use stockroom_core::ledger::reconcile;
///
/// assert_eq!(reconcile(std::iter::empty()), 0);
/// ```
pub fn reconcile<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> i64 {
    movements
        .into_iter()
        .map(StockMovement::signed_quantity)
        .sum()
}

/// Checks a movement against the current stock and returns the new level.
///
/// ## Rules
/// - `quantity` must be positive
/// - `out` may not take the stock below zero
pub fn check_movement(
    product: &Product,
    movement_type: MovementType,
    quantity: i64,
) -> CoreResult<i64> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }

    let next = product
        .current_stock
        .checked_add(movement_type.signed(quantity))
        .ok_or(CoreError::InvalidQuantity { quantity })?;

    if next < 0 {
        return Err(insufficient(product, quantity));
    }

    Ok(next)
}

/// Builds the InsufficientStock error for a product.
pub fn insufficient(product: &Product, requested: i64) -> CoreError {
    CoreError::InsufficientStock {
        product_id: product.id.clone(),
        sku: product.sku.clone(),
        available: product.current_stock,
        requested,
    }
}

/// Movement that brings `current` to `target`, or `None` when they match.
///
/// Used by stock corrections (stock takes): instead of overwriting the
/// counter, the difference is booked as a regular movement.
///
/// ```rust
/// use stockroom_core::ledger::correction_for;
/// use stockroom_core::MovementType;
///
/// assert_eq!(correction_for(10, 7).unwrap(), Some((MovementType::Out, 3)));
/// assert_eq!(correction_for(10, 12).unwrap(), Some((MovementType::In, 2)));
/// assert_eq!(correction_for(10, 10).unwrap(), None);
/// assert!(correction_for(10, -1).is_err());
/// ```
pub fn correction_for(current: i64, target: i64) -> CoreResult<Option<(MovementType, i64)>> {
    if target < 0 {
        return Err(CoreError::InvalidQuantity { quantity: target });
    }

    Ok(match target - current {
        0 => None,
        diff if diff > 0 => Some((MovementType::In, diff)),
        diff => Some((MovementType::Out, -diff)),
    })
}

/// Recorded stock compared with what the ledger implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockReconciliation {
    pub product_id: String,
    pub sku: String,
    /// `Product.current_stock`.
    pub recorded_stock: i64,
    /// Σ in − Σ out over the movement history.
    pub ledger_stock: i64,
}

impl StockReconciliation {
    /// Both figures agree.
    pub fn is_consistent(&self) -> bool {
        self.recorded_stock == self.ledger_stock
    }

    /// How far the counter has drifted from the ledger.
    pub fn drift(&self) -> i64 {
        self.recorded_stock - self.ledger_stock
    }
}

/// Totals units and selling value over `products` and picks out the ones
/// at or below their reorder threshold (in the given order).
///
/// ## Returns
/// * `Err(CoreError::InvalidAmount)` - A total does not fit in `i64`
pub fn overview(products: &[Product]) -> CoreResult<StockOverview> {
    let mut total_units: i64 = 0;
    let mut total_value = Money::zero();

    for product in products {
        total_units = total_units
            .checked_add(product.current_stock)
            .ok_or_else(|| CoreError::invalid_amount("total stock units overflow"))?;

        let value = product
            .stock_value()
            .ok_or_else(|| CoreError::invalid_amount(format!("stock value of {} overflows", product.sku)))?;
        total_value = total_value
            .checked_add(value)
            .ok_or_else(|| CoreError::invalid_amount("total stock value overflows"))?;
    }

    Ok(StockOverview {
        total_products: products.len() as i64,
        total_units,
        total_value_cents: total_value.cents(),
        low_stock: products.iter().filter(|p| p.is_low_stock()).cloned().collect(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-a".to_string(),
            sku: "BRG-A".to_string(),
            name: "Product A".to_string(),
            description: None,
            category: None,
            unit: "pcs".to_string(),
            base_price_cents: 800,
            selling_price_cents: 1000,
            min_stock: 0,
            current_stock: stock,
            created_at: now,
            updated_at: now,
        }
    }

    fn movement(movement_type: MovementType, quantity: i64) -> StockMovement {
        let now = Utc::now();
        StockMovement {
            id: format!("m-{quantity}"),
            product_id: "p-a".to_string(),
            movement_type,
            quantity,
            unit_price_cents: None,
            reference: None,
            notes: None,
            transaction_date: now,
            user_id: None,
            created_at: now,
        }
    }

    #[test]
    fn test_reconcile_folds_history() {
        let history = [
            movement(MovementType::In, 10),
            movement(MovementType::In, 5),
            movement(MovementType::Out, 2),
            movement(MovementType::In, 2),
        ];
        assert_eq!(reconcile(&history), 15);
    }

    #[test]
    fn test_check_movement() {
        let a = product(10);
        assert_eq!(check_movement(&a, MovementType::In, 5).unwrap(), 15);
        assert_eq!(check_movement(&a, MovementType::Out, 10).unwrap(), 0);

        let err = check_movement(&a, MovementType::Out, 11).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 10, requested: 11, .. }
        ));
    }

    #[test]
    fn test_check_movement_rejects_non_positive_quantity() {
        let a = product(10);
        assert!(matches!(
            check_movement(&a, MovementType::In, 0),
            Err(CoreError::InvalidQuantity { quantity: 0 })
        ));
        assert!(matches!(
            check_movement(&a, MovementType::Out, -3),
            Err(CoreError::InvalidQuantity { quantity: -3 })
        ));
    }

    /// Any sequence of checked movements keeps the level non-negative and
    /// equal to the fold of the accepted movements.
    #[test]
    fn test_checked_sequence_never_goes_negative() {
        let mut a = product(0);
        let mut accepted = Vec::new();
        let requests = [
            (MovementType::In, 3),
            (MovementType::Out, 5),
            (MovementType::Out, 3),
            (MovementType::In, 7),
            (MovementType::Out, 1),
            (MovementType::Out, 7),
            (MovementType::In, 2),
        ];

        for (movement_type, quantity) in requests {
            if let Ok(next) = check_movement(&a, movement_type, quantity) {
                a.current_stock = next;
                accepted.push(movement(movement_type, quantity));
            }
            assert!(a.current_stock >= 0);
        }

        assert_eq!(a.current_stock, reconcile(&accepted));
        assert_eq!(a.current_stock, 8);
    }

    #[test]
    fn test_reconciliation_drift() {
        let report = StockReconciliation {
            product_id: "p-a".to_string(),
            sku: "BRG-A".to_string(),
            recorded_stock: 12,
            ledger_stock: 10,
        };
        assert!(!report.is_consistent());
        assert_eq!(report.drift(), 2);
    }

    #[test]
    fn test_overview_totals() {
        let mut a = product(10);
        a.min_stock = 2;
        let mut b = product(1);
        b.sku = "BRG-B".to_string();
        b.selling_price_cents = 2500;
        b.min_stock = 3;

        let overview = overview(&[a, b]).unwrap();
        assert_eq!(overview.total_products, 2);
        assert_eq!(overview.total_units, 11);
        assert_eq!(overview.total_value_cents, 10 * 1000 + 2500);
        assert_eq!(overview.low_stock.len(), 1);
        assert_eq!(overview.low_stock[0].sku, "BRG-B");

        let empty = super::overview(&[]).unwrap();
        assert_eq!(empty.total_products, 0);
        assert!(empty.total_value().is_zero());
    }

    #[test]
    fn test_overview_refuses_overflow() {
        let huge = product(i64::MAX);
        assert!(matches!(overview(&[huge]), Err(CoreError::InvalidAmount { .. })));
    }
}
