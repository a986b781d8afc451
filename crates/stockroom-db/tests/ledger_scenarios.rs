//! End-to-end ledger scenarios against a fresh SQLite database.
//!
//! Each test builds its own in-memory database, except the concurrency
//! test which needs a file so that several connections share it.

use chrono::{TimeZone, Utc};
use stockroom_core::{
    CoreError, MovementMeta, MovementType, NewPayment, NewProduct, NewSale, Product, SaleLine,
    SaleStatus,
};
use stockroom_db::repository::audit;
use stockroom_db::{Database, DbConfig, DbError};

// =============================================================================
// Helpers
// =============================================================================

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn product(db: &Database, sku: &str, opening_stock: i64) -> Product {
    db.products()
        .create(NewProduct {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            unit: "pcs".to_string(),
            base_price_cents: 700,
            selling_price_cents: 1000,
            min_stock: 2,
            opening_stock,
            ..Default::default()
        })
        .await
        .unwrap()
}

fn sale_of(lines: &[(&str, i64, i64)]) -> NewSale {
    NewSale {
        customer_name: Some("Toko Maju".to_string()),
        items: lines
            .iter()
            .map(|(id, quantity, price)| SaleLine {
                product_id: id.to_string(),
                quantity: *quantity,
                unit_price_cents: *price,
            })
            .collect(),
        ..Default::default()
    }
}

async fn stock_of(db: &Database, id: &str) -> i64 {
    db.products().require(id).await.unwrap().current_stock
}

async fn assert_reconciles(db: &Database) {
    let drift = db.stock().find_drift().await.unwrap();
    assert!(drift.is_empty(), "ledger drift: {drift:?}");
}

// =============================================================================
// Walkthrough
// =============================================================================

#[tokio::test]
async fn movement_then_sale_then_payment_then_void() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;

    // Receive 5, then try to remove more than is there.
    db.stock().stock_in(&a.id, 5, MovementMeta::default()).await.unwrap();
    assert_eq!(stock_of(&db, &a.id).await, 15);

    let err = db.stock().stock_out(&a.id, 20, MovementMeta::default()).await.unwrap_err();
    match err {
        DbError::Core(CoreError::InsufficientStock { available, requested, .. }) => {
            assert_eq!(available, 15);
            assert_eq!(requested, 20);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(stock_of(&db, &a.id).await, 15);

    // Sell 2 at 1000.
    let sale = db.sales().create_sale(sale_of(&[(&a.id, 2, 1000)])).await.unwrap();
    assert_eq!(sale.total_amount_cents, 2000);
    assert_eq!(sale.status, SaleStatus::Unpaid);
    assert_eq!(stock_of(&db, &a.id).await, 13);

    // Pay in full.
    let (_, paid) = db.sales().add_payment(&sale.id, NewPayment::of(2000)).await.unwrap();
    assert_eq!(paid.status, SaleStatus::Paid);
    assert_eq!(paid.paid_amount_cents, 2000);

    // Void: stock comes back, payment record stays.
    let voided = db.sales().void_sale(&sale.id, None).await.unwrap();
    assert_eq!(voided.status, SaleStatus::Voided);
    assert_eq!(voided.paid_amount_cents, 2000);
    assert_eq!(stock_of(&db, &a.id).await, 15);
    assert_eq!(db.sales().get_total_paid(&sale.id).await.unwrap(), 2000);

    assert_reconciles(&db).await;
}

#[tokio::test]
async fn three_sales_in_a_fresh_year_get_consecutive_invoices() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;
    let at = Utc.with_ymd_and_hms(2026, 5, 20, 10, 0, 0).unwrap();

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let sale = db.sales().create_sale_at(sale_of(&[(&a.id, 1, 1000)]), at).await.unwrap();
        numbers.push(sale.invoice_number);
    }

    assert_eq!(numbers, vec!["INV-2026-0001", "INV-2026-0002", "INV-2026-0003"]);
}

// =============================================================================
// Stock Properties
// =============================================================================

#[tokio::test]
async fn failed_sale_leaves_no_trace() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;
    let b = product(&db, "BRG-B", 1).await;

    let err = db
        .sales()
        .create_sale(sale_of(&[(&a.id, 3, 1000), (&b.id, 2, 500)]))
        .await
        .unwrap_err();
    match err {
        DbError::Core(CoreError::InsufficientStock { sku, .. }) => assert_eq!(sku, "BRG-B"),
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(stock_of(&db, &a.id).await, 10);
    assert_eq!(stock_of(&db, &b.id).await, 1);
    assert!(db.sales().list(&Default::default()).await.unwrap().is_empty());
    assert_eq!(db.stock().movements_for_product(&a.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_lines_are_checked_against_total_quantity() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 5).await;

    let err = db
        .sales()
        .create_sale(sale_of(&[(&a.id, 3, 1000), (&a.id, 3, 1000)]))
        .await
        .unwrap_err();
    match err {
        DbError::Core(CoreError::InsufficientStock { requested, available, .. }) => {
            assert_eq!(requested, 6);
            assert_eq!(available, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let sale = db
        .sales()
        .create_sale(sale_of(&[(&a.id, 2, 1000), (&a.id, 3, 900)]))
        .await
        .unwrap();
    assert_eq!(sale.total_amount_cents, 2000 + 2700);
    assert_eq!(stock_of(&db, &a.id).await, 0);
    assert_reconciles(&db).await;
}

#[tokio::test]
async fn stock_correction_books_compensating_movement() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;

    let movement = db
        .stock()
        .correct_stock(&a.id, 7, MovementMeta::referenced("OPN-01", "Stock take"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(movement.movement_type, MovementType::Out);
    assert_eq!(movement.quantity, 3);
    assert_eq!(stock_of(&db, &a.id).await, 7);

    let none = db.stock().correct_stock(&a.id, 7, MovementMeta::default()).await.unwrap();
    assert!(none.is_none());

    let movement = db
        .stock()
        .correct_stock(&a.id, 12, MovementMeta::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(movement.movement_type, MovementType::In);
    assert_eq!(movement.quantity, 5);

    let report = db.stock().reconcile(&a.id).await.unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.ledger_stock, 12);
}

#[tokio::test]
async fn product_with_sales_cannot_be_deleted() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;
    db.sales().create_sale(sale_of(&[(&a.id, 1, 1000)])).await.unwrap();

    let err = db.products().delete(&a.id, None).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::ProductInUse { .. })));
    assert!(db.products().get_by_id(&a.id).await.unwrap().is_some());
}

// =============================================================================
// Sale Properties
// =============================================================================

#[tokio::test]
async fn payments_sum_and_status_only_moves_forward() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;
    let sale = db.sales().create_sale(sale_of(&[(&a.id, 3, 1000)])).await.unwrap();

    let mut seen = vec![sale.status];
    for amount in [500, 1000, 1500, 250] {
        let (_, updated) = db.sales().add_payment(&sale.id, NewPayment::of(amount)).await.unwrap();
        seen.push(updated.status);

        // Total never changes after creation.
        assert_eq!(updated.total_amount_cents, 3000);
        assert_eq!(
            updated.paid_amount_cents,
            db.sales().get_total_paid(&sale.id).await.unwrap()
        );
    }

    assert_eq!(
        seen,
        vec![
            SaleStatus::Unpaid,
            SaleStatus::Partial,
            SaleStatus::Partial,
            SaleStatus::Paid,
            SaleStatus::Paid,
        ]
    );

    // Overpayment is kept, status stays paid.
    let stored = db.sales().require(&sale.id).await.unwrap();
    assert_eq!(stored.paid_amount_cents, 3250);
    assert_eq!(stored.status, SaleStatus::Paid);
}

#[tokio::test]
async fn non_positive_payment_is_rejected() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;
    let sale = db.sales().create_sale(sale_of(&[(&a.id, 1, 1000)])).await.unwrap();

    for amount in [0, -100] {
        let err = db.sales().add_payment(&sale.id, NewPayment::of(amount)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidAmount { .. })));
    }
    assert!(db.sales().get_payments(&sale.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn void_books_one_in_movement_per_item() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;
    let b = product(&db, "BRG-B", 10).await;
    let sale = db
        .sales()
        .create_sale(sale_of(&[(&a.id, 4, 1000), (&b.id, 1, 2500)]))
        .await
        .unwrap();

    db.sales().void_sale(&sale.id, Some("cashier-1")).await.unwrap();

    let movements = db.stock().movements_by_reference(&sale.invoice_number).await.unwrap();
    let ins: Vec<_> = movements
        .iter()
        .filter(|m| m.movement_type == MovementType::In)
        .collect();
    assert_eq!(ins.len(), 2);
    assert!(ins.iter().all(|m| m.user_id.as_deref() == Some("cashier-1")));
    assert_eq!(movements.len(), 4);

    assert_eq!(stock_of(&db, &a.id).await, 10);
    assert_eq!(stock_of(&db, &b.id).await, 10);
    assert_reconciles(&db).await;
}

#[tokio::test]
async fn void_restores_sold_quantity_despite_later_movements() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 20).await;

    let sale = db.sales().create_sale(sale_of(&[(&a.id, 5, 1000)])).await.unwrap();
    assert_eq!(stock_of(&db, &a.id).await, 15);

    db.stock().stock_out(&a.id, 4, MovementMeta::referenced("RUSAK-1", "Damaged")).await.unwrap();
    db.stock().stock_in(&a.id, 2, MovementMeta::referenced("PO-7", "Restock")).await.unwrap();
    assert_eq!(stock_of(&db, &a.id).await, 13);

    db.sales().void_sale(&sale.id, None).await.unwrap();
    // 20 - 5 sold - 4 + 2 + 5 restored
    assert_eq!(stock_of(&db, &a.id).await, 18);

    let err = db.sales().void_sale(&sale.id, None).await.unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::AlreadyVoided { .. })));
    assert_eq!(stock_of(&db, &a.id).await, 18);

    let restored: Vec<_> = db
        .stock()
        .movements_by_reference(&sale.invoice_number)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.movement_type == MovementType::In)
        .collect();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].quantity, 5);
    assert_reconciles(&db).await;
}

#[tokio::test]
async fn invoice_sequence_sorts_numerically_past_9999() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;
    let at = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();

    let first = db.sales().create_sale_at(sale_of(&[(&a.id, 1, 1000)]), at).await.unwrap();
    sqlx::query("UPDATE sales SET invoice_number = 'INV-2026-9999' WHERE id = ?1")
        .bind(&first.id)
        .execute(db.pool())
        .await
        .unwrap();

    let second = db.sales().create_sale_at(sale_of(&[(&a.id, 1, 1000)]), at).await.unwrap();
    assert_eq!(second.invoice_number, "INV-2026-10000");

    let third = db.sales().create_sale_at(sale_of(&[(&a.id, 1, 1000)]), at).await.unwrap();
    assert_eq!(third.invoice_number, "INV-2026-10001");
}

// =============================================================================
// Audit Trail
// =============================================================================

#[tokio::test]
async fn ledger_operations_write_audit_entries() {
    let db = memory_db().await;
    let a = product(&db, "BRG-A", 10).await;
    let sale = db.sales().create_sale(sale_of(&[(&a.id, 2, 1000)])).await.unwrap();
    db.sales().add_payment(&sale.id, NewPayment::of(500)).await.unwrap();
    db.sales().void_sale(&sale.id, None).await.unwrap();

    let trail = db.audit().list_for_target("sale", &sale.id).await.unwrap();
    let actions: Vec<_> = trail.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec![audit::SALE_CREATE, audit::PAYMENT_CREATE, audit::SALE_VOID]);

    let after = trail[1].after().unwrap().unwrap();
    assert_eq!(after["status"], "partial");
}

#[tokio::test]
async fn audit_can_be_switched_off() {
    let db = Database::new(DbConfig::in_memory().audit_enabled(false)).await.unwrap();
    let a = product(&db, "BRG-A", 10).await;
    db.sales().create_sale(sale_of(&[(&a.id, 2, 1000)])).await.unwrap();
    db.stock().stock_in(&a.id, 1, MovementMeta::default()).await.unwrap();

    assert_eq!(db.audit().count().await.unwrap(), 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_never_oversell() {
    let path = std::env::temp_dir().join(format!("stockroom-test-{}.db", uuid::Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(4)).await.unwrap();
    let a = product(&db, "BRG-A", 5).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let sales = db.sales();
        let input = sale_of(&[(&a.id, 1, 1000)]);
        handles.push(tokio::spawn(async move { sales.create_sale(input).await }));
    }

    let mut invoices = Vec::new();
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(sale) => invoices.push(sale.invoice_number),
            Err(DbError::Core(CoreError::InsufficientStock { .. })) => refused += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(invoices.len(), 5);
    assert_eq!(refused, 5);
    invoices.sort();
    invoices.dedup();
    assert_eq!(invoices.len(), 5);
    assert_eq!(stock_of(&db, &a.id).await, 0);
    assert_reconciles(&db).await;

    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}
