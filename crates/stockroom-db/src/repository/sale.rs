//! # Sale Repository
//!
//! Database operations for sales, sale items and payments.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create_sale() → Sale { status: Unpaid, paid: 0 }               │
//! │         one transaction:                                               │
//! │           stock debits (out movement per item, ref = invoice)          │
//! │           next invoice number → INSERT sale → INSERT items             │
//! │                                                                         │
//! │  2. PAY (any number of times)                                          │
//! │     └── add_payment() → Unpaid → Partial → Paid                        │
//! │                                                                         │
//! │  3. (OPTIONAL) VOID                                                    │
//! │     └── void_sale() → Sale { status: Voided }                          │
//! │         in movement per item restores stock; payments stay             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking Order
//! Every write transaction here starts with a write statement, so SQLite
//! hands out the write lock before anything is read inside it. In
//! `create_sale` the stock debits come first, which also means the invoice
//! sequence is read while holding the lock.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::audit::{self, AuditEvent};
use crate::repository::invoice;
use crate::repository::product::ProductRepository;
use crate::repository::stock;
use crate::repository::{contains_pattern, LIKE_ESCAPE};
use stockroom_core::invoice::invoice_year;
use stockroom_core::sale::{self as rules, SalePlan};
use stockroom_core::validation::validate_new_payment;
use stockroom_core::{
    CoreError, Money, MovementMeta, MovementType, NewPayment, NewSale, Payment, Sale, SaleDetail,
    SaleFilter, SaleItem, SaleItemLine, SaleStatus, DEFAULT_INVOICE_RETRY_ATTEMPTS,
};

const SALE_COLUMNS: &str = "id, invoice_number, customer_name, customer_phone, \
    total_amount_cents, paid_amount_cents, status, due_date, notes, user_id, \
    created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, sale_id, amount_cents, payment_method, payment_date, notes, user_id, created_at";

/// Notes on the `out` movement booked for a sale line.
pub fn sale_movement_note(invoice_number: &str) -> String {
    format!("Sale {invoice_number}")
}

/// Notes on the `in` movement booked when a sale is voided.
pub fn void_movement_note(invoice_number: &str) -> String {
    format!("Void {invoice_number}")
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    audit: bool,
    invoice_retry_attempts: u32,
}

impl SaleRepository {
    /// Creates a new SaleRepository with auditing on and the default
    /// invoice retry budget.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository {
            pool,
            audit: true,
            invoice_retry_attempts: DEFAULT_INVOICE_RETRY_ATTEMPTS,
        }
    }

    /// Turns audit entries for sale changes on or off.
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    /// Sets how many times creation is attempted on an invoice collision.
    pub fn with_invoice_retry_attempts(mut self, attempts: u32) -> Self {
        self.invoice_retry_attempts = attempts.max(1);
        self
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates a sale, debiting stock for every item.
    ///
    /// ## What This Does
    /// 1. Validates the input and checks stock for every product (summing
    ///    lines that repeat a product), before any write
    /// 2. In one transaction: debits stock with an `out` movement per
    ///    item, draws the next invoice number, inserts the sale (unpaid,
    ///    nothing paid) and its items with snapshot prices
    /// 3. Retries the transaction if another writer took the same invoice
    ///    number
    ///
    /// ## Returns
    /// * `Ok(Sale)` - The created sale
    /// * `Err(CoreError::InsufficientStock)` - Names the product; nothing written
    /// * `Err(CoreError::EmptySale | InvalidQuantity | ProductNotFound)`
    pub async fn create_sale(&self, input: NewSale) -> DbResult<Sale> {
        self.create_sale_at(input, Utc::now()).await
    }

    /// Same as [`create_sale`](Self::create_sale) with an explicit
    /// timestamp, which also picks the invoice year.
    pub async fn create_sale_at(&self, input: NewSale, now: DateTime<Utc>) -> DbResult<Sale> {
        let mut ids: Vec<String> = input.items.iter().map(|i| i.product_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let products = ProductRepository::new(self.pool.clone()).get_many(&ids).await?;
        let plan = rules::plan_sale(&input, &products)?;

        debug!(
            lines = plan.lines.len(),
            total_cents = plan.total.cents(),
            "Sale planned"
        );

        let attempts = self.invoice_retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.write_sale(&input, &plan, now).await {
                Err(err) if err.is_unique_violation_on("invoice_number") && attempt < attempts => {
                    warn!(attempt, attempts, "Invoice number taken, retrying sale");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn write_sale(&self, input: &NewSale, plan: &SalePlan, now: DateTime<Utc>) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        // Stock first: takes the write lock before the sequence is read.
        for line in &plan.lines {
            stock::apply_movement(&mut tx, &line.product_id, MovementType::Out, line.quantity, now)
                .await?;
        }

        let invoice_number = invoice::next_invoice_number(&mut *tx, invoice_year(now)).await?;

        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            customer_name: input.customer_name.clone(),
            customer_phone: input.customer_phone.clone(),
            total_amount_cents: plan.total.cents(),
            paid_amount_cents: 0,
            status: SaleStatus::Unpaid,
            due_date: input.due_date,
            notes: input.notes.clone(),
            user_id: input.user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, customer_name, customer_phone,
                total_amount_cents, paid_amount_cents, status,
                due_date, notes, user_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.invoice_number)
        .bind(&sale.customer_name)
        .bind(&sale.customer_phone)
        .bind(sale.total_amount_cents)
        .bind(sale.paid_amount_cents)
        .bind(sale.status)
        .bind(sale.due_date)
        .bind(&sale.notes)
        .bind(&sale.user_id)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                subtotal_cents: line.subtotal.cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, quantity, unit_price_cents, subtotal_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.subtotal_cents)
            .execute(&mut *tx)
            .await?;

            let meta = MovementMeta {
                unit_price_cents: Some(item.unit_price_cents),
                reference: Some(sale.invoice_number.clone()),
                notes: Some(sale_movement_note(&sale.invoice_number)),
                transaction_date: Some(now),
                user_id: sale.user_id.clone(),
            };
            stock::insert_movement(&mut tx, &item.product_id, MovementType::Out, item.quantity, &meta, now)
                .await?;

            items.push(item);
        }

        if self.audit {
            let event = AuditEvent::new(audit::SALE_CREATE, "sale", &sale.id)
                .by(sale.user_id.as_deref())
                .after(&json!({ "sale": &sale, "items": &items }))?;
            audit::write_entry(&mut tx, event, now).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice_number = %sale.invoice_number,
            items = items.len(),
            total_cents = sale.total_amount_cents,
            "Sale created"
        );
        Ok(sale)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records a payment and advances the sale status.
    ///
    /// ## Returns
    /// * `Ok((Payment, Sale))` - The payment and the updated sale
    /// * `Err(CoreError::InvalidAmount)` - `amount <= 0`
    /// * `Err(CoreError::SaleVoided)` - Sale is voided
    /// * `Err(DbError::ConcurrentModification)` - Sale changed since it was read
    pub async fn add_payment(&self, sale_id: &str, input: NewPayment) -> DbResult<(Payment, Sale)> {
        validate_new_payment(&input)?;

        let sale = self.require(sale_id).await?;
        let settlement = rules::settle(&sale, Money::from_cents(input.amount_cents))?;

        debug!(
            sale_id = %sale_id,
            amount_cents = input.amount_cents,
            from = %sale.status,
            to = %settlement.status,
            "Applying payment"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET paid_amount_cents = ?2, status = ?3, updated_at = ?4
            WHERE id = ?1 AND paid_amount_cents = ?5 AND status = ?6
            "#,
        )
        .bind(sale_id)
        .bind(settlement.paid_amount.cents())
        .bind(settlement.status)
        .bind(now)
        .bind(sale.paid_amount_cents)
        .bind(sale.status)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!(sale_id = %sale_id, "Sale changed while applying payment");
            return Err(DbError::concurrent("Sale", sale_id));
        }

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            amount_cents: input.amount_cents,
            payment_method: input.payment_method,
            payment_date: input.payment_date.unwrap_or(now),
            notes: input.notes,
            user_id: input.user_id,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, sale_id, amount_cents, payment_method, payment_date,
                notes, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.sale_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_method)
        .bind(payment.payment_date)
        .bind(&payment.notes)
        .bind(&payment.user_id)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        let updated = Sale {
            paid_amount_cents: settlement.paid_amount.cents(),
            status: settlement.status,
            updated_at: now,
            ..sale.clone()
        };

        if self.audit {
            let event = AuditEvent::new(audit::PAYMENT_CREATE, "sale", sale_id)
                .by(payment.user_id.as_deref())
                .before(&json!({
                    "paid_amount_cents": sale.paid_amount_cents,
                    "status": sale.status,
                }))?
                .after(&json!({
                    "paid_amount_cents": updated.paid_amount_cents,
                    "status": updated.status,
                    "payment": &payment,
                }))?;
            audit::write_entry(&mut tx, event, now).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            payment_id = %payment.id,
            amount_cents = payment.amount_cents,
            status = %updated.status,
            "Payment recorded"
        );
        Ok((payment, updated))
    }

    // =========================================================================
    // Void
    // =========================================================================

    /// Voids a sale and restores the stock of every item.
    ///
    /// Payments are kept as a financial record.
    ///
    /// ## Returns
    /// * `Ok(Sale)` - The voided sale
    /// * `Err(CoreError::SaleNotFound)` - No such sale
    /// * `Err(CoreError::AlreadyVoided)` - Sale was voided before
    pub async fn void_sale(&self, sale_id: &str, user_id: Option<&str>) -> DbResult<Sale> {
        let sale = self.require(sale_id).await?;
        rules::ensure_voidable(&sale)?;
        let items = self.get_items(sale_id).await?;

        debug!(sale_id = %sale_id, invoice_number = %sale.invoice_number, "Voiding sale");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE sales SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status <> ?2",
        )
        .bind(sale_id)
        .bind(SaleStatus::Voided)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::AlreadyVoided {
                invoice_number: sale.invoice_number,
            }
            .into());
        }

        let note = void_movement_note(&sale.invoice_number);
        for item in &items {
            let meta = MovementMeta {
                unit_price_cents: Some(item.unit_price_cents),
                reference: Some(sale.invoice_number.clone()),
                notes: Some(note.clone()),
                transaction_date: Some(now),
                user_id: user_id.map(str::to_string),
            };
            stock::apply_movement(&mut tx, &item.product_id, MovementType::In, item.quantity, now)
                .await?;
            stock::insert_movement(&mut tx, &item.product_id, MovementType::In, item.quantity, &meta, now)
                .await?;
        }

        let voided = Sale {
            status: SaleStatus::Voided,
            updated_at: now,
            ..sale.clone()
        };

        if self.audit {
            let event = AuditEvent::new(audit::SALE_VOID, "sale", sale_id)
                .by(user_id)
                .before(&sale)?
                .after(&json!({ "sale": &voided, "restored_items": &items }))?;
            audit::write_entry(&mut tx, event, now).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            invoice_number = %voided.invoice_number,
            items = items.len(),
            "Sale voided"
        );
        Ok(voided)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale by ID, failing with `SaleNotFound`.
    pub async fn require(&self, id: &str) -> DbResult<Sale> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()).into())
    }

    /// Gets a sale by its invoice number.
    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE invoice_number = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets the items of a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price_cents, subtotal_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the payments of a sale, ordered by payment date.
    pub async fn get_payments(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE sale_id = ?1 \
             ORDER BY payment_date, created_at, rowid"
        );
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(payments)
    }

    /// Sum of recorded payments for a sale.
    pub async fn get_total_paid(&self, sale_id: &str) -> DbResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    /// Sale with its items (joined with product display fields) and
    /// payments.
    pub async fn get_detail(&self, sale_id: &str) -> DbResult<SaleDetail> {
        let sale = self.require(sale_id).await?;

        let items = sqlx::query_as::<_, SaleItemLine>(
            r#"
            SELECT
                i.id, i.product_id, i.quantity, i.unit_price_cents, i.subtotal_cents,
                p.sku AS product_sku, p.name AS product_name, p.unit AS product_unit
            FROM sale_items i
            LEFT JOIN products p ON p.id = i.product_id
            WHERE i.sale_id = ?1
            ORDER BY i.rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        let payments = self.get_payments(sale_id).await?;

        Ok(SaleDetail {
            sale,
            items,
            payments,
        })
    }

    /// Lists sales, newest first.
    ///
    /// ## Filters
    /// - `statuses`: any of these (empty means all)
    /// - `search`: substring of invoice number or customer name
    /// - `start_date` / `end_date`: inclusive bounds on `created_at`
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        debug!(?filter, "Listing sales");

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales WHERE 1 = 1"));

        if !filter.statuses.is_empty() {
            qb.push(" AND status IN (");
            let mut separated = qb.separated(", ");
            for status in &filter.statuses {
                separated.push_bind(*status);
            }
            separated.push_unseparated(")");
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            qb.push(" AND (invoice_number LIKE ")
                .push_bind(pattern.clone())
                .push(LIKE_ESCAPE)
                .push(" OR customer_name LIKE ")
                .push_bind(pattern)
                .push(LIKE_ESCAPE)
                .push(")");
        }

        if let Some(start) = filter.start_date {
            qb.push(" AND created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND created_at <= ").push_bind(end);
        }

        qb.push(" ORDER BY created_at DESC, rowid DESC");

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    /// Sales with money still owed (unpaid or partial), newest first.
    pub async fn unpaid(&self) -> DbResult<Vec<Sale>> {
        self.list(&SaleFilter {
            statuses: vec![SaleStatus::Unpaid, SaleStatus::Partial],
            ..Default::default()
        })
        .await
    }

    /// Fully paid sales, newest first.
    pub async fn paid(&self) -> DbResult<Vec<Sale>> {
        self.list(&SaleFilter {
            statuses: vec![SaleStatus::Paid],
            ..Default::default()
        })
        .await
    }

    /// Invoice number the next sale created at `at` would receive.
    ///
    /// Informational only: a concurrent sale may take it first.
    pub async fn peek_next_invoice_number(&self, at: DateTime<Utc>) -> DbResult<String> {
        invoice::next_invoice_number(&self.pool, invoice_year(at)).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;
    use stockroom_core::{NewProduct, PaymentMethod, SaleLine};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(NewProduct {
                sku: "BRG-A".to_string(),
                name: "Product A".to_string(),
                unit: "pcs".to_string(),
                base_price_cents: 800,
                selling_price_cents: 1000,
                opening_stock: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        (db, product.id)
    }

    fn one_line(product_id: &str, quantity: i64) -> NewSale {
        NewSale {
            customer_name: Some("Budi".to_string()),
            items: vec![SaleLine {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents: 1000,
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_sale_writes_items_and_movements() {
        let (db, id) = setup().await;
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let sale = db.sales().create_sale_at(one_line(&id, 3), at).await.unwrap();
        assert_eq!(sale.invoice_number, "INV-2026-0001");
        assert_eq!(sale.total_amount_cents, 3000);
        assert_eq!(sale.status, SaleStatus::Unpaid);

        let detail = db.sales().get_detail(&sale.id).await.unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].product_sku.as_deref(), Some("BRG-A"));
        assert!(detail.payments.is_empty());

        let movements = db.stock().movements_by_reference(&sale.invoice_number).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Out);
        assert_eq!(movements[0].notes.as_deref(), Some("Sale INV-2026-0001"));

        assert_eq!(db.products().require(&id).await.unwrap().current_stock, 7);
    }

    #[tokio::test]
    async fn test_invoice_numbers_increment_per_year() {
        let (db, id) = setup().await;
        let march = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let next_year = Utc.with_ymd_and_hms(2027, 1, 2, 9, 0, 0).unwrap();

        let a = db.sales().create_sale_at(one_line(&id, 1), march).await.unwrap();
        let b = db.sales().create_sale_at(one_line(&id, 1), march).await.unwrap();
        let c = db.sales().create_sale_at(one_line(&id, 1), next_year).await.unwrap();

        assert_eq!(a.invoice_number, "INV-2026-0001");
        assert_eq!(b.invoice_number, "INV-2026-0002");
        assert_eq!(c.invoice_number, "INV-2027-0001");
        assert_eq!(
            db.sales().peek_next_invoice_number(march).await.unwrap(),
            "INV-2026-0003"
        );
    }

    #[tokio::test]
    async fn test_payments_progress_status() {
        let (db, id) = setup().await;
        let sale = db.sales().create_sale(one_line(&id, 2)).await.unwrap();

        let (payment, sale_after) = db
            .sales()
            .add_payment(&sale.id, NewPayment::of(500).method(PaymentMethod::Cash))
            .await
            .unwrap();
        assert_eq!(payment.payment_method, Some(PaymentMethod::Cash));
        assert_eq!(sale_after.status, SaleStatus::Partial);

        let (_, sale_after) = db.sales().add_payment(&sale.id, NewPayment::of(1500)).await.unwrap();
        assert_eq!(sale_after.status, SaleStatus::Paid);
        assert_eq!(sale_after.paid_amount_cents, 2000);

        let stored = db.sales().require(&sale.id).await.unwrap();
        assert_eq!(stored.status, SaleStatus::Paid);
        assert_eq!(db.sales().get_total_paid(&sale.id).await.unwrap(), 2000);
    }

    #[tokio::test]
    async fn test_void_restores_stock_and_blocks_payments() {
        let (db, id) = setup().await;
        let sale = db.sales().create_sale(one_line(&id, 4)).await.unwrap();
        db.sales().add_payment(&sale.id, NewPayment::of(1000)).await.unwrap();

        let voided = db.sales().void_sale(&sale.id, Some("u-1")).await.unwrap();
        assert_eq!(voided.status, SaleStatus::Voided);
        assert_eq!(db.products().require(&id).await.unwrap().current_stock, 10);

        // Payments are kept.
        assert_eq!(db.sales().get_payments(&sale.id).await.unwrap().len(), 1);

        let err = db.sales().add_payment(&sale.id, NewPayment::of(100)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::SaleVoided { .. })));

        let err = db.sales().void_sale(&sale.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::AlreadyVoided { .. })));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, id) = setup().await;
        let first = db.sales().create_sale(one_line(&id, 1)).await.unwrap();
        let second = db.sales().create_sale(one_line(&id, 1)).await.unwrap();
        db.sales().add_payment(&second.id, NewPayment::of(1000)).await.unwrap();

        let all = db.sales().list(&SaleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let unpaid = db.sales().unpaid().await.unwrap();
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0].id, first.id);

        let paid = db.sales().paid().await.unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].id, second.id);

        let search = SaleFilter {
            search: Some(second.invoice_number.clone()),
            ..Default::default()
        };
        assert_eq!(db.sales().list(&search).await.unwrap().len(), 1);

        let by_customer = SaleFilter {
            search: Some("bud".to_string()),
            ..Default::default()
        };
        assert_eq!(db.sales().list(&by_customer).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_sale() {
        let (db, _) = setup().await;
        let err = db.sales().add_payment("missing", NewPayment::of(100)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::SaleNotFound(_))));
    }
}
