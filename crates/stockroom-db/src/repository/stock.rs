//! # Stock Repository
//!
//! The stock transaction recorder: every change to `current_stock` goes
//! through here as a movement row plus a relative counter update.
//!
//! ## Relative, Conditional Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, compute, write back                                    │
//! │     SELECT current_stock → 10                                          │
//! │     UPDATE products SET current_stock = 7        (lost update race)    │
//! │                                                                         │
//! │  ✅ CORRECT: let the engine evaluate the guard                          │
//! │     UPDATE products                                                    │
//! │        SET current_stock = current_stock - 3                           │
//! │      WHERE id = ? AND current_stock >= 3                               │
//! │                                                                         │
//! │     0 rows affected → product missing or stock insufficient            │
//! │     (and CHECK (current_stock >= 0) backs it up)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The counter update and the movement insert always share a transaction;
//! callers that compose larger operations (sales, voids) use the
//! connection-level helpers on their own transaction.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::audit::{self, AuditEvent};
use crate::repository::product::fetch_product;
use stockroom_core::ledger::{self, StockReconciliation};
use stockroom_core::validation::{validate_movement_meta, validate_quantity};
use stockroom_core::{
    CoreError, MovementFilter, MovementMeta, MovementRecord, MovementType, StockMovement,
    DEFAULT_HISTORY_LIMIT,
};

/// Notes on a correction movement when the caller gives none.
pub const CORRECTION_NOTE: &str = "Stock correction";

const MOVEMENT_COLUMNS: &str = "id, product_id, movement_type, quantity, unit_price_cents, \
    reference, notes, transaction_date, user_id, created_at";

const RECONCILIATION_SQL: &str = r#"
    SELECT
        p.id AS product_id,
        p.sku AS sku,
        p.current_stock AS recorded_stock,
        COALESCE(SUM(CASE m.movement_type
            WHEN 'in' THEN m.quantity
            ELSE -m.quantity
        END), 0) AS ledger_stock
    FROM products p
    LEFT JOIN stock_movements m ON m.product_id = p.id
"#;

// =============================================================================
// Connection-level helpers
// =============================================================================

/// Moves a product's counter by `quantity` in `movement_type`'s direction.
///
/// `out` only succeeds when enough stock remains and `in` only when the
/// counter stays within `i64`; both checks are part of the UPDATE itself.
///
/// ## Returns
/// * `Err(CoreError::ProductNotFound)` - No such product
/// * `Err(CoreError::InsufficientStock)` - `out` larger than current stock
/// * `Err(CoreError::InvalidQuantity)` - `in` would overflow the counter
pub(crate) async fn apply_movement(
    conn: &mut SqliteConnection,
    product_id: &str,
    movement_type: MovementType,
    quantity: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    validate_quantity(quantity)?;

    let sql = match movement_type {
        MovementType::In => {
            // SQLite turns an overflowing integer sum into REAL.
            "UPDATE products SET current_stock = current_stock + ?2, updated_at = ?3 \
             WHERE id = ?1 AND current_stock <= 9223372036854775807 - ?2"
        }
        MovementType::Out => {
            "UPDATE products SET current_stock = current_stock - ?2, updated_at = ?3 \
             WHERE id = ?1 AND current_stock >= ?2"
        }
    };

    let result = sqlx::query(sql)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(match fetch_product(&mut *conn, product_id).await? {
            None => CoreError::ProductNotFound(product_id.to_string()),
            Some(product) => match ledger::check_movement(&product, movement_type, quantity) {
                Err(err) => err,
                Ok(_) => ledger::insufficient(&product, quantity),
            },
        }
        .into());
    }

    Ok(())
}

/// Appends one movement row.
pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    product_id: &str,
    movement_type: MovementType,
    quantity: i64,
    meta: &MovementMeta,
    now: DateTime<Utc>,
) -> DbResult<StockMovement> {
    let movement = StockMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        movement_type,
        quantity,
        unit_price_cents: meta.unit_price_cents,
        reference: meta.reference.clone(),
        notes: meta.notes.clone(),
        transaction_date: meta.transaction_date.unwrap_or(now),
        user_id: meta.user_id.clone(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, movement_type, quantity, unit_price_cents,
            reference, notes, transaction_date, user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(movement.unit_price_cents)
    .bind(&movement.reference)
    .bind(&movement.notes)
    .bind(movement.transaction_date)
    .bind(&movement.user_id)
    .bind(movement.created_at)
    .execute(conn)
    .await?;

    Ok(movement)
}

async fn current_stock(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let stock: i64 = sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_one(conn)
        .await?;

    Ok(stock)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the stock ledger.
///
/// ## Usage
/// ```rust,ignore
/// let stock = db.stock();
///
/// stock.stock_in(&product_id, 24, MovementMeta::referenced("PO-0042", "Weekly restock")).await?;
/// stock.correct_stock(&product_id, 19, MovementMeta::default()).await?;
/// let drift = stock.find_drift().await?;
/// ```
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
    audit: bool,
}

impl StockRepository {
    /// Creates a new StockRepository with auditing on.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool, audit: true }
    }

    /// Turns audit entries for stock changes on or off.
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    /// Records a stock movement and moves the counter, atomically.
    ///
    /// ## Arguments
    /// * `product_id` - Product to move
    /// * `movement_type` - `In` adds, `Out` removes
    /// * `quantity` - Positive number of units
    /// * `meta` - Reference, notes, price, date, user
    ///
    /// ## Returns
    /// * `Ok(StockMovement)` - The stored movement
    /// * `Err(CoreError::InvalidQuantity)` - `quantity <= 0`
    /// * `Err(CoreError::InsufficientStock)` - `out` exceeds stock; nothing written
    pub async fn record_movement(
        &self,
        product_id: &str,
        movement_type: MovementType,
        quantity: i64,
        meta: MovementMeta,
    ) -> DbResult<StockMovement> {
        validate_quantity(quantity)?;
        validate_movement_meta(&meta).map_err(CoreError::from)?;

        debug!(
            product_id = %product_id,
            movement_type = %movement_type,
            quantity,
            "Recording stock movement"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        apply_movement(&mut tx, product_id, movement_type, quantity, now).await?;
        let movement = insert_movement(&mut tx, product_id, movement_type, quantity, &meta, now).await?;

        if self.audit {
            let stock_after = current_stock(&mut tx, product_id).await?;
            let action = match movement_type {
                MovementType::In => audit::STOCK_IN,
                MovementType::Out => audit::STOCK_OUT,
            };
            let event = AuditEvent::new(action, "product", product_id)
                .by(meta.user_id.as_deref())
                .before(&json!({ "current_stock": stock_after - movement.signed_quantity() }))?
                .after(&json!({ "current_stock": stock_after, "movement": &movement }))?;
            audit::write_entry(&mut tx, event, now).await?;
        }

        tx.commit().await?;

        info!(
            product_id = %product_id,
            movement_id = %movement.id,
            movement_type = %movement_type,
            quantity,
            "Stock movement recorded"
        );
        Ok(movement)
    }

    /// Records goods received.
    pub async fn stock_in(&self, product_id: &str, quantity: i64, meta: MovementMeta) -> DbResult<StockMovement> {
        self.record_movement(product_id, MovementType::In, quantity, meta).await
    }

    /// Records goods removed outside of a sale (damage, write-off, ...).
    pub async fn stock_out(&self, product_id: &str, quantity: i64, meta: MovementMeta) -> DbResult<StockMovement> {
        self.record_movement(product_id, MovementType::Out, quantity, meta).await
    }

    /// Brings a product's stock to `target` (a stock take) by booking the
    /// difference as a movement.
    ///
    /// ## Returns
    /// * `Ok(None)` - Already at `target`, nothing written
    /// * `Ok(Some(StockMovement))` - The compensating movement
    /// * `Err(DbError::ConcurrentModification)` - Stock moved since it was read
    pub async fn correct_stock(
        &self,
        product_id: &str,
        target: i64,
        mut meta: MovementMeta,
    ) -> DbResult<Option<StockMovement>> {
        validate_movement_meta(&meta).map_err(CoreError::from)?;

        let product = fetch_product(&self.pool, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let Some((movement_type, quantity)) = ledger::correction_for(product.current_stock, target)? else {
            debug!(product_id = %product_id, target, "Stock already at target");
            return Ok(None);
        };

        if meta.notes.is_none() {
            meta.notes = Some(CORRECTION_NOTE.to_string());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE products SET current_stock = ?2, updated_at = ?3 WHERE id = ?1 AND current_stock = ?4",
        )
        .bind(product_id)
        .bind(target)
        .bind(now)
        .bind(product.current_stock)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::concurrent("Product", product_id));
        }

        let movement = insert_movement(&mut tx, product_id, movement_type, quantity, &meta, now).await?;

        if self.audit {
            let event = AuditEvent::new(audit::STOCK_CORRECT, "product", product_id)
                .by(meta.user_id.as_deref())
                .before(&json!({ "current_stock": product.current_stock }))?
                .after(&json!({ "current_stock": target, "movement": &movement }))?;
            audit::write_entry(&mut tx, event, now).await?;
        }

        tx.commit().await?;

        info!(
            product_id = %product_id,
            from = product.current_stock,
            to = target,
            "Stock corrected"
        );
        Ok(Some(movement))
    }

    /// Movement history joined with product display fields, newest first.
    ///
    /// ## Filters
    /// - `product_id`, `movement_type`: exact match
    /// - `start_date` / `end_date`: inclusive bounds on `transaction_date`
    /// - `limit`: defaults to 50
    pub async fn history(&self, filter: &MovementFilter) -> DbResult<Vec<MovementRecord>> {
        let limit = filter.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT
                m.id, m.product_id, m.movement_type, m.quantity, m.unit_price_cents,
                m.reference, m.notes, m.transaction_date, m.user_id,
                p.sku AS product_sku, p.name AS product_name, p.unit AS product_unit
            FROM stock_movements m
            LEFT JOIN products p ON p.id = m.product_id
            WHERE 1 = 1
            "#,
        );

        if let Some(product_id) = filter.product_id.as_deref() {
            qb.push(" AND m.product_id = ").push_bind(product_id);
        }
        if let Some(movement_type) = filter.movement_type {
            qb.push(" AND m.movement_type = ").push_bind(movement_type);
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND m.transaction_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND m.transaction_date <= ").push_bind(end);
        }

        qb.push(" ORDER BY m.transaction_date DESC, m.created_at DESC, m.rowid DESC LIMIT ")
            .push_bind(limit);

        let records = qb.build_query_as::<MovementRecord>().fetch_all(&self.pool).await?;

        debug!(count = records.len(), limit, "Loaded movement history");
        Ok(records)
    }

    /// Every movement of one product, oldest first.
    pub async fn movements_for_product(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE product_id = ?1 \
             ORDER BY created_at, rowid"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements carrying a document reference (e.g. an invoice number),
    /// oldest first.
    pub async fn movements_by_reference(&self, reference: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE reference = ?1 \
             ORDER BY created_at, rowid"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(reference)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Compares one product's counter with its ledger.
    pub async fn reconcile(&self, product_id: &str) -> DbResult<StockReconciliation> {
        let sql = format!("{RECONCILIATION_SQL} WHERE p.id = ?1 GROUP BY p.id");
        sqlx::query_as::<_, StockReconciliation>(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }

    /// Compares every product's counter with its ledger, ordered by SKU.
    pub async fn reconcile_all(&self) -> DbResult<Vec<StockReconciliation>> {
        let sql = format!("{RECONCILIATION_SQL} GROUP BY p.id ORDER BY p.sku");
        let reports = sqlx::query_as::<_, StockReconciliation>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(reports)
    }

    /// Products whose counter disagrees with their ledger.
    pub async fn find_drift(&self) -> DbResult<Vec<StockReconciliation>> {
        let drift: Vec<_> = self
            .reconcile_all()
            .await?
            .into_iter()
            .filter(|r| !r.is_consistent())
            .collect();

        if !drift.is_empty() {
            warn!(products = drift.len(), "Stock ledger drift detected");
        }
        Ok(drift)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
