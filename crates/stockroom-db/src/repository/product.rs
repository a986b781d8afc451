//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Create with opening stock (booked as a ledger movement)
//! - Metadata and price edits (never stock)
//! - Listing with search, category and low-stock filters
//! - Delete, refused while sale items still reference the product
//!
//! ## Stock Is Not Editable Here
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ❌ UPDATE products SET current_stock = 7 WHERE id = ?                  │
//! │     (the ledger would no longer add up)                                 │
//! │                                                                         │
//! │  ✅ StockRepository::correct_stock(id, 7, meta)                         │
//! │     books `out 3` and moves the counter in the same transaction         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::audit::{self, AuditEvent};
use crate::repository::stock;
use crate::repository::{contains_pattern, LIKE_ESCAPE};
use stockroom_core::validation::{validate_new_product, validate_product_update};
use stockroom_core::ledger;
use stockroom_core::{
    CoreError, MovementMeta, MovementType, NewProduct, Product, ProductFilter, ProductUpdate,
    StockOverview,
};

/// Columns selected for every `Product` row.
pub(crate) const PRODUCT_COLUMNS: &str = "id, sku, name, description, category, unit, \
    base_price_cents, selling_price_cents, min_stock, current_stock, created_at, updated_at";

/// Notes on the movement booked for a new product's opening stock.
pub const OPENING_STOCK_NOTE: &str = "Opening stock";

/// Fetches a product by id on any executor (pool or open transaction).
pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.create(NewProduct { sku: "BRG-001".into(), .. }).await?;
/// let low = repo.list(&ProductFilter { low_stock: true, ..Default::default() }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    audit: bool,
}

impl ProductRepository {
    /// Creates a new ProductRepository with auditing on.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool, audit: true }
    }

    /// Turns audit entries for product changes on or off.
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    /// Creates a product.
    ///
    /// The product row starts at zero stock; a positive `opening_stock` is
    /// then booked as an `in` movement so the ledger reconciles from the
    /// first row.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Created product, `current_stock == opening_stock`
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        validate_new_product(&input).map_err(CoreError::from)?;

        let now = Utc::now();
        let mut product = Product {
            id: Uuid::new_v4().to_string(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            unit: input.unit.trim().to_string(),
            base_price_cents: input.base_price_cents,
            selling_price_cents: input.selling_price_cents,
            min_stock: input.min_stock,
            current_stock: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(sku = %product.sku, opening_stock = input.opening_stock, "Creating product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, category, unit,
                base_price_cents, selling_price_cents, min_stock, current_stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.unit)
        .bind(product.base_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.min_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("sku") => DbError::duplicate("sku", &product.sku),
            err => err,
        })?;

        if input.opening_stock > 0 {
            let meta = MovementMeta {
                unit_price_cents: Some(product.base_price_cents),
                notes: Some(OPENING_STOCK_NOTE.to_string()),
                user_id: input.user_id.clone(),
                ..Default::default()
            };
            stock::apply_movement(&mut tx, &product.id, MovementType::In, input.opening_stock, now)
                .await?;
            stock::insert_movement(
                &mut tx,
                &product.id,
                MovementType::In,
                input.opening_stock,
                &meta,
                now,
            )
            .await?;
            product.current_stock = input.opening_stock;
        }

        if self.audit {
            let event = AuditEvent::new(audit::PRODUCT_CREATE, "product", &product.id)
                .by(input.user_id.as_deref())
                .after(&product)?;
            audit::write_entry(&mut tx, event, now).await?;
        }

        tx.commit().await?;

        info!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Gets a product by ID, failing with `ProductNotFound`.
    pub async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets every product among `ids` that exists, in no particular order.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
        Ok(products)
    }

    /// Lists products, ordered by name.
    ///
    /// ## Filters
    /// - `search`: substring of SKU or name (case-insensitive for ASCII)
    /// - `category`: exact match
    /// - `low_stock`: only `current_stock <= min_stock`
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        debug!(?filter, "Listing products");

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"));

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = contains_pattern(search);
            qb.push(" AND (sku LIKE ")
                .push_bind(pattern.clone())
                .push(LIKE_ESCAPE)
                .push(" OR name LIKE ")
                .push_bind(pattern)
                .push(LIKE_ESCAPE)
                .push(")");
        }

        if let Some(category) = filter.category.as_deref() {
            qb.push(" AND category = ").push_bind(category);
        }

        if filter.low_stock {
            qb.push(" AND current_stock <= min_stock");
        }

        qb.push(" ORDER BY name, sku");

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Products at or below their reorder threshold.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        self.list(&ProductFilter {
            low_stock: true,
            ..Default::default()
        })
        .await
    }

    /// Inventory totals: product count, units in stock, stock value at
    /// selling price, and the low-stock list.
    ///
    /// ## Returns
    /// * `Err(CoreError::InvalidAmount)` - A total does not fit in `i64`
    pub async fn overview(&self) -> DbResult<StockOverview> {
        let products = self.list(&ProductFilter::default()).await?;
        let overview = ledger::overview(&products)?;

        debug!(
            total_products = overview.total_products,
            total_units = overview.total_units,
            total_value_cents = overview.total_value_cents,
            low_stock = overview.low_stock.len(),
            "Stock overview"
        );
        Ok(overview)
    }

    /// Distinct non-empty categories, sorted.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT category FROM products
            WHERE category IS NOT NULL AND category <> ''
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Updates product metadata and prices. Stock is left untouched.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The updated product
    /// * `Err(CoreError::ProductNotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, input: ProductUpdate) -> DbResult<Product> {
        validate_product_update(&input).map_err(CoreError::from)?;

        let before = self.require(id).await?;
        let now = Utc::now();

        debug!(product_id = %id, "Updating product");

        let after = Product {
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            description: input.description,
            category: input.category,
            unit: input.unit.trim().to_string(),
            base_price_cents: input.base_price_cents,
            selling_price_cents: input.selling_price_cents,
            min_stock: input.min_stock,
            updated_at: now,
            ..before.clone()
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                description = ?4,
                category = ?5,
                unit = ?6,
                base_price_cents = ?7,
                selling_price_cents = ?8,
                min_stock = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&after.sku)
        .bind(&after.name)
        .bind(&after.description)
        .bind(&after.category)
        .bind(&after.unit)
        .bind(after.base_price_cents)
        .bind(after.selling_price_cents)
        .bind(after.min_stock)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("sku") => DbError::duplicate("sku", &after.sku),
            err => err,
        })?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        // Re-read under the write lock so current_stock is current.
        let after = fetch_product(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if self.audit {
            let event = AuditEvent::new(audit::PRODUCT_UPDATE, "product", id)
                .by(input.user_id.as_deref())
                .before(&before)?
                .after(&after)?;
            audit::write_entry(&mut tx, event, now).await?;
        }

        tx.commit().await?;

        info!(product_id = %id, "Product updated");
        Ok(after)
    }

    /// Deletes a product and, by cascade, its movement history.
    ///
    /// ## Returns
    /// * `Err(CoreError::ProductInUse)` - Sale items still reference it
    /// * `Err(CoreError::ProductNotFound)` - Product doesn't exist
    pub async fn delete(&self, id: &str, user_id: Option<&str>) -> DbResult<()> {
        let product = self.require(id).await?;

        let sale_items = self.count_sale_items(id).await?;
        if sale_items > 0 {
            warn!(product_id = %id, sale_items, "Refusing to delete product in use");
            return Err(CoreError::ProductInUse {
                sku: product.sku,
                sale_items,
            }
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                // A sale item was added between the check and the delete.
                DbError::ForeignKeyViolation { .. } => DbError::Core(CoreError::ProductInUse {
                    sku: product.sku.clone(),
                    sale_items: 1,
                }),
                err => err,
            })?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        if self.audit {
            let event = AuditEvent::new(audit::PRODUCT_DELETE, "product", id)
                .by(user_id)
                .before(&product)?
                .after(&json!({ "deleted": true }))?;
            audit::write_entry(&mut tx, event, now).await?;
        }

        tx.commit().await?;

        info!(product_id = %id, sku = %product.sku, "Product deleted");
        Ok(())
    }

    /// Number of sale items referencing a product.
    pub async fn count_sale_items(&self, id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE product_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
