//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  StockMovement  │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product_id     │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  in | out       │   │  invoice_number │       │
//! │  │  current_stock  │   │  quantity > 0   │   │  total / paid   │       │
//! │  └─────────────────┘   └─────────────────┘   │  status         │       │
//! │          ▲                                   └─────────────────┘       │
//! │          │             ┌─────────────────┐      ▲          ▲           │
//! │          └─────────────│    SaleItem     │──────┘          │           │
//! │                        │  price snapshot │   ┌─────────────────┐       │
//! │                        └─────────────────┘   │    Payment      │       │
//! │                                              │  amount > 0     │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, invoice_number) - human-readable, unique

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Movement Type
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Goods entering the stockroom (purchase, return, void restoration).
    In,
    /// Goods leaving the stockroom (sale, write-off).
    Out,
}

impl MovementType {
    /// Returns the stored string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
        }
    }

    /// Returns the signed stock delta for a quantity moving this way.
    #[inline]
    pub const fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementType::In => quantity,
            MovementType::Out => -quantity,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MovementType::In),
            "out" => Ok(MovementType::Out),
            other => Err(CoreError::UnknownVariant {
                kind: "movement type",
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The payment status of a sale.
///
/// See [`crate::sale`] for the transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Nothing paid yet.
    Unpaid,
    /// Some, but not all, of the total paid.
    Partial,
    /// Paid in full (or overpaid).
    Paid,
    /// Cancelled; stock restored. Terminal.
    Voided,
}

impl SaleStatus {
    /// Returns the stored string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Unpaid => "unpaid",
            SaleStatus::Partial => "partial",
            SaleStatus::Paid => "paid",
            SaleStatus::Voided => "voided",
        }
    }

    /// Position along `unpaid → partial → paid`. Voided sits past the end.
    pub(crate) const fn rank(&self) -> u8 {
        match self {
            SaleStatus::Unpaid => 0,
            SaleStatus::Partial => 1,
            SaleStatus::Paid => 2,
            SaleStatus::Voided => 3,
        }
    }

    /// Whether money is still owed (unpaid or partial).
    pub const fn is_outstanding(&self) -> bool {
        matches!(self, SaleStatus::Unpaid | SaleStatus::Partial)
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Unpaid
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(SaleStatus::Unpaid),
            "partial" => Ok(SaleStatus::Partial),
            "paid" => Ok(SaleStatus::Paid),
            "voided" => Ok(SaleStatus::Voided),
            other => Err(CoreError::UnknownVariant {
                kind: "sale status",
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash at the counter.
    Cash,
    /// Bank transfer.
    Transfer,
    /// QRIS (Indonesian standard QR payment).
    Qris,
    /// Debit card.
    Debit,
    /// Credit card.
    Credit,
    /// Anything else.
    Other,
}

impl PaymentMethod {
    /// Returns the stored string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Qris => "qris",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Other => "other",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" => Ok(PaymentMethod::Transfer),
            "qris" => Ok(PaymentMethod::Qris),
            "debit" => Ok(PaymentMethod::Debit),
            "credit" => Ok(PaymentMethod::Credit),
            "other" => Ok(PaymentMethod::Other),
            other => Err(CoreError::UnknownVariant {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
///
/// `current_stock` is only ever changed through stock movements; see
/// [`crate::ledger`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    pub description: Option<String>,

    pub category: Option<String>,

    /// Display unit: pcs, kg, box, ...
    pub unit: String,

    /// Purchase price in cents.
    pub base_price_cents: i64,

    /// Selling price in cents (default unit price on new sales).
    pub selling_price_cents: i64,

    /// Reorder threshold.
    pub min_stock: i64,

    /// Current stock level, never negative.
    pub current_stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the base price as Money.
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    /// Returns the selling price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Stock is at or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }

    /// `current_stock × selling_price`, or `None` on overflow.
    pub fn stock_value(&self) -> Option<Money> {
        self.selling_price().checked_mul_quantity(self.current_stock)
    }
}

/// Inventory totals for the stock overview screen.
///
/// Built by [`crate::ledger::overview`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockOverview {
    pub total_products: i64,
    /// Σ `current_stock` over all products.
    pub total_units: i64,
    /// Σ `current_stock × selling_price_cents`.
    pub total_value_cents: i64,
    pub low_stock: Vec<Product>,
}

impl StockOverview {
    /// Returns the total stock value as Money.
    #[inline]
    pub fn total_value(&self) -> Money {
        Money::from_cents(self.total_value_cents)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub base_price_cents: i64,
    pub selling_price_cents: i64,
    pub min_stock: i64,
    /// Recorded as an opening `in` movement, so the ledger reconciles.
    pub opening_stock: i64,
    pub user_id: Option<String>,
}

/// Metadata and price edits. Stock is deliberately absent: use a stock
/// correction instead.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: String,
    pub base_price_cents: i64,
    pub selling_price_cents: i64,
    pub min_stock: i64,
    pub user_id: Option<String>,
}

impl From<&Product> for ProductUpdate {
    fn from(product: &Product) -> Self {
        ProductUpdate {
            sku: product.sku.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            unit: product.unit.clone(),
            base_price_cents: product.base_price_cents,
            selling_price_cents: product.selling_price_cents,
            min_stock: product.min_stock,
            user_id: None,
        }
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One immutable row of the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    /// Always positive; direction comes from `movement_type`.
    pub quantity: i64,
    /// Price at movement time, in cents.
    pub unit_price_cents: Option<i64>,
    /// Document number: PO, invoice number, ...
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,
    pub user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Signed effect on `current_stock`.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.signed(self.quantity)
    }
}

/// Optional details attached to a movement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementMeta {
    pub unit_price_cents: Option<i64>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Defaults to now.
    #[ts(as = "Option<String>")]
    pub transaction_date: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
}

impl MovementMeta {
    /// Meta carrying only a reference and notes.
    pub fn referenced(reference: impl Into<String>, notes: impl Into<String>) -> Self {
        MovementMeta {
            reference: Some(reference.into()),
            notes: Some(notes.into()),
            ..Default::default()
        }
    }

    /// Sets the acting user.
    pub fn by(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }
}

/// A movement joined with its product, for history screens.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MovementRecord {
    pub id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,
    pub user_id: Option<String>,
    pub product_sku: Option<String>,
    pub product_name: Option<String>,
    pub product_unit: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale with its running payment state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    /// Σ item subtotals, fixed at creation.
    pub total_amount_cents: i64,
    /// Σ payment amounts.
    pub paid_amount_cents: i64,
    pub status: SaleStatus,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Returns the amount paid so far as Money.
    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }

    /// Amount still owed, clamped at zero.
    pub fn remaining(&self) -> Money {
        (self.total() - self.paid()).clamp_non_negative()
    }
}

/// A line item. Prices are snapshots taken at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents.
    pub subtotal_cents: i64,
}

impl SaleItem {
    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A sale item joined with display fields of its product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItemLine {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub product_sku: Option<String>,
    pub product_name: Option<String>,
    pub product_unit: Option<String>,
}

/// Requested line on a new sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Input for creating a sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
    pub items: Vec<SaleLine>,
}

/// Sale aggregate as shown on the detail screen.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItemLine>,
    pub payments: Vec<Payment>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a sale. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub amount_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Input for recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPayment {
    pub amount_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    /// Defaults to now.
    #[ts(as = "Option<String>")]
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

impl NewPayment {
    /// A payment of `amount_cents` with no extra details.
    pub fn of(amount_cents: i64) -> Self {
        NewPayment {
            amount_cents,
            payment_method: None,
            payment_date: None,
            notes: None,
            user_id: None,
        }
    }

    /// Sets the payment method.
    pub fn method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }
}

// =============================================================================
// Query Filters
// =============================================================================

/// Product list filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    /// Substring of SKU or name.
    pub search: Option<String>,
    pub category: Option<String>,
    /// Only products at or below `min_stock`.
    pub low_stock: bool,
}

/// Sale list filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleFilter {
    /// Empty means any status.
    pub statuses: Vec<SaleStatus>,
    /// Substring of invoice number or customer name.
    pub search: Option<String>,
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,
}

/// Stock movement history filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementFilter {
    pub product_id: Option<String>,
    pub movement_type: Option<MovementType>,
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,
    /// Defaults to [`crate::DEFAULT_HISTORY_LIMIT`].
    pub limit: Option<u32>,
}

// =============================================================================
// Unit Tests
// =============================================================================
