//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                  │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is a user-facing rejection, raised before any write
//! is committed. None of them is retried automatically.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested `out` quantity exceeds the product's current stock.
    ///
    /// ## User Workflow
    /// ```text
    /// New sale: 20 × BRG-001
    ///      │
    ///      ▼
    /// Check stock: available=15
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "BRG-001", available: 15, requested: 20 }
    ///      │
    ///      ▼
    /// UI shows: "Only 15 BRG-001 in stock"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Mutation attempted on a voided sale.
    #[error("Sale {invoice_number} is voided and closed for changes")]
    SaleVoided { invoice_number: String },

    /// Void attempted on a sale that is already voided.
    #[error("Sale {invoice_number} is already voided")]
    AlreadyVoided { invoice_number: String },

    /// Quantity must be a positive integer.
    #[error("Invalid quantity {quantity}: must be greater than zero")]
    InvalidQuantity { quantity: i64 },

    /// Monetary amount is non-positive or does not fit the cents range.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A sale must carry at least one line item.
    #[error("A sale needs at least one item")]
    EmptySale,

    /// Product is still referenced by sale items and cannot be deleted.
    #[error("Product {sku} is referenced by {sale_items} sale item(s)")]
    ProductInUse { sku: String, sale_items: i64 },

    /// Stored value does not map to a known variant (corrupt row).
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidAmount error.
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before any ledger rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, unparseable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
