//! # stockroom-core: Pure Ledger Rules for Stockroom
//!
//! This crate holds the inventory and settlement rules as pure functions
//! with zero I/O dependencies. Persistence lives in `stockroom-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation (forms, lists, receipts)              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               stockroom-db (Database Layer)                     │   │
//! │  │   ProductRepository  StockRepository  SaleRepository  Audit     │   │
//! │  │   transactions, conditional stock updates, invoice sequence     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐   │   │
//! │  │   │  money  │ │ ledger  │ │  sale   │ │ invoice │ │validation│  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, Sale, Payment, ...)
//! - [`money`] - Money type with integer cents
//! - [`ledger`] - Stock movement rules and reconciliation
//! - [`sale`] - Sale planning and the payment status state machine
//! - [`invoice`] - `INV-YYYY-NNNN` numbering
//! - [`validation`] - Field rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::Money;
//!
//! let price = Money::parse_display("Rp10.000").unwrap();
//! assert_eq!(price.cents(), 1_000_000);
//!
//! let subtotal = price.checked_mul_quantity(3).unwrap();
//! assert_eq!(subtotal.format_display(), "Rp30.000");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::StockReconciliation;
pub use money::Money;
pub use sale::{SalePlan, Settlement};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of every invoice number.
pub const INVOICE_PREFIX: &str = "INV";

/// Rows returned by movement history queries when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Rows returned by audit log queries when no limit is given.
pub const DEFAULT_AUDIT_LIMIT: u32 = 50;

/// Attempts at inserting a sale before an invoice-number collision is
/// reported to the caller.
pub const DEFAULT_INVOICE_RETRY_ATTEMPTS: u32 = 3;
