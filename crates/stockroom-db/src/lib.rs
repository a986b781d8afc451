//! # stockroom-db: Persistence Layer for Stockroom
//!
//! This crate owns every write to the inventory ledger. It uses SQLite
//! through sqlx, with the ledger rules coming from `stockroom-core`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  Caller (CLI, service, test)                                           │
//! │       │  db.sales().create_sale(new_sale)                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockroom-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ StockRepo     │    │ 002_audit    │  │   │
//! │  │   │ DbConfig      │    │ SaleRepo      │    │              │  │   │
//! │  │   │               │    │ AuditRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ plan / settle / check         │   │
//! │  │                                ▼                                │   │
//! │  │                         stockroom-core                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Database configuration and environment overrides
//! - [`pool`] - Connection pool creation and repository access
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product, stock, sale and audit repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let product = db.products().create(new_product).await?;
//! let sale = db.sales().create_sale(new_sale).await?;
//! db.sales().add_payment(&sale.id, NewPayment::of(25_000)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DbConfig};
pub use error::{DbError, DbResult};
pub use pool::Database;

// Repository re-exports for convenience
pub use repository::audit::{AuditEntry, AuditRepository};
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockRepository;

use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,stockroom=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Verbose output for development
/// - `RUST_LOG=info` - Normal operation
/// - `RUST_LOG=warn` - Only warnings and errors
///
/// Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
