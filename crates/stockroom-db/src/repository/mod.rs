//! # Repository Module
//!
//! Database repositories for the stock ledger.
//!
//! ## Who Writes What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ProductRepository ── products (catalog fields, opening stock)          │
//! │  StockRepository ──── products.current_stock + stock_movements          │
//! │  SaleRepository ───── sales, sale_items, payments                       │
//! │       │                   (stock through the same helpers as above)     │
//! │       ▼                                                                 │
//! │  audit_log ◄──────── written inside each change's own transaction       │
//! │  AuditRepository ─── read side of audit_log                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `current_stock` only changes together with a row in `stock_movements`.
//! Movements, sales and voids move it relatively through
//! `stock::apply_movement`; `StockRepository::correct_stock` sets it with a
//! guarded compare-and-set (`WHERE current_stock = <value read>`) and books
//! the difference as a compensating movement.

pub mod audit;
pub mod invoice;
pub mod product;
pub mod sale;
pub mod stock;

/// Escape character used by every `LIKE ... ESCAPE` clause.
pub(crate) const LIKE_ESCAPE: &str = " ESCAPE '\\'";

/// `%search%` with `%`, `_` and `\` in `search` matched literally.
pub(crate) fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
