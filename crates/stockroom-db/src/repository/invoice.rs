//! # Invoice Sequencer
//!
//! Reads the highest invoice sequence issued in a year.
//!
//! ```text
//!   SELECT MAX(CAST(SUBSTR(invoice_number, 10) AS INTEGER))
//!     FROM sales
//!    WHERE invoice_number LIKE 'INV-2026-%'
//!
//!   INV-2026-0009  →  9
//!   INV-2026-0010  → 10   ← numeric max, not the string max
//! ```
//!
//! Two writers may still compute the same number. The UNIQUE index on
//! `sales.invoice_number` rejects the second insert, and sale creation
//! retries its whole transaction a bounded number of times.

use sqlx::Sqlite;
use tracing::debug;

use crate::error::DbResult;
use stockroom_core::invoice::{next_invoice_number as format_next, year_prefix};

/// Highest sequence issued for `year`, or `None` if the year has no sales.
pub(crate) async fn max_sequence<'e, E>(executor: E, year: i32) -> DbResult<Option<i64>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let prefix = year_prefix(year);
    // SUBSTR is 1-based.
    let start = prefix.chars().count() as i64 + 1;

    let max: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(CAST(SUBSTR(invoice_number, ?1) AS INTEGER))
        FROM sales
        WHERE invoice_number LIKE ?2
        "#,
    )
    .bind(start)
    .bind(format!("{prefix}%"))
    .fetch_one(executor)
    .await?;

    Ok(max)
}

/// Next free invoice number for `year`, as seen by `executor`.
pub(crate) async fn next_invoice_number<'e, E>(executor: E, year: i32) -> DbResult<String>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let max = max_sequence(executor, year).await?;
    let next = format_next(year, max);

    debug!(year, max_sequence = ?max, invoice_number = %next, "Next invoice number");
    Ok(next)
}
