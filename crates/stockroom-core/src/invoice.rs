//! # Invoice Numbers
//!
//! Human-readable sale identifiers of the form `INV-YYYY-NNNN`.
//!
//! ```text
//!   INV-2026-0001   first sale of 2026
//!   INV-2026-0042   forty-second
//!   INV-2026-10000  the sequence keeps growing past four digits
//!   INV-2027-0001   restarts every calendar year
//! ```
//!
//! The next number is derived from the numeric maximum of the existing
//! numbers for the year, never from a lexicographic sort, so
//! `INV-2026-10000` correctly follows `INV-2026-9999`.

use chrono::{DateTime, Datelike, Utc};

use crate::INVOICE_PREFIX;

/// Width the sequence is zero-padded to.
pub const SEQUENCE_WIDTH: usize = 4;

/// Prefix shared by every invoice of `year`: `INV-2026-`.
pub fn year_prefix(year: i32) -> String {
    format!("{INVOICE_PREFIX}-{year}-")
}

/// Formats an invoice number.
///
/// ```rust
/// use stockroom_core::invoice::format_invoice_number;
///
/// assert_eq!(format_invoice_number(2026, 1), "INV-2026-0001");
/// assert_eq!(format_invoice_number(2026, 12345), "INV-2026-12345");
/// ```
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!(
        "{}{:0width$}",
        year_prefix(year),
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// Splits an invoice number into `(year, sequence)`.
///
/// Returns `None` for anything not shaped like `INV-YYYY-N+`.
pub fn parse_invoice_number(invoice_number: &str) -> Option<(i32, i64)> {
    let rest = invoice_number.strip_prefix(INVOICE_PREFIX)?.strip_prefix('-')?;
    let (year, sequence) = rest.split_once('-')?;

    if year.len() != 4 || sequence.is_empty() || !sequence.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some((year.parse().ok()?, sequence.parse().ok()?))
}

/// Next invoice number for `year`, given the highest sequence already
/// issued that year (`None` when the year has no invoices yet).
///
/// ```rust
/// use stockroom_core::invoice::next_invoice_number;
///
/// assert_eq!(next_invoice_number(2026, None), "INV-2026-0001");
/// assert_eq!(next_invoice_number(2026, Some(9999)), "INV-2026-10000");
/// ```
pub fn next_invoice_number(year: i32, max_sequence: Option<i64>) -> String {
    format_invoice_number(year, max_sequence.unwrap_or(0) + 1)
}

/// Calendar year an invoice issued at `at` belongs to (UTC).
pub fn invoice_year(at: DateTime<Utc>) -> i32 {
    at.year()
}

// =============================================================================
// Unit Tests
// =============================================================================
