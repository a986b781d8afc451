//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (cents / sen)                        │
//! │    Every stored price, subtotal, total and payment is an i64 count      │
//! │    of cents. Ledger math never touches f64 or formatted strings.        │
//! │                                                                         │
//! │  The ONLY lossy boundary is display conversion:                         │
//! │    to_display(1050)   = 10.5                                            │
//! │    from_display(10.125) = round(1012.5) = 1013 (half away from zero)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Display Format
//! Amounts are rendered in the Indonesian Rupiah style the dashboard uses:
//! `.` groups thousands and `,` separates the fraction. The fraction is only
//! printed when it is non-zero.
//!
//! ```rust
//! use stockroom_core::money::Money;
//!
//! let price = Money::from_cents(1_000_000);
//! assert_eq!(price.format_display(), "Rp10.000");
//!
//! let parsed = Money::parse_display("Rp10.000").unwrap();
//! assert_eq!(parsed, price);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Minor units per major unit.
pub const CENTS_PER_UNIT: i64 = 100;

/// Currency symbol used by [`Money::format_display`].
pub const CURRENCY_SYMBOL: &str = "Rp";

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Where Money is Used
/// ```text
/// Product.selling_price_cents ──► SaleItem.unit_price_cents (snapshot)
///                                        │
///                                        ▼
///                   SaleItem.subtotal_cents = quantity × unit_price
///                                        │
///                                        ▼
///          Sale.total_amount_cents = Σ subtotal ◄── Payment.amount_cents
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / CENTS_PER_UNIT
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % CENTS_PER_UNIT).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// Used for derived figures such as "remaining owed" which may
    /// naturally go below zero after an overpayment.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies a unit price by a quantity, refusing to overflow.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(1000);
    /// assert_eq!(unit_price.checked_mul_quantity(2), Some(Money::from_cents(2000)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two values, refusing to overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    // -------------------------------------------------------------------------
    // Display boundary
    // -------------------------------------------------------------------------

    /// Converts to a decimal display value (`cents / 100`).
    ///
    /// The result is for rendering only and is never stored.
    #[inline]
    pub fn to_display(&self) -> f64 {
        self.0 as f64 / CENTS_PER_UNIT as f64
    }

    /// Converts a decimal display value to cents.
    ///
    /// ## Rounding
    /// `round(value × 100)` with **round half away from zero**
    /// (`f64::round`). This is the only lossy conversion in the system.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::from_display(10.5).unwrap().cents(), 1050);
    /// assert_eq!(Money::from_display(0.125).unwrap().cents(), 13);
    /// assert!(Money::from_display(f64::NAN).is_err());
    /// ```
    pub fn from_display(value: f64) -> CoreResult<Self> {
        if !value.is_finite() {
            return Err(CoreError::invalid_amount(format!("{value} is not a finite number")));
        }

        let cents = (value * CENTS_PER_UNIT as f64).round();
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
        if cents >= i64::MAX as f64 || cents < i64::MIN as f64 {
            return Err(CoreError::invalid_amount(format!("{value} is out of range")));
        }

        Ok(Money(cents as i64))
    }

    /// Parses a display string such as `"Rp10.000"`, `"10.000,50"` or
    /// `"1500"` into cents.
    ///
    /// ## Rules
    /// - Whitespace and a leading `Rp` symbol are ignored
    /// - `.` is a thousand separator and is stripped
    /// - `,` is the decimal separator
    /// - Fraction digits beyond two are rounded half away from zero
    ///
    /// Parsing works on the digit string directly, so no float rounding
    /// error can creep in.
    ///
    /// ```rust
    /// use stockroom_core::money::Money;
    ///
    /// assert_eq!(Money::parse_display("Rp 1.250.000").unwrap().cents(), 125_000_000);
    /// assert_eq!(Money::parse_display("10,5").unwrap().cents(), 1050);
    /// assert_eq!(Money::parse_display("0,125").unwrap().cents(), 13);
    /// assert!(Money::parse_display("abc").is_err());
    /// ```
    pub fn parse_display(input: &str) -> CoreResult<Self> {
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();

        let (negative, rest) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let rest = rest
            .strip_prefix(CURRENCY_SYMBOL)
            .or_else(|| rest.strip_prefix("rp"))
            .or_else(|| rest.strip_prefix("RP"))
            .unwrap_or(rest);
        let rest = rest.replace('.', "");

        let invalid = || CoreError::invalid_amount(format!("cannot parse '{input}' as an amount"));

        let mut parts = rest.split(',');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next().unwrap_or_default();
        if parts.next().is_some() || (whole.is_empty() && fraction.is_empty()) {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let overflow = || CoreError::invalid_amount(format!("'{input}' is out of range"));

        let mut cents: i64 = 0;
        for digit in whole.bytes() {
            cents = cents
                .checked_mul(10)
                .and_then(|c| c.checked_add(i64::from(digit - b'0')))
                .ok_or_else(overflow)?;
        }
        cents = cents.checked_mul(CENTS_PER_UNIT).ok_or_else(overflow)?;

        let mut fraction_digits = fraction.bytes().map(|d| i64::from(d - b'0'));
        let tenths = fraction_digits.next().unwrap_or(0);
        let hundredths = fraction_digits.next().unwrap_or(0);
        cents = cents
            .checked_add(tenths * 10 + hundredths)
            .ok_or_else(overflow)?;
        if fraction_digits.next().is_some_and(|d| d >= 5) {
            cents = cents.checked_add(1).ok_or_else(overflow)?;
        }

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Formats as `Rp10.000` (or `Rp10.000,50` when cents are present).
    pub fn format_display(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{sign}{CURRENCY_SYMBOL}{}", self.format_unsigned())
    }

    /// Formats without the currency symbol, e.g. `10.000`.
    pub fn format_number(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{sign}{}", self.format_unsigned())
    }

    fn format_unsigned(&self) -> String {
        let major = (self.0 / CENTS_PER_UNIT).unsigned_abs().to_string();
        let mut grouped = String::with_capacity(major.len() + major.len() / 3);
        for (i, digit) in major.chars().enumerate() {
            if i > 0 && (major.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        match self.minor() {
            0 => grouped,
            minor => format!("{grouped},{minor:02}"),
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_display())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_format_display() {
        assert_eq!(Money::from_cents(1_000_000).format_display(), "Rp10.000");
        assert_eq!(Money::from_cents(1_000_050).format_display(), "Rp10.000,50");
        assert_eq!(Money::from_cents(0).format_display(), "Rp0");
        assert_eq!(Money::from_cents(99).format_display(), "Rp0,99");
        assert_eq!(Money::from_cents(123_456_789_00).format_display(), "Rp123.456.789");
        assert_eq!(Money::from_cents(-550).format_display(), "-Rp5,50");
        assert_eq!(format!("{}", Money::from_cents(150_000)), "Rp1.500");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(Money::from_cents(1_000_000).format_number(), "10.000");
        assert_eq!(Money::from_cents(100).format_number(), "1");
    }

    #[test]
    fn test_parse_display() {
        assert_eq!(Money::parse_display("Rp10.000").unwrap().cents(), 1_000_000);
        assert_eq!(Money::parse_display("10000").unwrap().cents(), 1_000_000);
        assert_eq!(Money::parse_display(" Rp 1.500 ").unwrap().cents(), 150_000);
        assert_eq!(Money::parse_display("10.000,5").unwrap().cents(), 1_000_050);
        assert_eq!(Money::parse_display(",5").unwrap().cents(), 50);
        assert_eq!(Money::parse_display("-Rp5,50").unwrap().cents(), -550);

        // Third fraction digit rounds half away from zero
        assert_eq!(Money::parse_display("0,125").unwrap().cents(), 13);
        assert_eq!(Money::parse_display("0,124").unwrap().cents(), 12);
        assert_eq!(Money::parse_display("-0,125").unwrap().cents(), -13);
    }

    #[test]
    fn test_parse_display_rejects_garbage() {
        assert!(Money::parse_display("").is_err());
        assert!(Money::parse_display("Rp").is_err());
        assert!(Money::parse_display("12a").is_err());
        assert!(Money::parse_display("1,2,3").is_err());
        assert!(Money::parse_display("99999999999999999999").is_err());
    }

    #[test]
    fn test_from_display_rounding() {
        assert_eq!(Money::from_display(10.0).unwrap().cents(), 1000);
        assert_eq!(Money::from_display(0.005).unwrap().cents(), 1);
        assert_eq!(Money::from_display(-0.005).unwrap().cents(), -1);
        assert!(Money::from_display(f64::INFINITY).is_err());
        assert!(Money::from_display(1e300).is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for cents in (0..1_000_000i64).step_by(100).chain([i64::from(u32::MAX) * 100]) {
            let money = Money::from_cents(cents);
            assert_eq!(Money::from_display(money.to_display()).unwrap(), money);
            assert_eq!(Money::parse_display(&money.format_display()).unwrap(), money);
        }
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((b - a).clamp_non_negative(), Money::zero());

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_checked_operations() {
        assert_eq!(
            Money::from_cents(299).checked_mul_quantity(3),
            Some(Money::from_cents(897))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert!(!negative.is_positive());
    }
}
