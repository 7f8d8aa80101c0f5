//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A strip of 10 tablets at ₹25.00 costs ₹2.50 per tablet.              │
//! │  A strip of 3 at ₹10.00 costs ₹3.3333... per tablet.                  │
//! │                                                                         │
//! │  Rounding the unit price first and multiplying later drifts:           │
//! │    ₹3.33 × 3 = ₹9.99  ❌                                               │
//! │                                                                         │
//! │  OUR SOLUTION: integer paise + exact ratios                            │
//! │    (1000 paise × 3) / 3 = 1000 paise, rounded once  ✅                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use apothecary_core::money::Money;
//!
//! let mrp = Money::from_paise(2500); // ₹25.00
//! let two_strips = mrp * 2;          // ₹50.00
//! assert_eq!(two_strips.paise(), 5000);
//!
//! // One tablet out of a strip of 3 priced at ₹10.00
//! let per_tablet = Money::from_ratio(1000, 3);
//! assert_eq!(per_tablet.paise(), 333);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction never wraps; clamping is explicit
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Ratios**: per-unit prices are never stored rounded, see [`Money::from_ratio`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ## Example
    /// ```rust
    /// use apothecary_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(12, 50).paise(), 1250);
    /// assert_eq!(Money::from_major_minor(-5, 50).paise(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Rounds the exact ratio `numerator / denominator` (in paise) to the
    /// nearest paisa, halves away from zero.
    ///
    /// A zero denominator yields zero.
    ///
    /// ## Example
    /// ```rust
    /// use apothecary_core::money::Money;
    ///
    /// assert_eq!(Money::from_ratio(5, 2).paise(), 3);   // 2.5 → 3
    /// assert_eq!(Money::from_ratio(-5, 2).paise(), -3); // -2.5 → -3
    /// assert_eq!(Money::from_ratio(2000, 3).paise(), 667);
    /// ```
    pub fn from_ratio(numerator: i128, denominator: i128) -> Self {
        if denominator == 0 {
            return Money::zero();
        }
        let (numerator, denominator) = if denominator < 0 {
            (-numerator, -denominator)
        } else {
            (numerator, denominator)
        };
        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        Money(rounded as i64)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the value, or zero if it is negative.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Formats the amount without a currency symbol ("12.50").
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering. UI code formats through `TillConfig`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

/// Parses a decimal rupee amount such as `"12"`, `"12.5"` or `"12.50"`.
///
/// More than two fractional digits is rejected rather than rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, "amount").map(Money)
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

/// Parses a decimal string with at most two fractional digits into
/// hundredths (paise, or basis points for percentages).
pub(crate) fn parse_fixed_point(s: &str, field: &str) -> Result<i64, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (digits, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(invalid("expected a number"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected a number"));
    }
    if frac.len() > 2 {
        return Err(invalid("at most two decimal places"));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("number too large"))?
    };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| invalid("expected a number"))? * 10,
        _ => frac.parse().map_err(|_| invalid("expected a number"))?,
    };

    let value = whole
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(|| invalid("number too large"))?;

    Ok(if negative { -value } else { value })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_paise(1099)), "₹10.99");
        assert_eq!(format!("{}", Money::from_paise(500)), "₹5.00");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
        assert_eq!(Money::from_paise(42500).to_decimal_string(), "425.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);
        assert_eq!((b - a).clamp_non_negative(), Money::zero());

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.paise(), 2000);
    }

    #[test]
    fn test_from_ratio_rounds_half_away_from_zero() {
        assert_eq!(Money::from_ratio(1000, 3).paise(), 333);
        assert_eq!(Money::from_ratio(2000, 3).paise(), 667);
        assert_eq!(Money::from_ratio(15, 10).paise(), 2);
        assert_eq!(Money::from_ratio(-15, 10).paise(), -2);
        assert_eq!(Money::from_ratio(7, 0).paise(), 0);
        assert_eq!(Money::from_ratio(7, -2).paise(), -4);
    }

    #[test]
    fn test_parse() {
        assert_eq!("12".parse::<Money>().unwrap().paise(), 1200);
        assert_eq!("12.5".parse::<Money>().unwrap().paise(), 1250);
        assert_eq!(" 0.05 ".parse::<Money>().unwrap().paise(), 5);
        assert_eq!(".5".parse::<Money>().unwrap().paise(), 50);
        assert_eq!("-3.10".parse::<Money>().unwrap().paise(), -310);

        assert!("".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1.234".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
    }

    /// One tablet from a ₹10.00 strip of 3, sold three times, rounds once.
    #[test]
    fn test_ratio_avoids_unit_price_drift() {
        let per_unit_rounded = Money::from_ratio(1000, 3) * 3;
        let line_exact = Money::from_ratio(1000 * 3, 3);

        assert_eq!(per_unit_rounded.paise(), 999);
        assert_eq!(line_exact.paise(), 1000);
    }
}
