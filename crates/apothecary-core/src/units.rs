//! # Quantity Parser
//!
//! Extracts the units-per-package count from a free-text package description.
//!
//! ## Rules
//! ```text
//! "10 tablets"   →  Some(10)
//! "  100ml"      →  Some(100)
//! "1 bottle"     →  Some(1)
//! "0 ml"         →  None      (not positive)
//! "strip of 10"  →  None      (no leading digits)
//! ""             →  None
//! ```
//!
//! This is the only place a description becomes a number. Pricing, stock
//! reconciliation and the bill all go through it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// A strictly positive units-per-package count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitsPerPackage(NonZeroU32);

impl UnitsPerPackage {
    pub const ONE: UnitsPerPackage = UnitsPerPackage(NonZeroU32::MIN);

    /// Returns `None` for zero.
    #[inline]
    pub fn new(units: u32) -> Option<Self> {
        NonZeroU32::new(units).map(UnitsPerPackage)
    }

    #[inline]
    pub const fn get(&self) -> u32 {
        self.0.get()
    }

    /// The count as i64, for stock arithmetic.
    #[inline]
    pub const fn as_i64(&self) -> i64 {
        self.0.get() as i64
    }
}

impl fmt::Display for UnitsPerPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the leading integer of a package description.
///
/// Leading whitespace is skipped. Returns `None` when there are no leading
/// digits, when the number is zero, or when it does not fit in a `u32`.
pub fn parse_units_per_package(text: &str) -> Option<UnitsPerPackage> {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let digits = &trimmed[..end];
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u32>().ok().and_then(UnitsPerPackage::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parsed(text: &str) -> Option<u32> {
        parse_units_per_package(text).map(|u| u.get())
    }

    #[test]
    fn test_leading_digits() {
        assert_eq!(parsed("10 tablets"), Some(10));
        assert_eq!(parsed("100ml"), Some(100));
        assert_eq!(parsed("  15 capsules"), Some(15));
        assert_eq!(parsed("\t1 bottle"), Some(1));
        assert_eq!(parsed("007 pills"), Some(7));
    }

    #[test]
    fn test_rejects_missing_or_zero() {
        assert_eq!(parsed(""), None);
        assert_eq!(parsed("   "), None);
        assert_eq!(parsed("strip of 10"), None);
        assert_eq!(parsed("0 ml"), None);
        assert_eq!(parsed("-5 tablets"), None);
        assert_eq!(parsed("99999999999 tablets"), None);
    }

    #[test]
    fn test_stops_at_first_non_digit() {
        assert_eq!(parsed("10x10 tablets"), Some(10));
        assert_eq!(parsed("2.5 ml"), Some(2));
    }

    proptest! {
        #[test]
        fn prop_canonical_format_round_trips(n in 1u32..=1_000_000) {
            let text = format!("{} tablets", n);
            prop_assert_eq!(parsed(&text), Some(n));
        }

        #[test]
        fn prop_never_panics(text in ".*") {
            let _ = parse_units_per_package(&text);
        }
    }
}
