//! # Line Pricing
//!
//! Computes the money figures for one bill line.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Line Pricing                                      │
//! │                                                                         │
//! │  package MRP ÷ units per package            = unit MRP (exact ratio)    │
//! │  unit MRP × standard %                      = standard discount / unit  │
//! │  unit MRP × ad-hoc %   or   flat per unit   = ad-hoc discount / unit    │
//! │  max(0, unit MRP − standard − ad-hoc)       = final unit price          │
//! │                                                                         │
//! │  Every per-unit figure × quantity, each rounded ONCE to the paisa.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! MRP is tax inclusive. GST percentages are recorded for the invoice only
//! and never added here.
//!
//! ## Exact Arithmetic
//! Per-unit amounts are kept as numerators over a common denominator
//! `units_per_package × 10_000` (the 10_000 absorbs basis points). Nothing is
//! rounded until the line figure is produced, so merging two lines and
//! pricing once at the summed quantity cannot drift.
//!
//! ## Example
//! ```rust
//! use apothecary_core::money::Money;
//! use apothecary_core::pricing::{compute_line, UnitMrp};
//! use apothecary_core::types::{AdHocDiscount, Percent};
//! use apothecary_core::units::UnitsPerPackage;
//!
//! let unit_mrp = UnitMrp::new(Money::from_paise(10_000), UnitsPerPackage::new(1).unwrap());
//! let line = compute_line(
//!     unit_mrp,
//!     Percent::from_whole(10),
//!     5,
//!     Some(AdHocDiscount::Percent(Percent::from_whole(5))),
//! );
//!
//! assert_eq!(line.standard_discount.paise(), 5_000);
//! assert_eq!(line.ad_hoc_discount.paise(), 2_500);
//! assert_eq!(line.final_subtotal.paise(), 42_500);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{AdHocDiscount, Percent};
use crate::units::UnitsPerPackage;

const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Unit MRP
// =============================================================================

/// Per-unit MRP, kept as an exact fraction of the package MRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitMrp {
    package_mrp: Money,
    units_per_package: UnitsPerPackage,
}

impl UnitMrp {
    pub fn new(package_mrp: Money, units_per_package: UnitsPerPackage) -> Self {
        UnitMrp {
            package_mrp: package_mrp.clamp_non_negative(),
            units_per_package,
        }
    }

    #[inline]
    pub fn package_mrp(&self) -> Money {
        self.package_mrp
    }

    #[inline]
    pub fn units_per_package(&self) -> UnitsPerPackage {
        self.units_per_package
    }

    /// Unit MRP rounded to the paisa, for display.
    pub fn rounded(&self) -> Money {
        Money::from_ratio(
            self.package_mrp.paise() as i128,
            self.units_per_package.as_i64() as i128,
        )
    }

    /// Whether a flat per-unit amount is no larger than the exact unit MRP.
    pub fn covers(&self, flat_per_unit: Money) -> bool {
        flat_per_unit.paise() as i128 * self.units_per_package.as_i64() as i128
            <= self.package_mrp.paise() as i128
    }

    fn denominator(&self) -> i128 {
        self.units_per_package.as_i64() as i128 * BPS_SCALE
    }

    /// Unit MRP as a numerator over [`UnitMrp::denominator`].
    fn scaled(&self) -> i128 {
        self.package_mrp.paise() as i128 * BPS_SCALE
    }

    fn scaled_percent(&self, pct: Percent) -> i128 {
        let bps = pct.bps().min(Percent::HUNDRED.bps()) as i128;
        self.package_mrp.paise() as i128 * bps
    }

    fn scaled_flat(&self, flat_per_unit: Money) -> i128 {
        flat_per_unit.clamp_non_negative().paise() as i128 * self.denominator()
    }
}

// =============================================================================
// Line Pricing
// =============================================================================

/// Money figures for one bill line. All amounts are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LinePricing {
    /// Per-unit MRP rounded for display.
    pub unit_mrp: Money,
    /// Unit MRP × quantity.
    pub gross: Money,
    pub standard_discount: Money,
    pub ad_hoc_discount: Money,
    pub final_subtotal: Money,
}

impl LinePricing {
    pub fn zero(unit_mrp: Money) -> Self {
        LinePricing {
            unit_mrp,
            gross: Money::zero(),
            standard_discount: Money::zero(),
            ad_hoc_discount: Money::zero(),
            final_subtotal: Money::zero(),
        }
    }

    /// Standard plus ad-hoc discount.
    #[inline]
    pub fn savings(&self) -> Money {
        self.standard_discount + self.ad_hoc_discount
    }
}

/// Prices `quantity_units` of a product.
///
/// Never fails. A non-positive quantity gives an all-zero line. Discount
/// figures are reported in full; only the final unit price floors at zero.
pub fn compute_line(
    unit_mrp: UnitMrp,
    standard_discount: Percent,
    quantity_units: i64,
    ad_hoc: Option<AdHocDiscount>,
) -> LinePricing {
    let display = unit_mrp.rounded();
    if quantity_units <= 0 {
        return LinePricing::zero(display);
    }

    let unit = unit_mrp.scaled();
    let standard = unit_mrp.scaled_percent(standard_discount);
    let ad_hoc = match ad_hoc {
        Some(AdHocDiscount::Percent(pct)) => unit_mrp.scaled_percent(pct),
        Some(AdHocDiscount::FlatPerUnit(flat)) => unit_mrp.scaled_flat(flat),
        None => 0,
    };
    let final_unit = (unit - standard - ad_hoc).max(0);

    let qty = quantity_units as i128;
    let den = unit_mrp.denominator();
    let line = |per_unit: i128| Money::from_ratio(per_unit * qty, den);

    LinePricing {
        unit_mrp: display,
        gross: line(unit),
        standard_discount: line(standard),
        ad_hoc_discount: line(ad_hoc),
        final_subtotal: line(final_unit),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mrp(package_paise: i64, upp: u32) -> UnitMrp {
        UnitMrp::new(
            Money::from_paise(package_paise),
            UnitsPerPackage::new(upp).unwrap(),
        )
    }

    #[test]
    fn test_standard_and_percent_ad_hoc() {
        let line = compute_line(
            mrp(10_000, 1),
            Percent::from_whole(10),
            5,
            Some(AdHocDiscount::Percent(Percent::from_whole(5))),
        );

        assert_eq!(line.unit_mrp.paise(), 10_000);
        assert_eq!(line.gross.paise(), 50_000);
        assert_eq!(line.standard_discount.paise(), 5_000);
        assert_eq!(line.ad_hoc_discount.paise(), 2_500);
        assert_eq!(line.final_subtotal.paise(), 42_500);
        assert_eq!(line.savings().paise(), 7_500);
    }

    #[test]
    fn test_no_discounts() {
        let line = compute_line(mrp(2_500, 10), Percent::zero(), 4, None);
        assert_eq!(line.unit_mrp.paise(), 250);
        assert_eq!(line.final_subtotal.paise(), 1_000);
        assert_eq!(line.savings(), Money::zero());
    }

    #[test]
    fn test_flat_discount_is_per_unit() {
        let line = compute_line(
            mrp(2_500, 10),
            Percent::zero(),
            4,
            Some(AdHocDiscount::FlatPerUnit(Money::from_paise(50))),
        );
        assert_eq!(line.ad_hoc_discount.paise(), 200);
        assert_eq!(line.final_subtotal.paise(), 800);
    }

    #[test]
    fn test_fractional_unit_price_rounds_once() {
        // ₹10.00 strip of 3 tablets, all three sold.
        let line = compute_line(mrp(1_000, 3), Percent::zero(), 3, None);
        assert_eq!(line.unit_mrp.paise(), 333);
        assert_eq!(line.final_subtotal.paise(), 1_000);
    }

    #[test]
    fn test_non_positive_quantity_is_zero() {
        let line = compute_line(mrp(2_500, 10), Percent::from_whole(10), 0, None);
        assert_eq!(line.final_subtotal, Money::zero());
        assert_eq!(line.unit_mrp.paise(), 250);

        let line = compute_line(mrp(2_500, 10), Percent::zero(), -3, None);
        assert_eq!(line, LinePricing::zero(Money::from_paise(250)));
    }

    #[test]
    fn test_final_price_floors_at_zero_discounts_reported_in_full() {
        let line = compute_line(
            mrp(1_000, 1),
            Percent::from_whole(80),
            2,
            Some(AdHocDiscount::Percent(Percent::from_whole(50))),
        );
        assert_eq!(line.final_subtotal, Money::zero());
        assert_eq!(line.standard_discount.paise(), 1_600);
        assert_eq!(line.ad_hoc_discount.paise(), 1_000);
        assert_eq!(line.savings().paise(), 2_600);

        let line = compute_line(
            mrp(1_000, 1),
            Percent::zero(),
            2,
            Some(AdHocDiscount::FlatPerUnit(Money::from_paise(5_000))),
        );
        assert_eq!(line.final_subtotal, Money::zero());
        assert_eq!(line.ad_hoc_discount.paise(), 10_000);
    }

    #[test]
    fn test_covers_uses_exact_unit_price() {
        let unit = mrp(1_000, 3);
        assert!(unit.covers(Money::from_paise(333)));
        assert!(!unit.covers(Money::from_paise(334)));
    }

    proptest! {
        #[test]
        fn prop_final_subtotal_never_negative(
            package_paise in 0i64..10_000_000,
            upp in 1u32..1_000,
            standard_bps in 0u32..20_000,
            quantity in -10i64..10_000,
            ad_hoc_bps in 0u32..20_000,
            flat_paise in -1_000i64..1_000_000,
            use_flat in any::<bool>(),
        ) {
            let ad_hoc = if use_flat {
                AdHocDiscount::FlatPerUnit(Money::from_paise(flat_paise))
            } else {
                AdHocDiscount::Percent(Percent::from_bps(ad_hoc_bps))
            };
            let line = compute_line(
                mrp(package_paise, upp),
                Percent::from_bps(standard_bps),
                quantity,
                Some(ad_hoc),
            );

            prop_assert!(!line.final_subtotal.is_negative());
            prop_assert!(!line.standard_discount.is_negative());
            prop_assert!(!line.ad_hoc_discount.is_negative());
        }

        #[test]
        fn prop_pricing_once_at_summed_quantity(
            package_paise in 1i64..100_000,
            upp in 1u32..50,
            a in 1i64..500,
            b in 1i64..500,
        ) {
            let unit = mrp(package_paise, upp);
            let merged = compute_line(unit, Percent::from_whole(7), a + b, None);
            let exact = Money::from_ratio(
                package_paise as i128 * 9_300 * (a + b) as i128,
                upp as i128 * 10_000,
            );
            prop_assert_eq!(merged.final_subtotal, exact);
        }
    }
}
