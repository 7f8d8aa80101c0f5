//! # Stock Ledger Reconciler
//!
//! Turns a number of units sold into a new (packages, loose units) pair.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  packages=3  loose=4  per package=10  required=7                        │
//! │                                                                         │
//! │  1. available = 3×10 + 4 = 34 ≥ 7                          ✅           │
//! │  2. take loose first:        4 taken, 3 still owed, loose=0            │
//! │  3. open ⌈3/10⌉ = 1 package: packages=2, loose += 10−3 = 7             │
//! │  4. fold loose ≥ 10 back into packages (nothing to fold)               │
//! │                                                                         │
//! │  result: packages=2  loose=7        (2×10 + 7 = 27 = 34 − 7)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Units are conserved and the result always satisfies
//! `0 <= loose < units per package`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::units::UnitsPerPackage;

/// Stock of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub packages: i64,
    pub remaining_units: i64,
}

impl StockLevel {
    #[inline]
    pub const fn new(packages: i64, remaining_units: i64) -> Self {
        StockLevel {
            packages,
            remaining_units,
        }
    }
}

/// A reconciled stock change for one catalog entry.
///
/// `before` is the level the reconciliation started from. Writers apply
/// `after` only while the stored row still holds `before`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub entry_id: String,
    pub product_name: String,
    pub before: StockLevel,
    pub after: StockLevel,
    pub units_sold: i64,
}

/// Not enough stock to cover a deduction. Nothing was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("only {available_units} units available, {required_units} required")]
pub struct InsufficientStock {
    pub available_units: i64,
    pub required_units: i64,
}

impl InsufficientStock {
    /// Units missing to cover the deduction.
    #[inline]
    pub const fn shortfall(&self) -> i64 {
        self.required_units - self.available_units
    }
}

/// Total sellable units.
#[inline]
pub fn total_available_units(level: StockLevel, units_per_package: UnitsPerPackage) -> i64 {
    level.packages * units_per_package.as_i64() + level.remaining_units
}

/// Deducts `required_units` from `level`.
///
/// A non-positive requirement leaves the level unchanged.
///
/// # Errors
/// [`InsufficientStock`] when the requirement exceeds the total available.
pub fn reconcile(
    level: StockLevel,
    units_per_package: UnitsPerPackage,
    required_units: i64,
) -> Result<StockLevel, InsufficientStock> {
    if required_units <= 0 {
        return Ok(level);
    }

    let upp = units_per_package.as_i64();
    let available = total_available_units(level, units_per_package);
    if required_units > available {
        return Err(InsufficientStock {
            available_units: available,
            required_units,
        });
    }

    let mut packages = level.packages;
    let mut loose = level.remaining_units;
    let mut owed = required_units;

    let from_loose = owed.min(loose).max(0);
    owed -= from_loose;
    loose -= from_loose;

    if owed > 0 {
        let to_open = (owed + upp - 1) / upp;
        packages -= to_open;
        loose += to_open * upp - owed;
    }

    if upp > 1 && loose >= upp {
        packages += loose / upp;
        loose %= upp;
    }

    Ok(StockLevel::new(packages, loose))
}
