//! # Bill Aggregator
//!
//! The in-progress bill the operator builds at the counter.
//!
//! ## Bill Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Bill Operations                                      │
//! │                                                                         │
//! │  add_line(entry, 2, Package, None)                                     │
//! │     │                                                                   │
//! │     ├── quantity valid?               no → ValidationError             │
//! │     ├── units per package known?      no → UnitsPerPackageUnresolvable │
//! │     ├── 2 × 10 = 20 units                                              │
//! │     ├── ad-hoc discount within MRP?   no → ValidationError             │
//! │     ├── 20 + units already in bill                                     │
//! │     │   ≤ stock in snapshot?          no → InsufficientStock           │
//! │     │                                                                   │
//! │     ├── same entry + same discount?  yes → merge, reprice once         │
//! │     └──                               no → append new line             │
//! │                                                                         │
//! │  remove_line(i)   → drops the line, stock untouched                    │
//! │  totals()         → derived on every call, never stored                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rejected operation leaves the bill exactly as it was. Stock is only
//! written when the bill is committed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{compute_line, LinePricing, UnitMrp};
use crate::types::{AdHocDiscount, CatalogEntry, ExpiryMonth, Percent, SaleUnit};
use crate::units::UnitsPerPackage;
use crate::validation::{validate_ad_hoc_discount, validate_bill_size, validate_quantity};

// =============================================================================
// Sale Line Item
// =============================================================================

/// One line of a bill.
///
/// ## Snapshot
/// Everything after `entry_id` is frozen when the line is created, so the
/// line still renders if the catalog entry is later edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineItem {
    pub entry_id: String,
    pub product_name: String,
    pub batch_no: String,
    #[ts(as = "Option<String>")]
    pub expiry: Option<ExpiryMonth>,
    pub package_mrp: Money,
    pub units_per_package: u32,
    pub standard_discount: Percent,
    pub cgst: Percent,
    pub sgst: Percent,
    /// Always in units, whatever the operator typed.
    pub quantity_units: i64,
    pub ad_hoc_discount: Option<AdHocDiscount>,
    pub pricing: LinePricing,
}

impl SaleLineItem {
    /// Snapshots `entry` and prices `quantity_units` of it.
    pub fn from_entry(
        entry: &CatalogEntry,
        units_per_package: UnitsPerPackage,
        quantity_units: i64,
        ad_hoc_discount: Option<AdHocDiscount>,
    ) -> Self {
        let mut line = SaleLineItem {
            entry_id: entry.id.clone(),
            product_name: entry.product_name.clone(),
            batch_no: entry.batch_no.clone(),
            expiry: entry.expiry,
            package_mrp: entry.package_mrp,
            units_per_package: units_per_package.get(),
            standard_discount: entry.standard_discount_or_zero(),
            cgst: entry.cgst,
            sgst: entry.sgst,
            quantity_units,
            ad_hoc_discount: AdHocDiscount::normalize(ad_hoc_discount),
            pricing: LinePricing::zero(Money::zero()),
        };
        line.reprice();
        line
    }

    /// Unit MRP from the frozen package MRP.
    pub fn unit_mrp(&self) -> UnitMrp {
        let upp = UnitsPerPackage::new(self.units_per_package).unwrap_or(UnitsPerPackage::ONE);
        UnitMrp::new(self.package_mrp, upp)
    }

    /// Recomputes pricing from the current quantity and discounts.
    pub fn reprice(&mut self) {
        self.pricing = compute_line(
            self.unit_mrp(),
            self.standard_discount,
            self.quantity_units,
            self.ad_hoc_discount,
        );
    }

    /// Whether an add for `entry_id` with `ad_hoc` merges into this line.
    pub fn merges_with(&self, entry_id: &str, ad_hoc: Option<AdHocDiscount>) -> bool {
        self.entry_id == entry_id && self.ad_hoc_discount == AdHocDiscount::normalize(ad_hoc)
    }

    /// Combined GST recorded for display.
    #[inline]
    pub fn gst(&self) -> Percent {
        Percent::from_bps(self.cgst.bps() + self.sgst.bps())
    }
}

// =============================================================================
// Bill
// =============================================================================

/// An uncommitted bill.
///
/// ## Invariants
/// - Every line has `quantity_units > 0`
/// - For each entry, units across all its lines never exceed the stock of
///   the snapshot used when adding
/// - At most one line per (entry, ad-hoc discount) pair
/// - Maximum lines: [`crate::MAX_BILL_LINES`]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub lines: Vec<SaleLineItem>,

    pub customer_phone: String,

    /// When the bill was started or last cleared.
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
}

impl Bill {
    /// An empty bill started at `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Bill {
            lines: Vec::new(),
            customer_phone: String::new(),
            started_at,
        }
    }

    /// Adds `quantity` of `entry` to the bill.
    ///
    /// ## Behavior
    /// - Packages are converted to units using the entry's description
    /// - Stock is checked against every unit of this entry already billed,
    ///   whatever discount those lines carry
    /// - A line with the same entry and the same ad-hoc discount absorbs the
    ///   quantity and is repriced once at the new total
    ///
    /// ## Errors
    /// - [`CoreError::Validation`] for a bad quantity or discount
    /// - [`CoreError::UnitsPerPackageUnresolvable`] for an unusable description
    /// - [`CoreError::InsufficientStock`] when the snapshot cannot cover it
    /// - [`CoreError::BillTooLarge`] when a new line would not fit
    pub fn add_line(
        &mut self,
        entry: &CatalogEntry,
        quantity: i64,
        unit: SaleUnit,
        ad_hoc: Option<AdHocDiscount>,
    ) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let upp = entry
            .units_per_package()
            .ok_or_else(|| CoreError::UnitsPerPackageUnresolvable {
                product: entry.product_name.clone(),
                description: entry.package_description.clone(),
            })?;

        let units = match unit {
            SaleUnit::Unit => quantity,
            SaleUnit::Package => quantity * upp.as_i64(),
        };

        let ad_hoc = AdHocDiscount::normalize(ad_hoc);
        if let Some(discount) = &ad_hoc {
            validate_ad_hoc_discount(discount, &UnitMrp::new(entry.package_mrp, upp))?;
        }

        let already = self.units_in_bill(&entry.id);
        let available = crate::stock::total_available_units(entry.stock_level(), upp);
        if already + units > available {
            return Err(CoreError::InsufficientStock {
                product: entry.product_name.clone(),
                available: (available - already).max(0),
                requested: units,
            });
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.merges_with(&entry.id, ad_hoc))
        {
            line.quantity_units += units;
            line.reprice();
            return Ok(());
        }

        validate_bill_size(self.lines.len()).map_err(|_| CoreError::BillTooLarge {
            max: crate::MAX_BILL_LINES,
        })?;

        self.lines
            .push(SaleLineItem::from_entry(entry, upp, units, ad_hoc));
        Ok(())
    }

    /// Removes the line at `index`. Stock is not touched.
    pub fn remove_line(&mut self, index: usize) -> CoreResult<SaleLineItem> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound { index });
        }
        Ok(self.lines.remove(index))
    }

    /// Sets the phone number the sale is recorded against.
    pub fn set_customer_phone(&mut self, phone: impl Into<String>) {
        self.customer_phone = phone.into().trim().to_string();
    }

    /// Units of `entry_id` across every line.
    pub fn units_in_bill(&self, entry_id: &str) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.entry_id == entry_id)
            .map(|l| l.quantity_units)
            .sum()
    }

    /// Required units per distinct entry, ordered by id.
    pub fn required_units_by_entry(&self) -> BTreeMap<String, i64> {
        let mut required = BTreeMap::new();
        for line in &self.lines {
            *required.entry(line.entry_id.clone()).or_insert(0) += line.quantity_units;
        }
        required
    }

    /// Distinct entry ids referenced by the bill.
    pub fn entry_ids(&self) -> Vec<String> {
        self.required_units_by_entry().into_keys().collect()
    }

    /// Sum of line subtotals.
    pub fn grand_total(&self) -> Money {
        self.lines.iter().map(|l| l.pricing.final_subtotal).sum()
    }

    /// Sum of all discounts across lines.
    pub fn total_savings(&self) -> Money {
        self.lines.iter().map(|l| l.pricing.savings()).sum()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Discards all lines and the phone number, restarting the bill at `now`.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.lines.clear();
        self.customer_phone.clear();
        self.started_at = now;
    }

    pub fn totals(&self) -> BillTotals {
        BillTotals::from(self)
    }
}

/// Bill totals summary for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillTotals {
    pub line_count: usize,
    pub total_units: i64,
    pub gross: Money,
    pub total_savings: Money,
    pub grand_total: Money,
}

impl From<&Bill> for BillTotals {
    fn from(bill: &Bill) -> Self {
        BillTotals {
            line_count: bill.line_count(),
            total_units: bill.lines.iter().map(|l| l.quantity_units).sum(),
            gross: bill.lines.iter().map(|l| l.pricing.gross).sum(),
            total_savings: bill.total_savings(),
            grand_total: bill.grand_total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
