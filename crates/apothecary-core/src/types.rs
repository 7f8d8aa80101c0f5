//! # Domain Types
//!
//! Core domain types used throughout Apothecary.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogEntry   │   │  SaleLineItem   │   │      Sale       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  entry id (ref) │   │  id (UUID)      │       │
//! │  │  package desc   │   │  snapshot       │──►│  bill_number    │       │
//! │  │  package_mrp    │   │  quantity_units │   │  customer_phone │       │
//! │  │  stock + loose  │   │  pricing        │   │  grand_total    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Percent      │   │  AdHocDiscount  │   │   ExpiryMonth   │       │
//! │  │  bps (u32)      │   │  Percent(%)     │   │  2027-03        │       │
//! │  │  1250 = 12.5%   │   │  FlatPerUnit(₹) │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A line item references its catalog entry by id only. Everything the
//! invoice needs is copied into the line when it is added, so a sale still
//! renders after the entry is edited or deleted.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::bill::SaleLineItem;
use crate::error::ValidationError;
use crate::money::{parse_fixed_point, Money};
use crate::pricing::UnitMrp;
use crate::stock::{total_available_units, StockLevel};
use crate::units::{parse_units_per_package, UnitsPerPackage};

// =============================================================================
// Percent
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1250 bps = 12.5%.
/// Used for standard and ad-hoc discounts, purchase discounts and GST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// 100%.
    pub const HUNDRED: Percent = Percent(10_000);

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a whole number of percent.
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percent(pct * 100)
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the value as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Applies this percentage to an amount, rounded to the nearest paisa.
    pub fn of(&self, amount: Money) -> Money {
        Money::from_ratio(amount.paise() as i128 * self.0 as i128, 10_000)
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

/// Parses `"12"`, `"12.5"` or `"12.50"` (percent, at most two decimals).
impl FromStr for Percent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bps = parse_fixed_point(s, "percentage")?;
        if bps < 0 {
            return Err(ValidationError::Negative {
                field: "percentage".to_string(),
            });
        }
        u32::try_from(bps)
            .map(Percent)
            .map_err(|_| ValidationError::InvalidFormat {
                field: "percentage".to_string(),
                reason: "number too large".to_string(),
            })
    }
}

// =============================================================================
// Drug Type
// =============================================================================

/// Dosage form of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DrugType {
    Tonic,
    Syrup,
    Tablet,
    Capsule,
    Ointment,
    Other,
}

impl DrugType {
    pub const ALL: [DrugType; 6] = [
        DrugType::Tonic,
        DrugType::Syrup,
        DrugType::Tablet,
        DrugType::Capsule,
        DrugType::Ointment,
        DrugType::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            DrugType::Tonic => "tonic",
            DrugType::Syrup => "syrup",
            DrugType::Tablet => "tablet",
            DrugType::Capsule => "capsule",
            DrugType::Ointment => "ointment",
            DrugType::Other => "other",
        }
    }
}

impl Default for DrugType {
    fn default() -> Self {
        DrugType::Tablet
    }
}

impl fmt::Display for DrugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrugType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        DrugType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "drug type".to_string(),
                reason: format!("unknown drug type '{}'", s.trim()),
            })
    }
}

// =============================================================================
// Expiry Month
// =============================================================================

/// Expiry with month granularity.
///
/// Serialized as `"YYYY-MM"`. Accepts `"YYYY-MM-DD"` on input (day ignored)
/// because older records stored the first day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExpiryMonth {
    year: i32,
    month: u32,
}

impl ExpiryMonth {
    /// Creates an expiry month, rejecting years outside 1970..=2100.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1970..=2100).contains(&year) || !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidFormat {
                field: "expiry".to_string(),
                reason: format!("{:04}-{:02} is not a valid month", year, month),
            });
        }
        Ok(ExpiryMonth { year, month })
    }

    #[inline]
    pub const fn year(&self) -> i32 {
        self.year
    }

    #[inline]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the expiry month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Storage form, `"YYYY-MM-01"`.
    pub fn to_date_string(&self) -> String {
        format!("{:04}-{:02}-01", self.year, self.month)
    }
}

impl From<NaiveDate> for ExpiryMonth {
    fn from(date: NaiveDate) -> Self {
        ExpiryMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for ExpiryMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ExpiryMonth {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "expiry".to_string(),
            reason: format!("expected YYYY-MM, got '{}'", s.trim()),
        };

        let mut parts = s.trim().split('-');
        let year = parts
            .next()
            .filter(|p| p.len() == 4)
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(invalid)?;
        let month = parts
            .next()
            .filter(|p| p.len() == 2)
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        if let Some(day) = parts.next() {
            if day.len() != 2 || !day.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        ExpiryMonth::new(year, month)
    }
}

impl TryFrom<String> for ExpiryMonth {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpiryMonth> for String {
    fn from(value: ExpiryMonth) -> Self {
        value.to_string()
    }
}

// =============================================================================
// Catalog Entry
// =============================================================================

/// A medicine in the catalog.
///
/// ## Stock Invariant
/// Stock is held as whole packages plus loose units from one opened
/// package. After any reconciliation `0 <= remaining_units < units per package`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub product_name: String,

    /// Supplier or shop the stock was bought from.
    pub supplier_name: String,

    pub batch_no: String,

    pub drug_type: DrugType,

    /// Free text such as "10 tablets". The leading integer is the
    /// authoritative units-per-package count.
    pub package_description: String,

    #[ts(as = "Option<String>")]
    pub expiry: Option<ExpiryMonth>,

    /// MRP per package, tax inclusive.
    pub package_mrp: Money,

    pub standard_discount: Option<Percent>,

    /// Purchase rate per package (cost tracking only).
    pub purchase_rate: Money,

    pub purchase_discount: Option<Percent>,

    pub cgst: Percent,

    pub sgst: Percent,

    /// Whole packages on hand.
    pub stock_packages: i64,

    /// Loose units from an opened package.
    pub remaining_units: i64,

    /// Low-stock alert level, in packages.
    pub reminder_threshold_packages: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Units per package parsed from the package description.
    #[inline]
    pub fn units_per_package(&self) -> Option<UnitsPerPackage> {
        parse_units_per_package(&self.package_description)
    }

    /// Per-unit MRP, or `None` when units per package cannot be resolved.
    pub fn unit_mrp(&self) -> Option<UnitMrp> {
        self.units_per_package()
            .map(|upp| UnitMrp::new(self.package_mrp, upp))
    }

    /// Current stock as a (packages, loose units) pair.
    #[inline]
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::new(self.stock_packages, self.remaining_units)
    }

    /// Total sellable units, or `None` when units per package cannot be resolved.
    pub fn total_available_units(&self) -> Option<i64> {
        self.units_per_package()
            .map(|upp| total_available_units(self.stock_level(), upp))
    }

    /// Standard discount, zero when unset.
    #[inline]
    pub fn standard_discount_or_zero(&self) -> Percent {
        self.standard_discount.unwrap_or_default()
    }

    /// Combined GST rate (CGST + SGST).
    #[inline]
    pub fn gst(&self) -> Percent {
        Percent::from_bps(self.cgst.bps() + self.sgst.bps())
    }

    /// Purchase rate less the purchase discount, rounded to the paisa.
    ///
    /// ## Example
    /// ```text
    /// rate ₹120.00, discount 12.5%  →  ₹105.00
    /// rate ₹0.00                    →  ₹0.00
    /// ```
    pub fn net_purchase_cost(&self) -> Money {
        if self.purchase_rate.paise() <= 0 {
            return Money::zero();
        }
        let discount = self.purchase_discount.unwrap_or_default().of(self.purchase_rate);
        (self.purchase_rate - discount).clamp_non_negative()
    }

    /// Short stock summary used in pickers, e.g. `"[3 pkgs + 4 units]"`.
    pub fn stock_display(&self) -> String {
        match self.units_per_package() {
            Some(_) => format!(
                "[{} pkgs + {} units]",
                self.stock_packages, self.remaining_units
            ),
            None => format!("[{} pkgs]", self.stock_packages),
        }
    }
}

// =============================================================================
// Sale Unit
// =============================================================================

/// How the operator expressed a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SaleUnit {
    Unit,
    Package,
}

impl Default for SaleUnit {
    fn default() -> Self {
        SaleUnit::Unit
    }
}

impl FromStr for SaleUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unit" | "units" | "u" => Ok(SaleUnit::Unit),
            "package" | "packages" | "pkg" | "p" => Ok(SaleUnit::Package),
            other => Err(ValidationError::InvalidFormat {
                field: "sale unit".to_string(),
                reason: format!("expected 'unit' or 'package', got '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Ad-hoc Discount
// =============================================================================

/// Storage tag for an ad-hoc discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum DiscountKind {
    Percent,
    FlatPerUnit,
}

/// A one-off discount on top of the standard discount.
///
/// `FlatPerUnit` is a currency amount taken off every unit sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AdHocDiscount {
    Percent(Percent),
    FlatPerUnit(Money),
}

impl AdHocDiscount {
    pub const fn kind(&self) -> DiscountKind {
        match self {
            AdHocDiscount::Percent(_) => DiscountKind::Percent,
            AdHocDiscount::FlatPerUnit(_) => DiscountKind::FlatPerUnit,
        }
    }

    /// Raw stored value: basis points or paise.
    pub fn raw_value(&self) -> i64 {
        match self {
            AdHocDiscount::Percent(p) => p.bps() as i64,
            AdHocDiscount::FlatPerUnit(m) => m.paise(),
        }
    }

    /// Rebuilds a discount from its stored parts.
    ///
    /// A zero or negative value means "no discount".
    pub fn from_parts(kind: DiscountKind, value: i64) -> Option<Self> {
        if value <= 0 {
            return None;
        }
        match kind {
            DiscountKind::Percent => u32::try_from(value)
                .ok()
                .map(|bps| AdHocDiscount::Percent(Percent::from_bps(bps))),
            DiscountKind::FlatPerUnit => Some(AdHocDiscount::FlatPerUnit(Money::from_paise(value))),
        }
    }

    /// Drops discounts whose value is zero.
    pub fn normalize(discount: Option<AdHocDiscount>) -> Option<AdHocDiscount> {
        discount.and_then(|d| AdHocDiscount::from_parts(d.kind(), d.raw_value()))
    }
}

impl fmt::Display for AdHocDiscount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdHocDiscount::Percent(p) => write!(f, "{} off", p),
            AdHocDiscount::FlatPerUnit(m) => write!(f, "{}/unit off", m),
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Customer name recorded on every counter sale.
pub const WALK_IN_CUSTOMER: &str = "Walk-in";

/// A committed sale header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    /// `BILL-<unix millis>`.
    pub bill_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub grand_total: Money,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

/// A sale header together with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub sale: Sale,
    pub items: Vec<SaleLineItem>,
}

impl SaleRecord {
    /// Sum of discounts across the items.
    pub fn total_savings(&self) -> Money {
        self.items.iter().map(|i| i.pricing.savings()).sum()
    }
}

/// Generates a bill number from the sale timestamp.
pub fn bill_number_for(at: DateTime<Utc>) -> String {
    format!("BILL-{}", at.timestamp_millis())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_entry(id: &str, description: &str, mrp_paise: i64) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            product_name: format!("Medicine {}", id),
            supplier_name: "City Distributors".to_string(),
            batch_no: format!("B-{}", id),
            drug_type: DrugType::Tablet,
            package_description: description.to_string(),
            expiry: Some(ExpiryMonth::new(2027, 3).unwrap()),
            package_mrp: Money::from_paise(mrp_paise),
            standard_discount: None,
            purchase_rate: Money::from_paise(mrp_paise / 2),
            purchase_discount: None,
            cgst: Percent::from_bps(600),
            sgst: Percent::from_bps(600),
            stock_packages: 10,
            remaining_units: 0,
            reminder_threshold_packages: 5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_percent_of() {
        let p = Percent::from_bps(1250);
        assert_eq!(p.of(Money::from_paise(10_000)).paise(), 1250);
        assert_eq!(Percent::from_whole(5).bps(), 500);
        assert_eq!(p.to_string(), "12.50%");
    }

    #[test]
    fn test_percent_parse() {
        assert_eq!("12.5".parse::<Percent>().unwrap().bps(), 1250);
        assert_eq!("100".parse::<Percent>().unwrap(), Percent::HUNDRED);
        assert!("-1".parse::<Percent>().is_err());
        assert!("ten".parse::<Percent>().is_err());
    }

    #[test]
    fn test_drug_type_parse() {
        assert_eq!("Syrup".parse::<DrugType>().unwrap(), DrugType::Syrup);
        assert_eq!(" capsule ".parse::<DrugType>().unwrap(), DrugType::Capsule);
        assert!("powder".parse::<DrugType>().is_err());
    }

    #[test]
    fn test_expiry_month_parse() {
        let m: ExpiryMonth = "2027-03".parse().unwrap();
        assert_eq!((m.year(), m.month()), (2027, 3));
        assert_eq!(m.to_date_string(), "2027-03-01");

        let legacy: ExpiryMonth = "2026-11-01".parse().unwrap();
        assert_eq!(legacy.to_string(), "2026-11");

        assert!("2027-13".parse::<ExpiryMonth>().is_err());
        assert!("1969-01".parse::<ExpiryMonth>().is_err());
        assert!("27-03".parse::<ExpiryMonth>().is_err());
        assert!("".parse::<ExpiryMonth>().is_err());
    }

    #[test]
    fn test_expiry_month_serde() {
        let m = ExpiryMonth::new(2027, 3).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"2027-03\"");
        let back: ExpiryMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_sale_unit_parse() {
        assert_eq!("Package".parse::<SaleUnit>().unwrap(), SaleUnit::Package);
        assert_eq!("units".parse::<SaleUnit>().unwrap(), SaleUnit::Unit);
        assert!("box".parse::<SaleUnit>().is_err());
    }

    #[test]
    fn test_ad_hoc_discount_zero_is_none() {
        assert_eq!(AdHocDiscount::from_parts(DiscountKind::Percent, 0), None);
        assert_eq!(
            AdHocDiscount::normalize(Some(AdHocDiscount::FlatPerUnit(Money::zero()))),
            None
        );
        assert_eq!(
            AdHocDiscount::from_parts(DiscountKind::FlatPerUnit, 150),
            Some(AdHocDiscount::FlatPerUnit(Money::from_paise(150)))
        );
    }

    #[test]
    fn test_ad_hoc_discount_serde_shape() {
        let d = AdHocDiscount::Percent(Percent::from_bps(500));
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "percent", "value": 500 }));
    }

    #[test]
    fn test_entry_derived_values() {
        let mut entry = test_entry("1", "10 tablets", 2500);
        entry.stock_packages = 3;
        entry.remaining_units = 4;

        assert_eq!(entry.units_per_package().map(|u| u.get()), Some(10));
        assert_eq!(entry.total_available_units(), Some(34));
        assert_eq!(entry.gst().bps(), 1200);
        assert_eq!(entry.stock_display(), "[3 pkgs + 4 units]");

        entry.package_description = "strip".to_string();
        assert_eq!(entry.total_available_units(), None);
        assert_eq!(entry.stock_display(), "[3 pkgs]");
    }

    #[test]
    fn test_net_purchase_cost() {
        let mut entry = test_entry("1", "10 tablets", 2500);
        entry.purchase_rate = Money::from_paise(12_000);
        entry.purchase_discount = Some(Percent::from_bps(1250));
        assert_eq!(entry.net_purchase_cost().paise(), 10_500);

        entry.purchase_rate = Money::zero();
        assert_eq!(entry.net_purchase_cost(), Money::zero());
    }

    #[test]
    fn test_bill_number_format() {
        let at = DateTime::from_timestamp_millis(1_760_000_000_123).unwrap();
        assert_eq!(bill_number_for(at), "BILL-1760000000123");
    }
}
