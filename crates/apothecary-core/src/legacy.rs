//! # Legacy Catalog Records
//!
//! Older catalog exports drifted between revisions:
//!
//! ```text
//! revision A   gst                      no remaining_units, no reminder
//! revision B   gst + remaining_units    purchase_discount
//! revision C   cgst + sgst              remaining_units, reminder_quantity
//! ```
//!
//! [`LegacyCatalogRecord`] accepts all of them, with numbers given either
//! as JSON numbers or strings, and converts to the one canonical
//! [`CatalogEntry`].

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CatalogEntry, DrugType, ExpiryMonth, Percent};
use crate::validation::{
    parse_count_or_zero, parse_money_or_zero, parse_percent_or_zero, validate_catalog_entry,
    ValidationResult,
};
use crate::DEFAULT_REMINDER_PACKAGES;

/// A number that older revisions stored as either a JSON number or text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    /// Value in hundredths (paise or basis points), zero when malformed.
    fn hundredths(&self) -> i64 {
        match self {
            LooseNumber::Number(n) if n.is_finite() && *n > 0.0 => (n * 100.0).round() as i64,
            LooseNumber::Number(_) => 0,
            LooseNumber::Text(t) => parse_money_or_zero(t).paise(),
        }
    }

    fn money(&self) -> Money {
        Money::from_paise(self.hundredths())
    }

    fn percent(&self) -> Percent {
        match self {
            LooseNumber::Text(t) => parse_percent_or_zero(t),
            LooseNumber::Number(_) => {
                Percent::from_bps(u32::try_from(self.hundredths()).unwrap_or(0))
            }
        }
    }

    fn count(&self) -> i64 {
        match self {
            LooseNumber::Number(n) if n.is_finite() && *n > 0.0 => n.trunc() as i64,
            LooseNumber::Number(_) => 0,
            LooseNumber::Text(t) => parse_count_or_zero(t),
        }
    }
}

/// A catalog row from any earlier revision.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyCatalogRecord {
    pub id: Option<String>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default, alias = "supplier_name")]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub batch_no: String,
    pub drug_type: Option<String>,
    #[serde(default, alias = "package_description")]
    pub no_of_items: String,
    #[serde(alias = "expiry")]
    pub expiry_date: Option<String>,
    pub mrp: Option<LooseNumber>,
    pub discount: Option<LooseNumber>,
    pub purchase_rate: Option<LooseNumber>,
    pub purchase_discount: Option<LooseNumber>,
    pub gst: Option<LooseNumber>,
    pub cgst: Option<LooseNumber>,
    pub sgst: Option<LooseNumber>,
    pub stock: Option<LooseNumber>,
    pub remaining_units: Option<LooseNumber>,
    pub reminder_quantity: Option<LooseNumber>,
}

impl LegacyCatalogRecord {
    /// Converts to a canonical entry and validates it.
    ///
    /// ## Defaults
    /// - A single `gst` splits evenly into CGST and SGST
    /// - Missing remaining units become 0, a missing reminder becomes 5
    /// - An unknown drug type becomes `Other`
    /// - A malformed or blank expiry is dropped
    /// - Loose units of a whole package or more fold back into packages
    pub fn into_entry(self, now: DateTime<Utc>) -> ValidationResult<CatalogEntry> {
        let id = self
            .id
            .filter(|id| uuid::Uuid::parse_str(id.trim()).is_ok())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let (cgst, sgst) = match (&self.cgst, &self.sgst, &self.gst) {
            (Some(c), Some(s), _) => (c.percent(), s.percent()),
            (_, _, Some(gst)) => {
                let total = gst.percent().bps();
                (
                    Percent::from_bps(total / 2),
                    Percent::from_bps(total - total / 2),
                )
            }
            (c, s, None) => (
                c.as_ref().map(LooseNumber::percent).unwrap_or_default(),
                s.as_ref().map(LooseNumber::percent).unwrap_or_default(),
            ),
        };

        let drug_type = self
            .drug_type
            .as_deref()
            .and_then(|t| t.parse::<DrugType>().ok())
            .unwrap_or(DrugType::Other);

        let expiry = self
            .expiry_date
            .as_deref()
            .and_then(|e| e.parse::<ExpiryMonth>().ok());

        let optional_percent = |value: &Option<LooseNumber>| {
            value
                .as_ref()
                .map(LooseNumber::percent)
                .filter(|p| !p.is_zero())
        };

        let mut entry = CatalogEntry {
            id,
            product_name: self.product_name.trim().to_string(),
            supplier_name: self.shop_name.unwrap_or_default().trim().to_string(),
            batch_no: self.batch_no.trim().to_string(),
            drug_type,
            package_description: self.no_of_items.trim().to_string(),
            expiry,
            package_mrp: self.mrp.as_ref().map(LooseNumber::money).unwrap_or_default(),
            standard_discount: optional_percent(&self.discount),
            purchase_rate: self
                .purchase_rate
                .as_ref()
                .map(LooseNumber::money)
                .unwrap_or_default(),
            purchase_discount: optional_percent(&self.purchase_discount),
            cgst,
            sgst,
            stock_packages: self.stock.as_ref().map(LooseNumber::count).unwrap_or(0),
            remaining_units: self
                .remaining_units
                .as_ref()
                .map(LooseNumber::count)
                .unwrap_or(0),
            reminder_threshold_packages: self
                .reminder_quantity
                .as_ref()
                .map(LooseNumber::count)
                .unwrap_or(DEFAULT_REMINDER_PACKAGES),
            created_at: now,
            updated_at: now,
        };

        if let Some(upp) = entry.units_per_package() {
            let upp = upp.as_i64();
            if entry.remaining_units >= upp {
                entry.stock_packages += entry.remaining_units / upp;
                entry.remaining_units %= upp;
            }
        }

        validate_catalog_entry(&entry)?;
        Ok(entry)
    }
}

/// Parses a JSON array of legacy catalog rows.
pub fn parse_legacy_catalog(json: &str) -> Result<Vec<LegacyCatalogRecord>, ValidationError> {
    serde_json::from_str(json).map_err(|e| ValidationError::InvalidFormat {
        field: "catalog file".to_string(),
        reason: e.to_string(),
    })
}
