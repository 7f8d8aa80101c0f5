//! # Inventory Alerts
//!
//! Low-stock and near-expiry checks shown on the inventory screen.
//!
//! ```text
//! low stock      0 < packages <= reminder      (reminder 0 disables it)
//! expiring soon  today <= expiry < today + 1 month
//! ```

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::CatalogEntry;

/// Whether the entry is running low but not yet out of stock.
pub fn is_low_stock(entry: &CatalogEntry) -> bool {
    entry.stock_packages > 0
        && entry.reminder_threshold_packages > 0
        && entry.stock_packages <= entry.reminder_threshold_packages
}

/// Whether the entry expires within a month of `today`.
///
/// The expiry month counts from its first day, so an entry expiring this
/// month is only flagged if the month has not started yet.
pub fn is_expiring_soon(entry: &CatalogEntry, today: NaiveDate) -> bool {
    let Some(expiry) = entry.expiry else {
        return false;
    };
    let expiry = expiry.first_day();
    let horizon = today.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX);
    expiry >= today && expiry < horizon
}

/// Entries flagged for attention.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAlerts {
    pub low_stock: Vec<CatalogEntry>,
    pub expiring_soon: Vec<CatalogEntry>,
}

impl InventoryAlerts {
    /// Scans `entries`. An entry can appear in both lists.
    pub fn scan<'a>(entries: impl IntoIterator<Item = &'a CatalogEntry>, today: NaiveDate) -> Self {
        let mut alerts = InventoryAlerts::default();
        for entry in entries {
            if is_low_stock(entry) {
                alerts.low_stock.push(entry.clone());
            }
            if is_expiring_soon(entry, today) {
                alerts.expiring_soon.push(entry.clone());
            }
        }
        alerts
    }

    pub fn is_empty(&self) -> bool {
        self.low_stock.is_empty() && self.expiring_soon.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::test_entry;
    use crate::types::ExpiryMonth;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_low_stock() {
        let mut entry = test_entry("1", "10 tablets", 2_500);
        entry.reminder_threshold_packages = 5;

        entry.stock_packages = 5;
        assert!(is_low_stock(&entry));

        entry.stock_packages = 6;
        assert!(!is_low_stock(&entry));

        entry.stock_packages = 0;
        assert!(!is_low_stock(&entry));

        entry.stock_packages = 2;
        entry.reminder_threshold_packages = 0;
        assert!(!is_low_stock(&entry));
    }

    #[test]
    fn test_expiring_soon() {
        let mut entry = test_entry("1", "10 tablets", 2_500);
        let today = day(2026, 10, 18);

        entry.expiry = Some(ExpiryMonth::new(2026, 11).unwrap());
        assert!(is_expiring_soon(&entry, today));

        // Already in its expiry month.
        entry.expiry = Some(ExpiryMonth::new(2026, 10).unwrap());
        assert!(!is_expiring_soon(&entry, today));

        entry.expiry = Some(ExpiryMonth::new(2026, 12).unwrap());
        assert!(!is_expiring_soon(&entry, today));

        entry.expiry = None;
        assert!(!is_expiring_soon(&entry, today));
    }

    #[test]
    fn test_expiry_on_first_of_month_counts() {
        let mut entry = test_entry("1", "10 tablets", 2_500);
        entry.expiry = Some(ExpiryMonth::new(2026, 11).unwrap());

        assert!(is_expiring_soon(&entry, day(2026, 11, 1)));
        assert!(!is_expiring_soon(&entry, day(2026, 10, 1)));
    }

    #[test]
    fn test_scan() {
        let today = day(2026, 10, 18);
        let mut low = test_entry("1", "10 tablets", 2_500);
        low.stock_packages = 2;
        let mut expiring = test_entry("2", "10 tablets", 2_500);
        expiring.expiry = Some(ExpiryMonth::new(2026, 11).unwrap());
        let fine = test_entry("3", "10 tablets", 2_500);

        let alerts = InventoryAlerts::scan(&[low, expiring, fine], today);

        assert_eq!(alerts.low_stock.len(), 1);
        assert_eq!(alerts.low_stock[0].id, "1");
        assert_eq!(alerts.expiring_soon.len(), 1);
        assert_eq!(alerts.expiring_soon[0].id, "2");
    }
}
