//! # Sale History and Daily Report
//!
//! Pure views over stored sales: search filtering and the end-of-day
//! summary.

use std::fmt;

use chrono::{NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::bill::SaleLineItem;
use crate::money::Money;
use crate::types::SaleRecord;

/// Formats a date as `DD-MM-YYYY`.
pub fn format_date_ddmmyyyy(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Sales whose bill number or customer name contains `query` (ignoring
/// case), or whose phone contains it. An empty query matches everything.
pub fn filter_sales<'a>(records: &'a [SaleRecord], query: &str) -> Vec<&'a SaleRecord> {
    let query = query.trim();
    if query.is_empty() {
        return records.iter().collect();
    }
    let lowered = query.to_lowercase();

    records
        .iter()
        .filter(|r| {
            r.sale.bill_number.to_lowercase().contains(&lowered)
                || r.sale.customer_name.to_lowercase().contains(&lowered)
                || r.sale.customer_phone.contains(query)
        })
        .collect()
}

/// `"Name (qty), Name (qty)"`, or `"-"` for a sale with no items.
pub fn medicines_summary(items: &[SaleLineItem]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(|i| format!("{} ({})", i.product_name, i.quantity_units))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One sale in the daily report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyReportRow {
    pub sale_id: String,
    pub bill_number: String,
    pub customer_phone: String,
    /// `HH:MM` local time.
    pub time: String,
    pub medicines: String,
    pub amount: Money,
}

/// Every sale made on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub rows: Vec<DailyReportRow>,
    pub total: Money,
}

impl DailyReport {
    /// Collects the sales from `records` made on `date` in `tz`, keeping
    /// the input order.
    pub fn for_date<Tz: TimeZone>(records: &[SaleRecord], date: NaiveDate, tz: &Tz) -> Self {
        let rows: Vec<DailyReportRow> = records
            .iter()
            .filter_map(|r| {
                let local = r.sale.sale_date.with_timezone(tz).naive_local();
                (local.date() == date).then(|| DailyReportRow {
                    sale_id: r.sale.id.clone(),
                    bill_number: r.sale.bill_number.clone(),
                    customer_phone: r.sale.customer_phone.clone(),
                    time: local.format("%H:%M").to_string(),
                    medicines: medicines_summary(&r.items),
                    amount: r.sale.grand_total,
                })
            })
            .collect();

        let total = rows.iter().map(|r| r.amount).sum();
        DailyReport { date, rows, total }
    }

    pub fn sale_count(&self) -> usize {
        self.rows.len()
    }
}

impl fmt::Display for DailyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sales report for {}", format_date_ddmmyyyy(self.date))?;
        writeln!(f, "{}", "-".repeat(80))?;
        if self.rows.is_empty() {
            writeln!(f, "No sales recorded.")?;
        }
        for row in &self.rows {
            writeln!(
                f,
                "{:<5} {:<20} {:<14} {:>10}  {}",
                row.time,
                row.bill_number,
                row.customer_phone,
                row.amount.to_decimal_string(),
                row.medicines
            )?;
        }
        writeln!(f, "{}", "-".repeat(80))?;
        write!(
            f,
            "{} sale(s), total {}",
            self.sale_count(),
            self.total
        )
    }
}
