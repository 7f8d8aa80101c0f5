//! # Invoice View
//!
//! A fully resolved invoice, ready for any renderer. Building one needs no
//! further catalog lookups: every figure comes from the line snapshots.
//!
//! ## Loading States
//! ```text
//! ┌──────────┐   lookup returns row    ┌────────────────────┐
//! │ Loading  │ ──────────────────────► │ Loaded(Invoice)    │
//! └────┬─────┘                          └────────────────────┘
//!      │ lookup returns nothing         ┌────────────────────┐
//!      └──────────────────────────────► │ NotFound           │
//!                                       └────────────────────┘
//! ```

use std::fmt;

use chrono::{NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::bill::SaleLineItem;
use crate::money::Money;
use crate::pricing::LinePricing;
use crate::report::format_date_ddmmyyyy;
use crate::types::{AdHocDiscount, Percent, SaleRecord};

/// One printed invoice row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub product_name: String,
    pub batch_no: String,
    /// `MM/YYYY`, or empty when unknown.
    pub expiry: String,
    pub quantity_units: i64,
    pub package_mrp: Money,
    pub gst: Percent,
    pub standard_discount: Percent,
    pub ad_hoc_discount: Option<AdHocDiscount>,
    pub pricing: LinePricing,
}

impl From<&SaleLineItem> for InvoiceLine {
    fn from(item: &SaleLineItem) -> Self {
        InvoiceLine {
            product_name: item.product_name.clone(),
            batch_no: item.batch_no.clone(),
            expiry: item
                .expiry
                .map(|e| format!("{:02}/{:04}", e.month(), e.year()))
                .unwrap_or_default(),
            quantity_units: item.quantity_units,
            package_mrp: item.package_mrp,
            gst: item.gst(),
            standard_discount: item.standard_discount,
            ad_hoc_discount: item.ad_hoc_discount,
            pricing: item.pricing,
        }
    }
}

/// A committed sale as the customer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub sale_id: String,
    pub bill_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    /// Sale time in the shop's local time.
    #[ts(as = "String")]
    pub sale_date: NaiveDateTime,
    pub lines: Vec<InvoiceLine>,
    pub total_savings: Money,
    pub grand_total: Money,
}

impl Invoice {
    /// Builds the invoice for a stored sale, showing times in `tz`.
    pub fn from_record<Tz: TimeZone>(record: &SaleRecord, tz: &Tz) -> Self {
        Invoice {
            sale_id: record.sale.id.clone(),
            bill_number: record.sale.bill_number.clone(),
            customer_name: record.sale.customer_name.clone(),
            customer_phone: record.sale.customer_phone.clone(),
            sale_date: record.sale.sale_date.with_timezone(tz).naive_local(),
            lines: record.items.iter().map(InvoiceLine::from).collect(),
            total_savings: record.total_savings(),
            grand_total: record.sale.grand_total,
        }
    }
}

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(86);
        writeln!(
            f,
            "Bill: {:<30} Date: {} {}",
            self.bill_number,
            format_date_ddmmyyyy(self.sale_date.date()),
            self.sale_date.format("%H:%M")
        )?;
        writeln!(f, "Customer: {} ({})", self.customer_name, self.customer_phone)?;
        writeln!(f, "{}", rule)?;
        writeln!(
            f,
            "{:>3}  {:<24} {:<10} {:<7} {:>5} {:>9} {:>6} {:>9} {:>10}",
            "#", "Item", "Batch", "Exp", "Qty", "MRP", "GST", "Disc", "Amount"
        )?;
        writeln!(f, "{}", rule)?;
        for (i, line) in self.lines.iter().enumerate() {
            writeln!(
                f,
                "{:>3}  {:<24} {:<10} {:<7} {:>5} {:>9} {:>6} {:>9} {:>10}",
                i + 1,
                truncate(&line.product_name, 24),
                truncate(&line.batch_no, 10),
                line.expiry,
                line.quantity_units,
                line.package_mrp.to_decimal_string(),
                line.gst.to_string(),
                line.pricing.savings().to_decimal_string(),
                line.pricing.final_subtotal.to_decimal_string(),
            )?;
        }
        writeln!(f, "{}", rule)?;
        if !self.total_savings.is_zero() {
            writeln!(f, "{:>74} {:>11}", "You saved:", self.total_savings.to_string())?;
        }
        write!(f, "{:>74} {:>11}", "Grand total:", self.grand_total.to_string())
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Result of looking up an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", content = "invoice", rename_all = "camelCase")]
pub enum InvoiceState {
    Loading,
    NotFound,
    Loaded(Invoice),
}

impl InvoiceState {
    /// Resolves a finished lookup.
    pub fn from_lookup<Tz: TimeZone>(record: Option<&SaleRecord>, tz: &Tz) -> Self {
        match record {
            Some(record) => InvoiceState::Loaded(Invoice::from_record(record, tz)),
            None => InvoiceState::NotFound,
        }
    }

    pub fn invoice(&self) -> Option<&Invoice> {
        match self {
            InvoiceState::Loaded(invoice) => Some(invoice),
            InvoiceState::Loading | InvoiceState::NotFound => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::tests::test_entry;
    use crate::types::{bill_number_for, Sale, SaleUnit, WALK_IN_CUSTOMER};
    use crate::Bill;
    use chrono::{DateTime, Utc};

    pub(crate) fn test_record(at: DateTime<Utc>) -> SaleRecord {
        let mut entry = test_entry("1", "10 tablets", 2_500);
        entry.product_name = "Paracetamol 500".to_string();
        entry.standard_discount = Some(Percent::from_whole(10));

        let mut bill = Bill::new(Utc::now());
        bill.set_customer_phone("9876543210");
        bill.add_line(&entry, 12, SaleUnit::Unit, None).unwrap();

        SaleRecord {
            sale: Sale {
                id: "sale-1".to_string(),
                bill_number: bill_number_for(at),
                customer_name: WALK_IN_CUSTOMER.to_string(),
                customer_phone: bill.customer_phone.clone(),
                grand_total: bill.grand_total(),
                sale_date: at,
            },
            items: bill.lines,
        }
    }

    #[test]
    fn test_invoice_from_record() {
        let at = DateTime::from_timestamp(1_760_000_000, 0).unwrap();
        let invoice = Invoice::from_record(&test_record(at), &Utc);

        assert_eq!(invoice.lines.len(), 1);
        assert_eq!(invoice.lines[0].expiry, "03/2027");
        assert_eq!(invoice.lines[0].gst.bps(), 1_200);
        // 12 units at ₹2.50 less 10%
        assert_eq!(invoice.grand_total.paise(), 2_700);
        assert_eq!(invoice.total_savings.paise(), 300);
    }

    #[test]
    fn test_invoice_text() {
        let at = DateTime::from_timestamp(1_760_000_000, 0).unwrap();
        let text = Invoice::from_record(&test_record(at), &Utc).to_string();

        assert!(text.contains("BILL-1760000000000"));
        assert!(text.contains("09-10-2025"));
        assert!(text.contains("Paracetamol 500"));
        assert!(text.contains("₹27.00"));
        assert!(text.contains("You saved:"));
    }

    #[test]
    fn test_invoice_state() {
        let at = DateTime::from_timestamp(1_760_000_000, 0).unwrap();
        let record = test_record(at);

        let state = InvoiceState::from_lookup(Some(&record), &Utc);
        assert_eq!(state.invoice().map(|i| i.sale_id.as_str()), Some("sale-1"));

        assert_eq!(InvoiceState::from_lookup(None, &Utc), InvoiceState::NotFound);
        assert!(InvoiceState::Loading.invoice().is_none());
    }
}
