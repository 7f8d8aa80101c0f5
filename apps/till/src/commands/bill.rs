//! # Bill Commands
//!
//! Assembling the bill at the counter. Nothing here writes to the database.
//!
//! ## Flow
//! ```text
//! add_to_bill(entry_id, qty, unit, discount)
//!      │
//!      ├── catalog.get_by_id ──► snapshot of the entry as of now
//!      │
//!      └── BillState::with_bill_mut ──► Bill::add_line
//!               (units, stock check against the snapshot, merge)
//! ```

use std::str::FromStr;

use apothecary_core::{AdHocDiscount, BillTotals, Money, Percent, SaleLineItem, SaleUnit};
use apothecary_db::Database;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::BillState;

/// The bill as shown at the counter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillView {
    pub lines: Vec<SaleLineItem>,
    pub totals: BillTotals,
    pub customer_phone: String,
}

/// Adds an item to the bill, merging with a matching line.
pub async fn add_to_bill(
    db: &Database,
    bill: &BillState,
    entry_id: &str,
    quantity: i64,
    unit: SaleUnit,
    ad_hoc: Option<AdHocDiscount>,
) -> ApiResult<BillView> {
    debug!(entry_id = %entry_id, quantity = %quantity, ?unit, "add_to_bill command");

    let entry = db
        .catalog()
        .get_by_id(entry_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Medicine", entry_id))?;

    bill.with_bill_mut(|b| b.add_line(&entry, quantity, unit, ad_hoc))??;
    get_bill(bill)
}

/// Removes the line at `index`.
pub fn remove_from_bill(bill: &BillState, index: usize) -> ApiResult<BillView> {
    debug!(index = %index, "remove_from_bill command");
    bill.with_bill_mut(|b| b.remove_line(index))??;
    get_bill(bill)
}

/// Sets the customer phone the sale will be recorded against.
pub fn set_customer_phone(bill: &BillState, phone: &str) -> ApiResult<BillView> {
    bill.with_bill_mut(|b| b.set_customer_phone(phone))?;
    get_bill(bill)
}

pub fn get_bill(bill: &BillState) -> ApiResult<BillView> {
    bill.with_bill(|b| BillView {
        lines: b.lines.clone(),
        totals: b.totals(),
        customer_phone: b.customer_phone.clone(),
    })
}

/// Abandons the bill. Stock is untouched.
pub fn clear_bill(bill: &BillState) -> ApiResult<BillView> {
    bill.with_bill_mut(|b| b.clear(Utc::now()))?;
    get_bill(bill)
}

/// One `--item` argument: `ID:QTY[:unit|:package][:pct=N|:flat=N]`.
///
/// ```text
/// 3f2c…:5                 five units
/// 3f2c…:2:package         two packages
/// 3f2c…:5:unit:pct=10     five units, 10% off on top of the standard discount
/// 3f2c…:5:flat=1.50       five units, ₹1.50 off each unit
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BillItemArg {
    pub entry_id: String,
    pub quantity: i64,
    pub unit: SaleUnit,
    pub ad_hoc: Option<AdHocDiscount>,
}

impl FromStr for BillItemArg {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':').map(str::trim);

        let entry_id = parts
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::validation("Item must start with a medicine id"))?
            .to_string();

        let quantity = parts
            .next()
            .and_then(|q| q.parse::<i64>().ok())
            .ok_or_else(|| ApiError::validation(format!("Item '{}' needs a whole quantity", s)))?;

        let mut unit = SaleUnit::Unit;
        let mut ad_hoc = None;
        for part in parts {
            if let Some(value) = part.strip_prefix("pct=") {
                ad_hoc = Some(AdHocDiscount::Percent(value.parse::<Percent>()?));
            } else if let Some(value) = part.strip_prefix("flat=") {
                ad_hoc = Some(AdHocDiscount::FlatPerUnit(value.parse::<Money>()?));
            } else {
                unit = part.parse::<SaleUnit>()?;
            }
        }

        Ok(BillItemArg {
            entry_id,
            quantity,
            unit,
            ad_hoc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::catalog::{add_entry, tests::paracetamol_form};
    use crate::error::ErrorCode;
    use apothecary_db::DbConfig;

    async fn setup() -> (Database, BillState, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let entry = add_entry(&db, &paracetamol_form()).await.unwrap();
        (db, BillState::new(), entry.id)
    }

    #[tokio::test]
    async fn test_add_and_merge() {
        let (db, bill, id) = setup().await;

        add_to_bill(&db, &bill, &id, 5, SaleUnit::Unit, None).await.unwrap();
        let view = add_to_bill(&db, &bill, &id, 1, SaleUnit::Package, None)
            .await
            .unwrap();

        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity_units, 15);
        assert_eq!(view.totals.total_units, 15);
    }

    #[tokio::test]
    async fn test_add_more_than_stock() {
        let (db, bill, id) = setup().await;

        // 3 packages of 10 plus 4 loose
        let err = add_to_bill(&db, &bill, &id, 35, SaleUnit::Unit, None)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(get_bill(&bill).unwrap().lines.is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_entry() {
        let (db, bill, _) = setup().await;
        let err = add_to_bill(&db, &bill, "missing", 1, SaleUnit::Unit, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_remove_phone_and_clear() {
        let (db, bill, id) = setup().await;
        add_to_bill(&db, &bill, &id, 2, SaleUnit::Unit, None).await.unwrap();

        let view = set_customer_phone(&bill, " 9876543210 ").unwrap();
        assert_eq!(view.customer_phone, "9876543210");

        assert!(remove_from_bill(&bill, 3).is_err());
        let view = remove_from_bill(&bill, 0).unwrap();
        assert!(view.lines.is_empty());

        let view = clear_bill(&bill).unwrap();
        assert!(view.customer_phone.is_empty());
    }

    #[test]
    fn test_parse_item_arg() {
        let item: BillItemArg = "abc:5".parse().unwrap();
        assert_eq!(item.quantity, 5);
        assert_eq!(item.unit, SaleUnit::Unit);
        assert_eq!(item.ad_hoc, None);

        let item: BillItemArg = "abc:2:package:pct=12.5".parse().unwrap();
        assert_eq!(item.unit, SaleUnit::Package);
        assert_eq!(
            item.ad_hoc,
            Some(AdHocDiscount::Percent(Percent::from_bps(1_250)))
        );

        let item: BillItemArg = "abc:3:flat=1.50".parse().unwrap();
        assert_eq!(
            item.ad_hoc,
            Some(AdHocDiscount::FlatPerUnit(Money::from_paise(150)))
        );
    }

    #[test]
    fn test_parse_item_arg_rejects_garbage() {
        assert!("".parse::<BillItemArg>().is_err());
        assert!("abc".parse::<BillItemArg>().is_err());
        assert!("abc:two".parse::<BillItemArg>().is_err());
        assert!("abc:2:crate".parse::<BillItemArg>().is_err());
    }
}
