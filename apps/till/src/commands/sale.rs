//! # Sale Commands
//!
//! Committing the bill and looking up invoices.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_bill                                                            │
//! │    snapshot bill ──► Checkout::record ──► clear bill                    │
//! │                         │ (error: bill kept for correction)             │
//! │                         ▼                                               │
//! │                    RecordedSale ──► invoice can be shown now            │
//! │                                                                         │
//! │  apply_recorded_stock                                                   │
//! │    RecordedSale::apply_stock ──► Committed | PartialSuccess             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use apothecary_core::invoice::InvoiceState;
use apothecary_db::Database;
use chrono::{TimeZone, Utc};
use tracing::{debug, warn};

use crate::checkout::{Checkout, CommitOutcome, RecordedSale};
use crate::error::ApiResult;
use crate::state::BillState;

/// Stores the current bill as a sale and clears it.
///
/// Stock is not updated yet. A failed record leaves the bill untouched.
pub async fn record_bill(db: &Database, bill: &BillState) -> ApiResult<RecordedSale> {
    let snapshot = bill.snapshot()?;
    debug!(lines = snapshot.line_count(), "record_bill command");

    let catalog = db.catalog();
    let sales = db.sales();
    let recorded = Checkout::new(&catalog, &sales).record(&snapshot).await?;

    bill.with_bill_mut(|b| b.clear(Utc::now()))?;
    Ok(recorded)
}

/// Applies the stock changes of a recorded sale.
pub async fn apply_recorded_stock(db: &Database, recorded: &RecordedSale) -> CommitOutcome {
    let outcome = recorded.apply_stock(&db.catalog()).await;
    if let CommitOutcome::PartialSuccess { failures } = &outcome {
        warn!(
            sale_id = %recorded.sale.id,
            failed = failures.len(),
            "Sale committed with stock failures"
        );
    }
    outcome
}

/// Records the bill and applies its stock changes.
pub async fn commit_bill(
    db: &Database,
    bill: &BillState,
) -> ApiResult<(RecordedSale, CommitOutcome)> {
    let recorded = record_bill(db, bill).await?;
    let outcome = apply_recorded_stock(db, &recorded).await;
    Ok((recorded, outcome))
}

/// Looks up a stored sale for its invoice, rendering times in `tz`.
pub async fn get_invoice<Tz: TimeZone>(
    db: &Database,
    sale_id: &str,
    tz: &Tz,
) -> ApiResult<InvoiceState> {
    debug!(sale_id = %sale_id, "get_invoice command");
    let record = db.sales().get_with_items(sale_id).await?;
    Ok(InvoiceState::from_lookup(record.as_ref(), tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::bill::{add_to_bill, get_bill, set_customer_phone};
    use crate::commands::catalog::{add_entry, tests::paracetamol_form};
    use crate::error::ErrorCode;
    use apothecary_core::{SaleUnit, StockLevel};
    use apothecary_db::DbConfig;

    async fn setup() -> (Database, BillState, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let entry = add_entry(&db, &paracetamol_form()).await.unwrap();
        (db, BillState::new(), entry.id)
    }

    #[tokio::test]
    async fn test_commit_bill_updates_stock_and_clears() {
        let (db, bill, id) = setup().await;
        add_to_bill(&db, &bill, &id, 7, SaleUnit::Unit, None).await.unwrap();
        set_customer_phone(&bill, "9876543210").unwrap();

        let (recorded, outcome) = commit_bill(&db, &bill).await.unwrap();

        assert!(outcome.is_committed());
        assert!(get_bill(&bill).unwrap().lines.is_empty());

        let entry = db.catalog().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(entry.stock_level(), StockLevel::new(2, 7));

        let stored = db.sales().get_with_items(&recorded.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.sale.grand_total, recorded.sale.grand_total);
    }

    #[tokio::test]
    async fn test_failed_record_keeps_bill() {
        let (db, bill, id) = setup().await;
        add_to_bill(&db, &bill, &id, 7, SaleUnit::Unit, None).await.unwrap();

        let err = record_bill(&db, &bill).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(get_bill(&bill).unwrap().lines.len(), 1);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stock_sold_elsewhere_blocks_commit() {
        let (db, bill, id) = setup().await;
        add_to_bill(&db, &bill, &id, 30, SaleUnit::Unit, None).await.unwrap();
        set_customer_phone(&bill, "9876543210").unwrap();

        // Another counter sells most of it first.
        let other = BillState::new();
        add_to_bill(&db, &other, &id, 2, SaleUnit::Package, None).await.unwrap();
        set_customer_phone(&other, "9123456780").unwrap();
        commit_bill(&db, &other).await.unwrap();

        let err = commit_bill(&db, &bill).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(get_bill(&bill).unwrap().lines.len(), 1);
        assert_eq!(db.sales().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invoice_lookup() {
        let (db, bill, id) = setup().await;
        add_to_bill(&db, &bill, &id, 1, SaleUnit::Package, None).await.unwrap();
        set_customer_phone(&bill, "9876543210").unwrap();
        let (recorded, _) = commit_bill(&db, &bill).await.unwrap();

        let state = get_invoice(&db, &recorded.sale.id, &Utc).await.unwrap();
        let invoice = state.invoice().unwrap();
        assert_eq!(invoice.bill_number, recorded.sale.bill_number);
        assert_eq!(invoice.lines.len(), 1);

        let missing = get_invoice(&db, "no-such-sale", &Utc).await.unwrap();
        assert_eq!(missing, InvoiceState::NotFound);
    }
}
