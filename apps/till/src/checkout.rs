//! # Checkout
//!
//! Turns an assembled bill into a recorded sale and applies its stock
//! deductions.
//!
//! ## Commit Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record(bill)                                                           │
//! │   0. customer phone present, bill not empty          → Validation      │
//! │   1. re-fetch every referenced entry                 → EntryMissing    │
//! │   2. sum units per entry, reconcile against fresh    → InsufficientStock│
//! │      stock (nothing written yet)                                        │
//! │   3. write sale header                               → Persistence     │
//! │   4. write all line items as one batch               → Persistence     │
//! │      (header left without items; the orphan sweep removes it)          │
//! │   ── RecordedSale: the caller may show the invoice now ──               │
//! │                                                                         │
//! │  apply_stock()                                                          │
//! │   5. one conditional write per entry, issued together, awaited jointly │
//! │      all ok   → Committed                                              │
//! │      any fail → PartialSuccess { failures }  (sale stays recorded)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;

use apothecary_core::validation::validate_customer_phone;
use apothecary_core::{
    reconcile, Bill, CatalogEntry, CoreError, Sale, SaleLineItem, SaleRecord, StockUpdate,
    ValidationError,
};
use apothecary_db::DbError;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::store::{CatalogStore, SaleStore};

// =============================================================================
// Outcomes and Errors
// =============================================================================

/// Which write failed before the sale was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitStage {
    CatalogRead,
    Header,
    LineItems,
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommitStage::CatalogRead => "reading the catalog",
            CommitStage::Header => "saving the sale",
            CommitStage::LineItems => "saving the sale items",
        })
    }
}

/// The sale was not recorded.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Missing or malformed input, caught before any I/O.
    #[error(transparent)]
    Validation(CoreError),

    /// Fresh stock cannot cover the bill.
    #[error("Stock changed since this item was added: only {available} units of {product} available, {requested} required")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// A billed entry no longer exists in the catalog.
    #[error("{product} is no longer in the catalog")]
    EntryMissing { entry_id: String, product: String },

    /// A store call failed. Nothing counts as sold; retry.
    #[error("Sale not recorded: failed while {stage} ({source}). Please retry.")]
    Persistence {
        stage: CommitStage,
        #[source]
        source: DbError,
    },
}

impl From<ValidationError> for CommitError {
    fn from(err: ValidationError) -> Self {
        CommitError::Validation(CoreError::Validation(err))
    }
}

/// A stock write that did not land after the sale was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFailure {
    pub entry_id: String,
    pub product_name: String,
    pub units_sold: i64,
    pub reason: String,
}

/// How stock application ended for a recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CommitOutcome {
    /// Sale recorded and every stock write applied.
    Committed,
    /// Sale recorded; these entries need manual stock correction.
    PartialSuccess { failures: Vec<StockFailure> },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed)
    }
}

// =============================================================================
// Recorded Sale
// =============================================================================

/// A sale whose header and items are stored, with its pending stock writes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSale {
    pub sale: Sale,
    pub items: Vec<SaleLineItem>,
    pub stock_updates: Vec<StockUpdate>,
}

impl RecordedSale {
    /// The stored sale, ready for an invoice.
    pub fn to_record(&self) -> SaleRecord {
        SaleRecord {
            sale: self.sale.clone(),
            items: self.items.clone(),
        }
    }

    /// Applies every reconciled stock change concurrently.
    ///
    /// Failures are collected, never rolled back.
    pub async fn apply_stock<C: CatalogStore + ?Sized>(&self, catalog: &C) -> CommitOutcome {
        let writes = self.stock_updates.iter().map(|update| async move {
            catalog
                .apply_stock(update)
                .await
                .map_err(|e| StockFailure {
                    entry_id: update.entry_id.clone(),
                    product_name: update.product_name.clone(),
                    units_sold: update.units_sold,
                    reason: e.to_string(),
                })
        });

        let failures: Vec<StockFailure> = join_all(writes)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if failures.is_empty() {
            info!(
                sale_id = %self.sale.id,
                bill_number = %self.sale.bill_number,
                entries = self.stock_updates.len(),
                "Stock updated"
            );
            return CommitOutcome::Committed;
        }

        for failure in &failures {
            warn!(
                sale_id = %self.sale.id,
                entry_id = %failure.entry_id,
                required_units = failure.units_sold,
                reason = %failure.reason,
                "Stock not updated; needs manual correction"
            );
        }
        CommitOutcome::PartialSuccess { failures }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Runs the commit workflow against a catalog store and a sale store.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog();
/// let sales = db.sales();
/// let checkout = Checkout::new(&catalog, &sales);
///
/// let recorded = checkout.record(&bill).await?;
/// show_invoice(&recorded);
/// let outcome = recorded.apply_stock(&catalog).await;
/// ```
pub struct Checkout<'a, C: ?Sized, S: ?Sized> {
    catalog: &'a C,
    sales: &'a S,
}

impl<'a, C, S> Checkout<'a, C, S>
where
    C: CatalogStore + ?Sized,
    S: SaleStore + ?Sized,
{
    pub fn new(catalog: &'a C, sales: &'a S) -> Self {
        Checkout { catalog, sales }
    }

    /// Validates, reconciles against fresh stock and stores the sale.
    ///
    /// Stock is not touched; see [`RecordedSale::apply_stock`].
    pub async fn record(&self, bill: &Bill) -> Result<RecordedSale, CommitError> {
        if bill.is_empty() {
            return Err(ValidationError::Required {
                field: "at least one item".to_string(),
            }
            .into());
        }
        validate_customer_phone(&bill.customer_phone)?;

        let required = bill.required_units_by_entry();
        let ids: Vec<String> = required.keys().cloned().collect();

        debug!(entries = ids.len(), lines = bill.line_count(), "Re-fetching catalog for commit");

        let fresh = self
            .catalog
            .fetch_by_ids(&ids)
            .await
            .map_err(|source| CommitError::Persistence {
                stage: CommitStage::CatalogRead,
                source,
            })?;
        let fresh: HashMap<&str, &CatalogEntry> =
            fresh.iter().map(|e| (e.id.as_str(), e)).collect();

        let mut stock_updates = Vec::with_capacity(required.len());
        for (entry_id, &units) in &required {
            let Some(entry) = fresh.get(entry_id.as_str()) else {
                let product = bill
                    .lines
                    .iter()
                    .find(|l| &l.entry_id == entry_id)
                    .map(|l| l.product_name.clone())
                    .unwrap_or_else(|| entry_id.clone());
                return Err(CommitError::EntryMissing {
                    entry_id: entry_id.clone(),
                    product,
                });
            };

            let upp = entry.units_per_package().ok_or_else(|| {
                CommitError::Validation(CoreError::UnitsPerPackageUnresolvable {
                    product: entry.product_name.clone(),
                    description: entry.package_description.clone(),
                })
            })?;

            let before = entry.stock_level();
            let after = reconcile(before, upp, units).map_err(|short| {
                CommitError::InsufficientStock {
                    product: entry.product_name.clone(),
                    available: short.available_units,
                    requested: short.required_units,
                }
            })?;

            stock_updates.push(StockUpdate {
                entry_id: entry_id.clone(),
                product_name: entry.product_name.clone(),
                before,
                after,
                units_sold: units,
            });
        }

        let sale = self
            .sales
            .insert_header(&bill.customer_phone, bill.grand_total(), Utc::now())
            .await
            .map_err(|source| {
                error!(error = %source, "Sale header not written");
                CommitError::Persistence {
                    stage: CommitStage::Header,
                    source,
                }
            })?;

        if let Err(source) = self.sales.insert_line_items(&sale.id, &bill.lines).await {
            error!(
                sale_id = %sale.id,
                bill_number = %sale.bill_number,
                error = %source,
                "Sale items not written; header has no items"
            );
            return Err(CommitError::Persistence {
                stage: CommitStage::LineItems,
                source,
            });
        }

        info!(
            sale_id = %sale.id,
            bill_number = %sale.bill_number,
            grand_total = %sale.grand_total,
            lines = bill.line_count(),
            "Sale recorded"
        );

        Ok(RecordedSale {
            sale,
            items: bill.lines.clone(),
            stock_updates,
        })
    }

    /// Records the sale, then applies its stock changes.
    pub async fn commit(&self, bill: &Bill) -> Result<(RecordedSale, CommitOutcome), CommitError> {
        let recorded = self.record(bill).await?;
        let outcome = recorded.apply_stock(self.catalog).await;
        Ok((recorded, outcome))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use apothecary_core::{
        bill_number_for, AdHocDiscount, DrugType, ExpiryMonth, Money, Percent,
        SaleUnit, StockLevel, WALK_IN_CUSTOMER,
    };
    use apothecary_db::DbResult;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::HashSet;
    use std::sync::Mutex;

    pub(crate) fn entry(id: &str, name: &str, packages: i64, remaining: i64) -> CatalogEntry {
        let now = Utc::now();
        CatalogEntry {
            id: id.to_string(),
            product_name: name.to_string(),
            supplier_name: String::new(),
            batch_no: format!("B-{}", id),
            drug_type: DrugType::Tablet,
            package_description: "10 tablets".to_string(),
            expiry: ExpiryMonth::new(2027, 3).ok(),
            package_mrp: Money::from_paise(2_500),
            standard_discount: Some(Percent::from_whole(10)),
            purchase_rate: Money::zero(),
            purchase_discount: None,
            cgst: Percent::from_bps(600),
            sgst: Percent::from_bps(600),
            stock_packages: packages,
            remaining_units: remaining,
            reminder_threshold_packages: 5,
            created_at: now,
            updated_at: now,
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        entries: Mutex<HashMap<String, CatalogEntry>>,
        fail_fetch: bool,
        fail_stock_for: HashSet<String>,
    }

    impl FakeCatalog {
        fn with(entries: &[CatalogEntry]) -> Self {
            FakeCatalog {
                entries: Mutex::new(entries.iter().map(|e| (e.id.clone(), e.clone())).collect()),
                ..Default::default()
            }
        }

        fn level(&self, id: &str) -> StockLevel {
            self.entries.lock().unwrap()[id].stock_level()
        }

        fn set_level(&self, id: &str, level: StockLevel) {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries.get_mut(id).unwrap();
            entry.stock_packages = level.packages;
            entry.remaining_units = level.remaining_units;
        }
    }

    #[async_trait]
    impl CatalogStore for FakeCatalog {
        async fn fetch_by_ids(&self, ids: &[String]) -> DbResult<Vec<CatalogEntry>> {
            if self.fail_fetch {
                return Err(DbError::ConnectionFailed("offline".into()));
            }
            let entries = self.entries.lock().unwrap();
            Ok(ids.iter().filter_map(|id| entries.get(id).cloned()).collect())
        }

        async fn apply_stock(&self, update: &StockUpdate) -> DbResult<()> {
            if self.fail_stock_for.contains(&update.entry_id) {
                return Err(DbError::Internal("disk I/O error".into()));
            }
            let mut entries = self.entries.lock().unwrap();
            let entry = entries
                .get_mut(&update.entry_id)
                .ok_or_else(|| DbError::not_found("Medicine", &update.entry_id))?;
            if entry.stock_level() != update.before {
                return Err(DbError::StockConflict {
                    id: update.entry_id.clone(),
                });
            }
            entry.stock_packages = update.after.packages;
            entry.remaining_units = update.after.remaining_units;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSales {
        headers: Mutex<Vec<Sale>>,
        items: Mutex<HashMap<String, Vec<SaleLineItem>>>,
        fail_header: bool,
        fail_items: bool,
    }

    #[async_trait]
    impl SaleStore for FakeSales {
        async fn insert_header(
            &self,
            customer_phone: &str,
            grand_total: Money,
            sale_date: DateTime<Utc>,
        ) -> DbResult<Sale> {
            if self.fail_header {
                return Err(DbError::QueryFailed("database is locked".into()));
            }
            let mut headers = self.headers.lock().unwrap();
            let sale = Sale {
                id: format!("sale-{}", headers.len() + 1),
                bill_number: bill_number_for(sale_date),
                customer_name: WALK_IN_CUSTOMER.to_string(),
                customer_phone: customer_phone.to_string(),
                grand_total,
                sale_date,
            };
            headers.push(sale.clone());
            Ok(sale)
        }

        async fn insert_line_items(&self, sale_id: &str, items: &[SaleLineItem]) -> DbResult<()> {
            if self.fail_items {
                return Err(DbError::TransactionFailed("disk full".into()));
            }
            self.items
                .lock()
                .unwrap()
                .insert(sale_id.to_string(), items.to_vec());
            Ok(())
        }
    }

    fn bill_for(lines: &[(&CatalogEntry, i64)]) -> Bill {
        let mut bill = Bill::new(Utc::now());
        bill.set_customer_phone("9876543210");
        for (entry, units) in lines {
            bill.add_line(entry, *units, SaleUnit::Unit, None).unwrap();
        }
        bill
    }

    #[tokio::test]
    async fn test_commit_records_sale_and_deducts_stock() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let catalog = FakeCatalog::with(&[para.clone()]);
        let sales = FakeSales::default();
        let bill = bill_for(&[(&para, 7)]);

        let (recorded, outcome) = Checkout::new(&catalog, &sales).commit(&bill).await.unwrap();

        assert_eq!(outcome, CommitOutcome::Committed);
        assert_eq!(catalog.level("1"), StockLevel::new(2, 7));
        assert_eq!(recorded.sale.grand_total, bill.grand_total());
        assert_eq!(recorded.sale.customer_name, WALK_IN_CUSTOMER);
        assert_eq!(sales.headers.lock().unwrap().len(), 1);
        assert_eq!(sales.items.lock().unwrap()[&recorded.sale.id], bill.lines);
    }

    #[tokio::test]
    async fn test_units_summed_across_lines_of_one_entry() {
        let para = entry("1", "Paracetamol 500", 1, 0);
        let catalog = FakeCatalog::with(&[para.clone()]);
        let sales = FakeSales::default();

        let mut bill = bill_for(&[(&para, 5)]);
        bill.add_line(
            &para,
            5,
            SaleUnit::Unit,
            Some(AdHocDiscount::Percent(Percent::from_whole(5))),
        )
        .unwrap();
        assert_eq!(bill.line_count(), 2);

        let (recorded, outcome) = Checkout::new(&catalog, &sales).commit(&bill).await.unwrap();

        assert!(outcome.is_committed());
        assert_eq!(recorded.stock_updates.len(), 1);
        assert_eq!(recorded.stock_updates[0].units_sold, 10);
        assert_eq!(catalog.level("1"), StockLevel::new(0, 0));
    }

    #[tokio::test]
    async fn test_stale_snapshot_rejected_before_any_write() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let catalog = FakeCatalog::with(&[para.clone()]);
        let sales = FakeSales::default();
        let bill = bill_for(&[(&para, 7)]);

        // Another till sold most of it after the line was added.
        catalog.set_level("1", StockLevel::new(0, 3));

        let err = Checkout::new(&catalog, &sales).record(&bill).await.unwrap_err();

        match err {
            CommitError::InsufficientStock {
                product,
                available,
                requested,
            } => {
                assert_eq!(product, "Paracetamol 500");
                assert_eq!(available, 3);
                assert_eq!(requested, 7);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(sales.headers.lock().unwrap().is_empty());
        assert_eq!(catalog.level("1"), StockLevel::new(0, 3));
    }

    #[tokio::test]
    async fn test_missing_phone_and_empty_bill_rejected() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let catalog = FakeCatalog::with(&[para.clone()]);
        let sales = FakeSales::default();
        let checkout = Checkout::new(&catalog, &sales);

        let mut bill = bill_for(&[(&para, 2)]);
        bill.set_customer_phone("   ");
        assert!(matches!(
            checkout.record(&bill).await,
            Err(CommitError::Validation(_))
        ));

        let mut empty = Bill::new(Utc::now());
        empty.set_customer_phone("9876543210");
        assert!(matches!(
            checkout.record(&empty).await,
            Err(CommitError::Validation(_))
        ));

        assert!(sales.headers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_entry_aborts() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let catalog = FakeCatalog::default();
        let sales = FakeSales::default();
        let bill = bill_for(&[(&para, 2)]);

        let err = Checkout::new(&catalog, &sales).record(&bill).await.unwrap_err();

        assert!(matches!(
            err,
            CommitError::EntryMissing { ref product, .. } if product == "Paracetamol 500"
        ));
        assert!(sales.headers.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_read_failure_aborts() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let catalog = FakeCatalog {
            fail_fetch: true,
            ..FakeCatalog::with(&[para.clone()])
        };
        let sales = FakeSales::default();
        let bill = bill_for(&[(&para, 2)]);

        let err = Checkout::new(&catalog, &sales).record(&bill).await.unwrap_err();

        assert!(matches!(
            err,
            CommitError::Persistence {
                stage: CommitStage::CatalogRead,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_header_failure_writes_nothing() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let catalog = FakeCatalog::with(&[para.clone()]);
        let sales = FakeSales {
            fail_header: true,
            ..Default::default()
        };
        let bill = bill_for(&[(&para, 2)]);

        let err = Checkout::new(&catalog, &sales).commit(&bill).await.unwrap_err();

        assert!(matches!(
            err,
            CommitError::Persistence {
                stage: CommitStage::Header,
                ..
            }
        ));
        assert!(sales.items.lock().unwrap().is_empty());
        assert_eq!(catalog.level("1"), StockLevel::new(3, 4));
    }

    #[tokio::test]
    async fn test_line_item_failure_leaves_stock_alone() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let catalog = FakeCatalog::with(&[para.clone()]);
        let sales = FakeSales {
            fail_items: true,
            ..Default::default()
        };
        let bill = bill_for(&[(&para, 2)]);

        let err = Checkout::new(&catalog, &sales).commit(&bill).await.unwrap_err();

        assert!(matches!(
            err,
            CommitError::Persistence {
                stage: CommitStage::LineItems,
                ..
            }
        ));
        // Header without items stays behind for the orphan sweep.
        assert_eq!(sales.headers.lock().unwrap().len(), 1);
        assert_eq!(catalog.level("1"), StockLevel::new(3, 4));
    }

    #[tokio::test]
    async fn test_failed_stock_write_is_partial_success() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let amox = entry("2", "Amoxicillin 500", 2, 0);
        let catalog = FakeCatalog {
            fail_stock_for: HashSet::from(["2".to_string()]),
            ..FakeCatalog::with(&[para.clone(), amox.clone()])
        };
        let sales = FakeSales::default();
        let bill = bill_for(&[(&para, 7), (&amox, 5)]);

        let (recorded, outcome) = Checkout::new(&catalog, &sales).commit(&bill).await.unwrap();

        match outcome {
            CommitOutcome::PartialSuccess { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].product_name, "Amoxicillin 500");
                assert_eq!(failures[0].units_sold, 5);
            }
            CommitOutcome::Committed => panic!("expected partial success"),
        }
        assert_eq!(catalog.level("1"), StockLevel::new(2, 7));
        assert_eq!(catalog.level("2"), StockLevel::new(2, 0));
        assert_eq!(sales.items.lock().unwrap()[&recorded.sale.id].len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_change_before_stock_write_is_reported() {
        let para = entry("1", "Paracetamol 500", 3, 4);
        let catalog = FakeCatalog::with(&[para.clone()]);
        let sales = FakeSales::default();
        let bill = bill_for(&[(&para, 7)]);

        let recorded = Checkout::new(&catalog, &sales).record(&bill).await.unwrap();
        catalog.set_level("1", StockLevel::new(3, 0));

        let outcome = recorded.apply_stock(&catalog).await;

        assert!(matches!(
            outcome,
            CommitOutcome::PartialSuccess { ref failures } if failures[0].reason.contains("changed")
        ));
        assert_eq!(catalog.level("1"), StockLevel::new(3, 0));
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(CommitOutcome::Committed).unwrap();
        assert_eq!(json["status"], "committed");

        let json = serde_json::to_value(CommitOutcome::PartialSuccess { failures: vec![] }).unwrap();
        assert_eq!(json["status"], "partialSuccess");
    }
}
