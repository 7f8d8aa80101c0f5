//! # Catalog Commands
//!
//! Medicine list, search, the add/edit form, deletion, legacy import and
//! inventory alerts.
//!
//! ## Form Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CatalogEntryInput (text fields as typed)                              │
//! │       │                                                                 │
//! │       ├── blank / malformed amounts, percents, counts → 0              │
//! │       ├── drug type, expiry month → must parse if given                │
//! │       ▼                                                                 │
//! │  CatalogEntry ── validate_catalog_entry ──► insert / update            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use apothecary_core::alerts::InventoryAlerts;
use apothecary_core::legacy::parse_legacy_catalog;
use apothecary_core::validation::{
    parse_count_or_zero, parse_money_or_zero, parse_percent_or_zero, validate_catalog_entry,
    validate_search_query,
};
use apothecary_core::{CatalogEntry, DrugType, ExpiryMonth, Percent, DEFAULT_REMINDER_PACKAGES};
use apothecary_db::Database;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// The add/edit medicine form, as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogEntryInput {
    pub product_name: String,
    pub supplier_name: String,
    pub batch_no: String,
    pub drug_type: String,
    pub package_description: String,
    /// `YYYY-MM`, or blank.
    pub expiry: String,
    pub package_mrp: String,
    pub standard_discount: String,
    pub purchase_rate: String,
    pub purchase_discount: String,
    pub cgst: String,
    pub sgst: String,
    pub stock_packages: String,
    pub remaining_units: String,
    pub reminder_threshold_packages: String,
}

impl CatalogEntryInput {
    /// Builds and validates an entry from the form.
    pub fn to_entry(
        &self,
        id: String,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ApiResult<CatalogEntry> {
        let drug_type = match self.drug_type.trim() {
            "" => DrugType::default(),
            text => text.parse::<DrugType>()?,
        };

        let expiry = match self.expiry.trim() {
            "" => None,
            text => Some(text.parse::<ExpiryMonth>()?),
        };

        let optional_percent = |text: &str| Some(parse_percent_or_zero(text)).filter(|p| !p.is_zero());

        let reminder = match self.reminder_threshold_packages.trim() {
            "" => DEFAULT_REMINDER_PACKAGES,
            text => parse_count_or_zero(text),
        };

        let entry = CatalogEntry {
            id,
            product_name: self.product_name.trim().to_string(),
            supplier_name: self.supplier_name.trim().to_string(),
            batch_no: self.batch_no.trim().to_string(),
            drug_type,
            package_description: self.package_description.trim().to_string(),
            expiry,
            package_mrp: parse_money_or_zero(&self.package_mrp),
            standard_discount: optional_percent(&self.standard_discount),
            purchase_rate: parse_money_or_zero(&self.purchase_rate),
            purchase_discount: optional_percent(&self.purchase_discount),
            cgst: parse_percent_or_zero(&self.cgst),
            sgst: parse_percent_or_zero(&self.sgst),
            stock_packages: parse_count_or_zero(&self.stock_packages),
            remaining_units: parse_count_or_zero(&self.remaining_units),
            reminder_threshold_packages: reminder,
            created_at,
            updated_at: now,
        };

        validate_catalog_entry(&entry)?;
        Ok(entry)
    }
}

impl From<&CatalogEntry> for CatalogEntryInput {
    /// Pre-fills the edit form.
    fn from(entry: &CatalogEntry) -> Self {
        let percent = |p: Option<Percent>| p.map(|p| p.to_string().trim_end_matches('%').to_string());
        CatalogEntryInput {
            product_name: entry.product_name.clone(),
            supplier_name: entry.supplier_name.clone(),
            batch_no: entry.batch_no.clone(),
            drug_type: entry.drug_type.as_str().to_string(),
            package_description: entry.package_description.clone(),
            expiry: entry.expiry.map(|e| e.to_string()).unwrap_or_default(),
            package_mrp: entry.package_mrp.to_decimal_string(),
            standard_discount: percent(entry.standard_discount).unwrap_or_default(),
            purchase_rate: entry.purchase_rate.to_decimal_string(),
            purchase_discount: percent(entry.purchase_discount).unwrap_or_default(),
            cgst: percent(Some(entry.cgst)).unwrap_or_default(),
            sgst: percent(Some(entry.sgst)).unwrap_or_default(),
            stock_packages: entry.stock_packages.to_string(),
            remaining_units: entry.remaining_units.to_string(),
            reminder_threshold_packages: entry.reminder_threshold_packages.to_string(),
        }
    }
}

/// Result of a legacy catalog import.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: Vec<SkippedRecord>,
}

/// A legacy row that could not be imported.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub product_name: String,
    pub reason: String,
}

/// All medicines ordered by name.
pub async fn list_catalog(db: &Database) -> ApiResult<Vec<CatalogEntry>> {
    Ok(db.catalog().list().await?)
}

/// Medicines whose name or batch contains `query`.
pub async fn search_catalog(db: &Database, query: &str, limit: u32) -> ApiResult<Vec<CatalogEntry>> {
    let query = validate_search_query(query)?;
    debug!(query = %query, limit = %limit, "search_catalog command");
    Ok(db.catalog().search(&query, limit.clamp(1, 500)).await?)
}

/// Adds a medicine from the form.
pub async fn add_entry(db: &Database, input: &CatalogEntryInput) -> ApiResult<CatalogEntry> {
    let now = Utc::now();
    let entry = input.to_entry(Uuid::new_v4().to_string(), now, now)?;

    db.catalog().insert(&entry).await?;

    info!(entry_id = %entry.id, name = %entry.product_name, "Medicine added");
    Ok(entry)
}

/// Replaces a medicine with the edited form. Stock edits are taken as typed.
pub async fn update_entry(
    db: &Database,
    id: &str,
    input: &CatalogEntryInput,
) -> ApiResult<CatalogEntry> {
    let existing = db
        .catalog()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Medicine", id))?;

    let entry = input.to_entry(existing.id, existing.created_at, Utc::now())?;
    db.catalog().update(&entry).await?;

    info!(entry_id = %entry.id, "Medicine updated");
    Ok(entry)
}

/// Deletes a medicine. Past sales keep their line snapshots.
pub async fn delete_entry(db: &Database, id: &str) -> ApiResult<()> {
    db.catalog().delete(id).await?;
    info!(entry_id = %id, "Medicine deleted");
    Ok(())
}

/// Imports a JSON array of catalog rows from any earlier revision.
///
/// Rows that fail validation or collide with an existing id are skipped
/// and reported; the rest are inserted.
pub async fn import_legacy_catalog(db: &Database, json: &str) -> ApiResult<ImportSummary> {
    let records = parse_legacy_catalog(json)?;
    let now = Utc::now();
    let repo = db.catalog();

    let mut summary = ImportSummary::default();
    for record in records {
        let name = record.product_name.clone();
        let entry = match record.into_entry(now) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(name = %name, reason = %e, "Skipping legacy record");
                summary.skipped.push(SkippedRecord {
                    product_name: name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if let Err(e) = repo.insert(&entry).await {
            warn!(name = %name, reason = %e, "Skipping legacy record");
            summary.skipped.push(SkippedRecord {
                product_name: name,
                reason: e.to_string(),
            });
            continue;
        }
        summary.imported += 1;
    }

    info!(
        imported = summary.imported,
        skipped = summary.skipped.len(),
        "Legacy catalog imported"
    );
    Ok(summary)
}

/// Low-stock and near-expiry medicines as of `today`.
pub async fn inventory_alerts(db: &Database, today: NaiveDate) -> ApiResult<InventoryAlerts> {
    let entries = db.catalog().list().await?;
    Ok(InventoryAlerts::scan(&entries, today))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use apothecary_core::StockLevel;
    use apothecary_db::DbConfig;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub(crate) fn paracetamol_form() -> CatalogEntryInput {
        CatalogEntryInput {
            product_name: "Paracetamol 500".into(),
            supplier_name: "City Distributors".into(),
            batch_no: "PCM-2201".into(),
            drug_type: "tablet".into(),
            package_description: "10 tablets".into(),
            expiry: "2027-03".into(),
            package_mrp: "25.00".into(),
            standard_discount: "10".into(),
            purchase_rate: "18".into(),
            purchase_discount: "".into(),
            cgst: "6".into(),
            sgst: "6".into(),
            stock_packages: "3".into(),
            remaining_units: "4".into(),
            reminder_threshold_packages: "".into(),
        }
    }

    #[test]
    fn test_form_parsing() {
        let now = Utc::now();
        let entry = paracetamol_form().to_entry("id-1".into(), now, now).unwrap();

        assert_eq!(entry.package_mrp.paise(), 2_500);
        assert_eq!(entry.standard_discount, Some(Percent::from_whole(10)));
        assert_eq!(entry.purchase_discount, None);
        assert_eq!(entry.cgst.bps(), 600);
        assert_eq!(entry.stock_level(), StockLevel::new(3, 4));
        assert_eq!(entry.reminder_threshold_packages, DEFAULT_REMINDER_PACKAGES);
        assert_eq!(entry.drug_type, DrugType::Tablet);
    }

    #[test]
    fn test_form_rejects_bad_input() {
        let now = Utc::now();

        let mut form = paracetamol_form();
        form.package_description = "tablets".into();
        assert!(form.to_entry("id".into(), now, now).is_err());

        let mut form = paracetamol_form();
        form.expiry = "March".into();
        assert!(form.to_entry("id".into(), now, now).is_err());

        let mut form = paracetamol_form();
        form.remaining_units = "10".into();
        assert!(form.to_entry("id".into(), now, now).is_err());
    }

    #[test]
    fn test_edit_form_round_trip() {
        let now = Utc::now();
        let entry = paracetamol_form().to_entry("id-1".into(), now, now).unwrap();
        let again = CatalogEntryInput::from(&entry)
            .to_entry("id-1".into(), now, now)
            .unwrap();
        assert_eq!(again, entry);
    }

    #[tokio::test]
    async fn test_add_update_delete() {
        let db = db().await;

        let entry = add_entry(&db, &paracetamol_form()).await.unwrap();
        assert_eq!(list_catalog(&db).await.unwrap().len(), 1);

        let mut form = CatalogEntryInput::from(&entry);
        form.package_mrp = "30".into();
        let updated = update_entry(&db, &entry.id, &form).await.unwrap();
        assert_eq!(updated.package_mrp.paise(), 3_000);
        assert_eq!(updated.created_at, entry.created_at);

        delete_entry(&db, &entry.id).await.unwrap();
        assert!(search_catalog(&db, "para", 10).await.unwrap().is_empty());

        let err = update_entry(&db, &entry.id, &form).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_import_legacy_catalog() {
        let db = db().await;
        let json = r#"[
            {"product_name": "Crocin", "batch_no": "C1", "no_of_items": "15 tablets",
             "mrp": "30", "gst": 12, "stock": "4", "expiry_date": "2027-01"},
            {"product_name": "", "batch_no": "X", "no_of_items": "10 tablets"}
        ]"#;

        let summary = import_legacy_catalog(&db, json).await.unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped.len(), 1);

        let crocin = &search_catalog(&db, "crocin", 10).await.unwrap()[0];
        assert_eq!(crocin.cgst.bps(), 600);
        assert_eq!(crocin.sgst.bps(), 600);
    }

    #[tokio::test]
    async fn test_inventory_alerts() {
        let db = db().await;
        let mut form = paracetamol_form();
        form.expiry = "2026-11".into();
        add_entry(&db, &form).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let alerts = inventory_alerts(&db, today).await.unwrap();

        assert_eq!(alerts.low_stock.len(), 1);
        assert_eq!(alerts.expiring_soon.len(), 1);
    }
}
