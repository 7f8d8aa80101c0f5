//! # Catalog Repository
//!
//! Database operations for medicines.
//!
//! ## Conditional Stock Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_stock(update)                                                    │
//! │                                                                         │
//! │  UPDATE medicines SET stock = after                                    │
//! │   WHERE id = ? AND stock = before     ← compare-and-swap               │
//! │       │                                                                 │
//! │       ├── 1 row  → done                                                │
//! │       └── 0 rows → row missing?  NotFound                              │
//! │                    row changed?  StockConflict                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two tills selling the same medicine cannot both write stock computed
//! from the same starting level: the second write is rejected.

use apothecary_core::{CatalogEntry, DrugType, StockUpdate};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use super::{expiry_from_db, expiry_to_db, money_from_db, percent_from_db, percent_to_db};
use crate::error::{DbError, DbResult};

const MEDICINE_COLUMNS: &str = "id, product_name, supplier_name, batch_no, drug_type, \
     package_description, expiry_date, package_mrp_paise, standard_discount_bps, \
     purchase_rate_paise, purchase_discount_bps, cgst_bps, sgst_bps, stock_packages, \
     remaining_units, reminder_threshold_packages, created_at, updated_at";

/// One `medicines` row.
#[derive(Debug, sqlx::FromRow)]
struct MedicineRow {
    id: String,
    product_name: String,
    supplier_name: String,
    batch_no: String,
    drug_type: DrugType,
    package_description: String,
    expiry_date: Option<String>,
    package_mrp_paise: i64,
    standard_discount_bps: Option<i64>,
    purchase_rate_paise: i64,
    purchase_discount_bps: Option<i64>,
    cgst_bps: i64,
    sgst_bps: i64,
    stock_packages: i64,
    remaining_units: i64,
    reminder_threshold_packages: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MedicineRow> for CatalogEntry {
    type Error = DbError;

    fn try_from(row: MedicineRow) -> DbResult<Self> {
        Ok(CatalogEntry {
            id: row.id,
            product_name: row.product_name,
            supplier_name: row.supplier_name,
            batch_no: row.batch_no,
            drug_type: row.drug_type,
            package_description: row.package_description,
            expiry: expiry_from_db(row.expiry_date),
            package_mrp: money_from_db(row.package_mrp_paise),
            standard_discount: row
                .standard_discount_bps
                .map(|bps| percent_from_db("standard_discount_bps", bps))
                .transpose()?,
            purchase_rate: money_from_db(row.purchase_rate_paise),
            purchase_discount: row
                .purchase_discount_bps
                .map(|bps| percent_from_db("purchase_discount_bps", bps))
                .transpose()?,
            cgst: percent_from_db("cgst_bps", row.cgst_bps)?,
            sgst: percent_from_db("sgst_bps", row.sgst_bps)?,
            stock_packages: row.stock_packages,
            remaining_units: row.remaining_units,
            reminder_threshold_packages: row.reminder_threshold_packages,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_entries(rows: Vec<MedicineRow>) -> DbResult<Vec<CatalogEntry>> {
    rows.into_iter().map(CatalogEntry::try_from).collect()
}

/// Repository for catalog database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.catalog();
///
/// let results = repo.search("para", 20).await?;
/// let entry = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a new entry. The caller validates it first.
    pub async fn insert(&self, entry: &CatalogEntry) -> DbResult<()> {
        debug!(entry_id = %entry.id, name = %entry.product_name, "Inserting catalog entry");

        sqlx::query(
            r#"
            INSERT INTO medicines (
                id, product_name, supplier_name, batch_no, drug_type,
                package_description, expiry_date, package_mrp_paise, standard_discount_bps,
                purchase_rate_paise, purchase_discount_bps, cgst_bps, sgst_bps,
                stock_packages, remaining_units, reminder_threshold_packages,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_name)
        .bind(&entry.supplier_name)
        .bind(&entry.batch_no)
        .bind(entry.drug_type)
        .bind(&entry.package_description)
        .bind(expiry_to_db(entry.expiry))
        .bind(entry.package_mrp.paise())
        .bind(entry.standard_discount.map(percent_to_db))
        .bind(entry.purchase_rate.paise())
        .bind(entry.purchase_discount.map(percent_to_db))
        .bind(percent_to_db(entry.cgst))
        .bind(percent_to_db(entry.sgst))
        .bind(entry.stock_packages)
        .bind(entry.remaining_units)
        .bind(entry.reminder_threshold_packages)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replaces every editable field of an existing entry, stock included.
    ///
    /// `updated_at` is set to now; `created_at` is left alone.
    pub async fn update(&self, entry: &CatalogEntry) -> DbResult<()> {
        debug!(entry_id = %entry.id, "Updating catalog entry");

        let result = sqlx::query(
            r#"
            UPDATE medicines SET
                product_name = ?2,
                supplier_name = ?3,
                batch_no = ?4,
                drug_type = ?5,
                package_description = ?6,
                expiry_date = ?7,
                package_mrp_paise = ?8,
                standard_discount_bps = ?9,
                purchase_rate_paise = ?10,
                purchase_discount_bps = ?11,
                cgst_bps = ?12,
                sgst_bps = ?13,
                stock_packages = ?14,
                remaining_units = ?15,
                reminder_threshold_packages = ?16,
                updated_at = ?17
            WHERE id = ?1
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.product_name)
        .bind(&entry.supplier_name)
        .bind(&entry.batch_no)
        .bind(entry.drug_type)
        .bind(&entry.package_description)
        .bind(expiry_to_db(entry.expiry))
        .bind(entry.package_mrp.paise())
        .bind(entry.standard_discount.map(percent_to_db))
        .bind(entry.purchase_rate.paise())
        .bind(entry.purchase_discount.map(percent_to_db))
        .bind(percent_to_db(entry.cgst))
        .bind(percent_to_db(entry.sgst))
        .bind(entry.stock_packages)
        .bind(entry.remaining_units)
        .bind(entry.reminder_threshold_packages)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", &entry.id));
        }
        Ok(())
    }

    /// Deletes an entry. Past sale lines keep their snapshot.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(entry_id = %id, "Deleting catalog entry");

        let result = sqlx::query("DELETE FROM medicines WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }
        Ok(())
    }

    /// Gets an entry by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CatalogEntry>> {
        let row = sqlx::query_as::<_, MedicineRow>(&format!(
            "SELECT {} FROM medicines WHERE id = ?1",
            MEDICINE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CatalogEntry::try_from).transpose()
    }

    /// Fresh rows for a set of ids. Unknown ids are simply absent.
    pub async fn fetch_by_ids(&self, ids: &[String]) -> DbResult<Vec<CatalogEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = ids.len(), "Fetching catalog entries by id");

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM medicines WHERE id IN (",
            MEDICINE_COLUMNS
        ));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let rows = query
            .build_query_as::<MedicineRow>()
            .fetch_all(&self.pool)
            .await?;

        into_entries(rows)
    }

    /// All entries ordered by product name.
    pub async fn list(&self) -> DbResult<Vec<CatalogEntry>> {
        let rows = sqlx::query_as::<_, MedicineRow>(&format!(
            "SELECT {} FROM medicines ORDER BY product_name COLLATE NOCASE, batch_no",
            MEDICINE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        into_entries(rows)
    }

    /// Entries whose name or batch contains `query`, ignoring case.
    ///
    /// An empty query lists the first `limit` entries by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<CatalogEntry>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching catalog");

        let rows = sqlx::query_as::<_, MedicineRow>(&format!(
            r#"
            SELECT {} FROM medicines
            WHERE ?1 = ''
               OR instr(lower(product_name), lower(?1)) > 0
               OR instr(lower(batch_no), lower(?1)) > 0
            ORDER BY product_name COLLATE NOCASE, batch_no
            LIMIT ?2
            "#,
            MEDICINE_COLUMNS
        ))
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Search returned entries");
        into_entries(rows)
    }

    /// Number of entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Writes `update.after` only if the row still holds `update.before`.
    ///
    /// ## Errors
    /// - [`DbError::StockConflict`] when the stored level moved
    /// - [`DbError::NotFound`] when the entry was deleted
    pub async fn apply_stock(&self, update: &StockUpdate) -> DbResult<()> {
        debug!(
            entry_id = %update.entry_id,
            required_units = update.units_sold,
            packages = update.after.packages,
            remaining_units = update.after.remaining_units,
            "Applying stock update"
        );

        let result = sqlx::query(
            r#"
            UPDATE medicines
            SET stock_packages = ?2, remaining_units = ?3, updated_at = ?4
            WHERE id = ?1 AND stock_packages = ?5 AND remaining_units = ?6
            "#,
        )
        .bind(&update.entry_id)
        .bind(update.after.packages)
        .bind(update.after.remaining_units)
        .bind(Utc::now())
        .bind(update.before.packages)
        .bind(update.before.remaining_units)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines WHERE id = ?1")
            .bind(&update.entry_id)
            .fetch_one(&self.pool)
            .await?;

        if exists == 0 {
            return Err(DbError::not_found("Medicine", &update.entry_id));
        }

        warn!(entry_id = %update.entry_id, "Stock changed since it was read");
        Err(DbError::StockConflict {
            id: update.entry_id.clone(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
