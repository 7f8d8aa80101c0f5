//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. HEADER                                                             │
//! │     └── create_sale() → Sale { id, bill_number, grand_total }          │
//! │                                                                         │
//! │  2. LINE ITEMS (one transaction)                                       │
//! │     └── insert_items(sale_id, lines)                                   │
//! │                                                                         │
//! │  3. READ BACK                                                          │
//! │     └── get_with_items() / list_with_items() → SaleRecord              │
//! │                                                                         │
//! │  A header whose items never landed is an orphan:                       │
//! │     └── delete_orphaned_headers(cutoff)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stored line items carry their own amounts. Reading a sale back never
//! reprices it.

use std::collections::HashMap;

use apothecary_core::{
    bill_number_for, AdHocDiscount, DiscountKind, LinePricing, Money, Sale, SaleLineItem,
    SaleRecord, WALK_IN_CUSTOMER,
};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{expiry_from_db, expiry_to_db, money_from_db, percent_from_db, percent_to_db};
use crate::error::{DbError, DbResult};

const SALE_COLUMNS: &str =
    "id, bill_number, customer_name, customer_phone, grand_total_paise, sale_date";

const ITEM_COLUMNS: &str = "sale_id, line_no, medicine_id, product_name, batch_no, \
     expiry_date, package_mrp_paise, units_per_package, standard_discount_bps, cgst_bps, \
     sgst_bps, quantity_units, unit_mrp_paise, gross_paise, standard_discount_paise, \
     extra_discount_type, extra_discount_value, extra_discount_paise, subtotal_paise";

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    bill_number: String,
    customer_name: String,
    customer_phone: String,
    grand_total_paise: i64,
    sale_date: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            bill_number: row.bill_number,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            grand_total: money_from_db(row.grand_total_paise),
            sale_date: row.sale_date,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    sale_id: String,
    #[allow(dead_code)]
    line_no: i64,
    medicine_id: String,
    product_name: String,
    batch_no: String,
    expiry_date: Option<String>,
    package_mrp_paise: i64,
    units_per_package: i64,
    standard_discount_bps: i64,
    cgst_bps: i64,
    sgst_bps: i64,
    quantity_units: i64,
    unit_mrp_paise: i64,
    gross_paise: i64,
    standard_discount_paise: i64,
    extra_discount_type: Option<DiscountKind>,
    extra_discount_value: Option<i64>,
    extra_discount_paise: i64,
    subtotal_paise: i64,
}

impl TryFrom<SaleItemRow> for SaleLineItem {
    type Error = DbError;

    fn try_from(row: SaleItemRow) -> DbResult<Self> {
        let units_per_package = u32::try_from(row.units_per_package)
            .ok()
            .filter(|upp| *upp > 0)
            .ok_or_else(|| {
                DbError::invalid_data(
                    "units_per_package",
                    format!("{} is not a positive unit count", row.units_per_package),
                )
            })?;

        let ad_hoc_discount = match (row.extra_discount_type, row.extra_discount_value) {
            (Some(kind), Some(value)) => AdHocDiscount::from_parts(kind, value),
            _ => None,
        };

        Ok(SaleLineItem {
            entry_id: row.medicine_id,
            product_name: row.product_name,
            batch_no: row.batch_no,
            expiry: expiry_from_db(row.expiry_date),
            package_mrp: money_from_db(row.package_mrp_paise),
            units_per_package,
            standard_discount: percent_from_db("standard_discount_bps", row.standard_discount_bps)?,
            cgst: percent_from_db("cgst_bps", row.cgst_bps)?,
            sgst: percent_from_db("sgst_bps", row.sgst_bps)?,
            quantity_units: row.quantity_units,
            ad_hoc_discount,
            pricing: LinePricing {
                unit_mrp: money_from_db(row.unit_mrp_paise),
                gross: money_from_db(row.gross_paise),
                standard_discount: money_from_db(row.standard_discount_paise),
                ad_hoc_discount: money_from_db(row.extra_discount_paise),
                final_subtotal: money_from_db(row.subtotal_paise),
            },
        })
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a walk-in sale header.
    ///
    /// ## Returns
    /// The created sale with generated ID and bill number.
    pub async fn create_sale(
        &self,
        customer_phone: &str,
        grand_total: Money,
        sale_date: DateTime<Utc>,
    ) -> DbResult<Sale> {
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            bill_number: bill_number_for(sale_date),
            customer_name: WALK_IN_CUSTOMER.to_string(),
            customer_phone: customer_phone.to_string(),
            grand_total,
            sale_date,
        };

        self.insert_sale(&sale).await?;
        Ok(sale)
    }

    /// Inserts a complete sale header.
    pub async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, bill_number = %sale.bill_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, bill_number, customer_name, customer_phone,
                grand_total_paise, sale_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.bill_number)
        .bind(&sale.customer_name)
        .bind(&sale.customer_phone)
        .bind(sale.grand_total.paise())
        .bind(sale.sale_date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts every line of a sale in one transaction.
    ///
    /// Either all lines land or none do.
    pub async fn insert_items(&self, sale_id: &str, items: &[SaleLineItem]) -> DbResult<()> {
        debug!(sale_id = %sale_id, count = items.len(), "Inserting sale items");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for (line_no, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    sale_id, line_no, medicine_id, product_name, batch_no, expiry_date,
                    package_mrp_paise, units_per_package, standard_discount_bps,
                    cgst_bps, sgst_bps, quantity_units, unit_mrp_paise, gross_paise,
                    standard_discount_paise, extra_discount_type, extra_discount_value,
                    extra_discount_paise, subtotal_paise
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
                "#,
            )
            .bind(sale_id)
            .bind(line_no as i64)
            .bind(&item.entry_id)
            .bind(&item.product_name)
            .bind(&item.batch_no)
            .bind(expiry_to_db(item.expiry))
            .bind(item.package_mrp.paise())
            .bind(i64::from(item.units_per_package))
            .bind(percent_to_db(item.standard_discount))
            .bind(percent_to_db(item.cgst))
            .bind(percent_to_db(item.sgst))
            .bind(item.quantity_units)
            .bind(item.pricing.unit_mrp.paise())
            .bind(item.pricing.gross.paise())
            .bind(item.pricing.standard_discount.paise())
            .bind(item.ad_hoc_discount.map(|d| d.kind()))
            .bind(item.ad_hoc_discount.map(|d| d.raw_value()))
            .bind(item.pricing.ad_hoc_discount.paise())
            .bind(item.pricing.final_subtotal.paise())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// A sale and its items, or `None` when no such sale exists.
    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<SaleRecord>> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales WHERE id = ?1",
            SALE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// The most recent sales, newest first.
    pub async fn list_with_items(&self, limit: u32) -> DbResult<Vec<SaleRecord>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {} FROM sales ORDER BY sale_date DESC, bill_number DESC LIMIT ?1",
            SALE_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Sales with `from <= sale_date < to`, newest first.
    pub async fn list_with_items_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<SaleRecord>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            SELECT {} FROM sales
            WHERE sale_date >= ?1 AND sale_date < ?2
            ORDER BY sale_date DESC, bill_number DESC
            "#,
            SALE_COLUMNS
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(rows).await
    }

    /// Deletes headers created before `cutoff` that have no items.
    ///
    /// ## Returns
    /// Number of headers removed.
    pub async fn delete_orphaned_headers(&self, cutoff: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sales
            WHERE created_at < ?1
              AND NOT EXISTS (SELECT 1 FROM sale_items WHERE sale_items.sale_id = sales.id)
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, "Deleted orphaned sale headers");
        }
        Ok(removed)
    }

    /// Number of sale headers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Loads items for `rows`, keeping the order of `rows`.
    async fn attach_items(&self, rows: Vec<SaleRow>) -> DbResult<Vec<SaleRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM sale_items WHERE sale_id IN (",
            ITEM_COLUMNS
        ));
        let mut separated = query.separated(", ");
        for row in &rows {
            separated.push_bind(row.id.clone());
        }
        separated.push_unseparated(") ORDER BY sale_id, line_no");

        let item_rows = query
            .build_query_as::<SaleItemRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut by_sale: HashMap<String, Vec<SaleLineItem>> = HashMap::new();
        for item in item_rows {
            let sale_id = item.sale_id.clone();
            by_sale
                .entry(sale_id)
                .or_default()
                .push(SaleLineItem::try_from(item)?);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_sale.remove(&row.id).unwrap_or_default();
                SaleRecord {
                    sale: Sale::from(row),
                    items,
                }
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog::tests::sample_entry;
    use crate::{Database, DbConfig};
    use apothecary_core::{Bill, Percent, SaleUnit};
    use chrono::Duration;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_bill() -> Bill {
        let entry = sample_entry("Paracetamol 500", "10 tablets");
        let mut bill = Bill::new(Utc::now());
        bill.set_customer_phone("9876543210");
        bill.add_line(&entry, 7, SaleUnit::Unit, None).unwrap();
        bill.add_line(
            &entry,
            5,
            SaleUnit::Unit,
            Some(AdHocDiscount::Percent(Percent::from_whole(5))),
        )
        .unwrap();
        bill
    }

    #[tokio::test]
    async fn test_create_sale_and_read_back() {
        let repo = db().await.sales();
        let bill = sample_bill();
        let at = Utc::now();

        let sale = repo
            .create_sale(&bill.customer_phone, bill.grand_total(), at)
            .await
            .unwrap();
        repo.insert_items(&sale.id, &bill.lines).await.unwrap();

        assert_eq!(sale.customer_name, WALK_IN_CUSTOMER);
        assert!(sale.bill_number.starts_with("BILL-"));

        let record = repo.get_with_items(&sale.id).await.unwrap().unwrap();
        assert_eq!(record.sale.grand_total, bill.grand_total());
        assert_eq!(record.items, bill.lines);
        assert_eq!(record.total_savings(), bill.total_savings());
    }

    #[tokio::test]
    async fn test_missing_sale() {
        let repo = db().await.sales();
        assert!(repo.get_with_items("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_items_for_unknown_sale_rejected() {
        let repo = db().await.sales();
        let bill = sample_bill();

        let err = repo.insert_items("nope", &bill.lines).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_between() {
        let repo = db().await.sales();
        let bill = sample_bill();
        let now = Utc::now();
        let earlier = now - Duration::days(2);

        let old = repo
            .create_sale("111", bill.grand_total(), earlier)
            .await
            .unwrap();
        repo.insert_items(&old.id, &bill.lines).await.unwrap();
        let new = repo.create_sale("222", bill.grand_total(), now).await.unwrap();
        repo.insert_items(&new.id, &bill.lines).await.unwrap();

        let listed = repo.list_with_items(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].sale.id, new.id);
        assert_eq!(listed[1].items.len(), 2);

        let window = repo
            .list_with_items_between(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].sale.id, new.id);
    }

    #[tokio::test]
    async fn test_orphan_sweep_keeps_complete_sales() {
        let repo = db().await.sales();
        let bill = sample_bill();

        let orphan = repo
            .create_sale("111", bill.grand_total(), Utc::now())
            .await
            .unwrap();
        let complete = repo
            .create_sale("222", bill.grand_total(), Utc::now())
            .await
            .unwrap();
        repo.insert_items(&complete.id, &bill.lines).await.unwrap();

        // Headers younger than the cutoff are left alone.
        let removed = repo
            .delete_orphaned_headers(Utc::now() - Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        let removed = repo
            .delete_orphaned_headers(Utc::now() + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_with_items(&orphan.id).await.unwrap().is_none());
        assert!(repo.get_with_items(&complete.id).await.unwrap().is_some());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
