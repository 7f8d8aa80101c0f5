//! # History Commands
//!
//! Past sales, the daily report and cleanup of abandoned sale headers.

use apothecary_core::report::{filter_sales, medicines_summary, DailyReport};
use apothecary_core::validation::validate_search_query;
use apothecary_core::Money;
use apothecary_db::Database;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::TillConfig;
use crate::error::{ApiError, ApiResult};

/// One row of the sales history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSummary {
    pub sale_id: String,
    pub bill_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub sale_date: DateTime<Utc>,
    /// `"Name (qty), ..."`
    pub medicines: String,
    pub grand_total: Money,
    pub total_savings: Money,
}

/// Recent sales, newest first, filtered by bill number, name or phone.
pub async fn sale_history(db: &Database, search: &str, limit: u32) -> ApiResult<Vec<SaleSummary>> {
    let search = validate_search_query(search)?;
    debug!(search = %search, limit = %limit, "sale_history command");

    let records = db.sales().list_with_items(limit).await?;

    Ok(filter_sales(&records, &search)
        .into_iter()
        .map(|r| SaleSummary {
            sale_id: r.sale.id.clone(),
            bill_number: r.sale.bill_number.clone(),
            customer_name: r.sale.customer_name.clone(),
            customer_phone: r.sale.customer_phone.clone(),
            sale_date: r.sale.sale_date,
            medicines: medicines_summary(&r.items),
            grand_total: r.sale.grand_total,
            total_savings: r.total_savings(),
        })
        .collect())
}

/// Every sale made on the local calendar day `date` in `tz`.
pub async fn daily_report<Tz: TimeZone>(
    db: &Database,
    date: NaiveDate,
    tz: &Tz,
) -> ApiResult<DailyReport> {
    // Any local day lies inside this UTC window; the report narrows it.
    let from = date
        .pred_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ApiError::validation(format!("Date {} is out of range", date)))?
        .and_utc();
    let to = from + Duration::days(3);

    let records = db.sales().list_with_items_between(from, to).await?;
    Ok(DailyReport::for_date(&records, date, tz))
}

/// Deletes sale headers left without items by a failed commit.
///
/// Headers younger than the configured grace period are kept so a commit
/// still writing its items is not disturbed.
pub async fn sweep_orphans(db: &Database, config: &TillConfig) -> ApiResult<u64> {
    let cutoff = Utc::now() - Duration::minutes(config.orphan_grace_minutes);
    let removed = db.sales().delete_orphaned_headers(cutoff).await?;
    info!(removed, cutoff = %cutoff, "Orphan sweep finished");
    Ok(removed)
}
