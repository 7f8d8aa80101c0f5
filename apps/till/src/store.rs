//! # Store Traits
//!
//! What the commit workflow needs from its backing stores.
//!
//! ```text
//! CatalogStore                         SaleStore
//! ├── fetch_by_ids(ids)                ├── insert_header(phone, total, at)
//! └── apply_stock(update)              └── insert_line_items(sale_id, lines)
//! ```
//!
//! The SQLite repositories implement both. Tests swap in in-memory fakes.

use apothecary_core::{CatalogEntry, Money, Sale, SaleLineItem, StockUpdate};
use apothecary_db::{CatalogRepository, DbResult, SaleRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Catalog reads and stock writes.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Current rows for `ids`. Unknown ids are left out.
    async fn fetch_by_ids(&self, ids: &[String]) -> DbResult<Vec<CatalogEntry>>;

    /// Writes `update.after` if the entry still holds `update.before`.
    async fn apply_stock(&self, update: &StockUpdate) -> DbResult<()>;
}

/// Sale header and line item writes.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Writes a header and returns it with its generated id and bill number.
    async fn insert_header(
        &self,
        customer_phone: &str,
        grand_total: Money,
        sale_date: DateTime<Utc>,
    ) -> DbResult<Sale>;

    /// Writes every line of the sale as one batch.
    async fn insert_line_items(&self, sale_id: &str, items: &[SaleLineItem]) -> DbResult<()>;
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn fetch_by_ids(&self, ids: &[String]) -> DbResult<Vec<CatalogEntry>> {
        CatalogRepository::fetch_by_ids(self, ids).await
    }

    async fn apply_stock(&self, update: &StockUpdate) -> DbResult<()> {
        CatalogRepository::apply_stock(self, update).await
    }
}

#[async_trait]
impl SaleStore for SaleRepository {
    async fn insert_header(
        &self,
        customer_phone: &str,
        grand_total: Money,
        sale_date: DateTime<Utc>,
    ) -> DbResult<Sale> {
        self.create_sale(customer_phone, grand_total, sale_date).await
    }

    async fn insert_line_items(&self, sale_id: &str, items: &[SaleLineItem]) -> DbResult<()> {
        self.insert_items(sale_id, items).await
    }
}
