//! # Repository Module
//!
//! Database repository implementations for Apothecary.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Till command / commit workflow                                        │
//! │       │                                                                 │
//! │       │  db.catalog().fetch_by_ids(&ids)                               │
//! │       ▼                                                                 │
//! │  CatalogRepository                  SaleRepository                     │
//! │  ├── insert / update / delete       ├── create_sale (header)           │
//! │  ├── get_by_id / fetch_by_ids       ├── insert_items (one batch)       │
//! │  ├── list / search / count          ├── get_with_items / list_*        │
//! │  └── apply_stock (conditional)      └── delete_orphaned_headers        │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, FromRow row structs)                    │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row structs mirror the table columns (paise and basis points as
//! integers). Each repository converts rows into core domain types.

pub mod catalog;
pub mod sale;

use apothecary_core::{ExpiryMonth, Money, Percent};

use crate::error::{DbError, DbResult};

/// Basis points column to [`Percent`].
pub(crate) fn percent_from_db(field: &str, bps: i64) -> DbResult<Percent> {
    u32::try_from(bps)
        .map(Percent::from_bps)
        .map_err(|_| DbError::invalid_data(field, format!("{} is not a valid percentage", bps)))
}

/// [`Percent`] to its basis points column.
#[inline]
pub(crate) fn percent_to_db(pct: Percent) -> i64 {
    i64::from(pct.bps())
}

/// Expiry column (`YYYY-MM-01`) to [`ExpiryMonth`]; unreadable values are dropped.
pub(crate) fn expiry_from_db(value: Option<String>) -> Option<ExpiryMonth> {
    value.and_then(|v| v.parse().ok())
}

pub(crate) fn expiry_to_db(expiry: Option<ExpiryMonth>) -> Option<String> {
    expiry.map(|e| e.to_date_string())
}

#[inline]
pub(crate) fn money_from_db(paise: i64) -> Money {
    Money::from_paise(paise)
}
