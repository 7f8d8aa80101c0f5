//! # Apothecary Till Library
//!
//! The counter till: the in-progress bill, the commit workflow and the
//! commands the CLI drives.
//!
//! ## Module Organization
//! ```text
//! apothecary_till/
//! ├── lib.rs          ◄─── You are here (logging setup, exports)
//! ├── config.rs       ◄─── TillConfig (store details, database path)
//! ├── state.rs        ◄─── BillState (shared in-progress bill)
//! ├── store.rs        ◄─── CatalogStore / SaleStore seams
//! ├── checkout.rs     ◄─── Commit workflow (record, then apply stock)
//! ├── commands/
//! │   ├── catalog.rs  ◄─── Medicine list/search/edit, import, alerts
//! │   ├── bill.rs     ◄─── Bill manipulation
//! │   ├── sale.rs     ◄─── Commit and invoice
//! │   └── history.rs  ◄─── History, daily report, orphan sweep
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Commit Ordering
//! ```text
//! validate ──► re-fetch catalog ──► reconcile every entry
//!          ──► sale header ──► line items ──► stock writes (concurrent)
//! ```
//! Nothing is written until every entry reconciles. A stock write that
//! fails after the sale is stored is reported, not rolled back.

pub mod checkout;
pub mod commands;
pub mod config;
pub mod error;
pub mod state;
pub mod store;

use tracing::Level;
use tracing_subscriber::EnvFilter;

pub use checkout::{Checkout, CommitError, CommitOutcome, RecordedSale, StockFailure};
pub use config::TillConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::BillState;
pub use store::{CatalogStore, SaleStore};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=apothecary=trace` - Show trace for apothecary crates only
/// - Default: INFO, debug for apothecary crates
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,apothecary=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}
