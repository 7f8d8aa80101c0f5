//! # apothecary-core: Pure Business Logic for Apothecary
//!
//! This crate is the **heart** of Apothecary. It contains all pricing and
//! stock logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Apothecary Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    till (CLI / app shell)                       │   │
//! │  │    catalog ──► sell ──► invoice ──► history / report           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ apothecary-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   units   │  │  pricing  │  │   stock   │  │   bill    │  │   │
//! │  │   │ "10 tabs" │  │ LinePrice │  │ reconcile │  │  add_line │  │   │
//! │  │   │   → 10    │  │ discounts │  │ pkgs+loose│  │   merge   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apothecary-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`units`] - Units per package from a package description
//! - [`pricing`] - Line pricing with standard and ad-hoc discounts
//! - [`stock`] - Packages + loose units reconciliation
//! - [`bill`] - The in-progress bill
//! - [`types`] - Domain types (CatalogEntry, Sale, Percent, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`validation`] - Business rule validation
//! - [`alerts`], [`invoice`], [`report`] - Read-side views
//! - [`legacy`] - Older catalog revisions
//!
//! ## Example Usage
//!
//! ```rust
//! use apothecary_core::stock::{reconcile, StockLevel};
//! use apothecary_core::units::parse_units_per_package;
//!
//! let upp = parse_units_per_package("10 tablets").unwrap();
//! let after = reconcile(StockLevel::new(3, 4), upp, 7).unwrap();
//!
//! assert_eq!(after, StockLevel::new(2, 7));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod bill;
pub mod error;
pub mod invoice;
pub mod legacy;
pub mod money;
pub mod pricing;
pub mod report;
pub mod stock;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use bill::{Bill, BillTotals, SaleLineItem};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{compute_line, LinePricing, UnitMrp};
pub use stock::{reconcile, InsufficientStock, StockLevel, StockUpdate};
pub use types::*;
pub use units::{parse_units_per_package, UnitsPerPackage};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines on a single bill.
pub const MAX_BILL_LINES: usize = 100;

/// Largest quantity the operator may type for one line (units or packages).
pub const MAX_ENTERED_QUANTITY: i64 = 9_999;

/// Low-stock reminder used when a record has none.
pub const DEFAULT_REMINDER_PACKAGES: i64 = 5;
