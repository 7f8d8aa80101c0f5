//! # Error Types
//!
//! Domain-specific error types for apothecary-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  apothecary-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations (bill, stock)         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  apothecary-db errors (separate crate)                                 │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till errors (in app)                                                  │
//! │  ├── CommitError      - Commit workflow outcomes                       │
//! │  └── ApiError         - What the operator sees (serialized)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Raised by the bill aggregator. A failed operation leaves the bill
/// exactly as it was.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The package description has no usable leading unit count.
    ///
    /// ## When This Occurs
    /// - Description is empty or starts with text ("tablets 10")
    /// - Leading number is zero ("0 ml")
    #[error("Could not determine units per package for \"{product}\" (description: \"{description}\")")]
    UnitsPerPackageUnresolvable {
        product: String,
        description: String,
    },

    /// Adding the line would sell more units than the catalog snapshot holds.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Bill (2 packages of 10)
    ///      │
    ///      ▼
    /// Check stock: 15 units on hand, 0 already in bill
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Paracetamol", available: 15, requested: 20 }
    ///      │
    ///      ▼
    /// UI shows: "Only 15 more units of Paracetamol available"
    /// ```
    #[error("Insufficient stock for {product}: {available} more units available, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Line index does not exist in the bill.
    #[error("Bill has no line at position {index}")]
    LineNotFound { index: usize },

    /// Bill has exceeded maximum allowed lines.
    #[error("Bill cannot have more than {max} lines")]
    BillTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Always raised before any I/O is attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid month).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Flat per-unit discount is larger than the unit price.
    #[error("Extra discount of {discount} per unit cannot exceed the MRP per unit ({unit_mrp})")]
    DiscountExceedsPrice { discount: String, unit_mrp: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
