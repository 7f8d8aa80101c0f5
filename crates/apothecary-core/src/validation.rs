//! # Validation Module
//!
//! Input validation utilities for Apothecary.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Boundary (CLI args, form fields, legacy JSON)                │
//! │  ├── parse_*_or_zero: malformed numbers become 0                       │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE: business rule validation                        │
//! │  ├── Catalog form rules                                                │
//! │  └── Bill rules (phone, quantity, ad-hoc discount)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here runs before any I/O is attempted.
//!
//! ## Usage
//! ```rust
//! use apothecary_core::validation::{validate_customer_phone, validate_quantity};
//!
//! validate_customer_phone("98765 43210").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::UnitMrp;
use crate::types::{AdHocDiscount, CatalogEntry, Percent};
use crate::{MAX_BILL_LINES, MAX_ENTERED_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use apothecary_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Paracetamol 500").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("product name", name, 200)
}

/// Validates a batch number (required, at most 50 characters).
pub fn validate_batch_no(batch: &str) -> ValidationResult<()> {
    validate_required_text("batch number", batch, 50)
}

/// Supplier name is optional but bounded.
pub fn validate_supplier_name(supplier: &str) -> ValidationResult<()> {
    if supplier.trim().chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "supplier".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// Validates the customer phone recorded on a sale.
///
/// ## Rules
/// - Required
/// - Digits plus `+`, `-`, spaces and parentheses, at most 20 characters
/// - At least one digit
pub fn validate_customer_phone(phone: &str) -> ValidationResult<()> {
    validate_required_text("customer phone", phone, 20)?;

    let phone = phone.trim();
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')');
    if !phone.chars().all(allowed) || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "customer phone".to_string(),
            reason: "must contain only digits, spaces, '+', '-' and parentheses".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity typed by the operator (units or packages).
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Bill: Add Line                                                         │
/// │                                                                         │
/// │  Operator enters quantity: 2 packages                                  │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(2) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0?     → Error: "quantity must be positive"           │
/// │       ├── qty > 9999?   → Error: "quantity must be between 1 and 9999" │
/// │       └── OK → normalise to units, check stock                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ENTERED_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ENTERED_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount that may be zero but not negative.
pub fn validate_money_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a stock count that may be zero but not negative.
pub fn validate_count_non_negative(field: &str, count: i64) -> ValidationResult<()> {
    if count < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a percentage is within 0–100%.
pub fn validate_percent(field: &str, pct: Percent) -> ValidationResult<()> {
    if pct > Percent::HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

/// Validates an ad-hoc discount against the line's unit MRP.
///
/// ## Rules
/// - Percent must not exceed 100%
/// - Flat per-unit amount must not be negative or exceed the unit MRP
pub fn validate_ad_hoc_discount(discount: &AdHocDiscount, unit_mrp: &UnitMrp) -> ValidationResult<()> {
    match discount {
        AdHocDiscount::Percent(pct) => validate_percent("extra discount", *pct),
        AdHocDiscount::FlatPerUnit(flat) => {
            validate_money_non_negative("extra discount", *flat)?;
            if !unit_mrp.covers(*flat) {
                return Err(ValidationError::DiscountExceedsPrice {
                    discount: flat.to_string(),
                    unit_mrp: unit_mrp.rounded().to_string(),
                });
            }
            Ok(())
        }
    }
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits on the bill.
pub fn validate_bill_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_BILL_LINES {
        return Err(ValidationError::OutOfRange {
            field: "bill lines".to_string(),
            min: 0,
            max: MAX_BILL_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a catalog entry before it is inserted or updated.
///
/// ## Rules
/// - Name and batch required
/// - Package description must start with a positive unit count
/// - Money and stock non-negative, percentages within 0–100%
/// - Loose units smaller than one package
pub fn validate_catalog_entry(entry: &CatalogEntry) -> ValidationResult<()> {
    validate_product_name(&entry.product_name)?;
    validate_batch_no(&entry.batch_no)?;
    validate_supplier_name(&entry.supplier_name)?;

    let upp = entry
        .units_per_package()
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "package description".to_string(),
            reason: "must start with the number of units per package, e.g. \"10 tablets\""
                .to_string(),
        })?;

    validate_money_non_negative("MRP", entry.package_mrp)?;
    validate_money_non_negative("purchase rate", entry.purchase_rate)?;

    if let Some(pct) = entry.standard_discount {
        validate_percent("discount", pct)?;
    }
    if let Some(pct) = entry.purchase_discount {
        validate_percent("purchase discount", pct)?;
    }
    validate_percent("CGST", entry.cgst)?;
    validate_percent("SGST", entry.sgst)?;

    validate_count_non_negative("stock", entry.stock_packages)?;
    validate_count_non_negative("remaining units", entry.remaining_units)?;
    validate_count_non_negative("reminder quantity", entry.reminder_threshold_packages)?;

    if entry.remaining_units >= upp.as_i64() {
        return Err(ValidationError::OutOfRange {
            field: "remaining units".to_string(),
            min: 0,
            max: upp.as_i64() - 1,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use apothecary_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Boundary Coercion
// =============================================================================

/// Parses a form amount, treating blank or malformed input as zero.
pub fn parse_money_or_zero(input: &str) -> Money {
    input
        .parse::<Money>()
        .map(|m| m.clamp_non_negative())
        .unwrap_or_default()
}

/// Parses a form percentage, treating blank or malformed input as zero.
pub fn parse_percent_or_zero(input: &str) -> Percent {
    input.parse::<Percent>().unwrap_or_default()
}

/// Parses a form count, treating blank, malformed or negative input as zero.
pub fn parse_count_or_zero(input: &str) -> i64 {
    input.trim().parse::<i64>().map(|n| n.max(0)).unwrap_or(0)
}

// =============================================================================
// Unit Tests
// =============================================================================
