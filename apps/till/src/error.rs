//! # API Error Type
//!
//! Unified error type for till commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Till                               │
//! │                                                                         │
//! │  Command Function  →  Result<T, ApiError>                              │
//! │       │                                                                 │
//! │       ├── DbError        (catalog / sale store)  ──┐                   │
//! │       ├── CoreError      (bill rules, validation) ─┼──► ApiError        │
//! │       └── CommitError    (commit workflow)       ──┘                   │
//! │                                                                         │
//! │  --json output:  { "code": "INSUFFICIENT_STOCK", "message": "..." }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use apothecary_core::{CoreError, ValidationError};
use apothecary_db::DbError;
use serde::Serialize;

use crate::checkout::{CommitError, StockFailure};

/// Error returned from till commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Medicine not found: 3f2a..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Database operation failed
    DatabaseError,

    /// Business rule violated (bill too large, missing line)
    BusinessLogic,

    /// Not enough stock to complete the sale
    InsufficientStock,

    /// Sale recorded, some stock writes failed
    PartialSuccess,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Sale recorded but stock needs manual correction for `failures`.
    pub fn partial_success(failures: &[StockFailure]) -> Self {
        let products = failures
            .iter()
            .map(|f| format!("{} (-{} units)", f.product_name, f.units_sold))
            .collect::<Vec<_>>()
            .join(", ");
        ApiError::new(
            ErrorCode::PartialSuccess,
            format!(
                "Sale recorded, but stock was not updated for: {}. Correct these manually.",
                products
            ),
        )
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::StockConflict { id } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!("Stock for {} changed while saving; check it and retry", id),
            ),
            DbError::InvalidData { field, reason } => {
                tracing::error!(field = %field, reason = %reason, "Unreadable stored value");
                ApiError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::UnitsPerPackageUnresolvable { .. } => {
                ApiError::new(ErrorCode::ValidationError, err.to_string())
            }
            CoreError::LineNotFound { .. } | CoreError::BillTooLarge { .. } => {
                ApiError::new(ErrorCode::BusinessLogic, err.to_string())
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts commit workflow errors to API errors.
impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Validation(e) => ApiError::from(e),
            CommitError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CommitError::EntryMissing { .. } => ApiError::new(ErrorCode::NotFound, err.to_string()),
            CommitError::Persistence { .. } => {
                ApiError::new(ErrorCode::DatabaseError, err.to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for till commands.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serialization() {
        let err = ApiError::new(ErrorCode::InsufficientStock, "only 3 left");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"code":"INSUFFICIENT_STOCK","message":"only 3 left"}"#
        );
    }

    #[test]
    fn test_from_db_error() {
        let err = ApiError::from(DbError::not_found("Medicine", "abc"));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Medicine not found: abc");

        let err = ApiError::from(DbError::StockConflict { id: "abc".into() });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_from_core_error() {
        let err = ApiError::from(CoreError::BillTooLarge { max: 100 });
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let err = ApiError::from(CoreError::Validation(ValidationError::Required {
            field: "customer phone".into(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "customer phone is required");
    }

    #[test]
    fn test_partial_success_names_products() {
        let failures = vec![StockFailure {
            entry_id: "1".into(),
            product_name: "Paracetamol 500".into(),
            units_sold: 12,
            reason: "disk I/O error".into(),
        }];
        let err = ApiError::partial_success(&failures);
        assert_eq!(err.code, ErrorCode::PartialSuccess);
        assert!(err.message.contains("Paracetamol 500 (-12 units)"));
    }
}
