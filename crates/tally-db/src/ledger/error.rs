//! # Ledger Error Type
//!
//! What callers of the ledger services receive.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Ledger                             │
//! │                                                                         │
//! │  CoreError (rule violated) ──┐                                         │
//! │                               ├──► LedgerError ──► code() + message    │
//! │  DbError (storage failed) ───┘        │                                │
//! │                                       └──► is_transient()              │
//! │                                                                         │
//! │  Only TRANSIENT_STORAGE_ERROR may be retried, and only by the caller   │
//! │  re-issuing the whole operation. The ledger never retries itself.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "code": "EXCEEDS_BALANCE",
//!   "message": "Payment of $150.00 exceeds remaining balance $120.00"
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

use crate::error::DbError;
use tally_core::{CoreError, ValidationError};

/// Failure of a ledger operation. Nothing was written.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Domain(CoreError::Validation(err))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Storage(DbError::from(err))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Conflict,
    InvalidState,
    InvalidAmount,
    ExceedsBalance,
    InsufficientCredit,
    AlreadySettled,
    ValidationError,
    /// Lock wait timed out or the pool was exhausted. Safe to retry.
    TransientStorageError,
    /// Any other storage failure. Details are logged, not returned.
    StorageError,
}

/// Serialisable error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl LedgerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Domain(err) => match err {
                CoreError::NotFound { .. } => ErrorCode::NotFound,
                CoreError::Conflict(_) => ErrorCode::Conflict,
                CoreError::InvalidState { .. } => ErrorCode::InvalidState,
                CoreError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
                CoreError::ExceedsBalance { .. } => ErrorCode::ExceedsBalance,
                CoreError::InsufficientCredit { .. } => ErrorCode::InsufficientCredit,
                CoreError::AlreadySettled { .. } => ErrorCode::AlreadySettled,
                CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            LedgerError::Storage(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::UniqueViolation { .. } => ErrorCode::Conflict,
                e if e.is_transient() => ErrorCode::TransientStorageError,
                _ => ErrorCode::StorageError,
            },
        }
    }

    /// Whether the caller may retry the whole operation.
    pub fn is_transient(&self) -> bool {
        self.code() == ErrorCode::TransientStorageError
    }

    /// Builds the body returned to a terminal.
    ///
    /// Storage internals are logged here and replaced by a generic message.
    pub fn to_response(&self) -> ErrorResponse {
        let code = self.code();
        let message = match self {
            LedgerError::Domain(err) => err.to_string(),
            LedgerError::Storage(err) => match err {
                DbError::NotFound { .. } => err.to_string(),
                DbError::UniqueViolation { .. } => "Record already exists".to_string(),
                e if e.is_transient() => {
                    tracing::warn!(error = %e, "Transient storage failure");
                    "The ledger is busy, please retry".to_string()
                }
                e => {
                    tracing::error!(error = %e, "Ledger storage failure");
                    "Ledger storage operation failed".to_string()
                }
            },
        };

        ErrorResponse { code, message }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Money;

    #[test]
    fn test_domain_codes() {
        let err: LedgerError = CoreError::ExceedsBalance {
            amount: Money::from_cents(15_000),
            remaining: Money::from_cents(12_000),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ExceedsBalance);
        assert!(!err.is_transient());

        let body = err.to_response();
        assert_eq!(
            body.message,
            "Payment of $150.00 exceeds remaining balance $120.00"
        );
        assert_eq!(
            serde_json::to_string(&body.code).unwrap(),
            "\"EXCEEDS_BALANCE\""
        );
    }

    #[test]
    fn test_validation_code() {
        let err: LedgerError = ValidationError::Required {
            field: "description".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_storage_codes() {
        let busy: LedgerError = DbError::Busy("database is locked".to_string()).into();
        assert_eq!(busy.code(), ErrorCode::TransientStorageError);
        assert!(busy.is_transient());
        assert_eq!(busy.to_response().message, "The ledger is busy, please retry");

        let failed: LedgerError = DbError::QueryFailed("no such table: credits".to_string()).into();
        assert_eq!(failed.code(), ErrorCode::StorageError);
        assert!(!failed.to_response().message.contains("credits"));
    }
}
