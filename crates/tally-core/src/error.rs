//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - What ledger callers see (code + message)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                          DbError ───┴─► LedgerError → terminal         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts, states)
//! 3. Errors are enum variants, never String
//! 4. Every failure leaves the ledger untouched, so none of these is retryable

use crate::money::Money;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// These are raised before anything is written, or cause the surrounding
/// transaction to roll back. Callers must not retry them unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The referenced entity does not exist for this tenant.
    ///
    /// ## When This Occurs
    /// - Unknown customer, credit, or shift id
    /// - `commit_next` on a series code that is missing or deactivated
    /// - `peek_next` without a store and no default series
    /// - `refund` with a reference that matches no credit
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation would break a uniqueness rule.
    ///
    /// ## When This Occurs
    /// - Opening a shift while the store already has an open one
    /// - Creating a series with a code the tenant already uses
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The entity is in a state that forbids the operation.
    ///
    /// ## When This Occurs
    /// - Adding a movement to, or closing, a shift that is already closed
    /// - Committing a number past the series capacity
    #[error("{entity} {id} is {state}, cannot perform operation")]
    InvalidState {
        entity: String,
        id: String,
        state: String,
    },

    /// Amount is zero, negative, or otherwise unusable.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Payment larger than what is still owed.
    ///
    /// ## User Workflow
    /// ```text
    /// Collect payment ($150.00) on credit with $120.00 remaining
    ///      │
    ///      ▼
    /// ExceedsBalance { amount: $150.00, remaining: $120.00 }
    ///      │
    ///      ▼
    /// Terminal shows: "Payment of $150.00 exceeds remaining balance $120.00"
    /// ```
    #[error("Payment of {amount} exceeds remaining balance {remaining}")]
    ExceedsBalance { amount: Money, remaining: Money },

    /// Issuing the credit would push the customer past their limit.
    #[error("Insufficient credit: requested {requested}, available {available}")]
    InsufficientCredit { requested: Money, available: Money },

    /// The credit has no remaining balance.
    #[error("Credit {credit_id} is already paid")]
    AlreadySettled { credit_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand used throughout the ledgers.
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    pub fn invalid_state(entity: &str, id: impl Into<String>, state: impl Into<String>) -> Self {
        CoreError::InvalidState {
            entity: entity.to_string(),
            id: id.into(),
            state: state.into(),
        }
    }

    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any transaction starts.
#[derive(Debug, Error)]
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
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, lowercase series code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
