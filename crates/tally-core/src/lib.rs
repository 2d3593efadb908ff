//! # tally-core: Pure Ledger Logic for Tally POS
//!
//! This crate holds the domain of the Tally POS ledger core as pure types and
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 POS terminals / cashier sessions                │   │
//! │  │   finalize sale ──► next number     collect credit ──► payment  │   │
//! │  │   open drawer ──► movements ──► close drawer ──► variance       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  sequence  │  │ reconcile │  │   │
//! │  │   │  Credit   │  │   Money   │  │  F001-...  │  │ expected  │  │   │
//! │  │   │ CashShift │  │           │  │  defaults  │  │ variance  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Storage + Ledgers)                 │   │
//! │  │        SQLite, migrations, repositories, transactions           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ledger entities (DocumentSeries, Credit, CashShift, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation
//! - [`sequence`] - Document number formatting and auto-provisioned series
//! - [`reconciliation`] - Expected cash and variance at shift close
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::reconciliation::{reconcile, ShiftTotals};
//!
//! let totals = ShiftTotals {
//!     sales_cash: Money::from_cents(25_000),
//!     credit_collections: Money::from_cents(3_000),
//!     cash_in: Money::from_cents(2_000),
//!     cash_out: Money::from_cents(1_500),
//!     expenses: Money::from_cents(1_000),
//!     ..ShiftTotals::default()
//! };
//!
//! let result = reconcile(Money::from_cents(10_000), &totals, Money::from_cents(37_000)).unwrap();
//! assert_eq!(result.expected.cents(), 37_500);
//! assert_eq!(result.difference.cents(), -500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod reconciliation;
pub mod sequence;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use reconciliation::{ExternalTotals, Reconciliation, ShiftTotals, Variance};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Width of the zero-padded numeric part of a document number.
///
/// `F001-00000042` → 8 digits after the dash.
pub const DOCUMENT_NUMBER_WIDTH: usize = 8;

/// Highest counter value a series can issue within the padded width.
pub const MAX_DOCUMENT_NUMBER: i64 = 99_999_999;

/// Largest single amount the ledger accepts, in cents ($10 billion).
///
/// Keeps running totals and drawer sums well inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Maximum length of a series code (`F001`, `B001`, `GEN1`).
pub const MAX_SERIES_CODE_LEN: usize = 4;

/// Maximum number of shifts returned by a history query.
pub const SHIFT_HISTORY_LIMIT: i64 = 50;
