//! # Repository Module
//!
//! SQL for every ledger table, in one place per aggregate.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  &self methods            pool reads for queries and reports            │
//! │  ──────────────           db.customers().list("tenant-1")               │
//! │                                                                         │
//! │  associated fns           run on a caller-owned connection, i.e.        │
//! │  (conn: &mut ...)         inside a ledger transaction after the claim   │
//! │                           CreditRepository::claim(&mut tx, id)          │
//! │                                                                         │
//! │  Ledger services (crate::ledger) are the only callers of the second     │
//! │  kind; they own BEGIN / COMMIT.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`SeriesRepository`](series::SeriesRepository) - document series and counters
//! - [`CustomerRepository`](customer::CustomerRepository) - customer accounts and debt
//! - [`CreditRepository`](credit::CreditRepository) - credits and payments
//! - [`CashShiftRepository`](cash_shift::CashShiftRepository) - shifts and movements
//! - [`FeedRepository`](feed::FeedRepository) - sales / expense records used by reconciliation

pub mod cash_shift;
pub mod credit;
pub mod customer;
pub mod feed;
pub mod series;
