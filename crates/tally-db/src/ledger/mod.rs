//! # Ledger Services
//!
//! The only code paths that mutate series counters, credit balances,
//! customer debt, and cash shifts.
//!
//! - [`SequenceGenerator`](sequence::SequenceGenerator) - peek / commit document numbers
//! - [`CreditLedger`](credit::CreditLedger) - credits, payments, refunds
//! - [`CashShiftLedger`](cash_shift::CashShiftLedger) - open, movements, close
//! - [`ShiftTotalsSource`](totals::ShiftTotalsSource) - read interface for external totals
//!
//! Every service returns [`LedgerError`](error::LedgerError).

pub mod cash_shift;
pub mod credit;
pub mod error;
pub mod sequence;
pub mod totals;
