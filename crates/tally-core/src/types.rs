//! # Domain Types
//!
//! Ledger entities used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Entities                                 │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐      │
//! │  │ DocumentSeries   │  │ CustomerAccount  │  │   CashShift      │      │
//! │  │ ──────────────── │  │ ──────────────── │  │ ──────────────── │      │
//! │  │ series_code F001 │  │ credit_limit     │  │ status Open      │      │
//! │  │ current_number   │  │ current_debt     │  │ start_amount     │      │
//! │  └──────────────────┘  └────────┬─────────┘  │ totals ...       │      │
//! │                                 │ 1..n       └────────┬─────────┘      │
//! │                        ┌────────▼─────────┐           │ 1..n           │
//! │                        │     Credit       │  ┌────────▼─────────┐      │
//! │                        │ amount           │  │  CashMovement    │      │
//! │                        │ remaining_amount │  │  IN / OUT        │      │
//! │                        └────────┬─────────┘  └──────────────────┘      │
//! │                                 │ 1..n                                  │
//! │                        ┌────────▼─────────┐                             │
//! │                        │  CreditPayment   │  append-only                │
//! │                        └──────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Mapping
//! Amounts are stored and carried as `*_cents: i64` fields with `Money`
//! accessors. With the `sqlx` feature every entity derives `FromRow` and
//! every enum derives `sqlx::Type`, so repositories decode rows directly
//! into these structs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::reconciliation::Variance;

// =============================================================================
// Document Series
// =============================================================================

/// A numbered document series such as `F001` (invoices) or `B001` (receipts).
///
/// Series are never deleted once they have issued a number; `is_active =
/// false` is the delete.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DocumentSeries {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    /// Tax-authority document type code ("01", "03", "80", ...).
    pub document_type: String,
    pub document_type_name: String,
    /// Up to four characters, unique per tenant.
    pub series_code: String,
    /// Last number issued. Zero means nothing issued yet.
    pub current_number: i64,
    pub is_active: bool,
    pub is_default: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Preview (or result) of the next number of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NextDocumentNumber {
    pub series_code: String,
    /// Zero-padded counter, e.g. `00000042`.
    pub formatted_number: String,
    /// `F001-00000042`.
    pub full_number: String,
}

/// Administrator request to create a series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSeries {
    pub tenant_id: String,
    pub store_id: String,
    pub document_type: String,
    /// Defaults to the well-known name for the document type.
    pub document_type_name: Option<String>,
    pub series_code: String,
    /// Starting counter (last number already used elsewhere). Defaults to 0.
    pub initial_number: Option<i64>,
    pub is_default: bool,
}

/// Partial update of a series' flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesUpdate {
    pub is_active: Option<bool>,
    pub is_default: Option<bool>,
}

// =============================================================================
// Customer Account
// =============================================================================

/// The credit-bearing side of a customer record.
///
/// `current_debt_cents` always equals the sum of `remaining_amount_cents`
/// over the customer's credits.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerAccount {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub credit_limit_cents: i64,
    pub current_debt_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CustomerAccount {
    #[inline]
    pub fn credit_limit(&self) -> Money {
        Money::from_cents(self.credit_limit_cents)
    }

    #[inline]
    pub fn current_debt(&self) -> Money {
        Money::from_cents(self.current_debt_cents)
    }

    /// Limit minus debt. Negative if the limit was lowered below the debt.
    #[inline]
    pub fn available_credit(&self) -> Money {
        self.credit_limit() - self.current_debt()
    }
}

/// Result of checking a customer's cached debt against their open credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DebtAudit {
    pub customer_id: String,
    pub current_debt: Money,
    /// Sum of remaining amounts across the customer's credits.
    pub open_balance: Money,
    pub consistent: bool,
}

// =============================================================================
// Credit
// =============================================================================

/// Store credit extended to a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Credit {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    pub customer_id: String,
    /// Original amount. Never changes after creation.
    pub amount_cents: i64,
    /// `0 <= remaining_amount_cents <= amount_cents`.
    pub remaining_amount_cents: i64,
    #[ts(as = "String")]
    pub credit_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<DateTime<Utc>>,
    pub is_paid: bool,
    #[ts(as = "Option<String>")]
    pub paid_date: Option<DateTime<Utc>>,
    /// Sale number this credit financed, e.g. `B001-00000042`.
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Credit {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_amount_cents)
    }

    /// Amount already paid or refunded.
    #[inline]
    pub fn settled(&self) -> Money {
        self.amount() - self.remaining()
    }

    /// Unpaid and past its due date.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_paid && self.due_date.map_or(false, |due| due < now)
    }
}

/// Why a payment row exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Money collected from the customer.
    Payment,
    /// Balance written off because the financed sale was returned.
    Refund,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Payment => "payment",
            PaymentKind::Refund => "refund",
        }
    }
}

/// One payment (or refund reversal) against a credit. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CreditPayment {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    pub credit_id: String,
    pub kind: PaymentKind,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl CreditPayment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// A credit together with its payment history, oldest payment first.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditDetails {
    pub credit: Credit,
    pub payments: Vec<CreditPayment>,
}

/// Request to issue a credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCredit {
    pub customer_id: String,
    pub store_id: String,
    pub amount: Money,
    pub due_date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Cash Shift
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

impl ShiftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Open => "open",
            ShiftStatus::Closed => "closed",
        }
    }
}

impl Default for ShiftStatus {
    fn default() -> Self {
        ShiftStatus::Open
    }
}

/// A cashier's drawer session at one store.
///
/// At most one shift per (tenant, store) is `Open`. Shifts are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashShift {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    pub user_id: String,
    pub user_name: String,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    pub start_amount_cents: i64,
    pub total_sales_cash_cents: i64,
    pub total_sales_card_cents: i64,
    pub total_sales_transfer_cents: i64,
    pub total_sales_wallet_cents: i64,
    pub total_credit_collections_cents: i64,
    pub total_cash_in_cents: i64,
    pub total_cash_out_cents: i64,
    pub total_expenses_cents: i64,
    pub expected_cash_end_cents: i64,
    pub actual_cash_end_cents: i64,
    /// `actual - expected`. Negative is a shortage.
    pub difference_cents: i64,
    pub status: ShiftStatus,
    pub notes: Option<String>,
}

impl CashShift {
    #[inline]
    pub fn start_amount(&self) -> Money {
        Money::from_cents(self.start_amount_cents)
    }

    #[inline]
    pub fn expected_cash_end(&self) -> Money {
        Money::from_cents(self.expected_cash_end_cents)
    }

    #[inline]
    pub fn actual_cash_end(&self) -> Money {
        Money::from_cents(self.actual_cash_end_cents)
    }

    #[inline]
    pub fn difference(&self) -> Money {
        Money::from_cents(self.difference_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }

    /// Shortage, overage, or balanced, from the recorded difference.
    pub fn variance(&self) -> Variance {
        Variance::of(self.difference())
    }

    /// Manual drawer movements as recorded on the row.
    #[inline]
    pub fn cash_in(&self) -> Money {
        Money::from_cents(self.total_cash_in_cents)
    }

    #[inline]
    pub fn cash_out(&self) -> Money {
        Money::from_cents(self.total_cash_out_cents)
    }
}

/// Request to open a shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenShift {
    pub tenant_id: String,
    pub store_id: String,
    pub user_id: String,
    pub user_name: String,
    pub start_amount: Money,
}

// =============================================================================
// Cash Movement
// =============================================================================

/// Direction of a manual drawer movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Cash added to the drawer (change fund top-up).
    In,
    /// Cash taken out (bank drop, petty cash).
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
        }
    }
}

/// Manual cash entry or exit within a shift. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub cash_shift_id: String,
    pub movement_type: MovementType,
    pub amount_cents: i64,
    pub description: String,
    pub user_id: String,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

impl CashMovement {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Request to record a manual movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub amount: Money,
    pub description: String,
    pub user_id: String,
}

/// A shift with its movements, newest movement last.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashShiftDetails {
    pub shift: CashShift,
    pub movements: Vec<CashMovement>,
}

// =============================================================================
// Sales / Expense Feed
// =============================================================================

/// Tender used for a completed sale or an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Wallet,
}

/// A tender line of a completed sale, as reported by the sales service.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalePayment {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    /// Document number of the sale (`B001-00000042`).
    pub sale_number: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

/// An expense as reported by the expense service.
///
/// Only the business date is known, so reconciliation matches expenses by
/// calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub tenant_id: String,
    pub store_id: String,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A tender line reported by the sales service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSalePayment {
    pub tenant_id: String,
    pub store_id: String,
    pub sale_number: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub sale_date: DateTime<Utc>,
}

/// An expense reported by the expense service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub tenant_id: String,
    pub store_id: String,
    pub description: String,
    pub category: String,
    pub amount: Money,
    pub expense_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credit(amount: i64, remaining: i64, due: Option<DateTime<Utc>>) -> Credit {
        let now = Utc::now();
        Credit {
            id: "cr-1".to_string(),
            tenant_id: "t-1".to_string(),
            store_id: "s-1".to_string(),
            customer_id: "c-1".to_string(),
            amount_cents: amount,
            remaining_amount_cents: remaining,
            credit_date: now,
            due_date: due,
            is_paid: remaining == 0,
            paid_date: None,
            reference: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_credit_overdue() {
        let now = Utc::now();
        let yesterday = now - Duration::days(1);

        assert!(credit(20_000, 12_000, Some(yesterday)).is_overdue(now));
        assert!(!credit(20_000, 0, Some(yesterday)).is_overdue(now));
        assert!(!credit(20_000, 12_000, None).is_overdue(now));
        assert!(!credit(20_000, 12_000, Some(now + Duration::days(1))).is_overdue(now));
    }

    #[test]
    fn test_credit_settled() {
        let c = credit(20_000, 12_000, None);
        assert_eq!(c.settled().cents(), 8_000);
    }

    #[test]
    fn test_available_credit() {
        let now = Utc::now();
        let account = CustomerAccount {
            id: "c-1".to_string(),
            tenant_id: "t-1".to_string(),
            name: "Rosa".to_string(),
            credit_limit_cents: 50_000,
            current_debt_cents: 20_000,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(account.available_credit().cents(), 30_000);
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&MovementType::In).unwrap(), "\"IN\"");
        assert_eq!(serde_json::to_string(&ShiftStatus::Closed).unwrap(), "\"closed\"");
        assert_eq!(serde_json::to_string(&PaymentKind::Refund).unwrap(), "\"refund\"");
        assert_eq!(ShiftStatus::default(), ShiftStatus::Open);
    }
}
