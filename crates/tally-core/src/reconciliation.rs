//! # Shift Reconciliation
//!
//! Expected-cash arithmetic for closing a drawer.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   expected =   start_amount                                            │
//! │              + sales paid in cash                                      │
//! │              + credit collections                                      │
//! │              + manual cash IN                                          │
//! │              − manual cash OUT                                         │
//! │              − cash expenses                                           │
//! │                                                                         │
//! │   difference = actual counted − expected                               │
//! │                                                                         │
//! │      difference < 0  → Shortage   (drawer is missing money)            │
//! │      difference = 0  → Balanced                                        │
//! │      difference > 0  → Overage                                         │
//! │                                                                         │
//! │   Card, transfer and wallet sales are reported but never enter the     │
//! │   drawer, so they do not move the expected amount.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::CashShift;

// =============================================================================
// Totals
// =============================================================================

/// Totals owned by other services for a shift window.
///
/// Produced by a `ShiftTotalsSource` implementation; the cash-shift ledger
/// never reads sales or expense tables itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExternalTotals {
    pub sales_cash: Money,
    pub sales_card: Money,
    pub sales_transfer: Money,
    pub sales_wallet: Money,
    pub credit_collections: Money,
    pub expenses: Money,
}

/// Every total that feeds a shift's reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftTotals {
    pub sales_cash: Money,
    pub sales_card: Money,
    pub sales_transfer: Money,
    pub sales_wallet: Money,
    pub credit_collections: Money,
    pub cash_in: Money,
    pub cash_out: Money,
    pub expenses: Money,
}

impl ShiftTotals {
    /// Combines external totals with the shift's own drawer movements.
    pub fn new(external: ExternalTotals, cash_in: Money, cash_out: Money) -> Self {
        ShiftTotals {
            sales_cash: external.sales_cash,
            sales_card: external.sales_card,
            sales_transfer: external.sales_transfer,
            sales_wallet: external.sales_wallet,
            credit_collections: external.credit_collections,
            cash_in,
            cash_out,
            expenses: external.expenses,
        }
    }

    /// Copies these totals and the resulting expected amount onto a shift.
    ///
    /// The shift is left untouched when the expected amount overflows.
    pub fn apply_to(&self, shift: &mut CashShift) -> CoreResult<()> {
        let expected = expected_cash(shift.start_amount(), self)?;
        shift.total_sales_cash_cents = self.sales_cash.cents();
        shift.total_sales_card_cents = self.sales_card.cents();
        shift.total_sales_transfer_cents = self.sales_transfer.cents();
        shift.total_sales_wallet_cents = self.sales_wallet.cents();
        shift.total_credit_collections_cents = self.credit_collections.cents();
        shift.total_cash_in_cents = self.cash_in.cents();
        shift.total_cash_out_cents = self.cash_out.cents();
        shift.total_expenses_cents = self.expenses.cents();
        shift.expected_cash_end_cents = expected.cents();
        Ok(())
    }
}

// =============================================================================
// Variance
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Variance {
    Balanced,
    Shortage,
    Overage,
}

impl Variance {
    pub fn of(difference: Money) -> Self {
        if difference.is_negative() {
            Variance::Shortage
        } else if difference.is_positive() {
            Variance::Overage
        } else {
            Variance::Balanced
        }
    }
}

/// Outcome of counting the drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub expected: Money,
    pub actual: Money,
    pub difference: Money,
    pub variance: Variance,
}

// =============================================================================
// Arithmetic
// =============================================================================

/// Cash that should be in the drawer.
///
/// Fails with `InvalidAmount` when the totals do not fit in an `i64` of cents.
pub fn expected_cash(start_amount: Money, totals: &ShiftTotals) -> CoreResult<Money> {
    start_amount
        .checked_add(totals.sales_cash)
        .and_then(|m| m.checked_add(totals.credit_collections))
        .and_then(|m| m.checked_add(totals.cash_in))
        .and_then(|m| m.checked_sub(totals.cash_out))
        .and_then(|m| m.checked_sub(totals.expenses))
        .ok_or_else(|| CoreError::invalid_amount("expected cash is out of range"))
}

/// Compares the counted drawer with the expected amount.
///
/// A non-zero difference is reported, never rejected.
pub fn reconcile(
    start_amount: Money,
    totals: &ShiftTotals,
    actual: Money,
) -> CoreResult<Reconciliation> {
    let expected = expected_cash(start_amount, totals)?;
    let difference = actual
        .checked_sub(expected)
        .ok_or_else(|| CoreError::invalid_amount("cash difference is out of range"))?;

    Ok(Reconciliation {
        expected,
        actual,
        difference,
        variance: Variance::of(difference),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dollars(d: i64) -> Money {
        Money::from_cents(d * 100)
    }

    #[test]
    fn test_reference_shift() {
        let totals = ShiftTotals {
            sales_cash: dollars(250),
            credit_collections: dollars(30),
            cash_in: dollars(20),
            cash_out: dollars(15),
            expenses: dollars(10),
            ..ShiftTotals::default()
        };

        assert_eq!(expected_cash(dollars(100), &totals).unwrap(), dollars(375));

        let result = reconcile(dollars(100), &totals, dollars(370)).unwrap();
        assert_eq!(result.expected, dollars(375));
        assert_eq!(result.difference, dollars(-5));
        assert_eq!(result.variance, Variance::Shortage);
    }

    #[test]
    fn test_non_cash_sales_do_not_move_expected() {
        let totals = ShiftTotals {
            sales_card: dollars(900),
            sales_transfer: dollars(50),
            sales_wallet: dollars(25),
            ..ShiftTotals::default()
        };

        let result = reconcile(dollars(100), &totals, dollars(100)).unwrap();
        assert_eq!(result.expected, dollars(100));
        assert_eq!(result.variance, Variance::Balanced);
    }

    #[test]
    fn test_overage() {
        let result =
            reconcile(dollars(100), &ShiftTotals::default(), Money::from_cents(10_050)).unwrap();
        assert_eq!(result.difference.cents(), 50);
        assert_eq!(result.variance, Variance::Overage);
    }

    #[test]
    fn test_combine_external_and_movements() {
        let external = ExternalTotals {
            sales_cash: dollars(10),
            credit_collections: dollars(80),
            expenses: dollars(5),
            ..ExternalTotals::default()
        };
        let totals = ShiftTotals::new(external, dollars(50), dollars(0));

        assert_eq!(totals.cash_in, dollars(50));
        assert_eq!(totals.credit_collections, dollars(80));
        assert_eq!(expected_cash(dollars(100), &totals).unwrap(), dollars(235));
    }

    #[test]
    fn test_out_of_range_totals_are_rejected() {
        let totals = ShiftTotals {
            sales_cash: Money::from_cents(i64::MAX),
            ..ShiftTotals::default()
        };

        let err = expected_cash(Money::from_cents(1), &totals).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
        assert!(reconcile(Money::from_cents(1), &totals, Money::zero()).is_err());

        let outflow = ShiftTotals {
            cash_out: Money::from_cents(i64::MAX),
            expenses: Money::from_cents(i64::MAX),
            ..ShiftTotals::default()
        };
        assert!(expected_cash(Money::zero(), &outflow).is_err());
    }

    #[test]
    fn test_apply_to_leaves_shift_on_overflow() {
        use crate::types::ShiftStatus;
        use chrono::Utc;

        let mut shift = CashShift {
            id: "shift-1".to_string(),
            tenant_id: "t-1".to_string(),
            store_id: "s-1".to_string(),
            user_id: "u-1".to_string(),
            user_name: "Ana".to_string(),
            start_time: Utc::now(),
            end_time: None,
            start_amount_cents: 100,
            total_sales_cash_cents: 0,
            total_sales_card_cents: 0,
            total_sales_transfer_cents: 0,
            total_sales_wallet_cents: 0,
            total_credit_collections_cents: 0,
            total_cash_in_cents: 0,
            total_cash_out_cents: 0,
            total_expenses_cents: 0,
            expected_cash_end_cents: 100,
            actual_cash_end_cents: 0,
            difference_cents: 0,
            status: ShiftStatus::Open,
            notes: None,
        };
        let totals = ShiftTotals {
            sales_cash: Money::from_cents(i64::MAX),
            ..ShiftTotals::default()
        };

        assert!(totals.apply_to(&mut shift).is_err());
        assert_eq!(shift.total_sales_cash_cents, 0);
        assert_eq!(shift.expected_cash_end_cents, 100);
    }
}
