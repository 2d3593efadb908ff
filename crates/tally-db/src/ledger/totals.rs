//! # Shift Totals Source
//!
//! The cash-shift ledger needs sales, collections, and expenses for a time
//! window but owns none of those records. It asks through
//! [`ShiftTotalsSource`].
//!
//! ```text
//! CashShiftLedger ──totals(window)──► ShiftTotalsSource
//!                                        │
//!                                        ├── SqliteShiftTotals (this database)
//!                                        └── any other implementation
//!                                            (remote service, test fixture)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::feed::FeedRepository;
use tally_core::{ExternalTotals, Money, PaymentMethod};

/// Store and time range a shift covers. Both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftWindow {
    pub tenant_id: String,
    pub store_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Read-only access to totals owned by other services.
#[async_trait]
pub trait ShiftTotalsSource: Send + Sync {
    async fn totals(&self, window: &ShiftWindow) -> DbResult<ExternalTotals>;
}

/// Totals read from the `sale_payments`, `credit_payments`, and `expenses`
/// tables of the ledger database.
#[derive(Debug, Clone)]
pub struct SqliteShiftTotals {
    feed: FeedRepository,
}

impl SqliteShiftTotals {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteShiftTotals {
            feed: FeedRepository::new(pool),
        }
    }
}

#[async_trait]
impl ShiftTotalsSource for SqliteShiftTotals {
    async fn totals(&self, window: &ShiftWindow) -> DbResult<ExternalTotals> {
        let mut totals = ExternalTotals::default();

        let by_method = self
            .feed
            .sales_by_method(&window.tenant_id, &window.store_id, window.start, window.end)
            .await?;
        for (method, cents) in by_method {
            let amount = Money::from_cents(cents);
            match method {
                PaymentMethod::Cash => totals.sales_cash += amount,
                PaymentMethod::Card => totals.sales_card += amount,
                PaymentMethod::Transfer => totals.sales_transfer += amount,
                PaymentMethod::Wallet => totals.sales_wallet += amount,
            }
        }

        totals.credit_collections = Money::from_cents(
            self.feed
                .credit_collections(&window.tenant_id, &window.store_id, window.start, window.end)
                .await?,
        );

        totals.expenses = Money::from_cents(
            self.feed
                .cash_expenses(
                    &window.tenant_id,
                    &window.store_id,
                    window.start.date_naive(),
                    window.end.date_naive(),
                )
                .await?,
        );

        debug!(
            store_id = %window.store_id,
            sales_cash_cents = totals.sales_cash.cents(),
            collections_cents = totals.credit_collections.cents(),
            expenses_cents = totals.expenses.cents(),
            "Shift totals aggregated"
        );

        Ok(totals)
    }
}
