//! # Cash Shift Ledger
//!
//! One cashier session per store, from opening float to counted close.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   (no open shift) ──open()──► OPEN ──close()──► CLOSED  (terminal)     │
//! │                                 │ ▲                                     │
//! │                     add_movement() (IN / OUT)                           │
//! │                                                                         │
//! │   open() while OPEN exists      ──► Conflict                            │
//! │   add_movement() / close() on CLOSED ──► InvalidState                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reconciliation
//! ```text
//! expected = start + sales_cash + credit_collections + cash_in
//!                  − cash_out − expenses
//! difference = actual − expected        (negative = shortage)
//! ```
//!
//! Sales, collections, and expenses belong to other services and are read
//! through the injected [`ShiftTotalsSource`]. Drawer movements are this
//! ledger's own rows.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::totals::{ShiftTotalsSource, ShiftWindow};
use crate::repository::cash_shift::CashShiftRepository;
use crate::tx;
use tally_core::reconciliation::reconcile;
use tally_core::validation::{
    ensure_positive, validate_description, validate_id, validate_name, validate_non_negative,
    validate_notes,
};
use tally_core::{
    CashMovement, CashShift, CashShiftDetails, CoreError, ExternalTotals, Money, MovementType,
    NewMovement, OpenShift, ShiftStatus, ShiftTotals, Variance, SHIFT_HISTORY_LIMIT,
};

const OPEN_SHIFT_TARGET: &str = "cash_shifts.store_id";

/// Cash shift service.
#[derive(Clone)]
pub struct CashShiftLedger {
    pool: SqlitePool,
    totals: Arc<dyn ShiftTotalsSource>,
}

impl fmt::Debug for CashShiftLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CashShiftLedger")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl CashShiftLedger {
    pub fn new(pool: SqlitePool, totals: Arc<dyn ShiftTotalsSource>) -> Self {
        CashShiftLedger { pool, totals }
    }

    fn shifts(&self) -> CashShiftRepository {
        CashShiftRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a shift with every total at zero.
    ///
    /// ## Errors
    /// * `Conflict` - the store already has an open shift
    pub async fn open(&self, request: OpenShift) -> LedgerResult<CashShift> {
        validate_id("tenant_id", &request.tenant_id)?;
        validate_id("store_id", &request.store_id)?;
        validate_id("user_id", &request.user_id)?;
        let user_name = validate_name("user_name", &request.user_name)?;
        validate_non_negative("start_amount", request.start_amount)?;

        let shift = CashShift {
            id: Uuid::new_v4().to_string(),
            tenant_id: request.tenant_id,
            store_id: request.store_id,
            user_id: request.user_id,
            user_name,
            start_time: Utc::now(),
            end_time: None,
            start_amount_cents: request.start_amount.cents(),
            total_sales_cash_cents: 0,
            total_sales_card_cents: 0,
            total_sales_transfer_cents: 0,
            total_sales_wallet_cents: 0,
            total_credit_collections_cents: 0,
            total_cash_in_cents: 0,
            total_cash_out_cents: 0,
            total_expenses_cents: 0,
            expected_cash_end_cents: request.start_amount.cents(),
            actual_cash_end_cents: 0,
            difference_cents: 0,
            status: ShiftStatus::Open,
            notes: None,
        };

        // The partial unique index on open shifts decides concurrent opens.
        let mut conn = self.pool.acquire().await?;
        CashShiftRepository::insert(&mut *conn, &shift)
            .await
            .map_err(|err| {
                if err.is_unique_on(OPEN_SHIFT_TARGET) {
                    warn!(store_id = %shift.store_id, "Shift rejected: store already has an open shift");
                    LedgerError::from(CoreError::Conflict(format!(
                        "Store {} already has an open cash shift",
                        shift.store_id
                    )))
                } else {
                    LedgerError::from(err)
                }
            })?;

        info!(
            shift_id = %shift.id,
            tenant_id = %shift.tenant_id,
            store_id = %shift.store_id,
            user_id = %shift.user_id,
            start_amount = %shift.start_amount(),
            "Cash shift opened"
        );

        Ok(shift)
    }

    /// Records a manual drawer movement and bumps the matching total.
    ///
    /// ## Errors
    /// * `InvalidAmount` - amount is zero or negative
    /// * `NotFound` - unknown shift
    /// * `InvalidState` - the shift is closed
    pub async fn add_movement(&self, shift_id: &str, movement: NewMovement) -> LedgerResult<CashMovement> {
        ensure_positive("amount", movement.amount)?;
        validate_id("shift_id", shift_id)?;
        validate_id("user_id", &movement.user_id)?;
        let description = validate_description(&movement.description)?;

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            cash_shift_id: shift_id.to_string(),
            movement_type: movement.movement_type,
            amount_cents: movement.amount.cents(),
            description,
            user_id: movement.user_id,
            recorded_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;
        let result = Self::movement_locked(&mut *tx, &movement).await;
        tx::finish(tx, result).await?;

        info!(
            shift_id = %shift_id,
            movement_type = movement.movement_type.as_str(),
            amount_cents = movement.amount_cents,
            "Cash movement recorded"
        );

        Ok(movement)
    }

    async fn movement_locked(conn: &mut SqliteConnection, movement: &CashMovement) -> LedgerResult<()> {
        Self::claim_open(conn, &movement.cash_shift_id).await?;
        let shift = CashShiftRepository::find(conn, &movement.cash_shift_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CashShift", &movement.cash_shift_id))?;

        // The running totals must stay representable after this movement.
        let amount = movement.amount();
        let in_range = match movement.movement_type {
            MovementType::In => shift
                .cash_in()
                .checked_add(amount)
                .and(shift.expected_cash_end().checked_add(amount)),
            MovementType::Out => shift
                .cash_out()
                .checked_add(amount)
                .and(shift.expected_cash_end().checked_sub(amount)),
        };
        if in_range.is_none() {
            return Err(CoreError::invalid_amount("drawer total is out of range").into());
        }

        CashShiftRepository::insert_movement(conn, movement).await?;
        CashShiftRepository::add_movement_total(
            conn,
            &movement.cash_shift_id,
            movement.movement_type,
            movement.amount_cents,
        )
        .await?;

        Ok(())
    }

    /// Counts the drawer and closes the shift.
    ///
    /// The close time is taken first; external totals are read for
    /// `[start_time, end_time]` and the snapshot is written under the claim.
    /// A non-zero difference is recorded, never rejected.
    ///
    /// ## Errors
    /// * `NotFound` - unknown shift
    /// * `InvalidState` - the shift is already closed
    pub async fn close(
        &self,
        shift_id: &str,
        actual_cash_end: Money,
        notes: Option<&str>,
    ) -> LedgerResult<CashShift> {
        validate_id("shift_id", shift_id)?;
        validate_non_negative("actual_cash_end", actual_cash_end)?;
        let notes = validate_notes(notes)?;

        let shift = self
            .shifts()
            .get(shift_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CashShift", shift_id))?;
        if !shift.is_open() {
            return Err(CoreError::invalid_state("CashShift", shift_id, shift.status.as_str()).into());
        }

        let end_time = Utc::now();
        let external = self
            .totals
            .totals(&ShiftWindow {
                tenant_id: shift.tenant_id.clone(),
                store_id: shift.store_id.clone(),
                start: shift.start_time,
                end: end_time,
            })
            .await?;

        let mut tx = self.pool.begin().await?;
        let result = Self::close_locked(&mut *tx, shift_id, external, actual_cash_end, notes, end_time).await;
        let closed = tx::finish(tx, result).await?;

        let variance = closed.variance();
        if variance == Variance::Balanced {
            info!(shift_id = %shift_id, expected = %closed.expected_cash_end(), "Cash shift closed balanced");
        } else {
            warn!(
                shift_id = %shift_id,
                expected = %closed.expected_cash_end(),
                actual = %closed.actual_cash_end(),
                difference = %closed.difference(),
                variance = ?variance,
                "Cash shift closed with a difference"
            );
        }

        Ok(closed)
    }

    async fn close_locked(
        conn: &mut SqliteConnection,
        shift_id: &str,
        external: ExternalTotals,
        actual_cash_end: Money,
        notes: Option<String>,
        end_time: DateTime<Utc>,
    ) -> LedgerResult<CashShift> {
        Self::claim_open(conn, shift_id).await?;
        let mut shift = CashShiftRepository::find(conn, shift_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CashShift", shift_id))?;

        // Movements are summed from their rows, not taken from the running totals.
        let (cash_in, cash_out) = CashShiftRepository::movement_sums(conn, shift_id).await?;
        let totals = ShiftTotals::new(external, Money::from_cents(cash_in), Money::from_cents(cash_out));
        let reconciliation = reconcile(shift.start_amount(), &totals, actual_cash_end)?;

        totals.apply_to(&mut shift)?;
        shift.end_time = Some(end_time);
        shift.expected_cash_end_cents = reconciliation.expected.cents();
        shift.actual_cash_end_cents = reconciliation.actual.cents();
        shift.difference_cents = reconciliation.difference.cents();
        shift.status = ShiftStatus::Closed;
        shift.notes = notes;

        CashShiftRepository::close(conn, &shift).await?;

        CashShiftRepository::find(conn, shift_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CashShift", shift_id).into())
    }

    /// Claims an open shift, or explains why it cannot be claimed.
    async fn claim_open(conn: &mut SqliteConnection, shift_id: &str) -> LedgerResult<()> {
        if CashShiftRepository::claim_open(conn, shift_id).await? {
            return Ok(());
        }

        match CashShiftRepository::find(conn, shift_id).await? {
            Some(shift) => {
                Err(CoreError::invalid_state("CashShift", shift_id, shift.status.as_str()).into())
            }
            None => Err(CoreError::not_found("CashShift", shift_id).into()),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// A shift with its movements.
    ///
    /// Open shifts show live totals up to now; closed shifts show the
    /// snapshot taken when they were closed.
    pub async fn details(&self, shift_id: &str) -> LedgerResult<CashShiftDetails> {
        let shift = self
            .shifts()
            .get(shift_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CashShift", shift_id))?;

        self.with_movements(shift).await
    }

    /// The open shift of a store, if any.
    pub async fn current_shift(
        &self,
        tenant_id: &str,
        store_id: &str,
    ) -> LedgerResult<Option<CashShiftDetails>> {
        match self.shifts().open_for_store(tenant_id, store_id).await? {
            Some(shift) => Ok(Some(self.with_movements(shift).await?)),
            None => Ok(None),
        }
    }

    /// Shifts of a store, newest first, at most fifty.
    pub async fn history(
        &self,
        tenant_id: &str,
        store_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<CashShiftDetails>> {
        validate_id("tenant_id", tenant_id)?;
        validate_id("store_id", store_id)?;

        let shifts = self
            .shifts()
            .history(tenant_id, store_id, from, to, SHIFT_HISTORY_LIMIT)
            .await?;

        let mut history = Vec::with_capacity(shifts.len());
        for shift in shifts {
            history.push(self.with_movements(shift).await?);
        }

        debug!(store_id = %store_id, count = history.len(), "Loaded shift history");
        Ok(history)
    }

    async fn with_movements(&self, mut shift: CashShift) -> LedgerResult<CashShiftDetails> {
        if shift.is_open() {
            let external = self
                .totals
                .totals(&ShiftWindow {
                    tenant_id: shift.tenant_id.clone(),
                    store_id: shift.store_id.clone(),
                    start: shift.start_time,
                    end: Utc::now(),
                })
                .await?;
            ShiftTotals::new(external, shift.cash_in(), shift.cash_out()).apply_to(&mut shift)?;
        }

        let movements = self.shifts().movements(&shift.id).await?;
        Ok(CashShiftDetails { shift, movements })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
