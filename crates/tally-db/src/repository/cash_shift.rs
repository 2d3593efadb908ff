//! # Cash Shift Repository
//!
//! Shifts and their append-only drawer movements.
//!
//! ## Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  insert()            status = open, totals 0                            │
//! │     │                                                                   │
//! │     ├── insert_movement() + add_movement_total()   (repeat)             │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  close()             end_time, totals, expected, actual, difference     │
//! │                      status = closed. The row is frozen from here on.   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{CashMovement, CashShift, MovementType};

/// Repository for cash shifts.
#[derive(Debug, Clone)]
pub struct CashShiftRepository {
    pool: SqlitePool,
}

impl CashShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashShiftRepository { pool }
    }

    /// Gets a shift by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<CashShift>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// The open shift of a store, if any.
    pub async fn open_for_store(&self, tenant_id: &str, store_id: &str) -> DbResult<Option<CashShift>> {
        let shift = sqlx::query_as::<_, CashShift>(
            "SELECT * FROM cash_shifts WHERE tenant_id = ?1 AND store_id = ?2 AND status = 'open'",
        )
        .bind(tenant_id)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Movements of a shift, in the order they were recorded.
    pub async fn movements(&self, shift_id: &str) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as::<_, CashMovement>(
            "SELECT * FROM cash_movements WHERE cash_shift_id = ?1 ORDER BY recorded_at ASC, id ASC",
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Shifts of a store by start time, newest first.
    pub async fn history(
        &self,
        tenant_id: &str,
        store_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> DbResult<Vec<CashShift>> {
        let shifts = sqlx::query_as::<_, CashShift>(
            r#"
            SELECT * FROM cash_shifts
            WHERE tenant_id = ?1
              AND store_id = ?2
              AND (?3 IS NULL OR start_time >= ?3)
              AND (?4 IS NULL OR start_time <= ?4)
            ORDER BY start_time DESC
            LIMIT ?5
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    // =========================================================================
    // Transactional Operations
    // =========================================================================

    pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CashShift>> {
        let shift = sqlx::query_as::<_, CashShift>("SELECT * FROM cash_shifts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(shift)
    }

    /// Claims a shift row while it is open.
    ///
    /// `false` means the shift is missing or closed; the caller tells the two
    /// apart with [`find`](Self::find) under the same lock.
    pub(crate) async fn claim_open(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE cash_shifts SET status = status WHERE id = ?1 AND status = 'open'",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn insert(conn: &mut SqliteConnection, shift: &CashShift) -> DbResult<()> {
        debug!(
            id = %shift.id,
            tenant_id = %shift.tenant_id,
            store_id = %shift.store_id,
            "Inserting cash shift"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_shifts (
                id, tenant_id, store_id, user_id, user_name,
                start_time, end_time, start_amount_cents,
                total_sales_cash_cents, total_sales_card_cents,
                total_sales_transfer_cents, total_sales_wallet_cents,
                total_credit_collections_cents, total_cash_in_cents,
                total_cash_out_cents, total_expenses_cents,
                expected_cash_end_cents, actual_cash_end_cents, difference_cents,
                status, notes
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10,
                ?11, ?12,
                ?13, ?14,
                ?15, ?16,
                ?17, ?18, ?19,
                ?20, ?21
            )
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.tenant_id)
        .bind(&shift.store_id)
        .bind(&shift.user_id)
        .bind(&shift.user_name)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.start_amount_cents)
        .bind(shift.total_sales_cash_cents)
        .bind(shift.total_sales_card_cents)
        .bind(shift.total_sales_transfer_cents)
        .bind(shift.total_sales_wallet_cents)
        .bind(shift.total_credit_collections_cents)
        .bind(shift.total_cash_in_cents)
        .bind(shift.total_cash_out_cents)
        .bind(shift.total_expenses_cents)
        .bind(shift.expected_cash_end_cents)
        .bind(shift.actual_cash_end_cents)
        .bind(shift.difference_cents)
        .bind(shift.status)
        .bind(&shift.notes)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub(crate) async fn insert_movement(
        conn: &mut SqliteConnection,
        movement: &CashMovement,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cash_movements (
                id, cash_shift_id, movement_type, amount_cents,
                description, user_id, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.cash_shift_id)
        .bind(movement.movement_type)
        .bind(movement.amount_cents)
        .bind(&movement.description)
        .bind(&movement.user_id)
        .bind(movement.recorded_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Bumps the IN or OUT total and the running expected amount.
    pub(crate) async fn add_movement_total(
        conn: &mut SqliteConnection,
        id: &str,
        movement_type: MovementType,
        amount_cents: i64,
    ) -> DbResult<()> {
        let sql = match movement_type {
            MovementType::In => {
                r#"
                UPDATE cash_shifts
                SET total_cash_in_cents = total_cash_in_cents + ?2,
                    expected_cash_end_cents = expected_cash_end_cents + ?2
                WHERE id = ?1
                "#
            }
            MovementType::Out => {
                r#"
                UPDATE cash_shifts
                SET total_cash_out_cents = total_cash_out_cents + ?2,
                    expected_cash_end_cents = expected_cash_end_cents - ?2
                WHERE id = ?1
                "#
            }
        };

        sqlx::query(sql)
            .bind(id)
            .bind(amount_cents)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// `(cash_in, cash_out)` summed from the movement rows.
    pub(crate) async fn movement_sums(conn: &mut SqliteConnection, id: &str) -> DbResult<(i64, i64)> {
        let sums: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN movement_type = 'IN' THEN amount_cents END), 0),
                COALESCE(SUM(CASE WHEN movement_type = 'OUT' THEN amount_cents END), 0)
            FROM cash_movements
            WHERE cash_shift_id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(sums)
    }

    /// Persists the closing snapshot. The row must be claimed and open.
    pub(crate) async fn close(conn: &mut SqliteConnection, shift: &CashShift) -> DbResult<()> {
        debug!(id = %shift.id, difference_cents = shift.difference_cents, "Closing cash shift");

        sqlx::query(
            r#"
            UPDATE cash_shifts
            SET end_time = ?2,
                total_sales_cash_cents = ?3,
                total_sales_card_cents = ?4,
                total_sales_transfer_cents = ?5,
                total_sales_wallet_cents = ?6,
                total_credit_collections_cents = ?7,
                total_cash_in_cents = ?8,
                total_cash_out_cents = ?9,
                total_expenses_cents = ?10,
                expected_cash_end_cents = ?11,
                actual_cash_end_cents = ?12,
                difference_cents = ?13,
                status = ?14,
                notes = ?15
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(&shift.id)
        .bind(shift.end_time)
        .bind(shift.total_sales_cash_cents)
        .bind(shift.total_sales_card_cents)
        .bind(shift.total_sales_transfer_cents)
        .bind(shift.total_sales_wallet_cents)
        .bind(shift.total_credit_collections_cents)
        .bind(shift.total_cash_in_cents)
        .bind(shift.total_cash_out_cents)
        .bind(shift.total_expenses_cents)
        .bind(shift.expected_cash_end_cents)
        .bind(shift.actual_cash_end_cents)
        .bind(shift.difference_cents)
        .bind(shift.status)
        .bind(&shift.notes)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
