//! # Credit Repository
//!
//! Credits and their append-only payment rows.
//!
//! ## Conservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  For every credit c:                                                    │
//! │      c.amount − c.remaining  ==  Σ payments(c).amount                   │
//! │                                                                         │
//! │  insert_payment() and settle() are only called together, inside one    │
//! │  ledger transaction, so the equality holds at every commit.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Credit, CreditPayment};

/// Repository for credits and credit payments.
#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
}

impl CreditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CreditRepository { pool }
    }

    /// Gets a credit by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Credit>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Payments of a credit, oldest first.
    pub async fn payments_for(&self, credit_id: &str) -> DbResult<Vec<CreditPayment>> {
        let payments = sqlx::query_as::<_, CreditPayment>(
            "SELECT * FROM credit_payments WHERE credit_id = ?1 ORDER BY payment_date ASC, id ASC",
        )
        .bind(credit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Credits of a customer, newest first.
    pub async fn by_customer(&self, customer_id: &str) -> DbResult<Vec<Credit>> {
        let credits = sqlx::query_as::<_, Credit>(
            "SELECT * FROM credits WHERE customer_id = ?1 ORDER BY credit_date DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(credits)
    }

    /// Unpaid credits of a tenant by due date (undated last).
    pub async fn pending(&self, tenant_id: &str) -> DbResult<Vec<Credit>> {
        let credits = sqlx::query_as::<_, Credit>(
            r#"
            SELECT * FROM credits
            WHERE tenant_id = ?1 AND is_paid = 0
            ORDER BY due_date IS NULL, due_date ASC, credit_date ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(credits)
    }

    /// Unpaid credits whose due date is before `now`.
    pub async fn overdue(&self, tenant_id: &str, now: DateTime<Utc>) -> DbResult<Vec<Credit>> {
        let credits = sqlx::query_as::<_, Credit>(
            r#"
            SELECT * FROM credits
            WHERE tenant_id = ?1
              AND is_paid = 0
              AND due_date IS NOT NULL
              AND due_date < ?2
            ORDER BY due_date ASC
            "#,
        )
        .bind(tenant_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(credits)
    }

    /// Payments of a tenant, newest first, optionally filtered.
    pub async fn payments(
        &self,
        tenant_id: &str,
        store_id: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<CreditPayment>> {
        let payments = sqlx::query_as::<_, CreditPayment>(
            r#"
            SELECT * FROM credit_payments
            WHERE tenant_id = ?1
              AND (?2 IS NULL OR store_id = ?2)
              AND (?3 IS NULL OR payment_date >= ?3)
              AND (?4 IS NULL OR payment_date <= ?4)
            ORDER BY payment_date DESC
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    // =========================================================================
    // Transactional Operations
    // =========================================================================

    /// Claims a credit row. `false` if it does not exist.
    pub(crate) async fn claim(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE credits SET updated_at = updated_at WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Credit>> {
        let credit = sqlx::query_as::<_, Credit>("SELECT * FROM credits WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(credit)
    }

    /// Most recent credit of a customer carrying exactly this reference.
    pub(crate) async fn find_by_reference(
        conn: &mut SqliteConnection,
        customer_id: &str,
        reference: &str,
    ) -> DbResult<Option<Credit>> {
        let credit = sqlx::query_as::<_, Credit>(
            r#"
            SELECT * FROM credits
            WHERE customer_id = ?1 AND reference = ?2
            ORDER BY credit_date DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .bind(reference)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(credit)
    }

    /// Most recent unreferenced credit whose notes contain `fragment`.
    ///
    /// Credits issued before the reference column existed only mention the
    /// sale number in their notes.
    pub(crate) async fn find_by_note(
        conn: &mut SqliteConnection,
        customer_id: &str,
        fragment: &str,
    ) -> DbResult<Option<Credit>> {
        let credit = sqlx::query_as::<_, Credit>(
            r#"
            SELECT * FROM credits
            WHERE customer_id = ?1
              AND reference IS NULL
              AND notes IS NOT NULL
              AND instr(notes, ?2) > 0
            ORDER BY credit_date DESC
            LIMIT 1
            "#,
        )
        .bind(customer_id)
        .bind(fragment)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(credit)
    }

    pub(crate) async fn insert(conn: &mut SqliteConnection, credit: &Credit) -> DbResult<()> {
        debug!(
            id = %credit.id,
            customer_id = %credit.customer_id,
            amount_cents = credit.amount_cents,
            "Inserting credit"
        );

        sqlx::query(
            r#"
            INSERT INTO credits (
                id, tenant_id, store_id, customer_id,
                amount_cents, remaining_amount_cents,
                credit_date, due_date, is_paid, paid_date,
                reference, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&credit.id)
        .bind(&credit.tenant_id)
        .bind(&credit.store_id)
        .bind(&credit.customer_id)
        .bind(credit.amount_cents)
        .bind(credit.remaining_amount_cents)
        .bind(credit.credit_date)
        .bind(credit.due_date)
        .bind(credit.is_paid)
        .bind(credit.paid_date)
        .bind(&credit.reference)
        .bind(&credit.notes)
        .bind(credit.created_at)
        .bind(credit.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub(crate) async fn insert_payment(
        conn: &mut SqliteConnection,
        payment: &CreditPayment,
    ) -> DbResult<()> {
        debug!(
            credit_id = %payment.credit_id,
            kind = payment.kind.as_str(),
            amount_cents = payment.amount_cents,
            "Recording credit payment"
        );

        sqlx::query(
            r#"
            INSERT INTO credit_payments (
                id, tenant_id, store_id, credit_id, kind,
                amount_cents, payment_date, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.tenant_id)
        .bind(&payment.store_id)
        .bind(&payment.credit_id)
        .bind(payment.kind)
        .bind(payment.amount_cents)
        .bind(payment.payment_date)
        .bind(&payment.notes)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the post-payment balance of a credit.
    pub(crate) async fn settle(conn: &mut SqliteConnection, credit: &Credit) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE credits
            SET remaining_amount_cents = ?2,
                is_paid = ?3,
                paid_date = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&credit.id)
        .bind(credit.remaining_amount_cents)
        .bind(credit.is_paid)
        .bind(credit.paid_date)
        .bind(credit.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
