//! # Sales / Expense Feed Repository
//!
//! The sales and expense services record what they settle here; shift
//! reconciliation aggregates it. Nothing in this crate mutates these rows
//! after insertion.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{Expense, NewExpense, NewSalePayment, PaymentMethod, SalePayment};

/// Repository for the sales and expense feed.
#[derive(Debug, Clone)]
pub struct FeedRepository {
    pool: SqlitePool,
}

impl FeedRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FeedRepository { pool }
    }

    /// Records one tender line of a completed sale.
    pub async fn record_sale_payment(&self, new: &NewSalePayment) -> DbResult<SalePayment> {
        let payment = SalePayment {
            id: Uuid::new_v4().to_string(),
            tenant_id: new.tenant_id.clone(),
            store_id: new.store_id.clone(),
            sale_number: new.sale_number.clone(),
            method: new.method,
            amount_cents: new.amount.cents(),
            sale_date: new.sale_date,
        };

        debug!(
            store_id = %payment.store_id,
            sale_number = %payment.sale_number,
            amount_cents = payment.amount_cents,
            "Recording sale payment"
        );

        sqlx::query(
            r#"
            INSERT INTO sale_payments (
                id, tenant_id, store_id, sale_number, method, amount_cents, sale_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.tenant_id)
        .bind(&payment.store_id)
        .bind(&payment.sale_number)
        .bind(payment.method)
        .bind(payment.amount_cents)
        .bind(payment.sale_date)
        .execute(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Records an expense.
    pub async fn record_expense(&self, new: &NewExpense) -> DbResult<Expense> {
        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            tenant_id: new.tenant_id.clone(),
            store_id: new.store_id.clone(),
            description: new.description.clone(),
            category: new.category.clone(),
            amount_cents: new.amount.cents(),
            expense_date: new.expense_date,
            payment_method: new.payment_method,
            is_paid: new.is_paid,
            created_at: Utc::now(),
        };

        debug!(
            store_id = %expense.store_id,
            amount_cents = expense.amount_cents,
            "Recording expense"
        );

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, tenant_id, store_id, description, category, amount_cents,
                expense_date, payment_method, is_paid, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.tenant_id)
        .bind(&expense.store_id)
        .bind(&expense.description)
        .bind(&expense.category)
        .bind(expense.amount_cents)
        .bind(expense.expense_date)
        .bind(expense.payment_method)
        .bind(expense.is_paid)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await?;

        Ok(expense)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Sale payments of a store within `[from, to]`, summed per method.
    pub async fn sales_by_method(
        &self,
        tenant_id: &str,
        store_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<(PaymentMethod, i64)>> {
        let rows: Vec<(PaymentMethod, i64)> = sqlx::query_as(
            r#"
            SELECT method, COALESCE(SUM(amount_cents), 0)
            FROM sale_payments
            WHERE tenant_id = ?1
              AND store_id = ?2
              AND sale_date >= ?3
              AND sale_date <= ?4
            GROUP BY method
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Credit payments collected at a store within `[from, to]`.
    ///
    /// Refund reversals move no cash and are left out.
    pub async fn credit_collections(
        &self,
        tenant_id: &str,
        store_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM credit_payments
            WHERE tenant_id = ?1
              AND store_id = ?2
              AND kind = 'payment'
              AND payment_date >= ?3
              AND payment_date <= ?4
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Paid cash expenses of a store dated within `[from, to]` (calendar days).
    pub async fn cash_expenses(
        &self,
        tenant_id: &str,
        store_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM expenses
            WHERE tenant_id = ?1
              AND store_id = ?2
              AND is_paid = 1
              AND payment_method = 'cash'
              AND expense_date >= ?3
              AND expense_date <= ?4
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}
