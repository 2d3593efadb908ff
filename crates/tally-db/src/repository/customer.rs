//! # Customer Account Repository
//!
//! The credit-bearing side of customers: limit and cached debt.
//!
//! `current_debt_cents` is only ever changed by [`add_debt`](CustomerRepository::add_debt)
//! inside a credit ledger transaction, in the same commit as the credit row
//! it mirrors.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::CustomerAccount;

/// Repository for customer accounts.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new account.
    pub async fn insert(&self, account: &CustomerAccount) -> DbResult<()> {
        debug!(id = %account.id, tenant_id = %account.tenant_id, "Inserting customer account");

        sqlx::query(
            r#"
            INSERT INTO customer_accounts (
                id, tenant_id, name, credit_limit_cents, current_debt_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&account.id)
        .bind(&account.tenant_id)
        .bind(&account.name)
        .bind(account.credit_limit_cents)
        .bind(account.current_debt_cents)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an account by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<CustomerAccount>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Accounts of a tenant, by name.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<CustomerAccount>> {
        let accounts = sqlx::query_as::<_, CustomerAccount>(
            "SELECT * FROM customer_accounts WHERE tenant_id = ?1 ORDER BY name",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    /// Sets the credit limit.
    pub async fn update_credit_limit(
        &self,
        id: &str,
        credit_limit_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE customer_accounts SET credit_limit_cents = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(credit_limit_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Sum of remaining balances over the customer's credits.
    pub async fn open_balance(&self, id: &str) -> DbResult<i64> {
        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(remaining_amount_cents), 0) FROM credits WHERE customer_id = ?1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }

    // =========================================================================
    // Transactional Operations
    // =========================================================================

    /// Claims the account row. `false` if it does not exist.
    pub(crate) async fn claim(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE customer_accounts SET updated_at = updated_at WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CustomerAccount>> {
        let account = sqlx::query_as::<_, CustomerAccount>(
            "SELECT * FROM customer_accounts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(account)
    }

    /// Adds `delta_cents` (negative to reduce) to the cached debt.
    pub(crate) async fn add_debt(
        conn: &mut SqliteConnection,
        id: &str,
        delta_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE customer_accounts
            SET current_debt_cents = current_debt_cents + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }
}
