//! # Credit Ledger
//!
//! Store credit, partial payments, and the customer's cached debt.
//!
//! ## Payment Application
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_payment(credit, $80.00)                                            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    claim credits row            ◄── concurrent payers queue here       │
//! │    re-read credit                                                       │
//! │    paid?            ──► AlreadySettled                                  │
//! │    80 > remaining?  ──► ExceedsBalance                                  │
//! │    INSERT credit_payments  (+80)                                        │
//! │    UPDATE credits          remaining −80, is_paid, paid_date            │
//! │    UPDATE customer_accounts current_debt −80                            │
//! │  COMMIT                      all three writes or none                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - `amount − remaining == Σ payments` for every credit
//! - `current_debt == Σ remaining` over a customer's credits
//!
//! Refunds go through the same path with `PaymentKind::Refund`, so both
//! invariants hold for them too.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ledger::error::{LedgerError, LedgerResult};
use crate::repository::credit::CreditRepository;
use crate::repository::customer::CustomerRepository;
use crate::tx;
use tally_core::validation::{
    ensure_positive, sanitize_reference, validate_id, validate_name, validate_non_negative,
    validate_notes,
};
use tally_core::{
    CoreError, Credit, CreditDetails, CreditPayment, CustomerAccount, DebtAudit, Money, NewCredit,
    PaymentKind,
};

const REFERENCE_TARGET: &str = "credits.reference";

/// Credit and payment service.
#[derive(Debug, Clone)]
pub struct CreditLedger {
    pool: SqlitePool,
}

impl CreditLedger {
    pub fn new(pool: SqlitePool) -> Self {
        CreditLedger { pool }
    }

    fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    fn credits(&self) -> CreditRepository {
        CreditRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Customer Accounts
    // =========================================================================

    /// Opens a credit account with no debt.
    pub async fn open_account(
        &self,
        tenant_id: &str,
        name: &str,
        credit_limit: Money,
    ) -> LedgerResult<CustomerAccount> {
        validate_id("tenant_id", tenant_id)?;
        let name = validate_name("name", name)?;
        validate_non_negative("credit_limit", credit_limit)?;

        let now = Utc::now();
        let account = CustomerAccount {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name,
            credit_limit_cents: credit_limit.cents(),
            current_debt_cents: 0,
            created_at: now,
            updated_at: now,
        };
        self.customers().insert(&account).await?;

        info!(id = %account.id, tenant_id = %tenant_id, credit_limit = %credit_limit, "Customer account opened");
        Ok(account)
    }

    pub async fn get_account(&self, customer_id: &str) -> LedgerResult<CustomerAccount> {
        self.customers()
            .get(customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", customer_id).into())
    }

    /// Sets a new limit. Lowering it below the current debt is allowed; it
    /// only blocks new credits.
    pub async fn update_credit_limit(
        &self,
        customer_id: &str,
        credit_limit: Money,
    ) -> LedgerResult<CustomerAccount> {
        validate_non_negative("credit_limit", credit_limit)?;

        self.customers()
            .update_credit_limit(customer_id, credit_limit.cents(), Utc::now())
            .await?;

        self.get_account(customer_id).await
    }

    pub async fn available_credit(&self, customer_id: &str) -> LedgerResult<Money> {
        Ok(self.get_account(customer_id).await?.available_credit())
    }

    // =========================================================================
    // Credit Issuance
    // =========================================================================

    /// Extends credit to a customer and raises their debt by the same amount.
    ///
    /// ## Errors
    /// * `InvalidAmount` - amount is zero or negative
    /// * `NotFound` - unknown customer
    /// * `InsufficientCredit` - debt plus amount would pass the limit
    /// * `Conflict` - the customer already has a credit with this reference
    pub async fn create_credit(&self, new: NewCredit) -> LedgerResult<Credit> {
        ensure_positive("amount", new.amount)?;
        validate_id("customer_id", &new.customer_id)?;
        validate_id("store_id", &new.store_id)?;
        let reference = new.reference.as_deref().map(sanitize_reference).transpose()?;
        let notes = validate_notes(new.notes.as_deref())?;

        let mut tx = self.pool.begin().await?;
        let result = Self::create_locked(&mut *tx, &new, reference, notes, Utc::now()).await;
        let credit = tx::finish(tx, result).await?;

        info!(
            credit_id = %credit.id,
            customer_id = %credit.customer_id,
            store_id = %credit.store_id,
            amount_cents = credit.amount_cents,
            "Credit issued"
        );

        Ok(credit)
    }

    async fn create_locked(
        conn: &mut SqliteConnection,
        new: &NewCredit,
        reference: Option<String>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Credit> {
        if !CustomerRepository::claim(conn, &new.customer_id).await? {
            return Err(CoreError::not_found("Customer", &new.customer_id).into());
        }
        let account = CustomerRepository::find(conn, &new.customer_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", &new.customer_id))?;

        let new_debt = account
            .current_debt()
            .checked_add(new.amount)
            .ok_or_else(|| CoreError::invalid_amount("amount is too large"))?;
        if new_debt > account.credit_limit() {
            warn!(
                customer_id = %account.id,
                requested_cents = new.amount.cents(),
                available_cents = account.available_credit().cents(),
                "Credit rejected: limit reached"
            );
            return Err(CoreError::InsufficientCredit {
                requested: new.amount,
                available: account.available_credit(),
            }
            .into());
        }

        let credit = Credit {
            id: Uuid::new_v4().to_string(),
            tenant_id: account.tenant_id.clone(),
            store_id: new.store_id.clone(),
            customer_id: account.id.clone(),
            amount_cents: new.amount.cents(),
            remaining_amount_cents: new.amount.cents(),
            credit_date: now,
            due_date: new.due_date,
            is_paid: false,
            paid_date: None,
            reference,
            notes,
            created_at: now,
            updated_at: now,
        };

        CreditRepository::insert(conn, &credit).await.map_err(|err| {
            if err.is_unique_on(REFERENCE_TARGET) {
                LedgerError::from(CoreError::Conflict(format!(
                    "Customer {} already has a credit for {}",
                    credit.customer_id,
                    credit.reference.as_deref().unwrap_or_default()
                )))
            } else {
                LedgerError::from(err)
            }
        })?;
        CustomerRepository::add_debt(conn, &account.id, credit.amount_cents, now).await?;

        Ok(credit)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Applies a payment collected at `store_id`.
    ///
    /// ## Errors
    /// * `InvalidAmount` - amount is zero or negative (checked first)
    /// * `NotFound` - unknown credit
    /// * `AlreadySettled` - nothing left to pay
    /// * `ExceedsBalance` - amount is more than the remaining balance
    pub async fn add_payment(
        &self,
        credit_id: &str,
        amount: Money,
        store_id: &str,
        notes: Option<&str>,
    ) -> LedgerResult<Credit> {
        ensure_positive("amount", amount)?;
        validate_id("credit_id", credit_id)?;
        validate_id("store_id", store_id)?;
        let notes = validate_notes(notes)?;

        let mut tx = self.pool.begin().await?;
        let result = Self::pay_locked(&mut *tx, credit_id, amount, store_id, notes).await;
        let credit = tx::finish(tx, result).await?;

        info!(
            credit_id = %credit.id,
            store_id = %store_id,
            amount_cents = amount.cents(),
            remaining_cents = credit.remaining_amount_cents,
            is_paid = credit.is_paid,
            "Credit payment applied"
        );

        Ok(credit)
    }

    async fn pay_locked(
        conn: &mut SqliteConnection,
        credit_id: &str,
        amount: Money,
        store_id: &str,
        notes: Option<String>,
    ) -> LedgerResult<Credit> {
        if !CreditRepository::claim(conn, credit_id).await? {
            return Err(CoreError::not_found("Credit", credit_id).into());
        }
        let credit = CreditRepository::find(conn, credit_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Credit", credit_id))?;

        Self::apply_locked(conn, credit, amount, store_id, PaymentKind::Payment, notes, Utc::now()).await
    }

    /// Records one payment row and moves both balances by `amount`.
    ///
    /// The credit row (or its customer) must already be claimed.
    async fn apply_locked(
        conn: &mut SqliteConnection,
        mut credit: Credit,
        amount: Money,
        store_id: &str,
        kind: PaymentKind,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> LedgerResult<Credit> {
        if credit.is_paid {
            return Err(CoreError::AlreadySettled {
                credit_id: credit.id,
            }
            .into());
        }
        if amount > credit.remaining() {
            return Err(CoreError::ExceedsBalance {
                amount,
                remaining: credit.remaining(),
            }
            .into());
        }

        let payment = CreditPayment {
            id: Uuid::new_v4().to_string(),
            tenant_id: credit.tenant_id.clone(),
            store_id: store_id.to_string(),
            credit_id: credit.id.clone(),
            kind,
            amount_cents: amount.cents(),
            payment_date: now,
            notes,
        };
        CreditRepository::insert_payment(conn, &payment).await?;

        credit.remaining_amount_cents -= amount.cents();
        credit.is_paid = credit.remaining_amount_cents == 0;
        if credit.is_paid {
            credit.paid_date = Some(now);
        }
        credit.updated_at = now;
        CreditRepository::settle(conn, &credit).await?;

        CustomerRepository::add_debt(conn, &credit.customer_id, -amount.cents(), now).await?;

        Ok(credit)
    }

    /// Writes off the rest of the credit that financed a returned sale.
    ///
    /// The credit is matched on its `reference`; credits issued without one
    /// are matched on their notes instead. The most recent match wins. A
    /// credit that is already paid is returned unchanged.
    pub async fn refund(
        &self,
        customer_id: &str,
        reference: &str,
        notes: Option<&str>,
    ) -> LedgerResult<Credit> {
        validate_id("customer_id", customer_id)?;
        let reference = sanitize_reference(reference)?;
        let notes = validate_notes(notes)?.or_else(|| Some(format!("Refund of {reference}")));

        let mut tx = self.pool.begin().await?;
        let result = Self::refund_locked(&mut *tx, customer_id, &reference, notes).await;
        let credit = tx::finish(tx, result).await?;

        info!(
            credit_id = %credit.id,
            customer_id = %customer_id,
            reference = %reference,
            "Credit refunded"
        );

        Ok(credit)
    }

    async fn refund_locked(
        conn: &mut SqliteConnection,
        customer_id: &str,
        reference: &str,
        notes: Option<String>,
    ) -> LedgerResult<Credit> {
        // Claiming the customer covers every credit the lookup might pick.
        if !CustomerRepository::claim(conn, customer_id).await? {
            return Err(CoreError::not_found("Customer", customer_id).into());
        }

        let credit = match CreditRepository::find_by_reference(conn, customer_id, reference).await? {
            Some(credit) => credit,
            None => CreditRepository::find_by_note(conn, customer_id, reference)
                .await?
                .ok_or_else(|| CoreError::not_found("Credit", reference))?,
        };

        if credit.is_paid {
            debug!(credit_id = %credit.id, "Refund skipped: credit already paid");
            return Ok(credit);
        }

        let remaining = credit.remaining();
        let store_id = credit.store_id.clone();
        Self::apply_locked(conn, credit, remaining, &store_id, PaymentKind::Refund, notes, Utc::now()).await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// A credit with its payments, oldest first.
    pub async fn get_credit(&self, credit_id: &str) -> LedgerResult<CreditDetails> {
        let repo = self.credits();
        let credit = repo
            .get(credit_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Credit", credit_id))?;
        let payments = repo.payments_for(credit_id).await?;

        Ok(CreditDetails { credit, payments })
    }

    pub async fn customer_credits(&self, customer_id: &str) -> LedgerResult<Vec<Credit>> {
        Ok(self.credits().by_customer(customer_id).await?)
    }

    pub async fn pending_credits(&self, tenant_id: &str) -> LedgerResult<Vec<Credit>> {
        Ok(self.credits().pending(tenant_id).await?)
    }

    pub async fn overdue_credits(&self, tenant_id: &str, now: DateTime<Utc>) -> LedgerResult<Vec<Credit>> {
        Ok(self.credits().overdue(tenant_id, now).await?)
    }

    /// Payments and refunds of a tenant, newest first.
    pub async fn payments(
        &self,
        tenant_id: &str,
        store_id: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<CreditPayment>> {
        Ok(self.credits().payments(tenant_id, store_id, from, to).await?)
    }

    /// Compares the cached debt with the sum of open balances.
    ///
    /// Runs as two unclaimed reads, so a payment committing in between can
    /// produce a transient mismatch.
    pub async fn audit_customer(&self, customer_id: &str) -> LedgerResult<DebtAudit> {
        let account = self.get_account(customer_id).await?;
        let open_balance = Money::from_cents(self.customers().open_balance(customer_id).await?);

        Ok(DebtAudit {
            customer_id: account.id.clone(),
            current_debt: account.current_debt(),
            open_balance,
            consistent: account.current_debt() == open_balance,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::error::ErrorCode;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    async fn ledger() -> (Database, CreditLedger) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.credit_ledger();
        (db, ledger)
    }

    fn dollars(d: i64) -> Money {
        Money::from_cents(d * 100)
    }

    fn new_credit(customer_id: &str, amount: Money, reference: Option<&str>) -> NewCredit {
        NewCredit {
            customer_id: customer_id.to_string(),
            store_id: "s-1".to_string(),
            amount,
            due_date: None,
            reference: reference.map(str::to_string),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_credit_raises_debt() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();

        let credit = ledger
            .create_credit(new_credit(&customer.id, dollars(200), Some("#B001-00000042")))
            .await
            .unwrap();

        assert_eq!(credit.tenant_id, "t-1");
        assert_eq!(credit.remaining(), dollars(200));
        assert_eq!(credit.reference.as_deref(), Some("B001-00000042"));
        assert!(!credit.is_paid);

        let account = ledger.get_account(&customer.id).await.unwrap();
        assert_eq!(account.current_debt(), dollars(200));
        assert_eq!(ledger.available_credit(&customer.id).await.unwrap(), dollars(300));
    }

    #[tokio::test]
    async fn test_insufficient_credit() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(100)).await.unwrap();
        ledger
            .create_credit(new_credit(&customer.id, dollars(60), None))
            .await
            .unwrap();

        let err = ledger
            .create_credit(new_credit(&customer.id, dollars(41), None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientCredit);

        // Exactly at the limit is allowed
        ledger
            .create_credit(new_credit(&customer.id, dollars(40), None))
            .await
            .unwrap();

        let audit = ledger.audit_customer(&customer.id).await.unwrap();
        assert_eq!(audit.current_debt, dollars(100));
        assert!(audit.consistent);
    }

    #[tokio::test]
    async fn test_create_credit_unknown_customer() {
        let (_db, ledger) = ledger().await;

        let err = ledger
            .create_credit(new_credit("missing", dollars(10), None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_reference() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
        ledger
            .create_credit(new_credit(&customer.id, dollars(10), Some("B001-00000001")))
            .await
            .unwrap();

        let err = ledger
            .create_credit(new_credit(&customer.id, dollars(10), Some("B001-00000001")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        // The rejected credit left no debt behind
        let account = ledger.get_account(&customer.id).await.unwrap();
        assert_eq!(account.current_debt(), dollars(10));
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
        let credit = ledger
            .create_credit(new_credit(&customer.id, dollars(200), None))
            .await
            .unwrap();

        let after = ledger
            .add_payment(&credit.id, dollars(80), "s-1", Some("cash"))
            .await
            .unwrap();
        assert_eq!(after.remaining(), dollars(120));
        assert!(!after.is_paid);
        assert!(after.paid_date.is_none());

        let after = ledger
            .add_payment(&credit.id, dollars(120), "s-2", None)
            .await
            .unwrap();
        assert_eq!(after.remaining(), Money::zero());
        assert!(after.is_paid);
        assert!(after.paid_date.is_some());

        let details = ledger.get_credit(&credit.id).await.unwrap();
        assert_eq!(details.payments.len(), 2);
        assert_eq!(details.payments[0].amount(), dollars(80));
        assert_eq!(details.payments[1].store_id, "s-2");
        let paid: Money = details.payments.iter().map(|p| p.amount()).sum();
        assert_eq!(paid, details.credit.settled());

        let err = ledger
            .add_payment(&credit.id, dollars(1), "s-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadySettled);

        let account = ledger.get_account(&customer.id).await.unwrap();
        assert_eq!(account.current_debt(), Money::zero());
    }

    #[tokio::test]
    async fn test_payment_bound() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
        let credit = ledger
            .create_credit(new_credit(&customer.id, dollars(200), None))
            .await
            .unwrap();
        ledger.add_payment(&credit.id, dollars(80), "s-1", None).await.unwrap();

        let err = ledger
            .add_payment(&credit.id, dollars(120) + Money::from_cents(1), "s-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ExceedsBalance);
        assert_eq!(
            err.to_response().message,
            "Payment of $120.01 exceeds remaining balance $120.00"
        );

        let details = ledger.get_credit(&credit.id).await.unwrap();
        assert_eq!(details.credit.remaining(), dollars(120));
        assert_eq!(details.payments.len(), 1);
        assert_eq!(
            ledger.get_account(&customer.id).await.unwrap().current_debt(),
            dollars(120)
        );
    }

    #[tokio::test]
    async fn test_invalid_amount_checked_first() {
        let (_db, ledger) = ledger().await;

        let err = ledger
            .add_payment("missing", Money::zero(), "s-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);

        let err = ledger
            .add_payment("missing", dollars(-5), "s-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAmount);

        let err = ledger
            .add_payment("missing", dollars(5), "s-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_refund_by_reference() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
        let credit = ledger
            .create_credit(new_credit(&customer.id, dollars(200), Some("B001-00000042")))
            .await
            .unwrap();
        ledger.add_payment(&credit.id, dollars(50), "s-1", None).await.unwrap();

        let refunded = ledger
            .refund(&customer.id, " #B001-00000042", None)
            .await
            .unwrap();
        assert_eq!(refunded.id, credit.id);
        assert!(refunded.is_paid);

        let details = ledger.get_credit(&credit.id).await.unwrap();
        assert_eq!(details.payments.len(), 2);
        assert_eq!(details.payments[1].kind, PaymentKind::Refund);
        assert_eq!(details.payments[1].amount(), dollars(150));

        // A second refund is a no-op
        let again = ledger.refund(&customer.id, "B001-00000042", None).await.unwrap();
        assert!(again.is_paid);
        assert_eq!(ledger.get_credit(&credit.id).await.unwrap().payments.len(), 2);

        let audit = ledger.audit_customer(&customer.id).await.unwrap();
        assert_eq!(audit.current_debt, Money::zero());
        assert!(audit.consistent);
    }

    #[tokio::test]
    async fn test_refund_falls_back_to_notes() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();

        let mut legacy = new_credit(&customer.id, dollars(30), None);
        legacy.notes = Some("Venta NV01-00000007".to_string());
        let legacy = ledger.create_credit(legacy).await.unwrap();

        let refunded = ledger.refund(&customer.id, "#NV01-00000007", None).await.unwrap();
        assert_eq!(refunded.id, legacy.id);
        assert_eq!(refunded.remaining(), Money::zero());

        let err = ledger
            .refund(&customer.id, "NV01-99999999", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_pending_and_overdue() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
        let now = Utc::now();

        let mut late = new_credit(&customer.id, dollars(10), None);
        late.due_date = Some(now - Duration::days(3));
        let late = ledger.create_credit(late).await.unwrap();

        let mut upcoming = new_credit(&customer.id, dollars(10), None);
        upcoming.due_date = Some(now + Duration::days(3));
        ledger.create_credit(upcoming).await.unwrap();

        let paid = ledger
            .create_credit(new_credit(&customer.id, dollars(10), None))
            .await
            .unwrap();
        ledger.add_payment(&paid.id, dollars(10), "s-1", None).await.unwrap();

        assert_eq!(ledger.pending_credits("t-1").await.unwrap().len(), 2);

        let overdue = ledger.overdue_credits("t-1", now).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, late.id);
        assert!(overdue[0].is_overdue(now));

        assert_eq!(ledger.customer_credits(&customer.id).await.unwrap().len(), 3);
        assert_eq!(
            ledger.payments("t-1", Some("s-1"), None, None).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_credit_limit() {
        let (_db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(100)).await.unwrap();

        let account = ledger.update_credit_limit(&customer.id, dollars(250)).await.unwrap();
        assert_eq!(account.credit_limit(), dollars(250));

        let err = ledger
            .update_credit_limit(&customer.id, dollars(-1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = ledger.update_credit_limit("missing", dollars(1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_failed_debt_update_leaves_no_payment() {
        let (db, ledger) = ledger().await;
        let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
        let credit = ledger
            .create_credit(new_credit(&customer.id, dollars(200), None))
            .await
            .unwrap();

        // Fail the last write of a payment, after its row is inserted
        sqlx::query(
            r#"
            CREATE TRIGGER fail_debt_update
            BEFORE UPDATE OF current_debt_cents ON customer_accounts
            BEGIN
                SELECT RAISE(ABORT, 'debt update failed');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = ledger
            .add_payment(&credit.id, dollars(50), "s-1", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StorageError);

        let details = ledger.get_credit(&credit.id).await.unwrap();
        assert!(details.payments.is_empty());
        assert_eq!(details.credit.remaining(), dollars(200));
        assert!(!details.credit.is_paid);

        let account = ledger.get_account(&customer.id).await.unwrap();
        assert_eq!(account.current_debt(), dollars(200));
    }
}
