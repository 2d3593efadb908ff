//! A full shift reconciled against sales, credit collections, and expenses
//! recorded in the same database.

use chrono::Utc;
use tally_core::{
    Money, MovementType, NewCredit, NewExpense, NewMovement, NewSalePayment, OpenShift,
    PaymentMethod, ShiftStatus, Variance,
};
use tally_db::{Database, DbConfig, ErrorCode};

fn dollars(d: i64) -> Money {
    Money::from_cents(d * 100)
}

fn open_request(store: &str, start: Money) -> OpenShift {
    OpenShift {
        tenant_id: "t-1".to_string(),
        store_id: store.to_string(),
        user_id: "u-1".to_string(),
        user_name: "Ana".to_string(),
        start_amount: start,
    }
}

fn sale(store: &str, method: PaymentMethod, amount: Money) -> NewSalePayment {
    NewSalePayment {
        tenant_id: "t-1".to_string(),
        store_id: store.to_string(),
        sale_number: "B001-00000001".to_string(),
        method,
        amount,
        sale_date: Utc::now(),
    }
}

fn expense(method: PaymentMethod, amount: Money, is_paid: bool) -> NewExpense {
    NewExpense {
        tenant_id: "t-1".to_string(),
        store_id: "s-1".to_string(),
        description: "Cleaning supplies".to_string(),
        category: "supplies".to_string(),
        amount,
        expense_date: Utc::now().date_naive(),
        payment_method: method,
        is_paid,
    }
}

#[tokio::test]
async fn test_shift_with_credit_collection() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let shifts = db.cash_shift_ledger();
    let credits = db.credit_ledger();

    let shift = shifts.open(open_request("s-1", dollars(100))).await.unwrap();
    shifts
        .add_movement(
            &shift.id,
            NewMovement {
                movement_type: MovementType::In,
                amount: dollars(50),
                description: "change fund".to_string(),
                user_id: "u-1".to_string(),
            },
        )
        .await
        .unwrap();

    let customer = credits.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
    let credit = credits
        .create_credit(NewCredit {
            customer_id: customer.id.clone(),
            store_id: "s-1".to_string(),
            amount: dollars(200),
            due_date: None,
            reference: None,
            notes: None,
        })
        .await
        .unwrap();
    let credit = credits
        .add_payment(&credit.id, dollars(80), "s-1", None)
        .await
        .unwrap();
    assert_eq!(credit.remaining(), dollars(120));
    assert!(!credit.is_paid);

    let closed = shifts.close(&shift.id, dollars(230), None).await.unwrap();

    assert_eq!(closed.status, ShiftStatus::Closed);
    assert_eq!(closed.cash_in(), dollars(50));
    assert_eq!(closed.total_credit_collections_cents, dollars(80).cents());
    assert_eq!(closed.expected_cash_end(), dollars(230));
    assert_eq!(closed.difference(), Money::zero());
    assert_eq!(closed.variance(), Variance::Balanced);

    let history = shifts.history("t-1", "s-1", None, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].movements.len(), 1);
    assert_eq!(history[0].shift.expected_cash_end(), dollars(230));
}

#[tokio::test]
async fn test_only_cash_moves_the_drawer() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let shifts = db.cash_shift_ledger();
    let credits = db.credit_ledger();
    let feed = db.feed();

    let shift = shifts.open(open_request("s-1", dollars(100))).await.unwrap();

    feed.record_sale_payment(&sale("s-1", PaymentMethod::Cash, dollars(250)))
        .await
        .unwrap();
    feed.record_sale_payment(&sale("s-1", PaymentMethod::Card, dollars(90)))
        .await
        .unwrap();
    feed.record_sale_payment(&sale("s-1", PaymentMethod::Wallet, dollars(15)))
        .await
        .unwrap();
    feed.record_sale_payment(&sale("s-2", PaymentMethod::Cash, dollars(999)))
        .await
        .unwrap();

    feed.record_expense(&expense(PaymentMethod::Cash, dollars(10), true))
        .await
        .unwrap();
    feed.record_expense(&expense(PaymentMethod::Cash, dollars(7), false))
        .await
        .unwrap();
    feed.record_expense(&expense(PaymentMethod::Card, dollars(33), true))
        .await
        .unwrap();

    // A refund reversal writes off debt but hands over no cash
    let customer = credits.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
    credits
        .create_credit(NewCredit {
            customer_id: customer.id.clone(),
            store_id: "s-1".to_string(),
            amount: dollars(60),
            due_date: None,
            reference: Some("B001-00000009".to_string()),
            notes: None,
        })
        .await
        .unwrap();
    credits
        .refund(&customer.id, "B001-00000009", None)
        .await
        .unwrap();

    let live = shifts.details(&shift.id).await.unwrap();
    assert_eq!(live.shift.total_sales_cash_cents, dollars(250).cents());
    assert_eq!(live.shift.expected_cash_end(), dollars(340));

    let closed = shifts.close(&shift.id, dollars(335), Some("counted twice")).await.unwrap();

    assert_eq!(closed.total_sales_cash_cents, dollars(250).cents());
    assert_eq!(closed.total_sales_card_cents, dollars(90).cents());
    assert_eq!(closed.total_sales_wallet_cents, dollars(15).cents());
    assert_eq!(closed.total_sales_transfer_cents, 0);
    assert_eq!(closed.total_credit_collections_cents, 0);
    assert_eq!(closed.total_expenses_cents, dollars(10).cents());
    assert_eq!(closed.expected_cash_end(), dollars(340));
    assert_eq!(closed.difference(), dollars(-5));
    assert_eq!(closed.variance(), Variance::Shortage);
}

#[tokio::test]
async fn test_oversized_sale_feed_fails_close_cleanly() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let shifts = db.cash_shift_ledger();

    let shift = shifts.open(open_request("s-1", dollars(100))).await.unwrap();
    db.feed()
        .record_sale_payment(&sale("s-1", PaymentMethod::Cash, Money::from_cents(i64::MAX)))
        .await
        .unwrap();

    let err = shifts.close(&shift.id, Money::zero(), None).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidAmount);

    // Still open: a second drawer for the store is refused
    let err = shifts.open(open_request("s-1", dollars(100))).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);
}
