//! Concurrent terminals against one file-backed ledger.
//!
//! In-memory databases hold a single connection, so these tests use a
//! temporary file and a multi-connection pool on the multi-threaded runtime.

use std::collections::HashSet;
use std::time::Duration;

use tally_core::{Money, NewCredit, OpenShift};
use tally_db::{Database, DbConfig, ErrorCode};
use tempfile::TempDir;

async fn file_database() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("ledger.db"))
        .max_connections(10)
        .busy_timeout(Duration::from_secs(30));
    let db = Database::new(config).await.unwrap();
    (dir, db)
}

fn dollars(d: i64) -> Money {
    Money::from_cents(d * 100)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commits_are_gapless() {
    let (_dir, db) = file_database().await;
    let sequence = db.sequence();

    let preview = sequence.peek_next("t-1", "03", Some("s-1")).await.unwrap();
    assert_eq!(preview.full_number, "B001-00000001");

    let mut handles = Vec::new();
    for _ in 0..25 {
        let sequence = sequence.clone();
        handles.push(tokio::spawn(async move {
            sequence.commit_next("t-1", "B001").await
        }));
    }

    let mut issued = Vec::new();
    for handle in handles {
        let number = handle.await.unwrap().unwrap();
        let (code, digits) = number.split_once('-').unwrap();
        assert_eq!(code, "B001");
        issued.push(digits.parse::<i64>().unwrap());
    }
    issued.sort_unstable();

    assert_eq!(issued, (1..=25).collect::<Vec<_>>());

    let next = sequence.peek_next("t-1", "03", Some("s-1")).await.unwrap();
    assert_eq!(next.full_number, "B001-00000026");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_provisioning_converges() {
    let (_dir, db) = file_database().await;
    let sequence = db.sequence();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let sequence = sequence.clone();
        handles.push(tokio::spawn(async move {
            sequence.peek_next("t-1", "01", Some("s-1")).await
        }));
    }

    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await.unwrap().unwrap().series_code);
    }

    assert_eq!(codes.len(), 1);
    assert_eq!(sequence.list_series("t-1", Some("01")).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_never_overdraw() {
    let (_dir, db) = file_database().await;
    let ledger = db.credit_ledger();

    let customer = ledger.open_account("t-1", "Rosa", dollars(500)).await.unwrap();
    let credit = ledger
        .create_credit(NewCredit {
            customer_id: customer.id.clone(),
            store_id: "s-1".to_string(),
            amount: dollars(100),
            due_date: None,
            reference: None,
            notes: None,
        })
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let ledger = ledger.clone();
        let credit_id = credit.id.clone();
        handles.push(tokio::spawn(async move {
            ledger.add_payment(&credit_id, dollars(15), "s-1", None).await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(err) => assert_eq!(err.code(), ErrorCode::ExceedsBalance),
        }
    }
    assert_eq!(applied, 6);

    let details = ledger.get_credit(&credit.id).await.unwrap();
    assert_eq!(details.credit.remaining(), dollars(10));
    assert_eq!(details.payments.len(), 6);
    let paid: Money = details.payments.iter().map(|p| p.amount()).sum();
    assert_eq!(paid, details.credit.amount() - details.credit.remaining());

    let audit = ledger.audit_customer(&customer.id).await.unwrap();
    assert_eq!(audit.current_debt, dollars(10));
    assert!(audit.consistent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_payments_on_sibling_credits_keep_debt_consistent() {
    let (_dir, db) = file_database().await;
    let ledger = db.credit_ledger();

    let customer = ledger.open_account("t-1", "Rosa", dollars(1_000)).await.unwrap();
    let mut credit_ids = Vec::new();
    for n in 1..=5 {
        let credit = ledger
            .create_credit(NewCredit {
                customer_id: customer.id.clone(),
                store_id: "s-1".to_string(),
                amount: dollars(40),
                due_date: None,
                reference: Some(format!("B001-{n:08}")),
                notes: None,
            })
            .await
            .unwrap();
        credit_ids.push(credit.id);
    }

    let mut handles = Vec::new();
    for credit_id in credit_ids {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.add_payment(&credit_id, dollars(25), "s-1", None).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let audit = ledger.audit_customer(&customer.id).await.unwrap();
    assert_eq!(audit.current_debt, dollars(75));
    assert_eq!(audit.open_balance, dollars(75));
    assert!(audit.consistent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opens_admit_one_shift() {
    let (_dir, db) = file_database().await;
    let ledger = db.cash_shift_ledger();

    let mut handles = Vec::new();
    for n in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .open(OpenShift {
                    tenant_id: "t-1".to_string(),
                    store_id: "s-1".to_string(),
                    user_id: format!("u-{n}"),
                    user_name: format!("Cashier {n}"),
                    start_amount: dollars(100),
                })
                .await
        }));
    }

    let mut opened = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(shift) => opened.push(shift),
            Err(err) => assert_eq!(err.code(), ErrorCode::Conflict),
        }
    }
    assert_eq!(opened.len(), 1);

    let current = ledger.current_shift("t-1", "s-1").await.unwrap().unwrap();
    assert_eq!(current.shift.id, opened[0].id);
}
