//! # Seed Data Generator
//!
//! Populates a ledger database with one demo store for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally-ledger.db (default)
//! cargo run -p tally-db --bin seed
//!
//! # Use a config file (TALLY_* environment variables still apply)
//! cargo run -p tally-db --bin seed -- --config ./ledger.toml
//! ```
//!
//! ## Generated Data
//! - Document series B001 / F001 with a few issued numbers
//! - Three customer accounts, credits, and partial payments
//! - An open cash shift with drawer movements, sale payments, and an expense

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use tally_core::{
    Money, MovementType, NewCredit, NewExpense, NewMovement, NewSalePayment, OpenShift,
    PaymentMethod,
};
use tally_db::{Database, LedgerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TENANT_ID: &str = "demo-tenant";
const STORE_ID: &str = "demo-store";

/// (name, credit limit, credit amount, paid so far), in cents
const CUSTOMERS: &[(&str, i64, i64, i64)] = &[
    ("Rosa Quispe", 50_000, 20_000, 8_000),
    ("Luis Mamani", 30_000, 12_500, 0),
    ("Carmen Flores", 100_000, 45_000, 45_000),
];

/// (method, amount) of demo sale tenders, in cents
const SALES: &[(PaymentMethod, i64)] = &[
    (PaymentMethod::Cash, 2_550),
    (PaymentMethod::Cash, 1_200),
    (PaymentMethod::Card, 8_990),
    (PaymentMethod::Wallet, 1_500),
    (PaymentMethod::Transfer, 4_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Ledger config file (TOML)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = LedgerConfig::load(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log.filter))
        .init();

    info!(path = ?config.database.path, "Seeding ledger database");
    let db = Database::new(config.db_config()).await?;

    if !db.customers().list(TENANT_ID).await?.is_empty() {
        println!("⚠ Database already has demo data, skipping.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Document numbers
    let sequence = db.sequence();
    for document_type in ["03", "01"] {
        let next = sequence.peek_next(TENANT_ID, document_type, Some(STORE_ID)).await?;
        for _ in 0..3 {
            sequence.commit_next(TENANT_ID, &next.series_code).await?;
        }
        let after = sequence.peek_next(TENANT_ID, document_type, Some(STORE_ID)).await?;
        println!("✓ Series {}: next {}", after.series_code, after.full_number);
    }

    // Cash shift first, so the payments below count as collections
    let shifts = db.cash_shift_ledger();
    let shift = shifts
        .open(OpenShift {
            tenant_id: TENANT_ID.to_string(),
            store_id: STORE_ID.to_string(),
            user_id: "demo-cashier".to_string(),
            user_name: "Demo Cashier".to_string(),
            start_amount: Money::from_cents(10_000),
        })
        .await?;
    for (movement_type, cents, description) in [
        (MovementType::In, 5_000, "Change fund"),
        (MovementType::Out, 2_000, "Bank drop"),
    ] {
        shifts
            .add_movement(
                &shift.id,
                NewMovement {
                    movement_type,
                    amount: Money::from_cents(cents),
                    description: description.to_string(),
                    user_id: "demo-cashier".to_string(),
                },
            )
            .await?;
    }

    // Customers and credits
    let credits = db.credit_ledger();
    for (index, (name, limit, amount, paid)) in CUSTOMERS.iter().enumerate() {
        let customer = credits
            .open_account(TENANT_ID, name, Money::from_cents(*limit))
            .await?;
        let credit = credits
            .create_credit(NewCredit {
                customer_id: customer.id.clone(),
                store_id: STORE_ID.to_string(),
                amount: Money::from_cents(*amount),
                due_date: Some(Utc::now() + chrono::Duration::days(30)),
                reference: Some(format!("B001-{:08}", index + 1)),
                notes: None,
            })
            .await?;
        if *paid > 0 {
            credits
                .add_payment(&credit.id, Money::from_cents(*paid), STORE_ID, None)
                .await?;
        }
        println!(
            "✓ {}: debt {}",
            name,
            credits.get_account(&customer.id).await?.current_debt()
        );
    }

    // Sales and expenses reported by the other services
    let feed = db.feed();
    for (index, (method, cents)) in SALES.iter().enumerate() {
        feed.record_sale_payment(&NewSalePayment {
            tenant_id: TENANT_ID.to_string(),
            store_id: STORE_ID.to_string(),
            sale_number: format!("B001-{:08}", index + 1),
            method: *method,
            amount: Money::from_cents(*cents),
            sale_date: Utc::now(),
        })
        .await?;
    }
    feed.record_expense(&NewExpense {
        tenant_id: TENANT_ID.to_string(),
        store_id: STORE_ID.to_string(),
        description: "Cleaning supplies".to_string(),
        category: "supplies".to_string(),
        amount: Money::from_cents(850),
        expense_date: Utc::now().date_naive(),
        payment_method: PaymentMethod::Cash,
        is_paid: true,
    })
    .await?;

    let details = shifts.details(&shift.id).await?;
    println!(
        "✓ Shift {} open, expected cash {}",
        details.shift.id,
        details.shift.expected_cash_end()
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
