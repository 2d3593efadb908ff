//! # tally-db: Storage and Ledger Services for Tally POS
//!
//! SQLite persistence for the ledger core, and the three services that own
//! every write to it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Ledger Flow                            │
//! │                                                                         │
//! │  Terminal request (finish sale, collect payment, close drawer)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────────┐  ┌────────────────┐  ┌────────────────┐  │   │
//! │  │   │ SequenceGenerator│  │  CreditLedger  │  │CashShiftLedger │  │   │
//! │  │   └────────┬────────┘  └───────┬────────┘  └───────┬────────┘  │   │
//! │  │            │   claim → mutate → commit (tx.rs)     │           │   │
//! │  │   ┌────────▼───────────────────▼───────────────────▼────────┐  │   │
//! │  │   │  Repositories: series, customer, credit, cash_shift,    │  │   │
//! │  │   │  feed (sales / expenses read by ShiftTotalsSource)      │  │   │
//! │  │   └─────────────────────────────┬───────────────────────────┘  │   │
//! │  │                                 │                              │   │
//! │  │   Database (pool.rs)   Migrations (embedded)   LedgerConfig   │   │
//! │  └─────────────────────────────────┼──────────────────────────────┘   │
//! │                                    ▼                                  │
//! │                         SQLite (WAL, busy timeout)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - TOML / environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage error types
//! - [`repository`] - SQL per aggregate
//! - [`ledger`] - Sequence, credit, and cash shift services
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, LedgerConfig};
//!
//! let config = LedgerConfig::load(Some(Path::new("ledger.toml")))?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let preview = db.sequence().peek_next("tenant-1", "03", Some("store-1")).await?;
//! let number = db.sequence().commit_next("tenant-1", &preview.series_code).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

pub(crate) mod tx;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use ledger::cash_shift::CashShiftLedger;
pub use ledger::credit::CreditLedger;
pub use ledger::error::{ErrorCode, ErrorResponse, LedgerError, LedgerResult};
pub use ledger::sequence::SequenceGenerator;
pub use ledger::totals::{ShiftTotalsSource, ShiftWindow, SqliteShiftTotals};

// Repository re-exports for convenience
pub use repository::cash_shift::CashShiftRepository;
pub use repository::credit::CreditRepository;
pub use repository::customer::CustomerRepository;
pub use repository::feed::FeedRepository;
pub use repository::series::SeriesRepository;
