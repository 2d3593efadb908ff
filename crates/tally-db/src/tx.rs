//! # Transaction Discipline
//!
//! Every ledger mutation follows the same shape:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  BEGIN (deferred)                                                      │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  CLAIM   first statement is a write on the row to be mutated           │
//! │    │     e.g. UPDATE credits SET updated_at = updated_at WHERE id = ?  │
//! │    │     SQLite grants the write lock here; a concurrent writer waits   │
//! │    │     in the busy handler until we COMMIT or ROLLBACK                │
//! │    ▼                                                                    │
//! │  RE-READ the row under the claim (never trust an earlier read)         │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  VALIDATE → MUTATE                                                      │
//! │    │                                                                    │
//! │    ├── Ok  ──► COMMIT                                                   │
//! │    └── Err ──► ROLLBACK, return the error unchanged                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A claim that matches zero rows still takes the lock, so "row missing" is
//! decided under the same serialization as "row changed".
//!
//! Reading first and writing later would pin a WAL snapshot; the later write
//! then fails with `SQLITE_BUSY_SNAPSHOT` without waiting. Claiming first is
//! what turns contention into queuing.
//!
//! A dropped transaction (e.g. the caller's future was cancelled) rolls back
//! when its connection returns to the pool.

use sqlx::{Sqlite, Transaction};
use tracing::warn;

use crate::error::DbError;

/// Commits on `Ok`, rolls back on `Err`.
///
/// The operation's own error wins over a rollback failure; the latter is
/// only logged.
pub(crate) async fn finish<T, E>(tx: Transaction<'_, Sqlite>, result: Result<T, E>) -> Result<T, E>
where
    E: From<DbError>,
{
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| E::from(DbError::from(e)))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
