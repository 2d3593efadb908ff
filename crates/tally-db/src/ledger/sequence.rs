//! # Document Sequence Generator
//!
//! Issues gapless document numbers per (tenant, series code).
//!
//! ## Peek vs Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  peek_next(tenant, "03", Some(store))                                   │
//! │     ├── store has a series?  yes ──► preview current + 1               │
//! │     └── no ──► provision B001 (default, counter 0) ──► preview 1       │
//! │                                                                         │
//! │  The preview is not a reservation. Another terminal may commit first.  │
//! │                                                                         │
//! │  commit_next(tenant, "B001")                                            │
//! │     BEGIN                                                               │
//! │     UPDATE ... current_number + 1 RETURNING   ◄── claim + increment    │
//! │     COMMIT ──► "B001-00000042"                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent commits on one series queue behind the first writer, so N
//! commits return exactly `old+1 ..= old+N` in commit order.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::repository::series::SeriesRepository;
use crate::tx;
use tally_core::sequence::{
    default_series_for, full_number, has_capacity, next_series_code, preview,
};
use tally_core::validation::{
    validate_document_type, validate_id, validate_name, validate_series_code,
};
use tally_core::{
    CoreError, DocumentSeries, NewSeries, NextDocumentNumber, SeriesUpdate, ValidationError,
    MAX_DOCUMENT_NUMBER,
};

const SERIES_CODE_TARGET: &str = "document_series.series_code";
const DEFAULT_SCOPE_TARGET: &str = "document_series.document_type";

/// Document number service.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    pool: SqlitePool,
}

impl SequenceGenerator {
    pub fn new(pool: SqlitePool) -> Self {
        SequenceGenerator { pool }
    }

    // =========================================================================
    // Numbering
    // =========================================================================

    /// Previews the next number without consuming it.
    ///
    /// ## Arguments
    /// * `document_type` - tax-authority code such as `"01"` or `"03"`
    /// * `store_id` - when given, the store's series is used and created on
    ///   first use; when absent, the tenant's default series is used
    ///
    /// ## Errors
    /// * `NotFound` - no store given and the tenant has no default series
    /// * `InvalidState` - the series has issued its last number
    pub async fn peek_next(
        &self,
        tenant_id: &str,
        document_type: &str,
        store_id: Option<&str>,
    ) -> LedgerResult<NextDocumentNumber> {
        validate_id("tenant_id", tenant_id)?;
        validate_document_type(document_type)?;

        let series = match store_id {
            Some(store_id) => {
                validate_id("store_id", store_id)?;
                self.series_for_store(tenant_id, store_id, document_type).await?
            }
            None => SeriesRepository::new(self.pool.clone())
                .tenant_default(tenant_id, document_type)
                .await?
                .ok_or_else(|| CoreError::not_found("DocumentSeries", document_type))?,
        };

        debug!(
            tenant_id = %tenant_id,
            series_code = %series.series_code,
            current_number = series.current_number,
            "Peeked next document number"
        );

        if !has_capacity(series.current_number) {
            return Err(
                CoreError::invalid_state("DocumentSeries", &series.series_code, "exhausted").into(),
            );
        }

        Ok(preview(&series))
    }

    /// Issues the next number of a series.
    ///
    /// ## Errors
    /// * `NotFound` - no active series with this code for the tenant
    /// * `InvalidState` - the series has issued its last number
    pub async fn commit_next(&self, tenant_id: &str, series_code: &str) -> LedgerResult<String> {
        validate_id("tenant_id", tenant_id)?;
        let series_code = validate_series_code(series_code)?;

        let mut tx = self.pool.begin().await?;
        let result = Self::commit_locked(&mut *tx, tenant_id, &series_code, Utc::now()).await;
        let issued = tx::finish(tx, result).await?;

        let number = full_number(&series_code, issued);
        info!(tenant_id = %tenant_id, series_code = %series_code, number = %number, "Document number issued");

        Ok(number)
    }

    async fn commit_locked(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        series_code: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<i64> {
        if let Some(issued) = SeriesRepository::increment(conn, tenant_id, series_code, now).await? {
            return Ok(issued);
        }

        // The UPDATE matched nothing but still holds the write lock, so this
        // read sees the committed state.
        match SeriesRepository::find_by_code(conn, tenant_id, series_code).await? {
            Some(series) if series.is_active => {
                warn!(series_code = %series_code, "Document series exhausted");
                Err(CoreError::invalid_state("DocumentSeries", series_code, "exhausted").into())
            }
            _ => Err(CoreError::not_found("DocumentSeries", series_code).into()),
        }
    }

    async fn series_for_store(
        &self,
        tenant_id: &str,
        store_id: &str,
        document_type: &str,
    ) -> LedgerResult<DocumentSeries> {
        let existing = SeriesRepository::new(self.pool.clone())
            .for_store(tenant_id, store_id, document_type)
            .await?;
        if let Some(series) = existing {
            return Ok(series);
        }

        let mut tx = self.pool.begin().await?;
        let result = Self::provision_locked(&mut *tx, tenant_id, store_id, document_type, Utc::now()).await;
        tx::finish(tx, result).await
    }

    /// Creates the store's default series for a document type.
    ///
    /// A code held by another store is skipped (`F001` → `F002`). If a
    /// concurrent call provisioned this store first, its row is returned.
    async fn provision_locked(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        store_id: &str,
        document_type: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<DocumentSeries> {
        let template = default_series_for(document_type);
        let mut series = DocumentSeries {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            store_id: store_id.to_string(),
            document_type: document_type.to_string(),
            document_type_name: template.document_type_name.to_string(),
            series_code: template.series_code.to_string(),
            current_number: 0,
            is_active: true,
            is_default: true,
            created_at: now,
            updated_at: now,
        };

        loop {
            match SeriesRepository::insert(conn, &series).await {
                Ok(()) => {
                    info!(
                        tenant_id = %tenant_id,
                        store_id = %store_id,
                        series_code = %series.series_code,
                        "Document series provisioned"
                    );
                    return Ok(series);
                }
                Err(err) if err.is_unique_on(SERIES_CODE_TARGET) || err.is_unique_on(DEFAULT_SCOPE_TARGET) => {
                    if let Some(existing) =
                        SeriesRepository::find_for_store(conn, tenant_id, store_id, document_type).await?
                    {
                        return Ok(existing);
                    }
                    if !err.is_unique_on(SERIES_CODE_TARGET) {
                        return Err(err.into());
                    }

                    series.series_code = next_series_code(&series.series_code).ok_or_else(|| {
                        CoreError::Conflict(format!(
                            "No free series code for document type {document_type}"
                        ))
                    })?;
                    debug!(candidate = %series.series_code, "Series code taken, trying next");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Creates a series explicitly.
    ///
    /// A new default demotes the current default of the same
    /// (tenant, store, document type) in the same transaction.
    pub async fn create_series(&self, new: NewSeries) -> LedgerResult<DocumentSeries> {
        validate_id("tenant_id", &new.tenant_id)?;
        validate_id("store_id", &new.store_id)?;
        validate_document_type(&new.document_type)?;
        let series_code = validate_series_code(&new.series_code)?;

        let initial_number = new.initial_number.unwrap_or(0);
        if !(0..=MAX_DOCUMENT_NUMBER).contains(&initial_number) {
            return Err(ValidationError::OutOfRange {
                field: "initial_number".to_string(),
                min: 0,
                max: MAX_DOCUMENT_NUMBER,
            }
            .into());
        }

        let document_type_name = match new.document_type_name.as_deref() {
            Some(name) => validate_name("document_type_name", name)?,
            None => default_series_for(&new.document_type).document_type_name.to_string(),
        };

        let now = Utc::now();
        let series = DocumentSeries {
            id: Uuid::new_v4().to_string(),
            tenant_id: new.tenant_id,
            store_id: new.store_id,
            document_type: new.document_type,
            document_type_name,
            series_code,
            current_number: initial_number,
            is_active: true,
            is_default: new.is_default,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;
        let result = Self::create_locked(&mut *tx, &series, now).await;
        tx::finish(tx, result).await?;

        info!(
            tenant_id = %series.tenant_id,
            store_id = %series.store_id,
            series_code = %series.series_code,
            is_default = series.is_default,
            "Document series created"
        );

        Ok(series)
    }

    async fn create_locked(
        conn: &mut SqliteConnection,
        series: &DocumentSeries,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if series.is_default {
            SeriesRepository::clear_default(
                conn,
                &series.tenant_id,
                &series.store_id,
                &series.document_type,
                None,
                now,
            )
            .await?;
        }

        SeriesRepository::insert(conn, series)
            .await
            .map_err(|err| series_conflict(err, &series.series_code))?;

        Ok(())
    }

    /// Activates, deactivates, or re-flags a series.
    ///
    /// Deactivating also drops the default flag. Deactivation is the only
    /// delete: the row and its counter stay.
    pub async fn update_series(&self, id: &str, update: SeriesUpdate) -> LedgerResult<DocumentSeries> {
        validate_id("id", id)?;

        let mut tx = self.pool.begin().await?;
        let result = Self::update_locked(&mut *tx, id, &update, Utc::now()).await;
        let series = tx::finish(tx, result).await?;

        info!(
            id = %id,
            series_code = %series.series_code,
            is_active = series.is_active,
            is_default = series.is_default,
            "Document series updated"
        );

        Ok(series)
    }

    async fn update_locked(
        conn: &mut SqliteConnection,
        id: &str,
        update: &SeriesUpdate,
        now: DateTime<Utc>,
    ) -> LedgerResult<DocumentSeries> {
        if !SeriesRepository::claim(conn, id).await? {
            return Err(CoreError::not_found("DocumentSeries", id).into());
        }
        let current = SeriesRepository::find(conn, id)
            .await?
            .ok_or_else(|| CoreError::not_found("DocumentSeries", id))?;

        let is_active = update.is_active.unwrap_or(current.is_active);
        let is_default = is_active && update.is_default.unwrap_or(current.is_default);

        if is_default {
            SeriesRepository::clear_default(
                conn,
                &current.tenant_id,
                &current.store_id,
                &current.document_type,
                Some(id),
                now,
            )
            .await?;
        }
        SeriesRepository::set_flags(conn, id, is_active, is_default, now).await?;

        SeriesRepository::find(conn, id)
            .await?
            .ok_or_else(|| CoreError::not_found("DocumentSeries", id).into())
    }

    /// Active series of a tenant, optionally for one document type.
    pub async fn list_series(
        &self,
        tenant_id: &str,
        document_type: Option<&str>,
    ) -> LedgerResult<Vec<DocumentSeries>> {
        validate_id("tenant_id", tenant_id)?;
        Ok(SeriesRepository::new(self.pool.clone())
            .list(tenant_id, document_type)
            .await?)
    }

    pub async fn get_series(&self, id: &str) -> LedgerResult<DocumentSeries> {
        SeriesRepository::new(self.pool.clone())
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("DocumentSeries", id).into())
    }
}

fn series_conflict(err: DbError, series_code: &str) -> LedgerError {
    if err.is_unique_on(SERIES_CODE_TARGET) {
        CoreError::Conflict(format!("Series code {series_code} already exists")).into()
    } else {
        err.into()
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

    async fn generator() -> (Database, SequenceGenerator) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let generator = db.sequence();
        (db, generator)
    }

    fn new_series(store: &str, code: &str, is_default: bool) -> NewSeries {
        NewSeries {
            tenant_id: "t-1".to_string(),
            store_id: store.to_string(),
            document_type: "03".to_string(),
            document_type_name: None,
            series_code: code.to_string(),
            initial_number: None,
            is_default,
        }
    }

    #[tokio::test]
    async fn test_peek_provisions_and_does_not_consume() {
        let (_db, seq) = generator().await;

        let first = seq.peek_next("t-1", "01", Some("s-1")).await.unwrap();
        assert_eq!(first.series_code, "F001");
        assert_eq!(first.formatted_number, "00000001");
        assert_eq!(first.full_number, "F001-00000001");

        let again = seq.peek_next("t-1", "01", Some("s-1")).await.unwrap();
        assert_eq!(again, first);

        let series = seq.list_series("t-1", Some("01")).await.unwrap();
        assert_eq!(series.len(), 1);
        assert!(series[0].is_default);
        assert_eq!(series[0].document_type_name, "Factura Electrónica");
    }

    #[tokio::test]
    async fn test_commit_increments_by_one() {
        let (_db, seq) = generator().await;
        seq.peek_next("t-1", "03", Some("s-1")).await.unwrap();

        assert_eq!(seq.commit_next("t-1", "B001").await.unwrap(), "B001-00000001");
        assert_eq!(seq.commit_next("t-1", "b001").await.unwrap(), "B001-00000002");

        let next = seq.peek_next("t-1", "03", Some("s-1")).await.unwrap();
        assert_eq!(next.full_number, "B001-00000003");
    }

    #[tokio::test]
    async fn test_commit_unknown_series() {
        let (_db, seq) = generator().await;

        let err = seq.commit_next("t-1", "ZZ01").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        // Series codes are scoped to their tenant
        seq.peek_next("t-1", "03", Some("s-1")).await.unwrap();
        let err = seq.commit_next("t-2", "B001").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_peek_without_store() {
        let (_db, seq) = generator().await;

        let err = seq.peek_next("t-1", "80", None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        seq.peek_next("t-1", "80", Some("s-1")).await.unwrap();
        let next = seq.peek_next("t-1", "80", None).await.unwrap();
        assert_eq!(next.full_number, "NV01-00000001");
    }

    #[tokio::test]
    async fn test_second_store_gets_next_code() {
        let (_db, seq) = generator().await;

        let s1 = seq.peek_next("t-1", "03", Some("s-1")).await.unwrap();
        let s2 = seq.peek_next("t-1", "03", Some("s-2")).await.unwrap();

        assert_eq!(s1.series_code, "B001");
        assert_eq!(s2.series_code, "B002");

        // Another tenant starts from the table value again
        let other = seq.peek_next("t-2", "03", Some("s-1")).await.unwrap();
        assert_eq!(other.series_code, "B001");
    }

    #[tokio::test]
    async fn test_create_series_conflict() {
        let (_db, seq) = generator().await;

        seq.create_series(new_series("s-1", "B010", false)).await.unwrap();
        let err = seq
            .create_series(new_series("s-2", "b010", false))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn test_new_default_demotes_old() {
        let (_db, seq) = generator().await;

        let old = seq.create_series(new_series("s-1", "B001", true)).await.unwrap();
        let new = seq.create_series(new_series("s-1", "B002", true)).await.unwrap();

        assert!(!seq.get_series(&old.id).await.unwrap().is_default);
        assert!(seq.get_series(&new.id).await.unwrap().is_default);

        let next = seq.peek_next("t-1", "03", Some("s-1")).await.unwrap();
        assert_eq!(next.series_code, "B002");
    }

    #[tokio::test]
    async fn test_deactivated_series_cannot_issue() {
        let (_db, seq) = generator().await;

        let series = seq.create_series(new_series("s-1", "B001", true)).await.unwrap();
        seq.commit_next("t-1", "B001").await.unwrap();

        let updated = seq
            .update_series(
                &series.id,
                SeriesUpdate {
                    is_active: Some(false),
                    ..SeriesUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert!(!updated.is_default);
        assert_eq!(updated.current_number, 1);

        let err = seq.commit_next("t-1", "B001").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_exhausted_series() {
        let (_db, seq) = generator().await;

        let mut new = new_series("s-1", "B001", true);
        new.initial_number = Some(MAX_DOCUMENT_NUMBER - 1);
        let series = seq.create_series(new).await.unwrap();

        assert_eq!(seq.commit_next("t-1", "B001").await.unwrap(), "B001-99999999");

        let err = seq.commit_next("t-1", "B001").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);

        let after = seq.get_series(&series.id).await.unwrap();
        assert_eq!(after.current_number, MAX_DOCUMENT_NUMBER);

        // The preview refuses too instead of showing a ninth digit
        let err = seq.peek_next("t-1", "03", Some("s-1")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidState);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (_db, seq) = generator().await;

        let err = seq.commit_next("t-1", "B-01").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let mut new = new_series("s-1", "B001", false);
        new.initial_number = Some(-1);
        let err = seq.create_series(new).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
