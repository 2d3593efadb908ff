//! # Document Series Repository
//!
//! Series rows and their counters.
//!
//! ## Counter Update
//! ```text
//! UPDATE document_series
//!    SET current_number = current_number + 1
//!  WHERE tenant_id = ? AND series_code = ? AND is_active = 1
//!    AND current_number < 99999999
//! RETURNING current_number
//! ```
//! One statement claims the row, increments, and reports the issued value.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{DocumentSeries, MAX_DOCUMENT_NUMBER};

/// Repository for document series.
#[derive(Debug, Clone)]
pub struct SeriesRepository {
    pool: SqlitePool,
}

impl SeriesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SeriesRepository { pool }
    }

    /// Gets a series by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<DocumentSeries>> {
        let series = sqlx::query_as::<_, DocumentSeries>(
            "SELECT * FROM document_series WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(series)
    }

    /// Active series of a tenant, optionally for one document type.
    pub async fn list(
        &self,
        tenant_id: &str,
        document_type: Option<&str>,
    ) -> DbResult<Vec<DocumentSeries>> {
        let series = sqlx::query_as::<_, DocumentSeries>(
            r#"
            SELECT * FROM document_series
            WHERE tenant_id = ?1
              AND is_active = 1
              AND (?2 IS NULL OR document_type = ?2)
            ORDER BY document_type, series_code
            "#,
        )
        .bind(tenant_id)
        .bind(document_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(series)
    }

    /// Series a store would number with: default first, then oldest.
    pub async fn for_store(
        &self,
        tenant_id: &str,
        store_id: &str,
        document_type: &str,
    ) -> DbResult<Option<DocumentSeries>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_for_store(&mut conn, tenant_id, store_id, document_type).await
    }

    /// Oldest active default of the tenant for a document type.
    pub async fn tenant_default(
        &self,
        tenant_id: &str,
        document_type: &str,
    ) -> DbResult<Option<DocumentSeries>> {
        let series = sqlx::query_as::<_, DocumentSeries>(
            r#"
            SELECT * FROM document_series
            WHERE tenant_id = ?1
              AND document_type = ?2
              AND is_active = 1
              AND is_default = 1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(document_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(series)
    }

    // =========================================================================
    // Transactional Operations
    // =========================================================================

    pub(crate) async fn find_for_store(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        store_id: &str,
        document_type: &str,
    ) -> DbResult<Option<DocumentSeries>> {
        let series = sqlx::query_as::<_, DocumentSeries>(
            r#"
            SELECT * FROM document_series
            WHERE tenant_id = ?1
              AND store_id = ?2
              AND document_type = ?3
              AND is_active = 1
            ORDER BY is_default DESC, created_at ASC
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(document_type)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(series)
    }

    /// Looks up a code regardless of active state.
    pub(crate) async fn find_by_code(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        series_code: &str,
    ) -> DbResult<Option<DocumentSeries>> {
        let series = sqlx::query_as::<_, DocumentSeries>(
            "SELECT * FROM document_series WHERE tenant_id = ?1 AND series_code = ?2",
        )
        .bind(tenant_id)
        .bind(series_code)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(series)
    }

    pub(crate) async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<DocumentSeries>> {
        let series = sqlx::query_as::<_, DocumentSeries>(
            "SELECT * FROM document_series WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(series)
    }

    pub(crate) async fn insert(conn: &mut SqliteConnection, series: &DocumentSeries) -> DbResult<()> {
        debug!(
            tenant_id = %series.tenant_id,
            store_id = %series.store_id,
            series_code = %series.series_code,
            "Inserting document series"
        );

        sqlx::query(
            r#"
            INSERT INTO document_series (
                id, tenant_id, store_id, document_type, document_type_name,
                series_code, current_number, is_active, is_default,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&series.id)
        .bind(&series.tenant_id)
        .bind(&series.store_id)
        .bind(&series.document_type)
        .bind(&series.document_type_name)
        .bind(&series.series_code)
        .bind(series.current_number)
        .bind(series.is_active)
        .bind(series.is_default)
        .bind(series.created_at)
        .bind(series.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Claims the active row and advances its counter by one.
    ///
    /// ## Returns
    /// * `Some(n)` - the number just issued
    /// * `None` - no active row with this code, or the series is full
    pub(crate) async fn increment(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        series_code: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        let issued: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE document_series
            SET current_number = current_number + 1,
                updated_at = ?3
            WHERE tenant_id = ?1
              AND series_code = ?2
              AND is_active = 1
              AND current_number < ?4
            RETURNING current_number
            "#,
        )
        .bind(tenant_id)
        .bind(series_code)
        .bind(now)
        .bind(MAX_DOCUMENT_NUMBER)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(issued)
    }

    /// Claims a series row by ID. `false` if it does not exist.
    pub(crate) async fn claim(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE document_series SET updated_at = updated_at WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes the default flag from every series in a scope, except `keep_id`.
    pub(crate) async fn clear_default(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        store_id: &str,
        document_type: &str,
        keep_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE document_series
            SET is_default = 0, updated_at = ?5
            WHERE tenant_id = ?1
              AND store_id = ?2
              AND document_type = ?3
              AND is_default = 1
              AND (?4 IS NULL OR id <> ?4)
            "#,
        )
        .bind(tenant_id)
        .bind(store_id)
        .bind(document_type)
        .bind(keep_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    pub(crate) async fn set_flags(
        conn: &mut SqliteConnection,
        id: &str,
        is_active: bool,
        is_default: bool,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE document_series SET is_active = ?2, is_default = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(is_active)
        .bind(is_default)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
