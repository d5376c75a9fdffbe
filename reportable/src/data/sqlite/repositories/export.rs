//! Export record repository for SQLite operations
//!
//! Status changes are guarded updates: the `WHERE` clause only matches rows
//! in a legal predecessor status, so a refused transition affects no rows
//! and returns `false`.

use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::data::sqlite::SqliteError;
use crate::export::{ExportRecord, ExportStatus, NewExport};

const EXPORT_COLUMNS: &str = "id, report_kind, descriptor, query_sql, query_bindings, status, \
     rows_processed, total_rows, started_at, completed_at, failed_at, error_message, \
     retried_from_id, disk, path, queue, connection, job_id, created_at, updated_at";

fn map_row(row: &SqliteRow) -> Result<ExportRecord, SqliteError> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<ExportStatus>().map_err(|e| SqliteError::Corrupt {
        column: "status",
        reason: e.to_string(),
    })?;
    let bindings: String = row.try_get("query_bindings")?;
    let query_bindings =
        serde_json::from_str::<Vec<Value>>(&bindings).map_err(|e| SqliteError::Corrupt {
            column: "query_bindings",
            reason: e.to_string(),
        })?;

    Ok(ExportRecord {
        id: row.try_get("id")?,
        report_kind: row.try_get("report_kind")?,
        descriptor_json: row.try_get("descriptor")?,
        query_sql: row.try_get("query_sql")?,
        query_bindings,
        status,
        rows_processed: row.try_get("rows_processed")?,
        total_rows: row.try_get("total_rows")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        failed_at: row.try_get("failed_at")?,
        error_message: row.try_get("error_message")?,
        retried_from_id: row.try_get("retried_from_id")?,
        disk: row.try_get("disk")?,
        path: row.try_get("path")?,
        queue: row.try_get("queue")?,
        connection: row.try_get("connection")?,
        job_id: row.try_get("job_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// `status IN (...)` over the legal predecessors of `next`
fn status_guard(next: ExportStatus) -> String {
    let allowed: Vec<String> = next
        .predecessors()
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect();
    if allowed.is_empty() {
        return "0".to_string();
    }
    format!("status IN ({})", allowed.join(", "))
}

/// Insert a new Pending record
pub async fn create_export(
    pool: &SqlitePool,
    new: &NewExport,
) -> Result<ExportRecord, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let descriptor = serde_json::to_string(&new.descriptor).map_err(|e| SqliteError::Corrupt {
        column: "descriptor",
        reason: e.to_string(),
    })?;
    let bindings =
        serde_json::to_string(&new.query_bindings).map_err(|e| SqliteError::Corrupt {
            column: "query_bindings",
            reason: e.to_string(),
        })?;

    let sql = format!(
        r#"
        INSERT INTO report_exports (
            report_kind, descriptor, query_sql, query_bindings, status, rows_processed,
            retried_from_id, disk, path, queue, connection, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, 'pending', 0, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        EXPORT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(&new.descriptor.kind)
        .bind(&descriptor)
        .bind(&new.query_sql)
        .bind(&bindings)
        .bind(new.retried_from_id)
        .bind(&new.descriptor.disk)
        .bind(new.descriptor.output_path())
        .bind(&new.queue)
        .bind(new.connection.as_deref())
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

    map_row(&row)
}

pub async fn get_export(pool: &SqlitePool, id: i64) -> Result<Option<ExportRecord>, SqliteError> {
    let sql = format!("SELECT {} FROM report_exports WHERE id = ?", EXPORT_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(map_row).transpose()
}

/// Pending -> Dispatched, recording the queue job id
pub async fn mark_dispatched(
    pool: &SqlitePool,
    id: i64,
    job_id: &str,
) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let sql = format!(
        "UPDATE report_exports SET status = 'dispatched', job_id = ?, updated_at = ? WHERE id = ? AND {}",
        status_guard(ExportStatus::Dispatched)
    );
    let result = sqlx::query(&sql)
        .bind(job_id)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Dispatched -> Processing, stamping `started_at`
pub async fn mark_processing(pool: &SqlitePool, id: i64) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let sql = format!(
        "UPDATE report_exports SET status = 'processing', started_at = ?, updated_at = ? WHERE id = ? AND {}",
        status_guard(ExportStatus::Processing)
    );
    let result = sqlx::query(&sql)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Processing -> Completed, stamping `completed_at`
pub async fn mark_completed(pool: &SqlitePool, id: i64) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let sql = format!(
        "UPDATE report_exports SET status = 'completed', completed_at = ?, updated_at = ? WHERE id = ? AND {}",
        status_guard(ExportStatus::Completed)
    );
    let result = sqlx::query(&sql)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Any unfinished status -> Failed, stamping `failed_at` and the message
pub async fn mark_failed(
    pool: &SqlitePool,
    id: i64,
    message: &str,
) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let sql = format!(
        "UPDATE report_exports SET status = 'failed', failed_at = ?, error_message = ?, updated_at = ? WHERE id = ? AND {}",
        status_guard(ExportStatus::Failed)
    );
    let result = sqlx::query(&sql)
        .bind(now)
        .bind(message)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Persist progress; a `None` total keeps the stored one
pub async fn update_progress(
    pool: &SqlitePool,
    id: i64,
    rows_processed: i64,
    total_rows: Option<i64>,
) -> Result<bool, SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query(
        r#"
        UPDATE report_exports
        SET rows_processed = ?, total_rows = COALESCE(?, total_rows), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(rows_processed)
    .bind(total_rows)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Records created as retries of `parent_id`, oldest first
pub async fn list_retries(
    pool: &SqlitePool,
    parent_id: i64,
) -> Result<Vec<ExportRecord>, SqliteError> {
    let sql = format!(
        "SELECT {} FROM report_exports WHERE retried_from_id = ? ORDER BY id",
        EXPORT_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(parent_id).fetch_all(pool).await?;
    rows.iter().map(map_row).collect()
}

pub async fn list_by_status(
    pool: &SqlitePool,
    status: ExportStatus,
) -> Result<Vec<ExportRecord>, SqliteError> {
    let sql = format!(
        "SELECT {} FROM report_exports WHERE status = ? ORDER BY id",
        EXPORT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_row).collect()
}
