//! All SQL for the logs table
//!
//! Functions take `&mut SqliteConnection` so they compose inside the
//! per-request transaction owned by the handler.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::{LogEntry, Severity};
use crate::query::{LogFilter, SortOrder};

const ENTRY_COLUMNS: &str =
    "id, timestamp, message, severity, source, metadata_json, created_at, updated_at";

/// Fields for a new entry; `timestamp` is already defaulted by the caller
#[derive(Debug, Clone)]
pub struct NewLog {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    pub source: String,
    pub metadata_json: Option<String>,
}

/// Partial update; `None` means leave the column untouched
///
/// `metadata_json` is doubly optional: `Some(None)` clears the column,
/// outer `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct LogChanges {
    pub timestamp: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub severity: Option<Severity>,
    pub source: Option<String>,
    pub metadata_json: Option<Option<String>>,
}

pub async fn insert_log(
    conn: &mut SqliteConnection,
    new: NewLog,
) -> Result<LogEntry, sqlx::Error> {
    // Timestamps are stored as RFC 3339 text; filters bind the same encoding
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO logs (timestamp, message, severity, source, metadata_json, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(new.timestamp.to_rfc3339())
    .bind(&new.message)
    .bind(new.severity.as_str())
    .bind(&new.source)
    .bind(&new.metadata_json)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    let id = result.last_insert_rowid();
    fetch_log(conn, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn fetch_log(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<LogEntry>, sqlx::Error> {
    let sql = format!("SELECT {} FROM logs WHERE id = ?", ENTRY_COLUMNS);
    sqlx::query_as::<_, LogEntry>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Apply a partial update; returns `None` when the id does not exist
pub async fn update_log(
    conn: &mut SqliteConnection,
    id: i64,
    changes: &LogChanges,
) -> Result<Option<LogEntry>, sqlx::Error> {
    // Build the SET list only from supplied fields
    let mut sets = vec!["updated_at = ?"];
    if changes.timestamp.is_some() {
        sets.push("timestamp = ?");
    }
    if changes.message.is_some() {
        sets.push("message = ?");
    }
    if changes.severity.is_some() {
        sets.push("severity = ?");
    }
    if changes.source.is_some() {
        sets.push("source = ?");
    }
    if changes.metadata_json.is_some() {
        sets.push("metadata_json = ?");
    }

    let sql = format!("UPDATE logs SET {} WHERE id = ?", sets.join(", "));

    let mut q = sqlx::query(&sql).bind(Utc::now().to_rfc3339());
    if let Some(timestamp) = changes.timestamp {
        q = q.bind(timestamp.to_rfc3339());
    }
    if let Some(message) = &changes.message {
        q = q.bind(message);
    }
    if let Some(severity) = changes.severity {
        q = q.bind(severity.as_str());
    }
    if let Some(source) = &changes.source {
        q = q.bind(source);
    }
    if let Some(metadata) = &changes.metadata_json {
        q = q.bind(metadata.as_deref());
    }

    let result = q.bind(id).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }

    fetch_log(conn, id).await
}

/// Hard delete; returns whether a row was removed
pub async fn delete_log(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM logs WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_logs(
    conn: &mut SqliteConnection,
    filter: &LogFilter,
) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM logs{}", filter.where_clause());
    let mut query = sqlx::query_as::<_, (i64,)>(&sql);
    for value in filter.bind_values() {
        query = query.bind(value);
    }
    let (count,) = query.fetch_one(&mut *conn).await?;
    Ok(count)
}

pub async fn list_page(
    conn: &mut SqliteConnection,
    filter: &LogFilter,
    sort_column: &str,
    order: SortOrder,
    limit: i64,
    offset: i64,
) -> Result<Vec<LogEntry>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM logs{} ORDER BY {} {} LIMIT ? OFFSET ?",
        ENTRY_COLUMNS,
        filter.where_clause(),
        sort_column,
        order.sql(),
    );
    let mut query = sqlx::query_as::<_, LogEntry>(&sql);
    for value in filter.bind_values() {
        query = query.bind(value);
    }
    query
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await
}

/// Distinct source values, alphabetically ordered
pub async fn distinct_sources(conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String,)>(
        "SELECT DISTINCT source FROM logs ORDER BY source ASC",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|(source,)| source).collect())
}

/// Count per severity, descending by count
pub async fn severity_breakdown(
    conn: &mut SqliteConnection,
    filter: &LogFilter,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let sql = format!(
        "SELECT severity, COUNT(*) AS count FROM logs{} GROUP BY severity ORDER BY count DESC",
        filter.where_clause(),
    );
    let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
    for value in filter.bind_values() {
        query = query.bind(value);
    }
    query.fetch_all(&mut *conn).await
}

/// Count per source, descending by count, truncated to `limit`
pub async fn source_breakdown(
    conn: &mut SqliteConnection,
    filter: &LogFilter,
    limit: i64,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let sql = format!(
        "SELECT source, COUNT(*) AS count FROM logs{} GROUP BY source ORDER BY count DESC LIMIT ?",
        filter.where_clause(),
    );
    let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
    for value in filter.bind_values() {
        query = query.bind(value);
    }
    query.bind(limit).fetch_all(&mut *conn).await
}

/// Count per calendar day, ascending by date
pub async fn daily_trend(
    conn: &mut SqliteConnection,
    filter: &LogFilter,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    let sql = format!(
        "SELECT DATE(timestamp) AS date, COUNT(*) AS count FROM logs{} \
         GROUP BY DATE(timestamp) ORDER BY date ASC",
        filter.where_clause(),
    );
    let mut query = sqlx::query_as::<_, (String, i64)>(&sql);
    for value in filter.bind_values() {
        query = query.bind(value);
    }
    query.fetch_all(&mut *conn).await
}

/// Count per (calendar day, severity), ascending by date
///
/// Sparse: a (day, severity) pair with no entries yields no row.
pub async fn daily_trend_by_severity(
    conn: &mut SqliteConnection,
    filter: &LogFilter,
) -> Result<Vec<(String, String, i64)>, sqlx::Error> {
    let sql = format!(
        "SELECT DATE(timestamp) AS date, severity, COUNT(*) AS count FROM logs{} \
         GROUP BY DATE(timestamp), severity ORDER BY date ASC",
        filter.where_clause(),
    );
    let mut query = sqlx::query_as::<_, (String, String, i64)>(&sql);
    for value in filter.bind_values() {
        query = query.bind(value);
    }
    query.fetch_all(&mut *conn).await
}

/// Full filtered set for CSV export, newest first
pub async fn export_rows(
    conn: &mut SqliteConnection,
    filter: &LogFilter,
) -> Result<Vec<LogEntry>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM logs{} ORDER BY timestamp DESC",
        ENTRY_COLUMNS,
        filter.where_clause(),
    );
    let mut query = sqlx::query_as::<_, LogEntry>(&sql);
    for value in filter.bind_values() {
        query = query.bind(value);
    }
    query.fetch_all(&mut *conn).await
}
