//! CSV export of the filtered log set

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use chrono::Utc;
use serde::Deserialize;
use std::borrow::Cow;

use crate::error::AppError;
use crate::handlers::{parse_datetime, parse_severity};
use crate::query::{LogFilter, SourceMatch};
use crate::server::AppState;
use crate::store;

const CSV_HEADER: &str = "ID,Timestamp,Severity,Source,Message";

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub severity: Option<String>,
    pub source: Option<String>,
}

/// GET /logs/export - download the filtered set as a CSV attachment
///
/// The full result set is materialized before the response is written.
pub async fn export_csv(
    State(state): State<AppState>,
    Query(params): Query<ExportQuery>,
) -> Result<(HeaderMap, String), AppError> {
    let filter = LogFilter {
        start_date: parse_datetime("start_date", params.start_date.as_deref())?,
        end_date: parse_datetime("end_date", params.end_date.as_deref())?,
        severity: parse_severity(params.severity.as_deref())?,
        source: params.source.map(SourceMatch::Exact),
        search: None,
    };

    let mut tx = state.db.begin().await?;
    let rows = store::export_rows(&mut tx, &filter).await?;
    tx.commit().await?;

    let mut body = String::with_capacity(64 * (rows.len() + 1));
    body.push_str(CSV_HEADER);
    body.push_str("\r\n");
    for entry in &rows {
        body.push_str(&entry.id.to_string());
        body.push(',');
        body.push_str(&entry.timestamp.to_rfc3339());
        body.push(',');
        body.push_str(entry.severity.as_str());
        body.push(',');
        body.push_str(&csv_field(&entry.source));
        body.push(',');
        body.push_str(&csv_field(&entry.message));
        body.push_str("\r\n");
    }

    let filename = format!("logs_export_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::try_from(format!("attachment; filename={}", filename))
            .map_err(|e| AppError::Internal(format!("Invalid export filename: {}", e)))?,
    );

    Ok((headers, body))
}

/// Quote a CSV field per RFC 4180 when it contains delimiters
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
