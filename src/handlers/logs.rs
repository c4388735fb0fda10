//! CRUD and list endpoints for log entries

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::{parse_datetime, parse_severity};
use crate::models::{LogEntry, Severity};
use crate::query::{sort_column, LogFilter, SortOrder, SourceMatch};
use crate::server::AppState;
use crate::store::{self, LogChanges, NewLog};

const MAX_MESSAGE_CHARS: usize = 10_000;
const MAX_SOURCE_CHARS: usize = 255;

#[derive(Debug, Deserialize)]
pub struct CreateLogRequest {
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    pub source: String,
    pub metadata_json: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl CreateLogRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_message(&self.message)?;
        validate_source(&self.source)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLogRequest {
    pub timestamp: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub severity: Option<Severity>,
    pub source: Option<String>,
    /// Absent leaves the column untouched; an explicit null clears it
    #[serde(default, deserialize_with = "double_option")]
    pub metadata_json: Option<Option<String>>,
}

impl UpdateLogRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(message) = &self.message {
            validate_message(message)?;
        }
        if let Some(source) = &self.source {
            validate_source(source)?;
        }
        Ok(())
    }
}

/// Keeps "field present with null" distinct from "field absent"
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn validate_message(message: &str) -> Result<(), AppError> {
    let chars = message.chars().count();
    if chars == 0 {
        return Err(AppError::validation("message", "must not be empty"));
    }
    if chars > MAX_MESSAGE_CHARS {
        return Err(AppError::validation(
            "message",
            format!("must be at most {} characters", MAX_MESSAGE_CHARS),
        ));
    }
    Ok(())
}

fn validate_source(source: &str) -> Result<(), AppError> {
    let chars = source.chars().count();
    if chars == 0 {
        return Err(AppError::validation("source", "must not be empty"));
    }
    if chars > MAX_SOURCE_CHARS {
        return Err(AppError::validation(
            "source",
            format!("must be at most {} characters", MAX_SOURCE_CHARS),
        ));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLogsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub severity: Option<String>,
    pub source: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub items: Vec<LogEntry>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// POST /logs - create a log entry
pub async fn create_log(
    State(state): State<AppState>,
    Json(req): Json<CreateLogRequest>,
) -> Result<(StatusCode, Json<LogEntry>), AppError> {
    req.validate()?;

    let mut tx = state.db.begin().await?;
    let entry = store::insert_log(
        &mut tx,
        NewLog {
            timestamp: req.timestamp.unwrap_or_else(Utc::now),
            message: req.message,
            severity: req.severity,
            source: req.source,
            metadata_json: req.metadata_json,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /logs - list with filtering, sorting, and pagination
pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<ListLogsQuery>,
) -> Result<Json<LogListResponse>, AppError> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::validation("page", "must be >= 1"));
    }
    let page_size = params
        .page_size
        .unwrap_or(state.config.pagination.default_page_size)
        .clamp(1, state.config.pagination.max_page_size);

    let filter = LogFilter {
        start_date: parse_datetime("start_date", params.start_date.as_deref())?,
        end_date: parse_datetime("end_date", params.end_date.as_deref())?,
        severity: parse_severity(params.severity.as_deref())?,
        source: params.source.map(SourceMatch::Substring),
        search: params.search,
    };
    let column = sort_column(params.sort_by.as_deref().unwrap_or("timestamp"));
    let order = SortOrder::parse(params.sort_order.as_deref());

    let mut tx = state.db.begin().await?;
    // Count and page share the transaction and the predicate, so the
    // pagination metadata always matches the returned items
    let total = store::count_logs(&mut tx, &filter).await?;
    let items = store::list_page(&mut tx, &filter, column, order, page_size, (page - 1) * page_size)
        .await?;
    tx.commit().await?;

    let total_pages = (total + page_size - 1) / page_size;

    Ok(Json(LogListResponse {
        items,
        total,
        page,
        page_size,
        total_pages,
    }))
}

/// GET /logs/sources - distinct source values
pub async fn list_sources(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    let mut tx = state.db.begin().await?;
    let sources = store::distinct_sources(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(sources))
}

/// GET /logs/:id
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LogEntry>, AppError> {
    let mut tx = state.db.begin().await?;
    let entry = store::fetch_log(&mut tx, id).await?;
    tx.commit().await?;

    entry
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Log with id {} not found", id)))
}

/// PUT /logs/:id - partial update, only supplied fields are applied
pub async fn update_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLogRequest>,
) -> Result<Json<LogEntry>, AppError> {
    req.validate()?;

    let changes = LogChanges {
        timestamp: req.timestamp,
        message: req.message,
        severity: req.severity,
        source: req.source,
        metadata_json: req.metadata_json,
    };

    let mut tx = state.db.begin().await?;
    match store::update_log(&mut tx, id, &changes).await? {
        Some(entry) => {
            tx.commit().await?;
            Ok(Json(entry))
        }
        // Transaction rolls back on drop
        None => Err(AppError::not_found(format!("Log with id {} not found", id))),
    }
}

/// DELETE /logs/:id - hard delete
pub async fn delete_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db.begin().await?;
    let removed = store::delete_log(&mut tx, id).await?;
    tx.commit().await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("Log with id {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_absent_from_null() {
        let absent: UpdateLogRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.metadata_json, None);

        let cleared: UpdateLogRequest =
            serde_json::from_str(r#"{"metadata_json": null}"#).unwrap();
        assert_eq!(cleared.metadata_json, Some(None));

        let set: UpdateLogRequest =
            serde_json::from_str(r#"{"metadata_json": "{\"a\":1}"}"#).unwrap();
        assert_eq!(set.metadata_json, Some(Some("{\"a\":1}".to_string())));
    }

    #[test]
    fn test_create_request_defaults_severity_to_info() {
        let req: CreateLogRequest =
            serde_json::from_str(r#"{"message": "boot", "source": "svc-a"}"#).unwrap();
        assert_eq!(req.severity, Severity::Info);
        assert!(req.timestamp.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validation_bounds() {
        assert!(validate_message("").is_err());
        assert!(validate_message(&"x".repeat(10_000)).is_ok());
        assert!(validate_message(&"x".repeat(10_001)).is_err());

        assert!(validate_source("").is_err());
        assert!(validate_source(&"s".repeat(255)).is_ok());
        assert!(validate_source(&"s".repeat(256)).is_err());
    }

    #[test]
    fn test_create_request_rejects_unknown_severity() {
        let result: Result<CreateLogRequest, _> = serde_json::from_str(
            r#"{"message": "boot", "severity": "FATAL", "source": "svc-a"}"#,
        );
        assert!(result.is_err());
    }
}
