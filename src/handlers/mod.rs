pub mod export;
pub mod health;
pub mod logs;
pub mod stats;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::AppError;
use crate::models::Severity;

/// Parse an optional datetime query parameter
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (assumed UTC), and a bare
/// `YYYY-MM-DD` (midnight UTC).
pub(crate) fn parse_datetime(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = value else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(Utc.from_utc_datetime(&naive)));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))));
    }

    Err(AppError::validation(
        field,
        format!("invalid datetime '{}', expected ISO-8601", raw),
    ))
}

/// Parse an optional severity query parameter against the five literal values
pub(crate) fn parse_severity(value: Option<&str>) -> Result<Option<Severity>, AppError> {
    match value {
        None => Ok(None),
        Some(raw) => Severity::parse(raw).map(Some).ok_or_else(|| {
            AppError::validation(
                "severity",
                format!("'{}' is not one of DEBUG|INFO|WARNING|ERROR|CRITICAL", raw),
            )
        }),
    }
}
