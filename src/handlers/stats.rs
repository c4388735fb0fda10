//! Aggregation endpoints: stats and daily trend

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::{parse_datetime, parse_severity};
use crate::query::{LogFilter, SourceMatch};
use crate::server::AppState;
use crate::store;

/// How many sources the stats breakdown reports
const SOURCE_BREAKDOWN_LIMIT: i64 = 10;
/// Trend window applied when no date filter is supplied
const TREND_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub severity: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub group_by_severity: bool,
}

/// A count grouped by a categorical label
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LogAggregation {
    pub label: String,
    pub count: i64,
}

/// One day of the time series; `severity` is set when grouping by severity
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TrendPoint {
    pub date: String,
    pub count: i64,
    pub severity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogStatsResponse {
    pub total_logs: i64,
    pub severity_breakdown: Vec<LogAggregation>,
    pub source_breakdown: Vec<LogAggregation>,
    pub trend_data: Vec<TrendPoint>,
    pub date_range: DateRange,
}

/// Restrict to the last 30 days when the caller supplied no date bounds
fn with_default_window(mut filter: LogFilter) -> LogFilter {
    if !filter.has_date_filter() {
        filter.start_date = Some(Utc::now() - Duration::days(TREND_WINDOW_DAYS));
    }
    filter
}

/// GET /logs/stats - aggregated statistics over the filtered set
pub async fn get_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<LogStatsResponse>, AppError> {
    let filter = LogFilter {
        start_date: parse_datetime("start_date", params.start_date.as_deref())?,
        end_date: parse_datetime("end_date", params.end_date.as_deref())?,
        // Exact match here, unlike the list endpoint's contains match
        source: params.source.map(SourceMatch::Exact),
        ..Default::default()
    };
    let trend_filter = with_default_window(filter.clone());

    let mut tx = state.db.begin().await?;
    let total_logs = store::count_logs(&mut tx, &filter).await?;
    let severity_breakdown = store::severity_breakdown(&mut tx, &filter).await?;
    let source_breakdown =
        store::source_breakdown(&mut tx, &filter, SOURCE_BREAKDOWN_LIMIT).await?;
    let trend = store::daily_trend(&mut tx, &trend_filter).await?;
    tx.commit().await?;

    Ok(Json(LogStatsResponse {
        total_logs,
        severity_breakdown: severity_breakdown
            .into_iter()
            .map(|(label, count)| LogAggregation { label, count })
            .collect(),
        source_breakdown: source_breakdown
            .into_iter()
            .map(|(label, count)| LogAggregation { label, count })
            .collect(),
        trend_data: trend
            .into_iter()
            .map(|(date, count)| TrendPoint {
                date,
                count,
                severity: None,
            })
            .collect(),
        date_range: DateRange {
            start: filter.start_date.map(|d| d.to_rfc3339()),
            end: filter.end_date.map(|d| d.to_rfc3339()),
        },
    }))
}

/// GET /logs/trend - daily counts, optionally per severity for stacked charts
pub async fn get_trend(
    State(state): State<AppState>,
    Query(params): Query<TrendQuery>,
) -> Result<Json<Vec<TrendPoint>>, AppError> {
    let filter = with_default_window(LogFilter {
        start_date: parse_datetime("start_date", params.start_date.as_deref())?,
        end_date: parse_datetime("end_date", params.end_date.as_deref())?,
        severity: parse_severity(params.severity.as_deref())?,
        source: params.source.map(SourceMatch::Exact),
        search: None,
    });

    let mut tx = state.db.begin().await?;
    let points = if params.group_by_severity {
        store::daily_trend_by_severity(&mut tx, &filter)
            .await?
            .into_iter()
            .map(|(date, severity, count)| TrendPoint {
                date,
                count,
                severity: Some(severity),
            })
            .collect()
    } else {
        store::daily_trend(&mut tx, &filter)
            .await?
            .into_iter()
            .map(|(date, count)| TrendPoint {
                date,
                count,
                severity: None,
            })
            .collect()
    };
    tx.commit().await?;

    Ok(Json(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_applies_only_without_dates() {
        let filter = with_default_window(LogFilter::default());
        assert!(filter.start_date.is_some());

        let bounded = with_default_window(LogFilter {
            end_date: Some(Utc::now()),
            ..Default::default()
        });
        assert!(bounded.start_date.is_none());
    }

    #[test]
    fn test_trend_query_group_flag_defaults_false() {
        let params: TrendQuery = serde_json::from_str("{}").unwrap();
        assert!(!params.group_by_severity);
    }

    #[test]
    fn test_trend_point_serializes_null_severity() {
        let point = TrendPoint {
            date: "2024-03-01".to_string(),
            count: 3,
            severity: None,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert!(json.get("severity").unwrap().is_null());
    }
}
