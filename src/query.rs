//! Filter predicate construction shared by list, stats, trend, and export
//!
//! A `LogFilter` renders a conjunctive WHERE clause and binds its values in
//! the same order, so every operation that uses it filters identically.

use chrono::{DateTime, Utc};

use crate::models::Severity;

/// How a source filter matches
///
/// The list endpoint uses a case-insensitive contains match; stats, trend,
/// and export use exact equality. The asymmetry is documented behavior and
/// kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMatch {
    Substring(String),
    Exact(String),
}

/// Optional filter conditions, ANDed together
///
/// Absent fields impose no constraint; an inverted date range is accepted
/// and simply matches nothing.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub severity: Option<Severity>,
    pub source: Option<SourceMatch>,
    pub search: Option<String>,
}

impl LogFilter {
    /// Render the WHERE clause for the active conditions
    ///
    /// Returns an empty string when no filter is set. Placeholder order must
    /// match [`LogFilter::bind_values`].
    pub fn where_clause(&self) -> String {
        let mut conditions: Vec<&'static str> = Vec::new();

        if self.start_date.is_some() {
            conditions.push("timestamp >= ?");
        }
        if self.end_date.is_some() {
            conditions.push("timestamp <= ?");
        }
        if self.severity.is_some() {
            conditions.push("severity = ?");
        }
        match &self.source {
            Some(SourceMatch::Substring(_)) => conditions.push("source LIKE ?"),
            Some(SourceMatch::Exact(_)) => conditions.push("source = ?"),
            None => {}
        }
        if self.search.is_some() {
            conditions.push("message LIKE ?");
        }

        if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        }
    }

    /// The bind values for the active conditions, in clause order
    ///
    /// Timestamps are rendered as RFC 3339 text, the same encoding the store
    /// writes to the timestamp column, so range comparisons stay consistent.
    pub fn bind_values(&self) -> Vec<String> {
        let mut values = Vec::new();

        if let Some(start) = self.start_date {
            values.push(start.to_rfc3339());
        }
        if let Some(end) = self.end_date {
            values.push(end.to_rfc3339());
        }
        if let Some(severity) = self.severity {
            values.push(severity.as_str().to_string());
        }
        match &self.source {
            Some(SourceMatch::Substring(source)) => values.push(format!("%{}%", source)),
            Some(SourceMatch::Exact(source)) => values.push(source.clone()),
            None => {}
        }
        if let Some(search) = &self.search {
            values.push(format!("%{}%", search));
        }

        values
    }

    pub fn has_date_filter(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

/// Map a client-supplied sort field to a column name
///
/// Explicit whitelist; anything unrecognized falls back to `timestamp`.
pub fn sort_column(name: &str) -> &'static str {
    match name {
        "id" => "id",
        "timestamp" => "timestamp",
        "message" => "message",
        "severity" => "severity",
        "source" => "source",
        "metadata_json" => "metadata_json",
        "created_at" => "created_at",
        "updated_at" => "updated_at",
        _ => "timestamp",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse a sort direction, defaulting to descending
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
