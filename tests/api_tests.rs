//! End-to-end API tests against a real server on an ephemeral port

use axum::Router;
use logs_dashboard::config::Config;
use logs_dashboard::server::{create_router, AppState};
use logs_dashboard::{db, init_tracing};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    client: reqwest::Client,
    _dir: tempfile::TempDir,
    _handle: JoinHandle<()>,
}

static TRACING: std::sync::Once = std::sync::Once::new();

async fn start_server() -> TestServer {
    TRACING.call_once(|| init_tracing("warn", "text"));

    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.database.url = format!("sqlite://{}/logs.db", dir.path().display());

    let pool = db::connect(&config.database).await.expect("connect");
    db::run_migrations(&pool).await.expect("migrate");

    let state = AppState {
        db: pool,
        config: Arc::new(config),
    };
    let app: Router = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        _dir: dir,
        _handle: handle,
    }
}

impl TestServer {
    async fn create_log(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/v1/logs", self.base))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let res = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap();
        assert!(res.status().is_success(), "GET {} failed: {}", path, res.status());
        res.json().await.unwrap()
    }
}

#[tokio::test]
async fn create_then_get_roundtrip() {
    let server = start_server().await;

    let res = server
        .create_log(json!({
            "message": "boot",
            "severity": "INFO",
            "source": "svc-a",
            "metadata_json": "{\"region\":\"eu\"}",
        }))
        .await;
    assert_eq!(res.status(), 201);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert!(id > 0);
    assert_eq!(created["severity"], "INFO");
    assert!(created["timestamp"].is_string());

    let fetched = server.get_json(&format!("/api/v1/logs/{}", id)).await;
    assert_eq!(fetched["id"].as_i64().unwrap(), id);
    assert_eq!(fetched["message"], "boot");
    assert_eq!(fetched["source"], "svc-a");
    assert_eq!(fetched["metadata_json"], "{\"region\":\"eu\"}");
}

#[tokio::test]
async fn create_ids_are_unique_and_stable() {
    let server = start_server().await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let res = server
            .create_log(json!({"message": format!("m{}", i), "source": "svc-a"}))
            .await;
        assert_eq!(res.status(), 201);
        let body: Value = res.json().await.unwrap();
        ids.push(body["id"].as_i64().unwrap());
    }

    let mut deduped = ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());

    for id in ids {
        let fetched = server.get_json(&format!("/api/v1/logs/{}", id)).await;
        assert_eq!(fetched["id"].as_i64().unwrap(), id);
    }
}

#[tokio::test]
async fn validation_failures_return_422_and_persist_nothing() {
    let server = start_server().await;

    let res = server
        .create_log(json!({"message": "", "source": "svc-a"}))
        .await;
    assert_eq!(res.status(), 422);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["type"], "validation_error");

    let res = server
        .create_log(json!({"message": "x", "source": "s".repeat(256)}))
        .await;
    assert_eq!(res.status(), 422);

    // Unknown severity fails typed deserialization
    let res = server
        .create_log(json!({"message": "x", "severity": "FATAL", "source": "svc-a"}))
        .await;
    assert_eq!(res.status(), 422);

    // Nothing was written
    let list = server.get_json("/api/v1/logs").await;
    assert_eq!(list["total"].as_i64().unwrap(), 0);
}

#[tokio::test]
async fn list_pagination_metadata_is_consistent() {
    let server = start_server().await;

    for i in 0..25 {
        let res = server
            .create_log(json!({"message": format!("m{:02}", i), "source": "svc-a"}))
            .await;
        assert_eq!(res.status(), 201);
    }

    let page = server.get_json("/api/v1/logs").await;
    assert_eq!(page["total"].as_i64().unwrap(), 25);
    assert_eq!(page["page"].as_i64().unwrap(), 1);
    assert_eq!(page["page_size"].as_i64().unwrap(), 20);
    assert_eq!(page["total_pages"].as_i64().unwrap(), 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 20);

    let second = server.get_json("/api/v1/logs?page=2").await;
    assert_eq!(second["items"].as_array().unwrap().len(), 5);

    // page_size is clamped to the configured maximum
    let clamped = server.get_json("/api/v1/logs?page_size=1000").await;
    assert_eq!(clamped["page_size"].as_i64().unwrap(), 100);

    // page below 1 is rejected
    let res = server
        .client
        .get(format!("{}/api/v1/logs?page=0", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);
}

#[tokio::test]
async fn severity_filter_returns_only_matching_entries() {
    let server = start_server().await;

    for (message, severity) in [("e1", "ERROR"), ("e2", "ERROR"), ("i1", "INFO")] {
        server
            .create_log(json!({"message": message, "severity": severity, "source": "svc-a"}))
            .await;
    }

    let errors = server.get_json("/api/v1/logs?severity=ERROR").await;
    assert_eq!(errors["total"].as_i64().unwrap(), 2);
    for item in errors["items"].as_array().unwrap() {
        assert_eq!(item["severity"], "ERROR");
    }

    let criticals = server.get_json("/api/v1/logs?severity=CRITICAL").await;
    assert_eq!(criticals["total"].as_i64().unwrap(), 0);
    assert!(criticals["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn inverted_date_range_is_empty_everywhere_not_an_error() {
    let server = start_server().await;

    server
        .create_log(json!({
            "message": "boot",
            "source": "svc-a",
            "timestamp": "2024-03-15T12:00:00Z",
        }))
        .await;

    let range = "start_date=2024-04-01&end_date=2024-03-01";

    let list = server.get_json(&format!("/api/v1/logs?{}", range)).await;
    assert_eq!(list["total"].as_i64().unwrap(), 0);

    let stats = server
        .get_json(&format!("/api/v1/logs/stats?{}", range))
        .await;
    assert_eq!(stats["total_logs"].as_i64().unwrap(), 0);
    assert!(stats["trend_data"].as_array().unwrap().is_empty());

    let trend = server
        .get_json(&format!("/api/v1/logs/trend?{}", range))
        .await;
    assert!(trend.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn partial_update_changes_only_supplied_fields() {
    let server = start_server().await;

    let res = server
        .create_log(json!({
            "message": "boot",
            "severity": "INFO",
            "source": "svc-a",
            "metadata_json": "{\"k\":1}",
        }))
        .await;
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let res = server
        .client
        .put(format!("{}/api/v1/logs/{}", server.base, id))
        .json(&json!({"severity": "CRITICAL"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let updated: Value = res.json().await.unwrap();

    assert_eq!(updated["severity"], "CRITICAL");
    assert_eq!(updated["message"], "boot");
    assert_eq!(updated["source"], "svc-a");
    assert_eq!(updated["metadata_json"], "{\"k\":1}");
    let before = chrono::DateTime::parse_from_rfc3339(created["updated_at"].as_str().unwrap())
        .unwrap();
    let after = chrono::DateTime::parse_from_rfc3339(updated["updated_at"].as_str().unwrap())
        .unwrap();
    assert!(after > before, "updated_at must advance");

    // Explicit null clears metadata_json, absent fields stay untouched
    let res = server
        .client
        .put(format!("{}/api/v1/logs/{}", server.base, id))
        .json(&json!({"metadata_json": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let cleared: Value = res.json().await.unwrap();
    assert!(cleared["metadata_json"].is_null());
    assert_eq!(cleared["severity"], "CRITICAL");
}

#[tokio::test]
async fn update_and_delete_missing_ids_return_404() {
    let server = start_server().await;

    let res = server
        .client
        .put(format!("{}/api/v1/logs/9999", server.base))
        .json(&json!({"message": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = server
        .client
        .delete(format!("{}/api/v1/logs/9999", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn delete_then_get_yields_not_found() {
    let server = start_server().await;

    let res = server
        .create_log(json!({"message": "ephemeral", "source": "svc-a"}))
        .await;
    let id = res.json::<Value>().await.unwrap()["id"].as_i64().unwrap();

    let res = server
        .client
        .delete(format!("{}/api/v1/logs/{}", server.base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let res = server
        .client
        .get(format!("{}/api/v1/logs/{}", server.base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["type"], "not_found");
}

#[tokio::test]
async fn sources_are_distinct_and_alphabetical() {
    let server = start_server().await;

    for source in ["worker", "api-gateway", "worker", "cache-service"] {
        server
            .create_log(json!({"message": "m", "source": source}))
            .await;
    }

    let sources = server.get_json("/api/v1/logs/sources").await;
    assert_eq!(
        sources,
        json!(["api-gateway", "cache-service", "worker"])
    );
}

#[tokio::test]
async fn stats_for_single_source_match_spec_example() {
    let server = start_server().await;

    server
        .create_log(json!({"message": "boot", "severity": "INFO", "source": "svc-a"}))
        .await;
    server
        .create_log(json!({"message": "other", "severity": "ERROR", "source": "svc-b"}))
        .await;

    let list = server.get_json("/api/v1/logs?source=svc-a").await;
    assert_eq!(list["total"].as_i64().unwrap(), 1);
    assert_eq!(list["items"][0]["message"], "boot");

    let stats = server.get_json("/api/v1/logs/stats?source=svc-a").await;
    assert_eq!(stats["total_logs"].as_i64().unwrap(), 1);
    assert_eq!(
        stats["severity_breakdown"],
        json!([{"label": "INFO", "count": 1}])
    );
    assert_eq!(stats["source_breakdown"][0]["label"], "svc-a");
    assert!(stats["date_range"]["start"].is_null());
    assert!(stats["date_range"]["end"].is_null());
}

#[tokio::test]
async fn stats_source_filter_is_exact_while_list_is_substring() {
    let server = start_server().await;

    server
        .create_log(json!({"message": "m", "source": "api-gateway"}))
        .await;

    // The list endpoint matches substrings, case-insensitively
    let list = server.get_json("/api/v1/logs?source=GATEWAY").await;
    assert_eq!(list["total"].as_i64().unwrap(), 1);

    // Stats requires the exact source label
    let stats = server.get_json("/api/v1/logs/stats?source=gateway").await;
    assert_eq!(stats["total_logs"].as_i64().unwrap(), 0);
    let stats = server
        .get_json("/api/v1/logs/stats?source=api-gateway")
        .await;
    assert_eq!(stats["total_logs"].as_i64().unwrap(), 1);
}

#[tokio::test]
async fn trend_grouped_by_severity_is_sparse() {
    let server = start_server().await;

    for (message, severity, timestamp) in [
        ("a", "INFO", "2024-03-02T01:00:00Z"),
        ("b", "ERROR", "2024-03-02T02:00:00Z"),
        ("c", "INFO", "2024-03-03T01:00:00Z"),
    ] {
        server
            .create_log(json!({
                "message": message,
                "severity": severity,
                "source": "svc-a",
                "timestamp": timestamp,
            }))
            .await;
    }

    let trend = server
        .get_json(
            "/api/v1/logs/trend?start_date=2024-03-01&end_date=2024-03-10&group_by_severity=true",
        )
        .await;
    let rows = trend.as_array().unwrap();

    let day_two: Vec<_> = rows
        .iter()
        .filter(|r| r["date"] == "2024-03-02")
        .collect();
    assert_eq!(day_two.len(), 2);

    let day_three: Vec<_> = rows
        .iter()
        .filter(|r| r["date"] == "2024-03-03")
        .collect();
    assert_eq!(day_three.len(), 1);
    assert_eq!(day_three[0]["severity"], "INFO");
    assert_eq!(day_three[0]["count"].as_i64().unwrap(), 1);

    // Ascending by date
    let dates: Vec<_> = rows.iter().map(|r| r["date"].as_str().unwrap()).collect();
    let mut sorted = dates.clone();
    sorted.sort_unstable();
    assert_eq!(dates, sorted);
}

#[tokio::test]
async fn ungrouped_trend_counts_per_day() {
    let server = start_server().await;

    for timestamp in [
        "2024-03-02T01:00:00Z",
        "2024-03-02T23:00:00Z",
        "2024-03-05T12:00:00Z",
    ] {
        server
            .create_log(json!({"message": "m", "source": "svc-a", "timestamp": timestamp}))
            .await;
    }

    let trend = server
        .get_json("/api/v1/logs/trend?start_date=2024-03-01&end_date=2024-03-31")
        .await;
    assert_eq!(
        trend,
        json!([
            {"date": "2024-03-02", "count": 2, "severity": null},
            {"date": "2024-03-05", "count": 1, "severity": null},
        ])
    );
}

#[tokio::test]
async fn export_matches_list_and_has_exact_header() {
    let server = start_server().await;

    server
        .create_log(json!({
            "message": "plain message",
            "severity": "INFO",
            "source": "svc-a",
        }))
        .await;
    server
        .create_log(json!({
            "message": "tricky, \"quoted\"\nmultiline",
            "severity": "ERROR",
            "source": "svc-a",
        }))
        .await;

    let res = server
        .client
        .get(format!("{}/api/v1/logs/export", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let disposition = res
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=logs_export_"));
    assert!(disposition.ends_with(".csv"));

    let body = res.text().await.unwrap();
    let mut lines = body.split("\r\n");
    assert_eq!(lines.next().unwrap(), "ID,Timestamp,Severity,Source,Message");

    // Count CSV records, honoring quoted fields with embedded newlines
    let data = body.split_once("\r\n").unwrap().1;
    let mut records: i64 = 0;
    let mut in_quotes = false;
    let mut current_len = 0;
    let mut chars = data.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {
                chars.next();
                if current_len > 0 {
                    records += 1;
                }
                current_len = 0;
                continue;
            }
            _ => {}
        }
        current_len += 1;
    }
    if current_len > 0 {
        records += 1;
    }

    let list = server.get_json("/api/v1/logs").await;
    assert_eq!(records, list["total"].as_i64().unwrap());
}

#[tokio::test]
async fn export_respects_filters() {
    let server = start_server().await;

    server
        .create_log(json!({"message": "e", "severity": "ERROR", "source": "svc-a"}))
        .await;
    server
        .create_log(json!({"message": "i", "severity": "INFO", "source": "svc-a"}))
        .await;

    let res = server
        .client
        .get(format!(
            "{}/api/v1/logs/export?severity=ERROR",
            server.base
        ))
        .send()
        .await
        .unwrap();
    let body = res.text().await.unwrap();
    let data_lines: Vec<_> = body
        .split("\r\n")
        .skip(1)
        .filter(|l| !l.is_empty())
        .collect();
    assert_eq!(data_lines.len(), 1);
    assert!(data_lines[0].contains("ERROR"));
}

#[tokio::test]
async fn liveness_endpoints_respond() {
    let server = start_server().await;

    let health = server.get_json("/health").await;
    assert_eq!(health, json!({"status": "healthy"}));

    let root = server.get_json("/").await;
    assert_eq!(root["name"], "Logs Dashboard API");
    assert!(root["version"].is_string());
}
