//! Populate the database with realistic sample log entries

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use logs_dashboard::models::Severity;
use logs_dashboard::store::{self, NewLog};
use logs_dashboard::{config, db, init_tracing};

const SOURCES: [&str; 10] = [
    "api-gateway",
    "auth-service",
    "user-service",
    "order-service",
    "payment-service",
    "notification-service",
    "database-service",
    "cache-service",
    "scheduler",
    "worker",
];

const SEVERITY_WEIGHTS: [(Severity, u32); 5] = [
    (Severity::Debug, 15),
    (Severity::Info, 50),
    (Severity::Warning, 20),
    (Severity::Error, 12),
    (Severity::Critical, 3),
];

fn message_templates(severity: Severity) -> &'static [&'static str] {
    match severity {
        Severity::Debug => &[
            "Processing request with params: {}",
            "Cache lookup for key: session_{}",
            "Database query executed in {}ms",
            "Validating input data",
            "Starting background task: {}",
        ],
        Severity::Info => &[
            "User {} logged in successfully",
            "Order {} created for user {}",
            "Payment processed: ${}",
            "Email notification sent to {}",
            "Service started on port {}",
            "Health check passed",
            "Configuration loaded from environment",
            "Database connection established",
        ],
        Severity::Warning => &[
            "Slow query detected: {}ms",
            "Rate limit approaching for user {}",
            "Deprecated API endpoint called: {}",
            "Memory usage at {}%",
            "Retry attempt {} for operation",
            "Connection pool running low",
        ],
        Severity::Error => &[
            "Failed to process payment for order {}",
            "Database connection timeout after {}ms",
            "Authentication failed for user {}",
            "Invalid request format: {}",
            "Service unavailable: {}",
            "File not found: {}",
        ],
        Severity::Critical => &[
            "Database cluster failover initiated",
            "Out of memory - service restarting",
            "Security breach detected from IP {}",
            "Data corruption detected in table {}",
            "Service crash - unhandled exception",
        ],
    }
}

fn random_value(rng: &mut impl Rng) -> String {
    match rng.gen_range(0..6) {
        0 => rng.gen_range(1..=10_000).to_string(),
        1 => format!("user_{}", rng.gen_range(1..=1000)),
        2 => {
            let kind = ["order", "payment", "session"][rng.gen_range(0..3)];
            format!("{}_{}", kind, rng.gen_range(1..=9999))
        }
        3 => rng.gen_range(10..=500).to_string(),
        4 => ["8080", "3000", "5432", "6379"][rng.gen_range(0..4)].to_string(),
        _ => {
            let op = ["create", "update", "delete", "read"][rng.gen_range(0..4)];
            format!("operation_{}", op)
        }
    }
}

fn generate_message(rng: &mut impl Rng, severity: Severity) -> String {
    let templates = message_templates(severity);
    let mut message = templates[rng.gen_range(0..templates.len())].to_string();
    while let Some(pos) = message.find("{}") {
        message.replace_range(pos..pos + 2, &random_value(rng));
    }
    message
}

pub async fn execute(config_path: &Path, count: u32, days_back: i64) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    if days_back < 1 {
        anyhow::bail!("days_back must be at least 1");
    }

    let pool = db::connect(&cfg.database).await?;
    db::run_migrations(&pool).await?;

    info!("Creating {} sample log entries...", count);

    let mut rng = rand::thread_rng();
    let weights = WeightedIndex::new(SEVERITY_WEIGHTS.iter().map(|(_, weight)| *weight))?;
    let now = Utc::now();
    let mut per_severity: HashMap<&'static str, u32> = HashMap::new();

    let mut tx = pool.begin().await?;
    for i in 0..count {
        let severity = SEVERITY_WEIGHTS[weights.sample(&mut rng)].0;
        let source = SOURCES[rng.gen_range(0..SOURCES.len())];
        let message = generate_message(&mut rng, severity);
        let timestamp = now - Duration::seconds(rng.gen_range(0..days_back * 86_400));

        store::insert_log(
            &mut tx,
            NewLog {
                timestamp,
                message,
                severity,
                source: source.to_string(),
                metadata_json: None,
            },
        )
        .await?;

        *per_severity.entry(severity.as_str()).or_insert(0) += 1;

        if (i + 1) % 100 == 0 {
            info!("Created {}/{} logs...", i + 1, count);
        }
    }
    tx.commit().await?;

    info!(
        "Successfully created {} log entries over the last {} days",
        count, days_back
    );
    for (severity, created) in &per_severity {
        info!("  {}: {}", severity, created);
    }

    pool.close().await;
    Ok(())
}
