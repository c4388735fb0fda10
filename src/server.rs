use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, CorsConfig};
use crate::{db, handlers, signals};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
}

/// Start the Logs Dashboard API server
///
/// Opens the database, applies the schema, installs signal handlers, and
/// serves until a shutdown signal arrives; the pool is closed after the
/// listener drains.
pub async fn start_server(config: Config) -> Result<()> {
    let pool = db::connect(&config.database).await?;
    db::run_migrations(&pool).await?;

    let (shutdown_tx, signal_handle) = signals::setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let config = Arc::new(config);
    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
    };
    let app = create_router(state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting {} on {}", config.api.project_name, addr);
    info!(
        "API prefix: {}, database: {}",
        config.api.prefix, config.database.url
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;
    pool.close().await;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let logs_routes = Router::new()
        .route(
            "/logs",
            post(handlers::logs::create_log).get(handlers::logs::list_logs),
        )
        .route("/logs/sources", get(handlers::logs::list_sources))
        .route("/logs/stats", get(handlers::stats::get_stats))
        .route("/logs/trend", get(handlers::stats::get_trend))
        .route("/logs/export", get(handlers::export::export_csv))
        .route(
            "/logs/:id",
            get(handlers::logs::get_log)
                .put(handlers::logs::update_log)
                .delete(handlers::logs::delete_log),
        )
        .with_state(state.clone());

    let cors = build_cors_layer(&state.config.cors);
    let prefix = state.config.api.prefix.clone();

    Router::new()
        // Liveness endpoints outside the versioned prefix
        .route("/", get(handlers::health::root_info))
        .route("/health", get(handlers::health::health_check))
        .with_state(state)
        .nest(&prefix, logs_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// CORS for the dashboard frontend; origins come from configuration
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
