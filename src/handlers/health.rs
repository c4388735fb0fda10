use axum::extract::State;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::server::AppState;

/// Root endpoint with basic service info
pub async fn root_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "name": state.config.api.project_name,
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
    }))
}

/// Health check endpoint for container orchestration
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
