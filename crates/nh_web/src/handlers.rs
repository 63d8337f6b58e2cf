use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Liveness plus the current stats, the shape uptime monitors already poll.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.storage.stats().await {
        Ok(stats) => (StatusCode::OK, Json(json!({ "status": "healthy", "stats": stats }))),
        Err(e) => {
            tracing::warn!("health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "unhealthy" })),
            )
        }
    }
}

pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.storage.stats().await {
        Ok(stats) => (StatusCode::OK, Json(json!(stats))),
        Err(e) => {
            tracing::error!("stats unavailable: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "unhealthy", "error": e.to_string() })),
            )
        }
    }
}
