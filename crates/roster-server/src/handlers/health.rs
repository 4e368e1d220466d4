//! Health report handler

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    pub backend_type: String,
    pub user_count: u64,
}

/// Liveness report: always 200. A storage probe failure degrades the body
/// (zero count, degraded message) instead of failing the request.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (user_count, healthy) = state.users.user_count().await;
    let message = if healthy {
        "Server is running"
    } else {
        "Server is running (storage degraded)"
    };

    Json(HealthResponse {
        success: true,
        message,
        timestamp: Utc::now(),
        backend_type: state.users.backend_kind().to_string(),
        user_count,
    })
}
