//! HTTP handlers

pub mod health;
pub mod users;

pub use health::health;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// JSON 404 for anything unmatched under the API prefix.
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Route not found" })))
}
