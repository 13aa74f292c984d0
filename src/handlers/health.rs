//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    /// Providers with credentials; the rest are skipped
    providers: Vec<&'static str>,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Guardian API" }))
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        providers: state.config.providers.configured(),
    })
}
