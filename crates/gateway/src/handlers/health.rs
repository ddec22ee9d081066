//! Liveness and readiness handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

/// Greeting served at the root path
pub const WELCOME_MESSAGE: &str = "welcome to bd property";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub store: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn welcome() -> Json<&'static str> {
    Json(WELCOME_MESSAGE)
}

/// Liveness check, healthy whenever the server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: bdproperty_common::VERSION,
    })
}

/// Readiness check against the listing store
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let store_check = match state.listings.store().ping().await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Listing store ping failed");
            CheckResult {
                status: "down".to_string(),
                latency_ms: None,
                error: Some(e.public_message()),
            }
        }
    };

    let all_healthy = store_check.status == "up";

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks { store: store_check },
    })
}
