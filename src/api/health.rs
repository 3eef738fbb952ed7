//! Health check endpoints for orchestrator probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use serde::Serialize;

use super::state::AppState;
use crate::api::types::Json;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check status
#[derive(Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Simple health check - returns 200 if the service is running
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::healthy()))
}

/// Readiness check: the license store must be readable
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let store_check = check_license_store(&state).await;

    let overall_status = store_check.status;
    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![store_check, check_generation(&state)]),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded | HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness check - the process is up and serving
pub async fn live_check() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::healthy()))
}

impl HealthResponse {
    fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks: None,
            latency_ms: None,
        }
    }
}

async fn check_license_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    let (status, message) = match state.license_service.check_store().await {
        Ok(count) => (HealthStatus::Healthy, Some(format!("{} licenses", count))),
        Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
    };

    HealthCheck {
        name: "license_store".to_string(),
        status,
        message,
        latency_ms: Some(start.elapsed().as_millis() as u64),
    }
}

/// Generation is optional, so its absence never fails readiness
fn check_generation(state: &AppState) -> HealthCheck {
    let message = if state.generation_service.is_some() {
        "configured"
    } else {
        "not configured"
    };

    HealthCheck {
        name: "generation".to_string(),
        status: HealthStatus::Healthy,
        message: Some(message.to_string()),
        latency_ms: None,
    }
}
