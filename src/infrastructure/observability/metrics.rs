//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .unwrap_or_else(|e| panic!("invalid uuid pattern: {e}"))
});

static NUMERIC_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap_or_else(|e| panic!("invalid id pattern: {e}")));

/// Path prefixes whose trailing segment is a license key
const KEYED_PREFIXES: &[&str] = &["/api/remaining/"];

const MAX_PATH_LABEL: usize = 50;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_default_metrics();

            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    describe_counter!("license_verifications_total", "License redemption attempts by outcome");
    describe_counter!("licenses_created_total", "Licenses generated by replenishment");
    describe_counter!("licenses_pruned_total", "Used or expired licenses dropped from the store");
    describe_gauge!("licenses_available", "Consumable licenses per category");
    describe_counter!("generation_requests_total", "Text generation requests by status");
    describe_counter!("generation_tokens_total", "Upstream tokens consumed by kind");
    describe_histogram!(
        "generation_request_duration_seconds",
        "Upstream text generation latency"
    );

    gauge!("keygate_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record one upstream generation call
pub fn record_generation_request(success: bool, duration: Duration) {
    let labels = [("status", if success { "success" } else { "error" }.to_string())];

    counter!("generation_requests_total", &labels).increment(1);
    histogram!("generation_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record upstream token usage
pub fn record_generation_tokens(prompt_tokens: u32, completion_tokens: u32) {
    counter!("generation_tokens_total", "kind" => "prompt").increment(u64::from(prompt_tokens));
    counter!("generation_tokens_total", "kind" => "completion")
        .increment(u64::from(completion_tokens));
}

/// Sanitize URL path for metric labels
///
/// License keys, UUIDs and numeric IDs are replaced so label cardinality
/// stays bounded and keys never reach the metrics backend.
fn sanitize_path(path: &str) -> String {
    if let Some(prefix) = KEYED_PREFIXES.iter().find(|p| path.starts_with(**p)) {
        return format!("{}{{key}}", prefix);
    }

    let path = UUID_SEGMENT.replace_all(path, "{id}");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");

    path.chars().take(MAX_PATH_LABEL).collect()
}
