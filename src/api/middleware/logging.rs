//! Request/response logging middleware with sensitive data redaction

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

/// Headers worth a log line
const LOGGED_HEADERS: &[&str] = &[
    "content-type",
    "content-length",
    "accept",
    "user-agent",
    "x-request-id",
    "x-forwarded-for",
    "x-real-ip",
    "authorization",
];

/// Middleware to log HTTP requests and responses.
///
/// Keys in `/api/remaining/{key}` are masked before logging. `TraceLayer`
/// owns the request span.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = extract_path(&request);
    let request_id = extract_request_id(request.headers());
    let headers_log = redact_headers(request.headers());

    info!(
        method = %method,
        path = %path,
        request_id = %request_id,
        headers = %headers_log,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            request_id = %request_id,
            "Request failed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            request_id = %request_id,
            "Request completed"
        );
    }

    response
}

fn extract_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| mask_license_key(request.uri().path()))
}

fn mask_license_key(path: &str) -> String {
    match path.strip_prefix("/api/remaining/") {
        Some(_) => "/api/remaining/{key}".to_string(),
        None => path.to_string(),
    }
}

fn extract_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Loggable headers, with credentials replaced
fn redact_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .filter(|(name, _)| LOGGED_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| {
            let value = if is_sensitive_header(name.as_str()) {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("[invalid]")
            };
            format!("{}={}", name, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check if a header contains sensitive information
fn is_sensitive_header(name: &str) -> bool {
    matches!(
        name,
        "authorization" | "cookie" | "set-cookie" | "proxy-authorization"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_sensitive_header() {
        assert!(is_sensitive_header("authorization"));
        assert!(is_sensitive_header("cookie"));
        assert!(!is_sensitive_header("content-type"));
    }

    #[test]
    fn test_redact_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("etag", HeaderValue::from_static("abc"));

        let log = redact_headers(&headers);

        assert!(log.contains("authorization=[REDACTED]"));
        assert!(log.contains("content-type=application/json"));
        assert!(!log.contains("secret"));
        assert!(!log.contains("etag"));
    }

    #[test]
    fn test_mask_license_key() {
        assert_eq!(mask_license_key("/api/remaining/ABC123"), "/api/remaining/{key}");
        assert_eq!(mask_license_key("/api/verify"), "/api/verify");
    }

    #[test]
    fn test_request_id_passthrough() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("req-42"));
        assert_eq!(extract_request_id(&headers), "req-42");

        let generated = extract_request_id(&HeaderMap::new());
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
    }
}
