//! Security middleware for HTTP headers and request validation

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::types::{ApiError, ApiErrorType};

/// Maximum accepted request body (64 KiB); prompts and keys are small
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Front-end pages load their own scripts and styles
const PAGE_CSP: &str = "default-src 'self'; \
     script-src 'self' 'unsafe-inline'; \
     style-src 'self' 'unsafe-inline'; \
     connect-src 'self'; \
     img-src 'self' data:; \
     frame-ancestors 'none'";

const API_CSP: &str = "default-src 'none'; frame-ancestors 'none'";

/// Middleware to add security headers to all responses
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let is_api_path = is_api_path(request.uri().path());
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(if is_api_path { API_CSP } else { PAGE_CSP }),
    );

    // License responses must never be cached by intermediaries
    if is_api_path && !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, no-cache, must-revalidate"),
        );
    }

    response
}

/// Middleware rejecting malformed paths and oversized bodies before routing
pub async fn request_guard_middleware(request: Request<Body>, next: Next) -> Response {
    if let Err(e) = validate_request_security(request.uri().path()) {
        return e.into_response();
    }

    let content_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Err(e) = validate_content_length(content_length) {
        return e.into_response();
    }

    next.run(request).await
}

fn is_api_path(path: &str) -> bool {
    path.starts_with("/api/")
        || matches!(path, "/health" | "/ready" | "/live" | "/metrics")
}

/// Validate content length to prevent oversized requests
pub fn validate_content_length(content_length: Option<usize>) -> Result<(), ApiError> {
    match content_length {
        Some(len) if len > MAX_BODY_SIZE => Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorType::InvalidRequestError,
            format!(
                "Request body too large: {} bytes (max: {} bytes)",
                len, MAX_BODY_SIZE
            ),
        )),
        _ => Ok(()),
    }
}

/// Validate request path for common security issues
pub fn validate_request_security(path: &str) -> Result<(), ApiError> {
    if path.contains("..") || path.contains("//") {
        return Err(ApiError::bad_request("Invalid path: path traversal detected"));
    }

    if path.contains('\0') {
        return Err(ApiError::bad_request("Invalid request: prohibited characters"));
    }

    Ok(())
}
