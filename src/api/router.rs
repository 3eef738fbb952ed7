use std::path::Path;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::admin;
use super::generate;
use super::health;
use super::licenses;
use super::middleware::{
    logging_middleware, metrics_middleware, request_guard_middleware,
    security_headers_middleware,
};
use super::state::AppState;
use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

/// Create the `/api` routes
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/verify", post(licenses::verify_license))
        .route("/remaining/{key}", get(licenses::remaining_time))
        .route("/ai", post(generate::generate))
        .nest("/admin", admin::create_admin_router())
}

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .nest("/api", create_api_router())
        .with_state(state)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(logging_middleware))
        .layer(from_fn(request_guard_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Full application: API, optional `/metrics`, and the static front-end
///
/// Unmatched paths are served from `static_dir`, falling back to its
/// `index.html`.
pub fn create_app(
    state: AppState,
    static_dir: &Path,
    metrics: Option<(PrometheusMetrics, &str)>,
) -> Router {
    let mut router = create_router_with_state(state);

    if let Some((metrics, path)) = metrics {
        router = router.merge(create_metrics_router(metrics, path));
    }

    let static_files =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    router.fallback_service(static_files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::domain::license::{LicenseCategory, MockLicenseRepository};
    use crate::infrastructure::license::LicenseService;

    fn state() -> AppState {
        let categories = vec![LicenseCategory::from_minutes(10).unwrap()];
        AppState::new(Arc::new(LicenseService::new(
            Arc::new(MockLicenseRepository::new()),
            categories,
        )))
    }

    fn static_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>keygate</h1>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        dir
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_static_files() {
        let dir = static_dir();
        let app = create_app(state(), dir.path(), None);

        let response = app
            .oneshot(Request::builder().uri("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "console.log(1)");
    }

    #[tokio::test]
    async fn test_unknown_path_falls_back_to_index() {
        let dir = static_dir();
        let app = create_app(state(), dir.path(), None);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("keygate"));
    }

    #[tokio::test]
    async fn test_api_routes_take_precedence() {
        let dir = static_dir();
        let app = create_app(state(), dir.path(), None);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("healthy"));
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let app = create_router_with_state(state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/verify")
                    .header(header::ORIGIN, "https://example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = create_router_with_state(state())
            .oneshot(
                Request::builder()
                    .uri("/live")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = create_router_with_state(state())
            .oneshot(Request::builder().uri("/live").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let response = create_router_with_state(state())
            .oneshot(Request::builder().uri("/api/verify").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
