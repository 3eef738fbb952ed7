//! Text generation proxy endpoint

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::api::state::AppState;
use crate::api::types::{ApiError, GenerateRequest, GenerateResponse, Json};
use crate::domain::DomainError;
use crate::infrastructure::services::TextStream;

/// POST /api/ai
///
/// Returns `{ result }`, or a chunked `text/plain` body when `stream` is set.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required").with_param("prompt"));
    }

    let service = state.generation()?;

    info!(
        stream = request.stream,
        prompt_chars = request.prompt.chars().count(),
        "Processing generation request"
    );

    if request.stream {
        let deltas = service.generate_stream(&request.prompt).await?;
        return Ok(stream_text(deltas));
    }

    let result = service.generate(&request.prompt).await?;

    Ok(Json(GenerateResponse { result }).into_response())
}

/// Relay deltas as they arrive; an upstream failure mid-stream aborts the body
fn stream_text(mut deltas: TextStream) -> Response {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, DomainError>>(32);

    tokio::spawn(async move {
        while let Some(delta) = deltas.next().await {
            let failed = delta.is_err();

            if tx.send(delta).await.is_err() {
                warn!("Client disconnected during generation stream");
                return;
            }

            if failed {
                return;
            }
        }
    });

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::api::create_router_with_state;
    use crate::domain::license::{LicenseCategory, MockLicenseRepository};
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::LlmResponse;
    use crate::infrastructure::license::LicenseService;
    use crate::infrastructure::services::GenerationService;

    fn base_state() -> AppState {
        let categories = vec![LicenseCategory::from_minutes(10).unwrap()];
        AppState::new(Arc::new(LicenseService::new(
            Arc::new(MockLicenseRepository::new()),
            categories,
        )))
    }

    fn state_with_provider(provider: MockLlmProvider) -> AppState {
        let service = GenerationService::new(Arc::new(provider), "mock-model");
        base_state().with_generation(Arc::new(service))
    }

    fn answering(text: &str) -> MockLlmProvider {
        MockLlmProvider::new("mock").with_response(LlmResponse::new("mock-model", text))
    }

    fn ai_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ai")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Option<String>, String) {
        let response = create_router_with_state(state).oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_generate_json() {
        let state = state_with_provider(answering("In the beginning"));

        let (status, _, body) = send(state, ai_request(serde_json::json!({ "prompt": "Genesis 1:1" }))).await;

        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body, serde_json::json!({ "result": "In the beginning" }));
    }

    #[tokio::test]
    async fn test_generate_stream() {
        let state = state_with_provider(answering("Once upon a time"));

        let (status, content_type, body) = send(
            state,
            ai_request(serde_json::json!({ "prompt": "A story", "stream": true })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));
        assert_eq!(body, "Once upon a time");
    }

    #[tokio::test]
    async fn test_missing_prompt_is_400() {
        let (status, _, body) = send(base_state(), ai_request(serde_json::json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error"]["param"], "prompt");
    }

    #[tokio::test]
    async fn test_not_configured_is_501() {
        let (status, _, body) =
            send(base_state(), ai_request(serde_json::json!({ "prompt": "Hi" }))).await;

        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error"]["type"], "not_implemented_error");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500_with_generic_message() {
        let state = state_with_provider(MockLlmProvider::new("mock").with_error("quota exceeded"));

        let (status, _, body) = send(state, ai_request(serde_json::json!({ "prompt": "Hi" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("quota"));
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["error"]["message"], "Text generation failed");
    }
}
