use async_trait::async_trait;
use bytes::Bytes;
use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, LlmStream, Message,
    StreamChunk, Usage,
};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI chat completions provider
#[derive(Debug)]
pub struct OpenAiProvider<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> OpenAiProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, model: &str, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> = request.messages.iter().map(OpenAiMessage::from).collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": request.stream,
        });

        if request.stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        body
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("openai", "No choices in response"))?;

        let mut llm_response =
            LlmResponse::new(response.model, choice.message.content.unwrap_or_default());

        if let Some(reason) = choice.finish_reason {
            llm_response = llm_response.with_finish_reason(parse_finish_reason(&reason));
        }

        if let Some(usage) = response.usage {
            llm_response = llm_response.with_usage(usage.into());
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let mut req = request;
        req.stream = false;

        let url = self.chat_completions_url();
        let body = self.build_request(model, &req);
        let response = self
            .client
            .post_json(&url, self.headers(), &body)
            .await?;

        self.parse_response(response)
    }

    async fn chat_stream(
        &self,
        model: &str,
        request: LlmRequest,
    ) -> Result<LlmStream, DomainError> {
        let mut req = request;
        req.stream = true;

        let url = self.chat_completions_url();
        let body = self.build_request(model, &req);
        let byte_stream = self
            .client
            .post_json_stream(&url, self.headers(), &body)
            .await?;

        let stream = byte_stream
            .scan(SseDecoder::default(), |decoder, result: Result<Bytes, DomainError>| {
                let chunks = match result {
                    Ok(bytes) => decoder.push(&bytes),
                    Err(e) => vec![Err(e)],
                };
                future::ready(Some(chunks))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}

/// Splits a server-sent event body into completion chunks
///
/// Network reads do not line up with events, so partial lines are kept
/// until their newline arrives.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<StreamChunk, DomainError>> {
        self.buffer.extend_from_slice(bytes);

        let mut chunks = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);

            chunks.extend(parse_sse_line(line.trim_end()).into_iter().map(Ok));
        }

        chunks
    }
}

/// Chunks carried by one SSE line; `[DONE]` and comments carry none
fn parse_sse_line(line: &str) -> Vec<StreamChunk> {
    let Some(data) = line.strip_prefix("data:").map(str::trim_start) else {
        return Vec::new();
    };

    if data == "[DONE]" {
        return Vec::new();
    }

    let event = match serde_json::from_str::<OpenAiStreamChunk>(data) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Skipping unparseable stream event");
            return Vec::new();
        }
    };

    let mut chunks = Vec::new();

    if let Some(choice) = event.choices.into_iter().next() {
        if let Some(delta) = choice.delta.content {
            chunks.push(StreamChunk::delta(delta));
        }

        if let Some(reason) = choice.finish_reason {
            chunks.push(StreamChunk::finished(parse_finish_reason(&reason)));
        }
    }

    if let Some(usage) = event.usage {
        chunks.push(StreamChunk::usage(usage.into()));
    }

    chunks
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for OpenAiMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content_text(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl From<OpenAiUsage> for Usage {
    fn from(usage: OpenAiUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn delta_event(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini",
                "choices": [{ "delta": { "content": content }, "finish_reason": null }]
            })
        )
    }

    fn finish_event(reason: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{ "delta": {}, "finish_reason": reason }]
            })
        )
    }

    fn usage_event(prompt: u32, completion: u32) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [],
                "usage": {
                    "prompt_tokens": prompt,
                    "completion_tokens": completion,
                    "total_tokens": prompt + completion
                }
            })
        )
    }

    async fn collect(mut stream: LlmStream) -> (String, Option<FinishReason>, Option<Usage>) {
        let mut text = String::new();
        let mut finish = None;
        let mut usage = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if let Some(delta) = chunk.delta {
                text.push_str(&delta);
            }
            finish = chunk.finish_reason.or(finish);
            usage = chunk.usage.or(usage);
        }

        (text, finish, usage)
    }

    #[tokio::test]
    async fn test_openai_chat() {
        let mock_response = serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Once upon a time"
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 4,
                "total_tokens": 14
            }
        });

        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = OpenAiProvider::new(client, "test-api-key");

        let request = LlmRequest::builder().user("Tell me a story").build();
        let response = provider.chat("gpt-4o-mini", request).await.unwrap();

        assert_eq!(response.content(), "Once upon a time");
        assert_eq!(response.model, "gpt-4o-mini");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(
            response.usage,
            Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 4
            })
        );
    }

    #[tokio::test]
    async fn test_openai_request_body() {
        let mock_response = serde_json::json!({
            "id": "x",
            "model": "gpt-4o-mini",
            "choices": [{ "message": { "content": "ok" }, "finish_reason": "stop" }]
        });
        let client = MockHttpClient::new().with_response(TEST_URL, mock_response);
        let provider = OpenAiProvider::new(client, "k");

        let request = LlmRequest::builder()
            .system("Be brief")
            .user("Hi")
            .temperature(0.5)
            .stream(true)
            .build();
        provider.chat("gpt-4o-mini", request).await.unwrap();

        let body = provider.client.last_body().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], false);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert!(body.get("stream_options").is_none());
    }

    #[tokio::test]
    async fn test_openai_error_handling() {
        let client = MockHttpClient::new().with_error(TEST_URL, "API key invalid");
        let provider = OpenAiProvider::new(client, "invalid-key");

        let request = LlmRequest::builder().user("Hello!").build();
        let result = provider.chat("gpt-4o-mini", request).await;

        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_openai_empty_choices() {
        let client = MockHttpClient::new().with_response(
            TEST_URL,
            serde_json::json!({ "id": "x", "model": "m", "choices": [] }),
        );
        let provider = OpenAiProvider::new(client, "k");

        let request = LlmRequest::builder().user("Hello!").build();
        assert!(provider.chat("m", request).await.is_err());
    }

    #[tokio::test]
    async fn test_openai_custom_base_url() {
        let custom_url = "http://localhost:8080/v1/chat/completions";
        let mock_response = serde_json::json!({
            "id": "chatcmpl-custom",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": { "role": "assistant", "content": "Custom response" },
                "finish_reason": "stop"
            }]
        });

        let client = MockHttpClient::new().with_response(custom_url, mock_response);
        let provider = OpenAiProvider::with_base_url(client, "test-key", "http://localhost:8080/");

        let request = LlmRequest::builder().user("Test").build();
        let response = provider.chat("gpt-4o-mini", request).await.unwrap();

        assert_eq!(response.content(), "Custom response");
    }

    #[tokio::test]
    async fn test_openai_stream() {
        let body = format!(
            "{}{}{}{}data: [DONE]\n\n",
            delta_event("Hello"),
            delta_event(", world"),
            finish_event("length"),
            usage_event(12, 3)
        );
        let client = MockHttpClient::new()
            .with_stream_response(TEST_URL, vec![Bytes::from(body)]);
        let provider = OpenAiProvider::new(client, "k");

        let request = LlmRequest::builder().user("Hi").build();
        let stream = provider.chat_stream("gpt-4o-mini", request).await.unwrap();

        let (text, finish, usage) = collect(stream).await;
        assert_eq!(text, "Hello, world");
        assert_eq!(finish, Some(FinishReason::Length));
        assert_eq!(usage.unwrap().completion_tokens, 3);

        let sent = provider.client.last_body().unwrap();
        assert_eq!(sent["stream"], true);
        assert_eq!(sent["stream_options"]["include_usage"], true);
    }

    #[tokio::test]
    async fn test_openai_stream_event_split_across_reads() {
        let event = delta_event("Psalm 23");
        let (first, second) = event.as_bytes().split_at(event.len() / 2);

        let client = MockHttpClient::new().with_stream_response(
            TEST_URL,
            vec![
                Bytes::copy_from_slice(first),
                Bytes::copy_from_slice(second),
                Bytes::from_static(b": keep-alive\n\ndata: [DONE]\n\n"),
            ],
        );
        let provider = OpenAiProvider::new(client, "k");

        let request = LlmRequest::builder().user("Hi").build();
        let stream = provider.chat_stream("gpt-4o-mini", request).await.unwrap();

        let (text, finish, usage) = collect(stream).await;
        assert_eq!(text, "Psalm 23");
        assert!(finish.is_none());
        assert!(usage.is_none());
    }

    #[test]
    fn test_sse_decoder_keeps_multibyte_split() {
        let event = delta_event("Élan");
        let bytes = event.as_bytes();
        let split = event.find('É').unwrap() + 1;

        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&bytes[..split]).is_empty());

        let chunks = decoder.push(&bytes[split..]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().delta.as_deref(), Some("Élan"));
    }

    #[test]
    fn test_parse_finish_reason() {
        assert_eq!(parse_finish_reason("length"), FinishReason::Length);
        assert_eq!(parse_finish_reason("unknown"), FinishReason::Stop);
    }

    #[test]
    fn test_parse_sse_line_ignores_done_and_comments() {
        assert!(parse_sse_line("data: [DONE]").is_empty());
        assert!(parse_sse_line(": keep-alive").is_empty());
        assert!(parse_sse_line("data: {not json").is_empty());
    }
}
