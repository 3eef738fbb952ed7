//! Generation service - free-text prompts relayed to the completion upstream

use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use futures::{Stream, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::config::GenerationConfig;
use crate::domain::{DomainError, FinishReason, LlmProvider, LlmRequest, StreamChunk, Usage};
use crate::infrastructure::llm::{HttpClient, OpenAiProvider};
use crate::infrastructure::observability::{record_generation_request, record_generation_tokens};

/// Incremental text deltas
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

/// Text generation over a single upstream model
#[derive(Debug)]
pub struct GenerationService {
    provider: Arc<dyn LlmProvider>,
    model: String,
    system_prompt: Option<String>,
    temperature: Option<f32>,
}

impl GenerationService {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: None,
            temperature: None,
        }
    }

    /// Build the OpenAI-backed service, or `None` when no credential is set
    pub fn from_config(config: &GenerationConfig) -> Result<Option<Self>, DomainError> {
        let Some(api_key) = config.api_key() else {
            info!("No generation API key configured, /api/ai disabled");
            return Ok(None);
        };

        let client = HttpClient::with_timeout(config.timeout())?;
        let provider = OpenAiProvider::with_base_url(client, api_key, config.base_url.as_str());

        let mut service = Self::new(Arc::new(provider), config.model.as_str())
            .with_system_prompt(config.system_prompt.as_str());

        if let Some(temperature) = config.temperature {
            service = service.with_temperature(temperature);
        }

        Ok(Some(service))
    }

    /// Blank prompts are ignored
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str, stream: bool) -> Result<LlmRequest, DomainError> {
        if prompt.trim().is_empty() {
            return Err(DomainError::validation("Prompt is required"));
        }

        let mut builder = LlmRequest::builder();

        if let Some(ref system) = self.system_prompt {
            builder = builder.system(system.as_str());
        }

        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }

        Ok(builder.user(prompt).stream(stream).build())
    }

    /// Complete a prompt in one response
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    pub async fn generate(&self, prompt: &str) -> Result<String, DomainError> {
        let request = self.request(prompt, false)?;
        let started = Instant::now();

        let result = self.provider.chat(&self.model, request).await;
        record_generation_request(result.is_ok(), started.elapsed());

        match result {
            Ok(response) => {
                debug!(upstream_model = %response.model, "Generation completed");
                record_completion(response.finish_reason, response.usage);
                Ok(response.content)
            }
            Err(e) => {
                error!(error = %e, "Generation request failed");
                Err(e)
            }
        }
    }

    /// Complete a prompt as a stream of text deltas
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    pub async fn generate_stream(&self, prompt: &str) -> Result<TextStream, DomainError> {
        let request = self.request(prompt, true)?;
        let started = Instant::now();

        let result = self.provider.chat_stream(&self.model, request).await;
        record_generation_request(result.is_ok(), started.elapsed());

        let chunks = result.inspect_err(|e| error!(error = %e, "Generation stream failed to open"))?;

        let deltas = chunks.filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) => text_delta(chunk).map(Ok),
                Err(e) => {
                    error!(error = %e, "Generation stream interrupted");
                    Some(Err(e))
                }
            }
        });

        Ok(Box::pin(deltas))
    }
}

/// Text carried by a chunk; closing chunks are accounted for and dropped
fn text_delta(chunk: StreamChunk) -> Option<String> {
    if chunk.finish_reason.is_some() || chunk.usage.is_some() {
        record_completion(chunk.finish_reason, chunk.usage);
    }

    chunk.delta.filter(|d| !d.is_empty())
}

fn record_completion(finish_reason: Option<FinishReason>, usage: Option<Usage>) {
    if let Some(reason) = finish_reason.filter(FinishReason::is_truncated) {
        warn!(finish_reason = ?reason, "Generation ended early");
    }

    if let Some(usage) = usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Generation token usage"
        );
        record_generation_tokens(usage.prompt_tokens, usage.completion_tokens);
    }
}
