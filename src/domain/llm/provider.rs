use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::{LlmRequest, LlmResponse, StreamChunk};
use crate::domain::DomainError;

/// Stream type for generation responses
pub type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, DomainError>> + Send>>;

/// A chat completions upstream
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Generate the whole answer in one response
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Generate the answer as a stream of chunks
    async fn chat_stream(
        &self,
        model: &str,
        request: LlmRequest,
    ) -> Result<LlmStream, DomainError>;
}
