/// Why the upstream stopped producing text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Cut off at the upstream token limit
    Length,
    ContentFilter,
}

impl FinishReason {
    /// Whether the text ended before the model was done
    pub fn is_truncated(&self) -> bool {
        !matches!(self, Self::Stop)
    }
}

/// Token accounting reported by the upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A complete generation
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Model that answered, as reported upstream
    pub model: String,
    pub content: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl LlmResponse {
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            content: content.into(),
            finish_reason: None,
            usage: None,
        }
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// One event of a streamed generation
///
/// Text arrives in `delta`; the closing events carry the finish reason and,
/// when the upstream reports it, token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub delta: Option<String>,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

impl StreamChunk {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn finished(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Self::default()
        }
    }

    pub fn usage(usage: Usage) -> Self {
        Self {
            usage: Some(usage),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation() {
        assert!(!FinishReason::Stop.is_truncated());
        assert!(FinishReason::Length.is_truncated());
        assert!(FinishReason::ContentFilter.is_truncated());
    }

    #[test]
    fn test_stream_chunk_constructors() {
        assert_eq!(StreamChunk::delta("Hi").delta.as_deref(), Some("Hi"));
        assert_eq!(
            StreamChunk::finished(FinishReason::Length).finish_reason,
            Some(FinishReason::Length)
        );
        assert!(StreamChunk::usage(Usage::default()).delta.is_none());
    }
}
