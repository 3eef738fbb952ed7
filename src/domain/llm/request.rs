use super::Message;

/// Parameters for a text generation call
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub stream: bool,
}

impl LlmRequest {
    pub fn builder() -> LlmRequestBuilder {
        LlmRequestBuilder::default()
    }
}

/// Builder for LlmRequest
#[derive(Debug, Default)]
pub struct LlmRequestBuilder {
    request: LlmRequest,
}

impl LlmRequestBuilder {
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.request.messages.push(Message::system(content));
        self
    }

    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.request.messages.push(Message::user(content));
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.request.temperature = Some(temp);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.request.stream = stream;
        self
    }

    pub fn build(self) -> LlmRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = LlmRequest::builder()
            .system("You write short stories")
            .user("A fox and a crow")
            .temperature(0.7)
            .build();

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content_text(), "You write short stories");
        assert_eq!(request.temperature, Some(0.7));
        assert!(!request.stream);
    }
}
