//! Text generation endpoint bodies

use serde::{Deserialize, Serialize};

/// `POST /api/ai` body
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    /// Relay the completion as a chunked `text/plain` body
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_defaults_off() {
        let request: GenerateRequest = serde_json::from_str(r#"{"prompt":"Hi"}"#).unwrap();

        assert_eq!(request.prompt, "Hi");
        assert!(!request.stream);
    }
}
