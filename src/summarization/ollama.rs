use super::http::{build_http_client, send_json};
use super::{SummarizationClient, SummarizationClientError, SummarizationRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Client for a local Ollama runtime.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
}

impl OllamaSummarizationClient {
    /// Client pointed at the default local Ollama address.
    pub fn new(timeout: Duration) -> Result<Self, SummarizationClientError> {
        Self::with_base_url(DEFAULT_OLLAMA_URL.to_string(), timeout)
    }

    /// Client pointed at an explicit Ollama base URL.
    pub fn with_base_url(
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, SummarizationClientError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
        });
        let body: OllamaResponse =
            send_json("Ollama", self.http.post(self.endpoint()).json(&payload)).await?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}
