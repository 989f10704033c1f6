use super::http::{build_http_client, send_json};
use super::{SummarizationClient, SummarizationClientError, SummarizationRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Google Generative Language `generateContent` endpoint.
pub struct GeminiSummarizationClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GeminiSummarizationClient {
    /// Client pointed at the public Gemini endpoint.
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, SummarizationClientError> {
        Self::with_base_url(DEFAULT_GEMINI_URL.to_string(), api_key, timeout)
    }

    /// Client pointed at an alternate base URL (proxies, test servers).
    pub fn with_base_url(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, SummarizationClientError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, SummarizationClientError> {
        if let Some(reason) = self.prompt_feedback.and_then(|feedback| feedback.block_reason) {
            return Err(SummarizationClientError::InvalidResponse(format!(
                "prompt blocked by Gemini: {reason}"
            )));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(SummarizationClientError::InvalidResponse(
                "Gemini response carried no candidate text".into(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl SummarizationClient for GeminiSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "contents": [
                { "parts": [ { "text": request.prompt } ] }
            ]
        });

        let call = self
            .http
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&payload);
        let body: GenerateContentResponse = send_json("Gemini", call).await?;

        Ok(body.into_text()?.trim().to_string())
    }
}
