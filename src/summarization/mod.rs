//! Summaries of extracted document text produced by a remote generative-text oracle.
//!
//! [`SummarizationClient`] is the transport seam: one implementation per provider, each issuing
//! HTTP requests directly. [`DocumentSummarizer`] owns the prompt template and the character
//! cap, and is what the pipeline receives at construction time.

mod gemini;
mod http;
mod ollama;

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use gemini::GeminiSummarizationClient;
pub use ollama::OllamaSummarizationClient;

/// Default number of leading characters of document text embedded in a prompt.
pub const DEFAULT_SUMMARY_CHAR_LIMIT: usize = 2000;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-latest";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

/// Errors surfaced while requesting a summary from the oracle.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable, timed out, or is not configured.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider answered with an error status.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or carried no text.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Fully rendered prompt.
    pub prompt: String,
}

/// Interface implemented by generative-text providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a response for the prompt using the requested model.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Build a summarization client based on configuration.
pub fn build_summarization_client(
    config: &Config,
) -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> {
    let timeout = Duration::from_secs(config.summary_timeout_secs);
    match config.summarization_provider {
        SummarizationProvider::Gemini => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                SummarizationClientError::ProviderUnavailable("GEMINI_API_KEY is not set".into())
            })?;
            let client = match config.gemini_url.clone() {
                Some(base_url) => {
                    GeminiSummarizationClient::with_base_url(base_url, api_key, timeout)
                }
                None => GeminiSummarizationClient::new(api_key, timeout),
            }?;
            Ok(Arc::new(client))
        }
        SummarizationProvider::Ollama => {
            let client = match config.ollama_url.clone() {
                Some(base_url) => OllamaSummarizationClient::with_base_url(base_url, timeout),
                None => OllamaSummarizationClient::new(timeout),
            }?;
            Ok(Arc::new(client))
        }
    }
}

/// Model used when configuration does not name one.
pub fn default_model(provider: SummarizationProvider) -> &'static str {
    match provider {
        SummarizationProvider::Gemini => DEFAULT_GEMINI_MODEL,
        SummarizationProvider::Ollama => DEFAULT_OLLAMA_MODEL,
    }
}

/// Turns a document name and its extracted text into a short summary.
#[derive(Clone)]
pub struct DocumentSummarizer {
    client: Arc<dyn SummarizationClient>,
    model: String,
    char_limit: usize,
}

impl DocumentSummarizer {
    /// Wrap an already-authenticated client.
    pub fn new(
        client: Arc<dyn SummarizationClient>,
        model: impl Into<String>,
        char_limit: usize,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            char_limit,
        }
    }

    /// Build the client and summarizer described by configuration.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        let client = build_summarization_client(config)?;
        let model = config
            .summarization_model
            .clone()
            .unwrap_or_else(|| default_model(config.summarization_provider).to_string());
        Ok(Self::new(client, model, config.summary_char_limit))
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Summarize one document. The provider's answer is returned trimmed.
    pub async fn summarize(
        &self,
        document_name: &str,
        text: &str,
    ) -> Result<String, SummarizationClientError> {
        let prompt = build_prompt(document_name, text, self.char_limit);
        tracing::debug!(
            document = document_name,
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "Requesting document summary"
        );
        let summary = self
            .client
            .generate_summary(SummarizationRequest {
                model: self.model.clone(),
                prompt,
            })
            .await?;
        Ok(summary.trim().to_string())
    }
}

/// Render the fixed summarization prompt for one document.
///
/// Only the first `char_limit` characters of `text` are embedded.
pub fn build_prompt(document_name: &str, text: &str, char_limit: usize) -> String {
    let excerpt = truncate_chars(text, char_limit);
    format!(
        "\nYou are an assistant specialised in BIM processes.\n\
         You are helping to build a database of historical projects.\n\
         Analyse the following file and summarise its most important points in at most 5 lines:\n\n\
         File: {document_name}\n\
         Content:\n\
         {excerpt}\n"
    )
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted oracle used by pipeline and API tests.

    use super::*;
    use std::sync::Mutex;

    /// Answers every prompt with `summary of <file name>`, or fails for one chosen file.
    #[derive(Default)]
    pub(crate) struct ScriptedClient {
        pub(crate) prompts: Mutex<Vec<String>>,
        pub(crate) fail_for: Option<String>,
    }

    impl ScriptedClient {
        pub(crate) fn failing_for(document: &str) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_for: Some(document.to_string()),
            }
        }

        pub(crate) fn recorded_prompts(&self) -> Vec<String> {
            self.prompts.lock().expect("prompts lock").clone()
        }
    }

    pub(crate) fn document_name(prompt: &str) -> String {
        prompt
            .lines()
            .find_map(|line| line.strip_prefix("File: "))
            .unwrap_or_default()
            .to_string()
    }

    #[async_trait]
    impl SummarizationClient for ScriptedClient {
        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            let name = document_name(&request.prompt);
            self.prompts
                .lock()
                .expect("prompts lock")
                .push(request.prompt);
            if self.fail_for.as_deref() == Some(name.as_str()) {
                return Err(SummarizationClientError::ProviderUnavailable(
                    "scripted outage".into(),
                ));
            }
            Ok(format!("  summary of {name}\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedClient;
    use super::*;

    #[test]
    fn prompt_embeds_name_and_bounded_excerpt() {
        let text = "a".repeat(50);
        let prompt = build_prompt("memoria.pdf", &text, 10);
        assert!(prompt.contains("File: memoria.pdf"));
        assert!(prompt.contains(&format!("Content:\n{}\n", "a".repeat(10))));
        assert!(!prompt.contains(&"a".repeat(11)));
        assert!(prompt.contains("at most 5 lines"));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("ñandú", 3), "ñan");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[tokio::test]
    async fn summarizer_trims_provider_output() {
        let client = Arc::new(ScriptedClient::default());
        let summarizer = DocumentSummarizer::new(client.clone(), "test-model", 2000);

        let summary = summarizer
            .summarize("a.pdf", "contenido")
            .await
            .expect("summary");

        assert_eq!(summary, "summary of a.pdf");
        let prompts = client.recorded_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("contenido"));
    }

    #[tokio::test]
    async fn summarizer_propagates_provider_failure() {
        let client = Arc::new(ScriptedClient::failing_for("a.pdf"));
        let summarizer = DocumentSummarizer::new(client, "test-model", 2000);

        let error = summarizer
            .summarize("a.pdf", "contenido")
            .await
            .expect_err("provider failure");
        assert!(matches!(error, SummarizationClientError::ProviderUnavailable(_)));
    }

    #[test]
    fn default_models_per_provider() {
        assert_eq!(
            default_model(SummarizationProvider::Gemini),
            "gemini-1.5-pro-latest"
        );
        assert_eq!(default_model(SummarizationProvider::Ollama), "llama3.1");
    }
}
