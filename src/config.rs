use crate::extraction::DEFAULT_PDF_MAX_PAGES;
use crate::summarization::DEFAULT_SUMMARY_CHAR_LIMIT;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

const DEFAULT_SUMMARY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_STAGING_DIR: &str = "proyectos_temporales";
const DEFAULT_EXPORT_DIR: &str = "proyectos_exportados";

/// Runtime configuration for the Pre-BEP intake service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Generative-text backend used to summarize documents.
    pub summarization_provider: SummarizationProvider,
    /// API key forwarded to Gemini. Required when the provider is `gemini`.
    pub gemini_api_key: Option<String>,
    /// Optional override for the Gemini base URL.
    pub gemini_url: Option<String>,
    /// Optional override for the Ollama base URL.
    pub ollama_url: Option<String>,
    /// Optional model identifier; each provider falls back to its own default.
    pub summarization_model: Option<String>,
    /// Number of leading characters of extracted text embedded in each prompt.
    pub summary_char_limit: usize,
    /// Upper bound for a single summarization request, in seconds.
    pub summary_timeout_secs: u64,
    /// Maximum number of documents summarized at the same time.
    pub summary_concurrency: usize,
    /// Number of leading PDF pages read during extraction.
    pub pdf_max_pages: usize,
    /// What the pipeline does when a document cannot be parsed.
    pub extraction_failure_policy: ExtractionFailurePolicy,
    /// Root under which per-project staging trees are written.
    pub staging_dir: PathBuf,
    /// Directory receiving the finished project archives.
    pub export_dir: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Request body limit applied to uploads.
    pub max_upload_bytes: usize,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Google Generative Language API.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

/// Behaviour applied when text extraction fails for a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionFailurePolicy {
    /// Substitute the extractor's fallback text and keep going.
    #[default]
    Fallback,
    /// Stop the run before anything is written.
    Abort,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".into()))?,
            None => SummarizationProvider::Gemini,
        };
        let gemini_api_key = load_env_optional("GEMINI_API_KEY");
        if summarization_provider == SummarizationProvider::Gemini && gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".into()));
        }

        let extraction_failure_policy = match load_env_optional("EXTRACTION_FAILURE_POLICY") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EXTRACTION_FAILURE_POLICY".into()))?,
            None => ExtractionFailurePolicy::default(),
        };

        let summary_concurrency = load_env_parsed("SUMMARY_CONCURRENCY", 1usize)?;
        if summary_concurrency == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CONCURRENCY".into()));
        }
        let pdf_max_pages = load_env_parsed("PDF_MAX_PAGES", DEFAULT_PDF_MAX_PAGES)?;
        if pdf_max_pages == 0 {
            return Err(ConfigError::InvalidValue("PDF_MAX_PAGES".into()));
        }

        Ok(Self {
            summarization_provider,
            gemini_api_key,
            gemini_url: load_env_optional("GEMINI_URL"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL"),
            summary_char_limit: load_env_parsed("SUMMARY_CHAR_LIMIT", DEFAULT_SUMMARY_CHAR_LIMIT)?,
            summary_timeout_secs: load_env_parsed(
                "SUMMARY_TIMEOUT_SECS",
                DEFAULT_SUMMARY_TIMEOUT_SECS,
            )?,
            summary_concurrency,
            pdf_max_pages,
            extraction_failure_policy,
            staging_dir: load_env_optional("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_DIR)),
            export_dir: load_env_optional("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR)),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            max_upload_bytes: load_env_parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for ExtractionFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "abort" => Ok(Self::Abort),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        provider = ?config.summarization_provider,
        model = ?config.summarization_model,
        staging_dir = %config.staging_dir.display(),
        export_dir = %config.export_dir.display(),
        summary_char_limit = config.summary_char_limit,
        summary_concurrency = config.summary_concurrency,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
