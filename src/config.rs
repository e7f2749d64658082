use crate::dispatch::RetryPolicy;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Chat-completion endpoint used when `LLM_API_URL` is not provided.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1";

/// Ordered fallback models used when `LLM_MODELS` is not provided.
pub const DEFAULT_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.2-90b-text-preview",
    "llama-3.1-70b-versatile",
    "llama-3-70b-8192",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

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

/// Runtime configuration for the docbrief server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Credential for the remote inference API.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible chat-completions endpoint.
    pub api_url: String,
    /// Ordered list of candidate models, most preferred first.
    pub models: Vec<String>,
    /// Retry attempts granted to each backend beyond the initial call.
    pub max_retries_per_backend: u32,
    /// Starting backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any computed or server-suggested wait, in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier applied to the backoff delay after each attempt.
    pub backoff_multiplier: f64,
    /// Minimum spacing between consecutive remote calls, in milliseconds.
    pub min_request_interval_ms: u64,
    /// Fixed wait before retrying after a timeout or transport failure, in milliseconds.
    pub transport_retry_delay_ms: u64,
    /// Pause between finishing one queued item and starting the next, in milliseconds.
    pub inter_item_pause_ms: u64,
    /// Per-call timeout for the remote API, in seconds.
    pub request_timeout_secs: u64,
    /// Optional override for the adaptive chunk size selection.
    pub chunk_size: Option<usize>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Append target for file logging.
    pub log_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let models = match load_env_optional("LLM_MODELS") {
            Some(raw) => {
                let parsed: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect();
                if parsed.is_empty() {
                    return Err(ConfigError::InvalidValue("LLM_MODELS".to_string()));
                }
                parsed
            }
            None => DEFAULT_MODELS.iter().map(|model| (*model).to_string()).collect(),
        };

        Ok(Self {
            api_key: load_env("LLM_API_KEY")?,
            api_url: load_env_optional("LLM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            models,
            max_retries_per_backend: load_parsed("LLM_MAX_RETRIES", 5)?,
            base_delay_ms: load_parsed("LLM_BASE_DELAY_MS", 1_000)?,
            max_delay_ms: load_parsed("LLM_MAX_DELAY_MS", 60_000)?,
            backoff_multiplier: load_parsed("LLM_BACKOFF_MULTIPLIER", 2.0)?,
            min_request_interval_ms: load_parsed("LLM_MIN_REQUEST_INTERVAL_MS", 100)?,
            transport_retry_delay_ms: load_parsed("LLM_TRANSPORT_RETRY_DELAY_MS", 2_000)?,
            inter_item_pause_ms: load_parsed("LLM_INTER_ITEM_PAUSE_MS", 50)?,
            request_timeout_secs: load_parsed("LLM_REQUEST_TIMEOUT_SECS", 30)?,
            chunk_size: load_env_optional("CHUNK_SIZE")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("CHUNK_SIZE".to_string()))
                })
                .transpose()?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            log_file: load_env_optional("DOCBRIEF_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs/docbrief.log")),
        })
    }

    /// Build the dispatcher retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries_per_backend: self.max_retries_per_backend,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            min_request_interval: Duration::from_millis(self.min_request_interval_ms),
            transport_retry_delay: Duration::from_millis(self.transport_retry_delay_ms),
            inter_item_pause: Duration::from_millis(self.inter_item_pause_ms),
        }
    }

    /// Per-call timeout applied to each remote request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        api_url = %config.api_url,
        models = config.models.len(),
        max_retries = config.max_retries_per_backend,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
