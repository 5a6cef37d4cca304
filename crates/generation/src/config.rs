use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable consulted when no credential is configured.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Backoff policy for retryable backend failures.
///
/// `max_attempts` counts every call, the first one included, so the default
/// of 3 means at most two retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Add 0-50% random jitter on top of each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = duration_millis(delay);
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = duration_millis(delay);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Settings for the generation backend and the retrying client.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API, without the `/chat/completions` suffix.
    pub api_base_url: String,
    /// Bearer credential. Falls back to `OPENAI_API_KEY` via [`with_env_credential`](Self::with_env_credential).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound for a single backend call, connect to last byte.
    pub attempt_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            attempt_timeout_secs: 30,
            connect_timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

// Manual impl keeps the credential out of logs.
impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("attempt_timeout_secs", &self.attempt_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationConfigError {
    #[error("api_base_url must be an http(s) URL, got {0:?}")]
    InvalidBaseUrl(String),
    #[error("model must not be empty")]
    EmptyModel,
    #[error("max_tokens must be at least 1")]
    ZeroMaxTokens,
    #[error("temperature must be within 0.0..=2.0, got {0}")]
    InvalidTemperature(f32),
    #[error("attempt_timeout_secs must be at least 1")]
    ZeroTimeout,
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("retry.base_delay_ms ({base}) must not exceed retry.max_delay_ms ({max})")]
    DelayOrder { base: u64, max: u64 },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl GenerationConfig {
    /// The credential, if one is set and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Fills a missing credential from `OPENAI_API_KEY`.
    pub fn with_env_credential(mut self) -> Self {
        if self.credential().is_none() {
            self.api_key = std::env::var(API_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }
        self
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base_url.trim_end_matches('/'))
    }

    /// Checks structural settings. A missing credential is not an error
    /// here: it is reported per request as a configuration failure.
    pub fn validate(&self) -> Result<(), GenerationConfigError> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GenerationConfigError::InvalidBaseUrl(self.api_base_url.clone()));
        }
        if self.model.trim().is_empty() {
            return Err(GenerationConfigError::EmptyModel);
        }
        if self.max_tokens == 0 {
            return Err(GenerationConfigError::ZeroMaxTokens);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GenerationConfigError::InvalidTemperature(self.temperature));
        }
        if self.attempt_timeout_secs == 0 {
            return Err(GenerationConfigError::ZeroTimeout);
        }
        if self.retry.max_attempts == 0 {
            return Err(GenerationConfigError::ZeroAttempts);
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(GenerationConfigError::DelayOrder {
                base: self.retry.base_delay_ms,
                max: self.retry.max_delay_ms,
            });
        }
        Ok(())
    }
}
