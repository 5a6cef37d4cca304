//! YAML configuration for the retone pipeline.
//!
//! All stage configurations live in one file, read once at start-up:
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! ingest:
//!   max_text_chars: 10000
//!   max_file_bytes: 16777216
//!   allowed_extensions: ["txt", "md"]
//!
//! limiter:
//!   short: { limit: 50, period_secs: 3600 }
//!   long: { limit: 200, period_secs: 86400 }
//!   burst: { limit: 10, period_secs: 60 }
//!
//! prompt:
//!   version: 1
//!
//! generation:
//!   api_base_url: "https://api.openai.com/v1"
//!   model: "gpt-4o"
//!   max_tokens: 2000
//!   temperature: 0.7
//!   attempt_timeout_secs: 30
//!   retry:
//!     max_attempts: 3
//!     base_delay_ms: 500
//!     max_delay_ms: 8000
//!     jitter: true
//! ```
//!
//! Every section is optional and falls back to its defaults. The backend
//! credential is deliberately not read from this file; it comes from the
//! environment (`OPENAI_API_KEY`) or the server configuration layer.
use std::fs;
use std::path::Path;

use generation::GenerationConfig;
use ingest::IngestConfig;
use limiter::LimiterConfig;
use prompt::PromptConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error in {section}: {message}")]
    Validation {
        section: &'static str,
        message: String,
    },

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

impl ConfigLoadError {
    fn section(section: &'static str, err: impl std::fmt::Display) -> Self {
        ConfigLoadError::Validation {
            section,
            message: err.to_string(),
        }
    }
}

/// Top-level configuration for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetoneConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub limiter: LimiterConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

impl RetoneConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: RetoneConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }

        self.ingest
            .validate()
            .map_err(|e| ConfigLoadError::section("ingest", e))?;
        self.limiter
            .validate()
            .map_err(|e| ConfigLoadError::section("limiter", e))?;
        self.prompt
            .validate()
            .map_err(|e| ConfigLoadError::section("prompt", e))?;
        self.generation
            .validate()
            .map_err(|e| ConfigLoadError::section("generation", e))?;
        Ok(())
    }
}

impl Default for RetoneConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            ingest: IngestConfig::default(),
            limiter: LimiterConfig::default(),
            prompt: PromptConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
