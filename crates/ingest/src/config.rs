//! Configuration types for input normalization.
//!
//! [`IngestConfig`] bounds what the normalizer accepts: how long the canonical
//! text may be, how large an uploaded file may be, and which file extensions
//! are allowed. It is cheap to clone and deserializes from JSON, TOML or YAML.
//!
//! # Quick Start
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("defaults are valid");
//! assert!(config.is_extension_allowed("notes.MD"));
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime limits for the input normalizer.
///
/// # Serialization
///
/// ```json
/// {
///   "max_text_chars": 10000,
///   "max_file_bytes": 16777216,
///   "allowed_extensions": ["txt", "md"]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum number of characters (Unicode scalar values) in the canonical text.
    ///
    /// Applies to inline text and to decoded file content alike.
    ///
    /// Default: `10_000`
    pub max_text_chars: usize,

    /// Maximum size of an uploaded file in bytes, checked before decoding.
    ///
    /// Default: 16 MiB
    pub max_file_bytes: usize,

    /// File extensions accepted for uploads, compared case-insensitively and
    /// without the leading dot.
    ///
    /// Default: `["txt", "md"]`
    pub allowed_extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_text_chars: 10_000,
            max_file_bytes: 16 * 1024 * 1024,
            allowed_extensions: vec!["txt".into(), "md".into()],
        }
    }
}

impl IngestConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// Call once at start-up; the checks are in-memory only.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_text_chars == 0 {
            return Err(ConfigError::ZeroLimit("max_text_chars"));
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::ZeroLimit("max_file_bytes"));
        }
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::NoAllowedExtensions);
        }
        if let Some(bad) = self
            .allowed_extensions
            .iter()
            .find(|ext| ext.trim().is_empty() || ext.starts_with('.'))
        {
            return Err(ConfigError::MalformedExtension(bad.clone()));
        }
        Ok(())
    }

    /// Returns `true` when the filename's extension is in the allowlist.
    ///
    /// A filename without a `.` has no extension and is never allowed.
    pub fn is_extension_allowed(&self, filename: &str) -> bool {
        match file_extension(filename) {
            Some(ext) => self
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

/// Extracts the text after the last `.` of a filename, ignoring any directory part.
pub(crate) fn file_extension(filename: &str) -> Option<&str> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Errors that can occur when validating an [`IngestConfig`].
///
/// These are start-up problems, not request-time problems.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A size limit was configured as zero, which would reject every request.
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    /// The extension allowlist is empty, so no upload could ever be accepted.
    #[error("allowed_extensions must contain at least one extension")]
    NoAllowedExtensions,

    /// An extension is blank or carries a leading dot.
    #[error("malformed extension {0:?}; use bare extensions such as \"txt\"")]
    MalformedExtension(String),
}
