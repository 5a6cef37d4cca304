//! Error types produced by the ingest crate.
//!
//! Every rejection carries a [`ValidationKind`], the stable machine-readable
//! sub-kind that callers (and the response envelope) switch on. The
//! `Display` text is for humans and may be reworded without notice.
//!
//! | Error | Kind |
//! |-------|------|
//! | [`EmptyInput`](ValidationError::EmptyInput) | `EMPTY_INPUT` |
//! | [`FileTooLarge`](ValidationError::FileTooLarge) | `FILE_TOO_LARGE` |
//! | [`TextTooLong`](ValidationError::TextTooLong) | `FILE_TOO_LARGE` |
//! | [`UnsupportedFileType`](ValidationError::UnsupportedFileType) | `UNSUPPORTED_FILE_TYPE` |
//! | [`Decode`](ValidationError::Decode) | `DECODE_ERROR` |
//! | [`InvalidParameters`](ValidationError::InvalidParameters) | `INVALID_PARAMETER` |
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ParameterField;

/// Stable sub-kind of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationKind {
    EmptyInput,
    FileTooLarge,
    UnsupportedFileType,
    DecodeError,
    InvalidParameter,
}

impl ValidationKind {
    /// Wire representation, identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationKind::EmptyInput => "EMPTY_INPUT",
            ValidationKind::FileTooLarge => "FILE_TOO_LARGE",
            ValidationKind::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            ValidationKind::DecodeError => "DECODE_ERROR",
            ValidationKind::InvalidParameter => "INVALID_PARAMETER",
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-caused rejection of a request's text or parameters.
///
/// These are never retried. The enum is `#[non_exhaustive]`; match on
/// [`ValidationError::kind`] when only the category matters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// Neither inline text nor a usable file was supplied, or the chosen
    /// source is blank after trimming.
    #[error("please provide text input or upload a text file")]
    EmptyInput,

    /// The uploaded file is larger than the configured byte limit.
    #[error("file is {size} bytes; the maximum is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    /// The canonical text exceeds the configured character limit.
    #[error("text is {chars} characters long; the maximum is {limit} characters")]
    TextTooLong { chars: usize, limit: usize },

    /// The uploaded file's extension is not in the allowlist.
    #[error("file {filename:?} is not an accepted type; allowed extensions: {allowed}")]
    UnsupportedFileType { filename: String, allowed: String },

    /// The uploaded bytes are not valid text.
    #[error("file must be valid UTF-8 text: {0}")]
    Decode(String),

    /// One or more control parameters failed validation.
    #[error("{}", describe_violations(.0))]
    InvalidParameters(Vec<ParameterViolation>),
}

impl ValidationError {
    /// Stable sub-kind for this error.
    pub fn kind(&self) -> ValidationKind {
        match self {
            ValidationError::EmptyInput => ValidationKind::EmptyInput,
            ValidationError::FileTooLarge { .. } | ValidationError::TextTooLong { .. } => {
                ValidationKind::FileTooLarge
            }
            ValidationError::UnsupportedFileType { .. } => ValidationKind::UnsupportedFileType,
            ValidationError::Decode(_) => ValidationKind::DecodeError,
            ValidationError::InvalidParameters(_) => ValidationKind::InvalidParameter,
        }
    }

    /// Fields named by an [`InvalidParameters`](ValidationError::InvalidParameters)
    /// error, in canonical field order. Empty for every other variant.
    pub fn invalid_fields(&self) -> Vec<ParameterField> {
        match self {
            ValidationError::InvalidParameters(violations) => {
                violations.iter().map(|v| v.field).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A single rejected control parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterViolation {
    pub field: ParameterField,
    pub reason: ViolationReason,
}

/// Why a control parameter was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationReason {
    Missing,
    NotAnInteger(String),
    OutOfRange(i64),
}

impl fmt::Display for ParameterViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (min, max) = (crate::params::PARAM_MIN, crate::params::PARAM_MAX);
        match &self.reason {
            ViolationReason::Missing => write!(f, "{} is required", self.field),
            ViolationReason::NotAnInteger(raw) => {
                write!(f, "{} must be a whole number, got {raw:?}", self.field)
            }
            ViolationReason::OutOfRange(value) => write!(
                f,
                "{} must be between {min} and {max}, got {value}",
                self.field
            ),
        }
    }
}

fn describe_violations(violations: &[ParameterViolation]) -> String {
    let parts: Vec<String> = violations.iter().map(ToString::to_string).collect();
    format!("invalid parameters: {}", parts.join("; "))
}
