//! Response shaping.
//!
//! [`ResponseEnvelope`] is the only thing a caller ever sees. On success every
//! data field is populated; on failure only `error` is, so no partial result
//! can leak out of a failed pipeline run.
use std::fmt;

use ingest::{ControlParameters, ValidationKind};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Stable, machine-readable failure category.
///
/// The serialized names are a contract with callers and never change;
/// messages may.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    EmptyInput,
    FileTooLarge,
    UnsupportedFileType,
    DecodeError,
    InvalidParameter,
    RateLimitExceeded,
    BadUpstreamRequest,
    UpstreamUnavailable,
    ConfigurationError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::EmptyInput,
        ErrorKind::FileTooLarge,
        ErrorKind::UnsupportedFileType,
        ErrorKind::DecodeError,
        ErrorKind::InvalidParameter,
        ErrorKind::RateLimitExceeded,
        ErrorKind::BadUpstreamRequest,
        ErrorKind::UpstreamUnavailable,
        ErrorKind::ConfigurationError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::EmptyInput => "EMPTY_INPUT",
            ErrorKind::FileTooLarge => "FILE_TOO_LARGE",
            ErrorKind::UnsupportedFileType => "UNSUPPORTED_FILE_TYPE",
            ErrorKind::DecodeError => "DECODE_ERROR",
            ErrorKind::InvalidParameter => "INVALID_PARAMETER",
            ErrorKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorKind::BadUpstreamRequest => "BAD_UPSTREAM_REQUEST",
            ErrorKind::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorKind::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// Caused by the caller's input rather than by the service.
    pub fn is_client_error(self) -> bool {
        matches!(
            self,
            ErrorKind::EmptyInput
                | ErrorKind::FileTooLarge
                | ErrorKind::UnsupportedFileType
                | ErrorKind::DecodeError
                | ErrorKind::InvalidParameter
                | ErrorKind::RateLimitExceeded
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ValidationKind> for ErrorKind {
    fn from(kind: ValidationKind) -> Self {
        match kind {
            ValidationKind::EmptyInput => ErrorKind::EmptyInput,
            ValidationKind::FileTooLarge => ErrorKind::FileTooLarge,
            ValidationKind::UnsupportedFileType => ErrorKind::UnsupportedFileType,
            ValidationKind::DecodeError => ErrorKind::DecodeError,
            ValidationKind::InvalidParameter => ErrorKind::InvalidParameter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    /// Seconds until a retry can succeed. Only set for `RATE_LIMIT_EXCEEDED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ControlParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ResponseEnvelope {
    pub fn success(
        original_text: String,
        processed_text: String,
        parameters: ControlParameters,
    ) -> Self {
        Self {
            success: true,
            original_text: Some(original_text),
            processed_text: Some(processed_text),
            parameters: Some(parameters),
            error: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            original_text: None,
            processed_text: None,
            parameters: None,
            error: Some(ErrorBody {
                kind,
                message: message.into(),
                retry_after_secs: None,
            }),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        self.error.as_ref().and_then(|e| e.retry_after_secs)
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub original_text: String,
    pub processed_text: String,
    /// The validated values, not the raw input.
    pub parameters: ControlParameters,
    /// Backend calls made for this request.
    pub attempts: u32,
    /// Fingerprint of the instruction payload that was sent.
    pub instruction_fingerprint: String,
}

/// Maps a pipeline outcome onto the external response shape.
pub fn assemble(outcome: Result<Processed, PipelineError>) -> ResponseEnvelope {
    match outcome {
        Ok(processed) => ResponseEnvelope::success(
            processed.original_text,
            processed.processed_text,
            processed.parameters,
        ),
        Err(err) => {
            let mut envelope = ResponseEnvelope::failure(err.kind(), err.to_string());
            if let Some(body) = envelope.error.as_mut() {
                body.retry_after_secs = err.retry_after_secs();
            }
            envelope
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::ValidationError;
    use serde_json::json;

    fn params() -> ControlParameters {
        ControlParameters {
            faithfulness: 7,
            human_like: 5,
            ai_like: 2,
            formality: 9,
        }
    }

    #[test]
    fn success_envelope_has_every_field() {
        let envelope = assemble(Ok(Processed {
            original_text: "before".into(),
            processed_text: "after".into(),
            parameters: params(),
            attempts: 1,
            instruction_fingerprint: "abc".into(),
        }));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": true,
                "original_text": "before",
                "processed_text": "after",
                "parameters": {"faithfulness": 7, "human_like": 5, "ai_like": 2, "formality": 9}
            })
        );
    }

    #[test]
    fn failure_envelope_omits_data_fields() {
        let envelope = assemble(Err(PipelineError::Validation(ValidationError::EmptyInput)));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"]["kind"], json!("EMPTY_INPUT"));
        assert!(value.get("original_text").is_none());
        assert!(value.get("processed_text").is_none());
        assert!(value.get("parameters").is_none());
        assert!(value["error"].get("retry_after_secs").is_none());
    }

    #[test]
    fn kinds_serialize_as_their_wire_names() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, json!(kind.as_str()));
        }
    }

    #[test]
    fn validation_kinds_map_one_to_one() {
        assert_eq!(
            ErrorKind::from(ValidationKind::DecodeError),
            ErrorKind::DecodeError
        );
        assert_eq!(
            ErrorKind::from(ValidationKind::InvalidParameter).as_str(),
            "INVALID_PARAMETER"
        );
    }
}
