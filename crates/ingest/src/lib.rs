//! Retone ingest layer.
//!
//! This is where a rewrite request enters the pipeline. We take the caller's
//! inline text and/or uploaded file plus the four slider values, check them,
//! and hand back one canonical text and one set of validated parameters.
//!
//! ## What we do here
//!
//! - **Pick the text source** - inline text wins over an uploaded file.
//! - **Check uploads** - extension allowlist, byte limit, UTF-8 decoding.
//! - **Bound the text** - trimmed, non-empty, at most `max_text_chars` characters.
//! - **Validate sliders** - integers in `1..=10`, every bad field reported at once.
//! - **Log outcomes** - structured `tracing` events with lengths, never content.
//!
//! Nothing here touches the disk or the network.
//!
//! ## Example
//!
//! ```
//! use ingest::{ingest, IngestConfig, RawInput, RawParameters};
//!
//! let input = RawInput {
//!     text_input: Some("  Make this sound better.  ".into()),
//!     file: None,
//! };
//! let params = RawParameters {
//!     faithfulness: Some("8".into()),
//!     human_like: Some("6".into()),
//!     ai_like: Some("2".into()),
//!     formality: Some("4".into()),
//! };
//!
//! let validated = ingest(input, &params, &IngestConfig::default()).unwrap();
//! assert_eq!(validated.payload.canonical_text, "Make this sound better.");
//! assert_eq!(validated.parameters.faithfulness, 8);
//! ```
use std::time::Instant;

use tracing::{debug, warn};

mod config;
mod error;
mod params;
mod payload;
mod types;

pub use crate::config::{ConfigError, IngestConfig};
pub use crate::error::{ParameterViolation, ValidationError, ValidationKind, ViolationReason};
pub use crate::params::{validate_parameters, PARAM_MAX, PARAM_MIN};
pub use crate::payload::normalize_input;
pub use crate::types::{
    ControlParameters, ParameterField, RawInput, RawParameters, RawValue, TextEncoding,
    TextPayload, TextSource, UploadedFile,
};

/// Canonical text and parameters that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub payload: TextPayload,
    pub parameters: ControlParameters,
}

/// Normalizes the text input, then validates the parameters.
///
/// Input problems are reported before parameter problems; within the
/// parameters, every invalid field is reported together.
pub fn ingest(
    input: RawInput,
    params: &RawParameters,
    cfg: &IngestConfig,
) -> Result<ValidatedInput, ValidationError> {
    let start = Instant::now();
    let had_text = input.text_input.is_some();
    let had_file = input.file.is_some();

    let result = normalize_input(input, cfg).and_then(|payload| {
        validate_parameters(params).map(|parameters| ValidatedInput {
            payload,
            parameters,
        })
    });

    let elapsed_micros = start.elapsed().as_micros();
    match &result {
        Ok(validated) => debug!(
            source = ?validated.payload.source,
            text_chars = validated.payload.char_len(),
            elapsed_micros,
            "ingest_success"
        ),
        Err(err) => warn!(
            kind = %err.kind(),
            error = %err,
            had_text,
            had_file,
            elapsed_micros,
            "ingest_failure"
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: [&str; 4]) -> RawParameters {
        RawParameters {
            faithfulness: Some(values[0].into()),
            human_like: Some(values[1].into()),
            ai_like: Some(values[2].into()),
            formality: Some(values[3].into()),
        }
    }

    #[test]
    fn ingest_returns_payload_and_parameters() {
        let input = RawInput {
            text_input: None,
            file: Some(UploadedFile::new("draft.txt", b"file body\n".to_vec())),
        };
        let validated =
            ingest(input, &params(["1", "2", "3", "4"]), &IngestConfig::default()).unwrap();
        assert_eq!(validated.payload.source, TextSource::File);
        assert_eq!(validated.parameters.formality, 4);
    }

    #[test]
    fn input_errors_take_precedence_over_parameter_errors() {
        let err = ingest(
            RawInput::default(),
            &params(["0", "0", "0", "0"]),
            &IngestConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ValidationKind::EmptyInput);
    }

    #[test]
    fn parameter_errors_surface_after_valid_input() {
        let input = RawInput {
            text_input: Some("ok".into()),
            file: None,
        };
        let err = ingest(input, &params(["5", "x", "5", "99"]), &IngestConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ValidationKind::InvalidParameter);
        assert_eq!(
            err.invalid_fields(),
            vec![ParameterField::HumanLike, ParameterField::Formality]
        );
    }
}
