//! Core data model types for the ingest crate.
//!
//! ```text
//! RawInput                          RawParameters
//! ├── text_input: Option<String>    ├── faithfulness: Option<RawValue>
//! └── file: Option<UploadedFile>    ├── human_like:   Option<RawValue>
//!     ├── filename: String          ├── ai_like:      Option<RawValue>
//!     └── bytes: Vec<u8>            └── formality:    Option<RawValue>
//!
//!         ↓ normalize_input()             ↓ validate_parameters()
//!
//! TextPayload                       ControlParameters
//! ├── source: TextSource            ├── faithfulness: u8 (1..=10)
//! ├── encoding: TextEncoding        ├── human_like:   u8
//! └── canonical_text: String        ├── ai_like:      u8
//!                                   └── formality:    u8
//! ```
use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the canonical text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextSource {
    Body,
    File,
}

/// Encoding the raw bytes were decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 with a leading byte-order mark, which is stripped.
    Utf8Bom,
}

/// A file received by the transport layer. The bytes are held in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Browser forms submit an empty file part when nothing was chosen.
    pub(crate) fn is_placeholder(&self) -> bool {
        self.filename.trim().is_empty() && self.bytes.is_empty()
    }
}

/// Unvalidated text input as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInput {
    pub text_input: Option<String>,
    pub file: Option<UploadedFile>,
}

/// Validated, trimmed text that the rest of the pipeline works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextPayload {
    pub source: TextSource,
    pub encoding: TextEncoding,
    pub canonical_text: String,
}

impl TextPayload {
    /// Length of the canonical text in characters.
    pub fn char_len(&self) -> usize {
        self.canonical_text.chars().count()
    }
}

/// The four control sliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterField {
    Faithfulness,
    HumanLike,
    AiLike,
    Formality,
}

impl ParameterField {
    /// Canonical validation and reporting order.
    pub const ALL: [ParameterField; 4] = [
        ParameterField::Faithfulness,
        ParameterField::HumanLike,
        ParameterField::AiLike,
        ParameterField::Formality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParameterField::Faithfulness => "faithfulness",
            ParameterField::HumanLike => "human_like",
            ParameterField::AiLike => "ai_like",
            ParameterField::Formality => "formality",
        }
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter value as it arrived: form fields are text, JSON bodies may
/// carry numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Integer(v) => write!(f, "{v}"),
            RawValue::Float(v) => write!(f, "{v}"),
            RawValue::Text(v) => f.write_str(v),
        }
    }
}

/// Unvalidated control parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawParameters {
    pub faithfulness: Option<RawValue>,
    pub human_like: Option<RawValue>,
    pub ai_like: Option<RawValue>,
    pub formality: Option<RawValue>,
}

impl RawParameters {
    pub fn get(&self, field: ParameterField) -> Option<&RawValue> {
        match field {
            ParameterField::Faithfulness => self.faithfulness.as_ref(),
            ParameterField::HumanLike => self.human_like.as_ref(),
            ParameterField::AiLike => self.ai_like.as_ref(),
            ParameterField::Formality => self.formality.as_ref(),
        }
    }

    pub fn set(&mut self, field: ParameterField, value: Option<RawValue>) {
        let slot = match field {
            ParameterField::Faithfulness => &mut self.faithfulness,
            ParameterField::HumanLike => &mut self.human_like,
            ParameterField::AiLike => &mut self.ai_like,
            ParameterField::Formality => &mut self.formality,
        };
        *slot = value;
    }
}

/// Validated control parameters, each in `1..=10`.
///
/// Only [`validate_parameters`](crate::validate_parameters) constructs these
/// from caller input, so holding one means the values are in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlParameters {
    pub faithfulness: u8,
    pub human_like: u8,
    pub ai_like: u8,
    pub formality: u8,
}

impl ControlParameters {
    pub fn get(&self, field: ParameterField) -> u8 {
        match field {
            ParameterField::Faithfulness => self.faithfulness,
            ParameterField::HumanLike => self.human_like,
            ParameterField::AiLike => self.ai_like,
            ParameterField::Formality => self.formality,
        }
    }
}
