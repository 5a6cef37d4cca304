use std::fmt::Write as _;

use ingest::{ControlParameters, ParameterField, ValidatedInput};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::PromptConfig;
use crate::fragments::{fragment, heading, Tier, CLOSING, PREAMBLE, TEXT_HEADING};

/// The text and sliders for one pipeline invocation.
///
/// Built once from validated input and never mutated afterwards; the fields
/// are private so the only way to change a request is to build a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    canonical_text: String,
    parameters: ControlParameters,
}

impl GenerationRequest {
    pub fn new(canonical_text: impl Into<String>, parameters: ControlParameters) -> Self {
        Self {
            canonical_text: canonical_text.into(),
            parameters,
        }
    }

    pub fn canonical_text(&self) -> &str {
        &self.canonical_text
    }

    pub fn parameters(&self) -> ControlParameters {
        self.parameters
    }
}

impl From<&ValidatedInput> for GenerationRequest {
    fn from(input: &ValidatedInput) -> Self {
        Self::new(input.payload.canonical_text.clone(), input.parameters)
    }
}

/// The fully composed request for the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstructionPayload {
    /// [`PromptConfig::version`] of the encoder that rendered this payload.
    pub version: u32,
    pub system: String,
    pub user: String,
}

impl InstructionPayload {
    /// SHA-256 hex digest identifying this payload.
    ///
    /// ```text
    /// SHA-256(version_be32 || system || 0x00 || user)
    /// ```
    ///
    /// Byte-identical payloads from the same prompt version always share a
    /// fingerprint, which makes the digest safe to log where the text itself
    /// must not be.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_be_bytes());
        hasher.update(self.system.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.user.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Renders generation requests into instruction payloads.
///
/// Encoding is a pure function of the request and the configuration: there is
/// no clock and no randomness, so equal inputs produce byte-identical output.
///
/// Fragment order is fixed:
///
/// 1. preamble
/// 2. faithfulness
/// 3. human_like
/// 4. ai_like
/// 5. formality
/// 6. the canonical text
/// 7. the closing instruction
#[derive(Debug, Clone, Default)]
pub struct PromptEncoder {
    cfg: PromptConfig,
}

impl PromptEncoder {
    pub fn new(cfg: PromptConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &PromptConfig {
        &self.cfg
    }

    pub fn encode(&self, request: &GenerationRequest) -> InstructionPayload {
        let parameters = request.parameters();
        let mut user = String::with_capacity(request.canonical_text().len() + 1024);
        user.push_str(PREAMBLE);

        for field in ParameterField::ALL {
            let level = parameters.get(field);
            // Writing into a String cannot fail.
            let _ = write!(
                user,
                "\n\n**{} (Level {}/10):**\n{}",
                heading(field),
                level,
                fragment(field, Tier::for_level(level))
            );
        }

        user.push_str("\n\n");
        user.push_str(TEXT_HEADING);
        user.push_str("\n\n");
        user.push_str(request.canonical_text());
        user.push_str("\n\n");
        user.push_str(CLOSING);

        InstructionPayload {
            version: self.cfg.version,
            system: self.cfg.system_prompt.clone(),
            user,
        }
    }
}
