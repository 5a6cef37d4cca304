use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default system message sent ahead of every instruction.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert writing coach and text editor with deep \
expertise in grammar, style, clarity, and tone. You excel at improving text while respecting the \
author's voice and intent. Follow the given parameters precisely to enhance the provided text with \
professional writing standards.";

/// Configuration for [`PromptEncoder`](crate::PromptEncoder).
///
/// `version` takes part in [`InstructionPayload::fingerprint`](crate::InstructionPayload::fingerprint),
/// so bump it whenever the fragment wording changes. Version 0 is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub version: u32,
    pub system_prompt: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            version: 1,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromptConfigError {
    #[error("prompt version must be >= 1")]
    InvalidVersion,
    #[error("system prompt must not be empty")]
    EmptySystemPrompt,
}

impl PromptConfig {
    pub fn validate(&self) -> Result<(), PromptConfigError> {
        if self.version == 0 {
            return Err(PromptConfigError::InvalidVersion);
        }
        if self.system_prompt.trim().is_empty() {
            return Err(PromptConfigError::EmptySystemPrompt);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PromptConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_reserved_version_and_blank_system_prompt() {
        let cfg = PromptConfig {
            version: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(PromptConfigError::InvalidVersion));

        let cfg = PromptConfig {
            system_prompt: "  ".into(),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(PromptConfigError::EmptySystemPrompt));
    }
}
