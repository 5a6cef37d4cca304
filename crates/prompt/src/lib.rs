//! Retone prompt encoder.
//!
//! Turns a [`GenerationRequest`] (canonical text plus validated sliders) into
//! the [`InstructionPayload`] sent to the generation backend. Encoding is pure
//! and deterministic, so it can be tested without a model.
//!
//! ```
//! use ingest::ControlParameters;
//! use prompt::{GenerationRequest, PromptEncoder};
//!
//! let request = GenerationRequest::new(
//!     "Thanks for the update.",
//!     ControlParameters { faithfulness: 9, human_like: 6, ai_like: 1, formality: 2 },
//! );
//! let payload = PromptEncoder::default().encode(&request);
//! assert!(payload.user.contains("Faithfulness to Original (Level 9/10)"));
//! assert!(payload.user.contains("Thanks for the update."));
//! ```
mod config;
mod encoder;
mod fragments;

pub use crate::config::{PromptConfig, PromptConfigError, DEFAULT_SYSTEM_PROMPT};
pub use crate::encoder::{GenerationRequest, InstructionPayload, PromptEncoder};
pub use crate::fragments::{fragment, Tier};
