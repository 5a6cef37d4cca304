//! Retone generation client.
//!
//! Sends an [`InstructionPayload`](prompt::InstructionPayload) to a remote
//! text generation backend and turns whatever happens into a typed outcome.
//!
//! - [`GenerationBackend`] is the seam: one call, one classified result.
//! - [`OpenAiBackend`] speaks the OpenAI chat completions protocol.
//! - [`GenerationClient`] wraps a backend with per-attempt timeouts, bounded
//!   exponential backoff and cancellation.
//!
//! Rate limiting and network failures are retried; a rejected payload is
//! reported immediately as [`GenerationFailure::BadUpstreamRequest`]; a
//! rejected or missing credential becomes [`GenerationFailure::Configuration`]
//! and is logged at `error` level, since it breaks every request.
mod backend;
mod backoff;
mod client;
mod config;
mod error;
mod openai;

pub use crate::backend::GenerationBackend;
pub use crate::backoff::backoff_delay;
pub use crate::client::{Generated, GenerationClient};
pub use crate::config::{GenerationConfig, GenerationConfigError, RetryConfig, API_KEY_ENV};
pub use crate::error::{BackendError, GenerationFailure};
pub use crate::openai::OpenAiBackend;
