//! Retone: a parameterised text rewrite pipeline.
//!
//! A caller supplies text (inline or as an uploaded file) and four sliders
//! (`faithfulness`, `human_like`, `ai_like`, `formality`, each `1..=10`). The
//! [`Pipeline`] validates both, checks the caller's rate-limit budget,
//! renders a deterministic instruction payload, calls the generation backend
//! with bounded retries, and answers with a [`ResponseEnvelope`].
//!
//! The stage crates are re-exported for callers that want to wire things
//! themselves:
//!
//! - [`ingest`] - input normalization and parameter validation
//! - [`limiter`] - per-client admission control
//! - [`prompt`] - instruction encoding
//! - [`generation`] - backend trait, OpenAI backend, retrying client
//!
//! ```no_run
//! use retone::{ClientIdentity, Pipeline, ProcessRequest, RetoneConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = RetoneConfig::from_file("retone.yaml")?;
//! config.generation = config.generation.with_env_credential();
//! let pipeline = Pipeline::from_config(&config)?;
//!
//! let mut request = ProcessRequest::default();
//! request.input.text_input = Some("hey can u send the report".into());
//! request.parameters.faithfulness = Some("8".into());
//! request.parameters.human_like = Some("6".into());
//! request.parameters.ai_like = Some("2".into());
//! request.parameters.formality = Some("9".into());
//!
//! let envelope = pipeline.process(&ClientIdentity::from("198.51.100.4"), request).await;
//! println!("{}", serde_json::to_string_pretty(&envelope)?);
//! # Ok(())
//! # }
//! ```
pub mod config;
mod error;
mod metrics;
mod pipeline;
mod response;

pub use generation;
pub use ingest;
pub use limiter;
pub use prompt;

pub use crate::config::{ConfigLoadError, RetoneConfig};
pub use crate::error::PipelineError;
pub use crate::metrics::PipelineMetrics;
pub use crate::pipeline::{Pipeline, ProcessRequest};
pub use crate::response::{assemble, ErrorBody, ErrorKind, Processed, ResponseEnvelope};

pub use generation::{GenerationBackend, GenerationClient};
pub use ingest::{RawInput, RawParameters, UploadedFile};
pub use limiter::{ClientIdentity, RateLimiter};
