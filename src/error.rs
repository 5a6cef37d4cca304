use generation::GenerationFailure;
use ingest::ValidationError;
use limiter::RateLimitExceeded;
use thiserror::Error;

use crate::response::ErrorKind;

/// First failure of a pipeline run. The controller stops here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(err) => err.kind().into(),
            PipelineError::RateLimited(_) => ErrorKind::RateLimitExceeded,
            PipelineError::Generation(GenerationFailure::BadUpstreamRequest(_)) => {
                ErrorKind::BadUpstreamRequest
            }
            PipelineError::Generation(GenerationFailure::Configuration(_)) => {
                ErrorKind::ConfigurationError
            }
            // Cancelled requests have no caller left to read the answer; the
            // kind only matters for logs and metrics.
            PipelineError::Generation(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            PipelineError::RateLimited(denied) => Some(denied.retry_after_secs()),
            _ => None,
        }
    }
}
