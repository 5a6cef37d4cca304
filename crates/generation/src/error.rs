use std::time::Duration;

use thiserror::Error;

/// What a single backend call can fail with.
///
/// Backends classify their own failures; the retrying client only looks at
/// the variant to decide whether another attempt is worthwhile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend is throttling us. `retry_after` carries its hint, if any.
    #[error("backend rate limited the request")]
    RateLimited { retry_after: Option<Duration> },
    /// The backend rejected the payload itself.
    #[error("backend rejected the request: {0}")]
    InvalidRequest(String),
    /// Connect failure, timeout or a transient server-side error.
    #[error("network failure: {0}")]
    Network(String),
    /// The credential was rejected.
    #[error("backend rejected the credential: {0}")]
    Auth(String),
    /// No credential is configured, so no call was made.
    #[error("backend credential is not configured")]
    MissingCredential,
    /// The backend answered, but not with a usable completion.
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Rate limiting and network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::RateLimited { .. } | BackendError::Network(_)
        )
    }
}

/// Final outcome of a failed [`GenerationClient::generate`](crate::GenerationClient::generate).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GenerationFailure {
    /// Not retried. Carries the backend's reason.
    #[error("the generation backend rejected the request: {0}")]
    BadUpstreamRequest(String),
    /// Retryable failures exhausted the attempt budget, or the backend
    /// returned something unusable.
    #[error("the generation backend is unavailable after {attempts} attempt(s): {reason}")]
    UpstreamUnavailable { attempts: u32, reason: String },
    /// Operator problem: missing or rejected credential.
    #[error("the generation backend is misconfigured: {0}")]
    Configuration(String),
    /// The caller went away before the call finished.
    #[error("request cancelled")]
    Cancelled,
}
