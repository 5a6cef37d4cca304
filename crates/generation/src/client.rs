use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use prompt::InstructionPayload;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::backend::GenerationBackend;
use crate::backoff::backoff_delay;
use crate::config::{GenerationConfig, GenerationConfigError, RetryConfig};
use crate::error::{BackendError, GenerationFailure};
use crate::openai::OpenAiBackend;

/// A successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// Backend output with surrounding whitespace removed.
    pub text: String,
    /// Backend calls made, the successful one included.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Runs backend calls under a timeout, retry and cancellation policy.
///
/// Retry loop:
///
/// ```text
/// attempt 1..=max_attempts
///   ├─ cancelled?              → Cancelled
///   ├─ call (bounded by attempt_timeout, timeout = network failure)
///   │    ├─ Ok(text)           → Generated { text.trim(), attempts }
///   │    ├─ InvalidRequest     → BadUpstreamRequest
///   │    ├─ Auth / no key      → Configuration
///   │    ├─ Malformed          → UpstreamUnavailable
///   │    └─ RateLimited/Network
///   │         ├─ last attempt  → UpstreamUnavailable
///   │         └─ sleep(backoff), cancellable
/// ```
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryConfig,
    attempt_timeout: Duration,
    auth_rejected: AtomicBool,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("backend", &self.backend.name())
            .field("retry", &self.retry)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("auth_rejected", &self.auth_rejected.load(Ordering::Relaxed))
            .finish()
    }
}

impl GenerationClient {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        retry: RetryConfig,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            retry,
            attempt_timeout,
            auth_rejected: AtomicBool::new(false),
        }
    }

    /// Builds a client around an [`OpenAiBackend`] for `cfg`.
    pub fn from_config(cfg: &GenerationConfig) -> Result<Self, GenerationConfigError> {
        cfg.validate()?;
        let backend = OpenAiBackend::new(cfg)?;
        Ok(Self::new(
            Arc::new(backend),
            cfg.retry,
            cfg.attempt_timeout(),
        ))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// False once the backend has rejected the credential, or when no
    /// credential was configured. Either way every request will fail until
    /// an operator intervenes.
    pub fn is_ready(&self) -> bool {
        self.backend.is_configured() && !self.auth_rejected.load(Ordering::Relaxed)
    }

    pub async fn generate(
        &self,
        payload: &InstructionPayload,
        cancel: &CancellationToken,
    ) -> Result<Generated, GenerationFailure> {
        let start = Instant::now();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(self.cancelled(attempt - 1));
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(attempt)),
                outcome = tokio::time::timeout(self.attempt_timeout, self.backend.complete(payload)) => outcome,
            };

            let err = match outcome {
                Ok(Ok(raw)) => {
                    let text = raw.trim();
                    if text.is_empty() {
                        BackendError::Malformed("completion was empty".into())
                    } else {
                        let generated = Generated {
                            text: text.to_string(),
                            attempts: attempt,
                            elapsed: start.elapsed(),
                        };
                        debug!(
                            backend = self.backend.name(),
                            attempts = attempt,
                            elapsed_ms = generated.elapsed.as_millis() as u64,
                            "generation_succeeded"
                        );
                        return Ok(generated);
                    }
                }
                Ok(Err(err)) => err,
                Err(_) => BackendError::Network(format!(
                    "attempt timed out after {}ms",
                    self.attempt_timeout.as_millis()
                )),
            };

            let hint = match &err {
                BackendError::RateLimited { retry_after } => *retry_after,
                BackendError::Network(_) => None,
                BackendError::InvalidRequest(reason) => {
                    warn!(backend = self.backend.name(), attempt, reason = %reason, "generation_rejected");
                    return Err(GenerationFailure::BadUpstreamRequest(reason.clone()));
                }
                BackendError::Auth(reason) => {
                    self.auth_rejected.store(true, Ordering::Relaxed);
                    error!(
                        backend = self.backend.name(),
                        reason = %reason,
                        "generation backend rejected the credential; every request will fail until it is fixed"
                    );
                    return Err(GenerationFailure::Configuration(
                        "the generation backend rejected the configured credential".into(),
                    ));
                }
                BackendError::MissingCredential => {
                    error!(
                        backend = self.backend.name(),
                        "generation backend credential is not configured"
                    );
                    return Err(GenerationFailure::Configuration(
                        "the generation backend credential is not configured".into(),
                    ));
                }
                BackendError::Malformed(reason) => {
                    warn!(backend = self.backend.name(), attempt, reason = %reason, "generation_malformed");
                    return Err(GenerationFailure::UpstreamUnavailable {
                        attempts: attempt,
                        reason: reason.clone(),
                    });
                }
            };

            if attempt >= max_attempts {
                warn!(
                    backend = self.backend.name(),
                    attempts = attempt,
                    error = %err,
                    "generation_retries_exhausted"
                );
                return Err(GenerationFailure::UpstreamUnavailable {
                    attempts: attempt,
                    reason: err.to_string(),
                });
            }

            let delay = backoff_delay(&self.retry, attempt - 1, hint);
            warn!(
                backend = self.backend.name(),
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "generation_retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(attempt)),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn cancelled(&self, attempts: u32) -> GenerationFailure {
        debug!(backend = self.backend.name(), attempts, "generation_cancelled");
        GenerationFailure::Cancelled
    }
}
