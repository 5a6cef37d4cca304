use async_trait::async_trait;
use prompt::InstructionPayload;

use crate::error::BackendError;

/// A remote text generation service.
///
/// One call is one attempt: implementations must not retry internally and
/// must report failures through the [`BackendError`] classification so that
/// [`GenerationClient`](crate::GenerationClient) can apply its policy.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Sends the payload and returns the raw completion text.
    async fn complete(&self, payload: &InstructionPayload) -> Result<String, BackendError>;

    /// Short name for logs and metrics.
    fn name(&self) -> &str;

    /// Whether the backend has what it needs to make calls at all.
    fn is_configured(&self) -> bool {
        true
    }
}
