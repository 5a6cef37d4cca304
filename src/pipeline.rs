use std::sync::Arc;
use std::time::Instant;

use generation::{GenerationClient, GenerationConfigError};
use ingest::{IngestConfig, RawInput, RawParameters, ValidatedInput};
use limiter::{ClientIdentity, RateLimiter};
use prompt::{GenerationRequest, InstructionPayload, PromptEncoder};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::config::RetoneConfig;
use crate::error::PipelineError;
use crate::metrics::{MetricsSpan, PipelineMetrics};
use crate::response::{assemble, Processed, ResponseEnvelope};

/// One caller request as handed over by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub input: RawInput,
    pub parameters: RawParameters,
}

/// The request orchestration pipeline.
///
/// ```text
/// ProcessRequest
///   → ingest (text + parameters)      ValidationError
///   → rate limiter (per identity)     RateLimitExceeded
///   → prompt encoder                  (infallible)
///   → generation client               GenerationFailure
///   → response assembler
/// ResponseEnvelope
/// ```
///
/// Stages run strictly in this order and the first failure ends the run, so
/// a rejected request never reaches the limiter or the backend. The limiter
/// is the only state shared between concurrent runs; everything else is
/// owned by the run that created it.
pub struct Pipeline {
    ingest: IngestConfig,
    limiter: Arc<RateLimiter>,
    encoder: PromptEncoder,
    client: Arc<GenerationClient>,
    metrics: Option<Arc<dyn PipelineMetrics>>,
}

impl Pipeline {
    /// Wires a pipeline from configuration with the OpenAI backend.
    pub fn from_config(cfg: &RetoneConfig) -> Result<Self, GenerationConfigError> {
        let client = GenerationClient::from_config(&cfg.generation)?;
        Ok(Self::new(
            cfg,
            Arc::new(RateLimiter::new(cfg.limiter)),
            Arc::new(client),
        ))
    }

    /// Wires a pipeline around an existing limiter and client.
    pub fn new(cfg: &RetoneConfig, limiter: Arc<RateLimiter>, client: Arc<GenerationClient>) -> Self {
        Self {
            ingest: cfg.ingest.clone(),
            limiter,
            encoder: PromptEncoder::new(cfg.prompt.clone()),
            client,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn client(&self) -> &Arc<GenerationClient> {
        &self.client
    }

    pub fn ingest_config(&self) -> &IngestConfig {
        &self.ingest
    }

    /// Renders the instruction payload a request would be sent with.
    pub fn encode(&self, request: &GenerationRequest) -> InstructionPayload {
        self.encoder.encode(request)
    }

    /// Runs a request to completion and returns the response envelope.
    pub async fn process(&self, identity: &ClientIdentity, request: ProcessRequest) -> ResponseEnvelope {
        self.process_with_cancel(identity, request, &CancellationToken::new())
            .await
    }

    /// Like [`process`](Self::process), abandoning the backend call as soon as
    /// `cancel` fires.
    pub async fn process_with_cancel(
        &self,
        identity: &ClientIdentity,
        request: ProcessRequest,
        cancel: &CancellationToken,
    ) -> ResponseEnvelope {
        assemble(self.run(identity, request, cancel).await)
    }

    /// Typed form of [`process_with_cancel`](Self::process_with_cancel).
    pub async fn run(
        &self,
        identity: &ClientIdentity,
        request: ProcessRequest,
        cancel: &CancellationToken,
    ) -> Result<Processed, PipelineError> {
        let span = info_span!("retone.process", client = %identity);
        self.run_stages(identity, request, cancel)
            .instrument(span)
            .await
    }

    async fn run_stages(
        &self,
        identity: &ClientIdentity,
        request: ProcessRequest,
        cancel: &CancellationToken,
    ) -> Result<Processed, PipelineError> {
        let started = Instant::now();

        let validated = self.validate(request)?;
        self.admit(identity)?;

        let generation_request = GenerationRequest::from(&validated);
        let payload = self.encoder.encode(&generation_request);
        let instruction_fingerprint = payload.fingerprint();

        let span = MetricsSpan::start(self.metrics.as_ref());
        let generated = match self.client.generate(&payload, cancel).await {
            Ok(generated) => {
                if let Some(span) = span {
                    span.record_generation(Ok(generated.attempts));
                }
                generated
            }
            Err(failure) => {
                let err = PipelineError::from(failure);
                if let Some(span) = span {
                    span.record_generation(Err(err.kind()));
                }
                warn!(kind = %err.kind(), error = %err, "generation_failed");
                return Err(err);
            }
        };

        let original_text = generation_request.canonical_text().to_string();
        let original_len = original_text.chars().count();
        let processed_len = generated.text.chars().count();
        info!(
            original_len,
            processed_len,
            attempts = generated.attempts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "text processed: {original_len} -> {processed_len} chars"
        );

        Ok(Processed {
            original_text,
            processed_text: generated.text,
            parameters: generation_request.parameters(),
            attempts: generated.attempts,
            instruction_fingerprint,
        })
    }

    fn validate(&self, request: ProcessRequest) -> Result<ValidatedInput, PipelineError> {
        let span = MetricsSpan::start(self.metrics.as_ref());
        let result = ingest::ingest(request.input, &request.parameters, &self.ingest);
        if let Some(span) = span {
            span.record_validation(
                result
                    .as_ref()
                    .map(|_| ())
                    .map_err(|err| err.kind().into()),
            );
        }
        Ok(result?)
    }

    fn admit(&self, identity: &ClientIdentity) -> Result<(), PipelineError> {
        let result = self.limiter.try_admit(identity);
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.record_admission(result.as_ref().map(|_| ()).map_err(|denied| denied.window));
        }
        result.map(|_| ()).map_err(PipelineError::from)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ingest", &self.ingest)
            .field("limiter", &self.limiter.config())
            .field("encoder", &self.encoder)
            .field("client", &self.client)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
