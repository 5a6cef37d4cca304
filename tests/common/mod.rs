#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use retone::generation::{BackendError, GenerationBackend, GenerationClient, RetryConfig};
use retone::limiter::{RateLimiter, WindowKind};
use retone::prompt::InstructionPayload;
use retone::{ErrorKind, Pipeline, PipelineMetrics, ProcessRequest, RetoneConfig, UploadedFile};

pub enum Step {
    Hang,
    Fail(BackendError),
    Reply(&'static str),
}

/// Backend double that records every payload it is sent.
///
/// Scripted steps are consumed in order; once they run out every call
/// answers with a canned rewrite.
pub struct MockBackend {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    payloads: Mutex<Vec<InstructionPayload>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub fn scripted(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<InstructionPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn complete(&self, payload: &InstructionPayload) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.clone());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Reply(text)) => Ok(text.to_string()),
            None => Ok(format!("  Rewritten ({} chars).\n", payload.user.len())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_base_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(20))
}

pub fn pipeline_with(backend: Arc<MockBackend>, config: &RetoneConfig) -> Pipeline {
    let client = GenerationClient::new(backend, fast_retry(), Duration::from_secs(30));
    Pipeline::new(
        config,
        Arc::new(RateLimiter::new(config.limiter)),
        Arc::new(client),
    )
}

pub fn pipeline(backend: Arc<MockBackend>) -> Pipeline {
    pipeline_with(backend, &RetoneConfig::default())
}

pub fn text_request(text: &str, sliders: [&str; 4]) -> ProcessRequest {
    let mut request = ProcessRequest::default();
    request.input.text_input = Some(text.to_string());
    request.parameters.faithfulness = Some(sliders[0].into());
    request.parameters.human_like = Some(sliders[1].into());
    request.parameters.ai_like = Some(sliders[2].into());
    request.parameters.formality = Some(sliders[3].into());
    request
}

pub fn file_request(filename: &str, bytes: &[u8], sliders: [&str; 4]) -> ProcessRequest {
    let mut request = text_request("", sliders);
    request.input.text_input = None;
    request.input.file = Some(UploadedFile::new(filename, bytes.to_vec()));
    request
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub validations: Mutex<Vec<Result<(), ErrorKind>>>,
    pub admissions: Mutex<Vec<Result<(), WindowKind>>>,
    pub generations: Mutex<Vec<Result<u32, ErrorKind>>>,
}

impl PipelineMetrics for RecordingMetrics {
    fn record_validation(&self, _latency: Duration, result: Result<(), ErrorKind>) {
        self.validations.lock().unwrap().push(result);
    }

    fn record_admission(&self, result: Result<(), WindowKind>) {
        self.admissions.lock().unwrap().push(result);
    }

    fn record_generation(&self, _latency: Duration, result: Result<u32, ErrorKind>) {
        self.generations.lock().unwrap().push(result);
    }
}
