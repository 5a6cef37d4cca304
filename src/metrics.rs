use std::sync::Arc;
use std::time::{Duration, Instant};

use limiter::WindowKind;

use crate::response::ErrorKind;

/// Metrics observer for pipeline stages.
///
/// Injected into [`Pipeline`](crate::Pipeline) at construction; there is no
/// process-wide recorder. Implementations must be cheap, they run inline.
pub trait PipelineMetrics: Send + Sync {
    fn record_validation(&self, latency: Duration, result: Result<(), ErrorKind>);
    fn record_admission(&self, result: Result<(), WindowKind>);
    /// `Ok` carries the number of backend attempts.
    fn record_generation(&self, latency: Duration, result: Result<u32, ErrorKind>);
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start(recorder: Option<&Arc<dyn PipelineMetrics>>) -> Option<Self> {
        recorder.map(|recorder| Self {
            recorder: Arc::clone(recorder),
            start: Instant::now(),
        })
    }

    pub(crate) fn record_validation(self, result: Result<(), ErrorKind>) {
        self.recorder
            .record_validation(self.start.elapsed(), result);
    }

    pub(crate) fn record_generation(self, result: Result<u32, ErrorKind>) {
        self.recorder
            .record_generation(self.start.elapsed(), result);
    }
}
