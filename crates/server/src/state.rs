use crate::config::ServerConfig;
use limiter::WindowKind;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use retone::{ErrorKind, Pipeline, PipelineMetrics};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// The rewrite pipeline, shared across requests
    pub pipeline: Arc<Pipeline>,

    /// Prometheus render handle, present when metrics are enabled
    pub prometheus: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state with the OpenAI backend
    ///
    /// Installs the global Prometheus recorder when metrics are enabled.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let mut pipeline = Pipeline::from_config(&config.pipeline)?;

        let prometheus = if config.metrics_enabled {
            install_prometheus()
        } else {
            None
        };
        if prometheus.is_some() {
            pipeline = pipeline.with_metrics(Arc::new(PrometheusMetrics));
        }

        Ok(Self::with_pipeline(config, pipeline, prometheus))
    }

    /// Wraps an already wired pipeline.
    pub fn with_pipeline(
        config: ServerConfig,
        pipeline: Pipeline,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            prometheus,
        }
    }
}

fn install_prometheus() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(err) => {
            tracing::warn!(error = %err, "prometheus_recorder_unavailable");
            None
        }
    }
}

/// Forwards pipeline observations to the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetrics;

impl PipelineMetrics for PrometheusMetrics {
    fn record_validation(&self, latency: Duration, result: Result<(), ErrorKind>) {
        let outcome = match result {
            Ok(()) => "ok",
            Err(kind) => kind.as_str(),
        };
        metrics::counter!("retone_validation_total", "outcome" => outcome).increment(1);
        metrics::histogram!("retone_validation_seconds").record(latency.as_secs_f64());
    }

    fn record_admission(&self, result: Result<(), WindowKind>) {
        let (decision, window) = match result {
            Ok(()) => ("admitted", "none"),
            Err(window) => ("denied", window.as_str()),
        };
        metrics::counter!("retone_admission_total", "decision" => decision, "window" => window)
            .increment(1);
    }

    fn record_generation(&self, latency: Duration, result: Result<u32, ErrorKind>) {
        match result {
            Ok(attempts) => {
                metrics::counter!("retone_generation_total", "outcome" => "ok").increment(1);
                metrics::histogram!("retone_generation_attempts").record(f64::from(attempts));
            }
            Err(kind) => {
                metrics::counter!("retone_generation_total", "outcome" => kind.as_str())
                    .increment(1);
            }
        }
        metrics::histogram!("retone_generation_seconds").record(latency.as_secs_f64());
    }
}
