use retone::RetoneConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds, covering every backend retry
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Identify callers by the first `X-Forwarded-For` hop instead of the
    /// peer address. Only safe behind a proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// How often idle rate-limit entries are dropped, in seconds
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,

    /// Backend credential; falls back to `OPENAI_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Pipeline YAML file; replaces the inline `pipeline` section when set
    #[serde(default)]
    pub pipeline_config: Option<PathBuf>,

    /// Inline pipeline configuration
    #[serde(default)]
    pub pipeline: RetoneConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            trust_forwarded_for: false,
            purge_interval_secs: default_purge_interval_secs(),
            api_key: None,
            pipeline_config: None,
            pipeline: RetoneConfig::default(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_body_size_mb", &self.max_body_size_mb)
            .field("enable_cors", &self.enable_cors)
            .field("log_level", &self.log_level)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("purge_interval_secs", &self.purge_interval_secs)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("pipeline_config", &self.pipeline_config)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    ///
    /// Sources, later ones winning: an optional `server.{toml,yaml,json}`
    /// file in the working directory, a `.env` file, then `RETONE_SERVER__*`
    /// variables (`RETONE_SERVER__PIPELINE__LIMITER__SHORT__LIMIT=20`).
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("RETONE_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.resolve()
    }

    /// Applies the pipeline file and credential fallbacks, then validates.
    pub fn resolve(mut self) -> anyhow::Result<Self> {
        if let Some(path) = &self.pipeline_config {
            self.pipeline = RetoneConfig::from_file(path)?;
        }

        if self.api_key.is_some() {
            self.pipeline.generation.api_key = self.api_key.clone();
        }
        self.pipeline.generation = self.pipeline.generation.clone().with_env_credential();

        self.pipeline.validate()?;
        if self.purge_interval_secs == 0 {
            anyhow::bail!("purge_interval_secs must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        // Larger files would be cut off by the body limit before ingest sees them.
        if self.pipeline.ingest.max_file_bytes > self.max_body_size() {
            anyhow::bail!(
                "pipeline.ingest.max_file_bytes ({}) exceeds the request body limit of {} MB",
                self.pipeline.ingest.max_file_bytes,
                self.max_body_size_mb
            );
        }
        Ok(self)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_body_size_mb() -> usize {
    16
}

fn default_purge_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
