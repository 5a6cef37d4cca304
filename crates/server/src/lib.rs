//! Retone Server - HTTP API for the retone text rewrite pipeline
//!
//! Exposes [`retone::Pipeline`] over HTTP. Each request is validated,
//! checked against the caller's rate-limit budget, rewritten by the
//! generation backend and answered with the JSON response envelope.
//!
//! # Features
//!
//! - **Middleware**: Compression, CORS, request ID tracking, structured logging
//! - **Configuration**: `server.*` file plus `RETONE_SERVER__*` environment variables
//! - **Error Handling**: stable error kinds mapped onto HTTP status codes
//! - **Metrics**: Prometheus rendering of pipeline counters and latencies
//! - **Graceful Shutdown**: Proper signal handling for production deployments
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe (503 without a usable backend credential)
//! - `GET /metrics` - Prometheus metrics
//! - `POST /process` - Rewrite text from a multipart form
//! - `POST /api/v1/process` - Rewrite text from a JSON body
//!
//! | Error kind | Status |
//! |------------|--------|
//! | `EMPTY_INPUT`, `UNSUPPORTED_FILE_TYPE`, `DECODE_ERROR`, `INVALID_PARAMETER` | 400 |
//! | `FILE_TOO_LARGE` | 413 |
//! | `RATE_LIMIT_EXCEEDED` | 429, with `Retry-After` |
//! | `BAD_UPSTREAM_REQUEST` | 400 |
//! | `UPSTREAM_UNAVAILABLE` | 503 |
//! | `CONFIGURATION_ERROR` | 500 |

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::{PrometheusMetrics, ServerState};
