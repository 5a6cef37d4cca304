//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (logging, request ids, compression, CORS, timeouts)
//! - The limiter purge task
//! - Graceful shutdown handling

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, health, not_found, process};
use crate::state::ServerState;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Build the Axum router with all routes and middleware
///
/// Middleware stack, outermost first:
/// 1. HTTP tracing
/// 2. Request ID tracking
/// 3. Request logging
/// 4. CORS
/// 5. Compression
/// 6. Timeout handling
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let timeout_secs = state.config.timeout_secs;

    let info_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics));

    let process_routes = Router::new()
        .route("/process", post(process::process_form))
        .route("/api/v1/process", post(process::process_json))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()));

    Router::new()
        .merge(info_routes)
        .merge(process_routes)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    timeout_error(err, timeout_secs)
                }))
                .layer(TimeoutLayer::new(state.config.timeout())),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Timeouts render the same envelope as every other failure.
fn timeout_error(err: BoxError, timeout_secs: u64) -> ServerError {
    if err.is::<Elapsed>() {
        ServerError::Timeout(timeout_secs)
    } else {
        ServerError::Internal(err.to_string())
    }
}

/// Start the retone HTTP server
///
/// Initializes logging, wires the pipeline and starts listening. Blocks
/// until the server is shut down via SIGTERM or Ctrl+C.
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
///
/// A missing backend credential does not stop the server: it starts, logs
/// the problem, reports 503 on `/ready` and answers every rewrite with
/// `CONFIGURATION_ERROR`.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let state = Arc::new(ServerState::new(config.clone())?);

    if !state.pipeline.client().is_ready() {
        tracing::error!(
            "no backend credential configured; set RETONE_SERVER__API_KEY or {}",
            generation::API_KEY_ENV
        );
    }

    let app = build_router(state.clone());
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        "Starting retone server on {} with backend {}",
        addr,
        state.pipeline.client().backend_name()
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB",
        config.timeout_secs,
        config.max_body_size_mb
    );
    tracing::info!(
        short = %config.pipeline.limiter.short.limit,
        long = %config.pipeline.limiter.long.limit,
        burst = config.pipeline.limiter.burst.is_some(),
        "Rate limits configured"
    );
    tracing::info!(
        "CORS: {}, Metrics: {}, Trust X-Forwarded-For: {}",
        config.enable_cors,
        state.prometheus.is_some(),
        config.trust_forwarded_for
    );

    let shutdown = CancellationToken::new();
    let maintenance = spawn_maintenance(state, shutdown.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    shutdown.cancel();
    if let Err(err) = maintenance.await {
        tracing::warn!(error = %err, "maintenance task ended abnormally");
    }
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Periodically drops idle limiter entries and runs Prometheus upkeep.
fn spawn_maintenance(state: Arc<ServerState>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.purge_interval());
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let purged = state.pipeline.limiter().purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "limiter_purge");
                    }
                    if let Some(handle) = &state.prometheus {
                        handle.run_upkeep();
                    }
                }
            }
        }
    })
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
