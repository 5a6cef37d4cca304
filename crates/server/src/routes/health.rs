use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "retone-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Readiness check endpoint
///
/// 503 while the generation backend has no usable credential, since every
/// rewrite would fail with `CONFIGURATION_ERROR`.
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let client = state.pipeline.client();
    let ready = client.is_ready();
    let limiter = state.pipeline.limiter().stats();

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(json!({
        "status": if ready { "ready" } else { "not_ready" },
        "service": "retone-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
        "components": {
            "generation": {
                "backend": client.backend_name(),
                "status": if ready { "ready" } else { "credential_unavailable" },
            },
            "limiter": {
                "tracked_clients": limiter.tracked_clients,
                "total_admitted": limiter.total_admitted,
                "total_rejected": limiter.total_rejected,
            },
        }
    }));

    (status, body)
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state.prometheus.as_ref().ok_or(ServerError::NotFound)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
