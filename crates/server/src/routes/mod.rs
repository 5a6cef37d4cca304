//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `process`: text rewriting, as a multipart form or a JSON body

pub mod health;
pub mod process;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
///
/// # Response
///
/// ```json
/// {
///   "name": "Retone Server",
///   "version": "0.1.0",
///   "api_version": "v1",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Retone Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/process",
            "/api/v1/process",
            "/health",
            "/ready",
            "/metrics"
        ],
        "parameters": ["faithfulness", "human_like", "ai_like", "formality"],
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
