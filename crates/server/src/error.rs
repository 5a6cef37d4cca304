use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use retone::{assemble, ErrorKind, PipelineError, ResponseEnvelope};
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("request body exceeds the {0} MB limit")]
    PayloadTooLarge(usize),

    #[error("request did not complete within {0}s")]
    Timeout(u64),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// HTTP status for a pipeline failure kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::EmptyInput
        | ErrorKind::UnsupportedFileType
        | ErrorKind::DecodeError
        | ErrorKind::InvalidParameter
        | ErrorKind::BadUpstreamRequest => StatusCode::BAD_REQUEST,
        ErrorKind::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ConfigurationError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Renders an envelope with the status its error kind maps to, plus a
/// `Retry-After` header when the caller was rate limited.
pub fn envelope_response(envelope: ResponseEnvelope) -> Response {
    let status = envelope.error_kind().map_or(StatusCode::OK, status_for);
    let retry_after = envelope.retry_after_secs();

    let mut response = (status, Json(envelope)).into_response();
    if let Some(secs) = retry_after {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(secs));
    }
    response
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Pipeline(err) => envelope_response(assemble(Err(err))),
            ServerError::PayloadTooLarge(_) => {
                let message = self.to_string();
                envelope_response(ResponseEnvelope::failure(ErrorKind::FileTooLarge, message))
            }
            ServerError::Timeout(_) => {
                plain_error(StatusCode::REQUEST_TIMEOUT, "REQUEST_TIMEOUT", &self)
            }
            ServerError::BadRequest(_) => plain_error(StatusCode::BAD_REQUEST, "BAD_REQUEST", &self),
            ServerError::Internal(_) => {
                plain_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", &self)
            }
            ServerError::NotFound => plain_error(StatusCode::NOT_FOUND, "NOT_FOUND", &self),
        }
    }
}

/// Same envelope shape for failures outside the pipeline's kind set.
fn plain_error(status: StatusCode, kind: &str, err: &ServerError) -> Response {
    let body = Json(json!({
        "success": false,
        "error": {
            "kind": kind,
            "message": err.to_string(),
        }
    }));
    (status, body).into_response()
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use limiter::{RateLimitExceeded, WindowKind};
    use std::time::Duration;

    #[test]
    fn every_kind_has_a_status() {
        for kind in ErrorKind::ALL {
            let status = status_for(kind);
            if kind.is_client_error() {
                assert!(status.is_client_error(), "{kind}");
            }
        }
        assert_eq!(status_for(ErrorKind::FileTooLarge), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            status_for(ErrorKind::UpstreamUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn rate_limited_response_carries_retry_after() {
        let err = PipelineError::from(RateLimitExceeded {
            window: WindowKind::Short,
            limit: 50,
            retry_after: Duration::from_millis(1_500),
        });
        let response = ServerError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "2");
    }

    #[test]
    fn payload_too_large_uses_file_too_large_kind() {
        let response = ServerError::PayloadTooLarge(16).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().get(RETRY_AFTER).is_none());
    }

    #[test]
    fn timeout_is_408() {
        let response = ServerError::Timeout(120).into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn not_found_is_404() {
        assert_eq!(
            ServerError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
