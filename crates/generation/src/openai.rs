//! OpenAI-compatible chat completions backend.
//!
//! Status classification:
//!
//! | Status | Classified as |
//! |--------|---------------|
//! | 2xx with a text choice | success |
//! | 2xx without one | [`BackendError::Malformed`] |
//! | 401, 403 | [`BackendError::Auth`] |
//! | 429 | [`BackendError::RateLimited`] (with `Retry-After`, if sent) |
//! | 408, 5xx | [`BackendError::Network`] |
//! | other 4xx | [`BackendError::InvalidRequest`] |
use std::time::Duration;

use async_trait::async_trait;
use prompt::InstructionPayload;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::GenerationBackend;
use crate::config::{GenerationConfig, GenerationConfigError};
use crate::error::BackendError;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Calls `POST {api_base_url}/chat/completions` with a bearer credential.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiBackend {
    pub fn new(cfg: &GenerationConfig) -> Result<Self, GenerationConfigError> {
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .pool_max_idle_per_host(16)
            .build()
            .map_err(|e| GenerationConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            url: cfg.completions_url(),
            api_key: cfg.credential().map(str::to_string),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn complete(&self, payload: &InstructionPayload) -> Result<String, BackendError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(BackendError::MissingCredential)?;

        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &payload.system,
                },
                ChatMessage {
                    role: "user",
                    content: &payload.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "backend_error_status");
            return Err(classify_status(status, retry_after, &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(format!("invalid JSON response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::Malformed("response contained no completion text".into()))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

fn classify_transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Network(format!("request timed out: {err}"))
    } else if err.is_connect() {
        BackendError::Network(format!("connection failed: {err}"))
    } else if err.is_builder() {
        BackendError::InvalidRequest(format!("request could not be built: {err}"))
    } else {
        BackendError::Network(err.to_string())
    }
}

pub(crate) fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> BackendError {
    let reason = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(reason),
        StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT => BackendError::Network(reason),
        s if s.is_server_error() => BackendError::Network(reason),
        _ => BackendError::InvalidRequest(reason),
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
}

/// Only the delta-seconds form is honoured; HTTP dates are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn statuses_map_to_failure_classes() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, None, ""),
            BackendError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, None, ""),
            BackendError::Auth(_)
        ));
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(3)), ""),
            BackendError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, None, ""),
            BackendError::Network(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT, None, ""),
            BackendError::Network(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, None, ""),
            BackendError::InvalidRequest(_)
        ));
    }

    #[test]
    fn invalid_request_carries_backend_message() {
        let body = r#"{"error": {"message": "maximum context length exceeded", "type": "invalid_request_error"}}"#;
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, None, body),
            BackendError::InvalidRequest("maximum context length exceeded".into())
        );
    }

    #[test]
    fn non_json_error_body_falls_back_to_status() {
        let err = classify_status(StatusCode::BAD_REQUEST, None, "<html>nope</html>");
        assert_eq!(err, BackendError::InvalidRequest("HTTP 400 Bad Request".into()));
    }

    #[test]
    fn retry_after_accepts_seconds_only() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        let backend = OpenAiBackend::new(&GenerationConfig::default()).unwrap();
        assert!(!backend.is_configured());
        let payload = InstructionPayload {
            version: 1,
            system: "s".into(),
            user: "u".into(),
        };
        assert_eq!(
            backend.complete(&payload).await,
            Err(BackendError::MissingCredential)
        );
    }
}
