//! HTTP API tests driven through the router with `tower::ServiceExt::oneshot`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use retone::generation::{BackendError, GenerationBackend, GenerationClient, RetryConfig};
use retone::limiter::{RateLimiter, WindowConfig};
use retone::prompt::InstructionPayload;
use retone::Pipeline;
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

struct EchoBackend {
    configured: bool,
    hang: bool,
    calls: AtomicU32,
}

#[async_trait]
impl GenerationBackend for EchoBackend {
    async fn complete(&self, payload: &InstructionPayload) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.configured {
            return Err(BackendError::MissingCredential);
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(format!("Polished ({} chars)", payload.user.len()))
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

struct TestApp {
    router: Router,
    backend: Arc<EchoBackend>,
}

fn app_with(config: ServerConfig, configured: bool) -> TestApp {
    app_with_backend(
        config,
        EchoBackend {
            configured,
            hang: false,
            calls: AtomicU32::new(0),
        },
    )
}

fn app_with_backend(config: ServerConfig, backend: EchoBackend) -> TestApp {
    let backend = Arc::new(backend);
    let client = GenerationClient::new(
        backend.clone(),
        RetryConfig::default().with_base_delay(Duration::from_millis(1)),
        Duration::from_secs(30),
    );
    let pipeline = Pipeline::new(
        &config.pipeline,
        Arc::new(RateLimiter::new(config.pipeline.limiter)),
        Arc::new(client),
    );
    let state = Arc::new(ServerState::with_pipeline(config, pipeline, None));
    let router = build_router(state).layer(MockConnectInfo(SocketAddr::from((
        [198, 51, 100, 7],
        40_000,
    ))));
    TestApp { router, backend }
}

fn app() -> TestApp {
    app_with(ServerConfig::default(), true)
}

fn json_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/process")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn sliders(text: &str) -> Value {
    json!({
        "text_input": text,
        "faithfulness": 8,
        "human_like": "6",
        "ai_like": 2,
        "formality": 9,
    })
}

const BOUNDARY: &str = "retone-test-boundary";

fn multipart_request(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn json_process_returns_success_envelope() {
    let app = app();
    let response = app
        .router
        .oneshot(json_request(sliders("  hey can u send the report  ")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["original_text"], "hey can u send the report");
    assert!(body["processed_text"]
        .as_str()
        .unwrap()
        .starts_with("Polished"));
    assert_eq!(
        body["parameters"],
        json!({"faithfulness": 8, "human_like": 6, "ai_like": 2, "formality": 9})
    );
    assert!(body.get("error").is_none());
    assert_eq!(app.backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn multipart_form_with_file_is_processed() {
    let app = app();
    let request = multipart_request(
        &[
            ("faithfulness", "5"),
            ("human_like", "5"),
            ("ai_like", "5"),
            ("formality", "5"),
        ],
        Some(("notes.txt", b"\xEF\xBB\xBFDraft from a file.\n")),
    );
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["original_text"], "Draft from a file.");
}

#[tokio::test]
async fn invalid_parameter_is_400_and_skips_backend() {
    let app = app();
    let mut payload = sliders("hello");
    payload["formality"] = json!(11);
    let response = app.router.oneshot(json_request(payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "INVALID_PARAMETER");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("formality"));
    assert!(body.get("processed_text").is_none());
    assert_eq!(app.backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unsupported_upload_is_400() {
    let app = app();
    let request = multipart_request(
        &[
            ("faithfulness", "5"),
            ("human_like", "5"),
            ("ai_like", "5"),
            ("formality", "5"),
        ],
        Some(("slides.pdf", b"%PDF-1.7")),
    );
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["kind"], "UNSUPPORTED_FILE_TYPE");
}

#[tokio::test]
async fn empty_form_is_empty_input() {
    let app = app();
    let request = multipart_request(&[("text_input", "   ")], None);
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["kind"], "EMPTY_INPUT");
}

#[tokio::test]
async fn oversize_body_is_file_too_large() {
    let config = ServerConfig {
        max_body_size_mb: 1,
        ..Default::default()
    };
    let app = app_with(config, true);
    let big = "a".repeat(1024 * 1024 + 1);
    let response = app
        .router
        .oneshot(json_request(sliders(&big)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"]["kind"], "FILE_TOO_LARGE");
    assert_eq!(app.backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exhausted_budget_is_429_with_retry_after() {
    let mut config = ServerConfig::default();
    config.pipeline.limiter.short = WindowConfig::new(2, 3600);
    let app = app_with(config, true);

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(json_request(sliders("hello")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .router
        .clone()
        .oneshot(json_request(sliders("hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 3600);

    let body = body_json(response).await;
    assert_eq!(body["error"]["kind"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["error"]["retry_after_secs"], retry_after);
    assert_eq!(app.backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn forwarded_for_separates_clients_when_trusted() {
    let mut config = ServerConfig {
        trust_forwarded_for: true,
        ..Default::default()
    };
    config.pipeline.limiter.short = WindowConfig::new(1, 3600);
    let app = app_with(config, true);

    let from = |ip: &str| {
        let mut request = json_request(sliders("hello"));
        request
            .headers_mut()
            .insert("x-forwarded-for", format!("{ip}, 10.0.0.1").parse().unwrap());
        request
    };

    let first = app.router.clone().oneshot(from("203.0.113.1")).await.unwrap();
    let second = app.router.clone().oneshot(from("203.0.113.2")).await.unwrap();
    let repeat = app.router.clone().oneshot(from("203.0.113.1")).await.unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn forwarded_for_is_ignored_by_default() {
    let mut config = ServerConfig::default();
    config.pipeline.limiter.short = WindowConfig::new(1, 3600);
    let app = app_with(config, true);

    let mut first = json_request(sliders("hello"));
    first
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.1".parse().unwrap());
    let mut second = json_request(sliders("hello"));
    second
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.2".parse().unwrap());

    assert_eq!(
        app.router.clone().oneshot(first).await.unwrap().status(),
        StatusCode::OK
    );
    assert_eq!(
        app.router.clone().oneshot(second).await.unwrap().status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn missing_credential_is_configuration_error_and_not_ready() {
    let app = app_with(ServerConfig::default(), false);

    let response = app
        .router
        .clone()
        .oneshot(json_request(sliders("hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"]["kind"],
        "CONFIGURATION_ERROR"
    );

    let ready = app
        .router
        .clone()
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(ready).await["status"], "not_ready");
}

#[tokio::test]
async fn health_and_ready_report_ok() {
    let app = app();

    let health = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await["status"], "healthy");

    let ready = app
        .router
        .clone()
        .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    let body = body_json(ready).await;
    assert_eq!(body["components"]["generation"]["backend"], "echo");
}

#[tokio::test]
async fn request_id_is_propagated() {
    let app = app();
    let request = Request::get("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn metrics_disabled_is_404() {
    let app = app();
    let response = app
        .router
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_is_404_envelope() {
    let app = app();
    let response = app
        .router
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/process")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["kind"], "BAD_REQUEST");
}

#[tokio::test(start_paused = true)]
async fn request_timeout_renders_an_envelope() {
    let config = ServerConfig {
        timeout_secs: 1,
        ..Default::default()
    };
    let app = app_with_backend(
        config,
        EchoBackend {
            configured: true,
            hang: true,
            calls: AtomicU32::new(0),
        },
    );

    let response = app
        .router
        .oneshot(json_request(sliders("hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "REQUEST_TIMEOUT");
    assert!(body["error"]["message"].as_str().unwrap().contains("1s"));
    assert_eq!(app.backend.calls.load(Ordering::SeqCst), 1);
}
