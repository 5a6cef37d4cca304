use crate::error::{envelope_response, ServerError, ServerResult};
use crate::middleware::RequestId;
use crate::state::ServerState;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, FromRequestParts, Multipart, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use ingest::{ParameterField, RawParameters, RawValue, UploadedFile};
use limiter::ClientIdentity;
use retone::{assemble, ProcessRequest};
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Who is calling, as seen by the rate limiter.
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: ClientIdentity,
    pub request_id: String,
}

impl FromRequestParts<Arc<ServerState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ServerState>,
    ) -> Result<Self, Self::Rejection> {
        let forwarded = if state.config.trust_forwarded_for {
            forwarded_for(&parts.headers)
        } else {
            None
        };
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        let identity = match (forwarded, peer) {
            (Some(hop), _) => ClientIdentity::new(hop),
            (None, Some(ip)) => ClientIdentity::from(ip),
            (None, None) => ClientIdentity::new("unknown"),
        };
        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        Ok(Caller {
            identity,
            request_id,
        })
    }
}

/// First hop of `X-Forwarded-For`, the original client.
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
}

/// JSON form of a rewrite request.
///
/// Sliders may be numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JsonProcessRequest {
    pub text_input: Option<String>,
    pub faithfulness: Option<RawValue>,
    pub human_like: Option<RawValue>,
    pub ai_like: Option<RawValue>,
    pub formality: Option<RawValue>,
}

impl From<JsonProcessRequest> for ProcessRequest {
    fn from(body: JsonProcessRequest) -> Self {
        let mut request = ProcessRequest::default();
        request.input.text_input = body.text_input;
        request.parameters = RawParameters {
            faithfulness: body.faithfulness,
            human_like: body.human_like,
            ai_like: body.ai_like,
            formality: body.formality,
        };
        request
    }
}

/// Rewrite text submitted as a multipart form
///
/// Fields: `text_input`, `file`, `faithfulness`, `human_like`, `ai_like`,
/// `formality`. Unknown fields are ignored.
pub async fn process_form(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Response> {
    let limit_mb = state.config.max_body_size_mb;
    let mut multipart = multipart.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(limit_mb)
        } else {
            ServerError::BadRequest(rejection.body_text())
        }
    })?;

    let mut request = ProcessRequest::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit_mb))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text_input" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| multipart_error(err, limit_mb))?;
                request.input.text_input = Some(text);
            }
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| multipart_error(err, limit_mb))?;
                request.input.file = Some(UploadedFile::new(filename, bytes.to_vec()));
            }
            other => {
                if let Some(slider) = ParameterField::ALL.into_iter().find(|f| f.as_str() == other)
                {
                    let value = field
                        .text()
                        .await
                        .map_err(|err| multipart_error(err, limit_mb))?;
                    request.parameters.set(slider, Some(RawValue::Text(value)));
                }
            }
        }
    }

    run(&state, caller, request).await
}

/// Rewrite text submitted as JSON
pub async fn process_json(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    body: Result<Json<JsonProcessRequest>, JsonRejection>,
) -> ServerResult<Response> {
    let Json(body) = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(state.config.max_body_size_mb)
        } else {
            ServerError::BadRequest(rejection.body_text())
        }
    })?;

    run(&state, caller, body.into()).await
}

/// Runs the pipeline for one HTTP request.
///
/// The token is cancelled when this future is dropped, which is what
/// happens when the client disconnects or the request times out.
async fn run(state: &ServerState, caller: Caller, request: ProcessRequest) -> ServerResult<Response> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let span = tracing::info_span!("http.process", request_id = %caller.request_id);
    let processed = state
        .pipeline
        .run(&caller.identity, request, &cancel)
        .instrument(span)
        .await?;

    Ok(envelope_response(assemble(Ok(processed))))
}

fn multipart_error(err: MultipartError, limit_mb: usize) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(limit_mb)
    } else {
        ServerError::BadRequest(err.body_text())
    }
}
