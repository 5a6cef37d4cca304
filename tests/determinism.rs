mod common;

use common::{pipeline, text_request, MockBackend};
use retone::ingest::ControlParameters;
use retone::prompt::GenerationRequest;
use retone::{ClientIdentity, ResponseEnvelope};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn identical_requests_make_independent_calls_with_identical_payloads() {
    let backend = MockBackend::new();
    let pipeline = pipeline(backend.clone());
    let id = ClientIdentity::from("203.0.113.5");
    let sliders = ["9", "4", "1", "7"];

    let first = pipeline
        .run(&id, text_request("Same text.", sliders), &CancellationToken::new())
        .await
        .unwrap();
    let second = pipeline
        .run(&id, text_request("Same text.", sliders), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(backend.calls(), 2, "results must not be cached");
    let sent = backend.payloads();
    assert_eq!(sent[0], sent[1]);
    assert_eq!(sent[0].user.as_bytes(), sent[1].user.as_bytes());
    assert_eq!(first.instruction_fingerprint, second.instruction_fingerprint);
    assert_eq!(first.parameters, second.parameters);
}

#[tokio::test]
async fn sent_payload_matches_standalone_encoding() {
    let backend = MockBackend::new();
    let pipeline = pipeline(backend.clone());

    pipeline
        .process(
            &ClientIdentity::from("203.0.113.6"),
            text_request("  Encode me.  ", ["2", "5", "6", "10"]),
        )
        .await;

    let expected = pipeline.encode(&GenerationRequest::new(
        "Encode me.",
        ControlParameters {
            faithfulness: 2,
            human_like: 5,
            ai_like: 6,
            formality: 10,
        },
    ));
    assert_eq!(backend.payloads(), vec![expected]);
}

#[tokio::test]
async fn parameter_representation_does_not_change_payload() {
    let backend = MockBackend::new();
    let pipeline = pipeline(backend.clone());
    let id = ClientIdentity::from("203.0.113.7");

    pipeline
        .process(&id, text_request("text", ["5", "5", "5", "5"]))
        .await;

    let mut request = text_request("text", ["5", "5", "5", "5"]);
    request.parameters.faithfulness = Some(5i64.into());
    request.parameters.formality = Some(" 5 ".into());
    pipeline.process(&id, request).await;

    let sent = backend.payloads();
    assert_eq!(sent[0], sent[1]);
}

#[tokio::test]
async fn envelope_json_shape_is_stable() {
    let backend = MockBackend::new();
    let pipeline = pipeline(backend);

    let envelope = pipeline
        .process(
            &ClientIdentity::from("203.0.113.8"),
            text_request("hi", ["1", "2", "3", "4"]),
        )
        .await;
    let json = serde_json::to_value(&envelope).unwrap();
    let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["original_text", "parameters", "processed_text", "success"]);

    let back: ResponseEnvelope = serde_json::from_value(json).unwrap();
    assert_eq!(back, envelope);
}
