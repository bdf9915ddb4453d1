use super::*;
use crate::provider::AdapterCall;
use bifrost_protocol::ModelParameters;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn adapter_for(server: &MockServer) -> RunwayAdapter {
    let mut config = ProviderConfig::with_key(Key::new("k1", "rw-key"));
    config.network.base_url = Some(server.uri());
    RunwayAdapter::new(&config).expect("adapter")
}

struct CallParts {
    ctx: RequestContext,
    key: Key,
    params: ModelParameters,
}

impl CallParts {
    fn new() -> Self {
        Self {
            ctx: RequestContext::new(),
            key: Key::new("k1", "rw-key"),
            params: ModelParameters::default(),
        }
    }

    fn call<'a>(&'a self, model: &'a str) -> AdapterCall<'a> {
        AdapterCall {
            ctx: &self.ctx,
            key: &self.key,
            model,
            params: &self.params,
            raw_request: false,
            raw_response: false,
        }
    }
}

#[test]
fn test_endpoint_selection_is_input_driven() {
    assert_eq!(
        RunwayAdapter::generation_endpoint(&VideoGenerationInput::text("a storm"))
            .expect("endpoint"),
        "/v1/text_to_video"
    );
    assert_eq!(
        RunwayAdapter::generation_endpoint(&VideoGenerationInput::image("https://x/ref.png"))
            .expect("endpoint"),
        "/v1/image_to_video"
    );
    assert_eq!(
        RunwayAdapter::generation_endpoint(&VideoGenerationInput::video("https://x/src.mp4"))
            .expect("endpoint"),
        "/v1/video_to_video"
    );

    // A source video outranks an image, which outranks text.
    let mut all = VideoGenerationInput::text("prompt");
    all.prompt_image = Some("https://x/ref.png".to_string());
    all.input_video = Some("https://x/src.mp4".to_string());
    assert_eq!(
        RunwayAdapter::generation_endpoint(&all).expect("endpoint"),
        "/v1/video_to_video"
    );

    assert!(RunwayAdapter::generation_endpoint(&VideoGenerationInput::default()).is_err());
}

#[test]
fn test_status_mapping() {
    assert_eq!(parse_status("PENDING"), VideoJobStatus::Pending);
    assert_eq!(parse_status("RUNNING"), VideoJobStatus::Running);
    assert_eq!(parse_status("THROTTLED"), VideoJobStatus::Running);
    assert_eq!(parse_status("SUCCEEDED"), VideoJobStatus::Succeeded);
    assert_eq!(parse_status("FAILED"), VideoJobStatus::Failed);
    assert_eq!(parse_status("CANCELLED"), VideoJobStatus::Canceled);
}

#[tokio::test]
async fn test_text_to_video_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text_to_video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task_1",
            "status": "PENDING",
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let outcome = adapter
        .video_generation(parts.call("gen4"), &VideoGenerationInput::text("a storm"))
        .await
        .expect("generation");

    match outcome.payload {
        ResponsePayload::VideoJob(job) => {
            assert_eq!(job.id, "task_1");
            assert_eq!(job.status, VideoJobStatus::Pending);
        }
        other => panic!("expected video job, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retrieve_parses_progress_and_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tasks/task_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task_1",
            "status": "SUCCEEDED",
            "progress": 1.0,
            "output": ["https://cdn.example.com/out.mp4"],
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let outcome = adapter
        .video_retrieve(
            parts.call("gen4"),
            &VideoIdInput {
                id: "task_1".to_string(),
            },
        )
        .await
        .expect("retrieve");

    match outcome.payload {
        ResponsePayload::VideoJob(job) => {
            assert_eq!(job.status, VideoJobStatus::Succeeded);
            assert_eq!(job.progress, Some(1.0));
            assert_eq!(
                job.output_url.as_deref(),
                Some("https://cdn.example.com/out.mp4")
            );
        }
        other => panic!("expected video job, got {other:?}"),
    }
}

#[tokio::test]
async fn test_download_fetches_output_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tasks/task_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task_1",
            "status": "SUCCEEDED",
            "output": [format!("{}/outputs/task_1.mp4", server.uri())],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/outputs/task_1.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(&b"mp4-bytes"[..], "video/mp4"))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let outcome = adapter
        .video_download(
            parts.call("gen4"),
            &VideoIdInput {
                id: "task_1".to_string(),
            },
        )
        .await
        .expect("download");

    match outcome.payload {
        ResponsePayload::VideoDownload(download) => {
            assert_eq!(&download.content[..], b"mp4-bytes");
            assert_eq!(download.content_type.as_deref(), Some("video/mp4"));
        }
        other => panic!("expected download payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_download_before_completion_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tasks/task_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task_1",
            "status": "RUNNING",
            "progress": 0.3,
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let err = adapter
        .video_download(
            parts.call("gen4"),
            &VideoIdInput {
                id: "task_1".to_string(),
            },
        )
        .await
        .expect_err("no output yet");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Operation);
}

#[tokio::test]
async fn test_chat_is_unsupported() {
    let server = MockServer::start().await;
    let adapter = adapter_for(&server);
    let parts = CallParts::new();

    let err = adapter
        .chat_completion(parts.call("gen4"), &[bifrost_protocol::Message::user("hi")])
        .await
        .expect_err("video-only adapter");
    assert_eq!(err.kind, bifrost_error::ErrorKind::UnsupportedOperation);
    assert!(err.error.message.contains("runway"));
}
