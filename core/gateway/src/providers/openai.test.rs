use super::*;
use crate::provider::AdapterCall;
use bifrost_protocol::ModelParameters;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn adapter_for(server: &MockServer) -> OpenAiAdapter {
    let mut config = ProviderConfig::with_key(Key::new("k1", "sk-test"));
    config.network.base_url = Some(server.uri());
    OpenAiAdapter::new(&config).expect("adapter")
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
            key: Key::new("k1", "sk-test"),
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

#[tokio::test]
async fn test_chat_completion_happy_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {"role": "assistant", "content": "hi there"},
                "finish_reason": "stop",
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5},
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let outcome = adapter
        .chat_completion(parts.call("gpt-4o-mini"), &[Message::user("hi")])
        .await
        .expect("chat");

    match outcome.payload {
        ResponsePayload::ChatCompletion(chat) => {
            assert_eq!(chat.text(), "hi there");
            assert_eq!(chat.usage.expect("usage").total_tokens, 5);
        }
        other => panic!("expected chat payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_upstream_error_maps_to_provider_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"},
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let err = adapter
        .chat_completion(parts.call("gpt-4o-mini"), &[Message::user("hi")])
        .await
        .expect_err("unauthorized");

    assert_eq!(err.kind, bifrost_error::ErrorKind::ProviderApi);
    assert_eq!(err.status_code, Some(401));
    assert_eq!(err.error.message, "Incorrect API key provided");
}

#[tokio::test]
async fn test_raw_payloads_attached_when_opted_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "ok"}}],
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let mut call = parts.call("gpt-4o-mini");
    call.raw_request = true;
    call.raw_response = true;

    let outcome = adapter
        .chat_completion(call, &[Message::user("hi")])
        .await
        .expect("chat");
    let raw_request = outcome.raw_request.expect("raw request");
    assert_eq!(raw_request["model"], "gpt-4o-mini");
    let raw_response = outcome.raw_response.expect("raw response");
    assert_eq!(raw_response["id"], "chatcmpl-1");
}

#[tokio::test]
async fn test_chat_completion_stream_collects_deltas() {
    let sse_body = concat!(
        "data: {\"id\":\"chatcmpl-1\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let mut stream = adapter
        .chat_completion_stream(parts.call("gpt-4o-mini"), &[Message::user("hi")])
        .await
        .expect("stream");

    let mut deltas = Vec::new();
    let mut terminal = None;
    while let Some(chunk) = stream.recv().await {
        if chunk.is_terminal() {
            terminal = Some(chunk);
        } else if let Some(delta) = chunk.as_delta() {
            deltas.push(delta.to_string());
        }
    }

    assert_eq!(deltas, vec!["Hel", "lo"]);
    match terminal.expect("terminal chunk") {
        bifrost_protocol::StreamChunk::Done { response } => {
            let chat = response.as_chat().expect("chat payload");
            assert_eq!(chat.text(), "Hello");
            assert_eq!(chat.id, "chatcmpl-1");
        }
        other => panic!("expected Done, got {other:?}"),
    }
}

#[tokio::test]
async fn test_embedding_parses_float_and_base64_vectors() {
    let base64_vector = {
        use base64::Engine;
        let mut bytes = Vec::new();
        for value in [0.5f32, -1.0f32] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        base64::engine::general_purpose::STANDARD.encode(bytes)
    };

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "text-embedding-3-small",
            "data": [
                {"index": 0, "embedding": [0.25, 0.75]},
                {"index": 1, "embedding": base64_vector},
            ],
            "usage": {"prompt_tokens": 8, "total_tokens": 8},
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let outcome = adapter
        .embedding(
            parts.call("text-embedding-3-small"),
            &EmbeddingInput::batch(vec!["a".to_string(), "b".to_string()]),
        )
        .await
        .expect("embedding");

    match outcome.payload {
        ResponsePayload::Embedding(response) => {
            assert_eq!(response.embeddings[0].embedding, vec![0.25, 0.75]);
            assert_eq!(response.embeddings[1].embedding, vec![0.5, -1.0]);
        }
        other => panic!("expected embedding payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "gpt-4o-mini", "owned_by": "openai"},
                {"id": "gpt-4o", "owned_by": "openai"},
            ],
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let outcome = adapter.list_models(parts.call("")).await.expect("models");

    match outcome.payload {
        ResponsePayload::ModelList(models) => {
            assert_eq!(models.len(), 2);
            assert_eq!(models[0].id, "gpt-4o-mini");
        }
        other => panic!("expected model list, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_capability_is_distinct() {
    let server = MockServer::start().await;
    let adapter = adapter_for(&server);
    let parts = CallParts::new();

    let err = adapter
        .count_tokens(parts.call("gpt-4o-mini"), &[Message::user("hi")])
        .await
        .expect_err("unsupported");
    assert_eq!(err.kind, bifrost_error::ErrorKind::UnsupportedOperation);
}

#[tokio::test]
async fn test_file_delete_maps_deletion() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/files/file_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file_1",
            "deleted": true,
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let outcome = adapter
        .file_delete(
            parts.call(""),
            &FileIdInput {
                file_id: "file_1".to_string(),
            },
        )
        .await
        .expect("delete");

    match outcome.payload {
        ResponsePayload::Deletion(deletion) => {
            assert_eq!(deletion.id, "file_1");
            assert!(deletion.deleted);
        }
        other => panic!("expected deletion payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_responses_parses_output_items() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "resp_1",
            "model": "gpt-4o-mini",
            "output": [
                {"type": "message", "content": [{"type": "output_text", "text": "All done."}]},
                {"type": "function_call", "call_id": "call_1", "name": "lookup", "arguments": "{\"q\":1}"},
            ],
            "usage": {"input_tokens": 7, "output_tokens": 3, "total_tokens": 10},
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let parts = CallParts::new();
    let outcome = adapter
        .responses(parts.call("gpt-4o-mini"), &[Message::user("do it")])
        .await
        .expect("responses");

    match outcome.payload {
        ResponsePayload::Responses(chat) => {
            assert_eq!(chat.text(), "All done.");
            assert_eq!(chat.finish_reason, FinishReason::ToolCalls);
            assert_eq!(chat.tool_calls()[0].name, "lookup");
            assert_eq!(chat.usage.expect("usage").total_tokens, 10);
        }
        other => panic!("expected responses payload, got {other:?}"),
    }
}
