use super::*;
use crate::provider::AdapterCall;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn adapter_for(server: &MockServer) -> AnthropicAdapter {
    let mut config = ProviderConfig::with_key(Key::new("k1", "sk-ant-test"));
    config.network.base_url = Some(server.uri());
    AnthropicAdapter::new(&config).expect("adapter")
}

fn call_parts() -> (RequestContext, Key, ModelParameters) {
    (
        RequestContext::new(),
        Key::new("k1", "sk-ant-test"),
        ModelParameters::default(),
    )
}

#[test]
fn test_system_messages_extracted() {
    let (system, wire) = messages_to_wire(&[
        Message::system("be terse"),
        Message::system("answer in english"),
        Message::user("hello"),
    ]);
    assert_eq!(system.as_deref(), Some("be terse\nanswer in english"));
    assert_eq!(wire.len(), 1);
    assert_eq!(wire[0]["role"], "user");
}

#[test]
fn test_tool_results_ride_as_user_blocks() {
    let (_, wire) = messages_to_wire(&[Message::tool_result(
        "toolu_1",
        bifrost_protocol::ToolResultContent::text("done"),
    )]);
    assert_eq!(wire[0]["role"], "user");
    assert_eq!(wire[0]["content"][0]["type"], "tool_result");
    assert_eq!(wire[0]["content"][0]["tool_use_id"], "toolu_1");
}

#[test]
fn test_apply_params_maps_tool_choice() {
    let params = ModelParameters::default()
        .tool_choice(bifrost_protocol::ToolChoice::Required)
        .temperature(0.1);
    let mut body = json!({});
    apply_params(&mut body, &params);
    assert_eq!(body["tool_choice"]["type"], "any");
    assert_eq!(body["temperature"], 0.1);
}

#[test]
fn test_map_stop_reason() {
    assert_eq!(map_stop_reason("end_turn"), FinishReason::Stop);
    assert_eq!(map_stop_reason("stop_sequence"), FinishReason::Stop);
    assert_eq!(map_stop_reason("max_tokens"), FinishReason::MaxTokens);
    assert_eq!(map_stop_reason("tool_use"), FinishReason::ToolCalls);
}

#[tokio::test]
async fn test_chat_completion_happy_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", API_VERSION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "model": "claude-sonnet-4",
            "content": [{"type": "text", "text": "hello from claude"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 6},
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let (ctx, key, params) = call_parts();
    let outcome = adapter
        .chat_completion(
            AdapterCall {
                ctx: &ctx,
                key: &key,
                model: "claude-sonnet-4",
                params: &params,
                raw_request: false,
                raw_response: false,
            },
            &[Message::user("hi")],
        )
        .await
        .expect("chat");

    match outcome.payload {
        ResponsePayload::ChatCompletion(chat) => {
            assert_eq!(chat.text(), "hello from claude");
            assert_eq!(chat.finish_reason, FinishReason::Stop);
            let usage = chat.usage.expect("usage");
            assert_eq!(usage.prompt_tokens, 12);
            assert_eq!(usage.completion_tokens, 6);
        }
        other => panic!("expected chat payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_count_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/count_tokens"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"input_tokens": 42})),
        )
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let (ctx, key, params) = call_parts();
    let outcome = adapter
        .count_tokens(
            AdapterCall {
                ctx: &ctx,
                key: &key,
                model: "claude-sonnet-4",
                params: &params,
                raw_request: false,
                raw_response: false,
            },
            &[Message::user("how many tokens is this?")],
        )
        .await
        .expect("count");

    match outcome.payload {
        ResponsePayload::CountTokens(count) => assert_eq!(count.input_tokens, 42),
        other => panic!("expected count payload, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_body_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "error": {"type": "overloaded_error", "message": "Overloaded"},
        })))
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let (ctx, key, params) = call_parts();
    let err = adapter
        .chat_completion(
            AdapterCall {
                ctx: &ctx,
                key: &key,
                model: "claude-sonnet-4",
                params: &params,
                raw_request: false,
                raw_response: false,
            },
            &[Message::user("hi")],
        )
        .await
        .expect_err("overloaded");

    assert_eq!(err.status_code, Some(529));
    assert_eq!(err.error.message, "Overloaded");
    assert_eq!(err.error.error_type.as_deref(), Some("overloaded_error"));
}

#[tokio::test]
async fn test_stream_accumulates_text_and_tools() {
    let sse_body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"model\":\"claude-sonnet-4\",\"usage\":{\"input_tokens\":9,\"output_tokens\":0}}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"par\"}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"tial\"}}\n\n",
        "event: message_delta\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":4}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    let (ctx, key, params) = call_parts();
    let mut stream = adapter
        .chat_completion_stream(
            AdapterCall {
                ctx: &ctx,
                key: &key,
                model: "claude-sonnet-4",
                params: &params,
                raw_request: false,
                raw_response: false,
            },
            &[Message::user("hi")],
        )
        .await
        .expect("stream");

    let mut text = String::new();
    let mut terminal = None;
    while let Some(chunk) = stream.recv().await {
        if chunk.is_terminal() {
            terminal = Some(chunk);
        } else if let Some(delta) = chunk.as_delta() {
            text.push_str(delta);
        }
    }

    assert_eq!(text, "partial");
    match terminal.expect("terminal chunk") {
        StreamChunk::Done { response } => {
            let chat = response.as_chat().expect("chat");
            assert_eq!(chat.text(), "partial");
            assert_eq!(chat.id, "msg_1");
            let usage = chat.usage.as_ref().expect("usage");
            assert_eq!(usage.prompt_tokens, 9);
            assert_eq!(usage.completion_tokens, 4);
        }
        other => panic!("expected Done, got {other:?}"),
    }
}
