use super::*;
use crate::sse::StreamAccumulator;
use bifrost_protocol::ToolDefinition;
use bifrost_protocol::ToolResultContent;
use serde_json::json;

#[test]
fn test_parse_error_openai_shape() {
    let body = br#"{"error": {"message": "Rate limit reached", "type": "rate_limit_error", "code": "rate_limit_exceeded"}}"#;
    let err = parse_error(429, body);
    assert_eq!(err.status_code, Some(429));
    assert_eq!(err.error.message, "Rate limit reached");
    assert_eq!(err.error.error_type.as_deref(), Some("rate_limit_error"));
    assert_eq!(err.error.code.as_deref(), Some("rate_limit_exceeded"));
    assert!(!err.is_bifrost_error);
}

#[test]
fn test_parse_error_fallback_preserves_body() {
    let err = parse_error(500, b"upstream exploded\n");
    assert_eq!(err.error.message, "upstream exploded");
}

#[test]
fn test_messages_to_wire_flattens_single_text() {
    let wire = messages_to_wire(&[Message::user("hi")]);
    assert_eq!(wire, vec![json!({"role": "user", "content": "hi"})]);
}

#[test]
fn test_messages_to_wire_tool_flow() {
    let messages = vec![
        Message::user("weather in oslo?"),
        Message::new(
            Role::Assistant,
            vec![ContentBlock::tool_use(
                "call_1",
                "get_weather",
                json!({"city": "Oslo"}),
            )],
        ),
        Message::tool_result("call_1", ToolResultContent::text("4C, raining")),
    ];
    let wire = messages_to_wire(&messages);

    assert_eq!(wire.len(), 3);
    assert_eq!(wire[1]["role"], "assistant");
    assert_eq!(wire[1]["tool_calls"][0]["id"], "call_1");
    assert_eq!(wire[1]["tool_calls"][0]["function"]["name"], "get_weather");
    assert_eq!(wire[2]["role"], "tool");
    assert_eq!(wire[2]["tool_call_id"], "call_1");
    assert_eq!(wire[2]["content"], "4C, raining");
}

#[test]
fn test_apply_params_folds_extras_last() {
    let params = ModelParameters::default()
        .temperature(0.3)
        .max_tokens(256)
        .tools(vec![ToolDefinition::new("lookup", json!({"type": "object"}))])
        .extra_param("logit_bias", json!({"1": -1}))
        .extra_param("temperature", json!(0.9));

    let mut body = json!({"model": "gpt-4o-mini"});
    apply_params(&mut body, &params);

    assert_eq!(body["max_tokens"], 256);
    assert_eq!(body["tools"][0]["function"]["name"], "lookup");
    // Extras override portable fields.
    assert_eq!(body["temperature"], 0.9);
}

#[test]
fn test_map_finish_reason() {
    assert_eq!(map_finish_reason("stop"), FinishReason::Stop);
    assert_eq!(map_finish_reason("length"), FinishReason::MaxTokens);
    assert_eq!(map_finish_reason("tool_calls"), FinishReason::ToolCalls);
    assert_eq!(map_finish_reason("content_filter"), FinishReason::ContentFilter);
    assert_eq!(map_finish_reason("weird"), FinishReason::Other);
}

#[test]
fn test_parse_chat_response() {
    let body = json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o-mini",
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "Hello there",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "lookup", "arguments": "{\"q\":\"x\"}"},
                }],
            },
            "finish_reason": "tool_calls",
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
    });

    let response = parse_chat_response(&body).expect("parse");
    assert_eq!(response.id, "chatcmpl-1");
    assert_eq!(response.text(), "Hello there");
    assert_eq!(response.finish_reason, FinishReason::ToolCalls);
    let calls = response.tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].arguments["q"], "x");
    assert_eq!(response.usage.expect("usage").total_tokens, 15);
}

#[test]
fn test_parse_chat_response_requires_choices() {
    assert!(parse_chat_response(&json!({"id": "x"})).is_err());
}

#[test]
fn test_parse_chat_stream_events_accumulate() {
    let mut accumulator = StreamAccumulator::default();

    let first = parse_chat_stream_event(
        r#"{"id":"chatcmpl-1","model":"gpt-4o-mini","choices":[{"delta":{"content":"Hel"}}]}"#,
        &mut accumulator,
    )
    .expect("parse");
    assert!(!first.terminal);
    assert_eq!(first.chunks.len(), 1);
    assert_eq!(first.chunks[0].as_delta(), Some("Hel"));

    for chunk in &first.chunks {
        accumulator.apply(chunk);
    }

    let second = parse_chat_stream_event(
        r#"{"choices":[{"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
        &mut accumulator,
    )
    .expect("parse");
    for chunk in &second.chunks {
        accumulator.apply(chunk);
    }

    assert_eq!(accumulator.text, "Hello");
    assert_eq!(accumulator.id.as_deref(), Some("chatcmpl-1"));
    assert_eq!(accumulator.finish_reason, Some(FinishReason::Stop));
}

#[test]
fn test_parse_chat_stream_tool_call_deltas() {
    let mut accumulator = StreamAccumulator::default();

    for data in [
        r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"lookup","arguments":""}}]}}]}"#,
        r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"q\":"}}]}}]}"#,
        r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"x\"}"}}]}}]}"#,
    ] {
        let parsed = parse_chat_stream_event(data, &mut accumulator).expect("parse");
        for chunk in &parsed.chunks {
            accumulator.apply(chunk);
        }
    }

    let response = accumulator.into_chat_response("gpt-4o-mini");
    let calls = response.tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "lookup");
    assert_eq!(calls[0].arguments["q"], "x");
}

#[test]
fn test_invalid_stream_event_is_decode_error() {
    let mut accumulator = StreamAccumulator::default();
    let err = parse_chat_stream_event("not json", &mut accumulator).expect_err("invalid");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Decode);
}
