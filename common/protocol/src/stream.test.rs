use super::*;
use crate::completion::ChatResponse;
use crate::provider::Provider;
use crate::request::RequestKind;
use crate::response::ResponseMetadata;
use crate::response::ResponsePayload;

#[test]
fn test_terminal_chunks() {
    let done = StreamChunk::done(BifrostResponse::new(
        ResponsePayload::ChatCompletion(ChatResponse::new("resp_1", "gpt-4o-mini")),
        ResponseMetadata::new(Provider::Openai, "gpt-4o-mini", RequestKind::ChatCompletion),
    ));
    assert!(done.is_terminal());

    let error = StreamChunk::error(bifrost_error::BifrostError::transport("reset"));
    assert!(error.is_terminal());

    let delta = StreamChunk::Delta {
        text: "hi".to_string(),
    };
    assert!(!delta.is_terminal());
    assert_eq!(delta.as_delta(), Some("hi"));
}

#[test]
fn test_chunk_serde_tags() {
    let delta = StreamChunk::Delta {
        text: "hi".to_string(),
    };
    let json = serde_json::to_value(&delta).expect("serialize");
    assert_eq!(json["type"], "delta");

    let tool = StreamChunk::ToolCallDelta {
        index: 0,
        id: Some("call_1".to_string()),
        name: Some("lookup".to_string()),
        arguments: None,
    };
    let json = serde_json::to_value(&tool).expect("serialize");
    assert_eq!(json["type"], "tool_call_delta");
    assert!(json.get("arguments").is_none());
}
