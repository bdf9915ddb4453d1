use super::*;
use crate::completion::ChatResponse;
use crate::messages::ContentBlock;

fn chat_payload() -> ResponsePayload {
    ResponsePayload::ChatCompletion(
        ChatResponse::new("resp_1", "gpt-4o-mini").with_content(vec![ContentBlock::text("hi")]),
    )
}

#[test]
fn test_metadata_builder() {
    let metadata = ResponseMetadata::new(
        Provider::Openai,
        "gpt-4o-mini",
        RequestKind::ChatCompletion,
    )
    .with_latency_ms(42);

    assert_eq!(metadata.provider, Provider::Openai);
    assert_eq!(metadata.latency_ms, 42);
    assert!(metadata.hop_error.is_none());
}

#[test]
fn test_as_chat_covers_responses_kind() {
    let chat = BifrostResponse::new(
        chat_payload(),
        ResponseMetadata::new(Provider::Openai, "gpt-4o-mini", RequestKind::ChatCompletion),
    );
    assert_eq!(chat.as_chat().map(|c| c.text()), Some("hi".to_string()));

    let responses = BifrostResponse::new(
        ResponsePayload::Responses(ChatResponse::new("resp_2", "gpt-4o-mini")),
        ResponseMetadata::new(Provider::Openai, "gpt-4o-mini", RequestKind::Responses),
    );
    assert!(responses.as_chat().is_some());
    assert!(responses.as_embedding().is_none());
}

#[test]
fn test_hop_error_carried_in_metadata() {
    let mut metadata =
        ResponseMetadata::new(Provider::Openai, "gpt-4o-mini", RequestKind::ChatCompletion);
    metadata.hop_error =
        Some(bifrost_error::BifrostError::unsupported("runway", "chat_completion"));

    let json = serde_json::to_value(&metadata).expect("serialize");
    assert_eq!(json["hop_error"]["isBifrostError"], true);
}
