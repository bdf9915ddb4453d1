use super::*;
use crate::messages::Message;

fn chat_input() -> RequestInput {
    RequestInput::ChatCompletion(vec![Message::user("hi")])
}

#[test]
fn test_kind_mirrors_input() {
    assert_eq!(chat_input().kind(), RequestKind::ChatCompletion);
    assert_eq!(
        RequestInput::Embedding(EmbeddingInput::single("x")).kind(),
        RequestKind::Embedding
    );
    assert_eq!(RequestInput::ListModels.kind(), RequestKind::ListModels);
    assert_eq!(
        RequestInput::VideoDownload(VideoIdInput {
            id: "job_1".to_string()
        })
        .kind(),
        RequestKind::VideoDownload
    );
}

#[test]
fn test_kind_display() {
    assert_eq!(RequestKind::ChatCompletion.to_string(), "chat_completion");
    assert_eq!(
        RequestKind::ContainerFileContent.to_string(),
        "container_file_content"
    );
}

#[test]
fn test_hops_are_primary_then_fallbacks() {
    let request = BifrostRequest::new(Provider::Runway, "gen4", chat_input())
        .with_fallback(Provider::Openai, "gpt-4o-mini")
        .with_fallback(Provider::Anthropic, "claude-sonnet-4");

    let hops = request.hops();
    assert_eq!(hops.len(), 3);
    assert_eq!(hops[0].provider, Provider::Runway);
    assert_eq!(hops[0].model, "gen4");
    assert_eq!(hops[1].provider, Provider::Openai);
    assert_eq!(hops[2].provider, Provider::Anthropic);
}

#[test]
fn test_validate_rejects_empty_fields() {
    let ok = BifrostRequest::new(Provider::Openai, "gpt-4o-mini", chat_input());
    assert!(ok.validate().is_ok());

    let empty_model = BifrostRequest::new(Provider::Openai, "", chat_input());
    assert!(empty_model.validate().is_err());

    let empty_custom = BifrostRequest::new(Provider::Custom(String::new()), "m", chat_input());
    assert!(empty_custom.validate().is_err());

    let bad_fallback = BifrostRequest::new(Provider::Openai, "gpt-4o-mini", chat_input())
        .with_fallback(Provider::Anthropic, "");
    assert!(bad_fallback.validate().is_err());
}

#[test]
fn test_from_model_id() {
    let request =
        BifrostRequest::from_model_id(Provider::Openai, "anthropic/claude-sonnet-4", chat_input())
            .expect("parse");
    assert_eq!(request.provider, Provider::Anthropic);
    assert_eq!(request.model, "claude-sonnet-4");

    // A bare model keeps the default provider.
    let request = BifrostRequest::from_model_id(Provider::Openai, "gpt-4o-mini", chat_input())
        .expect("parse");
    assert_eq!(request.provider, Provider::Openai);
    assert_eq!(request.model, "gpt-4o-mini");
}

#[test]
fn test_request_serde_roundtrip() {
    let request = BifrostRequest::new(Provider::Openai, "gpt-4o-mini", chat_input())
        .with_params(ModelParameters::default().temperature(0.2));
    let json = serde_json::to_string(&request).expect("serialize");
    let parsed: BifrostRequest = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed.provider, Provider::Openai);
    assert_eq!(parsed.model, "gpt-4o-mini");
    assert_eq!(parsed.params.temperature, Some(0.2));
    assert_eq!(parsed.kind(), RequestKind::ChatCompletion);
}
