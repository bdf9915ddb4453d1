use super::*;

#[test]
fn test_parse_provider_and_model() {
    let id = ModelId::parse("openai/gpt-4o-mini").expect("parse");
    assert_eq!(id.provider, Some(Provider::Openai));
    assert_eq!(id.model, "gpt-4o-mini");
}

#[test]
fn test_splits_on_first_slash_only() {
    let id = ModelId::parse("bedrock/anthropic.claude-3/invoke").expect("parse");
    assert_eq!(id.provider, Some(Provider::Bedrock));
    assert_eq!(id.model, "anthropic.claude-3/invoke");
}

#[test]
fn test_bare_model_has_no_provider() {
    let id = ModelId::parse("gpt-4o-mini").expect("parse");
    assert_eq!(id.provider, None);
    assert_eq!(id.model, "gpt-4o-mini");
}

#[test]
fn test_empty_components_rejected() {
    assert!(ModelId::parse("").is_err());
    assert!(ModelId::parse("/gpt-4o").is_err());
    assert!(ModelId::parse("openai/").is_err());
}

#[test]
fn test_parse_format_roundtrip() {
    for s in [
        "openai/gpt-4o-mini",
        "bedrock/anthropic.claude-3/invoke",
        "acme/model-x",
        "gpt-4o-mini",
    ] {
        let id = ModelId::parse(s).expect("parse");
        assert_eq!(id.format(), s, "round-trip failed for {s:?}");
    }
}
