use super::*;

#[test]
fn test_builder_methods() {
    let key = Key::new("k1", "sk-a").with_weight(5).disabled();
    assert_eq!(key.id, "k1");
    assert_eq!(key.weight, 5);
    assert!(!key.enabled);

    let fresh = Key::new("k2", "sk-b");
    assert!(fresh.enabled);
    assert_eq!(fresh.weight, 1);
}

#[test]
fn test_supports_model() {
    let open = Key::new("k1", "sk-a");
    assert!(open.supports_model("gpt-4o-mini"));
    assert!(open.supports_model("anything"));

    let restricted = Key::new("k2", "sk-b").with_models(vec!["gpt-4o-mini".to_string()]);
    assert!(restricted.supports_model("gpt-4o-mini"));
    assert!(!restricted.supports_model("gpt-4o"));
}

#[test]
fn test_redacted_hides_secrets() {
    let key = Key::new("k1", "sk-secret").with_bedrock_config(BedrockKeyConfig {
        access_key: "AKIA123".to_string(),
        secret_key: "aws-secret".to_string(),
        session_token: Some("token".to_string()),
        region: "us-east-1".to_string(),
        endpoint: None,
    });

    let redacted = key.redacted();
    assert_eq!(redacted.value, redact::SENTINEL);
    let bedrock = redacted.bedrock_config.expect("bedrock config");
    assert_eq!(bedrock.secret_key, redact::SENTINEL);
    assert_eq!(bedrock.session_token.as_deref(), Some(redact::SENTINEL));
    // Non-secret fields stay readable.
    assert_eq!(bedrock.access_key, "AKIA123");
    assert_eq!(bedrock.region, "us-east-1");
}

#[test]
fn test_redacted_leaves_original_untouched() {
    let key = Key::new("k1", "sk-raw");
    let _ = key.redacted();
    assert_eq!(key.value, "sk-raw");
}
