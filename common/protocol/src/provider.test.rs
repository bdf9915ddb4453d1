use super::*;
use crate::key::Key;

#[test]
fn test_provider_roundtrip() {
    for name in ["openai", "anthropic", "bedrock", "runway"] {
        assert_eq!(Provider::parse(name).as_str(), name);
    }
    let custom = Provider::parse("my_llm");
    assert_eq!(custom, Provider::Custom("my_llm".to_string()));
    assert_eq!(custom.as_str(), "my_llm");
}

#[test]
fn test_provider_serde() {
    let json = serde_json::to_string(&Provider::Openai).expect("serialize");
    assert_eq!(json, "\"openai\"");

    let parsed: Provider = serde_json::from_str("\"anthropic\"").expect("deserialize");
    assert_eq!(parsed, Provider::Anthropic);

    // Unknown names deserialize through the untagged fallback.
    let parsed: Provider = serde_json::from_str("\"acme\"").expect("deserialize");
    assert_eq!(parsed, Provider::Custom("acme".to_string()));
}

#[test]
fn test_base_url_trailing_slash_trimmed() {
    let network = NetworkConfig::default().with_base_url("https://api.example.com/v1///");
    assert_eq!(network.trimmed_base_url(), Some("https://api.example.com/v1"));
}

#[test]
fn test_concurrency_invariant() {
    let ok = ConcurrencyAndBufferSize {
        concurrency: 2,
        buffer_size: 4,
    };
    assert!(ok.validate().is_ok());

    let equal = ConcurrencyAndBufferSize {
        concurrency: 4,
        buffer_size: 4,
    };
    assert!(equal.validate().is_ok());

    let inverted = ConcurrencyAndBufferSize {
        concurrency: 5,
        buffer_size: 4,
    };
    assert!(inverted.validate().is_err());

    let zero = ConcurrencyAndBufferSize {
        concurrency: 0,
        buffer_size: 4,
    };
    assert!(zero.validate().is_err());
}

#[test]
fn test_provider_config_validate_delegates_to_sizing() {
    let mut config = ProviderConfig::with_key(Key::new("k1", "sk-test"));
    assert!(config.validate().is_ok());

    config.concurrency_and_buffer_size.concurrency = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_provider_config_redacted_covers_every_key() {
    let config = ProviderConfig {
        keys: vec![Key::new("k1", "sk-one"), Key::new("k2", "sk-two")],
        ..ProviderConfig::default()
    };

    let redacted = config.redacted();
    assert!(
        redacted
            .keys
            .iter()
            .all(|key| key.value == crate::redact::SENTINEL)
    );
    // Non-secret fields and the original survive.
    assert_eq!(redacted.keys[0].id, "k1");
    assert_eq!(config.keys[0].value, "sk-one");
}
