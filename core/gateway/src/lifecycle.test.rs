use super::*;
use bifrost_protocol::Key;

#[tokio::test]
async fn test_add_get_remove_provider() {
    let registry = ProviderRegistry::new();
    assert!(registry.get(&Provider::Openai).is_none());

    registry
        .add_provider(
            Provider::Openai,
            ProviderConfig::with_key(Key::new("k1", "sk-test")),
        )
        .await
        .expect("add");
    assert!(registry.get(&Provider::Openai).is_some());
    assert_eq!(registry.configured_providers(), vec![Provider::Openai]);

    registry
        .remove_provider(&Provider::Openai)
        .await
        .expect("remove");
    assert!(registry.get(&Provider::Openai).is_none());
    assert!(registry.configured_providers().is_empty());
}

#[tokio::test]
async fn test_duplicate_add_rejected() {
    let registry = ProviderRegistry::new();
    registry
        .add_provider(
            Provider::Openai,
            ProviderConfig::with_key(Key::new("k1", "sk-test")),
        )
        .await
        .expect("add");

    let err = registry
        .add_provider(
            Provider::Openai,
            ProviderConfig::with_key(Key::new("k2", "sk-other")),
        )
        .await
        .expect_err("duplicate");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);
}

#[tokio::test]
async fn test_invalid_sizing_rejected_on_add_and_update() {
    let registry = ProviderRegistry::new();

    let mut config = ProviderConfig::with_key(Key::new("k1", "sk-test"));
    config.concurrency_and_buffer_size = ConcurrencyAndBufferSize {
        concurrency: 10,
        buffer_size: 5,
    };
    let err = registry
        .add_provider(Provider::Openai, config)
        .await
        .expect_err("concurrency above buffer_size");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);

    registry
        .add_provider(
            Provider::Openai,
            ProviderConfig::with_key(Key::new("k1", "sk-test")),
        )
        .await
        .expect("add");

    // Updates reject the inverted invariant rather than clamping it.
    let err = registry
        .update_provider_concurrency(
            &Provider::Openai,
            ConcurrencyAndBufferSize {
                concurrency: 8,
                buffer_size: 4,
            },
        )
        .await
        .expect_err("rejected");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);
}

#[tokio::test]
async fn test_update_concurrency_swaps_pool() {
    let registry = ProviderRegistry::new();
    registry
        .add_provider(
            Provider::Openai,
            ProviderConfig::with_key(Key::new("k1", "sk-test")),
        )
        .await
        .expect("add");

    registry
        .update_provider_concurrency(
            &Provider::Openai,
            ConcurrencyAndBufferSize {
                concurrency: 3,
                buffer_size: 7,
            },
        )
        .await
        .expect("resize");

    let runtime = registry.get(&Provider::Openai).expect("runtime");
    assert_eq!(runtime.pool().sizing(), (3, 7));
    assert_eq!(
        runtime.config_snapshot().concurrency_and_buffer_size.concurrency,
        3
    );
}

#[tokio::test]
async fn test_update_drop_excess() {
    let registry = ProviderRegistry::new();
    registry
        .add_provider(
            Provider::Openai,
            ProviderConfig::with_key(Key::new("k1", "sk-test")),
        )
        .await
        .expect("add");

    registry
        .update_drop_excess_requests(&Provider::Openai, true)
        .expect("flip");
    let runtime = registry.get(&Provider::Openai).expect("runtime");
    assert!(runtime.config_snapshot().drop_excess_requests);

    let err = registry
        .update_drop_excess_requests(&Provider::Anthropic, true)
        .expect_err("unknown provider");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);
}

#[tokio::test]
async fn test_custom_provider_requires_base_config() {
    let registry = ProviderRegistry::new();
    let err = registry
        .add_provider(
            Provider::Custom("acme".to_string()),
            ProviderConfig::with_key(Key::new("k1", "sk-test")),
        )
        .await
        .expect_err("needs custom_provider_config");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);

    let mut config = ProviderConfig::with_key(Key::new("k1", "sk-test"));
    config.custom_provider_config = Some(bifrost_protocol::CustomProviderConfig {
        base_provider: Provider::Openai,
    });
    config.network.base_url = Some("https://llm.acme.internal".to_string());
    registry
        .add_provider(Provider::Custom("acme".to_string()), config)
        .await
        .expect("custom provider over the openai wire format");
}

#[tokio::test]
async fn test_shutdown_drains_everything() {
    let registry = ProviderRegistry::new();
    registry
        .add_provider(
            Provider::Openai,
            ProviderConfig::with_key(Key::new("k1", "sk-test")),
        )
        .await
        .expect("add openai");
    registry
        .add_provider(
            Provider::Anthropic,
            ProviderConfig::with_key(Key::new("k2", "sk-ant")),
        )
        .await
        .expect("add anthropic");

    registry.shutdown().await;
    assert!(registry.configured_providers().is_empty());
}
