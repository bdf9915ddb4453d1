use super::*;
use bifrost_protocol::EmbeddingInput;
use bifrost_protocol::Key;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

async fn gateway_with_openai(server: &MockServer) -> Bifrost {
    let mut config = ProviderConfig::with_key(Key::new("k1", "sk-test"));
    config.network.base_url = Some(server.uri());
    Bifrost::new(BifrostInit {
        providers: vec![(Provider::Openai, config)],
        ..BifrostInit::default()
    })
    .await
    .expect("gateway")
}

fn chat_request() -> BifrostRequest {
    BifrostRequest::new(
        Provider::Openai,
        "gpt-4o-mini",
        RequestInput::ChatCompletion(vec![Message::user("hi")]),
    )
}

#[tokio::test]
async fn test_happy_chat_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {"role": "assistant", "content": "hello!"},
                "finish_reason": "stop",
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3},
        })))
        .mount(&server)
        .await;

    let gateway = gateway_with_openai(&server).await;
    let response = gateway
        .chat_completion(&RequestContext::new(), chat_request())
        .await
        .expect("served");

    assert_eq!(response.metadata.provider, Provider::Openai);
    assert_eq!(response.metadata.request_kind, RequestKind::ChatCompletion);
    assert_eq!(response.as_chat().expect("chat").text(), "hello!");

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_kind_mismatch_is_validation_error() {
    let server = MockServer::start().await;
    let gateway = gateway_with_openai(&server).await;

    // A chat input handed to the embedding entry point never dispatches.
    let err = gateway
        .embedding(&RequestContext::new(), chat_request())
        .await
        .expect_err("wrong kind");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);

    let err = gateway
        .speech_stream(&RequestContext::new(), chat_request())
        .await
        .expect_err("wrong kind for stream entry");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_embedding_entry_dispatches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "text-embedding-3-small",
            "data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}],
        })))
        .mount(&server)
        .await;

    let gateway = gateway_with_openai(&server).await;
    let request = BifrostRequest::new(
        Provider::Openai,
        "text-embedding-3-small",
        RequestInput::Embedding(EmbeddingInput::single("embed me")),
    );
    let response = gateway
        .embedding(&RequestContext::new(), request)
        .await
        .expect("embedding");

    let embedding = response.as_embedding().expect("payload");
    assert_eq!(embedding.embeddings[0].embedding.len(), 3);

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_lifecycle_surface() {
    let server = MockServer::start().await;
    let gateway = gateway_with_openai(&server).await;

    assert_eq!(gateway.get_configured_providers(), vec![Provider::Openai]);

    gateway
        .add_provider(
            Provider::Anthropic,
            ProviderConfig::with_key(Key::new("k2", "sk-ant")),
        )
        .await
        .expect("add anthropic");
    assert_eq!(
        gateway.get_configured_providers(),
        vec![Provider::Anthropic, Provider::Openai]
    );

    gateway
        .update_provider_concurrency(
            &Provider::Openai,
            ConcurrencyAndBufferSize {
                concurrency: 2,
                buffer_size: 8,
            },
        )
        .await
        .expect("resize");
    gateway
        .update_drop_excess_requests(&Provider::Openai, true)
        .expect("flip drop policy");

    gateway
        .remove_provider(&Provider::Anthropic)
        .await
        .expect("remove");
    assert_eq!(gateway.get_configured_providers(), vec![Provider::Openai]);

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_provider_config_listing_is_redacted() {
    let server = MockServer::start().await;
    let gateway = gateway_with_openai(&server).await;

    let config = gateway
        .get_provider_config(&Provider::Openai)
        .expect("configured provider");
    assert_eq!(config.keys.len(), 1);
    assert_eq!(config.keys[0].id, "k1");
    // The raw secret never leaves the registry.
    assert_eq!(config.keys[0].value, bifrost_protocol::redact::SENTINEL);

    assert!(gateway.get_provider_config(&Provider::Anthropic).is_none());

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_dispatch_after_shutdown_fails() {
    let server = MockServer::start().await;
    let gateway = gateway_with_openai(&server).await;
    gateway.shutdown().await;

    let err = gateway
        .chat_completion(&RequestContext::new(), chat_request())
        .await
        .expect_err("no providers after shutdown");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Operation);
}

#[tokio::test]
async fn test_mcp_surface_without_clients() {
    let server = MockServer::start().await;
    let gateway = gateway_with_openai(&server).await;

    assert!(gateway.get_mcp_clients().is_empty());
    assert!(gateway.get_mcp_tools(&RequestContext::new()).is_empty());

    let err = gateway
        .execute_chat_mcp_tool(
            &RequestContext::new(),
            &ToolCall::new("c1", "git-status", json!({})),
        )
        .await
        .expect_err("no clients registered");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);

    gateway.shutdown().await;
}
