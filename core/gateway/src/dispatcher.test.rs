use super::*;
use crate::plugins::Plugin;
use crate::plugins::ShortCircuit;
use bifrost_protocol::ChatResponse;
use bifrost_protocol::Key;
use bifrost_protocol::Message;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use bifrost_protocol::RequestInput;
use bifrost_protocol::ResponseMetadata;
use bifrost_protocol::ResponsePayload;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn chat_request(provider: Provider, model: &str) -> BifrostRequest {
    BifrostRequest::new(
        provider,
        model,
        RequestInput::ChatCompletion(vec![Message::user("hi")]),
    )
}

async fn registry_with_openai(server: &MockServer) -> Arc<ProviderRegistry> {
    let registry = Arc::new(ProviderRegistry::new());
    let mut config = ProviderConfig::with_key(Key::new("k1", "sk-test"));
    config.network.base_url = Some(server.uri());
    registry
        .add_provider(Provider::Openai, config)
        .await
        .expect("add openai");
    registry
}

fn mock_chat_success(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "model": "gpt-4o-mini",
        "choices": [{
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop",
        }],
    }))
}

/// Plugin that counts hook invocations.
#[derive(Default)]
struct CountingPlugin {
    pre_calls: AtomicUsize,
    post_calls: AtomicUsize,
}

#[async_trait]
impl Plugin for CountingPlugin {
    fn name(&self) -> &str {
        "counting"
    }

    async fn pre_hook(
        &self,
        _ctx: &mut RequestContext,
        _request: &mut BifrostRequest,
    ) -> Result<Option<ShortCircuit>, BifrostError> {
        self.pre_calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    async fn post_hook(
        &self,
        _ctx: &mut RequestContext,
        _outcome: &mut DispatchOutcome,
    ) -> Result<(), BifrostError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ShortCircuitPlugin;

#[async_trait]
impl Plugin for ShortCircuitPlugin {
    fn name(&self) -> &str {
        "canned"
    }

    async fn pre_hook(
        &self,
        _ctx: &mut RequestContext,
        _request: &mut BifrostRequest,
    ) -> Result<Option<ShortCircuit>, BifrostError> {
        Ok(Some(ShortCircuit::respond(BifrostResponse::new(
            ResponsePayload::ChatCompletion(
                ChatResponse::new("resp_canned", "gpt-4o-mini")
                    .with_content(vec![bifrost_protocol::ContentBlock::text("from cache")]),
            ),
            ResponseMetadata::new(Provider::Openai, "gpt-4o-mini", RequestKind::ChatCompletion),
        ))))
    }
}

#[tokio::test]
async fn test_happy_path_single_hop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(mock_chat_success("hello"))
        .mount(&server)
        .await;

    let registry = registry_with_openai(&server).await;
    let dispatcher = Dispatcher::new(registry, Arc::new(PluginPipeline::default()));

    let response = dispatcher
        .dispatch(
            &RequestContext::new(),
            chat_request(Provider::Openai, "gpt-4o-mini"),
        )
        .await
        .expect("served");

    assert_eq!(response.metadata.provider, Provider::Openai);
    assert_eq!(response.metadata.model_requested, "gpt-4o-mini");
    assert!(response.metadata.hop_error.is_none());
    assert_eq!(response.as_chat().expect("chat").text(), "hello");
}

#[tokio::test]
async fn test_fallback_on_unsupported_operation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(mock_chat_success("served by fallback"))
        .mount(&server)
        .await;

    let registry = registry_with_openai(&server).await;
    // Runway serves video only; its chat capability is a distinct
    // UnsupportedOperation that the dispatcher skips without retry.
    registry
        .add_provider(
            Provider::Runway,
            ProviderConfig::with_key(Key::new("k1", "rw-key")),
        )
        .await
        .expect("add runway");

    let dispatcher = Dispatcher::new(registry, Arc::new(PluginPipeline::default()));
    let request = chat_request(Provider::Runway, "gen4")
        .with_fallback(Provider::Openai, "gpt-4o-mini");

    let response = dispatcher
        .dispatch(&RequestContext::new(), request)
        .await
        .expect("fallback serves");

    assert_eq!(response.metadata.provider, Provider::Openai);
    let hop_error = response.metadata.hop_error.expect("first hop error recorded");
    assert_eq!(
        hop_error.kind,
        bifrost_error::ErrorKind::UnsupportedOperation
    );
    assert_eq!(hop_error.extra_fields.provider.as_deref(), Some("runway"));
}

#[tokio::test]
async fn test_exhausted_chain_returns_last_hop_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"message": "server melted"},
        })))
        .mount(&server)
        .await;

    let registry = registry_with_openai(&server).await;
    let dispatcher = Dispatcher::new(registry, Arc::new(PluginPipeline::default()));
    let request = chat_request(Provider::Runway, "gen4")
        .with_fallback(Provider::Openai, "gpt-4o-mini");

    let err = dispatcher
        .dispatch(&RequestContext::new(), request)
        .await
        .expect_err("all hops failed");

    // The last hop's error wins, annotated with its hop context.
    assert_eq!(err.kind, bifrost_error::ErrorKind::ProviderApi);
    assert_eq!(err.extra_fields.provider.as_deref(), Some("openai"));
    assert_eq!(err.extra_fields.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(
        err.extra_fields.request_kind.as_deref(),
        Some("chat_completion")
    );
    assert_eq!(err.extra_fields.fallback_index, Some(1));
}

#[tokio::test]
async fn test_empty_fallbacks_surface_primary_error() {
    let registry = Arc::new(ProviderRegistry::new());
    let dispatcher = Dispatcher::new(registry, Arc::new(PluginPipeline::default()));

    let err = dispatcher
        .dispatch(
            &RequestContext::new(),
            chat_request(Provider::Openai, "gpt-4o-mini"),
        )
        .await
        .expect_err("provider not configured");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Operation);
    assert_eq!(err.extra_fields.fallback_index, Some(0));
}

#[tokio::test]
async fn test_validation_failure_skips_hops_entirely() {
    let registry = Arc::new(ProviderRegistry::new());
    let pipeline = Arc::new(PluginPipeline::default());
    let dispatcher = Dispatcher::new(registry, pipeline);

    let err = dispatcher
        .dispatch(
            &RequestContext::new(),
            chat_request(Provider::Openai, ""),
        )
        .await
        .expect_err("empty model");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Validation);
}

#[tokio::test]
async fn test_short_circuit_bypasses_upstream_and_later_plugins() {
    let counting = Arc::new(CountingPlugin::default());
    // Registration order: short-circuit first, counter second; the
    // counter's hooks must never run.
    let pipeline = Arc::new(PluginPipeline::new(vec![
        Arc::new(ShortCircuitPlugin),
        counting.clone(),
    ]));
    let registry = Arc::new(ProviderRegistry::new());
    let dispatcher = Dispatcher::new(registry, pipeline);

    let response = dispatcher
        .dispatch(
            &RequestContext::new(),
            chat_request(Provider::Openai, "gpt-4o-mini"),
        )
        .await
        .expect("canned response");

    assert_eq!(response.as_chat().expect("chat").text(), "from cache");
    assert_eq!(counting.pre_calls.load(Ordering::SeqCst), 0);
    assert_eq!(counting.post_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_post_hooks_run_once_per_hop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(mock_chat_success("ok"))
        .mount(&server)
        .await;

    let registry = registry_with_openai(&server).await;
    let counting = Arc::new(CountingPlugin::default());
    let dispatcher = Dispatcher::new(
        registry,
        Arc::new(PluginPipeline::new(vec![counting.clone()])),
    );

    // Two hops: runway (not configured -> hop error) then openai.
    let request = chat_request(Provider::Runway, "gen4")
        .with_fallback(Provider::Openai, "gpt-4o-mini");
    dispatcher
        .dispatch(&RequestContext::new(), request)
        .await
        .expect("served");

    // Symmetry per hop: two hops ran, so two pre and two post.
    assert_eq!(counting.pre_calls.load(Ordering::SeqCst), 2);
    assert_eq!(counting.post_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stream_wrapper_runs_post_hooks_once_on_terminal() {
    let sse_body = concat!(
        "data: {\"id\":\"chatcmpl-1\",\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let registry = registry_with_openai(&server).await;
    let counting = Arc::new(CountingPlugin::default());
    let dispatcher = Dispatcher::new(
        registry,
        Arc::new(PluginPipeline::new(vec![counting.clone()])),
    );

    let mut stream = dispatcher
        .dispatch_stream(
            &RequestContext::new(),
            chat_request(Provider::Openai, "gpt-4o-mini"),
        )
        .await
        .expect("stream");

    let mut deltas = Vec::new();
    let mut terminals = 0;
    while let Some(chunk) = stream.recv().await {
        if chunk.is_terminal() {
            terminals += 1;
        } else if let Some(delta) = chunk.as_delta() {
            deltas.push(delta.to_string());
        }
    }

    assert_eq!(deltas, vec!["a", "b"], "chunks forward 1-for-1 in order");
    assert_eq!(terminals, 1, "exactly one terminal chunk");
    assert_eq!(counting.pre_calls.load(Ordering::SeqCst), 1);
    assert_eq!(counting.post_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stream_establishment_failure_falls_back() {
    let sse_body = "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\ndata: [DONE]\n\n";
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let registry = registry_with_openai(&server).await;
    registry
        .add_provider(
            Provider::Runway,
            ProviderConfig::with_key(Key::new("k1", "rw-key")),
        )
        .await
        .expect("add runway");

    let counting = Arc::new(CountingPlugin::default());
    let dispatcher = Dispatcher::new(
        registry,
        Arc::new(PluginPipeline::new(vec![counting.clone()])),
    );

    // Runway has no chat stream; the dispatcher falls back to openai.
    let request = chat_request(Provider::Runway, "gen4")
        .with_fallback(Provider::Openai, "gpt-4o-mini");
    let mut stream = dispatcher
        .dispatch_stream(&RequestContext::new(), request)
        .await
        .expect("fallback stream");

    let mut saw_terminal = false;
    while let Some(chunk) = stream.recv().await {
        if chunk.is_terminal() {
            saw_terminal = true;
        }
    }
    assert!(saw_terminal);

    // First hop resolved with post-hooks at establishment failure; the
    // second hop's post-hooks ran on the wrapper's terminal chunk.
    assert_eq!(counting.pre_calls.load(Ordering::SeqCst), 2);
    assert_eq!(counting.post_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stream_cancellation_terminates_with_post_hooks_once() {
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"first\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let registry = registry_with_openai(&server).await;
    let counting = Arc::new(CountingPlugin::default());
    let dispatcher = Dispatcher::new(
        registry,
        Arc::new(PluginPipeline::new(vec![counting.clone()])),
    );

    let ctx = RequestContext::new();
    let mut stream = dispatcher
        .dispatch_stream(&ctx, chat_request(Provider::Openai, "gpt-4o-mini"))
        .await
        .expect("stream");

    // Cancel once the first chunk arrives, then drain.
    let first = stream.recv().await.expect("first chunk");
    assert_eq!(first.as_delta(), Some("first"));
    ctx.cancel();

    let mut terminals = 0;
    while let Some(chunk) = stream.recv().await {
        if chunk.is_terminal() {
            terminals += 1;
        }
    }
    assert_eq!(terminals, 1, "the stream still closes with one terminal");
    assert_eq!(
        counting.post_calls.load(Ordering::SeqCst),
        1,
        "post-hooks run exactly once whatever the terminal was"
    );
}
