use super::*;
use bifrost_protocol::ChatResponse;
use bifrost_protocol::ModelParameters;

struct ChatOnlyAdapter;

#[async_trait]
impl ProviderAdapter for ChatOnlyAdapter {
    fn provider(&self) -> Provider {
        Provider::Custom("chat_only".to_string())
    }

    async fn chat_completion(
        &self,
        _call: AdapterCall<'_>,
        _messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        Ok(UnaryOutcome::new(
            ResponsePayload::ChatCompletion(ChatResponse::new("resp_1", "m")),
            7,
        ))
    }
}

fn call_parts() -> (RequestContext, Key, ModelParameters) {
    (
        RequestContext::new(),
        Key::new("k1", "sk"),
        ModelParameters::default(),
    )
}

fn call<'a>(
    ctx: &'a RequestContext,
    key: &'a Key,
    params: &'a ModelParameters,
) -> AdapterCall<'a> {
    AdapterCall {
        ctx,
        key,
        model: "m",
        params,
        raw_request: false,
        raw_response: false,
    }
}

#[tokio::test]
async fn test_execute_unary_routes_by_input() {
    let adapter = ChatOnlyAdapter;
    let (ctx, key, params) = call_parts();

    let outcome = execute_unary(
        &adapter,
        call(&ctx, &key, &params),
        &RequestInput::ChatCompletion(vec![Message::user("hi")]),
    )
    .await
    .expect("chat");
    assert_eq!(outcome.latency_ms, 7);
}

#[tokio::test]
async fn test_unimplemented_capability_is_unsupported() {
    let adapter = ChatOnlyAdapter;
    let (ctx, key, params) = call_parts();

    let err = execute_unary(
        &adapter,
        call(&ctx, &key, &params),
        &RequestInput::ListModels,
    )
    .await
    .expect_err("unsupported");
    assert_eq!(err.kind, bifrost_error::ErrorKind::UnsupportedOperation);
    assert!(err.error.message.contains("chat_only"));
    assert!(err.error.message.contains("list_models"));
}

#[tokio::test]
async fn test_execute_stream_rejects_non_streamable_kinds() {
    let adapter = ChatOnlyAdapter;
    let (ctx, key, params) = call_parts();

    let err = execute_stream(
        &adapter,
        call(&ctx, &key, &params),
        &RequestInput::ListModels,
    )
    .await
    .expect_err("no streaming variant");
    assert_eq!(err.kind, bifrost_error::ErrorKind::UnsupportedOperation);
    assert!(err.error.message.contains("list_models_stream"));
}

#[tokio::test]
async fn test_execute_stream_unimplemented_is_unsupported() {
    let adapter = ChatOnlyAdapter;
    let (ctx, key, params) = call_parts();

    let err = execute_stream(
        &adapter,
        call(&ctx, &key, &params),
        &RequestInput::ChatCompletion(vec![Message::user("hi")]),
    )
    .await
    .expect_err("stream not implemented");
    assert_eq!(err.kind, bifrost_error::ErrorKind::UnsupportedOperation);
}
