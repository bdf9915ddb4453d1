use super::*;
use crate::provider::AdapterCall;
use bifrost_protocol::ModelParameters;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn bedrock_key(endpoint: Option<String>) -> Key {
    Key::new("k1", "unused").with_bedrock_config(BedrockKeyConfig {
        access_key: "AKIAEXAMPLE".to_string(),
        secret_key: "wJalrXUtnFEMI/K7MDENG".to_string(),
        session_token: None,
        region: "us-east-1".to_string(),
        endpoint,
    })
}

#[test]
fn test_invoke_path_encodes_model_segment() {
    assert_eq!(
        BedrockAdapter::invoke_path("anthropic.claude-3-sonnet-20240229-v1:0"),
        "/model/anthropic.claude-3-sonnet-20240229-v1%3A0/invoke"
    );
}

#[test]
fn test_endpoint_defaults_to_regional_host() {
    let bedrock = bedrock_key(None);
    let config = bedrock.bedrock_config.as_ref().expect("config");
    assert_eq!(
        BedrockAdapter::endpoint(config),
        "https://bedrock-runtime.us-east-1.amazonaws.com"
    );

    let with_override = bedrock_key(Some("https://vpce.example.com/".to_string()));
    let config = with_override.bedrock_config.as_ref().expect("config");
    assert_eq!(BedrockAdapter::endpoint(config), "https://vpce.example.com");
}

#[tokio::test]
async fn test_key_without_bedrock_config_fails() {
    let config = ProviderConfig::with_key(Key::new("k1", "sk"));
    let adapter = BedrockAdapter::new(&config).expect("adapter");

    let ctx = RequestContext::new();
    let key = Key::new("k1", "sk");
    let params = ModelParameters::default();
    let err = adapter
        .chat_completion(
            AdapterCall {
                ctx: &ctx,
                key: &key,
                model: "anthropic.claude-3",
                params: &params,
                raw_request: false,
                raw_response: false,
            },
            &[Message::user("hi")],
        )
        .await
        .expect_err("no credentials");
    assert_eq!(err.kind, bifrost_error::ErrorKind::Operation);
}

#[tokio::test]
async fn test_chat_completion_signs_and_parses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/model/anthropic.claude-3/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "content": [{"type": "text", "text": "from bedrock"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 5, "output_tokens": 3},
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::with_key(bedrock_key(Some(server.uri())));
    let adapter = BedrockAdapter::new(&config).expect("adapter");
    let ctx = RequestContext::new();
    let key = bedrock_key(Some(server.uri()));
    let params = ModelParameters::default();

    let outcome = adapter
        .chat_completion(
            AdapterCall {
                ctx: &ctx,
                key: &key,
                model: "anthropic.claude-3",
                params: &params,
                raw_request: false,
                raw_response: false,
            },
            &[Message::user("hi")],
        )
        .await
        .expect("chat");

    match outcome.payload {
        ResponsePayload::ChatCompletion(chat) => {
            assert_eq!(chat.text(), "from bedrock");
            // InvokeModel omits the model from the body; it fills from the
            // requested model instead.
            assert_eq!(chat.model, "anthropic.claude-3");
        }
        other => panic!("expected chat payload, got {other:?}"),
    }

    // The request carried SigV4 headers.
    let requests = server.received_requests().await.expect("requests");
    let request = &requests[0];
    let authorization = request
        .headers
        .get("authorization")
        .expect("authorization header")
        .to_str()
        .expect("ascii");
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIAEXAMPLE/"));
    assert!(authorization.contains("/us-east-1/bedrock/aws4_request"));
    assert!(request.headers.get("x-amz-date").is_some());
    assert!(request.headers.get("x-amz-content-sha256").is_some());
}

#[tokio::test]
async fn test_error_message_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "The security token included in the request is invalid",
        })))
        .mount(&server)
        .await;

    let config = ProviderConfig::with_key(bedrock_key(Some(server.uri())));
    let adapter = BedrockAdapter::new(&config).expect("adapter");
    let ctx = RequestContext::new();
    let key = bedrock_key(Some(server.uri()));
    let params = ModelParameters::default();

    let err = adapter
        .chat_completion(
            AdapterCall {
                ctx: &ctx,
                key: &key,
                model: "anthropic.claude-3",
                params: &params,
                raw_request: false,
                raw_response: false,
            },
            &[Message::user("hi")],
        )
        .await
        .expect_err("forbidden");
    assert_eq!(err.status_code, Some(403));
    assert!(err.error.message.contains("security token"));
}

#[tokio::test]
async fn test_streaming_is_unsupported() {
    let config = ProviderConfig::with_key(bedrock_key(None));
    let adapter = BedrockAdapter::new(&config).expect("adapter");
    let ctx = RequestContext::new();
    let key = bedrock_key(None);
    let params = ModelParameters::default();

    let err = adapter
        .chat_completion_stream(
            AdapterCall {
                ctx: &ctx,
                key: &key,
                model: "anthropic.claude-3",
                params: &params,
                raw_request: false,
                raw_response: false,
            },
            &[Message::user("hi")],
        )
        .await
        .expect_err("unsupported");
    assert_eq!(err.kind, bifrost_error::ErrorKind::UnsupportedOperation);
}
