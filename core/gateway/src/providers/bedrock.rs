//! AWS Bedrock adapter.
//!
//! Serves chat through `InvokeModel` with SigV4-signed requests. Bedrock
//! keys carry AWS credentials and a region instead of a bearer secret;
//! the Anthropic body shape is reused for `anthropic.*` model families.

use crate::http::apply_extra_headers;
use crate::http::build_http_client;
use crate::provider::AdapterCall;
use crate::provider::ProviderAdapter;
use crate::provider::UnaryOutcome;
use crate::providers::anthropic;
use crate::providers::sigv4;
use crate::providers::sigv4::SigningKeyCache;
use crate::providers::sigv4::SigningParams;
use async_trait::async_trait;
use bifrost_error::BifrostError;
use bifrost_protocol::BedrockKeyConfig;
use bifrost_protocol::Key;
use bifrost_protocol::Message;
use bifrost_protocol::NetworkConfig;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use bifrost_protocol::RequestContext;
use bifrost_protocol::ResponsePayload;
use chrono::Utc;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::percent_encode;
use serde_json::Value;
use serde_json::json;
use std::time::Instant;

const ANTHROPIC_BEDROCK_VERSION: &str = "bedrock-2023-05-31";
const DEFAULT_MAX_TOKENS: i32 = 4096;
const SERVICE: &str = "bedrock";

/// Adapter for AWS Bedrock `InvokeModel`.
pub struct BedrockAdapter {
    client: reqwest::Client,
    network: NetworkConfig,
    signing_keys: SigningKeyCache,
}

impl BedrockAdapter {
    /// Build the adapter from the provider config.
    pub fn new(config: &ProviderConfig) -> Result<Self, BifrostError> {
        Ok(Self {
            client: build_http_client(&config.network, config.proxy.as_ref())?,
            network: config.network.clone(),
            signing_keys: SigningKeyCache::new(),
        })
    }

    fn bedrock_config<'a>(key: &'a Key) -> Result<&'a BedrockKeyConfig, BifrostError> {
        key.bedrock_config.as_ref().ok_or_else(|| {
            BifrostError::operation(format!("key {} carries no bedrock credentials", key.id))
        })
    }

    fn endpoint(bedrock: &BedrockKeyConfig) -> String {
        match &bedrock.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", bedrock.region),
        }
    }

    fn invoke_path(model: &str) -> String {
        // The model id is a single path segment; characters outside the
        // unreserved set (":" in particular) are URI-encoded.
        const PATH_CHARS: AsciiSet = NON_ALPHANUMERIC
            .remove(b'-')
            .remove(b'_')
            .remove(b'.')
            .remove(b'~');
        format!("/model/{}/invoke", percent_encode(model.as_bytes(), &PATH_CHARS))
    }

    async fn invoke(
        &self,
        ctx: &RequestContext,
        key: &Key,
        model: &str,
        body: Value,
    ) -> Result<(Value, u64), BifrostError> {
        let bedrock = Self::bedrock_config(key)?;
        let endpoint = Self::endpoint(bedrock);
        let path = Self::invoke_path(model);
        let url = format!("{endpoint}{path}");
        let payload = serde_json::to_vec(&body)?;

        let host = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .and_then(|rest| rest.split('/').next())
            .unwrap_or_default()
            .to_string();
        let base_headers = vec![
            ("host".to_string(), host),
            ("content-type".to_string(), "application/json".to_string()),
        ];

        let signed = sigv4::sign_request(
            &self.signing_keys,
            &SigningParams {
                access_key: &bedrock.access_key,
                secret_key: &bedrock.secret_key,
                session_token: bedrock.session_token.as_deref(),
                region: &bedrock.region,
                service: SERVICE,
            },
            "POST",
            &path,
            "",
            &base_headers,
            &payload,
            Utc::now(),
        )?;

        let mut builder = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(payload);
        for (name, value) in signed {
            builder = builder.header(name, value);
        }
        builder = apply_extra_headers(builder, &self.network);
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }

        let started = Instant::now();
        let response = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(BifrostError::canceled()),
            response = builder.send() => response?,
        };
        let status = response.status();
        let bytes = response.bytes().await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &bytes));
        }
        Ok((serde_json::from_slice(&bytes)?, latency_ms))
    }
}

#[async_trait]
impl ProviderAdapter for BedrockAdapter {
    fn provider(&self) -> Provider {
        Provider::Bedrock
    }

    async fn chat_completion(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        let (system, wire_messages) = anthropic::messages_to_wire(messages);
        let mut body = json!({
            "anthropic_version": ANTHROPIC_BEDROCK_VERSION,
            "messages": wire_messages,
            "max_tokens": call.params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        anthropic::apply_params(&mut body, call.params);
        // InvokeModel addresses the model through the path, not the body.
        if let Some(object) = body.as_object_mut() {
            object.remove("model");
        }

        let raw_request = call.raw_request.then(|| body.clone());
        let (response, latency_ms) = self.invoke(call.ctx, call.key, call.model, body).await?;

        let mut chat = anthropic::parse_messages_response(&response)?;
        if chat.model.is_empty() {
            chat.model = call.model.to_string();
        }

        let mut outcome =
            UnaryOutcome::new(ResponsePayload::ChatCompletion(chat), latency_ms);
        outcome.raw_request = raw_request;
        outcome.raw_response = call.raw_response.then_some(response);
        Ok(outcome)
    }
}

fn parse_error(status: u16, body: &[u8]) -> BifrostError {
    if let Ok(value) = serde_json::from_slice::<Value>(body)
        && let Some(message) = value.get("message").and_then(Value::as_str)
    {
        return BifrostError::provider_api(status, message);
    }
    BifrostError::provider_api(status, String::from_utf8_lossy(body).to_string())
}

#[cfg(test)]
#[path = "bedrock.test.rs"]
mod tests;
