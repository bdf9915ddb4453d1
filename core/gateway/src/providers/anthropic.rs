//! Anthropic adapter.
//!
//! Speaks the Messages API: system prompt extracted from the message list,
//! content blocks mapped one-to-one, tools as input-schema definitions.
//! Streaming follows the event-typed SSE wire (`content_block_delta`,
//! `message_delta`, `message_stop`).

use crate::http::apply_extra_headers;
use crate::http::build_http_client;
use crate::provider::AdapterCall;
use crate::provider::ChunkReceiver;
use crate::provider::ProviderAdapter;
use crate::provider::UnaryOutcome;
use crate::sse::ParsedEvent;
use crate::sse::spawn_sse_stream;
use async_trait::async_trait;
use bifrost_error::BifrostError;
use bifrost_protocol::ChatResponse;
use bifrost_protocol::ContentBlock;
use bifrost_protocol::CountTokensResponse;
use bifrost_protocol::FinishReason;
use bifrost_protocol::ImageSource;
use bifrost_protocol::Key;
use bifrost_protocol::Message;
use bifrost_protocol::ModelParameters;
use bifrost_protocol::NetworkConfig;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use bifrost_protocol::RequestContext;
use bifrost_protocol::RequestKind;
use bifrost_protocol::ResponseMetadata;
use bifrost_protocol::ResponsePayload;
use bifrost_protocol::Role;
use bifrost_protocol::StreamChunk;
use bifrost_protocol::TokenUsage;
use bifrost_protocol::ToolChoice;
use serde_json::Value;
use serde_json::json;
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Default max_tokens when the caller set none; the Messages API requires
/// the field.
const DEFAULT_MAX_TOKENS: i32 = 4096;

/// Adapter for the Anthropic Messages API.
pub struct AnthropicAdapter {
    client: reqwest::Client,
    network: NetworkConfig,
    base_url: String,
}

impl AnthropicAdapter {
    /// Build the adapter from the provider config.
    pub fn new(config: &ProviderConfig) -> Result<Self, BifrostError> {
        let client = build_http_client(&config.network, config.proxy.as_ref())?;
        let base_url = config
            .network
            .trimmed_base_url()
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();
        Ok(Self {
            client,
            network: config.network.clone(),
            base_url,
        })
    }

    fn authed(
        &self,
        ctx: &RequestContext,
        key: &Key,
        builder: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        let mut builder = apply_extra_headers(
            builder
                .header("x-api-key", &key.value)
                .header("anthropic-version", API_VERSION),
            &self.network,
        );
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }
        builder
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BifrostError> {
        let response = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(BifrostError::canceled()),
            response = builder.send() => response?,
        };
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &body));
        }
        Ok(response)
    }

    fn messages_body(
        &self,
        call: &AdapterCall<'_>,
        messages: &[Message],
        stream: bool,
    ) -> Value {
        let (system, wire_messages) = messages_to_wire(messages);
        let mut body = json!({
            "model": call.model,
            "messages": wire_messages,
            "max_tokens": call.params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        if stream {
            body["stream"] = json!(true);
        }
        apply_params(&mut body, call.params);
        body
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn chat_completion(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        let body = self.messages_body(&call, messages, false);
        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(format!("{}/v1/messages", self.base_url)),
            )
            .json(&body);

        let started = Instant::now();
        let response = self.send(call.ctx, builder).await?;
        let response_body: Value = serde_json::from_slice(&response.bytes().await?)?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let mut outcome = UnaryOutcome::new(
            ResponsePayload::ChatCompletion(parse_messages_response(&response_body)?),
            latency_ms,
        );
        if call.raw_request {
            outcome.raw_request = Some(body);
        }
        if call.raw_response {
            outcome.raw_response = Some(response_body);
        }
        Ok(outcome)
    }

    async fn chat_completion_stream(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<ChunkReceiver, BifrostError> {
        let body = self.messages_body(&call, messages, true);
        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(format!("{}/v1/messages", self.base_url)),
            )
            .json(&body);

        let started = Instant::now();
        let response = self.send(call.ctx, builder).await?;
        let metadata = ResponseMetadata::new(
            Provider::Anthropic,
            call.model,
            RequestKind::ChatCompletion,
        );
        Ok(spawn_sse_stream(
            response,
            call.ctx.clone(),
            metadata,
            started,
            parse_stream_event,
        ))
    }

    async fn count_tokens(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        let (system, wire_messages) = messages_to_wire(messages);
        let mut body = json!({
            "model": call.model,
            "messages": wire_messages,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client
                    .post(format!("{}/v1/messages/count_tokens", self.base_url)),
            )
            .json(&body);

        let started = Instant::now();
        let response = self.send(call.ctx, builder).await?;
        let response_body: Value = serde_json::from_slice(&response.bytes().await?)?;

        Ok(UnaryOutcome::new(
            ResponsePayload::CountTokens(CountTokensResponse {
                input_tokens: response_body
                    .get("input_tokens")
                    .and_then(Value::as_i64)
                    .unwrap_or(0),
            }),
            started.elapsed().as_millis() as u64,
        ))
    }
}

/// Parse an Anthropic error body.
pub(crate) fn parse_error(status: u16, body: &[u8]) -> BifrostError {
    if let Ok(value) = serde_json::from_slice::<Value>(body)
        && let Some(error) = value.get("error")
    {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("upstream error");
        let mut err = BifrostError::provider_api(status, message);
        if let Some(error_type) = error.get("type").and_then(Value::as_str) {
            err = err.with_type(error_type);
        }
        return err;
    }
    BifrostError::provider_api(status, String::from_utf8_lossy(body).to_string())
}

fn content_block_to_wire(block: &ContentBlock) -> Option<Value> {
    match block {
        ContentBlock::Text { text } => Some(json!({"type": "text", "text": text})),
        ContentBlock::Image { source } => {
            let source = match source {
                ImageSource::Base64 { data, media_type } => json!({
                    "type": "base64",
                    "media_type": media_type,
                    "data": data,
                }),
                ImageSource::Url { url } => json!({"type": "url", "url": url}),
            };
            Some(json!({"type": "image", "source": source}))
        }
        ContentBlock::ToolUse { id, name, input } => Some(json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        })),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => Some(json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content.to_text(),
            "is_error": is_error,
        })),
        ContentBlock::Thinking { content, signature } => Some(json!({
            "type": "thinking",
            "thinking": content,
            "signature": signature,
        })),
    }
}

/// Split portable messages into the system prompt and wire messages.
///
/// Tool results ride as user-role content blocks, per the Messages API.
pub(crate) fn messages_to_wire(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system = Vec::new();
    let mut wire = Vec::new();

    for message in messages {
        match message.role {
            Role::System => system.push(message.text()),
            Role::Tool => {
                let blocks: Vec<Value> = message
                    .content
                    .iter()
                    .filter_map(content_block_to_wire)
                    .collect();
                wire.push(json!({"role": "user", "content": blocks}));
            }
            role => {
                let role_name = if role == Role::Assistant {
                    "assistant"
                } else {
                    "user"
                };
                let blocks: Vec<Value> = message
                    .content
                    .iter()
                    .filter_map(content_block_to_wire)
                    .collect();
                wire.push(json!({"role": role_name, "content": blocks}));
            }
        }
    }

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n"))
    };
    (system, wire)
}

/// Fold portable parameters into a Messages API body.
pub(crate) fn apply_params(body: &mut Value, params: &ModelParameters) {
    if let Some(temperature) = params.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = params.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(top_k) = params.top_k {
        body["top_k"] = json!(top_k);
    }
    if let Some(stop) = &params.stop_sequences {
        body["stop_sequences"] = json!(stop);
    }
    if let Some(tools) = &params.tools
        && !tools.is_empty()
    {
        body["tools"] = Value::Array(
            tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "input_schema": tool.parameters,
                    })
                })
                .collect(),
        );
    }
    if let Some(choice) = &params.tool_choice {
        body["tool_choice"] = match choice {
            ToolChoice::Auto => json!({"type": "auto"}),
            ToolChoice::Required => json!({"type": "any"}),
            ToolChoice::None => json!({"type": "none"}),
            ToolChoice::Tool { name } => json!({"type": "tool", "name": name}),
        };
    }
    for (key, value) in &params.extra {
        body[key.as_str()] = value.clone();
    }
}

pub(crate) fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::MaxTokens,
        "tool_use" => FinishReason::ToolCalls,
        _ => FinishReason::Other,
    }
}

pub(crate) fn parse_usage(value: &Value) -> Option<TokenUsage> {
    let usage = value.as_object()?;
    let mut parsed = TokenUsage::new(
        usage.get("input_tokens").and_then(Value::as_i64).unwrap_or(0),
        usage
            .get("output_tokens")
            .and_then(Value::as_i64)
            .unwrap_or(0),
    );
    parsed.cache_read_tokens = usage
        .get("cache_read_input_tokens")
        .and_then(Value::as_i64);
    Some(parsed)
}

/// Parse a unary Messages API response.
pub(crate) fn parse_messages_response(body: &Value) -> Result<ChatResponse, BifrostError> {
    let blocks = body
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| BifrostError::decode("messages response has no content"))?;

    let mut content = Vec::new();
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    content.push(ContentBlock::text(text));
                }
            }
            Some("tool_use") => {
                content.push(ContentBlock::tool_use(
                    block.get("id").and_then(Value::as_str).unwrap_or_default(),
                    block.get("name").and_then(Value::as_str).unwrap_or_default(),
                    block.get("input").cloned().unwrap_or(Value::Null),
                ));
            }
            Some("thinking") => {
                content.push(ContentBlock::Thinking {
                    content: block
                        .get("thinking")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    signature: block
                        .get("signature")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
            _ => {}
        }
    }

    let mut response = ChatResponse::new(
        body.get("id").and_then(Value::as_str).unwrap_or_default(),
        body.get("model").and_then(Value::as_str).unwrap_or_default(),
    )
    .with_content(content);
    if let Some(reason) = body.get("stop_reason").and_then(Value::as_str) {
        response.finish_reason = map_stop_reason(reason);
    }
    if let Some(usage) = body.get("usage") {
        response.usage = parse_usage(usage);
    }
    Ok(response)
}

/// Parse one Messages API SSE event.
///
/// Tool-call argument deltas arrive as `input_json_delta` fragments under
/// the block's index; `message_stop` terminates the stream.
fn parse_stream_event(
    data: &str,
    accumulator: &mut crate::sse::StreamAccumulator,
) -> Result<ParsedEvent, BifrostError> {
    let event: Value = serde_json::from_str(data)
        .map_err(|err| BifrostError::decode(format!("stream event: {err}")))?;

    match event.get("type").and_then(Value::as_str) {
        Some("message_start") => {
            if let Some(message) = event.get("message") {
                accumulator.id = message
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if let Some(model) = message.get("model").and_then(Value::as_str) {
                    accumulator.model = model.to_string();
                }
                if let Some(usage) = message.get("usage") {
                    accumulator.usage = parse_usage(usage);
                }
            }
            Ok(ParsedEvent::empty())
        }
        Some("content_block_start") => {
            let index = event.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
            if let Some(block) = event.get("content_block")
                && block.get("type").and_then(Value::as_str) == Some("tool_use")
            {
                return Ok(ParsedEvent::chunks(vec![StreamChunk::ToolCallDelta {
                    index,
                    id: block.get("id").and_then(Value::as_str).map(str::to_string),
                    name: block
                        .get("name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    arguments: None,
                }]));
            }
            Ok(ParsedEvent::empty())
        }
        Some("content_block_delta") => {
            let index = event.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
            let Some(delta) = event.get("delta") else {
                return Ok(ParsedEvent::empty());
            };
            match delta.get("type").and_then(Value::as_str) {
                Some("text_delta") => {
                    let text = delta.get("text").and_then(Value::as_str).unwrap_or_default();
                    Ok(ParsedEvent::chunks(vec![StreamChunk::Delta {
                        text: text.to_string(),
                    }]))
                }
                Some("input_json_delta") => Ok(ParsedEvent::chunks(vec![
                    StreamChunk::ToolCallDelta {
                        index,
                        id: None,
                        name: None,
                        arguments: delta
                            .get("partial_json")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    },
                ])),
                _ => Ok(ParsedEvent::empty()),
            }
        }
        Some("message_delta") => {
            if let Some(reason) = event
                .pointer("/delta/stop_reason")
                .and_then(Value::as_str)
            {
                accumulator.finish_reason = Some(map_stop_reason(reason));
            }
            if let Some(output_tokens) = event
                .pointer("/usage/output_tokens")
                .and_then(Value::as_i64)
            {
                let usage = accumulator.usage.get_or_insert_with(TokenUsage::default);
                usage.completion_tokens = output_tokens;
                usage.total_tokens = usage.prompt_tokens + output_tokens;
            }
            Ok(ParsedEvent::empty())
        }
        Some("message_stop") => Ok(ParsedEvent {
            chunks: Vec::new(),
            terminal: true,
        }),
        Some("error") => {
            let message = event
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("stream error");
            Err(BifrostError::provider_api(502, message))
        }
        _ => Ok(ParsedEvent::empty()),
    }
}

#[cfg(test)]
#[path = "anthropic.test.rs"]
mod tests;
