//! OpenAI-compatible wire format helpers.
//!
//! The chat-completions wire shape is spoken by several upstreams; these
//! helpers are shared by the OpenAI adapter and any custom provider that
//! reuses its format against a different base URL.

use crate::sse::ParsedEvent;
use crate::sse::StreamAccumulator;
use bifrost_error::BifrostError;
use bifrost_protocol::ChatResponse;
use bifrost_protocol::ContentBlock;
use bifrost_protocol::FinishReason;
use bifrost_protocol::ImageSource;
use bifrost_protocol::Message;
use bifrost_protocol::ModelParameters;
use bifrost_protocol::Role;
use bifrost_protocol::StreamChunk;
use bifrost_protocol::TokenUsage;
use bifrost_protocol::ToolChoice;
use serde_json::Value;
use serde_json::json;

/// Parse an OpenAI-style error body into a provider error.
///
/// Falls back to the raw body when the `{"error": {...}}` shape is absent.
pub fn parse_error(status: u16, body: &[u8]) -> BifrostError {
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
        if let Some(code) = error.get("code").and_then(Value::as_str) {
            err = err.with_code(code);
        }
        if let Some(delay) = bifrost_error::parse_retry_after(message) {
            err = err.with_retry_after(delay);
        }
        return err;
    }
    BifrostError::provider_api(status, String::from_utf8_lossy(body).to_string())
}

fn content_block_to_wire(block: &ContentBlock) -> Option<Value> {
    match block {
        ContentBlock::Text { text } => Some(json!({"type": "text", "text": text})),
        ContentBlock::Image { source } => {
            let url = match source {
                ImageSource::Url { url } => url.clone(),
                ImageSource::Base64 { data, media_type } => {
                    format!("data:{media_type};base64,{data}")
                }
            };
            Some(json!({"type": "image_url", "image_url": {"url": url}}))
        }
        // Tool calls and results are carried at the message level.
        _ => None,
    }
}

/// Convert portable messages into chat-completions wire messages.
pub fn messages_to_wire(messages: &[Message]) -> Vec<Value> {
    let mut wire = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::Tool => {
                for block in &message.content {
                    if let ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } = block
                    {
                        wire.push(json!({
                            "role": "tool",
                            "tool_call_id": tool_use_id,
                            "content": content.to_text(),
                        }));
                    }
                }
            }
            role => {
                let role_name = match role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => unreachable!(),
                };

                let tool_calls: Vec<Value> = message
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolUse { id, name, input } => Some(json!({
                            "id": id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": input.to_string(),
                            },
                        })),
                        _ => None,
                    })
                    .collect();

                let parts: Vec<Value> = message
                    .content
                    .iter()
                    .filter_map(content_block_to_wire)
                    .collect();

                let content = if parts.len() == 1
                    && parts[0].get("type").and_then(Value::as_str) == Some("text")
                {
                    // Single text block flattens to a plain string.
                    parts[0].get("text").cloned().unwrap_or(Value::Null)
                } else if parts.is_empty() {
                    Value::Null
                } else {
                    Value::Array(parts)
                };

                let mut entry = json!({"role": role_name, "content": content});
                if !tool_calls.is_empty() {
                    entry["tool_calls"] = Value::Array(tool_calls);
                }
                wire.push(entry);
            }
        }
    }
    wire
}

fn tool_choice_to_wire(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::Required => json!("required"),
        ToolChoice::None => json!("none"),
        ToolChoice::Tool { name } => {
            json!({"type": "function", "function": {"name": name}})
        }
    }
}

/// Fold portable parameters into a chat-completions request body.
///
/// The `extra` map merges last so callers can reach wire fields the
/// portable shape does not model.
pub fn apply_params(body: &mut Value, params: &ModelParameters) {
    if let Some(temperature) = params.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = params.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(top_p) = params.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(presence_penalty) = params.presence_penalty {
        body["presence_penalty"] = json!(presence_penalty);
    }
    if let Some(frequency_penalty) = params.frequency_penalty {
        body["frequency_penalty"] = json!(frequency_penalty);
    }
    if let Some(stop) = &params.stop_sequences {
        body["stop"] = json!(stop);
    }
    if let Some(tools) = &params.tools
        && !tools.is_empty()
    {
        body["tools"] = Value::Array(
            tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        },
                    })
                })
                .collect(),
        );
    }
    if let Some(choice) = &params.tool_choice {
        body["tool_choice"] = tool_choice_to_wire(choice);
    }
    for (key, value) in &params.extra {
        body[key.as_str()] = value.clone();
    }
}

/// Map a chat-completions finish reason onto the portable enum.
pub fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::MaxTokens,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Other,
    }
}

/// Parse a chat-completions usage object.
pub fn parse_usage(value: &Value) -> Option<TokenUsage> {
    let usage = value.as_object()?;
    let mut parsed = TokenUsage::new(
        usage.get("prompt_tokens").and_then(Value::as_i64).unwrap_or(0),
        usage
            .get("completion_tokens")
            .and_then(Value::as_i64)
            .unwrap_or(0),
    );
    if let Some(total) = usage.get("total_tokens").and_then(Value::as_i64) {
        parsed.total_tokens = total;
    }
    parsed.reasoning_tokens = value
        .pointer("/completion_tokens_details/reasoning_tokens")
        .and_then(Value::as_i64);
    parsed.cache_read_tokens = value
        .pointer("/prompt_tokens_details/cached_tokens")
        .and_then(Value::as_i64);
    Some(parsed)
}

/// Parse a unary chat-completions response body.
pub fn parse_chat_response(body: &Value) -> Result<ChatResponse, BifrostError> {
    let choice = body
        .pointer("/choices/0")
        .ok_or_else(|| BifrostError::decode("chat response has no choices"))?;
    let message = choice
        .get("message")
        .ok_or_else(|| BifrostError::decode("chat choice has no message"))?;

    let mut content = Vec::new();
    if let Some(text) = message.get("content").and_then(Value::as_str)
        && !text.is_empty()
    {
        content.push(ContentBlock::text(text));
    }
    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in tool_calls {
            let id = call.get("id").and_then(Value::as_str).unwrap_or_default();
            let name = call
                .pointer("/function/name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let arguments = call
                .pointer("/function/arguments")
                .and_then(Value::as_str)
                .unwrap_or("{}");
            let input =
                serde_json::from_str(arguments).unwrap_or(Value::String(arguments.to_string()));
            content.push(ContentBlock::tool_use(id, name, input));
        }
    }

    let mut response = ChatResponse::new(
        body.get("id").and_then(Value::as_str).unwrap_or_default(),
        body.get("model").and_then(Value::as_str).unwrap_or_default(),
    )
    .with_content(content);

    if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
        response.finish_reason = map_finish_reason(reason);
    }
    if let Some(usage) = body.get("usage") {
        response.usage = parse_usage(usage);
    }
    Ok(response)
}

/// Parse one chat-completions SSE event into stream chunks.
///
/// Terminality is signalled by the `[DONE]` marker, which the shared read
/// loop handles; this parser never returns terminal itself.
pub fn parse_chat_stream_event(
    data: &str,
    accumulator: &mut StreamAccumulator,
) -> Result<ParsedEvent, BifrostError> {
    let event: Value = serde_json::from_str(data)
        .map_err(|err| BifrostError::decode(format!("stream event: {err}")))?;

    if let Some(id) = event.get("id").and_then(Value::as_str) {
        accumulator.id.get_or_insert_with(|| id.to_string());
    }
    if let Some(model) = event.get("model").and_then(Value::as_str)
        && accumulator.model.is_empty()
    {
        accumulator.model = model.to_string();
    }
    if let Some(usage) = event.get("usage")
        && !usage.is_null()
    {
        accumulator.usage = parse_usage(usage);
    }

    let Some(choice) = event.pointer("/choices/0") else {
        return Ok(ParsedEvent::empty());
    };
    if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
        accumulator.finish_reason = Some(map_finish_reason(reason));
    }

    let mut chunks = Vec::new();
    if let Some(delta) = choice.get("delta") {
        if let Some(text) = delta.get("content").and_then(Value::as_str)
            && !text.is_empty()
        {
            chunks.push(StreamChunk::Delta {
                text: text.to_string(),
            });
        }
        if let Some(tool_calls) = delta.get("tool_calls").and_then(Value::as_array) {
            for call in tool_calls {
                let index = call.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
                chunks.push(StreamChunk::ToolCallDelta {
                    index,
                    id: call.get("id").and_then(Value::as_str).map(str::to_string),
                    name: call
                        .pointer("/function/name")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    arguments: call
                        .pointer("/function/arguments")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
        }
    }
    Ok(ParsedEvent::chunks(chunks))
}

#[cfg(test)]
#[path = "openai_common.test.rs"]
mod tests;
