//! SSE decoding into stream chunks.
//!
//! OpenAI-compatible wire formats deliver `data: <json>\n\n` frames closed
//! by `data: [DONE]\n\n`. Each adapter supplies a parser that turns one
//! event payload into displayable chunks and folds ids, usage, and finish
//! state into the accumulator; the shared read loop owns cancellation and
//! terminal-chunk emission.

use crate::provider::ChunkReceiver;
use bifrost_error::BifrostError;
use bifrost_protocol::BifrostResponse;
use bifrost_protocol::ChatResponse;
use bifrost_protocol::ContentBlock;
use bifrost_protocol::FinishReason;
use bifrost_protocol::RequestContext;
use bifrost_protocol::ResponseMetadata;
use bifrost_protocol::ResponsePayload;
use bifrost_protocol::StreamChunk;
use bifrost_protocol::TokenUsage;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde_json::Value;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

/// Channel capacity between the adapter read loop and the dispatcher.
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// SSE terminator for OpenAI-compatible streams.
const DONE_MARKER: &str = "[DONE]";

/// A tool call assembled across deltas.
#[derive(Debug, Default, Clone)]
pub struct PartialToolCall {
    /// Tool call id from the first delta.
    pub id: String,
    /// Tool name from the first delta.
    pub name: String,
    /// Concatenated argument fragments.
    pub arguments: String,
}

/// Accumulated state of one streaming response.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    /// Upstream response id.
    pub id: Option<String>,
    /// Model as the upstream reported it.
    pub model: String,
    /// Concatenated text deltas.
    pub text: String,
    /// Tool calls keyed by wire index.
    pub tool_calls: Vec<PartialToolCall>,
    /// Finish reason from the terminal event.
    pub finish_reason: Option<FinishReason>,
    /// Usage from the terminal event, when reported.
    pub usage: Option<TokenUsage>,
}

impl StreamAccumulator {
    /// Fold one displayable chunk into the accumulated state.
    pub fn apply(&mut self, chunk: &StreamChunk) {
        match chunk {
            StreamChunk::Delta { text } => self.text.push_str(text),
            StreamChunk::ToolCallDelta {
                index,
                id,
                name,
                arguments,
            } => {
                if self.tool_calls.len() <= *index {
                    self.tool_calls.resize(*index + 1, PartialToolCall::default());
                }
                let call = &mut self.tool_calls[*index];
                if let Some(id) = id {
                    call.id = id.clone();
                }
                if let Some(name) = name {
                    call.name = name.clone();
                }
                if let Some(arguments) = arguments {
                    call.arguments.push_str(arguments);
                }
            }
            _ => {}
        }
    }

    /// Build the final chat response from the accumulated state.
    pub fn into_chat_response(self, fallback_model: &str) -> ChatResponse {
        let mut content = Vec::new();
        if !self.text.is_empty() {
            content.push(ContentBlock::text(&self.text));
        }
        for call in &self.tool_calls {
            if call.id.is_empty() && call.name.is_empty() {
                continue;
            }
            let input = serde_json::from_str(&call.arguments)
                .unwrap_or(Value::String(call.arguments.clone()));
            content.push(ContentBlock::tool_use(&call.id, &call.name, input));
        }

        let model = if self.model.is_empty() {
            fallback_model.to_string()
        } else {
            self.model
        };
        let mut response =
            ChatResponse::new(self.id.unwrap_or_default(), model).with_content(content);
        response.finish_reason = self.finish_reason.unwrap_or_default();
        response.usage = self.usage;
        response
    }
}

/// What an adapter parser produced for one SSE event.
#[derive(Debug)]
pub struct ParsedEvent {
    /// Chunks to forward to the caller, in order.
    pub chunks: Vec<StreamChunk>,
    /// Whether this event terminates the stream (for wire formats with an
    /// explicit stop event instead of the `[DONE]` marker).
    pub terminal: bool,
}

impl ParsedEvent {
    /// An event producing the given chunks, not terminal.
    pub fn chunks(chunks: Vec<StreamChunk>) -> Self {
        Self {
            chunks,
            terminal: false,
        }
    }

    /// An event with nothing to forward.
    pub fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            terminal: false,
        }
    }
}

/// Spawn the read loop for one SSE response.
///
/// The returned channel carries every parsed chunk in wire order and is
/// closed right after the terminal chunk. Cancelling the context aborts
/// the HTTP read and terminates the stream with a canceled error.
pub fn spawn_sse_stream<P>(
    response: reqwest::Response,
    ctx: RequestContext,
    mut metadata: ResponseMetadata,
    started: Instant,
    mut parser: P,
) -> ChunkReceiver
where
    P: FnMut(&str, &mut StreamAccumulator) -> Result<ParsedEvent, BifrostError>
        + Send
        + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    let model = metadata.model_requested.clone();

    tokio::spawn(async move {
        let mut events = response.bytes_stream().eventsource();
        let mut accumulator = StreamAccumulator::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = ctx.cancellation().cancelled() => {
                    let _ = tx.send(StreamChunk::error(BifrostError::canceled())).await;
                    return;
                }
                event = events.next() => event,
            };

            let terminal = match event {
                Some(Ok(event)) => {
                    let data = event.data.trim();
                    if data.is_empty() {
                        continue;
                    }
                    if data == DONE_MARKER {
                        true
                    } else {
                        match parser(data, &mut accumulator) {
                            Ok(parsed) => {
                                for chunk in parsed.chunks {
                                    accumulator.apply(&chunk);
                                    if tx.send(chunk).await.is_err() {
                                        // Caller went away; stop reading.
                                        return;
                                    }
                                }
                                parsed.terminal
                            }
                            Err(err) => {
                                let _ = tx.send(StreamChunk::error(err)).await;
                                return;
                            }
                        }
                    }
                }
                Some(Err(err)) => {
                    let _ = tx
                        .send(StreamChunk::error(BifrostError::transport(format!(
                            "stream read failed: {err}"
                        ))))
                        .await;
                    return;
                }
                None => {
                    debug!("sse stream ended without a terminal event");
                    true
                }
            };

            if terminal {
                metadata.latency_ms = started.elapsed().as_millis() as u64;
                let kind = metadata.request_kind;
                let chat = accumulator.into_chat_response(&model);
                let payload = match kind {
                    bifrost_protocol::RequestKind::Responses => ResponsePayload::Responses(chat),
                    _ => ResponsePayload::ChatCompletion(chat),
                };
                let _ = tx
                    .send(StreamChunk::done(BifrostResponse::new(payload, metadata)))
                    .await;
                return;
            }
        }
    });

    rx
}

#[cfg(test)]
#[path = "sse.test.rs"]
mod tests;
