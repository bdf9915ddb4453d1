//! The dispatch engine: fallback hop loop and stream wrapping.

use crate::lifecycle::ProviderRegistry;
use crate::plugins::DispatchOutcome;
use crate::plugins::PluginPipeline;
use crate::provider::ChunkReceiver;
use bifrost_error::BifrostError;
use bifrost_protocol::BifrostRequest;
use bifrost_protocol::BifrostResponse;
use bifrost_protocol::Fallback;
use bifrost_protocol::RequestContext;
use bifrost_protocol::RequestKind;
use bifrost_protocol::StreamChunk;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Capacity of the wrapper channel handed to streaming callers.
const WRAPPER_CHANNEL_CAPACITY: usize = 64;

/// Sequences fallback hops and applies the plugin pipeline around each.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    pipeline: Arc<PluginPipeline>,
}

impl Dispatcher {
    /// Create a dispatcher over the given registry and pipeline.
    pub fn new(registry: Arc<ProviderRegistry>, pipeline: Arc<PluginPipeline>) -> Self {
        Self { registry, pipeline }
    }

    fn bind_hop(request: &BifrostRequest, hop: &Fallback) -> BifrostRequest {
        let mut bound = request.clone();
        bound.provider = hop.provider.clone();
        bound.model = hop.model.clone();
        bound.fallbacks = Vec::new();
        bound
    }

    fn annotate(
        error: BifrostError,
        hop: &Fallback,
        kind: RequestKind,
        index: usize,
    ) -> BifrostError {
        error
            .with_provider(hop.provider.as_str())
            .with_model(hop.model.clone())
            .with_request_kind(kind.to_string())
            .with_fallback_index(index)
    }

    /// Dispatch a unary request through its fallback chain.
    ///
    /// Hops run sequentially, never speculatively. Per hop: pre-hooks in
    /// registration order, the upstream call (unless short-circuited),
    /// then post-hooks in reverse over exactly the executed prefix. A
    /// terminal error stops the chain; anything else moves to the next
    /// hop. When every hop failed, the last hop's error surfaces.
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        request: BifrostRequest,
    ) -> Result<BifrostResponse, BifrostError> {
        request.validate()?;
        let kind = request.kind();
        let hops = request.hops();
        let mut last_error: Option<BifrostError> = None;

        for (index, hop) in hops.iter().enumerate() {
            let mut hop_ctx = ctx.clone();
            let mut hop_request = Self::bind_hop(&request, hop);

            let pre = self
                .pipeline
                .run_pre_hooks(&mut hop_ctx, &mut hop_request)
                .await;

            let mut outcome: DispatchOutcome = match pre.short_circuit {
                Some(short) => self.pipeline.short_circuit_outcome(short),
                None => match self.registry.get(&hop.provider) {
                    Some(runtime) => runtime.pool().submit(&hop_ctx, hop_request).await,
                    None => Err(BifrostError::operation(format!(
                        "provider {} is not configured",
                        hop.provider
                    ))),
                },
            };

            self.pipeline
                .run_post_hooks(&mut hop_ctx, pre.executed, &mut outcome)
                .await;

            match outcome {
                Ok(mut response) => {
                    if index > 0 {
                        response.metadata.hop_error = last_error.take();
                    }
                    return Ok(response);
                }
                Err(error) => {
                    let error = Self::annotate(error, hop, kind, index);
                    debug!(
                        provider = %hop.provider,
                        model = %hop.model,
                        hop = index,
                        "hop failed: {error}"
                    );
                    if error.is_terminal() {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BifrostError::operation("request produced neither response nor error")
        }))
    }

    /// Dispatch a streaming request through its fallback chain.
    ///
    /// Fallback applies only until a stream is established; after that the
    /// wrapper channel forwards chunks 1-for-1, runs post-hooks exactly
    /// once on the terminal chunk (which a post-hook may re-type), then
    /// closes. Caller cancellation closes the wrapper after flushing
    /// already-buffered chunks and aborts the upstream read.
    pub async fn dispatch_stream(
        &self,
        ctx: &RequestContext,
        request: BifrostRequest,
    ) -> Result<ChunkReceiver, BifrostError> {
        request.validate()?;
        let kind = request.kind();
        let hops = request.hops();
        let mut last_error: Option<BifrostError> = None;

        for (index, hop) in hops.iter().enumerate() {
            let mut hop_ctx = ctx.clone();
            let mut hop_request = Self::bind_hop(&request, hop);

            let pre = self
                .pipeline
                .run_pre_hooks(&mut hop_ctx, &mut hop_request)
                .await;

            // A short-circuit resolves the hop without an upstream stream:
            // post-hooks run here and the result becomes a two-chunk (or
            // zero-forward) stream.
            if let Some(short) = pre.short_circuit {
                let mut outcome = self.pipeline.short_circuit_outcome(short);
                self.pipeline
                    .run_post_hooks(&mut hop_ctx, pre.executed, &mut outcome)
                    .await;
                match outcome {
                    Ok(response) => return Ok(Self::ready_stream(StreamChunk::done(response))),
                    Err(error) => {
                        let error = Self::annotate(error, hop, kind, index);
                        if error.is_terminal() {
                            return Err(error);
                        }
                        last_error = Some(error);
                        continue;
                    }
                }
            }

            let attempt = match self.registry.get(&hop.provider) {
                Some(runtime) => runtime.pool().submit_stream(&hop_ctx, hop_request).await,
                None => Err(BifrostError::operation(format!(
                    "provider {} is not configured",
                    hop.provider
                ))),
            };

            match attempt {
                Ok(upstream) => {
                    return Ok(self.wrap_stream(hop_ctx, upstream, pre.executed));
                }
                Err(error) => {
                    // The stream never started; the hop resolves as a
                    // failure and post-hooks still run exactly once.
                    let mut outcome: DispatchOutcome = Err(error);
                    self.pipeline
                        .run_post_hooks(&mut hop_ctx, pre.executed, &mut outcome)
                        .await;
                    match outcome {
                        Ok(response) => {
                            return Ok(Self::ready_stream(StreamChunk::done(response)));
                        }
                        Err(error) => {
                            let error = Self::annotate(error, hop, kind, index);
                            if error.is_terminal() {
                                return Err(error);
                            }
                            last_error = Some(error);
                        }
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BifrostError::operation("request produced neither stream nor error")
        }))
    }

    fn ready_stream(chunk: StreamChunk) -> ChunkReceiver {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            let _ = tx.send(chunk).await;
        });
        rx
    }

    fn wrap_stream(
        &self,
        mut hop_ctx: RequestContext,
        mut upstream: ChunkReceiver,
        executed_pre_hooks: usize,
    ) -> ChunkReceiver {
        let (tx, rx) = mpsc::channel(WRAPPER_CHANNEL_CAPACITY);
        let pipeline = self.pipeline.clone();

        tokio::spawn(async move {
            let mut terminal: Option<StreamChunk> = None;

            loop {
                let chunk = tokio::select! {
                    biased;
                    chunk = upstream.recv() => chunk,
                    _ = hop_ctx.cancellation().cancelled() => {
                        // Flush whatever the adapter already buffered, then
                        // terminate with a canceled error.
                        while let Ok(chunk) = upstream.try_recv() {
                            if chunk.is_terminal() {
                                terminal = Some(chunk);
                                break;
                            }
                            if tx.send(chunk).await.is_err() {
                                return;
                            }
                        }
                        if terminal.is_none() {
                            terminal = Some(StreamChunk::error(BifrostError::canceled()));
                        }
                        break;
                    }
                };

                match chunk {
                    Some(chunk) if chunk.is_terminal() => {
                        terminal = Some(chunk);
                        break;
                    }
                    Some(chunk) => {
                        if tx.send(chunk).await.is_err() {
                            // Caller dropped the wrapper; the upstream
                            // receiver drops with this task and cancels
                            // the adapter read.
                            return;
                        }
                    }
                    None => {
                        terminal = Some(StreamChunk::error(BifrostError::operation(
                            "stream closed without a terminal chunk",
                        )));
                        break;
                    }
                }
            }

            // Post-hooks run exactly once, on the terminal chunk. A hook
            // may rewrite success into failure or back; the terminal chunk
            // is re-typed accordingly.
            let mut outcome: DispatchOutcome = match terminal {
                Some(StreamChunk::Done { response }) => Ok(*response),
                Some(StreamChunk::Error { error }) => Err(*error),
                _ => Err(BifrostError::operation("stream ended without a terminal chunk")),
            };
            pipeline
                .run_post_hooks(&mut hop_ctx, executed_pre_hooks, &mut outcome)
                .await;

            let final_chunk = match outcome {
                Ok(response) => StreamChunk::done(response),
                Err(error) => StreamChunk::error(error),
            };
            let _ = tx.send(final_chunk).await;
        });

        rx
    }
}

#[cfg(test)]
#[path = "dispatcher.test.rs"]
mod tests;
