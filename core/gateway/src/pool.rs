//! Per-provider bounded worker pool.
//!
//! `concurrency` workers consume one FIFO queue of capacity `buffer_size`.
//! Enqueue either fails fast (`QueueFull`) or blocks until space, deadline,
//! or cancellation, per the provider's drop policy. Workers snapshot the
//! key set at dispatch, call the adapter through the retry executor, and
//! reply on the work item's oneshot. A draining pool resolves every
//! in-flight item with a real result or `ShuttingDown`, never silently.

use crate::http::RetryConfig;
use crate::http::RetryExecutor;
use crate::keys;
use crate::provider::AdapterCall;
use crate::provider::ChunkReceiver;
use crate::provider::ProviderAdapter;
use crate::provider::execute_stream;
use crate::provider::execute_unary;
use bifrost_error::BifrostError;
use bifrost_protocol::BifrostRequest;
use bifrost_protocol::BifrostResponse;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use bifrost_protocol::RequestContext;
use bifrost_protocol::ResponseMetadata;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::warn;

/// How long a draining pool waits for workers before aborting them.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Reply published by a worker for one work item.
pub enum WorkReply {
    /// Result of a unary call.
    Unary(Result<BifrostResponse, BifrostError>),
    /// Result of establishing a stream.
    Stream(Result<ChunkReceiver, BifrostError>),
}

struct WorkItem {
    ctx: RequestContext,
    request: BifrostRequest,
    streaming: bool,
    reply: oneshot::Sender<WorkReply>,
}

/// Bounded worker pool for one provider.
pub struct WorkerPool {
    provider: Provider,
    adapter: Arc<dyn ProviderAdapter>,
    config: Arc<RwLock<ProviderConfig>>,
    tx: RwLock<Option<mpsc::Sender<WorkItem>>>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    concurrency: usize,
    buffer_size: usize,
}

impl WorkerPool {
    /// Spawn a pool with the sizing currently in the provider config.
    pub fn spawn(
        provider: Provider,
        adapter: Arc<dyn ProviderAdapter>,
        config: Arc<RwLock<ProviderConfig>>,
    ) -> Self {
        let sizing = config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .concurrency_and_buffer_size;

        let (tx, rx) = mpsc::channel::<WorkItem>(sizing.buffer_size);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(sizing.concurrency);
        for worker_id in 0..sizing.concurrency {
            let rx = rx.clone();
            let adapter = adapter.clone();
            let config = config.clone();
            let provider = provider.clone();
            workers.push(tokio::spawn(async move {
                worker_loop(worker_id, provider, adapter, config, rx).await;
            }));
        }

        debug!(
            provider = %provider,
            concurrency = sizing.concurrency,
            buffer_size = sizing.buffer_size,
            "spawned worker pool"
        );

        Self {
            provider,
            adapter,
            config,
            tx: RwLock::new(Some(tx)),
            workers: std::sync::Mutex::new(workers),
            concurrency: sizing.concurrency,
            buffer_size: sizing.buffer_size,
        }
    }

    /// The adapter this pool dispatches to.
    pub fn adapter(&self) -> Arc<dyn ProviderAdapter> {
        self.adapter.clone()
    }

    /// Pool sizing this pool was spawned with.
    pub fn sizing(&self) -> (usize, usize) {
        (self.concurrency, self.buffer_size)
    }

    fn sender(&self) -> Result<mpsc::Sender<WorkItem>, BifrostError> {
        self.tx
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| BifrostError::shutting_down(self.provider.as_str()))
    }

    async fn enqueue(&self, item: WorkItem) -> Result<(), BifrostError> {
        let sender = self.sender()?;
        let drop_excess = self
            .config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .drop_excess_requests;

        if drop_excess {
            return match sender.try_send(item) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    Err(BifrostError::queue_full(self.provider.as_str()))
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    Err(BifrostError::shutting_down(self.provider.as_str()))
                }
            };
        }

        let ctx = item.ctx.clone();
        let deadline = ctx.deadline();
        tokio::select! {
            _ = ctx.cancellation().cancelled() => Err(BifrostError::canceled()),
            _ = sleep_until_deadline(deadline) => Err(BifrostError::deadline_exceeded()),
            result = sender.send(item) => {
                result.map_err(|_| BifrostError::shutting_down(self.provider.as_str()))
            }
        }
    }

    async fn submit_item(
        &self,
        ctx: &RequestContext,
        request: BifrostRequest,
        streaming: bool,
    ) -> Result<WorkReply, BifrostError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.enqueue(WorkItem {
            ctx: ctx.clone(),
            request,
            streaming,
            reply: reply_tx,
        })
        .await?;

        tokio::select! {
            _ = ctx.cancellation().cancelled() => Err(BifrostError::canceled()),
            reply = reply_rx => {
                reply.map_err(|_| BifrostError::shutting_down(self.provider.as_str()))
            }
        }
    }

    /// Enqueue a unary request and await its result.
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        request: BifrostRequest,
    ) -> Result<BifrostResponse, BifrostError> {
        match self.submit_item(ctx, request, false).await? {
            WorkReply::Unary(result) => result,
            WorkReply::Stream(_) => Err(BifrostError::operation(
                "worker answered a unary request with a stream",
            )),
        }
    }

    /// Enqueue a streaming request and await its channel.
    pub async fn submit_stream(
        &self,
        ctx: &RequestContext,
        request: BifrostRequest,
    ) -> Result<ChunkReceiver, BifrostError> {
        match self.submit_item(ctx, request, true).await? {
            WorkReply::Stream(result) => result,
            WorkReply::Unary(_) => Err(BifrostError::operation(
                "worker answered a streaming request with a unary result",
            )),
        }
    }

    /// Stop intake and wait for workers to finish.
    ///
    /// Queued items still drain to workers; after the timeout remaining
    /// workers are aborted and their callers observe `ShuttingDown`.
    pub async fn shutdown(&self) {
        let sender = self.tx.write().unwrap_or_else(|e| e.into_inner()).take();
        drop(sender);

        let workers: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            guard.drain(..).collect()
        };

        for worker in workers {
            match tokio::time::timeout(DRAIN_TIMEOUT, worker).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is_cancelled() => {}
                Ok(Err(err)) => error!(provider = %self.provider, "worker join failed: {err}"),
                Err(_) => {
                    warn!(provider = %self.provider, "worker did not drain in time; aborting");
                }
            }
        }
    }
}

async fn sleep_until_deadline(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

async fn worker_loop(
    worker_id: usize,
    provider: Provider,
    adapter: Arc<dyn ProviderAdapter>,
    config: Arc<RwLock<ProviderConfig>>,
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
) {
    loop {
        let item = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(item) = item else {
            debug!(provider = %provider, worker_id, "worker stopping: queue closed");
            return;
        };
        process_item(&provider, adapter.as_ref(), &config, item).await;
    }
}

async fn process_item(
    provider: &Provider,
    adapter: &dyn ProviderAdapter,
    config: &Arc<RwLock<ProviderConfig>>,
    item: WorkItem,
) {
    let WorkItem {
        ctx,
        request,
        streaming,
        reply,
    } = item;

    if ctx.is_cancelled() {
        let _ = reply.send(reply_error(streaming, BifrostError::canceled()));
        return;
    }
    if ctx.deadline_elapsed() {
        let _ = reply.send(reply_error(streaming, BifrostError::deadline_exceeded()));
        return;
    }

    // Snapshot config at dispatch: the keys this request uses stay valid
    // even if the provider is reconfigured mid-flight.
    let (config_keys, network, raw_request_default, raw_response_default) = {
        let config = config.read().unwrap_or_else(|e| e.into_inner());
        (
            config.keys.clone(),
            config.network.clone(),
            config.send_back_raw_request,
            config.send_back_raw_response,
        )
    };

    let allowed_ids = keys::allowed_ids_from_context(&ctx);
    let key = match keys::select_key(
        provider,
        &request.model,
        &config_keys,
        allowed_ids.as_deref(),
    ) {
        Ok(key) => key.clone(),
        Err(err) => {
            let _ = reply.send(reply_error(streaming, err));
            return;
        }
    };

    let raw_request = request
        .params
        .send_back_raw_request
        .unwrap_or(raw_request_default);
    let raw_response = request
        .params
        .send_back_raw_response
        .unwrap_or(raw_response_default);

    let call = || AdapterCall {
        ctx: &ctx,
        key: &key,
        model: &request.model,
        params: &request.params,
        raw_request,
        raw_response,
    };

    if streaming {
        // Streams are never retried; a broken stream surfaces mid-channel.
        let result = AssertUnwindSafe(execute_stream(adapter, call(), &request.input))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(BifrostError::operation(format!(
                    "adapter panicked while opening a {} stream",
                    request.kind()
                )))
            });
        let _ = reply.send(WorkReply::Stream(result));
        return;
    }

    let kind = request.kind();
    let input = &request.input;

    let executor = RetryExecutor::new(RetryConfig::from_network(&network));
    let outcome = executor
        .execute(&ctx, || {
            let call = call();
            async move {
                AssertUnwindSafe(execute_unary(adapter, call, input))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(BifrostError::operation(format!(
                            "adapter panicked while serving {kind}"
                        )))
                    })
            }
        })
        .await;

    let result = outcome.map(|outcome| {
        let mut metadata = ResponseMetadata::new(provider.clone(), request.model.clone(), kind)
            .with_latency_ms(outcome.latency_ms);
        metadata.raw_request = outcome.raw_request;
        metadata.raw_response = outcome.raw_response;
        BifrostResponse::new(outcome.payload, metadata)
    });

    let _ = reply.send(WorkReply::Unary(result));
}

fn reply_error(streaming: bool, error: BifrostError) -> WorkReply {
    if streaming {
        WorkReply::Stream(Err(error))
    } else {
        WorkReply::Unary(Err(error))
    }
}

#[cfg(test)]
#[path = "pool.test.rs"]
mod tests;
