//! The gateway core: a provider-agnostic request multiplexer.
//!
//! [`Bifrost`] is the single in-process entry point. A request names a
//! provider and model (plus fallbacks); dispatch validates it, runs the
//! plugin pipeline, enqueues to the provider's bounded worker pool, and
//! sequences fallback hops until a hop succeeds or the chain is
//! exhausted. Streaming variants return a channel of chunks closed after
//! exactly one terminal chunk.
//!
//! The HTTP surface, persistence, and governance live outside this crate;
//! governance concerns plug in through the [`plugins::Plugin`] contract.

pub mod dispatcher;
pub mod http;
pub mod keys;
pub mod lifecycle;
pub mod plugins;
pub mod pool;
pub mod provider;
pub mod providers;
pub mod sse;

use bifrost_error::BifrostError;
use bifrost_mcp::McpRegistry;
use bifrost_mcp::McpTool;
use bifrost_protocol::BifrostRequest;
use bifrost_protocol::BifrostResponse;
use bifrost_protocol::ConcurrencyAndBufferSize;
use bifrost_protocol::McpClientConfig;
use bifrost_protocol::McpClientState;
use bifrost_protocol::Message;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use bifrost_protocol::RequestContext;
use bifrost_protocol::RequestInput;
use bifrost_protocol::RequestKind;
use bifrost_protocol::ToolCall;
use bifrost_protocol::ToolDefinition;
use crate::dispatcher::Dispatcher;
use crate::lifecycle::ProviderRegistry;
use crate::plugins::Plugin;
use crate::plugins::PluginPipeline;
use crate::provider::ChunkReceiver;
use std::sync::Arc;
use tracing::info;

/// Boot configuration for the gateway.
#[derive(Default)]
pub struct BifrostInit {
    /// Providers to configure at boot.
    pub providers: Vec<(Provider, ProviderConfig)>,
    /// Plugins, in registration order.
    pub plugins: Vec<Arc<dyn Plugin>>,
    /// MCP clients to connect at boot.
    pub mcp_clients: Vec<McpClientConfig>,
}

macro_rules! unary_entry {
    ($(#[$doc:meta])* $fn_name:ident, $kind:ident) => {
        $(#[$doc])*
        pub async fn $fn_name(
            &self,
            ctx: &RequestContext,
            request: BifrostRequest,
        ) -> Result<BifrostResponse, BifrostError> {
            self.expect_kind(&request, RequestKind::$kind)?;
            self.dispatcher.dispatch(ctx, request).await
        }
    };
}

macro_rules! stream_entry {
    ($(#[$doc:meta])* $fn_name:ident, $kind:ident) => {
        $(#[$doc])*
        pub async fn $fn_name(
            &self,
            ctx: &RequestContext,
            request: BifrostRequest,
        ) -> Result<ChunkReceiver, BifrostError> {
            self.expect_kind(&request, RequestKind::$kind)?;
            self.dispatcher.dispatch_stream(ctx, request).await
        }
    };
}

/// The gateway.
pub struct Bifrost {
    registry: Arc<ProviderRegistry>,
    pipeline: Arc<PluginPipeline>,
    mcp: Arc<McpRegistry>,
    dispatcher: Dispatcher,
}

impl Bifrost {
    /// Boot the gateway: configure providers, connect MCP clients, and
    /// register plugins.
    pub async fn new(init: BifrostInit) -> Result<Self, BifrostError> {
        let registry = Arc::new(ProviderRegistry::new());
        for (provider, config) in init.providers {
            registry.add_provider(provider, config).await?;
        }

        let mcp = Arc::new(McpRegistry::new());
        for config in init.mcp_clients {
            mcp.add_client(config).await?;
        }

        let pipeline = Arc::new(PluginPipeline::new(init.plugins));
        let dispatcher = Dispatcher::new(registry.clone(), pipeline.clone());

        Ok(Self {
            registry,
            pipeline,
            mcp,
            dispatcher,
        })
    }

    fn expect_kind(
        &self,
        request: &BifrostRequest,
        expected: RequestKind,
    ) -> Result<(), BifrostError> {
        let kind = request.kind();
        if kind != expected {
            return Err(BifrostError::validation(format!(
                "request input is {kind}, expected {expected}"
            )));
        }
        Ok(())
    }

    /// Fold the available MCP tools into a chat or responses request, so
    /// the model can call them. Tools the request already defines win.
    fn inject_mcp_tools(&self, ctx: &RequestContext, request: &mut BifrostRequest) {
        if !matches!(
            request.input,
            RequestInput::ChatCompletion(_) | RequestInput::Responses(_)
        ) {
            return;
        }
        let available = self.mcp.get_available_tools(ctx);
        if available.is_empty() {
            return;
        }

        let tools = request.params.tools.get_or_insert_with(Vec::new);
        for tool in available {
            if tools.iter().any(|existing| existing.name == tool.name) {
                continue;
            }
            let mut definition = ToolDefinition::new(tool.name, tool.schema);
            definition.description = tool.description;
            tools.push(definition);
        }
    }

    // === Chat and text ===

    /// Serve a chat completion, with MCP tools injected when available.
    pub async fn chat_completion(
        &self,
        ctx: &RequestContext,
        mut request: BifrostRequest,
    ) -> Result<BifrostResponse, BifrostError> {
        self.expect_kind(&request, RequestKind::ChatCompletion)?;
        self.inject_mcp_tools(ctx, &mut request);
        self.dispatcher.dispatch(ctx, request).await
    }

    /// Serve a streaming chat completion.
    pub async fn chat_completion_stream(
        &self,
        ctx: &RequestContext,
        mut request: BifrostRequest,
    ) -> Result<ChunkReceiver, BifrostError> {
        self.expect_kind(&request, RequestKind::ChatCompletion)?;
        self.inject_mcp_tools(ctx, &mut request);
        self.dispatcher.dispatch_stream(ctx, request).await
    }

    /// Serve a Responses API request, with MCP tools injected when
    /// available.
    pub async fn responses(
        &self,
        ctx: &RequestContext,
        mut request: BifrostRequest,
    ) -> Result<BifrostResponse, BifrostError> {
        self.expect_kind(&request, RequestKind::Responses)?;
        self.inject_mcp_tools(ctx, &mut request);
        self.dispatcher.dispatch(ctx, request).await
    }

    /// Serve a streaming Responses API request.
    pub async fn responses_stream(
        &self,
        ctx: &RequestContext,
        mut request: BifrostRequest,
    ) -> Result<ChunkReceiver, BifrostError> {
        self.expect_kind(&request, RequestKind::Responses)?;
        self.inject_mcp_tools(ctx, &mut request);
        self.dispatcher.dispatch_stream(ctx, request).await
    }

    unary_entry!(
        /// Serve a text completion.
        text_completion,
        TextCompletion
    );
    unary_entry!(
        /// Serve an embedding request.
        embedding,
        Embedding
    );
    unary_entry!(
        /// Synthesize speech.
        speech,
        Speech
    );
    stream_entry!(
        /// Synthesize speech as a stream of audio chunks.
        speech_stream,
        Speech
    );
    unary_entry!(
        /// Transcribe audio.
        transcription,
        Transcription
    );
    stream_entry!(
        /// Transcribe audio as a stream of text deltas.
        transcription_stream,
        Transcription
    );
    unary_entry!(
        /// Generate images from a prompt.
        image_generation,
        ImageGeneration
    );
    stream_entry!(
        /// Generate images as a stream of partials.
        image_generation_stream,
        ImageGeneration
    );
    unary_entry!(
        /// Edit an image with a prompt.
        image_edit,
        ImageEdit
    );
    unary_entry!(
        /// Generate variations of an image.
        image_variation,
        ImageVariation
    );
    unary_entry!(
        /// Start a video generation job.
        video_generation,
        VideoGeneration
    );
    unary_entry!(
        /// Fetch the state of a video job.
        video_retrieve,
        VideoRetrieve
    );
    unary_entry!(
        /// Download a finished video.
        video_download,
        VideoDownload
    );
    unary_entry!(
        /// Delete a video job.
        video_delete,
        VideoDelete
    );
    unary_entry!(
        /// List video jobs.
        video_list,
        VideoList
    );
    unary_entry!(
        /// Remix an existing video job with a new prompt.
        video_remix,
        VideoRemix
    );
    unary_entry!(
        /// Score documents against a query.
        rerank,
        Rerank
    );
    unary_entry!(
        /// List the models a provider advertises.
        list_models,
        ListModels
    );
    unary_entry!(
        /// Upload a file.
        file_upload,
        FileUpload
    );
    unary_entry!(
        /// List files.
        file_list,
        FileList
    );
    unary_entry!(
        /// Fetch file metadata.
        file_retrieve,
        FileRetrieve
    );
    unary_entry!(
        /// Delete a file.
        file_delete,
        FileDelete
    );
    unary_entry!(
        /// Download file content.
        file_content,
        FileContent
    );
    unary_entry!(
        /// Create a batch job.
        batch_create,
        BatchCreate
    );
    unary_entry!(
        /// List batch jobs.
        batch_list,
        BatchList
    );
    unary_entry!(
        /// Fetch batch state.
        batch_retrieve,
        BatchRetrieve
    );
    unary_entry!(
        /// Cancel a batch.
        batch_cancel,
        BatchCancel
    );
    unary_entry!(
        /// Download the results of a finished batch.
        batch_results,
        BatchResults
    );
    unary_entry!(
        /// Create a container.
        container_create,
        ContainerCreate
    );
    unary_entry!(
        /// List containers.
        container_list,
        ContainerList
    );
    unary_entry!(
        /// Fetch container metadata.
        container_retrieve,
        ContainerRetrieve
    );
    unary_entry!(
        /// Delete a container.
        container_delete,
        ContainerDelete
    );
    unary_entry!(
        /// Create a file inside a container.
        container_file_create,
        ContainerFileCreate
    );
    unary_entry!(
        /// List the files of a container.
        container_file_list,
        ContainerFileList
    );
    unary_entry!(
        /// Fetch container-file metadata.
        container_file_retrieve,
        ContainerFileRetrieve
    );
    unary_entry!(
        /// Download container-file content.
        container_file_content,
        ContainerFileContent
    );
    unary_entry!(
        /// Delete a container file.
        container_file_delete,
        ContainerFileDelete
    );
    unary_entry!(
        /// Count the tokens a message list would consume.
        count_tokens,
        CountTokens
    );

    // === MCP ===

    /// Execute an MCP tool call issued by a chat completion.
    ///
    /// Runs synchronously within the caller's context; the result message
    /// is appended to the conversation by the caller.
    pub async fn execute_chat_mcp_tool(
        &self,
        ctx: &RequestContext,
        call: &ToolCall,
    ) -> Result<Message, BifrostError> {
        self.mcp.execute_tool(ctx, call).await
    }

    /// Execute an MCP tool call issued by a Responses API request.
    pub async fn execute_responses_mcp_tool(
        &self,
        ctx: &RequestContext,
        call: &ToolCall,
    ) -> Result<Message, BifrostError> {
        self.mcp.execute_tool(ctx, call).await
    }

    /// MCP tools currently available under the given context's filter.
    pub fn get_mcp_tools(&self, ctx: &RequestContext) -> Vec<McpTool> {
        self.mcp.get_available_tools(ctx)
    }

    /// Redacted configs and states of every MCP client.
    pub fn get_mcp_clients(&self) -> Vec<(McpClientConfig, McpClientState)> {
        self.mcp.get_clients()
    }

    /// Add and connect an MCP client.
    pub async fn add_mcp_client(&self, config: McpClientConfig) -> Result<(), BifrostError> {
        self.mcp.add_client(config).await
    }

    /// Remove an MCP client.
    pub async fn remove_mcp_client(&self, id: &str) -> Result<(), BifrostError> {
        self.mcp.remove_client(id).await
    }

    /// Replace an MCP client's configuration (redaction-aware).
    pub async fn edit_mcp_client(
        &self,
        id: &str,
        config: McpClientConfig,
    ) -> Result<(), BifrostError> {
        self.mcp.edit_client(id, config).await
    }

    /// Reconnect an MCP client.
    pub async fn reconnect_mcp_client(&self, id: &str) -> Result<(), BifrostError> {
        self.mcp.reconnect_client(id).await
    }

    // === Lifecycle ===

    /// Configure a provider at runtime.
    pub async fn add_provider(
        &self,
        provider: Provider,
        config: ProviderConfig,
    ) -> Result<(), BifrostError> {
        self.registry.add_provider(provider, config).await
    }

    /// Remove a provider, draining its pool.
    pub async fn remove_provider(&self, provider: &Provider) -> Result<(), BifrostError> {
        self.registry.remove_provider(provider).await
    }

    /// Providers currently configured.
    pub fn get_configured_providers(&self) -> Vec<Provider> {
        self.registry.configured_providers()
    }

    /// Redacted config snapshot of a provider, for listing. Key secrets
    /// carry the redaction sentinel; the raw values never leave the
    /// registry.
    pub fn get_provider_config(&self, provider: &Provider) -> Option<ProviderConfig> {
        self.registry
            .get(provider)
            .map(|runtime| runtime.config_snapshot().redacted())
    }

    /// Resize a provider's worker pool.
    pub async fn update_provider_concurrency(
        &self,
        provider: &Provider,
        sizing: ConcurrencyAndBufferSize,
    ) -> Result<(), BifrostError> {
        self.registry
            .update_provider_concurrency(provider, sizing)
            .await
    }

    /// Flip a provider's queue drop policy.
    pub fn update_drop_excess_requests(
        &self,
        provider: &Provider,
        drop_excess: bool,
    ) -> Result<(), BifrostError> {
        self.registry
            .update_drop_excess_requests(provider, drop_excess)
    }

    /// Drain every pool, close every MCP client, and run plugin cleanup.
    pub async fn shutdown(&self) {
        info!("gateway shutting down");
        self.registry.shutdown().await;
        self.mcp.cleanup().await;
        self.pipeline.cleanup().await;
    }
}

#[cfg(test)]
#[path = "lib.test.rs"]
mod tests;
