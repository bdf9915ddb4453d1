//! The MCP client table and tool execution surface.

use crate::client::McpClient;
use crate::tools::McpTool;
use crate::tools::allowed_by_execute_list;
use crate::tools::matches_include_filter;
use crate::tools::split_prefixed_tool_name;
use bifrost_error::BifrostError;
use bifrost_protocol::MCP_INCLUDE_TOOLS_KEY;
use bifrost_protocol::McpAuth;
use bifrost_protocol::McpClientConfig;
use bifrost_protocol::McpClientState;
use bifrost_protocol::Message;
use bifrost_protocol::RequestContext;
use bifrost_protocol::ToolCall;
use bifrost_protocol::ToolResultContent;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Registry of MCP tool server connections.
///
/// Read-mostly: lookups take a shared lock; add/remove swap entries under
/// the write lock without holding it across awaits.
#[derive(Default)]
pub struct McpRegistry {
    clients: RwLock<HashMap<String, Arc<McpClient>>>,
    pending_oauth: RwLock<HashMap<String, McpClientConfig>>,
}

impl McpRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn clients_snapshot(&self) -> Vec<Arc<McpClient>> {
        self.clients
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    fn client_by_id(&self, id: &str) -> Option<Arc<McpClient>> {
        self.clients
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn client_by_name(&self, name: &str) -> Option<Arc<McpClient>> {
        self.clients
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .find(|c| c.config().name == name)
            .cloned()
    }

    /// Add a client and connect it.
    ///
    /// OAuth-authenticated configs are parked until the flow completes;
    /// call [`McpRegistry::complete_oauth`] with the flow id to finish.
    pub async fn add_client(&self, config: McpClientConfig) -> Result<(), BifrostError> {
        config.validate()?;

        {
            let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
            if clients.contains_key(&config.id) {
                return Err(BifrostError::validation(format!(
                    "mcp client id {:?} already exists",
                    config.id
                )));
            }
            if clients.values().any(|c| c.config().name == config.name) {
                return Err(BifrostError::validation(format!(
                    "mcp client name {:?} already exists",
                    config.name
                )));
            }
        }

        if let McpAuth::Oauth { flow_id } = &config.auth {
            info!(client = %config.name, flow = %flow_id, "deferring mcp connection until oauth completes");
            self.pending_oauth
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(flow_id.clone(), config);
            return Ok(());
        }

        self.connect_and_insert(config).await
    }

    /// Finish a deferred OAuth connection.
    pub async fn complete_oauth(&self, flow_id: &str) -> Result<(), BifrostError> {
        let config = self
            .pending_oauth
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(flow_id)
            .ok_or_else(|| {
                BifrostError::validation(format!("no pending oauth flow {flow_id:?}"))
            })?;
        self.connect_and_insert(config).await
    }

    async fn connect_and_insert(&self, config: McpClientConfig) -> Result<(), BifrostError> {
        let id = config.id.clone();
        let client = Arc::new(McpClient::new(config));
        client.connect().await?;
        self.clients
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, client);
        Ok(())
    }

    /// Tear down and re-open a client's connection.
    pub async fn reconnect_client(&self, id: &str) -> Result<(), BifrostError> {
        let client = self
            .client_by_id(id)
            .ok_or_else(|| BifrostError::validation(format!("unknown mcp client {id:?}")))?;
        client.reconnect().await
    }

    /// Remove a client, closing its connection.
    pub async fn remove_client(&self, id: &str) -> Result<(), BifrostError> {
        let client = self
            .clients
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .ok_or_else(|| BifrostError::validation(format!("unknown mcp client {id:?}")))?;
        client.close().await;
        Ok(())
    }

    /// Replace a client's configuration.
    ///
    /// Secret fields arriving as the redaction sentinel keep their stored
    /// raw values. The old connection closes; a new one opens with the
    /// merged config.
    pub async fn edit_client(
        &self,
        id: &str,
        incoming: McpClientConfig,
    ) -> Result<(), BifrostError> {
        let current = self
            .client_by_id(id)
            .ok_or_else(|| BifrostError::validation(format!("unknown mcp client {id:?}")))?;

        let merged = current.config().merge_update(incoming);
        merged.validate()?;

        current.close().await;
        self.clients
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        self.connect_and_insert(merged).await
    }

    /// Redacted configs and states of every client, for listing.
    pub fn get_clients(&self) -> Vec<(McpClientConfig, McpClientState)> {
        let mut clients: Vec<_> = self
            .clients_snapshot()
            .iter()
            .map(|c| (c.config().redacted(), c.state()))
            .collect();
        clients.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        clients
    }

    /// Union of every connected client's tools, filtered by each client's
    /// execute allow-list and then by the request-scoped include-list in
    /// the context (under [`MCP_INCLUDE_TOOLS_KEY`]). Stable order by
    /// prefixed tool name.
    pub fn get_available_tools(&self, ctx: &RequestContext) -> Vec<McpTool> {
        let include_filter = include_filter_from_context(ctx);

        let mut tools: Vec<McpTool> = Vec::new();
        for client in self.clients_snapshot() {
            if client.state() != McpClientState::Connected {
                continue;
            }
            let config = client.config();
            for tool in client.tools() {
                let Some((_, bare_name)) = split_prefixed_tool_name(&tool.name) else {
                    continue;
                };
                if !allowed_by_execute_list(bare_name, &config.tools_to_execute) {
                    continue;
                }
                if !matches_include_filter(&tool.name, &include_filter) {
                    continue;
                }
                tools.push(tool);
            }
        }
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Execute a tool call, returning the result as a tool message.
    ///
    /// The call name must be prefixed (`"<client>-<tool>"`); execution is
    /// bounded by the context deadline and aborted on cancellation.
    pub async fn execute_tool(
        &self,
        ctx: &RequestContext,
        call: &ToolCall,
    ) -> Result<Message, BifrostError> {
        let (client_name, tool_name) = split_prefixed_tool_name(&call.name).ok_or_else(|| {
            BifrostError::validation(format!(
                "tool name {:?} is not of the form <client>-<tool>",
                call.name
            ))
        })?;

        let client = self.client_by_name(client_name).ok_or_else(|| {
            BifrostError::validation(format!("unknown mcp client {client_name:?}"))
        })?;

        if !allowed_by_execute_list(tool_name, &client.config().tools_to_execute) {
            return Err(BifrostError::validation(format!(
                "tool {:?} is not in the execute allow-list of client {client_name:?}",
                tool_name
            )));
        }

        let include_filter = include_filter_from_context(ctx);
        if !matches_include_filter(&call.name, &include_filter) {
            return Err(BifrostError::validation(format!(
                "tool {:?} is excluded by the request tool filter",
                call.name
            )));
        }

        debug!(tool = %call.name, "executing mcp tool");
        let result = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(BifrostError::canceled()),
            result = client.call_tool(tool_name, call.arguments.clone(), ctx.remaining()) => result?,
        };

        Ok(Message::tool_result(
            call.id.clone(),
            normalize_tool_result(&result),
        ))
    }

    /// Close every client connection. Called at gateway shutdown.
    pub async fn cleanup(&self) {
        let clients: Vec<_> = {
            let mut table = self.clients.write().unwrap_or_else(|e| e.into_inner());
            table.drain().map(|(_, c)| c).collect()
        };
        for client in clients {
            client.close().await;
        }
    }
}

fn include_filter_from_context(ctx: &RequestContext) -> Vec<String> {
    match ctx.value(MCP_INCLUDE_TOOLS_KEY) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(other) => {
            warn!("ignoring non-array mcp include filter: {other}");
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Flatten an MCP `tools/call` result into portable tool-result content.
///
/// Text blocks concatenate; anything else passes through as JSON.
fn normalize_tool_result(result: &Value) -> ToolResultContent {
    if let Some(content) = result.get("content").and_then(Value::as_array) {
        let texts: Vec<&str> = content
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();
        if !texts.is_empty() && texts.len() == content.len() {
            return ToolResultContent::text(texts.join("\n"));
        }
    }
    ToolResultContent::json(result.clone())
}

#[cfg(test)]
#[path = "registry.test.rs"]
mod tests;
