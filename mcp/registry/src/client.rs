//! One MCP server connection and its lifecycle.

use crate::jsonrpc::MCP_PROTOCOL_VERSION;
use crate::tools::McpTool;
use crate::tools::prefixed_tool_name;
use crate::transport::McpTransport;
use bifrost_error::BifrostError;
use bifrost_protocol::McpClientConfig;
use bifrost_protocol::McpClientState;
use serde_json::Value;
use serde_json::json;
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::warn;

/// A connection to one MCP tool server.
///
/// State machine: `connecting → connected → (error | disconnected)`;
/// `error → connecting` via [`McpClient::reconnect`]. A disconnected client
/// is terminal; re-adding creates a new value.
pub struct McpClient {
    config: McpClientConfig,
    state: RwLock<McpClientState>,
    transport: Mutex<Option<McpTransport>>,
    tools: RwLock<Vec<McpTool>>,
}

impl McpClient {
    /// Create a client in the connecting state. Call
    /// [`McpClient::connect`] to open the transport.
    pub fn new(config: McpClientConfig) -> Self {
        Self {
            config,
            state: RwLock::new(McpClientState::Connecting),
            transport: Mutex::new(None),
            tools: RwLock::new(Vec::new()),
        }
    }

    /// The client configuration.
    pub fn config(&self) -> &McpClientConfig {
        &self.config
    }

    /// Current connection state.
    pub fn state(&self) -> McpClientState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: McpClientState) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.can_transition_to(next) || *state == next {
            *state = next;
        } else {
            warn!(
                client = %self.config.name,
                "ignoring invalid mcp state transition {:?} -> {next:?}",
                *state
            );
        }
    }

    /// Open the transport, run the initialize handshake, and discover
    /// tools. Leaves the client in the error state on failure.
    pub async fn connect(&self) -> Result<(), BifrostError> {
        self.set_state(McpClientState::Connecting);
        match self.connect_inner().await {
            Ok(()) => {
                self.set_state(McpClientState::Connected);
                Ok(())
            }
            Err(err) => {
                self.set_state(McpClientState::Error);
                Err(err)
            }
        }
    }

    async fn connect_inner(&self) -> Result<(), BifrostError> {
        let transport = McpTransport::connect(&self.config).await?;

        let init_params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "bifrost",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        transport
            .request("initialize", Some(init_params), None)
            .await?;
        transport.notify("notifications/initialized", None).await?;

        let tools = Self::discover_tools(&self.config, &transport).await?;
        debug!(
            client = %self.config.name,
            count = tools.len(),
            "discovered mcp tools"
        );

        *self.tools.write().unwrap_or_else(|e| e.into_inner()) = tools;
        *self.transport.lock().await = Some(transport);
        Ok(())
    }

    async fn discover_tools(
        config: &McpClientConfig,
        transport: &McpTransport,
    ) -> Result<Vec<McpTool>, BifrostError> {
        let result = transport.request("tools/list", None, None).await?;
        let raw_tools = result
            .get("tools")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut tools = Vec::with_capacity(raw_tools.len());
        for raw in raw_tools {
            let Some(name) = raw.get("name").and_then(Value::as_str) else {
                continue;
            };
            tools.push(McpTool {
                name: prefixed_tool_name(&config.name, name),
                description: raw
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                schema: raw.get("inputSchema").cloned().unwrap_or(Value::Null),
                client_id: config.id.clone(),
            });
        }
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tools)
    }

    /// Tear down and re-open the connection. Tool registrations survive
    /// only when the reconnect succeeds.
    pub async fn reconnect(&self) -> Result<(), BifrostError> {
        if let Some(transport) = self.transport.lock().await.take() {
            transport.close().await;
        }
        let result = self.connect().await;
        if result.is_err() {
            self.tools.write().unwrap_or_else(|e| e.into_inner()).clear();
        }
        result
    }

    /// Tools discovered from this server, prefixed and sorted by name.
    pub fn tools(&self) -> Vec<McpTool> {
        self.tools.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Execute a tool by its bare (unprefixed) name.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, BifrostError> {
        let transport = self.transport.lock().await;
        let transport = transport.as_ref().ok_or_else(|| {
            BifrostError::operation(format!(
                "mcp client {} is not connected",
                self.config.name
            ))
        })?;
        transport
            .request(
                "tools/call",
                Some(json!({ "name": tool_name, "arguments": arguments })),
                timeout,
            )
            .await
    }

    /// Close the connection. Terminal for this value.
    pub async fn close(&self) {
        if let Some(transport) = self.transport.lock().await.take() {
            transport.close().await;
        }
        self.set_state(McpClientState::Disconnected);
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("name", &self.config.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client.test.rs"]
mod tests;
