//! MCP client configuration and validation.

use crate::redact;
use bifrost_error::BifrostError;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;

/// How the gateway reaches an MCP tool server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpConnectionType {
    /// Child process speaking newline-delimited JSON-RPC on stdio.
    Stdio,
    /// HTTP endpoint answering JSON-RPC with JSON or SSE bodies.
    HttpSse,
    /// WebSocket carrying one JSON-RPC frame per message.
    Websocket,
}

/// Authentication for an MCP connection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpAuth {
    /// No authentication.
    #[default]
    None,
    /// Static headers sent with every request.
    Headers,
    /// OAuth flow; connection deferred until the flow completes.
    Oauth {
        /// Identifier of the pending OAuth flow.
        flow_id: String,
    },
}

/// Connection state of an MCP client.
///
/// `connecting → connected → (error | disconnected)`; `error` may return to
/// `connecting` via reconnect; `disconnected` is terminal for the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpClientState {
    Connecting,
    Connected,
    Error,
    Disconnected,
}

impl McpClientState {
    /// Whether the state machine admits the given transition.
    pub fn can_transition_to(self, next: McpClientState) -> bool {
        use McpClientState::*;
        matches!(
            (self, next),
            (Connecting, Connected)
                | (Connecting, Error)
                | (Connected, Error)
                | (Connected, Disconnected)
                | (Error, Connecting)
                | (Error, Disconnected)
        )
    }
}

/// Configuration of one MCP tool server connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpClientConfig {
    /// Stable identifier.
    pub id: String,
    /// Client name; prefixes every tool this client exposes.
    ///
    /// ASCII, no hyphens or spaces, must not start with a digit. The hyphen
    /// restriction keeps `"<name>-<tool>"` unambiguous to split.
    pub name: String,
    /// Transport used to reach the server.
    pub connection_type: McpConnectionType,
    /// Endpoint URL, or the command line for stdio servers.
    pub connection_string: String,
    /// Extra arguments for stdio servers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment for stdio servers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Authentication.
    #[serde(default)]
    pub auth: McpAuth,
    /// Tools callers may execute. `["*"]` admits every tool; an empty list
    /// admits none.
    #[serde(default)]
    pub tools_to_execute: Vec<String>,
    /// Tools executed without confirmation. Must be a subset of
    /// `tools_to_execute` (wildcard-compatible).
    #[serde(default)]
    pub tools_to_auto_execute: Vec<String>,
    /// Headers sent with HTTP and websocket connections. Values are
    /// secrets; they serialize redacted.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl McpClientConfig {
    /// Create a config with the given identity and transport.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        connection_type: McpConnectionType,
        connection_string: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            connection_type,
            connection_string: connection_string.into(),
            args: Vec::new(),
            env: HashMap::new(),
            auth: McpAuth::None,
            tools_to_execute: vec!["*".to_string()],
            tools_to_auto_execute: Vec::new(),
            headers: HashMap::new(),
        }
    }

    /// Validate the configuration before activation.
    pub fn validate(&self) -> Result<(), BifrostError> {
        validate_name(&self.name)?;
        validate_tool_list(&self.tools_to_execute, "tools_to_execute")?;
        validate_tool_list(&self.tools_to_auto_execute, "tools_to_auto_execute")?;

        if self.tools_to_execute.is_empty() && !self.tools_to_auto_execute.is_empty() {
            return Err(BifrostError::validation(
                "tools_to_auto_execute requires a non-empty tools_to_execute",
            ));
        }
        let execute_all = self.tools_to_execute.iter().any(|t| t == "*");
        if !execute_all {
            for tool in &self.tools_to_auto_execute {
                if tool != "*" && !self.tools_to_execute.contains(tool) {
                    return Err(BifrostError::validation(format!(
                        "tools_to_auto_execute entry {tool:?} is not in tools_to_execute"
                    )));
                }
            }
        }
        if self.tools_to_auto_execute.iter().any(|t| t == "*") && !execute_all {
            return Err(BifrostError::validation(
                "tools_to_auto_execute wildcard requires a tools_to_execute wildcard",
            ));
        }
        Ok(())
    }

    /// Effective auto-execute list: forced empty when nothing is executable.
    pub fn effective_auto_execute(&self) -> &[String] {
        if self.tools_to_execute.is_empty() {
            &[]
        } else {
            &self.tools_to_auto_execute
        }
    }

    /// Copy with header values and the connection string redacted.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        for value in out.headers.values_mut() {
            *value = redact::SENTINEL.to_string();
        }
        out
    }

    /// Merge an update, keeping stored header values wherever the incoming
    /// value carries the redaction sentinel.
    pub fn merge_update(&self, mut incoming: McpClientConfig) -> McpClientConfig {
        for (name, value) in incoming.headers.iter_mut() {
            if redact::is_redacted(value)
                && let Some(stored) = self.headers.get(name)
            {
                *value = stored.clone();
            }
        }
        incoming
    }
}

fn validate_name(name: &str) -> Result<(), BifrostError> {
    if name.is_empty() {
        return Err(BifrostError::validation("mcp client name must not be empty"));
    }
    if !name.is_ascii() {
        return Err(BifrostError::validation(
            "mcp client name must be ASCII",
        ));
    }
    if name.contains('-') || name.contains(' ') {
        return Err(BifrostError::validation(
            "mcp client name must not contain hyphens or spaces",
        ));
    }
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Err(BifrostError::validation(
            "mcp client name must not start with a digit",
        ));
    }
    Ok(())
}

fn validate_tool_list(tools: &[String], field: &str) -> Result<(), BifrostError> {
    let has_wildcard = tools.iter().any(|t| t == "*");
    if has_wildcard && tools.len() > 1 {
        return Err(BifrostError::validation(format!(
            "{field} wildcard \"*\" cannot co-occur with other entries"
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for tool in tools {
        if !seen.insert(tool) {
            return Err(BifrostError::validation(format!(
                "{field} contains duplicate entry {tool:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "mcp_config.test.rs"]
mod tests;
