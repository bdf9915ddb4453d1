//! Tool naming and filtering.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// A tool discovered from an MCP server, registered under its
/// client-prefixed name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    /// Exposed name, always `"<client>-<tool>"`.
    pub name: String,
    /// Tool description, when the server provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the tool's input.
    pub schema: Value,
    /// Id of the owning client.
    pub client_id: String,
}

/// Build the exposed name for a client's tool.
pub fn prefixed_tool_name(client_name: &str, tool_name: &str) -> String {
    format!("{client_name}-{tool_name}")
}

/// Split an exposed name back into client name and tool name.
///
/// Client names cannot contain hyphens, so the first `-` is the boundary.
pub fn split_prefixed_tool_name(name: &str) -> Option<(&str, &str)> {
    let (client, tool) = name.split_once('-')?;
    if client.is_empty() || tool.is_empty() {
        return None;
    }
    Some((client, tool))
}

/// Whether a prefixed tool name passes a request-scoped include-list.
///
/// Entries are either exact prefixed names or `"<client>-*"` wildcards
/// admitting every tool of that client. An empty filter admits everything
/// (no filter was supplied).
pub fn matches_include_filter(prefixed_name: &str, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    filter.iter().any(|entry| {
        if let Some(client) = entry.strip_suffix("-*") {
            prefixed_name
                .strip_prefix(client)
                .is_some_and(|rest| rest.starts_with('-'))
        } else {
            entry == prefixed_name
        }
    })
}

/// Whether a bare tool name passes a client's execute allow-list.
///
/// `"*"` admits every tool; an empty list admits none.
pub fn allowed_by_execute_list(tool_name: &str, allow_list: &[String]) -> bool {
    allow_list
        .iter()
        .any(|entry| entry == "*" || entry == tool_name)
}

#[cfg(test)]
#[path = "tools.test.rs"]
mod tests;
