//! MCP tool registry.
//!
//! Maintains connections to Model Context Protocol tool servers, exposes
//! their tools under client-prefixed names, and executes tool calls within
//! the caller's deadline. Three transports are supported: a child process
//! speaking newline-delimited JSON-RPC on stdio, an HTTP endpoint answering
//! JSON-RPC with JSON or SSE bodies, and a websocket carrying one JSON-RPC
//! frame per message.

mod client;
mod jsonrpc;
mod registry;
mod tools;
mod transport;

pub use client::McpClient;
pub use registry::McpRegistry;
pub use tools::McpTool;
pub use tools::matches_include_filter;
pub use tools::prefixed_tool_name;
pub use tools::split_prefixed_tool_name;
