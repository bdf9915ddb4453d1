//! JSON-RPC 2.0 framing for MCP connections.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Protocol revision sent in the initialize handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a request id unique within this process.
pub fn next_request_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// An outbound JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    jsonrpc: &'static str,
    /// Request id echoed by the response. Absent for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Method name, e.g. `tools/list`.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a request expecting a response.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(next_request_id()),
            method: method.into(),
            params,
        }
    }

    /// Create a notification (no response expected).
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method: method.into(),
            params,
        }
    }
}

/// Error object of a failed JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default)]
    pub data: Option<Value>,
}

/// An inbound JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// Id of the request this answers. Absent on server notifications.
    #[serde(default)]
    pub id: Option<u64>,
    /// Result on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Unwrap the result, converting a JSON-RPC error into a message.
    pub fn into_result(self) -> Result<Value, String> {
        if let Some(error) = self.error {
            return Err(format!("{} (code {})", error.message, error.code));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
#[path = "jsonrpc.test.rs"]
mod tests;
