//! Per-request context: identity, deadline, cancellation, caller values.

use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context key under which a request-scoped MCP tool include-list is
/// stored. The value is a JSON array of prefixed tool names; entries of the
/// form `"<client>-*"` are wildcards admitting every tool of that client.
pub const MCP_INCLUDE_TOOLS_KEY: &str = "mcp-include-tools";

/// Caller-supplied context travelling with one request.
///
/// Cloning shares the cancellation token and deadline, so a clone handed to
/// a worker observes the caller's cancellation. The value map is cloned by
/// value; plugins communicate forward through values they set before
/// dispatch.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique id for this request, stamped into logs and metadata.
    pub request_id: Uuid,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    values: HashMap<String, Value>,
}

impl RequestContext {
    /// Create a context with a fresh request id and no deadline.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancellation: CancellationToken::new(),
            values: HashMap::new(),
        }
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Store a caller value.
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Read a caller value.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Store a caller value on an existing context.
    pub fn set_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// The absolute deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time remaining until the deadline. `None` when no deadline is set;
    /// `Some(Duration::ZERO)` when it already elapsed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline elapsed.
    pub fn deadline_elapsed(&self) -> bool {
        self.remaining().is_some_and(|r| r.is_zero())
    }

    /// Cancel the request. Every suspension point holding a clone of this
    /// context observes the cancellation at its next await.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether the request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The cancellation token, for use in `tokio::select!`.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "context.test.rs"]
mod tests;
