//! Error classification and dispatch policy.

use serde::Deserialize;
use serde::Serialize;

/// Dispatch policy attached to an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    /// The same hop may be retried (transient failure).
    pub retryable: bool,
    /// The dispatcher moves on to the next fallback hop.
    pub skips_hop: bool,
    /// The whole call stops; no further hops are attempted.
    pub terminal: bool,
}

/// Classification of a gateway failure.
///
/// The kind decides what the dispatcher does next; the human-readable
/// detail lives in the error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied request failed a precondition.
    Validation,
    /// The adapter does not implement the requested operation.
    UnsupportedOperation,
    /// No enabled key matches the requested model.
    NoEligibleKey,
    /// The provider queue is at capacity and the drop policy is on.
    QueueFull,
    /// The caller cancelled the request.
    Canceled,
    /// The request deadline elapsed.
    DeadlineExceeded,
    /// Network failure or timeout mid-call.
    Transport,
    /// The upstream returned an error response with a parseable body.
    ProviderApi,
    /// The upstream body could not be decoded.
    Decode,
    /// Internal precondition failed inside an adapter or worker.
    Operation,
    /// A plugin hook failed. Logged, never surfaced to callers.
    Plugin,
    /// The provider pool is draining; the request cannot be served.
    ShuttingDown,
}

impl ErrorKind {
    /// Dispatch policy for this kind.
    pub const fn policy(&self) -> ErrorPolicy {
        match self {
            ErrorKind::Validation => ErrorPolicy {
                retryable: false,
                skips_hop: false,
                terminal: true,
            },
            ErrorKind::UnsupportedOperation
            | ErrorKind::NoEligibleKey
            | ErrorKind::QueueFull
            | ErrorKind::ProviderApi
            | ErrorKind::Decode
            | ErrorKind::Operation
            | ErrorKind::Plugin => ErrorPolicy {
                retryable: false,
                skips_hop: true,
                terminal: false,
            },
            ErrorKind::Canceled | ErrorKind::DeadlineExceeded | ErrorKind::ShuttingDown => {
                ErrorPolicy {
                    retryable: false,
                    skips_hop: false,
                    terminal: true,
                }
            }
            ErrorKind::Transport => ErrorPolicy {
                retryable: true,
                skips_hop: true,
                terminal: false,
            },
        }
    }

    /// Whether errors of this kind originate inside the gateway
    /// (as opposed to an upstream HTTP/protocol failure).
    pub const fn is_internal(&self) -> bool {
        !matches!(
            self,
            ErrorKind::Transport | ErrorKind::ProviderApi | ErrorKind::Decode
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::UnsupportedOperation => "unsupported_operation",
            ErrorKind::NoEligibleKey => "no_eligible_key",
            ErrorKind::QueueFull => "queue_full",
            ErrorKind::Canceled => "canceled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::Transport => "transport",
            ErrorKind::ProviderApi => "provider_api",
            ErrorKind::Decode => "decode",
            ErrorKind::Operation => "operation",
            ErrorKind::Plugin => "plugin",
            ErrorKind::ShuttingDown => "shutting_down",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
#[path = "kind.test.rs"]
mod tests;
