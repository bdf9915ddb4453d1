//! The gateway error envelope.
//!
//! # Error chain design
//!
//! Upstream failures are converted into [`BifrostError`] with stringified
//! messages rather than wrapped source errors. Each provider stack has
//! different error types (reqwest::Error, serde_json::Error, wire-specific
//! bodies); storing strings keeps handling uniform, keeps the envelope
//! serializable for logging, and avoids leaking provider crates through the
//! public API. The `From` impls preserve context by embedding the source
//! error's Display output.

use crate::kind::ErrorKind;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Message body of a gateway error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description of the failure.
    pub message: String,
    /// Upstream error type, when the provider reported one.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Upstream error code, when the provider reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Context the failure was observed under.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorExtraFields {
    /// Provider the failing hop targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Model the failing hop targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Request kind being served.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_kind: Option<String>,
    /// Zero-based index of the fallback hop that produced this error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_index: Option<usize>,
}

/// Error surfaced at every gateway boundary.
///
/// `is_bifrost_error == false` marks an upstream HTTP/protocol failure;
/// `true` marks an internal precondition failure.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BifrostError {
    /// Classification driving dispatch policy.
    pub kind: ErrorKind,
    /// Whether the failure originated inside the gateway.
    pub is_bifrost_error: bool,
    /// Upstream HTTP status, when one was observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Message body.
    pub error: ErrorBody,
    /// Context the failure was observed under.
    #[serde(default)]
    pub extra_fields: ErrorExtraFields,
    /// Upstream-suggested delay before retrying, when parseable.
    #[serde(skip)]
    pub retry_after: Option<Duration>,
}

impl BifrostError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            is_bifrost_error: kind.is_internal(),
            status_code: None,
            error: ErrorBody {
                message: message.into(),
                error_type: None,
                code: None,
            },
            extra_fields: ErrorExtraFields::default(),
            retry_after: None,
        }
    }

    /// Caller-supplied request failed a precondition. Terminal, no fallback.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// The adapter lacks the capability for this request kind.
    pub fn unsupported(provider: &str, operation: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedOperation,
            format!("provider {provider} does not support {operation}"),
        )
    }

    /// No enabled key matches the requested model.
    pub fn no_eligible_key(provider: &str, model: &str) -> Self {
        Self::new(
            ErrorKind::NoEligibleKey,
            format!("no eligible key for model {model} on provider {provider}"),
        )
    }

    /// The provider queue is at capacity with the drop policy on.
    pub fn queue_full(provider: &str) -> Self {
        Self::new(
            ErrorKind::QueueFull,
            format!("request queue for provider {provider} is full"),
        )
    }

    /// The caller cancelled the request.
    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "request canceled by caller")
    }

    /// The request deadline elapsed.
    pub fn deadline_exceeded() -> Self {
        Self::new(ErrorKind::DeadlineExceeded, "request deadline exceeded")
    }

    /// Network failure or timeout mid-call. Retryable within the hop.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// The upstream returned an error response.
    ///
    /// The upstream message is preserved with trailing newlines trimmed.
    pub fn provider_api(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut err = Self::new(
            ErrorKind::ProviderApi,
            message.trim_end_matches(['\n', '\r']).to_string(),
        );
        err.status_code = Some(status);
        err
    }

    /// The upstream body could not be decoded.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Internal precondition failed in an adapter or worker.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, message)
    }

    /// A plugin hook failed.
    pub fn plugin(name: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Plugin,
            format!("plugin {name}: {}", message.into()),
        )
    }

    /// The provider pool is draining.
    pub fn shutting_down(provider: &str) -> Self {
        Self::new(
            ErrorKind::ShuttingDown,
            format!("provider {provider} is shutting down"),
        )
    }

    /// Set the upstream error type.
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error.error_type = Some(error_type.into());
        self
    }

    /// Set the upstream error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error.code = Some(code.into());
        self
    }

    /// Set the provider this error was observed on.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.extra_fields.provider = Some(provider.into());
        self
    }

    /// Set the model this error was observed on.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.extra_fields.model = Some(model.into());
        self
    }

    /// Set the request kind this error was observed on.
    pub fn with_request_kind(mut self, kind: impl Into<String>) -> Self {
        self.extra_fields.request_kind = Some(kind.into());
        self
    }

    /// Set the index of the fallback hop that produced this error.
    pub fn with_fallback_index(mut self, index: usize) -> Self {
        self.extra_fields.fallback_index = Some(index);
        self
    }

    /// Set the upstream-suggested retry delay.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    /// Whether the same hop may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.policy().retryable
    }

    /// Whether the dispatcher should move to the next fallback hop.
    pub fn skips_hop(&self) -> bool {
        self.kind.policy().skips_hop
    }

    /// Whether the whole call stops on this error.
    pub fn is_terminal(&self) -> bool {
        self.kind.policy().terminal
    }

    /// HTTP status to surface at the boundary.
    ///
    /// The adapter-parsed status wins; otherwise 400 for upstream failures
    /// and 500 for internal ones.
    pub fn boundary_status_code(&self) -> u16 {
        match self.status_code {
            Some(code) => code,
            None if self.is_bifrost_error => 500,
            None => 400,
        }
    }
}

impl std::fmt::Display for BifrostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.error.message)
    }
}

impl From<reqwest::Error> for BifrostError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BifrostError::transport(format!("request timeout: {err}"))
        } else if err.is_connect() {
            BifrostError::transport(format!("connection failed: {err}"))
        } else if err.is_decode() {
            BifrostError::decode(err.to_string())
        } else {
            BifrostError::transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BifrostError {
    fn from(err: serde_json::Error) -> Self {
        BifrostError::decode(err.to_string())
    }
}

/// Parse a retry-after delay from an upstream error message.
///
/// Looks for patterns like "try again in 5s" or "try again in 500ms",
/// commonly emitted by rate-limited APIs.
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let re = retry_after_regex();
    let captures = re.captures(message)?;

    let value = captures.get(1)?;
    let unit = captures.get(2)?;

    let value: f64 = value.as_str().parse().ok()?;
    let unit = unit.as_str().to_ascii_lowercase();

    if unit == "s" || unit.starts_with("second") {
        Some(Duration::from_secs_f64(value))
    } else if unit == "ms" {
        Some(Duration::from_millis(value as u64))
    } else {
        None
    }
}

#[allow(clippy::expect_used)]
fn retry_after_regex() -> &'static regex_lite::Regex {
    static RE: std::sync::OnceLock<regex_lite::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex_lite::Regex::new(r"(?i)try again in\s*(\d+(?:\.\d+)?)\s*(s|ms|seconds?)")
            .expect("invalid regex")
    })
}

#[cfg(test)]
#[path = "bifrost_error.test.rs"]
mod tests;
