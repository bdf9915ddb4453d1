//! Provider identity and configuration.

use crate::key::Key;
use bifrost_error::BifrostError;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;

/// Identifier of an upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI API.
    Openai,
    /// Anthropic Claude API.
    Anthropic,
    /// AWS Bedrock (SigV4-signed InvokeModel).
    Bedrock,
    /// Runway video generation API.
    Runway,
    /// A caller-registered provider, addressed by name.
    #[serde(untagged)]
    Custom(String),
}

impl Provider {
    /// Stable string form used in logs, metadata, and model identifiers.
    pub fn as_str(&self) -> &str {
        match self {
            Provider::Openai => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Bedrock => "bedrock",
            Provider::Runway => "runway",
            Provider::Custom(name) => name,
        }
    }

    /// Parse a provider identifier. Unknown names become [`Provider::Custom`].
    pub fn parse(s: &str) -> Self {
        match s {
            "openai" => Provider::Openai,
            "anthropic" => Provider::Anthropic,
            "bedrock" => Provider::Bedrock,
            "runway" => Provider::Runway,
            other => Provider::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Network tuning for a provider's HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Base URL for the provider API. Trailing slashes are trimmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum transport-level retries per hop.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial retry backoff in milliseconds.
    #[serde(default = "default_backoff_initial_ms")]
    pub retry_backoff_initial_ms: u64,
    /// Maximum retry backoff in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,
    /// Extra headers sent with every request to this provider.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_headers: HashMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    0
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    5_000
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_initial_ms: default_backoff_initial_ms(),
            retry_backoff_max_ms: default_backoff_max_ms(),
            extra_headers: HashMap::new(),
        }
    }
}

impl NetworkConfig {
    /// Base URL with any trailing slashes trimmed, if configured.
    pub fn trimmed_base_url(&self) -> Option<&str> {
        self.base_url.as_deref().map(|u| u.trim_end_matches('/'))
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the maximum transport retries per hop.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Worker pool sizing for a provider.
///
/// Invariant: `0 < concurrency <= buffer_size`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConcurrencyAndBufferSize {
    /// Number of workers consuming the queue.
    pub concurrency: usize,
    /// Capacity of the pending-request queue.
    pub buffer_size: usize,
}

impl Default for ConcurrencyAndBufferSize {
    fn default() -> Self {
        Self {
            concurrency: 10,
            buffer_size: 100,
        }
    }
}

impl ConcurrencyAndBufferSize {
    /// Validate the sizing invariant.
    pub fn validate(&self) -> Result<(), BifrostError> {
        if self.concurrency == 0 {
            return Err(BifrostError::validation("concurrency must be greater than zero"));
        }
        if self.buffer_size == 0 {
            return Err(BifrostError::validation("buffer_size must be greater than zero"));
        }
        if self.concurrency > self.buffer_size {
            return Err(BifrostError::validation(format!(
                "concurrency ({}) must not exceed buffer_size ({})",
                self.concurrency, self.buffer_size
            )));
        }
        Ok(())
    }
}

/// Proxy configuration for outbound provider traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URL (http, https, or socks5).
    pub url: String,
    /// Optional proxy username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional proxy password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Configuration for a caller-registered provider that reuses a known wire
/// format against a different endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomProviderConfig {
    /// The known provider whose wire format this provider speaks.
    pub base_provider: Provider,
}

/// Full configuration of one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Credential set. Selection is weighted-random per request.
    #[serde(default)]
    pub keys: Vec<Key>,
    /// HTTP client tuning.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Worker pool sizing.
    #[serde(default)]
    pub concurrency_and_buffer_size: ConcurrencyAndBufferSize,
    /// Optional outbound proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    /// Attach the serialized upstream request to response metadata.
    #[serde(default)]
    pub send_back_raw_request: bool,
    /// Attach the raw upstream response body to response metadata.
    #[serde(default)]
    pub send_back_raw_response: bool,
    /// Fail enqueue immediately when the queue is full instead of blocking.
    #[serde(default)]
    pub drop_excess_requests: bool,
    /// Present for custom providers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_provider_config: Option<CustomProviderConfig>,
}

impl ProviderConfig {
    /// Create a config with a single key.
    pub fn with_key(key: Key) -> Self {
        Self {
            keys: vec![key],
            ..Self::default()
        }
    }

    /// Validate the config before activation.
    pub fn validate(&self) -> Result<(), BifrostError> {
        self.concurrency_and_buffer_size.validate()
    }

    /// Copy of this config with every key's secrets replaced by the
    /// redaction sentinel, for listing over an API.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        out.keys = self.keys.iter().map(Key::redacted).collect();
        out
    }
}

/// A model advertised by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier as the provider reports it.
    pub id: String,
    /// Owning organization, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

#[cfg(test)]
#[path = "provider.test.rs"]
mod tests;
