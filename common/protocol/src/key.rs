//! Provider credentials.

use crate::redact;
use serde::Deserialize;
use serde::Serialize;

/// AWS credentials and scope for Bedrock keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockKeyConfig {
    /// AWS access key id.
    pub access_key: String,
    /// AWS secret access key. Redacted on serialization for display.
    pub secret_key: String,
    /// Optional session token for temporary credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// AWS region, e.g. `us-east-1`.
    pub region: String,
    /// Optional endpoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// One credential in a provider's key set.
///
/// Keys are immutable once active; updates replace the whole value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    /// Stable identifier for the key.
    pub id: String,
    /// The secret value (API key, token).
    pub value: String,
    /// Models this key may serve. Empty means all models.
    #[serde(default)]
    pub models: Vec<String>,
    /// Relative selection weight among eligible keys.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Disabled keys are never selected.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Present for Bedrock keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrock_config: Option<BedrockKeyConfig>,
}

fn default_weight() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl Key {
    /// Create an enabled key with weight 1 and no model restriction.
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            models: Vec::new(),
            weight: default_weight(),
            enabled: default_enabled(),
            bedrock_config: None,
        }
    }

    /// Restrict this key to the given models.
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Set the selection weight.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Disable the key.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Attach Bedrock credentials.
    pub fn with_bedrock_config(mut self, config: BedrockKeyConfig) -> Self {
        self.bedrock_config = Some(config);
        self
    }

    /// Whether this key may serve the given model.
    ///
    /// An empty allow-list admits every model.
    pub fn supports_model(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }

    /// Copy of this key with secret fields replaced by the redaction
    /// sentinel, for listing over an API or writing to logs.
    ///
    /// Keys are immutable once active and replaced wholesale on update,
    /// so there is no sentinel-merge path back; the redacted copy is a
    /// read-only view.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        out.value = redact::SENTINEL.to_string();
        if let Some(ref mut bedrock) = out.bedrock_config {
            bedrock.secret_key = redact::SENTINEL.to_string();
            if bedrock.session_token.is_some() {
                bedrock.session_token = Some(redact::SENTINEL.to_string());
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "key.test.rs"]
mod tests;
