//! Model identifier parsing.

use crate::provider::Provider;
use bifrost_error::BifrostError;

/// A parsed `provider/model` identifier.
///
/// The string splits on the **first** `/` only; nested paths stay in the
/// model part, so `"bedrock/anthropic.claude-3/v1"` parses to provider
/// `bedrock` and model `anthropic.claude-3/v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    /// Provider component, when the string carried one.
    pub provider: Option<Provider>,
    /// Model component, opaque to the gateway.
    pub model: String,
}

impl ModelId {
    /// Parse a model identifier.
    ///
    /// A string without `/` has no provider component; the dispatcher falls
    /// back to the request's provider. An empty provider or model component
    /// is a validation error.
    pub fn parse(s: &str) -> Result<Self, BifrostError> {
        match s.split_once('/') {
            Some((provider, model)) => {
                if provider.is_empty() {
                    return Err(BifrostError::validation(format!(
                        "model identifier {s:?} has an empty provider"
                    )));
                }
                if model.is_empty() {
                    return Err(BifrostError::validation(format!(
                        "model identifier {s:?} has an empty model"
                    )));
                }
                Ok(Self {
                    provider: Some(Provider::parse(provider)),
                    model: model.to_string(),
                })
            }
            None => {
                if s.is_empty() {
                    return Err(BifrostError::validation("model identifier is empty"));
                }
                Ok(Self {
                    provider: None,
                    model: s.to_string(),
                })
            }
        }
    }

    /// Reformat to the string this value was parsed from.
    pub fn format(&self) -> String {
        match &self.provider {
            Some(provider) => format!("{provider}/{}", self.model),
            None => self.model.clone(),
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
#[path = "model_id.test.rs"]
mod tests;
