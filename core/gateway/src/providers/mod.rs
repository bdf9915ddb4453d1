//! Provider adapters.
//!
//! One implementation per upstream wire format. Custom providers reuse a
//! base adapter's format against their own base URL.

pub mod anthropic;
pub mod bedrock;
pub mod openai;
pub mod openai_common;
pub mod runway;
pub mod sigv4;

use crate::provider::ProviderAdapter;
use bifrost_error::BifrostError;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use std::sync::Arc;

/// Construct the adapter for a provider.
///
/// Custom providers must name a base provider whose wire format they
/// speak; the base adapter is built against the custom base URL.
pub fn build_adapter(
    provider: &Provider,
    config: &ProviderConfig,
) -> Result<Arc<dyn ProviderAdapter>, BifrostError> {
    match provider {
        Provider::Openai => Ok(Arc::new(openai::OpenAiAdapter::new(config)?)),
        Provider::Anthropic => Ok(Arc::new(anthropic::AnthropicAdapter::new(config)?)),
        Provider::Bedrock => Ok(Arc::new(bedrock::BedrockAdapter::new(config)?)),
        Provider::Runway => Ok(Arc::new(runway::RunwayAdapter::new(config)?)),
        Provider::Custom(name) => {
            let custom = config.custom_provider_config.as_ref().ok_or_else(|| {
                BifrostError::validation(format!(
                    "custom provider {name:?} needs a custom_provider_config"
                ))
            })?;
            match &custom.base_provider {
                Provider::Openai => Ok(Arc::new(openai::OpenAiAdapter::for_provider(
                    provider.clone(),
                    config,
                )?)),
                other => Err(BifrostError::validation(format!(
                    "custom providers can only reuse the openai wire format, not {other}"
                ))),
            }
        }
    }
}
