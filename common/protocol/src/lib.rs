//! Data model shared across the gateway.
//!
//! Normalized request and response shapes, the streaming chunk union,
//! credentials and provider configuration, MCP client configuration, and
//! the per-request context that carries deadlines and cancellation.
//!
//! Everything here is provider-portable: adapters translate these types to
//! and from each upstream wire format.

pub mod audio;
pub mod completion;
pub mod context;
pub mod embedding;
pub mod files;
pub mod images;
pub mod key;
pub mod mcp_config;
pub mod messages;
pub mod model_id;
pub mod params;
pub mod provider;
pub mod redact;
pub mod request;
pub mod response;
pub mod rerank;
pub mod stream;
pub mod tools;
pub mod video;

pub use audio::SpeechInput;
pub use audio::SpeechResponse;
pub use audio::TranscriptionInput;
pub use audio::TranscriptionResponse;
pub use completion::ChatResponse;
pub use completion::CountTokensResponse;
pub use completion::FinishReason;
pub use completion::TextCompletionInput;
pub use completion::TextResponse;
pub use completion::TokenUsage;
pub use context::RequestContext;
pub use context::MCP_INCLUDE_TOOLS_KEY;
pub use embedding::Embedding;
pub use embedding::EmbeddingInput;
pub use embedding::EmbeddingResponse;
pub use images::ImageEditInput;
pub use images::ImageGenerationInput;
pub use images::ImageResponse;
pub use images::ImageVariationInput;
pub use key::BedrockKeyConfig;
pub use key::Key;
pub use mcp_config::McpAuth;
pub use mcp_config::McpClientConfig;
pub use mcp_config::McpClientState;
pub use mcp_config::McpConnectionType;
pub use messages::ContentBlock;
pub use messages::ImageSource;
pub use messages::Message;
pub use messages::Role;
pub use model_id::ModelId;
pub use params::ModelParameters;
pub use provider::ConcurrencyAndBufferSize;
pub use provider::CustomProviderConfig;
pub use provider::ModelInfo;
pub use provider::NetworkConfig;
pub use provider::Provider;
pub use provider::ProviderConfig;
pub use provider::ProxyConfig;
pub use request::BifrostRequest;
pub use request::Fallback;
pub use request::RequestInput;
pub use request::RequestKind;
pub use rerank::RerankInput;
pub use rerank::RerankResponse;
pub use rerank::RerankResult;
pub use response::BifrostResponse;
pub use response::ResponseMetadata;
pub use response::ResponsePayload;
pub use stream::StreamChunk;
pub use tools::ToolCall;
pub use tools::ToolChoice;
pub use tools::ToolDefinition;
pub use tools::ToolResultContent;
