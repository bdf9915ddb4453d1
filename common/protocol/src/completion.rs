//! Chat and text completion response shapes.

use crate::messages::ContentBlock;
use crate::tools::ToolCall;
use serde::Deserialize;
use serde::Serialize;

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation.
    #[default]
    Stop,
    /// Hit max tokens limit.
    MaxTokens,
    /// Model wants to use a tool.
    ToolCalls,
    /// Content was filtered.
    ContentFilter,
    /// Unknown or other reason.
    Other,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: i64,
    /// Number of tokens in the completion.
    #[serde(default)]
    pub completion_tokens: i64,
    /// Total tokens used.
    #[serde(default)]
    pub total_tokens: i64,
    /// Tokens read from cache (if applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<i64>,
    /// Tokens used for reasoning (if applicable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<i64>,
}

impl TokenUsage {
    /// Create usage from prompt and completion token counts.
    pub fn new(prompt_tokens: i64, completion_tokens: i64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            cache_read_tokens: None,
            reasoning_tokens: None,
        }
    }
}

/// Input for a text (non-chat) completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextCompletionInput {
    /// The prompt to complete.
    pub prompt: String,
}

/// Normalized chat completion response.
///
/// Also used for the Responses request kind, whose portable shape is the
/// same conversation model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Upstream response id.
    pub id: String,
    /// Content blocks in the response.
    pub content: Vec<ContentBlock>,
    /// Reason generation stopped.
    pub finish_reason: FinishReason,
    /// Token usage statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Model that generated the response, as the upstream reported it.
    pub model: String,
}

impl ChatResponse {
    /// Create a response with the given id and model.
    pub fn new(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: None,
            model: model.into(),
        }
    }

    /// Add content to the response.
    pub fn with_content(mut self, content: Vec<ContentBlock>) -> Self {
        self.content = content;
        self
    }

    /// Set the finish reason.
    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = reason;
        self
    }

    /// Set token usage.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// All text content concatenated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// All tool calls in the response.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some(ToolCall::new(id.clone(), name.clone(), input.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Whether the response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.content.iter().any(ContentBlock::is_tool_use)
    }
}

/// Normalized text completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextResponse {
    /// Upstream response id.
    pub id: String,
    /// Completed text.
    pub text: String,
    /// Reason generation stopped.
    pub finish_reason: FinishReason,
    /// Token usage statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Model that generated the response.
    pub model: String,
}

/// Normalized token-count response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountTokensResponse {
    /// Tokens the input would consume.
    pub input_tokens: i64,
}

#[cfg(test)]
#[path = "completion.test.rs"]
mod tests;
