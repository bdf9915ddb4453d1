//! Embedding types for vector generation.

use crate::completion::TokenUsage;
use serde::Deserialize;
use serde::Serialize;

/// Input for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingInput {
    /// Input texts to embed.
    pub texts: Vec<String>,
    /// Optional dimensions for the embedding (if the model supports it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<i32>,
    /// Encoding format (default is float).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<EncodingFormat>,
}

/// Encoding format for embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    /// Float32 values.
    #[default]
    Float,
    /// Base64-encoded bytes.
    Base64,
}

impl EmbeddingInput {
    /// Create an input for a single text.
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            texts: vec![text.into()],
            dimensions: None,
            encoding_format: None,
        }
    }

    /// Create an input for multiple texts.
    pub fn batch(texts: Vec<String>) -> Self {
        Self {
            texts,
            dimensions: None,
            encoding_format: None,
        }
    }
}

/// A single embedding result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// Index of this embedding in the batch.
    pub index: i64,
    /// The embedding vector.
    pub embedding: Vec<f32>,
}

/// Normalized embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embeddings, in input order.
    pub embeddings: Vec<Embedding>,
    /// Model used for embedding.
    pub model: String,
    /// Token usage statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

#[cfg(test)]
#[path = "embedding.test.rs"]
mod tests;
