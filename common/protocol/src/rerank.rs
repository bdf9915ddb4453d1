//! Rerank types.

use serde::Deserialize;
use serde::Serialize;

/// Input scoring documents against a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankInput {
    /// The search query.
    pub query: String,
    /// Candidate documents.
    pub documents: Vec<String>,
    /// Return only the highest-scoring N documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,
}

impl RerankInput {
    /// Create an input with the given query and documents.
    pub fn new(query: impl Into<String>, documents: Vec<String>) -> Self {
        Self {
            query: query.into(),
            documents,
            top_n: None,
        }
    }
}

/// One scored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankResult {
    /// Index into the input documents.
    pub index: usize,
    /// Relevance score, higher is more relevant.
    pub relevance_score: f64,
}

/// Normalized rerank response, sorted by descending relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankResponse {
    /// Scored documents.
    pub results: Vec<RerankResult>,
}

#[cfg(test)]
#[path = "rerank.test.rs"]
mod tests;
