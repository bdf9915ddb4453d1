//! The normalized response envelope.

use crate::audio::SpeechResponse;
use crate::audio::TranscriptionResponse;
use crate::completion::ChatResponse;
use crate::completion::CountTokensResponse;
use crate::completion::TextResponse;
use crate::embedding::EmbeddingResponse;
use crate::files::BatchInfo;
use crate::files::BatchListResponse;
use crate::files::ContainerInfo;
use crate::files::ContainerListResponse;
use crate::files::FileContentResponse;
use crate::files::FileInfo;
use crate::files::FileListResponse;
use crate::images::ImageResponse;
use crate::provider::ModelInfo;
use crate::provider::Provider;
use crate::request::RequestKind;
use crate::rerank::RerankResponse;
use crate::video::DeletionResponse;
use crate::video::VideoDownloadResponse;
use crate::video::VideoJob;
use crate::video::VideoListResponse;
use bifrost_error::BifrostError;
use serde::Deserialize;
use serde::Serialize;

/// Metadata attached to every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Provider that served the request.
    pub provider: Provider,
    /// Model the caller requested (before any upstream aliasing).
    pub model_requested: String,
    /// Kind of request served.
    pub request_kind: RequestKind,
    /// Upstream round-trip latency in milliseconds, measured monotonically
    /// at the HTTP boundary.
    pub latency_ms: u64,
    /// Serialized upstream request, when opted in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_request: Option<serde_json::Value>,
    /// Raw upstream response body, when opted in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
    /// Error of an earlier hop when a fallback served this response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hop_error: Option<BifrostError>,
}

impl ResponseMetadata {
    /// Create metadata for a served request.
    pub fn new(provider: Provider, model: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            provider,
            model_requested: model.into(),
            request_kind: kind,
            latency_ms: 0,
            raw_request: None,
            raw_response: None,
            hop_error: None,
        }
    }

    /// Set the measured latency.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

/// Typed payload of a response, mirroring [`RequestKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ResponsePayload {
    ChatCompletion(ChatResponse),
    TextCompletion(TextResponse),
    Embedding(EmbeddingResponse),
    Speech(SpeechResponse),
    Transcription(TranscriptionResponse),
    Image(ImageResponse),
    VideoJob(VideoJob),
    VideoList(VideoListResponse),
    VideoDownload(VideoDownloadResponse),
    Deletion(DeletionResponse),
    Responses(ChatResponse),
    Rerank(RerankResponse),
    ModelList(Vec<ModelInfo>),
    File(FileInfo),
    FileList(FileListResponse),
    FileContent(FileContentResponse),
    Batch(BatchInfo),
    BatchList(BatchListResponse),
    Container(ContainerInfo),
    ContainerList(ContainerListResponse),
    CountTokens(CountTokensResponse),
}

/// The normalized response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BifrostResponse {
    /// Typed payload.
    pub payload: ResponsePayload,
    /// Serving metadata.
    pub metadata: ResponseMetadata,
}

impl BifrostResponse {
    /// Create a response from a payload and its metadata.
    pub fn new(payload: ResponsePayload, metadata: ResponseMetadata) -> Self {
        Self { payload, metadata }
    }

    /// The chat payload, when this is a chat or responses response.
    pub fn as_chat(&self) -> Option<&ChatResponse> {
        match &self.payload {
            ResponsePayload::ChatCompletion(chat) | ResponsePayload::Responses(chat) => Some(chat),
            _ => None,
        }
    }

    /// The embedding payload, when present.
    pub fn as_embedding(&self) -> Option<&EmbeddingResponse> {
        match &self.payload {
            ResponsePayload::Embedding(embedding) => Some(embedding),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "response.test.rs"]
mod tests;
