//! The normalized request envelope.

use crate::audio::SpeechInput;
use crate::audio::TranscriptionInput;
use crate::completion::TextCompletionInput;
use crate::embedding::EmbeddingInput;
use crate::files::BatchCreateInput;
use crate::files::BatchIdInput;
use crate::files::BatchListInput;
use crate::files::ContainerCreateInput;
use crate::files::ContainerFileCreateInput;
use crate::files::ContainerFileIdInput;
use crate::files::ContainerIdInput;
use crate::files::FileIdInput;
use crate::files::FileListInput;
use crate::files::FileUploadInput;
use crate::images::ImageEditInput;
use crate::images::ImageGenerationInput;
use crate::images::ImageVariationInput;
use crate::messages::Message;
use crate::model_id::ModelId;
use crate::params::ModelParameters;
use crate::provider::Provider;
use crate::rerank::RerankInput;
use crate::video::VideoGenerationInput;
use crate::video::VideoIdInput;
use crate::video::VideoListInput;
use crate::video::VideoRemixInput;
use bifrost_error::BifrostError;
use serde::Deserialize;
use serde::Serialize;

/// One fallback target tried when a hop fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    /// Provider to fall back to.
    pub provider: Provider,
    /// Model to request from that provider.
    pub model: String,
}

impl Fallback {
    /// Create a fallback target.
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

/// Fieldless mirror of [`RequestInput`], used in metadata and logs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestKind {
    ChatCompletion,
    TextCompletion,
    Embedding,
    Speech,
    Transcription,
    ImageGeneration,
    ImageEdit,
    ImageVariation,
    VideoGeneration,
    VideoRetrieve,
    VideoDownload,
    VideoDelete,
    VideoList,
    VideoRemix,
    Responses,
    Rerank,
    ListModels,
    FileUpload,
    FileList,
    FileRetrieve,
    FileDelete,
    FileContent,
    BatchCreate,
    BatchList,
    BatchRetrieve,
    BatchCancel,
    BatchResults,
    ContainerCreate,
    ContainerList,
    ContainerRetrieve,
    ContainerDelete,
    ContainerFileCreate,
    ContainerFileList,
    ContainerFileRetrieve,
    ContainerFileContent,
    ContainerFileDelete,
    CountTokens,
}

/// Typed input of a request, one variant per request kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "input", rename_all = "snake_case")]
pub enum RequestInput {
    ChatCompletion(Vec<Message>),
    TextCompletion(TextCompletionInput),
    Embedding(EmbeddingInput),
    Speech(SpeechInput),
    Transcription(TranscriptionInput),
    ImageGeneration(ImageGenerationInput),
    ImageEdit(ImageEditInput),
    ImageVariation(ImageVariationInput),
    VideoGeneration(VideoGenerationInput),
    VideoRetrieve(VideoIdInput),
    VideoDownload(VideoIdInput),
    VideoDelete(VideoIdInput),
    VideoList(VideoListInput),
    VideoRemix(VideoRemixInput),
    Responses(Vec<Message>),
    Rerank(RerankInput),
    ListModels,
    FileUpload(FileUploadInput),
    FileList(FileListInput),
    FileRetrieve(FileIdInput),
    FileDelete(FileIdInput),
    FileContent(FileIdInput),
    BatchCreate(BatchCreateInput),
    BatchList(BatchListInput),
    BatchRetrieve(BatchIdInput),
    BatchCancel(BatchIdInput),
    BatchResults(BatchIdInput),
    ContainerCreate(ContainerCreateInput),
    ContainerList,
    ContainerRetrieve(ContainerIdInput),
    ContainerDelete(ContainerIdInput),
    ContainerFileCreate(ContainerFileCreateInput),
    ContainerFileList(ContainerIdInput),
    ContainerFileRetrieve(ContainerFileIdInput),
    ContainerFileContent(ContainerFileIdInput),
    ContainerFileDelete(ContainerFileIdInput),
    CountTokens(Vec<Message>),
}

impl RequestInput {
    /// The request kind of this input.
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestInput::ChatCompletion(_) => RequestKind::ChatCompletion,
            RequestInput::TextCompletion(_) => RequestKind::TextCompletion,
            RequestInput::Embedding(_) => RequestKind::Embedding,
            RequestInput::Speech(_) => RequestKind::Speech,
            RequestInput::Transcription(_) => RequestKind::Transcription,
            RequestInput::ImageGeneration(_) => RequestKind::ImageGeneration,
            RequestInput::ImageEdit(_) => RequestKind::ImageEdit,
            RequestInput::ImageVariation(_) => RequestKind::ImageVariation,
            RequestInput::VideoGeneration(_) => RequestKind::VideoGeneration,
            RequestInput::VideoRetrieve(_) => RequestKind::VideoRetrieve,
            RequestInput::VideoDownload(_) => RequestKind::VideoDownload,
            RequestInput::VideoDelete(_) => RequestKind::VideoDelete,
            RequestInput::VideoList(_) => RequestKind::VideoList,
            RequestInput::VideoRemix(_) => RequestKind::VideoRemix,
            RequestInput::Responses(_) => RequestKind::Responses,
            RequestInput::Rerank(_) => RequestKind::Rerank,
            RequestInput::ListModels => RequestKind::ListModels,
            RequestInput::FileUpload(_) => RequestKind::FileUpload,
            RequestInput::FileList(_) => RequestKind::FileList,
            RequestInput::FileRetrieve(_) => RequestKind::FileRetrieve,
            RequestInput::FileDelete(_) => RequestKind::FileDelete,
            RequestInput::FileContent(_) => RequestKind::FileContent,
            RequestInput::BatchCreate(_) => RequestKind::BatchCreate,
            RequestInput::BatchList(_) => RequestKind::BatchList,
            RequestInput::BatchRetrieve(_) => RequestKind::BatchRetrieve,
            RequestInput::BatchCancel(_) => RequestKind::BatchCancel,
            RequestInput::BatchResults(_) => RequestKind::BatchResults,
            RequestInput::ContainerCreate(_) => RequestKind::ContainerCreate,
            RequestInput::ContainerList => RequestKind::ContainerList,
            RequestInput::ContainerRetrieve(_) => RequestKind::ContainerRetrieve,
            RequestInput::ContainerDelete(_) => RequestKind::ContainerDelete,
            RequestInput::ContainerFileCreate(_) => RequestKind::ContainerFileCreate,
            RequestInput::ContainerFileList(_) => RequestKind::ContainerFileList,
            RequestInput::ContainerFileRetrieve(_) => RequestKind::ContainerFileRetrieve,
            RequestInput::ContainerFileContent(_) => RequestKind::ContainerFileContent,
            RequestInput::ContainerFileDelete(_) => RequestKind::ContainerFileDelete,
            RequestInput::CountTokens(_) => RequestKind::CountTokens,
        }
    }
}

/// The normalized request envelope.
///
/// Immutable from enqueue on; the dispatcher hands each plugin its own
/// clone with the hop's provider and model bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BifrostRequest {
    /// Provider serving the primary hop.
    pub provider: Provider,
    /// Model to request, opaque to the gateway.
    pub model: String,
    /// Fallback targets tried in order when a hop fails.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<Fallback>,
    /// Provider-portable parameters.
    #[serde(default)]
    pub params: ModelParameters,
    /// Typed input.
    pub input: RequestInput,
}

impl BifrostRequest {
    /// Create a request for the given provider and model.
    pub fn new(provider: Provider, model: impl Into<String>, input: RequestInput) -> Self {
        Self {
            provider,
            model: model.into(),
            fallbacks: Vec::new(),
            params: ModelParameters::default(),
            input,
        }
    }

    /// Create a request from a combined `provider/model` identifier.
    ///
    /// A bare model string keeps the given default provider.
    pub fn from_model_id(
        default_provider: Provider,
        model_id: &str,
        input: RequestInput,
    ) -> Result<Self, BifrostError> {
        let parsed = ModelId::parse(model_id)?;
        Ok(Self::new(
            parsed.provider.unwrap_or(default_provider),
            parsed.model,
            input,
        ))
    }

    /// Append a fallback target.
    pub fn with_fallback(mut self, provider: Provider, model: impl Into<String>) -> Self {
        self.fallbacks.push(Fallback::new(provider, model));
        self
    }

    /// Set the portable parameters.
    pub fn with_params(mut self, params: ModelParameters) -> Self {
        self.params = params;
        self
    }

    /// The request kind of this request.
    pub fn kind(&self) -> RequestKind {
        self.input.kind()
    }

    /// Validate the envelope before dispatch.
    pub fn validate(&self) -> Result<(), BifrostError> {
        if self.provider.as_str().is_empty() {
            return Err(BifrostError::validation("provider must not be empty"));
        }
        if self.model.is_empty() {
            return Err(BifrostError::validation("model must not be empty"));
        }
        for fallback in &self.fallbacks {
            if fallback.provider.as_str().is_empty() || fallback.model.is_empty() {
                return Err(BifrostError::validation(
                    "fallback entries must carry a provider and a model",
                ));
            }
        }
        Ok(())
    }

    /// The hop sequence for this request: the primary target followed by
    /// each fallback in order.
    pub fn hops(&self) -> Vec<Fallback> {
        let mut hops = Vec::with_capacity(1 + self.fallbacks.len());
        hops.push(Fallback::new(self.provider.clone(), self.model.clone()));
        hops.extend(self.fallbacks.iter().cloned());
        hops
    }
}

#[cfg(test)]
#[path = "request.test.rs"]
mod tests;
