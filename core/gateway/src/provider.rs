//! The provider adapter capability set.
//!
//! An adapter translates normalized requests to one upstream wire format.
//! Every operation has a default body failing with a distinct
//! `UnsupportedOperation` error, so adapters implement exactly what their
//! upstream supports and the dispatcher can skip a fallback hop without
//! retrying.

use async_trait::async_trait;
use bifrost_error::BifrostError;
use bifrost_protocol::EmbeddingInput;
use bifrost_protocol::ImageEditInput;
use bifrost_protocol::ImageGenerationInput;
use bifrost_protocol::Key;
use bifrost_protocol::Message;
use bifrost_protocol::ModelParameters;
use bifrost_protocol::Provider;
use bifrost_protocol::RequestContext;
use bifrost_protocol::RequestInput;
use bifrost_protocol::ResponsePayload;
use bifrost_protocol::RerankInput;
use bifrost_protocol::SpeechInput;
use bifrost_protocol::StreamChunk;
use bifrost_protocol::TextCompletionInput;
use bifrost_protocol::TranscriptionInput;
use bifrost_protocol::files::BatchCreateInput;
use bifrost_protocol::files::BatchIdInput;
use bifrost_protocol::files::BatchListInput;
use bifrost_protocol::files::ContainerCreateInput;
use bifrost_protocol::files::ContainerFileCreateInput;
use bifrost_protocol::files::ContainerFileIdInput;
use bifrost_protocol::files::ContainerIdInput;
use bifrost_protocol::files::FileIdInput;
use bifrost_protocol::files::FileListInput;
use bifrost_protocol::files::FileUploadInput;
use bifrost_protocol::images::ImageVariationInput;
use bifrost_protocol::video::VideoGenerationInput;
use bifrost_protocol::video::VideoIdInput;
use bifrost_protocol::video::VideoListInput;
use bifrost_protocol::video::VideoRemixInput;
use serde_json::Value;
use tokio::sync::mpsc;

/// Result of one unary adapter call.
#[derive(Debug)]
pub struct UnaryOutcome {
    /// Normalized payload.
    pub payload: ResponsePayload,
    /// Round-trip latency measured at the HTTP boundary.
    pub latency_ms: u64,
    /// Serialized upstream request, when the call opted in.
    pub raw_request: Option<Value>,
    /// Raw upstream body, when the call opted in.
    pub raw_response: Option<Value>,
}

impl UnaryOutcome {
    /// Wrap a payload with its measured latency.
    pub fn new(payload: ResponsePayload, latency_ms: u64) -> Self {
        Self {
            payload,
            latency_ms,
            raw_request: None,
            raw_response: None,
        }
    }
}

/// Streaming channel an adapter produces.
pub type ChunkReceiver = mpsc::Receiver<StreamChunk>;

/// Per-call arguments shared by every adapter operation.
pub struct AdapterCall<'a> {
    /// Caller context with deadline and cancellation.
    pub ctx: &'a RequestContext,
    /// Credential snapshotted for this call.
    pub key: &'a Key,
    /// Model to request.
    pub model: &'a str,
    /// Portable parameters.
    pub params: &'a ModelParameters,
    /// Attach the serialized upstream request to the outcome.
    pub raw_request: bool,
    /// Attach the raw upstream body to the outcome.
    pub raw_response: bool,
}

macro_rules! unsupported {
    ($self:expr, $name:literal) => {
        Err(BifrostError::unsupported($self.provider().as_str(), $name))
    };
}

/// The full adapter capability set.
///
/// Unary operations return a payload plus latency; streaming operations
/// return a channel closed by the adapter after the terminal chunk.
/// Context cancellation aborts the in-flight HTTP read.
#[allow(unused_variables)]
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The provider this adapter serves.
    fn provider(&self) -> Provider;

    async fn list_models(&self, call: AdapterCall<'_>) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "list_models")
    }

    async fn chat_completion(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "chat_completion")
    }

    async fn chat_completion_stream(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<ChunkReceiver, BifrostError> {
        unsupported!(self, "chat_completion_stream")
    }

    async fn text_completion(
        &self,
        call: AdapterCall<'_>,
        input: &TextCompletionInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "text_completion")
    }

    async fn embedding(
        &self,
        call: AdapterCall<'_>,
        input: &EmbeddingInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "embedding")
    }

    async fn speech(
        &self,
        call: AdapterCall<'_>,
        input: &SpeechInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "speech")
    }

    async fn speech_stream(
        &self,
        call: AdapterCall<'_>,
        input: &SpeechInput,
    ) -> Result<ChunkReceiver, BifrostError> {
        unsupported!(self, "speech_stream")
    }

    async fn transcription(
        &self,
        call: AdapterCall<'_>,
        input: &TranscriptionInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "transcription")
    }

    async fn transcription_stream(
        &self,
        call: AdapterCall<'_>,
        input: &TranscriptionInput,
    ) -> Result<ChunkReceiver, BifrostError> {
        unsupported!(self, "transcription_stream")
    }

    async fn image_generation(
        &self,
        call: AdapterCall<'_>,
        input: &ImageGenerationInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "image_generation")
    }

    async fn image_generation_stream(
        &self,
        call: AdapterCall<'_>,
        input: &ImageGenerationInput,
    ) -> Result<ChunkReceiver, BifrostError> {
        unsupported!(self, "image_generation_stream")
    }

    async fn image_edit(
        &self,
        call: AdapterCall<'_>,
        input: &ImageEditInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "image_edit")
    }

    async fn image_variation(
        &self,
        call: AdapterCall<'_>,
        input: &ImageVariationInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "image_variation")
    }

    async fn video_generation(
        &self,
        call: AdapterCall<'_>,
        input: &VideoGenerationInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "video_generation")
    }

    async fn video_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &VideoIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "video_retrieve")
    }

    async fn video_download(
        &self,
        call: AdapterCall<'_>,
        input: &VideoIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "video_download")
    }

    async fn video_delete(
        &self,
        call: AdapterCall<'_>,
        input: &VideoIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "video_delete")
    }

    async fn video_list(
        &self,
        call: AdapterCall<'_>,
        input: &VideoListInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "video_list")
    }

    async fn video_remix(
        &self,
        call: AdapterCall<'_>,
        input: &VideoRemixInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "video_remix")
    }

    async fn responses(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "responses")
    }

    async fn responses_stream(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<ChunkReceiver, BifrostError> {
        unsupported!(self, "responses_stream")
    }

    async fn rerank(
        &self,
        call: AdapterCall<'_>,
        input: &RerankInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "rerank")
    }

    async fn file_upload(
        &self,
        call: AdapterCall<'_>,
        input: &FileUploadInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "file_upload")
    }

    async fn file_list(
        &self,
        call: AdapterCall<'_>,
        input: &FileListInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "file_list")
    }

    async fn file_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &FileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "file_retrieve")
    }

    async fn file_delete(
        &self,
        call: AdapterCall<'_>,
        input: &FileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "file_delete")
    }

    async fn file_content(
        &self,
        call: AdapterCall<'_>,
        input: &FileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "file_content")
    }

    async fn batch_create(
        &self,
        call: AdapterCall<'_>,
        input: &BatchCreateInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "batch_create")
    }

    async fn batch_list(
        &self,
        call: AdapterCall<'_>,
        input: &BatchListInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "batch_list")
    }

    async fn batch_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &BatchIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "batch_retrieve")
    }

    async fn batch_cancel(
        &self,
        call: AdapterCall<'_>,
        input: &BatchIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "batch_cancel")
    }

    async fn batch_results(
        &self,
        call: AdapterCall<'_>,
        input: &BatchIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "batch_results")
    }

    async fn container_create(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerCreateInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_create")
    }

    async fn container_list(&self, call: AdapterCall<'_>) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_list")
    }

    async fn container_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_retrieve")
    }

    async fn container_delete(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_delete")
    }

    async fn container_file_create(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerFileCreateInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_file_create")
    }

    async fn container_file_list(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_file_list")
    }

    async fn container_file_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerFileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_file_retrieve")
    }

    async fn container_file_content(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerFileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_file_content")
    }

    async fn container_file_delete(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerFileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "container_file_delete")
    }

    async fn count_tokens(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        unsupported!(self, "count_tokens")
    }
}

/// Route a unary request input to the matching adapter capability.
pub async fn execute_unary(
    adapter: &dyn ProviderAdapter,
    call: AdapterCall<'_>,
    input: &RequestInput,
) -> Result<UnaryOutcome, BifrostError> {
    match input {
        RequestInput::ChatCompletion(messages) => adapter.chat_completion(call, messages).await,
        RequestInput::TextCompletion(input) => adapter.text_completion(call, input).await,
        RequestInput::Embedding(input) => adapter.embedding(call, input).await,
        RequestInput::Speech(input) => adapter.speech(call, input).await,
        RequestInput::Transcription(input) => adapter.transcription(call, input).await,
        RequestInput::ImageGeneration(input) => adapter.image_generation(call, input).await,
        RequestInput::ImageEdit(input) => adapter.image_edit(call, input).await,
        RequestInput::ImageVariation(input) => adapter.image_variation(call, input).await,
        RequestInput::VideoGeneration(input) => adapter.video_generation(call, input).await,
        RequestInput::VideoRetrieve(input) => adapter.video_retrieve(call, input).await,
        RequestInput::VideoDownload(input) => adapter.video_download(call, input).await,
        RequestInput::VideoDelete(input) => adapter.video_delete(call, input).await,
        RequestInput::VideoList(input) => adapter.video_list(call, input).await,
        RequestInput::VideoRemix(input) => adapter.video_remix(call, input).await,
        RequestInput::Responses(messages) => adapter.responses(call, messages).await,
        RequestInput::Rerank(input) => adapter.rerank(call, input).await,
        RequestInput::ListModels => adapter.list_models(call).await,
        RequestInput::FileUpload(input) => adapter.file_upload(call, input).await,
        RequestInput::FileList(input) => adapter.file_list(call, input).await,
        RequestInput::FileRetrieve(input) => adapter.file_retrieve(call, input).await,
        RequestInput::FileDelete(input) => adapter.file_delete(call, input).await,
        RequestInput::FileContent(input) => adapter.file_content(call, input).await,
        RequestInput::BatchCreate(input) => adapter.batch_create(call, input).await,
        RequestInput::BatchList(input) => adapter.batch_list(call, input).await,
        RequestInput::BatchRetrieve(input) => adapter.batch_retrieve(call, input).await,
        RequestInput::BatchCancel(input) => adapter.batch_cancel(call, input).await,
        RequestInput::BatchResults(input) => adapter.batch_results(call, input).await,
        RequestInput::ContainerCreate(input) => adapter.container_create(call, input).await,
        RequestInput::ContainerList => adapter.container_list(call).await,
        RequestInput::ContainerRetrieve(input) => adapter.container_retrieve(call, input).await,
        RequestInput::ContainerDelete(input) => adapter.container_delete(call, input).await,
        RequestInput::ContainerFileCreate(input) => {
            adapter.container_file_create(call, input).await
        }
        RequestInput::ContainerFileList(input) => adapter.container_file_list(call, input).await,
        RequestInput::ContainerFileRetrieve(input) => {
            adapter.container_file_retrieve(call, input).await
        }
        RequestInput::ContainerFileContent(input) => {
            adapter.container_file_content(call, input).await
        }
        RequestInput::ContainerFileDelete(input) => {
            adapter.container_file_delete(call, input).await
        }
        RequestInput::CountTokens(messages) => adapter.count_tokens(call, messages).await,
    }
}

/// Route a streaming request input to the matching adapter capability.
///
/// Kinds with no streaming variant fail with `UnsupportedOperation`.
pub async fn execute_stream(
    adapter: &dyn ProviderAdapter,
    call: AdapterCall<'_>,
    input: &RequestInput,
) -> Result<ChunkReceiver, BifrostError> {
    match input {
        RequestInput::ChatCompletion(messages) => {
            adapter.chat_completion_stream(call, messages).await
        }
        RequestInput::Speech(input) => adapter.speech_stream(call, input).await,
        RequestInput::Transcription(input) => adapter.transcription_stream(call, input).await,
        RequestInput::ImageGeneration(input) => {
            adapter.image_generation_stream(call, input).await
        }
        RequestInput::Responses(messages) => adapter.responses_stream(call, messages).await,
        other => Err(BifrostError::unsupported(
            adapter.provider().as_str(),
            &format!("{}_stream", other.kind()),
        )),
    }
}

#[cfg(test)]
#[path = "provider.test.rs"]
mod tests;
