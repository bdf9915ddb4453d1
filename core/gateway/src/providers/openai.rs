//! OpenAI adapter.
//!
//! Serves the widest capability slice of any adapter: chat and text
//! completions, embeddings, audio, images, the Responses API, model
//! listing, and the file / batch / container object stores. Custom
//! providers that speak this wire format reuse the adapter with an
//! overridden base URL.

use crate::http::apply_extra_headers;
use crate::http::build_http_client;
use crate::provider::AdapterCall;
use crate::provider::ChunkReceiver;
use crate::provider::ProviderAdapter;
use crate::provider::UnaryOutcome;
use crate::providers::openai_common::apply_params;
use crate::providers::openai_common::messages_to_wire;
use crate::providers::openai_common::parse_chat_response;
use crate::providers::openai_common::parse_chat_stream_event;
use crate::providers::openai_common::parse_error;
use crate::providers::openai_common::parse_usage;
use crate::sse::ParsedEvent;
use crate::sse::spawn_sse_stream;
use async_trait::async_trait;
use bifrost_error::BifrostError;
use bifrost_protocol::ChatResponse;
use bifrost_protocol::ContentBlock;
use bifrost_protocol::EmbeddingInput;
use bifrost_protocol::FinishReason;
use bifrost_protocol::ImageEditInput;
use bifrost_protocol::ImageGenerationInput;
use bifrost_protocol::ImageResponse;
use bifrost_protocol::ImageVariationInput;
use bifrost_protocol::Key;
use bifrost_protocol::Message;
use bifrost_protocol::ModelInfo;
use bifrost_protocol::NetworkConfig;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use bifrost_protocol::RequestContext;
use bifrost_protocol::RequestKind;
use bifrost_protocol::ResponseMetadata;
use bifrost_protocol::ResponsePayload;
use bifrost_protocol::Role;
use bifrost_protocol::SpeechInput;
use bifrost_protocol::TextCompletionInput;
use bifrost_protocol::TokenUsage;
use bifrost_protocol::TranscriptionInput;
use bifrost_protocol::audio::SpeechResponse;
use bifrost_protocol::audio::TranscriptionResponse;
use bifrost_protocol::completion::TextResponse;
use bifrost_protocol::embedding::Embedding;
use bifrost_protocol::embedding::EmbeddingResponse;
use bifrost_protocol::files::BatchCreateInput;
use bifrost_protocol::files::BatchIdInput;
use bifrost_protocol::files::BatchInfo;
use bifrost_protocol::files::BatchListInput;
use bifrost_protocol::files::BatchListResponse;
use bifrost_protocol::files::ContainerCreateInput;
use bifrost_protocol::files::ContainerFileCreateInput;
use bifrost_protocol::files::ContainerFileIdInput;
use bifrost_protocol::files::ContainerIdInput;
use bifrost_protocol::files::ContainerInfo;
use bifrost_protocol::files::ContainerListResponse;
use bifrost_protocol::files::FileContentResponse;
use bifrost_protocol::files::FileIdInput;
use bifrost_protocol::files::FileInfo;
use bifrost_protocol::files::FileListInput;
use bifrost_protocol::files::FileListResponse;
use bifrost_protocol::files::FileUploadInput;
use bifrost_protocol::images::ImageData;
use bifrost_protocol::video::DeletionResponse;
use bytes::Bytes;
use serde_json::Value;
use serde_json::json;
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Adapter for the OpenAI API and OpenAI-compatible custom providers.
pub struct OpenAiAdapter {
    provider: Provider,
    client: reqwest::Client,
    network: NetworkConfig,
    base_url: String,
}

impl OpenAiAdapter {
    /// Build the adapter for the OpenAI provider itself.
    pub fn new(config: &ProviderConfig) -> Result<Self, BifrostError> {
        Self::for_provider(Provider::Openai, config)
    }

    /// Build the adapter for any provider speaking this wire format.
    pub fn for_provider(
        provider: Provider,
        config: &ProviderConfig,
    ) -> Result<Self, BifrostError> {
        let client = build_http_client(&config.network, config.proxy.as_ref())?;
        let base_url = config
            .network
            .trimmed_base_url()
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();
        Ok(Self {
            provider,
            client,
            network: config.network.clone(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authed(
        &self,
        ctx: &RequestContext,
        key: &Key,
        builder: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        let mut builder = apply_extra_headers(builder.bearer_auth(&key.value), &self.network);
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }
        builder
    }

    /// Send a request and return the raw successful response.
    async fn send(
        &self,
        ctx: &RequestContext,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BifrostError> {
        let response = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(BifrostError::canceled()),
            response = builder.send() => response?,
        };
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &body));
        }
        Ok(response)
    }

    /// Unary JSON round-trip with latency measured at the HTTP boundary.
    async fn send_for_json(
        &self,
        call: &AdapterCall<'_>,
        builder: reqwest::RequestBuilder,
        request_body: Option<&Value>,
    ) -> Result<(Value, u64, Option<Value>, Option<Value>), BifrostError> {
        let started = Instant::now();
        let response = self.send(call.ctx, builder).await?;
        let body = response.bytes().await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let value: Value = serde_json::from_slice(&body)?;
        let raw_request = call
            .raw_request
            .then(|| request_body.cloned())
            .flatten();
        let raw_response = call.raw_response.then(|| value.clone());
        Ok((value, latency_ms, raw_request, raw_response))
    }

    /// Unary binary round-trip (audio, file content).
    async fn send_for_bytes(
        &self,
        call: &AdapterCall<'_>,
        builder: reqwest::RequestBuilder,
    ) -> Result<(Bytes, Option<String>, u64), BifrostError> {
        let started = Instant::now();
        let response = self.send(call.ctx, builder).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok((body, content_type, started.elapsed().as_millis() as u64))
    }

    fn outcome(
        payload: ResponsePayload,
        latency_ms: u64,
        raw_request: Option<Value>,
        raw_response: Option<Value>,
    ) -> UnaryOutcome {
        let mut outcome = UnaryOutcome::new(payload, latency_ms);
        outcome.raw_request = raw_request;
        outcome.raw_response = raw_response;
        outcome
    }

    fn chat_body(&self, call: &AdapterCall<'_>, messages: &[Message], stream: bool) -> Value {
        let mut body = json!({
            "model": call.model,
            "messages": messages_to_wire(messages),
        });
        if stream {
            body["stream"] = json!(true);
            body["stream_options"] = json!({"include_usage": true});
        }
        apply_params(&mut body, call.params);
        body
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        self.provider.clone()
    }

    async fn list_models(&self, call: AdapterCall<'_>) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(call.ctx, call.key, self.client.get(self.url("/v1/models")));
        let (body, latency_ms, raw_request, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        let models = body
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        entry.get("id").and_then(Value::as_str).map(|id| ModelInfo {
                            id: id.to_string(),
                            owned_by: entry
                                .get("owned_by")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self::outcome(
            ResponsePayload::ModelList(models),
            latency_ms,
            raw_request,
            raw_response,
        ))
    }

    async fn chat_completion(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        let body = self.chat_body(&call, messages, false);
        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/chat/completions")),
            )
            .json(&body);
        let (response, latency_ms, raw_request, raw_response) =
            self.send_for_json(&call, builder, Some(&body)).await?;

        Ok(Self::outcome(
            ResponsePayload::ChatCompletion(parse_chat_response(&response)?),
            latency_ms,
            raw_request,
            raw_response,
        ))
    }

    async fn chat_completion_stream(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<ChunkReceiver, BifrostError> {
        let body = self.chat_body(&call, messages, true);
        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/chat/completions")),
            )
            .json(&body);

        let started = Instant::now();
        let response = self.send(call.ctx, builder).await?;
        let metadata = ResponseMetadata::new(
            self.provider.clone(),
            call.model,
            RequestKind::ChatCompletion,
        );
        Ok(spawn_sse_stream(
            response,
            call.ctx.clone(),
            metadata,
            started,
            parse_chat_stream_event,
        ))
    }

    async fn text_completion(
        &self,
        call: AdapterCall<'_>,
        input: &TextCompletionInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut body = json!({"model": call.model, "prompt": input.prompt});
        apply_params(&mut body, call.params);
        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/completions")),
            )
            .json(&body);
        let (response, latency_ms, raw_request, raw_response) =
            self.send_for_json(&call, builder, Some(&body)).await?;

        let text = response
            .pointer("/choices/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let finish_reason = response
            .pointer("/choices/0/finish_reason")
            .and_then(Value::as_str)
            .map(crate::providers::openai_common::map_finish_reason)
            .unwrap_or_default();

        Ok(Self::outcome(
            ResponsePayload::TextCompletion(TextResponse {
                id: response
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                text,
                finish_reason,
                usage: response.get("usage").and_then(parse_usage),
                model: response
                    .get("model")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            latency_ms,
            raw_request,
            raw_response,
        ))
    }

    async fn embedding(
        &self,
        call: AdapterCall<'_>,
        input: &EmbeddingInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut body = json!({"model": call.model, "input": input.texts});
        if let Some(dimensions) = input.dimensions {
            body["dimensions"] = json!(dimensions);
        }
        if let Some(format) = input.encoding_format {
            body["encoding_format"] = serde_json::to_value(format)?;
        }
        for (key, value) in &call.params.extra {
            body[key.as_str()] = value.clone();
        }

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/embeddings")),
            )
            .json(&body);
        let (response, latency_ms, raw_request, raw_response) =
            self.send_for_json(&call, builder, Some(&body)).await?;

        let mut embeddings = Vec::new();
        if let Some(data) = response.get("data").and_then(Value::as_array) {
            for entry in data {
                let index = entry.get("index").and_then(Value::as_i64).unwrap_or(0);
                let vector = parse_embedding_vector(entry.get("embedding"))?;
                embeddings.push(Embedding {
                    index,
                    embedding: vector,
                });
            }
        }

        Ok(Self::outcome(
            ResponsePayload::Embedding(EmbeddingResponse {
                embeddings,
                model: response
                    .get("model")
                    .and_then(Value::as_str)
                    .unwrap_or(call.model)
                    .to_string(),
                usage: response.get("usage").and_then(parse_usage),
            }),
            latency_ms,
            raw_request,
            raw_response,
        ))
    }

    async fn speech(
        &self,
        call: AdapterCall<'_>,
        input: &SpeechInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut body = json!({
            "model": call.model,
            "input": input.input,
            "voice": input.voice,
        });
        if let Some(format) = &input.response_format {
            body["response_format"] = json!(format);
        }
        if let Some(speed) = input.speed {
            body["speed"] = json!(speed);
        }

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/audio/speech")),
            )
            .json(&body);
        let (audio, content_type, latency_ms) = self.send_for_bytes(&call, builder).await?;

        Ok(UnaryOutcome::new(
            ResponsePayload::Speech(SpeechResponse {
                audio,
                content_type,
            }),
            latency_ms,
        ))
    }

    async fn transcription(
        &self,
        call: AdapterCall<'_>,
        input: &TranscriptionInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut form = reqwest::multipart::Form::new()
            .text("model", call.model.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(input.file.to_vec())
                    .file_name(input.filename.clone()),
            );
        if let Some(language) = &input.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = &input.prompt {
            form = form.text("prompt", prompt.clone());
        }
        form = form.text(
            "response_format",
            input
                .response_format
                .clone()
                .unwrap_or_else(|| "json".to_string()),
        );

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/audio/transcriptions")),
            )
            .multipart(form);
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        Ok(Self::outcome(
            ResponsePayload::Transcription(TranscriptionResponse {
                text: response
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                language: response
                    .get("language")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                duration: response.get("duration").and_then(Value::as_f64),
            }),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn image_generation(
        &self,
        call: AdapterCall<'_>,
        input: &ImageGenerationInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut body = json!({"model": call.model, "prompt": input.prompt});
        if let Some(n) = input.n {
            body["n"] = json!(n);
        }
        if let Some(size) = &input.size {
            body["size"] = json!(size);
        }
        if let Some(quality) = &input.quality {
            body["quality"] = json!(quality);
        }
        if let Some(format) = &input.response_format {
            body["response_format"] = json!(format);
        }

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/images/generations")),
            )
            .json(&body);
        let (response, latency_ms, raw_request, raw_response) =
            self.send_for_json(&call, builder, Some(&body)).await?;

        Ok(Self::outcome(
            ResponsePayload::Image(parse_image_response(&response)),
            latency_ms,
            raw_request,
            raw_response,
        ))
    }

    async fn image_edit(
        &self,
        call: AdapterCall<'_>,
        input: &ImageEditInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut form = reqwest::multipart::Form::new()
            .text("model", call.model.to_string())
            .text("prompt", input.prompt.clone())
            .part(
                "image",
                reqwest::multipart::Part::bytes(input.image.to_vec())
                    .file_name(input.filename.clone()),
            );
        if let Some(mask) = &input.mask {
            form = form.part(
                "mask",
                reqwest::multipart::Part::bytes(mask.clone()).file_name("mask.png"),
            );
        }
        if let Some(n) = input.n {
            form = form.text("n", n.to_string());
        }
        if let Some(size) = &input.size {
            form = form.text("size", size.clone());
        }

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/images/edits")),
            )
            .multipart(form);
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        Ok(Self::outcome(
            ResponsePayload::Image(parse_image_response(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn image_variation(
        &self,
        call: AdapterCall<'_>,
        input: &ImageVariationInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut form = reqwest::multipart::Form::new()
            .text("model", call.model.to_string())
            .part(
                "image",
                reqwest::multipart::Part::bytes(input.image.to_vec())
                    .file_name(input.filename.clone()),
            );
        if let Some(n) = input.n {
            form = form.text("n", n.to_string());
        }
        if let Some(size) = &input.size {
            form = form.text("size", size.clone());
        }

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/images/variations")),
            )
            .multipart(form);
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        Ok(Self::outcome(
            ResponsePayload::Image(parse_image_response(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn responses(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut body = json!({
            "model": call.model,
            "input": messages_to_responses_wire(messages),
        });
        apply_responses_params(&mut body, &call);

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/responses")),
            )
            .json(&body);
        let (response, latency_ms, raw_request, raw_response) =
            self.send_for_json(&call, builder, Some(&body)).await?;

        Ok(Self::outcome(
            ResponsePayload::Responses(parse_responses_response(&response)),
            latency_ms,
            raw_request,
            raw_response,
        ))
    }

    async fn responses_stream(
        &self,
        call: AdapterCall<'_>,
        messages: &[Message],
    ) -> Result<ChunkReceiver, BifrostError> {
        let mut body = json!({
            "model": call.model,
            "input": messages_to_responses_wire(messages),
            "stream": true,
        });
        apply_responses_params(&mut body, &call);

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/responses")),
            )
            .json(&body);

        let started = Instant::now();
        let response = self.send(call.ctx, builder).await?;
        let metadata =
            ResponseMetadata::new(self.provider.clone(), call.model, RequestKind::Responses);
        Ok(spawn_sse_stream(
            response,
            call.ctx.clone(),
            metadata,
            started,
            parse_responses_stream_event,
        ))
    }

    async fn file_upload(
        &self,
        call: AdapterCall<'_>,
        input: &FileUploadInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let form = reqwest::multipart::Form::new()
            .text("purpose", input.purpose.clone())
            .part(
                "file",
                reqwest::multipart::Part::bytes(input.content.to_vec())
                    .file_name(input.filename.clone()),
            );

        let builder = self
            .authed(call.ctx, call.key, self.client.post(self.url("/v1/files")))
            .multipart(form);
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        Ok(Self::outcome(
            ResponsePayload::File(parse_file_info(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn file_list(
        &self,
        call: AdapterCall<'_>,
        input: &FileListInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut builder = self.client.get(self.url("/v1/files"));
        if let Some(purpose) = &input.purpose {
            builder = builder.query(&[("purpose", purpose)]);
        }
        if let Some(limit) = input.limit {
            builder = builder.query(&[("limit", limit.to_string())]);
        }
        let builder = self.authed(call.ctx, call.key, builder);
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        let files = response
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(parse_file_info).collect())
            .unwrap_or_default();
        Ok(Self::outcome(
            ResponsePayload::FileList(FileListResponse { files }),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn file_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &FileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(self.url(&format!("/v1/files/{}", input.file_id))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::File(parse_file_info(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn file_delete(
        &self,
        call: AdapterCall<'_>,
        input: &FileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .delete(self.url(&format!("/v1/files/{}", input.file_id))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::Deletion(parse_deletion(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn file_content(
        &self,
        call: AdapterCall<'_>,
        input: &FileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(self.url(&format!("/v1/files/{}/content", input.file_id))),
        );
        let (content, content_type, latency_ms) = self.send_for_bytes(&call, builder).await?;
        Ok(UnaryOutcome::new(
            ResponsePayload::FileContent(FileContentResponse {
                content,
                content_type,
            }),
            latency_ms,
        ))
    }

    async fn batch_create(
        &self,
        call: AdapterCall<'_>,
        input: &BatchCreateInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let body = json!({
            "input_file_id": input.input_file_id,
            "endpoint": input.endpoint,
            "completion_window": input.completion_window,
        });
        let builder = self
            .authed(call.ctx, call.key, self.client.post(self.url("/v1/batches")))
            .json(&body);
        let (response, latency_ms, raw_request, raw_response) =
            self.send_for_json(&call, builder, Some(&body)).await?;
        Ok(Self::outcome(
            ResponsePayload::Batch(parse_batch_info(&response)),
            latency_ms,
            raw_request,
            raw_response,
        ))
    }

    async fn batch_list(
        &self,
        call: AdapterCall<'_>,
        input: &BatchListInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut builder = self.client.get(self.url("/v1/batches"));
        if let Some(limit) = input.limit {
            builder = builder.query(&[("limit", limit.to_string())]);
        }
        if let Some(after) = &input.after {
            builder = builder.query(&[("after", after)]);
        }
        let builder = self.authed(call.ctx, call.key, builder);
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        let batches = response
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(parse_batch_info).collect())
            .unwrap_or_default();
        Ok(Self::outcome(
            ResponsePayload::BatchList(BatchListResponse { batches }),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn batch_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &BatchIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(self.url(&format!("/v1/batches/{}", input.batch_id))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::Batch(parse_batch_info(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn batch_cancel(
        &self,
        call: AdapterCall<'_>,
        input: &BatchIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .post(self.url(&format!("/v1/batches/{}/cancel", input.batch_id))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::Batch(parse_batch_info(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn batch_results(
        &self,
        call: AdapterCall<'_>,
        input: &BatchIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let started = Instant::now();
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(self.url(&format!("/v1/batches/{}", input.batch_id))),
        );
        let response = self.send(call.ctx, builder).await?;
        let batch: Value = serde_json::from_slice(&response.bytes().await?)?;

        let output_file_id = batch
            .get("output_file_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BifrostError::operation(format!(
                    "batch {} has no output file yet",
                    input.batch_id
                ))
            })?;

        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(self.url(&format!("/v1/files/{output_file_id}/content"))),
        );
        let content_response = self.send(call.ctx, builder).await?;
        let content_type = content_response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content = content_response.bytes().await?;

        Ok(UnaryOutcome::new(
            ResponsePayload::FileContent(FileContentResponse {
                content,
                content_type,
            }),
            started.elapsed().as_millis() as u64,
        ))
    }

    async fn container_create(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerCreateInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let body = json!({"name": input.name});
        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(self.url("/v1/containers")),
            )
            .json(&body);
        let (response, latency_ms, raw_request, raw_response) =
            self.send_for_json(&call, builder, Some(&body)).await?;
        Ok(Self::outcome(
            ResponsePayload::Container(parse_container_info(&response)),
            latency_ms,
            raw_request,
            raw_response,
        ))
    }

    async fn container_list(&self, call: AdapterCall<'_>) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client.get(self.url("/v1/containers")),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        let containers = response
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(parse_container_info).collect())
            .unwrap_or_default();
        Ok(Self::outcome(
            ResponsePayload::ContainerList(ContainerListResponse { containers }),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn container_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(self.url(&format!("/v1/containers/{}", input.container_id))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::Container(parse_container_info(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn container_delete(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .delete(self.url(&format!("/v1/containers/{}", input.container_id))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::Deletion(parse_deletion(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn container_file_create(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerFileCreateInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(input.content.to_vec())
                .file_name(input.filename.clone()),
        );
        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client
                    .post(self.url(&format!("/v1/containers/{}/files", input.container_id))),
            )
            .multipart(form);
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::File(parse_file_info(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn container_file_list(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(self.url(&format!("/v1/containers/{}/files", input.container_id))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;

        let files = response
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(parse_file_info).collect())
            .unwrap_or_default();
        Ok(Self::outcome(
            ResponsePayload::FileList(FileListResponse { files }),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn container_file_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerFileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client.get(self.url(&format!(
                "/v1/containers/{}/files/{}",
                input.container_id, input.file_id
            ))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::File(parse_file_info(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }

    async fn container_file_content(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerFileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client.get(self.url(&format!(
                "/v1/containers/{}/files/{}/content",
                input.container_id, input.file_id
            ))),
        );
        let (content, content_type, latency_ms) = self.send_for_bytes(&call, builder).await?;
        Ok(UnaryOutcome::new(
            ResponsePayload::FileContent(FileContentResponse {
                content,
                content_type,
            }),
            latency_ms,
        ))
    }

    async fn container_file_delete(
        &self,
        call: AdapterCall<'_>,
        input: &ContainerFileIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client.delete(self.url(&format!(
                "/v1/containers/{}/files/{}",
                input.container_id, input.file_id
            ))),
        );
        let (response, latency_ms, _, raw_response) =
            self.send_for_json(&call, builder, None).await?;
        Ok(Self::outcome(
            ResponsePayload::Deletion(parse_deletion(&response)),
            latency_ms,
            None,
            raw_response,
        ))
    }
}

fn parse_embedding_vector(value: Option<&Value>) -> Result<Vec<f32>, BifrostError> {
    match value {
        Some(Value::Array(numbers)) => Ok(numbers
            .iter()
            .filter_map(Value::as_f64)
            .map(|n| n as f32)
            .collect()),
        Some(Value::String(encoded)) => {
            // base64-encoded little-endian f32s.
            use base64::Engine;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|err| BifrostError::decode(format!("embedding base64: {err}")))?;
            Ok(bytes
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect())
        }
        _ => Err(BifrostError::decode("embedding entry has no vector")),
    }
}

fn parse_image_response(body: &Value) -> ImageResponse {
    ImageResponse {
        created: body.get("created").and_then(Value::as_i64),
        data: body
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| ImageData {
                        url: entry.get("url").and_then(Value::as_str).map(str::to_string),
                        b64_json: entry
                            .get("b64_json")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        revised_prompt: entry
                            .get("revised_prompt")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn parse_file_info(body: &Value) -> FileInfo {
    FileInfo {
        id: body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        filename: body
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        bytes: body.get("bytes").and_then(Value::as_u64),
        purpose: body
            .get("purpose")
            .and_then(Value::as_str)
            .map(str::to_string),
        created_at: body.get("created_at").and_then(Value::as_i64),
    }
}

fn parse_batch_info(body: &Value) -> BatchInfo {
    BatchInfo {
        id: body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        status: body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        input_file_id: body
            .get("input_file_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        output_file_id: body
            .get("output_file_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        error_file_id: body
            .get("error_file_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        created_at: body.get("created_at").and_then(Value::as_i64),
    }
}

fn parse_container_info(body: &Value) -> ContainerInfo {
    ContainerInfo {
        id: body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        name: body
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        status: body
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string),
        created_at: body.get("created_at").and_then(Value::as_i64),
    }
}

fn parse_deletion(body: &Value) -> DeletionResponse {
    DeletionResponse {
        id: body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        deleted: body.get("deleted").and_then(Value::as_bool).unwrap_or(true),
    }
}

/// Convert portable messages into Responses API input items.
fn messages_to_responses_wire(messages: &[Message]) -> Vec<Value> {
    let mut items = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::Tool => {
                for block in &message.content {
                    if let ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } = block
                    {
                        items.push(json!({
                            "type": "function_call_output",
                            "call_id": tool_use_id,
                            "output": content.to_text(),
                        }));
                    }
                }
            }
            role => {
                let role_name = match role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => unreachable!(),
                };
                let text_type = if role == Role::Assistant {
                    "output_text"
                } else {
                    "input_text"
                };

                let mut parts = Vec::new();
                for block in &message.content {
                    match block {
                        ContentBlock::Text { text } => {
                            parts.push(json!({"type": text_type, "text": text}));
                        }
                        ContentBlock::ToolUse { id, name, input } => {
                            items.push(json!({
                                "type": "function_call",
                                "call_id": id,
                                "name": name,
                                "arguments": input.to_string(),
                            }));
                        }
                        _ => {}
                    }
                }
                if !parts.is_empty() {
                    items.push(json!({"role": role_name, "content": parts}));
                }
            }
        }
    }
    items
}

fn apply_responses_params(body: &mut Value, call: &AdapterCall<'_>) {
    let params = call.params;
    if let Some(temperature) = params.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = params.max_tokens {
        body["max_output_tokens"] = json!(max_tokens);
    }
    if let Some(top_p) = params.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(tools) = &params.tools
        && !tools.is_empty()
    {
        body["tools"] = Value::Array(
            tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    })
                })
                .collect(),
        );
    }
    for (key, value) in &params.extra {
        body[key.as_str()] = value.clone();
    }
}

fn parse_responses_usage(value: &Value) -> Option<TokenUsage> {
    let usage = value.as_object()?;
    let mut parsed = TokenUsage::new(
        usage.get("input_tokens").and_then(Value::as_i64).unwrap_or(0),
        usage
            .get("output_tokens")
            .and_then(Value::as_i64)
            .unwrap_or(0),
    );
    if let Some(total) = usage.get("total_tokens").and_then(Value::as_i64) {
        parsed.total_tokens = total;
    }
    parsed.reasoning_tokens = value
        .pointer("/output_tokens_details/reasoning_tokens")
        .and_then(Value::as_i64);
    Some(parsed)
}

fn parse_responses_response(body: &Value) -> ChatResponse {
    let mut content = Vec::new();
    let mut finish_reason = FinishReason::Stop;

    if let Some(output) = body.get("output").and_then(Value::as_array) {
        for item in output {
            match item.get("type").and_then(Value::as_str) {
                Some("message") => {
                    if let Some(parts) = item.get("content").and_then(Value::as_array) {
                        for part in parts {
                            if part.get("type").and_then(Value::as_str) == Some("output_text")
                                && let Some(text) = part.get("text").and_then(Value::as_str)
                            {
                                content.push(ContentBlock::text(text));
                            }
                        }
                    }
                }
                Some("function_call") => {
                    finish_reason = FinishReason::ToolCalls;
                    let arguments = item
                        .get("arguments")
                        .and_then(Value::as_str)
                        .unwrap_or("{}");
                    let input = serde_json::from_str(arguments)
                        .unwrap_or(Value::String(arguments.to_string()));
                    content.push(ContentBlock::tool_use(
                        item.get("call_id")
                            .and_then(Value::as_str)
                            .unwrap_or_default(),
                        item.get("name").and_then(Value::as_str).unwrap_or_default(),
                        input,
                    ));
                }
                _ => {}
            }
        }
    }

    let mut response = ChatResponse::new(
        body.get("id").and_then(Value::as_str).unwrap_or_default(),
        body.get("model").and_then(Value::as_str).unwrap_or_default(),
    )
    .with_content(content)
    .with_finish_reason(finish_reason);
    if let Some(usage) = body.get("usage") {
        response.usage = parse_responses_usage(usage);
    }
    response
}

/// Parse one Responses API SSE event.
fn parse_responses_stream_event(
    data: &str,
    accumulator: &mut crate::sse::StreamAccumulator,
) -> Result<ParsedEvent, BifrostError> {
    let event: Value = serde_json::from_str(data)
        .map_err(|err| BifrostError::decode(format!("stream event: {err}")))?;

    match event.get("type").and_then(Value::as_str) {
        Some("response.output_text.delta") => {
            let text = event
                .get("delta")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(ParsedEvent::chunks(vec![bifrost_protocol::StreamChunk::Delta {
                text: text.to_string(),
            }]))
        }
        Some("response.completed") => {
            if let Some(response) = event.get("response") {
                if let Some(id) = response.get("id").and_then(Value::as_str) {
                    accumulator.id = Some(id.to_string());
                }
                if let Some(model) = response.get("model").and_then(Value::as_str) {
                    accumulator.model = model.to_string();
                }
                if let Some(usage) = response.get("usage") {
                    accumulator.usage = parse_responses_usage(usage);
                }
            }
            accumulator.finish_reason = Some(FinishReason::Stop);
            Ok(ParsedEvent {
                chunks: Vec::new(),
                terminal: true,
            })
        }
        _ => Ok(ParsedEvent::empty()),
    }
}

#[cfg(test)]
#[path = "openai.test.rs"]
mod tests;
