//! Runway video generation adapter.
//!
//! Video-only: every other capability fails with `UnsupportedOperation`
//! so fallback chains can route non-video requests elsewhere. The
//! generation endpoint is a pure function of which inputs are present:
//! a source video routes to `/v1/video_to_video`, a reference image to
//! `/v1/image_to_video`, and a bare prompt to `/v1/text_to_video`.

use crate::http::apply_extra_headers;
use crate::http::build_http_client;
use crate::provider::AdapterCall;
use crate::provider::ProviderAdapter;
use crate::provider::UnaryOutcome;
use async_trait::async_trait;
use bifrost_error::BifrostError;
use bifrost_protocol::Key;
use bifrost_protocol::NetworkConfig;
use bifrost_protocol::Provider;
use bifrost_protocol::ProviderConfig;
use bifrost_protocol::RequestContext;
use bifrost_protocol::ResponsePayload;
use bifrost_protocol::video::DeletionResponse;
use bifrost_protocol::video::VideoDownloadResponse;
use bifrost_protocol::video::VideoGenerationInput;
use bifrost_protocol::video::VideoIdInput;
use bifrost_protocol::video::VideoJob;
use bifrost_protocol::video::VideoJobStatus;
use bifrost_protocol::video::VideoListInput;
use bifrost_protocol::video::VideoListResponse;
use bifrost_protocol::video::VideoRemixInput;
use serde_json::Value;
use serde_json::json;
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.dev.runwayml.com";
const API_VERSION: &str = "2024-11-06";

/// Adapter for the Runway task API.
pub struct RunwayAdapter {
    client: reqwest::Client,
    network: NetworkConfig,
    base_url: String,
}

impl RunwayAdapter {
    /// Build the adapter from the provider config.
    pub fn new(config: &ProviderConfig) -> Result<Self, BifrostError> {
        Ok(Self {
            client: build_http_client(&config.network, config.proxy.as_ref())?,
            network: config.network.clone(),
            base_url: config
                .network
                .trimmed_base_url()
                .unwrap_or(DEFAULT_BASE_URL)
                .to_string(),
        })
    }

    fn authed(
        &self,
        ctx: &RequestContext,
        key: &Key,
        builder: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        let mut builder = apply_extra_headers(
            builder
                .bearer_auth(&key.value)
                .header("X-Runway-Version", API_VERSION),
            &self.network,
        );
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }
        builder
    }

    async fn send_for_json(
        &self,
        ctx: &RequestContext,
        builder: reqwest::RequestBuilder,
    ) -> Result<(Value, u64), BifrostError> {
        let started = Instant::now();
        let response = tokio::select! {
            _ = ctx.cancellation().cancelled() => return Err(BifrostError::canceled()),
            response = builder.send() => response?,
        };
        let status = response.status();
        let bytes = response.bytes().await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &bytes));
        }
        if bytes.is_empty() {
            return Ok((Value::Null, latency_ms));
        }
        Ok((serde_json::from_slice(&bytes)?, latency_ms))
    }

    /// Endpoint selection as a pure function of the generation inputs.
    fn generation_endpoint(input: &VideoGenerationInput) -> Result<&'static str, BifrostError> {
        if input.input_video.is_some() {
            Ok("/v1/video_to_video")
        } else if input.prompt_image.is_some() {
            Ok("/v1/image_to_video")
        } else if input.prompt_text.is_some() {
            Ok("/v1/text_to_video")
        } else {
            Err(BifrostError::validation(
                "video generation needs a prompt, an image, or a source video",
            ))
        }
    }
}

#[async_trait]
impl ProviderAdapter for RunwayAdapter {
    fn provider(&self) -> Provider {
        Provider::Runway
    }

    async fn video_generation(
        &self,
        call: AdapterCall<'_>,
        input: &VideoGenerationInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let endpoint = Self::generation_endpoint(input)?;
        let mut body = json!({"model": call.model});
        if let Some(text) = &input.prompt_text {
            body["promptText"] = json!(text);
        }
        if let Some(image) = &input.prompt_image {
            body["promptImage"] = json!(image);
        }
        if let Some(video) = &input.input_video {
            body["videoUri"] = json!(video);
        }
        if let Some(duration) = input.duration {
            body["duration"] = json!(duration);
        }
        if let Some(ratio) = &input.ratio {
            body["ratio"] = json!(ratio);
        }
        if let Some(seed) = input.seed {
            body["seed"] = json!(seed);
        }
        for (key, value) in &call.params.extra {
            body[key.as_str()] = value.clone();
        }

        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client.post(format!("{}{endpoint}", self.base_url)),
            )
            .json(&body);
        let (response, latency_ms) = self.send_for_json(call.ctx, builder).await?;

        let mut outcome =
            UnaryOutcome::new(ResponsePayload::VideoJob(parse_task(&response)), latency_ms);
        outcome.raw_request = call.raw_request.then_some(body);
        outcome.raw_response = call.raw_response.then_some(response);
        Ok(outcome)
    }

    async fn video_retrieve(
        &self,
        call: AdapterCall<'_>,
        input: &VideoIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(format!("{}/v1/tasks/{}", self.base_url, input.id)),
        );
        let (response, latency_ms) = self.send_for_json(call.ctx, builder).await?;
        Ok(UnaryOutcome::new(
            ResponsePayload::VideoJob(parse_task(&response)),
            latency_ms,
        ))
    }

    async fn video_download(
        &self,
        call: AdapterCall<'_>,
        input: &VideoIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let started = Instant::now();
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .get(format!("{}/v1/tasks/{}", self.base_url, input.id)),
        );
        let (task, _) = self.send_for_json(call.ctx, builder).await?;
        let job = parse_task(&task);

        let output_url = job.output_url.ok_or_else(|| {
            BifrostError::operation(format!("video job {} has no output yet", input.id))
        })?;

        // The output URL is pre-signed; no auth headers on the fetch.
        let response = tokio::select! {
            _ = call.ctx.cancellation().cancelled() => return Err(BifrostError::canceled()),
            response = self.client.get(&output_url).send() => response?,
        };
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &body));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content = response.bytes().await?;

        // Raw-response capture is skipped for binary downloads.
        Ok(UnaryOutcome::new(
            ResponsePayload::VideoDownload(VideoDownloadResponse {
                content,
                content_type,
            }),
            started.elapsed().as_millis() as u64,
        ))
    }

    async fn video_delete(
        &self,
        call: AdapterCall<'_>,
        input: &VideoIdInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let builder = self.authed(
            call.ctx,
            call.key,
            self.client
                .delete(format!("{}/v1/tasks/{}", self.base_url, input.id)),
        );
        let (_, latency_ms) = self.send_for_json(call.ctx, builder).await?;
        Ok(UnaryOutcome::new(
            ResponsePayload::Deletion(DeletionResponse {
                id: input.id.clone(),
                deleted: true,
            }),
            latency_ms,
        ))
    }

    async fn video_list(
        &self,
        call: AdapterCall<'_>,
        input: &VideoListInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let mut builder = self.client.get(format!("{}/v1/tasks", self.base_url));
        if let Some(limit) = input.limit {
            builder = builder.query(&[("limit", limit.to_string())]);
        }
        if let Some(after) = &input.after {
            builder = builder.query(&[("after", after)]);
        }
        let builder = self.authed(call.ctx, call.key, builder);
        let (response, latency_ms) = self.send_for_json(call.ctx, builder).await?;

        let jobs = response
            .get("tasks")
            .or_else(|| response.get("data"))
            .and_then(Value::as_array)
            .map(|tasks| tasks.iter().map(parse_task).collect())
            .unwrap_or_default();
        Ok(UnaryOutcome::new(
            ResponsePayload::VideoList(VideoListResponse { jobs }),
            latency_ms,
        ))
    }

    async fn video_remix(
        &self,
        call: AdapterCall<'_>,
        input: &VideoRemixInput,
    ) -> Result<UnaryOutcome, BifrostError> {
        let body = json!({"promptText": input.prompt});
        let builder = self
            .authed(
                call.ctx,
                call.key,
                self.client
                    .post(format!("{}/v1/tasks/{}/remix", self.base_url, input.id)),
            )
            .json(&body);
        let (response, latency_ms) = self.send_for_json(call.ctx, builder).await?;
        Ok(UnaryOutcome::new(
            ResponsePayload::VideoJob(parse_task(&response)),
            latency_ms,
        ))
    }
}

fn parse_status(status: &str) -> VideoJobStatus {
    match status {
        "PENDING" => VideoJobStatus::Pending,
        "RUNNING" | "THROTTLED" => VideoJobStatus::Running,
        "SUCCEEDED" => VideoJobStatus::Succeeded,
        "FAILED" => VideoJobStatus::Failed,
        "CANCELLED" => VideoJobStatus::Canceled,
        _ => VideoJobStatus::Pending,
    }
}

fn parse_task(body: &Value) -> VideoJob {
    VideoJob {
        id: body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        status: body
            .get("status")
            .and_then(Value::as_str)
            .map(parse_status)
            .unwrap_or(VideoJobStatus::Pending),
        progress: body.get("progress").and_then(Value::as_f64),
        output_url: body
            .pointer("/output/0")
            .and_then(Value::as_str)
            .map(str::to_string),
        failure_reason: body
            .get("failure")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn parse_error(status: u16, body: &[u8]) -> BifrostError {
    if let Ok(value) = serde_json::from_slice::<Value>(body)
        && let Some(message) = value.get("error").and_then(Value::as_str)
    {
        return BifrostError::provider_api(status, message);
    }
    BifrostError::provider_api(status, String::from_utf8_lossy(body).to_string())
}

#[cfg(test)]
#[path = "runway.test.rs"]
mod tests;
