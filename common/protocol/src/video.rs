//! Video generation job types.

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

/// Input for starting a video generation job.
///
/// Which upstream endpoint serves the job is a pure function of which
/// inputs are present: text only, a reference image, or a source video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoGenerationInput {
    /// Text prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
    /// Reference image URI or data URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_image: Option<String>,
    /// Source video URI for video-to-video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_video: Option<String>,
    /// Clip duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Output aspect ratio (e.g. "1280:720").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<String>,
    /// Deterministic seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl VideoGenerationInput {
    /// Text-to-video input.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt_text: Some(prompt.into()),
            ..Self::default()
        }
    }

    /// Image-to-video input.
    pub fn image(image: impl Into<String>) -> Self {
        Self {
            prompt_image: Some(image.into()),
            ..Self::default()
        }
    }

    /// Video-to-video input.
    pub fn video(video: impl Into<String>) -> Self {
        Self {
            input_video: Some(video.into()),
            ..Self::default()
        }
    }
}

/// Input addressing an existing video job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoIdInput {
    /// Job identifier as the provider issued it.
    pub id: String,
}

/// Input listing video jobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoListInput {
    /// Maximum number of jobs to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Pagination cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Input remixing an existing video job with a new prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRemixInput {
    /// Source job identifier.
    pub id: String,
    /// New prompt applied to the remix.
    pub prompt: String,
}

/// Status of a video generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoJobStatus {
    /// Job accepted, not yet running.
    Pending,
    /// Job running.
    Running,
    /// Job finished; output available.
    Succeeded,
    /// Job failed.
    Failed,
    /// Job cancelled or deleted.
    Canceled,
}

/// Normalized video job state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJob {
    /// Job identifier.
    pub id: String,
    /// Current status.
    pub status: VideoJobStatus,
    /// Completion ratio in [0, 1], when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Output URL, present once the job succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    /// Failure detail, present when the job failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Normalized list of video jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoListResponse {
    /// Jobs in provider order.
    pub jobs: Vec<VideoJob>,
}

/// Downloaded video content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDownloadResponse {
    /// Raw video bytes.
    #[serde(with = "crate::audio::bytes_base64")]
    pub content: Bytes,
    /// MIME type, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Acknowledgement for a deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionResponse {
    /// Identifier of the deleted object.
    pub id: String,
    /// Whether the provider confirmed the deletion.
    pub deleted: bool,
}

#[cfg(test)]
#[path = "video.test.rs"]
mod tests;
