//! Image generation, editing, and variation types.

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

/// Input for image generation from a text prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationInput {
    /// Text prompt describing the image.
    pub prompt: String,
    /// Number of images to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Output size (e.g. "1024x1024").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Output quality, provider-specific.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Response format ("url" or "b64_json").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
}

impl ImageGenerationInput {
    /// Create an input from a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            n: None,
            size: None,
            quality: None,
            response_format: None,
        }
    }
}

/// Input for editing an existing image with a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEditInput {
    /// Source image bytes.
    #[serde(with = "crate::audio::bytes_base64")]
    pub image: Bytes,
    /// Source image filename, used for multipart upload.
    pub filename: String,
    /// Edit instruction.
    pub prompt: String,
    /// Optional mask bytes restricting the edited area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<u8>>,
    /// Number of images to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Output size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// Input for generating variations of an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageVariationInput {
    /// Source image bytes.
    #[serde(with = "crate::audio::bytes_base64")]
    pub image: Bytes,
    /// Source image filename, used for multipart upload.
    pub filename: String,
    /// Number of variations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Output size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// One generated image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// URL to the image, when the provider returns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64-encoded image, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    /// Provider-revised prompt, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

/// Normalized image response, shared by generation, edit, and variation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Creation timestamp reported by the provider, seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    /// Generated images.
    pub data: Vec<ImageData>,
}

#[cfg(test)]
#[path = "images.test.rs"]
mod tests;
