//! Speech synthesis and transcription types.

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

/// Input for speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechInput {
    /// Text to synthesize.
    pub input: String,
    /// Voice identifier, provider-specific.
    pub voice: String,
    /// Output audio format (e.g. "mp3", "wav").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    /// Playback speed multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl SpeechInput {
    /// Create a speech input with the given text and voice.
    pub fn new(input: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            voice: voice.into(),
            response_format: None,
            speed: None,
        }
    }
}

/// Normalized speech synthesis response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechResponse {
    /// Raw audio bytes.
    #[serde(with = "crate::audio::bytes_base64")]
    pub audio: Bytes,
    /// MIME type of the audio, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Input for audio transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionInput {
    /// Audio file bytes.
    #[serde(with = "crate::audio::bytes_base64")]
    pub file: Bytes,
    /// Original filename, used for multipart upload.
    pub filename: String,
    /// Input language hint (ISO-639-1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Optional prompt to guide the transcription.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Response format (e.g. "json", "text", "verbose_json").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
}

/// Normalized transcription response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    /// Transcribed text.
    pub text: String,
    /// Detected language, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Audio duration in seconds, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Base64 serialization for binary payloads.
///
/// Keeps binary fields representable in JSON logs and test fixtures.
pub(crate) mod bytes_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "audio.test.rs"]
mod tests;
