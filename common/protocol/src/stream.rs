//! Streaming chunk union.

use crate::response::BifrostResponse;
use bifrost_error::BifrostError;
use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

/// One message in a streaming response channel.
///
/// A stream is a finite sequence of chunks closed by exactly one terminal
/// chunk ([`StreamChunk::Done`] or [`StreamChunk::Error`]); the channel
/// closes right after the terminal chunk is delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Partial text delta.
    Delta {
        /// Appended text.
        text: String,
    },
    /// Partial tool-call delta.
    ToolCallDelta {
        /// Index of the tool call being built.
        index: usize,
        /// Tool call id, present on the first delta of a call.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Tool name, present on the first delta of a call.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Appended argument fragment.
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },
    /// Synthesized audio bytes.
    SpeechBytes {
        /// Audio fragment.
        #[serde(with = "crate::audio::bytes_base64")]
        audio: Bytes,
    },
    /// Partial transcription delta.
    TranscriptionDelta {
        /// Appended text.
        text: String,
    },
    /// Partial image-edit delta.
    ImageEditDelta {
        /// Base64 fragment of the partial image.
        b64: String,
    },
    /// Terminal chunk of a successful stream.
    Done {
        /// Final accumulated response.
        response: Box<BifrostResponse>,
    },
    /// Terminal chunk of a failed stream.
    Error {
        /// The failure.
        error: Box<BifrostError>,
    },
}

impl StreamChunk {
    /// Whether this chunk closes the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamChunk::Done { .. } | StreamChunk::Error { .. })
    }

    /// Text of a delta chunk.
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            StreamChunk::Delta { text } => Some(text),
            _ => None,
        }
    }

    /// Terminal chunk for a successful stream.
    pub fn done(response: BifrostResponse) -> Self {
        StreamChunk::Done {
            response: Box::new(response),
        }
    }

    /// Terminal chunk for a failed stream.
    pub fn error(error: BifrostError) -> Self {
        StreamChunk::Error {
            error: Box::new(error),
        }
    }
}

#[cfg(test)]
#[path = "stream.test.rs"]
mod tests;
