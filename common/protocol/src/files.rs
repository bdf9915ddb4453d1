//! File, batch, and container operation types.

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

/// Input uploading a file to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadInput {
    /// File name reported to the provider.
    pub filename: String,
    /// File content.
    #[serde(with = "crate::audio::bytes_base64")]
    pub content: Bytes,
    /// Upload purpose (e.g. "batch", "fine-tune").
    pub purpose: String,
}

/// Input addressing an existing file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileIdInput {
    /// File identifier as the provider issued it.
    pub file_id: String,
}

/// Input listing files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileListInput {
    /// Filter by purpose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Maximum number of files to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Normalized file metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// File identifier.
    pub id: String,
    /// File name.
    pub filename: String,
    /// Size in bytes, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// Upload purpose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Creation timestamp, seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// Normalized file listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListResponse {
    /// Files in provider order.
    pub files: Vec<FileInfo>,
}

/// Raw file content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContentResponse {
    /// File bytes.
    #[serde(with = "crate::audio::bytes_base64")]
    pub content: Bytes,
    /// MIME type, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Input creating a batch job over an uploaded input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreateInput {
    /// File carrying the batch input lines.
    pub input_file_id: String,
    /// Endpoint the batch lines target (e.g. "/v1/chat/completions").
    pub endpoint: String,
    /// Completion window (e.g. "24h").
    pub completion_window: String,
}

/// Input addressing an existing batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchIdInput {
    /// Batch identifier as the provider issued it.
    pub batch_id: String,
}

/// Input listing batches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchListInput {
    /// Maximum number of batches to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Pagination cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Normalized batch job state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInfo {
    /// Batch identifier.
    pub id: String,
    /// Provider-reported status string.
    pub status: String,
    /// Input file identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_file_id: Option<String>,
    /// Output file identifier, once available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file_id: Option<String>,
    /// Error file identifier, when failures occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_file_id: Option<String>,
    /// Creation timestamp, seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// Normalized batch listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchListResponse {
    /// Batches in provider order.
    pub batches: Vec<BatchInfo>,
}

/// Input creating a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerCreateInput {
    /// Container name.
    pub name: String,
}

/// Input addressing an existing container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerIdInput {
    /// Container identifier as the provider issued it.
    pub container_id: String,
}

/// Normalized container metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Container identifier.
    pub id: String,
    /// Container name.
    pub name: String,
    /// Provider-reported status string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Creation timestamp, seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// Normalized container listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerListResponse {
    /// Containers in provider order.
    pub containers: Vec<ContainerInfo>,
}

/// Input creating a file inside a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerFileCreateInput {
    /// Owning container.
    pub container_id: String,
    /// File name reported to the provider.
    pub filename: String,
    /// File content.
    #[serde(with = "crate::audio::bytes_base64")]
    pub content: Bytes,
}

/// Input addressing a file inside a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerFileIdInput {
    /// Owning container.
    pub container_id: String,
    /// File identifier.
    pub file_id: String,
}

#[cfg(test)]
#[path = "files.test.rs"]
mod tests;
