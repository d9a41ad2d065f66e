//! Worker message protocol.
//!
//! Requests carry a caller-chosen correlation id and an action; responses
//! echo the id with `status: "ok" | "error"`. The JSON shapes here are the
//! external contract consumed by coordinator front-ends.

use capstream_codec::FrameIndex;
use serde::{Deserialize, Serialize};

/// Operations the codec worker performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerActionKind {
    /// Stream the payload through the content hasher.
    ComputeHash,
    /// Encode the payload into the framed format.
    Compress,
    /// Streaming-decompress the payload.
    Decompress,
}

/// A request to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Correlation id echoed in the response.
    pub id: String,
    /// Requested operation.
    pub action: WorkerActionKind,
    /// Input bytes for the operation.
    pub payload: Vec<u8>,
    /// Frame size override for `compress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_size: Option<u64>,
    /// Compression level override for `compress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
}

/// Response status discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    /// The operation succeeded.
    Ok,
    /// The operation failed; `message` explains why.
    Error,
}

/// A response from the worker, correlated by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    /// Correlation id from the matching request.
    pub id: String,
    /// Outcome discriminant.
    pub status: WorkerStatus,
    /// Output bytes (`compress` blob or `decompress` result).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    /// Frame index for `compress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<FrameIndex>,
    /// Hex digest for `compute-hash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Error description when `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkerResponse {
    /// Successful response skeleton.
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: WorkerStatus::Ok,
            data: None,
            index: None,
            digest: None,
            message: None,
        }
    }

    /// Error response.
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: WorkerStatus::Error,
            data: None,
            index: None,
            digest: None,
            message: Some(message.into()),
        }
    }

    /// True when `status` is `error`.
    pub fn is_error(&self) -> bool {
        self.status == WorkerStatus::Error
    }
}
