//! Upload lifecycle models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the current upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// No upload has started, or the last one was reset
    #[default]
    Idle,
    /// Bytes are being sent or the backend is still processing
    InProgress,
    /// The backend returned a video descriptor
    Succeeded,
    /// The upload failed or was cancelled
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Idle => "idle",
            UploadStatus::InProgress => "in_progress",
            UploadStatus::Succeeded => "succeeded",
            UploadStatus::Failed => "failed",
        }
    }

    /// Check whether the status has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Succeeded | UploadStatus::Failed)
    }

    /// Allowed transitions of the upload state machine.
    ///
    /// InProgress -> Idle is only used when a caller abandons an upload
    /// phase it started itself.
    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        use UploadStatus::*;
        matches!(
            (self, next),
            (Idle, InProgress)
                | (InProgress, Succeeded)
                | (InProgress, Failed)
                | (InProgress, Idle)
                | (Succeeded, Idle)
                | (Failed, Idle)
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upload status plus progress percentage in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct UploadState {
    pub status: UploadStatus,
    pub progress_percent: f64,
}

impl UploadState {
    pub fn is_uploading(&self) -> bool {
        self.status == UploadStatus::InProgress
    }
}

/// Coarse category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Network,
    Server,
    Protocol,
    Aborted,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Network => "network",
            FailureKind::Server => "server",
            FailureKind::Protocol => "protocol",
            FailureKind::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Last upload error as surfaced to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UploadFailure {
    pub kind: FailureKind,
    pub message: String,
    /// HTTP status for server failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub occurred_at: DateTime<Utc>,
}

impl UploadFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
            occurred_at: Utc::now(),
        }
    }

    /// Failure recorded when the user cancels an upload.
    pub fn aborted() -> Self {
        Self::new(FailureKind::Aborted, "Upload aborted", None)
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} error ({}): {}", self.kind, status, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}
