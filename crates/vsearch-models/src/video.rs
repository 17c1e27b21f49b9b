//! Video identity and descriptor models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend identifier of an indexed video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A video known to the backend, as held by the session.
///
/// Created when an upload completes (or when a previously indexed video is
/// opened) and never modified afterwards; replace it instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescriptor {
    id: VideoId,

    /// Original file name shown to the user
    #[serde(alias = "display_name")]
    display_name: String,

    #[serde(alias = "duration_seconds")]
    duration_seconds: f64,

    /// Backend-relative path the video can be streamed from
    #[serde(alias = "storage_path")]
    storage_path: String,
}

impl VideoDescriptor {
    pub fn new(
        id: impl Into<VideoId>,
        display_name: impl Into<String>,
        duration_seconds: f64,
        storage_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            duration_seconds: duration_seconds.max(0.0),
            storage_path: storage_path.into(),
        }
    }

    /// Backend storage path for a video served by the `/videos/{id}` route.
    pub fn default_storage_path(id: &VideoId) -> String {
        format!("/videos/{}", id)
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }
}

impl fmt::Display for VideoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {:.1}s)", self.display_name, self.id, self.duration_seconds)
    }
}
