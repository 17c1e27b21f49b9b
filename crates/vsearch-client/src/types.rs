//! Wire types for the backend JSON API and their conversion into models.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use vsearch_models::{SearchOutcome, SearchResultSegment, VideoDescriptor, VideoId};

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Upload
// =============================================================================

/// Video metadata as reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub video_id: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub fps: f64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub total_frames: u64,
}

impl VideoInfo {
    pub fn into_descriptor(self) -> VideoDescriptor {
        let id = VideoId::from(self.video_id);
        let storage_path = VideoDescriptor::default_storage_path(&id);
        let display_name = if self.original_filename.is_empty() {
            id.to_string()
        } else {
            self.original_filename
        };
        VideoDescriptor::new(id, display_name, self.duration, storage_path)
    }
}

/// Upload envelope returned by `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub video_info: Option<VideoInfo>,
    #[serde(default)]
    pub frames_extracted: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// Accepted success payloads of an upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UploadPayload {
    Descriptor(VideoDescriptor),
    Envelope(UploadResponse),
}

impl UploadPayload {
    /// Resolve the payload into a descriptor. `file_name` names the video
    /// when the envelope carries no metadata.
    pub fn into_descriptor(self, file_name: &str) -> ClientResult<VideoDescriptor> {
        let envelope = match self {
            UploadPayload::Descriptor(descriptor) => return Ok(descriptor),
            UploadPayload::Envelope(envelope) => envelope,
        };

        if !envelope.success {
            return Err(ClientError::protocol(
                envelope
                    .message
                    .unwrap_or_else(|| "Upload reported failure".to_string()),
            ));
        }

        match (envelope.video_info, envelope.video_id) {
            (Some(info), _) => Ok(info.into_descriptor()),
            (None, Some(video_id)) if !video_id.trim().is_empty() => {
                let id = VideoId::from(video_id);
                let storage_path = VideoDescriptor::default_storage_path(&id);
                Ok(VideoDescriptor::new(id, file_name, 0.0, storage_path))
            }
            _ => Err(ClientError::protocol("Upload response has no video id")),
        }
    }
}

// =============================================================================
// Search
// =============================================================================

/// A single matched frame.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameResult {
    #[serde(default)]
    pub frame_id: String,
    pub video_id: String,
    pub timestamp: f64,
    pub score: f64,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub thumbnail_url: String,
}

/// Best frame of a backend-merged segment.
#[derive(Debug, Clone, Deserialize)]
pub struct BestFrame {
    #[serde(default)]
    pub frame_id: String,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub thumbnail_url: String,
}

/// A segment as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentResult {
    pub video_id: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(alias = "start_timestamp")]
    pub start_time: f64,
    #[serde(alias = "end_timestamp")]
    pub end_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(alias = "score")]
    pub best_score: f64,
    #[serde(default)]
    pub best_frame: Option<BestFrame>,
    #[serde(default)]
    pub thumbnail_ref: Option<String>,
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
}

fn default_frame_count() -> u32 {
    1
}

impl SegmentResult {
    fn into_segment(self) -> SearchResultSegment {
        let thumbnail = self
            .thumbnail_ref
            .or_else(|| self.best_frame.map(|f| f.thumbnail_url))
            .unwrap_or_default();
        SearchResultSegment::new(
            self.video_id,
            self.start_time,
            self.end_time,
            self.best_score,
            thumbnail,
        )
        .with_frame_count(self.frame_count)
    }
}

/// Response of `POST /search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub results: Vec<FrameResult>,
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub segments: Option<Vec<SegmentResult>>,
    #[serde(default)]
    pub merge_info: Option<Value>,
    #[serde(default)]
    pub merged: Option<bool>,
}

impl SearchResponse {
    /// Convert into segments. Frame hits become `padding`-wide windows
    /// around their timestamp, clipped at zero.
    pub fn into_outcome(self, padding: f64) -> SearchOutcome {
        if let Some(segments) = self.segments {
            return SearchOutcome {
                segments: segments.into_iter().map(SegmentResult::into_segment).collect(),
                merged: self.merged.unwrap_or(true),
            };
        }

        let padding = padding.max(0.0);
        let segments = self
            .results
            .into_iter()
            .map(|frame| {
                SearchResultSegment::new(
                    frame.video_id,
                    (frame.timestamp - padding).max(0.0),
                    frame.timestamp + padding,
                    frame.score,
                    frame.thumbnail_url,
                )
            })
            .collect();

        SearchOutcome {
            segments,
            merged: self.merged.unwrap_or(false),
        }
    }
}

// =============================================================================
// Segments
// =============================================================================

/// Body of `POST /video-segment`.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentRequest<'a> {
    pub video_id: &'a str,
    pub timestamp: f64,
}

// =============================================================================
// Video list
// =============================================================================

/// Parse a video list body leniently: the `{videos: [...]}` envelope or a
/// bare array, skipping entries that do not parse.
pub fn parse_video_list(body: &Value) -> Vec<VideoDescriptor> {
    let entries = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("videos") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => {
                warn!("Video list response has no videos array");
                return Vec::new();
            }
        },
        _ => {
            warn!("Video list response is not a JSON object or array");
            return Vec::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| {
            if let Ok(info) = serde_json::from_value::<VideoInfo>(entry.clone()) {
                return Some(info.into_descriptor());
            }
            match serde_json::from_value::<VideoDescriptor>(entry.clone()) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    warn!(error = %e, "Skipping unparsable video list entry");
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorEnvelope {
    /// The `detail` text, when it is a non-empty string.
    pub fn detail_message(&self) -> Option<&str> {
        match &self.detail {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Extract the server's message from an error body, or use `fallback`.
pub fn error_message(body: &str, fallback: impl FnOnce() -> String) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.detail_message().map(str::to_string))
        .unwrap_or_else(fallback)
}
