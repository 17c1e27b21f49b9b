//! Search result segments and playback selection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::VideoId;

/// A contiguous time range of a video that matched a search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResultSegment {
    pub video_id: VideoId,
    /// Start of the range in seconds
    pub start_timestamp: f64,
    /// End of the range in seconds
    pub end_timestamp: f64,
    /// Relevance score in [0, 1]
    pub score: f64,
    /// Backend-relative thumbnail path of the best matching frame
    pub thumbnail_ref: String,
    /// Number of matched frames the segment covers
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
}

fn default_frame_count() -> u32 {
    1
}

impl SearchResultSegment {
    /// Create a single-frame segment. Reversed ranges are swapped and the
    /// score is clamped into [0, 1].
    pub fn new(
        video_id: impl Into<VideoId>,
        start_timestamp: f64,
        end_timestamp: f64,
        score: f64,
        thumbnail_ref: impl Into<String>,
    ) -> Self {
        let (start, end) = if start_timestamp <= end_timestamp {
            (start_timestamp, end_timestamp)
        } else {
            (end_timestamp, start_timestamp)
        };

        Self {
            video_id: video_id.into(),
            start_timestamp: start,
            end_timestamp: end,
            score: clamp_score(score),
            thumbnail_ref: thumbnail_ref.into(),
            frame_count: 1,
        }
    }

    /// Set the number of frames this segment was built from.
    pub fn with_frame_count(mut self, frame_count: u32) -> Self {
        self.frame_count = frame_count.max(1);
        self
    }

    /// Duration of the range in seconds.
    pub fn duration(&self) -> f64 {
        (self.end_timestamp - self.start_timestamp).max(0.0)
    }
}

/// Clamp a backend score into [0, 1]. NaN maps to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Playback window the backend resolves for a point in a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentInfo {
    pub video_id: VideoId,
    /// Backend-relative URL of the video stream
    pub video_url: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    /// The requested point in time
    pub center_timestamp: f64,
}

/// The segment the user is currently inspecting or playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectedSegment {
    pub video_id: VideoId,
    pub start_timestamp: f64,
    pub end_timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl From<&SearchResultSegment> for SelectedSegment {
    fn from(segment: &SearchResultSegment) -> Self {
        Self {
            video_id: segment.video_id.clone(),
            start_timestamp: segment.start_timestamp,
            end_timestamp: segment.end_timestamp,
            center_timestamp: None,
            video_url: None,
        }
    }
}

impl From<SegmentInfo> for SelectedSegment {
    fn from(info: SegmentInfo) -> Self {
        Self {
            video_id: info.video_id,
            start_timestamp: info.start_time,
            end_timestamp: info.end_time,
            center_timestamp: Some(info.center_timestamp),
            video_url: Some(info.video_url),
        }
    }
}
