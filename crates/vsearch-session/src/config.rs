//! Session configuration.

use vsearch_client::UploadLimits;
use vsearch_models::{SearchRequest, VideoId, DEFAULT_K, DEFAULT_SIMILARITY_THRESHOLD, MAX_K};

use crate::merge::{MergePolicy, DEFAULT_MERGE_GAP_SECS};

/// Defaults applied by the orchestrators.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Largest gap (exclusive) between two segments that still merges
    pub merge_gap_seconds: f64,
    /// Results requested when the caller gives no `k`
    pub default_k: u32,
    /// Similarity threshold used when the caller gives none
    pub default_similarity_threshold: f64,
    /// Whether searches merge segments unless told otherwise
    pub default_merge_segments: bool,
    /// Limits checked before an upload starts
    pub upload_limits: UploadLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            merge_gap_seconds: DEFAULT_MERGE_GAP_SECS,
            default_k: DEFAULT_K,
            default_similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            default_merge_segments: true,
            upload_limits: UploadLimits::default(),
        }
    }
}

impl SessionConfig {
    /// Create config from environment variables. Invalid values fall back
    /// to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let merge_gap_seconds = std::env::var("VSEARCH_MERGE_GAP_SECS")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(defaults.merge_gap_seconds);

        let default_k = std::env::var("VSEARCH_DEFAULT_K")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|k| (1..=MAX_K).contains(k))
            .unwrap_or(defaults.default_k);

        let default_similarity_threshold = std::env::var("VSEARCH_DEFAULT_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|t| (0.0..=1.0).contains(t))
            .unwrap_or(defaults.default_similarity_threshold);

        let upload_limits = match std::env::var("VSEARCH_MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|mb| *mb > 0)
        {
            Some(mb) => defaults.upload_limits.with_max_bytes(mb * 1024 * 1024),
            None => defaults.upload_limits,
        };

        Self {
            merge_gap_seconds,
            default_k,
            default_similarity_threshold,
            default_merge_segments: defaults.default_merge_segments,
            upload_limits,
        }
    }

    pub fn merge_policy(&self) -> MergePolicy {
        MergePolicy::new(self.merge_gap_seconds)
    }

    /// Request carrying the configured defaults.
    pub fn search_request(&self, video_id: Option<VideoId>, query: impl Into<String>) -> SearchRequest {
        SearchRequest {
            k: self.default_k,
            similarity_threshold: self.default_similarity_threshold,
            merge_segments: self.default_merge_segments,
            ..SearchRequest::new(video_id, query)
        }
    }
}
