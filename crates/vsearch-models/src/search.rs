//! Search request and outcome models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{SearchResultSegment, VideoId};

/// Default number of results requested from the backend.
pub const DEFAULT_K: u32 = 30;

/// Default minimum similarity for a frame to count as a match.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.1;

/// Largest `k` the backend accepts.
pub const MAX_K: u32 = 100;

/// Semantic search request, serialized with the backend's field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    /// Restrict the search to one video; `None` searches every indexed video
    pub video_id: Option<VideoId>,
    pub query: String,
    pub k: u32,
    pub similarity_threshold: f64,
    pub merge_segments: bool,
}

impl SearchRequest {
    /// Create a request with default tuning.
    pub fn new(video_id: Option<VideoId>, query: impl Into<String>) -> Self {
        Self {
            video_id,
            query: query.into(),
            k: DEFAULT_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            merge_segments: true,
        }
    }

    /// Apply UI-level overrides on top of the current values.
    pub fn with_options(mut self, options: &SearchOptions) -> Self {
        if let Some(k) = options.k {
            self.k = k;
        }
        if let Some(threshold) = options.similarity_threshold {
            self.similarity_threshold = threshold;
        }
        if let Some(merge) = options.merge_segments {
            self.merge_segments = merge;
        }
        self
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("Search query cannot be empty".to_string());
        }

        if self.k == 0 || self.k > MAX_K {
            return Err(format!("k must be between 1 and {}, got {}", MAX_K, self.k));
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(format!(
                "Similarity threshold must be between 0 and 1, got {}",
                self.similarity_threshold
            ));
        }

        if let Some(id) = &self.video_id {
            if id.as_str().trim().is_empty() {
                return Err("Video ID cannot be blank".to_string());
            }
        }

        Ok(())
    }
}

/// Optional per-search overrides; unset fields fall back to session defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_segments: Option<bool>,
}

impl SearchOptions {
    pub fn k(mut self, k: u32) -> Self {
        self.k = Some(k);
        self
    }

    pub fn similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn merge_segments(mut self, merge: bool) -> Self {
        self.merge_segments = Some(merge);
        self
    }
}

/// Segments returned by one search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchOutcome {
    pub segments: Vec<SearchResultSegment>,
    /// Whether the backend already coalesced overlapping segments
    pub merged: bool,
}
