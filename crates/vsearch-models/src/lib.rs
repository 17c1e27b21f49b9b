//! Shared data models for the vsearch client session.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers and descriptors
//! - Search requests, options and result segments
//! - Upload status and failure records
//! - Backend health payloads
//! - Timestamp formatting for display and input

pub mod health;
pub mod search;
pub mod segment;
pub mod timestamp;
pub mod upload;
pub mod video;

// Re-export common types
pub use health::HealthStatus;
pub use search::{
    SearchOptions, SearchOutcome, SearchRequest, DEFAULT_K, DEFAULT_SIMILARITY_THRESHOLD, MAX_K,
};
pub use segment::{SearchResultSegment, SegmentInfo, SelectedSegment};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
pub use upload::{FailureKind, UploadFailure, UploadState, UploadStatus};
pub use video::{VideoDescriptor, VideoId};
