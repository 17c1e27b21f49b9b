//! The backend contract the session orchestrators are written against.

use async_trait::async_trait;
use vsearch_models::{HealthStatus, SearchOutcome, SearchRequest, SegmentInfo, VideoDescriptor, VideoId};

use crate::abort::AbortSignal;
use crate::error::ClientResult;
use crate::progress::ProgressReporter;
use crate::upload::UploadFile;

/// Backend operations. Implementations hold no business logic and never
/// retry; every call is independent of the others.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload a video. Progress goes to `progress` until the call resolves;
    /// firing `signal` fails the call with `ClientError::Aborted`.
    async fn upload_asset(
        &self,
        file: UploadFile,
        progress: ProgressReporter,
        signal: AbortSignal,
    ) -> ClientResult<VideoDescriptor>;

    /// Run a semantic search.
    async fn search(&self, request: &SearchRequest) -> ClientResult<SearchOutcome>;

    /// Resolve the playback window around `timestamp`.
    async fn get_video_segment(&self, video_id: &VideoId, timestamp: f64)
        -> ClientResult<SegmentInfo>;

    /// `Ok(true)` when the backend answers its health probe with a 2xx
    /// status. Other statuses fail with `Server`, transport errors with
    /// `Network`. The payload is not inspected.
    async fn health_check(&self) -> ClientResult<bool>;

    /// Parsed health payload.
    async fn health_status(&self) -> ClientResult<HealthStatus>;

    /// Videos the backend has indexed.
    async fn list_videos(&self) -> ClientResult<Vec<VideoDescriptor>>;
}
