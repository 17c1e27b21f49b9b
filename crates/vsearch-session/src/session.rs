//! One user's video search session.
//!
//! `VideoSession` wires one store and one transport to both orchestrators
//! and adds the flows a front-end needs around them: opening an indexed
//! video, selecting a search result for playback, refreshing the library.

use std::sync::Arc;

use tracing::{debug, info};
use vsearch_client::{ClientResult, HttpTransport, Transport, UploadFile, UrlResolver};
use vsearch_models::{
    HealthStatus, SearchOptions, SearchResultSegment, SegmentInfo, SelectedSegment,
    VideoDescriptor, VideoId,
};

use crate::config::SessionConfig;
use crate::search::SearchOrchestrator;
use crate::store::{SessionState, SessionStore};
use crate::upload::UploadOrchestrator;

/// Session facade over the store and orchestrators.
#[derive(Clone)]
pub struct VideoSession {
    store: SessionStore,
    transport: Arc<dyn Transport>,
    uploads: UploadOrchestrator,
    searches: SearchOrchestrator,
    urls: UrlResolver,
}

impl VideoSession {
    pub fn new(transport: Arc<dyn Transport>, urls: UrlResolver, config: SessionConfig) -> Self {
        let store = SessionStore::new();
        let uploads = UploadOrchestrator::new(
            store.clone(),
            Arc::clone(&transport),
            config.upload_limits.clone(),
        );
        let searches = SearchOrchestrator::new(Arc::clone(&transport), config);
        Self {
            store,
            transport,
            uploads,
            searches,
            urls,
        }
    }

    /// Session over an HTTP transport configured from the environment.
    pub fn from_env() -> ClientResult<Self> {
        let transport = HttpTransport::from_env()?;
        let urls = transport.urls().clone();
        Ok(Self::new(Arc::new(transport), urls, SessionConfig::from_env()))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }

    pub fn searches(&self) -> &SearchOrchestrator {
        &self.searches
    }

    pub fn state(&self) -> SessionState {
        self.store.snapshot()
    }

    // =========================================================================
    // Upload
    // =========================================================================

    pub async fn start_upload(&self, file: UploadFile) -> ClientResult<VideoDescriptor> {
        self.uploads.start_upload(file).await
    }

    pub fn cancel_upload(&self) -> bool {
        self.uploads.cancel_upload()
    }

    // =========================================================================
    // Videos
    // =========================================================================

    /// Make a previously indexed video the current one.
    pub fn open_video(&self, video: VideoDescriptor) {
        info!(video_id = %video.id(), "Opening video");
        self.store.load_video(video);
    }

    /// Unload the current video and its selection.
    pub fn close_video(&self) {
        self.store.clear_video();
    }

    /// Videos the backend has indexed.
    pub async fn refresh_library(&self) -> ClientResult<Vec<VideoDescriptor>> {
        self.transport.list_videos().await
    }

    // =========================================================================
    // Search and playback
    // =========================================================================

    /// Search the loaded video, or every video when none is loaded.
    pub async fn search(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> ClientResult<Vec<SearchResultSegment>> {
        let video_id = self.store.snapshot().uploaded_video.map(|v| v.id().clone());
        self.searches
            .run_search(video_id.as_ref(), query, options)
            .await
    }

    /// Search every indexed video.
    pub async fn search_all(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> ClientResult<Vec<SearchResultSegment>> {
        self.searches.run_search(None, query, options).await
    }

    /// Select a result for playback.
    ///
    /// Resolves the playback window at the segment's midpoint and stores the
    /// selection, loading the segment's video first when another one is
    /// current. A failed lookup leaves the state untouched.
    pub async fn select_result(&self, segment: &SearchResultSegment) -> ClientResult<SelectedSegment> {
        let midpoint = (segment.start_timestamp + segment.end_timestamp) / 2.0;
        let info = self
            .transport
            .get_video_segment(&segment.video_id, midpoint)
            .await?;

        let selected = SelectedSegment {
            center_timestamp: Some(info.center_timestamp),
            video_url: Some(info.video_url.clone()),
            ..SelectedSegment::from(segment)
        };

        let loaded = self
            .store
            .snapshot()
            .uploaded_video
            .is_some_and(|v| v.id() == &segment.video_id);
        if !loaded {
            let video = self.find_video(segment, &info.video_url).await;
            self.store.load_video(video);
        }

        self.store.set_segment(Some(selected.clone()));
        debug!(
            video_id = %selected.video_id,
            start = selected.start_timestamp,
            end = selected.end_timestamp,
            "Selected segment"
        );
        Ok(selected)
    }

    /// Library entry for the segment's video, or a minimal descriptor when
    /// the library does not list it.
    async fn find_video(&self, segment: &SearchResultSegment, video_url: &str) -> VideoDescriptor {
        let listed = match self.transport.list_videos().await {
            Ok(videos) => videos.into_iter().find(|v| v.id() == &segment.video_id),
            Err(e) => {
                debug!(error = %e, "Library lookup failed");
                None
            }
        };
        listed.unwrap_or_else(|| {
            VideoDescriptor::new(
                segment.video_id.clone(),
                segment.video_id.to_string(),
                0.0,
                video_url,
            )
        })
    }

    /// Playback window around `timestamp`, without touching the selection.
    pub async fn video_segment(&self, video_id: &VideoId, timestamp: f64) -> ClientResult<SegmentInfo> {
        self.transport.get_video_segment(video_id, timestamp).await
    }

    pub fn clear_selection(&self) {
        self.store.set_segment(None);
    }

    // =========================================================================
    // Backend and URLs
    // =========================================================================

    pub async fn health_check(&self) -> ClientResult<bool> {
        self.transport.health_check().await
    }

    pub async fn health_status(&self) -> ClientResult<HealthStatus> {
        self.transport.health_status().await
    }

    pub fn frame_url(&self, path: &str) -> String {
        self.urls.frame_url(path)
    }

    pub fn video_url(&self, path: &str) -> String {
        self.urls.video_url(path)
    }
}

impl std::fmt::Debug for VideoSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSession")
            .field("store", &self.store)
            .field("uploads", &self.uploads)
            .field("searches", &self.searches)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use tokio_test::assert_err;
    use vsearch_client::{ClientConfig, ClientError};
    use vsearch_models::UploadStatus;

    fn session(stub: &Arc<StubTransport>) -> VideoSession {
        let transport: Arc<dyn Transport> = stub.clone();
        VideoSession::new(
            transport,
            UrlResolver::new(&ClientConfig::default()),
            SessionConfig::default(),
        )
    }

    fn seg(video: &str, start: f64, end: f64) -> SearchResultSegment {
        SearchResultSegment::new(video, start, end, 0.7, format!("/frames/{video}/x.jpg"))
    }

    #[tokio::test]
    async fn test_upload_then_select_result() {
        let stub = Arc::new(StubTransport::new());
        let session = session(&stub);

        let video = session
            .start_upload(UploadFile::from_bytes("clip.mp4", vec![1; 8]))
            .await
            .unwrap();
        assert_eq!(session.state().upload_status(), UploadStatus::Succeeded);

        let selected = session.select_result(&seg(video.id().as_str(), 10.0, 20.0)).await.unwrap();
        assert_eq!(selected.start_timestamp, 10.0);
        assert_eq!(selected.end_timestamp, 20.0);
        assert_eq!(selected.center_timestamp, Some(15.0));
        assert_eq!(selected.video_url.as_deref(), Some("/videos/v1"));
        assert_eq!(session.state().selected_segment, Some(selected));
        assert_eq!(stub.segment_calls(), 1);
    }

    #[tokio::test]
    async fn test_select_result_loads_listed_video() {
        let other = VideoDescriptor::new("v2", "beach.mov", 30.0, "/videos/v2");
        let stub = Arc::new(StubTransport::new().with_videos(vec![other.clone()]));
        let session = session(&stub);
        session.open_video(StubTransport::clip_video());

        session.select_result(&seg("v2", 0.0, 4.0)).await.unwrap();

        let state = session.state();
        assert_eq!(state.uploaded_video, Some(other));
        assert_eq!(state.selected_segment.unwrap().video_id.as_str(), "v2");
    }

    #[tokio::test]
    async fn test_select_result_unlisted_video_gets_minimal_descriptor() {
        let stub = Arc::new(StubTransport::new());
        let session = session(&stub);

        session.select_result(&seg("v9", 0.0, 4.0)).await.unwrap();

        let video = session.state().uploaded_video.unwrap();
        assert_eq!(video.id().as_str(), "v9");
        assert_eq!(video.storage_path(), "/videos/v9");
    }

    #[tokio::test]
    async fn test_failed_lookup_keeps_selection() {
        let stub = Arc::new(StubTransport::new());
        let session = session(&stub);
        session.open_video(StubTransport::clip_video());
        session.select_result(&seg("v1", 0.0, 4.0)).await.unwrap();
        let before = session.state();

        let err = assert_err!(session.select_result(&seg("missing", 0.0, 4.0)).await);
        assert!(matches!(err, ClientError::Server { status: 404, .. }));
        assert_eq!(session.state(), before);
    }

    #[tokio::test]
    async fn test_search_scopes_to_loaded_video() {
        let stub = Arc::new(StubTransport::new());
        let session = session(&stub);

        session.search("dog", SearchOptions::default()).await.unwrap();
        assert!(stub.last_search().unwrap().video_id.is_none());

        session.open_video(StubTransport::clip_video());
        session.search("dog", SearchOptions::default()).await.unwrap();
        assert_eq!(stub.last_search().unwrap().video_id.unwrap().as_str(), "v1");

        session.search_all("dog", SearchOptions::default()).await.unwrap();
        assert!(stub.last_search().unwrap().video_id.is_none());
    }

    #[tokio::test]
    async fn test_close_video_and_clear_selection() {
        let stub = Arc::new(StubTransport::new());
        let session = session(&stub);
        session.open_video(StubTransport::clip_video());
        session.select_result(&seg("v1", 0.0, 4.0)).await.unwrap();

        session.clear_selection();
        assert!(session.state().selected_segment.is_none());
        assert!(session.state().uploaded_video.is_some());

        session.close_video();
        assert!(session.state().uploaded_video.is_none());
    }

    #[tokio::test]
    async fn test_health_and_urls() {
        let stub = Arc::new(StubTransport::new());
        let session = session(&stub);
        assert!(session.health_check().await.unwrap());
        stub.set_healthy(false);
        let err = session.health_check().await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 503, .. }));
        assert!(!session.health_status().await.unwrap().is_healthy());

        assert_eq!(
            session.frame_url("/frames/v1/a.jpg"),
            "http://localhost:8000/frames/v1/a.jpg"
        );
        assert_eq!(session.video_url("/videos/v1"), "http://localhost:8000/api/videos/v1");
    }

    #[tokio::test]
    async fn test_video_segment_leaves_state_alone() {
        let stub = Arc::new(StubTransport::new());
        let session = session(&stub);
        let info = session.video_segment(&VideoId::from("v1"), 2.0).await.unwrap();
        assert_eq!(info.start_time, 0.0);
        assert_eq!(info.end_time, 7.0);
        assert_eq!(session.state().revision, 0);
    }

    #[tokio::test]
    async fn test_refresh_library() {
        let stub = Arc::new(
            StubTransport::new().with_videos(vec![StubTransport::clip_video()]),
        );
        let session = session(&stub);
        let videos = session.refresh_library().await.unwrap();
        assert_eq!(videos.len(), 1);
    }
}
