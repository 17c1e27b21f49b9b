//! In-memory transport for orchestrator tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;
use vsearch_client::{
    AbortSignal, ClientError, ClientResult, ProgressReporter, Transport, UploadFile,
};
use vsearch_models::{
    HealthStatus, SearchOutcome, SearchRequest, SegmentInfo, VideoDescriptor, VideoId,
};

/// How the stub answers uploads.
#[derive(Debug, Clone)]
pub enum UploadBehavior {
    /// Report each progress value, then return the video
    Succeed {
        progress: Vec<f64>,
        video: VideoDescriptor,
    },
    /// Fail with a server error
    Fail { status: u16, message: String },
    /// Wait until the signal fires
    Hang,
    /// Wait for `release_upload`, then succeed even if aborted
    IgnoreAbort { video: VideoDescriptor },
}

/// How the stub answers searches.
#[derive(Debug, Clone)]
pub enum SearchBehavior {
    Outcome(SearchOutcome),
    Fail { status: u16, message: String },
}

pub struct StubTransport {
    upload: Mutex<UploadBehavior>,
    search: Mutex<SearchBehavior>,
    segment_padding: f64,
    videos: Mutex<Vec<VideoDescriptor>>,
    healthy: AtomicBool,
    upload_calls: AtomicUsize,
    search_calls: AtomicUsize,
    segment_calls: AtomicUsize,
    last_search: Mutex<Option<SearchRequest>>,
    reporter: Mutex<Option<ProgressReporter>>,
    started: Notify,
    release: Notify,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            upload: Mutex::new(UploadBehavior::Succeed {
                progress: Vec::new(),
                video: Self::clip_video(),
            }),
            search: Mutex::new(SearchBehavior::Outcome(SearchOutcome::default())),
            segment_padding: 5.0,
            videos: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
            upload_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            segment_calls: AtomicUsize::new(0),
            last_search: Mutex::new(None),
            reporter: Mutex::new(None),
            started: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn clip_video() -> VideoDescriptor {
        VideoDescriptor::new("v1", "clip.mp4", 12.0, "/media/v1.mp4")
    }

    pub fn with_upload(self, behavior: UploadBehavior) -> Self {
        self.set_upload(behavior);
        self
    }

    pub fn with_search(self, behavior: SearchBehavior) -> Self {
        *self.search.lock().unwrap() = behavior;
        self
    }

    pub fn with_videos(self, videos: Vec<VideoDescriptor>) -> Self {
        *self.videos.lock().unwrap() = videos;
        self
    }

    pub fn set_upload(&self, behavior: UploadBehavior) {
        *self.upload.lock().unwrap() = behavior;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn segment_calls(&self) -> usize {
        self.segment_calls.load(Ordering::SeqCst)
    }

    pub fn last_search(&self) -> Option<SearchRequest> {
        self.last_search.lock().unwrap().clone()
    }

    /// Wait until an upload call has started.
    pub async fn wait_for_upload(&self) {
        self.started.notified().await;
    }

    /// Let an `IgnoreAbort` upload finish.
    pub fn release_upload(&self) {
        self.release.notify_one();
    }

    /// Push progress through the reporter of the running upload.
    pub fn emit_progress(&self, percent: f64) -> bool {
        match self.reporter.lock().unwrap().as_ref() {
            Some(reporter) => reporter.report(percent),
            None => false,
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn upload_asset(
        &self,
        _file: UploadFile,
        progress: ProgressReporter,
        signal: AbortSignal,
    ) -> ClientResult<VideoDescriptor> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        *self.reporter.lock().unwrap() = Some(progress.clone());
        let behavior = self.upload.lock().unwrap().clone();
        self.started.notify_one();

        match behavior {
            UploadBehavior::Succeed { progress: steps, video } => {
                for step in steps {
                    progress.report(step);
                }
                Ok(video)
            }
            UploadBehavior::Fail { status, message } => {
                Err(ClientError::from_http_status(status, message))
            }
            UploadBehavior::Hang => {
                signal.aborted().await;
                Err(ClientError::Aborted)
            }
            UploadBehavior::IgnoreAbort { video } => {
                self.release.notified().await;
                Ok(video)
            }
        }
    }

    async fn search(&self, request: &SearchRequest) -> ClientResult<SearchOutcome> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_search.lock().unwrap() = Some(request.clone());
        match self.search.lock().unwrap().clone() {
            SearchBehavior::Outcome(outcome) => Ok(outcome),
            SearchBehavior::Fail { status, message } => {
                Err(ClientError::from_http_status(status, message))
            }
        }
    }

    async fn get_video_segment(
        &self,
        video_id: &VideoId,
        timestamp: f64,
    ) -> ClientResult<SegmentInfo> {
        self.segment_calls.fetch_add(1, Ordering::SeqCst);
        if video_id.as_str() == "missing" {
            return Err(ClientError::from_http_status(404, "Video not found"));
        }
        let start = (timestamp - self.segment_padding).max(0.0);
        let end = timestamp + self.segment_padding;
        Ok(SegmentInfo {
            video_id: video_id.clone(),
            video_url: format!("/videos/{}", video_id),
            start_time: start,
            end_time: end,
            duration: end - start,
            center_timestamp: timestamp,
        })
    }

    async fn health_check(&self) -> ClientResult<bool> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(ClientError::from_http_status(503, "Health check failed"))
        }
    }

    async fn health_status(&self) -> ClientResult<HealthStatus> {
        Ok(HealthStatus {
            status: if self.healthy.load(Ordering::SeqCst) {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            videos_indexed: self.videos.lock().unwrap().len() as u64,
            frames_indexed: 0,
        })
    }

    async fn list_videos(&self) -> ClientResult<Vec<VideoDescriptor>> {
        Ok(self.videos.lock().unwrap().clone())
    }
}
