//! Observable session state.
//!
//! `SessionStore` is the single authoritative holder of the UI-relevant
//! session: the loaded video, the upload phase and its progress, the last
//! upload failure and the selected playback segment. Every applied mutation
//! bumps `revision` and synchronously notifies the subscribers registered at
//! that moment, then returns. Callbacks run outside the state lock, so they
//! may read or mutate the store themselves.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};
use vsearch_models::{
    SelectedSegment, UploadFailure, UploadState, UploadStatus, VideoDescriptor,
};

// =============================================================================
// State
// =============================================================================

/// Snapshot of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub uploaded_video: Option<VideoDescriptor>,
    pub upload: UploadState,
    pub last_upload_error: Option<UploadFailure>,
    pub selected_segment: Option<SelectedSegment>,
    /// Incremented once per notification
    pub revision: u64,
}

impl SessionState {
    pub fn is_uploading(&self) -> bool {
        self.upload.is_uploading()
    }

    pub fn upload_progress(&self) -> f64 {
        self.upload.progress_percent
    }

    pub fn upload_status(&self) -> UploadStatus {
        self.upload.status
    }
}

/// Handle returned by `subscribe`.
pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

/// Proof that the holder started the current upload phase.
///
/// Upload transitions carrying a ticket that is no longer current are
/// ignored, so a late result from an abandoned upload cannot overwrite a
/// newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket(u64);

impl std::fmt::Display for UploadTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

struct Inner {
    state: SessionState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
    /// Generation of the most recent upload phase
    upload_generation: u64,
    /// Ticket of the orchestrated upload, if one is in progress
    active_ticket: Option<u64>,
}

// =============================================================================
// Store
// =============================================================================

/// Cloneable handle to one session's state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
    watch: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (watch, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::default(),
                listeners: Vec::new(),
                next_subscription: 1,
                upload_generation: 0,
                active_ticket: None,
            })),
            watch: Arc::new(watch),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `f` under the lock; when it reports a change, bump the revision
    /// and notify. Returns whether the state changed.
    fn mutate<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut Inner) -> bool,
    {
        let (snapshot, listeners) = {
            let mut inner = self.lock();
            let previous = inner.state.upload.status;
            if !f(&mut inner) {
                return false;
            }
            let next = inner.state.upload.status;
            debug_assert!(
                previous == next || previous.can_transition_to(next),
                "illegal upload transition {previous} -> {next}"
            );
            inner.state.revision += 1;
            let snapshot = inner.state.clone();
            // Published under the lock so the channel never goes back in time.
            self.watch.send_replace(snapshot.clone());
            let listeners: Vec<Listener> =
                inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (snapshot, listeners)
        };

        debug!(
            revision = snapshot.revision,
            status = %snapshot.upload.status,
            "Session state changed"
        );
        for listener in listeners {
            listener(&snapshot);
        }
        true
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Current state.
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Register a callback for future changes. It is not called with the
    /// current state.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner.listeners.push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(existing, _)| *existing != id);
        inner.listeners.len() != before
    }

    /// Receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.watch.subscribe()
    }

    // =========================================================================
    // Slot setters
    // =========================================================================

    /// Replace the loaded video. The selection is left alone.
    pub fn set_video(&self, video: VideoDescriptor) {
        self.mutate(|inner| {
            inner.state.uploaded_video = Some(video);
            true
        });
    }

    /// Load a video and drop a selection that belongs to another one.
    pub fn load_video(&self, video: VideoDescriptor) {
        self.mutate(|inner| {
            let stale = inner
                .state
                .selected_segment
                .as_ref()
                .is_some_and(|s| &s.video_id != video.id());
            if stale {
                inner.state.selected_segment = None;
            }
            inner.state.uploaded_video = Some(video);
            true
        });
    }

    /// Unload the video and its selection in one notification.
    pub fn clear_video(&self) {
        self.mutate(|inner| {
            if inner.state.uploaded_video.is_none() && inner.state.selected_segment.is_none() {
                return false;
            }
            inner.state.uploaded_video = None;
            inner.state.selected_segment = None;
            true
        });
    }

    /// Begin (`true`) or abandon (`false`) an upload phase directly.
    ///
    /// Beginning from a terminal status passes through Idle first.
    /// Abandoning invalidates the ticket of an orchestrated upload.
    pub fn set_uploading(&self, uploading: bool) {
        if uploading {
            self.reset_terminal();
            self.mutate(|inner| {
                if inner.state.upload.status != UploadStatus::Idle {
                    return false;
                }
                start_phase(inner);
                inner.active_ticket = None;
                true
            });
        } else {
            self.mutate(|inner| {
                if inner.state.upload.status != UploadStatus::InProgress {
                    return false;
                }
                inner.state.upload = UploadState::default();
                inner.active_ticket = None;
                true
            });
        }
    }

    /// Raise the upload progress. Ignored outside an upload, for NaN and
    /// for values not above the current one.
    pub fn update_progress(&self, percent: f64) {
        self.mutate(|inner| apply_progress(inner, percent));
    }

    /// Set or clear the selection.
    ///
    /// A segment of a video other than the loaded one is ignored. Returns
    /// whether the state changed.
    pub fn set_segment(&self, segment: Option<SelectedSegment>) -> bool {
        self.mutate(|inner| match segment {
            None => inner.state.selected_segment.take().is_some(),
            Some(segment) => {
                let loaded = inner.state.uploaded_video.as_ref().map(|v| v.id());
                if loaded != Some(&segment.video_id) {
                    warn!(
                        video_id = %segment.video_id,
                        loaded = ?loaded.map(|id| id.as_str()),
                        "Ignoring segment for a video that is not loaded"
                    );
                    return false;
                }
                inner.state.selected_segment = Some(segment);
                true
            }
        })
    }

    // =========================================================================
    // Orchestrated upload transitions
    // =========================================================================

    /// Start an upload phase unless one is in progress.
    pub fn begin_upload(&self) -> Option<UploadTicket> {
        loop {
            self.reset_terminal();

            let mut ticket = None;
            let mut busy = false;
            self.mutate(|inner| match inner.state.upload.status {
                UploadStatus::Idle => {
                    let generation = start_phase(inner);
                    inner.active_ticket = Some(generation);
                    ticket = Some(UploadTicket(generation));
                    true
                }
                UploadStatus::InProgress => {
                    busy = true;
                    false
                }
                // Another caller finished a phase in between; reset again.
                UploadStatus::Succeeded | UploadStatus::Failed => false,
            });

            if busy {
                return None;
            }
            if ticket.is_some() {
                return ticket;
            }
        }
    }

    /// Progress for the upload holding `ticket`.
    pub fn report_progress(&self, ticket: UploadTicket, percent: f64) {
        self.mutate(|inner| inner.active_ticket == Some(ticket.0) && apply_progress(inner, percent));
    }

    /// Finish an upload successfully. A selection on another video is
    /// dropped in the same notification. Returns `false` for a stale ticket.
    pub fn complete_upload(&self, ticket: UploadTicket, video: VideoDescriptor) -> bool {
        self.mutate(|inner| {
            if inner.active_ticket != Some(ticket.0) {
                return false;
            }
            let stale = inner
                .state
                .selected_segment
                .as_ref()
                .is_some_and(|s| &s.video_id != video.id());
            if stale {
                inner.state.selected_segment = None;
            }
            inner.state.uploaded_video = Some(video);
            inner.state.upload = UploadState {
                status: UploadStatus::Succeeded,
                progress_percent: 100.0,
            };
            inner.active_ticket = None;
            true
        })
    }

    /// Fail an upload. The loaded video is left unchanged. Returns `false`
    /// for a stale ticket.
    pub fn fail_upload(&self, ticket: UploadTicket, failure: UploadFailure) -> bool {
        self.mutate(|inner| {
            if inner.active_ticket != Some(ticket.0) {
                return false;
            }
            inner.state.upload.status = UploadStatus::Failed;
            inner.state.last_upload_error = Some(failure);
            inner.active_ticket = None;
            true
        })
    }

    /// Terminal -> Idle, as its own notification.
    fn reset_terminal(&self) {
        self.mutate(|inner| {
            if !inner.state.upload.status.is_terminal() {
                return false;
            }
            inner.state.upload = UploadState::default();
            true
        });
    }
}

fn start_phase(inner: &mut Inner) -> u64 {
    inner.upload_generation += 1;
    inner.state.upload = UploadState {
        status: UploadStatus::InProgress,
        progress_percent: 0.0,
    };
    inner.state.last_upload_error = None;
    inner.upload_generation
}

fn apply_progress(inner: &mut Inner, percent: f64) -> bool {
    if inner.state.upload.status != UploadStatus::InProgress || percent.is_nan() {
        return false;
    }
    let percent = percent.clamp(0.0, 100.0);
    if percent <= inner.state.upload.progress_percent {
        return false;
    }
    inner.state.upload.progress_percent = percent;
    true
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("SessionStore")
            .field("state", &inner.state)
            .field("subscribers", &inner.listeners.len())
            .finish()
    }
}
