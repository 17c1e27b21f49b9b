//! Upload orchestration.
//!
//! Drives one upload at a time against the store: validates the file,
//! opens a ticketed upload phase, relays transport progress into the store
//! and records the outcome. `cancel_upload` aborts the transport call and
//! fails the phase before returning.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::Instrument;
use vsearch_client::metrics::record_upload;
use vsearch_client::{
    AbortController, ClientError, ClientResult, ProgressReporter, Transport, UploadFile,
    UploadLimits,
};
use vsearch_models::{UploadFailure, VideoDescriptor};

use crate::logging::UploadLogger;
use crate::store::{SessionStore, UploadTicket};

/// The upload slot. `ticket` is `None` between reserving the slot and
/// opening the store phase.
struct ActiveUpload {
    ticket: Option<UploadTicket>,
    controller: AbortController,
}

/// Coordinates uploads between the transport and the store.
#[derive(Clone)]
pub struct UploadOrchestrator {
    store: SessionStore,
    transport: Arc<dyn Transport>,
    limits: UploadLimits,
    active: Arc<Mutex<Option<ActiveUpload>>>,
}

impl UploadOrchestrator {
    pub fn new(store: SessionStore, transport: Arc<dyn Transport>, limits: UploadLimits) -> Self {
        Self {
            store,
            transport,
            limits,
            active: Arc::new(Mutex::new(None)),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveUpload>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the active upload if it still belongs to `ticket`.
    fn release(&self, ticket: UploadTicket) -> Option<AbortController> {
        let mut active = self.active();
        match active.as_ref() {
            Some(upload) if upload.ticket == Some(ticket) => active.take().map(|u| u.controller),
            _ => None,
        }
    }

    /// Whether an upload started here is still outstanding.
    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    /// Reserve the upload slot, or fail when another upload holds it.
    fn reserve(&self) -> ClientResult<AbortController> {
        let mut active = self.active();
        if active.is_some() || self.store.snapshot().is_uploading() {
            return Err(busy());
        }
        let controller = AbortController::new();
        *active = Some(ActiveUpload {
            ticket: None,
            controller: controller.clone(),
        });
        Ok(controller)
    }

    /// Attach the store ticket to the reserved slot. Fails when the slot was
    /// cancelled while the phase was opening.
    fn attach(&self, ticket: UploadTicket) -> bool {
        match self.active().as_mut() {
            Some(upload) => {
                upload.ticket = Some(ticket);
                true
            }
            None => false,
        }
    }

    /// Upload `file` and store the resulting video.
    ///
    /// Fails with `ClientError::Validation`, leaving the state untouched,
    /// when an upload started here is still outstanding, the store shows an
    /// upload in progress, or the file breaks the limits. The slot stays
    /// taken until the transport call returns, even if the store phase was
    /// abandoned with `set_uploading(false)` in the meantime.
    pub async fn start_upload(&self, file: UploadFile) -> ClientResult<VideoDescriptor> {
        file.validate(&self.limits)?;
        let controller = self.reserve()?;

        let Some(ticket) = self.store.begin_upload() else {
            self.active().take();
            return Err(busy());
        };
        if !self.attach(ticket) {
            self.store.fail_upload(ticket, UploadFailure::aborted());
            record_upload("aborted");
            return Err(ClientError::Aborted);
        }

        let mut guard = CancelOnDrop {
            orchestrator: self,
            ticket,
            armed: true,
        };

        let logger = UploadLogger::new(&file.file_name, ticket, file.len());
        logger.log_start();

        let reporter = {
            let store = self.store.clone();
            let logger = logger.clone();
            ProgressReporter::new(
                Arc::new(move |percent| {
                    let previous = store.snapshot().upload_progress();
                    store.report_progress(ticket, percent);
                    logger.log_progress(previous, percent);
                }),
                controller.signal(),
            )
        };

        let result = self
            .transport
            .upload_asset(file, reporter.clone(), controller.signal())
            .instrument(logger.create_span())
            .await;
        reporter.finish();
        guard.armed = false;

        let cancelled = self.release(ticket).is_none() || controller.is_aborted();
        match result {
            _ if cancelled => {
                self.store.fail_upload(ticket, UploadFailure::aborted());
                logger.log_warning("cancelled");
                record_upload("aborted");
                Err(ClientError::Aborted)
            }
            Ok(video) => {
                if !self.store.complete_upload(ticket, video.clone()) {
                    logger.log_warning("upload phase was abandoned; result discarded");
                    record_upload("abandoned");
                    return Err(ClientError::Aborted);
                }
                logger.log_completion(video.id().as_str());
                record_upload("succeeded");
                Ok(video)
            }
            Err(e) => {
                self.store.fail_upload(ticket, e.to_failure());
                logger.log_error(&e.to_string());
                record_upload(if e.is_aborted() { "aborted" } else { "failed" });
                Err(e)
            }
        }
    }

    /// Abort the outstanding upload. Once this returns, the store shows
    /// `Failed` with an aborted failure and no further progress arrives.
    /// Returns `false` when there was nothing to cancel.
    pub fn cancel_upload(&self) -> bool {
        let upload = self.active().take();
        match upload {
            Some(upload) => {
                upload.controller.abort();
                if let Some(ticket) = upload.ticket {
                    self.store.fail_upload(ticket, UploadFailure::aborted());
                }
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("limits", &self.limits)
            .field("active", &self.is_active())
            .finish()
    }
}

fn busy() -> ClientError {
    ClientError::validation("An upload is already in progress")
}

/// Cancels the upload when `start_upload` is dropped mid-flight.
struct CancelOnDrop<'a> {
    orchestrator: &'a UploadOrchestrator,
    ticket: UploadTicket,
    armed: bool,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(controller) = self.orchestrator.release(self.ticket) {
            controller.abort();
            self.orchestrator
                .store
                .fail_upload(self.ticket, UploadFailure::aborted());
        }
    }
}
