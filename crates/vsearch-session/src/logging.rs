//! Structured upload logging.
//!
//! Logs the upload lifecycle with the same fields on every event, so one
//! upload can be followed through the log stream.

use tracing::{error, info, warn, Span};

use crate::store::UploadTicket;

/// Progress milestones worth an info line.
const PROGRESS_STEP: f64 = 25.0;

/// Upload logger with consistent fields (file name, ticket, size).
#[derive(Debug, Clone)]
pub struct UploadLogger {
    file_name: String,
    ticket: String,
    bytes: u64,
}

impl UploadLogger {
    pub fn new(file_name: &str, ticket: UploadTicket, bytes: u64) -> Self {
        Self {
            file_name: file_name.to_string(),
            ticket: ticket.to_string(),
            bytes,
        }
    }

    pub fn log_start(&self) {
        info!(
            file_name = %self.file_name,
            ticket = %self.ticket,
            bytes = self.bytes,
            "Upload started"
        );
    }

    /// Log when `percent` crosses a milestone above `previous`.
    pub fn log_progress(&self, previous: f64, percent: f64) {
        let crossed = (percent / PROGRESS_STEP).floor() > (previous / PROGRESS_STEP).floor();
        if crossed {
            info!(
                file_name = %self.file_name,
                ticket = %self.ticket,
                percent = percent.round(),
                "Upload progress"
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            file_name = %self.file_name,
            ticket = %self.ticket,
            "Upload warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            file_name = %self.file_name,
            ticket = %self.ticket,
            "Upload error: {}", message
        );
    }

    pub fn log_completion(&self, video_id: &str) {
        info!(
            file_name = %self.file_name,
            ticket = %self.ticket,
            video_id = %video_id,
            "Upload completed"
        );
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Span wrapping the whole upload.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "upload",
            file_name = %self.file_name,
            ticket = %self.ticket
        )
    }
}
