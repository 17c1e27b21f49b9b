//! Upload progress reporting.
//!
//! A `ProgressReporter` wraps the caller's callback and enforces the
//! delivery rules every transport must follow: values are clamped into
//! [0, 100], never decrease, stop once the reporter is finished, and stop
//! once the associated abort signal fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::abort::AbortSignal;

/// Callback receiving upload progress percentages.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

struct ReporterInner {
    callback: Option<ProgressCallback>,
    signal: AbortSignal,
    last: Mutex<Option<f64>>,
    finished: AtomicBool,
}

/// Monotonic, abort-gated progress sink for one upload.
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<ReporterInner>,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback, signal: AbortSignal) -> Self {
        Self::build(Some(callback), signal)
    }

    /// A reporter with no callback attached.
    pub fn silent() -> Self {
        Self::build(None, AbortSignal::never())
    }

    fn build(callback: Option<ProgressCallback>, signal: AbortSignal) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                callback,
                signal,
                last: Mutex::new(None),
                finished: AtomicBool::new(false),
            }),
        }
    }

    /// Report a percentage. Returns whether the callback was invoked.
    pub fn report(&self, percent: f64) -> bool {
        let Some(callback) = &self.inner.callback else {
            return false;
        };
        if percent.is_nan() || self.is_finished() || self.inner.signal.is_aborted() {
            return false;
        }

        let percent = percent.clamp(0.0, 100.0);
        {
            let mut last = self.inner.last.lock().unwrap_or_else(|p| p.into_inner());
            if matches!(*last, Some(prev) if percent < prev) {
                return false;
            }
            *last = Some(percent);
        }

        self.inner.signal.deliver(|| {
            if !self.is_finished() {
                callback(percent);
            }
        })
    }

    /// Report byte counts. Nothing is reported when the total is unknown.
    pub fn report_bytes(&self, sent: u64, total: Option<u64>) -> bool {
        match total {
            Some(total) if total > 0 => {
                let percent = (sent.min(total) as f64 / total as f64) * 100.0;
                self.report(percent)
            }
            _ => false,
        }
    }

    /// Close the reporter; later reports are dropped.
    pub fn finish(&self) {
        self.inner.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// Last percentage accepted, if any.
    pub fn last_reported(&self) -> Option<f64> {
        *self.inner.last.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.inner.callback.is_some())
            .field("last", &self.last_reported())
            .field("finished", &self.is_finished())
            .finish()
    }
}
