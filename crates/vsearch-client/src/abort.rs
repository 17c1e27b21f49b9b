//! Cooperative cancellation for in-flight transport calls.
//!
//! An `AbortController` owns the right to cancel; any number of
//! `AbortSignal`s observe it. Besides the async `aborted()` wait used by
//! the transport, the signal gates progress delivery: once `abort()` has
//! returned, no progress callback starts, and a callback already running
//! on another thread has finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use tokio::sync::watch;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
struct AbortState {
    aborted: AtomicBool,
    notify: watch::Sender<bool>,
    /// Held for the duration of a progress callback.
    delivery: Mutex<()>,
    /// Thread currently running a progress callback.
    deliverer: Mutex<Option<ThreadId>>,
}

impl AbortState {
    fn new() -> Self {
        let (notify, _) = watch::channel(false);
        Self {
            aborted: AtomicBool::new(false),
            notify,
            delivery: Mutex::new(()),
            deliverer: Mutex::new(None),
        }
    }
}

/// Cancels the calls observing its signals.
#[derive(Debug, Clone)]
pub struct AbortController {
    state: Arc<AbortState>,
}

impl AbortController {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AbortState::new()),
        }
    }

    /// A signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            state: Arc::clone(&self.state),
        }
    }

    /// Abort every call observing this controller. Idempotent.
    ///
    /// Returns `true` on the first call only.
    pub fn abort(&self) -> bool {
        if self.state.aborted.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.state.notify.send_replace(true);

        // Wait out a callback running elsewhere; skip when called from inside one.
        let current = thread::current().id();
        let delivering_here = *lock(&self.state.deliverer) == Some(current);
        if !delivering_here {
            drop(lock(&self.state.delivery));
        }
        true
    }

    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::SeqCst)
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of an `AbortController`.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    state: Arc<AbortState>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        AbortController::new().signal()
    }

    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::SeqCst)
    }

    /// Resolve once the controller aborts. Pending forever otherwise.
    pub async fn aborted(&self) {
        let mut rx = self.state.notify.subscribe();
        loop {
            if *rx.borrow_and_update() || self.is_aborted() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `f` unless the signal has fired. Returns whether `f` ran.
    pub(crate) fn deliver<F: FnOnce()>(&self, f: F) -> bool {
        let _delivery = lock(&self.state.delivery);
        if self.is_aborted() {
            return false;
        }

        *lock(&self.state.deliverer) = Some(thread::current().id());
        let _reset = DelivererReset(&self.state);
        f();
        true
    }
}

/// Clears the deliverer marker even if a callback panics.
struct DelivererReset<'a>(&'a AbortState);

impl Drop for DelivererReset<'_> {
    fn drop(&mut self) {
        *lock(&self.0.deliverer) = None;
    }
}
