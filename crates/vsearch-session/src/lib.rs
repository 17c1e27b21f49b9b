//! Session state and orchestration for the video search client.
//!
//! This crate provides:
//! - `SessionStore`, the observable state container
//! - `UploadOrchestrator`, one cancellable upload at a time
//! - `SearchOrchestrator` and the segment `MergePolicy`
//! - `VideoSession`, a facade bundling all of the above
//! - `UploadLogger` for structured upload lifecycle logs

pub mod config;
pub mod logging;
pub mod merge;
pub mod search;
pub mod session;
pub mod store;
pub mod upload;

#[cfg(test)]
mod testing;

pub use config::SessionConfig;
pub use logging::UploadLogger;
pub use merge::{sort_segments, MergePolicy, DEFAULT_MERGE_GAP_SECS};
pub use search::SearchOrchestrator;
pub use session::VideoSession;
pub use store::{SessionState, SessionStore, SubscriptionId, UploadTicket};
pub use upload::UploadOrchestrator;
