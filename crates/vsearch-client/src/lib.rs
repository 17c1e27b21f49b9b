//! HTTP transport for the video search backend.
//!
//! This crate provides:
//! - The `Transport` trait the session orchestrators are written against
//! - `HttpTransport`, a reqwest implementation with streamed multipart uploads
//! - Abort signals and gated progress reporting for cancellable uploads
//! - A typed error taxonomy normalized from the backend's `detail` envelope
//! - URL helpers for thumbnails and video streams

pub mod abort;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod progress;
pub mod transport;
pub mod types;
pub mod upload;
pub mod urls;


pub use abort::{AbortController, AbortSignal};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpTransport;
pub use progress::{ProgressCallback, ProgressReporter};
pub use transport::Transport;
pub use upload::{UploadFile, UploadLimits};
pub use urls::UrlResolver;
