//! reqwest implementation of the backend transport.
//!
//! - Streamed multipart uploads with byte-level progress
//! - Cancellation through `AbortSignal`
//! - Error bodies normalized from the backend's `detail` field
//! - Observability (tracing spans, metrics)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use vsearch_models::{HealthStatus, SearchOutcome, SearchRequest, SegmentInfo, VideoDescriptor, VideoId};

use crate::abort::AbortSignal;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::metrics::record_request;
use crate::progress::ProgressReporter;
use crate::transport::Transport;
use crate::types::{error_message, parse_video_list, SearchResponse, SegmentRequest, UploadPayload};
use crate::upload::UploadFile;
use crate::urls::UrlResolver;

/// Size of the body chunks handed to the connection during uploads.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

// =============================================================================
// Client
// =============================================================================

/// HTTP transport for the video search backend.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    config: ClientConfig,
    urls: UrlResolver,
}

impl HttpTransport {
    /// Create a new transport.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vsearch-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Network)?;

        let urls = UrlResolver::new(&config);
        Ok(Self { http, config, urls })
    }

    /// Create a transport from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn urls(&self) -> &UrlResolver {
        &self.urls
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        video_id: Option<&str>,
        fut: F,
    ) -> ClientResult<T>
    where
        F: std::future::Future<Output = ClientResult<T>>,
    {
        let span = if let Some(id) = video_id {
            info_span!("vsearch_request", operation = %operation, video_id = %id)
        } else {
            info_span!("vsearch_request", operation = %operation)
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => "ok".to_string(),
            Err(e) => e
                .http_status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| e.kind().as_str().to_string()),
        };
        record_request(operation, &status, latency_ms);

        result
    }

    /// Read a response body, turning non-2xx statuses into `Server` errors.
    async fn success_body(
        response: Response,
        fallback: impl FnOnce(StatusCode) -> String,
    ) -> ClientResult<String> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body, || fallback(status));
            debug!(status = status.as_u16(), message = %message, "Backend returned error");
            return Err(ClientError::from_http_status(status.as_u16(), message));
        }
        Ok(response.text().await?)
    }
}

/// Split an upload into chunks, reporting each chunk's size as the
/// connection pulls it.
fn chunked_body(data: Vec<u8>, sent: mpsc::UnboundedSender<u64>) -> Body {
    let len = data.len();
    let stream = futures::stream::iter((0..len).step_by(UPLOAD_CHUNK_SIZE)).map(move |start| {
        let end = (start + UPLOAD_CHUNK_SIZE).min(len);
        let chunk = data[start..end].to_vec();
        let _ = sent.send(chunk.len() as u64);
        Ok::<Vec<u8>, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}

fn upload_fallback(status: StatusCode) -> String {
    format!(
        "Upload failed: {}",
        status.canonical_reason().unwrap_or("Unknown error")
    )
}

// =============================================================================
// Transport
// =============================================================================

#[async_trait]
impl Transport for HttpTransport {
    async fn upload_asset(
        &self,
        file: UploadFile,
        progress: ProgressReporter,
        signal: AbortSignal,
    ) -> ClientResult<VideoDescriptor> {
        if signal.is_aborted() {
            progress.finish();
            return Err(ClientError::Aborted);
        }

        let url = self.config.endpoint("upload");
        let UploadFile {
            file_name,
            content_type,
            data,
        } = file;
        let total = data.len() as u64;
        info!(file_name = %file_name, bytes = total, "Uploading video");

        let result = self
            .execute_request("upload_asset", None, async {
                let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
                let part = Part::stream_with_length(chunked_body(data, tx), total)
                    .file_name(file_name.clone())
                    .mime_str(&content_type)?;
                let form = Form::new().part("file", part);

                let send = self.http.post(&url).multipart(form).send();
                tokio::pin!(send);

                let mut sent = 0u64;
                let response = loop {
                    tokio::select! {
                        biased;
                        _ = signal.aborted() => return Err(ClientError::Aborted),
                        Some(bytes) = rx.recv() => {
                            sent += bytes;
                            progress.report_bytes(sent, Some(total));
                        }
                        response = &mut send => break response?,
                    }
                };

                while let Ok(bytes) = rx.try_recv() {
                    sent += bytes;
                    progress.report_bytes(sent, Some(total));
                }

                let body = tokio::select! {
                    biased;
                    _ = signal.aborted() => return Err(ClientError::Aborted),
                    body = Self::success_body(response, upload_fallback) => body?,
                };

                let payload: UploadPayload = serde_json::from_str(&body).map_err(|e| {
                    ClientError::protocol(format!("Unexpected upload response: {}", e))
                })?;
                payload.into_descriptor(&file_name)
            })
            .await;

        progress.finish();

        match &result {
            Ok(video) => info!(video_id = %video.id(), "Upload accepted"),
            Err(ClientError::Aborted) => info!(file_name = %file_name, "Upload aborted"),
            Err(e) => warn!(file_name = %file_name, error = %e, "Upload failed"),
        }
        result
    }

    async fn search(&self, request: &SearchRequest) -> ClientResult<SearchOutcome> {
        let url = self.config.endpoint("search");
        let video_id = request.video_id.as_ref().map(VideoId::as_str);

        self.execute_request("search", video_id, async {
            debug!(query = %request.query, k = request.k, "Searching");
            let response = self.http.post(&url).json(request).send().await?;
            let body = Self::success_body(response, |_| "Search failed".to_string()).await?;

            let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
                ClientError::protocol(format!("Unexpected search response: {}", e))
            })?;
            let outcome = parsed.into_outcome(self.config.frame_padding_seconds);
            debug!(
                segments = outcome.segments.len(),
                merged = outcome.merged,
                "Search returned"
            );
            Ok(outcome)
        })
        .await
    }

    async fn get_video_segment(
        &self,
        video_id: &VideoId,
        timestamp: f64,
    ) -> ClientResult<SegmentInfo> {
        let url = self.config.endpoint("video-segment");
        let body = SegmentRequest {
            video_id: video_id.as_str(),
            timestamp,
        };

        self.execute_request("get_video_segment", Some(video_id.as_str()), async {
            let response = self.http.post(&url).json(&body).send().await?;
            let text =
                Self::success_body(response, |_| "Failed to get video segment".to_string())
                    .await?;

            serde_json::from_str::<SegmentInfo>(&text).map_err(|e| {
                ClientError::protocol(format!("Unexpected video segment response: {}", e))
            })
        })
        .await
    }

    async fn health_check(&self) -> ClientResult<bool> {
        let url = self.config.endpoint("health");

        self.execute_request("health_check", None, async {
            let response = self.http.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                debug!(status = status.as_u16(), "Health check failed");
                return Err(ClientError::from_http_status(
                    status.as_u16(),
                    "Health check failed",
                ));
            }
            Ok(true)
        })
        .await
    }

    async fn health_status(&self) -> ClientResult<HealthStatus> {
        let url = self.config.endpoint("health");

        self.execute_request("health_status", None, async {
            let response = self.http.get(&url).send().await?;
            let body = Self::success_body(response, |_| "Health check failed".to_string()).await?;

            serde_json::from_str::<HealthStatus>(&body).map_err(|e| {
                ClientError::protocol(format!("Unexpected health response: {}", e))
            })
        })
        .await
    }

    async fn list_videos(&self) -> ClientResult<Vec<VideoDescriptor>> {
        let url = self.config.endpoint("videos");

        self.execute_request("list_videos", None, async {
            let response = self.http.get(&url).send().await?;
            let body =
                Self::success_body(response, |_| "Failed to fetch videos".to_string()).await?;

            let videos = match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(value) => parse_video_list(&value),
                Err(e) => {
                    warn!(error = %e, "Video list response is not JSON");
                    Vec::new()
                }
            };
            debug!(count = videos.len(), "Listed videos");
            Ok(videos)
        })
        .await
    }
}
