//! Transport configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Default backend origin.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

/// Default prefix of the JSON API below the origin.
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Half-width of the playback window built around a single matched frame.
pub const DEFAULT_FRAME_PADDING_SECS: f64 = 5.0;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Raw origin serving thumbnails and media (e.g. `http://localhost:8000`)
    pub origin: String,
    /// Path prefix of the JSON endpoints
    pub api_prefix: String,
    /// Connect timeout. Whole-request timeouts are left to the caller.
    pub connect_timeout: Duration,
    /// Seconds added on each side of a frame hit when the backend returns
    /// frames instead of segments
    pub frame_padding_seconds: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            connect_timeout: Duration::from_secs(10),
            frame_padding_seconds: DEFAULT_FRAME_PADDING_SECS,
        }
    }
}

impl ClientConfig {
    /// Create a config for a specific origin, other values default.
    pub fn with_origin(origin: impl Into<String>) -> ClientResult<Self> {
        let config = Self {
            origin: origin.into(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let config = Self {
            origin: std::env::var("VSEARCH_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
            api_prefix: std::env::var("VSEARCH_API_PREFIX")
                .unwrap_or_else(|_| DEFAULT_API_PREFIX.to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("VSEARCH_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            frame_padding_seconds: std::env::var("VSEARCH_FRAME_PADDING_SECS")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(DEFAULT_FRAME_PADDING_SECS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the origin is an absolute http(s) URL.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ClientError::validation(format!("Invalid origin '{}': {}", self.origin, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::validation(format!(
                "Origin must use http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(())
    }

    /// Origin without a trailing slash.
    pub fn origin_base(&self) -> String {
        self.origin.trim_end_matches('/').to_string()
    }

    /// Base URL of the JSON API (origin + prefix).
    pub fn api_base(&self) -> String {
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            self.origin_base()
        } else {
            format!("{}/{}", self.origin_base(), prefix)
        }
    }

    /// Full URL of an API endpoint.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base(), path.trim_start_matches('/'))
    }
}
