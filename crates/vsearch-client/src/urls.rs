//! URL helpers for backend-relative media paths.
//!
//! Thumbnails are served from the raw origin while video streams live under
//! the API prefix, so the two helpers resolve against different bases.

use crate::config::ClientConfig;

/// Resolves backend-relative paths into absolute URLs.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    origin_base: String,
    api_base: String,
}

impl UrlResolver {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            origin_base: config.origin_base(),
            api_base: config.api_base(),
        }
    }

    /// Absolute URL of a frame thumbnail.
    pub fn frame_url(&self, path: &str) -> String {
        join(&self.origin_base, path)
    }

    /// Absolute URL of a video stream.
    pub fn video_url(&self, path: &str) -> String {
        join(&self.api_base, path)
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

fn join(base: &str, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path)
    }
}
