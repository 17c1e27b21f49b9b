//! Backend health payload.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Health report returned by `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub videos_indexed: u64,
    #[serde(default)]
    pub frames_indexed: u64,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy" || self.status == "ok"
    }
}
