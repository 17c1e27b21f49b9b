//! Search orchestration.

use std::sync::Arc;

use tracing::debug;
use vsearch_client::{ClientError, ClientResult, Transport};
use vsearch_models::{SearchOptions, SearchResultSegment, VideoId};

use crate::config::SessionConfig;
use crate::merge::{sort_segments, MergePolicy};

/// Runs searches and post-processes their segments.
#[derive(Clone)]
pub struct SearchOrchestrator {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    policy: MergePolicy,
}

impl SearchOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let policy = config.merge_policy();
        Self {
            transport,
            config,
            policy,
        }
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.policy
    }

    /// Search one video (`Some`) or every indexed video (`None`).
    ///
    /// Blank queries and out-of-range overrides fail with
    /// `ClientError::Validation` before any transport call. Unmerged
    /// results are merged when merging was requested; the returned list is
    /// ranked by descending score.
    pub async fn run_search(
        &self,
        video_id: Option<&VideoId>,
        query: &str,
        options: SearchOptions,
    ) -> ClientResult<Vec<SearchResultSegment>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::validation("Search query cannot be empty"));
        }

        let request = self
            .config
            .search_request(video_id.cloned(), query)
            .with_options(&options);
        request.validate().map_err(ClientError::Validation)?;

        let outcome = self.transport.search(&request).await?;
        let received = outcome.segments.len();

        let mut segments = if request.merge_segments && !outcome.merged {
            self.policy.merge(outcome.segments)
        } else {
            outcome.segments
        };
        sort_segments(&mut segments);

        debug!(
            query = %request.query,
            video_id = ?request.video_id.as_ref().map(VideoId::as_str),
            received,
            returned = segments.len(),
            "Search finished"
        );
        Ok(segments)
    }
}

impl std::fmt::Debug for SearchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchOrchestrator")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish()
    }
}
