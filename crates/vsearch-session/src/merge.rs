//! Segment merge policy for search results.
//!
//! Segments of the same video whose ranges overlap, or whose gap is
//! strictly smaller than `gap_seconds`, are coalesced into one segment
//! spanning both. The merged segment keeps the best score and that
//! segment's thumbnail, and sums the frame counts. The result does not
//! depend on input order, and merging a merged list changes nothing.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use vsearch_models::{SearchResultSegment, VideoId};

/// Default merge gap in seconds.
pub const DEFAULT_MERGE_GAP_SECS: f64 = 1.0;

/// Configurable coalescing of adjacent search segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergePolicy {
    pub gap_seconds: f64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            gap_seconds: DEFAULT_MERGE_GAP_SECS,
        }
    }
}

impl MergePolicy {
    pub fn new(gap_seconds: f64) -> Self {
        let gap_seconds = if gap_seconds.is_finite() {
            gap_seconds.max(0.0)
        } else {
            DEFAULT_MERGE_GAP_SECS
        };
        Self { gap_seconds }
    }

    /// Whether `next` (starting at or after `current`) joins `current`.
    fn joins(&self, current: &SearchResultSegment, next: &SearchResultSegment) -> bool {
        let gap = next.start_timestamp - current.end_timestamp;
        gap <= 0.0 || gap < self.gap_seconds
    }

    /// Merge segments, returning them ranked by `sort_segments`.
    pub fn merge(&self, segments: Vec<SearchResultSegment>) -> Vec<SearchResultSegment> {
        let mut by_video: BTreeMap<VideoId, Vec<SearchResultSegment>> = BTreeMap::new();
        for segment in segments {
            by_video
                .entry(segment.video_id.clone())
                .or_default()
                .push(segment);
        }

        let mut merged = Vec::new();
        for (_, mut group) in by_video {
            group.sort_by(|a, b| {
                a.start_timestamp
                    .total_cmp(&b.start_timestamp)
                    .then(a.end_timestamp.total_cmp(&b.end_timestamp))
            });

            let mut iter = group.into_iter();
            let Some(mut current) = iter.next() else {
                continue;
            };
            for next in iter {
                if self.joins(&current, &next) {
                    absorb(&mut current, next);
                } else {
                    merged.push(std::mem::replace(&mut current, next));
                }
            }
            merged.push(current);
        }

        sort_segments(&mut merged);
        merged
    }
}

fn absorb(current: &mut SearchResultSegment, next: SearchResultSegment) {
    current.end_timestamp = current.end_timestamp.max(next.end_timestamp);
    current.frame_count = current.frame_count.saturating_add(next.frame_count);

    let better = match next.score.total_cmp(&current.score) {
        Ordering::Greater => true,
        Ordering::Equal => next.thumbnail_ref < current.thumbnail_ref,
        Ordering::Less => false,
    };
    if better {
        current.score = next.score;
        current.thumbnail_ref = next.thumbnail_ref;
    }
}

/// Rank by descending score, then ascending start, then video id.
pub fn sort_segments(segments: &mut [SearchResultSegment]) {
    segments.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.start_timestamp.total_cmp(&b.start_timestamp))
            .then_with(|| a.video_id.cmp(&b.video_id))
            .then(a.end_timestamp.total_cmp(&b.end_timestamp))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(video: &str, start: f64, end: f64, score: f64) -> SearchResultSegment {
        SearchResultSegment::new(video, start, end, score, format!("/frames/{video}/{start}.jpg"))
    }

    fn ranges(segments: &[SearchResultSegment]) -> Vec<(String, f64, f64)> {
        let mut out: Vec<_> = segments
            .iter()
            .map(|s| (s.video_id.to_string(), s.start_timestamp, s.end_timestamp))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        out
    }

    #[test]
    fn test_overlapping_segments_merge() {
        let merged = MergePolicy::default().merge(vec![seg("vid1", 0.0, 5.0, 0.8), seg("vid1", 4.0, 9.0, 0.6)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start_timestamp, 0.0);
        assert_eq!(merged[0].end_timestamp, 9.0);
        assert_eq!(merged[0].score, 0.8);
        assert_eq!(merged[0].thumbnail_ref, "/frames/vid1/0.jpg");
        assert_eq!(merged[0].frame_count, 2);
    }

    #[test]
    fn test_gap_threshold_is_strict() {
        let policy = MergePolicy::new(1.0);
        let close = policy.merge(vec![seg("v", 0.0, 5.0, 0.5), seg("v", 5.5, 8.0, 0.4)]);
        assert_eq!(close.len(), 1);

        let exact = policy.merge(vec![seg("v", 0.0, 5.0, 0.5), seg("v", 6.0, 8.0, 0.4)]);
        assert_eq!(exact.len(), 2);

        let touching = MergePolicy::new(0.0).merge(vec![seg("v", 0.0, 5.0, 0.5), seg("v", 5.0, 8.0, 0.4)]);
        assert_eq!(touching.len(), 1);
    }

    #[test]
    fn test_different_videos_never_merge() {
        let merged = MergePolicy::default().merge(vec![seg("a", 0.0, 5.0, 0.5), seg("b", 1.0, 4.0, 0.9)]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].video_id.as_str(), "b");
    }

    #[test]
    fn test_best_thumbnail_follows_best_score() {
        let merged = MergePolicy::default().merge(vec![seg("v", 0.0, 5.0, 0.3), seg("v", 2.0, 6.0, 0.9)]);
        assert_eq!(merged[0].score, 0.9);
        assert_eq!(merged[0].thumbnail_ref, "/frames/v/2.jpg");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let policy = MergePolicy::default();
        let input = vec![
            seg("v", 10.0, 20.0, 0.2),
            seg("v", 0.0, 5.0, 0.8),
            seg("v", 4.0, 9.0, 0.6),
            seg("v", 30.0, 31.0, 0.1),
            seg("w", 9.5, 12.0, 0.7),
        ];
        let once = policy.merge(input);
        let twice = policy.merge(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let policy = MergePolicy::default();
        let input = vec![
            seg("v", 0.0, 5.0, 0.8),
            seg("v", 4.0, 9.0, 0.6),
            seg("v", 9.5, 12.0, 0.6),
            seg("v", 40.0, 45.0, 0.3),
        ];
        let mut reversed = input.clone();
        reversed.reverse();

        let a = policy.merge(input);
        let b = policy.merge(reversed);
        assert_eq!(ranges(&a), ranges(&b));
        assert_eq!(a, b);
        assert_eq!(a[0].end_timestamp, 12.0);
        assert_eq!(a[0].frame_count, 3);
    }

    #[test]
    fn test_sort_ties_by_start() {
        let mut segments = vec![seg("v", 20.0, 25.0, 0.5), seg("v", 5.0, 8.0, 0.5), seg("v", 0.0, 2.0, 0.9)];
        sort_segments(&mut segments);
        let starts: Vec<f64> = segments.iter().map(|s| s.start_timestamp).collect();
        assert_eq!(starts, vec![0.0, 5.0, 20.0]);
    }

    #[test]
    fn test_invalid_gap_falls_back() {
        assert_eq!(MergePolicy::new(f64::NAN).gap_seconds, DEFAULT_MERGE_GAP_SECS);
        assert_eq!(MergePolicy::new(-3.0).gap_seconds, 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(MergePolicy::default().merge(Vec::new()).is_empty());
    }
}
