//! Merge policies for segment management.
//!
//! Every flush adds a segment, so sync-mode indexing would otherwise grow
//! one segment per write. After each flush the writer asks its policy for
//! segments to merge until the policy is satisfied.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::index::manifest::SegmentMeta;

/// Trait for defining merge policies.
pub trait MergePolicy: Send + Sync + Debug {
    /// Positions (in manifest order) of segments to merge into one, if any.
    fn select_merge(&self, segments: &[SegmentMeta]) -> Option<Vec<usize>>;
}

/// Groups segments into levels by live document count on a logarithmic
/// scale and merges `merge_factor` segments of the lowest full level.
#[derive(Debug, Clone)]
pub struct LogMergePolicy {
    /// Segments per level that trigger a merge; also the level base.
    pub merge_factor: usize,
    /// Segments smaller than this all share the lowest level.
    pub min_merge_docs: u32,
}

impl Default for LogMergePolicy {
    fn default() -> Self {
        LogMergePolicy {
            merge_factor: 10,
            min_merge_docs: 10,
        }
    }
}

impl LogMergePolicy {
    /// Create a policy with the given merge factor.
    pub fn new(merge_factor: usize) -> Self {
        LogMergePolicy {
            merge_factor: merge_factor.max(2),
            ..Default::default()
        }
    }

    fn level(&self, live_docs: u32) -> u32 {
        let base = self.merge_factor.max(2) as f64;
        let docs = live_docs.max(self.min_merge_docs).max(1) as f64;
        (docs.ln() / base.ln()).floor() as u32
    }
}

impl MergePolicy for LogMergePolicy {
    fn select_merge(&self, segments: &[SegmentMeta]) -> Option<Vec<usize>> {
        let factor = self.merge_factor.max(2);
        if segments.len() < factor {
            return None;
        }

        let mut levels: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (position, meta) in segments.iter().enumerate() {
            levels
                .entry(self.level(meta.live_count()))
                .or_default()
                .push(position);
        }

        levels
            .into_values()
            .find(|positions| positions.len() >= factor)
            .map(|positions| positions.into_iter().take(factor).collect())
    }
}

/// Never merges; segments only collapse on optimize.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMergePolicy;

impl MergePolicy for NoMergePolicy {
    fn select_merge(&self, _segments: &[SegmentMeta]) -> Option<Vec<usize>> {
        None
    }
}
