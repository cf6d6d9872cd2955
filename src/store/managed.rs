//! Admin view of one index.

use serde::{Deserialize, Serialize};

use crate::store::handle::IndexStats;

/// An index as shown to operators: its committed state next to the number
/// of records the primary datastore holds for the same entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedIndex {
    /// Index name, which is also the entity type.
    pub name: String,
    /// Live documents in the index.
    pub num_docs: u64,
    /// Deleted documents not yet merged away.
    pub num_deleted: u64,
    /// Committed segments.
    pub segment_count: usize,
    /// At most one segment and no deletions.
    pub optimized: bool,
    /// Records of the entity type in the primary datastore.
    pub record_count: u64,
}

impl ManagedIndex {
    /// Combine index statistics with the datastore's record count.
    pub fn new(stats: IndexStats, record_count: u64) -> Self {
        ManagedIndex {
            name: stats.name,
            num_docs: stats.num_docs,
            num_deleted: stats.num_deleted,
            segment_count: stats.segment_count,
            optimized: stats.optimized,
            record_count,
        }
    }

    /// Whether the index and the datastore disagree on the record count.
    /// A drifted index needs a rebuild.
    pub fn is_drifted(&self) -> bool {
        self.num_docs != self.record_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(num_docs: u64) -> IndexStats {
        IndexStats {
            name: "Article".to_string(),
            generation: 3,
            num_docs,
            num_deleted: 0,
            segment_count: 1,
            optimized: true,
            pending_docs: 0,
        }
    }

    #[test]
    fn test_drift() {
        assert!(!ManagedIndex::new(stats(4), 4).is_drifted());
        assert!(ManagedIndex::new(stats(3), 4).is_drifted());
    }
}
