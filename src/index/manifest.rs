//! The commit point of an index directory.
//!
//! `segments.json` lists the live segments of one generation together with
//! the ordinals deleted from each. It is only ever replaced whole, through a
//! temp file and a rename, so a reader sees either the previous generation
//! or the next one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PaviseError, Result};
use crate::storage::Storage;

/// Manifest file name.
pub const MANIFEST_FILE: &str = "segments.json";

/// Manifest entry for a single segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// Segment id; the file is `segment_<id>.seg`.
    pub id: u64,
    /// Number of documents written to the segment.
    pub doc_count: u32,
    /// Ordinals deleted since the segment was written.
    #[serde(default)]
    pub deleted: BTreeSet<u32>,
}

impl SegmentMeta {
    /// Documents still live in this segment.
    pub fn live_count(&self) -> u32 {
        self.doc_count.saturating_sub(self.deleted.len() as u32)
    }
}

/// One committed generation of an index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Monotonically increasing commit number. Zero means nothing committed.
    pub generation: u64,
    /// Id to assign to the next segment written.
    pub next_segment_id: u64,
    /// Live segments in index order.
    pub segments: Vec<SegmentMeta>,
    /// When this generation was committed.
    pub committed_at: Option<DateTime<Utc>>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            generation: 0,
            next_segment_id: 1,
            segments: Vec::new(),
            committed_at: None,
        }
    }
}

impl Manifest {
    /// Load the committed manifest, or an empty generation-zero manifest if
    /// the directory has never been committed to.
    pub fn load(storage: &dyn Storage) -> Result<Manifest> {
        if !storage.file_exists(MANIFEST_FILE) {
            return Ok(Manifest::default());
        }

        let bytes = storage.read_all(MANIFEST_FILE)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PaviseError::corrupt(format!("{MANIFEST_FILE}: {e}")))
    }

    /// Atomically replace the committed manifest with this one.
    pub fn store(&self, storage: &dyn Storage) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        storage.write_atomic(MANIFEST_FILE, &json)
    }

    /// The successor of this generation, with fresh metadata.
    pub fn next(&self, segments: Vec<SegmentMeta>, next_segment_id: u64) -> Manifest {
        Manifest {
            generation: self.generation + 1,
            next_segment_id,
            segments,
            committed_at: Some(Utc::now()),
        }
    }

    /// Total documents written to live segments.
    pub fn max_doc(&self) -> u64 {
        self.segments.iter().map(|s| s.doc_count as u64).sum()
    }

    /// Live (not deleted) documents.
    pub fn num_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.live_count() as u64).sum()
    }

    /// Deleted documents still occupying segments.
    pub fn num_deleted(&self) -> u64 {
        self.segments.iter().map(|s| s.deleted.len() as u64).sum()
    }

    /// At most one segment and no deletions.
    pub fn is_optimized(&self) -> bool {
        self.segments.len() <= 1 && self.num_deleted() == 0
    }
}
