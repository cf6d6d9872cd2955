//! Collection of top hits in relevance order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

/// One matching document and its score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreDoc {
    /// Global document address.
    pub doc: u32,
    /// Relevance score.
    pub score: f32,
}

/// Ordered hits plus the total number of matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDocs {
    /// Number of matching documents, regardless of how many were kept.
    pub total_hits: usize,
    /// Kept hits, best first.
    pub hits: Vec<ScoreDoc>,
}

/// Heap entry ordered so the worst hit sits on top.
#[derive(Debug, Clone, Copy)]
struct HeapEntry(ScoreDoc);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower scores are worse; among equal scores, later documents are worse.
        other
            .0
            .score
            .total_cmp(&self.0.score)
            .then_with(|| self.0.doc.cmp(&other.0.doc))
    }
}

/// A collector that keeps the top N documents by score.
///
/// Ties are broken by ascending document address.
#[derive(Debug)]
pub struct TopDocsCollector {
    /// Maximum number of documents to keep.
    max_docs: usize,
    /// Kept hits, worst on top.
    hits: BinaryHeap<HeapEntry>,
    /// Total number of documents offered.
    total_hits: usize,
}

impl TopDocsCollector {
    /// Create a new top docs collector.
    pub fn new(max_docs: usize) -> Self {
        TopDocsCollector {
            max_docs,
            hits: BinaryHeap::new(),
            total_hits: 0,
        }
    }

    /// Offer a matching document.
    pub fn collect(&mut self, doc: u32, score: f32) {
        self.total_hits += 1;
        if self.max_docs == 0 {
            return;
        }

        let entry = HeapEntry(ScoreDoc { doc, score });
        if self.hits.len() < self.max_docs {
            self.hits.push(entry);
        } else if let Some(mut worst) = self.hits.peek_mut() {
            if entry < *worst {
                *worst = entry;
            }
        }
    }

    /// Total number of documents offered so far.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Finish collection, best hit first.
    pub fn into_top_docs(self) -> TopDocs {
        TopDocs {
            total_hits: self.total_hits,
            hits: self
                .hits
                .into_sorted_vec()
                .into_iter()
                .map(|entry| entry.0)
                .collect(),
        }
    }
}
