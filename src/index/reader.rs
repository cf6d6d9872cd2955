//! Point-in-time reader over one committed generation.
//!
//! A reader owns its segments in memory. Later flushes, merges or even the
//! removal of the whole index directory leave an open reader untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashMap;
use bit_vec::BitVec;

use crate::document::DOC_ID_FIELD;
use crate::error::{PaviseError, Result};
use crate::index::manifest::Manifest;
use crate::index::segment::{Posting, Segment, SegmentDoc};
use crate::storage::Storage;

/// Per-field length statistics over live documents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldStats {
    /// Live documents with at least one token in the field.
    pub doc_count: u64,
    /// Sum of the field's token counts over those documents.
    pub total_length: u64,
}

impl FieldStats {
    /// Average token count, zero for an unseen field.
    pub fn avg_length(&self) -> f32 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_length as f32 / self.doc_count as f32
        }
    }
}

/// Immutable view of one manifest generation.
///
/// Documents are addressed globally: segment bases are assigned in manifest
/// order.
#[derive(Debug)]
pub struct IndexReader {
    manifest: Manifest,
    segments: Vec<Arc<Segment>>,
    bases: Vec<u32>,
    live: Vec<BitVec>,
    max_doc: u32,
    num_docs: u32,
    field_stats: AHashMap<String, FieldStats>,
}

impl IndexReader {
    /// Open the committed generation found in `storage`.
    pub fn open(storage: &dyn Storage) -> Result<Self> {
        let manifest = Manifest::load(storage)?;
        let segments = manifest
            .segments
            .iter()
            .map(|meta| Segment::read_from(storage, meta.id).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        Self::from_segments(manifest, segments)
    }

    /// Build a reader from a manifest and its already loaded segments.
    pub fn from_segments(manifest: Manifest, segments: Vec<Arc<Segment>>) -> Result<Self> {
        if manifest.segments.len() != segments.len() {
            return Err(PaviseError::corrupt(format!(
                "manifest lists {} segments, {} loaded",
                manifest.segments.len(),
                segments.len()
            )));
        }

        let mut bases = Vec::with_capacity(segments.len());
        let mut live = Vec::with_capacity(segments.len());
        let mut max_doc = 0u32;
        let mut num_docs = 0u32;
        let mut field_stats: AHashMap<String, FieldStats> = AHashMap::new();

        for (meta, segment) in manifest.segments.iter().zip(segments.iter()) {
            if meta.id != segment.id || meta.doc_count != segment.doc_count() {
                return Err(PaviseError::corrupt(format!(
                    "segment {} does not match its manifest entry",
                    segment.id
                )));
            }

            let mut bits = BitVec::from_elem(segment.docs.len(), true);
            for &ordinal in &meta.deleted {
                if (ordinal as usize) < bits.len() {
                    bits.set(ordinal as usize, false);
                }
            }

            for (ordinal, doc) in segment.docs.iter().enumerate() {
                if !bits.get(ordinal).unwrap_or(false) {
                    continue;
                }
                num_docs += 1;
                for (field, &length) in &doc.field_lengths {
                    let stats = field_stats.entry(field.clone()).or_default();
                    stats.doc_count += 1;
                    stats.total_length += length as u64;
                }
            }

            bases.push(max_doc);
            max_doc += segment.doc_count();
            live.push(bits);
        }

        Ok(IndexReader {
            manifest,
            segments,
            bases,
            live,
            max_doc,
            num_docs,
            field_stats,
        })
    }

    /// Generation this reader was opened on.
    pub fn generation(&self) -> u64 {
        self.manifest.generation
    }

    /// The manifest this reader was opened on.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// One past the largest document address.
    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Number of deleted documents still occupying segments.
    pub fn num_deleted(&self) -> u32 {
        self.max_doc - self.num_docs
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// At most one segment and no deletions.
    pub fn is_optimized(&self) -> bool {
        self.manifest.is_optimized()
    }

    fn locate(&self, doc: u32) -> Option<(usize, usize)> {
        let index = self.bases.partition_point(|&base| base <= doc).checked_sub(1)?;
        let local = (doc - self.bases[index]) as usize;
        (local < self.segments[index].docs.len()).then_some((index, local))
    }

    /// Whether a document address is live.
    pub fn is_live(&self, doc: u32) -> bool {
        self.locate(doc)
            .and_then(|(segment, local)| self.live[segment].get(local))
            .unwrap_or(false)
    }

    /// Iterate over every live document address.
    pub fn live_docs(&self) -> impl Iterator<Item = u32> + '_ {
        self.live.iter().enumerate().flat_map(move |(index, bits)| {
            let base = self.bases[index];
            bits.iter()
                .enumerate()
                .filter(|(_, live)| *live)
                .map(move |(local, _)| base + local as u32)
        })
    }

    /// Live postings of an exact term, in address order.
    pub fn postings(&self, field: &str, term: &str) -> Vec<(u32, &Posting)> {
        let mut result = Vec::new();
        for (index, segment) in self.segments.iter().enumerate() {
            if let Some(list) = segment.postings(field, term) {
                let base = self.bases[index];
                let bits = &self.live[index];
                for posting in list {
                    if bits.get(posting.doc as usize).unwrap_or(false) {
                        result.push((base + posting.doc, posting));
                    }
                }
            }
        }
        result
    }

    /// Number of live documents containing an exact term.
    pub fn doc_freq(&self, field: &str, term: &str) -> u32 {
        self.postings(field, term).len() as u32
    }

    /// Distinct terms of `field` starting at `from`, in order, for as long
    /// as `keep_going` holds.
    pub fn field_terms_while<F>(&self, field: &str, from: &str, keep_going: F) -> BTreeSet<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut terms = BTreeSet::new();
        for segment in &self.segments {
            for term in segment.field_terms_from(field, from) {
                if !keep_going(term) {
                    break;
                }
                terms.insert(term.to_string());
            }
        }
        terms
    }

    /// Length statistics of a field over live documents.
    pub fn field_stats(&self, field: &str) -> FieldStats {
        self.field_stats.get(field).copied().unwrap_or_default()
    }

    /// Token count of a field in one document.
    pub fn field_length(&self, doc: u32, field: &str) -> u32 {
        self.segment_doc(doc)
            .and_then(|d| d.field_lengths.get(field).copied())
            .unwrap_or(0)
    }

    fn segment_doc(&self, doc: u32) -> Option<&SegmentDoc> {
        let (segment, local) = self.locate(doc)?;
        self.segments[segment].docs.get(local)
    }

    /// Stored fields of a live document.
    pub fn stored_fields(&self, doc: u32) -> Option<&[(String, String)]> {
        if !self.is_live(doc) {
            return None;
        }
        self.segment_doc(doc).map(|d| d.stored.as_slice())
    }

    /// The `_docID` of a live document.
    pub fn doc_id(&self, doc: u32) -> Option<&str> {
        if !self.is_live(doc) {
            return None;
        }
        let segment_doc = self.segment_doc(doc)?;
        segment_doc
            .keywords
            .get(DOC_ID_FIELD)
            .map(|id| id.as_str())
            .or_else(|| segment_doc.stored_value(DOC_ID_FIELD))
    }

    /// Untokenized value of a field, used as a sort key.
    pub fn sort_value(&self, doc: u32, field: &str) -> Option<&str> {
        self.segment_doc(doc)
            .and_then(|d| d.keywords.get(field))
            .map(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::manifest::SegmentMeta;
    use crate::index::segment::SegmentBuilder;
    use std::collections::BTreeMap;

    fn segment(id: u64, ids: &[&str], term: &str) -> Segment {
        let mut builder = SegmentBuilder::new(id);
        for doc_id in ids {
            let mut keywords = BTreeMap::new();
            keywords.insert(DOC_ID_FIELD.to_string(), doc_id.to_string());
            let mut field_lengths = BTreeMap::new();
            field_lengths.insert("title".to_string(), 2);
            let ordinal = builder.push_doc(SegmentDoc {
                stored: vec![(DOC_ID_FIELD.to_string(), doc_id.to_string())],
                field_lengths,
                keywords,
            });
            builder.push_posting(&format!("title:{term}"), ordinal, vec![0]);
        }
        builder.build()
    }

    fn reader() -> IndexReader {
        let first = segment(1, &["a", "b"], "rust");
        let second = segment(2, &["c"], "rust");
        let manifest = Manifest::default().next(
            vec![
                SegmentMeta {
                    id: 1,
                    doc_count: 2,
                    deleted: [0].into_iter().collect(),
                },
                SegmentMeta {
                    id: 2,
                    doc_count: 1,
                    deleted: BTreeSet::new(),
                },
            ],
            3,
        );
        IndexReader::from_segments(manifest, vec![Arc::new(first), Arc::new(second)]).unwrap()
    }

    #[test]
    fn test_global_addressing() {
        let reader = reader();
        assert_eq!(reader.max_doc(), 3);
        assert_eq!(reader.num_docs(), 2);
        assert_eq!(reader.num_deleted(), 1);
        assert!(!reader.is_live(0));
        assert!(reader.is_live(1));
        assert_eq!(reader.doc_id(2), Some("c"));
        assert_eq!(reader.doc_id(0), None);
        assert!(!reader.is_live(3));
        assert_eq!(reader.live_docs().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_postings_skip_deleted() {
        let reader = reader();
        let docs: Vec<u32> = reader
            .postings("title", "rust")
            .into_iter()
            .map(|(doc, _)| doc)
            .collect();
        assert_eq!(docs, vec![1, 2]);
        assert_eq!(reader.field_stats("title").doc_count, 2);
        assert_eq!(reader.field_stats("title").avg_length(), 2.0);
    }

    #[test]
    fn test_mismatched_manifest_is_corrupt() {
        let manifest = Manifest::default().next(
            vec![SegmentMeta {
                id: 1,
                doc_count: 5,
                deleted: BTreeSet::new(),
            }],
            2,
        );
        let err = IndexReader::from_segments(manifest, vec![Arc::new(segment(1, &["a"], "x"))])
            .unwrap_err();
        assert!(matches!(err, PaviseError::Corrupt(_)));
    }
}
