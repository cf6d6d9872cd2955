//! Immutable segments: the unit of committed documents.
//!
//! A segment file is a fixed header followed by a bincode payload:
//!
//! ```text
//! magic (u32 LE) | version (u32 LE) | payload length (u64 LE) | crc32 (u32 LE) | payload
//! ```
//!
//! The checksum covers the payload. Any mismatch is reported as a corrupt
//! segment, never repaired.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error::{PaviseError, Result};
use crate::storage::Storage;

/// Magic number at the start of every segment file ("PSEG").
pub const SEGMENT_MAGIC: u32 = 0x5053_4547;

/// Segment format version.
pub const SEGMENT_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4 + 8 + 4;

/// File name of the segment with the given id.
pub fn segment_file_name(segment_id: u64) -> String {
    format!("segment_{segment_id}.seg")
}

/// Compose the posting key of a term in a field.
pub fn term_key(field: &str, term: &str) -> String {
    format!("{field}:{term}")
}

/// One document's entry in a posting list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Segment-local document ordinal.
    pub doc: u32,
    /// Token positions of the term within the field.
    pub positions: Vec<u32>,
}

impl Posting {
    /// Term frequency in the field.
    pub fn freq(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// Per-document data kept in a segment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentDoc {
    /// Stored fields, in document order.
    pub stored: Vec<(String, String)>,
    /// Token count of each tokenized field.
    pub field_lengths: BTreeMap<String, u32>,
    /// First value of each untokenized field, used as sort key.
    pub keywords: BTreeMap<String, String>,
}

impl SegmentDoc {
    /// First stored value of a field.
    pub fn stored_value(&self, field: &str) -> Option<&str> {
        self.stored
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}

/// An immutable, fully loaded segment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment id, unique within one index directory.
    pub id: u64,
    /// Documents by ordinal.
    pub docs: Vec<SegmentDoc>,
    /// Posting lists keyed by `field:term`, each sorted by ordinal.
    pub postings: BTreeMap<String, Vec<Posting>>,
}

impl Segment {
    /// Number of documents, deleted or not.
    pub fn doc_count(&self) -> u32 {
        self.docs.len() as u32
    }

    /// Posting list of a term, if present.
    pub fn postings(&self, field: &str, term: &str) -> Option<&[Posting]> {
        self.postings
            .get(&term_key(field, term))
            .map(|list| list.as_slice())
    }

    /// Terms of `field`, in order, starting at `from` (inclusive).
    pub fn field_terms_from<'a>(
        &'a self,
        field: &'a str,
        from: &str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        let prefix_len = field.len() + 1;
        self.postings
            .range(term_key(field, from)..)
            .map(|(key, _)| key.as_str())
            .take_while(move |key| {
                key.len() >= prefix_len
                    && key.as_bytes()[field.len()] == b':'
                    && key.starts_with(field)
            })
            .map(move |key| &key[prefix_len..])
    }

    /// Serialize to the framed, checksummed byte format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let checksum = crc32fast::hash(&payload);

        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.write_u32::<LittleEndian>(SEGMENT_MAGIC)?;
        buf.write_u32::<LittleEndian>(SEGMENT_VERSION)?;
        buf.write_u64::<LittleEndian>(payload.len() as u64)?;
        buf.write_u32::<LittleEndian>(checksum)?;
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Parse the framed byte format, verifying magic, version and checksum.
    pub fn decode(bytes: &[u8]) -> Result<Segment> {
        if bytes.len() < HEADER_LEN {
            return Err(PaviseError::corrupt(format!(
                "segment too small: {} bytes",
                bytes.len()
            )));
        }

        let mut header = Cursor::new(&bytes[..HEADER_LEN]);
        let magic = header.read_u32::<LittleEndian>()?;
        if magic != SEGMENT_MAGIC {
            return Err(PaviseError::corrupt(format!("bad segment magic {magic:#x}")));
        }
        let version = header.read_u32::<LittleEndian>()?;
        if version != SEGMENT_VERSION {
            return Err(PaviseError::corrupt(format!(
                "unsupported segment version {version}"
            )));
        }
        let length = header.read_u64::<LittleEndian>()? as usize;
        let expected = header.read_u32::<LittleEndian>()?;

        let payload = &bytes[HEADER_LEN..];
        if payload.len() != length {
            return Err(PaviseError::corrupt(format!(
                "segment payload is {} bytes, header says {length}",
                payload.len()
            )));
        }
        let actual = crc32fast::hash(payload);
        if actual != expected {
            return Err(PaviseError::corrupt(format!(
                "segment checksum mismatch: expected {expected:#010x}, found {actual:#010x}"
            )));
        }

        Ok(bincode::deserialize(payload)?)
    }

    /// Write this segment to `segment_<id>.seg` in `storage`.
    pub fn write_to(&self, storage: &dyn Storage) -> Result<()> {
        storage.write_atomic(&segment_file_name(self.id), &self.encode()?)
    }

    /// Load segment `id` from `storage`.
    pub fn read_from(storage: &dyn Storage, id: u64) -> Result<Segment> {
        let name = segment_file_name(id);
        let segment = Segment::decode(&storage.read_all(&name)?)
            .map_err(|e| match e {
                PaviseError::Corrupt(msg) => PaviseError::corrupt(format!("{name}: {msg}")),
                other => other,
            })?;
        if segment.id != id {
            return Err(PaviseError::corrupt(format!(
                "{name} holds segment {}",
                segment.id
            )));
        }
        Ok(segment)
    }

    /// Merge the live documents of several segments into a new one.
    ///
    /// Documents keep their relative order. Postings are remapped to the new
    /// ordinals.
    pub fn merge(id: u64, parts: &[(Arc<Segment>, &BTreeSet<u32>)]) -> Segment {
        let mut builder = SegmentBuilder::new(id);

        for (segment, deleted) in parts {
            let mut remap: Vec<Option<u32>> = Vec::with_capacity(segment.docs.len());
            for (ordinal, doc) in segment.docs.iter().enumerate() {
                if deleted.contains(&(ordinal as u32)) {
                    remap.push(None);
                } else {
                    remap.push(Some(builder.push_doc(doc.clone())));
                }
            }

            for (key, list) in &segment.postings {
                for posting in list {
                    if let Some(Some(doc)) = remap.get(posting.doc as usize) {
                        builder.push_posting(key, *doc, posting.positions.clone());
                    }
                }
            }
        }

        builder.build()
    }
}

/// Accumulates documents and postings for a new segment.
#[derive(Debug)]
pub struct SegmentBuilder {
    segment: Segment,
}

impl SegmentBuilder {
    /// Start a segment with the given id.
    pub fn new(id: u64) -> Self {
        SegmentBuilder {
            segment: Segment {
                id,
                ..Segment::default()
            },
        }
    }

    /// Append a document, returning its ordinal.
    pub fn push_doc(&mut self, doc: SegmentDoc) -> u32 {
        self.segment.docs.push(doc);
        (self.segment.docs.len() - 1) as u32
    }

    /// Append a posting. Ordinals must be pushed in ascending order per key.
    pub fn push_posting(&mut self, key: &str, doc: u32, positions: Vec<u32>) {
        match self.segment.postings.get_mut(key) {
            Some(list) => list.push(Posting { doc, positions }),
            None => {
                self.segment
                    .postings
                    .insert(key.to_string(), vec![Posting { doc, positions }]);
            }
        }
    }

    /// Number of documents so far.
    pub fn doc_count(&self) -> u32 {
        self.segment.doc_count()
    }

    /// Finish the segment.
    pub fn build(self) -> Segment {
        self.segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_segment() -> Segment {
        let mut builder = SegmentBuilder::new(3);
        let first = builder.push_doc(SegmentDoc {
            stored: vec![("_docID".into(), "1".into())],
            ..SegmentDoc::default()
        });
        let second = builder.push_doc(SegmentDoc {
            stored: vec![("_docID".into(), "2".into())],
            ..SegmentDoc::default()
        });
        builder.push_posting("title:intro", first, vec![0]);
        builder.push_posting("title:intro", second, vec![1]);
        builder.push_posting("title:rust", second, vec![0]);
        builder.push_posting("titles:x", second, vec![0]);
        builder.build()
    }

    #[test]
    fn test_encode_decode() {
        let segment = sample_segment();
        let decoded = Segment::decode(&segment.encode().unwrap()).unwrap();
        assert_eq!(decoded, segment);
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let mut bytes = sample_segment().encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let err = Segment::decode(&bytes).unwrap_err();
        assert!(matches!(err, PaviseError::Corrupt(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_field_terms_from() {
        let segment = sample_segment();
        let terms: Vec<&str> = segment.field_terms_from("title", "").collect();
        assert_eq!(terms, vec!["intro", "rust"]);

        let terms: Vec<&str> = segment.field_terms_from("title", "j").collect();
        assert_eq!(terms, vec!["rust"]);
    }

    #[test]
    fn test_merge_drops_deleted() {
        let segment = Arc::new(sample_segment());
        let deleted: BTreeSet<u32> = [0].into_iter().collect();

        let merged = Segment::merge(9, &[(segment, &deleted)]);
        assert_eq!(merged.id, 9);
        assert_eq!(merged.doc_count(), 1);
        assert_eq!(merged.docs[0].stored_value("_docID"), Some("2"));
        assert_eq!(merged.postings("title", "intro").unwrap()[0].doc, 0);
    }
}
