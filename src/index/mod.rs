//! Segment-based inverted index.
//!
//! A writer buffers documents and commits them as immutable segments listed
//! by a manifest generation. Readers and searchers are pinned to exactly one
//! generation.

pub mod manifest;
pub mod merge_policy;
pub mod reader;
pub mod searcher;
pub mod segment;
pub mod writer;

pub use manifest::{MANIFEST_FILE, Manifest, SegmentMeta};
pub use merge_policy::{LogMergePolicy, MergePolicy, NoMergePolicy};
pub use reader::{FieldStats, IndexReader};
pub use searcher::IndexSearcher;
pub use segment::{Posting, Segment, SegmentDoc};
pub use writer::{IndexWriter, IndexWriterConfig, WriterStats};
