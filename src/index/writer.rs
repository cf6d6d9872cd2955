//! The single writer of an index directory.
//!
//! Documents are analyzed on `add_document` and buffered in memory. Deletes
//! are by exact indexed term: buffered documents carrying the term are
//! dropped right away, committed documents are marked deleted at the next
//! flush. A flush writes the buffer as one new segment and commits a new
//! manifest generation. Nothing is visible to readers before that.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::Analyzer;
use crate::document::{DOC_ID_FIELD, Document};
use crate::error::{PaviseError, Result};
use crate::index::manifest::{MANIFEST_FILE, Manifest, SegmentMeta};
use crate::index::merge_policy::{LogMergePolicy, MergePolicy};
use crate::index::reader::IndexReader;
use crate::index::segment::{Segment, SegmentBuilder, SegmentDoc, segment_file_name, term_key};
use crate::storage::{LockManager, Storage, StorageLock, WRITE_LOCK_NAME};

/// Rough per-term bookkeeping overhead used by the memory estimate.
const TERM_OVERHEAD_BYTES: usize = 48;

/// Index writer configuration.
#[derive(Clone)]
pub struct IndexWriterConfig {
    /// Buffered bytes above which [`IndexWriter::should_flush`] turns true.
    pub max_buffer_memory: usize,

    /// Analyzer for tokenized fields.
    pub analyzer: Arc<dyn Analyzer>,

    /// Chooses segments to merge after each flush.
    pub merge_policy: Arc<dyn MergePolicy>,
}

impl IndexWriterConfig {
    /// Configuration with the given analyzer and a 48 MiB buffer.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        IndexWriterConfig {
            max_buffer_memory: 48 * 1024 * 1024,
            analyzer,
            merge_policy: Arc::new(LogMergePolicy::default()),
        }
    }

    /// Set the flush threshold.
    pub fn with_max_buffer_memory(mut self, bytes: usize) -> Self {
        self.max_buffer_memory = bytes;
        self
    }

    /// Set the merge policy.
    pub fn with_merge_policy(mut self, policy: Arc<dyn MergePolicy>) -> Self {
        self.merge_policy = policy;
        self
    }
}

impl std::fmt::Debug for IndexWriterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriterConfig")
            .field("max_buffer_memory", &self.max_buffer_memory)
            .field("analyzer", &self.analyzer.name())
            .field("merge_policy", &self.merge_policy)
            .finish()
    }
}

/// Statistics about the writing process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriterStats {
    /// Documents added since the writer was opened.
    pub docs_added: u64,
    /// Delete terms applied since the writer was opened.
    pub delete_terms: u64,
    /// Segments written by flushes and merges.
    pub segments_written: u64,
    /// Merges performed, optimize included.
    pub merges: u64,
    /// Successful flushes.
    pub flushes: u64,
}

#[derive(Debug)]
struct BufferedDoc {
    doc: SegmentDoc,
    terms: AHashMap<String, Vec<u32>>,
    bytes: usize,
}

/// Writer for one index directory. Holds the directory's write lock from
/// open until close.
pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    config: IndexWriterConfig,
    lock: Option<Box<dyn StorageLock>>,
    manifest: Manifest,
    segments: Vec<Arc<Segment>>,
    buffered: Vec<BufferedDoc>,
    pending_deletes: Vec<(String, String)>,
    ram_bytes: usize,
    closed: bool,
    stats: WriterStats,
}

impl std::fmt::Debug for IndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexWriter")
            .field("config", &self.config)
            .field("generation", &self.manifest.generation)
            .field("segments", &self.segments.len())
            .field("buffered_docs", &self.buffered.len())
            .field("pending_deletes", &self.pending_deletes.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl IndexWriter {
    /// Open the writer: take the write lock, load the committed generation
    /// and remove files no generation refers to.
    pub fn open(
        storage: Arc<dyn Storage>,
        lock_manager: &dyn LockManager,
        config: IndexWriterConfig,
    ) -> Result<Self> {
        let lock = lock_manager.acquire_lock(WRITE_LOCK_NAME).map_err(|e| {
            PaviseError::storage(format!("Index is locked by another writer: {e}"))
        })?;

        let manifest = Manifest::load(storage.as_ref())?;
        let segments = manifest
            .segments
            .iter()
            .map(|meta| Segment::read_from(storage.as_ref(), meta.id).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        let writer = IndexWriter {
            storage,
            config,
            lock: Some(lock),
            manifest,
            segments,
            buffered: Vec::new(),
            pending_deletes: Vec::new(),
            ram_bytes: 0,
            closed: false,
            stats: WriterStats::default(),
        };
        writer.remove_unreferenced_files()?;

        Ok(writer)
    }

    /// Analyze and buffer a document.
    pub fn add_document(&mut self, doc: Document) -> Result<()> {
        self.check_closed()?;

        let buffered = self.analyze_document(doc)?;
        self.ram_bytes += buffered.bytes;
        self.buffered.push(buffered);
        self.stats.docs_added += 1;

        Ok(())
    }

    /// Delete every document whose `field` was indexed with the exact term
    /// `value`, including buffered documents added before this call.
    pub fn delete_term(&mut self, field: &str, value: &str) -> Result<()> {
        self.check_closed()?;

        let key = term_key(field, value);
        let before = self.buffered.len();
        self.buffered.retain(|doc| !doc.terms.contains_key(&key));
        if self.buffered.len() != before {
            self.ram_bytes = self.buffered.iter().map(|doc| doc.bytes).sum();
        }

        if !self.segments.is_empty() {
            self.pending_deletes
                .push((field.to_string(), value.to_string()));
        }
        self.stats.delete_terms += 1;

        Ok(())
    }

    /// Replace every document indexed with `field:value` by `doc`.
    pub fn update_document(&mut self, field: &str, value: &str, doc: Document) -> Result<()> {
        self.delete_term(field, value)?;
        self.add_document(doc)
    }

    /// Delete the document with the given `_docID`.
    pub fn delete_by_id(&mut self, doc_id: &str) -> Result<()> {
        self.delete_term(DOC_ID_FIELD, doc_id)
    }

    /// Whether the buffer has outgrown the configured memory budget.
    pub fn should_flush(&self) -> bool {
        self.ram_bytes >= self.config.max_buffer_memory
    }

    /// Whether anything is waiting to be flushed.
    pub fn has_pending_changes(&self) -> bool {
        !self.buffered.is_empty() || !self.pending_deletes.is_empty()
    }

    /// Commit buffered documents and deletes as a new generation.
    ///
    /// Returns `false` if there was nothing to commit.
    pub fn flush(&mut self) -> Result<bool> {
        self.check_closed()?;

        if !self.has_pending_changes() {
            return Ok(false);
        }

        let mut metas = self.manifest.segments.clone();
        let mut segments = self.segments.clone();

        let mut deleted_now = 0usize;
        for (meta, segment) in metas.iter_mut().zip(segments.iter()) {
            for (field, value) in &self.pending_deletes {
                if let Some(list) = segment.postings(field, value) {
                    for posting in list {
                        if meta.deleted.insert(posting.doc) {
                            deleted_now += 1;
                        }
                    }
                }
            }
        }

        let mut next_segment_id = self.manifest.next_segment_id;
        let mut written = None;
        if !self.buffered.is_empty() {
            let segment = self.build_buffered_segment(next_segment_id);
            segment.write_to(self.storage.as_ref())?;
            written = Some((segment.id, segment.doc_count()));

            metas.push(SegmentMeta {
                id: segment.id,
                doc_count: segment.doc_count(),
                deleted: Default::default(),
            });
            segments.push(Arc::new(segment));
            next_segment_id += 1;
            self.stats.segments_written += 1;
        }

        let mut dropped = Vec::new();
        let mut kept_metas = Vec::with_capacity(metas.len());
        let mut kept_segments = Vec::with_capacity(segments.len());
        for (meta, segment) in metas.into_iter().zip(segments) {
            if meta.live_count() == 0 {
                dropped.push(meta.id);
            } else {
                kept_metas.push(meta);
                kept_segments.push(segment);
            }
        }

        let manifest = self.manifest.next(kept_metas, next_segment_id);
        manifest.store(self.storage.as_ref())?;

        self.manifest = manifest;
        self.segments = kept_segments;
        self.buffered.clear();
        self.pending_deletes.clear();
        self.ram_bytes = 0;
        self.stats.flushes += 1;

        for id in dropped {
            self.storage.delete_file(&segment_file_name(id))?;
        }

        tracing::info!(
            target: "pavise::index",
            generation = self.manifest.generation,
            segment = written.map(|(id, _)| id),
            docs = written.map(|(_, docs)| docs).unwrap_or(0),
            deleted = deleted_now,
            "Flushed index writer"
        );

        while let Some(positions) = self.config.merge_policy.select_merge(&self.manifest.segments) {
            self.merge(&positions)?;
        }

        Ok(true)
    }

    /// Flush, then merge every segment into one, dropping deleted documents.
    ///
    /// Returns `false` if the index was already optimized.
    pub fn optimize(&mut self) -> Result<bool> {
        self.flush()?;

        if self.manifest.is_optimized() {
            return Ok(false);
        }

        let all: Vec<usize> = (0..self.segments.len()).collect();
        self.merge(&all)?;

        tracing::info!(
            target: "pavise::index",
            generation = self.manifest.generation,
            docs = self.manifest.num_docs(),
            "Optimized index"
        );

        Ok(true)
    }

    /// Replace the segments at `positions` (ascending) by one segment holding
    /// their live documents, placed where the first of them was.
    fn merge(&mut self, positions: &[usize]) -> Result<()> {
        let Some(&first) = positions.first() else {
            return Ok(());
        };

        let id = self.manifest.next_segment_id;
        let parts: Vec<(Arc<Segment>, &_)> = positions
            .iter()
            .map(|&i| (self.segments[i].clone(), &self.manifest.segments[i].deleted))
            .collect();
        let merged = Segment::merge(id, &parts);
        drop(parts);

        let mut metas = Vec::with_capacity(self.segments.len());
        let mut segments = Vec::with_capacity(self.segments.len());
        let mut replaced = Vec::with_capacity(positions.len());
        let merged_docs = merged.doc_count();
        let mut merged = Some(merged);

        for (position, (meta, segment)) in self
            .manifest
            .segments
            .iter()
            .zip(self.segments.iter())
            .enumerate()
        {
            if position == first && merged_docs > 0 {
                if let Some(merged) = merged.take() {
                    merged.write_to(self.storage.as_ref())?;
                    self.stats.segments_written += 1;
                    metas.push(SegmentMeta {
                        id,
                        doc_count: merged_docs,
                        deleted: Default::default(),
                    });
                    segments.push(Arc::new(merged));
                }
            }
            if positions.contains(&position) {
                replaced.push(meta.id);
            } else {
                metas.push(meta.clone());
                segments.push(segment.clone());
            }
        }

        let manifest = self.manifest.next(metas, id + 1);
        manifest.store(self.storage.as_ref())?;
        self.manifest = manifest;
        self.segments = segments;
        self.stats.merges += 1;

        for old in &replaced {
            self.storage.delete_file(&segment_file_name(*old))?;
        }

        tracing::debug!(
            target: "pavise::index",
            generation = self.manifest.generation,
            segment = id,
            docs = merged_docs,
            merged = replaced.len(),
            "Merged segments"
        );

        Ok(())
    }

    /// Discard buffered documents and deletes.
    pub fn rollback(&mut self) -> Result<()> {
        self.check_closed()?;
        self.buffered.clear();
        self.pending_deletes.clear();
        self.ram_bytes = 0;
        Ok(())
    }

    /// A reader over the last committed generation, sharing this writer's
    /// loaded segments.
    pub fn reader(&self) -> Result<IndexReader> {
        IndexReader::from_segments(self.manifest.clone(), self.segments.clone())
    }

    /// The last committed manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Estimated bytes held by the buffer.
    pub fn ram_bytes_used(&self) -> usize {
        self.ram_bytes
    }

    /// Number of buffered documents.
    pub fn pending_docs(&self) -> usize {
        self.buffered.len()
    }

    /// Get writer statistics.
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Flush pending changes and release the write lock.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let flushed = self.flush();
        self.closed = true;
        if let Some(mut lock) = self.lock.take() {
            lock.release()?;
        }
        flushed.map(|_| ())
    }

    /// Check if the writer is closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed {
            Err(PaviseError::index("Writer is closed"))
        } else {
            Ok(())
        }
    }

    fn analyze_document(&self, doc: Document) -> Result<BufferedDoc> {
        let mut segment_doc = SegmentDoc::default();
        let mut terms: AHashMap<String, Vec<u32>> = AHashMap::new();
        let mut next_position: AHashMap<String, u32> = AHashMap::new();
        let mut bytes = 0usize;

        for field in doc.fields() {
            let name = field.name();
            let value = field.value();
            let base = next_position.get(name).copied().unwrap_or(0);

            if field.is_tokenized() {
                let mut count = 0u32;
                let mut last = base;
                for token in self.config.analyzer.analyze(value)? {
                    if token.is_stopped() {
                        continue;
                    }
                    let position = base + token.position as u32;
                    terms
                        .entry(term_key(name, &token.text))
                        .or_default()
                        .push(position);
                    count += 1;
                    last = position + 1;
                }
                *segment_doc.field_lengths.entry(name.to_string()).or_insert(0) += count;
                next_position.insert(name.to_string(), last.max(base + 1));
            } else {
                if !value.is_empty() {
                    terms.entry(term_key(name, value)).or_default().push(base);
                }
                segment_doc
                    .keywords
                    .entry(name.to_string())
                    .or_insert_with(|| value.to_string());
                next_position.insert(name.to_string(), base + 1);
            }

            if field.is_stored() {
                bytes += name.len() + value.len();
                segment_doc.stored.push((name.to_string(), value.to_string()));
            }
        }

        for (key, positions) in &terms {
            bytes += key.len() + positions.len() * 4 + TERM_OVERHEAD_BYTES;
        }
        for (name, value) in &segment_doc.keywords {
            bytes += name.len() + value.len();
        }

        Ok(BufferedDoc {
            doc: segment_doc,
            terms,
            bytes,
        })
    }

    fn build_buffered_segment(&self, id: u64) -> Segment {
        let mut builder = SegmentBuilder::new(id);
        let mut postings: BTreeMap<&str, Vec<(u32, &Vec<u32>)>> = BTreeMap::new();

        for buffered in &self.buffered {
            let ordinal = builder.push_doc(buffered.doc.clone());
            for (key, positions) in &buffered.terms {
                postings
                    .entry(key.as_str())
                    .or_default()
                    .push((ordinal, positions));
            }
        }

        for (key, list) in postings {
            for (ordinal, positions) in list {
                builder.push_posting(key, ordinal, positions.clone());
            }
        }

        builder.build()
    }

    fn remove_unreferenced_files(&self) -> Result<()> {
        let live: Vec<String> = self
            .manifest
            .segments
            .iter()
            .map(|meta| segment_file_name(meta.id))
            .collect();

        for name in self.storage.list_files()? {
            let orphan_segment = name.starts_with("segment_")
                && name.ends_with(".seg")
                && !live.contains(&name);
            let leftover_temp = name.ends_with(".tmp");
            if (orphan_segment || leftover_temp) && name != MANIFEST_FILE {
                tracing::debug!(target: "pavise::index", file = %name, "Removing unreferenced file");
                self.storage.delete_file(&name)?;
            }
        }

        Ok(())
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(target: "pavise::index", error = %e, "Failed to close index writer on drop");
        }
    }
}
