//! One named index: its writer and its current searcher.
//!
//! All writes of a handle go through one mutex, so they apply in call order.
//! The current searcher lives behind a separate read-write lock and is only
//! ever replaced, never mutated: a searcher handed out before a reopen keeps
//! answering from its generation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::config::SearchConfig;
use crate::document::{DOC_ID_FIELD, Document};
use crate::error::{PaviseError, Result};
use crate::index::{IndexReader, IndexSearcher, IndexWriter, IndexWriterConfig, Manifest};
use crate::storage::{FileStorage, LockManager, Storage, StorageConfig, WRITE_LOCK_NAME};

/// Settings shared by every handle of a registry.
#[derive(Clone)]
pub struct HandleOptions {
    /// Flush and reopen after every write and delete.
    pub sync_writes: bool,
    /// Clause limit for queries run on this handle's searchers.
    pub max_clause_count: usize,
    /// Buffered bytes that force a flush in async mode.
    pub max_buffer_memory: usize,
    /// Analyzer for tokenized fields.
    pub analyzer: Arc<dyn Analyzer>,
}

impl HandleOptions {
    /// Options from a validated configuration.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let analyzer = config.validate()?;
        Ok(HandleOptions {
            sync_writes: config.sync_writes,
            max_clause_count: config.max_clause_count,
            max_buffer_memory: config.max_buffer_memory,
            analyzer,
        })
    }

    fn writer_config(&self) -> IndexWriterConfig {
        IndexWriterConfig::new(Arc::clone(&self.analyzer))
            .with_max_buffer_memory(self.max_buffer_memory)
    }
}

impl std::fmt::Debug for HandleOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleOptions")
            .field("sync_writes", &self.sync_writes)
            .field("max_clause_count", &self.max_clause_count)
            .field("max_buffer_memory", &self.max_buffer_memory)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

/// Statistics of the last committed generation of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index name.
    pub name: String,
    /// Committed generation.
    pub generation: u64,
    /// Live documents.
    pub num_docs: u64,
    /// Deleted documents not yet merged away.
    pub num_deleted: u64,
    /// Committed segments.
    pub segment_count: usize,
    /// At most one segment and no deletions.
    pub optimized: bool,
    /// Documents buffered by the writer and not yet committed.
    pub pending_docs: usize,
}

struct HandleState {
    storage: Arc<FileStorage>,
    writer: Option<IndexWriter>,
    closed: bool,
}

/// Writer/searcher pair of one named index directory.
pub struct IndexHandle {
    name: String,
    directory: PathBuf,
    options: HandleOptions,
    state: Mutex<HandleState>,
    searcher: RwLock<Option<Arc<IndexSearcher>>>,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("options", &self.options)
            .finish()
    }
}

impl IndexHandle {
    /// Open the index stored in `directory`, creating the directory if needed.
    ///
    /// A write lock left in the directory is taken to be the remnant of a
    /// crashed writer and removed. Nothing tells it apart from the lock of a
    /// writer alive in another process.
    pub fn open<S, P>(name: S, directory: P, options: HandleOptions) -> Result<Self>
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        let name = name.into();
        let directory = directory.into();
        let storage = open_storage(&name, &directory)?;

        tracing::info!(
            target: "pavise::store",
            index = %name,
            directory = %directory.display(),
            sync = options.sync_writes,
            "Opened index"
        );

        Ok(IndexHandle {
            name,
            directory,
            options,
            state: Mutex::new(HandleState {
                storage: Arc::new(storage),
                writer: None,
                closed: false,
            }),
            searcher: RwLock::new(None),
        })
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the index lives in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether every write is followed by a flush and reopen.
    pub fn is_sync(&self) -> bool {
        self.options.sync_writes
    }

    /// Whether the handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Insert `doc`, replacing any document with the same `_docID`.
    pub fn write(&self, doc: Document) -> Result<()> {
        let mut state = self.state.lock();
        let doc_id = doc
            .doc_id()
            .map(str::to_string)
            .ok_or_else(|| PaviseError::index("Document has no _docID"))?;

        let writer = self.writer(&mut state)?;
        writer.update_document(DOC_ID_FIELD, &doc_id, doc)?;
        self.after_write(&mut state)
    }

    /// Remove the document with the given `_docID`.
    pub fn delete(&self, doc_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        let writer = self.writer(&mut state)?;
        writer.delete_by_id(doc_id)?;
        self.after_write(&mut state)
    }

    /// Insert `doc` without the per-write flush and reopen of sync mode.
    ///
    /// Bulk loads use this and call [`reopen`](Self::reopen) once at the end.
    pub(crate) fn write_deferred(&self, doc: Document) -> Result<()> {
        let mut state = self.state.lock();
        let doc_id = doc
            .doc_id()
            .map(str::to_string)
            .ok_or_else(|| PaviseError::index("Document has no _docID"))?;

        let writer = self.writer(&mut state)?;
        writer.update_document(DOC_ID_FIELD, &doc_id, doc)?;
        if writer.should_flush() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Commit buffered writes. Open searchers do not see them until a reopen.
    pub fn flush(&self) -> Result<bool> {
        let mut state = self.state.lock();
        self.check_open(&state)?;
        match state.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(false),
        }
    }

    /// Flush, then make the newest generation the current searcher.
    pub fn reopen(&self) -> Result<Arc<IndexSearcher>> {
        let mut state = self.state.lock();
        self.check_open(&state)?;
        if let Some(writer) = state.writer.as_mut() {
            writer.flush()?;
        }
        self.install_searcher(&state)
    }

    /// Merge every segment into one, dropping deleted documents, then reopen.
    ///
    /// Returns `false` if the index was already optimized.
    pub fn optimize(&self) -> Result<bool> {
        let mut state = self.state.lock();
        let optimized = self.writer(&mut state)?.optimize()?;
        self.install_searcher(&state)?;

        tracing::info!(
            target: "pavise::store",
            index = %self.name,
            merged = optimized,
            "Optimized index"
        );

        Ok(optimized)
    }

    /// The current searcher, opening one over the committed generation if
    /// there is none yet.
    pub fn searcher(&self) -> Result<Arc<IndexSearcher>> {
        if let Some(searcher) = self.searcher.read().as_ref() {
            return Ok(Arc::clone(searcher));
        }

        let state = self.state.lock();
        self.check_open(&state)?;
        if let Some(searcher) = self.searcher.read().as_ref() {
            return Ok(Arc::clone(searcher));
        }
        self.install_searcher(&state)
    }

    /// Statistics of the last committed generation.
    pub fn stats(&self) -> Result<IndexStats> {
        let state = self.state.lock();
        self.check_open(&state)?;

        let (manifest, pending_docs) = match state.writer.as_ref() {
            Some(writer) => (writer.manifest().clone(), writer.pending_docs()),
            None => (Manifest::load(state.storage.as_ref())?, 0),
        };

        Ok(IndexStats {
            name: self.name.clone(),
            generation: manifest.generation,
            num_docs: manifest.num_docs(),
            num_deleted: manifest.num_deleted(),
            segment_count: manifest.segments.len(),
            optimized: manifest.is_optimized(),
            pending_docs,
        })
    }

    /// Flush, close the writer and drop the current searcher.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        *self.searcher.write() = None;

        if let Some(mut writer) = state.writer.take() {
            writer.close()?;
        }

        tracing::info!(target: "pavise::store", index = %self.name, "Closed index");
        Ok(())
    }

    /// Replace this index's content with a fully built `shadow` index.
    ///
    /// The shadow is closed first. The swap then runs under this handle's
    /// lock: writes and searcher requests arriving meanwhile wait and see the
    /// new content. Searchers handed out earlier keep their generation.
    pub(crate) fn replace_with(&self, shadow: IndexHandle) -> Result<()> {
        shadow.close()?;

        let mut state = self.state.lock();
        self.check_open(&state)?;
        *self.searcher.write() = None;

        if let Some(mut writer) = state.writer.take() {
            writer.close()?;
        }

        if self.directory.exists() {
            std::fs::remove_dir_all(&self.directory)?;
        }
        std::fs::rename(&shadow.directory, &self.directory)?;

        state.storage = Arc::new(open_storage(&self.name, &self.directory)?);
        let searcher = self.install_searcher(&state)?;

        tracing::info!(
            target: "pavise::store",
            index = %self.name,
            shadow = %shadow.name,
            docs = searcher.num_docs(),
            "Swapped in rebuilt index"
        );

        Ok(())
    }

    fn check_open(&self, state: &HandleState) -> Result<()> {
        if state.closed {
            Err(PaviseError::index(format!("Index '{}' is closed", self.name)))
        } else {
            Ok(())
        }
    }

    fn writer<'a>(&self, state: &'a mut HandleState) -> Result<&'a mut IndexWriter> {
        self.check_open(state)?;

        let writer = match state.writer.take() {
            Some(writer) => writer,
            None => {
                let storage: Arc<dyn Storage> = state.storage.clone();
                let locks = state.storage.lock_manager();
                IndexWriter::open(storage, locks.as_ref(), self.options.writer_config())?
            }
        };
        Ok(state.writer.insert(writer))
    }

    fn after_write(&self, state: &mut HandleState) -> Result<()> {
        let Some(writer) = state.writer.as_mut() else {
            return Ok(());
        };

        if self.options.sync_writes || writer.should_flush() {
            writer.flush()?;
            self.install_searcher(state)?;
        }
        Ok(())
    }

    fn install_searcher(&self, state: &HandleState) -> Result<Arc<IndexSearcher>> {
        let reader = match state.writer.as_ref() {
            Some(writer) => writer.reader()?,
            None => IndexReader::open(state.storage.as_ref())?,
        };
        let searcher = Arc::new(
            IndexSearcher::new(Arc::new(reader)).with_max_clause_count(self.options.max_clause_count),
        );
        *self.searcher.write() = Some(Arc::clone(&searcher));

        tracing::debug!(
            target: "pavise::store",
            index = %self.name,
            generation = searcher.generation(),
            docs = searcher.num_docs(),
            "Reopened searcher"
        );

        Ok(searcher)
    }
}

impl Drop for IndexHandle {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(target: "pavise::store", index = %self.name, error = %e, "Failed to close index on drop");
        }
    }
}

fn open_storage(name: &str, directory: &Path) -> Result<FileStorage> {
    let storage = FileStorage::new(directory, StorageConfig::default())?;
    if storage.lock_manager().clear_stale_lock(WRITE_LOCK_NAME)? {
        tracing::warn!(
            target: "pavise::store",
            index = %name,
            directory = %directory.display(),
            "Removed stale write lock"
        );
    }
    Ok(storage)
}
