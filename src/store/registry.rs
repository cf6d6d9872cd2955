//! Named indexes under one root directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SearchConfig;
use crate::error::{PaviseError, Result};
use crate::events::EntityEvent;
use crate::index::IndexSearcher;
use crate::mapper::{DocumentMapper, Entity, MappingRegistry, TextExtractor};
use crate::search::SearchQuery;
use crate::source::RecordSource;
use crate::store::handle::{HandleOptions, IndexHandle, IndexStats};
use crate::store::managed::ManagedIndex;

/// Owner of every index handle of one index root.
///
/// Each mapped entity type has one index named after the type, stored in a
/// directory of that name under the root. Handles are opened on first use
/// and kept until [`close`](Self::close), [`delete`](Self::delete) or drop.
pub struct Registry {
    config: SearchConfig,
    options: HandleOptions,
    mapper: DocumentMapper,
    source: Arc<dyn RecordSource>,
    pub(crate) handles: Mutex<BTreeMap<String, Arc<IndexHandle>>>,
    /// Per-name guards serializing the first open of an index, so the
    /// registry-wide map is never locked across directory I/O.
    opening: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("mapper", &self.mapper)
            .field("open", &self.handles.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Validate `config` and create the index root.
    pub fn new(
        config: SearchConfig,
        mappings: MappingRegistry,
        source: Arc<dyn RecordSource>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self> {
        let options = HandleOptions::from_config(&config)?;
        std::fs::create_dir_all(&config.index_root).map_err(|e| {
            PaviseError::configuration(format!(
                "Cannot create index root {}: {e}",
                config.index_root.display()
            ))
        })?;

        tracing::info!(
            target: "pavise::store",
            root = %config.index_root.display(),
            sync = config.sync_writes,
            analyzer = %config.analyzer,
            mapped = mappings.len(),
            "Started search registry"
        );

        Ok(Registry {
            config,
            options,
            mapper: DocumentMapper::new(Arc::new(mappings), extractor),
            source,
            handles: Mutex::new(BTreeMap::new()),
            opening: Mutex::new(BTreeMap::new()),
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Directory holding every index.
    pub fn root(&self) -> &Path {
        &self.config.index_root
    }

    /// Entity mappings.
    pub fn mappings(&self) -> &Arc<MappingRegistry> {
        self.mapper.mappings()
    }

    /// The document mapper.
    pub fn mapper(&self) -> &DocumentMapper {
        &self.mapper
    }

    /// The primary datastore.
    pub fn source(&self) -> &Arc<dyn RecordSource> {
        &self.source
    }

    pub(crate) fn options(&self) -> &HandleOptions {
        &self.options
    }

    pub(crate) fn index_path(&self, name: &str) -> PathBuf {
        self.config.index_root.join(name)
    }

    /// The handle of the named index, opening it on first use.
    pub fn open(&self, name: &str) -> Result<Arc<IndexHandle>> {
        check_name(name)?;

        if let Some(handle) = self.handles.lock().get(name) {
            return Ok(Arc::clone(handle));
        }

        // Opening clears a stale write lock, so two opens of one name must
        // not overlap; opens of other names proceed in parallel.
        let guard = Arc::clone(self.opening.lock().entry(name.to_string()).or_default());
        let _opening = guard.lock();
        if let Some(handle) = self.handles.lock().get(name) {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(IndexHandle::open(
            name,
            self.index_path(name),
            self.options.clone(),
        )?);
        let mut handles = self.handles.lock();
        Ok(Arc::clone(
            handles.entry(name.to_string()).or_insert(handle),
        ))
    }

    /// Index `entity` into the index of its type, replacing its previous
    /// document. Entities of unmapped types are skipped with a warning.
    pub fn index(&self, entity: &dyn Entity) -> Result<()> {
        let entity_type = entity.entity_type().to_string();
        self.index_as(entity, &entity_type)
    }

    /// Index `entity` into the named index.
    pub fn index_as(&self, entity: &dyn Entity, name: &str) -> Result<()> {
        let Some(mapping) = self.mapper.mapping_for(entity) else {
            tracing::warn!(
                target: "pavise::store",
                entity_type = %entity.entity_type(),
                id = %entity.id(),
                "Entity type has no search mapping, not indexing"
            );
            return Ok(());
        };

        let doc = self.mapper.map_with(entity, mapping)?;
        self.open(name)?.write(doc)
    }

    /// Remove `entity` from the index of its type. Unmapped types are a no-op.
    pub fn un_index(&self, entity: &dyn Entity) -> Result<()> {
        if self.mapper.mapping_for(entity).is_none() {
            return Ok(());
        }
        self.open(entity.entity_type())?.delete(&entity.id())
    }

    /// Apply a lifecycle event of the host application.
    pub fn on_event(&self, event: &EntityEvent) -> Result<()> {
        match event {
            EntityEvent::Persisted(entity) | EntityEvent::Updated(entity) => {
                self.index(entity.as_ref())
            }
            EntityEvent::Deleted(entity) => self.un_index(entity.as_ref()),
        }
    }

    /// Start a query against the index of `entity_type`.
    pub fn search<Q: Into<String>, T: Into<String>>(
        &self,
        query: Q,
        entity_type: T,
    ) -> SearchQuery<'_> {
        SearchQuery::new(self, query, entity_type)
    }

    /// The current searcher of the named index.
    pub fn searcher(&self, name: &str) -> Result<Arc<IndexSearcher>> {
        self.open(name)?.searcher()
    }

    /// Statistics of the named index.
    pub fn stats(&self, name: &str) -> Result<IndexStats> {
        self.open(name)?.stats()
    }

    /// Admin view of every mapped entity type, with its record count in the
    /// primary datastore.
    pub fn list_indexes(&self) -> Result<Vec<ManagedIndex>> {
        let entity_types: Vec<String> = self
            .mappings()
            .entity_types()
            .map(str::to_string)
            .collect();

        entity_types
            .into_iter()
            .map(|entity_type| {
                let stats = self.stats(&entity_type)?;
                let record_count = self.source.count(&entity_type)?;
                Ok(ManagedIndex::new(stats, record_count))
            })
            .collect()
    }

    /// Merge the named index into one segment. Returns `false` if it already
    /// was.
    pub fn optimize(&self, name: &str) -> Result<bool> {
        self.open(name)?.optimize()
    }

    /// Flush the named index and reopen its searcher.
    pub fn reopen(&self, name: &str) -> Result<Arc<IndexSearcher>> {
        self.open(name)?.reopen()
    }

    /// Whether a directory exists for the named index.
    pub fn has_index(&self, name: &str) -> bool {
        check_name(name).is_ok() && self.index_path(name).is_dir()
    }

    /// Names of the index directories under the root, sorted.
    pub fn index_names(&self) -> Result<Vec<String>> {
        let root = self.root();
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Close the named index and remove its directory.
    pub fn delete(&self, name: &str) -> Result<()> {
        check_name(name)?;

        if let Some(handle) = self.handles.lock().remove(name) {
            handle.close()?;
        }

        let path = self.index_path(name);
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }

        tracing::info!(target: "pavise::store", index = %name, "Deleted index");
        Ok(())
    }

    /// Close every index and remove every directory under the root.
    pub fn delete_all(&self) -> Result<()> {
        self.close()?;

        for name in self.index_names()? {
            std::fs::remove_dir_all(self.index_path(&name))?;
        }

        tracing::info!(target: "pavise::store", root = %self.root().display(), "Deleted all indexes");
        Ok(())
    }

    /// Flush and close every open handle.
    ///
    /// Every handle is closed even if some fail; the first failure is
    /// returned.
    pub fn close(&self) -> Result<()> {
        let handles = std::mem::take(&mut *self.handles.lock());

        let mut first_error = None;
        for (name, handle) in handles {
            if let Err(e) = handle.close() {
                tracing::error!(target: "pavise::store", index = %name, error = %e, "Failed to close index");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(target: "pavise::store", error = %e, "Failed to close registry on drop");
        }
    }
}

/// Index names become directory names; keep them to one path component.
fn check_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        Err(PaviseError::index(format!("Invalid index name '{name}'")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{EntityMapping, ExtractorRegistry, FieldMapping, FieldValue};
    use crate::source::EmptySource;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Note {
        id: u32,
        text: &'static str,
    }

    impl Entity for Note {
        fn entity_type(&self) -> &str {
            "Note"
        }

        fn id(&self) -> String {
            self.id.to_string()
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "text" => Some(self.text.into()),
                _ => None,
            }
        }
    }

    #[derive(Debug)]
    struct Unmapped;

    impl Entity for Unmapped {
        fn entity_type(&self) -> &str {
            "Unmapped"
        }

        fn id(&self) -> String {
            "1".to_string()
        }

        fn field(&self, _name: &str) -> Option<FieldValue> {
            None
        }
    }

    fn registry(dir: &TempDir) -> Registry {
        let mappings = MappingRegistry::new()
            .register(EntityMapping::new("Note").field(FieldMapping::new("text")));
        Registry::new(
            SearchConfig::new(dir.path().join("search")),
            mappings,
            Arc::new(EmptySource),
            Arc::new(ExtractorRegistry::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_concurrent_opens_share_one_handle() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let handles: Vec<Arc<IndexHandle>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.open("Note").unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));

        registry.index(&Note { id: 1, text: "shared" }).unwrap();
        assert_eq!(registry.searcher("Note").unwrap().num_docs(), 1);
    }

    #[test]
    fn test_open_does_not_wait_on_other_indexes() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let guard = Arc::clone(registry.opening.lock().entry("Slow".to_string()).or_default());
        let _held = guard.lock();
        let handle = registry.open("Note").unwrap();
        assert_eq!(handle.name(), "Note");
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let a = registry.open("Note").unwrap();
        let b = registry.open("Note").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.has_index("Note"));
        assert!(!registry.has_index("Other"));
        assert_eq!(registry.index_names().unwrap(), vec!["Note".to_string()]);
    }

    #[test]
    fn test_invalid_names() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        assert!(registry.open("").is_err());
        assert!(registry.open("../escape").is_err());
        assert!(registry.open("..").is_err());
        assert!(!registry.has_index(".."));
    }

    #[test]
    fn test_index_and_un_index() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        registry.index(&Note { id: 1, text: "hello world" }).unwrap();
        registry.index(&Note { id: 1, text: "hello again" }).unwrap();
        assert_eq!(registry.searcher("Note").unwrap().num_docs(), 1);

        registry.un_index(&Note { id: 1, text: "" }).unwrap();
        assert_eq!(registry.searcher("Note").unwrap().num_docs(), 0);
    }

    #[test]
    fn test_unmapped_entities_are_ignored() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        registry.index(&Unmapped).unwrap();
        registry.un_index(&Unmapped).unwrap();
        assert!(!registry.has_index("Unmapped"));
    }

    #[test]
    fn test_events() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let note: Arc<dyn Entity> = Arc::new(Note { id: 7, text: "event" });

        registry.on_event(&EntityEvent::Persisted(Arc::clone(&note))).unwrap();
        assert_eq!(registry.searcher("Note").unwrap().num_docs(), 1);

        registry.on_event(&EntityEvent::Deleted(note)).unwrap();
        assert_eq!(registry.searcher("Note").unwrap().num_docs(), 0);
    }

    #[test]
    fn test_delete_and_delete_all() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        registry.index(&Note { id: 1, text: "a" }).unwrap();
        registry.open("Other").unwrap();

        registry.delete("Note").unwrap();
        assert!(!registry.has_index("Note"));
        assert!(registry.has_index("Other"));

        registry.delete_all().unwrap();
        assert!(registry.index_names().unwrap().is_empty());
        assert!(registry.root().is_dir());
    }

    #[test]
    fn test_list_indexes() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        registry.index(&Note { id: 1, text: "a" }).unwrap();

        let indexes = registry.list_indexes().unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "Note");
        assert_eq!(indexes[0].num_docs, 1);
        assert_eq!(indexes[0].record_count, 0);
        assert!(indexes[0].is_drifted());
    }

    #[test]
    fn test_bad_config_fails_fast() {
        let dir = TempDir::new().unwrap();
        let result = Registry::new(
            SearchConfig::new(dir.path()).with_analyzer("nope"),
            MappingRegistry::new(),
            Arc::new(EmptySource),
            Arc::new(ExtractorRegistry::new()),
        );
        assert_eq!(
            result.unwrap_err().kind(),
            crate::error::ErrorKind::Configuration
        );
    }
}
