//! Shared fixtures: an `Article` entity and an in-memory primary datastore.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use pavise::prelude::*;

#[derive(Debug, Clone)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub rank: String,
}

impl Article {
    pub fn new(id: u64, title: &str, rank: &str) -> Arc<Self> {
        Arc::new(Article {
            id,
            title: title.to_string(),
            rank: rank.to_string(),
        })
    }
}

impl Entity for Article {
    fn entity_type(&self) -> &str {
        "Article"
    }

    fn id(&self) -> String {
        self.id.to_string()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "title" => Some(self.title.as_str().into()),
            "rank" => Some(self.rank.as_str().into()),
            _ => None,
        }
    }
}

/// An entity type without a search mapping.
#[derive(Debug)]
pub struct AuditEntry(pub u64);

impl Entity for AuditEntry {
    fn entity_type(&self) -> &str {
        "AuditEntry"
    }

    fn id(&self) -> String {
        self.0.to_string()
    }

    fn field(&self, _name: &str) -> Option<FieldValue> {
        Some("audit".into())
    }
}

pub fn article_mapping() -> EntityMapping {
    EntityMapping::new("Article")
        .field(FieldMapping::new("title"))
        .field(FieldMapping::new("rank").sortable(true))
}

/// Primary datastore kept in memory, keyed by entity type then id.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: RwLock<BTreeMap<String, BTreeMap<String, Arc<dyn Entity>>>>,
}

impl MemorySource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, entity: Arc<dyn Entity>) {
        self.records
            .write()
            .entry(entity.entity_type().to_string())
            .or_default()
            .insert(entity.id(), entity);
    }

    pub fn remove(&self, entity_type: &str, id: &str) {
        if let Some(records) = self.records.write().get_mut(entity_type) {
            records.remove(id);
        }
    }
}

impl RecordSource for MemorySource {
    fn all(&self, entity_type: &str) -> Result<RecordIter<'_>> {
        let records: Vec<Arc<dyn Entity>> = self
            .records
            .read()
            .get(entity_type)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        Ok(Box::new(records.into_iter().map(Ok)))
    }

    fn count(&self, entity_type: &str) -> Result<u64> {
        Ok(self
            .records
            .read()
            .get(entity_type)
            .map_or(0, |records| records.len() as u64))
    }

    fn find(&self, entity_type: &str, id: &str) -> Result<Option<Arc<dyn Entity>>> {
        Ok(self
            .records
            .read()
            .get(entity_type)
            .and_then(|records| records.get(id).cloned()))
    }
}

pub fn registry(root: &Path, source: Arc<MemorySource>, sync_writes: bool) -> Registry {
    Registry::new(
        SearchConfig::new(root).with_sync_writes(sync_writes),
        MappingRegistry::new().register(article_mapping()),
        source,
        Arc::new(ExtractorRegistry::new()),
    )
    .unwrap()
}

/// Store `article` in the datastore and index it, the way a host does on
/// a persist event.
pub fn persist(registry: &Registry, source: &MemorySource, article: Arc<Article>) {
    source.insert(article.clone());
    registry.on_event(&EntityEvent::Persisted(article)).unwrap();
}
