//! Paged, sorted queries against one entity type's index.
//!
//! A [`SearchQuery`] is built from a query string and refined with
//! [`page`](SearchQuery::page), [`all`](SearchQuery::all),
//! [`order_by`](SearchQuery::order_by) and [`reverse`](SearchQuery::reverse).
//! Nothing runs until the first of [`count`](SearchQuery::count),
//! [`fetch`](SearchQuery::fetch), [`fetch_ids`](SearchQuery::fetch_ids) or
//! [`execute_query`](SearchQuery::execute_query); the outcome is then kept
//! for the lifetime of the query.
//!
//! Bare terms in the query string match the `_docID` field; other fields,
//! `allfield` included, must be named.
//!
//! # Examples
//!
//! ```no_run
//! # use pavise::store::Registry;
//! # fn example(registry: &Registry) -> pavise::error::Result<()> {
//! let ids = registry
//!     .search("title:intro", "Article")
//!     .order_by(["rank"])
//!     .reverse()
//!     .page(0, 20)
//!     .fetch_ids()?;
//! # Ok(())
//! # }
//! ```

use std::cell::OnceCell;
use std::sync::Arc;

use crate::document::{DOC_ID_FIELD, untokenized_name};
use crate::error::{PaviseError, Result};
use crate::mapper::{Entity, EntityMapping};
use crate::query::{QueryParser, Sort, SortField};
use crate::store::Registry;

/// Page size of a query that was never paged.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One hit of a query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// The `_docID` of the hit.
    pub id: String,
    /// Relevance score.
    pub score: f32,
    /// The record loaded from the primary datastore, when hydrated.
    pub object: Option<Arc<dyn Entity>>,
}

#[derive(Debug)]
struct Executed {
    total_hits: usize,
    hits: Vec<(String, f32)>,
}

/// A lazily executed query against the index of one entity type.
#[derive(Debug)]
pub struct SearchQuery<'r> {
    registry: &'r Registry,
    query: String,
    entity_type: String,
    offset: usize,
    size: Option<usize>,
    order_by: Vec<String>,
    reverse: bool,
    executed: OnceCell<Executed>,
}

impl<'r> SearchQuery<'r> {
    /// A first-page query; see [`Registry::search`].
    pub fn new<Q: Into<String>, T: Into<String>>(
        registry: &'r Registry,
        query: Q,
        entity_type: T,
    ) -> Self {
        SearchQuery {
            registry,
            query: query.into(),
            entity_type: entity_type.into(),
            offset: 0,
            size: Some(DEFAULT_PAGE_SIZE),
            order_by: Vec::new(),
            reverse: false,
            executed: OnceCell::new(),
        }
    }

    /// Return `size` hits starting at `offset`. A size of zero means every
    /// hit, and the offset is ignored.
    pub fn page(mut self, offset: usize, size: usize) -> Self {
        self.size = (size > 0).then_some(size);
        self.offset = if size > 0 { offset } else { 0 };
        self.executed = OnceCell::new();
        self
    }

    /// Return every hit.
    pub fn all(self) -> Self {
        self.page(0, 0)
    }

    /// Sort ascending on the given fields, most significant first, instead
    /// of by relevance.
    pub fn order_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = fields.into_iter().map(Into::into).collect();
        self.executed = OnceCell::new();
        self
    }

    /// Sort descending. Only legal with exactly one sort field.
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self.executed = OnceCell::new();
        self
    }

    /// The raw query string.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The entity type, which names the index searched.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Number of matches, regardless of paging.
    pub fn count(&self) -> Result<usize> {
        Ok(self.execute()?.total_hits)
    }

    /// Identifiers of the hits in the page.
    pub fn fetch_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .execute()?
            .hits
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    /// Records of the hits in the page, loaded from the primary datastore.
    ///
    /// Fails with a stale-index error if a hit no longer exists there.
    pub fn fetch(&self) -> Result<Vec<Arc<dyn Entity>>> {
        self.execute()?
            .hits
            .iter()
            .map(|(id, _)| self.load(id))
            .collect()
    }

    /// Hits in the page with their scores, and their records if `hydrate`.
    pub fn execute_query(&self, hydrate: bool) -> Result<Vec<QueryResult>> {
        self.execute()?
            .hits
            .iter()
            .map(|(id, score)| {
                let object = if hydrate { Some(self.load(id)?) } else { None };
                Ok(QueryResult {
                    id: id.clone(),
                    score: *score,
                    object,
                })
            })
            .collect()
    }

    fn load(&self, id: &str) -> Result<Arc<dyn Entity>> {
        self.registry
            .source()
            .find(&self.entity_type, id)?
            .ok_or_else(|| {
                PaviseError::stale_index(format!(
                    "{} '{id}' is in the index but not in the datastore",
                    self.entity_type
                ))
            })
    }

    fn execute(&self) -> Result<&Executed> {
        if let Some(executed) = self.executed.get() {
            return Ok(executed);
        }
        let executed = self.run()?;
        Ok(self.executed.get_or_init(|| executed))
    }

    fn run(&self) -> Result<Executed> {
        if self.reverse && self.order_by.len() > 1 {
            return Err(PaviseError::bad_sort(format!(
                "reverse() needs exactly one sort field, got {}",
                self.order_by.len()
            )));
        }

        let mapping = self.registry.mappings().get(&self.entity_type).cloned();
        let untokenized = mapping
            .as_ref()
            .map(|m| m.untokenized_fields())
            .unwrap_or_default();
        let parser = QueryParser::new(Arc::clone(&self.registry.options().analyzer))
            .with_default_field(DOC_ID_FIELD)
            .with_untokenized_fields(untokenized);
        let query = parser.parse(&self.query)?;
        let sort = self.sort(mapping.as_deref());

        let searcher = self.registry.searcher(&self.entity_type)?;
        let limit = match self.size {
            Some(size) => self.offset.saturating_add(size),
            None => usize::MAX,
        };
        let top = searcher.search(query.as_ref(), &sort, limit)?;

        let hits = top
            .hits
            .iter()
            .skip(self.offset)
            .filter_map(|hit| {
                searcher
                    .doc_id(hit.doc)
                    .map(|id| (id.to_string(), hit.score))
            })
            .collect();

        Ok(Executed {
            total_hits: top.total_hits,
            hits,
        })
    }

    fn sort(&self, mapping: Option<&EntityMapping>) -> Sort {
        let fields = self
            .order_by
            .iter()
            .map(|field| {
                let key = match mapping {
                    Some(mapping) if mapping.is_forced_untokenized(field) => {
                        untokenized_name(field)
                    }
                    _ => field.clone(),
                };
                SortField::new(key).with_reverse(self.reverse)
            })
            .collect();
        Sort::by(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::error::ErrorKind;
    use crate::mapper::{ExtractorRegistry, FieldMapping, FieldValue, MappingRegistry};
    use crate::source::EmptySource;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Item(u32);

    impl Entity for Item {
        fn entity_type(&self) -> &str {
            "Item"
        }

        fn id(&self) -> String {
            format!("item-{}", self.0)
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "name" => Some(format!("widget number {}", self.0).into()),
                "rank" => Some(i64::from(self.0).into()),
                _ => None,
            }
        }
    }

    fn registry(dir: &TempDir) -> Registry {
        let mapping = EntityMapping::new("Item")
            .field(FieldMapping::new("name"))
            .field(FieldMapping::new("rank").sortable(true));
        Registry::new(
            SearchConfig::new(dir.path()),
            MappingRegistry::new().register(mapping),
            Arc::new(EmptySource),
            Arc::new(ExtractorRegistry::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_default_page_is_ten() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        for i in 0..12 {
            registry.index(&Item(i)).unwrap();
        }

        let query = registry.search("allfield:widget", "Item");
        assert_eq!(query.count().unwrap(), 12);
        assert_eq!(query.fetch_ids().unwrap().len(), 10);
        assert_eq!(registry.search("allfield:widget", "Item").all().fetch_ids().unwrap().len(), 12);
    }

    #[test]
    fn test_sorted_paging() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        for i in [3, 11, 2, 1] {
            registry.index(&Item(i)).unwrap();
        }

        let ids = registry
            .search("allfield:widget", "Item")
            .order_by(["rank"])
            .page(1, 2)
            .fetch_ids()
            .unwrap();
        assert_eq!(ids, vec!["item-2", "item-3"]);

        let ids = registry
            .search("allfield:widget", "Item")
            .order_by(["rank"])
            .reverse()
            .all()
            .fetch_ids()
            .unwrap();
        assert_eq!(ids, vec!["item-11", "item-3", "item-2", "item-1"]);

        let empty = registry.search("allfield:widget", "Item").page(5, 10);
        assert!(empty.fetch_ids().unwrap().is_empty());
        assert_eq!(empty.count().unwrap(), 4);
    }

    #[test]
    fn test_unbounded_page_ignores_offset() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        for i in 1..=5 {
            registry.index(&Item(i)).unwrap();
        }

        let ids = registry
            .search("allfield:widget", "Item")
            .order_by(["rank"])
            .page(3, 0)
            .fetch_ids()
            .unwrap();
        assert_eq!(ids, vec!["item-1", "item-2", "item-3", "item-4", "item-5"]);
    }

    #[test]
    fn test_bare_terms_match_identifiers() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        registry.index(&Item(3)).unwrap();
        registry.index(&Item(7)).unwrap();

        assert_eq!(
            registry.search("item-3", "Item").fetch_ids().unwrap(),
            vec!["item-3"]
        );
        assert_eq!(registry.search("3", "Item").count().unwrap(), 0);
        assert_eq!(registry.search("allfield:3", "Item").count().unwrap(), 1);
    }

    #[test]
    fn test_reverse_with_many_fields_fails_before_parsing() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let err = registry
            .search("title:(", "Item")
            .order_by(["rank", "name"])
            .reverse()
            .count()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadSort);
    }

    #[test]
    fn test_bad_query_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let err = registry.search("name:(widget", "Item").count().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadQuery);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_results_are_memoized() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        registry.index(&Item(1)).unwrap();

        let query = registry.search("allfield:widget", "Item");
        assert_eq!(query.count().unwrap(), 1);

        registry.index(&Item(2)).unwrap();
        assert_eq!(query.count().unwrap(), 1);
        assert_eq!(registry.search("allfield:widget", "Item").count().unwrap(), 2);
    }

    #[test]
    fn test_unhydrated_results() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        registry.index(&Item(1)).unwrap();

        let results = registry.search("allfield:widget", "Item").execute_query(false).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "item-1");
        assert!(results[0].score > 0.0);
        assert!(results[0].object.is_none());

        let err = registry.search("allfield:widget", "Item").fetch().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StaleIndex);
    }
}
