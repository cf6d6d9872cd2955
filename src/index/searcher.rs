//! Query execution over one reader generation.

use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::collector::{ScoreDoc, TopDocs, TopDocsCollector};
use crate::query::sort::{Sort, sort_hits};
use crate::query::{DEFAULT_MAX_CLAUSE_COUNT, Query, SearchContext};

/// Read-only searcher pinned to one committed generation.
///
/// Cloning is cheap; clones share the reader.
#[derive(Clone, Debug)]
pub struct IndexSearcher {
    reader: Arc<IndexReader>,
    max_clause_count: usize,
}

impl IndexSearcher {
    /// Create a searcher over a reader.
    pub fn new(reader: Arc<IndexReader>) -> Self {
        IndexSearcher {
            reader,
            max_clause_count: DEFAULT_MAX_CLAUSE_COUNT,
        }
    }

    /// Set the clause limit queries run under.
    pub fn with_max_clause_count(mut self, max_clause_count: usize) -> Self {
        self.max_clause_count = max_clause_count;
        self
    }

    /// The underlying reader.
    pub fn reader(&self) -> &Arc<IndexReader> {
        &self.reader
    }

    /// Generation this searcher sees.
    pub fn generation(&self) -> u64 {
        self.reader.generation()
    }

    /// Number of live documents visible to this searcher.
    pub fn num_docs(&self) -> u32 {
        self.reader.num_docs()
    }

    /// Run a query, keeping at most `limit` hits in `sort` order.
    pub fn search(&self, query: &dyn Query, sort: &Sort, limit: usize) -> Result<TopDocs> {
        let ctx = SearchContext::new(&self.reader, self.max_clause_count);
        let scores = query.execute(&ctx)?;

        let top = if sort.is_relevance() {
            let mut collector = TopDocsCollector::new(limit);
            for (doc, score) in scores {
                collector.collect(doc, score);
            }
            collector.into_top_docs()
        } else {
            let mut hits: Vec<ScoreDoc> = scores
                .into_iter()
                .map(|(doc, score)| ScoreDoc { doc, score })
                .collect();
            let total_hits = hits.len();
            sort_hits(&self.reader, &mut hits, sort);
            hits.truncate(limit);
            TopDocs { total_hits, hits }
        };

        tracing::debug!(
            target: "pavise::search",
            query = %query.description(),
            generation = self.generation(),
            total_hits = top.total_hits,
            "Executed query"
        );

        Ok(top)
    }

    /// Number of documents a query matches.
    pub fn count(&self, query: &dyn Query) -> Result<usize> {
        let ctx = SearchContext::new(&self.reader, self.max_clause_count);
        Ok(query.execute(&ctx)?.len())
    }

    /// Stored fields of a live document.
    pub fn doc(&self, doc: u32) -> Option<&[(String, String)]> {
        self.reader.stored_fields(doc)
    }

    /// The `_docID` of a live document.
    pub fn doc_id(&self, doc: u32) -> Option<&str> {
        self.reader.doc_id(doc)
    }
}
