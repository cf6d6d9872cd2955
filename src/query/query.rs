//! Base query trait and the context queries execute in.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::error::Result;
use crate::index::reader::IndexReader;

/// Scores of matching documents, keyed by global document address.
pub type DocScores = BTreeMap<u32, f32>;

/// Execution context handed to every query.
#[derive(Clone, Copy, Debug)]
pub struct SearchContext<'a> {
    reader: &'a IndexReader,
    max_clause_count: usize,
}

impl<'a> SearchContext<'a> {
    /// Create a context over a reader.
    pub fn new(reader: &'a IndexReader, max_clause_count: usize) -> Self {
        SearchContext {
            reader,
            max_clause_count,
        }
    }

    /// The reader being searched.
    pub fn reader(&self) -> &'a IndexReader {
        self.reader
    }

    /// Upper bound on boolean clauses and expanded terms.
    pub fn max_clause_count(&self) -> usize {
        self.max_clause_count
    }
}

/// Trait for search queries.
pub trait Query: Send + Sync + Debug {
    /// Find matching live documents and their scores.
    fn execute(&self, ctx: &SearchContext<'_>) -> Result<DocScores>;

    /// Get the boost factor for this query.
    fn boost(&self) -> f32;

    /// Set the boost factor for this query.
    fn set_boost(&mut self, boost: f32);

    /// Get a human-readable description of this query.
    fn description(&self) -> String;

    /// Clone this query.
    fn clone_box(&self) -> Box<dyn Query>;

    /// Get this query as Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Get the field name this query searches in, if applicable.
    /// Returns None for queries that don't target a specific field (e.g., BooleanQuery).
    fn field(&self) -> Option<&str> {
        None
    }
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
