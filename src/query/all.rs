//! Query matching every live document.

use std::any::Any;

use crate::error::Result;
use crate::query::query::{DocScores, Query, SearchContext};

/// Matches all live documents with a constant score.
#[derive(Debug, Clone)]
pub struct MatchAllQuery {
    boost: f32,
}

impl MatchAllQuery {
    /// Create a new match-all query.
    pub fn new() -> Self {
        MatchAllQuery { boost: 1.0 }
    }
}

impl Default for MatchAllQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Query for MatchAllQuery {
    fn execute(&self, ctx: &SearchContext<'_>) -> Result<DocScores> {
        Ok(ctx
            .reader()
            .live_docs()
            .map(|doc| (doc, self.boost))
            .collect())
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        "*:*".to_string()
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
