//! Term query implementation for exact term matching.

use std::any::Any;

use crate::error::Result;
use crate::query::query::{DocScores, Query, SearchContext};
use crate::query::scorer::BM25Scorer;

/// A query that matches documents containing a specific term.
#[derive(Debug, Clone)]
pub struct TermQuery {
    /// The field to search in.
    field: String,
    /// The term to search for.
    term: String,
    /// The boost factor for this query.
    boost: f32,
}

impl TermQuery {
    /// Create a new term query.
    ///
    /// The term is matched as given; callers normalize it beforehand (the
    /// query parser runs tokenized fields through the analyzer).
    pub fn new<F, T>(field: F, term: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    /// Get the term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl Query for TermQuery {
    fn execute(&self, ctx: &SearchContext<'_>) -> Result<DocScores> {
        let reader = ctx.reader();
        let postings = reader.postings(&self.field, &self.term);
        if postings.is_empty() {
            return Ok(DocScores::new());
        }

        let stats = reader.field_stats(&self.field);
        let scorer = BM25Scorer::new(
            postings.len() as u64,
            reader.num_docs() as u64,
            stats.avg_length(),
            self.boost,
        );

        Ok(postings
            .into_iter()
            .map(|(doc, posting)| {
                let length = reader.field_length(doc, &self.field) as f32;
                (doc, scorer.score(posting.freq() as f32, length))
            })
            .collect())
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        if self.boost == 1.0 {
            format!("{}:{}", self.field, self.term)
        } else {
            format!("{}:{}^{}", self.field, self.term, self.boost)
        }
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn field(&self) -> Option<&str> {
        Some(&self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::query::test_support::build_reader;

    #[test]
    fn test_term_query_matches() {
        let (_dir, reader) = build_reader(vec![
            Document::builder().id("1").add_text("title", "rust search").build(),
            Document::builder().id("2").add_text("title", "java search").build(),
            Document::builder().id("3").add_text("title", "rust rust rust").build(),
        ]);
        let ctx = SearchContext::new(&reader, 1024);

        let scores = TermQuery::new("title", "rust").execute(&ctx).unwrap();
        assert_eq!(scores.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert!(scores[&2] > scores[&0]);

        assert!(TermQuery::new("title", "python").execute(&ctx).unwrap().is_empty());
        assert!(TermQuery::new("body", "rust").execute(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_term_query_exact_on_untokenized() {
        let (_dir, reader) = build_reader(vec![
            Document::builder().id("a-1").build(),
            Document::builder().id("a-2").build(),
        ]);
        let ctx = SearchContext::new(&reader, 1024);

        let scores = TermQuery::new("_docID", "a-2").execute(&ctx).unwrap();
        assert_eq!(scores.len(), 1);
        assert!(scores.contains_key(&1));
    }

    #[test]
    fn test_description() {
        assert_eq!(TermQuery::new("title", "x").description(), "title:x");
        assert_eq!(
            TermQuery::new("title", "x").with_boost(2.0).description(),
            "title:x^2"
        );
    }
}
