//! Phrase query implementation.

use std::any::Any;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::index::segment::Posting;
use crate::query::query::{DocScores, Query, SearchContext};
use crate::query::scorer::BM25Scorer;

/// A query matching documents where terms occur at fixed relative positions.
///
/// Each term carries its position within the phrase, so gaps left by
/// removed stop words are honored.
#[derive(Debug, Clone)]
pub struct PhraseQuery {
    field: String,
    terms: Vec<(u32, String)>,
    boost: f32,
}

impl PhraseQuery {
    /// Create a phrase from consecutive terms.
    pub fn new<F: Into<String>>(field: F, terms: Vec<String>) -> Self {
        let terms = terms
            .into_iter()
            .enumerate()
            .map(|(position, term)| (position as u32, term))
            .collect();
        PhraseQuery {
            field: field.into(),
            terms,
            boost: 1.0,
        }
    }

    /// Create a phrase from terms with explicit relative positions.
    pub fn with_positions<F: Into<String>>(field: F, terms: Vec<(u32, String)>) -> Self {
        PhraseQuery {
            field: field.into(),
            terms,
            boost: 1.0,
        }
    }

    /// Get the terms and their relative positions.
    pub fn terms(&self) -> &[(u32, String)] {
        &self.terms
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    fn phrase_freq(first: &Posting, first_offset: u32, rest: &[(u32, &Posting)]) -> u32 {
        first
            .positions
            .iter()
            .filter(|&&start| {
                let Some(anchor) = start.checked_sub(first_offset) else {
                    return false;
                };
                rest.iter()
                    .all(|(offset, posting)| posting.positions.contains(&(anchor + offset)))
            })
            .count() as u32
    }
}

impl Query for PhraseQuery {
    fn execute(&self, ctx: &SearchContext<'_>) -> Result<DocScores> {
        let Some(((first_offset, first_term), rest_terms)) = self.terms.split_first() else {
            return Ok(DocScores::new());
        };

        let reader = ctx.reader();
        let num_docs = reader.num_docs() as u64;
        let stats = reader.field_stats(&self.field);

        let first = reader.postings(&self.field, first_term);
        let mut idf = BM25Scorer::new(first.len() as u64, num_docs, 0.0, 1.0).idf();
        let mut rest = Vec::with_capacity(rest_terms.len());
        for (offset, term) in rest_terms {
            let postings: BTreeMap<u32, &Posting> =
                reader.postings(&self.field, term).into_iter().collect();
            if postings.is_empty() {
                return Ok(DocScores::new());
            }
            idf += BM25Scorer::new(postings.len() as u64, num_docs, 0.0, 1.0).idf();
            rest.push((*offset, postings));
        }

        let tf_scorer = BM25Scorer::new(1, num_docs, stats.avg_length(), 1.0);
        let mut scores = DocScores::new();
        for (doc, posting) in first {
            let Some(matched) = rest
                .iter()
                .map(|(offset, postings)| postings.get(&doc).map(|p| (*offset, *p)))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };

            let freq = Self::phrase_freq(posting, *first_offset, &matched);
            if freq > 0 {
                let length = reader.field_length(doc, &self.field) as f32;
                scores.insert(doc, self.boost * idf * tf_scorer.tf(freq as f32, length));
            }
        }

        Ok(scores)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        let words: Vec<&str> = self.terms.iter().map(|(_, term)| term.as_str()).collect();
        format!("{}:\"{}\"", self.field, words.join(" "))
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
