//! Boolean query implementation for combining multiple queries.

use std::any::Any;
use std::collections::BTreeMap;

use crate::error::{PaviseError, Result};
use crate::query::query::{DocScores, Query, SearchContext};

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

/// A clause in a boolean query.
#[derive(Debug)]
pub struct BooleanClause {
    /// The query for this clause.
    pub query: Box<dyn Query>,
    /// The occurrence requirement.
    pub occur: Occur,
}

impl Clone for BooleanClause {
    fn clone(&self) -> Self {
        BooleanClause {
            query: self.query.clone_box(),
            occur: self.occur,
        }
    }
}

impl BooleanClause {
    /// Create a new boolean clause.
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    /// Create a MUST clause.
    pub fn must(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Must)
    }

    /// Create a SHOULD clause.
    pub fn should(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::Should)
    }

    /// Create a MUST_NOT clause.
    pub fn must_not(query: Box<dyn Query>) -> Self {
        BooleanClause::new(query, Occur::MustNot)
    }
}

/// A boolean query that combines multiple queries with boolean logic.
///
/// Required clauses intersect, optional clauses add to the score (and at
/// least one must match when nothing is required), prohibited clauses
/// subtract. A query made only of prohibited clauses matches nothing.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    /// The clauses in this boolean query.
    clauses: Vec<BooleanClause>,
    /// The boost factor for this query.
    boost: f32,
    /// Minimum number of should clauses that must match.
    minimum_should_match: usize,
}

impl BooleanQuery {
    /// Create a new empty boolean query.
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
            minimum_should_match: 0,
        }
    }

    /// Add a clause to this query.
    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    /// Add a MUST clause.
    pub fn add_must(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must(query));
    }

    /// Add a SHOULD clause.
    pub fn add_should(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::should(query));
    }

    /// Add a MUST_NOT clause.
    pub fn add_must_not(&mut self, query: Box<dyn Query>) {
        self.add_clause(BooleanClause::must_not(query));
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Set the minimum number of should clauses that must match.
    pub fn with_minimum_should_match(mut self, minimum: usize) -> Self {
        self.minimum_should_match = minimum;
        self
    }

    /// Get the clauses.
    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    /// Get the clauses, mutably.
    pub fn clauses_mut(&mut self) -> &mut Vec<BooleanClause> {
        &mut self.clauses
    }

    /// Take the clauses out of this query.
    pub fn into_clauses(self) -> Vec<BooleanClause> {
        self.clauses
    }

    /// Get the minimum should match.
    pub fn minimum_should_match(&self) -> usize {
        self.minimum_should_match
    }

    /// Check if this query has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Get clauses by occurrence type.
    pub fn clauses_by_occur(&self, occur: Occur) -> Vec<&BooleanClause> {
        self.clauses.iter().filter(|c| c.occur == occur).collect()
    }
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Query for BooleanQuery {
    fn execute(&self, ctx: &SearchContext<'_>) -> Result<DocScores> {
        if self.clauses.len() > ctx.max_clause_count() {
            return Err(PaviseError::bad_query(format!(
                "Too many clauses: {} (limit {})",
                self.clauses.len(),
                ctx.max_clause_count()
            )));
        }

        let mut required: Option<DocScores> = None;
        let mut optional: Vec<DocScores> = Vec::new();
        let mut prohibited: Vec<DocScores> = Vec::new();

        for clause in &self.clauses {
            let scores = clause.query.execute(ctx)?;
            match clause.occur {
                Occur::Must => {
                    required = Some(match required {
                        None => scores,
                        Some(acc) => acc
                            .into_iter()
                            .filter_map(|(doc, score)| scores.get(&doc).map(|s| (doc, score + s)))
                            .collect(),
                    });
                }
                Occur::Should => optional.push(scores),
                Occur::MustNot => prohibited.push(scores),
            }
        }

        let min_should = if required.is_none() {
            self.minimum_should_match.max(1)
        } else {
            self.minimum_should_match
        };

        let mut should_hits: DocScores = DocScores::new();
        let mut should_counts: BTreeMap<u32, usize> = BTreeMap::new();
        for scores in &optional {
            for (&doc, &score) in scores {
                *should_hits.entry(doc).or_insert(0.0) += score;
                *should_counts.entry(doc).or_insert(0) += 1;
            }
        }

        let mut result = match required {
            Some(required) => required
                .into_iter()
                .filter(|(doc, _)| should_counts.get(doc).copied().unwrap_or(0) >= min_should)
                .map(|(doc, score)| (doc, score + should_hits.get(&doc).copied().unwrap_or(0.0)))
                .collect::<DocScores>(),
            None => should_hits
                .into_iter()
                .filter(|(doc, _)| should_counts.get(doc).copied().unwrap_or(0) >= min_should)
                .collect(),
        };

        for scores in &prohibited {
            result.retain(|doc, _| !scores.contains_key(doc));
        }

        if self.boost != 1.0 {
            for score in result.values_mut() {
                *score *= self.boost;
            }
        }

        Ok(result)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                let inner = clause.query.description();
                let inner = if clause.query.as_any().is::<BooleanQuery>() {
                    format!("({inner})")
                } else {
                    inner
                };
                match clause.occur {
                    Occur::Must => format!("+{inner}"),
                    Occur::Should => inner,
                    Occur::MustNot => format!("-{inner}"),
                }
            })
            .collect();

        if self.boost == 1.0 {
            parts.join(" ")
        } else {
            format!("({})^{}", parts.join(" "), self.boost)
        }
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builder for creating boolean queries.
#[derive(Debug)]
pub struct BooleanQueryBuilder {
    query: BooleanQuery,
}

impl BooleanQueryBuilder {
    /// Create a new boolean query builder.
    pub fn new() -> Self {
        BooleanQueryBuilder {
            query: BooleanQuery::new(),
        }
    }

    /// Add a MUST clause.
    pub fn must(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_must(query);
        self
    }

    /// Add a SHOULD clause.
    pub fn should(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_should(query);
        self
    }

    /// Add a MUST_NOT clause.
    pub fn must_not(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_must_not(query);
        self
    }

    /// Set the boost factor.
    pub fn boost(mut self, boost: f32) -> Self {
        self.query = self.query.with_boost(boost);
        self
    }

    /// Set the minimum should match.
    pub fn minimum_should_match(mut self, minimum: usize) -> Self {
        self.query = self.query.with_minimum_should_match(minimum);
        self
    }

    /// Build the boolean query.
    pub fn build(self) -> BooleanQuery {
        self.query
    }
}

impl Default for BooleanQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
