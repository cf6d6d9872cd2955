//! Queries that expand to the set of indexed terms they cover.
//!
//! Prefix, wildcard and range queries walk the sorted term dictionary of
//! one field. Matching documents receive a constant score equal to the
//! query's boost. Expansions past the clause limit are rejected.

use std::any::Any;
use std::collections::BTreeSet;

use crate::error::{PaviseError, Result};
use crate::query::query::{DocScores, Query, SearchContext};

/// Collect terms of `field` from `from` while `keep_going` holds, retaining
/// those accepted by `accept`.
pub(crate) fn expand_terms<K, A>(
    ctx: &SearchContext<'_>,
    field: &str,
    from: &str,
    keep_going: K,
    accept: A,
) -> Result<BTreeSet<String>>
where
    K: Fn(&str) -> bool,
    A: Fn(&str) -> bool,
{
    let terms: BTreeSet<String> = ctx
        .reader()
        .field_terms_while(field, from, keep_going)
        .into_iter()
        .filter(|term| accept(term))
        .collect();

    if terms.len() > ctx.max_clause_count() {
        return Err(PaviseError::bad_query(format!(
            "Too many clauses: {field}:{from}* expands to {} terms (limit {})",
            terms.len(),
            ctx.max_clause_count()
        )));
    }

    Ok(terms)
}

/// Constant-score union of the live documents holding any of `terms`.
pub(crate) fn constant_score(
    ctx: &SearchContext<'_>,
    field: &str,
    terms: &BTreeSet<String>,
    boost: f32,
) -> DocScores {
    let mut scores = DocScores::new();
    for term in terms {
        for (doc, _) in ctx.reader().postings(field, term) {
            scores.insert(doc, boost);
        }
    }
    scores
}

/// A query matching terms that start with a prefix.
#[derive(Debug, Clone)]
pub struct PrefixQuery {
    field: String,
    prefix: String,
    boost: f32,
}

impl PrefixQuery {
    /// Create a new prefix query.
    pub fn new<F: Into<String>, P: Into<String>>(field: F, prefix: P) -> Self {
        PrefixQuery {
            field: field.into(),
            prefix: prefix.into(),
            boost: 1.0,
        }
    }

    /// Get the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Query for PrefixQuery {
    fn execute(&self, ctx: &SearchContext<'_>) -> Result<DocScores> {
        let prefix = self.prefix.as_str();
        let terms = expand_terms(
            ctx,
            &self.field,
            prefix,
            |term| term.starts_with(prefix),
            |_| true,
        )?;
        Ok(constant_score(ctx, &self.field, &terms, self.boost))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn description(&self) -> String {
        format!("{}:{}*", self.field, self.prefix)
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
    fn test_prefix_query() {
        let (_dir, reader) = build_reader(vec![
            Document::builder().id("1").add_text("title", "testing").build(),
            Document::builder().id("2").add_text("title", "tester").build(),
            Document::builder().id("3").add_text("title", "toast").build(),
        ]);
        let ctx = SearchContext::new(&reader, 1024);

        let mut query = PrefixQuery::new("title", "test");
        query.set_boost(3.0);
        let scores = query.execute(&ctx).unwrap();
        assert_eq!(scores.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert!(scores.values().all(|&score| score == 3.0));
    }

    #[test]
    fn test_prefix_respects_clause_limit() {
        let (_dir, reader) = build_reader(vec![
            Document::builder().id("1").add_text("title", "ta tb tc").build(),
        ]);
        let ctx = SearchContext::new(&reader, 2);

        let err = PrefixQuery::new("title", "t").execute(&ctx).unwrap_err();
        assert!(matches!(err, PaviseError::BadQuery(_)));
        assert!(
            PrefixQuery::new("title", "tb")
                .execute(&ctx)
                .unwrap()
                .contains_key(&0)
        );
    }
}
