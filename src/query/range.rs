//! Term range query implementation.

use std::any::Any;

use crate::error::Result;
use crate::query::multi_term::{constant_score, expand_terms};
use crate::query::query::{DocScores, Query, SearchContext};

/// A query matching terms between two bounds, compared lexicographically.
///
/// A `None` bound is open.
#[derive(Debug, Clone)]
pub struct RangeQuery {
    field: String,
    lower: Option<String>,
    upper: Option<String>,
    include_lower: bool,
    include_upper: bool,
    boost: f32,
}

impl RangeQuery {
    /// Create a new range query.
    pub fn new<F: Into<String>>(
        field: F,
        lower: Option<String>,
        upper: Option<String>,
        include_lower: bool,
        include_upper: bool,
    ) -> Self {
        RangeQuery {
            field: field.into(),
            lower,
            upper,
            include_lower,
            include_upper,
            boost: 1.0,
        }
    }

    /// Inclusive range `[lower TO upper]`.
    pub fn inclusive<F: Into<String>>(field: F, lower: Option<String>, upper: Option<String>) -> Self {
        Self::new(field, lower, upper, true, true)
    }

    fn below_upper(&self, term: &str) -> bool {
        match &self.upper {
            None => true,
            Some(upper) if self.include_upper => term <= upper.as_str(),
            Some(upper) => term < upper.as_str(),
        }
    }

    fn above_lower(&self, term: &str) -> bool {
        match &self.lower {
            None => true,
            Some(lower) if self.include_lower => term >= lower.as_str(),
            Some(lower) => term > lower.as_str(),
        }
    }
}

impl Query for RangeQuery {
    fn execute(&self, ctx: &SearchContext<'_>) -> Result<DocScores> {
        let from = self.lower.as_deref().unwrap_or("");
        let terms = expand_terms(
            ctx,
            &self.field,
            from,
            |term| self.below_upper(term),
            |term| self.above_lower(term),
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
        format!(
            "{}:{}{} TO {}{}",
            self.field,
            if self.include_lower { '[' } else { '{' },
            self.lower.as_deref().unwrap_or("*"),
            self.upper.as_deref().unwrap_or("*"),
            if self.include_upper { ']' } else { '}' },
        )
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
    use crate::document::{Document, FieldOptions};
    use crate::query::test_support::build_reader;

    fn docs(values: &[&str]) -> Vec<Document> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| {
                Document::builder()
                    .id(i.to_string())
                    .add_field("day", *value, FieldOptions::KEYWORD)
                    .build()
            })
            .collect()
    }

    fn matched(query: RangeQuery, values: &[&str]) -> Vec<u32> {
        let (_dir, reader) = build_reader(docs(values));
        let ctx = SearchContext::new(&reader, 1024);
        query.execute(&ctx).unwrap().keys().copied().collect()
    }

    #[test]
    fn test_inclusive_and_exclusive_bounds() {
        let values = ["2020-01", "2020-02", "2020-03"];
        let inclusive =
            RangeQuery::inclusive("day", Some("2020-01".into()), Some("2020-02".into()));
        assert_eq!(matched(inclusive, &values), vec![0, 1]);

        let exclusive = RangeQuery::new(
            "day",
            Some("2020-01".into()),
            Some("2020-03".into()),
            false,
            false,
        );
        assert_eq!(matched(exclusive, &values), vec![1]);
    }

    #[test]
    fn test_open_bounds() {
        let values = ["b", "c", "d"];
        assert_eq!(
            matched(RangeQuery::inclusive("day", None, Some("c".into())), &values),
            vec![0, 1]
        );
        assert_eq!(
            matched(RangeQuery::inclusive("day", Some("c".into()), None), &values),
            vec![1, 2]
        );
        assert_eq!(
            RangeQuery::inclusive("day", None, None).description(),
            "day:[* TO *]"
        );
    }
}
