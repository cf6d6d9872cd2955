//! Wildcard query implementation.

use std::any::Any;

use regex::Regex;

use crate::error::{PaviseError, Result};
use crate::query::multi_term::{constant_score, expand_terms};
use crate::query::query::{DocScores, Query, SearchContext};

/// A query matching terms against a pattern where `*` stands for any run of
/// characters and `?` for exactly one. A backslash makes the next character
/// literal.
#[derive(Debug, Clone)]
pub struct WildcardQuery {
    field: String,
    pattern: String,
    literal_prefix: String,
    regex: Regex,
    boost: f32,
}

impl WildcardQuery {
    /// Create a new wildcard query.
    pub fn new<F: Into<String>, P: Into<String>>(field: F, pattern: P) -> Result<Self> {
        let pattern = pattern.into();
        let (literal_prefix, regex) = Self::compile(&pattern)?;
        Ok(WildcardQuery {
            field: field.into(),
            pattern,
            literal_prefix,
            regex,
            boost: 1.0,
        })
    }

    /// Get the pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn compile(pattern: &str) -> Result<(String, Regex)> {
        let mut source = String::from("^");
        let mut prefix = String::new();
        let mut in_prefix = true;
        let mut chars = pattern.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '*' => {
                    in_prefix = false;
                    source.push_str(".*");
                }
                '?' => {
                    in_prefix = false;
                    source.push('.');
                }
                _ => {
                    let literal = if ch == '\\' { chars.next().unwrap_or('\\') } else { ch };
                    if in_prefix {
                        prefix.push(literal);
                    }
                    source.push_str(&regex::escape(literal.encode_utf8(&mut [0u8; 4])));
                }
            }
        }
        source.push('$');

        let regex = Regex::new(&source)
            .map_err(|e| PaviseError::bad_query(format!("Invalid wildcard '{pattern}': {e}")))?;
        Ok((prefix, regex))
    }
}

impl Query for WildcardQuery {
    fn execute(&self, ctx: &SearchContext<'_>) -> Result<DocScores> {
        let prefix = self.literal_prefix.as_str();
        let terms = expand_terms(
            ctx,
            &self.field,
            prefix,
            |term| term.starts_with(prefix),
            |term| self.regex.is_match(term),
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
        format!("{}:{}", self.field, self.pattern)
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
    fn test_wildcard_patterns() {
        let (_dir, reader) = build_reader(vec![
            Document::builder().id("1").add_text("title", "test").build(),
            Document::builder().id("2").add_text("title", "text").build(),
            Document::builder().id("3").add_text("title", "toast").build(),
        ]);
        let ctx = SearchContext::new(&reader, 1024);

        let single = WildcardQuery::new("title", "te?t").unwrap();
        assert_eq!(
            single.execute(&ctx).unwrap().keys().copied().collect::<Vec<_>>(),
            vec![0, 1]
        );

        let leading = WildcardQuery::new("title", "*st").unwrap();
        assert_eq!(
            leading.execute(&ctx).unwrap().keys().copied().collect::<Vec<_>>(),
            vec![0, 2]
        );
    }

    #[test]
    fn test_escaped_wildcard_is_literal() {
        let (prefix, regex) = WildcardQuery::compile(r"a\*b?").unwrap();
        assert_eq!(prefix, "a*b");
        assert!(regex.is_match("a*bc"));
        assert!(!regex.is_match("axbc"));
    }
}
