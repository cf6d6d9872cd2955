//! Field sorting of hits.
//!
//! Sort keys are the untokenized values recorded per document. Every key
//! of a field is compared numerically when all present values among the
//! hits parse as numbers, lexicographically otherwise. Documents lacking a
//! key sort after those having one, in either direction.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::index::reader::IndexReader;
use crate::query::collector::ScoreDoc;

/// One sort key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    field: String,
    reverse: bool,
}

impl SortField {
    /// Ascending sort on a field.
    pub fn new<S: Into<String>>(field: S) -> Self {
        SortField {
            field: field.into(),
            reverse: false,
        }
    }

    /// Set the direction.
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// The field sorted on.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Whether the order is descending.
    pub fn is_reverse(&self) -> bool {
        self.reverse
    }
}

/// Sort specification. No fields means relevance order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    fields: Vec<SortField>,
}

impl Sort {
    /// Relevance order: score descending, ties by index order.
    pub fn relevance() -> Self {
        Sort::default()
    }

    /// Sort on the given keys, most significant first.
    pub fn by(fields: Vec<SortField>) -> Self {
        Sort { fields }
    }

    /// Ascending sort on the given field names.
    pub fn by_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Sort {
            fields: names.into_iter().map(SortField::new).collect(),
        }
    }

    /// Whether this is relevance order.
    pub fn is_relevance(&self) -> bool {
        self.fields.is_empty()
    }

    /// The sort keys.
    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }
}

#[derive(Debug)]
enum SortKey<'a> {
    Number(f64),
    Text(&'a str),
    Missing,
}

fn compare_keys(a: &SortKey<'_>, b: &SortKey<'_>, reverse: bool) -> Ordering {
    let ordering = match (a, b) {
        (SortKey::Missing, SortKey::Missing) => return Ordering::Equal,
        (SortKey::Missing, _) => return Ordering::Greater,
        (_, SortKey::Missing) => return Ordering::Less,
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
    };

    if reverse { ordering.reverse() } else { ordering }
}

fn column<'a>(reader: &'a IndexReader, hits: &[ScoreDoc], field: &str) -> Vec<SortKey<'a>> {
    let values: Vec<Option<&str>> = hits
        .iter()
        .map(|hit| reader.sort_value(hit.doc, field))
        .collect();

    let numbers: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|value| match value {
            Some(v) => v.trim().parse::<f64>().ok().map(Some),
            None => Some(None),
        })
        .collect();

    match numbers {
        Some(numbers) => numbers
            .into_iter()
            .map(|n| n.map_or(SortKey::Missing, SortKey::Number))
            .collect(),
        None => values
            .into_iter()
            .map(|v| v.map_or(SortKey::Missing, SortKey::Text))
            .collect(),
    }
}

/// Order hits by the sort keys, falling back to ascending address.
pub fn sort_hits(reader: &IndexReader, hits: &mut Vec<ScoreDoc>, sort: &Sort) {
    if sort.is_relevance() {
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc.cmp(&b.doc)));
        return;
    }

    let columns: Vec<(Vec<SortKey<'_>>, bool)> = sort
        .fields()
        .iter()
        .map(|f| (column(reader, hits, f.field()), f.is_reverse()))
        .collect();

    let mut order: Vec<usize> = (0..hits.len()).collect();
    order.sort_by(|&a, &b| {
        columns
            .iter()
            .map(|(keys, reverse)| compare_keys(&keys[a], &keys[b], *reverse))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| hits[a].doc.cmp(&hits[b].doc))
    });

    let sorted: Vec<ScoreDoc> = order.into_iter().map(|i| hits[i]).collect();
    *hits = sorted;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, FieldOptions};
    use crate::query::test_support::build_reader;

    fn reader_with(ranks: &[Option<&str>]) -> (tempfile::TempDir, IndexReader) {
        let docs = ranks
            .iter()
            .enumerate()
            .map(|(i, rank)| {
                let mut builder = Document::builder().id(i.to_string());
                if let Some(rank) = rank {
                    builder = builder.add_field("rank", *rank, FieldOptions::KEYWORD);
                }
                builder.build()
            })
            .collect();
        build_reader(docs)
    }

    fn hits(n: u32) -> Vec<ScoreDoc> {
        (0..n).map(|doc| ScoreDoc { doc, score: 1.0 }).collect()
    }

    fn docs(hits: &[ScoreDoc]) -> Vec<u32> {
        hits.iter().map(|h| h.doc).collect()
    }

    #[test]
    fn test_numeric_detection() {
        let (_dir, reader) = reader_with(&[Some("10"), Some("9"), Some("100")]);
        let mut hits = hits(3);
        sort_hits(&reader, &mut hits, &Sort::by_fields(["rank"]));
        assert_eq!(docs(&hits), vec![1, 0, 2]);
    }

    #[test]
    fn test_lexicographic_fallback() {
        let (_dir, reader) = reader_with(&[Some("10"), Some("9"), Some("b")]);
        let mut hits = hits(3);
        sort_hits(&reader, &mut hits, &Sort::by_fields(["rank"]));
        assert_eq!(docs(&hits), vec![0, 1, 2]);
    }

    #[test]
    fn test_reverse_and_missing_last() {
        let (_dir, reader) = reader_with(&[Some("1"), None, Some("2"), Some("2")]);
        let mut hits = hits(4);
        let sort = Sort::by(vec![SortField::new("rank").with_reverse(true)]);
        sort_hits(&reader, &mut hits, &sort);
        assert_eq!(docs(&hits), vec![2, 3, 0, 1]);
    }

    #[test]
    fn test_relevance_order() {
        let (_dir, reader) = reader_with(&[None, None, None]);
        let mut hits = vec![
            ScoreDoc { doc: 2, score: 1.0 },
            ScoreDoc { doc: 0, score: 1.0 },
            ScoreDoc { doc: 1, score: 3.0 },
        ];
        sort_hits(&reader, &mut hits, &Sort::relevance());
        assert_eq!(docs(&hits), vec![1, 0, 2]);
    }
}
