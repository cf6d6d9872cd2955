//! Query system for searching documents.

pub mod all;
pub mod boolean;
pub mod collector;
pub mod multi_term;
pub mod parser;
pub mod phrase;
#[allow(clippy::module_inception)]
pub mod query;
pub mod range;
pub mod scorer;
pub mod sort;
pub mod term;
pub mod wildcard;

pub use self::all::MatchAllQuery;
pub use self::boolean::{BooleanClause, BooleanQuery, BooleanQueryBuilder, Occur};
pub use self::collector::{ScoreDoc, TopDocs, TopDocsCollector};
pub use self::multi_term::PrefixQuery;
pub use self::parser::{Operator, QueryParser};
pub use self::phrase::PhraseQuery;
pub use self::query::{DocScores, Query, SearchContext};
pub use self::range::RangeQuery;
pub use self::scorer::BM25Scorer;
pub use self::sort::{Sort, SortField};
pub use self::term::TermQuery;
pub use self::wildcard::WildcardQuery;

/// Default upper bound on boolean clauses and expanded terms.
pub const DEFAULT_MAX_CLAUSE_COUNT: usize = 1024;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::analysis::analyzer::StandardAnalyzer;
    use crate::document::Document;
    use crate::index::reader::IndexReader;
    use crate::index::writer::{IndexWriter, IndexWriterConfig};
    use crate::storage::{FileStorage, StorageConfig};

    /// Index `docs` into one segment of a fresh directory.
    pub(crate) fn build_reader(docs: Vec<Document>) -> (TempDir, IndexReader) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), StorageConfig::default()).unwrap();
        let locks = storage.lock_manager();
        let config = IndexWriterConfig::new(Arc::new(StandardAnalyzer::new().unwrap()));
        let mut writer = IndexWriter::open(Arc::new(storage), locks.as_ref(), config).unwrap();
        for doc in docs {
            writer.add_document(doc).unwrap();
        }
        writer.flush().unwrap();
        let reader = writer.reader().unwrap();
        writer.close().unwrap();
        (dir, reader)
    }
}
