//! Integration tests for querying, sorting and paging.

mod common;

use tempfile::TempDir;

use common::{Article, MemorySource, persist, registry};
use pavise::prelude::*;

fn seeded(dir: &TempDir, count: u64) -> (Registry, std::sync::Arc<MemorySource>) {
    let source = MemorySource::new();
    let registry = registry(dir.path(), source.clone(), true);
    for id in 1..=count {
        persist(
            &registry,
            &source,
            Article::new(id, &format!("Intro chapter {id}"), &id.to_string()),
        );
    }
    (registry, source)
}

#[test]
fn test_rank_sort_and_reverse() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::new();
    let registry = registry(dir.path(), source.clone(), true);

    persist(&registry, &source, Article::new(10, "Intro to Rust", "2"));
    persist(&registry, &source, Article::new(20, "Intro to Go", "1"));

    let ascending = registry
        .search("title:intro", "Article")
        .order_by(["rank"])
        .fetch_ids()
        .unwrap();
    assert_eq!(ascending, vec!["20", "10"]);

    let descending = registry
        .search("title:intro", "Article")
        .order_by(["rank"])
        .reverse()
        .fetch_ids()
        .unwrap();
    assert_eq!(descending, vec!["10", "20"]);

    let err = registry
        .search("title:intro", "Article")
        .order_by(["rank", "title"])
        .reverse()
        .fetch_ids()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadSort);
}

#[test]
fn test_numeric_sort_keys() {
    let dir = TempDir::new().unwrap();
    let (registry, _source) = seeded(&dir, 12);

    let ids = registry
        .search("allfield:intro", "Article")
        .order_by(["rank"])
        .page(0, 4)
        .fetch_ids()
        .unwrap();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[test]
fn test_pagination() {
    let dir = TempDir::new().unwrap();
    let (registry, _source) = seeded(&dir, 7);
    let n = 7;

    let everything = registry
        .search("allfield:intro", "Article")
        .order_by(["rank"])
        .page(0, n)
        .fetch_ids()
        .unwrap();
    assert_eq!(everything.len(), n);

    let unbounded = registry
        .search("allfield:intro", "Article")
        .order_by(["rank"])
        .page(3, 0)
        .fetch_ids()
        .unwrap();
    assert_eq!(unbounded, everything);

    let beyond = registry.search("allfield:intro", "Article").page(n + 1, 10);
    assert!(beyond.fetch_ids().unwrap().is_empty());
    assert_eq!(beyond.count().unwrap(), n);

    for offset in 0..n {
        for size in 1..=n {
            let page = registry
                .search("allfield:intro", "Article")
                .order_by(["rank"])
                .page(offset, size)
                .fetch_ids()
                .unwrap();
            let end = (offset + size).min(n);
            assert_eq!(page, everything[offset..end].to_vec());
        }
    }
}

#[test]
fn test_relevance_order() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::new();
    let registry = registry(dir.path(), source.clone(), true);

    persist(&registry, &source, Article::new(1, "rust in a nutshell with many other words", "1"));
    persist(&registry, &source, Article::new(2, "rust rust rust", "2"));
    persist(&registry, &source, Article::new(3, "go", "3"));

    let results = registry
        .search("title:rust", "Article")
        .execute_query(true)
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "2");
    assert!(results[0].score > results[1].score);
    assert_eq!(results[0].object.as_ref().unwrap().id(), "2");
}

#[test]
fn test_fetch_hydrates_and_detects_stale_hits() {
    let dir = TempDir::new().unwrap();
    let (registry, source) = seeded(&dir, 3);

    let records = registry
        .search("allfield:intro", "Article")
        .order_by(["rank"])
        .fetch()
        .unwrap();
    let ids: Vec<String> = records.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);

    source.remove("Article", "2");
    let err = registry.search("allfield:intro", "Article").fetch().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StaleIndex);
    assert!(!err.is_recoverable());

    assert_eq!(registry.search("allfield:intro", "Article").fetch_ids().unwrap().len(), 3);
}

#[test]
fn test_query_syntax() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::new();
    let registry = registry(dir.path(), source.clone(), true);

    persist(&registry, &source, Article::new(1, "Intro to Rust", "1"));
    persist(&registry, &source, Article::new(2, "Advanced Rust", "2"));
    persist(&registry, &source, Article::new(3, "Intro to Go", "3"));

    let count = |q: &str| registry.search(q, "Article").count().unwrap();

    assert_eq!(count("allfield:rust"), 2);
    assert_eq!(count("+allfield:intro -allfield:go"), 1);
    assert_eq!(count("allfield:intro AND allfield:rust"), 1);
    assert_eq!(count("allfield:(go OR advanced)"), 2);
    assert_eq!(count("allfield:intro NOT allfield:rust"), 1);
    assert_eq!(count("title:(advanced go)"), 2);
    assert_eq!(count("title:\"intro to rust\""), 1);
    assert_eq!(count("title:\"rust intro\""), 0);
    assert_eq!(count("title:adv*"), 1);
    assert_eq!(count("title:g?"), 1);
    assert_eq!(count("rank_untokenized:[1 TO 2]"), 2);
    assert_eq!(count("rank_untokenized:{1 TO *]"), 2);
    assert_eq!(count("*:*"), 3);
    assert_eq!(count("_docID:3"), 1);
    assert_eq!(count("3"), 1);
    assert_eq!(count("1 OR 2"), 2);

    for bad in ["title:(rust", "title:rust~2", "\"intro to\"~3"] {
        let err = registry.search(bad, "Article").count().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadQuery);
    }
}

#[test]
fn test_bare_terms_look_up_identifiers() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::new();
    let registry = registry(dir.path(), source.clone(), true);

    persist(&registry, &source, Article::new(42, "Intro", "1"));
    persist(&registry, &source, Article::new(7, "Chapter 42", "2"));

    assert_eq!(registry.search("42", "Article").fetch_ids().unwrap(), vec!["42"]);
    assert_eq!(
        registry.search("allfield:42", "Article").fetch_ids().unwrap(),
        vec!["7"]
    );
}

#[test]
fn test_clause_limit() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::new();
    let registry = Registry::new(
        SearchConfig::new(dir.path()).with_max_clause_count(2),
        MappingRegistry::new().register(common::article_mapping()),
        source.clone(),
        std::sync::Arc::new(ExtractorRegistry::new()),
    )
    .unwrap();

    for (id, title) in [(1, "alpha"), (2, "alps"), (3, "altitude")] {
        persist(&registry, &source, Article::new(id, title, "1"));
    }

    let err = registry.search("title:al*", "Article").count().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadQuery);
    assert_eq!(registry.search("title:alp*", "Article").count().unwrap(), 2);
}
