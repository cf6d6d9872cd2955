//! Integration tests for full and in-place rebuilds.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::TempDir;

use common::{Article, MemorySource, persist, registry};
use pavise::prelude::*;

#[test]
fn test_rebuild_in_place_keeps_old_searchers() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::new();
    let registry = registry(dir.path(), source.clone(), true);

    for id in 1..=3 {
        persist(&registry, &source, Article::new(id, "original", "1"));
    }
    let before = registry.searcher("Article").unwrap();

    source.remove("Article", "1");
    for id in 4..=5 {
        source.insert(Article::new(id, "fresh", "1"));
    }

    assert_eq!(registry.rebuild("Article").unwrap(), 4);

    assert_eq!(before.num_docs(), 3);
    assert_eq!(registry.search("_docID:1", "Article").count().unwrap(), 0);
    assert_eq!(
        registry.search("*:*", "Article").count().unwrap() as u64,
        source.count("Article").unwrap()
    );
    assert_eq!(registry.search("allfield:fresh", "Article").count().unwrap(), 2);
    assert_eq!(registry.index_names().unwrap(), vec!["Article".to_string()]);

    persist(&registry, &source, Article::new(6, "fresh", "1"));
    assert_eq!(registry.search("allfield:fresh", "Article").count().unwrap(), 3);
}

#[test]
fn test_queries_keep_working_during_rebuild() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::new();
    let registry = Arc::new(registry(dir.path(), source.clone(), true));

    for id in 1..=20 {
        persist(&registry, &source, Article::new(id, "steady", "1"));
    }
    for id in 21..=30 {
        source.insert(Article::new(id, "steady", "1"));
    }

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut seen = Vec::new();
            while !done.load(Ordering::SeqCst) {
                seen.push(registry.search("allfield:steady", "Article").count().unwrap());
            }
            seen.push(registry.search("allfield:steady", "Article").count().unwrap());
            seen
        })
    };

    registry.rebuild("Article").unwrap();
    done.store(true, Ordering::SeqCst);

    let seen = reader.join().unwrap();
    assert!(seen.iter().all(|&count| count == 20 || count == 30));
    assert_eq!(seen.last(), Some(&30));
}

#[test]
fn test_rebuild_unknown_index_fails() {
    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path(), MemorySource::new(), true);
    assert!(registry.rebuild("Nope").is_err());
    assert!(!registry.has_index("Nope"));
}

#[test]
fn test_rebuild_all_matches_datastore() {
    let dir = TempDir::new().unwrap();
    let source = MemorySource::new();
    let registry = registry(dir.path(), source.clone(), true);

    for id in 1..=5 {
        persist(&registry, &source, Article::new(id, "catalog entry", "1"));
    }
    registry.open("Leftover").unwrap();
    source.remove("Article", "2");
    source.remove("Article", "4");

    assert_eq!(registry.rebuild_all().unwrap(), 3);
    assert_eq!(registry.index_names().unwrap(), vec!["Article".to_string()]);

    let indexes = registry.list_indexes().unwrap();
    assert_eq!(indexes[0].num_docs, 3);
    assert!(!indexes[0].is_drifted());
    assert!(indexes[0].optimized);
}
