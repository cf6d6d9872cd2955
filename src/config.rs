//! Search subsystem configuration.
//!
//! A [`SearchConfig`] comes from [`Default`], a JSON file, or environment
//! variables layered over either, and is checked by
//! [`SearchConfig::validate`] before a registry starts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer_by_name;
use crate::error::{PaviseError, Result};
use crate::query::DEFAULT_MAX_CLAUSE_COUNT;

/// Environment variable overriding [`SearchConfig::index_root`].
pub const ENV_INDEX_ROOT: &str = "PAVISE_SEARCH_PATH";
/// Environment variable overriding [`SearchConfig::sync_writes`].
pub const ENV_SYNC_WRITES: &str = "PAVISE_SEARCH_SYNC";
/// Environment variable overriding [`SearchConfig::analyzer`].
pub const ENV_ANALYZER: &str = "PAVISE_SEARCH_ANALYZER";
/// Environment variable overriding [`SearchConfig::max_clause_count`].
pub const ENV_MAX_CLAUSE_COUNT: &str = "PAVISE_SEARCH_MAX_CLAUSE_COUNT";

/// Default buffered bytes before an async-mode writer flushes.
pub const DEFAULT_MAX_BUFFER_MEMORY: usize = 48 * 1024 * 1024;

/// Configuration for a [`Registry`](crate::store::Registry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Directory holding one subdirectory per index.
    pub index_root: PathBuf,

    /// Flush and reopen after every write and delete.
    pub sync_writes: bool,

    /// Analyzer name for tokenized fields and query terms.
    pub analyzer: String,

    /// Upper bound on boolean clauses and expanded terms per query.
    pub max_clause_count: usize,

    /// Buffered bytes that force a flush in async mode.
    pub max_buffer_memory: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            index_root: PathBuf::from("data").join("search"),
            sync_writes: true,
            analyzer: "standard".to_string(),
            max_clause_count: DEFAULT_MAX_CLAUSE_COUNT,
            max_buffer_memory: DEFAULT_MAX_BUFFER_MEMORY,
        }
    }
}

impl SearchConfig {
    /// Default configuration rooted at `index_root`.
    pub fn new<P: Into<PathBuf>>(index_root: P) -> Self {
        SearchConfig {
            index_root: index_root.into(),
            ..Default::default()
        }
    }

    /// Set the index root.
    pub fn with_index_root<P: Into<PathBuf>>(mut self, index_root: P) -> Self {
        self.index_root = index_root.into();
        self
    }

    /// Enable or disable sync writes.
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Set the analyzer by name.
    pub fn with_analyzer<S: Into<String>>(mut self, analyzer: S) -> Self {
        self.analyzer = analyzer.into();
        self
    }

    /// Set the clause limit.
    pub fn with_max_clause_count(mut self, max_clause_count: usize) -> Self {
        self.max_clause_count = max_clause_count;
        self
    }

    /// Set the async flush threshold.
    pub fn with_max_buffer_memory(mut self, bytes: usize) -> Self {
        self.max_buffer_memory = bytes;
        self
    }

    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PaviseError::configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            PaviseError::configuration(format!("Invalid config {}: {e}", path.display()))
        })
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Overlay values found through `lookup` onto this configuration.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_INDEX_ROOT) {
            self.index_root = PathBuf::from(root);
        }
        if let Some(sync) = lookup(ENV_SYNC_WRITES) {
            self.sync_writes = parse_bool(ENV_SYNC_WRITES, &sync)?;
        }
        if let Some(analyzer) = lookup(ENV_ANALYZER) {
            self.analyzer = analyzer;
        }
        if let Some(count) = lookup(ENV_MAX_CLAUSE_COUNT) {
            self.max_clause_count = count.trim().parse().map_err(|_| {
                PaviseError::configuration(format!("{ENV_MAX_CLAUSE_COUNT}: not a number: {count}"))
            })?;
        }
        Ok(self)
    }

    /// Check limits and resolve the analyzer.
    pub fn validate(&self) -> Result<Arc<dyn Analyzer>> {
        if self.index_root.as_os_str().is_empty() {
            return Err(PaviseError::configuration("index_root must not be empty"));
        }
        if self.max_clause_count == 0 {
            return Err(PaviseError::configuration(
                "max_clause_count must be at least 1",
            ));
        }
        if self.max_buffer_memory == 0 {
            return Err(PaviseError::configuration(
                "max_buffer_memory must be at least 1",
            ));
        }
        analyzer_by_name(&self.analyzer)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(PaviseError::configuration(format!(
            "{key}: expected a boolean, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.index_root, PathBuf::from("data/search"));
        assert!(config.sync_writes);
        assert_eq!(config.analyzer, "standard");
        assert_eq!(config.max_clause_count, 1024);
        assert_eq!(config.max_buffer_memory, 48 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<&str, &str> = [
            (ENV_INDEX_ROOT, "/tmp/idx"),
            (ENV_SYNC_WRITES, "false"),
            (ENV_ANALYZER, "simple"),
            (ENV_MAX_CLAUSE_COUNT, "64"),
        ]
        .into_iter()
        .collect();

        let config = SearchConfig::default()
            .with_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.index_root, PathBuf::from("/tmp/idx"));
        assert!(!config.sync_writes);
        assert_eq!(config.analyzer, "simple");
        assert_eq!(config.max_clause_count, 64);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = SearchConfig::default()
            .with_env(|key| (key == ENV_SYNC_WRITES).then(|| "maybe".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = SearchConfig::default()
            .with_env(|key| (key == ENV_MAX_CLAUSE_COUNT).then(|| "lots".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_validate() {
        let err = SearchConfig::default()
            .with_analyzer("klingon")
            .validate()
            .err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = SearchConfig::default()
            .with_max_clause_count(0)
            .validate()
            .err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("search.json");
        std::fs::write(&path, r#"{"index_root": "idx", "sync_writes": false}"#).unwrap();

        let config = SearchConfig::from_json_file(&path).unwrap();
        assert_eq!(config.index_root, PathBuf::from("idx"));
        assert!(!config.sync_writes);
        assert_eq!(config.analyzer, "standard");

        std::fs::write(&path, "{not json").unwrap();
        let err = SearchConfig::from_json_file(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
