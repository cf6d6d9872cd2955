//! Output formatting for CLI commands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, PaviseArgs};
use crate::store::IndexStats;

/// Result structure for `list`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexList {
    pub root: String,
    pub indexes: Vec<IndexStats>,
}

/// Result structure for `optimize`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub index: String,
    pub merged: bool,
    pub segments_before: usize,
    pub segments_after: usize,
    pub duration_ms: u64,
}

/// Result structure for `reopen`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReopenResult {
    pub index: String,
    pub generation: u64,
    pub num_docs: u32,
}

/// Result structure for `delete` and `delete-all`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletionResult {
    pub deleted: Vec<String>,
}

/// Result structure for `has`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExistenceResult {
    pub index: String,
    pub exists: bool,
}

/// One hit of `search`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

/// Result structure for `search`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResults {
    pub index: String,
    pub query: String,
    pub total_hits: usize,
    pub offset: usize,
    pub hits: Vec<SearchHit>,
    pub duration_ms: u64,
}

/// Print a result in the requested format.
pub fn output_result<T>(result: &T, args: &PaviseArgs) -> anyhow::Result<()>
where
    T: Serialize + fmt::Display,
{
    match args.output_format {
        OutputFormat::Human => print!("{result}"),
        OutputFormat::Json => {
            let json = if args.pretty {
                serde_json::to_string_pretty(result)?
            } else {
                serde_json::to_string(result)?
            };
            println!("{json}");
        }
    }
    Ok(())
}

impl fmt::Display for IndexList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.indexes.is_empty() {
            return writeln!(f, "No indexes under {}", self.root);
        }

        writeln!(
            f,
            "{:<32} {:>10} {:>8} {:>8} {:>10}",
            "NAME", "DOCUMENTS", "DELETED", "SEGMENTS", "OPTIMIZED"
        )?;
        for stats in &self.indexes {
            writeln!(
                f,
                "{:<32} {:>10} {:>8} {:>8} {:>10}",
                stats.name,
                stats.num_docs,
                stats.num_deleted,
                stats.segment_count,
                if stats.optimized { "yes" } else { "no" }
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.merged {
            writeln!(
                f,
                "Optimized {}: {} segments -> {} in {} ms",
                self.index, self.segments_before, self.segments_after, self.duration_ms
            )
        } else {
            writeln!(f, "{} is already optimized", self.index)
        }
    }
}

impl fmt::Display for ReopenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Reopened {} at generation {} ({} documents)",
            self.index, self.generation, self.num_docs
        )
    }
}

impl fmt::Display for DeletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deleted.is_empty() {
            return writeln!(f, "Nothing to delete");
        }
        for name in &self.deleted {
            writeln!(f, "Deleted {name}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ExistenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exists {
            writeln!(f, "{} exists", self.index)
        } else {
            writeln!(f, "{} does not exist", self.index)
        }
    }
}

impl fmt::Display for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} hits for {:?} in {} ({} ms)",
            self.total_hits, self.query, self.index, self.duration_ms
        )?;
        for (i, hit) in self.hits.iter().enumerate() {
            writeln!(f, "{:>5}. {:<36} {:.3}", self.offset + i + 1, hit.id, hit.score)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_list_human() {
        let list = IndexList {
            root: "data/search".to_string(),
            indexes: vec![IndexStats {
                name: "Article".to_string(),
                generation: 4,
                num_docs: 12,
                num_deleted: 1,
                segment_count: 2,
                optimized: false,
                pending_docs: 0,
            }],
        };

        let text = list.to_string();
        assert!(text.starts_with("NAME"));
        assert!(text.contains("Article"));
        assert!(text.contains("12"));

        let empty = IndexList {
            root: "data/search".to_string(),
            indexes: Vec::new(),
        };
        assert_eq!(empty.to_string(), "No indexes under data/search\n");
    }

    #[test]
    fn test_search_results_human() {
        let results = SearchResults {
            index: "Article".to_string(),
            query: "title:intro".to_string(),
            total_hits: 3,
            offset: 1,
            hits: vec![SearchHit {
                id: "7".to_string(),
                score: 1.5,
            }],
            duration_ms: 2,
        };

        let text = results.to_string();
        assert!(text.starts_with("3 hits for \"title:intro\" in Article"));
        assert!(text.contains("    2. 7"));
        assert!(text.contains("1.500"));
    }
}
