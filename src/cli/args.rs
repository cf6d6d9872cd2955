//! Command line argument parsing for the pavise CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::ENV_INDEX_ROOT;

/// Pavise - administer the search indexes under one index root
#[derive(Parser, Debug, Clone)]
#[command(name = "pavise")]
#[command(about = "Inspect and maintain pavise search indexes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PaviseArgs {
    /// Directory holding one subdirectory per index
    #[arg(short, long, env = ENV_INDEX_ROOT, default_value = "data/search")]
    pub root: PathBuf,

    /// Analyzer applied to query terms on tokenized fields
    #[arg(short, long, default_value = "standard")]
    pub analyzer: String,

    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl PaviseArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }

    /// Log filter directive for the effective verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity() {
            0 => "error",
            1 => "warn",
            2 => "info",
            _ => "debug",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the indexes under the root with their statistics
    List,

    /// Merge an index into a single segment
    Optimize(IndexArgs),

    /// Flush pending state of an index and reopen its searcher
    Reopen(IndexArgs),

    /// Delete an index
    Delete(IndexArgs),

    /// Delete every index under the root
    #[command(name = "delete-all")]
    DeleteAll,

    /// Check whether an index exists
    Has(IndexArgs),

    /// Search an index
    Search(SearchArgs),
}

/// Arguments naming one index
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// Index name (the entity type)
    #[arg(value_name = "NAME")]
    pub name: String,
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Index name (the entity type)
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Query string
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Sort field; repeat for secondary keys
    #[arg(short, long = "sort", value_name = "FIELD")]
    pub sort: Vec<String>,

    /// Sort descending (needs exactly one sort field)
    #[arg(long)]
    pub reverse: bool,

    /// Offset for pagination
    #[arg(short, long, default_value = "0")]
    pub offset: usize,

    /// Maximum number of results to return (0 for all)
    #[arg(long, default_value = "10")]
    pub size: usize,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_command() {
        let args = PaviseArgs::try_parse_from([
            "pavise",
            "--root",
            "/srv/search",
            "search",
            "Article",
            "title:intro",
            "--sort",
            "rank",
            "--reverse",
            "--offset",
            "5",
            "--size",
            "20",
        ])
        .unwrap();

        assert_eq!(args.root, PathBuf::from("/srv/search"));
        if let Command::Search(search_args) = args.command {
            assert_eq!(search_args.name, "Article");
            assert_eq!(search_args.query, "title:intro");
            assert_eq!(search_args.sort, vec!["rank".to_string()]);
            assert!(search_args.reverse);
            assert_eq!(search_args.offset, 5);
            assert_eq!(search_args.size, 20);
        } else {
            panic!("Expected Search command");
        }
    }

    #[test]
    fn test_index_commands() {
        let args = PaviseArgs::try_parse_from(["pavise", "optimize", "Article"]).unwrap();
        assert!(matches!(args.command, Command::Optimize(ref a) if a.name == "Article"));

        let args = PaviseArgs::try_parse_from(["pavise", "delete-all"]).unwrap();
        assert!(matches!(args.command, Command::DeleteAll));

        assert!(PaviseArgs::try_parse_from(["pavise", "has"]).is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        let args = PaviseArgs::try_parse_from(["pavise", "list"]).unwrap();
        assert_eq!(args.verbosity(), 1);
        assert_eq!(args.log_filter(), "warn");

        let args = PaviseArgs::try_parse_from(["pavise", "-vv", "list"]).unwrap();
        assert_eq!(args.verbosity(), 2);
        assert_eq!(args.log_filter(), "info");

        let args = PaviseArgs::try_parse_from(["pavise", "--quiet", "list"]).unwrap();
        assert_eq!(args.verbosity(), 0);
        assert_eq!(args.log_filter(), "error");
    }

    #[test]
    fn test_output_format() {
        let args = PaviseArgs::try_parse_from(["pavise", "--format", "json", "list"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
