//! Text analysis: tokenizers, token filters and the analyzers built from them.
//!
//! The analyzer for tokenized fields is chosen by name at startup through
//! [`analyzer_by_name`].

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

use std::sync::Arc;

pub use analyzer::{
    Analyzer, KeywordAnalyzer, PipelineAnalyzer, SimpleAnalyzer, StandardAnalyzer,
    WhitespaceAnalyzer,
};
pub use token::{Token, TokenStream};

use crate::error::{PaviseError, Result};

/// Names accepted by [`analyzer_by_name`].
pub const ANALYZER_NAMES: &[&str] = &["standard", "simple", "keyword", "whitespace"];

/// Resolve a configured analyzer name.
///
/// Names are matched case-insensitively. An unknown name is a configuration
/// error, surfaced when the registry starts.
pub fn analyzer_by_name(name: &str) -> Result<Arc<dyn Analyzer>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "standard" => Ok(Arc::new(StandardAnalyzer::new()?)),
        "simple" => Ok(Arc::new(SimpleAnalyzer::new()?)),
        "keyword" => Ok(Arc::new(KeywordAnalyzer::new())),
        "whitespace" => Ok(Arc::new(WhitespaceAnalyzer::new())),
        other => Err(PaviseError::configuration(format!(
            "Unknown analyzer '{other}', expected one of: {}",
            ANALYZER_NAMES.join(", ")
        ))),
    }
}
