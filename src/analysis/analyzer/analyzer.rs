//! Core analyzer trait definition.
//!
//! An analyzer is the complete text processing pipeline applied to a
//! tokenized field, both when a document is indexed and when a query term
//! targets that field:
//!
//! ```text
//! Raw Text → Tokenizer → Filter 1 → ... → Filter N → Token Stream
//! ```
//!
//! # Examples
//!
//! ```
//! use pavise::analysis::analyzer::Analyzer;
//! use pavise::analysis::analyzer::StandardAnalyzer;
//!
//! let analyzer = StandardAnalyzer::new().unwrap();
//! let tokens: Vec<_> = analyzer.analyze("The quick brown fox").unwrap().collect();
//!
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[0].text, "quick");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
///
/// Analyzers are shared between the writer and every searcher of an index,
/// hence the `Send + Sync` bound.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;

    /// Provide access to the concrete type for downcasting.
    fn as_any(&self) -> &dyn std::any::Any;
}
