//! Keyword analyzer that treats the entire input as a single token.
//!
//! ```
//! use pavise::analysis::analyzer::{Analyzer, KeywordAnalyzer};
//!
//! let analyzer = KeywordAnalyzer::new();
//! let tokens: Vec<_> = analyzer.analyze("user-123-abc").unwrap().collect();
//!
//! assert_eq!(tokens.len(), 1);
//! assert_eq!(tokens[0].text, "user-123-abc");
//! ```

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::tokenizer::{Tokenizer, WholeTokenizer};
use crate::error::Result;

/// A keyword analyzer that treats the entire input as a single token.
///
/// Untokenized fields (`_docID`, sort shadows) are indexed through this.
#[derive(Clone, Debug, Default)]
pub struct KeywordAnalyzer {
    tokenizer: WholeTokenizer,
}

impl KeywordAnalyzer {
    /// Create a new keyword analyzer.
    pub fn new() -> Self {
        KeywordAnalyzer {
            tokenizer: WholeTokenizer::new(),
        }
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.tokenizer.tokenize(text)
    }

    fn name(&self) -> &'static str {
        "keyword"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
