//! Whitespace analyzer: splits on whitespace, no normalization.

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::tokenizer::{Tokenizer, WhitespaceTokenizer};
use crate::error::Result;

/// An analyzer that splits on whitespace and keeps tokens verbatim.
#[derive(Clone, Debug, Default)]
pub struct WhitespaceAnalyzer {
    tokenizer: WhitespaceTokenizer,
}

impl WhitespaceAnalyzer {
    /// Create a new whitespace analyzer.
    pub fn new() -> Self {
        WhitespaceAnalyzer {
            tokenizer: WhitespaceTokenizer::new(),
        }
    }
}

impl Analyzer for WhitespaceAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.tokenizer.tokenize(text)
    }

    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_analyzer_preserves_case() {
        let analyzer = WhitespaceAnalyzer::new();
        let tokens: Vec<_> = analyzer.analyze("Foo BAR").unwrap().collect();
        assert_eq!(tokens[0].text, "Foo");
        assert_eq!(tokens[1].text, "BAR");
    }
}
