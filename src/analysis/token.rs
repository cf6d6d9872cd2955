//! Token types flowing through the analysis pipeline.
//!
//! A [`Token`] is one unit of analyzed text. Tokenizers produce them, filters
//! transform or drop them, and the index writer turns the survivors into
//! postings.
//!
//! # Examples
//!
//! ```
//! use pavise::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.position, 1);
//! assert_eq!(token.start_offset, 6);
//! ```

use serde::{Deserialize, Serialize};

/// A single analyzed token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The token text after analysis.
    pub text: String,

    /// Position of the token in the token stream.
    pub position: usize,

    /// Byte offset of the token start in the original text.
    pub start_offset: usize,

    /// Byte offset of the token end in the original text.
    pub end_offset: usize,

    /// Whether a filter marked this token as removed.
    pub stopped: bool,
}

impl Token {
    /// Create a new token at the given position without offsets.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
            stopped: false,
        }
    }

    /// Create a new token with explicit byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            stopped: false,
        }
    }

    /// Whether this token has been stopped by a filter.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Mark this token as stopped.
    pub fn stop(mut self) -> Self {
        self.stopped = true;
        self
    }

    /// Replace the token text, keeping position and offsets.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }
}

/// A stream of tokens produced by a tokenizer or filter.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;
