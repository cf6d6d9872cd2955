//! Document fields and their indexing options.

use serde::{Deserialize, Serialize};

/// How a field is indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Keep the original value retrievable from search hits.
    pub stored: bool,
    /// Run the value through the analyzer. Untokenized values are indexed
    /// as one opaque term.
    pub tokenized: bool,
}

impl FieldOptions {
    /// Stored and tokenized.
    pub const TEXT: FieldOptions = FieldOptions {
        stored: true,
        tokenized: true,
    };

    /// Stored, single opaque term.
    pub const KEYWORD: FieldOptions = FieldOptions {
        stored: true,
        tokenized: false,
    };

    /// Searchable only.
    pub const INDEXED: FieldOptions = FieldOptions {
        stored: false,
        tokenized: true,
    };

    /// Create field options.
    pub fn new(stored: bool, tokenized: bool) -> Self {
        FieldOptions { stored, tokenized }
    }
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions::TEXT
    }
}

/// A single named field value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    value: String,
    options: FieldOptions,
}

impl Field {
    /// Create a field with explicit options.
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V, options: FieldOptions) -> Self {
        Field {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field value as text.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Indexing options.
    pub fn options(&self) -> FieldOptions {
        self.options
    }

    /// Whether the value is stored.
    pub fn is_stored(&self) -> bool {
        self.options.stored
    }

    /// Whether the value is analyzed into terms.
    pub fn is_tokenized(&self) -> bool {
        self.options.tokenized
    }
}
