//! Error types for pavise.
//!
//! Every fallible operation returns [`Result`], whose error side is the
//! [`PaviseError`] enum. Errors fall into a small taxonomy exposed through
//! [`PaviseError::kind`]:
//!
//! - **bad query** / **bad sort**: the caller supplied something malformed.
//!   Nothing was mutated and the caller may correct the input and retry.
//! - **stale index**: a search hit no longer resolves against the primary
//!   datastore. The index has drifted and needs a rebuild.
//! - **configuration**: the search subsystem cannot start with the supplied
//!   settings.
//! - **unexpected**: I/O, locking or corruption. Always fatal to the operation
//!   in flight; pavise never retries.
//!
//! # Examples
//!
//! ```
//! use pavise::error::{ErrorKind, PaviseError, Result};
//!
//! fn parse_something() -> Result<()> {
//!     Err(PaviseError::bad_query("unbalanced parenthesis"))
//! }
//!
//! let err = parse_something().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::BadQuery);
//! assert!(err.is_recoverable());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for pavise operations.
#[derive(Error, Debug)]
pub enum PaviseError {
    /// I/O errors (file operations, directory walks, renames).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index lifecycle errors (closed handles, missing indexes).
    #[error("Index error: {0}")]
    Index(String),

    /// Storage-related errors (locks, file access).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A committed segment or manifest failed validation.
    #[error("Corrupt index: {0}")]
    Corrupt(String),

    /// Analysis-related errors (tokenization, filtering).
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Malformed query syntax or a query that expands past the clause limit.
    #[error("Bad query: {0}")]
    BadQuery(String),

    /// Illegal sort specification.
    #[error("Bad sort: {0}")]
    BadSort(String),

    /// A search hit that no longer resolves against the primary datastore.
    #[error("Stale index: {0}")]
    StaleIndex(String),

    /// Invalid startup configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Binary segment encoding errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with [`PaviseError`].
pub type Result<T> = std::result::Result<T, PaviseError>;

/// Coarse classification of a [`PaviseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed query syntax.
    BadQuery,
    /// Illegal sort specification.
    BadSort,
    /// Index content is out of step with the primary datastore.
    StaleIndex,
    /// Startup configuration is unusable.
    Configuration,
    /// I/O, locking, corruption or anything else the caller cannot fix.
    Unexpected,
}

impl PaviseError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        PaviseError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        PaviseError::Storage(msg.into())
    }

    /// Create a new corruption error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        PaviseError::Corrupt(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        PaviseError::Analysis(msg.into())
    }

    /// Create a new bad query error.
    pub fn bad_query<S: Into<String>>(msg: S) -> Self {
        PaviseError::BadQuery(msg.into())
    }

    /// Create a new bad sort error.
    pub fn bad_sort<S: Into<String>>(msg: S) -> Self {
        PaviseError::BadSort(msg.into())
    }

    /// Create a new stale index error.
    pub fn stale_index<S: Into<String>>(msg: S) -> Self {
        PaviseError::StaleIndex(msg.into())
    }

    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        PaviseError::Configuration(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        PaviseError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PaviseError::Other(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaviseError::BadQuery(_) => ErrorKind::BadQuery,
            PaviseError::BadSort(_) => ErrorKind::BadSort,
            PaviseError::StaleIndex(_) => ErrorKind::StaleIndex,
            PaviseError::Configuration(_) => ErrorKind::Configuration,
            _ => ErrorKind::Unexpected,
        }
    }

    /// Whether the caller can recover by correcting its input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::BadQuery | ErrorKind::BadSort)
    }
}

impl From<bincode::Error> for PaviseError {
    fn from(err: bincode::Error) -> Self {
        PaviseError::Serialization(err.to_string())
    }
}
