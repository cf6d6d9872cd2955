//! # Pavise
//!
//! An embedded search subsystem that keeps, per entity type, an inverted
//! index mirroring the records of a primary datastore, and answers ranked,
//! sorted and paginated queries against it.
//!
//! ## Features
//!
//! - One index per entity type, driven by declarative field mappings
//! - Upsert and delete on entity lifecycle events
//! - Sync (read-after-write) or buffered async writes
//! - Lucene-classic query syntax with BM25 scoring
//! - Multi-key sorting and paging over hits
//! - Optimize, reopen and non-disruptive rebuild of live indexes
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pavise::prelude::*;
//!
//! # fn main() -> pavise::error::Result<()> {
//! let mappings = MappingRegistry::new().register(
//!     EntityMapping::new("Article")
//!         .field(FieldMapping::new("title"))
//!         .field(FieldMapping::new("rank").sortable(true)),
//! );
//! let registry = Registry::new(
//!     SearchConfig::new("data/search"),
//!     mappings,
//!     Arc::new(EmptySource),
//!     Arc::new(ExtractorRegistry::new()),
//! )?;
//!
//! let ids = registry
//!     .search("title:intro", "Article")
//!     .order_by(["rank"])
//!     .fetch_ids()?;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod index;
pub mod mapper;
pub mod query;
pub mod search;
pub mod source;
pub mod storage;
pub mod store;

pub mod prelude {
    pub use crate::config::SearchConfig;
    pub use crate::error::{ErrorKind, PaviseError, Result};
    pub use crate::events::EntityEvent;
    pub use crate::mapper::{
        Attachment, Entity, EntityMapping, ExtractorRegistry, FieldMapping, FieldValue,
        MappingRegistry, TextExtractor,
    };
    pub use crate::search::{QueryResult, SearchQuery};
    pub use crate::source::{EmptySource, RecordIter, RecordSource};
    pub use crate::store::{IndexHandle, IndexStats, ManagedIndex, Registry};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
