//! Index lifecycle: handles, the registry that owns them, and rebuilds.
//!
//! An [`IndexHandle`] pairs the single writer of one index directory with its
//! current searcher. The [`Registry`] maps index names to handles under one
//! root directory and routes entity writes to them.

pub mod handle;
pub mod managed;
pub mod rebuild;
pub mod registry;

pub use handle::{HandleOptions, IndexHandle, IndexStats};
pub use managed::ManagedIndex;
pub use registry::Registry;
