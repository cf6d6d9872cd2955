//! Storage abstraction layer.
//!
//! Every index lives in its own directory. The index engine only talks to
//! that directory through the [`Storage`] trait, and coordinates its single
//! writer through a [`LockManager`].

pub mod file;
pub mod traits;

pub use file::{FileLockManager, FileStorage};
pub use traits::{
    LockManager, Storage, StorageConfig, StorageError, StorageInput, StorageLock, StorageOutput,
};

/// Name of the lock that guards the single writer of an index directory.
pub const WRITE_LOCK_NAME: &str = "write";
