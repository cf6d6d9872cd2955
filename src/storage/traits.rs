//! Storage abstraction trait and common types.

use std::io::{Read, Write};

use crate::error::{PaviseError, Result};

/// A trait for storage backends that hold the files of one index.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open a file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create (or truncate) a file for writing.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Rename a file, replacing the destination if it exists.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Create a temporary file. Returns its name and an output stream.
    fn create_temp_output(&self, prefix: &str) -> Result<(String, Box<dyn StorageOutput>)>;

    /// Make completed renames and deletions durable.
    fn sync(&self) -> Result<()>;

    /// Close the storage and release resources.
    fn close(&mut self) -> Result<()>;

    /// Read a whole file into memory.
    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let mut input = self.open_input(name)?;
        let mut buffer = Vec::with_capacity(input.size()? as usize);
        input.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Write a whole file atomically: temp file, fsync, rename.
    fn write_atomic(&self, name: &str, data: &[u8]) -> Result<()> {
        let (temp_name, mut output) = self.create_temp_output(name)?;
        output.write_all(data)?;
        output.close()?;
        self.rename_file(&temp_name, name)?;
        self.sync()
    }
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush and sync the output to storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Number of bytes written so far.
    fn position(&self) -> u64;

    /// Close the output stream, syncing it to disk.
    fn close(&mut self) -> Result<()>;
}

/// A lock manager for coordinating writers of one storage directory.
pub trait LockManager: Send + Sync + std::fmt::Debug {
    /// Acquire a lock with the given name, failing if it is held.
    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>>;

    /// Try to acquire a lock with the given name, returning None if not available.
    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>>;

    /// Check whether a lock artifact with the given name exists.
    fn lock_exists(&self, name: &str) -> bool;

    /// Remove a lock artifact left behind by a crashed writer.
    ///
    /// Returns `true` if an artifact was found and removed. Nothing tells a
    /// crash remnant apart from a lock held by another live process.
    fn clear_stale_lock(&self, name: &str) -> Result<bool>;

    /// Release all locks acquired through this manager.
    fn release_all(&self) -> Result<()>;
}

/// A lock on a resource in storage.
pub trait StorageLock: Send + std::fmt::Debug {
    /// Get the name of the lock.
    fn name(&self) -> &str;

    /// Release the lock.
    fn release(&mut self) -> Result<()>;

    /// Check if the lock is still held.
    fn is_valid(&self) -> bool;
}

/// Configuration for storage backends.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Buffer size for I/O operations.
    pub buffer_size: usize,

    /// Whether closing an output fsyncs it.
    pub fsync_on_close: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            buffer_size: 65536,
            fsync_on_close: true,
        }
    }
}

/// Error types specific to storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// File not found.
    FileNotFound(String),

    /// I/O error.
    IoError(String),

    /// Lock acquisition failed.
    LockFailed(String),

    /// Storage is closed.
    StorageClosed,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
            StorageError::LockFailed(name) => write!(f, "Failed to acquire lock: {name}"),
            StorageError::StorageClosed => write!(f, "Storage is closed"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for PaviseError {
    fn from(err: StorageError) -> Self {
        PaviseError::storage(err.to_string())
    }
}
