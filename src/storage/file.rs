//! File-based storage implementation.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{PaviseError, Result};
use crate::storage::traits::{
    LockManager, Storage, StorageConfig, StorageError, StorageInput, StorageLock, StorageOutput,
};

/// A file-based storage rooted at one index directory.
#[derive(Debug)]
pub struct FileStorage {
    directory: PathBuf,
    config: StorageConfig,
    lock_manager: Arc<FileLockManager>,
    closed: bool,
}

impl FileStorage {
    /// Create a new file storage in the given directory, creating it if needed.
    pub fn new<P: AsRef<Path>>(directory: P, config: StorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            std::fs::create_dir_all(&directory)
                .map_err(|e| PaviseError::storage(format!("Failed to create directory: {e}")))?;
        }

        if !directory.is_dir() {
            return Err(PaviseError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        let lock_manager = Arc::new(FileLockManager::new(directory.clone()));

        Ok(FileStorage {
            directory,
            config,
            lock_manager,
            closed: false,
        })
    }

    /// The directory this storage is rooted at.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The lock manager coordinating writers of this directory.
    pub fn lock_manager(&self) -> Arc<FileLockManager> {
        Arc::clone(&self.lock_manager)
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed {
            Err(StorageError::StorageClosed.into())
        } else {
            Ok(())
        }
    }
}

fn not_found_or_io(name: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::FileNotFound(name.to_string())
    } else {
        StorageError::IoError(e.to_string())
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.check_closed()?;

        let file = File::open(self.file_path(name)).map_err(|e| not_found_or_io(name, e))?;

        Ok(Box::new(FileInput::new(file, self.config.buffer_size)?))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check_closed()?;

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.file_path(name))
            .map_err(|e| StorageError::IoError(e.to_string()))?;

        Ok(Box::new(FileOutput::new(
            file,
            self.config.buffer_size,
            self.config.fsync_on_close,
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        !self.closed && self.file_path(name).exists()
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.check_closed()?;

        let path = self.file_path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| StorageError::IoError(format!("Failed to delete file: {e}")))?;
        }

        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.check_closed()?;

        let mut files = Vec::new();

        for entry in
            std::fs::read_dir(&self.directory).map_err(|e| StorageError::IoError(e.to_string()))?
        {
            let entry = entry.map_err(|e| StorageError::IoError(e.to_string()))?;
            let path = entry.path();

            if path.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    files.push(name.to_string());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.check_closed()?;

        let metadata = self
            .file_path(name)
            .metadata()
            .map_err(|e| not_found_or_io(name, e))?;

        Ok(metadata.len())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.check_closed()?;

        std::fs::rename(self.file_path(old_name), self.file_path(new_name))
            .map_err(|e| StorageError::IoError(format!("Failed to rename file: {e}")))?;

        Ok(())
    }

    fn create_temp_output(&self, prefix: &str) -> Result<(String, Box<dyn StorageOutput>)> {
        self.check_closed()?;

        let mut counter = 0;
        let mut temp_name;

        loop {
            temp_name = format!("{prefix}_{counter}.tmp");
            if !self.file_exists(&temp_name) {
                break;
            }
            counter += 1;

            if counter > 10000 {
                return Err(
                    StorageError::IoError("Could not create temporary file".to_string()).into(),
                );
            }
        }

        let output = self.create_output(&temp_name)?;
        Ok((temp_name, output))
    }

    fn sync(&self) -> Result<()> {
        self.check_closed()?;

        #[cfg(unix)]
        {
            File::open(&self.directory)
                .and_then(|dir| dir.sync_all())
                .map_err(|e| StorageError::IoError(format!("Failed to sync directory: {e}")))?;
        }

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.lock_manager.release_all()?;
        }
        Ok(())
    }
}

/// A file input implementation.
#[derive(Debug)]
pub struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl FileInput {
    fn new(file: File, buffer_size: usize) -> Result<Self> {
        let metadata = file
            .metadata()
            .map_err(|e| PaviseError::storage(format!("Failed to get file metadata: {e}")))?;

        Ok(FileInput {
            size: metadata.len(),
            reader: BufReader::with_capacity(buffer_size, file),
        })
    }
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

/// A file output implementation.
#[derive(Debug)]
pub struct FileOutput {
    writer: BufWriter<File>,
    fsync_on_close: bool,
    position: u64,
}

impl FileOutput {
    fn new(file: File, buffer_size: usize, fsync_on_close: bool) -> Self {
        FileOutput {
            writer: BufWriter::with_capacity(buffer_size, file),
            fsync_on_close,
            position: 0,
        }
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let bytes_written = self.writer.write(buf)?;
        self.position += bytes_written as u64;
        Ok(bytes_written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| PaviseError::storage(format!("Failed to flush: {e}")))?;

        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| PaviseError::storage(format!("Failed to sync: {e}")))?;

        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn close(&mut self) -> Result<()> {
        if self.fsync_on_close {
            self.flush_and_sync()
        } else {
            self.writer
                .flush()
                .map_err(|e| PaviseError::storage(format!("Failed to flush: {e}")))
        }
    }
}

/// A lock manager backed by `{name}.lock` marker files.
///
/// A marker is created with `create_new`, so a second writer in any process
/// fails to acquire it while the first holds it.
#[derive(Debug)]
pub struct FileLockManager {
    directory: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<FileLock>>>>,
}

impl FileLockManager {
    fn new(directory: PathBuf) -> Self {
        FileLockManager {
            directory,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.lock"))
    }
}

impl LockManager for FileLockManager {
    fn acquire_lock(&self, name: &str) -> Result<Box<dyn StorageLock>> {
        let lock_path = self.lock_path(name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::LockFailed(name.to_string())
                } else {
                    StorageError::IoError(e.to_string())
                }
            })?;

        let lock = Arc::new(Mutex::new(FileLock::new(lock_path, file)));
        self.locks.lock().insert(name.to_string(), Arc::clone(&lock));

        Ok(Box::new(FileLockWrapper {
            name: name.to_string(),
            lock,
        }))
    }

    fn try_acquire_lock(&self, name: &str) -> Result<Option<Box<dyn StorageLock>>> {
        if self.lock_path(name).exists() {
            return Ok(None);
        }
        self.acquire_lock(name).map(Some)
    }

    fn lock_exists(&self, name: &str) -> bool {
        self.lock_path(name).exists()
    }

    fn clear_stale_lock(&self, name: &str) -> Result<bool> {
        if self.locks.lock().contains_key(name) {
            return Ok(false);
        }

        let lock_path = self.lock_path(name);
        match std::fs::remove_file(&lock_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::IoError(format!("Failed to remove stale lock: {e}")).into()),
        }
    }

    fn release_all(&self) -> Result<()> {
        let mut locks = self.locks.lock();

        for (_, lock) in locks.drain() {
            lock.lock().release()?;
        }

        Ok(())
    }
}

#[derive(Debug)]
struct FileLock {
    path: PathBuf,
    _file: File,
    released: bool,
}

impl FileLock {
    fn new(path: PathBuf, file: File) -> Self {
        FileLock {
            path,
            _file: file,
            released: false,
        }
    }

    fn release(&mut self) -> Result<()> {
        if !self.released {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(PaviseError::storage(format!("Failed to release lock: {e}")));
                }
            }
            self.released = true;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct FileLockWrapper {
    name: String,
    lock: Arc<Mutex<FileLock>>,
}

impl StorageLock for FileLockWrapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&mut self) -> Result<()> {
        self.lock.lock().release()
    }

    fn is_valid(&self) -> bool {
        !self.lock.lock().released
    }
}
