//! Registry
//!
//! Maps file-identifier strings to file records and hands out handles.
//!
//! A registry is constructed once and shared by reference (or `Arc`) with
//! everything that opens files through it; there is no process-wide implicit
//! store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, VfsError};
use crate::lock::LockManager;
use crate::store::{BlockStore, MemoryBlockStore};

use super::FileHandle;

/// Shared per-file metadata.
///
/// The declared size is the single source of truth for logical end-of-file;
/// blocks past it are garbage and ignored. The mutex doubles as the coarse
/// per-file critical section: writers hold it for the whole read-modify-write
/// sequence, readers take it only to snapshot the size.
pub(crate) struct FileMeta {
    pub(crate) size: Mutex<u64>,
}

impl FileMeta {
    fn new() -> Arc<Self> {
        Arc::new(Self { size: Mutex::new(0) })
    }
}

/// File registry: open/delete/access/size over a shared block store
pub struct Registry {
    /// Registry configuration
    config: Config,

    /// Block storage, in-memory by default or any pluggable implementation
    store: Arc<dyn BlockStore>,

    /// Lock state for every file, shared by all handles
    locks: Arc<LockManager>,

    /// Known files and their declared sizes
    files: RwLock<HashMap<String, Arc<FileMeta>>>,
}

impl Registry {
    /// Create a registry over an in-memory block store
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Arc::new(MemoryBlockStore::new()))
    }

    /// Create a registry over a caller-supplied block store
    pub fn with_store(config: Config, store: Arc<dyn BlockStore>) -> Self {
        Self {
            config,
            store,
            locks: Arc::new(LockManager::new()),
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Open a handle on a file.
    ///
    /// With `create` set, an absent file is created empty; without it, an
    /// absent file fails `NotFound`. The handle starts UNLOCKED.
    pub fn open(&self, file_id: &str, create: bool) -> Result<FileHandle> {
        let meta = {
            let mut files = self.files.write();
            match files.get(file_id) {
                Some(meta) => Arc::clone(meta),
                None if create => {
                    debug!(file_id, "creating file");
                    let meta = FileMeta::new();
                    files.insert(file_id.to_string(), Arc::clone(&meta));
                    meta
                }
                None => return Err(VfsError::NotFound(file_id.to_string())),
            }
        };

        Ok(FileHandle::new(
            file_id.to_string(),
            meta,
            Arc::clone(&self.store),
            Arc::clone(&self.locks),
            self.config.block_size,
        ))
    }

    /// Remove a file, all its blocks and its lock state. Idempotent:
    /// deleting a file that does not exist succeeds.
    pub fn delete(&self, file_id: &str) -> Result<()> {
        let existed = self.files.write().remove(file_id).is_some();
        self.store.delete_file(file_id)?;
        self.locks.forget_file(file_id);
        debug!(file_id, existed, "deleted file");
        Ok(())
    }

    /// Does the file exist? No lock required.
    pub fn access(&self, file_id: &str) -> bool {
        self.files.read().contains_key(file_id)
    }

    /// Declared size of a file in bytes.
    ///
    /// Reflects the latest applied write regardless of any in-flight
    /// writer's eventual outcome: this layer is write-through and stages
    /// nothing.
    pub fn file_size(&self, file_id: &str) -> Result<u64> {
        let files = self.files.read();
        let meta = files
            .get(file_id)
            .ok_or_else(|| VfsError::NotFound(file_id.to_string()))?;
        let size = *meta.size.lock();
        Ok(size)
    }

    /// Identifiers of every known file, unordered
    pub fn file_ids(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }

    /// The configured block size in bytes
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Crate-internal access for the stream codec
    // =========================================================================

    pub(crate) fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    pub(crate) fn meta(&self, file_id: &str) -> Option<Arc<FileMeta>> {
        self.files.read().get(file_id).map(Arc::clone)
    }

    /// Fetch-or-create the metadata record (deserialize target files may not
    /// have been opened yet).
    pub(crate) fn ensure_meta(&self, file_id: &str) -> Arc<FileMeta> {
        let mut files = self.files.write();
        Arc::clone(
            files
                .entry(file_id.to_string())
                .or_insert_with(FileMeta::new),
        )
    }
}
