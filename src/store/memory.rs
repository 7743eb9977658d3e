//! In-memory block store
//!
//! BTreeMap-per-file block storage behind a single RwLock. This is the
//! default backing for a registry and the reference implementation for the
//! `BlockStore` trait.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::Result;

use super::BlockStore;

/// In-process block storage
///
/// ## Concurrency:
/// - One RwLock over the whole map: many concurrent readers, exclusive
///   writer. Contention is already bounded by the file-locking protocol, so
///   finer-grained locking buys little here.
#[derive(Default)]
pub struct MemoryBlockStore {
    files: RwLock<HashMap<String, BTreeMap<u64, Vec<u8>>>>,
}

impl MemoryBlockStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks currently stored for a file (for tests/debugging)
    pub fn block_count(&self, file_id: &str) -> usize {
        self.files
            .read()
            .get(file_id)
            .map(|blocks| blocks.len())
            .unwrap_or(0)
    }
}

impl BlockStore for MemoryBlockStore {
    fn get(&self, file_id: &str, index: u64) -> Result<Option<Vec<u8>>> {
        let files = self.files.read();
        Ok(files
            .get(file_id)
            .and_then(|blocks| blocks.get(&index))
            .cloned())
    }

    fn put(&self, file_id: &str, index: u64, block: Vec<u8>) -> Result<()> {
        let mut files = self.files.write();
        files
            .entry(file_id.to_string())
            .or_default()
            .insert(index, block);
        Ok(())
    }

    fn delete(&self, file_id: &str, index: u64) -> Result<()> {
        let mut files = self.files.write();
        if let Some(blocks) = files.get_mut(file_id) {
            blocks.remove(&index);
            if blocks.is_empty() {
                files.remove(file_id);
            }
        }
        Ok(())
    }

    fn delete_file(&self, file_id: &str) -> Result<()> {
        self.files.write().remove(file_id);
        Ok(())
    }

    fn indices(&self, file_id: &str) -> Result<Vec<u64>> {
        let files = self.files.read();
        Ok(files
            .get(file_id)
            .map(|blocks| blocks.keys().copied().collect())
            .unwrap_or_default())
    }
}
