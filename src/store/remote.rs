//! Key/value-backed block store
//!
//! Implements `BlockStore` purely in terms of the `KeyValueBackend`
//! capability. Each block is one object under `{file_id}/{index}`, with the
//! index zero-padded so the backend's lexicographic listing comes back in
//! numeric order.

use crate::error::{Result, VfsError};

use super::{BlockStore, KeyValueBackend};

/// Width of the zero-padded block index in object keys.
///
/// 20 digits covers the full u64 range, so padding never overflows and
/// lexicographic order equals numeric order.
const INDEX_WIDTH: usize = 20;

/// Block store over a pluggable key/value medium
pub struct KeyValueBlockStore<B: KeyValueBackend> {
    backend: B,
}

impl<B: KeyValueBackend> KeyValueBlockStore<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Access the underlying backend (for tests/debugging)
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key_for(file_id: &str, index: u64) -> String {
        format!("{file_id}/{index:0INDEX_WIDTH$}")
    }

    fn prefix_for(file_id: &str) -> String {
        format!("{file_id}/")
    }
}

impl<B: KeyValueBackend> BlockStore for KeyValueBlockStore<B> {
    fn get(&self, file_id: &str, index: u64) -> Result<Option<Vec<u8>>> {
        self.backend.get(&Self::key_for(file_id, index))
    }

    fn put(&self, file_id: &str, index: u64, block: Vec<u8>) -> Result<()> {
        self.backend.put(&Self::key_for(file_id, index), &block)
    }

    fn delete(&self, file_id: &str, index: u64) -> Result<()> {
        self.backend.delete(&Self::key_for(file_id, index))
    }

    fn delete_file(&self, file_id: &str) -> Result<()> {
        let prefix = Self::prefix_for(file_id);
        for suffix in self.backend.list(&prefix)? {
            self.backend.delete(&format!("{prefix}{suffix}"))?;
        }
        Ok(())
    }

    fn indices(&self, file_id: &str) -> Result<Vec<u64>> {
        // Suffixes are zero-padded, so the backend's ascending listing is
        // already in numeric order.
        self.backend
            .list(&Self::prefix_for(file_id))?
            .into_iter()
            .map(|suffix| {
                suffix.parse::<u64>().map_err(|_| {
                    VfsError::Backend(format!(
                        "malformed block key suffix {suffix:?} under {file_id:?}"
                    ))
                })
            })
            .collect()
    }
}
