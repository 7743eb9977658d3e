//! Key/value backend capability
//!
//! The minimal surface a remote object medium must expose for block storage
//! to run on top of it: get/put/delete by key, plus an ascending prefix
//! listing. An S3-style bucket, a local directory, or a plain map all fit.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::Result;

/// Capability interface for a remote (or remote-like) key/value medium.
///
/// Keys are flat strings; `list` returns the suffixes of all keys under a
/// prefix in ascending lexicographic order. Implementations own their retry
/// policy; errors come back as [`crate::VfsError::Backend`] or
/// [`crate::VfsError::Io`] unchanged.
pub trait KeyValueBackend: Send + Sync {
    /// Fetch a value. `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value, replacing any existing one.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a key. Deleting an absent key is a no-op.
    fn delete(&self, key: &str) -> Result<()>;

    /// Suffixes of all keys starting with `prefix`, ascending.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory backend
///
/// Stands in for a remote bucket in tests and single-process deployments.
/// BTreeMap keeps keys sorted so `list` is a range scan.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored keys (for tests/debugging)
    pub fn key_count(&self) -> usize {
        self.entries.read().len()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key[prefix.len()..].to_string())
            .collect())
    }
}
