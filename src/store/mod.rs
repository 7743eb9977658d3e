//! Block Storage Module
//!
//! Sparse per-file block repository.
//!
//! ## Responsibilities
//! - Map (file_id, block index) to fixed-size byte blocks
//! - Allow holes: a missing index is logically all-zero
//! - Ascending index iteration for serialization
//! - Stay indifferent to the backing medium (in-process map or a pluggable
//!   key/value capability)
//!
//! ## Data Structure Choice
//! The in-memory variant keeps a BTreeMap per file:
//! - Ordered indices (required for serialization)
//! - Insertion order is meaningless, ascending iteration is not

mod backend;
mod memory;
mod remote;

pub use backend::{KeyValueBackend, MemoryBackend};
pub use memory::MemoryBlockStore;
pub use remote::KeyValueBlockStore;

use crate::error::Result;

/// Sparse block repository shared by all handles of a registry.
///
/// Implementations are internally synchronized; all methods take `&self`.
/// Indices need not be contiguous. Every stored block must be at most the
/// configured block size; only the highest-indexed block of a file may be
/// shorter.
pub trait BlockStore: Send + Sync {
    /// Fetch one block. `Ok(None)` means the index was never written.
    fn get(&self, file_id: &str, index: u64) -> Result<Option<Vec<u8>>>;

    /// Store one block, replacing any previous content at that index.
    fn put(&self, file_id: &str, index: u64, block: Vec<u8>) -> Result<()>;

    /// Drop a single block. Dropping an absent index is a no-op.
    fn delete(&self, file_id: &str, index: u64) -> Result<()>;

    /// Drop every block of a file. Idempotent.
    fn delete_file(&self, file_id: &str) -> Result<()>;

    /// All present indices of a file, ascending. Empty if the file has no
    /// blocks (or does not exist — the store does not track files, only
    /// blocks).
    fn indices(&self, file_id: &str) -> Result<Vec<u64>>;
}
