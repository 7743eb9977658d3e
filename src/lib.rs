//! # blockvfs
//!
//! A block-addressable storage backend that stands in for an on-disk file
//! beneath a page-oriented database engine, with:
//! - Sparse fixed-size block storage (in-memory or key/value-backed)
//! - Byte-range to block-aligned translation with read-modify-write merging
//! - Five-level file locking (SHARED → RESERVED → PENDING → EXCLUSIVE)
//! - Streaming serialize/deserialize without contiguous buffering
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Page-Oriented Engine                        │
//! │            (byte-range reads, writes, locks)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Registry                                │
//! │          (open / delete / access / file_size)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ FileHandle  │◄────────►│ LockManager │
//!   │ (translate) │          │ (5 levels)  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ BlockStore  │◄────────►│ StreamCodec │
//!   │ (mem / kv)  │          │ (ser/deser) │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod lock;
pub mod vfs;
pub mod stream;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, VfsError};
pub use config::Config;
pub use lock::LockLevel;
pub use store::{BlockStore, KeyValueBackend, KeyValueBlockStore, MemoryBackend, MemoryBlockStore};
pub use stream::{deserialize_iter, serialize_iter};
pub use vfs::{FileHandle, Registry};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blockvfs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
