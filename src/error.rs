//! Error types for blockvfs
//!
//! Provides a unified error type for all operations.
//!
//! `Busy` and `ShortRead` are expected on hot paths (lock retry loops, reads
//! that probe past end-of-file) and are plain values, never panics. `Busy` is
//! always recoverable by retrying; this crate never escalates it.

use thiserror::Error;

/// Result type alias using VfsError
pub type Result<T> = std::result::Result<T, VfsError>;

/// Unified error type for blockvfs operations
#[derive(Debug, Error)]
pub enum VfsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing key/value store failed; surfaced unchanged, retry policy
    /// belongs to the caller.
    #[error("backend error: {0}")]
    Backend(String),

    // -------------------------------------------------------------------------
    // Registry Errors
    // -------------------------------------------------------------------------
    /// Open without create-intent on a missing file, or a size query on one.
    #[error("file not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Locking Errors
    // -------------------------------------------------------------------------
    /// A lock request could not be granted right now. Retry later.
    #[error("busy: {0}")]
    Busy(&'static str),

    // -------------------------------------------------------------------------
    // Translation Errors
    // -------------------------------------------------------------------------
    /// The read range extends past the declared file size. `data` holds the
    /// bytes that were valid, in order, up to end-of-file.
    #[error("short read: {} of {requested} bytes available", .data.len())]
    ShortRead { data: Vec<u8>, requested: usize },

    // -------------------------------------------------------------------------
    // Caller Contract Errors
    // -------------------------------------------------------------------------
    /// A programming error by the caller, e.g. writing without holding at
    /// least a RESERVED lock. Fails loudly instead of corrupting state.
    #[error("contract violation: {0}")]
    ContractViolation(String),
}
