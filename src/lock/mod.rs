//! File Locking Module
//!
//! Five-level cooperative lock protocol shared by every handle of a file.
//!
//! ## Responsibilities
//! - Grant or refuse lock transitions immediately — never block the caller
//! - Allow exactly one writer (RESERVED or above) per file at a time
//! - Stop writer starvation: once a writer reaches PENDING, no new SHARED
//!   grants go to other handles, so readers drain instead of renewing ahead
//!   of the writer
//!
//! Refusals come back as [`crate::VfsError::Busy`]; retry/backoff is the
//! caller's responsibility.

mod manager;

pub use manager::{HandleId, LockManager};

/// Lock levels, ordered. UNLOCKED < SHARED < RESERVED < PENDING < EXCLUSIVE.
///
/// SHARED permits reading alongside other readers. RESERVED stages a writer
/// (one per file). PENDING fences out new readers. EXCLUSIVE requires every
/// other reader to have drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockLevel {
    Unlocked,
    Shared,
    Reserved,
    Pending,
    Exclusive,
}
