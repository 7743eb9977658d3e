//! VFS Module
//!
//! The file-level surface a page-oriented engine talks to.
//!
//! ## Responsibilities
//! - Map file-identifier strings to file records (open/delete/access/size)
//! - Translate byte-range reads, writes and truncates into block operations
//! - Gate mutations on the lock protocol
//! - Release everything a handle held when it closes
//!
//! ## Concurrency Model
//! All mutable state of a file — its block set, declared size and lock
//! state — lives behind one shared registry. Mutations to size and blocks
//! take the file's metadata mutex for the whole operation (a single coarse
//! critical section per file; the lock protocol itself keeps contention
//! low). Nothing here ever waits for a lock: requests succeed or fail Busy
//! immediately.

mod handle;
mod registry;

pub use handle::FileHandle;
pub use registry::Registry;

pub(crate) use registry::FileMeta;
