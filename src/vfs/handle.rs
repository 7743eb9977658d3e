//! File handle
//!
//! One open session on a file: translates byte-range operations into
//! block-aligned ones and carries the session's own lock level. The handle
//! is the only place byte offsets are turned into block indices.

use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, VfsError};
use crate::lock::{HandleId, LockLevel, LockManager};
use crate::store::BlockStore;

use super::FileMeta;

/// One block-aligned piece of a byte range
struct Segment {
    index: u64,
    start: usize,
    consume: usize,
}

/// Split `[offset, offset + len)` into per-block segments, in order
fn segments(block_size: usize, offset: u64, len: usize) -> impl Iterator<Item = Segment> {
    let bs = block_size as u64;
    let mut offset = offset;
    let mut remaining = len;
    std::iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }
        let start = (offset % bs) as usize;
        let consume = remaining.min(block_size - start);
        let segment = Segment {
            index: offset / bs,
            start,
            consume,
        };
        offset += consume as u64;
        remaining -= consume;
        Some(segment)
    })
}

/// An open file session
///
/// Reads are permitted at any lock level (coordination is the engine's
/// business); writes and truncates require the handle to hold at least
/// RESERVED and fail loudly otherwise. Dropping the handle releases every
/// lock it held.
pub struct FileHandle {
    file_id: String,
    meta: Arc<FileMeta>,
    store: Arc<dyn BlockStore>,
    locks: Arc<LockManager>,
    block_size: usize,
    id: HandleId,
    level: LockLevel,
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("file_id", &self.file_id)
            .field("id", &self.id)
            .field("level", &self.level)
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}

impl FileHandle {
    pub(crate) fn new(
        file_id: String,
        meta: Arc<FileMeta>,
        store: Arc<dyn BlockStore>,
        locks: Arc<LockManager>,
        block_size: usize,
    ) -> Self {
        let id = locks.register_handle();
        Self {
            file_id,
            meta,
            store,
            locks,
            block_size,
            id,
            level: LockLevel::Unlocked,
        }
    }

    // =========================================================================
    // Byte-range I/O
    // =========================================================================

    /// Read `length` bytes starting at `offset`.
    ///
    /// Absent blocks and the tails of short blocks read back as zeros. If
    /// the range extends past the declared file size only the bytes up to
    /// that size are valid and the call fails `ShortRead`, carrying them.
    pub fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let size = *self.meta.size.lock();
        let valid = size.saturating_sub(offset).min(length as u64) as usize;

        let mut out = Vec::with_capacity(valid);
        for segment in segments(self.block_size, offset, valid) {
            match self.store.get(&self.file_id, segment.index)? {
                Some(block) => {
                    let end = block.len().min(segment.start + segment.consume);
                    if end > segment.start {
                        out.extend_from_slice(&block[segment.start..end]);
                    }
                    // A hole inside a short block is logically zero.
                    let copied = end.saturating_sub(segment.start);
                    out.resize(out.len() + segment.consume - copied, 0);
                }
                None => out.resize(out.len() + segment.consume, 0),
            }
        }

        if valid < length {
            return Err(VfsError::ShortRead {
                data: out,
                requested: length,
            });
        }
        Ok(out)
    }

    /// Write `data` at `offset`.
    ///
    /// Requires the handle to hold RESERVED or above. Segments that cover a
    /// block only partially are merged into the existing block content so
    /// untouched bytes survive. The declared size grows to cover the write.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.require_writer("write")?;

        let mut size = self.meta.size.lock();
        let mut cursor = 0usize;
        for segment in segments(self.block_size, offset, data.len()) {
            let piece = &data[cursor..cursor + segment.consume];
            cursor += segment.consume;

            if segment.start == 0 && segment.consume == self.block_size {
                // Full block: replace outright, no read needed.
                self.store.put(&self.file_id, segment.index, piece.to_vec())?;
                continue;
            }

            let mut block = self
                .store
                .get(&self.file_id, segment.index)?
                .unwrap_or_default();
            let needed = segment.start + segment.consume;
            if block.len() < needed {
                block.resize(needed, 0);
            }
            block[segment.start..needed].copy_from_slice(piece);
            self.store.put(&self.file_id, segment.index, block)?;
        }

        let end = offset + data.len() as u64;
        if end > *size {
            *size = end;
        }
        trace!(file_id = %self.file_id, offset, len = data.len(), "write applied");
        Ok(())
    }

    /// Shrink the file to `new_size` bytes.
    ///
    /// Blocks wholly beyond the new size are dropped; a block the new size
    /// cuts through is physically shortened so stale bytes cannot come back
    /// on a later write-merge. Growing is not supported: a `new_size` at or
    /// past the current size leaves the file unchanged.
    pub fn truncate(&self, new_size: u64) -> Result<()> {
        self.require_writer("truncate")?;

        let mut size = self.meta.size.lock();
        if new_size >= *size {
            return Ok(());
        }

        let bs = self.block_size as u64;
        for index in self.store.indices(&self.file_id)? {
            let block_start = index * bs;
            if block_start >= new_size {
                self.store.delete(&self.file_id, index)?;
            } else if block_start + bs > new_size {
                let keep = (new_size - block_start) as usize;
                if let Some(mut block) = self.store.get(&self.file_id, index)? {
                    if block.len() > keep {
                        block.truncate(keep);
                        self.store.put(&self.file_id, index, block)?;
                    }
                }
            }
        }

        *size = new_size;
        trace!(file_id = %self.file_id, new_size, "truncated");
        Ok(())
    }

    /// No-op: every block put is already the unit of durability here.
    pub fn sync(&self) -> Result<()> {
        Ok(())
    }

    /// Declared size of the file in bytes
    pub fn file_size(&self) -> u64 {
        *self.meta.size.lock()
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Escalate to `target`, failing `Busy` immediately if the protocol
    /// refuses. Re-requesting a held level is a no-op.
    pub fn lock(&mut self, target: LockLevel) -> Result<()> {
        self.locks
            .lock(&self.file_id, self.id, &mut self.level, target)
    }

    /// Downgrade to `target`. Always succeeds; releasing an unheld level is
    /// a no-op.
    pub fn unlock(&mut self, target: LockLevel) {
        self.locks
            .unlock(&self.file_id, self.id, &mut self.level, target);
    }

    /// True iff any handle (this one included) holds RESERVED or above
    pub fn check_reserved_lock(&self) -> bool {
        self.locks.reserved(&self.file_id)
    }

    /// This handle's own current lock level
    pub fn level(&self) -> LockLevel {
        self.level
    }

    /// The identifier this handle was opened on
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Close the handle, releasing all locks it held. Equivalent to drop,
    /// spelled out for callers that want the release to be visible.
    pub fn close(self) {}

    fn require_writer(&self, op: &str) -> Result<()> {
        if self.level < LockLevel::Reserved {
            return Err(VfsError::ContractViolation(format!(
                "{op} on {:?} requires a RESERVED or higher lock, handle holds {:?}",
                self.file_id, self.level
            )));
        }
        Ok(())
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        self.locks
            .unlock(&self.file_id, self.id, &mut self.level, LockLevel::Unlocked);
    }
}
