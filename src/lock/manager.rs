//! Lock manager
//!
//! Tracks the per-file union of every handle's grants and answers lock
//! requests immediately. A request that cannot be granted returns
//! `Busy` without waiting; partial escalations keep the levels already
//! granted (in particular PENDING survives a refused EXCLUSIVE step, which
//! is what fences out new readers until the writer gets through).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Result, VfsError};

use super::LockLevel;

/// Identity of one open handle, unique within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

/// Global lock state of one file: every SHARED holder counted, at most one
/// writer at RESERVED or above.
#[derive(Debug, Default)]
struct LockState {
    /// Number of handles currently holding SHARED (writers keep theirs while
    /// escalated).
    shared: usize,

    /// The staged writer and its level (RESERVED, PENDING or EXCLUSIVE).
    writer: Option<(HandleId, LockLevel)>,
}

impl LockState {
    fn is_idle(&self) -> bool {
        self.shared == 0 && self.writer.is_none()
    }
}

/// Per-file lock state machine shared by all handles of a registry
///
/// ## Concurrency:
/// - One Mutex over the state map; every transition is a short critical
///   section and nothing ever sleeps while holding it.
#[derive(Default)]
pub struct LockManager {
    files: Mutex<HashMap<String, LockState>>,
    next_handle_id: AtomicU64,
}

impl LockManager {
    /// Create a manager with no state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an identity for a newly opened handle (atomic, lock-free)
    pub fn register_handle(&self) -> HandleId {
        HandleId(self.next_handle_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Escalate `handle` from `*level` to `target`.
    ///
    /// Steps through every intermediate level, checking each precondition:
    /// - SHARED: no other handle at PENDING or above
    /// - RESERVED / PENDING: no other staged writer
    /// - EXCLUSIVE: no SHARED holder other than the requester
    ///
    /// `*level` is updated for each step that succeeds, so a refused
    /// EXCLUSIVE leaves the handle at PENDING rather than rolling back.
    /// Requesting a level at or below the current one is a no-op.
    /// EXCLUSIVE requested straight from SHARED goes via PENDING, bypassing
    /// RESERVED (the hot-journal recovery path).
    pub fn lock(
        &self,
        file_id: &str,
        handle: HandleId,
        level: &mut LockLevel,
        target: LockLevel,
    ) -> Result<()> {
        if target <= *level {
            return Ok(());
        }

        let mut files = self.files.lock();
        let state = files.entry(file_id.to_string()).or_default();

        while *level < target {
            let next = match *level {
                LockLevel::Unlocked => LockLevel::Shared,
                LockLevel::Shared if target == LockLevel::Exclusive => LockLevel::Pending,
                LockLevel::Shared => LockLevel::Reserved,
                LockLevel::Reserved => LockLevel::Pending,
                LockLevel::Pending => LockLevel::Exclusive,
                LockLevel::Exclusive => unreachable!("no level above EXCLUSIVE"),
            };

            Self::step(state, handle, next).map_err(|err| {
                debug!(file_id, ?handle, ?level, ?target, "lock refused: {err}");
                err
            })?;

            *level = next;
            trace!(file_id, ?handle, granted = ?next, "lock granted");
        }

        Ok(())
    }

    /// Downgrade `handle` from `*level` to `target`. Always succeeds;
    /// releasing a level that is not held is a no-op.
    pub fn unlock(&self, file_id: &str, handle: HandleId, level: &mut LockLevel, target: LockLevel) {
        if target >= *level {
            return;
        }

        let mut files = self.files.lock();
        if let Some(state) = files.get_mut(file_id) {
            if *level >= LockLevel::Reserved && matches!(state.writer, Some((h, _)) if h == handle)
            {
                if target >= LockLevel::Reserved {
                    state.writer = Some((handle, target));
                } else {
                    state.writer = None;
                }
            }
            if *level >= LockLevel::Shared && target < LockLevel::Shared {
                state.shared = state.shared.saturating_sub(1);
            }
            if state.is_idle() {
                files.remove(file_id);
            }
        }

        trace!(file_id, ?handle, from = ?*level, to = ?target, "lock released");
        *level = target;
    }

    /// True iff any handle holds RESERVED or above on the file
    pub fn reserved(&self, file_id: &str) -> bool {
        self.files
            .lock()
            .get(file_id)
            .map(|state| state.writer.is_some())
            .unwrap_or(false)
    }

    /// Drop all lock state for a file (registry delete path)
    pub(crate) fn forget_file(&self, file_id: &str) {
        self.files.lock().remove(file_id);
    }

    /// One transition of the state machine. Checks the precondition for
    /// `next` and applies it, or refuses with `Busy`.
    fn step(state: &mut LockState, handle: HandleId, next: LockLevel) -> Result<()> {
        match next {
            LockLevel::Shared => {
                if matches!(state.writer, Some((h, l)) if h != handle && l >= LockLevel::Pending) {
                    return Err(VfsError::Busy("pending or exclusive writer on file"));
                }
                state.shared += 1;
            }
            LockLevel::Reserved | LockLevel::Pending => {
                if matches!(state.writer, Some((h, _)) if h != handle) {
                    return Err(VfsError::Busy("another handle is staged to write"));
                }
                state.writer = Some((handle, next));
            }
            LockLevel::Exclusive => {
                // The requester still holds the SHARED it took on the way up.
                let other_readers = state.shared.saturating_sub(1);
                if other_readers > 0 {
                    return Err(VfsError::Busy("readers still hold shared locks"));
                }
                state.writer = Some((handle, next));
            }
            LockLevel::Unlocked => unreachable!("UNLOCKED is never a lock target"),
        }

        Ok(())
    }
}
