//! Stream Codec Module
//!
//! Converts between a file's block set and a flat byte stream, in both
//! directions, without ever holding the whole file contiguously. This is the
//! crate's reason for existing: a database too large for one allocation can
//! still be produced and consumed block by block.
//!
//! The codec works directly against the registry and its block store,
//! independent of any open handle's lock state; callers that need exclusion
//! against concurrent writers take locks through a handle first.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::Result;
use crate::store::BlockStore;
use crate::vfs::Registry;

/// Lazy serialization of one file, ascending block order.
///
/// Yields one chunk per present-or-implied block: holes come out zero-filled
/// and the final chunk is truncated to the declared size, so the
/// concatenation of all chunks is exactly the file's bytes. The iterator is
/// finite, never yields an empty chunk, and a fresh one can be started at
/// any time by calling [`serialize_iter`] again.
pub struct SerializeIter {
    store: Arc<dyn BlockStore>,
    file_id: String,
    block_size: usize,
    index: u64,
    remaining: u64,
}

impl Iterator for SerializeIter {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let chunk_len = (self.block_size as u64).min(self.remaining) as usize;

        let chunk = match self.store.get(&self.file_id, self.index) {
            Ok(Some(mut block)) => {
                // Pads a short block, or trims garbage past the final
                // chunk's share of the declared size.
                block.resize(chunk_len, 0);
                Bytes::from(block)
            }
            Ok(None) => Bytes::from(vec![0u8; chunk_len]),
            Err(err) => return Some(Err(err)),
        };

        self.index += 1;
        self.remaining -= chunk_len as u64;
        Some(Ok(chunk))
    }
}

/// Begin serializing `file_id` into a stream of byte chunks.
///
/// The declared size is snapshotted up front; blocks are fetched lazily as
/// the iterator advances. Fails `NotFound` for an unknown file.
pub fn serialize_iter(registry: &Registry, file_id: &str) -> Result<SerializeIter> {
    let size = registry.file_size(file_id)?;
    debug!(file_id, size, "serialize started");
    Ok(SerializeIter {
        store: Arc::clone(registry.store()),
        file_id: file_id.to_string(),
        block_size: registry.block_size(),
        index: 0,
        remaining: size,
    })
}

/// Build (or replace) `file_id` from an externally-chunked byte stream.
///
/// Chunk boundaries need not align with block boundaries: bytes accumulate
/// in a block-sized buffer and completed blocks flush as they fill, so no
/// more than one block is ever buffered. On exhaustion the final partial
/// block flushes and the declared size becomes the total bytes consumed,
/// which is also returned.
pub fn deserialize_iter<I>(registry: &Registry, file_id: &str, chunks: I) -> Result<u64>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let block_size = registry.block_size();
    let store = registry.store();

    // Replace semantics: any previous content of the file goes away first.
    store.delete_file(file_id)?;

    let mut buf = BytesMut::with_capacity(block_size);
    let mut index = 0u64;
    for chunk in chunks {
        buf.extend_from_slice(chunk.as_ref());
        while buf.len() >= block_size {
            let block = buf.split_to(block_size);
            store.put(file_id, index, block.to_vec())?;
            index += 1;
        }
    }

    let total = index * block_size as u64 + buf.len() as u64;
    if !buf.is_empty() {
        store.put(file_id, index, buf.to_vec())?;
    }

    let meta = registry.ensure_meta(file_id);
    *meta.size.lock() = total;
    debug!(file_id, size = total, "deserialize finished");
    Ok(total)
}
