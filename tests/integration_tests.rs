//! Integration tests for blockvfs

use std::io::{Read, Write};
use std::sync::Arc;

use blockvfs::{
    deserialize_iter, serialize_iter, Config, FileHandle, KeyValueBlockStore, LockLevel,
    MemoryBackend, Registry, VfsError,
};

const BS: usize = 4096;

fn registry() -> Registry {
    Registry::new(Config::default())
}

/// Open (creating if needed) and escalate to RESERVED so writes are allowed
fn writer(registry: &Registry, file_id: &str) -> FileHandle {
    let mut handle = registry.open(file_id, true).unwrap();
    handle.lock(LockLevel::Reserved).unwrap();
    handle
}

/// Full contents of a file, via an exact-length read
fn contents(registry: &Registry, file_id: &str) -> Vec<u8> {
    let handle = registry.open(file_id, false).unwrap();
    let size = handle.file_size() as usize;
    handle.read(0, size).unwrap()
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_open_without_create_fails_not_found() {
    let registry = registry();
    let err = registry.open("never-created", false).unwrap_err();
    assert!(matches!(err, VfsError::NotFound(_)));
}

#[test]
fn test_open_create_then_access() {
    let registry = registry();
    assert!(!registry.access("a-test/cool.db"));

    registry.open("a-test/cool.db", true).unwrap();
    assert!(registry.access("a-test/cool.db"));
    assert_eq!(registry.file_size("a-test/cool.db").unwrap(), 0);
    assert_eq!(registry.file_ids(), vec!["a-test/cool.db".to_string()]);
}

#[test]
fn test_delete_is_idempotent_and_clears_content() {
    let registry = registry();
    let handle = writer(&registry, "db");
    handle.write(0, b"some bytes").unwrap();
    drop(handle);

    registry.delete("db").unwrap();
    assert!(!registry.access("db"));
    // Deleting again succeeds.
    registry.delete("db").unwrap();

    // Re-creating starts from scratch.
    let handle = registry.open("db", true).unwrap();
    assert_eq!(handle.file_size(), 0);
}

#[test]
fn test_file_size_tracks_latest_write() {
    let registry = registry();
    let handle = writer(&registry, "db");

    handle.write(0, &[7u8; 100]).unwrap();
    assert_eq!(registry.file_size("db").unwrap(), 100);

    // Writing inside the existing range does not shrink the size.
    handle.write(10, &[8u8; 20]).unwrap();
    assert_eq!(registry.file_size("db").unwrap(), 100);

    handle.write(5000, &[9u8; 10]).unwrap();
    assert_eq!(registry.file_size("db").unwrap(), 5010);
}

// =============================================================================
// FileHandle I/O Tests
// =============================================================================

#[test]
fn test_write_without_reserved_lock_fails_loudly() {
    let registry = registry();
    let mut handle = registry.open("db", true).unwrap();

    let err = handle.write(0, b"nope").unwrap_err();
    assert!(matches!(err, VfsError::ContractViolation(_)));

    // SHARED is still not enough.
    handle.lock(LockLevel::Shared).unwrap();
    let err = handle.write(0, b"nope").unwrap_err();
    assert!(matches!(err, VfsError::ContractViolation(_)));
    let err = handle.truncate(0).unwrap_err();
    assert!(matches!(err, VfsError::ContractViolation(_)));
}

#[test]
fn test_read_modify_write_preserves_neighbors() {
    let registry = registry();
    let handle = writer(&registry, "db");

    handle.write(0, &[b'a'; BS]).unwrap();
    handle.write(100, &[b'x'; 50]).unwrap();

    let data = handle.read(0, BS).unwrap();
    assert!(data[..100].iter().all(|&b| b == b'a'));
    assert!(data[100..150].iter().all(|&b| b == b'x'));
    assert!(data[150..].iter().all(|&b| b == b'a'));
}

#[test]
fn test_overlapping_writes_last_writer_wins_in_overlap_only() {
    let registry = registry();
    let handle = writer(&registry, "db");

    handle.write(0, &[b'A'; BS]).unwrap();
    handle.write(2048, &[b'B'; BS]).unwrap();

    let data = handle.read(0, 6144).unwrap();
    assert!(data[..2048].iter().all(|&b| b == b'A'));
    assert!(data[2048..6144].iter().all(|&b| b == b'B'));
}

#[test]
fn test_write_spanning_many_blocks() {
    let registry = registry();
    let handle = writer(&registry, "db");

    let payload: Vec<u8> = (0..3 * BS + 500).map(|i| (i % 251) as u8).collect();
    handle.write(300, &payload).unwrap();

    assert_eq!(handle.read(300, payload.len()).unwrap(), payload);
    // The 300 bytes before the write were never touched and read as zeros.
    assert_eq!(handle.read(0, 300).unwrap(), vec![0u8; 300]);
}

#[test]
fn test_short_read_carries_valid_prefix() {
    let registry = registry();
    let handle = writer(&registry, "db");
    handle.write(0, b"0123456789").unwrap();

    match handle.read(5, 20).unwrap_err() {
        VfsError::ShortRead { data, requested } => {
            assert_eq!(data, b"56789");
            assert_eq!(requested, 20);
        }
        other => panic!("expected ShortRead, got {other:?}"),
    }

    // Entirely past end-of-file: nothing valid at all.
    match handle.read(100, 4).unwrap_err() {
        VfsError::ShortRead { data, .. } => assert!(data.is_empty()),
        other => panic!("expected ShortRead, got {other:?}"),
    }
}

#[test]
fn test_holes_read_back_as_zeros() {
    let registry = registry();
    let handle = writer(&registry, "db");

    // Blocks 0 and 2 written, block 1 never touched.
    handle.write(0, &[b'x'; BS]).unwrap();
    handle.write(2 * BS as u64, &[b'y'; BS]).unwrap();

    assert_eq!(handle.read(BS as u64, BS).unwrap(), vec![0u8; BS]);
}

#[test]
fn test_sync_is_a_noop() {
    let registry = registry();
    let handle = writer(&registry, "db");
    handle.write(0, b"bytes").unwrap();
    handle.sync().unwrap();
    assert_eq!(handle.read(0, 5).unwrap(), b"bytes");
}

// =============================================================================
// Truncate Tests
// =============================================================================

#[test]
fn test_truncate_drops_trailing_blocks() {
    let registry = registry();
    let handle = writer(&registry, "db");
    handle.write(0, &[b'z'; 3 * BS]).unwrap();

    handle.truncate(BS as u64).unwrap();
    assert_eq!(handle.file_size(), BS as u64);
    assert_eq!(handle.read(0, BS).unwrap(), vec![b'z'; BS]);
    assert!(matches!(
        handle.read(BS as u64, 1),
        Err(VfsError::ShortRead { .. })
    ));
}

#[test]
fn test_truncate_inside_a_block_zeroes_stale_bytes() {
    let registry = registry();
    let handle = writer(&registry, "db");
    handle.write(0, &[0xAA; BS]).unwrap();

    handle.truncate(100).unwrap();
    assert_eq!(handle.file_size(), 100);

    // Extending again must not resurrect the 0xAA bytes.
    handle.write(150, &[0xBB; 10]).unwrap();
    let data = handle.read(0, 160).unwrap();
    assert!(data[..100].iter().all(|&b| b == 0xAA));
    assert!(data[100..150].iter().all(|&b| b == 0));
    assert!(data[150..].iter().all(|&b| b == 0xBB));
}

#[test]
fn test_truncate_never_grows() {
    let registry = registry();
    let handle = writer(&registry, "db");
    handle.write(0, &[1u8; 100]).unwrap();

    handle.truncate(5000).unwrap();
    assert_eq!(handle.file_size(), 100);
}

// =============================================================================
// Stream Codec Tests
// =============================================================================

fn fill(registry: &Registry, file_id: &str, len: usize) -> Vec<u8> {
    let payload: Vec<u8> = (0..len).map(|i| (i % 239) as u8).collect();
    let handle = writer(registry, file_id);
    handle.write(0, &payload).unwrap();
    payload
}

fn collect_stream(registry: &Registry, file_id: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in serialize_iter(registry, file_id).unwrap() {
        let chunk = chunk.unwrap();
        assert!(!chunk.is_empty(), "codec must never yield an empty chunk");
        out.extend_from_slice(&chunk);
    }
    out
}

#[test]
fn test_serialize_deserialize_round_trip_edge_sizes() {
    for len in [0, 1, BS - 1, BS, 3 * BS + 1234] {
        let registry = registry();
        let payload = fill(&registry, "src", len);

        let stream = collect_stream(&registry, "src");
        assert_eq!(stream.len(), len);

        let total = deserialize_iter(&registry, "dst", stream.chunks(1000)).unwrap();
        assert_eq!(total as usize, len);
        assert_eq!(registry.file_size("dst").unwrap() as usize, len);
        assert_eq!(contents(&registry, "dst"), payload, "len={len}");
    }
}

#[test]
fn test_serialize_materializes_holes_as_zeros() {
    let registry = registry();
    let handle = writer(&registry, "db");
    handle.write(0, &[b'x'; BS]).unwrap();
    handle.write(2 * BS as u64, &[b'y'; BS]).unwrap();
    drop(handle);

    let stream = collect_stream(&registry, "db");
    assert_eq!(stream.len(), 3 * BS);
    assert!(stream[..BS].iter().all(|&b| b == b'x'));
    assert!(stream[BS..2 * BS].iter().all(|&b| b == 0));
    assert!(stream[2 * BS..].iter().all(|&b| b == b'y'));
}

#[test]
fn test_serialize_is_restartable() {
    let registry = registry();
    fill(&registry, "db", 2 * BS + 77);

    let first = collect_stream(&registry, "db");
    let second = collect_stream(&registry, "db");
    assert_eq!(first, second);
}

#[test]
fn test_serialize_unknown_file_fails_not_found() {
    let registry = registry();
    assert!(matches!(
        serialize_iter(&registry, "missing"),
        Err(VfsError::NotFound(_))
    ));
}

#[test]
fn test_deserialize_replaces_previous_content() {
    let registry = registry();
    fill(&registry, "db", 5 * BS);

    deserialize_iter(&registry, "db", [b"tiny".as_slice()]).unwrap();
    assert_eq!(registry.file_size("db").unwrap(), 4);
    assert_eq!(contents(&registry, "db"), b"tiny");

    // Nothing of the old five blocks leaks into a fresh serialization.
    assert_eq!(collect_stream(&registry, "db"), b"tiny");
}

#[test]
fn test_deserialize_accepts_unaligned_chunking() {
    let registry = registry();
    let payload: Vec<u8> = (0..2 * BS + 300).map(|i| (i % 13) as u8).collect();

    // 997 is prime, so no chunk boundary ever lands on a block boundary.
    deserialize_iter(&registry, "db", payload.chunks(997)).unwrap();
    assert_eq!(contents(&registry, "db"), payload);
}

#[test]
fn test_round_trip_through_a_real_file() {
    let registry = registry();
    let payload = fill(&registry, "src", 3 * BS + 41);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.db");

    let mut file = std::fs::File::create(&path).unwrap();
    for chunk in serialize_iter(&registry, "src").unwrap() {
        file.write_all(&chunk.unwrap()).unwrap();
    }
    drop(file);

    let mut file = std::fs::File::open(&path).unwrap();
    let chunks = std::iter::from_fn(|| {
        let mut buf = vec![0u8; 1500];
        match file.read(&mut buf) {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some(buf)
            }
            Err(e) => panic!("read failed: {e}"),
        }
    });
    deserialize_iter(&registry, "dst", chunks).unwrap();

    assert_eq!(contents(&registry, "dst"), payload);
}

// =============================================================================
// Key/Value-Backed Store Tests
// =============================================================================

fn kv_registry() -> Registry {
    Registry::with_store(
        Config::default(),
        Arc::new(KeyValueBlockStore::new(MemoryBackend::new())),
    )
}

#[test]
fn test_kv_store_write_read_round_trip() {
    let registry = kv_registry();
    let handle = writer(&registry, "bucket/file.db");

    let payload: Vec<u8> = (0..2 * BS + 99).map(|i| (i % 241) as u8).collect();
    handle.write(10, &payload).unwrap();
    assert_eq!(handle.read(10, payload.len()).unwrap(), payload);
}

#[test]
fn test_kv_store_indices_are_numeric_ascending() {
    // More than ten blocks so lexicographic-vs-numeric ordering would differ
    // without zero-padded keys.
    let registry = kv_registry();
    let payload = fill(&registry, "db", 12 * BS + 5);

    assert_eq!(collect_stream(&registry, "db"), payload);
}

#[test]
fn test_kv_store_delete_file_removes_every_object() {
    let backend = Arc::new(KeyValueBlockStore::new(MemoryBackend::new()));
    let store: Arc<dyn blockvfs::BlockStore> = backend.clone();
    let registry = Registry::with_store(Config::default(), store);

    fill(&registry, "db", 4 * BS);
    assert!(backend.backend().key_count() > 0);

    registry.delete("db").unwrap();
    assert_eq!(backend.backend().key_count(), 0);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_competing_writers_never_interleave_within_a_hold() {
    let registry = registry();
    registry.open("db", true).unwrap();

    std::thread::scope(|scope| {
        for value in [b'p', b'q', b'r'] {
            let registry = &registry;
            scope.spawn(move || {
                let mut handle = registry.open("db", false).unwrap();
                for _ in 0..50 {
                    loop {
                        match handle.lock(LockLevel::Reserved) {
                            Ok(()) => break,
                            Err(VfsError::Busy(_)) => std::thread::yield_now(),
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                    // Two half-block writes under one hold: a competing
                    // writer must never land between them.
                    handle.write(0, &[value; BS / 2]).unwrap();
                    handle.write(BS as u64 / 2, &[value; BS / 2]).unwrap();
                    handle.unlock(LockLevel::Unlocked);
                }
            });
        }
    });

    let data = contents(&registry, "db");
    assert_eq!(data.len(), BS);
    assert!(
        data.iter().all(|&b| b == data[0]),
        "block must be uniform, found a torn write"
    );
}
