//! Benchmarks for blockvfs block translation and streaming

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use blockvfs::{deserialize_iter, serialize_iter, Config, LockLevel, Registry};

const BS: usize = 4096;
const FILE_BLOCKS: usize = 256;

fn seeded_registry() -> Registry {
    let registry = Registry::new(Config::default());
    let mut handle = registry.open("bench.db", true).unwrap();
    handle.lock(LockLevel::Reserved).unwrap();
    let payload: Vec<u8> = (0..FILE_BLOCKS * BS).map(|i| (i % 251) as u8).collect();
    handle.write(0, &payload).unwrap();
    registry
}

fn write_throughput(c: &mut Criterion) {
    let registry = Registry::new(Config::default());
    let mut handle = registry.open("bench.db", true).unwrap();
    handle.lock(LockLevel::Reserved).unwrap();
    let page = vec![0xABu8; BS];

    let mut group = c.benchmark_group("write");
    group.throughput(Throughput::Bytes(BS as u64));

    let mut offset = 0u64;
    group.bench_function("aligned_page", |b| {
        b.iter(|| {
            handle.write(offset, black_box(&page)).unwrap();
            offset = (offset + BS as u64) % (FILE_BLOCKS * BS) as u64;
        })
    });

    // Unaligned writes exercise the read-modify-write merge path.
    let mut unaligned = 100u64;
    group.bench_function("unaligned_page", |b| {
        b.iter(|| {
            handle.write(unaligned, black_box(&page)).unwrap();
            unaligned = (unaligned + BS as u64) % (FILE_BLOCKS * BS) as u64;
        })
    });
    group.finish();
}

fn read_throughput(c: &mut Criterion) {
    let registry = seeded_registry();
    let handle = registry.open("bench.db", false).unwrap();

    let mut group = c.benchmark_group("read");
    group.throughput(Throughput::Bytes(BS as u64));

    let mut offset = 0u64;
    group.bench_function("aligned_page", |b| {
        b.iter(|| {
            let data = handle.read(offset, BS).unwrap();
            offset = (offset + BS as u64) % ((FILE_BLOCKS - 1) * BS) as u64;
            black_box(data)
        })
    });
    group.finish();
}

fn stream_throughput(c: &mut Criterion) {
    let registry = seeded_registry();
    let total = (FILE_BLOCKS * BS) as u64;

    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(total));

    group.bench_function("serialize", |b| {
        b.iter(|| {
            let mut bytes = 0u64;
            for chunk in serialize_iter(&registry, "bench.db").unwrap() {
                bytes += chunk.unwrap().len() as u64;
            }
            assert_eq!(bytes, total);
        })
    });

    let image: Vec<u8> = (0..FILE_BLOCKS * BS).map(|i| (i % 251) as u8).collect();
    group.bench_function("deserialize", |b| {
        b.iter(|| {
            let n = deserialize_iter(&registry, "import.db", image.chunks(64 * 1024)).unwrap();
            assert_eq!(n, total);
        })
    });
    group.finish();
}

criterion_group!(benches, write_throughput, read_throughput, stream_throughput);
criterion_main!(benches);
