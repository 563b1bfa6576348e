//! Log channel benchmarks: checksum framed writes and log file creation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tempfile::TempDir;
use txlog_bench::{bench_store_id, random_data};
use txlog_core::log::{LogChannelAllocator, LogFilesContext, LogFilesHelper, LogHeaderCache};
use txlog_core::{compute_checksum, ChecksumWriter, Config};
use txlog_storage::{DefaultFileSystem, EphemeralFileSystem, FileSystem};

fn allocator(fs: Arc<dyn FileSystem>, dir: &std::path::Path) -> LogChannelAllocator {
    let context = LogFilesContext::new(fs, Some(bench_store_id()))
        .with_config(Config::new().try_preallocate_logs(false));
    LogChannelAllocator::new(
        context,
        LogFilesHelper::new(dir),
        Arc::new(LogHeaderCache::new()),
    )
}

/// Benchmark the raw CRC32C over record payloads.
fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32c");

    for size in [64, 1024, 16 * 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let data = random_data(size);
            b.iter(|| black_box(compute_checksum(black_box(&data))));
        });
    }

    group.finish();
}

/// Benchmark framed record writes into an in-memory log file.
fn bench_framed_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("framed_write");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let fs = EphemeralFileSystem::new();
            let allocator = allocator(Arc::new(fs), std::path::Path::new("/db/transactions"));
            let mut channel = allocator.create_log_channel(0, || 0).unwrap();
            let data = random_data(size);

            b.iter(|| {
                channel.begin_checksum_for_writing();
                channel.put(black_box(&data)).unwrap();
                black_box(channel.put_checksum().unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark creating log files with a fresh header on disk.
fn bench_create_log_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_log_file");
    group.sample_size(20);

    group.bench_function("file", |b| {
        let temp_dir = TempDir::new().unwrap();
        let allocator = allocator(Arc::new(DefaultFileSystem::new()), temp_dir.path());
        let mut version = 0u64;

        b.iter(|| {
            let channel = allocator.create_log_channel(version, || version).unwrap();
            version += 1;
            black_box(channel.position());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_checksum,
    bench_framed_writes,
    bench_create_log_file
);
criterion_main!(benches);
