//! Integration tests for log channel allocation and checksum framing.

use std::cell::Cell;
use std::sync::Arc;
use txlog_core::log::{
    read_log_header_from_file, CountingDatabaseTracer, DatabaseTracer, LogChannelAllocator,
    LogFilesContext, LogFilesHelper, LogHeaderCache,
};
use txlog_core::{
    ChecksumReader, ChecksumWriter, Config, CoreError, LogFormat, LogPosition, StoreId,
};
use txlog_storage::{DefaultFileSystem, EphemeralFileSystem, FileSystem};
use txlog_testkit::prelude::*;

struct Fixture {
    allocator: LogChannelAllocator,
    tracer: Arc<CountingDatabaseTracer>,
    cache: Arc<LogHeaderCache>,
}

fn allocator_on(fs: Arc<dyn FileSystem>, dir: &std::path::Path, config: Config) -> Fixture {
    init_test_logging();
    let tracer = Arc::new(CountingDatabaseTracer::new());
    let cache = Arc::new(LogHeaderCache::new());
    let context = LogFilesContext::new(fs, Some(StoreId::new(1, 2, "record", "aligned", 2, 0)))
        .with_tracer(Arc::clone(&tracer) as Arc<dyn DatabaseTracer>)
        .with_config(config);
    let allocator = LogChannelAllocator::new(
        context,
        LogFilesHelper::new(dir.join("transactions")),
        Arc::clone(&cache),
    );
    Fixture {
        allocator,
        tracer,
        cache,
    }
}

fn small_preallocation() -> Config {
    Config::new().preallocation_size(4096)
}

fn no_preallocation() -> Config {
    Config::new().try_preallocate_logs(false)
}

#[test]
fn created_log_has_current_header_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let f = allocator_on(Arc::new(DefaultFileSystem::new()), dir.path(), small_preallocation());

    let channel = f.allocator.create_log_channel(3, || 77).unwrap();
    assert_eq!(channel.format(), LogFormat::CURRENT);
    assert_eq!(channel.position(), LogPosition::new(3, 144));
    drop(channel);

    let path = f.allocator.files().log_file_for_version(3);
    let header = read_log_header_from_file(&DefaultFileSystem::new(), &path)
        .unwrap()
        .unwrap();
    assert_eq!(header.last_committed_tx_id(), 77);
    assert_eq!(f.allocator.read_header(3).unwrap(), Some(header.clone()));
    assert_eq!(
        header.store_id().map(StoreId::store_version),
        Some(current_version())
    );
    assert_eq!(f.tracer.created_files(), 1);
    assert_eq!(f.tracer.completed_creations(), 1);
    assert_eq!(f.tracer.closed_files(), 1);
}

#[test]
fn existing_header_is_kept_and_supplier_not_called() {
    let dir = tempfile::tempdir().unwrap();
    let f = allocator_on(Arc::new(DefaultFileSystem::new()), dir.path(), small_preallocation());
    f.allocator.create_log_channel(0, || 10).unwrap();

    let called = Cell::new(false);
    let channel = f
        .allocator
        .create_log_channel(0, || {
            called.set(true);
            99
        })
        .unwrap();
    assert!(!called.get());
    assert_eq!(channel.position().byte_offset, 144);
    assert_eq!(f.tracer.created_files(), 1);
    assert_eq!(f.cache.get_header(0).unwrap().last_committed_tx_id(), 10);
}

#[test]
fn preallocated_file_gets_header() {
    let fs = EphemeralFileSystem::new();
    let f = allocator_on(Arc::new(fs.clone()), std::path::Path::new("/db"), small_preallocation());

    let channel = f.allocator.create_log_channel(1, || 5).unwrap();
    assert_eq!(channel.size().unwrap(), 4096);
    drop(channel);

    let data = fs
        .file_contents(&f.allocator.files().log_file_for_version(1))
        .unwrap();
    assert_ne!(&data[..8], &[0u8; 8]);
    assert!(data[144..].iter().all(|&b| b == 0));
}

#[test]
fn open_read_only_counts_open_and_close() {
    let dir = tempfile::tempdir().unwrap();
    let f = allocator_on(Arc::new(DefaultFileSystem::new()), dir.path(), small_preallocation());
    f.allocator.create_log_channel(2, || 1).unwrap();

    for raw in [false, true] {
        let channel = f.allocator.open_log_channel(2, raw).unwrap();
        assert_eq!(channel.log_version(), 2);
        channel.close();
    }
    assert_eq!(f.tracer.opened_files(), 2);
    assert_eq!(f.tracer.closed_files(), 3);
}

#[test]
fn open_missing_or_unwritten_log_fails() {
    let fs = EphemeralFileSystem::new();
    let f = allocator_on(Arc::new(fs.clone()), std::path::Path::new("/db"), no_preallocation());

    assert!(matches!(
        f.allocator.open_log_channel(4, false),
        Err(CoreError::NoSuchFile { .. })
    ));

    fs.put_file(&f.allocator.files().log_file_for_version(4), vec![0u8; 256]);
    let err = f.allocator.open_log_channel(4, false).unwrap_err();
    assert!(matches!(err, CoreError::IllegalState { .. }));
    assert!(err.to_string().contains("expected header version: 4"));
}

#[test]
fn open_log_with_other_version_fails() {
    let fs = EphemeralFileSystem::new();
    let f = allocator_on(Arc::new(fs.clone()), std::path::Path::new("/db"), no_preallocation());
    fs.put_file(
        &f.allocator.files().log_file_for_version(6),
        encode_legacy_header(LogFormat::V9, 5, 1, None, 0, 0),
    );

    let err = f.allocator.open_log_channel(6, true).unwrap_err();
    assert!(err.to_string().contains("unexpected log file header"));
}

#[test]
fn checksum_framed_records_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let f = allocator_on(Arc::new(DefaultFileSystem::new()), dir.path(), small_preallocation());
    let records: [&[u8]; 3] = [b"first", b"", b"third record"];

    let mut writer = f.allocator.create_log_channel(0, || 0).unwrap();
    for record in records {
        writer.begin_checksum_for_writing();
        writer.put_u32(record.len() as u32).unwrap();
        writer.put(record).unwrap();
        writer.put_checksum().unwrap();
    }
    writer.sync().unwrap();
    drop(writer);

    let mut reader = f.allocator.open_log_channel(0, false).unwrap();
    for record in records {
        reader.begin_checksum_for_reading();
        let len = u32::from_be_bytes(reader.get(4).unwrap().try_into().unwrap());
        assert_eq!(reader.get(len as usize).unwrap(), record);
        reader.end_checksum_and_validate().unwrap();
    }
}

#[test]
fn corrupted_record_fails_validation() {
    let fs = EphemeralFileSystem::new();
    let f = allocator_on(Arc::new(fs.clone()), std::path::Path::new("/db"), no_preallocation());
    let path = f.allocator.files().log_file_for_version(0);

    let mut writer = f.allocator.create_log_channel(0, || 0).unwrap();
    writer.begin_checksum_for_writing();
    writer.put(b"payload").unwrap();
    writer.put_checksum().unwrap();
    writer.flush().unwrap();
    drop(writer);

    let mut data = fs.file_contents(&path).unwrap();
    data[145] ^= 0xFF;
    fs.put_file(&path, data);

    let mut reader = f.allocator.open_log_channel(0, true).unwrap();
    reader.begin_checksum_for_reading();
    reader.get(7).unwrap();
    assert!(matches!(
        reader.end_checksum_and_validate(),
        Err(CoreError::ChecksumMismatch { .. })
    ));
}

#[test]
fn positions_order_across_files() {
    let fs = EphemeralFileSystem::new();
    let f = allocator_on(Arc::new(fs), std::path::Path::new("/db"), no_preallocation());

    let mut a = f.allocator.create_log_channel(0, || 0).unwrap();
    a.put(&[1u8; 1000]).unwrap();
    let b = f.allocator.create_log_channel(1, || 0).unwrap();
    assert!(a.position() < b.position());
    assert_eq!(a.position(), LogPosition::new(0, 1144));
}
