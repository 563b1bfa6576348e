//! Benchmark utilities.

#![warn(missing_docs)]

use rand::Rng;
use txlog_core::{LogFormat, LogHeader, StoreId};

/// Generate random record data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// A store id with typical name lengths.
pub fn bench_store_id() -> StoreId {
    StoreId::new(1_700_000_000_000, 987_654_321, "record", "aligned", 2, 0)
}

/// A current-format header for log file `version`.
pub fn current_header(version: u64) -> LogHeader {
    LogHeader::new(
        LogFormat::CURRENT,
        version,
        version * 1000,
        Some(bench_store_id()),
        256 * 1024 * 1024,
        0xDEAD_5EED,
    )
}
