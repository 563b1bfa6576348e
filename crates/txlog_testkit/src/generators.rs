//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use crate::legacy::{encode_legacy_header, expected_header};
use proptest::prelude::*;
use txlog_core::log::LOG_VERSION_MASK;
use txlog_core::{LogFormat, LogHeader, StoreId, StoreVersion, MAX_VERSION_COMPONENT};

/// Strategy for generating store versions whose names fit a store id.
pub fn store_version_strategy() -> impl Strategy<Value = StoreVersion> {
    (
        prop::string::string_regex("[a-z][a-z0-9-]{0,19}").expect("Invalid regex"),
        prop::string::string_regex("[a-z][a-z0-9-]{0,19}").expect("Invalid regex"),
        0..=MAX_VERSION_COMPONENT,
        0..=MAX_VERSION_COMPONENT,
    )
        .prop_map(|(engine, format, major, minor)| {
            StoreVersion::new(engine, format, major, minor)
        })
}

/// Strategy for generating serializable store ids.
pub fn store_id_strategy() -> impl Strategy<Value = StoreId> {
    (any::<i64>(), any::<i64>(), store_version_strategy()).prop_map(
        |(creation_time, random, version)| {
            StoreId::new(
                creation_time,
                random,
                version.storage_engine,
                version.format_name,
                version.major,
                version.minor,
            )
        },
    )
}

/// Strategy for generating log versions that fit the encoded version field.
pub fn log_version_strategy() -> impl Strategy<Value = u64> {
    0..=LOG_VERSION_MASK
}

/// Strategy for picking a header format.
pub fn log_format_strategy() -> impl Strategy<Value = LogFormat> {
    prop::sample::select(LogFormat::ALL.to_vec())
}

/// A header as written by some release, with the bytes it was written as.
#[derive(Debug, Clone)]
pub struct LegacyHeaderCase {
    /// The format the header was written in.
    pub format: LogFormat,
    /// The on-disk bytes.
    pub bytes: Vec<u8>,
    /// What a reader must decode from `bytes`.
    pub expected: LogHeader,
}

/// Strategy for generating headers of every format.
pub fn legacy_header_strategy() -> impl Strategy<Value = LegacyHeaderCase> {
    (
        log_format_strategy(),
        log_version_strategy(),
        any::<u64>(),
        prop::option::of(store_id_strategy()),
        any::<u32>(),
        any::<u32>(),
    )
        .prop_map(|(format, version, tx, store_id, segment_size, checksum)| {
            let args = (format, version, tx, store_id.as_ref(), segment_size, checksum);
            LegacyHeaderCase {
                format,
                bytes: encode_legacy_header(args.0, args.1, args.2, args.3, args.4, args.5),
                expected: expected_header(args.0, args.1, args.2, args.3, args.4, args.5),
            }
        })
}

/// Strategy for generating record payloads for checksum framing.
pub fn record_payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn store_id_serializes(id in store_id_strategy()) {
            prop_assert!(id.serialize_fixed().is_ok());
        }

        #[test]
        fn legacy_case_has_format_size(case in legacy_header_strategy()) {
            prop_assert_eq!(case.bytes.len(), case.format.header_size());
            prop_assert_eq!(case.expected.format(), case.format);
        }
    }
}
