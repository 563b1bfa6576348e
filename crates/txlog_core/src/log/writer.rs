//! Writing log headers.
//!
//! Only the current format is ever written. Older formats are read and
//! then rewritten by the log migrator.

use super::format::{encode_log_version, LogFormat, BIGGEST_HEADER};
use super::header::LogHeader;
use crate::error::{CoreError, CoreResult};
use crate::store_id::STORE_ID_SERIALIZED_SIZE;
use bytes::BufMut;
use txlog_storage::StoreChannel;

/// Encodes `header` into the current on-disk layout.
///
/// # Errors
///
/// Returns `InvalidArgument` if the header is not in the current format or
/// its log version does not fit the encoded field, and propagates store id
/// serialization errors.
pub fn encode_log_header(header: &LogHeader) -> CoreResult<Vec<u8>> {
    if !header.format().is_current() {
        return Err(CoreError::invalid_argument(format!(
            "only {} headers can be written, got {}",
            LogFormat::CURRENT,
            header.format()
        )));
    }

    let mut out = Vec::with_capacity(BIGGEST_HEADER);
    out.put_u64(encode_log_version(
        header.log_version(),
        header.format().version_byte(),
    )?);
    out.put_u64(header.last_committed_tx_id());
    match header.store_id() {
        Some(id) => out.put_slice(&id.serialize_fixed()?),
        None => out.put_bytes(0, STORE_ID_SERIALIZED_SIZE),
    }
    out.put_u32(header.segment_size());
    out.put_u32(header.checksum());
    out.put_bytes(0, BIGGEST_HEADER - out.len());
    Ok(out)
}

/// Writes `header` at offset 0 of `channel`.
///
/// The caller flushes.
///
/// # Errors
///
/// See [`encode_log_header`]; storage errors are propagated.
pub fn write_log_header<C: StoreChannel + ?Sized>(
    channel: &mut C,
    header: &LogHeader,
) -> CoreResult<()> {
    let bytes = encode_log_header(header)?;
    channel.write_at(0, &bytes)?;
    Ok(())
}
