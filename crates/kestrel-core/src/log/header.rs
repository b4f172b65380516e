//! # Log Header Codec
//!
//! Every transaction log segment starts with a header. Its first 8 bytes are
//! the version word: the format tag in the top byte, the segment's log
//! version in the low 56 bits. The tag decides how many bytes follow.
//!
//! | Format      | Tag | Size | Fields after the version word                         |
//! |-------------|-----|------|-------------------------------------------------------|
//! | Compact     | 6   | 16   | previous committed tx id                              |
//! | Extended    | 7   | 64   | previous committed tx id, 5 legacy fields, 1 reserved |
//! | Store-bound | 8   | 128  | previous committed tx id, store id, 6 reserved        |
//!
//! All integers are big-endian. A zero version word marks a pre-allocated
//! segment whose header has not been written yet.

use super::store_id::StoreId;
use crate::primitives::{
    LOG_FORMAT_COMPACT, LOG_FORMAT_EXTENDED, LOG_FORMAT_STORE_BOUND, LOG_HEADER_SIZE_COMPACT,
    LOG_HEADER_SIZE_EXTENDED, LOG_HEADER_SIZE_STORE_BOUND, LOG_HEADER_VERSION_SIZE,
    LOG_VERSION_BITS, LOG_VERSION_MASK, MAX_LOG_HEADER_SIZE, STORE_BOUND_RESERVED_FIELDS,
};
use crate::KestrelError;
use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::Path;

// Legacy creation time, random, store version, upgrade time, upgrade tx id,
// then one reserved field.
const EXTENDED_DISCARDED_FIELDS: usize = 6;

// =============================================================================
// FORMAT
// =============================================================================

/// Supported header layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Extended,
    StoreBound,
}

impl LogFormat {
    /// The format new segments are written in.
    pub const CURRENT: Self = Self::StoreBound;

    /// Decode a format tag.
    pub fn from_tag(tag: u8) -> Result<Self, KestrelError> {
        match tag {
            LOG_FORMAT_COMPACT => Ok(Self::Compact),
            LOG_FORMAT_EXTENDED => Ok(Self::Extended),
            LOG_FORMAT_STORE_BOUND => Ok(Self::StoreBound),
            other => Err(KestrelError::UnrecognizedLogFormat(other)),
        }
    }

    /// The tag stored in the top byte of the version word.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Compact => LOG_FORMAT_COMPACT,
            Self::Extended => LOG_FORMAT_EXTENDED,
            Self::StoreBound => LOG_FORMAT_STORE_BOUND,
        }
    }

    /// Total header size, version word included.
    #[must_use]
    pub const fn header_size(self) -> usize {
        match self {
            Self::Compact => LOG_HEADER_SIZE_COMPACT,
            Self::Extended => LOG_HEADER_SIZE_EXTENDED,
            Self::StoreBound => LOG_HEADER_SIZE_STORE_BOUND,
        }
    }

    /// Whether headers of this format carry a store id.
    #[must_use]
    pub const fn has_store_id(self) -> bool {
        matches!(self, Self::StoreBound)
    }
}

// =============================================================================
// HEADER
// =============================================================================

/// A decoded log segment header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogHeader {
    pub format: LogFormat,
    pub log_version: u64,
    pub last_committed_tx_id: u64,
    pub store_id: Option<StoreId>,
    pub header_size: usize,
}

impl LogHeader {
    /// A header in `format`; its size follows from the format.
    #[must_use]
    pub fn new(
        format: LogFormat,
        log_version: u64,
        last_committed_tx_id: u64,
        store_id: Option<StoreId>,
    ) -> Self {
        Self {
            format,
            log_version,
            last_committed_tx_id,
            store_id,
            header_size: format.header_size(),
        }
    }

    /// A header in the current format.
    #[must_use]
    pub fn current(log_version: u64, last_committed_tx_id: u64, store_id: StoreId) -> Self {
        Self::new(LogFormat::CURRENT, log_version, last_committed_tx_id, Some(store_id))
    }

    /// The raw format tag.
    #[must_use]
    pub fn format_tag(&self) -> u8 {
        self.format.tag()
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Read a log header from the start of `channel`.
///
/// Returns `Ok(None)` for a zero version word (a segment whose header was
/// never written), and, when not `strict`, for a channel that ends before the
/// header does. In `strict` mode a short read fails with
/// `IncompleteLogHeader`, naming `path` when given. An unknown format tag
/// always fails with `UnrecognizedLogFormat`.
pub fn read_log_header<R: Read + ?Sized>(
    channel: &mut R,
    strict: bool,
    path: Option<&Path>,
) -> Result<Option<LogHeader>, KestrelError> {
    let mut buffer = BytesMut::with_capacity(MAX_LOG_HEADER_SIZE);

    if !safe_read(&mut buffer, channel, LOG_HEADER_VERSION_SIZE, strict, path)? {
        return Ok(None);
    }
    let version_word = buffer.get_u64();
    if version_word == 0 {
        return Ok(None);
    }

    let format = LogFormat::from_tag(((version_word >> LOG_VERSION_BITS) & 0xFF) as u8)?;
    let log_version = version_word & LOG_VERSION_MASK;

    let remaining = format.header_size() - LOG_HEADER_VERSION_SIZE;
    if !safe_read(&mut buffer, channel, remaining, strict, path)? {
        return Ok(None);
    }
    let last_committed_tx_id = buffer.get_u64();
    let store_id = match format {
        LogFormat::Compact => None,
        LogFormat::Extended => {
            buffer.advance(8 * EXTENDED_DISCARDED_FIELDS);
            None
        }
        LogFormat::StoreBound => {
            let store_id = StoreId::deserialize_fixed(&mut buffer)?;
            buffer.advance(8 * STORE_BOUND_RESERVED_FIELDS);
            Some(store_id)
        }
    };

    Ok(Some(LogHeader::new(
        format,
        log_version,
        last_committed_tx_id,
        store_id,
    )))
}

/// Fill `buffer` with exactly `size` bytes from `channel`.
///
/// Returns `false` on a short read in lenient mode.
fn safe_read<R: Read + ?Sized>(
    buffer: &mut BytesMut,
    channel: &mut R,
    size: usize,
    strict: bool,
    path: Option<&Path>,
) -> Result<bool, KestrelError> {
    buffer.clear();
    buffer.resize(size, 0);
    let read = read_up_to(channel, &mut buffer[..])?;
    if read == size {
        return Ok(true);
    }
    if strict {
        return Err(KestrelError::IncompleteLogHeader {
            path: path.map(Path::to_path_buf),
            read,
            expected: size,
        });
    }
    tracing::debug!(
        path = ?path,
        read,
        expected = size,
        "incomplete log header, treating as absent"
    );
    Ok(false)
}

fn read_up_to<R: Read + ?Sized>(channel: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match channel.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode `header` into its on-disk bytes.
///
/// The store-bound format requires a store id; the legacy formats reject one.
pub fn encode_log_header(header: &LogHeader) -> Result<BytesMut, KestrelError> {
    if header.log_version > LOG_VERSION_MASK {
        return Err(KestrelError::CorruptLogHeader(format!(
            "log version {} does not fit in {LOG_VERSION_BITS} bits",
            header.log_version
        )));
    }
    if header.header_size != header.format.header_size() {
        return Err(KestrelError::CorruptLogHeader(format!(
            "{:?} headers are {} bytes, not {}",
            header.format,
            header.format.header_size(),
            header.header_size
        )));
    }

    let mut buf = BytesMut::with_capacity(header.header_size);
    buf.put_u64((u64::from(header.format.tag()) << LOG_VERSION_BITS) | header.log_version);
    buf.put_u64(header.last_committed_tx_id);

    match (header.format, &header.store_id) {
        (LogFormat::Compact, None) => {}
        (LogFormat::Extended, None) => buf.put_bytes(0, 8 * EXTENDED_DISCARDED_FIELDS),
        (LogFormat::StoreBound, Some(store_id)) => {
            store_id.serialize_fixed(&mut buf)?;
            buf.put_bytes(0, 8 * STORE_BOUND_RESERVED_FIELDS);
        }
        (LogFormat::StoreBound, None) => {
            return Err(KestrelError::StoreIdError(
                "store-bound log headers require a store id".to_string(),
            ));
        }
        (format, Some(_)) => {
            return Err(KestrelError::StoreIdError(format!(
                "{format:?} log headers cannot carry a store id"
            )));
        }
    }
    Ok(buf)
}

/// Write `header` to `channel`; returns the number of bytes written.
pub fn write_log_header<W: Write + ?Sized>(
    channel: &mut W,
    header: &LogHeader,
) -> Result<usize, KestrelError> {
    let bytes = encode_log_header(header)?;
    channel.write_all(&bytes)?;
    Ok(bytes.len())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn store_id() -> StoreId {
        StoreId::new(1, 2, "record", "standard", 5, 0).expect("store id")
    }

    fn encoded(header: &LogHeader) -> Vec<u8> {
        encode_log_header(header).expect("encode").to_vec()
    }

    #[test]
    fn version_word_packs_tag_and_version() {
        let bytes = encoded(&LogHeader::new(LogFormat::Compact, 0x0102_0304, 9, None));
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &[6, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(&bytes[8..], &9u64.to_be_bytes());
    }

    #[test]
    fn unknown_tag_is_rejected_in_both_modes() {
        let mut word = [0u8; 16];
        word[0] = 9;
        word[7] = 1;
        for strict in [true, false] {
            let result = read_log_header(&mut Cursor::new(word), strict, None);
            assert!(matches!(result, Err(KestrelError::UnrecognizedLogFormat(9))));
        }
    }

    #[test]
    fn short_body_reports_body_counts() {
        let bytes = encoded(&LogHeader::current(3, 10, store_id()));
        let result = read_log_header(&mut Cursor::new(&bytes[..100]), true, None);
        assert!(matches!(
            result,
            Err(KestrelError::IncompleteLogHeader {
                path: None,
                read: 92,
                expected: 120
            })
        ));
    }

    #[test]
    fn store_id_presence_must_match_format() {
        let missing = LogHeader::new(LogFormat::StoreBound, 1, 1, None);
        assert!(matches!(
            encode_log_header(&missing),
            Err(KestrelError::StoreIdError(_))
        ));

        let extra = LogHeader::new(LogFormat::Extended, 1, 1, Some(store_id()));
        assert!(matches!(
            encode_log_header(&extra),
            Err(KestrelError::StoreIdError(_))
        ));
    }

    #[test]
    fn oversized_log_version_is_rejected() {
        let header = LogHeader::new(LogFormat::Compact, LOG_VERSION_MASK + 1, 0, None);
        assert!(matches!(
            encode_log_header(&header),
            Err(KestrelError::CorruptLogHeader(_))
        ));
    }

    #[test]
    fn reader_stops_at_header_end() {
        let mut bytes = encoded(&LogHeader::new(LogFormat::Extended, 4, 40, None));
        bytes.extend_from_slice(b"payload");
        let mut cursor = Cursor::new(bytes);

        let header = read_log_header(&mut cursor, true, None)
            .expect("read")
            .expect("header");
        assert_eq!(header.header_size, 64);
        assert_eq!(header.last_committed_tx_id, 40);
        assert_eq!(cursor.position(), 64);
    }
}
