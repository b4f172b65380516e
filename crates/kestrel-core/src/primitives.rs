//! # Kernel Primitives
//!
//! Hardcoded constants for the Kestrel kernel.
//!
//! The log header sizes below are part of the on-disk format. Files written
//! by older releases are read back with these exact values, so they must
//! never change for an existing format version.

// =============================================================================
// LOG HEADER LAYOUT
// =============================================================================

/// Size of the leading version word of every log header.
pub const LOG_HEADER_VERSION_SIZE: usize = 8;

/// Number of low bits of the version word that hold the log version.
///
/// The format version occupies the byte above them.
pub const LOG_VERSION_BITS: u32 = 56;

/// Mask selecting the log version from the version word.
pub const LOG_VERSION_MASK: u64 = (1 << LOG_VERSION_BITS) - 1;

/// Format tag of the compact legacy header.
pub const LOG_FORMAT_COMPACT: u8 = 6;

/// Format tag of the extended legacy header.
pub const LOG_FORMAT_EXTENDED: u8 = 7;

/// Format tag of the current header, the only one carrying a store id.
pub const LOG_FORMAT_STORE_BOUND: u8 = 8;

/// Size of the serialized store id blob in the current header.
pub const STORE_ID_SIZE: usize = 64;

/// Total size of a compact header: version word + previous committed tx id.
pub const LOG_HEADER_SIZE_COMPACT: usize = LOG_HEADER_VERSION_SIZE + 8;

/// Total size of an extended header: version word + previous committed tx id
/// + five legacy fields + one reserved field.
pub const LOG_HEADER_SIZE_EXTENDED: usize = LOG_HEADER_VERSION_SIZE + 8 * 7;

/// Number of reserved 8-byte fields trailing the current header.
pub const STORE_BOUND_RESERVED_FIELDS: usize = 6;

/// Total size of a current header: version word + previous committed tx id
/// + store id + reserved fields.
pub const LOG_HEADER_SIZE_STORE_BOUND: usize =
    LOG_HEADER_VERSION_SIZE + 8 + STORE_ID_SIZE + 8 * STORE_BOUND_RESERVED_FIELDS;

/// Largest header of any supported format; sizes the read buffer.
pub const MAX_LOG_HEADER_SIZE: usize = LOG_HEADER_SIZE_STORE_BOUND;

/// Version byte leading the serialized store id.
pub const STORE_ID_SERIALIZATION_VERSION: u8 = 1;

// =============================================================================
// LOG FILES
// =============================================================================

/// Default file name prefix of transaction log segments.
pub const DEFAULT_LOG_FILE_PREFIX: &str = "txlog";

// =============================================================================
// LOCKING
// =============================================================================

/// Default time a transaction waits for an exclusive entity lock.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes_match_on_disk_format() {
        assert_eq!(LOG_HEADER_SIZE_COMPACT, 16);
        assert_eq!(LOG_HEADER_SIZE_EXTENDED, 64);
        assert_eq!(LOG_HEADER_SIZE_STORE_BOUND, 128);
        assert_eq!(MAX_LOG_HEADER_SIZE, 128);
    }

    #[test]
    fn version_mask_covers_low_bits() {
        assert_eq!(LOG_VERSION_MASK, 0x00FF_FFFF_FFFF_FFFF);
    }
}
