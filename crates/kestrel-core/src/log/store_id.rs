//! # Store Id
//!
//! Identity of the store a transaction log belongs to. The current header
//! format embeds it as a fixed 64-byte blob:
//!
//! - 1 byte: serialization version
//! - 8 bytes: creation time (millis since epoch)
//! - 8 bytes: random
//! - 1 byte length + UTF-8: storage engine name
//! - 1 byte length + UTF-8: format family name
//! - 1 byte: major version
//! - 1 byte: minor version
//! - zero padding up to 64 bytes
//!
//! All integers are big-endian.

use crate::primitives::{STORE_ID_SERIALIZATION_VERSION, STORE_ID_SIZE};
use crate::KestrelError;
use bytes::{Buf, BufMut};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// version + creation time + random + two length bytes + major + minor
const FIXED_FIELDS_SIZE: usize = 1 + 8 + 8 + 1 + 1 + 1 + 1;

/// Identity of a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StoreId {
    pub creation_time: u64,
    pub random: u64,
    pub storage_engine: String,
    pub format_family: String,
    pub major_version: u8,
    pub minor_version: u8,
}

impl StoreId {
    /// A store id with explicit creation time and random parts.
    ///
    /// Fails when the names do not fit the fixed-size blob.
    pub fn new(
        creation_time: u64,
        random: u64,
        storage_engine: impl Into<String>,
        format_family: impl Into<String>,
        major_version: u8,
        minor_version: u8,
    ) -> Result<Self, KestrelError> {
        let id = Self {
            creation_time,
            random,
            storage_engine: storage_engine.into(),
            format_family: format_family.into(),
            major_version,
            minor_version,
        };
        id.check_fits()?;
        Ok(id)
    }

    /// A fresh store id stamped with the current time and a random part.
    pub fn generate(
        storage_engine: impl Into<String>,
        format_family: impl Into<String>,
        major_version: u8,
        minor_version: u8,
    ) -> Result<Self, KestrelError> {
        let creation_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let random: u64 = rand::thread_rng().r#gen();
        Self::new(
            creation_time,
            random,
            storage_engine,
            format_family,
            major_version,
            minor_version,
        )
    }

    fn check_fits(&self) -> Result<(), KestrelError> {
        for name in [&self.storage_engine, &self.format_family] {
            if name.len() > usize::from(u8::MAX) {
                return Err(KestrelError::StoreIdError(format!(
                    "name `{name}` is longer than 255 bytes"
                )));
            }
        }
        let size = FIXED_FIELDS_SIZE + self.storage_engine.len() + self.format_family.len();
        if size > STORE_ID_SIZE {
            return Err(KestrelError::StoreIdError(format!(
                "serialized store id needs {size} bytes, only {STORE_ID_SIZE} available"
            )));
        }
        Ok(())
    }

    /// Write exactly `STORE_ID_SIZE` bytes.
    pub fn serialize_fixed(&self, buf: &mut impl BufMut) -> Result<(), KestrelError> {
        self.check_fits()?;
        buf.put_u8(STORE_ID_SERIALIZATION_VERSION);
        buf.put_u64(self.creation_time);
        buf.put_u64(self.random);
        put_name(buf, &self.storage_engine);
        put_name(buf, &self.format_family);
        buf.put_u8(self.major_version);
        buf.put_u8(self.minor_version);
        let used = FIXED_FIELDS_SIZE + self.storage_engine.len() + self.format_family.len();
        buf.put_bytes(0, STORE_ID_SIZE - used);
        Ok(())
    }

    /// Read exactly `STORE_ID_SIZE` bytes.
    pub fn deserialize_fixed(buf: &mut impl Buf) -> Result<Self, KestrelError> {
        if buf.remaining() < STORE_ID_SIZE {
            return Err(KestrelError::StoreIdError(format!(
                "need {STORE_ID_SIZE} bytes, {} available",
                buf.remaining()
            )));
        }
        let mut blob = buf.copy_to_bytes(STORE_ID_SIZE);

        let version = blob.get_u8();
        if version != STORE_ID_SERIALIZATION_VERSION {
            return Err(KestrelError::StoreIdError(format!(
                "unsupported serialization version {version}"
            )));
        }
        let creation_time = blob.get_u64();
        let random = blob.get_u64();
        let storage_engine = get_name(&mut blob)?;
        let format_family = get_name(&mut blob)?;
        if blob.remaining() < 2 {
            return Err(KestrelError::StoreIdError("truncated version fields".to_string()));
        }
        let major_version = blob.get_u8();
        let minor_version = blob.get_u8();

        Ok(Self {
            creation_time,
            random,
            storage_engine,
            format_family,
            major_version,
            minor_version,
        })
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreId{{{}/{} v{}.{}, created {}, random {:#018x}}}",
            self.storage_engine,
            self.format_family,
            self.major_version,
            self.minor_version,
            self.creation_time,
            self.random
        )
    }
}

fn put_name(buf: &mut impl BufMut, name: &str) {
    buf.put_u8(name.len() as u8);
    buf.put_slice(name.as_bytes());
}

fn get_name(buf: &mut impl Buf) -> Result<String, KestrelError> {
    if !buf.has_remaining() {
        return Err(KestrelError::StoreIdError("truncated name length".to_string()));
    }
    let len = usize::from(buf.get_u8());
    if buf.remaining() < len {
        return Err(KestrelError::StoreIdError(format!(
            "name of {len} bytes overruns the store id"
        )));
    }
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec())
        .map_err(|e| KestrelError::StoreIdError(format!("name is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn blob_is_fixed_size_and_round_trips() {
        let id = StoreId::new(1_700_000_000_000, 0xDEAD_BEEF, "record", "aligned", 5, 3).expect("id");
        let mut buf = BytesMut::new();
        id.serialize_fixed(&mut buf).expect("serialize");
        assert_eq!(buf.len(), STORE_ID_SIZE);
        assert_eq!(buf[0], STORE_ID_SERIALIZATION_VERSION);

        let decoded = StoreId::deserialize_fixed(&mut buf.freeze()).expect("deserialize");
        assert_eq!(decoded, id);
    }

    #[test]
    fn oversized_names_are_rejected() {
        let long = "x".repeat(60);
        assert!(matches!(
            StoreId::new(0, 0, long, "f", 1, 0),
            Err(KestrelError::StoreIdError(_))
        ));
    }

    #[test]
    fn zeroed_blob_is_not_a_store_id() {
        let mut zeros = bytes::Bytes::from(vec![0u8; STORE_ID_SIZE]);
        assert!(matches!(
            StoreId::deserialize_fixed(&mut zeros),
            Err(KestrelError::StoreIdError(_))
        ));
    }

    #[test]
    fn generated_ids_carry_names() {
        let id = StoreId::generate("record", "standard", 1, 0).expect("generate");
        assert_eq!(id.storage_engine, "record");
        assert!(id.creation_time > 0);
    }

    #[test]
    fn generated_ids_have_distinct_random_parts() {
        let ids: Vec<StoreId> = (0..16)
            .map(|_| StoreId::generate("record", "standard", 1, 0).expect("generate"))
            .collect();
        let distinct: std::collections::BTreeSet<u64> = ids.iter().map(|id| id.random).collect();
        assert_eq!(distinct.len(), ids.len());
    }
}
