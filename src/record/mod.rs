//! Record Module
//!
//! The on-disk unit of a store: a fixed header followed by the value bytes.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌──────────┬────────────┬─────────────┐ │
//! │ │ Key (2)  │ Length (2) │ Value       │ │
//! │ └──────────┴────────────┴─────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │ ┌──────────┬────────────┬─────────────┐ │
//! │ │ Key (2)  │ Length (2) │ Value       │ │
//! │ └──────────┴────────────┴─────────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Header fields are native byte order. There is no file header, footer,
//! checksum or padding; a store is just the concatenation of its records.

mod codec;

pub use codec::{decode, encode, write_header};

use crate::error::{Result, SettingsError};

/// Header size: Key (2) + Length (2) = 4 bytes
pub const HEADER_SIZE: usize = 4;

/// Largest value the 16-bit length field can describe
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

/// Decoded record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record key
    pub key: u16,
    /// Number of value bytes following the header
    pub length: u16,
}

impl RecordHeader {
    /// Header for a value of `value_len` bytes
    pub fn new(key: u16, value_len: usize) -> Result<Self> {
        let length = u16::try_from(value_len)
            .map_err(|_| SettingsError::ValueTooLarge { len: value_len })?;
        Ok(Self { key, length })
    }

    /// Total on-disk size of the record (header + value)
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + u64::from(self.length)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..2].copy_from_slice(&self.key.to_ne_bytes());
        bytes[2..4].copy_from_slice(&self.length.to_ne_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            key: u16::from_ne_bytes([bytes[0], bytes[1]]),
            length: u16::from_ne_bytes([bytes[2], bytes[3]]),
        }
    }
}
