//! Error types for settingskv
//!
//! Provides a unified error type for all store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using SettingsError
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Unified error type for settingskv operations
#[derive(Debug, Error)]
pub enum SettingsError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    /// Key (or the requested occurrence of it) is not in the store.
    /// Malformed trailing data also surfaces this way.
    #[error("Key not found")]
    NotFound,

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Value too large: {len} bytes (max 65535)")]
    ValueTooLarge { len: usize },

    #[error("Short read: record header needs 4 bytes")]
    ShortRead,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Unrecoverable Errors
    // -------------------------------------------------------------------------
    #[error("Cannot open store at {}: {source}", .path.display())]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Swap file failure at {}: {source}", .path.display())]
    SwapFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Store is closed")]
    Closed,
}

impl SettingsError {
    /// Whether the store can no longer be relied on.
    ///
    /// The library never aborts; callers escalate these as they see fit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Bootstrap { .. } | Self::SwapFile { .. })
    }

    /// Whether this is the recoverable "not found" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
