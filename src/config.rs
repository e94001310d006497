//! Configuration for settingskv
//!
//! Centralized configuration with sensible defaults.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that disambiguates several simulated nodes on one host
pub const PORT_OFFSET_ENV: &str = "PORT_OFFSET";

/// Default chunk size for payload relocation during rewrites
pub const DEFAULT_COPY_CHUNK_SIZE: usize = 512;

/// Main configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the live store file. Swap files are created next to it.
    pub store_path: PathBuf,

    /// Create the containing directory on open if it is missing
    pub create_dirs: bool,

    // -------------------------------------------------------------------------
    // Rewrite Configuration
    // -------------------------------------------------------------------------
    /// What `set` (and, in legacy mode, `add`) does with the rest of the store
    pub set_mode: SetMode,

    /// Scratch buffer size used when copying payloads into a swap file
    pub copy_chunk_size: usize,
}

/// Behavior of `Store::set`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetMode {
    /// Drop every occurrence of the key, keep all other records, append the new one
    #[default]
    Merge,

    /// Drop every occurrence of the key, then install a store holding only the
    /// new record. Every other key is discarded too (legacy behavior).
    /// `Store::add` follows the same path in this mode.
    ReplaceStore,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./settings/secure_0.data"),
            create_dirs: true,
            set_mode: SetMode::Merge,
            copy_chunk_size: DEFAULT_COPY_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Config for the store of the node identified by `node_id`.
    ///
    /// The offset is taken from `PORT_OFFSET` when set.
    pub fn for_device(dir: impl AsRef<Path>, node_id: u64) -> Self {
        let offset = port_offset_from_env();
        Self::builder()
            .store_path(device_store_path(dir, node_id, offset.as_deref()))
            .build()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the store file path
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    /// Create (or not) the containing directory on open
    pub fn create_dirs(mut self, create: bool) -> Self {
        self.config.create_dirs = create;
        self
    }

    /// Set the `set` behavior
    pub fn set_mode(mut self, mode: SetMode) -> Self {
        self.config.set_mode = mode;
        self
    }

    /// Set the payload copy chunk size (in bytes, at least 1)
    pub fn copy_chunk_size(mut self, size: usize) -> Self {
        self.config.copy_chunk_size = size.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Device Path Resolution
// =============================================================================

/// Path of a node's store: `{dir}/secure_{offset}_{node_id:x}.data`
///
/// `offset` defaults to `"0"`.
pub fn device_store_path(dir: impl AsRef<Path>, node_id: u64, offset: Option<&str>) -> PathBuf {
    let offset = offset.unwrap_or("0");
    dir.as_ref()
        .join(format!("secure_{}_{:x}.data", offset, node_id))
}

/// Read the instance offset from the process environment
pub fn port_offset_from_env() -> Option<String> {
    env::var(PORT_OFFSET_ENV).ok().filter(|s| !s.is_empty())
}
