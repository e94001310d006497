//! # settingskv
//!
//! A small persistent key/value record store for device settings and key
//! material, with:
//! - Multiple ordered values per 16-bit key
//! - Crash-safe updates: every mutation builds a new version and installs
//!   it by fsync + atomic rename
//! - A trivial on-disk format: `[key u16][len u16][value]` repeated
//!
//! Values are stored as given; confidentiality is the caller's business.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Store Handle                          │
//! │          get / add / set / delete / wipe / close             │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ reads                        │ mutations
//!                │                              ▼
//!                │                     ┌─────────────────┐
//!                │                     │    Rewriter     │
//!                │                     │ swap + rename   │
//!                │                     └────────┬────────┘
//!                ▼                              │
//!         ┌─────────────┐                       │
//!         │ Scan Engine │◀──────────────────────┘
//!         └──────┬──────┘
//!                ▼
//!         ┌─────────────┐
//!         │   Record    │
//!         │   Codec     │
//!         └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use settingskv::{DeleteRange, Store};
//!
//! # fn main() -> settingskv::Result<()> {
//! let store = Store::open_path("/var/lib/node/secure_0_1.data")?;
//! store.add(0x0001, b"AB")?;
//! store.add(0x0001, b"CD")?;
//! assert_eq!(store.get(0x0001, 1)?, b"CD");
//!
//! store.delete(0x0001, DeleteRange::From(1))?;
//! assert!(store.get(0x0001, 1).unwrap_err().is_not_found());
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod scan;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SettingsError, Result};
pub use config::{Config, SetMode};
pub use scan::{RecordInfo, ScanReport};
pub use store::{DeleteRange, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of settingskv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
