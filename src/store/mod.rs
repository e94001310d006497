//! Store Module
//!
//! The live store handle and the rewrite protocol behind every mutation.
//!
//! ## Responsibilities
//! - Own the open file of the active store version
//! - Serve lookups and enumeration through the scan engine
//! - Build each new version in a swap file next to the store
//! - Install it with fsync + atomic rename, never in place
//!
//! ## Rewrite Protocol
//! ```text
//!   live store ──scan──▶ filter / append ──▶ .secure.data.XXXX.swap
//!                                                   │ fsync
//!                                                   ▼
//!   live store ◀──────────── rename ───────────────┘
//! ```
//! A failure before the rename leaves the live store untouched and removes
//! the swap file.

mod handle;
mod rewrite;

pub use handle::Store;
pub use rewrite::Rewrite;

/// Which occurrences of a key `Store::delete` removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRange {
    /// Every occurrence
    All,

    /// Occurrence `k` and every later one; the first `k` survive.
    /// `From(0)` has the same effect as `All`.
    From(usize),
}

impl DeleteRange {
    /// Convert a raw occurrence index where `-1` means "all occurrences"
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            -1 => Some(Self::All),
            i if i >= 0 => Some(Self::From(i as usize)),
            _ => None,
        }
    }

    /// Whether a match is dropped, given how many earlier matches were kept
    pub(crate) fn covers(&self, kept: usize) -> bool {
        match *self {
            Self::All => true,
            Self::From(k) => kept >= k,
        }
    }
}
