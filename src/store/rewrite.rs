//! Transactional Rewriter
//!
//! Builds a complete new store version in a swap file and installs it over
//! the live store by atomic rename.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, SettingsError};
use crate::record::{self, RecordHeader};
use crate::scan::{RecordInfo, Scanner};

/// A store version under construction.
///
/// The swap file is unique per rewrite and lives in the target's directory,
/// so rename never crosses filesystems. Dropping an uncommitted rewrite
/// removes the swap file.
pub struct Rewrite {
    /// Live store path the swap file replaces on commit
    target: PathBuf,
    /// Path of the swap file (for error reporting)
    swap_path: PathBuf,
    writer: BufWriter<NamedTempFile>,
    records: usize,
    bytes: u64,
}

impl Rewrite {
    /// Create an empty swap file for `target`
    pub fn begin(target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());

        let swap = tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(".swap")
            .tempfile_in(dir)
            .map_err(|source| SettingsError::SwapFile {
                path: dir.to_path_buf(),
                source,
            })?;

        let swap_path = swap.path().to_path_buf();
        debug!(swap = %swap_path.display(), "rewrite started");

        Ok(Self {
            target: target.to_path_buf(),
            swap_path,
            writer: BufWriter::new(swap),
            records: 0,
            bytes: 0,
        })
    }

    /// Append a new record
    pub fn append(&mut self, key: u16, value: &[u8]) -> Result<()> {
        let encoded = record::encode(key, value)?;
        self.writer
            .write_all(&encoded)
            .map_err(|source| SettingsError::SwapFile {
                path: self.swap_path.clone(),
                source,
            })?;

        self.records += 1;
        self.bytes += encoded.len() as u64;
        Ok(())
    }

    /// Copy a record verbatim from the scan in progress
    pub fn copy_record<R: Read + Seek>(
        &mut self,
        scanner: &mut Scanner<'_, R>,
        info: &RecordInfo,
        scratch: &mut [u8],
    ) -> Result<()> {
        let header = RecordHeader {
            key: info.key,
            length: info.length,
        };
        record::write_header(&mut self.writer, &header)?;
        scanner.copy_payload(info, &mut self.writer, scratch)?;

        self.records += 1;
        self.bytes += header.record_len();
        Ok(())
    }

    /// Flush, fsync and rename the swap file over the target.
    ///
    /// Returns the installed file, open for reading and writing.
    pub fn commit(self) -> Result<File> {
        let swap_path = self.swap_path;
        let swap = self
            .writer
            .into_inner()
            .map_err(|e| SettingsError::SwapFile {
                path: swap_path.clone(),
                source: e.into_error(),
            })?;

        // Must reach stable storage before the rename makes it live
        swap.as_file()
            .sync_all()
            .map_err(|source| SettingsError::SwapFile {
                path: swap_path.clone(),
                source,
            })?;

        let file = swap
            .persist(&self.target)
            .map_err(|e| SettingsError::Io(e.error))?;

        // Best effort: the rename itself is not guaranteed durable
        #[cfg(unix)]
        if let Some(parent) = self.target.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        debug!(
            target = %self.target.display(),
            records = self.records,
            bytes = self.bytes,
            "rewrite committed"
        );

        Ok(file)
    }
}
