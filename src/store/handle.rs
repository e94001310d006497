//! Store Handle
//!
//! Owns the open file of the active store version and routes every
//! operation through the scan engine or the rewriter.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Config, SetMode};
use crate::error::{Result, SettingsError};
use crate::record::RecordHeader;
use crate::scan::{RecordInfo, ScanReport, Scanner};

use super::{DeleteRange, Rewrite};

/// Handle to one persistent record store
///
/// ## Lifecycle
/// `open` → operations → `close`. After `close` every operation fails with
/// `Closed`; open a new handle to continue.
///
/// ## Concurrency
/// - `file`: Protected by a Mutex; lookups and rewrites are serialized
///   within the process
/// - Nothing arbitrates between processes; callers must not mutate the
///   same store from two processes at once
pub struct Store {
    config: Config,

    /// Open file of the live version, `None` once closed
    file: Mutex<Option<LiveFile>>,
}

/// The open live file and whether its path has been wiped
struct LiveFile {
    file: File,

    /// Set by `wipe`: reads still see the unlinked content, but the next
    /// rewrite starts from an empty store
    wiped: bool,
}

impl LiveFile {
    fn new(file: File) -> Self {
        Self { file, wiped: false }
    }
}

impl Store {
    /// Open or create the store described by `config`
    ///
    /// On startup:
    /// 1. Create the containing directory if allowed and missing
    /// 2. Open (or create, mode 0600) the store file
    /// 3. Scan it once to validate; a malformed tail is logged, not repaired
    pub fn open(config: Config) -> Result<Self> {
        let path = config.store_path.clone();

        if config.create_dirs {
            Self::create_parent_dir(&path)?;
        }

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&path)
            .map_err(|source| SettingsError::Bootstrap {
                path: path.clone(),
                source,
            })?;

        let report = Scanner::new(&mut file)
            .and_then(|scanner| scanner.finish())
            .map_err(|e| bootstrap_error(&path, e))?;
        if !report.is_well_formed() {
            warn!(
                path = %path.display(),
                defect = ?report.defect,
                ignored_bytes = report.ignored_bytes(),
                "store has a malformed tail; trailing bytes are ignored"
            );
        }

        info!(
            path = %path.display(),
            records = report.records,
            bytes = report.valid_len,
            "store opened"
        );

        Ok(Self {
            config,
            file: Mutex::new(Some(LiveFile::new(file))),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified store path
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().store_path(path.as_ref()).build();
        Self::open(config)
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Value of occurrence `index` of `key`
    pub fn get(&self, key: u16, index: usize) -> Result<Vec<u8>> {
        self.locate(key, index, |scanner, info| {
            let mut value = vec![0u8; info.length as usize];
            scanner.read_payload(info, &mut value)?;
            Ok(value)
        })
    }

    /// Copy occurrence `index` of `key` into `buf`.
    ///
    /// Copies `min(length, buf.len())` bytes and returns the true value
    /// length, so a return value larger than `buf.len()` means truncation.
    pub fn get_into(&self, key: u16, index: usize, buf: &mut [u8]) -> Result<usize> {
        self.locate(key, index, |scanner, info| {
            let count = buf.len().min(info.length as usize);
            scanner.read_payload(info, &mut buf[..count])?;
            Ok(info.length as usize)
        })
    }

    /// Length of occurrence `index` of `key`, without reading the value
    pub fn value_len(&self, key: u16, index: usize) -> Result<usize> {
        self.locate(key, index, |_, info| Ok(info.length as usize))
    }

    /// Number of occurrences of `key`
    pub fn count(&self, key: u16) -> Result<usize> {
        self.with_file(|file| {
            let mut count = 0;
            for info in Scanner::new(file)? {
                if info?.key == key {
                    count += 1;
                }
            }
            Ok(count)
        })
    }

    /// All well-formed records, in file order
    pub fn records(&self) -> Result<Vec<RecordInfo>> {
        self.with_file(|file| Scanner::new(file)?.collect())
    }

    /// All well-formed records with their values, in file order
    pub fn entries(&self) -> Result<Vec<(u16, Vec<u8>)>> {
        self.with_file(|file| {
            let mut scanner = Scanner::new(file)?;
            let mut entries = Vec::new();
            while let Some(info) = scanner.next_record()? {
                let mut value = vec![0u8; info.length as usize];
                scanner.read_payload(&info, &mut value)?;
                entries.push((info.key, value));
            }
            Ok(entries)
        })
    }

    /// Scan the whole store and report how much of it is well-formed
    pub fn verify(&self) -> Result<ScanReport> {
        self.with_file(|file| Scanner::new(file)?.finish())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append a record for `key`, keeping any existing occurrences.
    ///
    /// The new record becomes the last occurrence of `key`. With
    /// `SetMode::ReplaceStore` this behaves exactly like `set`.
    pub fn add(&self, key: u16, value: &[u8]) -> Result<()> {
        if self.config.set_mode == SetMode::ReplaceStore {
            return self.set(key, value);
        }

        RecordHeader::new(key, value.len())?;
        debug!(key, len = value.len(), "add");

        let mut guard = self.file.lock();
        let live = guard.as_mut().ok_or(SettingsError::Closed)?;

        let mut rewrite = Rewrite::begin(&self.config.store_path)?;
        self.copy_into(live, &mut rewrite, None)?;
        rewrite.append(key, value)?;

        *guard = Some(LiveFile::new(rewrite.commit()?));
        Ok(())
    }

    /// Replace every occurrence of `key` with a single new record.
    ///
    /// With `SetMode::ReplaceStore` the rest of the store is discarded too.
    pub fn set(&self, key: u16, value: &[u8]) -> Result<()> {
        RecordHeader::new(key, value.len())?;
        debug!(key, len = value.len(), mode = ?self.config.set_mode, "set");

        match self.config.set_mode {
            SetMode::Merge => {
                let mut guard = self.file.lock();
                let live = guard.as_mut().ok_or(SettingsError::Closed)?;

                let mut rewrite = Rewrite::begin(&self.config.store_path)?;
                self.copy_into(live, &mut rewrite, Some((key, DeleteRange::All)))?;
                rewrite.append(key, value)?;

                *guard = Some(LiveFile::new(rewrite.commit()?));
            }
            SetMode::ReplaceStore => {
                match self.delete(key, DeleteRange::All) {
                    Ok(()) | Err(SettingsError::NotFound) => {}
                    Err(e) => return Err(e),
                }

                let mut guard = self.file.lock();
                if guard.is_none() {
                    return Err(SettingsError::Closed);
                }

                // Starts empty: only the new record survives
                let mut rewrite = Rewrite::begin(&self.config.store_path)?;
                rewrite.append(key, value)?;

                *guard = Some(LiveFile::new(rewrite.commit()?));
            }
        }

        Ok(())
    }

    /// Delete occurrences of `key` selected by `range`.
    ///
    /// Fails with `NotFound` (and leaves the store untouched) when no
    /// occurrence is selected.
    pub fn delete(&self, key: u16, range: DeleteRange) -> Result<()> {
        debug!(key, range = ?range, "delete");

        let mut guard = self.file.lock();
        let live = guard.as_mut().ok_or(SettingsError::Closed)?;

        let mut rewrite = Rewrite::begin(&self.config.store_path)?;
        let found = self.copy_into(live, &mut rewrite, Some((key, range)))?;
        if !found {
            // Dropping the rewrite removes the swap file
            return Err(SettingsError::NotFound);
        }

        *guard = Some(LiveFile::new(rewrite.commit()?));
        Ok(())
    }

    /// Unlink the store file from the filesystem.
    ///
    /// The open handle is left alone: reads keep seeing the unlinked
    /// content until the handle is closed or the next rewrite installs a
    /// new file at the path. That rewrite starts from an empty store, so
    /// wiped records never come back.
    pub fn wipe(&self) -> Result<()> {
        let path = &self.config.store_path;
        match fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "store wiped"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(SettingsError::Io(e)),
        }

        if let Some(live) = self.file.lock().as_mut() {
            live.wiped = true;
        }
        Ok(())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Close the handle. Safe to call more than once.
    pub fn close(&self) {
        if self.file.lock().take().is_some() {
            info!(path = %self.config.store_path.display(), "store closed");
        }
    }

    /// Whether the handle is still open
    pub fn is_open(&self) -> bool {
        self.file.lock().is_some()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the live store file
    pub fn path(&self) -> &Path {
        &self.config.store_path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn with_file<T>(&self, f: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
        let mut guard = self.file.lock();
        let live = guard.as_mut().ok_or(SettingsError::Closed)?;
        f(&mut live.file)
    }

    /// Find occurrence `index` of `key` and hand it to `read`
    fn locate<T>(
        &self,
        key: u16,
        index: usize,
        read: impl FnOnce(&mut Scanner<'_, File>, &RecordInfo) -> Result<T>,
    ) -> Result<T> {
        self.with_file(|file| {
            let mut scanner = Scanner::new(file)?;
            let mut skip = index;

            while let Some(info) = scanner.next_record()? {
                if info.key != key {
                    continue;
                }
                if skip > 0 {
                    skip -= 1;
                    continue;
                }
                return read(&mut scanner, &info);
            }

            Err(SettingsError::NotFound)
        })
    }

    /// Copy the live store into `rewrite`, dropping the occurrences of the
    /// key selected by `drop`. Returns whether anything was dropped.
    ///
    /// A wiped store contributes nothing.
    fn copy_into(
        &self,
        live: &mut LiveFile,
        rewrite: &mut Rewrite,
        drop: Option<(u16, DeleteRange)>,
    ) -> Result<bool> {
        if live.wiped {
            return Ok(false);
        }

        let mut scratch = vec![0u8; self.config.copy_chunk_size.max(1)];
        let mut scanner = Scanner::new(&mut live.file)?;
        let mut kept = 0usize;
        let mut found = false;

        while let Some(info) = scanner.next_record()? {
            if let Some((key, range)) = drop {
                if info.key == key {
                    // `kept` stops growing once the range starts, so every
                    // later occurrence is dropped as well
                    if range.covers(kept) {
                        found = true;
                        continue;
                    }
                    kept += 1;
                }
            }
            rewrite.copy_record(&mut scanner, &info, &mut scratch)?;
        }

        if let Some(defect) = scanner.defect() {
            warn!(
                path = %self.config.store_path.display(),
                defect = ?defect,
                "malformed tail left out of rewritten store"
            );
        }

        Ok(found)
    }

    fn create_parent_dir(path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(()),
        };
        if parent.exists() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }

        builder
            .create(parent)
            .map_err(|source| SettingsError::Bootstrap {
                path: parent.to_path_buf(),
                source,
            })
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.config.store_path)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Failures while opening are unrecoverable
fn bootstrap_error(path: &Path, err: SettingsError) -> SettingsError {
    match err {
        SettingsError::Io(source) => SettingsError::Bootstrap {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    }
}
