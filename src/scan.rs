//! Scan Engine
//!
//! Sequential walk over every record in a store, front to back.
//!
//! ## Responsibilities
//! - Yield `(key, length, payload offset)` for each well-formed record
//! - Stop silently at a malformed tail (partial header or length overrun)
//! - Give callers access to the payload of the record just yielded
//!
//! A scan is not restartable: every `Scanner::new` seeks back to offset 0.
//! Occurrence counting is left to callers.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::{Result, SettingsError};
use crate::record::{self, HEADER_SIZE};

/// Location of one record inside a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInfo {
    /// Record key
    pub key: u16,
    /// Value length in bytes
    pub length: u16,
    /// File offset of the first value byte
    pub offset: u64,
}

/// Why a scan stopped before consuming the whole file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailDefect {
    /// Fewer than 4 bytes left for a header
    PartialHeader,
    /// A header claims more value bytes than the file holds
    LengthOverrun,
}

/// Outcome of a full scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Number of well-formed records
    pub records: usize,
    /// Bytes covered by well-formed records
    pub valid_len: u64,
    /// Total file size at scan start
    pub file_len: u64,
    /// Set when trailing bytes were ignored
    pub defect: Option<TailDefect>,
}

impl ScanReport {
    /// True when the records consume the file exactly
    pub fn is_well_formed(&self) -> bool {
        self.defect.is_none() && self.valid_len == self.file_len
    }

    /// Bytes past the last well-formed record
    pub fn ignored_bytes(&self) -> u64 {
        self.file_len - self.valid_len
    }
}

/// Sequential record scanner over a seekable stream
pub struct Scanner<'a, R> {
    reader: &'a mut R,
    /// Stream size captured when the scan started
    size: u64,
    /// Offset of the next header
    next_offset: u64,
    records: usize,
    defect: Option<TailDefect>,
    done: bool,
}

impl<'a, R: Read + Seek> Scanner<'a, R> {
    /// Start a scan at offset 0
    pub fn new(reader: &'a mut R) -> Result<Self> {
        let size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        Ok(Self {
            reader,
            size,
            next_offset: 0,
            records: 0,
            defect: None,
            done: false,
        })
    }

    /// Advance to the next record.
    ///
    /// Returns `Ok(None)` at the end of the store or at the first malformed
    /// byte. Only genuine I/O failures are errors.
    pub fn next_record(&mut self) -> Result<Option<RecordInfo>> {
        if self.done {
            return Ok(None);
        }

        if self.next_offset >= self.size {
            self.done = true;
            return Ok(None);
        }

        // Payload reads between calls move the cursor
        self.reader.seek(SeekFrom::Start(self.next_offset))?;

        let header = match record::decode(self.reader) {
            Ok(header) => header,
            Err(SettingsError::ShortRead) => {
                self.stop(TailDefect::PartialHeader);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let offset = self.next_offset + HEADER_SIZE as u64;
        let end = offset + u64::from(header.length);
        if end > self.size {
            self.stop(TailDefect::LengthOverrun);
            return Ok(None);
        }

        self.next_offset = end;
        self.records += 1;

        Ok(Some(RecordInfo {
            key: header.key,
            length: header.length,
            offset,
        }))
    }

    /// Read the first `buf.len()` value bytes of `info` into `buf`
    pub fn read_payload(&mut self, info: &RecordInfo, buf: &mut [u8]) -> Result<()> {
        debug_assert!(buf.len() <= info.length as usize);
        self.reader.seek(SeekFrom::Start(info.offset))?;
        self.reader.read_exact(buf)?;
        Ok(())
    }

    /// Stream the whole value of `info` into `out`, `scratch.len()` bytes at a time
    pub fn copy_payload<W: Write>(
        &mut self,
        info: &RecordInfo,
        out: &mut W,
        scratch: &mut [u8],
    ) -> Result<()> {
        if scratch.is_empty() {
            return Err(SettingsError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty copy buffer",
            )));
        }

        self.reader.seek(SeekFrom::Start(info.offset))?;

        let mut remaining = info.length as usize;
        while remaining > 0 {
            let count = remaining.min(scratch.len());
            self.reader.read_exact(&mut scratch[..count])?;
            out.write_all(&scratch[..count])?;
            remaining -= count;
        }

        Ok(())
    }

    /// Whether trailing bytes were ignored so far
    pub fn defect(&self) -> Option<TailDefect> {
        self.defect
    }

    /// Consume the rest of the scan and summarize it
    pub fn finish(mut self) -> Result<ScanReport> {
        while self.next_record()?.is_some() {}

        Ok(ScanReport {
            records: self.records,
            valid_len: self.next_offset,
            file_len: self.size,
            defect: self.defect,
        })
    }

    fn stop(&mut self, defect: TailDefect) {
        self.defect = Some(defect);
        self.done = true;
    }
}

impl<'a, R: Read + Seek> Iterator for Scanner<'a, R> {
    type Item = Result<RecordInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
