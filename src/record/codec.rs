//! Record codec
//!
//! Encoding and decoding of single records at a stream cursor.

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, SettingsError};

use super::{RecordHeader, HEADER_SIZE};

/// Encode a record: header(key, len) || value
///
/// Fails with `ValueTooLarge` when the value does not fit the length field.
pub fn encode(key: u16, value: &[u8]) -> Result<Bytes> {
    let header = RecordHeader::new(key, value.len())?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + value.len());
    buf.put_u16_ne(header.key);
    buf.put_u16_ne(header.length);
    buf.put_slice(value);

    Ok(buf.freeze())
}

/// Decode one header from the reader, consuming exactly 4 bytes.
///
/// Fewer than 4 available bytes is `ShortRead`; the cursor is then
/// wherever the partial read left it.
pub fn decode<R: Read>(reader: &mut R) -> Result<RecordHeader> {
    let mut bytes = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut bytes) {
        Ok(()) => Ok(RecordHeader::from_bytes(bytes)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(SettingsError::ShortRead),
        Err(e) => Err(SettingsError::Io(e)),
    }
}

/// Write a header to the writer
pub fn write_header<W: Write>(writer: &mut W, header: &RecordHeader) -> io::Result<()> {
    writer.write_all(&header.to_bytes())
}
