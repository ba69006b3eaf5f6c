use std::fs::File;
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;

use crate::types::error::{DatabaseError, Result};

/// Writes all of data at the given position of a file.
pub fn write_at(file: &File, data: &[u8], position: u64) -> Result<()> {
    file.write_all_at(data, position)?;
    Ok(())
}

/// Reads exactly buffer.len() bytes at the given position into buffer.
/// Running past the end of the file surfaces as an unexpected-EOF I/O error
/// so callers can tell a fresh region from a real failure.
pub fn read_at(file: &File, buffer: &mut [u8], position: u64) -> Result<()> {
    file.read_exact_at(buffer, position)?;
    Ok(())
}

/// Whether the error marks a read that ran past the end of the file.
pub fn is_unexpected_eof(err: &DatabaseError) -> bool {
    matches!(err, DatabaseError::Io(inner) if inner.kind() == ErrorKind::UnexpectedEof)
}
