//! Big-endian fixed-width encoding helpers shared by all on-disk formats.

use crate::types::error::{DatabaseError, Result};

pub fn put_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u64(buffer: &mut Vec<u8>, value: u64) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

pub fn put_f32(buffer: &mut Vec<u8>, value: f32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

pub fn put_f64(buffer: &mut Vec<u8>, value: f64) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

pub fn get_u32(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = take(data, offset, 4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn get_u64(data: &[u8], offset: usize) -> Result<u64> {
    let bytes = take(data, offset, 8)?;
    Ok(u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

pub fn get_f32(data: &[u8], offset: usize) -> Result<f32> {
    let bytes = take(data, offset, 4)?;
    Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn get_f64(data: &[u8], offset: usize) -> Result<f64> {
    let bytes = take(data, offset, 8)?;
    Ok(f64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

fn take(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    data.get(offset..offset + len)
        .ok_or_else(|| DatabaseError::SerializationError {
            details: format!(
                "expected {} bytes at offset {}, got {}",
                len,
                offset,
                data.len().saturating_sub(offset)
            ),
        })
}
