use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    types::error::{DatabaseError, Result},
    util::codec,
};

/*
 * Binary encoding of a key:
 *   type tag (u8) | key size (u32) | key bytes
 * Integers are big-endian, floats IEEE-754 big-endian, strings utf-8.
 */

const TAG_STRING: u8 = 1;
const TAG_INT32: u8 = 2;
const TAG_INT64: u8 = 3;
const TAG_FLOAT32: u8 = 4;
const TAG_FLOAT64: u8 = 5;

/// A typed primitive key. Ordering is total within one variant; comparing
/// across variants is an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Key {
    String(String),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

impl Key {
    pub fn type_name(&self) -> &'static str {
        match self {
            Key::String(_) => "string",
            Key::Int32(_) => "int32",
            Key::Int64(_) => "int64",
            Key::Float32(_) => "float32",
            Key::Float64(_) => "float64",
        }
    }

    pub fn type_tag(&self) -> u8 {
        match self {
            Key::String(_) => TAG_STRING,
            Key::Int32(_) => TAG_INT32,
            Key::Int64(_) => TAG_INT64,
            Key::Float32(_) => TAG_FLOAT32,
            Key::Float64(_) => TAG_FLOAT64,
        }
    }

    fn payload_size(&self) -> u32 {
        match self {
            Key::String(s) => s.len() as u32,
            Key::Int32(_) | Key::Float32(_) => 4,
            Key::Int64(_) | Key::Float64(_) => 8,
        }
    }

    /// Serialized size: tag + size field + payload bytes.
    pub fn encoded_size(&self) -> u32 {
        1 + 4 + self.payload_size()
    }

    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.push(self.type_tag());
        codec::put_u32(buffer, self.payload_size());
        match self {
            Key::String(s) => buffer.extend_from_slice(s.as_bytes()),
            Key::Int32(v) => buffer.extend_from_slice(&v.to_be_bytes()),
            Key::Int64(v) => buffer.extend_from_slice(&v.to_be_bytes()),
            Key::Float32(v) => codec::put_f32(buffer, *v),
            Key::Float64(v) => codec::put_f64(buffer, *v),
        }
    }

    /// Decodes a key from the start of data, returning it together with the
    /// number of bytes consumed.
    pub fn read_from(data: &[u8]) -> Result<(Key, usize)> {
        let tag = *data
            .first()
            .ok_or_else(|| DatabaseError::SerializationError {
                details: "empty key bytes".to_string(),
            })?;
        let size = codec::get_u32(data, 1)? as usize;
        let start = 5;
        let bytes = data
            .get(start..start + size)
            .ok_or_else(|| DatabaseError::SerializationError {
                details: format!("key payload of {} bytes is incomplete", size),
            })?;
        let key = match tag {
            TAG_STRING => Key::String(String::from_utf8(bytes.to_vec()).map_err(|e| {
                DatabaseError::SerializationError {
                    details: format!("key is not valid utf-8: {}", e),
                }
            })?),
            TAG_INT32 => {
                expect_size(tag, size, 4)?;
                Key::Int32(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            TAG_INT64 => {
                expect_size(tag, size, 8)?;
                Key::Int64(i64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]))
            }
            TAG_FLOAT32 => {
                expect_size(tag, size, 4)?;
                Key::Float32(codec::get_f32(bytes, 0)?)
            }
            TAG_FLOAT64 => {
                expect_size(tag, size, 8)?;
                Key::Float64(codec::get_f64(bytes, 0)?)
            }
            _ => {
                return Err(DatabaseError::SerializationError {
                    details: format!("unknown key tag: {}", tag),
                });
            }
        };
        Ok((key, start + size))
    }

    /// Compares two keys of the same variant. Floats use their IEEE-754
    /// total order.
    pub fn compare(&self, other: &Key) -> Result<Ordering> {
        match (self, other) {
            (Key::String(a), Key::String(b)) => Ok(a.cmp(b)),
            (Key::Int32(a), Key::Int32(b)) => Ok(a.cmp(b)),
            (Key::Int64(a), Key::Int64(b)) => Ok(a.cmp(b)),
            (Key::Float32(a), Key::Float32(b)) => Ok(a.total_cmp(b)),
            (Key::Float64(a), Key::Float64(b)) => Ok(a.total_cmp(b)),
            (a, b) => Err(DatabaseError::TypeMismatch {
                expected: a.type_name().to_string(),
                actual: b.type_name().to_string(),
            }),
        }
    }
}

fn expect_size(tag: u8, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(DatabaseError::SerializationError {
            details: format!(
                "wrong size for key tag {}: expected {}, got {}",
                tag, expected, actual
            ),
        });
    }
    Ok(())
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::String(s) => write!(f, "{}", s),
            Key::Int32(v) => write!(f, "{}", v),
            Key::Int64(v) => write!(f, "{}", v),
            Key::Float32(v) => write!(f, "{}", v),
            Key::Float64(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::String(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::String(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int32(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int64(value)
    }
}

impl From<f32> for Key {
    fn from(value: f32) -> Self {
        Key::Float32(value)
    }
}

impl From<f64> for Key {
    fn from(value: f64) -> Self {
        Key::Float64(value)
    }
}
