use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use super::DataType;
use crate::common::{DbError, Result};

/// Represents a typed value that can be stored in a tuple.
/// Each variant corresponds to a DataType and holds the actual data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Boolean value
    Boolean(bool),

    /// 32-bit signed integer
    Integer(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// String value stored in a Char column
    String(String),
}

impl Value {
    /// Returns true if this value can be written into a column of `data_type`.
    pub fn matches_type(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Boolean(_), DataType::Boolean)
            | (Value::Integer(_), DataType::Integer)
            | (Value::BigInt(_), DataType::BigInt)
            | (Value::Integer(_), DataType::BigInt) => true,
            (Value::String(s), DataType::Char(n)) => s.len() <= *n as usize,
            _ => false,
        }
    }

    /// Writes exactly `data_type.size()` bytes into `buf`.
    pub fn serialize<B: BufMut>(&self, data_type: &DataType, buf: &mut B) -> Result<()> {
        match (self, data_type) {
            (Value::Boolean(b), DataType::Boolean) => buf.put_u8(u8::from(*b)),
            (Value::Integer(v), DataType::Integer) => buf.put_i32_le(*v),
            (Value::BigInt(v), DataType::BigInt) => buf.put_i64_le(*v),
            (Value::Integer(v), DataType::BigInt) => buf.put_i64_le(i64::from(*v)),
            (Value::String(s), DataType::Char(n)) => {
                let max = *n as usize;
                let bytes = s.as_bytes();
                if bytes.len() > max {
                    return Err(DbError::ValueTooLong {
                        len: bytes.len(),
                        max,
                    });
                }
                buf.put_u32_le(bytes.len() as u32);
                buf.put_slice(bytes);
                buf.put_bytes(0, max - bytes.len());
            }
            (value, dt) => {
                return Err(DbError::SchemaMismatch(format!(
                    "cannot store {} in a {} column",
                    value, dt
                )))
            }
        }
        Ok(())
    }

    /// Reads one value of `data_type` from the front of `buf`.
    pub fn deserialize<B: Buf>(buf: &mut B, data_type: &DataType) -> Result<Self> {
        let size = data_type.size();
        if buf.remaining() < size {
            return Err(DbError::SchemaMismatch(format!(
                "{} needs {} bytes, {} remain",
                data_type,
                size,
                buf.remaining()
            )));
        }

        let value = match data_type {
            DataType::Boolean => Value::Boolean(buf.get_u8() != 0),
            DataType::Integer => Value::Integer(buf.get_i32_le()),
            DataType::BigInt => Value::BigInt(buf.get_i64_le()),
            DataType::Char(n) => {
                let max = *n as usize;
                let len = (buf.get_u32_le() as usize).min(max);
                let mut raw = vec![0u8; max];
                buf.copy_to_slice(&mut raw);
                raw.truncate(len);
                Value::String(String::from_utf8_lossy(&raw).into_owned())
            }
        };
        Ok(value)
    }

    /// Compares two values for ordering.
    /// Returns None if the values are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),

            (Value::Integer(a), Value::BigInt(b)) => Some(i64::from(*a).cmp(b)),
            (Value::BigInt(a), Value::Integer(b)) => Some(a.cmp(&i64::from(*b))),

            _ => None,
        }
    }

    /// Returns the integer payload widened to i64, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
