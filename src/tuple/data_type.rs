use std::fmt;

/// Bytes used by the length prefix of a `Char` column.
pub const CHAR_LENGTH_PREFIX: usize = 4;

/// Represents the data types supported by the storage engine.
/// Every type has a fixed on-page width so that all tuples of a schema
/// occupy the same number of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type: 1 byte (0 = false, 1 = true)
    Boolean,

    /// 32-bit signed integer: 4 bytes, little-endian
    Integer,

    /// 64-bit signed integer: 8 bytes, little-endian
    BigInt,

    /// Character string of at most n bytes.
    /// Stored as: length (4 bytes) + data zero-padded to n bytes
    Char(u16),
}

impl DataType {
    /// Returns the number of bytes a value of this type occupies on a page.
    pub fn size(&self) -> usize {
        match self {
            DataType::Boolean => 1,
            DataType::Integer => 4,
            DataType::BigInt => 8,
            DataType::Char(n) => CHAR_LENGTH_PREFIX + *n as usize,
        }
    }

    /// Returns true for the integer types that support arithmetic aggregates.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::BigInt)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Char(n) => write!(f, "CHAR({})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_calculations() {
        assert_eq!(DataType::Boolean.size(), 1);
        assert_eq!(DataType::Integer.size(), 4);
        assert_eq!(DataType::BigInt.size(), 8);
        assert_eq!(DataType::Char(20).size(), 24);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Integer.to_string(), "INTEGER");
        assert_eq!(DataType::Char(10).to_string(), "CHAR(10)");
    }
}
