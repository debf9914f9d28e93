//! Scan value types and their byte-level codecs

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Primitive type a scan interprets memory as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ValueType {
    /// All supported value types in display order
    pub const ALL: [ValueType; 10] = [
        ValueType::I8,
        ValueType::I16,
        ValueType::I32,
        ValueType::I64,
        ValueType::U8,
        ValueType::U16,
        ValueType::U32,
        ValueType::U64,
        ValueType::F32,
        ValueType::F64,
    ];

    /// Returns the width in bytes for this value type
    pub const fn size(&self) -> usize {
        match self {
            ValueType::I8 | ValueType::U8 => 1,
            ValueType::I16 | ValueType::U16 => 2,
            ValueType::I32 | ValueType::U32 | ValueType::F32 => 4,
            ValueType::I64 | ValueType::U64 | ValueType::F64 => 8,
        }
    }

    /// Checks if this is a floating point type
    pub const fn is_float(&self) -> bool {
        matches!(self, ValueType::F32 | ValueType::F64)
    }

    /// Human readable name used in listings
    pub const fn name(&self) -> &'static str {
        match self {
            ValueType::I8 => "Int8",
            ValueType::I16 => "Int16",
            ValueType::I32 => "Int32",
            ValueType::I64 => "Int64",
            ValueType::U8 => "UInt8",
            ValueType::U16 => "UInt16",
            ValueType::U32 => "UInt32",
            ValueType::U64 => "UInt64",
            ValueType::F32 => "Float",
            ValueType::F64 => "Double",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let value_type = match lower.as_str() {
            "int8" | "i8" => ValueType::I8,
            "int16" | "i16" => ValueType::I16,
            "int32" | "i32" => ValueType::I32,
            "int64" | "i64" => ValueType::I64,
            "uint8" | "u8" => ValueType::U8,
            "uint16" | "u16" => ValueType::U16,
            "uint32" | "u32" => ValueType::U32,
            "uint64" | "u64" => ValueType::U64,
            "float" | "f32" => ValueType::F32,
            "double" | "f64" => ValueType::F64,
            _ => return Err(MemoryError::InvalidValueType(s.to_string())),
        };
        Ok(value_type)
    }
}

/// A typed value read from or written to memory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ScanValue {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

/// Parses an integer either as decimal or as `0x` hex.
///
/// Hex text is read as the unsigned type of the same width and reinterpreted,
/// so `0xFF` is a valid `i8` meaning -1.
macro_rules! parse_int {
    ($text:expr, $signed:ty, $unsigned:ty) => {{
        let text: &str = $text;
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => <$unsigned>::from_str_radix(hex, 16)
                .ok()
                .map(|v| v as $signed),
            None => text.parse::<$signed>().ok(),
        }
    }};
}

impl ScanValue {
    /// Gets the value type for this value
    pub const fn value_type(&self) -> ValueType {
        match self {
            ScanValue::I8(_) => ValueType::I8,
            ScanValue::I16(_) => ValueType::I16,
            ScanValue::I32(_) => ValueType::I32,
            ScanValue::I64(_) => ValueType::I64,
            ScanValue::U8(_) => ValueType::U8,
            ScanValue::U16(_) => ValueType::U16,
            ScanValue::U32(_) => ValueType::U32,
            ScanValue::U64(_) => ValueType::U64,
            ScanValue::F32(_) => ValueType::F32,
            ScanValue::F64(_) => ValueType::F64,
        }
    }

    /// Returns the size in bytes of the value
    pub const fn size(&self) -> usize {
        self.value_type().size()
    }

    /// Converts the value to little-endian bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ScanValue::I8(v) => v.to_le_bytes().to_vec(),
            ScanValue::I16(v) => v.to_le_bytes().to_vec(),
            ScanValue::I32(v) => v.to_le_bytes().to_vec(),
            ScanValue::I64(v) => v.to_le_bytes().to_vec(),
            ScanValue::U8(v) => v.to_le_bytes().to_vec(),
            ScanValue::U16(v) => v.to_le_bytes().to_vec(),
            ScanValue::U32(v) => v.to_le_bytes().to_vec(),
            ScanValue::U64(v) => v.to_le_bytes().to_vec(),
            ScanValue::F32(v) => v.to_le_bytes().to_vec(),
            ScanValue::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Decodes a value from the leading bytes of `bytes`
    pub fn from_bytes(bytes: &[u8], value_type: ValueType) -> Option<Self> {
        let head = bytes.get(..value_type.size())?;
        let value = match value_type {
            ValueType::I8 => ScanValue::I8(head[0] as i8),
            ValueType::U8 => ScanValue::U8(head[0]),
            ValueType::I16 => ScanValue::I16(i16::from_le_bytes(head.try_into().ok()?)),
            ValueType::U16 => ScanValue::U16(u16::from_le_bytes(head.try_into().ok()?)),
            ValueType::I32 => ScanValue::I32(i32::from_le_bytes(head.try_into().ok()?)),
            ValueType::U32 => ScanValue::U32(u32::from_le_bytes(head.try_into().ok()?)),
            ValueType::I64 => ScanValue::I64(i64::from_le_bytes(head.try_into().ok()?)),
            ValueType::U64 => ScanValue::U64(u64::from_le_bytes(head.try_into().ok()?)),
            ValueType::F32 => ScanValue::F32(f32::from_le_bytes(head.try_into().ok()?)),
            ValueType::F64 => ScanValue::F64(f64::from_le_bytes(head.try_into().ok()?)),
        };
        Some(value)
    }

    /// Parses user text as a value of the given type
    pub fn parse(text: &str, value_type: ValueType) -> MemoryResult<Self> {
        let text = text.trim();
        let value = match value_type {
            ValueType::I8 => parse_int!(text, i8, u8).map(ScanValue::I8),
            ValueType::I16 => parse_int!(text, i16, u16).map(ScanValue::I16),
            ValueType::I32 => parse_int!(text, i32, u32).map(ScanValue::I32),
            ValueType::I64 => parse_int!(text, i64, u64).map(ScanValue::I64),
            ValueType::U8 => parse_int!(text, u8, u8).map(ScanValue::U8),
            ValueType::U16 => parse_int!(text, u16, u16).map(ScanValue::U16),
            ValueType::U32 => parse_int!(text, u32, u32).map(ScanValue::U32),
            ValueType::U64 => parse_int!(text, u64, u64).map(ScanValue::U64),
            ValueType::F32 => text.parse::<f32>().ok().map(ScanValue::F32),
            ValueType::F64 => text.parse::<f64>().ok().map(ScanValue::F64),
        };

        value.ok_or_else(|| MemoryError::InvalidValue(format!("'{}' is not a valid {}", text, value_type)))
    }

    /// Formats integers as `0x`-prefixed hex of their unsigned bit pattern
    pub fn to_hex_string(&self) -> String {
        match *self {
            ScanValue::I8(v) => format!("0x{:X}", v as u8),
            ScanValue::I16(v) => format!("0x{:X}", v as u16),
            ScanValue::I32(v) => format!("0x{:X}", v as u32),
            ScanValue::I64(v) => format!("0x{:X}", v as u64),
            ScanValue::U8(v) => format!("0x{:X}", v),
            ScanValue::U16(v) => format!("0x{:X}", v),
            ScanValue::U32(v) => format!("0x{:X}", v),
            ScanValue::U64(v) => format!("0x{:X}", v),
            ScanValue::F32(_) | ScanValue::F64(_) => self.to_string(),
        }
    }
}

impl PartialOrd for ScanValue {
    /// Values of different types are unordered
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (ScanValue::I8(a), ScanValue::I8(b)) => a.partial_cmp(b),
            (ScanValue::I16(a), ScanValue::I16(b)) => a.partial_cmp(b),
            (ScanValue::I32(a), ScanValue::I32(b)) => a.partial_cmp(b),
            (ScanValue::I64(a), ScanValue::I64(b)) => a.partial_cmp(b),
            (ScanValue::U8(a), ScanValue::U8(b)) => a.partial_cmp(b),
            (ScanValue::U16(a), ScanValue::U16(b)) => a.partial_cmp(b),
            (ScanValue::U32(a), ScanValue::U32(b)) => a.partial_cmp(b),
            (ScanValue::U64(a), ScanValue::U64(b)) => a.partial_cmp(b),
            (ScanValue::F32(a), ScanValue::F32(b)) => a.partial_cmp(b),
            (ScanValue::F64(a), ScanValue::F64(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for ScanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanValue::I8(v) => write!(f, "{}", v),
            ScanValue::I16(v) => write!(f, "{}", v),
            ScanValue::I32(v) => write!(f, "{}", v),
            ScanValue::I64(v) => write!(f, "{}", v),
            ScanValue::U8(v) => write!(f, "{}", v),
            ScanValue::U16(v) => write!(f, "{}", v),
            ScanValue::U32(v) => write!(f, "{}", v),
            ScanValue::U64(v) => write!(f, "{}", v),
            ScanValue::F32(v) => write!(f, "{}", v),
            ScanValue::F64(v) => write!(f, "{}", v),
        }
    }
}
