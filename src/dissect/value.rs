//! Field types and the values they decode to

use crate::core::types::{Address, MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a dissected field is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    UnsignedInt,
    SignedInt,
    HexInt,
    Float,
    Double,
    String,
    Pointer,
    StartEndPointer,
    Dissection,
}

impl FieldType {
    /// Fields of these types own a child window
    pub const fn is_expandable(&self) -> bool {
        matches!(
            self,
            FieldType::Pointer | FieldType::StartEndPointer | FieldType::Dissection
        )
    }

    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::UnsignedInt | FieldType::SignedInt | FieldType::HexInt
        )
    }

    /// Checks whether a field of this type can span `size` bytes
    pub fn accepts_size(&self, size: usize) -> bool {
        match self {
            FieldType::UnsignedInt | FieldType::SignedInt | FieldType::HexInt => {
                matches!(size, 1 | 2 | 4 | 8)
            }
            FieldType::Float => size == 4,
            FieldType::Double | FieldType::Pointer => size == 8,
            FieldType::StartEndPointer => size == 16,
            FieldType::String | FieldType::Dissection => size > 0,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::HexInt => "Hex",
            FieldType::SignedInt => "Signed Dec",
            FieldType::UnsignedInt => "Unsigned Dec",
            FieldType::Pointer => "Pointer",
            FieldType::String => "String",
            FieldType::Float => "Float",
            FieldType::Double => "Double",
            FieldType::StartEndPointer => "Start/End Pointer",
            FieldType::Dissection => "Dissection",
        };
        f.write_str(name)
    }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
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
    Pointer(Address),
    String(String),
    StartEndPointer { start: Address, end: Address },
}

impl FieldValue {
    /// Number of bytes a write of this value covers
    pub fn size(&self) -> usize {
        match self {
            FieldValue::I8(_) | FieldValue::U8(_) => 1,
            FieldValue::I16(_) | FieldValue::U16(_) => 2,
            FieldValue::I32(_) | FieldValue::U32(_) | FieldValue::F32(_) => 4,
            FieldValue::I64(_) | FieldValue::U64(_) | FieldValue::F64(_) | FieldValue::Pointer(_) => 8,
            FieldValue::String(s) => s.len(),
            FieldValue::StartEndPointer { .. } => 16,
        }
    }

    /// Little-endian encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            FieldValue::I8(v) => v.to_le_bytes().to_vec(),
            FieldValue::I16(v) => v.to_le_bytes().to_vec(),
            FieldValue::I32(v) => v.to_le_bytes().to_vec(),
            FieldValue::I64(v) => v.to_le_bytes().to_vec(),
            FieldValue::U8(v) => v.to_le_bytes().to_vec(),
            FieldValue::U16(v) => v.to_le_bytes().to_vec(),
            FieldValue::U32(v) => v.to_le_bytes().to_vec(),
            FieldValue::U64(v) => v.to_le_bytes().to_vec(),
            FieldValue::F32(v) => v.to_le_bytes().to_vec(),
            FieldValue::F64(v) => v.to_le_bytes().to_vec(),
            FieldValue::Pointer(address) => (address.as_usize() as u64).to_le_bytes().to_vec(),
            FieldValue::String(s) => s.as_bytes().to_vec(),
            FieldValue::StartEndPointer { start, end } => {
                let mut bytes = (start.as_usize() as u64).to_le_bytes().to_vec();
                bytes.extend_from_slice(&(end.as_usize() as u64).to_le_bytes());
                bytes
            }
        }
    }

    /// Display text for a value shown as `field_type`
    pub fn format(&self, field_type: FieldType) -> String {
        match self {
            FieldValue::I8(v) => format_integer(field_type, *v as u8 as u64, *v as i64),
            FieldValue::I16(v) => format_integer(field_type, *v as u16 as u64, *v as i64),
            FieldValue::I32(v) => format_integer(field_type, *v as u32 as u64, *v as i64),
            FieldValue::I64(v) => format_integer(field_type, *v as u64, *v),
            FieldValue::U8(v) => format_integer(field_type, *v as u64, *v as i8 as i64),
            FieldValue::U16(v) => format_integer(field_type, *v as u64, *v as i16 as i64),
            FieldValue::U32(v) => format_integer(field_type, *v as u64, *v as i32 as i64),
            FieldValue::U64(v) => format_integer(field_type, *v, *v as i64),
            FieldValue::F32(v) => v.to_string(),
            FieldValue::F64(v) => v.to_string(),
            FieldValue::Pointer(address) => format!("0x{:X}", address),
            FieldValue::StartEndPointer { start, end } => format!("[0x{:X} - 0x{:X}]", start, end),
            FieldValue::String(s) => escape(s),
        }
    }
}

fn format_integer(field_type: FieldType, unsigned: u64, signed: i64) -> String {
    match field_type {
        FieldType::SignedInt => signed.to_string(),
        FieldType::UnsignedInt => unsigned.to_string(),
        _ => format!("0x{:X}", unsigned),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for byte in text.bytes() {
        match byte {
            b'\n' => escaped.push_str("\\n"),
            b'\r' => escaped.push_str("\\r"),
            b'\t' => escaped.push_str("\\t"),
            b'\\' => escaped.push_str("\\\\"),
            b'"' => escaped.push_str("\\\""),
            32..=126 => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\x{:02X}", byte)),
        }
    }
    escaped
}

fn parse_unsigned(text: &str, radix: u32) -> MemoryResult<u64> {
    u64::from_str_radix(text, radix)
        .map_err(|e| MemoryError::InvalidValue(format!("'{}': {}", text, e)))
}

fn parse_signed(text: &str) -> MemoryResult<i64> {
    text.parse::<i64>()
        .map_err(|e| MemoryError::InvalidValue(format!("'{}': {}", text, e)))
}

fn strip_hex(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

fn out_of_range(text: &str, size: usize) -> MemoryError {
    MemoryError::InvalidValue(format!("'{}' does not fit in {} bytes", text, size))
}

/// Parses edited text into a value for a field of `field_type` and `size`.
///
/// Integer fields take decimal or `0x` hex and reject values wider than the
/// field. Hex text for a signed field is the raw bit pattern. Hex and pointer
/// fields are always read as hex. Start/end pointers take `start - end` with
/// optional brackets.

pub fn parse_field_value(text: &str, field_type: FieldType, size: usize) -> MemoryResult<FieldValue> {
    if field_type == FieldType::String {
        return Ok(FieldValue::String(text.to_string()));
    }

    let text = text.trim();
    let (digits, radix) = match strip_hex(text) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };

    let unsupported = || MemoryError::invalid_field_size(field_type, size);

    let value = match field_type {
        // Hex text gives the raw bit pattern of the slot
        FieldType::SignedInt if radix == 16 => {
            let v = parse_unsigned(digits, 16)?;
            match size {
                1 => FieldValue::I8(u8::try_from(v).map_err(|_| out_of_range(text, size))? as i8),
                2 => FieldValue::I16(u16::try_from(v).map_err(|_| out_of_range(text, size))? as i16),
                4 => FieldValue::I32(u32::try_from(v).map_err(|_| out_of_range(text, size))? as i32),
                8 => FieldValue::I64(v as i64),
                _ => return Err(unsupported()),
            }
        }
        FieldType::SignedInt => {
            let v = parse_signed(digits)?;
            match size {
                1 => FieldValue::I8(i8::try_from(v).map_err(|_| out_of_range(text, size))?),
                2 => FieldValue::I16(i16::try_from(v).map_err(|_| out_of_range(text, size))?),
                4 => FieldValue::I32(i32::try_from(v).map_err(|_| out_of_range(text, size))?),
                8 => FieldValue::I64(v),
                _ => return Err(unsupported()),
            }
        }
        FieldType::UnsignedInt | FieldType::HexInt => {
            let radix = if field_type == FieldType::HexInt { 16 } else { radix };
            let v = parse_unsigned(digits, radix)?;
            match size {
                1 => FieldValue::U8(u8::try_from(v).map_err(|_| out_of_range(text, size))?),
                2 => FieldValue::U16(u16::try_from(v).map_err(|_| out_of_range(text, size))?),
                4 => FieldValue::U32(u32::try_from(v).map_err(|_| out_of_range(text, size))?),
                8 => FieldValue::U64(v),
                _ => return Err(unsupported()),
            }
        }
        FieldType::Float => FieldValue::F32(
            text.parse()
                .map_err(|_| MemoryError::InvalidValue(format!("'{}' is not a float", text)))?,
        ),
        FieldType::Double => FieldValue::F64(
            text.parse()
                .map_err(|_| MemoryError::InvalidValue(format!("'{}' is not a double", text)))?,
        ),
        FieldType::Pointer => FieldValue::Pointer(Address::new(parse_unsigned(digits, 16)? as usize)),
        FieldType::StartEndPointer => {
            let inner = text.trim_start_matches('[').trim_end_matches(']');
            let (start, end) = inner
                .split_once('-')
                .ok_or_else(|| MemoryError::InvalidValue(format!("'{}' is not a start - end pair", text)))?;
            let parse_bound = |bound: &str| -> MemoryResult<Address> {
                let bound = bound.trim();
                let digits = strip_hex(bound).unwrap_or(bound);
                Ok(Address::new(parse_unsigned(digits, 16)? as usize))
            };
            FieldValue::StartEndPointer {
                start: parse_bound(start)?,
                end: parse_bound(end)?,
            }
        }
        FieldType::Dissection => {
            return Err(MemoryError::UnsupportedOperation(
                "dissection fields have no value".to_string(),
            ))
        }
        FieldType::String => FieldValue::String(text.to_string()),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_integers() {
        assert_eq!(FieldValue::U32(0xFFFF_FFFF).format(FieldType::SignedInt), "-1");
        assert_eq!(FieldValue::I8(-1).format(FieldType::UnsignedInt), "255");
        assert_eq!(FieldValue::U16(0xBEEF).format(FieldType::HexInt), "0xBEEF");
        assert_eq!(FieldValue::I32(-2).format(FieldType::HexInt), "0xFFFFFFFE");
    }

    #[test]
    fn test_format_other_values() {
        assert_eq!(FieldValue::Pointer(Address::new(0x1000)).format(FieldType::Pointer), "0x1000");
        assert_eq!(
            FieldValue::StartEndPointer { start: Address::new(0x10), end: Address::new(0x20) }
                .format(FieldType::StartEndPointer),
            "[0x10 - 0x20]"
        );
        assert_eq!(
            FieldValue::String("a\"b\n\u{1}".to_string()).format(FieldType::String),
            "a\\\"b\\n\\x01"
        );
        assert_eq!(FieldValue::F64(1.5).format(FieldType::Double), "1.5");
    }

    #[test]
    fn test_parse_integers() {
        assert_eq!(parse_field_value("-5", FieldType::SignedInt, 2).unwrap(), FieldValue::I16(-5));
        assert_eq!(parse_field_value("0x10", FieldType::SignedInt, 4).unwrap(), FieldValue::I32(16));
        assert_eq!(parse_field_value("300", FieldType::UnsignedInt, 8).unwrap(), FieldValue::U64(300));
        assert_eq!(parse_field_value("ff", FieldType::HexInt, 1).unwrap(), FieldValue::U8(0xFF));
        assert_eq!(parse_field_value("0xff", FieldType::HexInt, 1).unwrap(), FieldValue::U8(0xFF));
        assert!(parse_field_value("12", FieldType::SignedInt, 3).is_err());
        assert!(parse_field_value("twelve", FieldType::UnsignedInt, 4).is_err());
    }

    #[test]
    fn test_parse_rejects_values_wider_than_field() {
        let too_wide = |text: &str, field_type: FieldType, size: usize| {
            matches!(parse_field_value(text, field_type, size), Err(MemoryError::InvalidValue(_)))
        };
        assert!(too_wide("300", FieldType::UnsignedInt, 1));
        assert!(too_wide("0x10000", FieldType::HexInt, 2));
        assert!(too_wide("4294967296", FieldType::UnsignedInt, 4));
        assert!(too_wide("128", FieldType::SignedInt, 1));
        assert!(too_wide("-32769", FieldType::SignedInt, 2));
        assert!(too_wide("0x1FF", FieldType::SignedInt, 1));

        assert_eq!(parse_field_value("255", FieldType::UnsignedInt, 1).unwrap(), FieldValue::U8(255));
        assert_eq!(parse_field_value("-128", FieldType::SignedInt, 1).unwrap(), FieldValue::I8(-128));
        assert_eq!(parse_field_value("0xFF", FieldType::SignedInt, 1).unwrap(), FieldValue::I8(-1));
        assert_eq!(
            parse_field_value("0xFFFFFFFF", FieldType::SignedInt, 4).unwrap(),
            FieldValue::I32(-1)
        );
    }

    #[test]
    fn test_parse_pointers() {
        assert_eq!(
            parse_field_value("7FF600001000", FieldType::Pointer, 8).unwrap(),
            FieldValue::Pointer(Address::new(0x7FF6_0000_1000))
        );
        assert_eq!(
            parse_field_value("[0x10 - 0x40]", FieldType::StartEndPointer, 16).unwrap(),
            FieldValue::StartEndPointer { start: Address::new(0x10), end: Address::new(0x40) }
        );
        assert!(parse_field_value("0x10", FieldType::StartEndPointer, 16).is_err());
        assert!(parse_field_value("1", FieldType::Dissection, 0x400).is_err());
    }

    #[test]
    fn test_accepts_size() {
        assert!(FieldType::HexInt.accepts_size(8));
        assert!(!FieldType::Float.accepts_size(8));
        assert!(FieldType::StartEndPointer.accepts_size(16));
        assert!(!FieldType::String.accepts_size(0));
    }
}
