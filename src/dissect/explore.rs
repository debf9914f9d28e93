//! Heuristic byte classification
//!
//! [`Explorer::explore`] turns a window of target memory into a list of
//! fields that covers every byte exactly once. At each unclaimed offset the
//! first matching rule wins:
//!
//! 1. pointer: 8-aligned, the value is a readable address
//! 2. string: a run of at least 4 printable bytes
//! 3. double: 8-aligned, normal exponent, finite, `|v| <= 1e300`
//! 4. float: 4-aligned, normal exponent, finite, `|v| <= 1e8`
//! 5. signed 4 or 2 byte integer by alignment, else a 1 byte hex integer
//!
//! Alignment is judged on the absolute address.

use super::field::Field;
use super::rtti::rtti_name;
use super::value::FieldType;
use crate::config::DissectConfig;
use crate::core::types::Address;
use crate::process::{ProcessMemory, ProcessMemoryExt};
use tracing::{debug, trace};

/// Default size of an explored window
pub const DEFAULT_WINDOW_SIZE: usize = 0x400;

const MIN_STRING_LEN: usize = 4;
const MAX_DOUBLE: f64 = 1e300;
const MAX_FLOAT: f32 = 1e8;

pub fn is_printable(byte: u8) -> bool {
    matches!(byte, 32..=126 | b'\r' | b'\n' | b'\t')
}

fn looks_like_double(bytes: &[u8]) -> bool {
    let Some(raw) = bytes.get(..8).and_then(|b| b.try_into().ok()) else {
        return false;
    };
    let bits = u64::from_le_bytes(raw);
    let exponent = (bits >> 52) & 0x7FF;
    let value = f64::from_bits(bits);
    exponent != 0 && exponent != 0x7FF && value.is_finite() && value.abs() <= MAX_DOUBLE
}

fn looks_like_float(bytes: &[u8]) -> bool {
    let Some(raw) = bytes.get(..4).and_then(|b| b.try_into().ok()) else {
        return false;
    };
    let bits = u32::from_le_bytes(raw);
    let exponent = (bits >> 23) & 0xFF;
    let value = f32::from_bits(bits);
    exponent != 0 && exponent != 0xFF && value.is_finite() && value.abs() <= MAX_FLOAT
}

/// Classifies `bytes`, which were read from `base`.
///
/// `is_pointer` decides whether an aligned 8-byte value names readable
/// memory. The returned fields partition `0..bytes.len()`.
pub fn classify_bytes<F>(bytes: &[u8], base: Address, mut is_pointer: F) -> Vec<Field>
where
    F: FnMut(Address) -> bool,
{
    let mut fields = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let address = base.add(offset);
        let remaining = &bytes[offset..];

        if address.is_aligned(8) && remaining.len() >= 8 {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&remaining[..8]);
            if is_pointer(Address::new(u64::from_le_bytes(raw) as usize)) {
                fields.push(Field::new(offset, FieldType::Pointer, 8));
                offset += 8;
                continue;
            }
        }

        let run = remaining.iter().take_while(|&&b| is_printable(b)).count();
        if run >= MIN_STRING_LEN {
            fields.push(Field::new(offset, FieldType::String, run));
            offset += run;
            continue;
        }

        if address.is_aligned(8) && looks_like_double(remaining) {
            fields.push(Field::new(offset, FieldType::Double, 8));
            offset += 8;
            continue;
        }

        if address.is_aligned(4) && looks_like_float(remaining) {
            fields.push(Field::new(offset, FieldType::Float, 4));
            offset += 4;
            continue;
        }

        let (field_type, size) = if address.is_aligned(4) && remaining.len() >= 4 {
            (FieldType::SignedInt, 4)
        } else if address.is_aligned(2) && remaining.len() >= 2 {
            (FieldType::SignedInt, 2)
        } else {
            (FieldType::HexInt, 1)
        };
        fields.push(Field::new(offset, field_type, size));
        offset += size;
    }

    fields
}

/// Explores windows of a process with fixed settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Explorer {
    /// Window explored below a pointer
    pub window_size: usize,
    pub resolve_rtti: bool,
}

impl Default for Explorer {
    fn default() -> Self {
        Explorer {
            window_size: DEFAULT_WINDOW_SIZE,
            resolve_rtti: true,
        }
    }
}

impl From<&DissectConfig> for Explorer {
    fn from(config: &DissectConfig) -> Self {
        Explorer {
            window_size: config.window_size,
            resolve_rtti: config.resolve_rtti,
        }
    }
}

impl Explorer {
    /// Classifies `[base, base + size)`.
    ///
    /// The window is cut short where the run of adjacent readable regions
    /// starting at `base` ends. An unreadable base yields no fields.
    pub fn explore<P: ProcessMemory + ?Sized>(&self, process: &P, base: Address, size: usize) -> Vec<Field> {
        let available = readable_extent(process, base, size);
        if available == 0 {
            debug!(%base, "explore skipped unreadable address");
            return Vec::new();
        }

        let size = size.min(available);
        let mut buffer = vec![0u8; size];
        if let Err(e) = process.read_memory(base, &mut buffer) {
            debug!(%base, size, error = %e, "explore read failed");
            return Vec::new();
        }

        let mut fields = classify_bytes(&buffer, base, |target| process.is_readable(target));

        for field in fields.iter_mut().filter(|f| f.field_type == FieldType::Pointer) {
            field.set_window(self.window_size);
            if self.resolve_rtti {
                if let Ok(target) = process.read::<usize>(base.add(field.offset)) {
                    field.name = rtti_name(process, Address::new(target));
                }
            }
        }

        trace!(%base, size, fields = fields.len(), "explored window");
        fields
    }
}

/// Bytes readable from `base` without a gap, looking no further than `size`
fn readable_extent<P: ProcessMemory + ?Sized>(process: &P, base: Address, size: usize) -> usize {
    let wanted = base.as_usize().saturating_add(size);
    let mut end = base;

    while end.as_usize() < wanted {
        match process.query_region(end) {
            Some(region) if region.is_readable() && region.size > 0 && region.end() > end => {
                end = region.end();
            }
            _ => break,
        }
    }

    end.as_usize().min(wanted) - base.as_usize()
}

/// Explores `[base, base + size)` with default settings
pub fn explore_address<P: ProcessMemory + ?Sized>(process: &P, base: Address, size: usize) -> Vec<Field> {
    Explorer::default().explore(process, base, size)
}
