//! Byte pattern scanning with wildcards

use super::regions::{collect_ranges, MemoryRegion};
use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::process::ProcessMemory;
use memchr::memchr;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Default lower bound of a pattern scan
pub const DEFAULT_PATTERN_START: Address = Address::new(0x1000);

/// Default upper bound of a pattern scan
pub const DEFAULT_PATTERN_END: Address = Address::new(0x7FFF_FFFF_0000);

/// Byte pattern where `None` matches any byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<Option<u8>>,
}

impl Pattern {
    /// Parses a pattern such as `"48 8B ?? ?? 89"`.
    ///
    /// Tokens are separated by whitespace. Each token is either exactly two
    /// hex digits or a `?` / `??` wildcard.
    pub fn from_hex_string(pattern: &str) -> MemoryResult<Self> {
        let mut bytes = Vec::new();

        for part in pattern.split_whitespace() {
            if part == "??" || part == "?" {
                bytes.push(None);
                continue;
            }

            if part.len() != 2 {
                return Err(MemoryError::InvalidPattern(format!(
                    "Invalid hex byte '{}': must be 2 digits",
                    part
                )));
            }
            let decoded = hex::decode(part)
                .map_err(|_| MemoryError::InvalidPattern(format!("Invalid hex: {}", part)))?;
            bytes.extend(decoded.into_iter().map(Some));
        }

        if bytes.is_empty() {
            return Err(MemoryError::InvalidPattern("Empty pattern".to_string()));
        }

        Ok(Pattern { bytes })
    }

    /// Pattern matching `bytes` exactly
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Pattern {
            bytes: bytes.iter().copied().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_wildcard_only(&self) -> bool {
        self.bytes.iter().all(Option::is_none)
    }

    /// Checks the pattern against the start of `data`
    pub fn matches_at(&self, data: &[u8]) -> bool {
        data.len() >= self.bytes.len()
            && self
                .bytes
                .iter()
                .zip(data)
                .all(|(expected, actual)| expected.map_or(true, |b| b == *actual))
    }

    /// Offset of the first match in `data`
    pub fn find_in(&self, data: &[u8]) -> Option<usize> {
        let len = self.bytes.len();
        if len == 0 || data.len() < len {
            return None;
        }

        if self.is_wildcard_only() {
            return Some(0);
        }

        if let [Some(byte)] = self.bytes[..] {
            return memchr(byte, data);
        }

        let last = len - 1;
        match self.bytes[last] {
            Some(anchor) => {
                let mut start = 0;
                while start + len <= data.len() {
                    let hit = memchr(anchor, &data[start + last..])?;
                    let candidate = start + hit;
                    if self.matches_at(&data[candidate..]) {
                        return Some(candidate);
                    }
                    start = candidate + 1;
                }
                None
            }
            None => (0..=data.len() - len).find(|&i| self.matches_at(&data[i..])),
        }
    }
}

impl FromStr for Pattern {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::from_hex_string(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match byte {
                Some(b) => write!(f, "{:02X}", b)?,
                None => f.write_str("??")?,
            }
        }
        Ok(())
    }
}

/// Finds several named patterns in one pass over `[start, end)`.
///
/// Each eligible region is read once and tested against every pattern not
/// found yet. The walk stops as soon as every name has a match. Patterns
/// without a match are absent from the returned map. When a name repeats,
/// the first pattern under it to match wins.
pub fn pattern_scan_multi<P, N, S>(
    process: &P,
    patterns: &[(N, S)],
    start: Address,
    end: Address,
) -> MemoryResult<HashMap<String, Address>>
where
    P: ProcessMemory + ?Sized,
    N: AsRef<str>,
    S: AsRef<str>,
{
    let parsed = patterns
        .iter()
        .map(|(name, text)| Ok((name.as_ref(), Pattern::from_hex_string(text.as_ref())?)))
        .collect::<MemoryResult<Vec<_>>>()?;

    let wanted = parsed.iter().map(|(name, _)| *name).collect::<HashSet<_>>().len();
    let mut found = HashMap::with_capacity(wanted);
    if parsed.is_empty() {
        return Ok(found);
    }

    for (base, size) in collect_ranges(process, start, end, MemoryRegion::is_pattern_scannable) {
        let mut buffer = vec![0u8; size];
        if process.read_memory(base, &mut buffer).is_err() {
            trace!(%base, size, "pattern scan skipped unreadable region");
            continue;
        }

        for (name, pattern) in &parsed {
            if found.contains_key(*name) {
                continue;
            }
            if let Some(offset) = pattern.find_in(&buffer) {
                debug!(name, %pattern, address = %base.add(offset), "pattern found");
                found.insert((*name).to_string(), base.add(offset));
            }
        }

        if found.len() == wanted {
            break;
        }
    }

    Ok(found)
}

/// Address of the first match of a single pattern in `[start, end)`
pub fn pattern_scan<P: ProcessMemory + ?Sized>(
    process: &P,
    pattern: &str,
    start: Address,
    end: Address,
) -> MemoryResult<Option<Address>> {
    let mut found = pattern_scan_multi(process, &[("pattern", pattern)], start, end)?;
    Ok(found.remove("pattern"))
}
