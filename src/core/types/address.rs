//! Memory address wrapper type with hex parsing

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A virtual address inside the target process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub usize);

impl Address {
    /// Creates a new address from a usize value
    pub const fn new(value: usize) -> Self {
        Address(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Address(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the address is aligned to the specified boundary
    pub const fn is_aligned(&self, alignment: usize) -> bool {
        alignment != 0 && self.0 % alignment == 0
    }

    /// Aligns the address down to the specified boundary
    pub const fn align_down(&self, alignment: usize) -> Self {
        if alignment == 0 {
            return *self;
        }
        Address(self.0 & !(alignment - 1))
    }

    /// Adds an unsigned offset, wrapping at the top of the address space
    pub const fn add(&self, offset: usize) -> Self {
        Address(self.0.wrapping_add(offset))
    }

    /// Adds an unsigned offset, returning `None` on overflow
    pub fn checked_add(&self, offset: usize) -> Option<Self> {
        self.0.checked_add(offset).map(Address)
    }

    /// Adds a signed offset
    pub const fn offset(&self, offset: isize) -> Self {
        Address(self.0.wrapping_add_signed(offset))
    }

    /// Distance from `base` to this address, if this address is not below it
    pub fn offset_from(&self, base: Address) -> Option<usize> {
        self.0.checked_sub(base.0)
    }

    /// Returns the raw usize value
    pub const fn as_usize(&self) -> usize {
        self.0
    }
}

/// Parses `0x`-prefixed or letter-bearing text as hex, plain digits as decimal
pub fn parse_address(text: &str) -> MemoryResult<Address> {
    text.parse()
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let value = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            usize::from_str_radix(hex, 16)
        } else if s.chars().any(|c| c.is_ascii_alphabetic()) {
            usize::from_str_radix(s, 16)
        } else {
            s.parse::<usize>()
        };

        value
            .map(Address::new)
            .map_err(|_| MemoryError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Address::new(value)
    }
}

impl From<Address> for usize {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parsing() {
        assert_eq!(Address::from_str("0x1000").unwrap(), Address::new(0x1000));
        assert_eq!(Address::from_str("0X1000").unwrap(), Address::new(0x1000));
        assert_eq!(Address::from_str("DEADBEEF").unwrap(), Address::new(0xDEADBEEF));
        assert_eq!(Address::from_str("4096").unwrap(), Address::new(4096));
        assert!(Address::from_str("0xZZ").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_address_arithmetic() {
        let addr = Address::new(0x1005);
        assert!(!addr.is_aligned(4));
        assert_eq!(addr.align_down(4), Address::new(0x1004));
        assert_eq!(addr.add(3), Address::new(0x1008));
        assert_eq!(addr.offset(-5), Address::new(0x1000));
        assert_eq!(Address::new(usize::MAX).checked_add(1), None);
        assert_eq!(Address::new(usize::MAX).add(1), Address::null());
        assert_eq!(addr.offset_from(Address::new(0x1000)), Some(5));
        assert_eq!(Address::new(0x10).offset_from(addr), None);
    }

    #[test]
    fn test_address_display() {
        let addr = Address::new(0xDEADBEEF);
        assert_eq!(format!("{}", addr), "0x00000000DEADBEEF");
        assert_eq!(format!("{:X}", addr), "DEADBEEF");
        assert_eq!(format!("{:x}", addr), "deadbeef");
    }
}
