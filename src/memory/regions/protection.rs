//! Page protection flags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory protection flags as reported by the region query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtectionFlags {
    value: u32,
}

impl ProtectionFlags {
    // Protection constants
    pub const PAGE_NOACCESS: u32 = 0x01;
    pub const PAGE_READONLY: u32 = 0x02;
    pub const PAGE_READWRITE: u32 = 0x04;
    pub const PAGE_WRITECOPY: u32 = 0x08;
    pub const PAGE_EXECUTE: u32 = 0x10;
    pub const PAGE_EXECUTE_READ: u32 = 0x20;
    pub const PAGE_EXECUTE_READWRITE: u32 = 0x40;
    pub const PAGE_EXECUTE_WRITECOPY: u32 = 0x80;
    pub const PAGE_GUARD: u32 = 0x100;
    pub const PAGE_NOCACHE: u32 = 0x200;
    pub const PAGE_WRITECOMBINE: u32 = 0x400;

    /// Any protection that grants read access
    pub const READABLE_MASK: u32 = Self::PAGE_READONLY
        | Self::PAGE_READWRITE
        | Self::PAGE_WRITECOPY
        | Self::PAGE_EXECUTE_READ
        | Self::PAGE_EXECUTE_READWRITE
        | Self::PAGE_EXECUTE_WRITECOPY;

    /// Protections a value scan walks
    pub const SCAN_MASK: u32 = Self::PAGE_READONLY
        | Self::PAGE_READWRITE
        | Self::PAGE_EXECUTE_READ
        | Self::PAGE_EXECUTE_READWRITE;

    /// Protections a byte pattern scan walks
    pub const PATTERN_MASK: u32 =
        Self::PAGE_READWRITE | Self::PAGE_EXECUTE_READ | Self::PAGE_EXECUTE_READWRITE;

    /// Executable protections, the default code cave search mask
    pub const EXECUTABLE_MASK: u32 = Self::PAGE_EXECUTE
        | Self::PAGE_EXECUTE_READ
        | Self::PAGE_EXECUTE_READWRITE
        | Self::PAGE_EXECUTE_WRITECOPY;

    /// Create new protection flags
    pub const fn new(value: u32) -> Self {
        ProtectionFlags { value }
    }

    /// No access protection
    pub const fn no_access() -> Self {
        ProtectionFlags::new(Self::PAGE_NOACCESS)
    }

    /// Read-only protection
    pub const fn read_only() -> Self {
        ProtectionFlags::new(Self::PAGE_READONLY)
    }

    /// Read-write protection
    pub const fn read_write() -> Self {
        ProtectionFlags::new(Self::PAGE_READWRITE)
    }

    /// Execute-read protection
    pub const fn execute_read() -> Self {
        ProtectionFlags::new(Self::PAGE_EXECUTE_READ)
    }

    /// Execute-read-write protection
    pub const fn execute_read_write() -> Self {
        ProtectionFlags::new(Self::PAGE_EXECUTE_READWRITE)
    }

    /// Checks if any bit of `mask` is set
    pub const fn intersects(&self, mask: u32) -> bool {
        self.value & mask != 0
    }

    /// Check if protection allows reading
    pub const fn is_readable(&self) -> bool {
        self.intersects(Self::READABLE_MASK)
    }

    /// Check if protection allows writing
    pub const fn is_writable(&self) -> bool {
        self.intersects(
            Self::PAGE_READWRITE
                | Self::PAGE_WRITECOPY
                | Self::PAGE_EXECUTE_READWRITE
                | Self::PAGE_EXECUTE_WRITECOPY,
        )
    }

    /// Check if protection allows execution
    pub const fn is_executable(&self) -> bool {
        self.intersects(Self::EXECUTABLE_MASK)
    }

    /// Check if the page is inaccessible
    pub const fn is_no_access(&self) -> bool {
        self.intersects(Self::PAGE_NOACCESS)
    }

    /// Check if guard page flag is set
    pub const fn is_guard(&self) -> bool {
        self.intersects(Self::PAGE_GUARD)
    }

    /// Add guard page flag
    pub const fn with_guard(self) -> Self {
        ProtectionFlags::new(self.value | Self::PAGE_GUARD)
    }

    /// Get the raw protection value
    pub const fn raw(&self) -> u32 {
        self.value
    }
}

impl From<u32> for ProtectionFlags {
    fn from(value: u32) -> Self {
        ProtectionFlags::new(value)
    }
}

impl fmt::Display for ProtectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.value & 0xFF {
            Self::PAGE_NOACCESS => "---",
            Self::PAGE_READONLY => "R--",
            Self::PAGE_READWRITE => "RW-",
            Self::PAGE_WRITECOPY => "RC-",
            Self::PAGE_EXECUTE => "--X",
            Self::PAGE_EXECUTE_READ => "R-X",
            Self::PAGE_EXECUTE_READWRITE => "RWX",
            Self::PAGE_EXECUTE_WRITECOPY => "RCX",
            _ => "???",
        };
        f.write_str(base)?;
        if self.is_guard() {
            f.write_str("+G")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_predicates() {
        assert!(ProtectionFlags::read_only().is_readable());
        assert!(!ProtectionFlags::read_only().is_writable());
        assert!(ProtectionFlags::read_write().is_writable());
        assert!(ProtectionFlags::execute_read().is_executable());
        assert!(!ProtectionFlags::no_access().is_readable());
        assert!(!ProtectionFlags::new(ProtectionFlags::PAGE_EXECUTE).is_readable());
        assert!(ProtectionFlags::read_write().with_guard().is_guard());
    }

    #[test]
    fn test_protection_display() {
        assert_eq!(ProtectionFlags::execute_read_write().to_string(), "RWX");
        assert_eq!(ProtectionFlags::read_write().with_guard().to_string(), "RW-+G");
    }
}
