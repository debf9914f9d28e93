//! Memory regions of the target process
//!
//! A [`MemoryRegion`] is a snapshot of one region query. Scans re-query
//! regions every time they run; nothing here is cached.

pub mod enumerator;
pub mod protection;

pub use enumerator::{collect_ranges, RegionEnumerator};
pub use protection::ProtectionFlags;

use crate::core::types::Address;
use serde::{Deserialize, Serialize};

/// Page size used to step over addresses the query cannot describe
pub const PAGE_SIZE: usize = 0x1000;

/// State of a memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionState {
    /// Memory is committed and accessible
    Committed,
    /// Memory is reserved but not committed
    Reserved,
    /// Memory is free/unallocated
    Free,
}

/// One contiguous range of pages sharing state and protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub base: Address,
    pub size: usize,
    pub state: RegionState,
    pub protection: ProtectionFlags,
}

impl MemoryRegion {
    /// Creates a committed region
    pub fn committed(base: Address, size: usize, protection: ProtectionFlags) -> Self {
        MemoryRegion {
            base,
            size,
            state: RegionState::Committed,
            protection,
        }
    }

    /// Creates a free region
    pub fn free(base: Address, size: usize) -> Self {
        MemoryRegion {
            base,
            size,
            state: RegionState::Free,
            protection: ProtectionFlags::no_access(),
        }
    }

    /// End of the region, saturating at the top of the address space
    pub fn end(&self) -> Address {
        Address::new(self.base.as_usize().saturating_add(self.size))
    }

    /// Check if an address is within this region
    pub fn contains(&self, address: Address) -> bool {
        address >= self.base && address < self.end()
    }

    pub fn is_committed(&self) -> bool {
        self.state == RegionState::Committed
    }

    /// Committed, not a guard page and carrying some read right
    pub fn is_readable(&self) -> bool {
        self.is_committed() && !self.protection.is_guard() && self.protection.is_readable()
    }

    /// Regions a value scan reads
    pub fn is_scannable(&self) -> bool {
        self.is_committed()
            && !self.protection.is_guard()
            && !self.protection.is_no_access()
            && self.protection.intersects(ProtectionFlags::SCAN_MASK)
    }

    /// Regions a byte pattern scan reads
    pub fn is_pattern_scannable(&self) -> bool {
        self.is_committed()
            && !self.protection.is_guard()
            && self.protection.intersects(ProtectionFlags::PATTERN_MASK)
    }

    /// Intersects the region with `[min, max)`.
    ///
    /// Returns the clipped start and length, or `None` when nothing overlaps.
    pub fn clip(&self, min: Address, max: Address) -> Option<(Address, usize)> {
        let start = self.base.max(min);
        let end = self.end().min(max);
        if start >= end {
            return None;
        }
        Some((start, end.as_usize() - start.as_usize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_predicates() {
        let rw = MemoryRegion::committed(Address::new(0x1000), 0x1000, ProtectionFlags::read_write());
        assert!(rw.is_readable());
        assert!(rw.is_scannable());
        assert!(rw.is_pattern_scannable());

        let ro = MemoryRegion::committed(Address::new(0x1000), 0x1000, ProtectionFlags::read_only());
        assert!(ro.is_scannable());
        assert!(!ro.is_pattern_scannable());

        let guarded = MemoryRegion::committed(
            Address::new(0x1000),
            0x1000,
            ProtectionFlags::read_write().with_guard(),
        );
        assert!(!guarded.is_readable());
        assert!(!guarded.is_scannable());

        let free = MemoryRegion::free(Address::new(0), 0x1000);
        assert!(!free.is_readable());
    }

    #[test]
    fn test_region_clip() {
        let region = MemoryRegion::committed(Address::new(0x1000), 0x1000, ProtectionFlags::read_write());
        assert_eq!(
            region.clip(Address::new(0), Address::new(usize::MAX)),
            Some((Address::new(0x1000), 0x1000))
        );
        assert_eq!(
            region.clip(Address::new(0x1800), Address::new(0x1900)),
            Some((Address::new(0x1800), 0x100))
        );
        assert_eq!(region.clip(Address::new(0x2000), Address::new(0x3000)), None);
    }

    #[test]
    fn test_region_end_saturates() {
        let region = MemoryRegion::free(Address::new(usize::MAX - 0x10), 0x100);
        assert_eq!(region.end(), Address::new(usize::MAX));
        assert!(region.contains(Address::new(usize::MAX - 1)));
    }
}
