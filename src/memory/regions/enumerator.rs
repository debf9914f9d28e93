//! Memory region enumeration

use super::{MemoryRegion, PAGE_SIZE};
use crate::core::types::Address;
use crate::process::ProcessMemory;

/// Walks the address space of a process by repeated region queries.
///
/// Yields every region overlapping `[start, end)`, unclipped. Addresses the
/// query cannot describe are skipped one page at a time. The walk stops at
/// `end`, on a zero-sized region, or when the next address would wrap.
pub struct RegionEnumerator<'a, P: ProcessMemory + ?Sized> {
    process: &'a P,
    current_address: Address,
    max_address: Address,
    finished: bool,
}

impl<'a, P: ProcessMemory + ?Sized> RegionEnumerator<'a, P> {
    /// Enumerate the whole address space
    pub fn new(process: &'a P) -> Self {
        Self::with_range(process, Address::null(), Address::new(usize::MAX))
    }

    /// Enumerate regions overlapping `[start, end)`
    pub fn with_range(process: &'a P, start: Address, end: Address) -> Self {
        RegionEnumerator {
            process,
            current_address: start,
            max_address: end,
            finished: false,
        }
    }

    /// Get the next memory region
    pub fn next_region(&mut self) -> Option<MemoryRegion> {
        while !self.finished && self.current_address < self.max_address {
            match self.process.query_region(self.current_address) {
                Some(region) => {
                    if region.size == 0 {
                        self.finished = true;
                        return None;
                    }

                    match region.base.checked_add(region.size) {
                        Some(next) if next > self.current_address => self.current_address = next,
                        _ => self.finished = true,
                    }

                    return Some(region);
                }
                None => match self.current_address.checked_add(PAGE_SIZE) {
                    Some(next) => self.current_address = next.align_down(PAGE_SIZE),
                    None => self.finished = true,
                },
            }
        }

        None
    }
}

impl<P: ProcessMemory + ?Sized> Iterator for RegionEnumerator<'_, P> {
    type Item = MemoryRegion;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_region()
    }
}

/// Collects the regions overlapping `[start, end)` that satisfy `keep`,
/// clipped to the window.
pub fn collect_ranges<P, F>(process: &P, start: Address, end: Address, keep: F) -> Vec<(Address, usize)>
where
    P: ProcessMemory + ?Sized,
    F: Fn(&MemoryRegion) -> bool,
{
    RegionEnumerator::with_range(process, start, end)
        .filter(|region| keep(region))
        .filter_map(|region| region.clip(start, end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{MemoryResult, ModuleInfo};
    use crate::memory::regions::ProtectionFlags;
    use crate::process::SnapshotProcess;

    fn process() -> SnapshotProcess {
        let process = SnapshotProcess::new();
        process
            .map_region(Address::new(0x10000), vec![0; 0x2000], ProtectionFlags::read_write())
            .unwrap();
        process
            .map_region(Address::new(0x20000), vec![0; 0x1000], ProtectionFlags::no_access())
            .unwrap();
        process
            .map_region(Address::new(0x30000), vec![0; 0x1000], ProtectionFlags::execute_read())
            .unwrap();
        process
    }

    #[test]
    fn test_enumerate_all() {
        let process = process();
        let regions: Vec<_> = RegionEnumerator::new(&process).collect();
        // gap, rw, gap, noaccess, gap, rx, tail gap
        assert_eq!(regions.len(), 7);
        assert_eq!(regions.last().map(|r| r.end()), Some(Address::new(usize::MAX)));
    }

    #[test]
    fn test_enumerate_window() {
        let process = process();
        let regions: Vec<_> =
            RegionEnumerator::with_range(&process, Address::new(0x11000), Address::new(0x20800)).collect();
        let bases: Vec<_> = regions.iter().map(|r| r.base).collect();
        assert_eq!(
            bases,
            vec![Address::new(0x10000), Address::new(0x12000), Address::new(0x20000)]
        );
    }

    #[test]
    fn test_collect_ranges_clips() {
        let process = process();
        let ranges = collect_ranges(&process, Address::new(0x11000), Address::new(0x30800), |r| {
            r.is_scannable()
        });
        assert_eq!(
            ranges,
            vec![(Address::new(0x11000), 0x1000), (Address::new(0x30000), 0x800)]
        );
    }

    struct Unqueryable;

    impl ProcessMemory for Unqueryable {
        fn read_memory(&self, address: Address, _buffer: &mut [u8]) -> MemoryResult<()> {
            Err(crate::core::types::MemoryError::read_failed(address, "no memory"))
        }

        fn write_memory(&self, address: Address, _data: &[u8]) -> MemoryResult<()> {
            Err(crate::core::types::MemoryError::write_failed(address, "no memory"))
        }

        fn query_region(&self, _address: Address) -> Option<MemoryRegion> {
            None
        }

        fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleInfo>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_failed_queries_advance_by_page() {
        let regions: Vec<_> =
            RegionEnumerator::with_range(&Unqueryable, Address::new(0), Address::new(0x10 * PAGE_SIZE)).collect();
        assert!(regions.is_empty());

        let near_top = usize::MAX - 0x10;
        let regions: Vec<_> =
            RegionEnumerator::with_range(&Unqueryable, Address::new(near_top), Address::new(usize::MAX)).collect();
        assert!(regions.is_empty());
    }
}
