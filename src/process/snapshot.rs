//! In-memory address space
//!
//! A [`SnapshotProcess`] holds captured regions and a module list and answers
//! the same queries a live process does. Gaps between mapped regions are
//! reported as free memory.

use super::ProcessMemory;
use crate::core::types::{Address, MemoryError, MemoryResult, ModuleInfo};
use crate::memory::regions::{MemoryRegion, ProtectionFlags, RegionState};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone)]
struct SnapshotRegion {
    size: usize,
    state: RegionState,
    protection: ProtectionFlags,
    /// Backing bytes, empty for reserved regions
    data: Vec<u8>,
}

/// Address space backed by owned buffers
#[derive(Debug, Default)]
pub struct SnapshotProcess {
    regions: RwLock<BTreeMap<usize, SnapshotRegion>>,
    modules: RwLock<Vec<ModuleInfo>>,
}

impl SnapshotProcess {
    /// Creates an empty address space
    pub fn new() -> Self {
        SnapshotProcess::default()
    }

    /// Convenience constructor for a single read-write region
    pub fn with_buffer(base: Address, data: Vec<u8>) -> MemoryResult<Self> {
        let process = SnapshotProcess::new();
        process.map_region(base, data, ProtectionFlags::read_write())?;
        Ok(process)
    }

    /// Maps committed memory holding `data` at `base`
    pub fn map_region(
        &self,
        base: Address,
        data: Vec<u8>,
        protection: ProtectionFlags,
    ) -> MemoryResult<()> {
        self.insert(
            base,
            SnapshotRegion {
                size: data.len(),
                state: RegionState::Committed,
                protection,
                data,
            },
        )
    }

    /// Reserves `size` bytes at `base` without committing them
    pub fn reserve_region(&self, base: Address, size: usize) -> MemoryResult<()> {
        self.insert(
            base,
            SnapshotRegion {
                size,
                state: RegionState::Reserved,
                protection: ProtectionFlags::no_access(),
                data: Vec::new(),
            },
        )
    }

    /// Registers a loaded module
    pub fn add_module(&self, module: ModuleInfo) {
        self.modules.write().push(module);
    }

    /// Number of mapped regions
    pub fn region_count(&self) -> usize {
        self.regions.read().len()
    }

    fn insert(&self, base: Address, region: SnapshotRegion) -> MemoryResult<()> {
        let start = base.as_usize();
        let end = start
            .checked_add(region.size)
            .filter(|_| region.size > 0)
            .ok_or_else(|| MemoryError::InvalidAddress(format!("bad region at {}", base)))?;

        let mut regions = self.regions.write();

        let overlaps_previous = regions
            .range(..end)
            .next_back()
            .map(|(&b, r)| b + r.size > start)
            .unwrap_or(false);

        if overlaps_previous {
            return Err(MemoryError::InvalidAddress(format!(
                "region at {} overlaps an existing mapping",
                base
            )));
        }

        trace!(base = %base, size = region.size, "mapping snapshot region");
        regions.insert(start, region);
        Ok(())
    }
}

impl ProcessMemory for SnapshotProcess {
    /// Reads may run across adjacent readable mappings, like
    /// `ReadProcessMemory` does.
    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        let regions = self.regions.read();
        let mut cursor = address.as_usize();
        let mut filled = 0;

        while filled < buffer.len() {
            let (base, region) = regions
                .range(..=cursor)
                .next_back()
                .filter(|&(&b, r)| cursor - b < r.size)
                .ok_or_else(|| MemoryError::read_failed(address, "address is not mapped"))?;

            let protection = region.protection;
            if region.state != RegionState::Committed || protection.is_guard() || !protection.is_readable() {
                return Err(MemoryError::read_failed(address, "page is not readable"));
            }

            let offset = cursor - base;
            let take = (region.size - offset).min(buffer.len() - filled);
            buffer[filled..filled + take].copy_from_slice(&region.data[offset..offset + take]);
            filled += take;
            cursor += take;
        }
        Ok(())
    }

    fn write_memory(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        let mut regions = self.regions.write();
        let (base, region) = regions
            .range_mut(..=address.as_usize())
            .next_back()
            .ok_or_else(|| MemoryError::write_failed(address, "address is not mapped"))?;

        let offset = address.as_usize() - *base;
        let end = offset
            .checked_add(data.len())
            .filter(|&end| end <= region.size)
            .ok_or_else(|| MemoryError::write_failed(address, "range crosses a region boundary"))?;

        let protection = region.protection;
        if region.state != RegionState::Committed || protection.is_guard() || protection.is_no_access() {
            return Err(MemoryError::write_failed(address, "page is not accessible"));
        }

        region.data[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn query_region(&self, address: Address) -> Option<MemoryRegion> {
        let regions = self.regions.read();
        let at = address.as_usize();

        let previous = regions.range(..=at).next_back();
        if let Some((&base, region)) = previous {
            if at - base < region.size {
                return Some(MemoryRegion {
                    base: Address::new(base),
                    size: region.size,
                    state: region.state,
                    protection: region.protection,
                });
            }
        }

        // Free gap between the previous mapping and the next one
        let gap_start = previous.map(|(&b, r)| b + r.size).unwrap_or(0);
        let gap_end = regions
            .range(at..)
            .next()
            .map(|(&b, _)| b)
            .unwrap_or(usize::MAX);

        Some(MemoryRegion::free(Address::new(gap_start), gap_end - gap_start))
    }

    fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleInfo>> {
        Ok(self.modules.read().clone())
    }
}
