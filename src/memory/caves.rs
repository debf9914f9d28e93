//! Code cave search
//!
//! A code cave is a run of filler bytes (`0x00`, `0x90`, `0xCC`) in mapped
//! memory. Runs may mix the three fillers.

use super::regions::{MemoryRegion, RegionEnumerator};
use crate::core::types::{find_module, Address, MemoryError, MemoryResult};
use crate::process::ProcessMemory;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Minimum cave size used when the caller has no preference
pub const DEFAULT_MIN_CAVE_SIZE: usize = 0x50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCave {
    pub address: Address,
    pub size: usize,
}

pub fn is_filler(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x90 | 0xCC)
}

/// Appends maximal filler runs of at least `min_size` bytes in `data`.
///
/// Returns true when `stop_at_first` is set and a cave was recorded.
fn collect_runs(
    base: Address,
    data: &[u8],
    min_size: usize,
    stop_at_first: bool,
    caves: &mut Vec<CodeCave>,
) -> bool {
    let min_size = min_size.max(1);
    let mut run_start = 0;
    let mut run_len = 0;

    // A trailing non-filler sentinel closes a run that reaches the end.
    for (i, &byte) in data.iter().chain(std::iter::once(&0xFF)).enumerate() {
        if is_filler(byte) {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            continue;
        }

        if run_len >= min_size {
            caves.push(CodeCave {
                address: base.add(run_start),
                size: run_len,
            });
            if stop_at_first {
                return true;
            }
        }
        run_len = 0;
    }

    false
}

fn search<P, F>(
    process: &P,
    start: Address,
    end: Address,
    min_size: usize,
    stop_at_first: bool,
    eligible: F,
) -> Vec<CodeCave>
where
    P: ProcessMemory + ?Sized,
    F: Fn(&MemoryRegion) -> bool,
{
    let mut caves = Vec::new();

    for region in RegionEnumerator::with_range(process, start, end) {
        if !eligible(&region) {
            continue;
        }
        let Some((base, size)) = region.clip(start, end) else {
            continue;
        };

        let mut buffer = vec![0u8; size];
        if let Err(e) = process.read_memory(base, &mut buffer) {
            debug!(%base, size, error = %e, "cave search skipped region");
            continue;
        }

        if collect_runs(base, &buffer, min_size, stop_at_first, &mut caves) {
            return caves;
        }
    }

    caves.sort_by(|a, b| b.size.cmp(&a.size));
    caves
}

/// Finds code caves in every committed region whose protection intersects
/// `protection_mask`.
///
/// Results are sorted largest first. With `stop_at_first` the search ends
/// at the first qualifying run.
pub fn find_code_caves<P: ProcessMemory + ?Sized>(
    process: &P,
    min_size: usize,
    stop_at_first: bool,
    protection_mask: u32,
) -> Vec<CodeCave> {
    let caves = search(
        process,
        Address::null(),
        Address::new(usize::MAX),
        min_size,
        stop_at_first,
        |region| region.is_committed() && region.protection.intersects(protection_mask),
    );
    info!(count = caves.len(), min_size, "code cave search complete");
    caves
}

/// Finds code caves inside the image of the module named `module_name`.
///
/// No-access and guard pages are never read.
pub fn find_code_caves_in_module<P: ProcessMemory + ?Sized>(
    process: &P,
    module_name: &str,
    min_size: usize,
    stop_at_first: bool,
    protection_mask: u32,
) -> MemoryResult<Vec<CodeCave>> {
    let modules = process.enumerate_modules()?;
    let module = find_module(&modules, module_name)
        .ok_or_else(|| MemoryError::ModuleNotFound(module_name.to_string()))?;

    let caves = search(
        process,
        module.base_address,
        module.end_address(),
        min_size,
        stop_at_first,
        |region| {
            region.is_committed()
                && !region.protection.is_no_access()
                && !region.protection.is_guard()
                && region.protection.intersects(protection_mask)
        },
    );
    debug!(module = %module.name, count = caves.len(), "module cave search complete");
    Ok(caves)
}

/// Runs [`find_code_caves_in_module`] over several modules.
///
/// Modules that cannot be found are skipped.
pub fn find_code_caves_in_modules<P: ProcessMemory + ?Sized>(
    process: &P,
    module_names: &[&str],
    min_size: usize,
    protection_mask: u32,
) -> Vec<CodeCave> {
    let mut caves: Vec<CodeCave> = module_names
        .iter()
        .filter_map(|name| {
            find_code_caves_in_module(process, name, min_size, false, protection_mask).ok()
        })
        .flatten()
        .collect();
    caves.sort_by(|a, b| b.size.cmp(&a.size));
    caves
}
