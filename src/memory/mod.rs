//! Memory operations over a target process
//!
//! This module provides:
//! - Region enumeration and protection predicates
//! - The incremental value scanner
//! - Byte pattern and code cave searches
//! - Watch list entries

pub mod caves;
pub mod compare;
pub mod pattern;
pub mod regions;
pub mod scanner;
pub mod watch;

pub use caves::{
    find_code_caves, find_code_caves_in_module, find_code_caves_in_modules, CodeCave,
    DEFAULT_MIN_CAVE_SIZE,
};
pub use compare::ScanTarget;
pub use pattern::{pattern_scan, pattern_scan_multi, Pattern, DEFAULT_PATTERN_END, DEFAULT_PATTERN_START};
pub use regions::{MemoryRegion, ProtectionFlags, RegionEnumerator, RegionState, PAGE_SIZE};
pub use scanner::{MemoryScanner, ScanOptions, ScanTask, DEFAULT_SCAN_END, DEFAULT_SCAN_START};
pub use watch::WatchEntry;
