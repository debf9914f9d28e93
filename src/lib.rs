//! Memory-Inspect library for live process memory work
//!
//! Value scanning, byte-pattern and code-cave search, heuristic struct
//! dissection and address expression evaluation over any
//! [`ProcessMemory`](process::ProcessMemory) backend.

pub mod config;
pub mod core;
pub mod dissect;
pub mod evaluator;
pub mod memory;
pub mod process;
#[cfg(windows)]
pub mod windows;

// Re-export main types from core module
pub use core::types::{
    Address, MemoryError, MemoryResult, ModuleInfo, ProcessId, ScanComparison, ScanValue,
    ScannedAddress, ValueType,
};

pub use dissect::{Dissection, Explorer, Field, FieldType, FieldValue};
pub use memory::{CodeCave, MemoryScanner, Pattern, ScanOptions, ScanTask, WatchEntry};
pub use process::{ProcessMemory, ProcessMemoryExt, SnapshotProcess};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_constants() {
        assert_eq!(core::VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(core::AUTHORS, env!("CARGO_PKG_AUTHORS"));
    }

    #[test]
    fn test_address_reexport() {
        let addr = Address::new(0x1000);
        assert_eq!(addr.as_usize(), 0x1000);
        assert!(Address::null().is_null());
    }

    #[test]
    fn test_scan_value_reexport() {
        let value = ScanValue::U32(42);
        assert_eq!(value.value_type(), ValueType::U32);
        assert_eq!(value.to_bytes(), vec![42, 0, 0, 0]);
    }

    #[test]
    fn test_module_info_reexport() {
        let module = ModuleInfo::new("kernel32.dll", Address::new(0x10000), 0x1000);
        assert!(module.contains_address(Address::new(0x10500)));
        assert!(!module.contains_address(Address::new(0x11000)));
    }

    #[test]
    fn test_memory_error_reexport() {
        let error = MemoryError::InvalidAddress("0xBAD".to_string());
        assert!(error.to_string().contains("0xBAD"));
    }
}
