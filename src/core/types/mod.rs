//! Core type definitions for Memory-Inspect
//!
//! Address wrappers, scan values, module descriptors, scan results and the
//! shared error type.

mod address;
mod error;
mod module_info;
mod scan_result;
mod value;

pub use address::{parse_address, Address};
pub use error::{MemoryError, MemoryResult};
pub use module_info::{find_module, module_containing, ModuleInfo};
pub use scan_result::{ScanComparison, ScannedAddress};
pub use value::{ScanValue, ValueType};

/// Process identifier as used by the operating system
pub type ProcessId = u32;
