//! Core module containing fundamental types for Memory-Inspect
//!
//! Address handling, scan values, module information and error types used by
//! the scanner, the dissector and the expression evaluator.

pub mod types;

pub use types::{
    Address, MemoryError, MemoryResult, ModuleInfo, ScanComparison, ScanValue, ScannedAddress,
    ValueType,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

/// Width of a pointer in the target process
pub const POINTER_SIZE: usize = 8;

#[cfg(not(target_pointer_width = "64"))]
compile_error!("Memory-Inspect requires 64-bit architecture");
