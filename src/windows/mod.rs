//! Windows API layer
//!
//! Safe wrappers around the Win32 calls the live process backend needs. All
//! unsafe FFI is contained within this module.

pub mod bindings;
pub mod handle;

pub use bindings::{kernel32, psapi};
pub use handle::Handle;
