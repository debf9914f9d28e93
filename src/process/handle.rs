//! Live process backend built on the Win32 API

use super::modules::ModuleCache;
use super::ProcessMemory;
use crate::core::types::{Address, MemoryError, MemoryResult, ModuleInfo, ProcessId};
use crate::memory::regions::MemoryRegion;
use crate::windows::{kernel32, psapi, Handle};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Access rights for process handles
#[derive(Debug, Clone, Copy)]
pub struct ProcessAccess {
    value: u32,
}

impl ProcessAccess {
    /// Query information access
    pub const QUERY_INFORMATION: Self = Self { value: 0x0400 };
    /// Read memory access
    pub const VM_READ: Self = Self { value: 0x0010 };
    /// Write memory access
    pub const VM_WRITE: Self = Self { value: 0x0020 };
    /// Required alongside VM_WRITE
    pub const VM_OPERATION: Self = Self { value: 0x0008 };

    /// Combine access rights
    pub fn combine(rights: &[Self]) -> Self {
        let value = rights.iter().fold(0, |acc, right| acc | right.value);
        Self { value }
    }

    /// Rights needed for scanning, dissecting and editing
    pub fn read_write() -> Self {
        Self::combine(&[
            Self::QUERY_INFORMATION,
            Self::VM_READ,
            Self::VM_WRITE,
            Self::VM_OPERATION,
        ])
    }

    /// Get raw value
    pub fn value(&self) -> u32 {
        self.value
    }
}

/// An opened process
pub struct WindowsProcess {
    handle: Handle,
    pid: ProcessId,
    modules: ModuleCache,
}

impl WindowsProcess {
    /// Opens a process with the given access rights
    pub fn open(pid: ProcessId, access: ProcessAccess, module_ttl: Duration) -> MemoryResult<Self> {
        let raw = kernel32::open_process(pid, access.value())?;
        info!(pid, access = format_args!("0x{:X}", access.value()), "opened process");
        Ok(WindowsProcess {
            handle: Handle::new(raw),
            pid,
            modules: ModuleCache::new(module_ttl),
        })
    }

    /// Opens a process for reading and writing memory
    pub fn open_read_write(pid: ProcessId, module_ttl: Duration) -> MemoryResult<Self> {
        Self::open(pid, ProcessAccess::read_write(), module_ttl)
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    fn ensure_valid(&self) -> MemoryResult<()> {
        if self.handle.is_null() {
            return Err(MemoryError::InvalidHandle(
                "Process handle is null".to_string(),
            ));
        }
        Ok(())
    }
}

impl ProcessMemory for WindowsProcess {
    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        self.ensure_valid()?;
        unsafe { kernel32::read_process_memory(self.handle.raw(), address, buffer) }
    }

    fn write_memory(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        self.ensure_valid()?;
        unsafe { kernel32::write_process_memory(self.handle.raw(), address, data) }
    }

    fn query_region(&self, address: Address) -> Option<MemoryRegion> {
        if self.handle.is_null() {
            return None;
        }
        unsafe { kernel32::virtual_query_ex(self.handle.raw(), address) }
    }

    fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleInfo>> {
        self.ensure_valid()?;
        self.modules
            .get_or_refresh(|| unsafe { psapi::enumerate_modules(self.handle.raw()) })
    }
}

impl fmt::Debug for WindowsProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowsProcess")
            .field("pid", &self.pid)
            .field("valid", &!self.handle.is_null())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessMemoryExt;

    #[test]
    fn test_process_access_combine() {
        let combined = ProcessAccess::combine(&[ProcessAccess::VM_READ, ProcessAccess::VM_WRITE]);
        assert_eq!(combined.value(), 0x0030);
        assert_eq!(ProcessAccess::read_write().value(), 0x0438);
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_open_invalid_process() {
        assert!(WindowsProcess::open_read_write(0, Duration::from_secs(5)).is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_current_process() {
        let process = match WindowsProcess::open_read_write(std::process::id(), Duration::from_secs(5)) {
            Ok(process) => process,
            Err(_) => return,
        };

        let modules = process.enumerate_modules().unwrap();
        assert!(!modules.is_empty());

        let main = &modules[0];
        assert!(process.is_readable(main.base_address));
        let header = process.read_buffer(main.base_address, 2).unwrap();
        assert_eq!(header, b"MZ");
    }
}
