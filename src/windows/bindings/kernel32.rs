//! Kernel32.dll bindings for process and memory operations

use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::memory::regions::{MemoryRegion, ProtectionFlags, RegionState};
use std::mem;
use winapi::shared::minwindef::{FALSE, LPCVOID, LPVOID};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::winnt::{HANDLE, MEMORY_BASIC_INFORMATION, MEM_COMMIT, MEM_RESERVE};

/// Safe wrapper for OpenProcess
pub fn open_process(pid: u32, desired_access: u32) -> MemoryResult<HANDLE> {
    let handle = unsafe { OpenProcess(desired_access, FALSE, pid) };
    if handle.is_null() {
        let code = unsafe { GetLastError() };
        Err(MemoryError::ProcessNotFound(format!(
            "PID {} (error code {})",
            pid, code
        )))
    } else {
        Ok(handle)
    }
}

/// Safe wrapper for CloseHandle
///
/// # Safety
/// The handle must be a valid Windows handle
pub unsafe fn close_handle(handle: HANDLE) -> MemoryResult<()> {
    if handle.is_null() {
        return Ok(());
    }

    if CloseHandle(handle) == FALSE {
        Err(MemoryError::WindowsApi("Failed to close handle".to_string()))
    } else {
        Ok(())
    }
}

/// Reads exactly `buffer.len()` bytes
///
/// # Safety
/// The handle must be a valid process handle with PROCESS_VM_READ access
pub unsafe fn read_process_memory(
    handle: HANDLE,
    address: Address,
    buffer: &mut [u8],
) -> MemoryResult<()> {
    let mut bytes_read = 0;

    let result = ReadProcessMemory(
        handle,
        address.as_usize() as LPCVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut bytes_read,
    );

    if result == FALSE {
        Err(MemoryError::read_failed(address, "ReadProcessMemory failed"))
    } else if bytes_read != buffer.len() {
        Err(MemoryError::read_failed(
            address,
            format!("short read of {} of {} bytes", bytes_read, buffer.len()),
        ))
    } else {
        Ok(())
    }
}

/// Writes all of `data`
///
/// # Safety
/// The handle must be a valid process handle with PROCESS_VM_WRITE access
pub unsafe fn write_process_memory(handle: HANDLE, address: Address, data: &[u8]) -> MemoryResult<()> {
    let mut bytes_written = 0;

    let result = WriteProcessMemory(
        handle,
        address.as_usize() as LPVOID,
        data.as_ptr() as LPCVOID,
        data.len(),
        &mut bytes_written,
    );

    if result == FALSE {
        Err(MemoryError::write_failed(address, "WriteProcessMemory failed"))
    } else if bytes_written != data.len() {
        Err(MemoryError::write_failed(
            address,
            format!("short write of {} of {} bytes", bytes_written, data.len()),
        ))
    } else {
        Ok(())
    }
}

/// Safe wrapper for VirtualQueryEx
///
/// # Safety
/// The handle must be a valid process handle with PROCESS_QUERY_INFORMATION access
pub unsafe fn virtual_query_ex(handle: HANDLE, address: Address) -> Option<MemoryRegion> {
    let mut mbi: MEMORY_BASIC_INFORMATION = mem::zeroed();

    let result = VirtualQueryEx(
        handle,
        address.as_usize() as LPCVOID,
        &mut mbi,
        mem::size_of::<MEMORY_BASIC_INFORMATION>(),
    );

    if result == 0 {
        None
    } else {
        Some(region_from_info(&mbi))
    }
}

fn region_from_info(mbi: &MEMORY_BASIC_INFORMATION) -> MemoryRegion {
    let state = match mbi.State {
        MEM_COMMIT => RegionState::Committed,
        MEM_RESERVE => RegionState::Reserved,
        _ => RegionState::Free,
    };

    MemoryRegion {
        base: Address::new(mbi.BaseAddress as usize),
        size: mbi.RegionSize,
        state,
        protection: ProtectionFlags::new(mbi.Protect),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_null_handle_operations() {
        unsafe {
            assert!(close_handle(ptr::null_mut()).is_ok());

            let mut buffer = vec![0u8; 4];
            assert!(read_process_memory(ptr::null_mut(), Address::new(0x1000), &mut buffer).is_err());
            assert!(write_process_memory(ptr::null_mut(), Address::new(0x1000), &buffer).is_err());
        }
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_open_invalid_process() {
        assert!(open_process(0, 0x0410).is_err());
    }
}
