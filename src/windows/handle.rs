//! Owned HANDLE with automatic cleanup

use super::bindings::kernel32;
use std::ptr;
use winapi::um::winnt::HANDLE;

/// Owned Windows HANDLE, closed on drop
#[derive(Debug)]
pub struct Handle {
    handle: HANDLE,
}

impl Handle {
    pub fn new(handle: HANDLE) -> Self {
        Handle { handle }
    }

    pub fn null() -> Self {
        Handle {
            handle: ptr::null_mut(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    /// Get the raw handle, valid while `self` lives
    pub fn raw(&self) -> HANDLE {
        self.handle
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                let _ = kernel32::close_handle(self.handle);
            }
        }
    }
}

// Process handles may be used from any thread of the owning process
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}
