//! PSAPI.dll bindings for module enumeration

use crate::core::types::{Address, MemoryError, MemoryResult, ModuleInfo};
use std::mem;
use std::path::PathBuf;
use std::ptr;
use winapi::shared::minwindef::{DWORD, FALSE, HMODULE, MAX_PATH};
use winapi::um::psapi::{
    EnumProcessModules, GetModuleBaseNameW, GetModuleFileNameExW, GetModuleInformation, MODULEINFO,
};
use winapi::um::winnt::HANDLE;

/// Safe wrapper for EnumProcessModules
///
/// # Safety
/// The handle must be a valid process handle
pub unsafe fn enum_process_modules(handle: HANDLE) -> MemoryResult<Vec<HMODULE>> {
    let mut modules: Vec<HMODULE> = vec![ptr::null_mut(); 1024];

    loop {
        let mut bytes_needed: DWORD = 0;
        let result = EnumProcessModules(
            handle,
            modules.as_mut_ptr(),
            (modules.len() * mem::size_of::<HMODULE>()) as DWORD,
            &mut bytes_needed,
        );

        if result == FALSE {
            return Err(MemoryError::WindowsApi(
                "Failed to enumerate process modules".to_string(),
            ));
        }

        let count = bytes_needed as usize / mem::size_of::<HMODULE>();
        if count <= modules.len() {
            modules.truncate(count);
            return Ok(modules);
        }
        modules.resize(count, ptr::null_mut());
    }
}

/// Safe wrapper for GetModuleBaseNameW
///
/// # Safety
/// The handle must be a valid process handle and module must be valid
pub unsafe fn get_module_base_name(handle: HANDLE, module: HMODULE) -> MemoryResult<String> {
    let mut buffer = [0u16; MAX_PATH];
    let length = GetModuleBaseNameW(handle, module, buffer.as_mut_ptr(), MAX_PATH as DWORD);

    if length == 0 {
        return Err(MemoryError::WindowsApi(
            "Failed to get module base name".to_string(),
        ));
    }

    Ok(String::from_utf16_lossy(&buffer[..length as usize]))
}

/// Safe wrapper for GetModuleFileNameExW
///
/// # Safety
/// The handle must be a valid process handle and module must be valid
pub unsafe fn get_module_file_name(handle: HANDLE, module: HMODULE) -> Option<PathBuf> {
    let mut buffer = [0u16; MAX_PATH];
    let length = GetModuleFileNameExW(handle, module, buffer.as_mut_ptr(), MAX_PATH as DWORD);

    if length == 0 {
        None
    } else {
        Some(PathBuf::from(String::from_utf16_lossy(&buffer[..length as usize])))
    }
}

/// Safe wrapper for GetModuleInformation
///
/// # Safety
/// The handle must be a valid process handle and module must be valid
pub unsafe fn get_module_information(handle: HANDLE, module: HMODULE) -> MemoryResult<MODULEINFO> {
    let mut info: MODULEINFO = mem::zeroed();

    let result = GetModuleInformation(
        handle,
        module,
        &mut info,
        mem::size_of::<MODULEINFO>() as DWORD,
    );

    if result == FALSE {
        return Err(MemoryError::WindowsApi(
            "Failed to get module information".to_string(),
        ));
    }

    Ok(info)
}

/// Lists every module of the process, skipping modules that vanish mid-walk
///
/// # Safety
/// The handle must be a valid process handle with query and read access
pub unsafe fn enumerate_modules(handle: HANDLE) -> MemoryResult<Vec<ModuleInfo>> {
    let modules = enum_process_modules(handle)?;
    let mut infos = Vec::with_capacity(modules.len());

    for module in modules {
        let (Ok(name), Ok(info)) = (
            get_module_base_name(handle, module),
            get_module_information(handle, module),
        ) else {
            continue;
        };

        let mut module_info = ModuleInfo::new(
            name,
            Address::new(info.lpBaseOfDll as usize),
            info.SizeOfImage as usize,
        );
        if let Some(path) = get_module_file_name(handle, module) {
            module_info.path = path;
        }
        infos.push(module_info);
    }

    Ok(infos)
}
