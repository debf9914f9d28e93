//! Loaded module descriptors

use super::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Information about a loaded module in a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub path: PathBuf,
    pub base_address: Address,
    pub size: usize,
}

impl ModuleInfo {
    /// Creates a new ModuleInfo
    pub fn new(name: impl Into<String>, base_address: Address, size: usize) -> Self {
        ModuleInfo {
            name: name.into(),
            path: PathBuf::new(),
            base_address,
            size,
        }
    }

    /// Gets the end address of the module, saturating at the top of the address space
    pub fn end_address(&self) -> Address {
        Address::new(self.base_address.as_usize().saturating_add(self.size))
    }

    /// Checks if an address is within this module
    pub fn contains_address(&self, address: Address) -> bool {
        address >= self.base_address && address < self.end_address()
    }

    /// Case-insensitive name comparison
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Finds a module by name, ignoring case
pub fn find_module<'a>(modules: &'a [ModuleInfo], name: &str) -> Option<&'a ModuleInfo> {
    modules.iter().find(|m| m.name_matches(name))
}

/// Finds the module whose image contains `address`
pub fn module_containing(modules: &[ModuleInfo], address: Address) -> Option<&ModuleInfo> {
    modules.iter().find(|m| m.contains_address(address))
}
