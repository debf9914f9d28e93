//! Named struct dissections

use super::explore::Explorer;
use super::field::Field;
use crate::core::types::{Address, MemoryResult};
use crate::process::ProcessMemory;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A named exploration rooted at a fixed address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dissection {
    name: String,
    address: Address,
    root: Field,
}

impl Dissection {
    /// Explores `explorer.window_size` bytes at `address` under a root field
    pub fn new<P: ProcessMemory + ?Sized>(
        process: &P,
        name: impl Into<String>,
        address: Address,
        explorer: &Explorer,
    ) -> Self {
        let name = name.into();
        let children = explorer.explore(process, address, explorer.window_size);
        info!(%address, name = %name, fields = children.len(), "created dissection");
        Dissection {
            root: Field::root(&name, explorer.window_size, children),
            name,
            address,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn root(&self) -> &Field {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Field {
        &mut self.root
    }

    /// Field reached by following child indices from the root
    pub fn field_at(&self, path: &[usize]) -> Option<&Field> {
        path.iter()
            .try_fold(&self.root, |field, &index| field.children().get(index))
    }

    pub fn field_at_mut(&mut self, path: &[usize]) -> Option<&mut Field> {
        path.iter()
            .try_fold(&mut self.root, |field, &index| field.child_mut(index))
    }

    /// Address the field at `path` is relative to.
    ///
    /// Each step below the root moves into the window the parent points at,
    /// so the result depends on current memory.
    pub fn base_of<P: ProcessMemory + ?Sized>(&self, process: &P, path: &[usize]) -> Option<Address> {
        let mut base = self.address;
        let mut field = &self.root;
        for (depth, &index) in path.iter().enumerate() {
            if depth > 0 {
                base = field.pointed_region(process, base)?.0;
            }
            field = field.children().get(index)?;
        }
        Some(base)
    }

    /// Explores the field at `path` once and returns its children
    pub fn expand<P: ProcessMemory + ?Sized>(
        &mut self,
        process: &P,
        path: &[usize],
        explorer: &Explorer,
    ) -> Option<&[Field]> {
        let base = self.base_of(process, path)?;
        let field = self.field_at_mut(path)?;
        field.expanded = true;
        Some(field.explore(process, base, explorer))
    }

    /// Parses `text` and writes it into the field at `path`
    pub fn edit<P: ProcessMemory + ?Sized>(&mut self, process: &P, path: &[usize], text: &str) -> MemoryResult<()> {
        let missing = || crate::core::types::MemoryError::InvalidAddress(format!("no field at path {:?}", path));
        let base = self.base_of(process, path).ok_or_else(missing)?;
        let field = self.field_at_mut(path).ok_or_else(missing)?;
        field.edit(process, base, text)
    }
}
