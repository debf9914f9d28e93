//! MSVC x64 run-time type information lookup
//!
//! Layout walked from an object pointer:
//!
//! ```text
//! object -> vtable
//! vtable[-1] -> complete object locator (COL)
//! COL + 12   -> type descriptor RVA (i32, relative to the module base)
//! type descriptor + 16 -> decorated name, e.g. ".?AVPlayer@Game@@"
//! ```

use crate::core::types::{module_containing, Address};
use crate::process::{ProcessMemory, ProcessMemoryExt};
use tracing::trace;

const COL_TYPE_DESCRIPTOR_OFFSET: usize = 12;
const TYPE_DESCRIPTOR_NAME_OFFSET: usize = 16;
const MAX_TYPE_NAME_LEN: usize = 255;

/// Resolves the demangled class name of the object at `object`.
///
/// Any broken link in the chain yields `None`.
pub fn rtti_name<P: ProcessMemory + ?Sized>(process: &P, object: Address) -> Option<String> {
    let vtable = process.read::<usize>(object).ok()?;
    let col_slot = Address::new(vtable.checked_sub(std::mem::size_of::<usize>())?);
    if !process.is_readable(col_slot) {
        return None;
    }

    let col = Address::new(process.read::<usize>(col_slot).ok()?);
    if !process.is_readable(col) {
        return None;
    }

    let type_descriptor_rva = process.read::<i32>(col.add(COL_TYPE_DESCRIPTOR_OFFSET)).ok()?;
    if type_descriptor_rva == 0 {
        return None;
    }

    let modules = process.enumerate_modules().ok()?;
    let module = module_containing(&modules, col)?;
    let type_descriptor = module.base_address.offset(type_descriptor_rva as isize);
    if !process.is_readable(type_descriptor) {
        return None;
    }

    let decorated = process
        .read_string(type_descriptor.add(TYPE_DESCRIPTOR_NAME_OFFSET), MAX_TYPE_NAME_LEN)
        .ok()?;
    if decorated.is_empty() {
        return None;
    }

    trace!(%object, name = %decorated, "resolved type descriptor");
    Some(demangle(&decorated))
}

/// Turns a decorated class name into `Outer::Inner` form.
///
/// Names this does not understand (templates, operators) come back as given.
pub fn demangle(decorated: &str) -> String {
    let Some(body) = decorated
        .strip_prefix(".?AV")
        .or_else(|| decorated.strip_prefix(".?AU"))
    else {
        return decorated.to_string();
    };

    let Some(body) = body.strip_suffix("@@") else {
        return decorated.to_string();
    };

    let parts: Vec<&str> = body.split('@').collect();
    if parts.iter().any(|part| part.is_empty() || part.contains('?') || part.contains('$')) {
        return decorated.to_string();
    }

    parts.iter().rev().copied().collect::<Vec<_>>().join("::")
}
