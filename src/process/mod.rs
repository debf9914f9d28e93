//! Access to the memory of a target process
//!
//! Everything above this module talks to a process through the
//! [`ProcessMemory`] trait: raw reads and writes, region queries and module
//! listing. [`ProcessMemoryExt`] layers typed helpers on top of it.
//!
//! Two backends are provided: [`SnapshotProcess`], an in-memory address space
//! built from captured regions, and `WindowsProcess`, a live process opened
//! through the Win32 API (Windows only).

pub mod modules;
pub mod snapshot;

#[cfg(windows)]
pub mod handle;

pub use modules::ModuleCache;
pub use snapshot::SnapshotProcess;

#[cfg(windows)]
pub use handle::{ProcessAccess, WindowsProcess};

use crate::core::types::{Address, MemoryError, MemoryResult, ModuleInfo};
use crate::memory::regions::MemoryRegion;

/// Primitive capability for reading and writing another address space
pub trait ProcessMemory: Send + Sync {
    /// Fills `buffer` from `address`. A short read is an error.
    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()>;

    /// Writes all of `data` at `address`. A short write is an error.
    fn write_memory(&self, address: Address, data: &[u8]) -> MemoryResult<()>;

    /// Describes the region containing `address`, or `None` if the address
    /// cannot be queried.
    fn query_region(&self, address: Address) -> Option<MemoryRegion>;

    /// Lists the modules loaded in the process
    fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleInfo>>;
}

/// Fixed-width little-endian primitives that can be read from memory
pub trait Primitive: Copy + Sized {
    const SIZE: usize;

    fn from_le_slice(bytes: &[u8]) -> Option<Self>;

    fn to_le_vec(self) -> Vec<u8>;
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Option<Self> {
                    Some(<$ty>::from_le_bytes(bytes.get(..Self::SIZE)?.try_into().ok()?))
                }

                fn to_le_vec(self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }
            }
        )*
    };
}

impl_primitive!(u8, u16, u32, u64, usize, i8, i16, i32, i64, f32, f64);

/// Typed helpers available on every [`ProcessMemory`]
pub trait ProcessMemoryExt: ProcessMemory {
    /// Reads `size` bytes into a new buffer
    fn read_buffer(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        self.read_memory(address, &mut buffer)?;
        Ok(buffer)
    }

    /// Reads a primitive value
    fn read<T: Primitive>(&self, address: Address) -> MemoryResult<T> {
        let buffer = self.read_buffer(address, T::SIZE)?;
        T::from_le_slice(&buffer)
            .ok_or_else(|| MemoryError::read_failed(address, "short primitive read"))
    }

    /// Writes a primitive value
    fn write<T: Primitive>(&self, address: Address, value: T) -> MemoryResult<()> {
        self.write_memory(address, &value.to_le_vec())
    }

    /// Reads a NUL-terminated string of at most `max_len` bytes.
    ///
    /// The read is clamped to the end of the containing region so strings
    /// stored near a region boundary still resolve.
    fn read_string(&self, address: Address, max_len: usize) -> MemoryResult<String> {
        let region = self
            .query_region(address)
            .filter(|r| r.is_readable())
            .ok_or_else(|| MemoryError::read_failed(address, "address is not readable"))?;

        let available = region.end().as_usize().saturating_sub(address.as_usize());
        let buffer = self.read_buffer(address, max_len.min(available))?;
        let len = memchr::memchr(0, &buffer).unwrap_or(buffer.len());
        Ok(String::from_utf8_lossy(&buffer[..len]).into_owned())
    }

    /// Checks if the page holding `address` can be read
    fn is_readable(&self, address: Address) -> bool {
        self.query_region(address)
            .map(|region| region.is_readable())
            .unwrap_or(false)
    }
}

impl<P: ProcessMemory + ?Sized> ProcessMemoryExt for P {}

impl<P: ProcessMemory + ?Sized> ProcessMemory for std::sync::Arc<P> {
    fn read_memory(&self, address: Address, buffer: &mut [u8]) -> MemoryResult<()> {
        (**self).read_memory(address, buffer)
    }

    fn write_memory(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        (**self).write_memory(address, data)
    }

    fn query_region(&self, address: Address) -> Option<MemoryRegion> {
        (**self).query_region(address)
    }

    fn enumerate_modules(&self) -> MemoryResult<Vec<ModuleInfo>> {
        (**self).enumerate_modules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::regions::ProtectionFlags;

    fn process() -> SnapshotProcess {
        let process = SnapshotProcess::new();
        let mut data = vec![0u8; 0x100];
        data[..8].copy_from_slice(&0x1122334455667788u64.to_le_bytes());
        data[0x10..0x15].copy_from_slice(b"hello");
        data[0xFC..].copy_from_slice(b"tail");
        process
            .map_region(Address::new(0x1000), data, ProtectionFlags::read_write())
            .unwrap();
        process
    }

    #[test]
    fn test_read_primitives() {
        let process = process();
        assert_eq!(process.read::<u64>(Address::new(0x1000)).unwrap(), 0x1122334455667788);
        assert_eq!(process.read::<u8>(Address::new(0x1000)).unwrap(), 0x88);
        assert_eq!(process.read::<i16>(Address::new(0x1006)).unwrap(), 0x1122);
        assert!(process.read::<u64>(Address::new(0x10FC)).is_err());
    }

    #[test]
    fn test_write_primitive() {
        let process = process();
        process.write(Address::new(0x1020), -2i32).unwrap();
        assert_eq!(process.read::<i32>(Address::new(0x1020)).unwrap(), -2);
        assert_eq!(process.read::<u32>(Address::new(0x1020)).unwrap(), 0xFFFFFFFE);
    }

    #[test]
    fn test_read_string() {
        let process = process();
        assert_eq!(process.read_string(Address::new(0x1010), 64).unwrap(), "hello");
        assert_eq!(process.read_string(Address::new(0x1010), 3).unwrap(), "hel");
        // Clamped at the end of the region
        assert_eq!(process.read_string(Address::new(0x10FC), 255).unwrap(), "tail");
        assert!(process.read_string(Address::new(0x5000), 16).is_err());
    }

    #[test]
    fn test_is_readable() {
        let process = process();
        assert!(process.is_readable(Address::new(0x1000)));
        assert!(process.is_readable(Address::new(0x10FF)));
        assert!(!process.is_readable(Address::new(0x1100)));
        assert!(!process.is_readable(Address::new(0)));
    }
}
