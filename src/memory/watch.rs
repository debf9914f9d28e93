//! Watch list entries

use crate::core::types::{Address, MemoryError, MemoryResult, ScanValue, ScannedAddress, ValueType};
use crate::process::{ProcessMemory, ProcessMemoryExt};
use serde::{Deserialize, Serialize};

/// An address the user keeps an eye on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub description: String,
    pub address: Address,
    pub value_type: ValueType,
}

impl WatchEntry {
    pub fn new(description: impl Into<String>, address: Address, value_type: ValueType) -> Self {
        WatchEntry {
            description: description.into(),
            address,
            value_type,
        }
    }

    /// Promotes a scan result to a watch entry
    pub fn from_scanned(entry: &ScannedAddress, description: impl Into<String>) -> Self {
        WatchEntry::new(description, entry.address, entry.first_value.value_type())
    }

    /// Reads the current value from the process
    pub fn read_value<P: ProcessMemory + ?Sized>(&self, process: &P) -> MemoryResult<ScanValue> {
        let bytes = process.read_buffer(self.address, self.value_type.size())?;
        ScanValue::from_bytes(&bytes, self.value_type)
            .ok_or_else(|| MemoryError::read_failed(self.address, "short value read"))
    }

    pub fn write_value<P: ProcessMemory + ?Sized>(&self, process: &P, value: ScanValue) -> MemoryResult<()> {
        if value.value_type() != self.value_type {
            return Err(MemoryError::InvalidValueType(format!(
                "watch holds {}, got {}",
                self.value_type,
                value.value_type()
            )));
        }
        process.write_memory(self.address, &value.to_bytes())
    }

    /// Parses `text` for this entry's type and writes it.
    ///
    /// Nothing is written when the text does not parse.
    pub fn write_text<P: ProcessMemory + ?Sized>(&self, process: &P, text: &str) -> MemoryResult<()> {
        let value = ScanValue::parse(text, self.value_type)?;
        self.write_value(process, value)
    }
}
