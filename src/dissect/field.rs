//! Dissected fields and their operations

use super::explore::{Explorer, DEFAULT_WINDOW_SIZE};
use super::value::{parse_field_value, FieldType, FieldValue};
use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::process::{ProcessMemory, ProcessMemoryExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One classified span of a struct.
///
/// `offset` is relative to the address the owning window starts at. Only
/// expandable fields (pointers and dissections) carry children; children are
/// kept sorted by offset and never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub offset: usize,
    pub field_type: FieldType,
    pub size: usize,
    pub name: Option<String>,
    children: Vec<Field>,
    explored: bool,
    pub expanded: bool,
    /// Size of the window explored below a pointer
    window: usize,
}

impl Field {
    pub fn new(offset: usize, field_type: FieldType, size: usize) -> Self {
        Field {
            offset,
            field_type,
            size,
            name: None,
            children: Vec::new(),
            explored: false,
            expanded: false,
            window: DEFAULT_WINDOW_SIZE,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds an already explored root spanning `size` bytes
    pub(crate) fn root(name: &str, size: usize, children: Vec<Field>) -> Self {
        Field {
            name: Some(name.to_string()),
            children,
            explored: true,
            expanded: true,
            window: size,
            ..Field::new(0, FieldType::Dissection, size)
        }
    }

    pub fn children(&self) -> &[Field] {
        &self.children
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut Field> {
        self.children.get_mut(index)
    }

    pub fn is_explored(&self) -> bool {
        self.explored
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub(crate) fn set_window(&mut self, window: usize) {
        self.window = window;
    }

    /// Absolute address of this field inside a window starting at `base`
    pub fn address(&self, base: Address) -> Address {
        base.add(self.offset)
    }

    /// Decodes the field at `base + offset`.
    ///
    /// Type and size combinations that have no decoding, unreadable memory
    /// and dissection roots all yield `None`.
    pub fn read<P: ProcessMemory + ?Sized>(&self, process: &P, base: Address) -> Option<FieldValue> {
        let address = self.address(base);
        let value = match (self.field_type, self.size) {
            (FieldType::HexInt | FieldType::UnsignedInt, 1) => FieldValue::U8(process.read(address).ok()?),
            (FieldType::HexInt | FieldType::UnsignedInt, 2) => FieldValue::U16(process.read(address).ok()?),
            (FieldType::HexInt | FieldType::UnsignedInt, 4) => FieldValue::U32(process.read(address).ok()?),
            (FieldType::HexInt | FieldType::UnsignedInt, 8) => FieldValue::U64(process.read(address).ok()?),
            (FieldType::SignedInt, 1) => FieldValue::I8(process.read(address).ok()?),
            (FieldType::SignedInt, 2) => FieldValue::I16(process.read(address).ok()?),
            (FieldType::SignedInt, 4) => FieldValue::I32(process.read(address).ok()?),
            (FieldType::SignedInt, 8) => FieldValue::I64(process.read(address).ok()?),
            (FieldType::Float, 4) => FieldValue::F32(process.read(address).ok()?),
            (FieldType::Double, 8) => FieldValue::F64(process.read(address).ok()?),
            (FieldType::Pointer, 8) => FieldValue::Pointer(Address::new(process.read::<usize>(address).ok()?)),
            (FieldType::String, size) if size > 0 => FieldValue::String(process.read_string(address, size).ok()?),
            (FieldType::StartEndPointer, 16) => FieldValue::StartEndPointer {
                start: Address::new(process.read::<usize>(address).ok()?),
                end: Address::new(process.read::<usize>(address.add(8)).ok()?),
            },
            _ => return None,
        };
        Some(value)
    }

    /// Writes `value` at `base + offset` in a single write.
    ///
    /// A string write resizes the field to the string's length.
    pub fn write<P: ProcessMemory + ?Sized>(
        &mut self,
        process: &P,
        base: Address,
        value: &FieldValue,
    ) -> MemoryResult<()> {
        process.write_memory(self.address(base), &value.to_bytes())?;
        if let FieldValue::String(text) = value {
            self.size = text.len();
        }
        Ok(())
    }

    /// Start and length of the window this field expands into
    pub fn pointed_region<P: ProcessMemory + ?Sized>(&self, process: &P, base: Address) -> Option<(Address, usize)> {
        match self.field_type {
            FieldType::Pointer => match self.read(process, base)? {
                FieldValue::Pointer(target) => Some((target, self.window)),
                _ => None,
            },
            FieldType::StartEndPointer => match self.read(process, base)? {
                FieldValue::StartEndPointer { start, end } if end >= start => {
                    Some((start, end.as_usize() - start.as_usize()))
                }
                _ => None,
            },
            FieldType::Dissection => Some((self.address(base), self.size)),
            _ => None,
        }
    }

    /// Explores the child window once and returns the children.
    ///
    /// Later calls return the cached children until [`Field::re_explore`].
    pub fn explore<P: ProcessMemory + ?Sized>(
        &mut self,
        process: &P,
        base: Address,
        explorer: &Explorer,
    ) -> &[Field] {
        if self.field_type.is_expandable() && !self.explored {
            self.children = match self.pointed_region(process, base) {
                Some((target, size)) => explorer.explore(process, target, size),
                None => Vec::new(),
            };
            self.explored = true;
        }
        &self.children
    }

    /// Discards cached children and explores again
    pub fn re_explore<P: ProcessMemory + ?Sized>(
        &mut self,
        process: &P,
        base: Address,
        explorer: &Explorer,
    ) -> &[Field] {
        self.explored = false;
        self.explore(process, base, explorer)
    }

    /// Changes the type and size in place without exploring.
    ///
    /// A type change drops the children and leaves the field unexplored.
    pub fn retype(&mut self, field_type: FieldType, size: usize) -> MemoryResult<()> {
        if field_type == FieldType::Dissection || !field_type.accepts_size(size) {
            return Err(MemoryError::invalid_field_size(field_type, size));
        }

        if field_type != self.field_type {
            self.children.clear();
            self.explored = false;
        }
        self.field_type = field_type;
        self.size = size;
        Ok(())
    }

    /// Inserts a child, keeping children sorted by offset.
    ///
    /// Existing children overlapping the new one are removed.
    pub fn insert_child(&mut self, child: Field) -> MemoryResult<()> {
        if !self.field_type.is_expandable() {
            return Err(MemoryError::UnsupportedOperation(format!(
                "{} fields have no children",
                self.field_type
            )));
        }
        if child.size == 0 {
            return Err(MemoryError::invalid_field_size(child.field_type, 0));
        }

        let start = child.offset;
        let end = start.saturating_add(child.size);
        self.children
            .retain(|existing| existing.offset.saturating_add(existing.size) <= start || existing.offset >= end);

        let index = self.children.partition_point(|existing| existing.offset < start);
        self.children.insert(index, child);
        Ok(())
    }

    /// Removes and returns the child at `index`
    pub fn remove_child(&mut self, index: usize) -> Option<Field> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Changes the explored window size and explores again.
    ///
    /// Applies to pointers and dissection roots. A start/end pointer's
    /// window is defined by the pointed memory itself.
    pub fn resize_window<P: ProcessMemory + ?Sized>(
        &mut self,
        process: &P,
        base: Address,
        size: usize,
        explorer: &Explorer,
    ) -> MemoryResult<&[Field]> {
        if size == 0 {
            return Err(MemoryError::invalid_field_size(self.field_type, size));
        }
        match self.field_type {
            FieldType::Pointer => self.window = size,
            FieldType::Dissection => {
                self.size = size;
                self.window = size;
            }
            other => {
                return Err(MemoryError::UnsupportedOperation(format!(
                    "cannot resize the window of a {} field",
                    other
                )))
            }
        }
        debug!(offset = self.offset, size, "resized field window");
        Ok(self.re_explore(process, base, explorer))
    }

    /// Current value as display text, or `"??"` when it cannot be read
    pub fn format_value<P: ProcessMemory + ?Sized>(&self, process: &P, base: Address) -> String {
        match self.read(process, base) {
            Some(value) => value.format(self.field_type),
            None => "??".to_string(),
        }
    }

    /// Parses `text` for this field's type and writes it.
    ///
    /// On a parse error nothing is written and the field is unchanged.
    pub fn edit<P: ProcessMemory + ?Sized>(&mut self, process: &P, base: Address, text: &str) -> MemoryResult<()> {
        let value = parse_field_value(text, self.field_type, self.size)?;
        self.write(process, base, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::SnapshotProcess;
    use pretty_assertions::assert_eq;

    const BASE: Address = Address::new(0x10000);

    fn process() -> SnapshotProcess {
        SnapshotProcess::with_buffer(BASE, vec![0; 0x1000]).unwrap()
    }

    #[test]
    fn test_write_read_round_trip() {
        let process = process();
        let cases = [
            (FieldType::SignedInt, 1, FieldValue::I8(-3)),
            (FieldType::SignedInt, 2, FieldValue::I16(-300)),
            (FieldType::SignedInt, 4, FieldValue::I32(-70000)),
            (FieldType::SignedInt, 8, FieldValue::I64(-5_000_000_000)),
            (FieldType::UnsignedInt, 1, FieldValue::U8(200)),
            (FieldType::UnsignedInt, 2, FieldValue::U16(60000)),
            (FieldType::HexInt, 4, FieldValue::U32(0xDEADBEEF)),
            (FieldType::HexInt, 8, FieldValue::U64(u64::MAX)),
            (FieldType::Float, 4, FieldValue::F32(3.25)),
            (FieldType::Double, 8, FieldValue::F64(-1.0e10)),
            (FieldType::Pointer, 8, FieldValue::Pointer(Address::new(0x7FF6_1234_0000))),
        ];

        for (field_type, size, value) in cases {
            let mut field = Field::new(0x20, field_type, size);
            field.write(&process, BASE, &value).unwrap();
            assert_eq!(field.read(&process, BASE), Some(value));
        }
    }

    #[test]
    fn test_string_write_resizes() {
        let process = process();
        let mut field = Field::new(0x40, FieldType::String, 4);
        field.write(&process, BASE, &FieldValue::String("player one".to_string())).unwrap();
        assert_eq!(field.size, 10);
        assert_eq!(
            field.read(&process, BASE),
            Some(FieldValue::String("player one".to_string()))
        );
    }

    #[test]
    fn test_unsupported_read() {
        let process = process();
        assert_eq!(Field::new(0, FieldType::Float, 8).read(&process, BASE), None);
        assert_eq!(Field::new(0, FieldType::SignedInt, 3).read(&process, BASE), None);
        assert_eq!(Field::new(0, FieldType::Dissection, 0x400).read(&process, BASE), None);
        assert_eq!(Field::new(0, FieldType::SignedInt, 4).read(&process, Address::new(0x90000)), None);
    }

    #[test]
    fn test_explore_is_cached() {
        let process = process();
        process.write::<u64>(BASE, BASE.add(0x100).as_usize() as u64).unwrap();
        let explorer = Explorer { window_size: 0x10, resolve_rtti: false };

        let mut field = Field::new(0, FieldType::Pointer, 8);
        let first = field.explore(&process, BASE, &explorer).to_vec();
        assert_eq!(first.len(), 4);

        // Changing memory does not change cached children
        process.write::<f32>(BASE.add(0x100), 12.5).unwrap();
        assert_eq!(field.explore(&process, BASE, &explorer), &first[..]);

        let refreshed = field.re_explore(&process, BASE, &explorer);
        assert_eq!(refreshed[0].field_type, FieldType::Float);
    }

    #[test]
    fn test_start_end_pointer_window() {
        let process = process();
        process.write::<u64>(BASE, BASE.add(0x200).as_usize() as u64).unwrap();
        process.write::<u64>(BASE.add(8), BASE.add(0x20C).as_usize() as u64).unwrap();

        let mut field = Field::new(0, FieldType::StartEndPointer, 16);
        assert_eq!(field.pointed_region(&process, BASE), Some((BASE.add(0x200), 0xC)));
        let children = field.explore(&process, BASE, &Explorer::default());
        assert_eq!(children.iter().map(|c| c.size).sum::<usize>(), 0xC);
        assert_eq!(
            field.format_value(&process, BASE),
            format!("[0x{:X} - 0x{:X}]", BASE.add(0x200), BASE.add(0x20C))
        );
    }

    #[test]
    fn test_retype() {
        let mut field = Field::new(0, FieldType::Pointer, 8);
        field.insert_child(Field::new(0, FieldType::SignedInt, 4)).unwrap();

        field.retype(FieldType::Double, 8).unwrap();
        assert_eq!(field.field_type, FieldType::Double);
        assert!(field.children().is_empty());

        assert!(field.retype(FieldType::Float, 8).is_err());
        assert!(field.retype(FieldType::Dissection, 8).is_err());
        assert_eq!(field.field_type, FieldType::Double);
    }

    #[test]
    fn test_insert_and_remove_children() {
        let mut field = Field::new(0, FieldType::Pointer, 8);
        for offset in [0x10, 0x0, 0x8] {
            field.insert_child(Field::new(offset, FieldType::SignedInt, 4)).unwrap();
        }
        let offsets: Vec<_> = field.children().iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0x0, 0x8, 0x10]);

        // Overlaps 0x8 and 0x10
        field.insert_child(Field::new(0xA, FieldType::Double, 8)).unwrap();
        let offsets: Vec<_> = field.children().iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![0x0, 0xA]);

        assert_eq!(field.remove_child(1).map(|c| c.offset), Some(0xA));
        assert!(field.remove_child(5).is_none());

        let mut scalar = Field::new(0, FieldType::SignedInt, 4);
        assert!(scalar.insert_child(Field::new(0, FieldType::HexInt, 1)).is_err());
    }

    #[test]
    fn test_resize_window() {
        let process = process();
        process.write::<u64>(BASE, BASE.add(0x100).as_usize() as u64).unwrap();
        let explorer = Explorer::default();

        let mut field = Field::new(0, FieldType::Pointer, 8);
        field.explore(&process, BASE, &explorer);
        assert_eq!(field.children().len(), 0x400 / 4);

        let children = field.resize_window(&process, BASE, 0x20, &explorer).unwrap();
        assert_eq!(children.len(), 8);
        assert_eq!(field.window(), 0x20);

        let mut scalar = Field::new(0, FieldType::HexInt, 1);
        assert!(scalar.resize_window(&process, BASE, 0x20, &explorer).is_err());
    }

    #[test]
    fn test_edit_discards_bad_input() {
        let process = process();
        let mut field = Field::new(0x30, FieldType::SignedInt, 4);
        field.edit(&process, BASE, "-42").unwrap();
        assert_eq!(field.format_value(&process, BASE), "-42");

        assert!(field.edit(&process, BASE, "forty").is_err());
        assert_eq!(field.format_value(&process, BASE), "-42");
        assert_eq!(field.size, 4);
    }
}
