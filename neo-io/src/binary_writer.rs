//! Append-only little-endian writer.

use crate::Serializable;
use neo_primitives::{UInt160, UInt256};

/// Writes primitives into an owned buffer.
///
/// # Examples
///
/// ```rust
/// use neo_io::BinaryWriter;
///
/// let mut writer = BinaryWriter::new();
/// writer.write_u32(42);
/// writer.write_var_bytes(b"neo");
/// assert_eq!(writer.to_bytes(), vec![42, 0, 0, 0, 3, b'n', b'e', b'o']);
/// ```
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.buffer.extend_from_slice(value);
    }

    pub fn write_var_int(&mut self, value: u64) {
        if value < 0xfd {
            self.write_u8(value as u8);
        } else if value <= 0xffff {
            self.write_u8(0xfd);
            self.write_u16(value as u16);
        } else if value <= 0xffff_ffff {
            self.write_u8(0xfe);
            self.write_u32(value as u32);
        } else {
            self.write_u8(0xff);
            self.write_u64(value);
        }
    }

    pub fn write_var_bytes(&mut self, value: &[u8]) {
        self.write_var_int(value.len() as u64);
        self.write_bytes(value);
    }

    pub fn write_var_string(&mut self, value: &str) {
        self.write_var_bytes(value.as_bytes());
    }

    pub fn write_uint160(&mut self, value: &UInt160) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_uint256(&mut self, value: &UInt256) {
        self.write_bytes(value.as_bytes());
    }

    /// Writes a length prefix, then each item with `write_item`.
    pub fn write_array_with<T, F>(&mut self, items: &[T], mut write_item: F)
    where
        F: FnMut(&mut Self, &T),
    {
        self.write_var_int(items.len() as u64);
        for item in items {
            write_item(self, item);
        }
    }

    pub fn write_serializable<T: Serializable>(&mut self, value: &T) {
        value.serialize(self);
    }

    pub fn write_serializable_array<T: Serializable>(&mut self, items: &[T]) {
        self.write_array_with(items, |writer, item| item.serialize(writer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryReader;
    use proptest::prelude::*;

    #[test]
    fn var_int_boundaries() {
        let cases: [(u64, usize); 6] = [
            (0xfc, 1),
            (0xfd, 3),
            (0xffff, 3),
            (0x1_0000, 5),
            (0xffff_ffff, 5),
            (0x1_0000_0000, 9),
        ];
        for (value, len) in cases {
            let mut writer = BinaryWriter::new();
            writer.write_var_int(value);
            assert_eq!(writer.len(), len, "value {value:#x}");
            assert_eq!(crate::helper::get_var_size(value), len);
        }
    }

    proptest! {
        #[test]
        fn var_int_decodes_to_written_value(value in any::<u64>()) {
            let mut writer = BinaryWriter::new();
            writer.write_var_int(value);
            let bytes = writer.into_bytes();
            let mut reader = MemoryReader::new(&bytes);
            prop_assert_eq!(reader.read_var_int(u64::MAX).unwrap(), value);
            prop_assert!(reader.is_empty());
        }
    }
}
