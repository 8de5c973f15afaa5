//! Serialization traits and utilities for Neo objects.

use crate::{BinaryWriter, IoResult, MemoryReader};
use neo_primitives::{UInt160, UInt256, UINT160_SIZE, UINT256_SIZE};

/// Objects with a deterministic binary encoding.
pub trait Serializable {
    /// The size of the object in bytes after serialization.
    fn size(&self) -> usize;

    /// Appends the encoding to `writer`.
    fn serialize(&self, writer: &mut BinaryWriter);

    /// Reads one value from `reader`.
    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self>
    where
        Self: Sized;
}

/// Extension methods for serializable objects.
pub trait SerializableExt: Serializable {
    /// Encodes the object into a fresh byte vector.
    fn to_array(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        self.serialize(&mut writer);
        writer.into_bytes()
    }

    /// Decodes an object, requiring the whole buffer to be consumed.
    fn from_array(data: &[u8]) -> IoResult<Self>
    where
        Self: Sized,
    {
        let mut reader = MemoryReader::new(data);
        let value = Self::deserialize(&mut reader)?;
        reader.ensure_end()?;
        Ok(value)
    }
}

impl<T: Serializable> SerializableExt for T {}

impl Serializable for UInt160 {
    fn size(&self) -> usize {
        UINT160_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint160(self);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        reader.read_uint160()
    }
}

impl Serializable for UInt256 {
    fn size(&self) -> usize {
        UINT256_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint256(self);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        reader.read_uint256()
    }
}

/// Size helpers for variable length encodings.
pub mod helper {
    use super::Serializable;

    /// Gets the encoded size of a variable length integer.
    pub fn get_var_size(value: u64) -> usize {
        if value < 0xfd {
            1
        } else if value <= 0xffff {
            3
        } else if value <= 0xffff_ffff {
            5
        } else {
            9
        }
    }

    /// Size of a length prefixed byte string.
    pub fn get_var_bytes_size(value: &[u8]) -> usize {
        get_var_size(value.len() as u64) + value.len()
    }

    /// Size of a length prefixed array of serializable items.
    pub fn get_array_size<T: Serializable>(items: &[T]) -> usize {
        items
            .iter()
            .fold(get_var_size(items.len() as u64), |acc, item| acc + item.size())
    }
}
