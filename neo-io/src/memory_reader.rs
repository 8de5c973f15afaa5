//! Cursor-based reader over a borrowed byte slice.

use crate::{IoError, IoResult, Serializable};
use neo_primitives::{UInt160, UInt256, UINT160_SIZE, UINT256_SIZE};

/// Reads little-endian primitives from a byte slice.
///
/// Cloning a reader duplicates the cursor only; the underlying buffer is
/// shared. Reading from the clone leaves the original position untouched.
#[derive(Debug, Clone)]
pub struct MemoryReader<'a> {
    memory: &'a [u8],
    pos: usize,
}

impl<'a> MemoryReader<'a> {
    pub fn new(memory: &'a [u8]) -> Self {
        Self { memory, pos: 0 }
    }

    #[inline(always)]
    fn ensure_position(&self, move_by: usize) -> IoResult<()> {
        let remaining = self.remaining();
        if move_by > remaining {
            Err(IoError::UnexpectedEof {
                needed: move_by,
                remaining,
            })
        } else {
            Ok(())
        }
    }

    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.memory.len() - self.pos
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the next byte without advancing.
    #[inline(always)]
    pub fn peek(&self) -> IoResult<u8> {
        self.ensure_position(1)?;
        Ok(self.memory[self.pos])
    }

    pub fn read_bool(&mut self) -> IoResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(IoError::invalid_data(format!(
                "Invalid boolean value: 0x{other:02x}"
            ))),
        }
    }

    #[inline(always)]
    pub fn read_u8(&mut self) -> IoResult<u8> {
        self.ensure_position(1)?;
        let value = self.memory[self.pos];
        self.pos += 1;
        Ok(value)
    }

    #[inline(always)]
    pub fn read_u16(&mut self) -> IoResult<u16> {
        Ok(u16::from_le_bytes(self.read_array::<2>()?))
    }

    #[inline(always)]
    pub fn read_u32(&mut self) -> IoResult<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    #[inline(always)]
    pub fn read_u64(&mut self) -> IoResult<u64> {
        Ok(u64::from_le_bytes(self.read_array::<8>()?))
    }

    #[inline(always)]
    pub fn read_i64(&mut self) -> IoResult<i64> {
        Ok(i64::from_le_bytes(self.read_array::<8>()?))
    }

    /// Reads a Neo variable length integer, rejecting values above `max`.
    pub fn read_var_int(&mut self, max: u64) -> IoResult<u64> {
        let b = self.read_u8()?;
        let value = match b {
            0xfd => u64::from(self.read_u16()?),
            0xfe => u64::from(self.read_u32()?),
            0xff => self.read_u64()?,
            _ => u64::from(b),
        };
        if value > max {
            return Err(IoError::VarIntTooLarge { value, max });
        }
        Ok(value)
    }

    /// Reads exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> IoResult<[u8; N]> {
        let slice = self.read_memory(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Borrows the next `count` bytes.
    pub fn read_memory(&mut self, count: usize) -> IoResult<&'a [u8]> {
        self.ensure_position(count)?;
        let result = &self.memory[self.pos..self.pos + count];
        self.pos += count;
        Ok(result)
    }

    pub fn read_bytes(&mut self, count: usize) -> IoResult<Vec<u8>> {
        Ok(self.read_memory(count)?.to_vec())
    }

    /// Reads a var-int length prefix followed by that many bytes.
    pub fn read_var_bytes(&mut self, max: usize) -> IoResult<Vec<u8>> {
        let length = self.read_var_int(max as u64)? as usize;
        self.read_bytes(length)
    }

    pub fn read_var_string(&mut self, max: usize) -> IoResult<String> {
        let bytes = self.read_var_bytes(max)?;
        String::from_utf8(bytes).map_err(|_| IoError::invalid_data("Invalid UTF-8 sequence"))
    }

    pub fn read_uint160(&mut self) -> IoResult<UInt160> {
        Ok(UInt160::from_raw(self.read_array::<UINT160_SIZE>()?))
    }

    pub fn read_uint256(&mut self) -> IoResult<UInt256> {
        Ok(UInt256::from_raw(self.read_array::<UINT256_SIZE>()?))
    }

    /// Reads a length prefix, then that many items with `read_item`.
    ///
    /// No uniqueness checks are applied; callers validate the result.
    pub fn read_array_with<T, F>(&mut self, max: usize, mut read_item: F) -> IoResult<Vec<T>>
    where
        F: FnMut(&mut Self) -> IoResult<T>,
    {
        let count = self.read_var_int(max as u64)? as usize;
        // cap the preallocation: count comes off the wire
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(read_item(self)?);
        }
        Ok(items)
    }

    /// Reads a length prefixed array of `Serializable` items.
    pub fn read_serializable_array<T: Serializable>(&mut self, max: usize) -> IoResult<Vec<T>> {
        self.read_array_with(max, |reader| T::deserialize(reader))
    }

    /// Fails unless the whole buffer has been consumed.
    pub fn ensure_end(&self) -> IoResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(IoError::invalid_data(format!(
                "{} trailing bytes after value",
                self.remaining()
            )))
        }
    }
}
