//! Block header.

use crate::Witness;
use neo_crypto::Crypto;
use neo_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use neo_primitives::{UInt160, UInt256};

const UNSIGNED_SIZE: usize = 4 + 32 + 32 + 4 + 4 + 8 + 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub previous_hash: UInt256,
    pub merkle_root: UInt256,
    /// Seconds since the Unix epoch.
    pub timestamp: u32,
    pub index: u32,
    /// The primary's nonce for this block.
    pub consensus_data: u64,
    /// Script hash of the validator set that signs the next block.
    pub next_consensus: UInt160,
    pub witness: Witness,
}

impl Header {
    fn serialize_unsigned(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.version);
        writer.write_uint256(&self.previous_hash);
        writer.write_uint256(&self.merkle_root);
        writer.write_u32(self.timestamp);
        writer.write_u32(self.index);
        writer.write_u64(self.consensus_data);
        writer.write_uint160(&self.next_consensus);
    }

    /// The bytes validators sign.
    pub fn unsigned_data(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(UNSIGNED_SIZE);
        self.serialize_unsigned(&mut writer);
        writer.into_bytes()
    }

    pub fn hash(&self) -> UInt256 {
        Crypto::hash256_uint(&self.unsigned_data())
    }

    pub(crate) fn deserialize_unsigned(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            version: reader.read_u32()?,
            previous_hash: reader.read_uint256()?,
            merkle_root: reader.read_uint256()?,
            timestamp: reader.read_u32()?,
            index: reader.read_u32()?,
            consensus_data: reader.read_u64()?,
            next_consensus: reader.read_uint160()?,
            witness: Witness::default(),
        })
    }
}

impl Serializable for Header {
    fn size(&self) -> usize {
        UNSIGNED_SIZE + 1 + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        self.serialize_unsigned(writer);
        writer.write_u8(1);
        self.witness.serialize(writer);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let mut header = Self::deserialize_unsigned(reader)?;
        let count = reader.read_u8()?;
        if count != 1 {
            return Err(IoError::invalid_data(format!(
                "Header must carry exactly one witness, got {count}"
            )));
        }
        header.witness = Witness::deserialize(reader)?;
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_io::SerializableExt;

    fn header() -> Header {
        Header {
            version: 0,
            previous_hash: UInt256::from_raw([3u8; 32]),
            merkle_root: UInt256::from_raw([4u8; 32]),
            timestamp: 1_500_000_000,
            index: 12,
            consensus_data: 0xdead_beef,
            next_consensus: UInt160::from_raw([5u8; 20]),
            witness: Witness::new(vec![1, 2], vec![3]),
        }
    }

    #[test]
    fn hash_excludes_witness() {
        let a = header();
        let mut b = header();
        b.witness = Witness::default();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.unsigned_data().len(), UNSIGNED_SIZE);
    }

    #[test]
    fn encoding_size() {
        let h = header();
        assert_eq!(h.to_array().len(), h.size());
        assert_eq!(<Header as SerializableExt>::from_array(&h.to_array()).unwrap(), h);
    }

    #[test]
    fn requires_single_witness() {
        let h = header();
        let mut bytes = h.to_array();
        bytes[UNSIGNED_SIZE] = 2;
        assert!(<Header as SerializableExt>::from_array(&bytes).is_err());
    }
}
