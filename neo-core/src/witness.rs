//! Invocation/verification script pair.

use crate::MAX_SCRIPT_SIZE;
use neo_crypto::Crypto;
use neo_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use neo_primitives::UInt160;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Witness {
    pub invocation_script: Vec<u8>,
    pub verification_script: Vec<u8>,
}

impl Witness {
    pub fn new(invocation_script: Vec<u8>, verification_script: Vec<u8>) -> Self {
        Self {
            invocation_script,
            verification_script,
        }
    }

    /// Hash160 of the verification script.
    pub fn script_hash(&self) -> UInt160 {
        Crypto::hash160_uint(&self.verification_script)
    }
}

impl Serializable for Witness {
    fn size(&self) -> usize {
        helper::get_var_bytes_size(&self.invocation_script)
            + helper::get_var_bytes_size(&self.verification_script)
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_var_bytes(&self.invocation_script);
        writer.write_var_bytes(&self.verification_script);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            invocation_script: reader.read_var_bytes(MAX_SCRIPT_SIZE)?,
            verification_script: reader.read_var_bytes(MAX_SCRIPT_SIZE)?,
        })
    }
}
