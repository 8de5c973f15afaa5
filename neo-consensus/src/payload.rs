//! Signed envelope carrying a consensus message between validators.

use crate::{ConsensusMessage, ConsensusResult};
use neo_crypto::{Crypto, ECPoint, KeyPair, Signature, SIGNATURE_SIZE};
use neo_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use neo_primitives::UInt256;

/// Upper bound on the embedded message bytes.
pub const MAX_PAYLOAD_DATA: usize = 0x10_0000;

/// A consensus message addressed to one round and signed by its sender.
///
/// The signature covers every field except itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusPayload {
    pub version: u32,
    pub previous_hash: UInt256,
    pub block_index: u32,
    pub validator_index: u16,
    /// Seconds since the Unix epoch. For a PrepareRequest this is the
    /// proposed block timestamp.
    pub timestamp: u32,
    /// Encoded [`ConsensusMessage`].
    pub data: Vec<u8>,
    pub signature: Signature,
}

impl ConsensusPayload {
    /// Builds and signs a payload for `message`.
    pub fn sign(
        version: u32,
        previous_hash: UInt256,
        block_index: u32,
        validator_index: u16,
        timestamp: u32,
        message: &ConsensusMessage,
        key_pair: &KeyPair,
    ) -> ConsensusResult<Self> {
        let mut payload = Self {
            version,
            previous_hash,
            block_index,
            validator_index,
            timestamp,
            data: message.to_bytes(),
            signature: Signature::from_raw([0u8; SIGNATURE_SIZE]),
        };
        payload.signature = key_pair.sign(&payload.unsigned_data())?;
        Ok(payload)
    }

    fn unsigned_size(&self) -> usize {
        4 + 32 + 4 + 2 + 4 + helper::get_var_bytes_size(&self.data)
    }

    /// The bytes covered by the sender's signature.
    pub fn unsigned_data(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.unsigned_size());
        writer.write_u32(self.version);
        writer.write_uint256(&self.previous_hash);
        writer.write_u32(self.block_index);
        writer.write_u16(self.validator_index);
        writer.write_u32(self.timestamp);
        writer.write_var_bytes(&self.data);
        writer.into_bytes()
    }

    pub fn hash(&self) -> UInt256 {
        Crypto::hash256_uint(&self.unsigned_data())
    }

    pub fn verify(&self, sender: &ECPoint) -> bool {
        self.signature.verify(&self.unsigned_data(), sender)
    }

    /// Decodes the embedded message.
    pub fn message(&self) -> ConsensusResult<ConsensusMessage> {
        ConsensusMessage::from_bytes(&self.data)
    }
}

impl Serializable for ConsensusPayload {
    fn size(&self) -> usize {
        self.unsigned_size() + SIGNATURE_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_bytes(&self.unsigned_data());
        self.signature.serialize(writer);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            version: reader.read_u32()?,
            previous_hash: reader.read_uint256()?,
            block_index: reader.read_u32()?,
            validator_index: reader.read_u16()?,
            timestamp: reader.read_u32()?,
            data: reader.read_var_bytes(MAX_PAYLOAD_DATA)?,
            signature: Signature::deserialize(reader)?,
        })
    }
}
