//! Transactions and their inputs/outputs.

use crate::{LedgerError, LedgerResult, Witness, MAX_SCRIPT_SIZE};
use neo_crypto::Crypto;
use neo_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable, SerializableExt};
use neo_primitives::{UInt160, UInt256};
use std::collections::HashSet;

const MAX_ATTRIBUTES: usize = 16;
const MAX_IO: usize = 0xffff;
const MAX_WITNESSES: usize = 16;
const MAX_ATTRIBUTE_DATA: usize = 252;

/// Wire tag of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransactionType {
    Miner = 0x00,
    Claim = 0x02,
    Contract = 0x80,
    Invocation = 0xd1,
}

impl TransactionType {
    pub const fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Miner),
            0x02 => Some(Self::Claim),
            0x80 => Some(Self::Contract),
            0xd1 => Some(Self::Invocation),
            _ => None,
        }
    }
}

/// Type-specific payload of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    /// First transaction of every block; the nonce keeps its hash unique.
    Miner { nonce: u32 },
    Claim { claims: Vec<Input> },
    Contract,
    Invocation { script: Vec<u8>, gas: i64 },
}

impl TransactionKind {
    pub fn tx_type(&self) -> TransactionType {
        match self {
            Self::Miner { .. } => TransactionType::Miner,
            Self::Claim { .. } => TransactionType::Claim,
            Self::Contract => TransactionType::Contract,
            Self::Invocation { .. } => TransactionType::Invocation,
        }
    }

    fn size(&self) -> usize {
        match self {
            Self::Miner { .. } => 4,
            Self::Claim { claims } => helper::get_array_size(claims),
            Self::Contract => 0,
            Self::Invocation { script, .. } => helper::get_var_bytes_size(script) + 8,
        }
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        match self {
            Self::Miner { nonce } => writer.write_u32(*nonce),
            Self::Claim { claims } => writer.write_serializable_array(claims),
            Self::Contract => {}
            Self::Invocation { script, gas } => {
                writer.write_var_bytes(script);
                writer.write_i64(*gas);
            }
        }
    }

    fn deserialize(tx_type: TransactionType, reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(match tx_type {
            TransactionType::Miner => Self::Miner {
                nonce: reader.read_u32()?,
            },
            TransactionType::Claim => Self::Claim {
                claims: reader.read_serializable_array(MAX_IO)?,
            },
            TransactionType::Contract => Self::Contract,
            TransactionType::Invocation => Self::Invocation {
                script: reader.read_var_bytes(MAX_SCRIPT_SIZE)?,
                gas: reader.read_i64()?,
            },
        })
    }
}

/// Reference to an output of an earlier transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Input {
    pub prev_hash: UInt256,
    pub prev_index: u16,
}

impl Serializable for Input {
    fn size(&self) -> usize {
        32 + 2
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint256(&self.prev_hash);
        writer.write_u16(self.prev_index);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            prev_hash: reader.read_uint256()?,
            prev_index: reader.read_u16()?,
        })
    }
}

/// Value assigned to a script hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub asset_id: UInt256,
    /// Fixed8 amount.
    pub value: i64,
    pub script_hash: UInt160,
}

impl Serializable for Output {
    fn size(&self) -> usize {
        32 + 8 + 20
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint256(&self.asset_id);
        writer.write_i64(self.value);
        writer.write_uint160(&self.script_hash);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            asset_id: reader.read_uint256()?,
            value: reader.read_i64()?,
            script_hash: reader.read_uint160()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub usage: u8,
    pub data: Vec<u8>,
}

impl Serializable for Attribute {
    fn size(&self) -> usize {
        1 + helper::get_var_bytes_size(&self.data)
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.usage);
        writer.write_var_bytes(&self.data);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            usage: reader.read_u8()?,
            data: reader.read_var_bytes(MAX_ATTRIBUTE_DATA)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u8,
    pub kind: TransactionKind,
    pub attributes: Vec<Attribute>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub scripts: Vec<Witness>,
}

impl Transaction {
    /// Builds the miner transaction that opens a block.
    pub fn miner(nonce: u32) -> Self {
        Self {
            version: 0,
            kind: TransactionKind::Miner { nonce },
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            scripts: Vec::new(),
        }
    }

    pub fn tx_type(&self) -> TransactionType {
        self.kind.tx_type()
    }

    pub fn is_miner(&self) -> bool {
        matches!(self.kind, TransactionKind::Miner { .. })
    }

    fn serialize_unsigned(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.tx_type() as u8);
        writer.write_u8(self.version);
        self.kind.serialize(writer);
        writer.write_serializable_array(&self.attributes);
        writer.write_serializable_array(&self.inputs);
        writer.write_serializable_array(&self.outputs);
    }

    fn unsigned_size(&self) -> usize {
        2 + self.kind.size()
            + helper::get_array_size(&self.attributes)
            + helper::get_array_size(&self.inputs)
            + helper::get_array_size(&self.outputs)
    }

    /// Bytes covered by the transaction hash and its witnesses.
    pub fn unsigned_data(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.unsigned_size());
        self.serialize_unsigned(&mut writer);
        writer.into_bytes()
    }

    pub fn hash(&self) -> UInt256 {
        Crypto::hash256_uint(&self.unsigned_data())
    }

    /// Context-free checks: no double-spent input, no negative output, and
    /// a miner transaction carries no inputs.
    pub fn verify_structure(&self) -> LedgerResult<()> {
        let mut seen = HashSet::with_capacity(self.inputs.len());
        for input in &self.inputs {
            if !seen.insert(input) {
                return Err(LedgerError::DuplicateInput {
                    hash: self.hash(),
                    prev_hash: input.prev_hash,
                    prev_index: input.prev_index,
                });
            }
        }
        if self.is_miner() && !self.inputs.is_empty() {
            return Err(LedgerError::MinerWithInputs(self.hash()));
        }
        if self.outputs.iter().any(|o| o.value < 0) {
            return Err(LedgerError::NegativeOutput(self.hash()));
        }
        Ok(())
    }
}

impl Serializable for Transaction {
    fn size(&self) -> usize {
        self.unsigned_size() + helper::get_array_size(&self.scripts)
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        self.serialize_unsigned(writer);
        writer.write_serializable_array(&self.scripts);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let tag = reader.read_u8()?;
        let tx_type = TransactionType::from_byte(tag)
            .ok_or_else(|| IoError::invalid_data(format!("Invalid transaction type: 0x{tag:02x}")))?;
        let version = reader.read_u8()?;
        let kind = TransactionKind::deserialize(tx_type, reader)?;
        Ok(Self {
            version,
            kind,
            attributes: reader.read_serializable_array(MAX_ATTRIBUTES)?,
            inputs: reader.read_serializable_array(MAX_IO)?,
            outputs: reader.read_serializable_array(MAX_IO)?,
            scripts: reader.read_serializable_array(MAX_WITNESSES)?,
        })
    }
}

impl Transaction {
    /// Decodes a transaction from a complete buffer.
    pub fn from_bytes(data: &[u8]) -> IoResult<Self> {
        <Self as SerializableExt>::from_array(data)
    }
}
