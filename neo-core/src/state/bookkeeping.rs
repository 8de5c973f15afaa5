use neo_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use neo_primitives::{UInt160, UInt256};

const MAX_CONTRACTS: usize = 1024;
const MAX_RESULT: usize = 0x10_0000;

/// Per-block counters written alongside the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockData {
    pub hash: UInt256,
    pub last_global_transaction_index: u64,
    pub last_global_action_index: u64,
    pub system_fee: i64,
}

impl Serializable for BlockData {
    fn size(&self) -> usize {
        32 + 8 + 8 + 8
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint256(&self.hash);
        writer.write_u64(self.last_global_transaction_index);
        writer.write_u64(self.last_global_action_index);
        writer.write_i64(self.system_fee);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            hash: reader.read_uint256()?,
            last_global_transaction_index: reader.read_u64()?,
            last_global_action_index: reader.read_u64()?,
            system_fee: reader.read_i64()?,
        })
    }
}

/// Where a transaction landed in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
    pub hash: UInt256,
    pub block_hash: UInt256,
    pub start_height: u32,
    pub index: u32,
    pub global_index: u64,
}

impl Serializable for TransactionData {
    fn size(&self) -> usize {
        32 + 32 + 4 + 4 + 8
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint256(&self.hash);
        writer.write_uint256(&self.block_hash);
        writer.write_u32(self.start_height);
        writer.write_u32(self.index);
        writer.write_u64(self.global_index);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            hash: reader.read_uint256()?,
            block_hash: reader.read_uint256()?,
            start_height: reader.read_u32()?,
            index: reader.read_u32()?,
            global_index: reader.read_u64()?,
        })
    }
}

/// Side effects recorded for an invocation transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationData {
    pub hash: UInt256,
    pub block_index: u32,
    pub transaction_index: u32,
    pub contract_hashes: Vec<UInt160>,
    pub actions_count: u32,
    pub result: Vec<u8>,
}

impl Serializable for InvocationData {
    fn size(&self) -> usize {
        32 + 4 + 4 + helper::get_array_size(&self.contract_hashes) + 4
            + helper::get_var_bytes_size(&self.result)
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint256(&self.hash);
        writer.write_u32(self.block_index);
        writer.write_u32(self.transaction_index);
        writer.write_serializable_array(&self.contract_hashes);
        writer.write_u32(self.actions_count);
        writer.write_var_bytes(&self.result);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            hash: reader.read_uint256()?,
            block_index: reader.read_u32()?,
            transaction_index: reader.read_u32()?,
            contract_hashes: reader.read_serializable_array(MAX_CONTRACTS)?,
            actions_count: reader.read_u32()?,
            result: reader.read_var_bytes(MAX_RESULT)?,
        })
    }
}
