use super::MAX_STRING;
use neo_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use neo_primitives::{UInt160, UInt256};

const MAX_ARGS: usize = 0x10_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Log { message: String },
    Notification { args: Vec<u8> },
}

/// A log or notification emitted by a contract, numbered by a chain-wide
/// sequence so actions can be range-scanned in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub index: u64,
    pub block_index: u32,
    pub transaction_index: u32,
    pub transaction_hash: UInt256,
    pub script_hash: UInt160,
    pub kind: ActionKind,
}

impl Serializable for Action {
    fn size(&self) -> usize {
        let body = match &self.kind {
            ActionKind::Log { message } => helper::get_var_bytes_size(message.as_bytes()),
            ActionKind::Notification { args } => helper::get_var_bytes_size(args),
        };
        1 + 8 + 4 + 4 + 32 + 20 + body
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        let tag = match self.kind {
            ActionKind::Log { .. } => 0x00,
            ActionKind::Notification { .. } => 0x01,
        };
        writer.write_u8(tag);
        writer.write_u64(self.index);
        writer.write_u32(self.block_index);
        writer.write_u32(self.transaction_index);
        writer.write_uint256(&self.transaction_hash);
        writer.write_uint160(&self.script_hash);
        match &self.kind {
            ActionKind::Log { message } => writer.write_var_string(message),
            ActionKind::Notification { args } => writer.write_var_bytes(args),
        }
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        let tag = reader.read_u8()?;
        let index = reader.read_u64()?;
        let block_index = reader.read_u32()?;
        let transaction_index = reader.read_u32()?;
        let transaction_hash = reader.read_uint256()?;
        let script_hash = reader.read_uint160()?;
        let kind = match tag {
            0x00 => ActionKind::Log {
                message: reader.read_var_string(MAX_STRING)?,
            },
            0x01 => ActionKind::Notification {
                args: reader.read_var_bytes(MAX_ARGS)?,
            },
            other => {
                return Err(IoError::invalid_data(format!(
                    "Invalid action type: 0x{other:02x}"
                )))
            }
        };
        Ok(Self {
            index,
            block_index,
            transaction_index,
            transaction_hash,
            script_hash,
            kind,
        })
    }
}
