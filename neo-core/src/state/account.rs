use crate::Input;
use neo_crypto::ECPoint;
use neo_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use neo_primitives::{UInt160, UInt256};

const MAX_VOTES: usize = 1024;
const MAX_BALANCES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub script_hash: UInt160,
    pub is_frozen: bool,
    pub votes: Vec<ECPoint>,
    /// `(asset id, Fixed8 amount)` pairs.
    pub balances: Vec<(UInt256, i64)>,
}

impl Account {
    pub fn new(script_hash: UInt160) -> Self {
        Self {
            script_hash,
            is_frozen: false,
            votes: Vec::new(),
            balances: Vec::new(),
        }
    }

    pub fn balance(&self, asset: &UInt256) -> i64 {
        self.balances
            .iter()
            .find(|(id, _)| id == asset)
            .map_or(0, |(_, value)| *value)
    }
}

impl Serializable for Account {
    fn size(&self) -> usize {
        20 + 1
            + helper::get_array_size(&self.votes)
            + helper::get_var_size(self.balances.len() as u64)
            + self.balances.len() * (32 + 8)
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint160(&self.script_hash);
        writer.write_bool(self.is_frozen);
        writer.write_serializable_array(&self.votes);
        writer.write_array_with(&self.balances, |w, (asset, value)| {
            w.write_uint256(asset);
            w.write_i64(*value);
        });
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            script_hash: reader.read_uint160()?,
            is_frozen: reader.read_bool()?,
            votes: reader.read_serializable_array(MAX_VOTES)?,
            balances: reader.read_array_with(MAX_BALANCES, |r| {
                Ok((r.read_uint256()?, r.read_i64()?))
            })?,
        })
    }
}

/// An input owned by an account, persisted in the unspent and unclaimed sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountInput {
    pub hash: UInt160,
    pub input: Input,
}

impl Serializable for AccountInput {
    fn size(&self) -> usize {
        20 + self.input.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint160(&self.hash);
        self.input.serialize(writer);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            hash: reader.read_uint160()?,
            input: Input::deserialize(reader)?,
        })
    }
}
