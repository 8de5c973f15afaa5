use neo_crypto::ECPoint;
use neo_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};

const MAX_VALIDATOR_SLOTS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub public_key: ECPoint,
    pub registered: bool,
    /// Fixed8 votes cast for this candidate.
    pub votes: i64,
}

impl Serializable for Validator {
    fn size(&self) -> usize {
        self.public_key.size() + 1 + 8
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        self.public_key.serialize(writer);
        writer.write_bool(self.registered);
        writer.write_i64(self.votes);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            public_key: ECPoint::deserialize(reader)?,
            registered: reader.read_bool()?,
            votes: reader.read_i64()?,
        })
    }
}

/// Votes tallied per validator-count choice. Singleton record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorsCount {
    pub votes: Vec<i64>,
}

impl Serializable for ValidatorsCount {
    fn size(&self) -> usize {
        helper::get_var_size(self.votes.len() as u64) + self.votes.len() * 8
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_array_with(&self.votes, |w, v| w.write_i64(*v));
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            votes: reader.read_array_with(MAX_VALIDATOR_SLOTS, |r| r.read_i64())?,
        })
    }
}
