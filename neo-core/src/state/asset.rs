use super::MAX_STRING;
use neo_crypto::ECPoint;
use neo_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use neo_primitives::{UInt160, UInt256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub hash: UInt256,
    pub asset_type: u8,
    pub name: String,
    /// Fixed8 total supply; `-1` means unlimited.
    pub amount: i64,
    pub available: i64,
    pub precision: u8,
    pub owner: ECPoint,
    pub admin: UInt160,
    pub issuer: UInt160,
    pub expiration: u32,
    pub is_frozen: bool,
}

impl Serializable for Asset {
    fn size(&self) -> usize {
        32 + 1
            + helper::get_var_bytes_size(self.name.as_bytes())
            + 8
            + 8
            + 1
            + self.owner.size()
            + 20
            + 20
            + 4
            + 1
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint256(&self.hash);
        writer.write_u8(self.asset_type);
        writer.write_var_string(&self.name);
        writer.write_i64(self.amount);
        writer.write_i64(self.available);
        writer.write_u8(self.precision);
        self.owner.serialize(writer);
        writer.write_uint160(&self.admin);
        writer.write_uint160(&self.issuer);
        writer.write_u32(self.expiration);
        writer.write_bool(self.is_frozen);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            hash: reader.read_uint256()?,
            asset_type: reader.read_u8()?,
            name: reader.read_var_string(MAX_STRING)?,
            amount: reader.read_i64()?,
            available: reader.read_i64()?,
            precision: reader.read_u8()?,
            owner: ECPoint::deserialize(reader)?,
            admin: reader.read_uint160()?,
            issuer: reader.read_uint160()?,
            expiration: reader.read_u32()?,
            is_frozen: reader.read_bool()?,
        })
    }
}
