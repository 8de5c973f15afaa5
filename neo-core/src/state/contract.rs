use super::MAX_STRING;
use crate::MAX_SCRIPT_SIZE;
use neo_crypto::Crypto;
use neo_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use neo_primitives::UInt160;

const MAX_PARAMETERS: usize = 252;
const MAX_STORAGE_KEY: usize = 1024;
const MAX_STORAGE_VALUE: usize = 0x10_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub script: Vec<u8>,
    pub parameter_list: Vec<u8>,
    pub return_type: u8,
    pub properties: u8,
    pub name: String,
    pub code_version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

impl Contract {
    pub fn hash(&self) -> UInt160 {
        Crypto::hash160_uint(&self.script)
    }

    fn strings(&self) -> [&str; 5] {
        [
            self.name.as_str(),
            self.code_version.as_str(),
            self.author.as_str(),
            self.email.as_str(),
            self.description.as_str(),
        ]
    }
}

impl Serializable for Contract {
    fn size(&self) -> usize {
        helper::get_var_bytes_size(&self.script)
            + helper::get_var_bytes_size(&self.parameter_list)
            + 2
            + self
                .strings()
                .iter()
                .map(|s| helper::get_var_bytes_size(s.as_bytes()))
                .sum::<usize>()
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_var_bytes(&self.script);
        writer.write_var_bytes(&self.parameter_list);
        writer.write_u8(self.return_type);
        writer.write_u8(self.properties);
        for s in self.strings() {
            writer.write_var_string(s);
        }
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            script: reader.read_var_bytes(MAX_SCRIPT_SIZE)?,
            parameter_list: reader.read_var_bytes(MAX_PARAMETERS)?,
            return_type: reader.read_u8()?,
            properties: reader.read_u8()?,
            name: reader.read_var_string(MAX_STRING)?,
            code_version: reader.read_var_string(MAX_STRING)?,
            author: reader.read_var_string(MAX_STRING)?,
            email: reader.read_var_string(MAX_STRING)?,
            description: reader.read_var_string(MAX_STRING)?,
        })
    }
}

/// A value in a contract's key/value storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageItem {
    pub hash: UInt160,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub is_constant: bool,
}

impl Serializable for StorageItem {
    fn size(&self) -> usize {
        20 + helper::get_var_bytes_size(&self.key) + helper::get_var_bytes_size(&self.value) + 1
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint160(&self.hash);
        writer.write_var_bytes(&self.key);
        writer.write_var_bytes(&self.value);
        writer.write_bool(self.is_constant);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            hash: reader.read_uint160()?,
            key: reader.read_var_bytes(MAX_STORAGE_KEY)?,
            value: reader.read_var_bytes(MAX_STORAGE_VALUE)?,
            is_constant: reader.read_bool()?,
        })
    }
}
