//! Change sets: the unit of atomic storage update.

use crate::keys;
use neo_core::{
    Account, AccountInput, Action, Asset, Block, BlockData, Contract, Header, InvocationData,
    Output, StorageItem, Transaction, TransactionData, Validator, ValidatorsCount,
};
use neo_crypto::ECPoint;
use neo_io::{BinaryWriter, IoResult, MemoryReader, Serializable, SerializableExt};
use neo_primitives::{UInt160, UInt256};

/// A transaction output together with the position that addresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRecord {
    pub hash: UInt256,
    pub index: u16,
    pub output: Output,
}

impl Serializable for OutputRecord {
    fn size(&self) -> usize {
        32 + 2 + self.output.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_uint256(&self.hash);
        writer.write_u16(self.index);
        self.output.serialize(writer);
    }

    fn deserialize(reader: &mut MemoryReader) -> IoResult<Self> {
        Ok(Self {
            hash: reader.read_uint256()?,
            index: reader.read_u16()?,
            output: Output::deserialize(reader)?,
        })
    }
}

/// Key of a contract storage item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageItemKey {
    pub hash: UInt160,
    pub key: Vec<u8>,
}

/// A value of any persisted entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValue {
    Header(Header),
    Block(Block),
    BlockData(BlockData),
    Account(Account),
    AccountUnspent(AccountInput),
    AccountUnclaimed(AccountInput),
    Action(Action),
    Asset(Asset),
    Transaction(Transaction),
    TransactionData(TransactionData),
    Output(OutputRecord),
    Contract(Contract),
    StorageItem(StorageItem),
    Validator(Validator),
    InvocationData(InvocationData),
    ValidatorsCount(ValidatorsCount),
}

impl EntityValue {
    /// Encoded size, used for cache budgeting.
    pub fn size(&self) -> usize {
        match self {
            Self::Header(v) => v.size(),
            Self::Block(v) => v.size(),
            Self::BlockData(v) => v.size(),
            Self::Account(v) => v.size(),
            Self::AccountUnspent(v) | Self::AccountUnclaimed(v) => v.size(),
            Self::Action(v) => v.size(),
            Self::Asset(v) => v.size(),
            Self::Transaction(v) => v.size(),
            Self::TransactionData(v) => v.size(),
            Self::Output(v) => v.size(),
            Self::Contract(v) => v.size(),
            Self::StorageItem(v) => v.size(),
            Self::Validator(v) => v.size(),
            Self::InvocationData(v) => v.size(),
            Self::ValidatorsCount(v) => v.size(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Header(v) => v.to_array(),
            Self::Block(v) => v.to_array(),
            Self::BlockData(v) => v.to_array(),
            Self::Account(v) => v.to_array(),
            Self::AccountUnspent(v) | Self::AccountUnclaimed(v) => v.to_array(),
            Self::Action(v) => v.to_array(),
            Self::Asset(v) => v.to_array(),
            Self::Transaction(v) => v.to_array(),
            Self::TransactionData(v) => v.to_array(),
            Self::Output(v) => v.to_array(),
            Self::Contract(v) => v.to_array(),
            Self::StorageItem(v) => v.to_array(),
            Self::Validator(v) => v.to_array(),
            Self::InvocationData(v) => v.to_array(),
            Self::ValidatorsCount(v) => v.to_array(),
        }
    }

    /// Storage key of the primary record.
    pub fn key(&self) -> Vec<u8> {
        match self {
            Self::Header(v) => keys::header_key(&v.hash()),
            Self::Block(v) => keys::block_key(&v.hash()),
            Self::BlockData(v) => keys::block_data_key(&v.hash),
            Self::Account(v) => keys::account_key(&v.script_hash),
            Self::AccountUnspent(v) => keys::account_unspent_key(&v.hash, &v.input),
            Self::AccountUnclaimed(v) => keys::account_unclaimed_key(&v.hash, &v.input),
            Self::Action(v) => keys::action_key(v.index),
            Self::Asset(v) => keys::asset_key(&v.hash),
            Self::Transaction(v) => keys::transaction_key(&v.hash()),
            Self::TransactionData(v) => keys::transaction_data_key(&v.hash),
            Self::Output(v) => keys::output_key(&v.hash, v.index),
            Self::Contract(v) => keys::contract_key(&v.hash()),
            Self::StorageItem(v) => keys::storage_item_key(&v.hash, &v.key),
            Self::Validator(v) => keys::validator_key(&v.public_key),
            Self::InvocationData(v) => keys::invocation_data_key(&v.hash),
            Self::ValidatorsCount(_) => keys::validators_count_key(),
        }
    }
}

/// Key of an entity type that supports deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    Account(UInt160),
    AccountUnspent(AccountInput),
    AccountUnclaimed(AccountInput),
    Contract(UInt160),
    StorageItem(StorageItemKey),
    Validator(ECPoint),
}

impl EntityKey {
    pub fn key(&self) -> Vec<u8> {
        match self {
            Self::Account(hash) => keys::account_key(hash),
            Self::AccountUnspent(v) => keys::account_unspent_key(&v.hash, &v.input),
            Self::AccountUnclaimed(v) => keys::account_unclaimed_key(&v.hash, &v.input),
            Self::Contract(hash) => keys::contract_key(hash),
            Self::StorageItem(k) => keys::storage_item_key(&k.hash, &k.key),
            Self::Validator(public_key) => keys::validator_key(public_key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Add(EntityValue),
    Delete(EntityKey),
}

/// Ordered changes applied as one atomic unit.
pub type ChangeSet = Vec<Change>;

/// A cache mutation derived from a change.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CacheOp {
    Put { key: Vec<u8>, value: EntityValue },
    Tombstone { key: Vec<u8> },
}

/// A physical write for the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl WriteOp {
    pub fn key(&self) -> &[u8] {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

impl Change {
    /// Cache entries this change produces. Headers and blocks produce two:
    /// one under the hash key, one under the index key.
    pub(crate) fn cache_ops(&self) -> Vec<CacheOp> {
        match self {
            Change::Add(value) => {
                let mut ops = vec![CacheOp::Put {
                    key: value.key(),
                    value: value.clone(),
                }];
                if let Some(index_key) = index_key(value) {
                    ops.push(CacheOp::Put {
                        key: index_key,
                        value: value.clone(),
                    });
                }
                ops
            }
            Change::Delete(key) => vec![CacheOp::Tombstone { key: key.key() }],
        }
    }

    /// Physical writes this change produces. Headers and blocks also write an
    /// index-to-hash entry and advance the matching max-hash setting.
    pub fn write_ops(&self) -> Vec<WriteOp> {
        match self {
            Change::Add(value) => {
                let mut ops = vec![WriteOp::Put {
                    key: value.key(),
                    value: value.to_bytes(),
                }];
                let tip = match value {
                    EntityValue::Header(h) => Some((h.hash(), keys::max_header_hash_key())),
                    EntityValue::Block(b) => Some((b.hash(), keys::max_block_hash_key())),
                    _ => None,
                };
                if let (Some(index_key), Some((hash, setting))) = (index_key(value), tip) {
                    ops.push(WriteOp::Put {
                        key: index_key,
                        value: hash.to_vec(),
                    });
                    ops.push(WriteOp::Put {
                        key: setting,
                        value: hash.to_vec(),
                    });
                }
                ops
            }
            Change::Delete(key) => vec![WriteOp::Delete { key: key.key() }],
        }
    }
}

fn index_key(value: &EntityValue) -> Option<Vec<u8>> {
    match value {
        EntityValue::Header(h) => Some(keys::header_index_key(h.index)),
        EntityValue::Block(b) => Some(keys::block_index_key(b.index())),
        _ => None,
    }
}

/// Flattens a change set into physical writes, preserving order.
pub fn to_write_ops(changes: &[Change]) -> Vec<WriteOp> {
    changes.iter().flat_map(Change::write_ops).collect()
}
