//! Typed views of the key space.
//!
//! Each persisted entity type is a zero-sized table marker implementing
//! [`StorageEntity`]. The capability traits in [`crate::traits`] are generic
//! over these markers, so which operations an entity supports is decided by
//! the traits its marker implements:
//!
//! | Capability | Tables |
//! |------------|--------|
//! | `get` / `try_get` | all |
//! | `all` ([`ScanEntity`]) | account, asset, contract, validator, and every range table |
//! | `get_all` ([`RangeEntity`]) | account unspent/unclaimed, action, storage item |

use crate::change::{EntityValue, OutputRecord, StorageItemKey};
use crate::keys::{self, KeyPrefix};
use crate::traits::KeyValueStore;
use crate::{StorageError, StorageResult};
use neo_core::{
    Account, AccountInput, Action, Asset, Block, BlockData, Contract, Header, InvocationData,
    StorageItem, Transaction, TransactionData, Validator, ValidatorsCount,
};
use neo_crypto::ECPoint;
use neo_io::{Serializable, SerializableExt};
use neo_primitives::{UInt160, UInt256};

pub trait StorageEntity: 'static {
    type Key;
    type Value: Serializable + Clone + Send + 'static;
    const NAME: &'static str;

    fn storage_key(key: &Self::Key) -> Vec<u8>;

    fn into_entity_value(value: Self::Value) -> EntityValue;

    fn from_entity_value(value: &EntityValue) -> Option<Self::Value>;

    fn decode(bytes: &[u8]) -> StorageResult<Self::Value> {
        <Self::Value as SerializableExt>::from_array(bytes)
            .map_err(|e| StorageError::corrupt(Self::NAME, e.to_string()))
    }

    /// Reads one value straight from a backing store.
    fn read_from<B: KeyValueStore + ?Sized>(
        store: &B,
        key: &Self::Key,
    ) -> StorageResult<Option<Self::Value>> {
        read_direct::<Self, B>(store, &Self::storage_key(key))
    }
}

fn read_direct<E: StorageEntity + ?Sized, B: KeyValueStore + ?Sized>(
    store: &B,
    key: &[u8],
) -> StorageResult<Option<E::Value>> {
    store.get(key)?.map(|bytes| E::decode(&bytes)).transpose()
}

/// Entities whose whole table can be scanned.
pub trait ScanEntity: StorageEntity {
    const PREFIX: KeyPrefix;
}

/// Entities with a parameterised range query.
pub trait RangeEntity: ScanEntity {
    type Range;

    /// Half-open `[min, max)` key bounds for `range`.
    fn bounds(range: &Self::Range) -> (Vec<u8>, Vec<u8>);
}

/// Headers and blocks are addressable by hash or by height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKey {
    Hash(UInt256),
    Index(u32),
}

impl From<UInt256> for BlockKey {
    fn from(hash: UInt256) -> Self {
        BlockKey::Hash(hash)
    }
}

impl From<u32> for BlockKey {
    fn from(index: u32) -> Self {
        BlockKey::Index(index)
    }
}

/// Follows an index entry to the hash-keyed record.
fn read_by_index<E, B>(store: &B, index_key: &[u8], hash_key: fn(&UInt256) -> Vec<u8>)
    -> StorageResult<Option<E::Value>>
where
    E: StorageEntity + ?Sized,
    B: KeyValueStore + ?Sized,
{
    let Some(bytes) = store.get(index_key)? else {
        return Ok(None);
    };
    let hash = UInt256::from_bytes(&bytes).map_err(|e| StorageError::corrupt(E::NAME, e.to_string()))?;
    read_direct::<E, B>(store, &hash_key(&hash))
}

macro_rules! entity_table {
    (
        $(#[$meta:meta])*
        $table:ident, $variant:ident, $value:ty, $key:ty, $name:literal,
        |$k:ident| $storage_key:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $table;

        impl StorageEntity for $table {
            type Key = $key;
            type Value = $value;
            const NAME: &'static str = $name;

            fn storage_key($k: &Self::Key) -> Vec<u8> {
                $storage_key
            }

            fn into_entity_value(value: Self::Value) -> EntityValue {
                EntityValue::$variant(value)
            }

            fn from_entity_value(value: &EntityValue) -> Option<Self::Value> {
                match value {
                    EntityValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderTable;

impl StorageEntity for HeaderTable {
    type Key = BlockKey;
    type Value = Header;
    const NAME: &'static str = "header";

    fn storage_key(key: &BlockKey) -> Vec<u8> {
        match key {
            BlockKey::Hash(hash) => keys::header_key(hash),
            BlockKey::Index(index) => keys::header_index_key(*index),
        }
    }

    fn into_entity_value(value: Header) -> EntityValue {
        EntityValue::Header(value)
    }

    fn from_entity_value(value: &EntityValue) -> Option<Header> {
        match value {
            EntityValue::Header(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn read_from<B: KeyValueStore + ?Sized>(store: &B, key: &BlockKey) -> StorageResult<Option<Header>> {
        match key {
            BlockKey::Hash(hash) => read_direct::<Self, B>(store, &keys::header_key(hash)),
            BlockKey::Index(index) => {
                read_by_index::<Self, B>(store, &keys::header_index_key(*index), keys::header_key)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockTable;

impl StorageEntity for BlockTable {
    type Key = BlockKey;
    type Value = Block;
    const NAME: &'static str = "block";

    fn storage_key(key: &BlockKey) -> Vec<u8> {
        match key {
            BlockKey::Hash(hash) => keys::block_key(hash),
            BlockKey::Index(index) => keys::block_index_key(*index),
        }
    }

    fn into_entity_value(value: Block) -> EntityValue {
        EntityValue::Block(value)
    }

    fn from_entity_value(value: &EntityValue) -> Option<Block> {
        match value {
            EntityValue::Block(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn read_from<B: KeyValueStore + ?Sized>(store: &B, key: &BlockKey) -> StorageResult<Option<Block>> {
        match key {
            BlockKey::Hash(hash) => read_direct::<Self, B>(store, &keys::block_key(hash)),
            BlockKey::Index(index) => {
                read_by_index::<Self, B>(store, &keys::block_index_key(*index), keys::block_key)
            }
        }
    }
}

entity_table!(BlockDataTable, BlockData, BlockData, UInt256, "blockData", |hash| {
    keys::block_data_key(hash)
});
entity_table!(AccountTable, Account, Account, UInt160, "account", |hash| {
    keys::account_key(hash)
});
entity_table!(
    /// Unspent inputs, keyed by owning account plus input.
    AccountUnspentTable, AccountUnspent, AccountInput, AccountInput, "accountUnspent",
    |key| keys::account_unspent_key(&key.hash, &key.input)
);
entity_table!(
    /// Spent but unclaimed inputs, keyed by owning account plus input.
    AccountUnclaimedTable, AccountUnclaimed, AccountInput, AccountInput, "accountUnclaimed",
    |key| keys::account_unclaimed_key(&key.hash, &key.input)
);
entity_table!(ActionTable, Action, Action, u64, "action", |index| {
    keys::action_key(*index)
});
entity_table!(AssetTable, Asset, Asset, UInt256, "asset", |hash| {
    keys::asset_key(hash)
});
entity_table!(TransactionTable, Transaction, Transaction, UInt256, "transaction", |hash| {
    keys::transaction_key(hash)
});
entity_table!(TransactionDataTable, TransactionData, TransactionData, UInt256, "transactionData", |hash| {
    keys::transaction_data_key(hash)
});
entity_table!(
    /// Outputs keyed by `(transaction hash, output index)`.
    OutputTable, Output, OutputRecord, (UInt256, u16), "output",
    |key| keys::output_key(&key.0, key.1)
);
entity_table!(ContractTable, Contract, Contract, UInt160, "contract", |hash| {
    keys::contract_key(hash)
});
entity_table!(StorageItemTable, StorageItem, StorageItem, StorageItemKey, "storageItem", |key| {
    keys::storage_item_key(&key.hash, &key.key)
});
entity_table!(ValidatorTable, Validator, Validator, ECPoint, "validator", |key| {
    keys::validator_key(key)
});
entity_table!(InvocationDataTable, InvocationData, InvocationData, UInt256, "invocationData", |hash| {
    keys::invocation_data_key(hash)
});
entity_table!(
    /// Singleton record; the key is `()`.
    ValidatorsCountTable, ValidatorsCount, ValidatorsCount, (), "validatorsCount",
    |_unit| keys::validators_count_key()
);

impl ScanEntity for AccountTable {
    const PREFIX: KeyPrefix = KeyPrefix::Account;
}

impl ScanEntity for AssetTable {
    const PREFIX: KeyPrefix = KeyPrefix::Asset;
}

impl ScanEntity for ContractTable {
    const PREFIX: KeyPrefix = KeyPrefix::Contract;
}

impl ScanEntity for ValidatorTable {
    const PREFIX: KeyPrefix = KeyPrefix::Validator;
}

impl ScanEntity for AccountUnspentTable {
    const PREFIX: KeyPrefix = KeyPrefix::AccountUnspent;
}

impl ScanEntity for AccountUnclaimedTable {
    const PREFIX: KeyPrefix = KeyPrefix::AccountUnclaimed;
}

impl ScanEntity for ActionTable {
    const PREFIX: KeyPrefix = KeyPrefix::Action;
}

impl ScanEntity for StorageItemTable {
    const PREFIX: KeyPrefix = KeyPrefix::StorageItem;
}

impl RangeEntity for AccountUnspentTable {
    /// Owning account.
    type Range = UInt160;

    fn bounds(hash: &UInt160) -> (Vec<u8>, Vec<u8>) {
        keys::account_input_range(KeyPrefix::AccountUnspent, hash)
    }
}

impl RangeEntity for AccountUnclaimedTable {
    type Range = UInt160;

    fn bounds(hash: &UInt160) -> (Vec<u8>, Vec<u8>) {
        keys::account_input_range(KeyPrefix::AccountUnclaimed, hash)
    }
}

/// Inclusive action index bounds; `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionRange {
    pub start: Option<u64>,
    pub stop: Option<u64>,
}

impl RangeEntity for ActionTable {
    type Range = ActionRange;

    fn bounds(range: &ActionRange) -> (Vec<u8>, Vec<u8>) {
        keys::action_range(range.start, range.stop)
    }
}

/// Storage items of a contract, optionally narrowed by key prefix.
/// Without a contract hash the whole table is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageItemRange {
    pub hash: Option<UInt160>,
    pub prefix: Vec<u8>,
}

impl RangeEntity for StorageItemTable {
    type Range = StorageItemRange;

    fn bounds(range: &StorageItemRange) -> (Vec<u8>, Vec<u8>) {
        keys::storage_item_range(range.hash.as_ref(), &range.prefix)
    }
}
