//! Keyed ledger storage for the Neo node.
//!
//! Entities are addressed through typed table markers ([`entity`]) and
//! persisted under the key space defined in [`keys`]. [`LedgerStore`] maps
//! them onto any ordered [`KeyValueStore`]; [`CachedStorage`] wraps a
//! backing implementation with a byte-bounded LRU and atomic commits.
//!
//! ```no_run
//! use neo_storage::{CachedStorage, LedgerStore, MemoryStore, ReadStorage, AccountTable};
//! use neo_primitives::UInt160;
//! use std::sync::Arc;
//!
//! let storage = CachedStorage::new(LedgerStore::new(Arc::new(MemoryStore::new())), 1 << 20);
//! let account = storage.try_get::<AccountTable>(&UInt160::zero()).unwrap();
//! assert!(account.is_none());
//! ```

pub mod cache;
pub mod change;
pub mod entity;
pub mod error;
pub mod keys;
pub mod ledger_store;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;
pub mod traits;

pub use cache::CachedStorage;
pub use change::{Change, ChangeSet, EntityKey, EntityValue, OutputRecord, StorageItemKey, WriteOp};
pub use entity::{
    AccountTable, AccountUnclaimedTable, AccountUnspentTable, ActionRange, ActionTable,
    AssetTable, BlockDataTable, BlockKey, BlockTable, ContractTable, HeaderTable,
    InvocationDataTable, OutputTable, RangeEntity, ScanEntity, StorageEntity, StorageItemRange,
    StorageItemTable, TransactionDataTable, TransactionTable, ValidatorTable, ValidatorsCountTable,
};
pub use error::{StorageError, StorageResult};
pub use keys::KeyPrefix;
pub use ledger_store::LedgerStore;
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb")]
pub use crate::rocksdb::RocksDbStore;
pub use traits::{
    CommitStorage, EntityIter, KeyValueStore, KvIter, ReadAllStorage, ReadGetAllStorage,
    ReadSettings, ReadStorage,
};
