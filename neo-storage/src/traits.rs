//! Storage capability traits.
//!
//! The cached façade and the uncached [`crate::LedgerStore`] implement the
//! same traits, so the façade can wrap any backing implementation.

use crate::change::{ChangeSet, WriteOp};
use crate::entity::{RangeEntity, ScanEntity, StorageEntity};
use crate::{StorageError, StorageResult};
use neo_primitives::UInt256;

/// Raw `(key, value)` pairs in ascending key order.
pub type KvIter<'a> = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;

/// Lazily decoded entity values.
pub type EntityIter<'a, V> = Box<dyn Iterator<Item = StorageResult<V>> + 'a>;

/// The ordered byte-keyed store underneath the ledger.
///
/// `commit` must be atomic: after a crash either every write of the call is
/// durable or none is.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Entries with `min <= key < max`, ascending.
    fn range<'a>(&'a self, min: &[u8], max: &[u8]) -> StorageResult<KvIter<'a>>;

    fn commit(&self, writes: &[WriteOp]) -> StorageResult<()>;

    /// Removes every key. Test and administrative use only.
    fn reset(&self) -> StorageResult<()>;
}

pub trait ReadStorage {
    /// Returns `Ok(None)` when the key is absent.
    fn try_get<E: StorageEntity>(&self, key: &E::Key) -> StorageResult<Option<E::Value>>;

    /// Like [`ReadStorage::try_get`], but absence is a `KeyNotFound` error.
    fn get<E: StorageEntity>(&self, key: &E::Key) -> StorageResult<E::Value> {
        self.try_get::<E>(key)?
            .ok_or_else(|| StorageError::key_not_found(E::NAME, &E::storage_key(key)))
    }
}

pub trait ReadAllStorage: ReadStorage {
    /// Every value of the table in key order. Not served from the cache.
    fn all<E: ScanEntity>(&self) -> StorageResult<EntityIter<'_, E::Value>>;
}

pub trait ReadGetAllStorage: ReadAllStorage {
    /// Values selected by `range`, in key order. Not served from the cache.
    fn get_all<E: RangeEntity>(&self, range: &E::Range) -> StorageResult<EntityIter<'_, E::Value>>;
}

/// Chain tip settings written alongside headers and blocks.
pub trait ReadSettings {
    fn max_header_hash(&self) -> StorageResult<Option<UInt256>>;

    fn max_block_hash(&self) -> StorageResult<Option<UInt256>>;
}

pub trait CommitStorage {
    /// Applies every change or none.
    fn commit(&self, changes: &ChangeSet) -> StorageResult<()>;

    fn reset(&self) -> StorageResult<()>;
}
