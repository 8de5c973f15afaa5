//! Typed, uncached ledger access over a [`KeyValueStore`].

use crate::change::{to_write_ops, ChangeSet};
use crate::entity::{RangeEntity, ScanEntity, StorageEntity};
use crate::keys;
use crate::traits::{
    CommitStorage, EntityIter, KeyValueStore, ReadAllStorage, ReadGetAllStorage, ReadSettings,
    ReadStorage,
};
use crate::{StorageError, StorageResult};
use neo_primitives::UInt256;
use std::sync::Arc;
use tracing::debug;

/// Decodes entities out of a raw key/value store and turns change sets into
/// physical writes.
pub struct LedgerStore<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: KeyValueStore + ?Sized> LedgerStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn scan<E: StorageEntity>(&self, min: Vec<u8>, max: Vec<u8>) -> StorageResult<EntityIter<'_, E::Value>> {
        let rows = self.backend.range(&min, &max)?;
        Ok(Box::new(
            rows.map(|row| row.and_then(|(_, value)| E::decode(&value))),
        ))
    }

    fn read_hash_setting(&self, key: &[u8]) -> StorageResult<Option<UInt256>> {
        self.backend
            .get(key)?
            .map(|bytes| {
                UInt256::from_bytes(&bytes).map_err(|e| StorageError::corrupt("settings", e.to_string()))
            })
            .transpose()
    }
}

impl<B: ?Sized> Clone for LedgerStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: KeyValueStore + ?Sized> ReadStorage for LedgerStore<B> {
    fn try_get<E: StorageEntity>(&self, key: &E::Key) -> StorageResult<Option<E::Value>> {
        E::read_from(self.backend.as_ref(), key)
    }
}

impl<B: KeyValueStore + ?Sized> ReadAllStorage for LedgerStore<B> {
    fn all<E: ScanEntity>(&self) -> StorageResult<EntityIter<'_, E::Value>> {
        self.scan::<E>(E::PREFIX.min_key(), E::PREFIX.max_key())
    }
}

impl<B: KeyValueStore + ?Sized> ReadGetAllStorage for LedgerStore<B> {
    fn get_all<E: RangeEntity>(&self, range: &E::Range) -> StorageResult<EntityIter<'_, E::Value>> {
        let (min, max) = E::bounds(range);
        self.scan::<E>(min, max)
    }
}

impl<B: KeyValueStore + ?Sized> ReadSettings for LedgerStore<B> {
    fn max_header_hash(&self) -> StorageResult<Option<UInt256>> {
        self.read_hash_setting(&keys::max_header_hash_key())
    }

    fn max_block_hash(&self) -> StorageResult<Option<UInt256>> {
        self.read_hash_setting(&keys::max_block_hash_key())
    }
}

impl<B: KeyValueStore + ?Sized> CommitStorage for LedgerStore<B> {
    fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        let writes = to_write_ops(changes);
        debug!(changes = changes.len(), writes = writes.len(), "Committing change set");
        self.backend.commit(&writes)
    }

    fn reset(&self) -> StorageResult<()> {
        self.backend.reset()
    }
}
