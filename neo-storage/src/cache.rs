//! LRU-cached storage façade.
//!
//! Reads are read-through: a cache miss falls back to the backing store and a
//! present result is inserted. Commits update the cache for the whole change
//! set first, then forward the change set to the backing store, all under a
//! writer lock, so a reader observes either the state before the commit or
//! the state after it.
//!
//! A failed backing commit leaves the cache ahead of the backing store. From
//! then on every operation fails with [`StorageError::Inconsistent`].

use crate::change::{CacheOp, ChangeSet, EntityValue};
use crate::entity::{RangeEntity, ScanEntity, StorageEntity};
use crate::traits::{
    CommitStorage, EntityIter, ReadAllStorage, ReadGetAllStorage, ReadSettings, ReadStorage,
};
use crate::{StorageError, StorageResult};
use lru::LruCache;
use neo_primitives::UInt256;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, warn};

/// Bookkeeping charged to every entry on top of key and value bytes.
const ENTRY_OVERHEAD: usize = 64;

struct CacheEntry {
    /// `None` marks a deleted key.
    value: Option<EntityValue>,
    charge: usize,
}

struct LruState {
    entries: LruCache<Vec<u8>, CacheEntry>,
    bytes: usize,
    budget: usize,
}

impl LruState {
    fn new(budget: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            bytes: 0,
            budget,
        }
    }

    fn put(&mut self, key: Vec<u8>, value: Option<EntityValue>) {
        let charge = key.len() + value.as_ref().map_or(0, EntityValue::size) + ENTRY_OVERHEAD;
        if let Some(old) = self.entries.put(key, CacheEntry { value, charge }) {
            self.bytes -= old.charge;
        }
        self.bytes += charge;
        while self.bytes > self.budget {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.bytes -= evicted.charge,
                None => break,
            }
        }
    }

    /// `None` on a miss, `Some(None)` on a tombstone.
    fn lookup<E: StorageEntity>(&mut self, key: &[u8]) -> Option<StorageResult<Option<E::Value>>> {
        let entry = self.entries.get(key)?;
        Some(match &entry.value {
            None => Ok(None),
            Some(value) => E::from_entity_value(value)
                .map(Some)
                .ok_or_else(|| StorageError::corrupt(E::NAME, "cached value has another entity type")),
        })
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }
}

/// Cache-backed façade over any storage implementing the capability traits.
pub struct CachedStorage<S> {
    backing: S,
    commit_lock: RwLock<()>,
    cache: Mutex<LruState>,
    poisoned: Mutex<Option<String>>,
}

impl<S> CachedStorage<S> {
    /// Wraps `backing` with a cache holding at most `budget_bytes`.
    pub fn new(backing: S, budget_bytes: usize) -> Self {
        Self {
            backing,
            commit_lock: RwLock::new(()),
            cache: Mutex::new(LruState::new(budget_bytes)),
            poisoned: Mutex::new(None),
        }
    }

    pub fn backing(&self) -> &S {
        &self.backing
    }

    /// Bytes currently charged against the budget.
    pub fn cached_bytes(&self) -> usize {
        self.cache.lock().bytes
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().entries.len()
    }

    fn ensure_consistent(&self) -> StorageResult<()> {
        match self.poisoned.lock().as_ref() {
            Some(message) => Err(StorageError::Inconsistent {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl<S: ReadStorage> ReadStorage for CachedStorage<S> {
    fn try_get<E: StorageEntity>(&self, key: &E::Key) -> StorageResult<Option<E::Value>> {
        let _guard = self.commit_lock.read();
        self.ensure_consistent()?;

        let cache_key = E::storage_key(key);
        let hit = self.cache.lock().lookup::<E>(&cache_key);
        if let Some(result) = hit {
            return result;
        }

        let value = self.backing.try_get::<E>(key)?;
        if let Some(value) = &value {
            self.cache
                .lock()
                .put(cache_key, Some(E::into_entity_value(value.clone())));
        }
        Ok(value)
    }
}

impl<S: ReadAllStorage> ReadAllStorage for CachedStorage<S> {
    fn all<E: ScanEntity>(&self) -> StorageResult<EntityIter<'_, E::Value>> {
        let _guard = self.commit_lock.read();
        self.ensure_consistent()?;
        self.backing.all::<E>()
    }
}

impl<S: ReadGetAllStorage> ReadGetAllStorage for CachedStorage<S> {
    fn get_all<E: RangeEntity>(&self, range: &E::Range) -> StorageResult<EntityIter<'_, E::Value>> {
        let _guard = self.commit_lock.read();
        self.ensure_consistent()?;
        self.backing.get_all::<E>(range)
    }
}

impl<S: ReadSettings> ReadSettings for CachedStorage<S> {
    fn max_header_hash(&self) -> StorageResult<Option<UInt256>> {
        let _guard = self.commit_lock.read();
        self.ensure_consistent()?;
        self.backing.max_header_hash()
    }

    fn max_block_hash(&self) -> StorageResult<Option<UInt256>> {
        let _guard = self.commit_lock.read();
        self.ensure_consistent()?;
        self.backing.max_block_hash()
    }
}

impl<S: CommitStorage> CommitStorage for CachedStorage<S> {
    fn commit(&self, changes: &ChangeSet) -> StorageResult<()> {
        let _guard = self.commit_lock.write();
        self.ensure_consistent()?;

        {
            let mut cache = self.cache.lock();
            for op in changes.iter().flat_map(|change| change.cache_ops()) {
                match op {
                    CacheOp::Put { key, value } => cache.put(key, Some(value)),
                    CacheOp::Tombstone { key } => cache.put(key, None),
                }
            }
        }

        if let Err(err) = self.backing.commit(changes) {
            error!(
                %err,
                changes = changes.len(),
                "Backing store commit failed; refusing further storage access"
            );
            *self.poisoned.lock() = Some(err.to_string());
            return Err(StorageError::Inconsistent {
                message: err.to_string(),
            });
        }
        debug!(changes = changes.len(), "Committed change set");
        Ok(())
    }

    fn reset(&self) -> StorageResult<()> {
        let _guard = self.commit_lock.write();
        warn!("Resetting storage");
        self.cache.lock().clear();
        self.backing.reset()?;
        *self.poisoned.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Change;
    use crate::entity::AccountTable;
    use crate::{LedgerStore, MemoryStore};
    use neo_core::Account;
    use neo_primitives::UInt160;
    use std::sync::Arc;

    fn account(n: u8) -> Account {
        Account::new(UInt160::from_raw([n; 20]))
    }

    #[test]
    fn budget_bounds_cached_bytes() {
        let backing = LedgerStore::new(Arc::new(MemoryStore::new()));
        let storage = CachedStorage::new(backing, 1_000);
        let changes: ChangeSet = (0..50)
            .map(|n| Change::Add(EntityValue::Account(account(n))))
            .collect();
        storage.commit(&changes).unwrap();
        assert!(storage.cached_bytes() <= 1_000);
        assert!(storage.cached_entries() < 50);
        // evicted entries still read through
        for n in 0..50 {
            let key = UInt160::from_raw([n; 20]);
            assert_eq!(storage.get::<AccountTable>(&key).unwrap(), account(n));
        }
    }

    #[test]
    fn overwrite_does_not_double_charge() {
        let mut state = LruState::new(10_000);
        let value = EntityValue::Account(account(1));
        state.put(b"a".to_vec(), Some(value.clone()));
        let once = state.bytes;
        state.put(b"a".to_vec(), Some(value));
        assert_eq!(state.bytes, once);
        state.put(b"a".to_vec(), None);
        assert_eq!(state.bytes, 1 + ENTRY_OVERHEAD);
    }
}
