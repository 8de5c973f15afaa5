//! In-memory ordered backend.

use crate::change::WriteOp;
use crate::traits::{KeyValueStore, KvIter};
use crate::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A `BTreeMap` behind a lock. Commits apply under one write lock, so they
/// are atomic with respect to readers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn range<'a>(&'a self, min: &[u8], max: &[u8]) -> StorageResult<KvIter<'a>> {
        if min >= max {
            return Ok(Box::new(std::iter::empty()));
        }
        // snapshot, so the lock is not held while the caller iterates
        let rows: Vec<_> = self
            .data
            .read()
            .range(min.to_vec()..max.to_vec())
            .map(|(k, v)| Ok((k.clone(), v.clone())))
            .collect();
        Ok(Box::new(rows.into_iter()))
    }

    fn commit(&self, writes: &[WriteOp]) -> StorageResult<()> {
        let mut data = self.data.write();
        for write in writes {
            match write {
                WriteOp::Put { key, value } => {
                    data.insert(key.clone(), value.clone());
                }
                WriteOp::Delete { key } => {
                    data.remove(key);
                }
            }
        }
        Ok(())
    }

    fn reset(&self) -> StorageResult<()> {
        self.data.write().clear();
        Ok(())
    }
}
