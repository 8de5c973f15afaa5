//! RocksDB backend.

use crate::change::WriteOp;
use crate::traits::{KeyValueStore, KvIter};
use crate::{StorageError, StorageResult};
use rocksdb::{DBCompressionType, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct RocksDbStore {
    db: Arc<DB>,
}

fn backend_error(err: rocksdb::Error) -> StorageError {
    StorageError::backend(err.to_string())
}

impl RocksDbStore {
    /// Opens the database at `path`, creating it when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(DBCompressionType::Lz4);

        let db = DB::open(&opts, path.as_ref())
            .map_err(|e| StorageError::backend(format!("Failed to open RocksDB: {e}")))?;
        info!(path = %path.as_ref().display(), "Opened RocksDB store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.db.get(key).map_err(backend_error)
    }

    fn range<'a>(&'a self, min: &[u8], max: &[u8]) -> StorageResult<KvIter<'a>> {
        if min >= max {
            return Ok(Box::new(std::iter::empty()));
        }
        let max = max.to_vec();
        let rows = self
            .db
            .iterator(IteratorMode::From(min, Direction::Forward))
            .map(|row| {
                row.map(|(key, value)| (key.into_vec(), value.into_vec()))
                    .map_err(backend_error)
            })
            .take_while(move |row| match row {
                Ok((key, _)) => key.as_slice() < max.as_slice(),
                Err(_) => true,
            });
        Ok(Box::new(rows))
    }

    fn commit(&self, writes: &[WriteOp]) -> StorageResult<()> {
        let mut batch = WriteBatch::default();
        for write in writes {
            match write {
                WriteOp::Put { key, value } => batch.put(key, value),
                WriteOp::Delete { key } => batch.delete(key),
            }
        }
        self.db.write(batch).map_err(backend_error)
    }

    fn reset(&self) -> StorageResult<()> {
        let mut batch = WriteBatch::default();
        for row in self.db.iterator(IteratorMode::Start) {
            let (key, _) = row.map_err(backend_error)?;
            batch.delete(key);
        }
        self.db.write(batch).map_err(backend_error)
    }
}
