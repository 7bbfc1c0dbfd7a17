// Copyright (C) 2015-2025 The Neo Project.
//
// rocksdb_store.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! RocksDB-backed store, the default production backend.

use crate::{
    BatchOperation, ReadStore, SeekDirection, StorageError, StorageResult, Store,
};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::info;

/// A store persisted through RocksDB.
pub struct RocksDbStore {
    db: DB,
}

impl RocksDbStore {
    /// Opens (creating if necessary) a database at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let db = DB::open(&options, path).map_err(|e| StorageError::Backend(e.to_string()))?;
        info!(path = %path.display(), "opened rocksdb store");
        Ok(Self { db })
    }
}

impl ReadStore for RocksDbStore {
    fn try_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.db.get(key).ok().flatten()
    }

    fn find(
        &self,
        prefix: &[u8],
        direction: SeekDirection,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_> {
        // The backward scan still needs every prefixed key, so both
        // directions walk forward from the prefix and the backward case
        // reverses the collected run.
        let iterator = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));
        let prefix_owned = prefix.to_vec();
        let entries: Vec<(Vec<u8>, Vec<u8>)> = iterator
            .filter_map(Result::ok)
            .take_while(move |(key, _)| key.starts_with(&prefix_owned))
            .map(|(key, value)| (key.to_vec(), value.to_vec()))
            .collect();
        match direction {
            SeekDirection::Forward => Box::new(entries.into_iter()),
            SeekDirection::Backward => Box::new(entries.into_iter().rev()),
        }
    }
}

impl Store for RocksDbStore {
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.db
            .put(key, value)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.db
            .delete(key)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn put_batch(&self, batch: Vec<BatchOperation>) -> StorageResult<()> {
        let mut write_batch = WriteBatch::default();
        for operation in batch {
            match operation {
                BatchOperation::Put { key, value } => write_batch.put(key, value),
                BatchOperation::Delete { key } => write_batch.delete(key),
            }
        }
        self.db
            .write(write_batch)
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_scan() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        store.put(vec![1, 1], vec![0xAA]).unwrap();
        store.put(vec![1, 2], vec![0xBB]).unwrap();
        store.put(vec![9], vec![0xCC]).unwrap();

        assert_eq!(store.try_get(&[1, 1]), Some(vec![0xAA]));
        let scanned: Vec<_> = store.find(&[1], SeekDirection::Forward).collect();
        assert_eq!(scanned.len(), 2);

        store.delete(&[1, 1]).unwrap();
        assert_eq!(store.try_get(&[1, 1]), None);
    }

    #[test]
    fn test_batch_atomicity() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        store
            .put_batch(vec![
                BatchOperation::Put {
                    key: vec![1],
                    value: vec![1],
                },
                BatchOperation::Put {
                    key: vec![2],
                    value: vec![2],
                },
            ])
            .unwrap();
        assert!(store.contains(&[1]) && store.contains(&[2]));
    }
}
