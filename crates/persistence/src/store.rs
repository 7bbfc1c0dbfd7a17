// Copyright (C) 2015-2025 The Neo Project.
//
// store.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Store traits and the in-memory backend.

use crate::StorageResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Direction of a prefix scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// One entry of a write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Read access to a key-value store.
pub trait ReadStore: Send + Sync {
    /// Fetches the value at `key`, if present.
    fn try_get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Whether `key` is present.
    fn contains(&self, key: &[u8]) -> bool {
        self.try_get(key).is_some()
    }

    /// Entries whose keys start with `prefix`, in lexicographic key order
    /// (reverse order when scanning backward).
    fn find(
        &self,
        prefix: &[u8],
        direction: SeekDirection,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>;
}

/// Full read-write access to a key-value store.
///
/// Writers take `&self`; backends are internally synchronized so the
/// ledger domain can share the store behind an `Arc`.
pub trait Store: ReadStore {
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()>;

    fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Applies a batch atomically.
    fn put_batch(&self, batch: Vec<BatchOperation>) -> StorageResult<()>;
}

/// Smallest key strictly greater than every key starting with `prefix`,
/// or `None` when the prefix is all 0xFF.
fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(upper);
        }
        upper.pop();
    }
    None
}

/// A BTreeMap-backed store used by tests and light deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl ReadStore for MemoryStore {
    fn try_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    fn contains(&self, key: &[u8]) -> bool {
        self.entries.read().contains_key(key)
    }

    fn find(
        &self,
        prefix: &[u8],
        direction: SeekDirection,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_> {
        let entries = self.entries.read();
        let upper = prefix_upper_bound(prefix);
        let range: Vec<(Vec<u8>, Vec<u8>)> = match &upper {
            Some(end) => entries
                .range::<[u8], _>((Bound::Included(prefix), Bound::Excluded(end.as_slice())))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            None => entries
                .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        match direction {
            SeekDirection::Forward => Box::new(range.into_iter()),
            SeekDirection::Backward => Box::new(range.into_iter().rev()),
        }
    }
}

impl Store for MemoryStore {
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> StorageResult<()> {
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn put_batch(&self, batch: Vec<BatchOperation>) -> StorageResult<()> {
        let mut entries = self.entries.write();
        for operation in batch {
            match operation {
                BatchOperation::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = MemoryStore::new();
        store.put(vec![1, 2], vec![3]).unwrap();
        assert_eq!(store.try_get(&[1, 2]), Some(vec![3]));
        assert!(store.contains(&[1, 2]));
        store.delete(&[1, 2]).unwrap();
        assert_eq!(store.try_get(&[1, 2]), None);
    }

    #[test]
    fn test_find_prefix_scan() {
        let store = MemoryStore::new();
        store.put(vec![1, 1], vec![1]).unwrap();
        store.put(vec![1, 2], vec![2]).unwrap();
        store.put(vec![2, 0], vec![3]).unwrap();

        let forward: Vec<_> = store.find(&[1], SeekDirection::Forward).collect();
        assert_eq!(forward, vec![(vec![1, 1], vec![1]), (vec![1, 2], vec![2])]);

        let backward: Vec<_> = store.find(&[1], SeekDirection::Backward).collect();
        assert_eq!(backward, vec![(vec![1, 2], vec![2]), (vec![1, 1], vec![1])]);
    }

    #[test]
    fn test_find_high_prefix() {
        let store = MemoryStore::new();
        store.put(vec![0xFF, 0x01], vec![1]).unwrap();
        store.put(vec![0xFE], vec![2]).unwrap();
        let found: Vec<_> = store.find(&[0xFF], SeekDirection::Forward).collect();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_batch_is_applied_in_order() {
        let store = MemoryStore::new();
        store
            .put_batch(vec![
                BatchOperation::Put {
                    key: vec![1],
                    value: vec![1],
                },
                BatchOperation::Delete { key: vec![1] },
                BatchOperation::Put {
                    key: vec![2],
                    value: vec![2],
                },
            ])
            .unwrap();
        assert_eq!(store.try_get(&[1]), None);
        assert_eq!(store.try_get(&[2]), Some(vec![2]));
    }
}
