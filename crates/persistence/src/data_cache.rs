// Copyright (C) 2015-2025 The Neo Project.
//
// data_cache.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The layered write-through snapshot over a base store.
//!
//! Each layer tracks its own changes with a per-entry [`TrackState`];
//! reads fall through untouched layers to the parent and finally the
//! store. `commit` collapses a layer into its parent, or batches the root
//! layer into the backing store. Dropping a layer discards its changes.

use crate::{BatchOperation, SeekDirection, StorageItem, StorageKey, StorageResult, Store};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Lifecycle of one cached entry relative to the layer below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Read through and unchanged.
    None,
    /// Absent below, created here.
    Added,
    /// Present below, overwritten here.
    Changed,
    /// Present below, removed here.
    Deleted,
}

#[derive(Debug, Clone)]
struct Trackable {
    item: Option<StorageItem>,
    state: TrackState,
}

/// One snapshot layer. Clone-of-a-clone nesting is arbitrary; all
/// mutation goes through interior locks so engines can share a layer.
pub struct DataCache {
    store: Arc<dyn Store>,
    parent: Option<Arc<DataCache>>,
    entries: RwLock<HashMap<StorageKey, Trackable>>,
}

impl DataCache {
    /// A root snapshot over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            parent: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A child snapshot whose reads fall through to `parent`.
    pub fn snapshot(parent: &Arc<DataCache>) -> DataCache {
        Self {
            store: Arc::clone(&parent.store),
            parent: Some(Arc::clone(parent)),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Reads `key`, checking this layer, then ancestors, then the store.
    pub fn try_get(&self, key: &StorageKey) -> Option<StorageItem> {
        if let Some(tracked) = self.entries.read().get(key) {
            return match tracked.state {
                TrackState::Deleted => None,
                _ => tracked.item.clone(),
            };
        }
        self.read_below(key)
    }

    fn read_below(&self, key: &StorageKey) -> Option<StorageItem> {
        match &self.parent {
            Some(parent) => parent.try_get(key),
            None => self.store.try_get(&key.to_bytes()).map(StorageItem::new),
        }
    }

    /// Whether `key` is visible from this layer.
    pub fn contains(&self, key: &StorageKey) -> bool {
        if let Some(tracked) = self.entries.read().get(key) {
            return tracked.state != TrackState::Deleted;
        }
        match &self.parent {
            Some(parent) => parent.contains(key),
            None => self.store.contains(&key.to_bytes()),
        }
    }

    /// Writes `key`, recording whether the entry is new or an overwrite.
    pub fn put(&self, key: StorageKey, item: StorageItem) {
        let mut entries = self.entries.write();
        let state = match entries.get(&key).map(|t| t.state) {
            Some(TrackState::Added) => TrackState::Added,
            Some(_) => TrackState::Changed,
            None => {
                if self.read_below(&key).is_some() {
                    TrackState::Changed
                } else {
                    TrackState::Added
                }
            }
        };
        entries.insert(
            key,
            Trackable {
                item: Some(item),
                state,
            },
        );
    }

    /// Deletes `key`. Entries added in this layer vanish; entries from
    /// below are masked with a tombstone.
    pub fn delete(&self, key: &StorageKey) {
        let mut entries = self.entries.write();
        match entries.get(key).map(|t| t.state) {
            Some(TrackState::Added) => {
                entries.remove(key);
            }
            _ => {
                entries.insert(
                    key.clone(),
                    Trackable {
                        item: None,
                        state: TrackState::Deleted,
                    },
                );
            }
        }
    }

    /// Entries whose keys start with `prefix` (an `id ‖ key-prefix` byte
    /// run), merged across every layer, in key order.
    pub fn find(&self, prefix: &[u8], direction: SeekDirection) -> Vec<(StorageKey, StorageItem)> {
        let mut merged: BTreeMap<Vec<u8>, StorageItem> = self
            .store
            .find(prefix, SeekDirection::Forward)
            .map(|(k, v)| (k, StorageItem::new(v)))
            .collect();

        // Overlay layers from oldest ancestor to this one.
        let mut chain: Vec<&DataCache> = Vec::new();
        let mut cursor = Some(self);
        while let Some(layer) = cursor {
            chain.push(layer);
            cursor = layer.parent.as_deref();
        }
        for layer in chain.into_iter().rev() {
            let entries = layer.entries.read();
            for (key, tracked) in entries.iter() {
                let raw = key.to_bytes();
                if !raw.starts_with(prefix) {
                    continue;
                }
                match tracked.state {
                    TrackState::Deleted => {
                        merged.remove(&raw);
                    }
                    _ => {
                        if let Some(item) = &tracked.item {
                            merged.insert(raw, item.clone());
                        }
                    }
                }
            }
        }

        let decode =
            |(raw, item): (Vec<u8>, StorageItem)| StorageKey::from_bytes(&raw).ok().map(|k| (k, item));
        match direction {
            SeekDirection::Forward => merged.into_iter().filter_map(decode).collect(),
            SeekDirection::Backward => merged.into_iter().rev().filter_map(decode).collect(),
        }
    }

    /// All entries of one contract with the given key prefix.
    pub fn find_contract(&self, id: i32, key_prefix: &[u8]) -> Vec<(StorageKey, StorageItem)> {
        let mut prefix = Vec::with_capacity(4 + key_prefix.len());
        prefix.extend_from_slice(&id.to_le_bytes());
        prefix.extend_from_slice(key_prefix);
        self.find(&prefix, SeekDirection::Forward)
    }

    /// Collapses this layer's changes into the parent, or flushes the root
    /// layer into the backing store as one batch.
    pub fn commit(&self) -> StorageResult<()> {
        let mut entries = self.entries.write();
        match &self.parent {
            Some(parent) => {
                for (key, tracked) in entries.drain() {
                    match tracked.state {
                        TrackState::None => {}
                        TrackState::Added | TrackState::Changed => {
                            if let Some(item) = tracked.item {
                                parent.put(key, item);
                            }
                        }
                        TrackState::Deleted => parent.delete(&key),
                    }
                }
            }
            None => {
                let mut batch = Vec::with_capacity(entries.len());
                for (key, tracked) in entries.drain() {
                    match tracked.state {
                        TrackState::None => {}
                        TrackState::Added | TrackState::Changed => {
                            if let Some(item) = tracked.item {
                                batch.push(BatchOperation::Put {
                                    key: key.to_bytes(),
                                    value: item.value,
                                });
                            }
                        }
                        TrackState::Deleted => batch.push(BatchOperation::Delete {
                            key: key.to_bytes(),
                        }),
                    }
                }
                self.store.put_batch(batch)?;
            }
        }
        Ok(())
    }

    /// The tracked (non-read-through) changes of this layer, used by the
    /// state-root service.
    pub fn tracked_changes(&self) -> Vec<(StorageKey, TrackState, Option<StorageItem>)> {
        self.entries
            .read()
            .iter()
            .filter(|(_, t)| t.state != TrackState::None)
            .map(|(k, t)| (k.clone(), t.state, t.item.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn key(id: i32, bytes: &[u8]) -> StorageKey {
        StorageKey::new(id, bytes.to_vec())
    }

    fn setup() -> Arc<DataCache> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Arc::new(DataCache::new(store))
    }

    #[test]
    fn test_put_get_roundtrip() {
        let cache = setup();
        cache.put(key(5, &[1, 2]), StorageItem::new(vec![3, 4]));
        assert_eq!(cache.try_get(&key(5, &[1, 2])).unwrap().value, vec![3, 4]);
        let found = cache.find_contract(5, &[1]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.value, vec![3, 4]);
    }

    #[test]
    fn test_nested_snapshot_isolation() {
        let root = setup();
        root.put(key(1, &[1]), StorageItem::new(vec![1]));

        let child = Arc::new(DataCache::snapshot(&root));
        child.put(key(1, &[2]), StorageItem::new(vec![2]));
        child.delete(&key(1, &[1]));

        // Child sees its own view; root is untouched until commit.
        assert!(child.try_get(&key(1, &[1])).is_none());
        assert!(root.try_get(&key(1, &[1])).is_some());
        assert!(root.try_get(&key(1, &[2])).is_none());

        child.commit().unwrap();
        assert!(root.try_get(&key(1, &[1])).is_none());
        assert_eq!(root.try_get(&key(1, &[2])).unwrap().value, vec![2]);
    }

    #[test]
    fn test_dropped_snapshot_discards_changes() {
        let root = setup();
        {
            let child = DataCache::snapshot(&root);
            child.put(key(1, &[9]), StorageItem::new(vec![9]));
        }
        assert!(root.try_get(&key(1, &[9])).is_none());
    }

    #[test]
    fn test_track_states() {
        let root = setup();
        root.put(key(1, &[1]), StorageItem::new(vec![1]));
        root.commit().unwrap();

        let child = Arc::new(DataCache::snapshot(&root));
        child.put(key(1, &[1]), StorageItem::new(vec![2]));
        child.put(key(1, &[2]), StorageItem::new(vec![3]));
        child.delete(&key(1, &[3]));

        let mut changes = child.tracked_changes();
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(changes[0].1, TrackState::Changed);
        assert_eq!(changes[1].1, TrackState::Added);
        assert_eq!(changes[2].1, TrackState::Deleted);
    }

    #[test]
    fn test_add_then_delete_leaves_no_trace() {
        let root = setup();
        let child = Arc::new(DataCache::snapshot(&root));
        child.put(key(1, &[7]), StorageItem::new(vec![7]));
        child.delete(&key(1, &[7]));
        assert!(child.tracked_changes().is_empty());
        child.commit().unwrap();
        assert!(!root.contains(&key(1, &[7])));
    }

    #[test]
    fn test_root_commit_hits_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = Arc::new(DataCache::new(Arc::clone(&store)));
        root.put(key(2, &[1]), StorageItem::new(vec![42]));
        root.commit().unwrap();
        let raw = key(2, &[1]).to_bytes();
        assert_eq!(store.try_get(&raw), Some(vec![42]));
    }

    #[test]
    fn test_find_merges_layers() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store.put(key(1, &[1]).to_bytes(), vec![1]).unwrap();
        store.put(key(1, &[2]).to_bytes(), vec![2]).unwrap();

        let root = Arc::new(DataCache::new(store));
        root.delete(&key(1, &[2]));
        let child = DataCache::snapshot(&root);
        child.put(key(1, &[3]), StorageItem::new(vec![3]));

        let found = child.find_contract(1, &[]);
        let keys: Vec<Vec<u8>> = found.iter().map(|(k, _)| k.key.clone()).collect();
        assert_eq!(keys, vec![vec![1], vec![3]]);
    }

    #[test]
    fn test_delete_tracked_after_deleting_missing_key_stays_invisible() {
        let cache = setup();
        cache.delete(&key(9, &[9]));
        assert!(!cache.contains(&key(9, &[9])));
        assert!(cache.try_get(&key(9, &[9])).is_none());
    }
}
