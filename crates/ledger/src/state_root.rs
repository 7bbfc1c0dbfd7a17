// Copyright (C) 2015-2025 The Neo Project.
//
// state_root.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The per-block MPT state root.
//!
//! Every committed storage change folds into a Merkle-Patricia trie; the
//! resulting root is recorded per block index for state proofs and the
//! `getstateroot` RPC.

use crate::error::{LedgerError, LedgerResult};
use neo3_core::{UInt256, Witness};
use neo3_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use neo3_mpt::{MptError, Trie};
use neo3_persistence::{DataCache, StorageItem, StorageKey, TrackState};
use serde::{Deserialize, Serialize};

/// Reserved pseudo-contract id for state-root records.
pub const STATE_ROOT_ID: i32 = -100;
/// Reserved pseudo-contract id for application logs.
pub const APP_LOG_ID: i32 = -101;

const PREFIX_ROOT: u8 = 1;
const PREFIX_CURRENT: u8 = 2;

/// A signed state root (the witness is filled by state validators).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRoot {
    pub version: u8,
    pub index: u32,
    pub root_hash: UInt256,
    pub witness: Witness,
}

impl Serializable for StateRoot {
    fn size(&self) -> usize {
        1 + 4 + 32 + 1 + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.version)?;
        writer.write_u32(self.index)?;
        self.root_hash.serialize(writer)?;
        writer.write_var_int(1)?;
        self.witness.serialize(writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let version = reader.read_u8()?;
        let index = reader.read_u32()?;
        let root_hash = UInt256::deserialize(reader)?;
        let _count = reader.read_var_int(1)?;
        let witness = Witness::deserialize(reader)?;
        Ok(Self {
            version,
            index,
            root_hash,
            witness,
        })
    }
}

/// Maintains the trie across persisted blocks.
#[derive(Debug, Default)]
pub struct StateRootService {
    trie: Trie,
}

impl StateRootService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the trie from existing store entries (node restart).
    pub fn rebuild<I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>>(
        &mut self,
        entries: I,
    ) -> LedgerResult<()> {
        self.trie = Trie::new();
        for (key, value) in entries {
            if is_internal_key(&key) {
                continue;
            }
            self.trie
                .put(&key, value)
                .map_err(|e| LedgerError::Other(e.to_string()))?;
        }
        Ok(())
    }

    /// The current root.
    pub fn root(&self) -> UInt256 {
        self.trie.root()
    }

    /// Folds a block's tracked changes into the trie and records the
    /// resulting root in the snapshot.
    pub fn apply_block(
        &mut self,
        snapshot: &DataCache,
        index: u32,
        changes: &[(StorageKey, TrackState, Option<StorageItem>)],
    ) -> LedgerResult<UInt256> {
        let mut sorted: Vec<&(StorageKey, TrackState, Option<StorageItem>)> = changes
            .iter()
            .filter(|(key, _, _)| !is_internal_id(key.id))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, state, item) in sorted {
            let raw = key.to_bytes();
            match state {
                TrackState::Added | TrackState::Changed => {
                    let value = item.as_ref().map(|i| i.value.clone()).unwrap_or_default();
                    self.trie
                        .put(&raw, value)
                        .map_err(|e| LedgerError::Other(e.to_string()))?;
                }
                TrackState::Deleted => match self.trie.delete(&raw) {
                    Ok(()) | Err(MptError::KeyNotFound) => {}
                    Err(e) => return Err(LedgerError::Other(e.to_string())),
                },
                TrackState::None => {}
            }
        }

        let root_hash = self.trie.root();
        let record = StateRoot {
            version: 0,
            index,
            root_hash,
            witness: Witness::empty(),
        };
        let mut writer = BinaryWriter::new();
        record
            .serialize(&mut writer)
            .map_err(LedgerError::Serialization)?;
        snapshot.put(
            StorageKey::with_prefix_bytes(STATE_ROOT_ID, PREFIX_ROOT, &index.to_be_bytes()),
            StorageItem::new(writer.into_bytes()),
        );
        snapshot.put(
            StorageKey::with_prefix(STATE_ROOT_ID, PREFIX_CURRENT),
            StorageItem::from_i64(i64::from(index)),
        );
        Ok(root_hash)
    }
}

/// Reads the recorded state root for `index`.
pub fn get_state_root(snapshot: &DataCache, index: u32) -> Option<StateRoot> {
    let item = snapshot.try_get(&StorageKey::with_prefix_bytes(
        STATE_ROOT_ID,
        PREFIX_ROOT,
        &index.to_be_bytes(),
    ))?;
    let mut reader = MemoryReader::new(&item.value);
    StateRoot::deserialize(&mut reader).ok()
}

/// The highest index with a recorded root.
pub fn state_height(snapshot: &DataCache) -> Option<u32> {
    snapshot
        .try_get(&StorageKey::with_prefix(STATE_ROOT_ID, PREFIX_CURRENT))
        .map(|item| item.as_i64() as u32)
}

fn is_internal_id(id: i32) -> bool {
    id == STATE_ROOT_ID || id == APP_LOG_ID
}

fn is_internal_key(raw: &[u8]) -> bool {
    if raw.len() < 4 {
        return true;
    }
    let id = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    is_internal_id(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_persistence::{MemoryStore, Store};
    use std::sync::Arc;

    #[test]
    fn test_roots_change_with_state() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let cache = Arc::new(DataCache::new(store));
        let mut service = StateRootService::new();

        cache.put(StorageKey::with_prefix(5, 1), StorageItem::new(vec![1]));
        let changes = cache.tracked_changes();
        let first = service.apply_block(&cache, 0, &changes).unwrap();
        assert_ne!(first, UInt256::ZERO);
        assert_eq!(get_state_root(&cache, 0).unwrap().root_hash, first);
        assert_eq!(state_height(&cache), Some(0));
    }

    #[test]
    fn test_internal_keys_excluded() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let cache = Arc::new(DataCache::new(store));
        let mut service = StateRootService::new();

        // Only an app-log write: the trie stays empty.
        cache.put(
            StorageKey::with_prefix(APP_LOG_ID, 1),
            StorageItem::new(vec![9]),
        );
        let changes = cache.tracked_changes();
        let root = service.apply_block(&cache, 0, &changes).unwrap();
        assert_eq!(root, UInt256::ZERO);
    }

    #[test]
    fn test_state_root_wire_roundtrip() {
        use neo3_io::SerializableExt;
        let record = StateRoot {
            version: 0,
            index: 7,
            root_hash: UInt256::from_data(b"root"),
            witness: Witness::empty(),
        };
        let bytes = record.to_array();
        assert_eq!(bytes.len(), record.size());
        assert_eq!(StateRoot::from_array(&bytes).unwrap(), record);
    }
}
