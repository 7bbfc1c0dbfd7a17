// Copyright (C) 2015-2025 The Neo Project.
//
// header_cache.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! A bounded, index-keyed ring of headers that accelerates sync and
//! consensus lookups.

use crate::block::BlockHeader;
use parking_lot::RwLock;
use std::collections::VecDeque;

/// Default capacity of the ring.
pub const DEFAULT_HEADER_CACHE_CAPACITY: usize = 10_000;

/// The cached header run is always contiguous: entry `i` holds index
/// `start_index + i`.
#[derive(Debug)]
pub struct HeaderCache {
    inner: RwLock<Ring>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct Ring {
    start_index: u32,
    headers: VecDeque<BlockHeader>,
}

impl Default for HeaderCache {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_CACHE_CAPACITY)
    }
}

impl HeaderCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Ring::default()),
            capacity: capacity.max(1),
        }
    }

    /// Number of cached headers.
    pub fn len(&self) -> usize {
        self.inner.read().headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().headers.is_empty()
    }

    /// The highest cached index, if any.
    pub fn last_index(&self) -> Option<u32> {
        let ring = self.inner.read();
        if ring.headers.is_empty() {
            None
        } else {
            Some(ring.start_index + ring.headers.len() as u32 - 1)
        }
    }

    /// The header at `index`, if cached.
    pub fn get(&self, index: u32) -> Option<BlockHeader> {
        let ring = self.inner.read();
        if index < ring.start_index {
            return None;
        }
        ring.headers.get((index - ring.start_index) as usize).cloned()
    }

    /// Inserts `header`. Appends extend the run; an insert at an existing
    /// index replaces that entry (and truncates everything after it) only
    /// when the hash differs and the header still links to its parent.
    pub fn add(&self, header: BlockHeader) -> bool {
        let mut ring = self.inner.write();
        if ring.headers.is_empty() {
            ring.start_index = header.index;
            ring.headers.push_back(header);
            return true;
        }
        let next_index = ring.start_index + ring.headers.len() as u32;
        if header.index == next_index {
            let last = ring.headers.back().map(BlockHeader::hash);
            if last != Some(header.prev_hash) {
                return false;
            }
            ring.headers.push_back(header);
            if ring.headers.len() > self.capacity {
                ring.headers.pop_front();
                ring.start_index += 1;
            }
            return true;
        }
        if header.index < ring.start_index || header.index > next_index {
            return false;
        }
        // Replacement inside the run.
        let offset = (header.index - ring.start_index) as usize;
        let existing_hash = ring.headers[offset].hash();
        if existing_hash == header.hash() {
            return false;
        }
        let parent_ok = if offset == 0 {
            true
        } else {
            ring.headers[offset - 1].hash() == header.prev_hash
        };
        if !parent_ok {
            return false;
        }
        ring.headers.truncate(offset);
        ring.headers.push_back(header);
        true
    }

    /// Drops every header at or below `index` (persisted blocks).
    pub fn prune_to(&self, index: u32) {
        let mut ring = self.inner.write();
        while let Some(front) = ring.headers.front() {
            if front.index > index {
                break;
            }
            ring.headers.pop_front();
            ring.start_index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_core::{UInt160, UInt256, Witness};

    fn header(index: u32, prev_hash: UInt256, tag: u8) -> BlockHeader {
        BlockHeader {
            version: 0,
            prev_hash,
            merkle_root: UInt256::from_data(&[tag]),
            timestamp: 1000 + u64::from(index),
            nonce: 0,
            index,
            primary_index: 0,
            next_consensus: UInt160::ZERO,
            witness: Witness::empty(),
        }
    }

    fn chain(length: u32) -> Vec<BlockHeader> {
        let mut headers = Vec::new();
        let mut prev = UInt256::ZERO;
        for index in 0..length {
            let h = header(index, prev, 0);
            prev = h.hash();
            headers.push(h);
        }
        headers
    }

    #[test]
    fn test_append_and_lookup() {
        let cache = HeaderCache::new(100);
        for h in chain(5) {
            assert!(cache.add(h));
        }
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.get(3).unwrap().index, 3);
        assert_eq!(cache.last_index(), Some(4));
        assert!(cache.get(9).is_none());
    }

    #[test]
    fn test_append_requires_linkage() {
        let cache = HeaderCache::new(100);
        let headers = chain(2);
        assert!(cache.add(headers[0].clone()));
        // Wrong parent hash.
        assert!(!cache.add(header(1, UInt256::from_data(b"wrong"), 0)));
        assert!(cache.add(headers[1].clone()));
    }

    #[test]
    fn test_replacement_truncates_descendants() {
        let cache = HeaderCache::new(100);
        let headers = chain(4);
        for h in &headers {
            cache.add(h.clone());
        }
        // A different header at index 2, correctly linked to index 1.
        let replacement = header(2, headers[1].hash(), 0xFF);
        assert!(cache.add(replacement.clone()));
        assert_eq!(cache.last_index(), Some(2));
        assert_eq!(cache.get(2).unwrap().hash(), replacement.hash());
        // Same hash again is a no-op.
        assert!(!cache.add(replacement));
    }

    #[test]
    fn test_capacity_bound() {
        let cache = HeaderCache::new(3);
        for h in chain(5) {
            cache.add(h);
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.last_index(), Some(4));
    }

    #[test]
    fn test_prune() {
        let cache = HeaderCache::new(100);
        for h in chain(5) {
            cache.add(h);
        }
        cache.prune_to(2);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(2).is_none());
        assert!(cache.get(3).is_some());
    }
}
