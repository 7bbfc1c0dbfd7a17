// Copyright (C) 2015-2025 The Neo Project.
//
// mempool.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The memory pool: fee-ordered admission with strict-domination
//! eviction, plus the verified/unverified split re-checked after each
//! persisted block.

use crate::error::VerifyResult;
use neo3_core::{Transaction, UInt256};
use neo3_io::Serializable;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Pool ordering key: later keys are better candidates for a block.
///
/// High-priority entries outrank every fee-ordered entry; within a
/// class, higher fee-per-byte wins and earlier arrival breaks ties.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PoolKey {
    high_priority: bool,
    fee_per_byte: i64,
    network_fee: i64,
    /// Admission sequence; lower is earlier.
    arrival: u64,
    hash: UInt256,
}

impl Ord for PoolKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.high_priority
            .cmp(&other.high_priority)
            .then_with(|| self.fee_per_byte.cmp(&other.fee_per_byte))
            .then_with(|| self.network_fee.cmp(&other.network_fee))
            .then_with(|| other.arrival.cmp(&self.arrival))
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for PoolKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct PoolItem {
    transaction: Transaction,
    key: PoolKey,
}

#[derive(Debug, Default)]
struct PoolState {
    verified: HashMap<UInt256, PoolItem>,
    sorted: BTreeSet<PoolKey>,
    unverified: HashMap<UInt256, PoolItem>,
    arrival_sequence: u64,
}

/// The transaction memory pool.
#[derive(Debug)]
pub struct MemoryPool {
    capacity: usize,
    state: RwLock<PoolState>,
}

impl MemoryPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: RwLock::new(PoolState::default()),
        }
    }

    /// Verified transaction count.
    pub fn verified_count(&self) -> usize {
        self.state.read().verified.len()
    }

    /// Unverified transaction count.
    pub fn unverified_count(&self) -> usize {
        self.state.read().unverified.len()
    }

    /// Total held transactions.
    pub fn len(&self) -> usize {
        let state = self.state.read();
        state.verified.len() + state.unverified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `hash` sits in either set.
    pub fn contains(&self, hash: &UInt256) -> bool {
        let state = self.state.read();
        state.verified.contains_key(hash) || state.unverified.contains_key(hash)
    }

    /// Fetches a pooled transaction.
    pub fn get(&self, hash: &UInt256) -> Option<Transaction> {
        let state = self.state.read();
        state
            .verified
            .get(hash)
            .or_else(|| state.unverified.get(hash))
            .map(|item| item.transaction.clone())
    }

    /// All verified transactions, best first.
    pub fn verified_transactions(&self) -> Vec<Transaction> {
        let state = self.state.read();
        state
            .sorted
            .iter()
            .rev()
            .filter_map(|key| state.verified.get(&key.hash))
            .map(|item| item.transaction.clone())
            .collect()
    }

    /// The best `count` verified transactions for a block proposal.
    pub fn take_for_block(&self, count: usize) -> Vec<Transaction> {
        self.verified_transactions().into_iter().take(count).collect()
    }

    /// Admits an already-verified transaction.
    pub fn try_add(&self, transaction: Transaction) -> VerifyResult {
        let hash = transaction.hash();
        let mut state = self.state.write();
        if state.verified.contains_key(&hash) || state.unverified.contains_key(&hash) {
            return VerifyResult::AlreadyInPool;
        }

        let size = transaction.size() as i64;
        let key = PoolKey {
            high_priority: transaction.is_high_priority(),
            fee_per_byte: if size > 0 {
                transaction.network_fee / size
            } else {
                0
            },
            network_fee: transaction.network_fee,
            arrival: state.arrival_sequence,
            hash,
        };
        state.arrival_sequence += 1;

        if state.verified.len() >= self.capacity {
            // The eviction candidate is the worst fee-ordered entry; a
            // high-priority newcomer may displace the worst of its own
            // class when nothing else is available.
            let candidate = state
                .sorted
                .iter()
                .find(|k| !k.high_priority)
                .or_else(|| {
                    if key.high_priority {
                        state.sorted.iter().next()
                    } else {
                        None
                    }
                })
                .cloned();
            match candidate {
                Some(worst) if key > worst => {
                    debug!(evicted = %worst.hash, admitted = %hash, "mempool eviction");
                    state.sorted.remove(&worst);
                    state.verified.remove(&worst.hash);
                }
                _ => return VerifyResult::OutOfMemory,
            }
        }

        // An admitted Conflicts attribute pushes the listed hashes out.
        for conflict in transaction.conflict_hashes() {
            if let Some(removed) = state.verified.remove(&conflict) {
                state.sorted.remove(&removed.key);
            }
            state.unverified.remove(&conflict);
        }

        state.sorted.insert(key.clone());
        state.verified.insert(hash, PoolItem { transaction, key });
        VerifyResult::Succeed
    }

    /// Removes `hash` from both sets.
    pub fn remove(&self, hash: &UInt256) {
        let mut state = self.state.write();
        if let Some(item) = state.verified.remove(hash) {
            state.sorted.remove(&item.key);
        }
        state.unverified.remove(hash);
    }

    /// Called after a block persists: drops its transactions and anything
    /// they conflict with, then demotes the survivors to unverified.
    pub fn update_for_block(&self, persisted: &[Transaction]) {
        let mut state = self.state.write();
        for tx in persisted {
            let hash = tx.hash();
            if let Some(item) = state.verified.remove(&hash) {
                state.sorted.remove(&item.key);
            }
            state.unverified.remove(&hash);
            for conflict in tx.conflict_hashes() {
                if let Some(item) = state.verified.remove(&conflict) {
                    state.sorted.remove(&item.key);
                }
                state.unverified.remove(&conflict);
            }
        }
        // Everything left must be re-checked against the new state.
        let demoted: Vec<(UInt256, PoolItem)> = state.verified.drain().collect();
        state.sorted.clear();
        for (hash, item) in demoted {
            state.unverified.insert(hash, item);
        }
    }

    /// Re-verifies up to `limit` unverified entries with `verify`,
    /// promoting the survivors.
    pub fn reverify<F>(&self, limit: usize, mut verify: F) -> usize
    where
        F: FnMut(&Transaction) -> VerifyResult,
    {
        let batch: Vec<(UInt256, PoolItem)> = {
            let mut state = self.state.write();
            let hashes: Vec<UInt256> = state.unverified.keys().take(limit).copied().collect();
            hashes
                .into_iter()
                .filter_map(|h| state.unverified.remove(&h).map(|item| (h, item)))
                .collect()
        };
        let mut promoted = 0;
        for (_, item) in batch {
            if verify(&item.transaction).is_ok() && self.try_add(item.transaction).is_ok() {
                promoted += 1;
            }
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_core::{Signer, TransactionAttribute, UInt160, Witness};

    fn transaction(nonce: u32, network_fee: i64, high_priority: bool) -> Transaction {
        let mut attributes = Vec::new();
        if high_priority {
            attributes.push(TransactionAttribute::HighPriority);
        }
        Transaction {
            nonce,
            network_fee,
            valid_until_block: 100,
            signers: vec![Signer::called_by_entry(UInt160::from_script(
                &nonce.to_le_bytes(),
            ))],
            attributes,
            script: vec![0x40],
            witnesses: vec![Witness::empty()],
            ..Default::default()
        }
    }

    fn fee_for_per_byte(target: i64) -> i64 {
        // All fixture transactions have the same size.
        target * transaction(0, 0, false).size() as i64
    }

    #[test]
    fn test_fee_priority_eviction() {
        let pool = MemoryPool::new(2);
        let t1 = transaction(1, fee_for_per_byte(100), false);
        let t2 = transaction(2, fee_for_per_byte(200), false);
        let t3 = transaction(3, fee_for_per_byte(150), false);
        let t4 = transaction(4, fee_for_per_byte(50), false);

        assert!(pool.try_add(t1.clone()).is_ok());
        assert!(pool.try_add(t2.clone()).is_ok());

        // T3 strictly dominates T1: T1 evicted.
        assert!(pool.try_add(t3.clone()).is_ok());
        assert!(!pool.contains(&t1.hash()));
        assert!(pool.contains(&t2.hash()) && pool.contains(&t3.hash()));

        // T4 does not dominate anything: rejected, pool unchanged.
        assert_eq!(pool.try_add(t4.clone()), VerifyResult::OutOfMemory);
        assert!(!pool.contains(&t4.hash()));
        assert_eq!(pool.verified_count(), 2);
    }

    #[test]
    fn test_equal_fee_does_not_evict() {
        let pool = MemoryPool::new(1);
        let t1 = transaction(1, fee_for_per_byte(100), false);
        let t2 = transaction(2, fee_for_per_byte(100), false);
        assert!(pool.try_add(t1).is_ok());
        // Same fee and later arrival: not strictly dominating.
        assert_eq!(pool.try_add(t2), VerifyResult::OutOfMemory);
    }

    #[test]
    fn test_high_priority_outranks_fees() {
        let pool = MemoryPool::new(2);
        let cheap_priority = transaction(1, fee_for_per_byte(1), true);
        let rich = transaction(2, fee_for_per_byte(1000), false);
        let richer = transaction(3, fee_for_per_byte(2000), false);
        assert!(pool.try_add(rich.clone()).is_ok());
        assert!(pool.try_add(cheap_priority.clone()).is_ok());

        // The fee-ordered entry is evicted before the priority one.
        assert!(pool.try_add(richer.clone()).is_ok());
        assert!(pool.contains(&cheap_priority.hash()));
        assert!(!pool.contains(&rich.hash()));

        let proposal = pool.take_for_block(2);
        assert_eq!(proposal[0].hash(), cheap_priority.hash());
    }

    #[test]
    fn test_duplicate_rejected() {
        let pool = MemoryPool::new(10);
        let tx = transaction(1, 1000, false);
        assert!(pool.try_add(tx.clone()).is_ok());
        assert_eq!(pool.try_add(tx), VerifyResult::AlreadyInPool);
    }

    #[test]
    fn test_conflicts_attribute_removes_target() {
        let pool = MemoryPool::new(10);
        let victim = transaction(1, 1000, false);
        let victim_hash = victim.hash();
        assert!(pool.try_add(victim).is_ok());

        let mut killer = transaction(2, 2000, false);
        killer
            .attributes
            .push(TransactionAttribute::Conflicts { hash: victim_hash });
        assert!(pool.try_add(killer).is_ok());
        assert!(!pool.contains(&victim_hash));
    }

    #[test]
    fn test_block_update_demotes_and_reverifies() {
        let pool = MemoryPool::new(10);
        let included = transaction(1, 1000, false);
        let survivor = transaction(2, 1000, false);
        pool.try_add(included.clone());
        pool.try_add(survivor.clone());

        pool.update_for_block(&[included.clone()]);
        assert!(!pool.contains(&included.hash()));
        assert_eq!(pool.verified_count(), 0);
        assert_eq!(pool.unverified_count(), 1);

        let promoted = pool.reverify(10, |_| VerifyResult::Succeed);
        assert_eq!(promoted, 1);
        assert!(pool.contains(&survivor.hash()));
        assert_eq!(pool.verified_count(), 1);
    }

    #[test]
    fn test_reverify_drops_failures() {
        let pool = MemoryPool::new(10);
        let tx = transaction(1, 1000, false);
        pool.try_add(tx.clone());
        pool.update_for_block(&[]);
        let promoted = pool.reverify(10, |_| VerifyResult::Expired);
        assert_eq!(promoted, 0);
        assert!(!pool.contains(&tx.hash()));
    }
}
