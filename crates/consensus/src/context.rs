// Copyright (C) 2015-2025 The Neo Project.
//
// context.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The consensus context: everything one validator knows about the
//! current (block-index, view) round.

use crate::messages::{ChangeViewReason, PrepareRequestPayload};
use neo3_config::ProtocolSettings;
use neo3_core::{Transaction, UInt160, UInt256, Witness};
use neo3_crypto::{ECPoint, KeyPair};
use neo3_ledger::{Block, BlockHeader};
use neo3_vm::ScriptBuilder;
use std::collections::HashMap;
use std::sync::Arc;

/// A received change-view vote.
#[derive(Debug, Clone, Copy)]
pub struct ChangeViewVote {
    pub new_view: u8,
    pub timestamp: u64,
    pub reason: ChangeViewReason,
}

/// One validator's view of the current round.
pub struct ConsensusContext {
    pub settings: Arc<ProtocolSettings>,
    /// Validators for this block, in canonical order.
    pub validators: Vec<ECPoint>,
    /// This node's slot, when it is a validator.
    pub my_index: Option<usize>,
    pub key_pair: Option<KeyPair>,

    pub block_index: u32,
    pub view_number: u8,
    pub prev_hash: UInt256,
    pub prev_timestamp: u64,
    /// The consensus account committed by the parent block.
    pub next_consensus: UInt160,

    /// The primary's proposal for this view, once received/made.
    pub proposal: Option<PrepareRequestPayload>,
    /// Transactions backing the proposal, keyed by hash.
    pub transactions: HashMap<UInt256, Transaction>,
    /// Which validators sent a preparation (request or response).
    pub preparations: Vec<bool>,
    /// Commit signatures per validator for the current view.
    pub commits: Vec<Option<[u8; 64]>>,
    /// Change-view votes per validator.
    pub change_views: Vec<Option<ChangeViewVote>>,
    /// Latched once this node broadcasts its commit.
    pub commit_sent: bool,
}

impl ConsensusContext {
    pub fn new(
        settings: Arc<ProtocolSettings>,
        validators: Vec<ECPoint>,
        key_pair: Option<KeyPair>,
        block_index: u32,
        prev_hash: UInt256,
        prev_timestamp: u64,
        next_consensus: UInt160,
    ) -> Self {
        let my_index = key_pair
            .as_ref()
            .and_then(|kp| validators.iter().position(|v| v == kp.public_key()));
        let n = validators.len();
        Self {
            settings,
            validators,
            my_index,
            key_pair,
            block_index,
            view_number: 0,
            prev_hash,
            prev_timestamp,
            next_consensus,
            proposal: None,
            transactions: HashMap::new(),
            preparations: vec![false; n],
            commits: vec![None; n],
            change_views: vec![None; n],
            commit_sent: false,
        }
    }

    /// Validator count.
    pub fn n(&self) -> usize {
        self.validators.len()
    }

    /// Tolerated faults: `(n - 1) / 3`.
    pub fn f(&self) -> usize {
        (self.n().saturating_sub(1)) / 3
    }

    /// Quorum: `n - f`.
    pub fn m(&self) -> usize {
        self.n() - self.f()
    }

    /// The primary for `view`: `(block_index - view) mod n`.
    pub fn primary_index(&self, view: u8) -> usize {
        let n = self.n() as i64;
        (((i64::from(self.block_index) - i64::from(view)) % n + n) % n) as usize
    }

    pub fn is_primary(&self) -> bool {
        self.my_index == Some(self.primary_index(self.view_number))
    }

    pub fn is_backup(&self) -> bool {
        self.my_index.is_some() && !self.is_primary()
    }

    /// Resets per-view state for `view`, keeping the known transactions.
    pub fn reset_view(&mut self, view: u8) {
        let n = self.n();
        self.view_number = view;
        self.proposal = None;
        self.preparations = vec![false; n];
        self.commits = vec![None; n];
        self.commit_sent = false;
        // Change-view votes below the new view are consumed.
        for vote in self.change_views.iter_mut() {
            if vote.is_some_and(|v| v.new_view <= view) {
                *vote = None;
            }
        }
    }

    /// Count of collected preparations (request included).
    pub fn preparation_count(&self) -> usize {
        self.preparations.iter().filter(|p| **p).count()
    }

    /// Count of collected commits for this view.
    pub fn commit_count(&self) -> usize {
        self.commits.iter().filter(|c| c.is_some()).count()
    }

    /// Count of change-view votes at or above `view`.
    pub fn change_view_count(&self, view: u8) -> usize {
        self.change_views
            .iter()
            .filter(|v| v.is_some_and(|vote| vote.new_view >= view))
            .count()
    }

    /// Whether every proposal transaction is available locally.
    pub fn transactions_complete(&self) -> bool {
        match &self.proposal {
            Some(proposal) => proposal
                .transaction_hashes
                .iter()
                .all(|h| self.transactions.contains_key(h)),
            None => false,
        }
    }

    /// Builds the header this round is trying to seal.
    pub fn make_header(&self) -> Option<BlockHeader> {
        let proposal = self.proposal.as_ref()?;
        let merkle_root = neo3_crypto::MerkleTree::compute_root(&proposal.transaction_hashes);
        Some(BlockHeader {
            version: proposal.version,
            prev_hash: proposal.prev_hash,
            merkle_root,
            timestamp: proposal.timestamp,
            nonce: proposal.nonce,
            index: self.block_index,
            primary_index: self.primary_index(self.view_number) as u8,
            next_consensus: self.next_consensus,
            witness: Witness::empty(),
        })
    }

    /// Assembles the sealed block once `m` commits are collected: the
    /// witness aggregates the signatures in validator order.
    pub fn make_block(&self) -> Option<Block> {
        let mut header = self.make_header()?;
        let proposal = self.proposal.as_ref()?;
        if self.commit_count() < self.m() {
            return None;
        }

        let verification =
            neo3_contract::helpers::multisig_redeem_script(self.m(), &self.validators).ok()?;
        let mut invocation = ScriptBuilder::new();
        let mut used = 0;
        for signature in self.commits.iter().flatten() {
            if used == self.m() {
                break;
            }
            invocation.emit_push_bytes(signature);
            used += 1;
        }
        header.witness = Witness::new(invocation.into_bytes(), verification);

        let mut transactions = Vec::with_capacity(proposal.transaction_hashes.len());
        for hash in &proposal.transaction_hashes {
            transactions.push(self.transactions.get(hash)?.clone());
        }
        Some(Block {
            header,
            transactions,
        })
    }

    /// The timeout for `view`: `block_time × 2^view`.
    pub fn view_timeout(&self, view: u8) -> std::time::Duration {
        let base = self.settings.milliseconds_per_block;
        std::time::Duration::from_millis(base << view.min(16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(block_index: u32, n: usize) -> ConsensusContext {
        let validators: Vec<ECPoint> = (0..n).map(|_| *KeyPair::generate().public_key()).collect();
        ConsensusContext::new(
            Arc::new(ProtocolSettings::privnet()),
            validators,
            None,
            block_index,
            UInt256::ZERO,
            0,
            UInt160::ZERO,
        )
    }

    #[test]
    fn test_quorum_arithmetic() {
        let ctx = context(1, 4);
        assert_eq!(ctx.f(), 1);
        assert_eq!(ctx.m(), 3);
        let ctx = context(1, 7);
        assert_eq!(ctx.f(), 2);
        assert_eq!(ctx.m(), 5);
    }

    #[test]
    fn test_primary_rotation() {
        let ctx = context(1, 4);
        // (1 - 0) mod 4 = 1
        assert_eq!(ctx.primary_index(0), 1);
        // (1 - 1) mod 4 = 0
        assert_eq!(ctx.primary_index(1), 0);
        // (1 - 2) mod 4 wraps to 3.
        assert_eq!(ctx.primary_index(2), 3);
    }

    #[test]
    fn test_reset_view_clears_round_state() {
        let mut ctx = context(5, 4);
        ctx.preparations[0] = true;
        ctx.commits[1] = Some([0u8; 64]);
        ctx.commit_sent = true;
        ctx.reset_view(1);
        assert_eq!(ctx.preparation_count(), 0);
        assert_eq!(ctx.commit_count(), 0);
        assert!(!ctx.commit_sent);
        assert_eq!(ctx.view_number, 1);
    }
}
