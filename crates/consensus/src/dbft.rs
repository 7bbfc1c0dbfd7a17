// Copyright (C) 2015-2025 The Neo Project.
//
// dbft.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The dBFT 2.0 transition engine.
//!
//! Handlers are pure over the [`ConsensusContext`]: a message (or timer
//! tick) goes in, a list of [`ConsensusEffect`]s comes out. The service
//! shell performs the effects; fixtures drive the same handlers in tests
//! without any I/O.

use crate::context::{ChangeViewVote, ConsensusContext};
use crate::error::{ConsensusError, ConsensusResult};
use crate::messages::{
    ChangeViewReason, CommitCompact, ConsensusMessage, ConsensusPayload, PrepareRequestPayload,
    PreparationCompact, RecoveryMessage,
};
use neo3_core::{Transaction, UInt256};
use neo3_ledger::Block;
use std::time::Duration;
use tracing::{debug, info};

/// An outward action requested by a transition.
#[derive(Debug)]
pub enum ConsensusEffect {
    /// Broadcast a signed consensus message to the other validators.
    Broadcast(ConsensusMessage),
    /// (Re)arm the view timer.
    SetTimer(Duration),
    /// Hand a sealed block to the ledger.
    PersistBlock(Box<Block>),
    /// Ask the network layer for proposal transactions we lack.
    RequestTransactions(Vec<UInt256>),
}

/// The deterministic dBFT state machine.
pub struct DbftEngine {
    pub context: ConsensusContext,
}

impl DbftEngine {
    pub fn new(context: ConsensusContext) -> Self {
        Self { context }
    }

    fn my_index(&self) -> ConsensusResult<u8> {
        self.context
            .my_index
            .map(|i| i as u8)
            .ok_or(ConsensusError::NotValidator)
    }

    fn sign_header(&self) -> ConsensusResult<[u8; 64]> {
        let header = self
            .context
            .make_header()
            .ok_or_else(|| ConsensusError::InvalidState("no proposal to sign".into()))?;
        let key = self
            .context
            .key_pair
            .as_ref()
            .ok_or(ConsensusError::NotValidator)?;
        Ok(key.sign(&header.sign_data(self.context.settings.network)))
    }

    fn message(&self, payload: ConsensusPayload) -> ConsensusResult<ConsensusMessage> {
        Ok(ConsensusMessage {
            block_index: self.context.block_index,
            validator_index: self.my_index()?,
            view_number: self.context.view_number,
            payload,
        })
    }

    /// Round start (or view start): the primary proposes, backups arm
    /// their timers.
    pub fn on_start(
        &mut self,
        proposal_transactions: Vec<Transaction>,
        nonce: u64,
        now_ms: u64,
    ) -> ConsensusResult<Vec<ConsensusEffect>> {
        let mut effects = vec![ConsensusEffect::SetTimer(
            self.context.view_timeout(self.context.view_number),
        )];
        if !self.context.is_primary() {
            return Ok(effects);
        }

        // The proposed timestamp must advance past the parent block.
        let timestamp = now_ms.max(self.context.prev_timestamp + 1);
        let hashes: Vec<UInt256> = proposal_transactions.iter().map(Transaction::hash).collect();
        for tx in proposal_transactions {
            self.context.transactions.insert(tx.hash(), tx);
        }
        let request = PrepareRequestPayload {
            version: 0,
            prev_hash: self.context.prev_hash,
            timestamp,
            nonce,
            transaction_hashes: hashes,
        };
        self.context.proposal = Some(request.clone());
        let index = self.context.my_index.unwrap_or_default();
        self.context.preparations[index] = true;

        info!(
            index = self.context.block_index,
            view = self.context.view_number,
            transactions = request.transaction_hashes.len(),
            "proposing block"
        );
        effects.push(ConsensusEffect::Broadcast(
            self.message(ConsensusPayload::PrepareRequest(request))?,
        ));
        Ok(effects)
    }

    /// A view timer fired.
    pub fn on_timer(&mut self, now_ms: u64) -> ConsensusResult<Vec<ConsensusEffect>> {
        if self.context.commit_sent {
            // Commit latching: never change view after committing; nudge
            // the others with our state instead.
            let recovery = self.build_recovery();
            return Ok(vec![
                ConsensusEffect::Broadcast(
                    self.message(ConsensusPayload::RecoveryMessage(Box::new(recovery)))?,
                ),
                ConsensusEffect::SetTimer(
                    self.context.view_timeout(self.context.view_number),
                ),
            ]);
        }
        let new_view = self.context.view_number + 1;
        debug!(
            index = self.context.block_index,
            view = self.context.view_number,
            new_view,
            "view timeout"
        );
        let index = self.context.my_index.ok_or(ConsensusError::NotValidator)?;
        self.context.change_views[index] = Some(ChangeViewVote {
            new_view,
            timestamp: now_ms,
            reason: ChangeViewReason::Timeout,
        });
        let mut effects = vec![
            ConsensusEffect::Broadcast(self.message(ConsensusPayload::ChangeView {
                timestamp: now_ms,
                reason: ChangeViewReason::Timeout,
            })?),
            ConsensusEffect::SetTimer(self.context.view_timeout(new_view)),
        ];
        effects.extend(self.check_change_views(new_view)?);
        Ok(effects)
    }

    /// Entry point for a verified peer message.
    pub fn on_message(
        &mut self,
        message: ConsensusMessage,
    ) -> ConsensusResult<Vec<ConsensusEffect>> {
        if message.block_index != self.context.block_index {
            return Err(ConsensusError::OutOfContext(format!(
                "message for height {}, at {}",
                message.block_index, self.context.block_index
            )));
        }
        let sender = message.validator_index as usize;
        if sender >= self.context.n() {
            return Err(ConsensusError::InvalidMessage(format!(
                "validator index {sender} out of range"
            )));
        }
        match message.payload.clone() {
            ConsensusPayload::ChangeView { timestamp, reason } => {
                self.on_change_view(sender, message.view_number, timestamp, reason)
            }
            ConsensusPayload::PrepareRequest(request) => {
                self.on_prepare_request(sender, message.view_number, request)
            }
            ConsensusPayload::PrepareResponse { preparation_hash } => {
                self.on_prepare_response(sender, message.view_number, preparation_hash)
            }
            ConsensusPayload::Commit { signature } => {
                self.on_commit(sender, message.view_number, signature)
            }
            ConsensusPayload::RecoveryRequest { .. } => self.on_recovery_request(),
            ConsensusPayload::RecoveryMessage(recovery) => {
                self.on_recovery_message(*recovery, message.view_number)
            }
        }
    }

    fn on_change_view(
        &mut self,
        sender: usize,
        view: u8,
        timestamp: u64,
        reason: ChangeViewReason,
    ) -> ConsensusResult<Vec<ConsensusEffect>> {
        let new_view = view + 1;
        let existing = self.context.change_views[sender];
        if existing.is_some_and(|v| v.new_view >= new_view) {
            return Ok(Vec::new());
        }
        self.context.change_views[sender] = Some(ChangeViewVote {
            new_view,
            timestamp,
            reason,
        });
        self.check_change_views(new_view)
    }

    fn on_prepare_request(
        &mut self,
        sender: usize,
        view: u8,
        request: PrepareRequestPayload,
    ) -> ConsensusResult<Vec<ConsensusEffect>> {
        if view != self.context.view_number {
            return Err(ConsensusError::OutOfContext("wrong view".into()));
        }
        if sender != self.context.primary_index(view) {
            return Err(ConsensusError::InvalidMessage(
                "prepare request from a non-primary".into(),
            ));
        }
        if self.context.proposal.is_some() {
            return Ok(Vec::new());
        }
        if request.prev_hash != self.context.prev_hash {
            return Err(ConsensusError::InvalidMessage(
                "proposal extends a different parent".into(),
            ));
        }
        if request.timestamp <= self.context.prev_timestamp {
            return Err(ConsensusError::InvalidMessage(
                "proposal timestamp does not advance".into(),
            ));
        }

        self.context.proposal = Some(request.clone());
        self.context.preparations[sender] = true;

        let mut effects = Vec::new();
        let missing: Vec<UInt256> = request
            .transaction_hashes
            .iter()
            .filter(|h| !self.context.transactions.contains_key(h))
            .copied()
            .collect();
        if !missing.is_empty() {
            effects.push(ConsensusEffect::RequestTransactions(missing));
        }

        if self.context.my_index.is_some() && !self.context.is_primary() {
            let preparation_hash = self
                .context
                .make_header()
                .map(|h| h.hash())
                .ok_or_else(|| ConsensusError::InvalidState("no header".into()))?;
            let index = self.context.my_index.unwrap_or_default();
            self.context.preparations[index] = true;
            effects.push(ConsensusEffect::Broadcast(
                self.message(ConsensusPayload::PrepareResponse { preparation_hash })?,
            ));
        }
        effects.extend(self.check_preparations()?);
        Ok(effects)
    }

    fn on_prepare_response(
        &mut self,
        sender: usize,
        view: u8,
        preparation_hash: UInt256,
    ) -> ConsensusResult<Vec<ConsensusEffect>> {
        if view != self.context.view_number {
            return Err(ConsensusError::OutOfContext("wrong view".into()));
        }
        if let Some(header) = self.context.make_header() {
            if header.hash() != preparation_hash {
                return Err(ConsensusError::InvalidMessage(
                    "preparation hash mismatch".into(),
                ));
            }
        }
        if self.context.preparations[sender] {
            return Ok(Vec::new());
        }
        self.context.preparations[sender] = true;
        self.check_preparations()
    }

    fn on_commit(
        &mut self,
        sender: usize,
        view: u8,
        signature: [u8; 64],
    ) -> ConsensusResult<Vec<ConsensusEffect>> {
        if view != self.context.view_number {
            // Commits for other views are kept for recovery only.
            return Ok(Vec::new());
        }
        if self.context.commits[sender].is_some() {
            return Ok(Vec::new());
        }
        // Verify against the proposed header when we have it.
        if let Some(header) = self.context.make_header() {
            let data = header.sign_data(self.context.settings.network);
            if !self.context.validators[sender].verify(&data, &signature) {
                return Err(ConsensusError::InvalidMessage(format!(
                    "bad commit signature from validator {sender}"
                )));
            }
        }
        self.context.commits[sender] = Some(signature);
        self.check_commits()
    }

    fn on_recovery_request(&mut self) -> ConsensusResult<Vec<ConsensusEffect>> {
        if self.context.my_index.is_none() {
            return Ok(Vec::new());
        }
        let recovery = self.build_recovery();
        Ok(vec![ConsensusEffect::Broadcast(
            self.message(ConsensusPayload::RecoveryMessage(Box::new(recovery)))?,
        )])
    }

    /// Recovery refills the buffers; all transitions still run through
    /// the ordinary handlers.
    fn on_recovery_message(
        &mut self,
        recovery: RecoveryMessage,
        view: u8,
    ) -> ConsensusResult<Vec<ConsensusEffect>> {
        let mut effects = Vec::new();
        for change_view in recovery.change_views {
            let result = self.on_change_view(
                change_view.validator_index as usize,
                change_view.original_view,
                change_view.timestamp,
                ChangeViewReason::ChangeAgreement,
            );
            if let Ok(mut inner) = result {
                effects.append(&mut inner);
            }
        }
        if view == self.context.view_number {
            if let Some(request) = recovery.prepare_request {
                let primary = self.context.primary_index(view);
                if let Ok(mut inner) = self.on_prepare_request(primary, view, request) {
                    effects.append(&mut inner);
                }
            }
            for preparation in recovery.preparations {
                let sender = preparation.validator_index as usize;
                if sender < self.context.n() && !self.context.preparations[sender] {
                    self.context.preparations[sender] = true;
                }
            }
            if let Ok(mut inner) = self.check_preparations() {
                effects.append(&mut inner);
            }
        }
        for commit in recovery.commits {
            if commit.view_number == self.context.view_number {
                if let Ok(mut inner) = self.on_commit(
                    commit.validator_index as usize,
                    commit.view_number,
                    commit.signature,
                ) {
                    effects.append(&mut inner);
                }
            }
        }
        Ok(effects)
    }

    /// Quorum check: `m` preparations trigger this node's commit.
    fn check_preparations(&mut self) -> ConsensusResult<Vec<ConsensusEffect>> {
        if self.context.commit_sent
            || self.context.proposal.is_none()
            || self.context.preparation_count() < self.context.m()
            || !self.context.transactions_complete()
        {
            return Ok(Vec::new());
        }
        let Some(index) = self.context.my_index else {
            return Ok(Vec::new());
        };
        let signature = self.sign_header()?;
        self.context.commits[index] = Some(signature);
        self.context.commit_sent = true;
        info!(
            index = self.context.block_index,
            view = self.context.view_number,
            "preparations complete, committing"
        );
        let mut effects = vec![ConsensusEffect::Broadcast(
            self.message(ConsensusPayload::Commit { signature })?,
        )];
        effects.extend(self.check_commits()?);
        Ok(effects)
    }

    /// Quorum check: `m` commits seal the block.
    fn check_commits(&mut self) -> ConsensusResult<Vec<ConsensusEffect>> {
        if self.context.commit_count() < self.context.m() {
            return Ok(Vec::new());
        }
        let Some(block) = self.context.make_block() else {
            return Ok(Vec::new());
        };
        info!(
            index = block.index(),
            hash = %block.hash(),
            "commit quorum reached, sealing block"
        );
        Ok(vec![ConsensusEffect::PersistBlock(Box::new(block))])
    }

    /// Quorum check: `m` matching change-views advance the view.
    fn check_change_views(&mut self, view: u8) -> ConsensusResult<Vec<ConsensusEffect>> {
        if self.context.commit_sent {
            return Ok(Vec::new());
        }
        if self.context.change_view_count(view) < self.context.m() {
            return Ok(Vec::new());
        }
        info!(
            index = self.context.block_index,
            view, "change-view quorum reached"
        );
        self.context.reset_view(view);
        Ok(vec![ConsensusEffect::SetTimer(
            self.context.view_timeout(view),
        )])
    }

    fn build_recovery(&self) -> RecoveryMessage {
        let change_views = self
            .context
            .change_views
            .iter()
            .enumerate()
            .filter_map(|(i, vote)| {
                vote.map(|v| crate::messages::ChangeViewCompact {
                    validator_index: i as u8,
                    original_view: v.new_view.saturating_sub(1),
                    timestamp: v.timestamp,
                })
            })
            .collect();
        let preparations = self
            .context
            .preparations
            .iter()
            .enumerate()
            .filter(|(_, p)| **p)
            .map(|(i, _)| PreparationCompact {
                validator_index: i as u8,
            })
            .collect();
        let commits = self
            .context
            .commits
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                c.map(|signature| CommitCompact {
                    view_number: self.context.view_number,
                    validator_index: i as u8,
                    signature,
                })
            })
            .collect();
        RecoveryMessage {
            change_views,
            prepare_request: self.context.proposal.clone(),
            preparation_hash: None,
            preparations,
            commits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_config::ProtocolSettings;
    use neo3_core::{UInt160, UInt256};
    use neo3_crypto::KeyPair;
    use std::sync::Arc;

    /// A four-validator bench, each node with its own engine.
    struct Bench {
        engines: Vec<DbftEngine>,
    }

    impl Bench {
        fn new(block_index: u32) -> Self {
            let keys: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
            let mut validators: Vec<_> = keys.iter().map(|k| *k.public_key()).collect();
            validators.sort();
            // Keep key pairs aligned with the sorted validator order.
            let mut sorted_keys: Vec<KeyPair> = Vec::new();
            for v in &validators {
                sorted_keys.push(keys.iter().find(|k| k.public_key() == v).unwrap().clone());
            }
            let engines = sorted_keys
                .into_iter()
                .map(|key| {
                    DbftEngine::new(ConsensusContext::new(
                        Arc::new(ProtocolSettings::privnet()),
                        validators.clone(),
                        Some(key),
                        block_index,
                        UInt256::from_data(b"parent"),
                        1_000,
                        UInt160::ZERO,
                    ))
                })
                .collect();
            Self { engines }
        }

        fn broadcasts(effects: &[ConsensusEffect]) -> Vec<ConsensusMessage> {
            effects
                .iter()
                .filter_map(|e| match e {
                    ConsensusEffect::Broadcast(m) => Some(m.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn test_happy_path_n4() {
        // block index 1, view 0 => primary = validator 1.
        let mut bench = Bench::new(1);
        let primary = bench.engines[1]
            .context
            .primary_index(0);
        assert_eq!(primary, 1);

        // Primary proposes an empty block.
        let effects = bench.engines[1].on_start(Vec::new(), 7, 2_000).unwrap();
        let request = Bench::broadcasts(&effects)
            .into_iter()
            .next()
            .expect("primary broadcasts a prepare request");

        // Backups respond; collect all broadcasts per round.
        let mut responses = Vec::new();
        for i in [0usize, 2, 3] {
            let effects = bench.engines[i].on_message(request.clone()).unwrap();
            responses.extend(Bench::broadcasts(&effects));
        }
        // Each backup sent a PrepareResponse; with the request that is 3
        // preparations, so every backup also reached commit.
        let commits: Vec<ConsensusMessage> = {
            let mut all = Vec::new();
            for message in responses.clone() {
                for i in 0..4 {
                    if message.validator_index as usize == i {
                        continue;
                    }
                    if let Ok(effects) = bench.engines[i].on_message(message.clone()) {
                        all.extend(Bench::broadcasts(&effects));
                    }
                }
            }
            all.into_iter()
                .filter(|m| matches!(m.payload, ConsensusPayload::Commit { .. }))
                .collect()
        };
        assert!(!commits.is_empty());

        // Deliver commits everywhere until someone seals the block.
        let mut sealed: Option<Block> = None;
        for message in commits {
            for i in 0..4 {
                if message.validator_index as usize == i {
                    continue;
                }
                if let Ok(effects) = bench.engines[i].on_message(message.clone()) {
                    for effect in effects {
                        if let ConsensusEffect::PersistBlock(block) = effect {
                            sealed = Some(*block);
                        }
                    }
                }
            }
        }
        let block = sealed.expect("a validator sealed the block");
        assert_eq!(block.index(), 1);
        assert!(block.transactions.is_empty());
        // The witness carries exactly m = 3 signatures.
        let engine = &bench.engines[0];
        assert_eq!(engine.context.m(), 3);
    }

    #[test]
    fn test_commit_latching_blocks_view_change() {
        let mut bench = Bench::new(1);
        let effects = bench.engines[1].on_start(Vec::new(), 7, 2_000).unwrap();
        let request = Bench::broadcasts(&effects).remove(0);
        // Two backups respond so everyone holding them reaches m = 3.
        let r0 = Bench::broadcasts(&bench.engines[0].on_message(request.clone()).unwrap());
        let _ = bench.engines[1].on_message(r0[0].clone()).unwrap();
        let r2 = Bench::broadcasts(&bench.engines[2].on_message(request.clone()).unwrap());
        let effects = bench.engines[1].on_message(r2[0].clone()).unwrap();
        let sent_commit = Bench::broadcasts(&effects)
            .iter()
            .any(|m| matches!(m.payload, ConsensusPayload::Commit { .. }));
        assert!(sent_commit);
        assert!(bench.engines[1].context.commit_sent);

        // A timer tick after commit must NOT produce a ChangeView.
        let effects = bench.engines[1].on_timer(9_000).unwrap();
        for message in Bench::broadcasts(&effects) {
            assert!(!matches!(message.payload, ConsensusPayload::ChangeView { .. }));
        }
    }

    #[test]
    fn test_view_change_quorum_boundary() {
        let mut bench = Bench::new(1);
        // Deliver change-view votes from validators 0 and 1 to node 2.
        for sender in [0u8, 1] {
            let message = ConsensusMessage {
                block_index: 1,
                validator_index: sender,
                view_number: 0,
                payload: ConsensusPayload::ChangeView {
                    timestamp: 100,
                    reason: ChangeViewReason::Timeout,
                },
            };
            bench.engines[2].on_message(message).unwrap();
        }
        // Two votes (m - 1, counting nobody local) do not flip the view.
        assert_eq!(bench.engines[2].context.view_number, 0);

        // Node 2's own timeout is the third vote: quorum reached.
        bench.engines[2].on_timer(200).unwrap();
        assert_eq!(bench.engines[2].context.view_number, 1);
        // New primary for view 1 is validator 0.
        assert_eq!(bench.engines[2].context.primary_index(1), 0);
    }

    #[test]
    fn test_prepare_request_from_non_primary_rejected() {
        let mut bench = Bench::new(1);
        let bogus = ConsensusMessage {
            block_index: 1,
            validator_index: 2,
            view_number: 0,
            payload: ConsensusPayload::PrepareRequest(PrepareRequestPayload {
                version: 0,
                prev_hash: UInt256::from_data(b"parent"),
                timestamp: 5_000,
                nonce: 1,
                transaction_hashes: Vec::new(),
            }),
        };
        assert!(bench.engines[0].on_message(bogus).is_err());
    }

    #[test]
    fn test_stale_height_rejected() {
        let mut bench = Bench::new(1);
        let stale = ConsensusMessage {
            block_index: 9,
            validator_index: 0,
            view_number: 0,
            payload: ConsensusPayload::RecoveryRequest { timestamp: 0 },
        };
        assert!(matches!(
            bench.engines[0].on_message(stale),
            Err(ConsensusError::OutOfContext(_))
        ));
    }
}
