// Copyright (C) 2015-2025 The Neo Project.
//
// service.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The consensus service shell: owns the engine, the view timer and the
//! channel plumbing; all protocol decisions stay in [`DbftEngine`].

use crate::context::ConsensusContext;
use crate::dbft::{ConsensusEffect, DbftEngine};
use crate::error::{ConsensusError, ConsensusResult};
use crate::messages::ConsensusMessage;
use neo3_contract::helpers;
use neo3_core::Witness;
use neo3_crypto::KeyPair;
use neo3_io::{MemoryReader, Serializable, SerializableExt};
use neo3_ledger::Blockchain;
use neo3_network::ExtensiblePayload;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// The extensible-payload category consensus rides on.
pub const DBFT_CATEGORY: &str = "dBFT";

/// Commands accepted by the running service.
pub enum ConsensusCommand {
    /// A verified inbound dBFT payload.
    Payload(ExtensiblePayload),
    /// The ledger persisted a block (ours or synced).
    BlockPersisted(u32),
    /// Stop the service.
    Shutdown,
}

/// Runs dBFT for a validator node.
pub struct ConsensusService {
    blockchain: Arc<Blockchain>,
    key_pair: KeyPair,
    outbound: mpsc::Sender<ExtensiblePayload>,
    commands: mpsc::Receiver<ConsensusCommand>,
}

impl ConsensusService {
    pub fn new(
        blockchain: Arc<Blockchain>,
        key_pair: KeyPair,
        outbound: mpsc::Sender<ExtensiblePayload>,
        commands: mpsc::Receiver<ConsensusCommand>,
    ) -> Self {
        Self {
            blockchain,
            key_pair,
            outbound,
            commands,
        }
    }

    fn build_context(&self) -> ConsensusResult<ConsensusContext> {
        let height = self.blockchain.height();
        let snapshot = self.blockchain.snapshot();
        let prev_hash = self.blockchain.current_hash();
        let prev_timestamp = self
            .blockchain
            .block(&prev_hash)
            .map(|b| b.header.timestamp)
            .unwrap_or(0);
        let next_consensus = self
            .blockchain
            .next_consensus_address()
            .map_err(|e| ConsensusError::Ledger(e.to_string()))?;

        // Validators for the next block come from the vote state.
        let host = self
            .blockchain
            .invoke_script(vec![neo3_vm::OpCode::RET as u8], Vec::new(), 0)
            .host;
        let validators = neo3_contract::native::neo_token::next_block_validators(&host)
            .map_err(|e| ConsensusError::Ledger(e.to_string()))?;
        drop(snapshot);

        Ok(ConsensusContext::new(
            Arc::clone(self.blockchain.settings()),
            validators,
            Some(self.key_pair.clone()),
            height + 1,
            prev_hash,
            prev_timestamp,
            next_consensus,
        ))
    }

    fn wrap_message(&self, message: &ConsensusMessage) -> ConsensusResult<ExtensiblePayload> {
        let sender = helpers::public_key_to_script_hash(self.key_pair.public_key())
            .map_err(|e| ConsensusError::InvalidState(e.to_string()))?;
        let mut payload = ExtensiblePayload {
            category: DBFT_CATEGORY.into(),
            valid_block_start: message.block_index.saturating_sub(1),
            valid_block_end: message.block_index + 1,
            sender,
            data: message.to_array(),
            witness: Witness::empty(),
        };
        let network = self.blockchain.settings().network;
        let signature = self.key_pair.sign(&payload.sign_data(network));
        let mut invocation = neo3_vm::ScriptBuilder::new();
        invocation.emit_push_bytes(&signature);
        let verification = helpers::signature_redeem_script(self.key_pair.public_key().as_bytes())
            .map_err(|e| ConsensusError::InvalidState(e.to_string()))?;
        payload.witness = Witness::new(invocation.into_bytes(), verification);
        Ok(payload)
    }

    fn unwrap_payload(
        &self,
        engine: &DbftEngine,
        payload: &ExtensiblePayload,
    ) -> ConsensusResult<ConsensusMessage> {
        if payload.category != DBFT_CATEGORY {
            return Err(ConsensusError::InvalidMessage("wrong category".into()));
        }
        let mut reader = MemoryReader::new(&payload.data);
        let message = ConsensusMessage::deserialize(&mut reader)?;
        // The sender's witness account must match its validator slot.
        let index = message.validator_index as usize;
        let expected = engine
            .context
            .validators
            .get(index)
            .and_then(|key| helpers::public_key_to_script_hash(key).ok())
            .ok_or_else(|| ConsensusError::InvalidMessage("unknown validator".into()))?;
        if payload.sender != expected {
            return Err(ConsensusError::InvalidMessage(
                "payload sender does not match the validator".into(),
            ));
        }
        Ok(message)
    }

    async fn perform(&self, engine: &mut DbftEngine, effects: Vec<ConsensusEffect>, timer: &mut TimerSlot) {
        for effect in effects {
            match effect {
                ConsensusEffect::Broadcast(message) => match self.wrap_message(&message) {
                    Ok(payload) => {
                        if self.outbound.send(payload).await.is_err() {
                            warn!("outbound consensus channel closed");
                        }
                    }
                    Err(e) => error!(error = %e, "cannot wrap consensus message"),
                },
                ConsensusEffect::SetTimer(duration) => timer.arm(duration),
                ConsensusEffect::PersistBlock(block) => {
                    let index = block.index();
                    match self.blockchain.persist_block(*block, true) {
                        Ok(()) => info!(index, "consensus block persisted"),
                        Err(e) => error!(index, error = %e, "consensus block rejected"),
                    }
                }
                ConsensusEffect::RequestTransactions(hashes) => {
                    // The mempool usually has them; anything missing is
                    // fetched by the relay layer on announcement.
                    debug!(missing = hashes.len(), "proposal transactions missing");
                    let _ = hashes
                        .iter()
                        .filter_map(|h| self.blockchain.mempool().get(h))
                        .map(|tx| engine.context.transactions.insert(tx.hash(), tx))
                        .count();
                }
            }
        }
    }

    /// Runs until shutdown. Each height builds a fresh context; every
    /// message and timer tick flows through the pure engine.
    pub async fn run(mut self) -> ConsensusResult<()> {
        let mut engine = DbftEngine::new(self.build_context()?);
        if engine.context.my_index.is_none() {
            info!("node is not a validator for this height; consensus idle");
        }
        let mut timer = TimerSlot::default();

        let effects = self.start_round(&mut engine)?;
        self.perform(&mut engine, effects, &mut timer).await;

        loop {
            tokio::select! {
                _ = timer.wait() => {
                    let now = now_ms();
                    match engine.on_timer(now) {
                        Ok(effects) => self.perform(&mut engine, effects, &mut timer).await,
                        Err(e) => debug!(error = %e, "timer tick ignored"),
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        Some(ConsensusCommand::Payload(payload)) => {
                            match self.unwrap_payload(&engine, &payload) {
                                Ok(message) => match engine.on_message(message) {
                                    Ok(effects) => self.perform(&mut engine, effects, &mut timer).await,
                                    Err(e) => debug!(error = %e, "consensus message dropped"),
                                },
                                Err(e) => debug!(error = %e, "invalid consensus payload"),
                            }
                        }
                        Some(ConsensusCommand::BlockPersisted(_)) => {
                            engine = DbftEngine::new(self.build_context()?);
                            let effects = self.start_round(&mut engine)?;
                            self.perform(&mut engine, effects, &mut timer).await;
                        }
                        Some(ConsensusCommand::Shutdown) | None => break,
                    }
                }
            }
        }
        Ok(())
    }

    fn start_round(&self, engine: &mut DbftEngine) -> ConsensusResult<Vec<ConsensusEffect>> {
        if engine.context.my_index.is_none() {
            return Ok(Vec::new());
        }
        let max = self.blockchain.settings().max_transactions_per_block as usize;
        let transactions = self.blockchain.mempool().take_for_block(max);
        engine.on_start(transactions, rand::random::<u64>(), now_ms())
    }
}

/// A one-shot re-armable timer for the select loop.
#[derive(Default)]
struct TimerSlot {
    deadline: Option<tokio::time::Instant>,
}

impl TimerSlot {
    fn arm(&mut self, duration: Duration) {
        self.deadline = Some(tokio::time::Instant::now() + duration);
    }

    async fn wait(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            // An unarmed timer never fires.
            None => std::future::pending().await,
        }
    }
}

fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
