// Copyright (C) 2015-2025 The Neo Project.
//
// verification.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Standalone transaction verification and block validation.

use crate::block::Block;
use crate::error::VerifyResult;
use neo3_config::ProtocolSettings;
use neo3_contract::native::{ledger_contract, neo_token, policy_contract};
use neo3_contract::{
    ApplicationEngine, Container, NativeRegistry, PersistingBlock, TriggerType,
};
use neo3_core::Transaction;
use neo3_io::{Serializable, SerializableExt};
use neo3_persistence::DataCache;
use neo3_vm::{CallFlags, OpCode, VMState};
use std::sync::Arc;
use tracing::debug;

/// Gas budget granted to a block witness check.
const HEADER_VERIFICATION_GAS: i64 = 3_00000000;

/// Verifies a transaction against the current chain state, without
/// touching the pool.
pub struct TransactionVerifier {
    pub snapshot: Arc<DataCache>,
    pub settings: Arc<ProtocolSettings>,
    pub natives: Arc<NativeRegistry>,
    pub height: u32,
}

impl TransactionVerifier {
    pub fn verify(&self, tx: &Transaction) -> VerifyResult {
        if tx.check_structure().is_err() {
            return VerifyResult::InvalidType;
        }
        let size = tx.size();
        if size > neo3_config::MAX_TRANSACTION_SIZE {
            return VerifyResult::InvalidSize;
        }
        if tx.valid_until_block <= self.height
            || tx.valid_until_block > self.height + self.settings.max_valid_until_block_increment()
        {
            return VerifyResult::Expired;
        }
        // Network fee must cover size plus witness verification.
        let fee_per_byte = policy_contract::fee_per_byte(&self.snapshot);
        let size_fee = fee_per_byte.saturating_mul(size as i64);
        if tx.network_fee < size_fee {
            return VerifyResult::InsufficientFunds;
        }
        for signer in &tx.signers {
            if policy_contract::is_blocked(&self.snapshot, &signer.account) {
                return VerifyResult::PolicyFail;
            }
        }
        if ledger_contract::get_transaction_state(&self.snapshot, &tx.hash())
            .ok()
            .flatten()
            .is_some()
        {
            return VerifyResult::AlreadyExists;
        }
        // A pooled or persisted conflict declared by this transaction is
        // checked by the pool; persisted conflicts invalidate outright.
        for conflict in tx.conflict_hashes() {
            if ledger_contract::get_transaction_state(&self.snapshot, &conflict)
                .ok()
                .flatten()
                .is_some()
            {
                return VerifyResult::HasConflicts;
            }
        }
        self.verify_witnesses(tx, tx.network_fee - size_fee)
    }

    /// Runs every witness in a read-only verification engine bounded by
    /// the remaining network fee.
    pub fn verify_witnesses(&self, tx: &Transaction, mut gas_budget: i64) -> VerifyResult {
        for (signer, witness) in tx.signers.iter().zip(tx.witnesses.iter()) {
            if witness.verification_script.is_empty() {
                // Contract-based witnesses are not admitted to the pool.
                return VerifyResult::InvalidSignature;
            }
            if witness.script_hash() != signer.account {
                return VerifyResult::InvalidSignature;
            }
            if !invocation_is_push_only(&witness.invocation_script) {
                return VerifyResult::InvalidScript;
            }
            let mut engine = ApplicationEngine::new(
                TriggerType::Verification,
                Container::Transaction(tx.clone()),
                Arc::clone(&self.snapshot),
                None,
                Arc::clone(&self.settings),
                Arc::clone(&self.natives),
                gas_budget,
            );
            if engine
                .load_script(witness.verification_script.clone(), CallFlags::READ_ONLY)
                .is_err()
            {
                return VerifyResult::InvalidScript;
            }
            if !witness.invocation_script.is_empty()
                && engine
                    .load_script(witness.invocation_script.clone(), CallFlags::NONE)
                    .is_err()
            {
                return VerifyResult::InvalidScript;
            }
            let state = engine.execute();
            gas_budget -= engine.gas_consumed();
            if state != VMState::HALT || gas_budget < 0 {
                debug!(account = %signer.account, "witness execution failed");
                return VerifyResult::InvalidSignature;
            }
            let items = engine.vm.result_stack().items();
            let accepted = items.len() == 1 && items[0].as_bool().unwrap_or(false);
            if !accepted {
                return VerifyResult::InvalidSignature;
            }
        }
        VerifyResult::Succeed
    }
}

/// Invocation scripts may only push data.
fn invocation_is_push_only(script: &[u8]) -> bool {
    let mut offset = 0usize;
    while offset < script.len() {
        let Ok(instruction) = neo3_vm::Instruction::decode(script, offset) else {
            return false;
        };
        if instruction.opcode as u8 > OpCode::PUSH16 as u8 {
            return false;
        }
        offset = instruction.next_offset();
    }
    true
}

/// Validates `block` against the chain state in `snapshot`.
pub fn verify_block(
    block: &Block,
    snapshot: &Arc<DataCache>,
    settings: &Arc<ProtocolSettings>,
    natives: &Arc<NativeRegistry>,
) -> Result<(), String> {
    if block.header.version != 0 {
        return Err(format!("unsupported block version {}", block.header.version));
    }
    let Some((current_hash, current_index)) = ledger_contract::current_block(snapshot) else {
        return Err("ledger has no head".into());
    };
    if block.header.prev_hash != current_hash {
        return Err("previous hash does not match the chain head".into());
    }
    if block.header.index != current_index + 1 {
        return Err(format!(
            "block index {} does not follow head {current_index}",
            block.header.index
        ));
    }
    let prev_header = ledger_contract::get_trimmed_block(snapshot, &current_hash)
        .ok()
        .flatten()
        .and_then(|(header_bytes, _)| crate::block::BlockHeader::from_array(&header_bytes).ok())
        .ok_or_else(|| "cannot load the parent header".to_string())?;
    if block.header.timestamp <= prev_header.timestamp {
        return Err("timestamp does not advance".into());
    }
    if !block.merkle_root_matches() {
        return Err("merkle root mismatch".into());
    }
    let mut seen = std::collections::HashSet::new();
    for tx in &block.transactions {
        if !seen.insert(tx.hash()) {
            return Err(format!("duplicate transaction {}", tx.hash()));
        }
    }

    // The witness must belong to the consensus account committed by the
    // parent, and the declared next_consensus must match the vote state.
    if block.header.witness.script_hash() != prev_header.next_consensus {
        return Err("block witness does not match the committed consensus account".into());
    }
    let expected_next = neo_token::next_block_validators(&verification_host(
        snapshot, settings, natives,
    ))
    .ok()
    .and_then(|validators| {
        let m = validators.len() - (validators.len().saturating_sub(1)) / 3;
        neo3_contract::helpers::multisig_script_hash(m, &validators).ok()
    });
    if let Some(expected) = expected_next {
        if block.header.next_consensus != expected {
            return Err("next_consensus does not match the vote state".into());
        }
    }

    verify_header_witness(block, snapshot, settings, natives)
}

/// Builds a throwaway host context for read-only native queries.
fn verification_host(
    snapshot: &Arc<DataCache>,
    settings: &Arc<ProtocolSettings>,
    natives: &Arc<NativeRegistry>,
) -> neo3_contract::HostContext {
    ApplicationEngine::new(
        TriggerType::Verification,
        Container::None,
        Arc::clone(snapshot),
        None,
        Arc::clone(settings),
        Arc::clone(natives),
        HEADER_VERIFICATION_GAS,
    )
    .host
}

/// Executes the block's multisig witness.
pub fn verify_header_witness(
    block: &Block,
    snapshot: &Arc<DataCache>,
    settings: &Arc<ProtocolSettings>,
    natives: &Arc<NativeRegistry>,
) -> Result<(), String> {
    let persisting = persisting_view(block);
    let mut engine = ApplicationEngine::new(
        TriggerType::Verification,
        Container::Block(persisting),
        Arc::clone(snapshot),
        None,
        Arc::clone(settings),
        Arc::clone(natives),
        HEADER_VERIFICATION_GAS,
    );
    engine
        .load_script(
            block.header.witness.verification_script.clone(),
            CallFlags::READ_ONLY,
        )
        .map_err(|e| format!("invalid verification script: {e}"))?;
    if !block.header.witness.invocation_script.is_empty() {
        engine
            .load_script(block.header.witness.invocation_script.clone(), CallFlags::NONE)
            .map_err(|e| format!("invalid invocation script: {e}"))?;
    }
    if engine.execute() != VMState::HALT {
        return Err("block witness faulted".into());
    }
    let items = engine.vm.result_stack().items();
    if items.len() == 1 && items[0].as_bool().unwrap_or(false) {
        Ok(())
    } else {
        Err("block witness returned false".into())
    }
}

/// The script-visible view of a block being persisted or verified.
pub fn persisting_view(block: &Block) -> PersistingBlock {
    PersistingBlock {
        hash: block.hash(),
        version: block.header.version,
        prev_hash: block.header.prev_hash,
        merkle_root: block.header.merkle_root,
        timestamp: block.header.timestamp,
        nonce: block.header.nonce,
        index: block.header.index,
        primary_index: block.header.primary_index,
        next_consensus: block.header.next_consensus,
    }
}

/// Maps a VM state to the byte stored with the transaction.
pub fn vm_state_byte(state: VMState) -> u8 {
    match state {
        VMState::HALT => 1,
        VMState::FAULT => 2,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Blockchain;
    use crate::error::VerifyResult;
    use neo3_contract::helpers;
    use neo3_core::{Signer, UInt160, Witness};
    use neo3_crypto::KeyPair;
    use neo3_persistence::MemoryStore;
    use neo3_vm::{OpCode, ScriptBuilder};

    fn signed_transaction(chain: &Blockchain, key: &KeyPair) -> Transaction {
        let verification = helpers::signature_redeem_script(key.public_key().as_bytes()).unwrap();
        let account = UInt160::from_script(&verification);

        let mut tx = Transaction {
            nonce: 42,
            system_fee: 0,
            network_fee: 0,
            valid_until_block: chain.height() + 10,
            signers: vec![Signer::called_by_entry(account)],
            script: vec![OpCode::PUSH1 as u8],
            witnesses: vec![Witness::empty()],
            ..Default::default()
        };

        // Fee covers size plus one signature check, with headroom.
        let fee_per_byte =
            neo3_contract::native::policy_contract::fee_per_byte(&chain.snapshot());
        // The witness grows the transaction; settle the size iteratively.
        for _ in 0..2 {
            let signature = key.sign(&tx.sign_data(chain.settings().network));
            let mut invocation = ScriptBuilder::new();
            invocation.emit_push_bytes(&signature);
            tx.witnesses = vec![Witness::new(invocation.into_bytes(), verification.clone())];
            tx.network_fee = fee_per_byte * tx.size() as i64 + 1_000_000;
        }
        // Fee changes alter the hash, so sign once more against the
        // final layout.
        let signature = key.sign(&tx.sign_data(chain.settings().network));
        let mut invocation = ScriptBuilder::new();
        invocation.emit_push_bytes(&signature);
        tx.witnesses = vec![Witness::new(invocation.into_bytes(), verification)];
        tx
    }

    fn verifier(chain: &Blockchain) -> TransactionVerifier {
        TransactionVerifier {
            snapshot: chain.snapshot(),
            settings: Arc::clone(chain.settings()),
            natives: Arc::clone(chain.natives()),
            height: chain.height(),
        }
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let store: Arc<dyn neo3_persistence::Store> = Arc::new(MemoryStore::new());
        let chain =
            Blockchain::new(neo3_config::ProtocolSettings::privnet(), store).unwrap();
        let key = KeyPair::generate();
        let tx = signed_transaction(&chain, &key);
        assert_eq!(verifier(&chain).verify(&tx), VerifyResult::Succeed);
    }

    #[test]
    fn test_flipped_signature_bit_rejected() {
        let store: Arc<dyn neo3_persistence::Store> = Arc::new(MemoryStore::new());
        let chain =
            Blockchain::new(neo3_config::ProtocolSettings::privnet(), store).unwrap();
        let key = KeyPair::generate();
        let mut tx = signed_transaction(&chain, &key);
        // Flip one bit inside the pushed signature.
        tx.witnesses[0].invocation_script[10] ^= 0x01;
        assert_eq!(
            verifier(&chain).verify(&tx),
            VerifyResult::InvalidSignature
        );
    }

    #[test]
    fn test_expired_transaction_rejected() {
        let store: Arc<dyn neo3_persistence::Store> = Arc::new(MemoryStore::new());
        let chain =
            Blockchain::new(neo3_config::ProtocolSettings::privnet(), store).unwrap();
        let key = KeyPair::generate();
        let mut tx = signed_transaction(&chain, &key);
        tx.valid_until_block = chain.height();
        assert_eq!(verifier(&chain).verify(&tx), VerifyResult::Expired);
    }

    #[test]
    fn test_underpaid_transaction_rejected() {
        let store: Arc<dyn neo3_persistence::Store> = Arc::new(MemoryStore::new());
        let chain =
            Blockchain::new(neo3_config::ProtocolSettings::privnet(), store).unwrap();
        let key = KeyPair::generate();
        let mut tx = signed_transaction(&chain, &key);
        tx.network_fee = 1;
        assert_eq!(
            verifier(&chain).verify(&tx),
            VerifyResult::InsufficientFunds
        );
    }
}
