// Copyright (C) 2015-2025 The Neo Project.
//
// blockchain.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The ledger domain: owns the canonical snapshot and the strictly
//! serial block-persistence pipeline.

use crate::block::{Block, BlockHeader};
use crate::error::{LedgerError, LedgerResult, VerifyResult};
use crate::header_cache::HeaderCache;
use crate::mempool::MemoryPool;
use crate::state_root::{StateRootService, APP_LOG_ID};
use crate::verification::{
    persisting_view, verify_block, vm_state_byte, TransactionVerifier,
};
use neo3_config::ProtocolSettings;
use neo3_contract::native::ledger_contract;
use neo3_contract::{
    helpers, ApplicationEngine, ApplicationLog, Container, NativeRegistry, TriggerType,
};
use neo3_core::{Transaction, UInt160, UInt256, Witness};
use neo3_crypto::ECPoint;
use neo3_io::SerializableExt;
use neo3_persistence::{DataCache, StorageItem, StorageKey, Store};
use neo3_vm::{CallFlags, OpCode};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Gas ceiling for the native persist hooks (they meter storage writes
/// but never run scripts).
const PERSIST_HOOK_GAS: i64 = i64::MAX / 2;

/// Genesis constants shared by every Neo N3 network.
const GENESIS_TIMESTAMP: u64 = 1_468_595_301_000;
const GENESIS_NONCE: u64 = 2_083_236_893;

/// The ledger domain.
///
/// Only this type mutates the head of chain; block persistence is total
/// and serial under an internal lock. Reads go through child snapshots
/// that never block the writer.
pub struct Blockchain {
    settings: Arc<ProtocolSettings>,
    natives: Arc<NativeRegistry>,
    root: Arc<DataCache>,
    store: Arc<dyn Store>,
    mempool: Arc<MemoryPool>,
    header_cache: HeaderCache,
    state_service: Mutex<StateRootService>,
    persist_lock: Mutex<()>,
}

impl Blockchain {
    /// Opens (and if necessary bootstraps) the chain over `store`.
    pub fn new(settings: ProtocolSettings, store: Arc<dyn Store>) -> LedgerResult<Self> {
        let settings = Arc::new(settings);
        let natives = Arc::new(NativeRegistry::new(&settings));
        let root = Arc::new(DataCache::new(Arc::clone(&store)));
        let mempool = Arc::new(MemoryPool::new(settings.memory_pool_max_transactions));

        let chain = Self {
            settings,
            natives,
            root,
            store: Arc::clone(&store),
            mempool,
            header_cache: HeaderCache::default(),
            state_service: Mutex::new(StateRootService::new()),
            persist_lock: Mutex::new(()),
        };

        if ledger_contract::current_block(&chain.root).is_none() {
            let genesis = chain.genesis_block()?;
            info!(hash = %genesis.hash(), "bootstrapping genesis block");
            chain.persist_block(genesis, false)?;
        } else {
            let entries = store.find(&[], neo3_persistence::SeekDirection::Forward);
            chain
                .state_service
                .lock()
                .rebuild(entries.map(|(k, v)| (k, v)))?;
        }
        Ok(chain)
    }

    pub fn settings(&self) -> &Arc<ProtocolSettings> {
        &self.settings
    }

    pub fn natives(&self) -> &Arc<NativeRegistry> {
        &self.natives
    }

    pub fn mempool(&self) -> &Arc<MemoryPool> {
        &self.mempool
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn header_cache(&self) -> &HeaderCache {
        &self.header_cache
    }

    /// A fresh read snapshot over the canonical state.
    pub fn snapshot(&self) -> Arc<DataCache> {
        Arc::new(DataCache::snapshot(&self.root))
    }

    /// The current block height.
    pub fn height(&self) -> u32 {
        ledger_contract::current_block(&self.root)
            .map(|(_, index)| index)
            .unwrap_or(0)
    }

    /// The current head hash.
    pub fn current_hash(&self) -> UInt256 {
        ledger_contract::current_block(&self.root)
            .map(|(hash, _)| hash)
            .unwrap_or_default()
    }

    /// The block hash at `index`.
    pub fn block_hash(&self, index: u32) -> Option<UInt256> {
        ledger_contract::get_block_hash(&self.root, index)
    }

    /// Loads a full block by hash.
    pub fn block(&self, hash: &UInt256) -> Option<Block> {
        let (header_bytes, tx_hashes) =
            ledger_contract::get_trimmed_block(&self.root, hash).ok().flatten()?;
        let header = BlockHeader::from_array(&header_bytes).ok()?;
        let mut transactions = Vec::with_capacity(tx_hashes.len());
        for tx_hash in tx_hashes {
            let state = ledger_contract::get_transaction_state(&self.root, &tx_hash)
                .ok()
                .flatten()?;
            transactions.push(state.transaction);
        }
        Some(Block {
            header,
            transactions,
        })
    }

    /// Loads a transaction with its block coordinates.
    pub fn transaction(&self, hash: &UInt256) -> Option<(Transaction, u32)> {
        ledger_contract::get_transaction_state(&self.root, hash)
            .ok()
            .flatten()
            .map(|state| (state.transaction, state.block_index))
    }

    /// Whether `hash` is already on chain.
    pub fn contains_transaction(&self, hash: &UInt256) -> bool {
        ledger_contract::get_transaction_state(&self.root, hash)
            .ok()
            .flatten()
            .is_some()
    }

    /// The stored execution record of a transaction or block.
    pub fn application_log(&self, hash: &UInt256) -> Option<ApplicationLog> {
        let item = self.root.try_get(&StorageKey::with_prefix_bytes(
            APP_LOG_ID,
            1,
            &hash.to_array(),
        ))?;
        serde_json::from_slice(&item.value).ok()
    }

    /// Standalone verification for mempool admission.
    pub fn verify_transaction(&self, tx: &Transaction) -> VerifyResult {
        let verifier = TransactionVerifier {
            snapshot: self.snapshot(),
            settings: Arc::clone(&self.settings),
            natives: Arc::clone(&self.natives),
            height: self.height(),
        };
        verifier.verify(tx)
    }

    /// Verifies and pools a relayed transaction.
    pub fn try_add_transaction(&self, tx: Transaction) -> VerifyResult {
        if self.contains_transaction(&tx.hash()) {
            return VerifyResult::AlreadyExists;
        }
        let result = self.verify_transaction(&tx);
        if !result.is_ok() {
            return result;
        }
        self.mempool.try_add(tx)
    }

    /// The standby validators drawn from the configured committee.
    pub fn standby_validators(&self) -> LedgerResult<Vec<ECPoint>> {
        let mut validators = Vec::with_capacity(self.settings.validators_count);
        for hex in self
            .settings
            .standby_committee
            .iter()
            .take(self.settings.validators_count)
        {
            validators.push(
                ECPoint::from_hex(hex).map_err(|e| LedgerError::Other(e.to_string()))?,
            );
        }
        Ok(validators)
    }

    /// Builds the deterministic genesis block for this network.
    pub fn genesis_block(&self) -> LedgerResult<Block> {
        let mut validators = self.standby_validators()?;
        validators.sort();
        let m = validators.len() - (validators.len().saturating_sub(1)) / 3;
        let next_consensus = helpers::multisig_script_hash(m, &validators)?;
        Ok(Block {
            header: BlockHeader {
                version: 0,
                prev_hash: UInt256::ZERO,
                merkle_root: UInt256::ZERO,
                timestamp: GENESIS_TIMESTAMP,
                nonce: GENESIS_NONCE,
                index: 0,
                primary_index: 0,
                next_consensus,
                witness: Witness::new(Vec::new(), vec![OpCode::PUSH1 as u8]),
            },
            transactions: Vec::new(),
        })
    }

    /// Persists `block`: validation, the OnPersist hooks, every
    /// transaction in order, the PostPersist hooks, the state root, and
    /// one atomic commit.
    pub fn persist_block(&self, block: Block, verify: bool) -> LedgerResult<()> {
        let _guard = self.persist_lock.lock();

        if verify {
            verify_block(&block, &self.snapshot(), &self.settings, &self.natives)
                .map_err(LedgerError::InvalidBlock)?;
        }

        let snapshot = Arc::new(DataCache::snapshot(&self.root));
        let view = persisting_view(&block);
        let block_hash = block.hash();

        // Native OnPersist hooks (ContractManagement..Oracle, in order).
        let mut on_persist = ApplicationEngine::new(
            TriggerType::OnPersist,
            Container::Block(view.clone()),
            Arc::clone(&snapshot),
            Some(view.clone()),
            Arc::clone(&self.settings),
            Arc::clone(&self.natives),
            PERSIST_HOOK_GAS,
        );
        on_persist.host.block_transactions = block.transactions.clone();
        if block.index() == 0 {
            self.natives.initialize_all(&mut on_persist.host)?;
        }
        self.natives.on_persist_all(&mut on_persist.host)?;

        // Ledger entries for the block itself.
        ledger_contract::put_block(
            &snapshot,
            &block_hash,
            block.index(),
            &block.header.to_array(),
            &block.transaction_hashes(),
        )?;

        // Each transaction runs in its own engine over the shared
        // snapshot; a fault is recorded, never fatal to the block.
        for tx in &block.transactions {
            let mut engine = ApplicationEngine::new(
                TriggerType::Application,
                Container::Transaction(tx.clone()),
                Arc::clone(&snapshot),
                Some(view.clone()),
                Arc::clone(&self.settings),
                Arc::clone(&self.natives),
                tx.system_fee,
            );
            let state = match engine.load_script(tx.script.clone(), CallFlags::ALL) {
                Ok(()) => engine.execute(),
                Err(e) => {
                    warn!(tx = %tx.hash(), error = %e, "transaction script rejected");
                    engine.vm.fault(e.into());
                    engine.vm.state()
                }
            };
            if state == neo3_vm::VMState::FAULT {
                warn!(tx = %tx.hash(), "transaction faulted during persist");
            }
            ledger_contract::put_transaction(&snapshot, tx, block.index(), vm_state_byte(state))?;
            self.store_log(&snapshot, &tx.hash(), &engine.to_application_log())?;
        }

        // Native PostPersist hooks.
        let mut post_persist = ApplicationEngine::new(
            TriggerType::PostPersist,
            Container::Block(view.clone()),
            Arc::clone(&snapshot),
            Some(view),
            Arc::clone(&self.settings),
            Arc::clone(&self.natives),
            PERSIST_HOOK_GAS,
        );
        post_persist.host.block_transactions = block.transactions.clone();
        self.natives.post_persist_all(&mut post_persist.host)?;
        self.store_log(&snapshot, &block_hash, &post_persist.to_application_log())?;

        // State root over this block's changes, then the atomic commit.
        let changes = snapshot.tracked_changes();
        self.state_service
            .lock()
            .apply_block(&snapshot, block.index(), &changes)?;

        if let Err(e) = snapshot.commit().and_then(|_| self.root.commit()) {
            // A failed commit poisons the ledger; refuse to continue.
            error!(error = %e, "block commit failed");
            return Err(LedgerError::Storage(e));
        }

        self.header_cache.prune_to(block.index());
        self.mempool.update_for_block(&block.transactions);
        let verifier = TransactionVerifier {
            snapshot: self.snapshot(),
            settings: Arc::clone(&self.settings),
            natives: Arc::clone(&self.natives),
            height: block.index(),
        };
        self.mempool.reverify(1024, |tx| verifier.verify(tx));

        info!(
            index = block.index(),
            hash = %block_hash,
            transactions = block.transactions.len(),
            "block persisted"
        );
        Ok(())
    }

    fn store_log(
        &self,
        snapshot: &DataCache,
        hash: &UInt256,
        log: &ApplicationLog,
    ) -> LedgerResult<()> {
        let bytes = serde_json::to_vec(log)
            .map_err(|e| LedgerError::Other(format!("cannot encode application log: {e}")))?;
        snapshot.put(
            StorageKey::with_prefix_bytes(APP_LOG_ID, 1, &hash.to_array()),
            StorageItem::new(bytes),
        );
        Ok(())
    }

    /// Speculative execution for RPC `invokescript`.
    pub fn invoke_script(
        &self,
        script: Vec<u8>,
        signers: Vec<neo3_core::Signer>,
        gas_limit: i64,
    ) -> ApplicationEngine {
        let snapshot = self.snapshot();
        let container = if signers.is_empty() {
            Container::None
        } else {
            let witnesses = signers.iter().map(|_| Witness::empty()).collect();
            Container::Transaction(Transaction {
                valid_until_block: self.height() + 1,
                signers,
                script: script.clone(),
                witnesses,
                ..Default::default()
            })
        };
        let mut engine = ApplicationEngine::new(
            TriggerType::Application,
            container,
            snapshot,
            None,
            Arc::clone(&self.settings),
            Arc::clone(&self.natives),
            gas_limit,
        );
        if let Err(e) = engine.load_script(script, CallFlags::ALL) {
            engine.vm.fault(e.into());
        }
        engine.execute();
        engine
    }

    /// The consensus account expected for the next block.
    pub fn next_consensus_address(&self) -> LedgerResult<UInt160> {
        let snapshot = self.snapshot();
        let host = ApplicationEngine::new(
            TriggerType::Verification,
            Container::None,
            snapshot,
            None,
            Arc::clone(&self.settings),
            Arc::clone(&self.natives),
            0,
        )
        .host;
        let validators = neo3_contract::native::neo_token::next_block_validators(&host)?;
        let m = validators.len() - (validators.len().saturating_sub(1)) / 3;
        Ok(helpers::multisig_script_hash(m, &validators)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_persistence::MemoryStore;

    fn chain() -> Blockchain {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Blockchain::new(ProtocolSettings::privnet(), store).unwrap()
    }

    #[test]
    fn test_genesis_bootstrap() {
        let chain = chain();
        assert_eq!(chain.height(), 0);
        let hash = chain.current_hash();
        assert_ne!(hash, UInt256::ZERO);
        let genesis = chain.block(&hash).unwrap();
        assert_eq!(genesis.index(), 0);
        assert!(genesis.transactions.is_empty());
    }

    #[test]
    fn test_genesis_seeds_native_state() {
        let chain = chain();
        let snapshot = chain.snapshot();
        // Policy defaults exist after genesis.
        assert_eq!(
            neo3_contract::native::policy_contract::fee_per_byte(&snapshot),
            neo3_contract::native::policy_contract::DEFAULT_FEE_PER_BYTE
        );
        // The committee holds the NEO supply.
        let log = chain.application_log(&chain.current_hash());
        assert!(log.is_some());
    }

    #[test]
    fn test_persist_empty_block_advances_head() {
        let chain = chain();
        let genesis_hash = chain.current_hash();
        let next = Block {
            header: BlockHeader {
                version: 0,
                prev_hash: genesis_hash,
                merkle_root: UInt256::ZERO,
                timestamp: GENESIS_TIMESTAMP + 1_000,
                nonce: 42,
                index: 1,
                primary_index: 0,
                next_consensus: chain.block(&genesis_hash).unwrap().header.next_consensus,
                witness: Witness::new(Vec::new(), vec![OpCode::PUSH1 as u8]),
            },
            transactions: Vec::new(),
        };
        chain.persist_block(next, false).unwrap();
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.block_hash(0), Some(genesis_hash));
    }

    #[test]
    fn test_state_root_recorded_per_block() {
        let chain = chain();
        let snapshot = chain.snapshot();
        let root0 = crate::state_root::get_state_root(&snapshot, 0).unwrap();
        assert_ne!(root0.root_hash, UInt256::ZERO);
        assert_eq!(crate::state_root::state_height(&snapshot), Some(0));
    }

    #[test]
    fn test_verify_rejects_stale_prev_hash() {
        let chain = chain();
        let bogus = Block {
            header: BlockHeader {
                version: 0,
                prev_hash: UInt256::from_data(b"wrong"),
                merkle_root: UInt256::ZERO,
                timestamp: GENESIS_TIMESTAMP + 1_000,
                nonce: 0,
                index: 1,
                primary_index: 0,
                next_consensus: UInt160::ZERO,
                witness: Witness::empty(),
            },
            transactions: Vec::new(),
        };
        assert!(chain.persist_block(bogus, true).is_err());
        assert_eq!(chain.height(), 0);
    }
}
