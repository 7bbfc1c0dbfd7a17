// Copyright (C) 2015-2025 The Neo Project.
//
// system.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Wires the domains together: store, ledger, network, RPC, consensus.

use anyhow::{Context, Result};
use neo3_config::ApplicationConfig;
use neo3_consensus::service::ConsensusCommand;
use neo3_consensus::ConsensusService;
use neo3_crypto::KeyPair;
use neo3_ledger::Blockchain;
use neo3_network::PeerManager;
use neo3_persistence::{MemoryStore, Store};
use neo3_rpc::RpcHandler;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// The running node: every domain behind one handle.
pub struct NeoSystem {
    blockchain: Arc<Blockchain>,
    peers: Arc<PeerManager>,
    consensus_commands: Option<mpsc::Sender<ConsensusCommand>>,
    /// Kept alive so the network relay loop survives on non-validators.
    _consensus_outbound: mpsc::Sender<neo3_network::ExtensiblePayload>,
}

impl NeoSystem {
    /// Builds and launches every domain on `runtime`.
    pub fn start(
        runtime: &Runtime,
        config: ApplicationConfig,
        validator_key: Option<&str>,
    ) -> Result<Self> {
        let app = &config.application_configuration;
        let store = open_store(&app.storage)?;
        let blockchain = Arc::new(
            Blockchain::new(config.protocol_configuration.clone(), store)
                .context("cannot open the blockchain")?,
        );

        let peers = Arc::new(PeerManager::new(rand::random()));
        let rpc_handler = Arc::new(RpcHandler::new(
            Arc::clone(&blockchain),
            Some(Arc::clone(&peers)),
            app.rpc.clone(),
        ));
        let rpc_address: SocketAddr = ([0, 0, 0, 0], app.rpc.port).into();
        runtime.spawn(neo3_rpc::serve(rpc_handler, rpc_address));

        // The P2P shell: handshake, relay and block sync.
        let (consensus_inbound_tx, consensus_inbound_rx) = mpsc::channel(256);
        let (consensus_outbound_tx, consensus_outbound_rx) = mpsc::channel(256);
        runtime.spawn(crate::p2p_shell::run(
            Arc::clone(&blockchain),
            Arc::clone(&peers),
            config.protocol_configuration.clone(),
            app.p2p.clone(),
            consensus_inbound_tx.clone(),
            consensus_outbound_rx,
        ));

        // Consensus only runs with a validator key.
        let consensus_commands = match validator_key {
            Some(hex_key) => {
                let bytes = hex::decode(hex_key).context("validator key is not hex")?;
                let key_pair =
                    KeyPair::from_private_key(&bytes).context("invalid validator key")?;
                info!(public_key = %key_pair.public_key(), "consensus enabled");
                let service = ConsensusService::new(
                    Arc::clone(&blockchain),
                    key_pair,
                    consensus_outbound_tx.clone(),
                    consensus_inbound_rx,
                );
                runtime.spawn(async move {
                    if let Err(e) = service.run().await {
                        warn!(error = %e, "consensus service stopped");
                    }
                });
                Some(consensus_inbound_tx)
            }
            None => None,
        };

        Ok(Self {
            blockchain,
            peers,
            consensus_commands,
            _consensus_outbound: consensus_outbound_tx,
        })
    }

    pub fn blockchain(&self) -> &Arc<Blockchain> {
        &self.blockchain
    }

    pub fn peers(&self) -> &Arc<PeerManager> {
        &self.peers
    }

    /// Graceful shutdown: stop consensus first, then let tasks drain.
    pub fn shutdown(&self) {
        if let Some(commands) = &self.consensus_commands {
            let _ = commands.try_send(ConsensusCommand::Shutdown);
        }
    }
}

fn open_store(storage: &neo3_config::StorageConfig) -> Result<Arc<dyn Store>> {
    match storage.engine.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "rocksdb")]
        "rocksdb" => {
            std::fs::create_dir_all(&storage.path)
                .with_context(|| format!("cannot create {}", storage.path.display()))?;
            Ok(Arc::new(
                neo3_persistence::RocksDbStore::open(&storage.path)
                    .context("cannot open rocksdb")?,
            ))
        }
        other => anyhow::bail!("unknown storage engine {other}"),
    }
}
