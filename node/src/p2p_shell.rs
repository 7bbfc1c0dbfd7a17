// Copyright (C) 2015-2025 The Neo Project.
//
// p2p_shell.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The TCP shell around the socket-free protocol layer: connects to
//! seeds, runs the version handshake, frames messages and feeds the sync
//! manager, the mempool and consensus.

use neo3_config::{P2PConfig, ProtocolSettings};
use neo3_consensus::service::{ConsensusCommand, DBFT_CATEGORY};
use neo3_io::SerializableExt;
use neo3_ledger::{Block, Blockchain};
use neo3_network::{
    ExtensiblePayload, GetBlockByIndexPayload, InvPayload, Message, MessageCommand,
    NodeCapability, PeerManager, PingPayload, SyncEvent, SyncManager, VersionPayload,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "/neo3-rs:0.1/";

/// Per-peer writer handles, keyed by handshake nonce.
type PeerWriters = Arc<tokio::sync::Mutex<HashMap<u32, mpsc::Sender<Vec<u8>>>>>;

/// Runs the network shell until the process exits.
pub async fn run(
    blockchain: Arc<Blockchain>,
    peers: Arc<PeerManager>,
    settings: ProtocolSettings,
    config: P2PConfig,
    consensus_inbound: mpsc::Sender<ConsensusCommand>,
    mut consensus_outbound: mpsc::Receiver<ExtensiblePayload>,
) {
    let sync = Arc::new(SyncManager::new(Arc::clone(&peers), blockchain.height()));
    let writers: PeerWriters = Arc::default();

    // Accept loop.
    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => Some(listener),
        Err(e) => {
            warn!(error = %e, port = config.port, "cannot bind p2p listener");
            None
        }
    };
    if let Some(listener) = listener {
        let blockchain = Arc::clone(&blockchain);
        let peers = Arc::clone(&peers);
        let sync = Arc::clone(&sync);
        let writers = Arc::clone(&writers);
        let settings = settings.clone();
        let consensus = consensus_inbound.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, address)) => {
                        debug!(%address, "inbound connection");
                        spawn_connection(
                            stream,
                            Arc::clone(&blockchain),
                            Arc::clone(&peers),
                            Arc::clone(&sync),
                            Arc::clone(&writers),
                            settings.clone(),
                            consensus.clone(),
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    // Seed dialer.
    {
        let peers = Arc::clone(&peers);
        let blockchain = Arc::clone(&blockchain);
        let sync = Arc::clone(&sync);
        let writers = Arc::clone(&writers);
        let settings = settings.clone();
        let seeds = settings.seed_list.clone();
        let consensus = consensus_inbound.clone();
        let min_connections = config.min_desired_connections;
        tokio::spawn(async move {
            loop {
                if peers.connected_count() < min_connections {
                    for seed in &seeds {
                        if let Ok(stream) =
                            tokio::time::timeout(Duration::from_secs(5), TcpStream::connect(seed))
                                .await
                                .unwrap_or_else(|_| {
                                    Err(std::io::Error::new(
                                        std::io::ErrorKind::TimedOut,
                                        "connect timeout",
                                    ))
                                })
                        {
                            debug!(%seed, "outbound connection");
                            spawn_connection(
                                stream,
                                Arc::clone(&blockchain),
                                Arc::clone(&peers),
                                Arc::clone(&sync),
                                Arc::clone(&writers),
                                settings.clone(),
                                consensus.clone(),
                            );
                        }
                    }
                }
                tokio::time::sleep(Duration::from_secs(15)).await;
            }
        });
    }

    // Sync heartbeat + consensus outbound relay.
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sync.advance_to(blockchain.height());
                let events = sync.poll(Instant::now());
                perform_sync_events(events, &blockchain, &writers).await;
            }
            payload = consensus_outbound.recv() => {
                let Some(payload) = payload else { break };
                let message = Message::new(
                    MessageCommand::Extensible,
                    payload.to_array(),
                );
                broadcast(&writers, message).await;
            }
        }
    }
}

async fn perform_sync_events(
    events: Vec<SyncEvent>,
    blockchain: &Arc<Blockchain>,
    writers: &PeerWriters,
) {
    for event in events {
        match event {
            SyncEvent::Send { peer, message } => {
                let writers = writers.lock().await;
                if let Some(writer) = writers.get(&peer) {
                    let _ = writer.send(message.encode()).await;
                }
            }
            SyncEvent::PersistBlock(block) => {
                if let Err(e) = blockchain.persist_block(*block, true) {
                    warn!(error = %e, "synced block rejected");
                }
            }
        }
    }
}

async fn broadcast(writers: &PeerWriters, message: Message) {
    let encoded = message.encode();
    let writers = writers.lock().await;
    for writer in writers.values() {
        let _ = writer.send(encoded.clone()).await;
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_connection(
    stream: TcpStream,
    blockchain: Arc<Blockchain>,
    peers: Arc<PeerManager>,
    sync: Arc<SyncManager>,
    writers: PeerWriters,
    settings: ProtocolSettings,
    consensus: mpsc::Sender<ConsensusCommand>,
) {
    tokio::spawn(async move {
        if let Err(e) = drive_connection(
            stream, blockchain, peers, sync, writers, settings, consensus,
        )
        .await
        {
            debug!(error = %e, "connection closed");
        }
    });
}

async fn drive_connection(
    stream: TcpStream,
    blockchain: Arc<Blockchain>,
    peers: Arc<PeerManager>,
    sync: Arc<SyncManager>,
    writers: PeerWriters,
    settings: ProtocolSettings,
    consensus: mpsc::Sender<ConsensusCommand>,
) -> std::io::Result<()> {
    let address = stream.peer_addr()?;
    let (mut reader, mut writer) = stream.into_split();

    // Send our version first.
    let version = VersionPayload {
        network: settings.network,
        version: 0,
        timestamp: unix_now(),
        nonce: peers.local_nonce(),
        user_agent: USER_AGENT.into(),
        capabilities: vec![NodeCapability::FullNode {
            start_height: blockchain.height(),
        }],
    };
    writer
        .write_all(&Message::with_payload(MessageCommand::Version, &version).encode())
        .await?;

    let mut buffer: Vec<u8> = Vec::with_capacity(8 * 1024);
    let mut chunk = [0u8; 16 * 1024];
    let mut peer_nonce: Option<u32> = None;

    // Writer task fed through a channel so handlers never block reads.
    let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
    tokio::spawn(async move {
        while let Some(bytes) = writer_rx.recv().await {
            if writer.write_all(&bytes).await.is_err() {
                break;
            }
        }
    });

    let result: std::io::Result<()> = 'connection: loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break Ok(());
        }
        buffer.extend_from_slice(&chunk[..read]);

        loop {
            match Message::decode(&buffer) {
                Ok((message, consumed)) => {
                    buffer.drain(..consumed);
                    if let Err(e) = handle_message(
                        &message,
                        &mut peer_nonce,
                        address,
                        &blockchain,
                        &peers,
                        &sync,
                        &writers,
                        &settings,
                        &writer_tx,
                        &consensus,
                    )
                    .await
                    {
                        debug!(error = %e, "peer misbehaved, disconnecting");
                        break 'connection Ok(());
                    }
                }
                // An incomplete frame just waits for more bytes.
                Err(neo3_network::NetworkError::Serialization(
                    neo3_io::IoError::EndOfStream,
                )) => break,
                Err(e) => {
                    debug!(error = %e, "unrecoverable frame error");
                    break 'connection Ok(());
                }
            }
        }
    };

    if let Some(nonce) = peer_nonce {
        peers.unregister(nonce);
        writers.lock().await.remove(&nonce);
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn handle_message(
    message: &Message,
    peer_nonce: &mut Option<u32>,
    address: std::net::SocketAddr,
    blockchain: &Arc<Blockchain>,
    peers: &Arc<PeerManager>,
    sync: &Arc<SyncManager>,
    writers: &PeerWriters,
    settings: &ProtocolSettings,
    writer: &mpsc::Sender<Vec<u8>>,
    consensus: &mpsc::Sender<ConsensusCommand>,
) -> Result<(), String> {
    match message.command {
        MessageCommand::Version => {
            let version: VersionPayload =
                message.payload_as().map_err(|e| e.to_string())?;
            if version.network != settings.network {
                return Err(format!("magic mismatch 0x{:08x}", version.network));
            }
            peers
                .register(
                    address,
                    version.nonce,
                    version.user_agent.clone(),
                    version.start_height().unwrap_or(0),
                )
                .map_err(|e| e.to_string())?;
            *peer_nonce = Some(version.nonce);
            writers
                .lock()
                .await
                .insert(version.nonce, writer.clone());
            let _ = writer
                .send(Message::empty(MessageCommand::Verack).encode())
                .await;
        }
        MessageCommand::Verack => {}
        MessageCommand::Ping => {
            if let (Some(nonce), Ok(ping)) =
                (*peer_nonce, message.payload_as::<PingPayload>())
            {
                peers.update_height(nonce, ping.last_block_index);
            }
            let pong = PingPayload {
                last_block_index: blockchain.height(),
                timestamp: unix_now(),
                nonce: rand::random(),
            };
            let _ = writer
                .send(Message::with_payload(MessageCommand::Pong, &pong).encode())
                .await;
        }
        MessageCommand::Pong => {}
        MessageCommand::GetBlockByIndex => {
            let request: GetBlockByIndexPayload =
                message.payload_as().map_err(|e| e.to_string())?;
            let count = if request.count < 0 { 500 } else { request.count } as u32;
            for index in request.index_start..request.index_start.saturating_add(count) {
                let Some(hash) = blockchain.block_hash(index) else {
                    break;
                };
                let Some(block) = blockchain.block(&hash) else {
                    break;
                };
                let _ = writer
                    .send(Message::with_payload(MessageCommand::Block, &block).encode())
                    .await;
            }
        }
        MessageCommand::Block => {
            let block: Block = message.payload_as().map_err(|e| e.to_string())?;
            let events = sync.on_block(block);
            perform_sync_events(events, blockchain, writers).await;
        }
        MessageCommand::Transaction => {
            let tx: neo3_core::Transaction =
                message.payload_as().map_err(|e| e.to_string())?;
            let result = blockchain.try_add_transaction(tx);
            debug!(?result, "relayed transaction");
        }
        MessageCommand::Inv => {
            let inventory: InvPayload = message.payload_as().map_err(|e| e.to_string())?;
            // Request everything we miss.
            let missing: Vec<_> = inventory
                .hashes
                .iter()
                .filter(|h| !blockchain.mempool().contains(h) && !blockchain.contains_transaction(h))
                .copied()
                .collect();
            if !missing.is_empty() {
                let request = InvPayload {
                    inventory_type: inventory.inventory_type,
                    hashes: missing,
                };
                let _ = writer
                    .send(Message::with_payload(MessageCommand::GetData, &request).encode())
                    .await;
            }
        }
        MessageCommand::GetHeaders => {
            let request: GetBlockByIndexPayload =
                message.payload_as().map_err(|e| e.to_string())?;
            let count = if request.count < 0 { 2000 } else { request.count } as u32;
            let mut headers = Vec::new();
            for index in request.index_start..request.index_start.saturating_add(count) {
                let Some(hash) = blockchain.block_hash(index) else {
                    break;
                };
                let Some(block) = blockchain.block(&hash) else {
                    break;
                };
                headers.push(block.header);
            }
            if !headers.is_empty() {
                let payload = neo3_network::HeadersPayload { headers };
                let _ = writer
                    .send(Message::with_payload(MessageCommand::Headers, &payload).encode())
                    .await;
            }
        }
        MessageCommand::Mempool => {
            let hashes: Vec<_> = blockchain
                .mempool()
                .verified_transactions()
                .iter()
                .map(|tx| tx.hash())
                .collect();
            if !hashes.is_empty() {
                let payload = InvPayload {
                    inventory_type: neo3_network::InventoryType::Transaction,
                    hashes,
                };
                let _ = writer
                    .send(Message::with_payload(MessageCommand::Inv, &payload).encode())
                    .await;
            }
        }
        MessageCommand::Extensible => {
            let payload: ExtensiblePayload =
                message.payload_as().map_err(|e| e.to_string())?;
            if payload.category == DBFT_CATEGORY {
                let _ = consensus
                    .send(ConsensusCommand::Payload(payload))
                    .await;
            }
        }
        MessageCommand::GetAddr => {}
        other => {
            debug!(?other, "unhandled command");
        }
    }
    Ok(())
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
