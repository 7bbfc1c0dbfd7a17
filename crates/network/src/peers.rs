// Copyright (C) 2015-2025 The Neo Project.
//
// peers.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Peer bookkeeping and scoring.

use crate::{NetworkError, NetworkResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Peers at or below this score are disconnected.
pub const BAN_SCORE: i32 = -100;

/// Per-peer reputation and sync state.
#[derive(Debug, Clone)]
pub struct PeerScore {
    pub address: SocketAddr,
    pub nonce: u32,
    pub user_agent: String,
    pub last_height: u32,
    pub score: i32,
    pub task_failures: u32,
}

/// Tracks connected peers by handshake nonce.
#[derive(Debug, Default)]
pub struct PeerManager {
    local_nonce: u32,
    peers: RwLock<HashMap<u32, PeerScore>>,
}

impl PeerManager {
    pub fn new(local_nonce: u32) -> Self {
        Self {
            local_nonce,
            peers: RwLock::new(HashMap::new()),
        }
    }

    pub fn local_nonce(&self) -> u32 {
        self.local_nonce
    }

    /// Registers a peer after its version handshake. Rejects our own
    /// nonce (self-connection) and duplicate nonces (duplicate paths to
    /// the same peer).
    pub fn register(
        &self,
        address: SocketAddr,
        nonce: u32,
        user_agent: String,
        height: u32,
    ) -> NetworkResult<()> {
        if nonce == self.local_nonce {
            return Err(NetworkError::SelfConnection);
        }
        let mut peers = self.peers.write();
        if peers.contains_key(&nonce) {
            return Err(NetworkError::Transport(format!(
                "duplicate connection to nonce {nonce}"
            )));
        }
        peers.insert(
            nonce,
            PeerScore {
                address,
                nonce,
                user_agent,
                last_height: height,
                score: 0,
                task_failures: 0,
            },
        );
        Ok(())
    }

    pub fn unregister(&self, nonce: u32) {
        self.peers.write().remove(&nonce);
    }

    pub fn connected_count(&self) -> usize {
        self.peers.read().len()
    }

    pub fn peers(&self) -> Vec<PeerScore> {
        self.peers.read().values().cloned().collect()
    }

    /// Updates a peer's advertised height (ping payloads).
    pub fn update_height(&self, nonce: u32, height: u32) {
        if let Some(peer) = self.peers.write().get_mut(&nonce) {
            peer.last_height = peer.last_height.max(height);
        }
    }

    /// The best advertised height across peers.
    pub fn best_height(&self) -> u32 {
        self.peers
            .read()
            .values()
            .map(|p| p.last_height)
            .max()
            .unwrap_or(0)
    }

    /// Scores a peer down; returns true when it crossed the ban line.
    pub fn penalize(&self, nonce: u32, points: i32) -> bool {
        let mut peers = self.peers.write();
        if let Some(peer) = peers.get_mut(&nonce) {
            peer.score -= points;
            peer.task_failures += 1;
            if peer.score <= BAN_SCORE {
                peers.remove(&nonce);
                return true;
            }
        }
        false
    }

    /// The preferred peer for a sync task at `height`: highest score
    /// among peers that have the block, excluding `excluded`.
    pub fn pick_for_height(&self, height: u32, excluded: &[u32]) -> Option<u32> {
        self.peers
            .read()
            .values()
            .filter(|p| p.last_height >= height && !excluded.contains(&p.nonce))
            .max_by_key(|p| (p.score, p.last_height))
            .map(|p| p.nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn test_self_connection_rejected() {
        let manager = PeerManager::new(42);
        assert!(matches!(
            manager.register(addr(1), 42, "x".into(), 0),
            Err(NetworkError::SelfConnection)
        ));
    }

    #[test]
    fn test_duplicate_nonce_rejected() {
        let manager = PeerManager::new(1);
        manager.register(addr(1), 7, "a".into(), 5).unwrap();
        assert!(manager.register(addr(2), 7, "b".into(), 5).is_err());
        assert_eq!(manager.connected_count(), 1);
    }

    #[test]
    fn test_penalty_bans_at_threshold() {
        let manager = PeerManager::new(1);
        manager.register(addr(1), 7, "a".into(), 5).unwrap();
        assert!(!manager.penalize(7, 50));
        assert!(manager.penalize(7, 50));
        assert_eq!(manager.connected_count(), 0);
    }

    #[test]
    fn test_pick_prefers_higher_score() {
        let manager = PeerManager::new(1);
        manager.register(addr(1), 7, "a".into(), 100).unwrap();
        manager.register(addr(2), 8, "b".into(), 100).unwrap();
        manager.penalize(7, 10);
        assert_eq!(manager.pick_for_height(50, &[]), Some(8));
        assert_eq!(manager.pick_for_height(50, &[8]), Some(7));
        assert_eq!(manager.pick_for_height(200, &[]), None);
    }
}
