// Copyright (C) 2015-2025 The Neo Project.
//
// sync.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The block-sync state machine.
//!
//! Tasks carry deadlines; timeouts and `NotFound` responses re-route the
//! task to another peer and score the failing peer down. Received blocks
//! queue by index and drain strictly in order into the ledger.

use crate::messages::{GetBlockByIndexPayload, Message, MessageCommand, MAX_BLOCKS_PER_REQUEST};
use crate::peers::PeerManager;
use neo3_io::SerializableExt;
use neo3_ledger::Block;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long a peer has to answer a block request.
pub const TASK_TIMEOUT: Duration = Duration::from_secs(30);
/// Penalty for a failed sync task.
pub const TASK_FAILURE_PENALTY: i32 = 10;
/// Most in-flight block requests.
pub const MAX_PENDING_TASKS: usize = 16;

/// One outstanding block-range request.
#[derive(Debug, Clone)]
pub struct SyncTask {
    pub start_index: u32,
    pub count: u16,
    pub peer: u32,
    pub deadline: Instant,
    /// Peers that already failed this range.
    pub tried: Vec<u32>,
}

/// Something the node shell must do for the sync manager.
#[derive(Debug)]
pub enum SyncEvent {
    /// Send `message` to peer `nonce`.
    Send { peer: u32, message: Message },
    /// A block is ready to persist (strictly next in order).
    PersistBlock(Box<Block>),
}

struct SyncState {
    tasks: HashMap<u32, SyncTask>,
    /// Received blocks waiting for their turn, keyed by index.
    queue: BTreeMap<u32, Block>,
    /// The next index the ledger expects.
    next_index: u32,
}

/// Drives header/block download against the ledger height.
pub struct SyncManager {
    peers: Arc<PeerManager>,
    state: Mutex<SyncState>,
}

impl SyncManager {
    pub fn new(peers: Arc<PeerManager>, current_height: u32) -> Self {
        Self {
            peers,
            state: Mutex::new(SyncState {
                tasks: HashMap::new(),
                queue: BTreeMap::new(),
                next_index: current_height + 1,
            }),
        }
    }

    /// The next block index the ledger expects.
    pub fn next_index(&self) -> u32 {
        self.state.lock().next_index
    }

    /// Queued-but-not-yet-persisted block count.
    pub fn queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Schedules requests toward `target_height`, returning the sends.
    pub fn poll(&self, now: Instant) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        let mut state = self.state.lock();

        // Re-route expired tasks first.
        let expired: Vec<u32> = state
            .tasks
            .iter()
            .filter(|(_, task)| task.deadline <= now)
            .map(|(start, _)| *start)
            .collect();
        for start in expired {
            if let Some(mut task) = state.tasks.remove(&start) {
                warn!(start, peer = task.peer, "sync task timed out");
                self.peers.penalize(task.peer, TASK_FAILURE_PENALTY);
                task.tried.push(task.peer);
                if let Some(peer) = self.peers.pick_for_height(start, &task.tried) {
                    task.peer = peer;
                    task.deadline = now + TASK_TIMEOUT;
                    events.push(request_event(&task));
                    state.tasks.insert(start, task);
                }
            }
        }

        // Issue new tasks up to the in-flight cap.
        let target = self.peers.best_height();
        let mut cursor = state
            .tasks
            .iter()
            .map(|(start, task)| *start + u32::from(task.count))
            .max()
            .unwrap_or(state.next_index)
            .max(state.next_index);
        while state.tasks.len() < MAX_PENDING_TASKS && cursor <= target {
            let Some(peer) = self.peers.pick_for_height(cursor, &[]) else {
                break;
            };
            let remaining = target - cursor + 1;
            let count = remaining.min(MAX_BLOCKS_PER_REQUEST as u32) as u16;
            let task = SyncTask {
                start_index: cursor,
                count,
                peer,
                deadline: now + TASK_TIMEOUT,
                tried: Vec::new(),
            };
            debug!(start = cursor, count, peer, "requesting blocks");
            events.push(request_event(&task));
            state.tasks.insert(cursor, task);
            cursor += u32::from(count);
        }
        events
    }

    /// Accepts a received block, returning persist events for every
    /// block that is now in order.
    pub fn on_block(&self, block: Block) -> Vec<SyncEvent> {
        let mut state = self.state.lock();
        let index = block.index();
        if index < state.next_index {
            return Vec::new();
        }
        // Clear the covering task once its range is satisfied.
        let covering: Option<u32> = state
            .tasks
            .iter()
            .find(|(start, task)| index >= **start && index < **start + u32::from(task.count))
            .map(|(start, _)| *start);
        if let Some(start) = covering {
            let complete = {
                let task = &state.tasks[&start];
                let end = start + u32::from(task.count);
                (start..end).all(|i| i == index || state.queue.contains_key(&i) || i < state.next_index)
            };
            if complete {
                state.tasks.remove(&start);
            }
        }
        state.queue.insert(index, block);

        let mut events = Vec::new();
        while let Some(block) = state.queue.remove(&state.next_index) {
            state.next_index += 1;
            events.push(SyncEvent::PersistBlock(Box::new(block)));
        }
        events
    }

    /// Handles a `NotFound` for a requested range: re-route elsewhere.
    pub fn on_not_found(&self, peer: u32, start_index: u32, now: Instant) -> Vec<SyncEvent> {
        let mut state = self.state.lock();
        let Some(mut task) = state.tasks.remove(&start_index) else {
            return Vec::new();
        };
        if task.peer != peer {
            state.tasks.insert(start_index, task);
            return Vec::new();
        }
        self.peers.penalize(peer, TASK_FAILURE_PENALTY);
        task.tried.push(peer);
        match self.peers.pick_for_height(start_index, &task.tried) {
            Some(next_peer) => {
                task.peer = next_peer;
                task.deadline = now + TASK_TIMEOUT;
                let event = request_event(&task);
                state.tasks.insert(start_index, task);
                vec![event]
            }
            None => Vec::new(),
        }
    }

    /// Acknowledges locally persisted height (e.g. consensus-produced
    /// blocks) so stale queue entries drop.
    pub fn advance_to(&self, height: u32) {
        let mut state = self.state.lock();
        if height + 1 > state.next_index {
            state.next_index = height + 1;
        }
        let stale: Vec<u32> = state
            .queue
            .keys()
            .take_while(|i| **i < state.next_index)
            .copied()
            .collect();
        for index in stale {
            state.queue.remove(&index);
        }
    }
}

fn request_event(task: &SyncTask) -> SyncEvent {
    let payload = GetBlockByIndexPayload {
        index_start: task.start_index,
        count: task.count as i16,
    };
    SyncEvent::Send {
        peer: task.peer,
        message: Message::new(MessageCommand::GetBlockByIndex, payload.to_array()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_core::{UInt160, UInt256, Witness};
    use neo3_ledger::BlockHeader;
    use std::net::SocketAddr;

    fn block(index: u32) -> Block {
        Block {
            header: BlockHeader {
                version: 0,
                prev_hash: UInt256::ZERO,
                merkle_root: UInt256::ZERO,
                timestamp: u64::from(index),
                nonce: 0,
                index,
                primary_index: 0,
                next_consensus: UInt160::ZERO,
                witness: Witness::empty(),
            },
            transactions: Vec::new(),
        }
    }

    fn setup(peer_height: u32) -> (Arc<PeerManager>, SyncManager) {
        let peers = Arc::new(PeerManager::new(1));
        let addr: SocketAddr = "127.0.0.1:20333".parse().unwrap();
        peers.register(addr, 7, "peer".into(), peer_height).unwrap();
        let sync = SyncManager::new(Arc::clone(&peers), 0);
        (peers, sync)
    }

    #[test]
    fn test_poll_requests_when_behind() {
        let (_, sync) = setup(100);
        let events = sync.poll(Instant::now());
        assert!(!events.is_empty());
        match &events[0] {
            SyncEvent::Send { peer, message } => {
                assert_eq!(*peer, 7);
                assert_eq!(message.command, MessageCommand::GetBlockByIndex);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_blocks_drain_in_order() {
        let (_, sync) = setup(10);
        // Out-of-order arrival: 2 first, then 1.
        assert!(sync.on_block(block(2)).is_empty());
        let events = sync.on_block(block(1));
        // Both 1 and 2 drain, in order.
        let indices: Vec<u32> = events
            .iter()
            .map(|e| match e {
                SyncEvent::PersistBlock(b) => b.index(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(sync.next_index(), 3);
    }

    #[test]
    fn test_stale_blocks_ignored() {
        let (_, sync) = setup(10);
        sync.on_block(block(1));
        assert!(sync.on_block(block(1)).is_empty());
        assert!(sync.on_block(block(0)).is_empty());
    }

    #[test]
    fn test_timeout_reroutes_to_other_peer() {
        let (peers, sync) = setup(100);
        let addr: SocketAddr = "127.0.0.1:20334".parse().unwrap();
        peers.register(addr, 8, "other".into(), 100).unwrap();

        let start = Instant::now();
        let first = sync.poll(start);
        let first_peer = match &first[0] {
            SyncEvent::Send { peer, .. } => *peer,
            other => panic!("unexpected event {other:?}"),
        };
        // After the deadline, the task moves to the other peer.
        let later = start + TASK_TIMEOUT + Duration::from_secs(1);
        let retried = sync.poll(later);
        let retry_peer = retried
            .iter()
            .find_map(|e| match e {
                SyncEvent::Send { peer, message } if message.command == MessageCommand::GetBlockByIndex => {
                    Some(*peer)
                }
                _ => None,
            })
            .expect("task re-issued");
        assert_ne!(retry_peer, first_peer);
    }

    #[test]
    fn test_advance_to_drops_stale_queue() {
        let (_, sync) = setup(10);
        sync.on_block(block(3));
        sync.advance_to(5);
        assert_eq!(sync.next_index(), 6);
        assert_eq!(sync.queued(), 0);
    }
}
