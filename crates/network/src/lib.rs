// Copyright (C) 2015-2025 The Neo Project.
//
// lib.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! # Neo3 Network
//!
//! The P2P message codec (framing, LZ4 compression, payload types), the
//! handshake rules, and the block-sync state machine with its deadline
//! driven task scheduler. The TCP transport itself stays a thin shell in
//! the node binary; everything here is socket-free and fixture-testable.

pub mod compression;
pub mod error;
pub mod messages;
pub mod peers;
pub mod sync;

pub use error::{NetworkError, NetworkResult};
pub use messages::{
    AddrPayload, ExtensiblePayload, FilterAddPayload, FilterLoadPayload, GetBlockByIndexPayload,
    GetBlocksPayload, HeadersPayload, InvPayload, InventoryType, MerkleBlockPayload, Message,
    MessageCommand, NetworkAddress, NodeCapability, PingPayload, VersionPayload,
};
pub use peers::{PeerManager, PeerScore};
pub use sync::{SyncEvent, SyncManager, SyncTask};
