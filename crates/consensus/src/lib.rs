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

//! # Neo3 Consensus
//!
//! The dBFT 2.0 state machine: view-based primary rotation,
//! prepare/commit quorum collection, commit latching and recovery. The
//! core engine is a pure transition function over the consensus context;
//! timers and sends surface as effects, which keeps the protocol
//! testable from message-sequence fixtures.

pub mod context;
pub mod dbft;
pub mod error;
pub mod messages;
pub mod service;

pub use context::ConsensusContext;
pub use dbft::{ConsensusEffect, DbftEngine};
pub use error::{ConsensusError, ConsensusResult};
pub use messages::{
    ChangeViewReason, CommitCompact, ConsensusMessage, ConsensusMessageType, ConsensusPayload,
    PreparationCompact, RecoveryMessage,
};
pub use service::ConsensusService;
