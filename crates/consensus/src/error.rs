// Copyright (C) 2015-2025 The Neo Project.
//
// error.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Consensus errors.
//!
//! Protocol violations by peers are never fatal: the offending message
//! is dropped (and the peer scored down by the network layer).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    /// A message that cannot belong to the current (height, view).
    #[error("stale or future message: {0}")]
    OutOfContext(String),

    /// A malformed or mis-signed message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// An operation only a validator may perform.
    #[error("node is not a validator")]
    NotValidator,

    /// The state machine refused a transition (commit latching).
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("serialization: {0}")]
    Serialization(#[from] neo3_io::IoError),

    #[error("ledger: {0}")]
    Ledger(String),
}

pub type ConsensusResult<T> = Result<T, ConsensusError>;
