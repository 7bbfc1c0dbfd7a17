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

//! Ledger errors and verification outcomes.

use thiserror::Error;

/// Errors raised by ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A block failed validation against the current chain state.
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    /// A transaction failed validation.
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// The backing store failed; the ledger refuses further mutations.
    #[error("storage failure: {0}")]
    Storage(#[from] neo3_persistence::StorageError),

    #[error("serialization: {0}")]
    Serialization(#[from] neo3_io::IoError),

    #[error("contract layer: {0}")]
    Contract(#[from] neo3_contract::ContractError),

    #[error("{0}")]
    Other(String),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// The outcome of standalone transaction verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyResult {
    Succeed,
    AlreadyExists,
    AlreadyInPool,
    OutOfMemory,
    InvalidScript,
    InvalidAttribute,
    InvalidSignature,
    InvalidSize,
    InvalidType,
    Expired,
    InsufficientFunds,
    PolicyFail,
    HasConflicts,
    Unknown,
}

impl VerifyResult {
    pub fn is_ok(self) -> bool {
        self == VerifyResult::Succeed
    }
}
