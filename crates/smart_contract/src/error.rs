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

//! Errors raised by the application engine and the native contracts.

use neo3_vm::VmError;
use thiserror::Error;

/// Contract-layer errors.
///
/// Most of these convert into catchable VM errors so a deployed
/// contract's try/catch can observe them; gas exhaustion and call-flag
/// violations fault the engine outright.
#[derive(Error, Debug, Clone)]
pub enum ContractError {
    #[error("gas exhausted")]
    OutOfGas,

    #[error("missing call flags: {0}")]
    MissingCallFlags(String),

    #[error("contract not found: {0}")]
    ContractNotFound(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("serialization: {0}")]
    Serialization(String),

    #[error("native contract failure: {0}")]
    Native(String),

    #[error(transparent)]
    Vm(#[from] VmError),
}

impl From<ContractError> for VmError {
    fn from(error: ContractError) -> Self {
        match error {
            ContractError::OutOfGas => VmError::OutOfGas,
            ContractError::MissingCallFlags(message) => {
                VmError::InvalidOperation(format!("missing call flags: {message}"))
            }
            ContractError::Vm(inner) => inner,
            other => VmError::Catchable(other.to_string()),
        }
    }
}

impl From<neo3_io::IoError> for ContractError {
    fn from(error: neo3_io::IoError) -> Self {
        ContractError::Serialization(error.to_string())
    }
}

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;
