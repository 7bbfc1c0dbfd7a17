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

//! Error types for core value operations.

use thiserror::Error;

/// Errors raised by core value types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed input at an API or wire boundary.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Structurally valid input with an out-of-range or inconsistent value.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// An operation attempted in a state that disallows it.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Wire decoding failed.
    #[error("serialization: {0}")]
    Serialization(#[from] neo3_io::IoError),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
