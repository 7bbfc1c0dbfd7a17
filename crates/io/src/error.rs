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

//! Error types for binary serialization.

use thiserror::Error;

/// Errors produced while reading or writing the Neo wire format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// The reader ran past the end of the input.
    #[error("unexpected end of stream")]
    EndOfStream,

    /// The input decoded to a value that violates a format constraint.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A declared length exceeds the caller-supplied maximum.
    #[error("length {length} exceeds maximum {max}")]
    ExceedsMaximum { length: u64, max: u64 },

    /// The value cannot be represented in the requested encoding.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Result type for IO operations.
pub type IoResult<T> = Result<T, IoError>;
