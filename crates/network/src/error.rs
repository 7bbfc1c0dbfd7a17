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

//! Network errors. Transport failures close the connection; protocol
//! violations score the peer down.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("network magic mismatch: got 0x{got:08x}, expected 0x{expected:08x}")]
    MagicMismatch { got: u32, expected: u32 },

    #[error("connected to self")]
    SelfConnection,

    #[error("serialization: {0}")]
    Serialization(#[from] neo3_io::IoError),

    #[error("transport: {0}")]
    Transport(String),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
