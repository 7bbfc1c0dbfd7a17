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

//! # Neo3 Config
//!
//! Protocol constants, per-network [`ProtocolSettings`] and the node's
//! [`ApplicationConfig`] loaded from a JSON file.

pub mod hardfork;
pub mod settings;

pub use hardfork::Hardfork;
pub use settings::{
    ApplicationConfig, NetworkType, P2PConfig, ProtocolSettings, RpcConfig, StorageConfig,
};

use thiserror::Error;

/// Size of a UInt256 hash in bytes.
pub const HASH_SIZE: usize = 32;
/// Size of a UInt160 script hash in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Maximum serialized block size in bytes.
pub const MAX_BLOCK_SIZE: usize = 2_097_152;
/// Maximum total system fee of the transactions in one block (in datoshi).
pub const MAX_BLOCK_SYSTEM_FEE: i64 = 150_000_000_000;
/// Maximum serialized transaction size in bytes.
pub const MAX_TRANSACTION_SIZE: usize = 102_400;
/// Maximum script length carried by a transaction.
pub const MAX_SCRIPT_SIZE: usize = 65_536;
/// Maximum number of signers on one transaction.
pub const MAX_TRANSACTION_SIGNERS: usize = 16;
/// Maximum number of attributes on one transaction.
pub const MAX_TRANSACTION_ATTRIBUTES: usize = 16;
/// Maximum number of sub-items in a P2P inventory payload.
pub const MAX_INVENTORY_HASHES: usize = 500;
/// Maximum decompressed P2P payload size in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 0x0200_0000;

/// GAS has eight decimals; one GAS is 10^8 datoshi.
pub const GAS_FACTOR: i64 = 100_000_000;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
