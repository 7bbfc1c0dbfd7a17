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

//! # Neo3 Crypto
//!
//! Hashing, ECDSA over secp256r1/secp256k1, BLS12-381 helpers, Merkle
//! trees and bloom filters — everything the ledger, the VM's CryptoLib and
//! the consensus layer need.

pub mod base58;
pub mod bloom_filter;
pub mod bls;
pub mod ecc;
pub mod hash;
pub mod merkle_tree;
pub mod murmur;

pub use base58::{base58check_decode, base58check_encode};
pub use bloom_filter::BloomFilter;
pub use ecc::{ECPoint, KeyPair, Secp256Curve};
pub use hash::{hash160, hash256, sha256};
pub use merkle_tree::MerkleTree;
pub use murmur::murmur32;

use thiserror::Error;

/// Errors raised by cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid point encoding: {0}")]
    InvalidPoint(String),

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
