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

//! # Neo3 Core
//!
//! Core value types shared by every subsystem of the node: the 160/256-bit
//! hash types, fixed-precision decimals, transaction signers with their
//! witness scopes, and the transaction itself.

pub mod big_decimal;
pub mod error;
pub mod signer;
pub mod transaction;
pub mod uint160;
pub mod uint256;
pub mod witness;
pub mod witness_rule;
pub mod witness_scope;

pub use big_decimal::BigDecimal;
pub use error::{CoreError, CoreResult};
pub use signer::Signer;
pub use transaction::{
    OracleResponse, OracleResponseCode, Transaction, TransactionAttribute,
    TransactionAttributeType, HEADER_SIZE,
};
pub use uint160::UInt160;
pub use uint256::UInt256;
pub use witness::Witness;
pub use witness_rule::{WitnessCondition, WitnessRule, WitnessRuleAction};
pub use witness_scope::WitnessScope;

/// Computes sha256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Computes sha256(sha256(data)), the hash used for block, transaction and
/// address checksums.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Computes ripemd160(sha256(data)), the script-hash function.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    use ripemd::Ripemd160;
    use sha2::Digest;
    let sha = sha256(data);
    let mut hasher = Ripemd160::new();
    hasher.update(sha);
    hasher.finalize().into()
}
