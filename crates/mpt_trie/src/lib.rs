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

//! # Neo3 MPT
//!
//! A Merkle-Patricia trie over storage keys, producing the per-block state
//! root. Nodes are content-addressed by the double-sha256 of their
//! encoding and kept in an in-memory node store; the ledger folds each
//! block's storage changes into the trie and records the resulting root.

mod node;
mod trie;

pub use node::Node;
pub use trie::Trie;

use thiserror::Error;

/// Errors raised by trie operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MptError {
    /// A referenced node is missing from the node store.
    #[error("missing trie node {0}")]
    MissingNode(neo3_core::UInt256),

    /// The requested key is not in the trie.
    #[error("key not found")]
    KeyNotFound,
}

/// Result type for trie operations.
pub type MptResult<T> = Result<T, MptError>;

/// Expands key bytes into one nibble per element.
pub(crate) fn to_nibbles(key: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(key.len() * 2);
    for byte in key {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}
