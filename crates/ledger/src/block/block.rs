// Copyright (C) 2015-2025 The Neo Project.
//
// block.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Blocks: a header plus its transactions.

use crate::block::BlockHeader;
use neo3_core::{Transaction, UInt256};
use neo3_crypto::MerkleTree;
use neo3_io::{helper, BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Upper bound used while decoding a block's transaction list.
const MAX_BLOCK_TRANSACTIONS: usize = u16::MAX as usize;

/// A full block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The block hash (the header hash).
    pub fn hash(&self) -> UInt256 {
        self.header.hash()
    }

    /// The block height.
    pub fn index(&self) -> u32 {
        self.header.index
    }

    /// The hashes of the carried transactions, in block order.
    pub fn transaction_hashes(&self) -> Vec<UInt256> {
        self.transactions.iter().map(Transaction::hash).collect()
    }

    /// Recomputes the Merkle root over the carried transactions.
    pub fn compute_merkle_root(&self) -> UInt256 {
        MerkleTree::compute_root(&self.transaction_hashes())
    }

    /// Whether the header's Merkle root matches the transactions.
    pub fn merkle_root_matches(&self) -> bool {
        self.header.merkle_root == self.compute_merkle_root()
    }

    /// Total system fee carried by the block's transactions.
    pub fn total_system_fee(&self) -> i64 {
        self.transactions.iter().map(|tx| tx.system_fee).sum()
    }
}

impl Serializable for Block {
    fn size(&self) -> usize {
        self.header.size() + helper::array_size(&self.transactions)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.header.serialize(writer)?;
        helper::serialize_array(&self.transactions, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let header = BlockHeader::deserialize(reader)?;
        let transactions = helper::deserialize_array(reader, MAX_BLOCK_TRANSACTIONS)?;
        Ok(Self {
            header,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_core::{Signer, UInt160, Witness};
    use neo3_io::SerializableExt;

    fn sample_transaction(nonce: u32) -> Transaction {
        Transaction {
            nonce,
            valid_until_block: 100,
            signers: vec![Signer::called_by_entry(UInt160::from_script(b"sender"))],
            script: vec![0x40],
            witnesses: vec![Witness::empty()],
            ..Default::default()
        }
    }

    fn sample_block() -> Block {
        let transactions = vec![sample_transaction(1), sample_transaction(2)];
        let mut header = super::header::sample_header();
        let hashes: Vec<UInt256> = transactions.iter().map(Transaction::hash).collect();
        header.merkle_root = MerkleTree::compute_root(&hashes);
        Block {
            header,
            transactions,
        }
    }

    #[test]
    fn test_wire_roundtrip() {
        let block = sample_block();
        let bytes = block.to_array();
        assert_eq!(bytes.len(), block.size());
        assert_eq!(Block::from_array(&bytes).unwrap(), block);
    }

    #[test]
    fn test_merkle_root_validation() {
        let mut block = sample_block();
        assert!(block.merkle_root_matches());
        block.transactions.reverse();
        assert!(!block.merkle_root_matches());
    }
}
