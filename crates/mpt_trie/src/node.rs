// Copyright (C) 2015-2025 The Neo Project.
//
// node.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Trie node types and their content hashing.

use neo3_core::UInt256;
use neo3_io::BinaryWriter;

/// Number of children of a branch node, one per nibble.
pub const BRANCH_WIDTH: usize = 16;

const TYPE_BRANCH: u8 = 0x00;
const TYPE_EXTENSION: u8 = 0x01;
const TYPE_LEAF: u8 = 0x02;

/// A Merkle-Patricia trie node.
///
/// Children are referenced by content hash; `UInt256::ZERO` marks an
/// absent child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Sixteen children plus an optional value terminating a key that is a
    /// prefix of longer keys.
    Branch {
        children: [UInt256; BRANCH_WIDTH],
        value: Option<Vec<u8>>,
    },
    /// A shared nibble run leading to a single child.
    Extension { path: Vec<u8>, next: UInt256 },
    /// A terminal node holding the remaining nibbles and the value.
    Leaf { path: Vec<u8>, value: Vec<u8> },
}

impl Node {
    /// An empty branch.
    pub fn empty_branch() -> Self {
        Node::Branch {
            children: [UInt256::ZERO; BRANCH_WIDTH],
            value: None,
        }
    }

    /// The canonical encoding the node hash is computed over.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        match self {
            Node::Branch { children, value } => {
                let _ = writer.write_u8(TYPE_BRANCH);
                for child in children {
                    let _ = writer.write_bytes(child.as_bytes());
                }
                match value {
                    Some(value) => {
                        let _ = writer.write_u8(1);
                        let _ = writer.write_var_bytes(value);
                    }
                    None => {
                        let _ = writer.write_u8(0);
                    }
                }
            }
            Node::Extension { path, next } => {
                let _ = writer.write_u8(TYPE_EXTENSION);
                let _ = writer.write_var_bytes(path);
                let _ = writer.write_bytes(next.as_bytes());
            }
            Node::Leaf { path, value } => {
                let _ = writer.write_u8(TYPE_LEAF);
                let _ = writer.write_var_bytes(path);
                let _ = writer.write_var_bytes(value);
            }
        }
        writer.into_bytes()
    }

    /// The content hash: double-sha256 of the encoding.
    pub fn hash(&self) -> UInt256 {
        UInt256::from_data(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_nodes_hash_differently() {
        let leaf_a = Node::Leaf {
            path: vec![1, 2],
            value: vec![9],
        };
        let leaf_b = Node::Leaf {
            path: vec![1, 2],
            value: vec![8],
        };
        assert_ne!(leaf_a.hash(), leaf_b.hash());
    }

    #[test]
    fn test_branch_value_changes_hash() {
        let empty = Node::empty_branch();
        let with_value = Node::Branch {
            children: [UInt256::ZERO; BRANCH_WIDTH],
            value: Some(vec![1]),
        };
        assert_ne!(empty.hash(), with_value.hash());
    }
}
