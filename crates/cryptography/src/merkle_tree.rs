// Copyright (C) 2015-2025 The Neo Project.
//
// merkle_tree.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Merkle tree over transaction hashes.
//!
//! Pairs are hashed with double-sha256; a lone node at the end of a level
//! is paired with itself.

use neo3_core::{hash256, UInt256};

/// A fully materialized Merkle tree, bottom level first.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<UInt256>>,
}

fn hash_pair(left: &UInt256, right: &UInt256) -> UInt256 {
    let mut buffer = [0u8; 64];
    buffer[..32].copy_from_slice(left.as_bytes());
    buffer[32..].copy_from_slice(right.as_bytes());
    UInt256::from(hash256(&buffer))
}

impl MerkleTree {
    /// Builds the tree over `hashes`. Empty input yields an empty tree
    /// whose root is zero.
    pub fn new(hashes: &[UInt256]) -> Self {
        if hashes.is_empty() {
            return Self { levels: Vec::new() };
        }
        let mut levels = vec![hashes.to_vec()];
        while levels.last().map(Vec::len).unwrap_or(0) > 1 {
            let current = levels.last().expect("non-empty by construction");
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                let right = pair.get(1).unwrap_or(&pair[0]);
                next.push(hash_pair(&pair[0], right));
            }
            levels.push(next);
        }
        Self { levels }
    }

    /// The Merkle root; zero for an empty tree.
    pub fn root(&self) -> UInt256 {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_default()
    }

    /// Computes only the root, without keeping the tree.
    pub fn compute_root(hashes: &[UInt256]) -> UInt256 {
        Self::new(hashes).root()
    }

    /// The depth of the tree (1 for a single leaf; 0 when empty).
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// The authentication path for leaf `index`: one sibling per level,
    /// bottom-up. Used to build merkle-block responses.
    pub fn path(&self, index: usize) -> Option<Vec<UInt256>> {
        if self.levels.is_empty() || index >= self.levels[0].len() {
            return None;
        }
        let mut path = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = position ^ 1;
            let node = level.get(sibling).unwrap_or(&level[position]);
            path.push(*node);
            position /= 2;
        }
        Some(path)
    }

    /// Recomputes a root from a leaf and its authentication path.
    pub fn verify_path(leaf: UInt256, index: usize, path: &[UInt256]) -> UInt256 {
        let mut node = leaf;
        let mut position = index;
        for sibling in path {
            node = if position % 2 == 0 {
                hash_pair(&node, sibling)
            } else {
                hash_pair(sibling, &node)
            };
            position /= 2;
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(tag: u8) -> UInt256 {
        UInt256::from_data(&[tag])
    }

    #[test]
    fn test_empty_root_is_zero() {
        assert_eq!(MerkleTree::compute_root(&[]), UInt256::ZERO);
    }

    #[test]
    fn test_single_leaf_is_its_own_root() {
        let only = leaf(1);
        assert_eq!(MerkleTree::compute_root(&[only]), only);
    }

    #[test]
    fn test_odd_node_duplicated() {
        let a = leaf(1);
        let b = leaf(2);
        let c = leaf(3);
        let ab = hash_pair(&a, &b);
        let cc = hash_pair(&c, &c);
        let expected = hash_pair(&ab, &cc);
        assert_eq!(MerkleTree::compute_root(&[a, b, c]), expected);
    }

    #[test]
    fn test_root_depends_on_order() {
        let a = leaf(1);
        let b = leaf(2);
        assert_ne!(
            MerkleTree::compute_root(&[a, b]),
            MerkleTree::compute_root(&[b, a])
        );
    }

    #[test]
    fn test_paths_verify() {
        let leaves: Vec<UInt256> = (0..7).map(leaf).collect();
        let tree = MerkleTree::new(&leaves);
        for (index, item) in leaves.iter().enumerate() {
            let path = tree.path(index).unwrap();
            assert_eq!(MerkleTree::verify_path(*item, index, &path), tree.root());
        }
        assert!(tree.path(7).is_none());
    }
}
