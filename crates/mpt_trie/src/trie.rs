// Copyright (C) 2015-2025 The Neo Project.
//
// trie.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The trie itself: content-addressed nodes with insert, lookup and
//! delete-with-collapse.

use crate::node::BRANCH_WIDTH;
use crate::{to_nibbles, MptError, MptResult, Node};
use neo3_core::UInt256;
use std::collections::HashMap;

/// A Merkle-Patricia trie over an in-memory node store.
///
/// Nodes are immutable once stored; every mutation produces new nodes
/// along the touched path, so old roots stay resolvable (the ledger keeps
/// one root per block).
#[derive(Debug, Default, Clone)]
pub struct Trie {
    nodes: HashMap<UInt256, Node>,
    root: UInt256,
}

impl Trie {
    /// An empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state root; zero while the trie is empty.
    pub fn root(&self) -> UInt256 {
        self.root
    }

    /// Number of stored nodes (all versions).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn load(&self, hash: &UInt256) -> MptResult<&Node> {
        self.nodes.get(hash).ok_or(MptError::MissingNode(*hash))
    }

    fn store(&mut self, node: Node) -> UInt256 {
        let hash = node.hash();
        self.nodes.insert(hash, node);
        hash
    }

    /// Inserts or replaces `key`.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> MptResult<()> {
        let path = to_nibbles(key);
        self.root = self.insert_at(self.root, &path, value)?;
        Ok(())
    }

    /// Looks up `key`.
    pub fn get(&self, key: &[u8]) -> MptResult<Vec<u8>> {
        let path = to_nibbles(key);
        self.lookup(self.root, &path)
    }

    /// Removes `key`. Missing keys are reported, not ignored.
    pub fn delete(&mut self, key: &[u8]) -> MptResult<()> {
        let path = to_nibbles(key);
        self.root = self.remove_at(self.root, &path)?.unwrap_or(UInt256::ZERO);
        Ok(())
    }

    fn lookup(&self, hash: UInt256, path: &[u8]) -> MptResult<Vec<u8>> {
        if hash == UInt256::ZERO {
            return Err(MptError::KeyNotFound);
        }
        match self.load(&hash)? {
            Node::Leaf { path: leaf_path, value } => {
                if leaf_path == path {
                    Ok(value.clone())
                } else {
                    Err(MptError::KeyNotFound)
                }
            }
            Node::Extension { path: ext_path, next } => match path.strip_prefix(&ext_path[..]) {
                Some(rest) => self.lookup(*next, rest),
                None => Err(MptError::KeyNotFound),
            },
            Node::Branch { children, value } => match path.split_first() {
                None => value.clone().ok_or(MptError::KeyNotFound),
                Some((&nibble, rest)) => self.lookup(children[nibble as usize], rest),
            },
        }
    }

    fn insert_at(&mut self, hash: UInt256, path: &[u8], value: Vec<u8>) -> MptResult<UInt256> {
        if hash == UInt256::ZERO {
            return Ok(self.store(Node::Leaf {
                path: path.to_vec(),
                value,
            }));
        }
        let node = self.load(&hash)?.clone();
        match node {
            Node::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                if leaf_path == path {
                    return Ok(self.store(Node::Leaf {
                        path: leaf_path,
                        value,
                    }));
                }
                let common = common_prefix(&leaf_path, path);
                let branch = self.split_into_branch(
                    (&leaf_path[common..], leaf_value),
                    (&path[common..], value),
                )?;
                self.wrap_extension(&path[..common], branch)
            }
            Node::Extension {
                path: ext_path,
                next,
            } => {
                if let Some(rest) = path.strip_prefix(&ext_path[..]) {
                    let child = self.insert_at(next, rest, value)?;
                    return self.wrap_extension(&ext_path, child);
                }
                let common = common_prefix(&ext_path, path);
                // Split the extension where the new key diverges.
                let ext_rest = &ext_path[common..];
                let mut children = [UInt256::ZERO; BRANCH_WIDTH];
                let mut branch_value = None;

                let tail = self.wrap_extension(&ext_rest[1..], next)?;
                children[ext_rest[0] as usize] = tail;

                let new_rest = &path[common..];
                match new_rest.split_first() {
                    None => branch_value = Some(value),
                    Some((&nibble, rest)) => {
                        children[nibble as usize] = self.store(Node::Leaf {
                            path: rest.to_vec(),
                            value,
                        });
                    }
                }
                let branch = self.store(Node::Branch {
                    children,
                    value: branch_value,
                });
                self.wrap_extension(&path[..common], branch)
            }
            Node::Branch {
                mut children,
                value: branch_value,
            } => match path.split_first() {
                None => Ok(self.store(Node::Branch {
                    children,
                    value: Some(value),
                })),
                Some((&nibble, rest)) => {
                    children[nibble as usize] =
                        self.insert_at(children[nibble as usize], rest, value)?;
                    Ok(self.store(Node::Branch {
                        children,
                        value: branch_value,
                    }))
                }
            },
        }
    }

    /// Builds the branch produced when two distinct suffixes split apart.
    fn split_into_branch(
        &mut self,
        (a_path, a_value): (&[u8], Vec<u8>),
        (b_path, b_value): (&[u8], Vec<u8>),
    ) -> MptResult<UInt256> {
        let mut children = [UInt256::ZERO; BRANCH_WIDTH];
        let mut value = None;
        for (suffix, item) in [(a_path, a_value), (b_path, b_value)] {
            match suffix.split_first() {
                None => value = Some(item),
                Some((&nibble, rest)) => {
                    children[nibble as usize] = self.store(Node::Leaf {
                        path: rest.to_vec(),
                        value: item,
                    });
                }
            }
        }
        Ok(self.store(Node::Branch { children, value }))
    }

    /// Prefixes `child` with an extension for `path` (no-op when empty).
    fn wrap_extension(&mut self, path: &[u8], child: UInt256) -> MptResult<UInt256> {
        if path.is_empty() {
            return Ok(child);
        }
        // Merge chained extensions and absorb leaf children directly.
        let merged = match self.load(&child)?.clone() {
            Node::Extension {
                path: child_path,
                next,
            } => {
                let mut full = path.to_vec();
                full.extend_from_slice(&child_path);
                Node::Extension { path: full, next }
            }
            Node::Leaf {
                path: child_path,
                value,
            } => {
                let mut full = path.to_vec();
                full.extend_from_slice(&child_path);
                Node::Leaf { path: full, value }
            }
            Node::Branch { .. } => Node::Extension {
                path: path.to_vec(),
                next: child,
            },
        };
        Ok(self.store(merged))
    }

    fn remove_at(&mut self, hash: UInt256, path: &[u8]) -> MptResult<Option<UInt256>> {
        if hash == UInt256::ZERO {
            return Err(MptError::KeyNotFound);
        }
        let node = self.load(&hash)?.clone();
        match node {
            Node::Leaf {
                path: leaf_path, ..
            } => {
                if leaf_path == path {
                    Ok(None)
                } else {
                    Err(MptError::KeyNotFound)
                }
            }
            Node::Extension {
                path: ext_path,
                next,
            } => {
                let rest = path
                    .strip_prefix(&ext_path[..])
                    .ok_or(MptError::KeyNotFound)?;
                match self.remove_at(next, rest)? {
                    None => Ok(None),
                    Some(child) => Ok(Some(self.wrap_extension(&ext_path, child)?)),
                }
            }
            Node::Branch {
                mut children,
                value,
            } => {
                let mut value = value;
                match path.split_first() {
                    None => {
                        if value.is_none() {
                            return Err(MptError::KeyNotFound);
                        }
                        value = None;
                    }
                    Some((&nibble, rest)) => {
                        children[nibble as usize] = self
                            .remove_at(children[nibble as usize], rest)?
                            .unwrap_or(UInt256::ZERO);
                    }
                }
                self.collapse_branch(children, value)
            }
        }
    }

    /// Shrinks a branch that lost entries back to its minimal form.
    fn collapse_branch(
        &mut self,
        children: [UInt256; BRANCH_WIDTH],
        value: Option<Vec<u8>>,
    ) -> MptResult<Option<UInt256>> {
        let occupied: Vec<usize> = (0..BRANCH_WIDTH)
            .filter(|&i| children[i] != UInt256::ZERO)
            .collect();
        match (occupied.len(), &value) {
            (0, None) => Ok(None),
            (0, Some(_)) => Ok(Some(self.store(Node::Leaf {
                path: Vec::new(),
                value: value.expect("checked above"),
            }))),
            (1, None) => {
                let nibble = occupied[0];
                let merged = self.wrap_extension(&[nibble as u8], children[nibble])?;
                Ok(Some(merged))
            }
            _ => Ok(Some(self.store(Node::Branch { children, value }))),
        }
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root_is_zero() {
        assert_eq!(Trie::new().root(), UInt256::ZERO);
    }

    #[test]
    fn test_put_get() {
        let mut trie = Trie::new();
        trie.put(b"alpha", vec![1]).unwrap();
        trie.put(b"alps", vec![2]).unwrap();
        trie.put(b"beta", vec![3]).unwrap();
        assert_eq!(trie.get(b"alpha").unwrap(), vec![1]);
        assert_eq!(trie.get(b"alps").unwrap(), vec![2]);
        assert_eq!(trie.get(b"beta").unwrap(), vec![3]);
        assert_eq!(trie.get(b"missing"), Err(MptError::KeyNotFound));
    }

    #[test]
    fn test_overwrite_changes_root() {
        let mut trie = Trie::new();
        trie.put(b"key", vec![1]).unwrap();
        let first = trie.root();
        trie.put(b"key", vec![2]).unwrap();
        assert_ne!(trie.root(), first);
        assert_eq!(trie.get(b"key").unwrap(), vec![2]);
    }

    #[test]
    fn test_insertion_order_independent_root() {
        let entries: Vec<(&[u8], Vec<u8>)> = vec![
            (b"ab", vec![1]),
            (b"ac", vec![2]),
            (b"abc", vec![3]),
            (b"zz", vec![4]),
        ];
        let mut forward = Trie::new();
        for (key, value) in &entries {
            forward.put(key, value.clone()).unwrap();
        }
        let mut backward = Trie::new();
        for (key, value) in entries.iter().rev() {
            backward.put(key, value.clone()).unwrap();
        }
        assert_eq!(forward.root(), backward.root());
    }

    #[test]
    fn test_delete_restores_previous_root() {
        let mut trie = Trie::new();
        trie.put(b"stay", vec![1]).unwrap();
        let before = trie.root();
        trie.put(b"gone", vec![2]).unwrap();
        assert_ne!(trie.root(), before);
        trie.delete(b"gone").unwrap();
        assert_eq!(trie.root(), before);
        assert_eq!(trie.get(b"stay").unwrap(), vec![1]);
        assert_eq!(trie.delete(b"gone"), Err(MptError::KeyNotFound));
    }

    #[test]
    fn test_delete_everything_empties_root() {
        let mut trie = Trie::new();
        trie.put(b"a", vec![1]).unwrap();
        trie.put(b"b", vec![2]).unwrap();
        trie.delete(b"a").unwrap();
        trie.delete(b"b").unwrap();
        assert_eq!(trie.root(), UInt256::ZERO);
    }

    #[test]
    fn test_prefix_key_coexists() {
        let mut trie = Trie::new();
        trie.put(b"ab", vec![1]).unwrap();
        trie.put(b"abcd", vec![2]).unwrap();
        assert_eq!(trie.get(b"ab").unwrap(), vec![1]);
        assert_eq!(trie.get(b"abcd").unwrap(), vec![2]);
        trie.delete(b"ab").unwrap();
        assert_eq!(trie.get(b"ab"), Err(MptError::KeyNotFound));
        assert_eq!(trie.get(b"abcd").unwrap(), vec![2]);
    }
}
