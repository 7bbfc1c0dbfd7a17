// Copyright (C) 2015-2025 The Neo Project.
//
// storage.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Storage keys and items.

use neo3_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use std::cmp::Ordering;

/// A storage key: owning contract id followed by the contract's raw key
/// bytes. On the wire this is `i32 LE ‖ key` with no length prefix; keys
/// are compared as those raw byte sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub id: i32,
    pub key: Vec<u8>,
}

impl StorageKey {
    /// Creates a key owned by contract `id`.
    pub fn new(id: i32, key: Vec<u8>) -> Self {
        Self { id, key }
    }

    /// A key with a single prefix byte, the common native-contract layout.
    pub fn with_prefix(id: i32, prefix: u8) -> Self {
        Self::new(id, vec![prefix])
    }

    /// A prefix byte followed by payload bytes.
    pub fn with_prefix_bytes(id: i32, prefix: u8, payload: &[u8]) -> Self {
        let mut key = Vec::with_capacity(1 + payload.len());
        key.push(prefix);
        key.extend_from_slice(payload);
        Self::new(id, key)
    }

    /// The raw byte sequence stores order by.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + self.key.len());
        bytes.extend_from_slice(&self.id.to_le_bytes());
        bytes.extend_from_slice(&self.key);
        bytes
    }

    /// Parses a raw byte sequence back into a key.
    pub fn from_bytes(bytes: &[u8]) -> IoResult<Self> {
        if bytes.len() < 4 {
            return Err(IoError::InvalidFormat("storage key shorter than id".into()));
        }
        let id = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(Self::new(id, bytes[4..].to_vec()))
    }
}

impl Ord for StorageKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl PartialOrd for StorageKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A stored value: opaque bytes to the store, serialized stack items to
/// the native contracts that choose to treat them that way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageItem {
    pub value: Vec<u8>,
}

impl StorageItem {
    pub fn new(value: Vec<u8>) -> Self {
        Self { value }
    }

    /// Interprets the value as a little-endian signed integer, the layout
    /// token balances use.
    pub fn as_i64(&self) -> i64 {
        let mut bytes = [0u8; 8];
        let len = self.value.len().min(8);
        bytes[..len].copy_from_slice(&self.value[..len]);
        // Sign-extend from the last meaningful byte.
        if len < 8 && self.value.last().is_some_and(|&b| b & 0x80 != 0) {
            for byte in bytes.iter_mut().skip(len) {
                *byte = 0xFF;
            }
        }
        i64::from_le_bytes(bytes)
    }

    /// Encodes an integer in the minimal little-endian form used for
    /// counters and balances.
    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            return Self::new(Vec::new());
        }
        let bytes = value.to_le_bytes();
        // Trim redundant sign bytes, keeping the sign readable.
        let mut end = 8;
        if value > 0 {
            while end > 1 && bytes[end - 1] == 0 && bytes[end - 2] & 0x80 == 0 {
                end -= 1;
            }
        } else {
            while end > 1 && bytes[end - 1] == 0xFF && bytes[end - 2] & 0x80 != 0 {
                end -= 1;
            }
        }
        Self::new(bytes[..end].to_vec())
    }
}

impl From<Vec<u8>> for StorageItem {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl Serializable for StorageItem {
    fn size(&self) -> usize {
        neo3_io::var_bytes_size(self.value.len())
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_var_bytes(&self.value)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self::new(reader.read_var_bytes(u32::MAX as usize)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bytes_layout() {
        let key = StorageKey::with_prefix_bytes(5, 0x01, &[0x02]);
        assert_eq!(key.to_bytes(), vec![5, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(StorageKey::from_bytes(&key.to_bytes()).unwrap(), key);
    }

    #[test]
    fn test_negative_id_layout() {
        let key = StorageKey::with_prefix(-4, 0x0C);
        assert_eq!(key.to_bytes()[..4], (-4i32).to_le_bytes());
    }

    #[test]
    fn test_ordering_follows_raw_bytes() {
        let a = StorageKey::new(1, vec![0x01]);
        let b = StorageKey::new(1, vec![0x01, 0x00]);
        let c = StorageKey::new(1, vec![0x02]);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_item_int_roundtrip() {
        for value in [0i64, 1, 127, 128, 255, 256, -1, -128, -129, i64::MAX, i64::MIN] {
            let item = StorageItem::from_i64(value);
            assert_eq!(item.as_i64(), value, "value {value}");
        }
    }

    #[test]
    fn test_item_int_minimal_encoding() {
        assert!(StorageItem::from_i64(0).value.is_empty());
        assert_eq!(StorageItem::from_i64(1).value, vec![1]);
        assert_eq!(StorageItem::from_i64(128).value, vec![128, 0]);
        assert_eq!(StorageItem::from_i64(-1).value, vec![0xFF]);
    }
}
