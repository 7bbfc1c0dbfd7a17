// Copyright (C) 2015-2025 The Neo Project.
//
// uint256.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! 256-bit unsigned integer used for block and transaction hashes.

use crate::{hash256, CoreError, CoreResult};
use neo3_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The length of a UInt256 in bytes.
pub const UINT256_SIZE: usize = 32;

/// A 256-bit unsigned integer.
///
/// Stored little-endian (byte 0 is least significant), which is also the
/// wire order. Hex presentation is big-endian with a `0x` prefix.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct UInt256([u8; UINT256_SIZE]);

impl UInt256 {
    /// The zero value.
    pub const ZERO: UInt256 = UInt256([0u8; UINT256_SIZE]);

    /// Returns the zero value.
    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Borrows the little-endian bytes.
    pub fn as_bytes(&self) -> &[u8; UINT256_SIZE] {
        &self.0
    }

    /// Copies out the little-endian bytes.
    pub fn to_array(&self) -> [u8; UINT256_SIZE] {
        self.0
    }

    /// Builds a value from exactly 32 little-endian bytes.
    pub fn from_bytes(value: &[u8]) -> CoreResult<Self> {
        let bytes: [u8; UINT256_SIZE] = value.try_into().map_err(|_| {
            CoreError::InvalidFormat(format!("expected {UINT256_SIZE} bytes, got {}", value.len()))
        })?;
        Ok(Self(bytes))
    }

    /// Double-sha256 of `data`, as a hash value.
    pub fn from_data(data: &[u8]) -> Self {
        Self(hash256(data))
    }

    /// Parses the big-endian hex presentation, with or without `0x`.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        if hex_str.len() != UINT256_SIZE * 2 {
            return Err(CoreError::InvalidFormat(format!(
                "expected {} hex characters, got {}",
                UINT256_SIZE * 2,
                hex_str.len()
            )));
        }
        let mut bytes = hex::decode(hex_str)
            .map_err(|_| CoreError::InvalidFormat("invalid hex".into()))?;
        bytes.reverse();
        Self::from_bytes(&bytes)
    }

    /// The big-endian `0x`-prefixed hex presentation.
    pub fn to_hex_string(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        format!("0x{}", hex::encode(bytes))
    }
}

impl Serializable for UInt256 {
    fn size(&self) -> usize {
        UINT256_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_bytes(&self.0)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let bytes = reader.read_bytes(UINT256_SIZE)?;
        let mut value = [0u8; UINT256_SIZE];
        value.copy_from_slice(&bytes);
        Ok(Self(value))
    }
}

impl Ord for UInt256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for UInt256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for UInt256 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl fmt::Debug for UInt256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt256({})", self.to_hex_string())
    }
}

impl From<[u8; UINT256_SIZE]> for UInt256 {
    fn from(bytes: [u8; UINT256_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for UInt256 {
    type Error = CoreError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(value)
    }
}

impl Serialize for UInt256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for UInt256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let hex_str = "0x0000000000000000000000000000000000000000000000000000000000000001";
        let value = UInt256::parse(hex_str).unwrap();
        assert_eq!(value.as_bytes()[0], 1);
        assert_eq!(value.to_hex_string(), hex_str);
    }

    #[test]
    fn test_from_data_is_double_sha256() {
        let value = UInt256::from_data(b"");
        // sha256(sha256("")) well-known vector.
        assert_eq!(
            value.to_hex_string(),
            "0x56944c5d3f98413ef45cf54545538103cc9f298e0575820ad3591376e2e0f65d"
        );
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut low_bytes = [0u8; 32];
        low_bytes[0] = 0xFF;
        let mut high_bytes = [0u8; 32];
        high_bytes[31] = 0x01;
        assert!(UInt256::from(high_bytes) > UInt256::from(low_bytes));
    }
}
