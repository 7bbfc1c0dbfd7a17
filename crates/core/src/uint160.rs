// Copyright (C) 2015-2025 The Neo Project.
//
// uint160.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! 160-bit unsigned integer used for script hashes and account identities.

use crate::{hash160, hash256, CoreError, CoreResult};
use neo3_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The length of a UInt160 in bytes.
pub const UINT160_SIZE: usize = 20;

/// A 160-bit unsigned integer.
///
/// Stored little-endian (byte 0 is least significant), which is also the
/// wire order. Hex presentation is big-endian with a `0x` prefix.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct UInt160([u8; UINT160_SIZE]);

impl UInt160 {
    /// The zero value.
    pub const ZERO: UInt160 = UInt160([0u8; UINT160_SIZE]);

    /// Returns the zero value.
    pub fn zero() -> Self {
        Self::ZERO
    }

    /// Whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Borrows the little-endian bytes.
    pub fn as_bytes(&self) -> &[u8; UINT160_SIZE] {
        &self.0
    }

    /// Copies out the little-endian bytes.
    pub fn to_array(&self) -> [u8; UINT160_SIZE] {
        self.0
    }

    /// Builds a value from exactly 20 little-endian bytes.
    pub fn from_bytes(value: &[u8]) -> CoreResult<Self> {
        let bytes: [u8; UINT160_SIZE] = value.try_into().map_err(|_| {
            CoreError::InvalidFormat(format!("expected {UINT160_SIZE} bytes, got {}", value.len()))
        })?;
        Ok(Self(bytes))
    }

    /// The script hash of `script`: ripemd160(sha256(script)).
    pub fn from_script(script: &[u8]) -> Self {
        Self(hash160(script))
    }

    /// Parses the big-endian hex presentation, with or without `0x`.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        if hex_str.len() != UINT160_SIZE * 2 {
            return Err(CoreError::InvalidFormat(format!(
                "expected {} hex characters, got {}",
                UINT160_SIZE * 2,
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

    /// Encodes this script hash as a Base58Check Neo address.
    pub fn to_address(&self, address_version: u8) -> String {
        let mut data = Vec::with_capacity(25);
        data.push(address_version);
        data.extend_from_slice(&self.0);
        let checksum = hash256(&data);
        data.extend_from_slice(&checksum[..4]);
        bs58::encode(data).into_string()
    }

    /// Decodes a Base58Check Neo address back into a script hash.
    pub fn from_address(address: &str, address_version: u8) -> CoreResult<Self> {
        let decoded = bs58::decode(address)
            .into_vec()
            .map_err(|_| CoreError::InvalidFormat("invalid base58".into()))?;
        if decoded.len() != 25 {
            return Err(CoreError::InvalidFormat("invalid address length".into()));
        }
        if decoded[0] != address_version {
            return Err(CoreError::InvalidFormat("invalid address version".into()));
        }
        let checksum = hash256(&decoded[..21]);
        if decoded[21..] != checksum[..4] {
            return Err(CoreError::InvalidFormat("invalid address checksum".into()));
        }
        Self::from_bytes(&decoded[1..21])
    }
}

impl Serializable for UInt160 {
    fn size(&self) -> usize {
        UINT160_SIZE
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_bytes(&self.0)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let bytes = reader.read_bytes(UINT160_SIZE)?;
        let mut value = [0u8; UINT160_SIZE];
        value.copy_from_slice(&bytes);
        Ok(Self(value))
    }
}

impl Ord for UInt160 {
    fn cmp(&self, other: &Self) -> Ordering {
        // Numeric order: most significant byte is the last one.
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for UInt160 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for UInt160 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl fmt::Debug for UInt160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UInt160({})", self.to_hex_string())
    }
}

impl From<[u8; UINT160_SIZE]> for UInt160 {
    fn from(bytes: [u8; UINT160_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for UInt160 {
    type Error = CoreError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(value)
    }
}

impl Serialize for UInt160 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for UInt160 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn test_parse_roundtrip() {
        let hex_str = "0x0000000000000000000000000000000000000001";
        let value = UInt160::parse(hex_str).unwrap();
        assert_eq!(value.as_bytes()[0], 1);
        assert_eq!(value.to_hex_string(), hex_str);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(UInt160::parse("0x01").is_err());
        assert!(UInt160::parse("0x00000000000000000000000000000000000000zz").is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        let low = UInt160::parse("0x0000000000000000000000000000000000000002").unwrap();
        let high = UInt160::parse("0x0100000000000000000000000000000000000000").unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_wire_roundtrip() {
        let value = UInt160::from_script(b"hello");
        let bytes = value.to_array().to_vec();
        assert_eq!(UInt160::from_array(&bytes).unwrap(), value);
    }

    #[test]
    fn test_address_roundtrip() {
        let value = UInt160::from_script(&[0x51]);
        let address = value.to_address(0x35);
        assert_eq!(UInt160::from_address(&address, 0x35).unwrap(), value);
        assert!(UInt160::from_address(&address, 0x17).is_err());
    }

    #[test]
    fn test_serde_json_presentation() {
        let value = UInt160::parse("0x0000000000000000000000000000000000000001").unwrap();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000001\"");
        assert_eq!(serde_json::from_str::<UInt160>(&json).unwrap(), value);
    }
}
