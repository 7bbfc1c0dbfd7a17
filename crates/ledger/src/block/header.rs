// Copyright (C) 2015-2025 The Neo Project.
//
// header.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The block header.

use neo3_core::{UInt160, UInt256, Witness};
use neo3_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// A block header. The hash is the double-sha256 of the unsigned
/// serialization (everything up to, but not including, the witness).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_hash: UInt256,
    pub merkle_root: UInt256,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub nonce: u64,
    pub index: u32,
    pub primary_index: u8,
    /// The multisig account expected to sign the next block.
    pub next_consensus: UInt160,
    pub witness: Witness,
}

impl BlockHeader {
    /// Serializes the hash-covered portion.
    pub fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(self.version)?;
        self.prev_hash.serialize(writer)?;
        self.merkle_root.serialize(writer)?;
        writer.write_u64(self.timestamp)?;
        writer.write_u64(self.nonce)?;
        writer.write_u32(self.index)?;
        writer.write_u8(self.primary_index)?;
        self.next_consensus.serialize(writer)
    }

    /// The unsigned header bytes.
    pub fn unsigned_data(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(105);
        let _ = self.serialize_unsigned(&mut writer);
        writer.into_bytes()
    }

    /// The header (and block) hash.
    pub fn hash(&self) -> UInt256 {
        UInt256::from_data(&self.unsigned_data())
    }

    /// The bytes consensus validators sign: network magic then hash.
    pub fn sign_data(&self, network: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity(36);
        data.extend_from_slice(&network.to_le_bytes());
        data.extend_from_slice(self.hash().as_bytes());
        data
    }
}

impl Serializable for BlockHeader {
    fn size(&self) -> usize {
        4 + 32 + 32 + 8 + 8 + 4 + 1 + 20 + 1 + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        // Exactly one witness on the wire.
        writer.write_var_int(1)?;
        self.witness.serialize(writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let version = reader.read_u32()?;
        if version != 0 {
            return Err(IoError::InvalidFormat(format!(
                "unsupported block version {version}"
            )));
        }
        let prev_hash = UInt256::deserialize(reader)?;
        let merkle_root = UInt256::deserialize(reader)?;
        let timestamp = reader.read_u64()?;
        let nonce = reader.read_u64()?;
        let index = reader.read_u32()?;
        let primary_index = reader.read_u8()?;
        let next_consensus = UInt160::deserialize(reader)?;
        let witness_count = reader.read_var_int(1)?;
        if witness_count != 1 {
            return Err(IoError::InvalidFormat(format!(
                "block header carries {witness_count} witnesses"
            )));
        }
        let witness = Witness::deserialize(reader)?;
        Ok(Self {
            version,
            prev_hash,
            merkle_root,
            timestamp,
            nonce,
            index,
            primary_index,
            next_consensus,
            witness,
        })
    }
}

/// Test fixture shared with the block tests.
#[cfg(test)]
pub(crate) fn sample_header() -> BlockHeader {
    BlockHeader {
        version: 0,
        prev_hash: UInt256::from_data(b"prev"),
        merkle_root: UInt256::from_data(b"root"),
        timestamp: 1_468_595_301_000,
        nonce: 2_083_236_893,
        index: 7,
        primary_index: 1,
        next_consensus: UInt160::from_script(b"consensus"),
        witness: Witness::new(vec![0x01], vec![0x51]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn test_wire_roundtrip() {
        let header = sample_header();
        let bytes = header.to_array();
        assert_eq!(bytes.len(), header.size());
        assert_eq!(BlockHeader::from_array(&bytes).unwrap(), header);
    }

    #[test]
    fn test_hash_excludes_witness() {
        let header = sample_header();
        let mut modified = header.clone();
        modified.witness = Witness::new(vec![0xFF], vec![0x52]);
        assert_eq!(header.hash(), modified.hash());

        modified.timestamp += 1;
        assert_ne!(header.hash(), modified.hash());
    }

    #[test]
    fn test_sign_data_prefixes_network() {
        let header = sample_header();
        let data = header.sign_data(0x4E454F33);
        assert_eq!(data.len(), 36);
        assert_eq!(data[..4], 0x4E454F33u32.to_le_bytes());
        assert_eq!(&data[4..], header.hash().as_bytes());
    }
}
