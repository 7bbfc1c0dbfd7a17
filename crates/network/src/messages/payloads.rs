// Copyright (C) 2015-2025 The Neo Project.
//
// payloads.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Typed message payloads.

use neo3_config::MAX_INVENTORY_HASHES;
use neo3_core::{hash256, UInt160, UInt256, Witness};
use neo3_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use neo3_ledger::BlockHeader;

/// Inventory item kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InventoryType {
    Transaction = 0x2B,
    Block = 0x2C,
    Extensible = 0x2E,
}

impl InventoryType {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x2B => Some(Self::Transaction),
            0x2C => Some(Self::Block),
            0x2E => Some(Self::Extensible),
            _ => None,
        }
    }
}

/// A peer capability advertised in the version handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCapability {
    TcpServer { port: u16 },
    WsServer { port: u16 },
    FullNode { start_height: u32 },
}

impl Serializable for NodeCapability {
    fn size(&self) -> usize {
        match self {
            NodeCapability::TcpServer { .. } | NodeCapability::WsServer { .. } => 3,
            NodeCapability::FullNode { .. } => 5,
        }
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        match self {
            NodeCapability::TcpServer { port } => {
                writer.write_u8(0x01)?;
                writer.write_u16(*port)
            }
            NodeCapability::WsServer { port } => {
                writer.write_u8(0x02)?;
                writer.write_u16(*port)
            }
            NodeCapability::FullNode { start_height } => {
                writer.write_u8(0x10)?;
                writer.write_u32(*start_height)
            }
        }
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        match reader.read_u8()? {
            0x01 => Ok(NodeCapability::TcpServer {
                port: reader.read_u16()?,
            }),
            0x02 => Ok(NodeCapability::WsServer {
                port: reader.read_u16()?,
            }),
            0x10 => Ok(NodeCapability::FullNode {
                start_height: reader.read_u32()?,
            }),
            other => Err(IoError::InvalidFormat(format!(
                "unknown capability 0x{other:02x}"
            ))),
        }
    }
}

/// The handshake payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPayload {
    pub network: u32,
    pub version: u32,
    /// Seconds since the Unix epoch.
    pub timestamp: u32,
    /// Random per-node value used to detect self-connections.
    pub nonce: u32,
    pub user_agent: String,
    pub capabilities: Vec<NodeCapability>,
}

impl VersionPayload {
    /// The advertised chain height, when the peer is a full node.
    pub fn start_height(&self) -> Option<u32> {
        self.capabilities.iter().find_map(|c| match c {
            NodeCapability::FullNode { start_height } => Some(*start_height),
            _ => None,
        })
    }
}

impl Serializable for VersionPayload {
    fn size(&self) -> usize {
        4 + 4 + 4 + 4
            + neo3_io::var_bytes_size(self.user_agent.len())
            + helper::array_size(&self.capabilities)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(self.network)?;
        writer.write_u32(self.version)?;
        writer.write_u32(self.timestamp)?;
        writer.write_u32(self.nonce)?;
        writer.write_var_string(&self.user_agent)?;
        helper::serialize_array(&self.capabilities, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            network: reader.read_u32()?,
            version: reader.read_u32()?,
            timestamp: reader.read_u32()?,
            nonce: reader.read_u32()?,
            user_agent: reader.read_var_string(1024)?,
            capabilities: helper::deserialize_array(reader, 32)?,
        })
    }
}

/// An address-book entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddress {
    /// Seconds since the Unix epoch when the peer was last seen.
    pub timestamp: u32,
    /// IPv6-mapped address bytes.
    pub address: [u8; 16],
    pub capabilities: Vec<NodeCapability>,
}

impl Serializable for NetworkAddress {
    fn size(&self) -> usize {
        4 + 16 + helper::array_size(&self.capabilities)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(self.timestamp)?;
        writer.write_bytes(&self.address)?;
        helper::serialize_array(&self.capabilities, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let timestamp = reader.read_u32()?;
        let bytes = reader.read_bytes(16)?;
        let mut address = [0u8; 16];
        address.copy_from_slice(&bytes);
        Ok(Self {
            timestamp,
            address,
            capabilities: helper::deserialize_array(reader, 32)?,
        })
    }
}

/// The `Addr` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrPayload {
    pub addresses: Vec<NetworkAddress>,
}

impl Serializable for AddrPayload {
    fn size(&self) -> usize {
        helper::array_size(&self.addresses)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        helper::serialize_array(&self.addresses, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            addresses: helper::deserialize_array(reader, 200)?,
        })
    }
}

/// Ping/Pong heartbeat payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPayload {
    pub last_block_index: u32,
    pub timestamp: u32,
    pub nonce: u32,
}

impl Serializable for PingPayload {
    fn size(&self) -> usize {
        12
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(self.last_block_index)?;
        writer.write_u32(self.timestamp)?;
        writer.write_u32(self.nonce)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            last_block_index: reader.read_u32()?,
            timestamp: reader.read_u32()?,
            nonce: reader.read_u32()?,
        })
    }
}

/// Inventory announcement (also used by `GetData` and `NotFound`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvPayload {
    pub inventory_type: InventoryType,
    pub hashes: Vec<UInt256>,
}

impl Serializable for InvPayload {
    fn size(&self) -> usize {
        1 + neo3_io::var_size(self.hashes.len() as u64) + self.hashes.len() * 32
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.inventory_type as u8)?;
        writer.write_var_int(self.hashes.len() as u64)?;
        for hash in &self.hashes {
            hash.serialize(writer)?;
        }
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let type_byte = reader.read_u8()?;
        let inventory_type = InventoryType::from_byte(type_byte).ok_or_else(|| {
            IoError::InvalidFormat(format!("unknown inventory type 0x{type_byte:02x}"))
        })?;
        let count = reader.read_var_int(MAX_INVENTORY_HASHES as u64)? as usize;
        let mut hashes = Vec::with_capacity(count);
        for _ in 0..count {
            hashes.push(UInt256::deserialize(reader)?);
        }
        Ok(Self {
            inventory_type,
            hashes,
        })
    }
}

/// Legacy hash-based block request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBlocksPayload {
    pub hash_start: UInt256,
    /// -1 means "as many as allowed".
    pub count: i16,
}

impl Serializable for GetBlocksPayload {
    fn size(&self) -> usize {
        34
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.hash_start.serialize(writer)?;
        writer.write_i16(self.count)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            hash_start: UInt256::deserialize(reader)?,
            count: reader.read_i16()?,
        })
    }
}

/// Index-based block/header request (the primary sync primitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetBlockByIndexPayload {
    pub index_start: u32,
    /// -1 requests the protocol maximum.
    pub count: i16,
}

/// Most blocks a single request may ask for.
pub const MAX_BLOCKS_PER_REQUEST: i16 = 500;

impl Serializable for GetBlockByIndexPayload {
    fn size(&self) -> usize {
        6
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(self.index_start)?;
        writer.write_i16(self.count)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let index_start = reader.read_u32()?;
        let count = reader.read_i16()?;
        if count < -1 || count == 0 || count > MAX_BLOCKS_PER_REQUEST {
            return Err(IoError::InvalidFormat(format!("invalid count {count}")));
        }
        Ok(Self { index_start, count })
    }
}

/// A batch of headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadersPayload {
    pub headers: Vec<BlockHeader>,
}

/// Most headers per `Headers` message.
pub const MAX_HEADERS_COUNT: usize = 2000;

impl Serializable for HeadersPayload {
    fn size(&self) -> usize {
        helper::array_size(&self.headers)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        helper::serialize_array(&self.headers, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            headers: helper::deserialize_array(reader, MAX_HEADERS_COUNT)?,
        })
    }
}

/// The consensus / state-service carrier payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensiblePayload {
    pub category: String,
    pub valid_block_start: u32,
    pub valid_block_end: u32,
    pub sender: UInt160,
    pub data: Vec<u8>,
    pub witness: Witness,
}

impl ExtensiblePayload {
    /// The payload hash (over the unsigned portion).
    pub fn hash(&self) -> UInt256 {
        UInt256::from(hash256(&self.unsigned_data()))
    }

    fn unsigned_data(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        let _ = writer.write_var_string(&self.category);
        let _ = writer.write_u32(self.valid_block_start);
        let _ = writer.write_u32(self.valid_block_end);
        let _ = self.sender.serialize(&mut writer);
        let _ = writer.write_var_bytes(&self.data);
        writer.into_bytes()
    }

    /// The bytes the sender signs: network magic then hash.
    pub fn sign_data(&self, network: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity(36);
        data.extend_from_slice(&network.to_le_bytes());
        data.extend_from_slice(self.hash().as_bytes());
        data
    }
}

impl Serializable for ExtensiblePayload {
    fn size(&self) -> usize {
        neo3_io::var_bytes_size(self.category.len())
            + 8
            + 20
            + neo3_io::var_bytes_size(self.data.len())
            + 1
            + self.witness.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_var_string(&self.category)?;
        writer.write_u32(self.valid_block_start)?;
        writer.write_u32(self.valid_block_end)?;
        self.sender.serialize(writer)?;
        writer.write_var_bytes(&self.data)?;
        writer.write_var_int(1)?;
        self.witness.serialize(writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let category = reader.read_var_string(32)?;
        let valid_block_start = reader.read_u32()?;
        let valid_block_end = reader.read_u32()?;
        if valid_block_start >= valid_block_end {
            return Err(IoError::InvalidFormat("empty validity window".into()));
        }
        let sender = UInt160::deserialize(reader)?;
        let data = reader.read_var_bytes(u16::MAX as usize)?;
        if reader.read_var_int(1)? != 1 {
            return Err(IoError::InvalidFormat("expected one witness".into()));
        }
        let witness = Witness::deserialize(reader)?;
        Ok(Self {
            category,
            valid_block_start,
            valid_block_end,
            sender,
            data,
            witness,
        })
    }
}

/// `FilterLoad`: install a bloom filter on the serving peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLoadPayload {
    pub filter: Vec<u8>,
    pub k: u8,
    pub tweak: u32,
}

impl Serializable for FilterLoadPayload {
    fn size(&self) -> usize {
        neo3_io::var_bytes_size(self.filter.len()) + 1 + 4
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_var_bytes(&self.filter)?;
        writer.write_u8(self.k)?;
        writer.write_u32(self.tweak)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let filter = reader.read_var_bytes(36_000)?;
        let k = reader.read_u8()?;
        if k > 50 {
            return Err(IoError::InvalidFormat("too many hash functions".into()));
        }
        Ok(Self {
            filter,
            k,
            tweak: reader.read_u32()?,
        })
    }
}

/// `FilterAdd`: add one element to the installed filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterAddPayload {
    pub data: Vec<u8>,
}

impl Serializable for FilterAddPayload {
    fn size(&self) -> usize {
        neo3_io::var_bytes_size(self.data.len())
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_var_bytes(&self.data)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Ok(Self {
            data: reader.read_var_bytes(520)?,
        })
    }
}

/// `MerkleBlock`: a header with a partial Merkle proof for filtered
/// transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleBlockPayload {
    pub header: BlockHeader,
    pub transaction_count: u32,
    pub hashes: Vec<UInt256>,
    pub flags: Vec<u8>,
}

impl Serializable for MerkleBlockPayload {
    fn size(&self) -> usize {
        self.header.size()
            + neo3_io::var_size(self.transaction_count as u64)
            + neo3_io::var_size(self.hashes.len() as u64)
            + self.hashes.len() * 32
            + neo3_io::var_bytes_size(self.flags.len())
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.header.serialize(writer)?;
        writer.write_var_int(u64::from(self.transaction_count))?;
        writer.write_var_int(self.hashes.len() as u64)?;
        for hash in &self.hashes {
            hash.serialize(writer)?;
        }
        writer.write_var_bytes(&self.flags)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let header = BlockHeader::deserialize(reader)?;
        let transaction_count = reader.read_var_int(u16::MAX as u64)? as u32;
        let count = reader.read_var_int(u16::MAX as u64)? as usize;
        let mut hashes = Vec::with_capacity(count);
        for _ in 0..count {
            hashes.push(UInt256::deserialize(reader)?);
        }
        Ok(Self {
            header,
            transaction_count,
            hashes,
            flags: reader.read_var_bytes(u16::MAX as usize)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn test_version_payload_roundtrip() {
        let payload = VersionPayload {
            network: 0x334F454E,
            version: 0,
            timestamp: 1_700_000_000,
            nonce: 0xDEADBEEF,
            user_agent: "/neo3-rs:0.1/".into(),
            capabilities: vec![
                NodeCapability::TcpServer { port: 10333 },
                NodeCapability::FullNode { start_height: 42 },
            ],
        };
        let bytes = payload.to_array();
        assert_eq!(bytes.len(), payload.size());
        let back = VersionPayload::from_array(&bytes).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back.start_height(), Some(42));
    }

    #[test]
    fn test_inv_payload_roundtrip() {
        let payload = InvPayload {
            inventory_type: InventoryType::Block,
            hashes: vec![UInt256::from_data(b"a"), UInt256::from_data(b"b")],
        };
        let bytes = payload.to_array();
        assert_eq!(bytes.len(), payload.size());
        assert_eq!(InvPayload::from_array(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_get_block_by_index_bounds() {
        let ok = GetBlockByIndexPayload {
            index_start: 10,
            count: 500,
        };
        assert!(GetBlockByIndexPayload::from_array(&ok.to_array()).is_ok());
        let bad = GetBlockByIndexPayload {
            index_start: 10,
            count: 501,
        };
        assert!(GetBlockByIndexPayload::from_array(&bad.to_array()).is_err());
    }

    #[test]
    fn test_extensible_payload_hash_excludes_witness() {
        let mut payload = ExtensiblePayload {
            category: "dBFT".into(),
            valid_block_start: 1,
            valid_block_end: 10,
            sender: UInt160::from_script(b"sender"),
            data: vec![1, 2, 3],
            witness: Witness::empty(),
        };
        let hash = payload.hash();
        payload.witness = Witness::new(vec![1], vec![2]);
        assert_eq!(payload.hash(), hash);
        let bytes = payload.to_array();
        assert_eq!(bytes.len(), payload.size());
        assert_eq!(ExtensiblePayload::from_array(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_extensible_window_validated() {
        let payload = ExtensiblePayload {
            category: "dBFT".into(),
            valid_block_start: 10,
            valid_block_end: 10,
            sender: UInt160::ZERO,
            data: Vec::new(),
            witness: Witness::empty(),
        };
        assert!(ExtensiblePayload::from_array(&payload.to_array()).is_err());
    }
}
