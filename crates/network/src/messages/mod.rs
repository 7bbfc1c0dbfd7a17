// Copyright (C) 2015-2025 The Neo Project.
//
// mod.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The message envelope and command table.

mod payloads;

pub use payloads::{
    AddrPayload, ExtensiblePayload, FilterAddPayload, FilterLoadPayload, GetBlockByIndexPayload,
    GetBlocksPayload, HeadersPayload, InvPayload, InventoryType, MerkleBlockPayload,
    NetworkAddress, NodeCapability, PingPayload, VersionPayload, MAX_BLOCKS_PER_REQUEST,
    MAX_HEADERS_COUNT,
};

use crate::compression;
use crate::{NetworkError, NetworkResult};
use neo3_config::MAX_PAYLOAD_SIZE;
use neo3_io::{BinaryWriter, MemoryReader, Serializable};

/// Envelope flag bit 0: the payload is LZ4-compressed.
const FLAG_COMPRESSED: u8 = 0x01;

/// P2P command bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageCommand {
    // Handshake
    Version = 0x00,
    Verack = 0x01,
    // Discovery
    GetAddr = 0x10,
    Addr = 0x11,
    Ping = 0x18,
    Pong = 0x19,
    // Sync
    GetHeaders = 0x20,
    Headers = 0x21,
    GetBlocks = 0x24,
    Mempool = 0x25,
    Inv = 0x27,
    GetData = 0x28,
    GetBlockByIndex = 0x29,
    NotFound = 0x2A,
    Transaction = 0x2B,
    Block = 0x2C,
    Extensible = 0x2E,
    Reject = 0x2F,
    // SPV
    FilterLoad = 0x30,
    FilterAdd = 0x31,
    FilterClear = 0x32,
    MerkleBlock = 0x38,
    // Misc
    Alert = 0x40,
}

impl MessageCommand {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Version),
            0x01 => Some(Self::Verack),
            0x10 => Some(Self::GetAddr),
            0x11 => Some(Self::Addr),
            0x18 => Some(Self::Ping),
            0x19 => Some(Self::Pong),
            0x20 => Some(Self::GetHeaders),
            0x21 => Some(Self::Headers),
            0x24 => Some(Self::GetBlocks),
            0x25 => Some(Self::Mempool),
            0x27 => Some(Self::Inv),
            0x28 => Some(Self::GetData),
            0x29 => Some(Self::GetBlockByIndex),
            0x2A => Some(Self::NotFound),
            0x2B => Some(Self::Transaction),
            0x2C => Some(Self::Block),
            0x2E => Some(Self::Extensible),
            0x2F => Some(Self::Reject),
            0x30 => Some(Self::FilterLoad),
            0x31 => Some(Self::FilterAdd),
            0x32 => Some(Self::FilterClear),
            0x38 => Some(Self::MerkleBlock),
            0x40 => Some(Self::Alert),
            _ => None,
        }
    }

    /// Commands whose payloads are worth compressing.
    pub fn is_compressible(self) -> bool {
        matches!(
            self,
            Self::Block | Self::Transaction | Self::Headers | Self::Addr | Self::Extensible
                | Self::MerkleBlock
        )
    }
}

/// One framed P2P message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: MessageCommand,
    pub payload: Vec<u8>,
}

impl Message {
    /// Frames a command with a raw payload.
    pub fn new(command: MessageCommand, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }

    /// Frames a serializable payload.
    pub fn with_payload<T: Serializable>(command: MessageCommand, payload: &T) -> Self {
        let mut writer = BinaryWriter::with_capacity(payload.size());
        let _ = payload.serialize(&mut writer);
        Self::new(command, writer.into_bytes())
    }

    /// A payload-less message.
    pub fn empty(command: MessageCommand) -> Self {
        Self::new(command, Vec::new())
    }

    /// Encodes `flags ‖ command ‖ var-bytes payload`, compressing when
    /// the command allows it and compression pays.
    pub fn encode(&self) -> Vec<u8> {
        let (flags, body) = if self.command.is_compressible() {
            match compression::try_compress(&self.payload) {
                Some(compressed) => (FLAG_COMPRESSED, compressed),
                None => (0, self.payload.clone()),
            }
        } else {
            (0, self.payload.clone())
        };
        let mut writer = BinaryWriter::with_capacity(body.len() + 9);
        let _ = writer.write_u8(flags);
        let _ = writer.write_u8(self.command as u8);
        let _ = writer.write_var_bytes(&body);
        writer.into_bytes()
    }

    /// Decodes one message from `data`, returning it with the number of
    /// consumed bytes.
    pub fn decode(data: &[u8]) -> NetworkResult<(Message, usize)> {
        let mut reader = MemoryReader::new(data);
        let flags = reader.read_u8()?;
        let command_byte = reader.read_u8()?;
        let command = MessageCommand::from_byte(command_byte)
            .ok_or_else(|| NetworkError::Malformed(format!("unknown command 0x{command_byte:02x}")))?;
        let body = reader.read_var_bytes(MAX_PAYLOAD_SIZE)?;
        let payload = if flags & FLAG_COMPRESSED != 0 {
            compression::decompress(&body, MAX_PAYLOAD_SIZE)?
        } else {
            body
        };
        Ok((Message { command, payload }, reader.position()))
    }

    /// Deserializes the payload into a typed structure.
    pub fn payload_as<T: Serializable>(&self) -> NetworkResult<T> {
        let mut reader = MemoryReader::new(&self.payload);
        let value = T::deserialize(&mut reader)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_uncompressed() {
        let message = Message::new(MessageCommand::Ping, vec![1, 2, 3]);
        let encoded = message.encode();
        assert_eq!(encoded[0], 0);
        assert_eq!(encoded[1], MessageCommand::Ping as u8);
        let (decoded, consumed) = Message::decode(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_roundtrip_compressed() {
        let message = Message::new(MessageCommand::Block, vec![0xAA; 4096]);
        let encoded = message.encode();
        assert_eq!(encoded[0] & 0x01, 0x01);
        assert!(encoded.len() < 4096);
        let (decoded, _) = Message::decode(&encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_unknown_command_rejected() {
        let bad = [0u8, 0xEE, 0x00];
        assert!(Message::decode(&bad).is_err());
    }

    #[test]
    fn test_streaming_decode_consumes_exactly_one_message() {
        let first = Message::empty(MessageCommand::Verack).encode();
        let second = Message::new(MessageCommand::Ping, vec![9]).encode();
        let mut stream = first.clone();
        stream.extend_from_slice(&second);
        let (message, consumed) = Message::decode(&stream).unwrap();
        assert_eq!(message.command, MessageCommand::Verack);
        assert_eq!(consumed, first.len());
        let (message, _) = Message::decode(&stream[consumed..]).unwrap();
        assert_eq!(message.command, MessageCommand::Ping);
    }
}
