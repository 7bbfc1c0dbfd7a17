// Copyright (C) 2015-2025 The Neo Project.
//
// messages.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Consensus message codec.
//!
//! Every message shares the envelope
//! `type u8 ‖ block_index u32 ‖ validator_index u8 ‖ view u8` followed by
//! the type-specific body. On the network, messages ride inside
//! `Extensible` payloads with category `"dBFT"`.

use neo3_core::UInt256;
use neo3_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};

/// Maximum transaction hashes in one prepare request.
const MAX_PROPOSAL_HASHES: usize = u16::MAX as usize;

/// Consensus message kinds and their wire bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConsensusMessageType {
    ChangeView = 0x00,
    PrepareRequest = 0x20,
    PrepareResponse = 0x21,
    Commit = 0x30,
    RecoveryRequest = 0x40,
    RecoveryMessage = 0x41,
}

impl ConsensusMessageType {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::ChangeView),
            0x20 => Some(Self::PrepareRequest),
            0x21 => Some(Self::PrepareResponse),
            0x30 => Some(Self::Commit),
            0x40 => Some(Self::RecoveryRequest),
            0x41 => Some(Self::RecoveryMessage),
            _ => None,
        }
    }
}

/// Why a validator asked to change the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChangeViewReason {
    Timeout = 0x00,
    ChangeAgreement = 0x01,
    TxNotFound = 0x02,
    TxRejectedByPolicy = 0x03,
    TxInvalid = 0x04,
    BlockRejectedByPolicy = 0x05,
}

impl ChangeViewReason {
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x01 => Self::ChangeAgreement,
            0x02 => Self::TxNotFound,
            0x03 => Self::TxRejectedByPolicy,
            0x04 => Self::TxInvalid,
            0x05 => Self::BlockRejectedByPolicy,
            _ => Self::Timeout,
        }
    }
}

/// The proposal fields a primary broadcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRequestPayload {
    pub version: u32,
    pub prev_hash: UInt256,
    pub timestamp: u64,
    pub nonce: u64,
    pub transaction_hashes: Vec<UInt256>,
}

/// A compact change-view record inside a recovery message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeViewCompact {
    pub validator_index: u8,
    pub original_view: u8,
    pub timestamp: u64,
}

/// A compact preparation record inside a recovery message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparationCompact {
    pub validator_index: u8,
}

/// A compact commit record inside a recovery message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCompact {
    pub view_number: u8,
    pub validator_index: u8,
    pub signature: [u8; 64],
}

/// The state bundle answering a recovery request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryMessage {
    pub change_views: Vec<ChangeViewCompact>,
    pub prepare_request: Option<PrepareRequestPayload>,
    /// Set instead of `prepare_request` when only the hash is known.
    pub preparation_hash: Option<UInt256>,
    pub preparations: Vec<PreparationCompact>,
    pub commits: Vec<CommitCompact>,
}

/// The type-specific body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusPayload {
    ChangeView {
        timestamp: u64,
        reason: ChangeViewReason,
    },
    PrepareRequest(PrepareRequestPayload),
    PrepareResponse {
        preparation_hash: UInt256,
    },
    Commit {
        signature: [u8; 64],
    },
    RecoveryRequest {
        timestamp: u64,
    },
    RecoveryMessage(Box<RecoveryMessage>),
}

impl ConsensusPayload {
    pub fn message_type(&self) -> ConsensusMessageType {
        match self {
            ConsensusPayload::ChangeView { .. } => ConsensusMessageType::ChangeView,
            ConsensusPayload::PrepareRequest(_) => ConsensusMessageType::PrepareRequest,
            ConsensusPayload::PrepareResponse { .. } => ConsensusMessageType::PrepareResponse,
            ConsensusPayload::Commit { .. } => ConsensusMessageType::Commit,
            ConsensusPayload::RecoveryRequest { .. } => ConsensusMessageType::RecoveryRequest,
            ConsensusPayload::RecoveryMessage(_) => ConsensusMessageType::RecoveryMessage,
        }
    }
}

/// A full consensus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusMessage {
    pub block_index: u32,
    pub validator_index: u8,
    pub view_number: u8,
    pub payload: ConsensusPayload,
}

impl ConsensusMessage {
    pub fn message_type(&self) -> ConsensusMessageType {
        self.payload.message_type()
    }
}

fn serialize_prepare_request(
    payload: &PrepareRequestPayload,
    writer: &mut BinaryWriter,
) -> IoResult<()> {
    writer.write_u32(payload.version)?;
    payload.prev_hash.serialize(writer)?;
    writer.write_u64(payload.timestamp)?;
    writer.write_u64(payload.nonce)?;
    writer.write_var_int(payload.transaction_hashes.len() as u64)?;
    for hash in &payload.transaction_hashes {
        hash.serialize(writer)?;
    }
    Ok(())
}

fn deserialize_prepare_request(reader: &mut MemoryReader<'_>) -> IoResult<PrepareRequestPayload> {
    let version = reader.read_u32()?;
    let prev_hash = UInt256::deserialize(reader)?;
    let timestamp = reader.read_u64()?;
    let nonce = reader.read_u64()?;
    let count = reader.read_var_int(MAX_PROPOSAL_HASHES as u64)? as usize;
    let mut transaction_hashes = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        transaction_hashes.push(UInt256::deserialize(reader)?);
    }
    Ok(PrepareRequestPayload {
        version,
        prev_hash,
        timestamp,
        nonce,
        transaction_hashes,
    })
}

impl Serializable for ConsensusMessage {
    fn size(&self) -> usize {
        // The envelope plus a body-dependent remainder; measured by
        // serializing, which these small messages afford.
        let mut writer = BinaryWriter::new();
        let _ = self.serialize(&mut writer);
        writer.len()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.message_type() as u8)?;
        writer.write_u32(self.block_index)?;
        writer.write_u8(self.validator_index)?;
        writer.write_u8(self.view_number)?;
        match &self.payload {
            ConsensusPayload::ChangeView { timestamp, reason } => {
                writer.write_u64(*timestamp)?;
                writer.write_u8(*reason as u8)
            }
            ConsensusPayload::PrepareRequest(payload) => {
                serialize_prepare_request(payload, writer)
            }
            ConsensusPayload::PrepareResponse { preparation_hash } => {
                preparation_hash.serialize(writer)
            }
            ConsensusPayload::Commit { signature } => writer.write_bytes(signature),
            ConsensusPayload::RecoveryRequest { timestamp } => writer.write_u64(*timestamp),
            ConsensusPayload::RecoveryMessage(recovery) => {
                writer.write_var_int(recovery.change_views.len() as u64)?;
                for view in &recovery.change_views {
                    writer.write_u8(view.validator_index)?;
                    writer.write_u8(view.original_view)?;
                    writer.write_u64(view.timestamp)?;
                }
                match (&recovery.prepare_request, &recovery.preparation_hash) {
                    (Some(request), _) => {
                        writer.write_u8(1)?;
                        serialize_prepare_request(request, writer)?;
                    }
                    (None, Some(hash)) => {
                        writer.write_u8(2)?;
                        hash.serialize(writer)?;
                    }
                    (None, None) => writer.write_u8(0)?,
                }
                writer.write_var_int(recovery.preparations.len() as u64)?;
                for preparation in &recovery.preparations {
                    writer.write_u8(preparation.validator_index)?;
                }
                writer.write_var_int(recovery.commits.len() as u64)?;
                for commit in &recovery.commits {
                    writer.write_u8(commit.view_number)?;
                    writer.write_u8(commit.validator_index)?;
                    writer.write_bytes(&commit.signature)?;
                }
                Ok(())
            }
        }
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let type_byte = reader.read_u8()?;
        let message_type = ConsensusMessageType::from_byte(type_byte).ok_or_else(|| {
            IoError::InvalidFormat(format!("invalid consensus message type 0x{type_byte:02x}"))
        })?;
        let block_index = reader.read_u32()?;
        let validator_index = reader.read_u8()?;
        let view_number = reader.read_u8()?;
        let payload = match message_type {
            ConsensusMessageType::ChangeView => ConsensusPayload::ChangeView {
                timestamp: reader.read_u64()?,
                reason: ChangeViewReason::from_byte(reader.read_u8()?),
            },
            ConsensusMessageType::PrepareRequest => {
                ConsensusPayload::PrepareRequest(deserialize_prepare_request(reader)?)
            }
            ConsensusMessageType::PrepareResponse => ConsensusPayload::PrepareResponse {
                preparation_hash: UInt256::deserialize(reader)?,
            },
            ConsensusMessageType::Commit => {
                let bytes = reader.read_bytes(64)?;
                let mut signature = [0u8; 64];
                signature.copy_from_slice(&bytes);
                ConsensusPayload::Commit { signature }
            }
            ConsensusMessageType::RecoveryRequest => ConsensusPayload::RecoveryRequest {
                timestamp: reader.read_u64()?,
            },
            ConsensusMessageType::RecoveryMessage => {
                let count = reader.read_var_int(255)? as usize;
                let mut change_views = Vec::with_capacity(count);
                for _ in 0..count {
                    change_views.push(ChangeViewCompact {
                        validator_index: reader.read_u8()?,
                        original_view: reader.read_u8()?,
                        timestamp: reader.read_u64()?,
                    });
                }
                let (prepare_request, preparation_hash) = match reader.read_u8()? {
                    0 => (None, None),
                    1 => (Some(deserialize_prepare_request(reader)?), None),
                    2 => (None, Some(UInt256::deserialize(reader)?)),
                    other => {
                        return Err(IoError::InvalidFormat(format!(
                            "invalid recovery proposal marker {other}"
                        )))
                    }
                };
                let count = reader.read_var_int(255)? as usize;
                let mut preparations = Vec::with_capacity(count);
                for _ in 0..count {
                    preparations.push(PreparationCompact {
                        validator_index: reader.read_u8()?,
                    });
                }
                let count = reader.read_var_int(255)? as usize;
                let mut commits = Vec::with_capacity(count);
                for _ in 0..count {
                    let view_number = reader.read_u8()?;
                    let validator_index = reader.read_u8()?;
                    let bytes = reader.read_bytes(64)?;
                    let mut signature = [0u8; 64];
                    signature.copy_from_slice(&bytes);
                    commits.push(CommitCompact {
                        view_number,
                        validator_index,
                        signature,
                    });
                }
                ConsensusPayload::RecoveryMessage(Box::new(RecoveryMessage {
                    change_views,
                    prepare_request,
                    preparation_hash,
                    preparations,
                    commits,
                }))
            }
        };
        Ok(Self {
            block_index,
            validator_index,
            view_number,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    fn envelope(payload: ConsensusPayload) -> ConsensusMessage {
        ConsensusMessage {
            block_index: 1,
            validator_index: 2,
            view_number: 0,
            payload,
        }
    }

    #[test]
    fn test_roundtrip_all_kinds() {
        let messages = vec![
            envelope(ConsensusPayload::ChangeView {
                timestamp: 12345,
                reason: ChangeViewReason::Timeout,
            }),
            envelope(ConsensusPayload::PrepareRequest(PrepareRequestPayload {
                version: 0,
                prev_hash: UInt256::from_data(b"prev"),
                timestamp: 99,
                nonce: 7,
                transaction_hashes: vec![UInt256::from_data(b"tx")],
            })),
            envelope(ConsensusPayload::PrepareResponse {
                preparation_hash: UInt256::from_data(b"prep"),
            }),
            envelope(ConsensusPayload::Commit { signature: [9u8; 64] }),
            envelope(ConsensusPayload::RecoveryRequest { timestamp: 1 }),
            envelope(ConsensusPayload::RecoveryMessage(Box::new(RecoveryMessage {
                change_views: vec![ChangeViewCompact {
                    validator_index: 1,
                    original_view: 0,
                    timestamp: 5,
                }],
                prepare_request: None,
                preparation_hash: Some(UInt256::from_data(b"hash")),
                preparations: vec![PreparationCompact { validator_index: 3 }],
                commits: vec![CommitCompact {
                    view_number: 0,
                    validator_index: 1,
                    signature: [1u8; 64],
                }],
            }))),
        ];
        for message in messages {
            let bytes = message.to_array();
            assert_eq!(
                ConsensusMessage::from_array(&bytes).unwrap(),
                message,
                "{:?}",
                message.message_type()
            );
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let mut bytes = envelope(ConsensusPayload::RecoveryRequest { timestamp: 1 }).to_array();
        bytes[0] = 0x7F;
        assert!(ConsensusMessage::from_array(&bytes).is_err());
    }
}
