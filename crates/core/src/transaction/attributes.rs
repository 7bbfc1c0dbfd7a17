// Copyright (C) 2015-2025 The Neo Project.
//
// attributes.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Transaction attributes.

use crate::UInt256;
use neo3_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Maximum oracle response result size.
pub const MAX_ORACLE_RESULT_SIZE: usize = 0xFFFF;

/// Attribute type bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionAttributeType {
    /// Lifts the transaction above all fee-ordered entries in the pool.
    HighPriority = 0x01,
    /// Marks the transaction as an oracle response.
    OracleResponse = 0x11,
    /// Blocks the transaction below a given height.
    NotValidBefore = 0x20,
    /// Invalidates the listed transaction if this one is accepted.
    Conflicts = 0x21,
}

impl TryFrom<u8> for TransactionAttributeType {
    type Error = IoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::HighPriority),
            0x11 => Ok(Self::OracleResponse),
            0x20 => Ok(Self::NotValidBefore),
            0x21 => Ok(Self::Conflicts),
            other => Err(IoError::InvalidFormat(format!(
                "invalid transaction attribute type 0x{other:02x}"
            ))),
        }
    }
}

/// Result codes an oracle node can attach to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OracleResponseCode {
    Success = 0x00,
    ProtocolNotSupported = 0x10,
    ConsensusUnreachable = 0x12,
    NotFound = 0x14,
    Timeout = 0x16,
    Forbidden = 0x18,
    ResponseTooLarge = 0x1A,
    InsufficientFunds = 0x1C,
    ContentTypeNotSupported = 0x1F,
    Error = 0xFF,
}

impl TryFrom<u8> for OracleResponseCode {
    type Error = IoError;

    fn try_from(value: u8) -> Result<Self, IoError> {
        match value {
            0x00 => Ok(Self::Success),
            0x10 => Ok(Self::ProtocolNotSupported),
            0x12 => Ok(Self::ConsensusUnreachable),
            0x14 => Ok(Self::NotFound),
            0x16 => Ok(Self::Timeout),
            0x18 => Ok(Self::Forbidden),
            0x1A => Ok(Self::ResponseTooLarge),
            0x1C => Ok(Self::InsufficientFunds),
            0x1F => Ok(Self::ContentTypeNotSupported),
            0xFF => Ok(Self::Error),
            other => Err(IoError::InvalidFormat(format!(
                "invalid oracle response code 0x{other:02x}"
            ))),
        }
    }
}

/// The payload of an `OracleResponse` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResponse {
    /// The request this response answers.
    pub id: u64,
    /// Outcome of the oracle fetch.
    pub code: OracleResponseCode,
    /// The fetched data; empty unless `code` is `Success`.
    pub result: Vec<u8>,
}

/// A transaction attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAttribute {
    HighPriority,
    OracleResponse(OracleResponse),
    NotValidBefore { height: u32 },
    Conflicts { hash: UInt256 },
}

impl TransactionAttribute {
    /// The attribute's wire type.
    pub fn attribute_type(&self) -> TransactionAttributeType {
        match self {
            TransactionAttribute::HighPriority => TransactionAttributeType::HighPriority,
            TransactionAttribute::OracleResponse(_) => TransactionAttributeType::OracleResponse,
            TransactionAttribute::NotValidBefore { .. } => TransactionAttributeType::NotValidBefore,
            TransactionAttribute::Conflicts { .. } => TransactionAttributeType::Conflicts,
        }
    }

    /// Whether a transaction may carry several attributes of this type.
    pub fn allow_multiple(&self) -> bool {
        matches!(self, TransactionAttribute::Conflicts { .. })
    }
}

impl Serializable for TransactionAttribute {
    fn size(&self) -> usize {
        1 + match self {
            TransactionAttribute::HighPriority => 0,
            TransactionAttribute::OracleResponse(response) => {
                8 + 1 + neo3_io::var_bytes_size(response.result.len())
            }
            TransactionAttribute::NotValidBefore { .. } => 4,
            TransactionAttribute::Conflicts { .. } => 32,
        }
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.attribute_type() as u8)?;
        match self {
            TransactionAttribute::HighPriority => Ok(()),
            TransactionAttribute::OracleResponse(response) => {
                writer.write_u64(response.id)?;
                writer.write_u8(response.code as u8)?;
                writer.write_var_bytes(&response.result)
            }
            TransactionAttribute::NotValidBefore { height } => writer.write_u32(*height),
            TransactionAttribute::Conflicts { hash } => Serializable::serialize(hash, writer),
        }
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let attribute_type = TransactionAttributeType::try_from(reader.read_u8()?)?;
        match attribute_type {
            TransactionAttributeType::HighPriority => Ok(TransactionAttribute::HighPriority),
            TransactionAttributeType::OracleResponse => {
                let id = reader.read_u64()?;
                let code = OracleResponseCode::try_from(reader.read_u8()?)?;
                let result = reader.read_var_bytes(MAX_ORACLE_RESULT_SIZE)?;
                if code != OracleResponseCode::Success && !result.is_empty() {
                    return Err(IoError::InvalidFormat(
                        "oracle response carries a result for a non-success code".into(),
                    ));
                }
                Ok(TransactionAttribute::OracleResponse(OracleResponse {
                    id,
                    code,
                    result,
                }))
            }
            TransactionAttributeType::NotValidBefore => Ok(TransactionAttribute::NotValidBefore {
                height: reader.read_u32()?,
            }),
            TransactionAttributeType::Conflicts => Ok(TransactionAttribute::Conflicts {
                hash: <UInt256 as Serializable>::deserialize(reader)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn test_type_bytes() {
        assert_eq!(TransactionAttributeType::HighPriority as u8, 0x01);
        assert_eq!(TransactionAttributeType::OracleResponse as u8, 0x11);
        assert_eq!(TransactionAttributeType::NotValidBefore as u8, 0x20);
        assert_eq!(TransactionAttributeType::Conflicts as u8, 0x21);
    }

    #[test]
    fn test_wire_roundtrip() {
        let attributes = [
            TransactionAttribute::HighPriority,
            TransactionAttribute::NotValidBefore { height: 42 },
            TransactionAttribute::Conflicts {
                hash: UInt256::from_data(b"other"),
            },
            TransactionAttribute::OracleResponse(OracleResponse {
                id: 7,
                code: OracleResponseCode::Success,
                result: vec![1, 2, 3],
            }),
        ];
        for attribute in attributes {
            let bytes = attribute.to_array();
            assert_eq!(bytes.len(), attribute.size());
            assert_eq!(TransactionAttribute::from_array(&bytes).unwrap(), attribute);
        }
    }

    #[test]
    fn test_non_success_oracle_result_rejected() {
        let bad = TransactionAttribute::OracleResponse(OracleResponse {
            id: 7,
            code: OracleResponseCode::Timeout,
            result: vec![1],
        });
        assert!(TransactionAttribute::from_array(&bad.to_array()).is_err());
    }
}
