// Copyright (C) 2015-2025 The Neo Project.
//
// contract_state.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! NEF files and deployed contract state.

use crate::error::{ContractError, ContractResult};
use crate::manifest::ContractManifest;
use neo3_core::{hash256, UInt160};
use neo3_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable, SerializableExt};
use neo3_vm::{CallFlags, OpCode, ScriptBuilder};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// `NEF3` little-endian.
pub const NEF_MAGIC: u32 = 0x3346_454E;
/// Maximum NEF script length.
pub const MAX_NEF_SCRIPT: usize = 512 * 1024;
/// Maximum method tokens per NEF.
pub const MAX_METHOD_TOKENS: usize = 128;

/// A static call target embedded in a NEF file, used by `CALLT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodToken {
    pub hash: UInt160,
    pub method: String,
    pub parameters_count: u16,
    pub has_return_value: bool,
    pub call_flags: u8,
}

impl Serializable for MethodToken {
    fn size(&self) -> usize {
        20 + neo3_io::var_bytes_size(self.method.len()) + 2 + 1 + 1
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.hash.serialize(writer)?;
        writer.write_var_string(&self.method)?;
        writer.write_u16(self.parameters_count)?;
        writer.write_bool(self.has_return_value)?;
        writer.write_u8(self.call_flags)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let hash = UInt160::deserialize(reader)?;
        let method = reader.read_var_string(32)?;
        if method.starts_with('_') {
            return Err(IoError::InvalidFormat(
                "method tokens cannot target reserved methods".into(),
            ));
        }
        let parameters_count = reader.read_u16()?;
        let has_return_value = reader.read_bool()?;
        let call_flags = reader.read_u8()?;
        if CallFlags::from_byte(call_flags).is_none() {
            return Err(IoError::InvalidFormat("invalid token call flags".into()));
        }
        Ok(Self {
            hash,
            method,
            parameters_count,
            has_return_value,
            call_flags,
        })
    }
}

/// The Neo executable format: compiler tag, method tokens and script,
/// sealed by a double-sha256 checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NefFile {
    pub compiler: String,
    pub source: String,
    pub tokens: Vec<MethodToken>,
    pub script: Vec<u8>,
    pub checksum: u32,
}

impl NefFile {
    /// Builds a NEF around `script`, computing the checksum.
    pub fn new(compiler: &str, script: Vec<u8>) -> ContractResult<Self> {
        let mut nef = Self {
            compiler: compiler.into(),
            source: String::new(),
            tokens: Vec::new(),
            script,
            checksum: 0,
        };
        nef.checksum = nef.compute_checksum()?;
        Ok(nef)
    }

    fn serialize_without_checksum(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u32(NEF_MAGIC)?;
        writer.write_fixed_string(&self.compiler, 64)?;
        writer.write_var_string(&self.source)?;
        writer.write_u8(0)?;
        helper::serialize_array(&self.tokens, writer)?;
        writer.write_u16(0)?;
        writer.write_var_bytes(&self.script)
    }

    /// The checksum: first four little-endian bytes of the double-sha256
    /// of everything before the checksum field.
    pub fn compute_checksum(&self) -> ContractResult<u32> {
        let mut writer = BinaryWriter::new();
        self.serialize_without_checksum(&mut writer)?;
        let digest = hash256(writer.as_slice());
        Ok(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }

    /// Full structural validation.
    pub fn validate(&self) -> ContractResult<()> {
        if self.script.is_empty() || self.script.len() > MAX_NEF_SCRIPT {
            return Err(ContractError::InvalidArgument(format!(
                "nef script length {} out of range",
                self.script.len()
            )));
        }
        if self.tokens.len() > MAX_METHOD_TOKENS {
            return Err(ContractError::InvalidArgument("too many method tokens".into()));
        }
        if self.checksum != self.compute_checksum()? {
            return Err(ContractError::InvalidArgument("nef checksum mismatch".into()));
        }
        Ok(())
    }
}

impl Serializable for NefFile {
    fn size(&self) -> usize {
        4 + 64
            + neo3_io::var_bytes_size(self.source.len())
            + 1
            + helper::array_size(&self.tokens)
            + 2
            + neo3_io::var_bytes_size(self.script.len())
            + 4
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_without_checksum(writer)?;
        writer.write_u32(self.checksum)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let magic = reader.read_u32()?;
        if magic != NEF_MAGIC {
            return Err(IoError::InvalidFormat(format!("bad nef magic 0x{magic:08x}")));
        }
        let compiler = reader.read_fixed_string(64)?;
        let source = reader.read_var_string(256)?;
        if reader.read_u8()? != 0 {
            return Err(IoError::InvalidFormat("reserved nef byte must be zero".into()));
        }
        let tokens = helper::deserialize_array(reader, MAX_METHOD_TOKENS)?;
        if reader.read_u16()? != 0 {
            return Err(IoError::InvalidFormat("reserved nef field must be zero".into()));
        }
        let script = reader.read_var_bytes(MAX_NEF_SCRIPT)?;
        let checksum = reader.read_u32()?;
        Ok(Self {
            compiler,
            source,
            tokens,
            script,
            checksum,
        })
    }
}

/// A deployed (or native) contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    pub id: i32,
    pub update_counter: u16,
    pub hash: UInt160,
    pub nef: NefFile,
    pub manifest: ContractManifest,
}

impl ContractState {
    /// Serializes for storage under the ContractManagement prefix.
    pub fn to_storage_bytes(&self) -> ContractResult<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        writer.write_i32(self.id)?;
        writer.write_u16(self.update_counter)?;
        self.hash.serialize(&mut writer)?;
        let nef_bytes = self.nef.to_array();
        writer.write_var_bytes(&nef_bytes)?;
        let manifest_bytes = self.manifest.to_bytes()?;
        writer.write_var_bytes(&manifest_bytes)?;
        Ok(writer.into_bytes())
    }

    /// Restores from the storage encoding.
    pub fn from_storage_bytes(data: &[u8]) -> ContractResult<Self> {
        let mut reader = MemoryReader::new(data);
        let id = reader.read_i32()?;
        let update_counter = reader.read_u16()?;
        let hash = UInt160::deserialize(&mut reader)?;
        let nef_bytes = reader.read_var_bytes(MAX_NEF_SCRIPT + 1024)?;
        let nef = NefFile::from_array(&nef_bytes)?;
        let manifest_bytes = reader.read_var_bytes(crate::manifest::MAX_MANIFEST_SIZE)?;
        let manifest = ContractManifest::parse(&manifest_bytes)?;
        Ok(Self {
            id,
            update_counter,
            hash,
            nef,
            manifest,
        })
    }
}

/// The deterministic contract-hash formula: `hash160` over
/// `ABORT ‖ push(sender) ‖ push(nef checksum) ‖ push(name)`.
pub fn get_contract_hash(sender: &UInt160, nef_checksum: u32, name: &str) -> UInt160 {
    let mut builder = ScriptBuilder::new();
    builder.emit(OpCode::ABORT);
    builder.emit_push_bytes(&sender.to_array());
    builder.emit_push_int(&BigInt::from(nef_checksum));
    builder.emit_push_bytes(name.as_bytes());
    UInt160::from_script(&builder.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nef_roundtrip() {
        let nef = NefFile::new("neo3-rs", vec![0x40]).unwrap();
        nef.validate().unwrap();
        let bytes = nef.to_array();
        assert_eq!(bytes.len(), nef.size());
        let back = NefFile::from_array(&bytes).unwrap();
        assert_eq!(back, nef);
        back.validate().unwrap();
    }

    #[test]
    fn test_nef_checksum_detects_tampering() {
        let mut nef = NefFile::new("neo3-rs", vec![0x40]).unwrap();
        nef.script = vec![0x41, 0x00, 0x00, 0x00, 0x00];
        assert!(nef.validate().is_err());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let nef = NefFile::new("neo3-rs", vec![0x40]).unwrap();
        let mut bytes = nef.to_array();
        bytes[0] ^= 0xFF;
        assert!(NefFile::from_array(&bytes).is_err());
    }

    #[test]
    fn test_contract_hash_depends_on_inputs() {
        let sender = UInt160::from_script(b"sender");
        let a = get_contract_hash(&sender, 1, "A");
        let b = get_contract_hash(&sender, 1, "B");
        let c = get_contract_hash(&sender, 2, "A");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_contract_state_storage_roundtrip() {
        let nef = NefFile::new("neo3-rs", vec![0x40]).unwrap();
        let state = ContractState {
            id: 7,
            update_counter: 1,
            hash: UInt160::from_script(b"contract"),
            nef,
            manifest: ContractManifest::new("sample"),
        };
        let bytes = state.to_storage_bytes().unwrap();
        assert_eq!(ContractState::from_storage_bytes(&bytes).unwrap(), state);
    }
}
