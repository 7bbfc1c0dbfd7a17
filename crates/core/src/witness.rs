// Copyright (C) 2015-2025 The Neo Project.
//
// witness.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The invocation/verification script pair proving a signer's authority.

use crate::UInt160;
use neo3_io::{BinaryWriter, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Maximum invocation script length: enough for the largest multisig
/// invocation (1024 signatures of 66 bytes each).
pub const MAX_INVOCATION_SCRIPT: usize = 1024;
/// Maximum verification script length.
pub const MAX_VERIFICATION_SCRIPT: usize = 1024;

/// A witness: the invocation script pushes arguments (signatures) and the
/// verification script consumes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    /// Script run first, pushing the signatures.
    pub invocation_script: Vec<u8>,
    /// Script whose hash must equal the signer account.
    pub verification_script: Vec<u8>,
}

impl Witness {
    /// Creates a witness from its two scripts.
    pub fn new(invocation_script: Vec<u8>, verification_script: Vec<u8>) -> Self {
        Self {
            invocation_script,
            verification_script,
        }
    }

    /// An empty witness, used while a payload is still unsigned.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The script hash of the verification script.
    pub fn script_hash(&self) -> UInt160 {
        UInt160::from_script(&self.verification_script)
    }
}

impl Serializable for Witness {
    fn size(&self) -> usize {
        neo3_io::var_bytes_size(self.invocation_script.len())
            + neo3_io::var_bytes_size(self.verification_script.len())
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_var_bytes(&self.invocation_script)?;
        writer.write_var_bytes(&self.verification_script)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let invocation_script = reader.read_var_bytes(MAX_INVOCATION_SCRIPT * 66)?;
        let verification_script = reader.read_var_bytes(MAX_VERIFICATION_SCRIPT * 66)?;
        Ok(Self {
            invocation_script,
            verification_script,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn test_wire_roundtrip() {
        let witness = Witness::new(vec![0x0C, 0x40, 0xAA], vec![0x41, 0x56, 0xE7, 0xB3, 0x27]);
        let bytes = witness.to_array();
        assert_eq!(bytes.len(), witness.size());
        assert_eq!(Witness::from_array(&bytes).unwrap(), witness);
    }

    #[test]
    fn test_script_hash_covers_verification_only() {
        let a = Witness::new(vec![1], vec![9, 9, 9]);
        let b = Witness::new(vec![2], vec![9, 9, 9]);
        assert_eq!(a.script_hash(), b.script_hash());
    }
}
