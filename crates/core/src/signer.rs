// Copyright (C) 2015-2025 The Neo Project.
//
// signer.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! A transaction signer: an account plus the scope of its witness.

use crate::{UInt160, WitnessRule, WitnessScope};
use neo3_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Maximum entries in each of a signer's allow-lists.
pub const MAX_SUBITEMS: usize = 16;

/// An account authorizing a transaction, with scope restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// The account whose witness must verify.
    pub account: UInt160,
    /// Where the witness applies.
    pub scopes: WitnessScope,
    /// Contract allow-list, used with `CUSTOM_CONTRACTS`.
    pub allowed_contracts: Vec<UInt160>,
    /// Manifest-group allow-list (compressed keys), used with `CUSTOM_GROUPS`.
    pub allowed_groups: Vec<Vec<u8>>,
    /// Rule tree, used with `WITNESS_RULES`.
    pub rules: Vec<WitnessRule>,
}

impl Signer {
    /// A signer with the given scope and empty allow-lists.
    pub fn new(account: UInt160, scopes: WitnessScope) -> Self {
        Self {
            account,
            scopes,
            allowed_contracts: Vec::new(),
            allowed_groups: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// A signer restricted to the transaction entry script.
    pub fn called_by_entry(account: UInt160) -> Self {
        Self::new(account, WitnessScope::CALLED_BY_ENTRY)
    }

    /// A signer valid everywhere.
    pub fn global(account: UInt160) -> Self {
        Self::new(account, WitnessScope::GLOBAL)
    }
}

impl Serializable for Signer {
    fn size(&self) -> usize {
        let mut size = 20 + 1;
        if self.scopes.contains(WitnessScope::CUSTOM_CONTRACTS) {
            size += helper::array_size(&self.allowed_contracts);
        }
        if self.scopes.contains(WitnessScope::CUSTOM_GROUPS) {
            size += neo3_io::var_size(self.allowed_groups.len() as u64)
                + self.allowed_groups.iter().map(Vec::len).sum::<usize>();
        }
        if self.scopes.contains(WitnessScope::WITNESS_RULES) {
            size += helper::array_size(&self.rules);
        }
        size
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        Serializable::serialize(&self.account, writer)?;
        writer.write_u8(self.scopes.to_byte())?;
        if self.scopes.contains(WitnessScope::CUSTOM_CONTRACTS) {
            helper::serialize_array(&self.allowed_contracts, writer)?;
        }
        if self.scopes.contains(WitnessScope::CUSTOM_GROUPS) {
            writer.write_var_int(self.allowed_groups.len() as u64)?;
            for group in &self.allowed_groups {
                writer.write_bytes(group)?;
            }
        }
        if self.scopes.contains(WitnessScope::WITNESS_RULES) {
            helper::serialize_array(&self.rules, writer)?;
        }
        Ok(())
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let account = <UInt160 as Serializable>::deserialize(reader)?;
        let scope_byte = reader.read_u8()?;
        let scopes = WitnessScope::from_byte(scope_byte)
            .map_err(|e| IoError::InvalidFormat(e.to_string()))?;

        let allowed_contracts = if scopes.contains(WitnessScope::CUSTOM_CONTRACTS) {
            helper::deserialize_array(reader, MAX_SUBITEMS)?
        } else {
            Vec::new()
        };
        let allowed_groups = if scopes.contains(WitnessScope::CUSTOM_GROUPS) {
            let count = reader.read_var_int(MAX_SUBITEMS as u64)? as usize;
            let mut groups = Vec::with_capacity(count);
            for _ in 0..count {
                groups.push(reader.read_bytes(33)?);
            }
            groups
        } else {
            Vec::new()
        };
        let rules = if scopes.contains(WitnessScope::WITNESS_RULES) {
            helper::deserialize_array(reader, MAX_SUBITEMS)?
        } else {
            Vec::new()
        };

        Ok(Self {
            account,
            scopes,
            allowed_contracts,
            allowed_groups,
            rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    #[test]
    fn test_wire_roundtrip_plain() {
        let signer = Signer::called_by_entry(UInt160::from_script(b"account"));
        let bytes = signer.to_array();
        assert_eq!(bytes.len(), signer.size());
        assert_eq!(Signer::from_array(&bytes).unwrap(), signer);
    }

    #[test]
    fn test_wire_roundtrip_with_allow_lists() {
        let mut signer = Signer::new(
            UInt160::from_script(b"account"),
            WitnessScope::CUSTOM_CONTRACTS | WitnessScope::CUSTOM_GROUPS,
        );
        signer.allowed_contracts = vec![UInt160::from_script(b"a"), UInt160::from_script(b"b")];
        signer.allowed_groups = vec![vec![0x02; 33]];
        let bytes = signer.to_array();
        assert_eq!(bytes.len(), signer.size());
        assert_eq!(Signer::from_array(&bytes).unwrap(), signer);
    }

    #[test]
    fn test_scope_lists_not_written_when_flag_absent() {
        let mut signer = Signer::global(UInt160::ZERO);
        signer.allowed_contracts = vec![UInt160::from_script(b"ignored")];
        // Global scope serializes to exactly account + scope byte.
        assert_eq!(signer.to_array().len(), 21);
    }
}
