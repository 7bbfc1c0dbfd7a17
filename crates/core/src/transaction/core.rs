// Copyright (C) 2015-2025 The Neo Project.
//
// core.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The transaction itself: wire layout, hashing and structural checks.

use crate::transaction::TransactionAttribute;
use crate::{CoreError, CoreResult, Signer, UInt160, UInt256, Witness};
use neo3_config::{MAX_SCRIPT_SIZE, MAX_TRANSACTION_ATTRIBUTES, MAX_TRANSACTION_SIGNERS};
use neo3_io::{helper, BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fixed-width prefix of the wire layout:
/// version 1 + nonce 4 + system fee 8 + network fee 8 + valid-until 4.
pub const HEADER_SIZE: usize = 25;

/// A Neo N3 transaction.
///
/// The hash covers everything except the witnesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u8,
    pub nonce: u32,
    /// Fee paid for VM execution, in datoshi. Never negative.
    pub system_fee: i64,
    /// Fee paid for size and witness verification, in datoshi.
    pub network_fee: i64,
    /// Last block index at which this transaction may be included.
    pub valid_until_block: u32,
    /// The authorizing accounts; the first signer is the sender.
    pub signers: Vec<Signer>,
    pub attributes: Vec<TransactionAttribute>,
    pub script: Vec<u8>,
    /// One witness per signer, in signer order.
    pub witnesses: Vec<Witness>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: 0,
            nonce: 0,
            system_fee: 0,
            network_fee: 0,
            valid_until_block: 0,
            signers: Vec::new(),
            attributes: Vec::new(),
            script: Vec::new(),
            witnesses: Vec::new(),
        }
    }
}

impl Transaction {
    /// Serializes the portion covered by the hash (everything but the
    /// witnesses).
    pub fn serialize_unsigned(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.version)?;
        writer.write_u32(self.nonce)?;
        writer.write_i64(self.system_fee)?;
        writer.write_i64(self.network_fee)?;
        writer.write_u32(self.valid_until_block)?;
        helper::serialize_array(&self.signers, writer)?;
        helper::serialize_array(&self.attributes, writer)?;
        writer.write_var_bytes(&self.script)
    }

    /// The unsigned wire bytes.
    pub fn unsigned_data(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.size());
        let _ = self.serialize_unsigned(&mut writer);
        writer.into_bytes()
    }

    /// The transaction hash: double-sha256 of the unsigned bytes.
    pub fn hash(&self) -> UInt256 {
        UInt256::from_data(&self.unsigned_data())
    }

    /// The bytes a signer actually signs: network magic then the hash.
    pub fn sign_data(&self, network: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity(36);
        data.extend_from_slice(&network.to_le_bytes());
        data.extend_from_slice(self.hash().as_bytes());
        data
    }

    /// The fee-paying account.
    pub fn sender(&self) -> UInt160 {
        self.signers.first().map(|s| s.account).unwrap_or_default()
    }

    /// The fee per byte this transaction offers.
    pub fn fee_per_byte(&self) -> i64 {
        let size = self.size() as i64;
        if size == 0 {
            0
        } else {
            self.network_fee / size
        }
    }

    /// Whether the transaction carries the high-priority attribute.
    pub fn is_high_priority(&self) -> bool {
        self.attributes
            .iter()
            .any(|a| matches!(a, TransactionAttribute::HighPriority))
    }

    /// Hashes this transaction declares conflicts with.
    pub fn conflict_hashes(&self) -> impl Iterator<Item = UInt256> + '_ {
        self.attributes.iter().filter_map(|a| match a {
            TransactionAttribute::Conflicts { hash } => Some(*hash),
            _ => None,
        })
    }

    /// The first attribute of the requested kind, if any.
    pub fn attribute<F, T>(&self, select: F) -> Option<T>
    where
        F: FnMut(&TransactionAttribute) -> Option<T>,
    {
        self.attributes.iter().filter_map(select).next()
    }

    /// Structural validation independent of chain state.
    pub fn check_structure(&self) -> CoreResult<()> {
        if self.version != 0 {
            return Err(CoreError::InvalidData(format!(
                "unsupported transaction version {}",
                self.version
            )));
        }
        if self.system_fee < 0 {
            return Err(CoreError::InvalidData("negative system fee".into()));
        }
        if self.network_fee < 0 {
            return Err(CoreError::InvalidData("negative network fee".into()));
        }
        if self.script.is_empty() || self.script.len() > MAX_SCRIPT_SIZE {
            return Err(CoreError::InvalidData(format!(
                "script length {} out of range",
                self.script.len()
            )));
        }
        if self.signers.is_empty() || self.signers.len() > MAX_TRANSACTION_SIGNERS {
            return Err(CoreError::InvalidData(format!(
                "signer count {} out of range",
                self.signers.len()
            )));
        }
        let mut accounts = HashSet::with_capacity(self.signers.len());
        for signer in &self.signers {
            if !accounts.insert(signer.account) {
                return Err(CoreError::InvalidData(format!(
                    "duplicate signer {}",
                    signer.account
                )));
            }
        }
        if self.attributes.len() > MAX_TRANSACTION_ATTRIBUTES {
            return Err(CoreError::InvalidData("too many attributes".into()));
        }
        let mut seen_types = HashSet::new();
        for attribute in &self.attributes {
            if !attribute.allow_multiple() && !seen_types.insert(attribute.attribute_type()) {
                return Err(CoreError::InvalidData(format!(
                    "duplicate attribute {:?}",
                    attribute.attribute_type()
                )));
            }
        }
        if self.witnesses.len() != self.signers.len() {
            return Err(CoreError::InvalidData(format!(
                "{} witnesses for {} signers",
                self.witnesses.len(),
                self.signers.len()
            )));
        }
        Ok(())
    }
}

impl Serializable for Transaction {
    fn size(&self) -> usize {
        HEADER_SIZE
            + helper::array_size(&self.signers)
            + helper::array_size(&self.attributes)
            + neo3_io::var_bytes_size(self.script.len())
            + helper::array_size(&self.witnesses)
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_unsigned(writer)?;
        helper::serialize_array(&self.witnesses, writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let version = reader.read_u8()?;
        if version != 0 {
            return Err(IoError::InvalidFormat(format!(
                "unsupported transaction version {version}"
            )));
        }
        let nonce = reader.read_u32()?;
        let system_fee = reader.read_i64()?;
        if system_fee < 0 {
            return Err(IoError::InvalidFormat("negative system fee".into()));
        }
        let network_fee = reader.read_i64()?;
        if network_fee < 0 {
            return Err(IoError::InvalidFormat("negative network fee".into()));
        }
        let valid_until_block = reader.read_u32()?;
        let signers: Vec<Signer> = helper::deserialize_array(reader, MAX_TRANSACTION_SIGNERS)?;
        if signers.is_empty() {
            return Err(IoError::InvalidFormat("transaction has no signers".into()));
        }
        let attributes = helper::deserialize_array(reader, MAX_TRANSACTION_ATTRIBUTES)?;
        let script = reader.read_var_bytes(MAX_SCRIPT_SIZE)?;
        if script.is_empty() {
            return Err(IoError::InvalidFormat("transaction has no script".into()));
        }
        let witnesses: Vec<Witness> = helper::deserialize_array(reader, signers.len())?;
        Ok(Self {
            version,
            nonce,
            system_fee,
            network_fee,
            valid_until_block,
            signers,
            attributes,
            script,
            witnesses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WitnessScope;
    use neo3_io::SerializableExt;

    fn sample_transaction() -> Transaction {
        Transaction {
            version: 0,
            nonce: 0x1234_5678,
            system_fee: 100,
            network_fee: 200,
            valid_until_block: 1000,
            signers: vec![Signer::called_by_entry(UInt160::from_script(b"sender"))],
            attributes: vec![TransactionAttribute::HighPriority],
            script: vec![0x40],
            witnesses: vec![Witness::new(vec![0x01], vec![0x02])],
        }
    }

    #[test]
    fn test_wire_roundtrip() {
        let tx = sample_transaction();
        let bytes = tx.to_array();
        assert_eq!(bytes.len(), tx.size());
        assert_eq!(Transaction::from_array(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_hash_excludes_witnesses() {
        let tx = sample_transaction();
        let mut modified = tx.clone();
        modified.witnesses = vec![Witness::new(vec![0xFF], vec![0xEE])];
        assert_eq!(tx.hash(), modified.hash());

        let mut bumped = tx.clone();
        bumped.nonce += 1;
        assert_ne!(tx.hash(), bumped.hash());
    }

    #[test]
    fn test_sign_data_is_network_scoped() {
        let tx = sample_transaction();
        assert_ne!(tx.sign_data(0x334F_454E), tx.sign_data(0x3254_334E));
        assert_eq!(tx.sign_data(5)[..4], 5u32.to_le_bytes());
    }

    #[test]
    fn test_structure_rejects_duplicate_signers() {
        let mut tx = sample_transaction();
        tx.signers = vec![
            Signer::new(UInt160::ZERO, WitnessScope::NONE),
            Signer::new(UInt160::ZERO, WitnessScope::GLOBAL),
        ];
        tx.witnesses = vec![Witness::empty(), Witness::empty()];
        assert!(tx.check_structure().is_err());
    }

    #[test]
    fn test_structure_rejects_duplicate_unique_attribute() {
        let mut tx = sample_transaction();
        tx.attributes = vec![
            TransactionAttribute::HighPriority,
            TransactionAttribute::HighPriority,
        ];
        assert!(tx.check_structure().is_err());

        tx.attributes = vec![
            TransactionAttribute::Conflicts {
                hash: UInt256::from_data(b"a"),
            },
            TransactionAttribute::Conflicts {
                hash: UInt256::from_data(b"b"),
            },
        ];
        assert!(tx.check_structure().is_ok());
    }

    #[test]
    fn test_deserialize_rejects_negative_fees() {
        let mut tx = sample_transaction();
        tx.system_fee = -1;
        let bytes = tx.to_array();
        assert!(Transaction::from_array(&bytes).is_err());
    }
}
