// Copyright (C) 2015-2025 The Neo Project.
//
// witness_rule.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Witness rules: a small condition tree evaluated per contract call to
//! decide whether a signer's witness may be claimed.

use crate::{CoreError, UInt160};
use neo3_io::{BinaryWriter, IoError, IoResult, MemoryReader, Serializable};
use serde::{Deserialize, Serialize};

/// Maximum nesting depth of composite conditions.
pub const MAX_CONDITION_NESTING: usize = 2;
/// Maximum sub-conditions of an And/Or node.
pub const MAX_SUBITEMS: usize = 16;

/// Whether a matching rule admits or rejects the witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum WitnessRuleAction {
    Deny = 0,
    Allow = 1,
}

/// A single rule: an action applied when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessRule {
    pub action: WitnessRuleAction,
    pub condition: WitnessCondition,
}

/// The witness rule condition tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WitnessCondition {
    /// Constant true or false.
    Boolean(bool),
    /// Negation of the inner condition.
    Not(Box<WitnessCondition>),
    /// All sub-conditions must hold.
    And(Vec<WitnessCondition>),
    /// At least one sub-condition must hold.
    Or(Vec<WitnessCondition>),
    /// The current script hash equals the given hash.
    ScriptHash(UInt160),
    /// The current contract belongs to the given manifest group
    /// (compressed public key bytes).
    Group(Vec<u8>),
    /// The current context is the transaction entry script.
    CalledByEntry,
    /// The calling contract's hash equals the given hash.
    CalledByContract(UInt160),
    /// The calling contract belongs to the given manifest group.
    CalledByGroup(Vec<u8>),
}

impl WitnessCondition {
    const TYPE_BOOLEAN: u8 = 0x00;
    const TYPE_NOT: u8 = 0x01;
    const TYPE_AND: u8 = 0x02;
    const TYPE_OR: u8 = 0x03;
    const TYPE_SCRIPT_HASH: u8 = 0x18;
    const TYPE_GROUP: u8 = 0x19;
    const TYPE_CALLED_BY_ENTRY: u8 = 0x20;
    const TYPE_CALLED_BY_CONTRACT: u8 = 0x28;
    const TYPE_CALLED_BY_GROUP: u8 = 0x29;

    /// The wire type byte for this condition.
    pub fn condition_type(&self) -> u8 {
        match self {
            WitnessCondition::Boolean(_) => Self::TYPE_BOOLEAN,
            WitnessCondition::Not(_) => Self::TYPE_NOT,
            WitnessCondition::And(_) => Self::TYPE_AND,
            WitnessCondition::Or(_) => Self::TYPE_OR,
            WitnessCondition::ScriptHash(_) => Self::TYPE_SCRIPT_HASH,
            WitnessCondition::Group(_) => Self::TYPE_GROUP,
            WitnessCondition::CalledByEntry => Self::TYPE_CALLED_BY_ENTRY,
            WitnessCondition::CalledByContract(_) => Self::TYPE_CALLED_BY_CONTRACT,
            WitnessCondition::CalledByGroup(_) => Self::TYPE_CALLED_BY_GROUP,
        }
    }

    fn serialize_inner(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.condition_type())?;
        match self {
            WitnessCondition::Boolean(value) => writer.write_bool(*value),
            WitnessCondition::Not(inner) => inner.serialize_inner(writer),
            WitnessCondition::And(items) | WitnessCondition::Or(items) => {
                writer.write_var_int(items.len() as u64)?;
                for item in items {
                    item.serialize_inner(writer)?;
                }
                Ok(())
            }
            WitnessCondition::ScriptHash(hash) | WitnessCondition::CalledByContract(hash) => {
                hash.serialize(writer)
            }
            WitnessCondition::Group(key) | WitnessCondition::CalledByGroup(key) => {
                writer.write_bytes(key)
            }
            WitnessCondition::CalledByEntry => Ok(()),
        }
    }

    fn deserialize_inner(reader: &mut MemoryReader<'_>, depth: usize) -> IoResult<Self> {
        let condition_type = reader.read_u8()?;
        let composite_allowed = depth < MAX_CONDITION_NESTING;
        match condition_type {
            Self::TYPE_BOOLEAN => Ok(WitnessCondition::Boolean(reader.read_bool()?)),
            Self::TYPE_NOT if composite_allowed => Ok(WitnessCondition::Not(Box::new(
                Self::deserialize_inner(reader, depth + 1)?,
            ))),
            Self::TYPE_AND | Self::TYPE_OR if composite_allowed => {
                let count = reader.read_var_int(MAX_SUBITEMS as u64)? as usize;
                if count == 0 {
                    return Err(IoError::InvalidFormat("empty composite condition".into()));
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(Self::deserialize_inner(reader, depth + 1)?);
                }
                if condition_type == Self::TYPE_AND {
                    Ok(WitnessCondition::And(items))
                } else {
                    Ok(WitnessCondition::Or(items))
                }
            }
            Self::TYPE_SCRIPT_HASH => Ok(WitnessCondition::ScriptHash(UInt160::deserialize(reader)?)),
            Self::TYPE_GROUP => Ok(WitnessCondition::Group(reader.read_bytes(33)?)),
            Self::TYPE_CALLED_BY_ENTRY => Ok(WitnessCondition::CalledByEntry),
            Self::TYPE_CALLED_BY_CONTRACT => Ok(WitnessCondition::CalledByContract(
                UInt160::deserialize(reader)?,
            )),
            Self::TYPE_CALLED_BY_GROUP => Ok(WitnessCondition::CalledByGroup(reader.read_bytes(33)?)),
            other => Err(IoError::InvalidFormat(format!(
                "invalid witness condition type 0x{other:02x} at depth {depth}"
            ))),
        }
    }

    /// Evaluates the condition against a call-context oracle.
    ///
    /// The oracle answers the context questions (current/calling script
    /// hash, group membership, entry status) so the tree itself stays free
    /// of engine types.
    pub fn evaluate<C: WitnessContext>(&self, context: &C) -> bool {
        match self {
            WitnessCondition::Boolean(value) => *value,
            WitnessCondition::Not(inner) => !inner.evaluate(context),
            WitnessCondition::And(items) => items.iter().all(|c| c.evaluate(context)),
            WitnessCondition::Or(items) => items.iter().any(|c| c.evaluate(context)),
            WitnessCondition::ScriptHash(hash) => context.current_script_hash() == *hash,
            WitnessCondition::Group(key) => context.current_has_group(key),
            WitnessCondition::CalledByEntry => context.is_called_by_entry(),
            WitnessCondition::CalledByContract(hash) => context.calling_script_hash() == Some(*hash),
            WitnessCondition::CalledByGroup(key) => context.calling_has_group(key),
        }
    }
}

/// Answers the call-context questions a witness condition may ask.
pub trait WitnessContext {
    fn current_script_hash(&self) -> UInt160;
    fn calling_script_hash(&self) -> Option<UInt160>;
    fn is_called_by_entry(&self) -> bool;
    fn current_has_group(&self, key: &[u8]) -> bool;
    fn calling_has_group(&self, key: &[u8]) -> bool;
}

impl Serializable for WitnessCondition {
    fn size(&self) -> usize {
        1 + match self {
            WitnessCondition::Boolean(_) => 1,
            WitnessCondition::Not(inner) => inner.size(),
            WitnessCondition::And(items) | WitnessCondition::Or(items) => {
                neo3_io::var_size(items.len() as u64)
                    + items.iter().map(Serializable::size).sum::<usize>()
            }
            WitnessCondition::ScriptHash(_) | WitnessCondition::CalledByContract(_) => 20,
            WitnessCondition::Group(key) | WitnessCondition::CalledByGroup(key) => key.len(),
            WitnessCondition::CalledByEntry => 0,
        }
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        self.serialize_inner(writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        Self::deserialize_inner(reader, 0)
    }
}

impl Serializable for WitnessRule {
    fn size(&self) -> usize {
        1 + self.condition.size()
    }

    fn serialize(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_u8(self.action as u8)?;
        self.condition.serialize(writer)
    }

    fn deserialize(reader: &mut MemoryReader<'_>) -> IoResult<Self> {
        let action = match reader.read_u8()? {
            0 => WitnessRuleAction::Deny,
            1 => WitnessRuleAction::Allow,
            other => {
                return Err(IoError::InvalidFormat(format!(
                    "invalid witness rule action 0x{other:02x}"
                )))
            }
        };
        Ok(Self {
            action,
            condition: WitnessCondition::deserialize(reader)?,
        })
    }
}

impl TryFrom<u8> for WitnessRuleAction {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WitnessRuleAction::Deny),
            1 => Ok(WitnessRuleAction::Allow),
            other => Err(CoreError::InvalidFormat(format!(
                "invalid witness rule action {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_io::SerializableExt;

    struct FakeContext {
        current: UInt160,
        calling: Option<UInt160>,
        entry: bool,
    }

    impl WitnessContext for FakeContext {
        fn current_script_hash(&self) -> UInt160 {
            self.current
        }
        fn calling_script_hash(&self) -> Option<UInt160> {
            self.calling
        }
        fn is_called_by_entry(&self) -> bool {
            self.entry
        }
        fn current_has_group(&self, _key: &[u8]) -> bool {
            false
        }
        fn calling_has_group(&self, _key: &[u8]) -> bool {
            false
        }
    }

    #[test]
    fn test_wire_roundtrip() {
        let rule = WitnessRule {
            action: WitnessRuleAction::Allow,
            condition: WitnessCondition::And(vec![
                WitnessCondition::CalledByEntry,
                WitnessCondition::Not(Box::new(WitnessCondition::ScriptHash(
                    UInt160::from_script(b"x"),
                ))),
            ]),
        };
        let bytes = rule.to_array();
        assert_eq!(bytes.len(), rule.size());
        assert_eq!(WitnessRule::from_array(&bytes).unwrap(), rule);
    }

    #[test]
    fn test_nesting_depth_enforced() {
        // Not(Not(Not(true))) exceeds the depth-2 composite limit.
        let rule = WitnessRule {
            action: WitnessRuleAction::Allow,
            condition: WitnessCondition::Not(Box::new(WitnessCondition::Not(Box::new(
                WitnessCondition::Not(Box::new(WitnessCondition::Boolean(true))),
            )))),
        };
        assert!(WitnessRule::from_array(&rule.to_array()).is_err());
    }

    #[test]
    fn test_evaluate() {
        let target = UInt160::from_script(b"contract");
        let context = FakeContext {
            current: target,
            calling: None,
            entry: true,
        };
        let condition = WitnessCondition::And(vec![
            WitnessCondition::CalledByEntry,
            WitnessCondition::ScriptHash(target),
        ]);
        assert!(condition.evaluate(&context));
        let negated = WitnessCondition::Not(Box::new(condition));
        assert!(!negated.evaluate(&context));
    }
}
