// Copyright (C) 2015-2025 The Neo Project.
//
// witness_scope.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Witness scope flags restricting where a signer's authority applies.

use crate::{CoreError, CoreResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Restrictions on which contracts may claim a signer's witness.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WitnessScope: u8 {
        /// Valid only for the transaction's own verification.
        const NONE = 0x00;
        /// Valid when the calling contract is the transaction entry script.
        const CALLED_BY_ENTRY = 0x01;
        /// Valid for the contracts in the signer's allow-list.
        const CUSTOM_CONTRACTS = 0x10;
        /// Valid for contracts in the signer's allowed manifest groups.
        const CUSTOM_GROUPS = 0x20;
        /// Valid where the signer's witness rules allow.
        const WITNESS_RULES = 0x40;
        /// Valid everywhere. Mutually exclusive with every other flag.
        const GLOBAL = 0x80;
    }
}

impl WitnessScope {
    /// Decodes a scope byte, rejecting undefined bits and an illegal
    /// combination of `GLOBAL` with any other flag.
    pub fn from_byte(value: u8) -> CoreResult<Self> {
        let scope = WitnessScope::from_bits(value)
            .ok_or_else(|| CoreError::InvalidFormat(format!("invalid witness scope 0x{value:02x}")))?;
        if scope.contains(WitnessScope::GLOBAL) && scope != WitnessScope::GLOBAL {
            return Err(CoreError::InvalidFormat(
                "global scope cannot be combined with other scopes".into(),
            ));
        }
        Ok(scope)
    }

    /// The scope byte.
    pub fn to_byte(self) -> u8 {
        self.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let scope = WitnessScope::CALLED_BY_ENTRY | WitnessScope::CUSTOM_CONTRACTS;
        assert_eq!(WitnessScope::from_byte(scope.to_byte()).unwrap(), scope);
    }

    #[test]
    fn test_global_is_exclusive() {
        assert!(WitnessScope::from_byte(0x80).is_ok());
        assert!(WitnessScope::from_byte(0x81).is_err());
    }

    #[test]
    fn test_undefined_bits_rejected() {
        assert!(WitnessScope::from_byte(0x02).is_err());
    }
}
