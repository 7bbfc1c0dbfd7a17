// Copyright (C) 2015-2025 The Neo Project.
//
// manifest.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Contract manifests: ABI, groups, permissions and trusts.

use crate::error::{ContractError, ContractResult};
use neo3_core::UInt160;
use serde::{Deserialize, Serialize};

/// Maximum serialized manifest length.
pub const MAX_MANIFEST_SIZE: usize = 0xFFFF;

/// Parameter and return types of the contract ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractParameterType {
    Any,
    Boolean,
    Integer,
    ByteArray,
    String,
    Hash160,
    Hash256,
    PublicKey,
    Signature,
    Array,
    Map,
    InteropInterface,
    Void,
}

/// One ABI method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: ContractParameterType,
}

/// One ABI method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMethod {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ContractParameter>,
    pub return_type: ContractParameterType,
    /// Entry offset into the NEF script.
    pub offset: u32,
    /// Safe methods may be called without write permissions.
    #[serde(default)]
    pub safe: bool,
}

/// One ABI event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ContractParameter>,
}

/// The contract ABI: its callable methods and declared events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAbi {
    #[serde(default)]
    pub methods: Vec<ContractMethod>,
    #[serde(default)]
    pub events: Vec<ContractEvent>,
}

impl ContractAbi {
    /// Finds a method by name and parameter count.
    pub fn method(&self, name: &str, parameters: usize) -> Option<&ContractMethod> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.parameters.len() == parameters)
    }

    /// Finds a method by name alone (first match).
    pub fn method_by_name(&self, name: &str) -> Option<&ContractMethod> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A manifest group: a public key vouching for the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractGroup {
    /// Compressed public key, hex.
    pub pubkey: String,
    /// Signature of the contract hash by that key, base64.
    pub signature: String,
}

/// The contract (or group of contracts) a permission applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionContract {
    /// `"*"`: any contract.
    Wildcard(String),
    /// A specific contract hash or group key, hex.
    Specific(UInt160),
}

/// One permission: which contract(s) and which methods may be called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPermission {
    pub contract: PermissionContract,
    /// Either the wildcard `"*"` (serialized as a string) or a list.
    pub methods: PermissionMethods,
}

/// Methods covered by a permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionMethods {
    Wildcard(String),
    List(Vec<String>),
}

impl ContractPermission {
    /// The permission allowing everything.
    pub fn default_wildcard() -> Self {
        Self {
            contract: PermissionContract::Wildcard("*".into()),
            methods: PermissionMethods::Wildcard("*".into()),
        }
    }

    /// Whether this permission covers calling `method` on `target`.
    pub fn allows(&self, target: &UInt160, method: &str) -> bool {
        let contract_ok = match &self.contract {
            PermissionContract::Wildcard(text) => text == "*",
            PermissionContract::Specific(hash) => hash == target,
        };
        if !contract_ok {
            return false;
        }
        match &self.methods {
            PermissionMethods::Wildcard(text) => text == "*",
            PermissionMethods::List(names) => names.iter().any(|n| n == method),
        }
    }
}

/// Trusts: contracts whose calls this contract accepts without prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContractTrusts {
    Wildcard(String),
    List(Vec<UInt160>),
}

impl Default for ContractTrusts {
    fn default() -> Self {
        ContractTrusts::List(Vec::new())
    }
}

/// The deployed contract's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractManifest {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<ContractGroup>,
    #[serde(default)]
    pub supported_standards: Vec<String>,
    pub abi: ContractAbi,
    #[serde(default)]
    pub permissions: Vec<ContractPermission>,
    #[serde(default)]
    pub trusts: ContractTrusts,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

impl ContractManifest {
    /// A minimal manifest with a wildcard permission set.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            supported_standards: Vec::new(),
            abi: ContractAbi::default(),
            permissions: vec![ContractPermission::default_wildcard()],
            trusts: ContractTrusts::default(),
            extra: None,
        }
    }

    /// Parses and validates a JSON manifest.
    pub fn parse(data: &[u8]) -> ContractResult<Self> {
        if data.len() > MAX_MANIFEST_SIZE {
            return Err(ContractError::InvalidArgument(format!(
                "manifest of {} bytes exceeds the limit",
                data.len()
            )));
        }
        let manifest: ContractManifest = serde_json::from_slice(data)
            .map_err(|e| ContractError::InvalidArgument(format!("invalid manifest: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serializes to canonical JSON bytes.
    pub fn to_bytes(&self) -> ContractResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ContractError::Serialization(e.to_string()))
    }

    /// Structural checks independent of chain state.
    pub fn validate(&self) -> ContractResult<()> {
        if self.name.is_empty() {
            return Err(ContractError::InvalidArgument("manifest has no name".into()));
        }
        let mut names = std::collections::HashSet::new();
        for method in &self.abi.methods {
            if method.name.is_empty() {
                return Err(ContractError::InvalidArgument("unnamed ABI method".into()));
            }
            if !names.insert((method.name.clone(), method.parameters.len())) {
                return Err(ContractError::InvalidArgument(format!(
                    "duplicate ABI method {}",
                    method.name
                )));
            }
        }
        Ok(())
    }

    /// Whether this manifest permits calling `method` on `target`.
    pub fn can_call(&self, target: &UInt160, method: &str) -> bool {
        self.permissions.iter().any(|p| p.allows(target, method))
    }

    /// Whether the manifest's groups include `pubkey` (hex form).
    pub fn has_group(&self, pubkey_hex: &str) -> bool {
        self.groups.iter().any(|g| g.pubkey == pubkey_hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ContractManifest {
        let mut manifest = ContractManifest::new("token");
        manifest.abi.methods.push(ContractMethod {
            name: "transfer".into(),
            parameters: vec![
                ContractParameter {
                    name: "from".into(),
                    parameter_type: ContractParameterType::Hash160,
                },
                ContractParameter {
                    name: "to".into(),
                    parameter_type: ContractParameterType::Hash160,
                },
            ],
            return_type: ContractParameterType::Boolean,
            offset: 0,
            safe: false,
        });
        manifest
    }

    #[test]
    fn test_json_roundtrip() {
        let manifest = sample();
        let bytes = manifest.to_bytes().unwrap();
        assert_eq!(ContractManifest::parse(&bytes).unwrap(), manifest);
    }

    #[test]
    fn test_abi_lookup_by_arity() {
        let manifest = sample();
        assert!(manifest.abi.method("transfer", 2).is_some());
        assert!(manifest.abi.method("transfer", 3).is_none());
    }

    #[test]
    fn test_duplicate_methods_rejected() {
        let mut manifest = sample();
        let duplicate = manifest.abi.methods[0].clone();
        manifest.abi.methods.push(duplicate);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_wildcard_permission() {
        let manifest = sample();
        let anyone = UInt160::from_script(b"x");
        assert!(manifest.can_call(&anyone, "anything"));
    }

    #[test]
    fn test_specific_permission() {
        let target = UInt160::from_script(b"target");
        let other = UInt160::from_script(b"other");
        let mut manifest = sample();
        manifest.permissions = vec![ContractPermission {
            contract: PermissionContract::Specific(target),
            methods: PermissionMethods::List(vec!["transfer".into()]),
        }];
        assert!(manifest.can_call(&target, "transfer"));
        assert!(!manifest.can_call(&target, "mint"));
        assert!(!manifest.can_call(&other, "transfer"));
    }
}
