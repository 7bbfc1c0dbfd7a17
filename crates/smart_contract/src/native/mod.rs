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

//! Native contracts: host-implemented contracts at fixed hashes and
//! negative ids, invoked through the ordinary contract-call path.
//!
//! Each native's script is a run of 7-byte blocks, one per method:
//! `PUSH0 ‖ SYSCALL System.Contract.CallNative ‖ RET`. The ABI points at
//! the blocks, and `CallNative` maps the instruction pointer back to the
//! method, which keeps call-flag propagation, gas charging and
//! notifications uniform with deployed contracts.

pub mod contract_management;
pub mod crypto_lib;
pub mod fungible_token;
pub mod gas_token;
pub mod ledger_contract;
pub mod neo_token;
pub mod notary;
pub mod oracle_contract;
pub mod policy_contract;
pub mod role_management;
pub mod std_lib;

use crate::application_engine::HostContext;
use crate::contract_state::{get_contract_hash, ContractState, NefFile};
use crate::error::{ContractError, ContractResult};
use crate::interop;
use crate::manifest::{
    ContractManifest, ContractMethod, ContractParameter, ContractParameterType,
};
use neo3_config::{Hardfork, ProtocolSettings};
use neo3_core::UInt160;
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine, OpCode, ScriptBuilder};
use std::collections::HashMap;
use std::sync::Arc;

pub const CONTRACT_MANAGEMENT_ID: i32 = -1;
pub const STD_LIB_ID: i32 = -2;
pub const CRYPTO_LIB_ID: i32 = -3;
pub const LEDGER_ID: i32 = -4;
pub const NEO_ID: i32 = -5;
pub const GAS_ID: i32 = -6;
pub const POLICY_ID: i32 = -7;
pub const ROLE_MANAGEMENT_ID: i32 = -8;
pub const ORACLE_ID: i32 = -9;
pub const NOTARY_ID: i32 = -10;

// Policy storage prefixes, read by the engine at startup.
pub const PREFIX_FEE_PER_BYTE: u8 = 10;
pub const PREFIX_BLOCKED_ACCOUNT: u8 = 15;
pub const PREFIX_EXEC_FEE_FACTOR: u8 = 18;
pub const PREFIX_STORAGE_PRICE: u8 = 19;

/// Metadata for one native method.
pub struct NativeMethod {
    pub name: &'static str,
    pub parameters: &'static [&'static str],
    pub has_return: bool,
    /// Base computation fee, scaled by the execution-fee factor.
    pub cpu_fee: i64,
    /// Base storage fee, scaled by the storage price.
    pub storage_fee: i64,
    pub required_flags: CallFlags,
    pub safe: bool,
}

impl NativeMethod {
    pub const fn new(
        name: &'static str,
        parameters: &'static [&'static str],
        has_return: bool,
        cpu_fee: i64,
        storage_fee: i64,
        required_flags: CallFlags,
        safe: bool,
    ) -> Self {
        Self {
            name,
            parameters,
            has_return,
            cpu_fee,
            storage_fee,
            required_flags,
            safe,
        }
    }
}

/// A contract implemented by the host.
pub trait NativeContract: Send + Sync {
    fn name(&self) -> &'static str;
    fn id(&self) -> i32;
    fn hash(&self) -> UInt160;
    fn methods(&self) -> &[NativeMethod];

    /// Runs `method` with popped `args`; `Some` return values are pushed
    /// by the registry.
    fn invoke(
        &self,
        method: &str,
        args: Vec<StackItem>,
        host: &mut HostContext,
        engine: &mut ExecutionEngine,
    ) -> ContractResult<Option<StackItem>>;

    /// Seeds genesis state.
    fn initialize(&self, _host: &mut HostContext) -> ContractResult<()> {
        Ok(())
    }

    /// Runs before a block's transactions.
    fn on_persist(&self, _host: &mut HostContext) -> ContractResult<()> {
        Ok(())
    }

    /// Runs after a block's transactions.
    fn post_persist(&self, _host: &mut HostContext) -> ContractResult<()> {
        Ok(())
    }
}

/// The fixed hash for a native `name`.
pub fn native_hash(name: &str) -> UInt160 {
    get_contract_hash(&UInt160::ZERO, 0, name)
}

/// Bytes per method block in a native script.
const METHOD_BLOCK: usize = 7;

fn build_native_script(method_count: usize) -> Vec<u8> {
    let call_native = interop::method_hash("System.Contract.CallNative");
    let mut builder = ScriptBuilder::new();
    for _ in 0..method_count {
        builder.emit(OpCode::PUSH0);
        builder.emit_syscall(call_native);
        builder.emit(OpCode::RET);
    }
    builder.into_bytes()
}

fn build_native_state(contract: &dyn NativeContract) -> ContractResult<ContractState> {
    let script = build_native_script(contract.methods().len());
    let nef = NefFile::new("neo-core-v3.0", script)?;
    let mut manifest = ContractManifest::new(contract.name());
    for (index, method) in contract.methods().iter().enumerate() {
        manifest.abi.methods.push(ContractMethod {
            name: method.name.into(),
            parameters: method
                .parameters
                .iter()
                .map(|name| ContractParameter {
                    name: (*name).into(),
                    parameter_type: ContractParameterType::Any,
                })
                .collect(),
            return_type: if method.has_return {
                ContractParameterType::Any
            } else {
                ContractParameterType::Void
            },
            offset: (index * METHOD_BLOCK) as u32,
            safe: method.safe,
        });
    }
    Ok(ContractState {
        id: contract.id(),
        update_counter: 0,
        hash: contract.hash(),
        nef,
        manifest,
    })
}

/// All native contracts of a network, in persist order.
pub struct NativeRegistry {
    contracts: Vec<Arc<dyn NativeContract>>,
    states: HashMap<UInt160, ContractState>,
}

impl NativeRegistry {
    /// Builds the registry for `settings`; Notary is registered only when
    /// the Echidna hardfork is configured.
    pub fn new(settings: &ProtocolSettings) -> Self {
        let mut contracts: Vec<Arc<dyn NativeContract>> = vec![
            Arc::new(contract_management::ContractManagement::new()),
            Arc::new(std_lib::StdLib::new()),
            Arc::new(crypto_lib::CryptoLib::new()),
            Arc::new(ledger_contract::LedgerContract::new()),
            Arc::new(neo_token::NeoToken::new()),
            Arc::new(gas_token::GasToken::new()),
            Arc::new(policy_contract::PolicyContract::new()),
            Arc::new(role_management::RoleManagement::new()),
            Arc::new(oracle_contract::OracleContract::new()),
        ];
        if settings.hardforks.contains_key(&Hardfork::Echidna) {
            contracts.push(Arc::new(notary::Notary::new()));
        }
        let states = contracts
            .iter()
            .filter_map(|c| {
                build_native_state(c.as_ref())
                    .ok()
                    .map(|state| (c.hash(), state))
            })
            .collect();
        Self { contracts, states }
    }

    /// Natives in persist (declaration) order.
    pub fn contracts(&self) -> &[Arc<dyn NativeContract>] {
        &self.contracts
    }

    /// A native by script hash.
    pub fn by_hash(&self, hash: &UInt160) -> Option<&Arc<dyn NativeContract>> {
        self.contracts.iter().find(|c| c.hash() == *hash)
    }

    /// A native by contract id.
    pub fn by_id(&self, id: i32) -> Option<&Arc<dyn NativeContract>> {
        self.contracts.iter().find(|c| c.id() == id)
    }

    /// The synthesized contract state for a native hash.
    pub fn contract_state(&self, hash: &UInt160) -> Option<&ContractState> {
        self.states.get(hash)
    }

    /// Whether `hash` belongs to a native contract.
    pub fn is_native(&self, hash: &UInt160) -> bool {
        self.states.contains_key(hash)
    }

    /// Dispatches `System.Contract.CallNative` for the current context.
    pub fn invoke_current(
        &self,
        host: &mut HostContext,
        engine: &mut ExecutionEngine,
    ) -> ContractResult<()> {
        let context = engine
            .current_context()
            .ok_or_else(|| ContractError::InvalidOperation("no execution context".into()))?;
        let hash = UInt160::from(context.state.script_hash);
        let granted = context.state.call_flags;
        let ip = context.instruction_pointer();
        let native = self
            .by_hash(&hash)
            .ok_or_else(|| ContractError::ContractNotFound(hash.to_string()))?;

        // The SYSCALL sits one byte into the method block.
        let method_index = ip.saturating_sub(1) / METHOD_BLOCK;
        let method = native
            .methods()
            .get(method_index)
            .ok_or_else(|| ContractError::MethodNotFound(format!("offset {ip}")))?;

        if !granted.contains(method.required_flags) {
            return Err(ContractError::MissingCallFlags(format!(
                "{}::{}",
                native.name(),
                method.name
            )));
        }
        host.add_fee(method.cpu_fee)?;
        host.add_fee_unscaled(
            method
                .storage_fee
                .saturating_mul(i64::from(host.storage_price)),
        )?;

        let mut args = Vec::with_capacity(method.parameters.len());
        for _ in 0..method.parameters.len() {
            args.push(engine.pop().map_err(ContractError::Vm)?);
        }

        let result = native.invoke(method.name, args, host, engine)?;
        if method.has_return {
            engine
                .push(result.unwrap_or(StackItem::Null))
                .map_err(ContractError::Vm)?;
        }
        Ok(())
    }

    /// Seeds every native's genesis state.
    pub fn initialize_all(&self, host: &mut HostContext) -> ContractResult<()> {
        for contract in &self.contracts {
            contract.initialize(host)?;
        }
        Ok(())
    }

    /// Runs the OnPersist hooks in order.
    pub fn on_persist_all(&self, host: &mut HostContext) -> ContractResult<()> {
        for contract in &self.contracts {
            contract.on_persist(host)?;
        }
        Ok(())
    }

    /// Runs the PostPersist hooks in order.
    pub fn post_persist_all(&self, host: &mut HostContext) -> ContractResult<()> {
        for contract in &self.contracts {
            contract.post_persist(host)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_hashes_are_fixed_and_distinct() {
        let settings = ProtocolSettings::privnet();
        let registry = NativeRegistry::new(&settings);
        let mut hashes: Vec<UInt160> = registry.contracts().iter().map(|c| c.hash()).collect();
        let count = hashes.len();
        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), count);
        // Hash derivation is deterministic across registries.
        let again = NativeRegistry::new(&settings);
        assert_eq!(
            registry.contracts()[0].hash(),
            again.contracts()[0].hash()
        );
    }

    #[test]
    fn test_notary_gated_on_hardfork() {
        let mut settings = ProtocolSettings::mainnet();
        let without = NativeRegistry::new(&settings);
        assert!(without.by_id(NOTARY_ID).is_none());
        settings.hardforks.insert(Hardfork::Echidna, 0);
        let with = NativeRegistry::new(&settings);
        assert!(with.by_id(NOTARY_ID).is_some());
    }

    #[test]
    fn test_native_states_have_method_offsets() {
        let settings = ProtocolSettings::privnet();
        let registry = NativeRegistry::new(&settings);
        let neo = registry.by_id(NEO_ID).unwrap();
        let state = registry.contract_state(&neo.hash()).unwrap();
        for (index, method) in state.manifest.abi.methods.iter().enumerate() {
            assert_eq!(method.offset as usize, index * METHOD_BLOCK);
        }
    }
}
