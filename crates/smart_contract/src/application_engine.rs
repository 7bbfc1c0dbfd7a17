// Copyright (C) 2015-2025 The Neo Project.
//
// application_engine.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The application engine: the VM host that meters gas, dispatches
//! syscalls, buffers notifications and scopes persistence to a snapshot.

use crate::binary_serializer;
use crate::error::{ContractError, ContractResult};
use crate::gas::{opcode_price, EXEC_FEE_FACTOR_DEFAULT, STORAGE_PRICE_DEFAULT};
use crate::interop;
use crate::json_serializer;
use crate::native::{NativeRegistry, POLICY_ID, PREFIX_EXEC_FEE_FACTOR, PREFIX_STORAGE_PRICE};
use crate::trigger::TriggerType;
use neo3_config::ProtocolSettings;
use neo3_core::{sha256, Transaction, UInt160, UInt256, WitnessScope};
use neo3_persistence::{DataCache, StorageKey};
use neo3_vm::execution_context::ExecutionContext;
use neo3_vm::stack_item::StackItem;
use neo3_vm::{
    CallFlags, ExecutionEngine, ExecutionHost, Instruction, Script, VMState, VmError, VmResult,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// Gas granted to speculative RPC invocations.
pub const TEST_MODE_GAS: i64 = 2_000_000_000;
/// Largest serialized notification state.
pub const MAX_NOTIFICATION_SIZE: usize = 1024;
/// Longest event name accepted by `System.Runtime.Notify`.
pub const MAX_EVENT_NAME: usize = 32;

/// The header fields of the block being persisted, visible to scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistingBlock {
    pub hash: UInt256,
    pub version: u32,
    pub prev_hash: UInt256,
    pub merkle_root: UInt256,
    pub timestamp: u64,
    pub nonce: u64,
    pub index: u32,
    pub primary_index: u8,
    pub next_consensus: UInt160,
}

/// What the engine is executing on behalf of.
#[derive(Debug, Clone)]
pub enum Container {
    None,
    Transaction(Transaction),
    Block(PersistingBlock),
}

impl Container {
    /// The container hash scripts observe.
    pub fn hash(&self) -> Option<UInt256> {
        match self {
            Container::None => None,
            Container::Transaction(tx) => Some(tx.hash()),
            Container::Block(block) => Some(block.hash),
        }
    }
}

/// One buffered notification.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub contract: UInt160,
    pub event_name: String,
    pub state: StackItem,
}

/// The serializable execution record stored per transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationLog {
    pub trigger: String,
    #[serde(rename = "vmstate")]
    pub vm_state: String,
    #[serde(rename = "gasconsumed")]
    pub gas_consumed: i64,
    #[serde(default)]
    pub exception: Option<String>,
    pub stack: Vec<serde_json::Value>,
    pub notifications: Vec<NotificationJson>,
}

/// JSON form of one notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationJson {
    pub contract: UInt160,
    #[serde(rename = "eventname")]
    pub event_name: String,
    pub state: serde_json::Value,
}

/// Host state threaded through every syscall.
pub struct HostContext {
    pub trigger: TriggerType,
    pub container: Container,
    pub snapshot: Arc<DataCache>,
    pub settings: Arc<ProtocolSettings>,
    pub natives: Arc<NativeRegistry>,
    pub persisting_block: Option<PersistingBlock>,
    /// The persisting block's transactions, for the native persist hooks.
    pub block_transactions: Vec<Transaction>,
    pub gas_limit: i64,
    pub fee_consumed: i64,
    pub exec_fee_factor: u32,
    pub storage_price: u32,
    pub notifications: Vec<NotificationRecord>,
    pub logs: Vec<(UInt160, String)>,
    pub(crate) invocation_counters: HashMap<UInt160, u32>,
    pub(crate) random_state: [u8; 32],
}

impl HostContext {
    /// Charges `base_price` scaled by the execution-fee factor.
    pub fn add_fee(&mut self, base_price: i64) -> ContractResult<()> {
        let price = base_price.saturating_mul(i64::from(self.exec_fee_factor));
        self.add_fee_unscaled(price)
    }

    /// Charges an already-scaled amount (storage pricing).
    pub fn add_fee_unscaled(&mut self, price: i64) -> ContractResult<()> {
        self.fee_consumed = self.fee_consumed.saturating_add(price);
        if self.fee_consumed > self.gas_limit {
            return Err(ContractError::OutOfGas);
        }
        Ok(())
    }

    /// Remaining gas budget.
    pub fn gas_left(&self) -> i64 {
        self.gas_limit - self.fee_consumed
    }

    /// Milliseconds timestamp scripts observe: the persisting block's,
    /// or the wall-clock equivalent for speculative runs.
    pub fn now_ms(&self) -> u64 {
        match &self.persisting_block {
            Some(block) => block.timestamp,
            None => 0,
        }
    }

    /// The transaction being executed, when any.
    pub fn transaction(&self) -> Option<&Transaction> {
        match &self.container {
            Container::Transaction(tx) => Some(tx),
            _ => None,
        }
    }

    /// Deterministic per-call randomness derived from the container.
    pub fn next_random(&mut self) -> [u8; 16] {
        self.random_state = sha256(&self.random_state);
        let mut out = [0u8; 16];
        out.copy_from_slice(&self.random_state[..16]);
        out
    }

    /// Whether `account`'s witness covers the current context.
    pub fn check_witness(
        &mut self,
        engine: &ExecutionEngine,
        account: &UInt160,
    ) -> ContractResult<bool> {
        // A contract in the call chain vouches for its own hash.
        if let Some(context) = engine.current_context() {
            if let Some(calling) = context.state.calling_script_hash {
                if UInt160::from(calling) == *account {
                    return Ok(true);
                }
            }
        }
        let Container::Transaction(tx) = &self.container else {
            return Ok(false);
        };
        let Some(signer) = tx.signers.iter().find(|s| s.account == *account) else {
            return Ok(false);
        };
        if signer.scopes.contains(WitnessScope::GLOBAL) {
            return Ok(true);
        }
        let Some(context) = engine.current_context() else {
            return Ok(false);
        };
        let current = UInt160::from(context.state.script_hash);
        let entry_hash = engine
            .entry_context()
            .map(|c| UInt160::from(c.state.script_hash));

        if signer.scopes.contains(WitnessScope::CALLED_BY_ENTRY) {
            let calling = context.state.calling_script_hash.map(UInt160::from);
            if calling.is_none() || calling == entry_hash {
                return Ok(true);
            }
        }
        if signer.scopes.contains(WitnessScope::CUSTOM_CONTRACTS)
            && signer.allowed_contracts.contains(&current)
        {
            return Ok(true);
        }
        if signer.scopes.contains(WitnessScope::CUSTOM_GROUPS) {
            if let Some(contract) = self.try_get_contract(&current) {
                for group in &signer.allowed_groups {
                    if contract.manifest.has_group(&hex::encode(group)) {
                        return Ok(true);
                    }
                }
            }
        }
        if signer.scopes.contains(WitnessScope::WITNESS_RULES) {
            let oracle = WitnessOracle {
                host: self,
                current,
                calling: context.state.calling_script_hash.map(UInt160::from),
                entry: entry_hash,
            };
            for rule in &signer.rules {
                if rule.condition.evaluate(&oracle) {
                    return Ok(rule.action == neo3_core::WitnessRuleAction::Allow);
                }
            }
        }
        Ok(false)
    }

    /// Looks up a contract: natives first, then deployed state.
    pub fn try_get_contract(&self, hash: &UInt160) -> Option<crate::ContractState> {
        if let Some(state) = self.natives.contract_state(hash) {
            return Some(state.clone());
        }
        crate::native::contract_management::get_contract(&self.snapshot, hash)
    }

    /// Calls `method` on `contract_hash`, loading a fresh context.
    pub fn call_contract(
        &mut self,
        engine: &mut ExecutionEngine,
        contract_hash: UInt160,
        method: &str,
        flags: CallFlags,
        args: Vec<StackItem>,
        push_return_null: bool,
    ) -> ContractResult<()> {
        if method.starts_with('_') {
            return Err(ContractError::InvalidArgument(format!(
                "reserved method {method} cannot be called"
            )));
        }
        let contract = self
            .try_get_contract(&contract_hash)
            .ok_or_else(|| ContractError::ContractNotFound(contract_hash.to_string()))?;
        let target = contract
            .manifest
            .abi
            .method(method, args.len())
            .ok_or_else(|| {
                ContractError::MethodNotFound(format!("{method}/{}", args.len()))
            })?
            .clone();

        // The caller's manifest must permit this call.
        let caller_hash = engine
            .current_context()
            .map(|c| UInt160::from(c.state.script_hash));
        if let Some(caller_hash) = caller_hash {
            if let Some(caller) = self.try_get_contract(&caller_hash) {
                if !caller.manifest.can_call(&contract_hash, method) {
                    return Err(ContractError::InvalidOperation(format!(
                        "{} is not permitted to call {method} on {}",
                        caller.manifest.name, contract_hash
                    )));
                }
            }
        }

        let mut call_flags = flags
            & engine
                .current_context()
                .map(|c| c.state.call_flags)
                .unwrap_or(CallFlags::ALL);
        if target.safe {
            call_flags &= !(CallFlags::WRITE_STATES | CallFlags::ALLOW_NOTIFY);
        }

        let has_return = target.return_type != crate::manifest::ContractParameterType::Void;
        let rvcount = i32::from(has_return);
        // Callers that expect a value from a void method (CALLT, token
        // payment callbacks) get a null planted under the new frame.
        if !has_return && push_return_null {
            engine.push(StackItem::Null).map_err(ContractError::Vm)?;
        }

        let script = Script::new(contract.nef.script.clone())
            .map_err(|e| ContractError::InvalidOperation(format!("invalid contract script: {e}")))?;
        let mut context =
            ExecutionContext::new(Rc::new(script), rvcount, engine.reference_counter().clone());
        context.state.script_hash = contract.hash.to_array();
        context.state.calling_script_hash = engine
            .current_context()
            .map(|c| c.state.script_hash);
        context.state.call_flags = call_flags;
        context.set_instruction_pointer(target.offset as usize).map_err(ContractError::Vm)?;
        for arg in args.into_iter().rev() {
            context.evaluation_stack.borrow_mut().push(arg);
        }
        let init_offset = contract
            .manifest
            .abi
            .method_by_name("_initialize")
            .map(|m| m.offset as usize);
        engine.load_context(context).map_err(ContractError::Vm)?;
        // _initialize runs first, on top of the method context.
        if let Some(offset) = init_offset {
            let base = engine
                .current_context()
                .map(|c| c.clone_for_call(offset))
                .ok_or_else(|| ContractError::InvalidOperation("missing context".into()))?;
            engine.load_context(base).map_err(ContractError::Vm)?;
        }
        *self.invocation_counters.entry(contract.hash).or_insert(0) += 1;
        debug!(contract = %contract_hash, method, "contract call");
        Ok(())
    }

    /// Internal call path for reserved methods (`_deploy`), bypassing the
    /// underscore and permission checks.
    pub(crate) fn call_special(
        &mut self,
        engine: &mut ExecutionEngine,
        contract: &crate::ContractState,
        method: &str,
        args: Vec<StackItem>,
    ) -> ContractResult<()> {
        let Some(target) = contract.manifest.abi.method(method, args.len()) else {
            return Ok(());
        };
        let target = target.clone();
        let has_return = target.return_type != crate::manifest::ContractParameterType::Void;
        let script = Script::new(contract.nef.script.clone())
            .map_err(|e| ContractError::InvalidOperation(format!("invalid contract script: {e}")))?;
        let mut context = ExecutionContext::new(
            Rc::new(script),
            i32::from(has_return),
            engine.reference_counter().clone(),
        );
        context.state.script_hash = contract.hash.to_array();
        context.state.calling_script_hash =
            engine.current_context().map(|c| c.state.script_hash);
        context.state.call_flags = CallFlags::ALL;
        context
            .set_instruction_pointer(target.offset as usize)
            .map_err(ContractError::Vm)?;
        for arg in args.into_iter().rev() {
            context.evaluation_stack.borrow_mut().push(arg);
        }
        engine.load_context(context).map_err(ContractError::Vm)?;
        Ok(())
    }

    /// Buffers a notification after validating its payload.
    pub fn send_notification(
        &mut self,
        contract: UInt160,
        event_name: String,
        state: StackItem,
    ) -> ContractResult<()> {
        if event_name.len() > MAX_EVENT_NAME {
            return Err(ContractError::InvalidArgument("event name too long".into()));
        }
        // The state must survive the binary serializer.
        binary_serializer::serialize(&state, MAX_NOTIFICATION_SIZE)?;
        self.notifications.push(NotificationRecord {
            contract,
            event_name,
            state,
        });
        Ok(())
    }
}

struct WitnessOracle<'a> {
    host: &'a HostContext,
    current: UInt160,
    calling: Option<UInt160>,
    entry: Option<UInt160>,
}

impl neo3_core::witness_rule::WitnessContext for WitnessOracle<'_> {
    fn current_script_hash(&self) -> UInt160 {
        self.current
    }

    fn calling_script_hash(&self) -> Option<UInt160> {
        self.calling
    }

    fn is_called_by_entry(&self) -> bool {
        self.calling.is_none() || self.calling == self.entry
    }

    fn current_has_group(&self, key: &[u8]) -> bool {
        self.host
            .try_get_contract(&self.current)
            .map(|c| c.manifest.has_group(&hex::encode(key)))
            .unwrap_or(false)
    }

    fn calling_has_group(&self, key: &[u8]) -> bool {
        match self.calling {
            Some(calling) => self
                .host
                .try_get_contract(&calling)
                .map(|c| c.manifest.has_group(&hex::encode(key)))
                .unwrap_or(false),
            None => false,
        }
    }
}

impl ExecutionHost for HostContext {
    fn pre_execute(
        &mut self,
        _engine: &ExecutionEngine,
        instruction: &Instruction,
    ) -> VmResult<()> {
        self.add_fee(opcode_price(instruction.opcode))
            .map_err(VmError::from)
    }

    fn on_syscall(&mut self, engine: &mut ExecutionEngine, hash: u32) -> VmResult<()> {
        interop::dispatch(self, engine, hash).map_err(VmError::from)
    }

    fn on_call_token(&mut self, engine: &mut ExecutionEngine, token: u16) -> VmResult<()> {
        let current = engine
            .current_context()
            .map(|c| UInt160::from(c.state.script_hash))
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        let contract = self
            .try_get_contract(&current)
            .ok_or_else(|| VmError::InvalidOperation("calling contract not found".into()))?;
        let token = contract
            .nef
            .tokens
            .get(token as usize)
            .cloned()
            .ok_or_else(|| VmError::InvalidOperation("method token out of range".into()))?;
        let flags = CallFlags::from_byte(token.call_flags)
            .ok_or_else(|| VmError::InvalidOperation("invalid token flags".into()))?;
        let mut args = Vec::with_capacity(token.parameters_count as usize);
        for _ in 0..token.parameters_count {
            args.push(engine.pop()?);
        }
        self.call_contract(
            engine,
            token.hash,
            &token.method,
            flags,
            args,
            !token.has_return_value,
        )
        .map_err(VmError::from)
    }
}

/// The application engine: a VM plus its host context.
pub struct ApplicationEngine {
    pub vm: ExecutionEngine,
    pub host: HostContext,
}

impl ApplicationEngine {
    /// Creates an engine over `snapshot` with the given gas budget.
    pub fn new(
        trigger: TriggerType,
        container: Container,
        snapshot: Arc<DataCache>,
        persisting_block: Option<PersistingBlock>,
        settings: Arc<ProtocolSettings>,
        natives: Arc<NativeRegistry>,
        gas_limit: i64,
    ) -> Self {
        let exec_fee_factor = read_policy_u32(
            &snapshot,
            PREFIX_EXEC_FEE_FACTOR,
            EXEC_FEE_FACTOR_DEFAULT,
        );
        let storage_price = read_policy_u32(&snapshot, PREFIX_STORAGE_PRICE, STORAGE_PRICE_DEFAULT);

        let mut seed = [0u8; 32];
        let nonce = persisting_block.as_ref().map(|b| b.nonce).unwrap_or(0);
        seed[..8].copy_from_slice(&nonce.to_le_bytes());
        seed[8..12].copy_from_slice(&settings.network.to_le_bytes());
        if let Some(hash) = container.hash() {
            let bytes = hash.to_array();
            seed[12..32].copy_from_slice(&bytes[..20]);
        }

        Self {
            vm: ExecutionEngine::default(),
            host: HostContext {
                trigger,
                container,
                snapshot,
                settings,
                natives,
                persisting_block,
                block_transactions: Vec::new(),
                gas_limit,
                fee_consumed: 0,
                exec_fee_factor,
                storage_price,
                notifications: Vec::new(),
                logs: Vec::new(),
                invocation_counters: HashMap::new(),
                random_state: sha256(&seed),
            },
        }
    }

    /// Loads an entry script with the given permissions.
    pub fn load_script(&mut self, bytes: Vec<u8>, call_flags: CallFlags) -> ContractResult<()> {
        let script_hash = UInt160::from_script(&bytes);
        let script = Script::new(bytes).map_err(ContractError::Vm)?;
        let mut context =
            ExecutionContext::new(Rc::new(script), -1, self.vm.reference_counter().clone());
        context.state.script_hash = script_hash.to_array();
        context.state.call_flags = call_flags;
        self.vm.load_context(context).map_err(ContractError::Vm)?;
        Ok(())
    }

    /// Loads a deployed contract method as the entry point.
    pub fn load_contract(
        &mut self,
        contract_hash: UInt160,
        method: &str,
        args: Vec<StackItem>,
    ) -> ContractResult<()> {
        let ApplicationEngine { vm, host } = self;
        host.call_contract(vm, contract_hash, method, CallFlags::ALL, args, false)
    }

    /// Runs to completion; a fault discards buffered notifications.
    pub fn execute(&mut self) -> VMState {
        let ApplicationEngine { vm, host } = self;
        let state = vm.execute(host);
        if state == VMState::FAULT {
            self.host.notifications.clear();
        }
        state
    }

    /// Gas consumed so far (in datoshi).
    pub fn gas_consumed(&self) -> i64 {
        self.host.fee_consumed
    }

    /// The buffered notifications (empty after a fault).
    pub fn notifications(&self) -> &[NotificationRecord] {
        &self.host.notifications
    }

    /// Renders the execution record for storage and RPC.
    pub fn to_application_log(&self) -> ApplicationLog {
        let exception = match self.vm.state() {
            VMState::FAULT => Some(
                self.vm
                    .fault_reason()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "execution faulted".into()),
            ),
            _ => None,
        };
        ApplicationLog {
            trigger: self.host.trigger.as_str().into(),
            vm_state: self.vm.state().to_string(),
            gas_consumed: self.host.fee_consumed,
            exception,
            stack: self
                .vm
                .result_stack()
                .items()
                .iter()
                .map(json_serializer::to_rpc_json)
                .collect(),
            notifications: self
                .host
                .notifications
                .iter()
                .map(|n| NotificationJson {
                    contract: n.contract,
                    event_name: n.event_name.clone(),
                    state: json_serializer::to_rpc_json(&n.state),
                })
                .collect(),
        }
    }
}

fn read_policy_u32(snapshot: &DataCache, prefix: u8, default: u32) -> u32 {
    snapshot
        .try_get(&StorageKey::with_prefix(POLICY_ID, prefix))
        .map(|item| item.as_i64() as u32)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_persistence::MemoryStore;

    fn test_engine(gas: i64) -> ApplicationEngine {
        let store: Arc<dyn neo3_persistence::Store> = Arc::new(MemoryStore::new());
        let snapshot = Arc::new(DataCache::new(store));
        let settings = Arc::new(ProtocolSettings::privnet());
        let natives = Arc::new(NativeRegistry::new(&settings));
        ApplicationEngine::new(
            TriggerType::Application,
            Container::None,
            snapshot,
            None,
            settings,
            natives,
            gas,
        )
    }

    #[test]
    fn test_arithmetic_script_with_gas() {
        let mut engine = test_engine(10_000_000);
        // PUSH2 PUSH3 ADD
        engine
            .load_script(vec![0x12, 0x13, 0x9E], CallFlags::ALL)
            .unwrap();
        assert_eq!(engine.execute(), VMState::HALT);
        let items = engine.vm.result_stack().items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_int().unwrap(), 5.into());
        assert!(engine.gas_consumed() > 0);
    }

    #[test]
    fn test_gas_exhaustion_faults() {
        let mut engine = test_engine(1);
        engine
            .load_script(vec![0x12, 0x13, 0x9E], CallFlags::ALL)
            .unwrap();
        assert_eq!(engine.execute(), VMState::FAULT);
    }

    #[test]
    fn test_fault_discards_notifications() {
        let mut engine = test_engine(10_000_000);
        engine.host.notifications.push(NotificationRecord {
            contract: UInt160::ZERO,
            event_name: "Transfer".into(),
            state: StackItem::Null,
        });
        // ABORT faults immediately.
        engine.load_script(vec![0x38], CallFlags::ALL).unwrap();
        assert_eq!(engine.execute(), VMState::FAULT);
        assert!(engine.notifications().is_empty());
    }

    #[test]
    fn test_application_log_shape() {
        let mut engine = test_engine(10_000_000);
        engine
            .load_script(vec![0x12, 0x13, 0x9E], CallFlags::ALL)
            .unwrap();
        engine.execute();
        let log = engine.to_application_log();
        assert_eq!(log.vm_state, "HALT");
        assert_eq!(log.stack.len(), 1);
        assert!(log.exception.is_none());
    }
}
