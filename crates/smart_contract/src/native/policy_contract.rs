// Copyright (C) 2015-2025 The Neo Project.
//
// policy_contract.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Per-network policy parameters, guarded by the committee witness.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::native::gas_token::pop_account;
use crate::native::{
    native_hash, neo_token, NativeContract, NativeMethod, POLICY_ID, PREFIX_BLOCKED_ACCOUNT,
    PREFIX_EXEC_FEE_FACTOR, PREFIX_FEE_PER_BYTE, PREFIX_STORAGE_PRICE,
};
use neo3_core::UInt160;
use neo3_persistence::{DataCache, StorageItem, StorageKey};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_traits::ToPrimitive;

pub const DEFAULT_FEE_PER_BYTE: i64 = 1000;
pub const MAX_EXEC_FEE_FACTOR: i64 = 100;
pub const MAX_STORAGE_PRICE: i64 = 10_000_000;

pub struct PolicyContract {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl PolicyContract {
    pub const NAME: &'static str = "PolicyContract";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new("getFeePerByte", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("setFeePerByte", &["value"], false, 1 << 15, 0, F::STATES, false),
                NativeMethod::new("getExecFeeFactor", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("setExecFeeFactor", &["value"], false, 1 << 15, 0, F::STATES, false),
                NativeMethod::new("getStoragePrice", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("setStoragePrice", &["value"], false, 1 << 15, 0, F::STATES, false),
                NativeMethod::new("isBlocked", &["account"], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("blockAccount", &["account"], true, 1 << 15, 0, F::STATES, false),
                NativeMethod::new("unblockAccount", &["account"], true, 1 << 15, 0, F::STATES, false),
            ],
        }
    }
}

impl Default for PolicyContract {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the policy fee-per-byte directly from a snapshot (used by the
/// mempool and verifier without an engine).
pub fn fee_per_byte(snapshot: &DataCache) -> i64 {
    snapshot
        .try_get(&StorageKey::with_prefix(POLICY_ID, PREFIX_FEE_PER_BYTE))
        .map(|item| item.as_i64())
        .unwrap_or(DEFAULT_FEE_PER_BYTE)
}

/// Whether `account` is blocked, directly from a snapshot.
pub fn is_blocked(snapshot: &DataCache, account: &UInt160) -> bool {
    snapshot.contains(&StorageKey::with_prefix_bytes(
        POLICY_ID,
        PREFIX_BLOCKED_ACCOUNT,
        &account.to_array(),
    ))
}

fn set_value(
    host: &mut HostContext,
    engine: &ExecutionEngine,
    prefix: u8,
    value: i64,
    max: i64,
) -> ContractResult<()> {
    if value <= 0 || value > max {
        return Err(ContractError::InvalidArgument(format!(
            "policy value {value} out of range"
        )));
    }
    let committee = neo_token::committee_address(host)?;
    if !host.check_witness(engine, &committee)? {
        return Err(ContractError::InvalidOperation(
            "committee witness required".into(),
        ));
    }
    host.snapshot.put(
        StorageKey::with_prefix(POLICY_ID, prefix),
        StorageItem::from_i64(value),
    );
    Ok(())
}

fn get_value(host: &HostContext, prefix: u8, default: i64) -> i64 {
    host.snapshot
        .try_get(&StorageKey::with_prefix(POLICY_ID, prefix))
        .map(|item| item.as_i64())
        .unwrap_or(default)
}

impl NativeContract for PolicyContract {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        POLICY_ID
    }

    fn hash(&self) -> UInt160 {
        self.hash
    }

    fn methods(&self) -> &[NativeMethod] {
        &self.methods
    }

    fn invoke(
        &self,
        method: &str,
        mut args: Vec<StackItem>,
        host: &mut HostContext,
        engine: &mut ExecutionEngine,
    ) -> ContractResult<Option<StackItem>> {
        match method {
            "getFeePerByte" => Ok(Some(StackItem::from_int(get_value(
                host,
                PREFIX_FEE_PER_BYTE,
                DEFAULT_FEE_PER_BYTE,
            )))),
            "setFeePerByte" => {
                let value = pop_i64(&mut args)?;
                set_value(host, engine, PREFIX_FEE_PER_BYTE, value, 100_000_000)?;
                Ok(None)
            }
            "getExecFeeFactor" => Ok(Some(StackItem::from_int(get_value(
                host,
                PREFIX_EXEC_FEE_FACTOR,
                i64::from(crate::gas::EXEC_FEE_FACTOR_DEFAULT),
            )))),
            "setExecFeeFactor" => {
                let value = pop_i64(&mut args)?;
                set_value(host, engine, PREFIX_EXEC_FEE_FACTOR, value, MAX_EXEC_FEE_FACTOR)?;
                Ok(None)
            }
            "getStoragePrice" => Ok(Some(StackItem::from_int(get_value(
                host,
                PREFIX_STORAGE_PRICE,
                i64::from(crate::gas::STORAGE_PRICE_DEFAULT),
            )))),
            "setStoragePrice" => {
                let value = pop_i64(&mut args)?;
                set_value(host, engine, PREFIX_STORAGE_PRICE, value, MAX_STORAGE_PRICE)?;
                Ok(None)
            }
            "isBlocked" => {
                let account = pop_account(&mut args)?;
                Ok(Some(StackItem::Boolean(is_blocked(
                    &host.snapshot,
                    &account,
                ))))
            }
            "blockAccount" => {
                let account = pop_account(&mut args)?;
                let committee = neo_token::committee_address(host)?;
                if !host.check_witness(engine, &committee)? {
                    return Err(ContractError::InvalidOperation(
                        "committee witness required".into(),
                    ));
                }
                if host.natives.is_native(&account) {
                    return Err(ContractError::InvalidArgument(
                        "native contracts cannot be blocked".into(),
                    ));
                }
                let key = StorageKey::with_prefix_bytes(
                    POLICY_ID,
                    PREFIX_BLOCKED_ACCOUNT,
                    &account.to_array(),
                );
                if host.snapshot.contains(&key) {
                    return Ok(Some(StackItem::Boolean(false)));
                }
                host.snapshot.put(key, StorageItem::new(Vec::new()));
                Ok(Some(StackItem::Boolean(true)))
            }
            "unblockAccount" => {
                let account = pop_account(&mut args)?;
                let committee = neo_token::committee_address(host)?;
                if !host.check_witness(engine, &committee)? {
                    return Err(ContractError::InvalidOperation(
                        "committee witness required".into(),
                    ));
                }
                let key = StorageKey::with_prefix_bytes(
                    POLICY_ID,
                    PREFIX_BLOCKED_ACCOUNT,
                    &account.to_array(),
                );
                if !host.snapshot.contains(&key) {
                    return Ok(Some(StackItem::Boolean(false)));
                }
                host.snapshot.delete(&key);
                Ok(Some(StackItem::Boolean(true)))
            }
            other => Err(ContractError::MethodNotFound(other.into())),
        }
    }

    fn initialize(&self, host: &mut HostContext) -> ContractResult<()> {
        host.snapshot.put(
            StorageKey::with_prefix(POLICY_ID, PREFIX_FEE_PER_BYTE),
            StorageItem::from_i64(DEFAULT_FEE_PER_BYTE),
        );
        host.snapshot.put(
            StorageKey::with_prefix(POLICY_ID, PREFIX_EXEC_FEE_FACTOR),
            StorageItem::from_i64(i64::from(crate::gas::EXEC_FEE_FACTOR_DEFAULT)),
        );
        host.snapshot.put(
            StorageKey::with_prefix(POLICY_ID, PREFIX_STORAGE_PRICE),
            StorageItem::from_i64(i64::from(crate::gas::STORAGE_PRICE_DEFAULT)),
        );
        Ok(())
    }
}

fn pop_i64(args: &mut Vec<StackItem>) -> ContractResult<i64> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing argument".into()));
    }
    let value = args.remove(0).as_int().map_err(ContractError::Vm)?;
    value
        .to_i64()
        .ok_or_else(|| ContractError::InvalidArgument("value out of range".into()))
}
