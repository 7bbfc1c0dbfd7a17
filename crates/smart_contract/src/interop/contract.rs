// Copyright (C) 2015-2025 The Neo Project.
//
// contract.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! `System.Contract.*` syscalls.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::gas::CHECK_SIG_PRICE;
use crate::helpers;
use neo3_core::UInt160;
use neo3_crypto::ECPoint;
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use std::sync::Arc;

pub fn call(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let hash_bytes = engine.pop()?.as_bytes()?;
    let contract_hash = UInt160::from_bytes(&hash_bytes)
        .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
    let method = String::from_utf8(engine.pop()?.as_bytes()?)
        .map_err(|_| ContractError::InvalidArgument("method name is not UTF-8".into()))?;
    let flags_value = engine.pop()?.as_int()?;
    let flags_byte = u8::try_from(&flags_value)
        .map_err(|_| ContractError::InvalidArgument("invalid call flags".into()))?;
    let flags = CallFlags::from_byte(flags_byte)
        .ok_or_else(|| ContractError::InvalidArgument("invalid call flags".into()))?;
    let args = match engine.pop()? {
        StackItem::Array(body) => body.borrow().clone(),
        other => {
            return Err(ContractError::InvalidArgument(format!(
                "arguments must be an array, got {:?}",
                other.item_type()
            )))
        }
    };
    host.call_contract(engine, contract_hash, &method, flags, args, false)
}

/// The marker syscall native-contract scripts are made of.
pub fn call_native(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let version = engine.pop()?.as_int()?;
    if version != 0.into() {
        return Err(ContractError::InvalidOperation(format!(
            "unsupported native version {version}"
        )));
    }
    let natives = Arc::clone(&host.natives);
    natives.invoke_current(host, engine)
}

pub fn get_call_flags(_host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let flags = engine
        .current_context()
        .map(|c| c.state.call_flags)
        .ok_or_else(|| ContractError::InvalidOperation("no execution context".into()))?;
    engine.push(StackItem::from_int(flags.bits()))?;
    Ok(())
}

pub fn create_standard_account(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let key_bytes = engine.pop()?.as_bytes()?;
    // Validate the key is on the curve before hashing.
    ECPoint::from_bytes(&key_bytes)
        .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
    host.add_fee(CHECK_SIG_PRICE)?;
    let script = helpers::signature_redeem_script(&key_bytes)?;
    let hash = UInt160::from_script(&script);
    engine.push(StackItem::from_byte_string(hash.to_array().to_vec()))?;
    Ok(())
}

pub fn create_multisig_account(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let m = engine.pop()?.as_index()?;
    let keys_item = engine.pop()?;
    let StackItem::Array(body) = &keys_item else {
        return Err(ContractError::InvalidArgument(
            "public keys must be an array".into(),
        ));
    };
    let mut keys = Vec::with_capacity(body.borrow().len());
    for item in body.borrow().iter() {
        let bytes = item.as_bytes().map_err(ContractError::Vm)?;
        keys.push(
            ECPoint::from_bytes(&bytes)
                .map_err(|e| ContractError::InvalidArgument(e.to_string()))?,
        );
    }
    host.add_fee(CHECK_SIG_PRICE.saturating_mul(keys.len() as i64))?;
    let hash = helpers::multisig_script_hash(m, &keys)?;
    engine.push(StackItem::from_byte_string(hash.to_array().to_vec()))?;
    Ok(())
}
