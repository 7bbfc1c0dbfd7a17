// Copyright (C) 2015-2025 The Neo Project.
//
// runtime.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! `System.Runtime.*` syscalls.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_vm::execution_context::ExecutionContext;
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine, Script};
use num_bigint::BigUint;
use std::rc::Rc;
use tracing::info;

/// Longest `System.Runtime.Log` message.
const MAX_LOG_LENGTH: usize = 1024;

fn current_hash(engine: &ExecutionEngine) -> ContractResult<UInt160> {
    engine
        .current_context()
        .map(|c| UInt160::from(c.state.script_hash))
        .ok_or_else(|| ContractError::InvalidOperation("no execution context".into()))
}

pub fn platform(_host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    engine.push(StackItem::from_byte_string(b"NEO".to_vec()))?;
    Ok(())
}

pub fn get_network(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    engine.push(StackItem::from_int(host.settings.network))?;
    Ok(())
}

pub fn get_address_version(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    engine.push(StackItem::from_int(host.settings.address_version))?;
    Ok(())
}

pub fn get_trigger(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    engine.push(StackItem::from_int(host.trigger as u8))?;
    Ok(())
}

pub fn get_time(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    engine.push(StackItem::from_int(host.now_ms()))?;
    Ok(())
}

pub fn get_script_container(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let item = match &host.container {
        crate::application_engine::Container::Transaction(tx) => transaction_to_item(tx),
        crate::application_engine::Container::Block(block) => StackItem::new_array(vec![
            StackItem::from_byte_string(block.hash.to_array().to_vec()),
            StackItem::from_int(block.version),
            StackItem::from_byte_string(block.prev_hash.to_array().to_vec()),
            StackItem::from_byte_string(block.merkle_root.to_array().to_vec()),
            StackItem::from_int(block.timestamp),
            StackItem::from_int(block.nonce),
            StackItem::from_int(block.index),
            StackItem::from_int(block.primary_index),
            StackItem::from_byte_string(block.next_consensus.to_array().to_vec()),
        ]),
        crate::application_engine::Container::None => StackItem::Null,
    };
    engine.push(item)?;
    Ok(())
}

fn transaction_to_item(tx: &neo3_core::Transaction) -> StackItem {
    StackItem::new_array(vec![
        StackItem::from_byte_string(tx.hash().to_array().to_vec()),
        StackItem::from_int(tx.version),
        StackItem::from_int(tx.nonce),
        StackItem::from_byte_string(tx.sender().to_array().to_vec()),
        StackItem::from_int(tx.system_fee),
        StackItem::from_int(tx.network_fee),
        StackItem::from_int(tx.valid_until_block),
        StackItem::from_byte_string(tx.script.clone()),
    ])
}

pub fn get_executing_script_hash(
    _host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let hash = current_hash(engine)?;
    engine.push(StackItem::from_byte_string(hash.to_array().to_vec()))?;
    Ok(())
}

pub fn get_calling_script_hash(
    _host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let item = engine
        .current_context()
        .and_then(|c| c.state.calling_script_hash)
        .map(|hash| StackItem::from_byte_string(hash.to_vec()))
        .unwrap_or(StackItem::Null);
    engine.push(item)?;
    Ok(())
}

pub fn get_entry_script_hash(
    _host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let hash = engine
        .entry_context()
        .map(|c| c.state.script_hash)
        .ok_or_else(|| ContractError::InvalidOperation("no entry context".into()))?;
    engine.push(StackItem::from_byte_string(hash.to_vec()))?;
    Ok(())
}

pub fn check_witness(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let operand = engine.pop()?.as_bytes()?;
    let account = match operand.len() {
        20 => UInt160::from_bytes(&operand)
            .map_err(|e| ContractError::InvalidArgument(e.to_string()))?,
        33 => {
            let script = crate::helpers::signature_redeem_script(&operand)?;
            UInt160::from_script(&script)
        }
        other => {
            return Err(ContractError::InvalidArgument(format!(
                "check witness operand of {other} bytes"
            )))
        }
    };
    let result = host.check_witness(engine, &account)?;
    engine.push(StackItem::Boolean(result))?;
    Ok(())
}

pub fn get_invocation_counter(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let hash = current_hash(engine)?;
    let counter = host.invocation_counters.get(&hash).copied().unwrap_or(1);
    engine.push(StackItem::from_int(counter))?;
    Ok(())
}

pub fn get_random(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let bytes = host.next_random();
    let value = BigUint::from_bytes_le(&bytes);
    engine.push(StackItem::from_int(num_bigint::BigInt::from(value)))?;
    Ok(())
}

pub fn log(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let message = engine.pop()?.as_bytes()?;
    if message.len() > MAX_LOG_LENGTH {
        return Err(ContractError::InvalidArgument("log message too long".into()));
    }
    let text = String::from_utf8(message)
        .map_err(|_| ContractError::InvalidArgument("log message is not UTF-8".into()))?;
    let hash = current_hash(engine)?;
    info!(contract = %hash, message = %text, "contract log");
    host.logs.push((hash, text));
    Ok(())
}

pub fn notify(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let event_name = String::from_utf8(engine.pop()?.as_bytes()?)
        .map_err(|_| ContractError::InvalidArgument("event name is not UTF-8".into()))?;
    let state = engine.pop()?;
    if !matches!(state, StackItem::Array(_)) {
        return Err(ContractError::InvalidArgument(
            "notification state must be an array".into(),
        ));
    }
    let hash = current_hash(engine)?;
    host.send_notification(hash, event_name, state)
}

pub fn get_notifications(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let filter = engine.pop()?;
    let filter = if filter.is_null() {
        None
    } else {
        Some(
            UInt160::from_bytes(&filter.as_bytes()?)
                .map_err(|e| ContractError::InvalidArgument(e.to_string()))?,
        )
    };
    let records: Vec<StackItem> = host
        .notifications
        .iter()
        .filter(|n| filter.map(|f| n.contract == f).unwrap_or(true))
        .map(|n| {
            StackItem::new_array(vec![
                StackItem::from_byte_string(n.contract.to_array().to_vec()),
                StackItem::from_byte_string(n.event_name.as_bytes().to_vec()),
                n.state.clone(),
            ])
        })
        .collect();
    engine.push(StackItem::new_array(records))?;
    Ok(())
}

pub fn gas_left(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    engine.push(StackItem::from_int(host.gas_left()))?;
    Ok(())
}

pub fn burn_gas(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let amount = engine.pop()?.as_int()?;
    let amount = i64::try_from(amount)
        .map_err(|_| ContractError::InvalidArgument("burn amount out of range".into()))?;
    if amount <= 0 {
        return Err(ContractError::InvalidArgument(
            "burn amount must be positive".into(),
        ));
    }
    host.add_fee_unscaled(amount)
}

pub fn load_script(_host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let script_bytes = engine.pop()?.as_bytes()?;
    let flags_byte = engine.pop()?.as_int()?;
    let flags_byte = u8::try_from(&flags_byte)
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

    let caller_flags = engine
        .current_context()
        .map(|c| c.state.call_flags)
        .unwrap_or(CallFlags::NONE);
    let script_hash = UInt160::from_script(&script_bytes);
    let script = Script::new(script_bytes).map_err(ContractError::Vm)?;
    let mut context =
        ExecutionContext::new(Rc::new(script), -1, engine.reference_counter().clone());
    context.state.script_hash = script_hash.to_array();
    context.state.calling_script_hash = engine.current_context().map(|c| c.state.script_hash);
    context.state.call_flags = flags & caller_flags;
    for arg in args.into_iter().rev() {
        context.evaluation_stack.borrow_mut().push(arg);
    }
    engine.load_context(context).map_err(ContractError::Vm)?;
    Ok(())
}
