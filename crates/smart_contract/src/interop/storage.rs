// Copyright (C) 2015-2025 The Neo Project.
//
// storage.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! `System.Storage.*` syscalls.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::interop::iterator::StorageIterator;
use neo3_core::UInt160;
use neo3_persistence::{StorageItem, StorageKey};
use neo3_vm::stack_item::{InteropValue, StackItem};
use neo3_vm::ExecutionEngine;
use std::any::Any;
use std::rc::Rc;

/// Longest storage key a contract may write.
pub const MAX_STORAGE_KEY: usize = 64;
/// Longest storage value a contract may write.
pub const MAX_STORAGE_VALUE: usize = u16::MAX as usize;

/// A handle to one contract's storage space.
#[derive(Debug, Clone, Copy)]
pub struct StorageContext {
    pub id: i32,
    pub read_only: bool,
}

impl InteropValue for StorageContext {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn pop_context(engine: &mut ExecutionEngine) -> ContractResult<StorageContext> {
    let item = engine.pop()?;
    let interface = item
        .as_interface::<StorageContext>()
        .map_err(ContractError::Vm)?;
    let context = interface
        .as_any()
        .downcast_ref::<StorageContext>()
        .ok_or_else(|| ContractError::InvalidArgument("expected a storage context".into()))?;
    Ok(*context)
}

fn current_contract_id(host: &HostContext, engine: &ExecutionEngine) -> ContractResult<i32> {
    let hash = engine
        .current_context()
        .map(|c| UInt160::from(c.state.script_hash))
        .ok_or_else(|| ContractError::InvalidOperation("no execution context".into()))?;
    let contract = host
        .try_get_contract(&hash)
        .ok_or_else(|| ContractError::ContractNotFound(hash.to_string()))?;
    Ok(contract.id)
}

pub fn get_context(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let id = current_contract_id(host, engine)?;
    engine.push(StackItem::from_interface(Rc::new(StorageContext {
        id,
        read_only: false,
    })))?;
    Ok(())
}

pub fn get_read_only_context(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
) -> ContractResult<()> {
    let id = current_contract_id(host, engine)?;
    engine.push(StackItem::from_interface(Rc::new(StorageContext {
        id,
        read_only: true,
    })))?;
    Ok(())
}

pub fn as_read_only(_host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let context = pop_context(engine)?;
    engine.push(StackItem::from_interface(Rc::new(StorageContext {
        id: context.id,
        read_only: true,
    })))?;
    Ok(())
}

pub fn get(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let context = pop_context(engine)?;
    let key = engine.pop()?.as_bytes()?;
    let storage_key = StorageKey::new(context.id, key);
    let item = match host.snapshot.try_get(&storage_key) {
        Some(item) => StackItem::from_byte_string(item.value),
        None => StackItem::Null,
    };
    engine.push(item)?;
    Ok(())
}

pub fn put(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let context = pop_context(engine)?;
    let key = engine.pop()?.as_bytes()?;
    let value = engine.pop()?.as_bytes()?;
    if context.read_only {
        return Err(ContractError::InvalidOperation(
            "cannot write through a read-only context".into(),
        ));
    }
    if key.len() > MAX_STORAGE_KEY {
        return Err(ContractError::InvalidArgument(format!(
            "storage key of {} bytes",
            key.len()
        )));
    }
    if value.len() > MAX_STORAGE_VALUE {
        return Err(ContractError::InvalidArgument(format!(
            "storage value of {} bytes",
            value.len()
        )));
    }

    let storage_key = StorageKey::new(context.id, key);
    // New bytes are billed at the storage price; overwritten bytes only
    // for the growth.
    let existing = host.snapshot.try_get(&storage_key).map(|i| i.value.len());
    let billable = match existing {
        None => storage_key.key.len() + value.len(),
        Some(old_len) => value.len().saturating_sub(old_len).max(1),
    };
    host.add_fee_unscaled(billable as i64 * i64::from(host.storage_price))?;
    host.snapshot.put(storage_key, StorageItem::new(value));
    Ok(())
}

pub fn delete(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let context = pop_context(engine)?;
    let key = engine.pop()?.as_bytes()?;
    if context.read_only {
        return Err(ContractError::InvalidOperation(
            "cannot delete through a read-only context".into(),
        ));
    }
    host.snapshot.delete(&StorageKey::new(context.id, key));
    Ok(())
}

pub fn find(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let context = pop_context(engine)?;
    let prefix = engine.pop()?.as_bytes()?;
    let options = engine.pop()?.as_int()?;
    let options = u8::try_from(&options)
        .map_err(|_| ContractError::InvalidArgument("invalid find options".into()))?;
    let iterator = StorageIterator::open(&host.snapshot, context.id, prefix, options)?;
    engine.push(StackItem::from_interface(Rc::new(iterator)))?;
    Ok(())
}
