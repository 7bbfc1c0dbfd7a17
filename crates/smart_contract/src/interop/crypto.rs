// Copyright (C) 2015-2025 The Neo Project.
//
// crypto.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! `System.Crypto.*` syscalls.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::gas::CHECK_SIG_PRICE;
use neo3_crypto::ecc::verify_signature;
use neo3_crypto::Secp256Curve;
use neo3_vm::stack_item::StackItem;
use neo3_vm::ExecutionEngine;

/// The bytes witness signatures cover: network magic then container hash.
fn sign_data(host: &HostContext) -> ContractResult<Vec<u8>> {
    let hash = host
        .container
        .hash()
        .ok_or_else(|| ContractError::InvalidOperation("nothing to sign against".into()))?;
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&host.settings.network.to_le_bytes());
    data.extend_from_slice(hash.as_bytes());
    Ok(data)
}

pub fn check_sig(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let public_key = engine.pop()?.as_bytes()?;
    let signature = engine.pop()?.as_bytes()?;
    let message = sign_data(host)?;
    let valid = verify_signature(Secp256Curve::R1, &message, &signature, &public_key);
    engine.push(StackItem::Boolean(valid))?;
    Ok(())
}

/// The multisig layout on the stack mirrors the redeem script: the key
/// count, the keys, the signature count, then the signatures pushed by
/// the invocation script.
pub fn check_multisig(host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let keys = pop_counted(engine, 1024)?;
    let signatures = pop_counted(engine, 1024)?;
    if keys.is_empty() || signatures.is_empty() || signatures.len() > keys.len() {
        return Err(ContractError::InvalidArgument(format!(
            "invalid multisig shape {}-of-{}",
            signatures.len(),
            keys.len()
        )));
    }
    host.add_fee(CHECK_SIG_PRICE.saturating_mul(keys.len() as i64))?;
    let message = sign_data(host)?;

    // Signatures must match keys in order; each key is consumed at most
    // once, so fewer remaining keys than signatures is a failure.
    let mut key_index = 0;
    let mut sig_index = 0;
    while sig_index < signatures.len() && key_index < keys.len() {
        if verify_signature(
            Secp256Curve::R1,
            &message,
            &signatures[sig_index],
            &keys[key_index],
        ) {
            sig_index += 1;
        }
        key_index += 1;
        if signatures.len() - sig_index > keys.len() - key_index {
            break;
        }
    }
    engine.push(StackItem::Boolean(sig_index == signatures.len()))?;
    Ok(())
}

/// Pops a count followed by that many byte runs. An array item is also
/// accepted in place of the counted run.
fn pop_counted(engine: &mut ExecutionEngine, max: usize) -> ContractResult<Vec<Vec<u8>>> {
    let first = engine.pop()?;
    if let StackItem::Array(body) = &first {
        let mut output = Vec::with_capacity(body.borrow().len());
        for entry in body.borrow().iter() {
            output.push(entry.as_bytes().map_err(ContractError::Vm)?);
        }
        return Ok(output);
    }
    let count = first.as_index().map_err(ContractError::Vm)?;
    if count == 0 || count > max {
        return Err(ContractError::InvalidArgument(format!(
            "count {count} out of range"
        )));
    }
    let mut output = Vec::with_capacity(count);
    for _ in 0..count {
        output.push(engine.pop()?.as_bytes().map_err(ContractError::Vm)?);
    }
    Ok(output)
}
