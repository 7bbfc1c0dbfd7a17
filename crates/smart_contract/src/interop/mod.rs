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

//! The syscall registry.
//!
//! Syscalls are addressed by the first four little-endian bytes of the
//! sha256 of their name. The registry is a static table built once; user
//! contracts cannot register anything at runtime.

pub mod contract;
pub mod crypto;
pub mod iterator;
pub mod runtime;
pub mod storage;

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use neo3_crypto::hash::interop_method_hash;
use neo3_vm::{CallFlags, ExecutionEngine};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Handler signature shared by every syscall.
pub type SyscallHandler = fn(&mut HostContext, &mut ExecutionEngine) -> ContractResult<()>;

/// One registered syscall.
pub struct InteropDescriptor {
    pub name: &'static str,
    /// Base price, scaled by the execution-fee factor; handlers charge
    /// any size-dependent remainder themselves.
    pub price: i64,
    pub required_flags: CallFlags,
    pub handler: SyscallHandler,
}

macro_rules! descriptor {
    ($name:literal, $price:expr, $flags:expr, $handler:path) => {
        InteropDescriptor {
            name: $name,
            price: $price,
            required_flags: $flags,
            handler: $handler,
        }
    };
}

fn descriptors() -> Vec<InteropDescriptor> {
    use CallFlags as F;
    vec![
        // Runtime
        descriptor!("System.Runtime.Platform", 8, F::NONE, runtime::platform),
        descriptor!("System.Runtime.GetNetwork", 8, F::NONE, runtime::get_network),
        descriptor!("System.Runtime.GetAddressVersion", 8, F::NONE, runtime::get_address_version),
        descriptor!("System.Runtime.GetTrigger", 8, F::NONE, runtime::get_trigger),
        descriptor!("System.Runtime.GetTime", 8, F::NONE, runtime::get_time),
        descriptor!("System.Runtime.GetScriptContainer", 8, F::NONE, runtime::get_script_container),
        descriptor!("System.Runtime.GetExecutingScriptHash", 16, F::NONE, runtime::get_executing_script_hash),
        descriptor!("System.Runtime.GetCallingScriptHash", 16, F::NONE, runtime::get_calling_script_hash),
        descriptor!("System.Runtime.GetEntryScriptHash", 16, F::NONE, runtime::get_entry_script_hash),
        descriptor!("System.Runtime.CheckWitness", 1 << 10, F::NONE, runtime::check_witness),
        descriptor!("System.Runtime.GetInvocationCounter", 16, F::NONE, runtime::get_invocation_counter),
        descriptor!("System.Runtime.GetRandom", 16, F::NONE, runtime::get_random),
        descriptor!("System.Runtime.Log", 1 << 15, F::ALLOW_NOTIFY, runtime::log),
        descriptor!("System.Runtime.Notify", 1 << 15, F::ALLOW_NOTIFY, runtime::notify),
        descriptor!("System.Runtime.GetNotifications", 1 << 8, F::NONE, runtime::get_notifications),
        descriptor!("System.Runtime.GasLeft", 16, F::NONE, runtime::gas_left),
        descriptor!("System.Runtime.BurnGas", 16, F::NONE, runtime::burn_gas),
        descriptor!("System.Runtime.LoadScript", 1 << 15, F::ALLOW_CALL, runtime::load_script),
        // Storage
        descriptor!("System.Storage.GetContext", 16, F::READ_STATES, storage::get_context),
        descriptor!("System.Storage.GetReadOnlyContext", 16, F::READ_STATES, storage::get_read_only_context),
        descriptor!("System.Storage.AsReadOnly", 16, F::READ_STATES, storage::as_read_only),
        descriptor!("System.Storage.Get", 1 << 15, F::READ_STATES, storage::get),
        descriptor!("System.Storage.Put", 1 << 15, F::WRITE_STATES, storage::put),
        descriptor!("System.Storage.Delete", 1 << 15, F::WRITE_STATES, storage::delete),
        descriptor!("System.Storage.Find", 1 << 15, F::READ_STATES, storage::find),
        // Iterators
        descriptor!("System.Iterator.Next", 1 << 15, F::NONE, iterator::next),
        descriptor!("System.Iterator.Value", 16, F::NONE, iterator::value),
        // Contracts
        descriptor!("System.Contract.Call", 1 << 15, F::READ_STATES.union(F::ALLOW_CALL), contract::call),
        descriptor!("System.Contract.CallNative", 0, F::NONE, contract::call_native),
        descriptor!("System.Contract.GetCallFlags", 1 << 10, F::NONE, contract::get_call_flags),
        descriptor!("System.Contract.CreateStandardAccount", 1 << 8, F::NONE, contract::create_standard_account),
        descriptor!("System.Contract.CreateMultisigAccount", 1 << 8, F::NONE, contract::create_multisig_account),
        // Crypto
        descriptor!("System.Crypto.CheckSig", crate::gas::CHECK_SIG_PRICE, F::NONE, crypto::check_sig),
        descriptor!("System.Crypto.CheckMultisig", 0, F::NONE, crypto::check_multisig),
    ]
}

static REGISTRY: Lazy<HashMap<u32, InteropDescriptor>> = Lazy::new(|| {
    descriptors()
        .into_iter()
        .map(|d| (interop_method_hash(d.name), d))
        .collect()
});

/// The id of a syscall name.
pub fn method_hash(name: &str) -> u32 {
    interop_method_hash(name)
}

/// Looks up a descriptor by id.
pub fn descriptor(hash: u32) -> Option<&'static InteropDescriptor> {
    REGISTRY.get(&hash)
}

/// Dispatches a syscall: flag check, base fee, handler.
pub fn dispatch(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
    hash: u32,
) -> ContractResult<()> {
    let descriptor = REGISTRY
        .get(&hash)
        .ok_or_else(|| ContractError::InvalidOperation(format!("unknown syscall 0x{hash:08x}")))?;
    let granted = engine
        .current_context()
        .map(|c| c.state.call_flags)
        .unwrap_or(CallFlags::NONE);
    if !granted.contains(descriptor.required_flags) {
        return Err(ContractError::MissingCallFlags(descriptor.name.into()));
    }
    host.add_fee(descriptor.price)?;
    (descriptor.handler)(host, engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_no_hash_collisions() {
        assert_eq!(REGISTRY.len(), descriptors().len());
    }

    #[test]
    fn test_lookup_by_name_hash() {
        let hash = method_hash("System.Runtime.Platform");
        assert_eq!(descriptor(hash).unwrap().name, "System.Runtime.Platform");
        assert!(descriptor(0xDEAD_BEEF).is_none());
    }
}
