// Copyright (C) 2015-2025 The Neo Project.
//
// contract_management.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Deploy, update and destroy user contracts; assign monotonic ids.

use crate::application_engine::HostContext;
use crate::contract_state::{get_contract_hash, ContractState, NefFile};
use crate::error::{ContractError, ContractResult};
use crate::manifest::ContractManifest;
use crate::native::{native_hash, NativeContract, NativeMethod, CONTRACT_MANAGEMENT_ID};
use crate::trigger::TriggerType;
use lru::LruCache;
use neo3_core::UInt160;
use neo3_io::SerializableExt;
use neo3_persistence::{DataCache, StorageItem, StorageKey};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

const PREFIX_CONTRACT: u8 = 8;
const PREFIX_CONTRACT_HASH: u8 = 12;
const PREFIX_NEXT_ID: u8 = 15;
const PREFIX_MIN_DEPLOY_FEE: u8 = 20;

const DEFAULT_MIN_DEPLOY_FEE: i64 = 10 * 100_000_000;

/// Capacity of the parsed contract-state cache.
const CONTRACT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Parsed states keyed by hash, each pinned to the raw storage bytes it
/// was decoded from. A lookup only reuses an entry when the stored bytes
/// still match, so updates and destroys never serve stale state. Shared
/// read-only across worker threads.
static CONTRACT_CACHE: Lazy<Mutex<LruCache<UInt160, (Vec<u8>, ContractState)>>> =
    Lazy::new(|| Mutex::new(LruCache::new(CONTRACT_CACHE_CAPACITY)));

fn contract_key(hash: &UInt160) -> StorageKey {
    StorageKey::with_prefix_bytes(CONTRACT_MANAGEMENT_ID, PREFIX_CONTRACT, &hash.to_array())
}

/// Reads a deployed contract's state from a snapshot.
///
/// NEF and manifest parsing dominate the lookup cost, so decoded states
/// are memoized against their raw bytes.
pub fn get_contract(snapshot: &DataCache, hash: &UInt160) -> Option<ContractState> {
    let raw = snapshot.try_get(&contract_key(hash))?.value;
    let mut cache = CONTRACT_CACHE.lock();
    if let Some((bytes, state)) = cache.get(hash) {
        if *bytes == raw {
            return Some(state.clone());
        }
    }
    let state = ContractState::from_storage_bytes(&raw).ok()?;
    cache.put(*hash, (raw, state.clone()));
    Some(state)
}

/// Reads a deployed contract by id.
pub fn get_contract_by_id(snapshot: &DataCache, id: i32) -> Option<ContractState> {
    let hash_item = snapshot.try_get(&StorageKey::with_prefix_bytes(
        CONTRACT_MANAGEMENT_ID,
        PREFIX_CONTRACT_HASH,
        &id.to_be_bytes(),
    ))?;
    let hash = UInt160::from_bytes(&hash_item.value).ok()?;
    get_contract(snapshot, &hash)
}

fn put_contract(snapshot: &DataCache, state: &ContractState) -> ContractResult<()> {
    snapshot.put(
        contract_key(&state.hash),
        StorageItem::new(state.to_storage_bytes()?),
    );
    snapshot.put(
        StorageKey::with_prefix_bytes(
            CONTRACT_MANAGEMENT_ID,
            PREFIX_CONTRACT_HASH,
            &state.id.to_be_bytes(),
        ),
        StorageItem::new(state.hash.to_array().to_vec()),
    );
    Ok(())
}

pub struct ContractManagement {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl ContractManagement {
    pub const NAME: &'static str = "ContractManagement";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new("getContract", &["hash"], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("getContractById", &["id"], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new(
                    "hasMethod",
                    &["hash", "method", "pcount"],
                    true,
                    1 << 15,
                    0,
                    F::READ_STATES,
                    true,
                ),
                NativeMethod::new("getMinimumDeploymentFee", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new(
                    "setMinimumDeploymentFee",
                    &["value"],
                    false,
                    1 << 15,
                    0,
                    F::STATES,
                    false,
                ),
                NativeMethod::new(
                    "deploy",
                    &["nefFile", "manifest"],
                    true,
                    0,
                    0,
                    F::ALL,
                    false,
                ),
                NativeMethod::new(
                    "deploy",
                    &["nefFile", "manifest", "data"],
                    true,
                    0,
                    0,
                    F::ALL,
                    false,
                ),
                NativeMethod::new("update", &["nefFile", "manifest"], false, 0, 0, F::ALL, false),
                NativeMethod::new(
                    "update",
                    &["nefFile", "manifest", "data"],
                    false,
                    0,
                    0,
                    F::ALL,
                    false,
                ),
                NativeMethod::new("destroy", &[], false, 1 << 15, 0, F::ALL, false),
            ],
        }
    }

    fn next_id(&self, host: &mut HostContext) -> i32 {
        let key = StorageKey::with_prefix(CONTRACT_MANAGEMENT_ID, PREFIX_NEXT_ID);
        let next = host
            .snapshot
            .try_get(&key)
            .map(|item| item.as_i64() as i32)
            .unwrap_or(1);
        host.snapshot
            .put(key, StorageItem::from_i64(i64::from(next) + 1));
        next
    }

    fn deploy(
        &self,
        host: &mut HostContext,
        engine: &mut ExecutionEngine,
        nef_bytes: Vec<u8>,
        manifest_bytes: Vec<u8>,
        data: StackItem,
    ) -> ContractResult<ContractState> {
        if host.trigger != TriggerType::Application {
            return Err(ContractError::InvalidOperation(
                "deploy requires the application trigger".into(),
            ));
        }
        let sender = host
            .transaction()
            .map(|tx| tx.sender())
            .ok_or_else(|| ContractError::InvalidOperation("deploy requires a transaction".into()))?;

        let min_fee = self.min_deploy_fee(host);
        let storage_fee =
            (nef_bytes.len() + manifest_bytes.len()) as i64 * i64::from(host.storage_price);
        host.add_fee_unscaled(min_fee.max(storage_fee))?;

        let nef = NefFile::from_array(&nef_bytes)?;
        nef.validate()?;
        let manifest = ContractManifest::parse(&manifest_bytes)?;
        let hash = get_contract_hash(&sender, nef.checksum, &manifest.name);
        if get_contract(&host.snapshot, &hash).is_some() || host.natives.is_native(&hash) {
            return Err(ContractError::InvalidOperation(format!(
                "contract {hash} already exists"
            )));
        }

        let state = ContractState {
            id: self.next_id(host),
            update_counter: 0,
            hash,
            nef,
            manifest,
        };
        put_contract(&host.snapshot, &state)?;
        host.send_notification(
            self.hash,
            "Deploy".into(),
            StackItem::new_array(vec![StackItem::from_byte_string(
                hash.to_array().to_vec(),
            )]),
        )?;
        host.call_special(
            engine,
            &state,
            "_deploy",
            vec![data, StackItem::from_bool(false)],
        )?;
        Ok(state)
    }

    fn update(
        &self,
        host: &mut HostContext,
        engine: &mut ExecutionEngine,
        nef_bytes: Option<Vec<u8>>,
        manifest_bytes: Option<Vec<u8>>,
        data: StackItem,
    ) -> ContractResult<()> {
        // The calling contract updates itself.
        let caller = engine
            .current_context()
            .and_then(|c| c.state.calling_script_hash)
            .map(UInt160::from)
            .ok_or_else(|| ContractError::InvalidOperation("update has no caller".into()))?;
        let mut state = get_contract(&host.snapshot, &caller)
            .ok_or_else(|| ContractError::ContractNotFound(caller.to_string()))?;

        if nef_bytes.is_none() && manifest_bytes.is_none() {
            return Err(ContractError::InvalidArgument(
                "update requires a nef or a manifest".into(),
            ));
        }
        let storage_fee = (nef_bytes.as_ref().map_or(0, Vec::len)
            + manifest_bytes.as_ref().map_or(0, Vec::len)) as i64
            * i64::from(host.storage_price);
        host.add_fee_unscaled(storage_fee)?;

        if let Some(bytes) = nef_bytes {
            let nef = NefFile::from_array(&bytes)?;
            nef.validate()?;
            state.nef = nef;
        }
        if let Some(bytes) = manifest_bytes {
            let manifest = ContractManifest::parse(&bytes)?;
            if manifest.name != state.manifest.name {
                return Err(ContractError::InvalidArgument(
                    "update cannot rename a contract".into(),
                ));
            }
            state.manifest = manifest;
        }
        state.update_counter += 1;
        put_contract(&host.snapshot, &state)?;
        host.send_notification(
            self.hash,
            "Update".into(),
            StackItem::new_array(vec![StackItem::from_byte_string(
                state.hash.to_array().to_vec(),
            )]),
        )?;
        host.call_special(
            engine,
            &state,
            "_deploy",
            vec![data, StackItem::from_bool(true)],
        )?;
        Ok(())
    }

    fn destroy(&self, host: &mut HostContext, engine: &ExecutionEngine) -> ContractResult<()> {
        let caller = engine
            .current_context()
            .and_then(|c| c.state.calling_script_hash)
            .map(UInt160::from)
            .ok_or_else(|| ContractError::InvalidOperation("destroy has no caller".into()))?;
        let Some(state) = get_contract(&host.snapshot, &caller) else {
            return Ok(());
        };
        host.snapshot.delete(&contract_key(&state.hash));
        host.snapshot.delete(&StorageKey::with_prefix_bytes(
            CONTRACT_MANAGEMENT_ID,
            PREFIX_CONTRACT_HASH,
            &state.id.to_be_bytes(),
        ));
        // Remove the contract's entire storage space.
        for (key, _) in host.snapshot.find_contract(state.id, &[]) {
            host.snapshot.delete(&key);
        }
        host.send_notification(
            self.hash,
            "Destroy".into(),
            StackItem::new_array(vec![StackItem::from_byte_string(
                state.hash.to_array().to_vec(),
            )]),
        )
    }

    fn min_deploy_fee(&self, host: &HostContext) -> i64 {
        host.snapshot
            .try_get(&StorageKey::with_prefix(
                CONTRACT_MANAGEMENT_ID,
                PREFIX_MIN_DEPLOY_FEE,
            ))
            .map(|item| item.as_i64())
            .unwrap_or(DEFAULT_MIN_DEPLOY_FEE)
    }
}

impl Default for ContractManagement {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for ContractManagement {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        CONTRACT_MANAGEMENT_ID
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
        match (method, args.len()) {
            ("getContract", _) => {
                let bytes = args.remove(0).as_bytes().map_err(ContractError::Vm)?;
                let hash = UInt160::from_bytes(&bytes)
                    .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
                let state = host
                    .natives
                    .contract_state(&hash)
                    .cloned()
                    .or_else(|| get_contract(&host.snapshot, &hash));
                Ok(Some(contract_to_item(state)?))
            }
            ("getContractById", _) => {
                let id = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_i32()
                    .ok_or_else(|| ContractError::InvalidArgument("invalid id".into()))?;
                let state = if id < 0 {
                    host.natives
                        .by_id(id)
                        .and_then(|n| host.natives.contract_state(&n.hash()).cloned())
                } else {
                    get_contract_by_id(&host.snapshot, id)
                };
                Ok(Some(contract_to_item(state)?))
            }
            ("hasMethod", _) => {
                let bytes = args.remove(0).as_bytes().map_err(ContractError::Vm)?;
                let hash = UInt160::from_bytes(&bytes)
                    .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
                let name = String::from_utf8(args.remove(0).as_bytes().map_err(ContractError::Vm)?)
                    .map_err(|_| ContractError::InvalidArgument("method is not UTF-8".into()))?;
                let pcount = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_usize()
                    .ok_or_else(|| ContractError::InvalidArgument("invalid count".into()))?;
                let found = host
                    .try_get_contract(&hash)
                    .map(|c| c.manifest.abi.method(&name, pcount).is_some())
                    .unwrap_or(false);
                Ok(Some(StackItem::Boolean(found)))
            }
            ("getMinimumDeploymentFee", _) => {
                Ok(Some(StackItem::from_int(self.min_deploy_fee(host))))
            }
            ("setMinimumDeploymentFee", _) => {
                let value = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_i64()
                    .filter(|v| *v >= 0)
                    .ok_or_else(|| ContractError::InvalidArgument("invalid fee".into()))?;
                let committee = crate::native::neo_token::committee_address(host)?;
                if !host.check_witness(engine, &committee)? {
                    return Err(ContractError::InvalidOperation(
                        "committee witness required".into(),
                    ));
                }
                host.snapshot.put(
                    StorageKey::with_prefix(CONTRACT_MANAGEMENT_ID, PREFIX_MIN_DEPLOY_FEE),
                    StorageItem::from_i64(value),
                );
                Ok(None)
            }
            ("deploy", arity) => {
                let nef_bytes = args.remove(0).as_bytes().map_err(ContractError::Vm)?;
                let manifest_bytes = args.remove(0).as_bytes().map_err(ContractError::Vm)?;
                let data = if arity == 3 {
                    args.remove(0)
                } else {
                    StackItem::Null
                };
                let state = self.deploy(host, engine, nef_bytes, manifest_bytes, data)?;
                Ok(Some(contract_to_item(Some(state))?))
            }
            ("update", arity) => {
                let nef_bytes = optional_bytes(args.remove(0))?;
                let manifest_bytes = optional_bytes(args.remove(0))?;
                let data = if arity == 3 {
                    args.remove(0)
                } else {
                    StackItem::Null
                };
                self.update(host, engine, nef_bytes, manifest_bytes, data)?;
                Ok(None)
            }
            ("destroy", _) => {
                self.destroy(host, engine)?;
                Ok(None)
            }
            (other, _) => Err(ContractError::MethodNotFound(other.into())),
        }
    }

    fn initialize(&self, host: &mut HostContext) -> ContractResult<()> {
        host.snapshot.put(
            StorageKey::with_prefix(CONTRACT_MANAGEMENT_ID, PREFIX_NEXT_ID),
            StorageItem::from_i64(1),
        );
        host.snapshot.put(
            StorageKey::with_prefix(CONTRACT_MANAGEMENT_ID, PREFIX_MIN_DEPLOY_FEE),
            StorageItem::from_i64(DEFAULT_MIN_DEPLOY_FEE),
        );
        Ok(())
    }
}

fn optional_bytes(item: StackItem) -> ContractResult<Option<Vec<u8>>> {
    if item.is_null() {
        return Ok(None);
    }
    Ok(Some(item.as_bytes().map_err(ContractError::Vm)?))
}

fn contract_to_item(state: Option<ContractState>) -> ContractResult<StackItem> {
    match state {
        None => Ok(StackItem::Null),
        Some(state) => Ok(StackItem::new_array(vec![
            StackItem::from_int(state.id),
            StackItem::from_int(state.update_counter),
            StackItem::from_byte_string(state.hash.to_array().to_vec()),
            StackItem::from_byte_string(state.nef.to_array()),
            StackItem::from_byte_string(state.manifest.to_bytes()?),
        ])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_persistence::{MemoryStore, Store};
    use std::sync::Arc;

    fn snapshot() -> Arc<DataCache> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Arc::new(DataCache::new(store))
    }

    fn sample_state(tag: &[u8], update_counter: u16) -> ContractState {
        let nef = NefFile::new("neo3-rs", vec![0x40]).unwrap();
        ContractState {
            id: 7,
            update_counter,
            hash: UInt160::from_script(tag),
            nef,
            manifest: ContractManifest::new("sample"),
        }
    }

    #[test]
    fn test_get_contract_roundtrip_through_cache() {
        let snapshot = snapshot();
        let state = sample_state(b"cached-roundtrip", 0);
        put_contract(&snapshot, &state).unwrap();

        // Cold and warm lookups agree.
        assert_eq!(get_contract(&snapshot, &state.hash).unwrap(), state);
        assert_eq!(get_contract(&snapshot, &state.hash).unwrap(), state);
        assert!(get_contract(&snapshot, &UInt160::from_script(b"absent")).is_none());
    }

    #[test]
    fn test_cache_never_serves_stale_state() {
        let snapshot = snapshot();
        let state = sample_state(b"cached-update", 0);
        put_contract(&snapshot, &state).unwrap();
        assert_eq!(get_contract(&snapshot, &state.hash).unwrap().update_counter, 0);

        // An update rewrites the stored bytes; the next lookup must see
        // the new counter, not the memoized entry.
        let mut updated = state.clone();
        updated.update_counter = 1;
        put_contract(&snapshot, &updated).unwrap();
        assert_eq!(get_contract(&snapshot, &state.hash).unwrap().update_counter, 1);

        // A destroy removes the entry entirely.
        snapshot.delete(&contract_key(&state.hash));
        assert!(get_contract(&snapshot, &state.hash).is_none());
    }
}
