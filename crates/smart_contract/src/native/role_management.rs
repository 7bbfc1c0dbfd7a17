// Copyright (C) 2015-2025 The Neo Project.
//
// role_management.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Committee-signed assignment of public keys to node roles.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::native::{native_hash, neo_token, NativeContract, NativeMethod, ROLE_MANAGEMENT_ID};
use neo3_core::UInt160;
use neo3_crypto::ECPoint;
use neo3_io::{BinaryWriter, MemoryReader};
use neo3_persistence::{DataCache, SeekDirection, StorageItem, StorageKey};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_traits::ToPrimitive;

/// Designable node roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Role {
    StateValidator = 4,
    Oracle = 8,
    NeoFSAlphabetNode = 16,
}

impl Role {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            4 => Some(Self::StateValidator),
            8 => Some(Self::Oracle),
            16 => Some(Self::NeoFSAlphabetNode),
            _ => None,
        }
    }
}

fn role_key(role: Role, index: u32) -> StorageKey {
    // Big-endian index keeps the per-role records in height order.
    StorageKey::with_prefix_bytes(ROLE_MANAGEMENT_ID, role as u8, &index.to_be_bytes())
}

fn encode_nodes(nodes: &[ECPoint]) -> Vec<u8> {
    let mut writer = BinaryWriter::new();
    let _ = writer.write_var_int(nodes.len() as u64);
    for node in nodes {
        let _ = writer.write_bytes(node.as_bytes());
    }
    writer.into_bytes()
}

fn decode_nodes(data: &[u8]) -> ContractResult<Vec<ECPoint>> {
    let mut reader = MemoryReader::new(data);
    let count = reader.read_var_int(1024)? as usize;
    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        let bytes = reader.read_bytes(33)?;
        nodes.push(
            ECPoint::from_bytes(&bytes)
                .map_err(|e| ContractError::InvalidArgument(e.to_string()))?,
        );
    }
    Ok(nodes)
}

/// Nodes designated to `role` at or below `index`, directly from a
/// snapshot (consensus and oracle services read this without an engine).
pub fn designated_by_role(
    snapshot: &DataCache,
    role: Role,
    index: u32,
) -> ContractResult<Vec<ECPoint>> {
    let mut result = Vec::new();
    for (key, item) in snapshot.find(
        &{
            let mut prefix = Vec::with_capacity(5);
            prefix.extend_from_slice(&ROLE_MANAGEMENT_ID.to_le_bytes());
            prefix.push(role as u8);
            prefix
        },
        SeekDirection::Forward,
    ) {
        if key.key.len() != 5 {
            continue;
        }
        let mut idx = [0u8; 4];
        idx.copy_from_slice(&key.key[1..]);
        if u32::from_be_bytes(idx) > index {
            break;
        }
        result = decode_nodes(&item.value)?;
    }
    Ok(result)
}

pub struct RoleManagement {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl RoleManagement {
    pub const NAME: &'static str = "RoleManagement";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new(
                    "getDesignatedByRole",
                    &["role", "index"],
                    true,
                    1 << 15,
                    0,
                    F::READ_STATES,
                    true,
                ),
                NativeMethod::new(
                    "designateAsRole",
                    &["role", "nodes"],
                    false,
                    1 << 15,
                    0,
                    F::STATES.union(F::ALLOW_NOTIFY),
                    false,
                ),
            ],
        }
    }
}

impl Default for RoleManagement {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for RoleManagement {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        ROLE_MANAGEMENT_ID
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
            "getDesignatedByRole" => {
                let role = pop_role(&mut args)?;
                let index = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_u32()
                    .ok_or_else(|| ContractError::InvalidArgument("invalid index".into()))?;
                let current = host
                    .persisting_block
                    .as_ref()
                    .map(|b| b.index + 1)
                    .unwrap_or(u32::MAX);
                if index > current {
                    return Err(ContractError::InvalidArgument(
                        "cannot query a future designation".into(),
                    ));
                }
                let nodes = designated_by_role(&host.snapshot, role, index)?;
                Ok(Some(StackItem::new_array(
                    nodes
                        .iter()
                        .map(|n| StackItem::from_byte_string(n.as_bytes().to_vec()))
                        .collect(),
                )))
            }
            "designateAsRole" => {
                let role = pop_role(&mut args)?;
                let nodes_item = args.remove(0);
                let StackItem::Array(body) = &nodes_item else {
                    return Err(ContractError::InvalidArgument("nodes must be an array".into()));
                };
                let mut nodes = Vec::with_capacity(body.borrow().len());
                for item in body.borrow().iter() {
                    let bytes = item.as_bytes().map_err(ContractError::Vm)?;
                    nodes.push(
                        ECPoint::from_bytes(&bytes)
                            .map_err(|e| ContractError::InvalidArgument(e.to_string()))?,
                    );
                }
                if nodes.is_empty() || nodes.len() > 32 {
                    return Err(ContractError::InvalidArgument(format!(
                        "{} designated nodes out of range",
                        nodes.len()
                    )));
                }
                let committee = neo_token::committee_address(host)?;
                if !host.check_witness(engine, &committee)? {
                    return Err(ContractError::InvalidOperation(
                        "committee witness required".into(),
                    ));
                }
                let block = host
                    .persisting_block
                    .as_ref()
                    .ok_or_else(|| {
                        ContractError::InvalidOperation("designation requires a block".into())
                    })?
                    .clone();
                nodes.sort();
                host.snapshot.put(
                    role_key(role, block.index + 1),
                    StorageItem::new(encode_nodes(&nodes)),
                );
                host.send_notification(
                    self.hash,
                    "Designation".into(),
                    StackItem::new_array(vec![
                        StackItem::from_int(role as u8),
                        StackItem::from_int(block.index),
                    ]),
                )?;
                Ok(None)
            }
            other => Err(ContractError::MethodNotFound(other.into())),
        }
    }
}

fn pop_role(args: &mut Vec<StackItem>) -> ContractResult<Role> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing role".into()));
    }
    let value = args.remove(0).as_int().map_err(ContractError::Vm)?;
    let byte = value
        .to_u8()
        .ok_or_else(|| ContractError::InvalidArgument("invalid role".into()))?;
    Role::from_byte(byte).ok_or_else(|| ContractError::InvalidArgument(format!("unknown role {byte}")))
}
