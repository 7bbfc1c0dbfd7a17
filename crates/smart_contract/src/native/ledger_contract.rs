// Copyright (C) 2015-2025 The Neo Project.
//
// ledger_contract.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Read-only ledger accessors and the hash-index bookkeeping updated
//! during block persistence.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::native::{native_hash, NativeContract, NativeMethod, LEDGER_ID};
use neo3_core::{Transaction, UInt160, UInt256};
use neo3_io::{BinaryWriter, MemoryReader, Serializable};
use neo3_persistence::{DataCache, StorageItem, StorageKey};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_traits::ToPrimitive;

const PREFIX_BLOCK: u8 = 5;
const PREFIX_BLOCK_HASH: u8 = 9;
const PREFIX_TRANSACTION: u8 = 11;
const PREFIX_CURRENT_BLOCK: u8 = 12;

/// A stored transaction with its execution coordinates.
#[derive(Debug, Clone)]
pub struct TransactionState {
    pub block_index: u32,
    pub vm_state: u8,
    pub transaction: Transaction,
}

/// Records a block's header bytes and transaction hashes.
pub fn put_block(
    snapshot: &DataCache,
    hash: &UInt256,
    index: u32,
    header_bytes: &[u8],
    tx_hashes: &[UInt256],
) -> ContractResult<()> {
    let mut writer = BinaryWriter::new();
    writer.write_var_bytes(header_bytes)?;
    writer.write_var_int(tx_hashes.len() as u64)?;
    for tx_hash in tx_hashes {
        tx_hash.serialize(&mut writer)?;
    }
    snapshot.put(
        StorageKey::with_prefix_bytes(LEDGER_ID, PREFIX_BLOCK, &hash.to_array()),
        StorageItem::new(writer.into_bytes()),
    );
    snapshot.put(
        StorageKey::with_prefix_bytes(LEDGER_ID, PREFIX_BLOCK_HASH, &index.to_be_bytes()),
        StorageItem::new(hash.to_array().to_vec()),
    );
    Ok(())
}

/// Records a transaction with its block index and final VM state.
pub fn put_transaction(
    snapshot: &DataCache,
    transaction: &Transaction,
    block_index: u32,
    vm_state: u8,
) -> ContractResult<()> {
    let mut writer = BinaryWriter::new();
    writer.write_u32(block_index)?;
    writer.write_u8(vm_state)?;
    transaction.serialize(&mut writer)?;
    snapshot.put(
        StorageKey::with_prefix_bytes(LEDGER_ID, PREFIX_TRANSACTION, &transaction.hash().to_array()),
        StorageItem::new(writer.into_bytes()),
    );
    Ok(())
}

/// Reads a stored transaction.
pub fn get_transaction_state(
    snapshot: &DataCache,
    hash: &UInt256,
) -> ContractResult<Option<TransactionState>> {
    let Some(item) = snapshot.try_get(&StorageKey::with_prefix_bytes(
        LEDGER_ID,
        PREFIX_TRANSACTION,
        &hash.to_array(),
    )) else {
        return Ok(None);
    };
    let mut reader = MemoryReader::new(&item.value);
    let block_index = reader.read_u32()?;
    let vm_state = reader.read_u8()?;
    let transaction = Transaction::deserialize(&mut reader)?;
    Ok(Some(TransactionState {
        block_index,
        vm_state,
        transaction,
    }))
}

/// Advances the current-block pointer.
pub fn set_current_block(snapshot: &DataCache, hash: &UInt256, index: u32) -> ContractResult<()> {
    let mut writer = BinaryWriter::new();
    hash.serialize(&mut writer)?;
    writer.write_u32(index)?;
    snapshot.put(
        StorageKey::with_prefix(LEDGER_ID, PREFIX_CURRENT_BLOCK),
        StorageItem::new(writer.into_bytes()),
    );
    Ok(())
}

/// The current chain head, if the ledger is initialized.
pub fn current_block(snapshot: &DataCache) -> Option<(UInt256, u32)> {
    let item = snapshot.try_get(&StorageKey::with_prefix(LEDGER_ID, PREFIX_CURRENT_BLOCK))?;
    let mut reader = MemoryReader::new(&item.value);
    let hash = UInt256::deserialize(&mut reader).ok()?;
    let index = reader.read_u32().ok()?;
    Some((hash, index))
}

/// The block hash at `index`.
pub fn get_block_hash(snapshot: &DataCache, index: u32) -> Option<UInt256> {
    let item = snapshot.try_get(&StorageKey::with_prefix_bytes(
        LEDGER_ID,
        PREFIX_BLOCK_HASH,
        &index.to_be_bytes(),
    ))?;
    UInt256::from_bytes(&item.value).ok()
}

/// The stored header bytes and transaction hashes of a block.
pub fn get_trimmed_block(
    snapshot: &DataCache,
    hash: &UInt256,
) -> ContractResult<Option<(Vec<u8>, Vec<UInt256>)>> {
    let Some(item) = snapshot.try_get(&StorageKey::with_prefix_bytes(
        LEDGER_ID,
        PREFIX_BLOCK,
        &hash.to_array(),
    )) else {
        return Ok(None);
    };
    let mut reader = MemoryReader::new(&item.value);
    let header = reader.read_var_bytes(u16::MAX as usize)?;
    let count = reader.read_var_int(0xFFFF)? as usize;
    let mut hashes = Vec::with_capacity(count);
    for _ in 0..count {
        hashes.push(UInt256::deserialize(&mut reader)?);
    }
    Ok(Some((header, hashes)))
}

/// Parsed header fields sufficient for the script-visible block view.
struct HeaderView {
    version: u32,
    prev_hash: UInt256,
    merkle_root: UInt256,
    timestamp: u64,
    nonce: u64,
    index: u32,
    primary_index: u8,
    next_consensus: UInt160,
}

fn parse_header(bytes: &[u8]) -> ContractResult<HeaderView> {
    let mut reader = MemoryReader::new(bytes);
    Ok(HeaderView {
        version: reader.read_u32()?,
        prev_hash: UInt256::deserialize(&mut reader)?,
        merkle_root: UInt256::deserialize(&mut reader)?,
        timestamp: reader.read_u64()?,
        nonce: reader.read_u64()?,
        index: reader.read_u32()?,
        primary_index: reader.read_u8()?,
        next_consensus: UInt160::deserialize(&mut reader)?,
    })
}

pub struct LedgerContract {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl LedgerContract {
    pub const NAME: &'static str = "LedgerContract";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new("currentHash", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("currentIndex", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("getBlock", &["indexOrHash"], true, 1 << 16, 0, F::READ_STATES, true),
                NativeMethod::new("getTransaction", &["hash"], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new(
                    "getTransactionHeight",
                    &["hash"],
                    true,
                    1 << 15,
                    0,
                    F::READ_STATES,
                    true,
                ),
                NativeMethod::new(
                    "getTransactionVMState",
                    &["hash"],
                    true,
                    1 << 15,
                    0,
                    F::READ_STATES,
                    true,
                ),
            ],
        }
    }

    fn resolve_block_hash(
        &self,
        host: &HostContext,
        selector: &StackItem,
    ) -> ContractResult<Option<UInt256>> {
        let bytes = selector.as_bytes().map_err(ContractError::Vm)?;
        if bytes.len() == 32 {
            return Ok(Some(UInt256::from_bytes(&bytes).map_err(|e| {
                ContractError::InvalidArgument(e.to_string())
            })?));
        }
        let index = selector
            .as_int()
            .map_err(ContractError::Vm)?
            .to_u32()
            .ok_or_else(|| ContractError::InvalidArgument("invalid block index".into()))?;
        Ok(get_block_hash(&host.snapshot, index))
    }
}

impl Default for LedgerContract {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for LedgerContract {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        LEDGER_ID
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
        _engine: &mut ExecutionEngine,
    ) -> ContractResult<Option<StackItem>> {
        match method {
            "currentHash" => {
                let (hash, _) = current_block(&host.snapshot)
                    .ok_or_else(|| ContractError::InvalidOperation("ledger is empty".into()))?;
                Ok(Some(StackItem::from_byte_string(hash.to_array().to_vec())))
            }
            "currentIndex" => {
                let (_, index) = current_block(&host.snapshot)
                    .ok_or_else(|| ContractError::InvalidOperation("ledger is empty".into()))?;
                Ok(Some(StackItem::from_int(index)))
            }
            "getBlock" => {
                let selector = args.remove(0);
                let Some(hash) = self.resolve_block_hash(host, &selector)? else {
                    return Ok(Some(StackItem::Null));
                };
                let Some((header_bytes, tx_hashes)) = get_trimmed_block(&host.snapshot, &hash)?
                else {
                    return Ok(Some(StackItem::Null));
                };
                let header = parse_header(&header_bytes)?;
                Ok(Some(StackItem::new_array(vec![
                    StackItem::from_byte_string(hash.to_array().to_vec()),
                    StackItem::from_int(header.version),
                    StackItem::from_byte_string(header.prev_hash.to_array().to_vec()),
                    StackItem::from_byte_string(header.merkle_root.to_array().to_vec()),
                    StackItem::from_int(header.timestamp),
                    StackItem::from_int(header.nonce),
                    StackItem::from_int(header.index),
                    StackItem::from_int(header.primary_index),
                    StackItem::from_byte_string(header.next_consensus.to_array().to_vec()),
                    StackItem::from_int(tx_hashes.len() as i64),
                ])))
            }
            "getTransaction" => {
                let hash = pop_hash256(&mut args)?;
                match get_transaction_state(&host.snapshot, &hash)? {
                    None => Ok(Some(StackItem::Null)),
                    Some(state) => {
                        let tx = &state.transaction;
                        Ok(Some(StackItem::new_array(vec![
                            StackItem::from_byte_string(tx.hash().to_array().to_vec()),
                            StackItem::from_int(tx.version),
                            StackItem::from_int(tx.nonce),
                            StackItem::from_byte_string(tx.sender().to_array().to_vec()),
                            StackItem::from_int(tx.system_fee),
                            StackItem::from_int(tx.network_fee),
                            StackItem::from_int(tx.valid_until_block),
                            StackItem::from_byte_string(tx.script.clone()),
                        ])))
                    }
                }
            }
            "getTransactionHeight" => {
                let hash = pop_hash256(&mut args)?;
                match get_transaction_state(&host.snapshot, &hash)? {
                    None => Ok(Some(StackItem::from_int(-1))),
                    Some(state) => Ok(Some(StackItem::from_int(state.block_index))),
                }
            }
            "getTransactionVMState" => {
                let hash = pop_hash256(&mut args)?;
                match get_transaction_state(&host.snapshot, &hash)? {
                    None => Ok(Some(StackItem::from_int(0))),
                    Some(state) => Ok(Some(StackItem::from_int(state.vm_state))),
                }
            }
            other => Err(ContractError::MethodNotFound(other.into())),
        }
    }

    /// OnPersist: record the hash-index pair for the persisting block.
    fn on_persist(&self, host: &mut HostContext) -> ContractResult<()> {
        let Some(block) = host.persisting_block.clone() else {
            return Ok(());
        };
        set_current_block(&host.snapshot, &block.hash, block.index)
    }
}

fn pop_hash256(args: &mut Vec<StackItem>) -> ContractResult<UInt256> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing hash".into()));
    }
    let bytes = args.remove(0).as_bytes().map_err(ContractError::Vm)?;
    UInt256::from_bytes(&bytes).map_err(|e| ContractError::InvalidArgument(e.to_string()))
}
