// Copyright (C) 2015-2025 The Neo Project.
//
// oracle_contract.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The oracle request queue and response settlement.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::native::{native_hash, neo_token, NativeContract, NativeMethod, ORACLE_ID};
use neo3_core::transaction::{OracleResponse, TransactionAttribute};
use neo3_core::{hash160, UInt160};
use neo3_io::{BinaryWriter, MemoryReader};
use neo3_persistence::{StorageItem, StorageKey};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_traits::ToPrimitive;

const PREFIX_PRICE: u8 = 5;
const PREFIX_REQUEST_ID: u8 = 9;
const PREFIX_REQUEST: u8 = 7;

const DEFAULT_PRICE: i64 = 50_000_000;
/// Longest accepted request URL.
const MAX_URL_LENGTH: usize = 256;
/// Longest accepted filter expression.
const MAX_FILTER_LENGTH: usize = 128;
/// Longest callback method name.
const MAX_CALLBACK_LENGTH: usize = 32;
/// Smallest gas attached to a response callback.
const MIN_RESPONSE_GAS: i64 = 10_000_000;

/// A queued oracle request.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub original_tx_hash: neo3_core::UInt256,
    pub gas_for_response: i64,
    pub url: String,
    pub filter: Option<String>,
    pub callback_contract: UInt160,
    pub callback_method: String,
    pub user_data: Vec<u8>,
}

impl OracleRequest {
    fn to_bytes(&self) -> ContractResult<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        writer.write_bytes(self.original_tx_hash.as_bytes())?;
        writer.write_i64(self.gas_for_response)?;
        writer.write_var_string(&self.url)?;
        match &self.filter {
            Some(filter) => {
                writer.write_u8(1)?;
                writer.write_var_string(filter)?;
            }
            None => writer.write_u8(0)?,
        }
        writer.write_bytes(&self.callback_contract.to_array())?;
        writer.write_var_string(&self.callback_method)?;
        writer.write_var_bytes(&self.user_data)?;
        Ok(writer.into_bytes())
    }

    fn from_bytes(data: &[u8]) -> ContractResult<Self> {
        let mut reader = MemoryReader::new(data);
        let hash_bytes = reader.read_bytes(32)?;
        let original_tx_hash = neo3_core::UInt256::from_bytes(&hash_bytes)
            .map_err(|e| ContractError::Serialization(e.to_string()))?;
        let gas_for_response = reader.read_i64()?;
        let url = reader.read_var_string(MAX_URL_LENGTH)?;
        let filter = match reader.read_u8()? {
            0 => None,
            _ => Some(reader.read_var_string(MAX_FILTER_LENGTH)?),
        };
        let contract_bytes = reader.read_bytes(20)?;
        let callback_contract = UInt160::from_bytes(&contract_bytes)
            .map_err(|e| ContractError::Serialization(e.to_string()))?;
        let callback_method = reader.read_var_string(MAX_CALLBACK_LENGTH)?;
        let user_data = reader.read_var_bytes(u16::MAX as usize)?;
        Ok(Self {
            original_tx_hash,
            gas_for_response,
            url,
            filter,
            callback_contract,
            callback_method,
            user_data,
        })
    }
}

fn request_key(id: u64) -> StorageKey {
    StorageKey::with_prefix_bytes(ORACLE_ID, PREFIX_REQUEST, &id.to_be_bytes())
}

/// Reads a queued request (oracle nodes poll this through RPC).
pub fn get_request(
    snapshot: &neo3_persistence::DataCache,
    id: u64,
) -> ContractResult<Option<OracleRequest>> {
    match snapshot.try_get(&request_key(id)) {
        Some(item) => Ok(Some(OracleRequest::from_bytes(&item.value)?)),
        None => Ok(None),
    }
}

pub struct OracleContract {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl OracleContract {
    pub const NAME: &'static str = "OracleContract";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new("getPrice", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("setPrice", &["price"], false, 1 << 15, 0, F::STATES, false),
                NativeMethod::new(
                    "request",
                    &["url", "filter", "callback", "userData", "gasForResponse"],
                    false,
                    0,
                    0,
                    F::STATES.union(F::ALLOW_NOTIFY),
                    false,
                ),
                NativeMethod::new("finish", &[], false, 0, 0, F::ALL, false),
            ],
        }
    }

    fn price(&self, host: &HostContext) -> i64 {
        host.snapshot
            .try_get(&StorageKey::with_prefix(ORACLE_ID, PREFIX_PRICE))
            .map(|item| item.as_i64())
            .unwrap_or(DEFAULT_PRICE)
    }

    fn next_request_id(&self, host: &mut HostContext) -> u64 {
        let key = StorageKey::with_prefix(ORACLE_ID, PREFIX_REQUEST_ID);
        let next = host
            .snapshot
            .try_get(&key)
            .map(|item| item.as_i64() as u64)
            .unwrap_or(0);
        host.snapshot
            .put(key, StorageItem::from_i64(next as i64 + 1));
        next
    }

    fn finish(
        &self,
        host: &mut HostContext,
        engine: &mut ExecutionEngine,
    ) -> ContractResult<()> {
        let response = host
            .transaction()
            .and_then(|tx| {
                tx.attribute(|a| match a {
                    TransactionAttribute::OracleResponse(r) => Some(r.clone()),
                    _ => None,
                })
            })
            .ok_or_else(|| {
                ContractError::InvalidOperation("finish requires an oracle response".into())
            })?;
        let request = get_request(&host.snapshot, response.id)?.ok_or_else(|| {
            ContractError::InvalidOperation(format!("unknown oracle request {}", response.id))
        })?;
        host.snapshot.delete(&request_key(response.id));
        host.send_notification(
            self.hash,
            "OracleResponse".into(),
            StackItem::new_array(vec![
                StackItem::from_int(response.id),
                StackItem::from_byte_string(request.original_tx_hash.to_array().to_vec()),
            ]),
        )?;

        let args = vec![
            StackItem::from_byte_string(request.url.into_bytes()),
            StackItem::from_byte_string(request.user_data),
            StackItem::from_int(response.code as u8),
            StackItem::from_byte_string(response.result.clone()),
        ];
        host.call_contract(
            engine,
            request.callback_contract,
            &request.callback_method,
            CallFlags::ALL,
            args,
            true,
        )
    }
}

impl Default for OracleContract {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for OracleContract {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        ORACLE_ID
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
            "getPrice" => Ok(Some(StackItem::from_int(self.price(host)))),
            "setPrice" => {
                let price = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_i64()
                    .filter(|p| *p > 0)
                    .ok_or_else(|| ContractError::InvalidArgument("invalid price".into()))?;
                let committee = neo_token::committee_address(host)?;
                if !host.check_witness(engine, &committee)? {
                    return Err(ContractError::InvalidOperation(
                        "committee witness required".into(),
                    ));
                }
                host.snapshot.put(
                    StorageKey::with_prefix(ORACLE_ID, PREFIX_PRICE),
                    StorageItem::from_i64(price),
                );
                Ok(None)
            }
            "request" => {
                let url = pop_string(&mut args, MAX_URL_LENGTH)?;
                let filter = match args.remove(0) {
                    item if item.is_null() => None,
                    item => Some(String::from_utf8(item.as_bytes().map_err(ContractError::Vm)?)
                        .map_err(|_| {
                            ContractError::InvalidArgument("filter is not UTF-8".into())
                        })?),
                };
                if filter.as_ref().is_some_and(|f| f.len() > MAX_FILTER_LENGTH) {
                    return Err(ContractError::InvalidArgument("filter too long".into()));
                }
                let callback = pop_string(&mut args, MAX_CALLBACK_LENGTH)?;
                if callback.starts_with('_') {
                    return Err(ContractError::InvalidArgument(
                        "callback cannot be a reserved method".into(),
                    ));
                }
                let user_data_item = args.remove(0);
                let user_data = crate::binary_serializer::serialize(
                    &user_data_item,
                    crate::application_engine::MAX_NOTIFICATION_SIZE,
                )?;
                let gas_for_response = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_i64()
                    .filter(|g| *g >= MIN_RESPONSE_GAS)
                    .ok_or_else(|| {
                        ContractError::InvalidArgument("response gas below the minimum".into())
                    })?;

                host.add_fee_unscaled(self.price(host))?;
                host.add_fee_unscaled(gas_for_response)?;

                let callback_contract = engine
                    .current_context()
                    .and_then(|c| c.state.calling_script_hash)
                    .map(UInt160::from)
                    .ok_or_else(|| {
                        ContractError::InvalidOperation("request has no calling contract".into())
                    })?;
                let tx_hash = host
                    .transaction()
                    .map(|tx| tx.hash())
                    .ok_or_else(|| {
                        ContractError::InvalidOperation("request requires a transaction".into())
                    })?;

                let id = self.next_request_id(host);
                let request = OracleRequest {
                    original_tx_hash: tx_hash,
                    gas_for_response,
                    url: url.clone(),
                    filter,
                    callback_contract,
                    callback_method: callback,
                    user_data,
                };
                host.snapshot
                    .put(request_key(id), StorageItem::new(request.to_bytes()?));
                host.send_notification(
                    self.hash,
                    "OracleRequest".into(),
                    StackItem::new_array(vec![
                        StackItem::from_int(id),
                        StackItem::from_byte_string(callback_contract.to_array().to_vec()),
                        StackItem::from_byte_string(url.into_bytes()),
                    ]),
                )?;
                Ok(None)
            }
            "finish" => {
                self.finish(host, engine)?;
                Ok(None)
            }
            other => Err(ContractError::MethodNotFound(other.into())),
        }
    }
}

/// The oracle response transaction's fixed account: the hash of an empty
/// verification surrogate tied to the oracle role.
pub fn oracle_response_account() -> UInt160 {
    UInt160::from(hash160(b"oracle-response"))
}

fn pop_string(args: &mut Vec<StackItem>, max: usize) -> ContractResult<String> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing argument".into()));
    }
    let bytes = args.remove(0).as_bytes().map_err(ContractError::Vm)?;
    if bytes.len() > max {
        return Err(ContractError::InvalidArgument("input too long".into()));
    }
    String::from_utf8(bytes).map_err(|_| ContractError::InvalidArgument("input is not UTF-8".into()))
}
