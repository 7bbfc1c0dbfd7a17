// Copyright (C) 2015-2025 The Neo Project.
//
// methods.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The RPC method registry.

use crate::types::{RpcError, RpcRequest, RpcResponse};
use base64::Engine as _;
use dashmap::DashMap;
use neo3_config::RpcConfig;
use neo3_contract::native::contract_management;
use neo3_contract::{json_serializer, ContractState};
use neo3_core::{Signer, Transaction, UInt160, UInt256, WitnessScope};
use neo3_io::SerializableExt;
use neo3_ledger::state_root::{get_state_root, state_height};
use neo3_ledger::{Block, Blockchain};
use neo3_network::PeerManager;
use neo3_persistence::StorageKey;
use neo3_vm::stack_item::StackItem;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Items materialized per iterator session at invoke time.
const MAX_ITERATOR_ITEMS: usize = 2048;

struct IteratorSession {
    items: Vec<Value>,
    position: usize,
    last_access: Instant,
}

/// Dispatches JSON-RPC requests against the ledger.
pub struct RpcHandler {
    blockchain: Arc<Blockchain>,
    peers: Option<Arc<PeerManager>>,
    config: RpcConfig,
    sessions: DashMap<Uuid, IteratorSession>,
}

impl RpcHandler {
    pub fn new(
        blockchain: Arc<Blockchain>,
        peers: Option<Arc<PeerManager>>,
        config: RpcConfig,
    ) -> Self {
        Self {
            blockchain,
            peers,
            config,
            sessions: DashMap::new(),
        }
    }

    /// Drops iterator sessions idle past the configured expiry.
    pub fn expire_sessions(&self) {
        let ttl = Duration::from_secs(self.config.session_expiration_time);
        self.sessions
            .retain(|_, session| session.last_access.elapsed() < ttl);
    }

    /// Handles one request envelope.
    pub fn handle(&self, request: RpcRequest) -> RpcResponse {
        let id = request.id.clone();
        match self.dispatch(&request) {
            Ok(result) => RpcResponse::success(id, result),
            Err(error) => RpcResponse::failure(id, error),
        }
    }

    fn dispatch(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let params = &request.params;
        debug!(method = %request.method, "rpc request");
        match request.method.as_str() {
            "getversion" => self.get_version(),
            "getblockcount" => Ok(json!(self.blockchain.height() + 1)),
            "getblockhash" => {
                let index = param_u32(params, 0)?;
                let hash = self
                    .blockchain
                    .block_hash(index)
                    .ok_or(RpcError::UnknownBlock)?;
                Ok(json!(hash))
            }
            "getblock" => self.get_block(params, true),
            "getblockheader" => self.get_block(params, false),
            "getrawtransaction" => self.get_raw_transaction(params),
            "sendrawtransaction" => self.send_raw_transaction(params),
            "getcontractstate" => self.get_contract_state(params),
            "invokefunction" => self.invoke_function(params),
            "invokescript" => self.invoke_script(params),
            "traverseiterator" => self.traverse_iterator(params),
            "terminatesession" => self.terminate_session(params),
            "getnep17balances" => self.get_nep17_balances(params),
            "getstate" => self.get_state(params),
            "getstateroot" => self.get_state_root(params),
            "getstateheight" => self.get_state_height(),
            "findstates" => self.find_states(params),
            "getpeers" => self.get_peers(),
            "getconnectioncount" => Ok(json!(self
                .peers
                .as_ref()
                .map(|p| p.connected_count())
                .unwrap_or(0))),
            "getrawmempool" => self.get_raw_mempool(),
            "getapplicationlog" => self.get_application_log(params),
            "validateaddress" => self.validate_address(params),
            other => Err(RpcError::MethodNotFound(other.into())),
        }
    }

    fn get_version(&self) -> Result<Value, RpcError> {
        let settings = self.blockchain.settings();
        Ok(json!({
            "tcpport": 0,
            "nonce": 0,
            "useragent": "/neo3-rs:0.1/",
            "protocol": {
                "network": settings.network,
                "addressversion": settings.address_version,
                "msperblock": settings.milliseconds_per_block,
                "maxtransactionsperblock": settings.max_transactions_per_block,
                "memorypoolmaxtransactions": settings.memory_pool_max_transactions,
                "maxtraceableblocks": settings.max_traceable_blocks,
                "initialgasdistribution": settings.initial_gas_distribution,
                "validatorscount": settings.validators_count,
            }
        }))
    }

    fn resolve_block(&self, selector: &Value) -> Result<Block, RpcError> {
        let hash = match selector {
            Value::Number(number) => {
                let index = number
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| RpcError::InvalidParams("invalid block index".into()))?;
                self.blockchain
                    .block_hash(index)
                    .ok_or(RpcError::UnknownBlock)?
            }
            Value::String(text) => UInt256::parse(text)
                .map_err(|e| RpcError::InvalidParams(e.to_string()))?,
            _ => return Err(RpcError::InvalidParams("block selector".into())),
        };
        self.blockchain.block(&hash).ok_or(RpcError::UnknownBlock)
    }

    fn get_block(&self, params: &[Value], with_transactions: bool) -> Result<Value, RpcError> {
        let selector = params
            .first()
            .ok_or_else(|| RpcError::InvalidParams("missing block selector".into()))?;
        let block = self.resolve_block(selector)?;
        let verbose = params
            .get(1)
            .map(|v| v.as_bool().unwrap_or(v.as_u64().unwrap_or(0) != 0))
            .unwrap_or(false);
        if !verbose {
            let bytes = if with_transactions {
                block.to_array()
            } else {
                block.header.to_array()
            };
            return Ok(json!(base64::engine::general_purpose::STANDARD.encode(bytes)));
        }
        let confirmations = self.blockchain.height() - block.index() + 1;
        let mut body = block_header_json(&block);
        body["confirmations"] = json!(confirmations);
        if with_transactions {
            body["tx"] = Value::Array(
                block
                    .transactions
                    .iter()
                    .map(transaction_json)
                    .collect(),
            );
        }
        Ok(body)
    }

    fn get_raw_transaction(&self, params: &[Value]) -> Result<Value, RpcError> {
        let hash = param_hash256(params, 0)?;
        let (transaction, block_index) = self
            .blockchain
            .transaction(&hash)
            .ok_or(RpcError::UnknownTransaction)?;
        let verbose = params
            .get(1)
            .map(|v| v.as_bool().unwrap_or(v.as_u64().unwrap_or(0) != 0))
            .unwrap_or(false);
        if !verbose {
            return Ok(json!(
                base64::engine::general_purpose::STANDARD.encode(transaction.to_array())
            ));
        }
        let mut body = transaction_json(&transaction);
        body["blockhash"] = self
            .blockchain
            .block_hash(block_index)
            .map(|h| json!(h))
            .unwrap_or(Value::Null);
        body["confirmations"] = json!(self.blockchain.height() - block_index + 1);
        Ok(body)
    }

    fn send_raw_transaction(&self, params: &[Value]) -> Result<Value, RpcError> {
        let bytes = param_base64(params, 0)?;
        let transaction = Transaction::from_array(&bytes)
            .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
        let hash = transaction.hash();
        let result = self.blockchain.try_add_transaction(transaction);
        if result.is_ok() {
            Ok(json!({ "hash": hash }))
        } else {
            Err(RpcError::Server(format!("transaction rejected: {result:?}")))
        }
    }

    fn get_contract_state(&self, params: &[Value]) -> Result<Value, RpcError> {
        let selector = params
            .first()
            .ok_or_else(|| RpcError::InvalidParams("missing contract".into()))?;
        let snapshot = self.blockchain.snapshot();
        let state: Option<ContractState> = match selector {
            Value::Number(number) => number
                .as_i64()
                .and_then(|id| {
                    let id = id as i32;
                    if id < 0 {
                        self.blockchain
                            .natives()
                            .by_id(id)
                            .and_then(|n| self.blockchain.natives().contract_state(&n.hash()).cloned())
                    } else {
                        contract_management::get_contract_by_id(&snapshot, id)
                    }
                }),
            Value::String(text) => {
                let hash = UInt160::parse(text)
                    .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
                self.blockchain
                    .natives()
                    .contract_state(&hash)
                    .cloned()
                    .or_else(|| contract_management::get_contract(&snapshot, &hash))
            }
            _ => None,
        };
        let state = state.ok_or(RpcError::UnknownContract)?;
        Ok(contract_state_json(&state))
    }

    fn parse_signers(&self, params: &[Value], index: usize) -> Result<Vec<Signer>, RpcError> {
        let Some(Value::Array(entries)) = params.get(index) else {
            return Ok(Vec::new());
        };
        let mut signers = Vec::new();
        for entry in entries {
            let account = entry
                .get("account")
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::InvalidParams("signer account".into()))?;
            let account = UInt160::parse(account)
                .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
            let scopes = entry
                .get("scopes")
                .and_then(Value::as_str)
                .unwrap_or("CalledByEntry");
            let scopes = match scopes {
                "None" => WitnessScope::NONE,
                "CalledByEntry" => WitnessScope::CALLED_BY_ENTRY,
                "Global" => WitnessScope::GLOBAL,
                "CustomContracts" => WitnessScope::CUSTOM_CONTRACTS,
                other => {
                    return Err(RpcError::InvalidParams(format!("unknown scope {other}")))
                }
            };
            signers.push(Signer::new(account, scopes));
        }
        Ok(signers)
    }

    fn invoke_function(&self, params: &[Value]) -> Result<Value, RpcError> {
        let contract = param_hash160(params, 0)?;
        let method = params
            .get(1)
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::InvalidParams("missing method".into()))?;
        let arguments = match params.get(2) {
            Some(Value::Array(values)) => values
                .iter()
                .map(contract_parameter_to_item)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };
        let signers = self.parse_signers(params, 3)?;

        // Build an entry script that performs the call.
        let mut builder = neo3_vm::ScriptBuilder::new();
        emit_arguments(&mut builder, &arguments);
        builder.emit_push_i64(neo3_vm::CallFlags::ALL.bits() as i64);
        builder.emit_push_string(method);
        builder.emit_push_bytes(&contract.to_array());
        builder.emit_syscall(neo3_contract::interop::method_hash("System.Contract.Call"));
        self.run_invocation(builder.into_bytes(), signers)
    }

    fn invoke_script(&self, params: &[Value]) -> Result<Value, RpcError> {
        let script = param_base64(params, 0)?;
        let signers = self.parse_signers(params, 1)?;
        self.run_invocation(script, signers)
    }

    fn run_invocation(
        &self,
        script: Vec<u8>,
        signers: Vec<Signer>,
    ) -> Result<Value, RpcError> {
        let engine =
            self.blockchain
                .invoke_script(script.clone(), signers, self.config.max_gas_invoke);
        let state = engine.vm.state();
        let mut session_id: Option<Uuid> = None;

        let stack: Vec<Value> = engine
            .vm
            .result_stack()
            .items()
            .iter()
            .map(|item| self.render_result_item(item, &mut session_id))
            .collect();

        let mut body = json!({
            "script": base64::engine::general_purpose::STANDARD.encode(&script),
            "state": state.to_string(),
            "gasconsumed": engine.gas_consumed().to_string(),
            "stack": stack,
        });
        if let Some(reason) = engine.vm.fault_reason() {
            body["exception"] = json!(reason.to_string());
        }
        if let Some(session) = session_id {
            body["session"] = json!(session.to_string());
        }
        Ok(body)
    }

    /// Renders a result item; iterators become session-backed handles.
    fn render_result_item(&self, item: &StackItem, session_id: &mut Option<Uuid>) -> Value {
        use neo3_contract::interop::iterator::StorageIterator;
        use neo3_vm::stack_item::InteropValue;
        if let StackItem::InteropInterface(value) = item {
            if let Some(iterator) = value.as_any().downcast_ref::<StorageIterator>() {
                if self.config.session_enabled {
                    // Materialize the cursor now; the snapshot dies with
                    // the engine, the session keeps the rendered items.
                    let mut items = Vec::new();
                    while items.len() < MAX_ITERATOR_ITEMS && iterator.advance() {
                        match iterator.value() {
                            Ok(item) => items.push(json_serializer::to_rpc_json(&item)),
                            Err(_) => break,
                        }
                    }
                    let iterator_id = Uuid::new_v4();
                    let session = session_id.get_or_insert_with(Uuid::new_v4);
                    self.sessions.insert(
                        iterator_id,
                        IteratorSession {
                            items,
                            position: 0,
                            last_access: Instant::now(),
                        },
                    );
                    return json!({
                        "type": "InteropInterface",
                        "interface": "IIterator",
                        "id": iterator_id.to_string(),
                        "session": session.to_string(),
                    });
                }
            }
        }
        json_serializer::to_rpc_json(item)
    }

    fn traverse_iterator(&self, params: &[Value]) -> Result<Value, RpcError> {
        if !self.config.session_enabled {
            return Err(RpcError::Server("sessions are disabled".into()));
        }
        let _session = param_uuid(params, 0)?;
        let iterator = param_uuid(params, 1)?;
        let count = param_u32(params, 2)? as usize;
        if count > MAX_ITERATOR_ITEMS {
            return Err(RpcError::InvalidParams("count too large".into()));
        }
        let mut entry = self
            .sessions
            .get_mut(&iterator)
            .ok_or(RpcError::UnknownSession)?;
        entry.last_access = Instant::now();
        let start = entry.position;
        let end = (start + count).min(entry.items.len());
        entry.position = end;
        Ok(Value::Array(entry.items[start..end].to_vec()))
    }

    fn terminate_session(&self, params: &[Value]) -> Result<Value, RpcError> {
        let session = param_uuid(params, 0)?;
        let removed = self.sessions.remove(&session).is_some();
        Ok(json!(removed))
    }

    fn get_nep17_balances(&self, params: &[Value]) -> Result<Value, RpcError> {
        let account = param_account(params, 0, self.blockchain.settings().address_version)?;
        let snapshot = self.blockchain.snapshot();
        let mut balances = Vec::new();
        for (id, native_id) in [
            ("NeoToken", neo3_contract::native::NEO_ID),
            ("GasToken", neo3_contract::native::GAS_ID),
        ] {
            let native = self
                .blockchain
                .natives()
                .by_id(native_id)
                .ok_or_else(|| RpcError::Server("native registry incomplete".into()))?;
            let key = neo3_contract::native::fungible_token::account_key(native_id, &account);
            let Some(item) = snapshot.try_get(&key) else {
                continue;
            };
            // NEO stores a structured account state; GAS a bare integer.
            let amount = if native_id == neo3_contract::native::NEO_ID {
                // First field of the account state is the balance.
                let mut reader = neo3_io::MemoryReader::new(&item.value);
                reader
                    .read_var_bytes(33)
                    .ok()
                    .map(|bytes| {
                        if bytes.is_empty() {
                            "0".to_string()
                        } else {
                            num_bigint::BigInt::from_signed_bytes_le(&bytes).to_string()
                        }
                    })
                    .unwrap_or_else(|| "0".into())
            } else {
                item.as_i64().to_string()
            };
            balances.push(json!({
                "assethash": native.hash(),
                "name": id,
                "amount": amount,
                "lastupdatedblock": self.blockchain.height(),
            }));
        }
        Ok(json!({
            "address": account.to_address(self.blockchain.settings().address_version),
            "balance": balances,
        }))
    }

    fn get_state(&self, params: &[Value]) -> Result<Value, RpcError> {
        let _root = param_hash256(params, 0)?;
        let contract = param_hash160(params, 1)?;
        let key = param_base64(params, 2)?;
        let snapshot = self.blockchain.snapshot();
        let state = self
            .blockchain
            .natives()
            .contract_state(&contract)
            .cloned()
            .or_else(|| contract_management::get_contract(&snapshot, &contract))
            .ok_or(RpcError::UnknownContract)?;
        let item = snapshot
            .try_get(&StorageKey::new(state.id, key))
            .ok_or_else(|| RpcError::Server("key not found".into()))?;
        Ok(json!(base64::engine::general_purpose::STANDARD.encode(item.value)))
    }

    fn get_state_root(&self, params: &[Value]) -> Result<Value, RpcError> {
        let index = param_u32(params, 0)?;
        let snapshot = self.blockchain.snapshot();
        let root = get_state_root(&snapshot, index).ok_or(RpcError::UnknownBlock)?;
        Ok(json!({
            "version": root.version,
            "index": root.index,
            "roothash": root.root_hash,
            "witnesses": [],
        }))
    }

    fn get_state_height(&self) -> Result<Value, RpcError> {
        let snapshot = self.blockchain.snapshot();
        let validated = state_height(&snapshot);
        Ok(json!({
            "localrootindex": validated,
            "validatedrootindex": validated,
        }))
    }

    fn find_states(&self, params: &[Value]) -> Result<Value, RpcError> {
        let _root = param_hash256(params, 0)?;
        let contract = param_hash160(params, 1)?;
        let prefix = param_base64(params, 2)?;
        let snapshot = self.blockchain.snapshot();
        let state = self
            .blockchain
            .natives()
            .contract_state(&contract)
            .cloned()
            .or_else(|| contract_management::get_contract(&snapshot, &contract))
            .ok_or(RpcError::UnknownContract)?;
        let results: Vec<Value> = snapshot
            .find_contract(state.id, &prefix)
            .into_iter()
            .take(100)
            .map(|(key, item)| {
                json!({
                    "key": base64::engine::general_purpose::STANDARD.encode(&key.key),
                    "value": base64::engine::general_purpose::STANDARD.encode(&item.value),
                })
            })
            .collect();
        let truncated = results.len() == 100;
        Ok(json!({ "results": results, "truncated": truncated }))
    }

    fn get_peers(&self) -> Result<Value, RpcError> {
        let connected: Vec<Value> = self
            .peers
            .as_ref()
            .map(|p| {
                p.peers()
                    .into_iter()
                    .map(|peer| {
                        json!({
                            "address": peer.address.ip().to_string(),
                            "port": peer.address.port(),
                            "useragent": peer.user_agent,
                            "lastknownheight": peer.last_height,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(json!({ "unconnected": [], "bad": [], "connected": connected }))
    }

    fn get_raw_mempool(&self) -> Result<Value, RpcError> {
        let hashes: Vec<Value> = self
            .blockchain
            .mempool()
            .verified_transactions()
            .iter()
            .map(|tx| json!(tx.hash()))
            .collect();
        Ok(Value::Array(hashes))
    }

    fn get_application_log(&self, params: &[Value]) -> Result<Value, RpcError> {
        let hash = param_hash256(params, 0)?;
        let log = self
            .blockchain
            .application_log(&hash)
            .ok_or(RpcError::UnknownTransaction)?;
        let executions = serde_json::to_value(&log)
            .map_err(|e| RpcError::Server(e.to_string()))?;
        Ok(json!({ "txid": hash, "executions": [executions] }))
    }

    fn validate_address(&self, params: &[Value]) -> Result<Value, RpcError> {
        let text = params
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::InvalidParams("missing address".into()))?;
        let version = self.blockchain.settings().address_version;
        let valid = UInt160::from_address(text, version).is_ok();
        Ok(json!({ "address": text, "isvalid": valid }))
    }
}

fn emit_arguments(builder: &mut neo3_vm::ScriptBuilder, arguments: &[StackItem]) {
    // Arguments are packed into one array parameter.
    for argument in arguments.iter().rev() {
        emit_item(builder, argument);
    }
    builder.emit_push_i64(arguments.len() as i64);
    builder.emit(neo3_vm::OpCode::PACK);
}

fn emit_item(builder: &mut neo3_vm::ScriptBuilder, item: &StackItem) {
    match item {
        StackItem::Null => {
            builder.emit_push_null();
        }
        StackItem::Boolean(value) => {
            builder.emit_push_bool(*value);
        }
        StackItem::Integer(value) => {
            builder.emit_push_int(value);
        }
        other => {
            let bytes = other.as_bytes().unwrap_or_default();
            builder.emit_push_bytes(&bytes);
        }
    }
}

/// Converts an RPC contract-parameter object into a stack item.
fn contract_parameter_to_item(value: &Value) -> Result<StackItem, RpcError> {
    let type_name = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidParams("parameter type".into()))?;
    let inner = value
        .get("value")
        .ok_or_else(|| RpcError::InvalidParams("parameter value".into()))?;
    match type_name {
        "Boolean" => Ok(StackItem::from_bool(inner.as_bool().unwrap_or(false))),
        "Integer" => {
            let text = match inner {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return Err(RpcError::InvalidParams("integer value".into())),
            };
            let parsed: num_bigint::BigInt = text
                .parse()
                .map_err(|_| RpcError::InvalidParams("integer value".into()))?;
            Ok(StackItem::Integer(parsed))
        }
        "String" => Ok(StackItem::from_byte_string(
            inner.as_str().unwrap_or_default().as_bytes().to_vec(),
        )),
        "ByteArray" => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(inner.as_str().unwrap_or_default())
                .map_err(|_| RpcError::InvalidParams("byte array value".into()))?;
            Ok(StackItem::from_byte_string(bytes))
        }
        "Hash160" => {
            let hash = UInt160::parse(inner.as_str().unwrap_or_default())
                .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
            Ok(StackItem::from_byte_string(hash.to_array().to_vec()))
        }
        "Hash256" => {
            let hash = UInt256::parse(inner.as_str().unwrap_or_default())
                .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
            Ok(StackItem::from_byte_string(hash.to_array().to_vec()))
        }
        "PublicKey" | "Signature" => {
            let bytes = hex::decode(inner.as_str().unwrap_or_default())
                .map_err(|_| RpcError::InvalidParams("hex value".into()))?;
            Ok(StackItem::from_byte_string(bytes))
        }
        "Any" if inner.is_null() => Ok(StackItem::Null),
        other => Err(RpcError::InvalidParams(format!(
            "unsupported parameter type {other}"
        ))),
    }
}

fn block_header_json(block: &Block) -> Value {
    json!({
        "hash": block.hash(),
        "size": neo3_io::Serializable::size(block),
        "version": block.header.version,
        "previousblockhash": block.header.prev_hash,
        "merkleroot": block.header.merkle_root,
        "time": block.header.timestamp,
        "nonce": format!("{:016X}", block.header.nonce),
        "index": block.header.index,
        "primary": block.header.primary_index,
        "nextconsensus": block.header.next_consensus,
    })
}

fn transaction_json(tx: &Transaction) -> Value {
    json!({
        "hash": tx.hash(),
        "size": neo3_io::Serializable::size(tx),
        "version": tx.version,
        "nonce": tx.nonce,
        "sender": tx.sender(),
        "sysfee": tx.system_fee.to_string(),
        "netfee": tx.network_fee.to_string(),
        "validuntilblock": tx.valid_until_block,
        "script": base64::engine::general_purpose::STANDARD.encode(&tx.script),
    })
}

fn contract_state_json(state: &ContractState) -> Value {
    json!({
        "id": state.id,
        "updatecounter": state.update_counter,
        "hash": state.hash,
        "nef": {
            "magic": neo3_contract::contract_state::NEF_MAGIC,
            "compiler": state.nef.compiler,
            "source": state.nef.source,
            "tokens": state.nef.tokens.len(),
            "script": base64::engine::general_purpose::STANDARD.encode(&state.nef.script),
            "checksum": state.nef.checksum,
        },
        "manifest": serde_json::to_value(&state.manifest).unwrap_or(Value::Null),
    })
}

// ---- parameter coercion -------------------------------------------------

fn param_u32(params: &[Value], index: usize) -> Result<u32, RpcError> {
    params
        .get(index)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| RpcError::InvalidParams(format!("parameter {index} must be a u32")))
}

fn param_hash256(params: &[Value], index: usize) -> Result<UInt256, RpcError> {
    let text = params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidParams(format!("parameter {index} must be a hash")))?;
    UInt256::parse(text).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn param_hash160(params: &[Value], index: usize) -> Result<UInt160, RpcError> {
    let text = params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidParams(format!("parameter {index} must be a hash")))?;
    UInt160::parse(text).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn param_account(params: &[Value], index: usize, address_version: u8) -> Result<UInt160, RpcError> {
    let text = params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidParams(format!("parameter {index} must be an account")))?;
    UInt160::parse(text)
        .or_else(|_| UInt160::from_address(text, address_version))
        .map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn param_base64(params: &[Value], index: usize) -> Result<Vec<u8>, RpcError> {
    let text = params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidParams(format!("parameter {index} must be base64")))?;
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|_| RpcError::InvalidParams("invalid base64".into()))
}

fn param_uuid(params: &[Value], index: usize) -> Result<Uuid, RpcError> {
    let text = params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidParams(format!("parameter {index} must be a uuid")))?;
    Uuid::parse_str(text).map_err(|_| RpcError::InvalidParams("invalid uuid".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_config::ProtocolSettings;
    use neo3_persistence::MemoryStore;

    fn handler() -> RpcHandler {
        let store: Arc<dyn neo3_persistence::Store> = Arc::new(MemoryStore::new());
        let blockchain =
            Arc::new(Blockchain::new(ProtocolSettings::privnet(), store).unwrap());
        RpcHandler::new(blockchain, None, RpcConfig::default())
    }

    fn call(handler: &RpcHandler, method: &str, params: Vec<Value>) -> RpcResponse {
        handler.handle(RpcRequest {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: json!(1),
        })
    }

    #[test]
    fn test_getblockcount_after_genesis() {
        let handler = handler();
        let response = call(&handler, "getblockcount", vec![]);
        assert_eq!(response.result.unwrap(), json!(1));
    }

    #[test]
    fn test_getblock_by_index_and_hash() {
        let handler = handler();
        let by_index = call(&handler, "getblock", vec![json!(0), json!(true)]);
        let body = by_index.result.unwrap();
        assert_eq!(body["index"], json!(0));
        let hash = body["hash"].as_str().unwrap().to_string();

        let by_hash = call(&handler, "getblock", vec![json!(hash), json!(true)]);
        assert_eq!(by_hash.result.unwrap()["index"], json!(0));
    }

    #[test]
    fn test_unknown_method_code() {
        let handler = handler();
        let response = call(&handler, "nosuchmethod", vec![]);
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_invokescript_executes() {
        let handler = handler();
        // PUSH2 PUSH3 ADD as base64.
        let script = base64::engine::general_purpose::STANDARD.encode([0x12, 0x13, 0x9E]);
        let response = call(&handler, "invokescript", vec![json!(script)]);
        let body = response.result.unwrap();
        assert_eq!(body["state"], json!("HALT"));
        assert_eq!(body["stack"][0]["value"], json!("5"));
    }

    #[test]
    fn test_getcontractstate_for_native() {
        let handler = handler();
        let response = call(&handler, "getcontractstate", vec![json!(-5)]);
        let body = response.result.unwrap();
        assert_eq!(body["id"], json!(-5));
        assert_eq!(body["manifest"]["name"], json!("NeoToken"));
    }

    #[test]
    fn test_validateaddress() {
        let handler = handler();
        let account = UInt160::from_script(b"test");
        let address = account.to_address(0x35);
        let response = call(&handler, "validateaddress", vec![json!(address)]);
        assert_eq!(response.result.unwrap()["isvalid"], json!(true));

        let response = call(&handler, "validateaddress", vec![json!("not-an-address")]);
        assert_eq!(response.result.unwrap()["isvalid"], json!(false));
    }

    #[test]
    fn test_getstateheight_after_genesis() {
        let handler = handler();
        let response = call(&handler, "getstateheight", vec![]);
        assert_eq!(response.result.unwrap()["localrootindex"], json!(0));
    }
}
