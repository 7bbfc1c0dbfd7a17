// Copyright (C) 2015-2025 The Neo Project.
//
// neo_token.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The NEO governance token: indivisible supply of 100,000,000, voting,
//! committee rotation and GAS reward distribution.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::helpers;
use crate::native::gas_token::{pop_account, GasToken};
use crate::native::{fungible_token as ft, native_hash, NativeContract, NativeMethod, NEO_ID};
use neo3_core::UInt160;
use neo3_crypto::ECPoint;
use neo3_io::{BinaryWriter, MemoryReader};
use neo3_persistence::{StorageItem, StorageKey};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

pub const TOTAL_SUPPLY: i64 = 100_000_000;

const PREFIX_VOTERS_COUNT: u8 = 1;
const PREFIX_REGISTER_PRICE: u8 = 13;
const PREFIX_COMMITTEE: u8 = 14;
const PREFIX_VOTER_REWARD: u8 = 23;
const PREFIX_GAS_PER_BLOCK: u8 = 29;
const PREFIX_CANDIDATE: u8 = 33;

/// Reward split of each block's GAS issuance, in percent.
const HOLDER_REWARD_RATIO: i64 = 10;
const COMMITTEE_REWARD_RATIO: i64 = 10;
const VOTER_REWARD_RATIO: i64 = 80;

/// Fixed-point factor for per-vote reward accumulation.
const REWARD_FACTOR: i64 = 100_000_000;

const DEFAULT_GAS_PER_BLOCK: i64 = 5 * 100_000_000;
const DEFAULT_REGISTER_PRICE: i64 = 1000 * 100_000_000;

/// Per-account NEO state.
#[derive(Debug, Clone, Default)]
pub struct NeoAccountState {
    pub balance: BigInt,
    pub balance_height: u32,
    pub vote_to: Option<ECPoint>,
    pub last_gas_per_vote: BigInt,
}

impl NeoAccountState {
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        let _ = writer.write_var_bytes(&int_bytes(&self.balance));
        let _ = writer.write_u32(self.balance_height);
        match &self.vote_to {
            Some(key) => {
                let _ = writer.write_u8(1);
                let _ = writer.write_bytes(key.as_bytes());
            }
            None => {
                let _ = writer.write_u8(0);
            }
        }
        let _ = writer.write_var_bytes(&int_bytes(&self.last_gas_per_vote));
        writer.into_bytes()
    }

    fn from_bytes(data: &[u8]) -> ContractResult<Self> {
        let mut reader = MemoryReader::new(data);
        let balance = int_from(&reader.read_var_bytes(33)?);
        let balance_height = reader.read_u32()?;
        let vote_to = match reader.read_u8()? {
            0 => None,
            _ => {
                let bytes = reader.read_bytes(33)?;
                Some(
                    ECPoint::from_bytes(&bytes)
                        .map_err(|e| ContractError::InvalidArgument(e.to_string()))?,
                )
            }
        };
        let last_gas_per_vote = int_from(&reader.read_var_bytes(64)?);
        Ok(Self {
            balance,
            balance_height,
            vote_to,
            last_gas_per_vote,
        })
    }
}

/// Per-candidate registration state.
#[derive(Debug, Clone, Default)]
pub struct CandidateState {
    pub registered: bool,
    pub votes: BigInt,
}

impl CandidateState {
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        let _ = writer.write_bool(self.registered);
        let _ = writer.write_var_bytes(&int_bytes(&self.votes));
        writer.into_bytes()
    }

    fn from_bytes(data: &[u8]) -> ContractResult<Self> {
        let mut reader = MemoryReader::new(data);
        let registered = reader.read_bool()?;
        let votes = int_from(&reader.read_var_bytes(33)?);
        Ok(Self { registered, votes })
    }
}

fn int_bytes(value: &BigInt) -> Vec<u8> {
    if value.is_zero() {
        Vec::new()
    } else {
        value.to_signed_bytes_le()
    }
}

fn int_from(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        BigInt::zero()
    } else {
        BigInt::from_signed_bytes_le(bytes)
    }
}

fn account_state(host: &HostContext, account: &UInt160) -> ContractResult<Option<NeoAccountState>> {
    match host.snapshot.try_get(&ft::account_key(NEO_ID, account)) {
        Some(item) => Ok(Some(NeoAccountState::from_bytes(&item.value)?)),
        None => Ok(None),
    }
}

fn put_account_state(host: &HostContext, account: &UInt160, state: &NeoAccountState) {
    host.snapshot
        .put(ft::account_key(NEO_ID, account), StorageItem::new(state.to_bytes()));
}

fn candidate_key(key: &ECPoint) -> StorageKey {
    StorageKey::with_prefix_bytes(NEO_ID, PREFIX_CANDIDATE, key.as_bytes())
}

fn candidate_state(host: &HostContext, key: &ECPoint) -> ContractResult<Option<CandidateState>> {
    match host.snapshot.try_get(&candidate_key(key)) {
        Some(item) => Ok(Some(CandidateState::from_bytes(&item.value)?)),
        None => Ok(None),
    }
}

fn put_candidate_state(host: &HostContext, key: &ECPoint, state: &CandidateState) {
    host.snapshot
        .put(candidate_key(key), StorageItem::new(state.to_bytes()));
}

/// The cached committee: members with their vote totals at the last
/// epoch refresh.
fn committee_cache(host: &HostContext) -> ContractResult<Vec<(ECPoint, BigInt)>> {
    let key = StorageKey::with_prefix(NEO_ID, PREFIX_COMMITTEE);
    let Some(item) = host.snapshot.try_get(&key) else {
        return standby_committee(host).map(|keys| {
            keys.into_iter().map(|k| (k, BigInt::zero())).collect()
        });
    };
    let mut reader = MemoryReader::new(&item.value);
    let count = reader.read_var_int(1024)? as usize;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let bytes = reader.read_bytes(33)?;
        let key = ECPoint::from_bytes(&bytes)
            .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
        let votes = int_from(&reader.read_var_bytes(33)?);
        members.push((key, votes));
    }
    Ok(members)
}

fn put_committee_cache(host: &HostContext, members: &[(ECPoint, BigInt)]) -> ContractResult<()> {
    let mut writer = BinaryWriter::new();
    writer.write_var_int(members.len() as u64)?;
    for (key, votes) in members {
        writer.write_bytes(key.as_bytes())?;
        writer.write_var_bytes(&int_bytes(votes))?;
    }
    host.snapshot.put(
        StorageKey::with_prefix(NEO_ID, PREFIX_COMMITTEE),
        StorageItem::new(writer.into_bytes()),
    );
    Ok(())
}

fn standby_committee(host: &HostContext) -> ContractResult<Vec<ECPoint>> {
    host.settings
        .standby_committee
        .iter()
        .map(|hex| {
            ECPoint::from_hex(hex).map_err(|e| ContractError::InvalidArgument(e.to_string()))
        })
        .collect()
}

/// The committee's majority multisig address.
pub fn committee_address(host: &HostContext) -> ContractResult<UInt160> {
    let committee: Vec<ECPoint> = committee_cache(host)?.into_iter().map(|(k, _)| k).collect();
    let m = committee.len() - (committee.len().saturating_sub(1)) / 2;
    helpers::multisig_script_hash(m, &committee)
}

/// The validators expected to sign the next block, in canonical order.
pub fn next_block_validators(host: &HostContext) -> ContractResult<Vec<ECPoint>> {
    let committee = committee_cache(host)?;
    let count = host.settings.validators_count.min(committee.len());
    let mut validators: Vec<ECPoint> =
        committee.into_iter().take(count).map(|(k, _)| k).collect();
    validators.sort();
    Ok(validators)
}

/// Whether the committee refreshes at this block index.
pub fn should_refresh_committee(index: u32, committee_size: usize) -> bool {
    committee_size > 0 && index as usize % committee_size == 0
}

/// Recomputes the committee from candidate votes, falling back to the
/// standby set while there are too few registered candidates.
fn compute_committee(host: &HostContext) -> ContractResult<Vec<(ECPoint, BigInt)>> {
    let committee_size = host.settings.committee_size();
    let mut candidates: Vec<(ECPoint, BigInt)> = Vec::new();
    for (key, item) in host
        .snapshot
        .find_contract(NEO_ID, &[PREFIX_CANDIDATE])
    {
        let state = CandidateState::from_bytes(&item.value)?;
        if !state.registered {
            continue;
        }
        let point = ECPoint::from_bytes(&key.key[1..])
            .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
        candidates.push((point, state.votes));
    }
    if candidates.len() < committee_size {
        return standby_committee(host)
            .map(|keys| keys.into_iter().map(|k| (k, BigInt::zero())).collect());
    }
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    candidates.truncate(committee_size);
    Ok(candidates)
}

fn gas_per_block_at(host: &HostContext, index: u32) -> BigInt {
    // Records are keyed big-endian so the scan is ordered; take the
    // newest record at or below `index`.
    let mut value = BigInt::from(DEFAULT_GAS_PER_BLOCK);
    for (key, item) in host
        .snapshot
        .find_contract(NEO_ID, &[PREFIX_GAS_PER_BLOCK])
    {
        let mut idx_bytes = [0u8; 4];
        if key.key.len() == 5 {
            idx_bytes.copy_from_slice(&key.key[1..]);
        }
        let record_index = u32::from_be_bytes(idx_bytes);
        if record_index > index {
            break;
        }
        value = int_from(&item.value);
    }
    value
}

fn put_gas_per_block(host: &HostContext, index: u32, value: &BigInt) {
    host.snapshot.put(
        StorageKey::with_prefix_bytes(NEO_ID, PREFIX_GAS_PER_BLOCK, &index.to_be_bytes()),
        StorageItem::new(int_bytes(value)),
    );
}

fn voter_reward_key(key: &ECPoint) -> StorageKey {
    StorageKey::with_prefix_bytes(NEO_ID, PREFIX_VOTER_REWARD, key.as_bytes())
}

fn voter_reward(host: &HostContext, key: &ECPoint) -> BigInt {
    host.snapshot
        .try_get(&voter_reward_key(key))
        .map(|item| int_from(&item.value))
        .unwrap_or_default()
}

/// GAS accrued by `state` from `state.balance_height` up to `end`.
fn calculate_bonus(
    host: &HostContext,
    state: &NeoAccountState,
    end: u32,
) -> ContractResult<BigInt> {
    if state.balance.is_zero() || end <= state.balance_height {
        return Ok(BigInt::zero());
    }
    if state.balance.is_negative() {
        return Err(ContractError::Native("negative NEO balance".into()));
    }
    // Holder share, integrated over the per-block issuance records.
    let mut issued = BigInt::zero();
    let mut cursor = state.balance_height;
    while cursor < end {
        let rate = gas_per_block_at(host, cursor);
        // Find the span this rate covers (records are sparse; scan for
        // the next boundary).
        let mut span_end = end;
        for (key, _) in host.snapshot.find_contract(NEO_ID, &[PREFIX_GAS_PER_BLOCK]) {
            if key.key.len() == 5 {
                let mut idx_bytes = [0u8; 4];
                idx_bytes.copy_from_slice(&key.key[1..]);
                let record_index = u32::from_be_bytes(idx_bytes);
                if record_index > cursor && record_index < span_end {
                    span_end = record_index;
                }
            }
        }
        issued += rate * BigInt::from(span_end - cursor);
        cursor = span_end;
    }
    let holder = &state.balance * issued * HOLDER_REWARD_RATIO
        / 100
        / BigInt::from(TOTAL_SUPPLY);

    // Voter share from the per-committee accumulator.
    let voter = match &state.vote_to {
        Some(candidate) => {
            let accumulated = voter_reward(host, candidate) - &state.last_gas_per_vote;
            &state.balance * accumulated / REWARD_FACTOR
        }
        None => BigInt::zero(),
    };
    Ok(holder + voter)
}

/// Settles accrued GAS for `account` and restamps its height.
fn distribute_gas(
    host: &mut HostContext,
    account: &UInt160,
    state: &mut NeoAccountState,
) -> ContractResult<()> {
    let end = host
        .persisting_block
        .as_ref()
        .map(|b| b.index)
        .unwrap_or(state.balance_height);
    let bonus = calculate_bonus(host, state, end)?;
    state.balance_height = end;
    if let Some(candidate) = &state.vote_to {
        state.last_gas_per_vote = voter_reward(host, candidate);
    }
    if bonus.is_positive() {
        GasToken::mint_to(host, account, &bonus)?;
    }
    Ok(())
}

fn adjust_candidate_votes(
    host: &mut HostContext,
    candidate: &ECPoint,
    delta: &BigInt,
) -> ContractResult<()> {
    let Some(mut state) = candidate_state(host, candidate)? else {
        return Ok(());
    };
    state.votes += delta;
    if !state.registered && state.votes.is_zero() {
        host.snapshot.delete(&candidate_key(candidate));
    } else {
        put_candidate_state(host, candidate, &state);
    }
    Ok(())
}

pub struct NeoToken {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl NeoToken {
    pub const NAME: &'static str = "NeoToken";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new("symbol", &[], true, 0, 0, F::NONE, true),
                NativeMethod::new("decimals", &[], true, 0, 0, F::NONE, true),
                NativeMethod::new("totalSupply", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("balanceOf", &["account"], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new(
                    "transfer",
                    &["from", "to", "amount", "data"],
                    true,
                    1 << 17,
                    50,
                    F::STATES.union(F::ALLOW_CALL).union(F::ALLOW_NOTIFY),
                    false,
                ),
                NativeMethod::new("unclaimedGas", &["account", "end"], true, 1 << 17, 0, F::READ_STATES, true),
                NativeMethod::new("registerCandidate", &["pubkey"], true, 0, 0, F::STATES, false),
                NativeMethod::new("unregisterCandidate", &["pubkey"], true, 1 << 16, 0, F::STATES, false),
                NativeMethod::new("vote", &["account", "voteTo"], true, 1 << 16, 0, F::STATES, false),
                NativeMethod::new("getCandidates", &[], true, 1 << 22, 0, F::READ_STATES, true),
                NativeMethod::new("getCommittee", &[], true, 1 << 16, 0, F::READ_STATES, true),
                NativeMethod::new("getNextBlockValidators", &[], true, 1 << 16, 0, F::READ_STATES, true),
                NativeMethod::new("getGasPerBlock", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("setGasPerBlock", &["gasPerBlock"], false, 1 << 15, 0, F::STATES, false),
                NativeMethod::new("getRegisterPrice", &[], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("setRegisterPrice", &["registerPrice"], false, 1 << 15, 0, F::STATES, false),
                NativeMethod::new("getAccountState", &["account"], true, 1 << 15, 0, F::READ_STATES, true),
            ],
        }
    }

    fn check_committee(
        &self,
        host: &mut HostContext,
        engine: &ExecutionEngine,
    ) -> ContractResult<bool> {
        let committee = committee_address(host)?;
        host.check_witness(engine, &committee)
    }
}

impl Default for NeoToken {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for NeoToken {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        NEO_ID
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
            "symbol" => Ok(Some(StackItem::from_byte_string(b"NEO".to_vec()))),
            "decimals" => Ok(Some(StackItem::from_int(0))),
            "totalSupply" => Ok(Some(StackItem::from_int(TOTAL_SUPPLY))),
            "balanceOf" => {
                let account = pop_account(&mut args)?;
                let balance = account_state(host, &account)?
                    .map(|s| s.balance)
                    .unwrap_or_default();
                Ok(Some(StackItem::Integer(balance)))
            }
            "transfer" => {
                let from = pop_account(&mut args)?;
                let to = pop_account(&mut args)?;
                let amount = args.remove(0).as_int().map_err(ContractError::Vm)?;
                let data = args.remove(0);
                let ok = self.transfer_neo(host, engine, &from, &to, &amount, data)?;
                Ok(Some(StackItem::Boolean(ok)))
            }
            "unclaimedGas" => {
                let account = pop_account(&mut args)?;
                let end = args.remove(0).as_int().map_err(ContractError::Vm)?;
                let end = end
                    .to_u32()
                    .ok_or_else(|| ContractError::InvalidArgument("invalid end height".into()))?;
                let bonus = match account_state(host, &account)? {
                    Some(state) => calculate_bonus(host, &state, end)?,
                    None => BigInt::zero(),
                };
                Ok(Some(StackItem::Integer(bonus)))
            }
            "registerCandidate" => {
                let key = pop_pubkey(&mut args)?;
                let account = helpers::public_key_to_script_hash(&key)?;
                if !host.check_witness(engine, &account)? {
                    return Ok(Some(StackItem::Boolean(false)));
                }
                let price = register_price(host);
                host.add_fee_unscaled(price)?;
                let mut state = candidate_state(host, &key)?.unwrap_or_default();
                state.registered = true;
                put_candidate_state(host, &key, &state);
                Ok(Some(StackItem::Boolean(true)))
            }
            "unregisterCandidate" => {
                let key = pop_pubkey(&mut args)?;
                let account = helpers::public_key_to_script_hash(&key)?;
                if !host.check_witness(engine, &account)? {
                    return Ok(Some(StackItem::Boolean(false)));
                }
                match candidate_state(host, &key)? {
                    None => Ok(Some(StackItem::Boolean(true))),
                    Some(mut state) => {
                        state.registered = false;
                        if state.votes.is_zero() {
                            host.snapshot.delete(&candidate_key(&key));
                        } else {
                            put_candidate_state(host, &key, &state);
                        }
                        Ok(Some(StackItem::Boolean(true)))
                    }
                }
            }
            "vote" => {
                let account = pop_account(&mut args)?;
                let vote_to = match args.remove(0) {
                    item if item.is_null() => None,
                    item => {
                        let bytes = item.as_bytes().map_err(ContractError::Vm)?;
                        Some(
                            ECPoint::from_bytes(&bytes)
                                .map_err(|e| ContractError::InvalidArgument(e.to_string()))?,
                        )
                    }
                };
                let ok = self.vote(host, engine, &account, vote_to)?;
                Ok(Some(StackItem::Boolean(ok)))
            }
            "getCandidates" => {
                let mut entries = Vec::new();
                for (key, item) in host.snapshot.find_contract(NEO_ID, &[PREFIX_CANDIDATE]) {
                    let state = CandidateState::from_bytes(&item.value)?;
                    if !state.registered {
                        continue;
                    }
                    entries.push(StackItem::new_struct(vec![
                        StackItem::from_byte_string(key.key[1..].to_vec()),
                        StackItem::Integer(state.votes),
                    ]));
                }
                Ok(Some(StackItem::new_array(entries)))
            }
            "getCommittee" => {
                let mut committee: Vec<ECPoint> =
                    committee_cache(host)?.into_iter().map(|(k, _)| k).collect();
                committee.sort();
                Ok(Some(StackItem::new_array(
                    committee
                        .iter()
                        .map(|k| StackItem::from_byte_string(k.as_bytes().to_vec()))
                        .collect(),
                )))
            }
            "getNextBlockValidators" => {
                let validators = next_block_validators(host)?;
                Ok(Some(StackItem::new_array(
                    validators
                        .iter()
                        .map(|k| StackItem::from_byte_string(k.as_bytes().to_vec()))
                        .collect(),
                )))
            }
            "getGasPerBlock" => {
                let index = host
                    .persisting_block
                    .as_ref()
                    .map(|b| b.index)
                    .unwrap_or(u32::MAX);
                Ok(Some(StackItem::Integer(gas_per_block_at(host, index))))
            }
            "setGasPerBlock" => {
                let value = args.remove(0).as_int().map_err(ContractError::Vm)?;
                if value.is_negative() || value > BigInt::from(10 * 100_000_000i64) {
                    return Err(ContractError::InvalidArgument(
                        "gas per block out of range".into(),
                    ));
                }
                if !self.check_committee(host, engine)? {
                    return Err(ContractError::InvalidOperation(
                        "committee witness required".into(),
                    ));
                }
                let index = host
                    .persisting_block
                    .as_ref()
                    .map(|b| b.index + 1)
                    .unwrap_or(0);
                put_gas_per_block(host, index, &value);
                Ok(None)
            }
            "getRegisterPrice" => Ok(Some(StackItem::from_int(register_price(host)))),
            "setRegisterPrice" => {
                let value = args.remove(0).as_int().map_err(ContractError::Vm)?;
                let value = value
                    .to_i64()
                    .filter(|v| *v > 0)
                    .ok_or_else(|| ContractError::InvalidArgument("invalid price".into()))?;
                if !self.check_committee(host, engine)? {
                    return Err(ContractError::InvalidOperation(
                        "committee witness required".into(),
                    ));
                }
                host.snapshot.put(
                    StorageKey::with_prefix(NEO_ID, PREFIX_REGISTER_PRICE),
                    StorageItem::from_i64(value),
                );
                Ok(None)
            }
            "getAccountState" => {
                let account = pop_account(&mut args)?;
                match account_state(host, &account)? {
                    None => Ok(Some(StackItem::Null)),
                    Some(state) => Ok(Some(StackItem::new_struct(vec![
                        StackItem::Integer(state.balance),
                        StackItem::from_int(state.balance_height),
                        match &state.vote_to {
                            Some(key) => StackItem::from_byte_string(key.as_bytes().to_vec()),
                            None => StackItem::Null,
                        },
                        StackItem::Integer(state.last_gas_per_vote),
                    ]))),
                }
            }
            other => Err(ContractError::MethodNotFound(other.into())),
        }
    }

    /// Genesis: the whole supply goes to the standby committee address,
    /// with the default issuance and price records.
    fn initialize(&self, host: &mut HostContext) -> ContractResult<()> {
        let committee = compute_committee(host)?;
        put_committee_cache(host, &committee)?;
        put_gas_per_block(host, 0, &BigInt::from(DEFAULT_GAS_PER_BLOCK));
        host.snapshot.put(
            StorageKey::with_prefix(NEO_ID, PREFIX_REGISTER_PRICE),
            StorageItem::from_i64(DEFAULT_REGISTER_PRICE),
        );
        host.snapshot.put(
            StorageKey::with_prefix(NEO_ID, PREFIX_VOTERS_COUNT),
            StorageItem::new(Vec::new()),
        );

        let committee_account = committee_address(host)?;
        let state = NeoAccountState {
            balance: BigInt::from(TOTAL_SUPPLY),
            ..Default::default()
        };
        put_account_state(host, &committee_account, &state);
        host.snapshot.put(
            StorageKey::with_prefix(NEO_ID, ft::PREFIX_TOTAL_SUPPLY),
            StorageItem::from_i64(TOTAL_SUPPLY),
        );
        ft::notify_transfer(
            host,
            self.hash,
            None,
            Some(&committee_account),
            &BigInt::from(TOTAL_SUPPLY),
        )
    }

    /// Epoch boundary: refresh the committee cache.
    fn on_persist(&self, host: &mut HostContext) -> ContractResult<()> {
        let Some(block) = host.persisting_block.clone() else {
            return Ok(());
        };
        if should_refresh_committee(block.index, host.settings.committee_size()) {
            let committee = compute_committee(host)?;
            put_committee_cache(host, &committee)?;
        }
        Ok(())
    }

    /// Block reward: the rotating committee member is paid its share and
    /// its voters' accumulator advances.
    fn post_persist(&self, host: &mut HostContext) -> ContractResult<()> {
        let Some(block) = host.persisting_block.clone() else {
            return Ok(());
        };
        let committee = committee_cache(host)?;
        if committee.is_empty() {
            return Ok(());
        }
        let gas_per_block = gas_per_block_at(host, block.index);
        let (member, votes) = &committee[block.index as usize % committee.len()];

        let committee_reward = &gas_per_block * COMMITTEE_REWARD_RATIO / 100;
        let member_account = helpers::public_key_to_script_hash(member)?;
        GasToken::mint_to(host, &member_account, &committee_reward)?;

        if votes.is_positive() {
            let voter_pool = &gas_per_block * VOTER_REWARD_RATIO / 100;
            let increment = voter_pool * REWARD_FACTOR / votes;
            let accumulated = voter_reward(host, member) + increment;
            host.snapshot.put(
                voter_reward_key(member),
                StorageItem::new(int_bytes(&accumulated)),
            );
        }
        Ok(())
    }
}

impl NeoToken {
    fn transfer_neo(
        &self,
        host: &mut HostContext,
        engine: &mut ExecutionEngine,
        from: &UInt160,
        to: &UInt160,
        amount: &BigInt,
        data: StackItem,
    ) -> ContractResult<bool> {
        let hash = self.hash;
        ft::transfer(
            host,
            engine,
            NEO_ID,
            hash,
            from,
            to,
            amount,
            data,
            |host, account, delta| {
                let mut state = account_state(host, account)?.unwrap_or_default();
                distribute_gas(host, account, &mut state)?;
                if let Some(candidate) = state.vote_to.clone() {
                    adjust_candidate_votes(host, &candidate, delta)?;
                    let voters_key = StorageKey::with_prefix(NEO_ID, PREFIX_VOTERS_COUNT);
                    let voters = int_from(
                        &host
                            .snapshot
                            .try_get(&voters_key)
                            .map(|i| i.value)
                            .unwrap_or_default(),
                    ) + delta;
                    host.snapshot
                        .put(voters_key, StorageItem::new(int_bytes(&voters)));
                }
                state.balance += delta;
                if state.balance.is_zero() && state.vote_to.is_none() {
                    host.snapshot.delete(&ft::account_key(NEO_ID, account));
                } else {
                    put_account_state(host, account, &state);
                }
                Ok(())
            },
        )
    }

    fn vote(
        &self,
        host: &mut HostContext,
        engine: &mut ExecutionEngine,
        account: &UInt160,
        vote_to: Option<ECPoint>,
    ) -> ContractResult<bool> {
        if !host.check_witness(engine, account)? {
            return Ok(false);
        }
        let Some(mut state) = account_state(host, account)? else {
            return Ok(false);
        };
        if let Some(candidate) = &vote_to {
            let registered = candidate_state(host, candidate)?
                .map(|s| s.registered)
                .unwrap_or(false);
            if !registered {
                return Ok(false);
            }
        }

        distribute_gas(host, account, &mut state)?;

        // Voters count tracks NEO held by voting accounts.
        let voters_key = StorageKey::with_prefix(NEO_ID, PREFIX_VOTERS_COUNT);
        let mut voters = int_from(
            &host
                .snapshot
                .try_get(&voters_key)
                .map(|i| i.value)
                .unwrap_or_default(),
        );
        match (&state.vote_to, &vote_to) {
            (None, Some(_)) => voters += &state.balance,
            (Some(_), None) => voters -= &state.balance,
            _ => {}
        }
        host.snapshot
            .put(voters_key, StorageItem::new(int_bytes(&voters)));

        if let Some(previous) = state.vote_to.clone() {
            adjust_candidate_votes(host, &previous, &-state.balance.clone())?;
        }
        if let Some(next) = &vote_to {
            adjust_candidate_votes(host, next, &state.balance)?;
            state.last_gas_per_vote = voter_reward(host, next);
        } else {
            state.last_gas_per_vote = BigInt::zero();
        }
        state.vote_to = vote_to;
        put_account_state(host, account, &state);
        Ok(true)
    }
}

fn register_price(host: &HostContext) -> i64 {
    host.snapshot
        .try_get(&StorageKey::with_prefix(NEO_ID, PREFIX_REGISTER_PRICE))
        .map(|item| item.as_i64())
        .unwrap_or(DEFAULT_REGISTER_PRICE)
}

fn pop_pubkey(args: &mut Vec<StackItem>) -> ContractResult<ECPoint> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing public key".into()));
    }
    let bytes = args.remove(0).as_bytes().map_err(ContractError::Vm)?;
    ECPoint::from_bytes(&bytes).map_err(|e| ContractError::InvalidArgument(e.to_string()))
}
