// Copyright (C) 2015-2025 The Neo Project.
//
// notary.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Notary deposits, available on networks with the Echidna hardfork.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::native::gas_token::{pop_account, GasToken};
use crate::native::{native_hash, neo_token, NativeContract, NativeMethod, NOTARY_ID};
use neo3_core::UInt160;
use neo3_io::{BinaryWriter, MemoryReader};
use neo3_persistence::{StorageItem, StorageKey};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

const PREFIX_DEPOSIT: u8 = 1;
const PREFIX_MAX_NVB_DELTA: u8 = 10;

const DEFAULT_MAX_NVB_DELTA: i64 = 140;

#[derive(Debug, Clone, Default)]
struct Deposit {
    amount: BigInt,
    till: u32,
}

impl Deposit {
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        let bytes = if self.amount.is_zero() {
            Vec::new()
        } else {
            self.amount.to_signed_bytes_le()
        };
        let _ = writer.write_var_bytes(&bytes);
        let _ = writer.write_u32(self.till);
        writer.into_bytes()
    }

    fn from_bytes(data: &[u8]) -> ContractResult<Self> {
        let mut reader = MemoryReader::new(data);
        let bytes = reader.read_var_bytes(33)?;
        let amount = if bytes.is_empty() {
            BigInt::zero()
        } else {
            BigInt::from_signed_bytes_le(&bytes)
        };
        let till = reader.read_u32()?;
        Ok(Self { amount, till })
    }
}

fn deposit_key(account: &UInt160) -> StorageKey {
    StorageKey::with_prefix_bytes(NOTARY_ID, PREFIX_DEPOSIT, &account.to_array())
}

pub struct Notary {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl Notary {
    pub const NAME: &'static str = "Notary";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new("balanceOf", &["account"], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new("expirationOf", &["account"], true, 1 << 15, 0, F::READ_STATES, true),
                NativeMethod::new(
                    "lockDepositUntil",
                    &["account", "till"],
                    true,
                    1 << 15,
                    0,
                    F::STATES,
                    false,
                ),
                NativeMethod::new(
                    "withdraw",
                    &["from", "to"],
                    true,
                    1 << 15,
                    0,
                    F::ALL,
                    false,
                ),
                NativeMethod::new(
                    "getMaxNotValidBeforeDelta",
                    &[],
                    true,
                    1 << 15,
                    0,
                    F::READ_STATES,
                    true,
                ),
                NativeMethod::new(
                    "setMaxNotValidBeforeDelta",
                    &["value"],
                    false,
                    1 << 15,
                    0,
                    F::STATES,
                    false,
                ),
                NativeMethod::new(
                    "onNEP17Payment",
                    &["from", "amount", "data"],
                    false,
                    1 << 15,
                    0,
                    F::STATES,
                    false,
                ),
            ],
        }
    }

    fn deposit(&self, host: &HostContext, account: &UInt160) -> ContractResult<Deposit> {
        match host.snapshot.try_get(&deposit_key(account)) {
            Some(item) => Deposit::from_bytes(&item.value),
            None => Ok(Deposit::default()),
        }
    }
}

impl Default for Notary {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for Notary {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        NOTARY_ID
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
            "balanceOf" => {
                let account = pop_account(&mut args)?;
                Ok(Some(StackItem::Integer(self.deposit(host, &account)?.amount)))
            }
            "expirationOf" => {
                let account = pop_account(&mut args)?;
                Ok(Some(StackItem::from_int(self.deposit(host, &account)?.till)))
            }
            "lockDepositUntil" => {
                let account = pop_account(&mut args)?;
                let till = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_u32()
                    .ok_or_else(|| ContractError::InvalidArgument("invalid height".into()))?;
                if !host.check_witness(engine, &account)? {
                    return Ok(Some(StackItem::Boolean(false)));
                }
                let mut deposit = self.deposit(host, &account)?;
                if deposit.amount.is_zero() || till <= deposit.till {
                    return Ok(Some(StackItem::Boolean(false)));
                }
                deposit.till = till;
                host.snapshot
                    .put(deposit_key(&account), StorageItem::new(deposit.to_bytes()));
                Ok(Some(StackItem::Boolean(true)))
            }
            "withdraw" => {
                let from = pop_account(&mut args)?;
                let to = pop_account(&mut args)?;
                if !host.check_witness(engine, &from)? {
                    return Ok(Some(StackItem::Boolean(false)));
                }
                let deposit = self.deposit(host, &from)?;
                let current = host
                    .persisting_block
                    .as_ref()
                    .map(|b| b.index)
                    .unwrap_or(u32::MAX);
                if deposit.amount.is_zero() || current < deposit.till {
                    return Ok(Some(StackItem::Boolean(false)));
                }
                host.snapshot.delete(&deposit_key(&from));
                // Move the locked GAS back out of the notary account.
                GasToken::burn_from(host, &self.hash(), &deposit.amount)?;
                GasToken::mint_to(host, &to, &deposit.amount)?;
                Ok(Some(StackItem::Boolean(true)))
            }
            "getMaxNotValidBeforeDelta" => {
                let value = host
                    .snapshot
                    .try_get(&StorageKey::with_prefix(NOTARY_ID, PREFIX_MAX_NVB_DELTA))
                    .map(|item| item.as_i64())
                    .unwrap_or(DEFAULT_MAX_NVB_DELTA);
                Ok(Some(StackItem::from_int(value)))
            }
            "setMaxNotValidBeforeDelta" => {
                let value = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_i64()
                    .filter(|v| *v > 0)
                    .ok_or_else(|| ContractError::InvalidArgument("invalid delta".into()))?;
                let committee = neo_token::committee_address(host)?;
                if !host.check_witness(engine, &committee)? {
                    return Err(ContractError::InvalidOperation(
                        "committee witness required".into(),
                    ));
                }
                host.snapshot.put(
                    StorageKey::with_prefix(NOTARY_ID, PREFIX_MAX_NVB_DELTA),
                    StorageItem::from_i64(value),
                );
                Ok(None)
            }
            "onNEP17Payment" => {
                // Only GAS transfers create deposits.
                let calling = engine
                    .current_context()
                    .and_then(|c| c.state.calling_script_hash)
                    .map(UInt160::from);
                if calling != Some(native_hash(GasToken::NAME)) {
                    return Err(ContractError::InvalidOperation(
                        "notary deposits accept GAS only".into(),
                    ));
                }
                let from = pop_account(&mut args)?;
                let amount = args.remove(0).as_int().map_err(ContractError::Vm)?;
                if amount.is_negative() {
                    return Err(ContractError::InvalidArgument("negative deposit".into()));
                }
                let data = args.remove(0);
                // data: [account|null, till]
                let (account, till) = match &data {
                    StackItem::Array(body) if body.borrow().len() == 2 => {
                        let entries = body.borrow();
                        let account = if entries[0].is_null() {
                            from
                        } else {
                            let bytes = entries[0].as_bytes().map_err(ContractError::Vm)?;
                            UInt160::from_bytes(&bytes)
                                .map_err(|e| ContractError::InvalidArgument(e.to_string()))?
                        };
                        let till = entries[1]
                            .as_int()
                            .map_err(ContractError::Vm)?
                            .to_u32()
                            .ok_or_else(|| {
                                ContractError::InvalidArgument("invalid lock height".into())
                            })?;
                        (account, till)
                    }
                    _ => {
                        return Err(ContractError::InvalidArgument(
                            "deposit data must be [account, till]".into(),
                        ))
                    }
                };
                let mut deposit = self.deposit(host, &account)?;
                deposit.amount += amount;
                deposit.till = deposit.till.max(till);
                host.snapshot
                    .put(deposit_key(&account), StorageItem::new(deposit.to_bytes()));
                Ok(None)
            }
            other => Err(ContractError::MethodNotFound(other.into())),
        }
    }
}
