// Copyright (C) 2015-2025 The Neo Project.
//
// fungible_token.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Shared NEP-17 bookkeeping for the NEO and GAS tokens.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use neo3_core::UInt160;
use neo3_persistence::{StorageItem, StorageKey};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

/// Account-state prefix shared by both tokens.
pub const PREFIX_ACCOUNT: u8 = 20;
/// Total-supply prefix shared by both tokens.
pub const PREFIX_TOTAL_SUPPLY: u8 = 11;

/// Reads a big integer stored in minimal little-endian form.
pub fn get_int(host: &HostContext, key: &StorageKey) -> BigInt {
    match host.snapshot.try_get(key) {
        Some(item) if !item.value.is_empty() => BigInt::from_signed_bytes_le(&item.value),
        _ => BigInt::zero(),
    }
}

/// Writes a big integer in minimal little-endian form.
pub fn put_int(host: &HostContext, key: StorageKey, value: &BigInt) {
    let bytes = if value.is_zero() {
        Vec::new()
    } else {
        value.to_signed_bytes_le()
    };
    host.snapshot.put(key, StorageItem::new(bytes));
}

/// The balance key of `account` for token `id`.
pub fn account_key(id: i32, account: &UInt160) -> StorageKey {
    StorageKey::with_prefix_bytes(id, PREFIX_ACCOUNT, &account.to_array())
}

/// The token's recorded total supply.
pub fn total_supply(host: &HostContext, id: i32) -> BigInt {
    get_int(host, &StorageKey::with_prefix(id, PREFIX_TOTAL_SUPPLY))
}

/// Raw balance of `account`.
pub fn balance_of(host: &HostContext, id: i32, account: &UInt160) -> BigInt {
    get_int(host, &account_key(id, account))
}

/// Emits the NEP-17 `Transfer` notification.
pub fn notify_transfer(
    host: &mut HostContext,
    token_hash: UInt160,
    from: Option<&UInt160>,
    to: Option<&UInt160>,
    amount: &BigInt,
) -> ContractResult<()> {
    let from_item = match from {
        Some(account) => StackItem::from_byte_string(account.to_array().to_vec()),
        None => StackItem::Null,
    };
    let to_item = match to {
        Some(account) => StackItem::from_byte_string(account.to_array().to_vec()),
        None => StackItem::Null,
    };
    let state = StackItem::new_array(vec![
        from_item,
        to_item,
        StackItem::Integer(amount.clone()),
    ]);
    host.send_notification(token_hash, "Transfer".into(), state)
}

/// Mints `amount` to `account` and notifies.
pub fn mint(
    host: &mut HostContext,
    id: i32,
    token_hash: UInt160,
    account: &UInt160,
    amount: &BigInt,
) -> ContractResult<()> {
    if amount.is_negative() {
        return Err(ContractError::InvalidArgument("cannot mint a negative amount".into()));
    }
    if amount.is_zero() {
        return Ok(());
    }
    let balance = balance_of(host, id, account) + amount;
    put_int(host, account_key(id, account), &balance);
    let supply = total_supply(host, id) + amount;
    put_int(
        host,
        StorageKey::with_prefix(id, PREFIX_TOTAL_SUPPLY),
        &supply,
    );
    notify_transfer(host, token_hash, None, Some(account), amount)
}

/// Burns `amount` from `account` and notifies.
pub fn burn(
    host: &mut HostContext,
    id: i32,
    token_hash: UInt160,
    account: &UInt160,
    amount: &BigInt,
) -> ContractResult<()> {
    if amount.is_negative() {
        return Err(ContractError::InvalidArgument("cannot burn a negative amount".into()));
    }
    if amount.is_zero() {
        return Ok(());
    }
    let balance = balance_of(host, id, account);
    if balance < *amount {
        return Err(ContractError::Native(format!(
            "burn of {amount} exceeds balance {balance}"
        )));
    }
    let remaining = balance - amount;
    if remaining.is_zero() {
        host.snapshot.delete(&account_key(id, account));
    } else {
        put_int(host, account_key(id, account), &remaining);
    }
    let supply = total_supply(host, id) - amount;
    put_int(
        host,
        StorageKey::with_prefix(id, PREFIX_TOTAL_SUPPLY),
        &supply,
    );
    notify_transfer(host, token_hash, Some(account), None, amount)
}

/// The shared `transfer` implementation.
///
/// `on_balance_changing` lets NEO hook vote bookkeeping into the same
/// code path.
#[allow(clippy::too_many_arguments)]
pub fn transfer(
    host: &mut HostContext,
    engine: &mut ExecutionEngine,
    id: i32,
    token_hash: UInt160,
    from: &UInt160,
    to: &UInt160,
    amount: &BigInt,
    data: StackItem,
    mut on_balance_changing: impl FnMut(&mut HostContext, &UInt160, &BigInt) -> ContractResult<()>,
) -> ContractResult<bool> {
    if amount.is_negative() {
        return Err(ContractError::InvalidArgument(
            "transfer amount cannot be negative".into(),
        ));
    }
    if !host.check_witness(engine, from)? {
        return Ok(false);
    }
    let from_balance = balance_of(host, id, from);
    if from_balance < *amount {
        return Ok(false);
    }

    if !amount.is_zero() && from != to {
        on_balance_changing(host, from, &-amount.clone())?;
        on_balance_changing(host, to, amount)?;
        let remaining = &from_balance - amount;
        if remaining.is_zero() {
            host.snapshot.delete(&account_key(id, from));
        } else {
            put_int(host, account_key(id, from), &remaining);
        }
        let to_balance = balance_of(host, id, to) + amount;
        put_int(host, account_key(id, to), &to_balance);
    }

    notify_transfer(host, token_hash, Some(from), Some(to), amount)?;
    // NEP-17 contracts receiving tokens get the payment callback; a
    // recipient contract without one rejects the transfer.
    if host.try_get_contract(to).is_some() {
        let args = vec![
            StackItem::from_byte_string(from.to_array().to_vec()),
            StackItem::Integer(amount.clone()),
            data,
        ];
        host.call_contract(
            engine,
            *to,
            "onNEP17Payment",
            CallFlags::ALL,
            args,
            true,
        )?;
    }
    Ok(true)
}
