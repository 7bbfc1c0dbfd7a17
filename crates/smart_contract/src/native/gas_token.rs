// Copyright (C) 2015-2025 The Neo Project.
//
// gas_token.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The GAS utility token.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::native::{fungible_token as ft, native_hash, neo_token, NativeContract, NativeMethod, GAS_ID};
use neo3_core::UInt160;
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_bigint::BigInt;

/// 8 decimals: one GAS is 10^8 datoshi.
pub const GAS_DECIMALS: u8 = 8;

pub struct GasToken {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl GasToken {
    pub const NAME: &'static str = "GasToken";

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
            ],
        }
    }

    /// Mints GAS outside the VM path (block rewards, genesis).
    pub fn mint_to(
        host: &mut HostContext,
        account: &UInt160,
        amount: &BigInt,
    ) -> ContractResult<()> {
        ft::mint(host, GAS_ID, native_hash(Self::NAME), account, amount)
    }

    /// Burns GAS outside the VM path (fees).
    pub fn burn_from(
        host: &mut HostContext,
        account: &UInt160,
        amount: &BigInt,
    ) -> ContractResult<()> {
        ft::burn(host, GAS_ID, native_hash(Self::NAME), account, amount)
    }
}

impl Default for GasToken {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for GasToken {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        GAS_ID
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
            "symbol" => Ok(Some(StackItem::from_byte_string(b"GAS".to_vec()))),
            "decimals" => Ok(Some(StackItem::from_int(GAS_DECIMALS))),
            "totalSupply" => Ok(Some(StackItem::Integer(ft::total_supply(host, GAS_ID)))),
            "balanceOf" => {
                let account = pop_account(&mut args)?;
                Ok(Some(StackItem::Integer(ft::balance_of(
                    host, GAS_ID, &account,
                ))))
            }
            "transfer" => {
                let from = pop_account(&mut args)?;
                let to = pop_account(&mut args)?;
                let amount = args.remove(0).as_int().map_err(ContractError::Vm)?;
                let data = args.remove(0);
                let ok = ft::transfer(
                    host,
                    engine,
                    GAS_ID,
                    self.hash,
                    &from,
                    &to,
                    &amount,
                    data,
                    |_, _, _| Ok(()),
                )?;
                Ok(Some(StackItem::Boolean(ok)))
            }
            other => Err(ContractError::MethodNotFound(other.into())),
        }
    }

    /// Genesis: the initial GAS distribution goes to the standby
    /// committee's multisig address.
    fn initialize(&self, host: &mut HostContext) -> ContractResult<()> {
        let committee = neo_token::committee_address(host)?;
        let amount = BigInt::from(host.settings.initial_gas_distribution);
        Self::mint_to(host, &committee, &amount)
    }

    /// Burns every transaction's fees from its sender, then credits the
    /// block's network fees to the primary validator.
    fn on_persist(&self, host: &mut HostContext) -> ContractResult<()> {
        let Some(block) = host.persisting_block.clone() else {
            return Ok(());
        };
        let txs = host.block_transactions.clone();
        let mut network_fees: i64 = 0;
        for tx in txs.iter() {
            let total = BigInt::from(tx.system_fee + tx.network_fee);
            Self::burn_from(host, &tx.sender(), &total)?;
            network_fees += tx.network_fee;
        }
        if network_fees > 0 {
            let validators = neo_token::next_block_validators(host)?;
            if let Some(primary) = validators.get(block.primary_index as usize) {
                let primary_account = crate::helpers::public_key_to_script_hash(primary)?;
                Self::mint_to(host, &primary_account, &BigInt::from(network_fees))?;
            }
        }
        Ok(())
    }
}

pub(crate) fn pop_account(args: &mut Vec<StackItem>) -> ContractResult<UInt160> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing account argument".into()));
    }
    let bytes = args.remove(0).as_bytes().map_err(ContractError::Vm)?;
    UInt160::from_bytes(&bytes).map_err(|e| ContractError::InvalidArgument(e.to_string()))
}
