// Copyright (C) 2015-2025 The Neo Project.
//
// crypto_lib.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! CryptoLib: hashing, curve verification and BLS12-381 operations.

use crate::application_engine::HostContext;
use crate::error::{ContractError, ContractResult};
use crate::native::{native_hash, NativeContract, NativeMethod, CRYPTO_LIB_ID};
use neo3_core::UInt160;
use neo3_crypto::bls::BlsPoint;
use neo3_crypto::ecc::verify_signature;
use neo3_crypto::hash::{ripemd160, sha256};
use neo3_crypto::{murmur32, Secp256Curve};
use neo3_vm::stack_item::{InteropValue, StackItem};
use neo3_vm::{CallFlags, ExecutionEngine};
use num_traits::ToPrimitive;
use std::any::Any;
use std::rc::Rc;

/// Named curves accepted by `verifyWithECDsa`.
const CURVE_SECP256K1: u8 = 22;
const CURVE_SECP256R1: u8 = 23;

/// A BLS12-381 point carried on the stack.
#[derive(Debug)]
pub struct BlsPointHandle(pub BlsPoint);

impl InteropValue for BlsPointHandle {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn pop_bls(args: &mut Vec<StackItem>) -> ContractResult<BlsPoint> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing bls point".into()));
    }
    let item = args.remove(0);
    let handle = item
        .as_interface::<BlsPointHandle>()
        .map_err(ContractError::Vm)?;
    let point = handle
        .as_any()
        .downcast_ref::<BlsPointHandle>()
        .ok_or_else(|| ContractError::InvalidArgument("expected a bls point".into()))?;
    Ok(point.0.clone())
}

pub struct CryptoLib {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl CryptoLib {
    pub const NAME: &'static str = "CryptoLib";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new("sha256", &["data"], true, 1 << 15, 0, F::NONE, true),
                NativeMethod::new("ripemd160", &["data"], true, 1 << 15, 0, F::NONE, true),
                NativeMethod::new("murmur32", &["data", "seed"], true, 1 << 13, 0, F::NONE, true),
                NativeMethod::new(
                    "verifyWithECDsa",
                    &["message", "pubkey", "signature", "curve"],
                    true,
                    1 << 15,
                    0,
                    F::NONE,
                    true,
                ),
                NativeMethod::new("bls12381Serialize", &["g"], true, 1 << 19, 0, F::NONE, true),
                NativeMethod::new("bls12381Deserialize", &["data"], true, 1 << 19, 0, F::NONE, true),
                NativeMethod::new("bls12381Equal", &["x", "y"], true, 1 << 5, 0, F::NONE, true),
                NativeMethod::new("bls12381Add", &["x", "y"], true, 1 << 19, 0, F::NONE, true),
                NativeMethod::new(
                    "bls12381Mul",
                    &["x", "mul", "neg"],
                    true,
                    1 << 21,
                    0,
                    F::NONE,
                    true,
                ),
                NativeMethod::new("bls12381Pairing", &["g1", "g2"], true, 1 << 23, 0, F::NONE, true),
            ],
        }
    }
}

impl Default for CryptoLib {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for CryptoLib {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        CRYPTO_LIB_ID
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
        _host: &mut HostContext,
        _engine: &mut ExecutionEngine,
    ) -> ContractResult<Option<StackItem>> {
        match method {
            "sha256" => {
                let data = pop_bytes(&mut args)?;
                Ok(Some(StackItem::from_byte_string(sha256(&data).to_vec())))
            }
            "ripemd160" => {
                let data = pop_bytes(&mut args)?;
                Ok(Some(StackItem::from_byte_string(ripemd160(&data).to_vec())))
            }
            "murmur32" => {
                let data = pop_bytes(&mut args)?;
                let seed = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_u32()
                    .ok_or_else(|| ContractError::InvalidArgument("invalid seed".into()))?;
                Ok(Some(StackItem::from_byte_string(
                    murmur32(&data, seed).to_le_bytes().to_vec(),
                )))
            }
            "verifyWithECDsa" => {
                let message = pop_bytes(&mut args)?;
                let pubkey = pop_bytes(&mut args)?;
                let signature = pop_bytes(&mut args)?;
                let curve = args
                    .remove(0)
                    .as_int()
                    .map_err(ContractError::Vm)?
                    .to_u8()
                    .ok_or_else(|| ContractError::InvalidArgument("invalid curve".into()))?;
                let curve = match curve {
                    CURVE_SECP256K1 => Secp256Curve::K1,
                    CURVE_SECP256R1 => Secp256Curve::R1,
                    other => {
                        return Err(ContractError::InvalidArgument(format!(
                            "unknown curve {other}"
                        )))
                    }
                };
                let valid = verify_signature(curve, &message, &signature, &pubkey);
                Ok(Some(StackItem::Boolean(valid)))
            }
            "bls12381Serialize" => {
                let point = pop_bls(&mut args)?;
                let bytes = point
                    .serialize()
                    .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
                Ok(Some(StackItem::from_byte_string(bytes)))
            }
            "bls12381Deserialize" => {
                let data = pop_bytes(&mut args)?;
                let point = BlsPoint::deserialize(&data)
                    .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
                Ok(Some(StackItem::from_interface(Rc::new(BlsPointHandle(
                    point,
                )))))
            }
            "bls12381Equal" => {
                let left = pop_bls(&mut args)?;
                let right = pop_bls(&mut args)?;
                Ok(Some(StackItem::Boolean(left == right)))
            }
            "bls12381Add" => {
                let left = pop_bls(&mut args)?;
                let right = pop_bls(&mut args)?;
                let sum = left
                    .add(&right)
                    .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
                Ok(Some(StackItem::from_interface(Rc::new(BlsPointHandle(sum)))))
            }
            "bls12381Mul" => {
                let point = pop_bls(&mut args)?;
                let scalar = pop_bytes(&mut args)?;
                let negate = args.remove(0).as_bool().map_err(ContractError::Vm)?;
                let product = point
                    .mul(&scalar, negate)
                    .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
                Ok(Some(StackItem::from_interface(Rc::new(BlsPointHandle(
                    product,
                )))))
            }
            "bls12381Pairing" => {
                let g1 = pop_bls(&mut args)?;
                let g2 = pop_bls(&mut args)?;
                let result = g1
                    .pairing(&g2)
                    .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
                Ok(Some(StackItem::from_interface(Rc::new(BlsPointHandle(
                    result,
                )))))
            }
            other => Err(ContractError::MethodNotFound(other.into())),
        }
    }
}

fn pop_bytes(args: &mut Vec<StackItem>) -> ContractResult<Vec<u8>> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing argument".into()));
    }
    args.remove(0).as_bytes().map_err(ContractError::Vm)
}
