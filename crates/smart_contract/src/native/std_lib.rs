// Copyright (C) 2015-2025 The Neo Project.
//
// std_lib.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! StdLib: serialization, encodings and byte-run utilities.

use crate::application_engine::HostContext;
use crate::binary_serializer;
use crate::error::{ContractError, ContractResult};
use crate::json_serializer;
use crate::native::{native_hash, NativeContract, NativeMethod, STD_LIB_ID};
use base64::Engine as _;
use neo3_core::UInt160;
use neo3_crypto::{base58check_decode, base58check_encode};
use neo3_vm::stack_item::StackItem;
use neo3_vm::{CallFlags, ExecutionEngine};
use num_bigint::BigInt;
use num_traits::{Num, ToPrimitive};

/// Input cap shared by the string utilities.
const MAX_INPUT_LENGTH: usize = 1024;

pub struct StdLib {
    hash: UInt160,
    methods: Vec<NativeMethod>,
}

impl StdLib {
    pub const NAME: &'static str = "StdLib";

    pub fn new() -> Self {
        use CallFlags as F;
        Self {
            hash: native_hash(Self::NAME),
            methods: vec![
                NativeMethod::new("serialize", &["item"], true, 1 << 12, 0, F::NONE, true),
                NativeMethod::new("deserialize", &["data"], true, 1 << 14, 0, F::NONE, true),
                NativeMethod::new("jsonSerialize", &["item"], true, 1 << 12, 0, F::NONE, true),
                NativeMethod::new("jsonDeserialize", &["json"], true, 1 << 14, 0, F::NONE, true),
                NativeMethod::new("itoa", &["value", "base"], true, 1 << 12, 0, F::NONE, true),
                NativeMethod::new("atoi", &["value", "base"], true, 1 << 6, 0, F::NONE, true),
                NativeMethod::new("base64Encode", &["data"], true, 1 << 5, 0, F::NONE, true),
                NativeMethod::new("base64Decode", &["s"], true, 1 << 5, 0, F::NONE, true),
                NativeMethod::new("base58Encode", &["data"], true, 1 << 13, 0, F::NONE, true),
                NativeMethod::new("base58Decode", &["s"], true, 1 << 10, 0, F::NONE, true),
                NativeMethod::new("base58CheckEncode", &["data"], true, 1 << 16, 0, F::NONE, true),
                NativeMethod::new("base58CheckDecode", &["s"], true, 1 << 16, 0, F::NONE, true),
                NativeMethod::new(
                    "memoryCompare",
                    &["str1", "str2"],
                    true,
                    1 << 5,
                    0,
                    F::NONE,
                    true,
                ),
                NativeMethod::new(
                    "memorySearch",
                    &["mem", "value"],
                    true,
                    1 << 6,
                    0,
                    F::NONE,
                    true,
                ),
                NativeMethod::new(
                    "memorySearch",
                    &["mem", "value", "start"],
                    true,
                    1 << 6,
                    0,
                    F::NONE,
                    true,
                ),
                NativeMethod::new(
                    "stringSplit",
                    &["str", "separator"],
                    true,
                    1 << 8,
                    0,
                    F::NONE,
                    true,
                ),
                NativeMethod::new("strLen", &["str"], true, 1 << 8, 0, F::NONE, true),
            ],
        }
    }
}

impl Default for StdLib {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeContract for StdLib {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn id(&self) -> i32 {
        STD_LIB_ID
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
        match (method, args.len()) {
            ("serialize", _) => {
                let item = args.remove(0);
                let bytes =
                    binary_serializer::serialize(&item, binary_serializer::MAX_SERIALIZED_SIZE)?;
                Ok(Some(StackItem::from_byte_string(bytes)))
            }
            ("deserialize", _) => {
                let data = pop_bytes(&mut args)?;
                let item =
                    binary_serializer::deserialize(&data, binary_serializer::MAX_SERIALIZED_SIZE)?;
                Ok(Some(item))
            }
            ("jsonSerialize", _) => {
                let item = args.remove(0);
                let value = json_serializer::to_json(&item)?;
                let text = serde_json::to_string(&value)
                    .map_err(|e| ContractError::Serialization(e.to_string()))?;
                Ok(Some(StackItem::from_byte_string(text.into_bytes())))
            }
            ("jsonDeserialize", _) => {
                let data = pop_bytes(&mut args)?;
                let value: serde_json::Value = serde_json::from_slice(&data)
                    .map_err(|e| ContractError::Serialization(e.to_string()))?;
                Ok(Some(json_serializer::from_json(&value)?))
            }
            ("itoa", _) => {
                let value = args.remove(0).as_int().map_err(ContractError::Vm)?;
                let base = pop_base(&mut args)?;
                let text = match base {
                    10 => value.to_string(),
                    16 => format!("{value:x}"),
                    _ => unreachable!("base validated"),
                };
                Ok(Some(StackItem::from_byte_string(text.into_bytes())))
            }
            ("atoi", _) => {
                let text = pop_string(&mut args)?;
                let base = pop_base(&mut args)?;
                let value = BigInt::from_str_radix(text.trim(), base)
                    .map_err(|_| ContractError::InvalidArgument(format!("invalid number: {text}")))?;
                Ok(Some(StackItem::Integer(value)))
            }
            ("base64Encode", _) => {
                let data = pop_bytes(&mut args)?;
                let encoded = base64::engine::general_purpose::STANDARD.encode(data);
                Ok(Some(StackItem::from_byte_string(encoded.into_bytes())))
            }
            ("base64Decode", _) => {
                let text = pop_string(&mut args)?;
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(text.trim())
                    .map_err(|_| ContractError::InvalidArgument("invalid base64".into()))?;
                Ok(Some(StackItem::from_byte_string(decoded)))
            }
            ("base58Encode", _) => {
                let data = pop_bytes(&mut args)?;
                Ok(Some(StackItem::from_byte_string(
                    bs58::encode(data).into_string().into_bytes(),
                )))
            }
            ("base58Decode", _) => {
                let text = pop_string(&mut args)?;
                let decoded = bs58::decode(text.trim())
                    .into_vec()
                    .map_err(|_| ContractError::InvalidArgument("invalid base58".into()))?;
                Ok(Some(StackItem::from_byte_string(decoded)))
            }
            ("base58CheckEncode", _) => {
                let data = pop_bytes(&mut args)?;
                Ok(Some(StackItem::from_byte_string(
                    base58check_encode(&data).into_bytes(),
                )))
            }
            ("base58CheckDecode", _) => {
                let text = pop_string(&mut args)?;
                let decoded = base58check_decode(text.trim())
                    .map_err(|e| ContractError::InvalidArgument(e.to_string()))?;
                Ok(Some(StackItem::from_byte_string(decoded)))
            }
            ("memoryCompare", _) => {
                let left = pop_bytes(&mut args)?;
                let right = pop_bytes(&mut args)?;
                let ordering = left.cmp(&right) as i8;
                Ok(Some(StackItem::from_int(ordering)))
            }
            ("memorySearch", arity) => {
                let haystack = pop_bytes(&mut args)?;
                let needle = pop_bytes(&mut args)?;
                let start = if arity == 3 {
                    args.remove(0)
                        .as_int()
                        .map_err(ContractError::Vm)?
                        .to_usize()
                        .ok_or_else(|| {
                            ContractError::InvalidArgument("invalid start index".into())
                        })?
                } else {
                    0
                };
                let position = if needle.is_empty() || start > haystack.len() {
                    None
                } else {
                    haystack[start..]
                        .windows(needle.len())
                        .position(|w| w == needle)
                        .map(|p| p + start)
                };
                Ok(Some(StackItem::from_int(
                    position.map(|p| p as i64).unwrap_or(-1),
                )))
            }
            ("stringSplit", _) => {
                let text = pop_string(&mut args)?;
                let separator = pop_string(&mut args)?;
                if separator.is_empty() {
                    return Err(ContractError::InvalidArgument("empty separator".into()));
                }
                let parts: Vec<StackItem> = text
                    .split(separator.as_str())
                    .map(|part| StackItem::from_byte_string(part.as_bytes().to_vec()))
                    .collect();
                Ok(Some(StackItem::new_array(parts)))
            }
            ("strLen", _) => {
                let text = pop_string(&mut args)?;
                // Character count, not byte count.
                Ok(Some(StackItem::from_int(text.chars().count() as i64)))
            }
            (other, _) => Err(ContractError::MethodNotFound(other.into())),
        }
    }
}

fn pop_bytes(args: &mut Vec<StackItem>) -> ContractResult<Vec<u8>> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing argument".into()));
    }
    args.remove(0).as_bytes().map_err(ContractError::Vm)
}

fn pop_string(args: &mut Vec<StackItem>) -> ContractResult<String> {
    let bytes = pop_bytes(args)?;
    if bytes.len() > MAX_INPUT_LENGTH * 4 {
        return Err(ContractError::InvalidArgument("input too long".into()));
    }
    String::from_utf8(bytes).map_err(|_| ContractError::InvalidArgument("input is not UTF-8".into()))
}

fn pop_base(args: &mut Vec<StackItem>) -> ContractResult<u32> {
    if args.is_empty() {
        return Err(ContractError::InvalidArgument("missing base".into()));
    }
    let base = args
        .remove(0)
        .as_int()
        .map_err(ContractError::Vm)?
        .to_u32()
        .ok_or_else(|| ContractError::InvalidArgument("invalid base".into()))?;
    if base != 10 && base != 16 {
        return Err(ContractError::InvalidArgument(format!(
            "unsupported base {base}"
        )));
    }
    Ok(base)
}
