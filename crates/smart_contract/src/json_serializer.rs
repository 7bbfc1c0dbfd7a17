// Copyright (C) 2015-2025 The Neo Project.
//
// json_serializer.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! JSON views of stack items: the strict StdLib jsonSerialize form and
//! the typed form used by RPC invoke results.

use crate::error::{ContractError, ContractResult};
use base64::Engine as _;
use neo3_vm::stack_item::{StackItem, StackItemType};
use num_traits::ToPrimitive;
use serde_json::{json, Map, Number, Value};
use std::collections::HashSet;
use std::rc::Rc;

/// Largest integer exactly representable in a JSON number.
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// StdLib `jsonSerialize`: strict JSON. Byte runs must be valid UTF-8,
/// integers must be JSON-safe, interop handles and cycles fail.
pub fn to_json(item: &StackItem) -> ContractResult<Value> {
    let mut seen = HashSet::new();
    to_json_inner(item, &mut seen)
}

fn compound_id(item: &StackItem) -> Option<usize> {
    match item {
        StackItem::Array(body) | StackItem::Struct(body) => Some(Rc::as_ptr(body) as usize),
        StackItem::Map(body) => Some(Rc::as_ptr(body) as usize),
        _ => None,
    }
}

fn to_json_inner(item: &StackItem, seen: &mut HashSet<usize>) -> ContractResult<Value> {
    match item {
        StackItem::Null => Ok(Value::Null),
        StackItem::Boolean(value) => Ok(Value::Bool(*value)),
        StackItem::Integer(value) => {
            let small = value
                .to_i64()
                .filter(|v| v.abs() <= MAX_SAFE_INTEGER)
                .ok_or_else(|| {
                    ContractError::Serialization("integer outside the JSON-safe range".into())
                })?;
            Ok(Value::Number(Number::from(small)))
        }
        StackItem::ByteString(_) | StackItem::Buffer(_) => {
            let bytes = item.as_bytes().map_err(ContractError::from)?;
            let text = String::from_utf8(bytes)
                .map_err(|_| ContractError::Serialization("byte run is not UTF-8".into()))?;
            Ok(Value::String(text))
        }
        StackItem::Array(body) | StackItem::Struct(body) => {
            let id = compound_id(item).unwrap_or_default();
            if !seen.insert(id) {
                return Err(ContractError::Serialization("cyclic item".into()));
            }
            let mut values = Vec::new();
            for child in body.borrow().iter() {
                values.push(to_json_inner(child, seen)?);
            }
            seen.remove(&id);
            Ok(Value::Array(values))
        }
        StackItem::Map(body) => {
            let id = compound_id(item).unwrap_or_default();
            if !seen.insert(id) {
                return Err(ContractError::Serialization("cyclic item".into()));
            }
            let mut object = Map::new();
            for (key, value) in body.borrow().iter() {
                let key_bytes = key.as_bytes().map_err(ContractError::from)?;
                let key_text = String::from_utf8(key_bytes)
                    .map_err(|_| ContractError::Serialization("map key is not UTF-8".into()))?;
                object.insert(key_text, to_json_inner(value, seen)?);
            }
            seen.remove(&id);
            Ok(Value::Object(object))
        }
        StackItem::Pointer { .. } | StackItem::InteropInterface(_) => Err(
            ContractError::Serialization("item type has no JSON form".into()),
        ),
    }
}

/// StdLib `jsonDeserialize`.
pub fn from_json(value: &Value) -> ContractResult<StackItem> {
    from_json_inner(value, 0)
}

const MAX_JSON_NESTING: usize = 64;

fn from_json_inner(value: &Value, depth: usize) -> ContractResult<StackItem> {
    if depth > MAX_JSON_NESTING {
        return Err(ContractError::Serialization("json nested too deep".into()));
    }
    match value {
        Value::Null => Ok(StackItem::Null),
        Value::Bool(flag) => Ok(StackItem::from_bool(*flag)),
        Value::Number(number) => {
            let integer = number
                .as_i64()
                .ok_or_else(|| ContractError::Serialization("non-integer number".into()))?;
            Ok(StackItem::from_int(integer))
        }
        Value::String(text) => Ok(StackItem::from_byte_string(text.as_bytes().to_vec())),
        Value::Array(values) => {
            let mut items = Vec::with_capacity(values.len());
            for child in values {
                items.push(from_json_inner(child, depth + 1)?);
            }
            Ok(StackItem::new_array(items))
        }
        Value::Object(object) => {
            let mut entries = Vec::with_capacity(object.len());
            for (key, child) in object {
                entries.push((
                    StackItem::from_byte_string(key.as_bytes().to_vec()),
                    from_json_inner(child, depth + 1)?,
                ));
            }
            Ok(StackItem::Map(Rc::new(std::cell::RefCell::new(entries))))
        }
    }
}

/// The typed rendering RPC invoke results use:
/// `{"type": "Integer", "value": "5"}`.
pub fn to_rpc_json(item: &StackItem) -> Value {
    let mut seen = HashSet::new();
    to_rpc_json_inner(item, &mut seen)
}

fn to_rpc_json_inner(item: &StackItem, seen: &mut HashSet<usize>) -> Value {
    let base64 = |bytes: &[u8]| base64::engine::general_purpose::STANDARD.encode(bytes);
    match item {
        StackItem::Null => json!({ "type": "Any", "value": Value::Null }),
        StackItem::Boolean(value) => json!({ "type": "Boolean", "value": value }),
        StackItem::Integer(value) => json!({ "type": "Integer", "value": value.to_string() }),
        StackItem::ByteString(bytes) => {
            json!({ "type": "ByteString", "value": base64(bytes) })
        }
        StackItem::Buffer(buffer) => {
            json!({ "type": "Buffer", "value": base64(&buffer.borrow()) })
        }
        StackItem::Array(body) | StackItem::Struct(body) => {
            let type_name = if item.item_type() == StackItemType::Array {
                "Array"
            } else {
                "Struct"
            };
            let id = compound_id(item).unwrap_or_default();
            if !seen.insert(id) {
                return json!({ "type": type_name, "value": "recursive" });
            }
            let values: Vec<Value> = body
                .borrow()
                .iter()
                .map(|child| to_rpc_json_inner(child, seen))
                .collect();
            seen.remove(&id);
            json!({ "type": type_name, "value": values })
        }
        StackItem::Map(body) => {
            let id = compound_id(item).unwrap_or_default();
            if !seen.insert(id) {
                return json!({ "type": "Map", "value": "recursive" });
            }
            let entries: Vec<Value> = body
                .borrow()
                .iter()
                .map(|(key, value)| {
                    json!({
                        "key": to_rpc_json_inner(key, seen),
                        "value": to_rpc_json_inner(value, seen),
                    })
                })
                .collect();
            seen.remove(&id);
            json!({ "type": "Map", "value": entries })
        }
        StackItem::Pointer { position, .. } => {
            json!({ "type": "Pointer", "value": position })
        }
        StackItem::InteropInterface(_) => {
            json!({ "type": "InteropInterface", "interface": "IIterator" })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_object() {
        let source = json!({"name": "neo", "count": 3, "flags": [true, null]});
        let item = from_json(&source).unwrap();
        assert_eq!(to_json(&item).unwrap(), source);
    }

    #[test]
    fn test_unsafe_integer_rejected() {
        let item = StackItem::from_int(1i128 << 60);
        assert!(to_json(&item).is_err());
    }

    #[test]
    fn test_non_utf8_rejected() {
        let item = StackItem::from_byte_string(vec![0xFF, 0xFE]);
        assert!(to_json(&item).is_err());
    }

    #[test]
    fn test_rpc_json_shapes() {
        let value = to_rpc_json(&StackItem::from_int(5));
        assert_eq!(value["type"], "Integer");
        assert_eq!(value["value"], "5");

        let value = to_rpc_json(&StackItem::from_byte_string(b"ab".to_vec()));
        assert_eq!(value["type"], "ByteString");
        assert_eq!(value["value"], "YWI=");
    }
}
