// Copyright (C) 2015-2025 The Neo Project.
//
// binary_serializer.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Canonical binary encoding of stack items, used by contract storage,
//! notifications and the StdLib serialize/deserialize methods.
//!
//! Interop interfaces, pointers and cyclic structures cannot be encoded.

use crate::error::{ContractError, ContractResult};
use neo3_io::{BinaryWriter, MemoryReader};
use neo3_vm::stack_item::{StackItem, StackItemType};
use num_bigint::BigInt;
use num_traits::Zero;
use std::collections::HashSet;
use std::rc::Rc;

/// Default cap on the serialized size.
pub const MAX_SERIALIZED_SIZE: usize = 1024 * 1024;

/// Serializes `item` into its canonical byte form.
pub fn serialize(item: &StackItem, max_size: usize) -> ContractResult<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    let mut seen: HashSet<usize> = HashSet::new();
    serialize_inner(item, &mut writer, &mut seen, max_size)?;
    let bytes = writer.into_bytes();
    if bytes.len() > max_size {
        return Err(ContractError::Serialization(format!(
            "serialized item of {} bytes exceeds the limit",
            bytes.len()
        )));
    }
    Ok(bytes)
}

fn compound_id(item: &StackItem) -> Option<usize> {
    match item {
        StackItem::Array(body) | StackItem::Struct(body) => Some(Rc::as_ptr(body) as usize),
        StackItem::Map(body) => Some(Rc::as_ptr(body) as usize),
        _ => None,
    }
}

fn serialize_inner(
    item: &StackItem,
    writer: &mut BinaryWriter,
    seen: &mut HashSet<usize>,
    max_size: usize,
) -> ContractResult<()> {
    if writer.len() > max_size {
        return Err(ContractError::Serialization("item too large".into()));
    }
    match item {
        StackItem::Null => {
            writer.write_u8(StackItemType::Any as u8)?;
        }
        StackItem::Boolean(value) => {
            writer.write_u8(StackItemType::Boolean as u8)?;
            writer.write_bool(*value)?;
        }
        StackItem::Integer(value) => {
            writer.write_u8(StackItemType::Integer as u8)?;
            writer.write_var_bytes(&StackItem::int_to_bytes(value))?;
        }
        StackItem::ByteString(bytes) => {
            writer.write_u8(StackItemType::ByteString as u8)?;
            writer.write_var_bytes(bytes)?;
        }
        StackItem::Buffer(buffer) => {
            writer.write_u8(StackItemType::Buffer as u8)?;
            writer.write_var_bytes(&buffer.borrow())?;
        }
        StackItem::Array(body) | StackItem::Struct(body) => {
            let id = compound_id(item).unwrap_or_default();
            if !seen.insert(id) {
                return Err(ContractError::Serialization("cyclic item".into()));
            }
            let type_byte = if matches!(item, StackItem::Array(_)) {
                StackItemType::Array
            } else {
                StackItemType::Struct
            };
            writer.write_u8(type_byte as u8)?;
            let items = body.borrow();
            writer.write_var_int(items.len() as u64)?;
            for child in items.iter() {
                serialize_inner(child, writer, seen, max_size)?;
            }
            seen.remove(&id);
        }
        StackItem::Map(body) => {
            let id = compound_id(item).unwrap_or_default();
            if !seen.insert(id) {
                return Err(ContractError::Serialization("cyclic item".into()));
            }
            writer.write_u8(StackItemType::Map as u8)?;
            let entries = body.borrow();
            writer.write_var_int(entries.len() as u64)?;
            for (key, value) in entries.iter() {
                serialize_inner(key, writer, seen, max_size)?;
                serialize_inner(value, writer, seen, max_size)?;
            }
            seen.remove(&id);
        }
        StackItem::Pointer { .. } | StackItem::InteropInterface(_) => {
            return Err(ContractError::Serialization(format!(
                "{:?} items cannot be serialized",
                item.item_type()
            )));
        }
    }
    Ok(())
}

/// Restores a stack item from its canonical byte form.
pub fn deserialize(data: &[u8], max_size: usize) -> ContractResult<StackItem> {
    if data.len() > max_size {
        return Err(ContractError::Serialization("input too large".into()));
    }
    let mut reader = MemoryReader::new(data);
    let item = deserialize_inner(&mut reader, 0)?;
    if reader.remaining() != 0 {
        return Err(ContractError::Serialization("trailing bytes".into()));
    }
    Ok(item)
}

const MAX_NESTING: usize = 64;

fn deserialize_inner(reader: &mut MemoryReader<'_>, depth: usize) -> ContractResult<StackItem> {
    if depth > MAX_NESTING {
        return Err(ContractError::Serialization("nesting too deep".into()));
    }
    let type_byte = reader.read_u8()?;
    let item_type = StackItemType::from_byte(type_byte)
        .ok_or_else(|| ContractError::Serialization(format!("invalid type 0x{type_byte:02x}")))?;
    match item_type {
        StackItemType::Any => Ok(StackItem::Null),
        StackItemType::Boolean => Ok(StackItem::Boolean(reader.read_bool()?)),
        StackItemType::Integer => {
            let bytes = reader.read_var_bytes(32)?;
            if bytes.is_empty() {
                Ok(StackItem::Integer(BigInt::zero()))
            } else {
                Ok(StackItem::Integer(BigInt::from_signed_bytes_le(&bytes)))
            }
        }
        StackItemType::ByteString => Ok(StackItem::from_byte_string(
            reader.read_var_bytes(MAX_SERIALIZED_SIZE)?,
        )),
        StackItemType::Buffer => Ok(StackItem::from_buffer(
            reader.read_var_bytes(MAX_SERIALIZED_SIZE)?,
        )),
        StackItemType::Array | StackItemType::Struct => {
            let count = reader.read_var_int(u32::MAX as u64)? as usize;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(deserialize_inner(reader, depth + 1)?);
            }
            if item_type == StackItemType::Array {
                Ok(StackItem::new_array(items))
            } else {
                Ok(StackItem::new_struct(items))
            }
        }
        StackItemType::Map => {
            let count = reader.read_var_int(u32::MAX as u64)? as usize;
            let mut entries = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                let key = deserialize_inner(reader, depth + 1)?;
                if !key.item_type().is_primitive() {
                    return Err(ContractError::Serialization(
                        "map keys must be primitive".into(),
                    ));
                }
                let value = deserialize_inner(reader, depth + 1)?;
                entries.push((key, value));
            }
            Ok(StackItem::Map(Rc::new(std::cell::RefCell::new(entries))))
        }
        StackItemType::Pointer | StackItemType::InteropInterface => Err(
            ContractError::Serialization("unserializable item type".into()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(item: StackItem) -> StackItem {
        let bytes = serialize(&item, MAX_SERIALIZED_SIZE).unwrap();
        deserialize(&bytes, MAX_SERIALIZED_SIZE).unwrap()
    }

    #[test]
    fn test_primitive_roundtrip() {
        assert!(roundtrip(StackItem::Null).is_null());
        assert_eq!(roundtrip(StackItem::from_bool(true)).as_bool().unwrap(), true);
        assert_eq!(
            roundtrip(StackItem::from_int(-1234567890i64)).as_int().unwrap(),
            BigInt::from(-1234567890i64)
        );
        assert_eq!(
            roundtrip(StackItem::from_byte_string(vec![1, 2, 3])).as_bytes().unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_map_preserves_insertion_order() {
        let map = StackItem::new_map();
        if let StackItem::Map(body) = &map {
            let mut entries = body.borrow_mut();
            entries.push((StackItem::from_byte_string(b"z".to_vec()), StackItem::from_int(1)));
            entries.push((StackItem::from_byte_string(b"a".to_vec()), StackItem::from_int(2)));
        }
        let back = roundtrip(map);
        let StackItem::Map(body) = &back else { panic!() };
        let entries = body.borrow();
        assert_eq!(entries[0].0.as_bytes().unwrap(), b"z");
        assert_eq!(entries[1].0.as_bytes().unwrap(), b"a");
    }

    #[test]
    fn test_nested_compound_roundtrip() {
        let inner = StackItem::new_struct(vec![StackItem::from_int(7)]);
        let outer = StackItem::new_array(vec![inner, StackItem::Null]);
        let back = roundtrip(outer);
        let StackItem::Array(body) = &back else { panic!() };
        assert_eq!(body.borrow().len(), 2);
        assert!(matches!(body.borrow()[0], StackItem::Struct(_)));
    }

    #[test]
    fn test_cycle_rejected() {
        let array = StackItem::new_array(vec![]);
        if let StackItem::Array(body) = &array {
            body.borrow_mut().push(array.clone());
        }
        assert!(serialize(&array, MAX_SERIALIZED_SIZE).is_err());
    }

    #[test]
    fn test_interop_rejected() {
        #[derive(Debug)]
        struct Dummy;
        impl neo3_vm::stack_item::InteropValue for Dummy {
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
        let item = StackItem::from_interface(Rc::new(Dummy));
        assert!(serialize(&item, MAX_SERIALIZED_SIZE).is_err());
    }

    #[test]
    fn test_shared_subtree_is_not_a_cycle() {
        let shared = StackItem::new_array(vec![StackItem::from_int(1)]);
        let outer = StackItem::new_array(vec![shared.clone(), shared]);
        assert!(serialize(&outer, MAX_SERIALIZED_SIZE).is_ok());
    }
}
