// Copyright (C) 2015-2025 The Neo Project.
//
// iterator.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! `System.Iterator.*` syscalls and the storage iterator handle.
//!
//! Iterators live on the stack as interop handles and die with the
//! engine; an RPC session that wants to keep traversing keeps the whole
//! engine alive instead.

use crate::application_engine::HostContext;
use crate::binary_serializer;
use crate::error::{ContractError, ContractResult};
use neo3_persistence::{DataCache, SeekDirection, StorageItem, StorageKey};
use neo3_vm::stack_item::{InteropValue, StackItem};
use neo3_vm::ExecutionEngine;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// `Storage.Find` option bits.
pub mod find_options {
    pub const KEYS_ONLY: u8 = 0x01;
    pub const REMOVE_PREFIX: u8 = 0x02;
    pub const VALUES_ONLY: u8 = 0x04;
    pub const DESERIALIZE_VALUES: u8 = 0x08;
    pub const PICK_FIELD_0: u8 = 0x10;
    pub const PICK_FIELD_1: u8 = 0x20;
    pub const BACKWARDS: u8 = 0x80;
    pub const ALL: u8 = KEYS_ONLY
        | REMOVE_PREFIX
        | VALUES_ONLY
        | DESERIALIZE_VALUES
        | PICK_FIELD_0
        | PICK_FIELD_1
        | BACKWARDS;
}

/// A lazy cursor over one contract's storage entries.
#[derive(Debug)]
pub struct StorageIterator {
    entries: RefCell<std::vec::IntoIter<(StorageKey, StorageItem)>>,
    current: RefCell<Option<(StorageKey, StorageItem)>>,
    prefix_len: usize,
    options: u8,
}

impl StorageIterator {
    /// Opens a cursor over `id`'s keys starting with `prefix`.
    pub fn open(
        snapshot: &DataCache,
        id: i32,
        prefix: Vec<u8>,
        options: u8,
    ) -> ContractResult<Self> {
        if options & !find_options::ALL != 0 {
            return Err(ContractError::InvalidArgument(format!(
                "undefined find options 0x{options:02x}"
            )));
        }
        if options & find_options::KEYS_ONLY != 0 && options & find_options::VALUES_ONLY != 0 {
            return Err(ContractError::InvalidArgument(
                "keys-only and values-only are mutually exclusive".into(),
            ));
        }
        let mut raw_prefix = Vec::with_capacity(4 + prefix.len());
        raw_prefix.extend_from_slice(&id.to_le_bytes());
        raw_prefix.extend_from_slice(&prefix);
        let direction = if options & find_options::BACKWARDS != 0 {
            SeekDirection::Backward
        } else {
            SeekDirection::Forward
        };
        let entries = snapshot.find(&raw_prefix, direction);
        Ok(Self {
            entries: RefCell::new(entries.into_iter()),
            current: RefCell::new(None),
            prefix_len: prefix.len(),
            options,
        })
    }

    /// Advances; returns whether an element is available.
    pub fn advance(&self) -> bool {
        let next = self.entries.borrow_mut().next();
        let available = next.is_some();
        *self.current.borrow_mut() = next;
        available
    }

    /// The element under the cursor, shaped per the find options.
    pub fn value(&self) -> ContractResult<StackItem> {
        let current = self.current.borrow();
        let (key, item) = current
            .as_ref()
            .ok_or_else(|| ContractError::InvalidOperation("iterator has no value".into()))?;

        let mut key_bytes = key.key.clone();
        if self.options & find_options::REMOVE_PREFIX != 0 {
            key_bytes = key_bytes.split_off(self.prefix_len.min(key_bytes.len()));
        }
        let key_item = StackItem::from_byte_string(key_bytes);

        let mut value_item = if self.options & find_options::DESERIALIZE_VALUES != 0 {
            binary_serializer::deserialize(&item.value, binary_serializer::MAX_SERIALIZED_SIZE)?
        } else {
            StackItem::from_byte_string(item.value.clone())
        };
        if self.options & (find_options::PICK_FIELD_0 | find_options::PICK_FIELD_1) != 0 {
            let index = usize::from(self.options & find_options::PICK_FIELD_1 != 0);
            let StackItem::Array(body) = &value_item else {
                return Err(ContractError::InvalidOperation(
                    "pick-field requires a deserialized array".into(),
                ));
            };
            let picked = body.borrow().get(index).cloned().ok_or_else(|| {
                ContractError::InvalidOperation("picked field out of range".into())
            })?;
            value_item = picked;
        }

        if self.options & find_options::KEYS_ONLY != 0 {
            return Ok(key_item);
        }
        if self.options & find_options::VALUES_ONLY != 0 {
            return Ok(value_item);
        }
        Ok(StackItem::new_struct(vec![key_item, value_item]))
    }
}

impl InteropValue for StorageIterator {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn pop_iterator(engine: &mut ExecutionEngine) -> ContractResult<Rc<dyn InteropValue>> {
    let item = engine.pop()?;
    item.as_interface::<StorageIterator>()
        .map_err(ContractError::Vm)
}

pub fn next(_host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let handle = pop_iterator(engine)?;
    let iterator = handle
        .as_any()
        .downcast_ref::<StorageIterator>()
        .ok_or_else(|| ContractError::InvalidArgument("expected an iterator".into()))?;
    let advanced = iterator.advance();
    engine.push(StackItem::Boolean(advanced))?;
    Ok(())
}

pub fn value(_host: &mut HostContext, engine: &mut ExecutionEngine) -> ContractResult<()> {
    let handle = pop_iterator(engine)?;
    let iterator = handle
        .as_any()
        .downcast_ref::<StorageIterator>()
        .ok_or_else(|| ContractError::InvalidArgument("expected an iterator".into()))?;
    let item = iterator.value()?;
    engine.push(item)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo3_persistence::MemoryStore;
    use std::sync::Arc;

    fn snapshot_with_entries() -> Arc<DataCache> {
        let store: Arc<dyn neo3_persistence::Store> = Arc::new(MemoryStore::new());
        let cache = Arc::new(DataCache::new(store));
        cache.put(
            StorageKey::with_prefix_bytes(5, 0x01, &[0x02]),
            StorageItem::new(vec![0x03, 0x04]),
        );
        cache.put(
            StorageKey::with_prefix_bytes(5, 0x01, &[0x05]),
            StorageItem::new(vec![0x06]),
        );
        cache.put(
            StorageKey::with_prefix(5, 0x02),
            StorageItem::new(vec![0xFF]),
        );
        cache
    }

    #[test]
    fn test_prefix_scan_and_shapes() {
        let cache = snapshot_with_entries();
        let iterator = StorageIterator::open(&cache, 5, vec![0x01], 0).unwrap();
        assert!(iterator.advance());
        let StackItem::Struct(body) = iterator.value().unwrap() else {
            panic!("expected a key/value struct");
        };
        assert_eq!(body.borrow()[0].as_bytes().unwrap(), vec![0x01, 0x02]);
        assert_eq!(body.borrow()[1].as_bytes().unwrap(), vec![0x03, 0x04]);
        assert!(iterator.advance());
        assert!(!iterator.advance());
    }

    #[test]
    fn test_keys_only_with_prefix_removal() {
        let cache = snapshot_with_entries();
        let iterator = StorageIterator::open(
            &cache,
            5,
            vec![0x01],
            find_options::KEYS_ONLY | find_options::REMOVE_PREFIX,
        )
        .unwrap();
        assert!(iterator.advance());
        assert_eq!(iterator.value().unwrap().as_bytes().unwrap(), vec![0x02]);
    }

    #[test]
    fn test_conflicting_options_rejected() {
        let cache = snapshot_with_entries();
        assert!(StorageIterator::open(
            &cache,
            5,
            vec![],
            find_options::KEYS_ONLY | find_options::VALUES_ONLY
        )
        .is_err());
    }

    #[test]
    fn test_value_before_next_fails() {
        let cache = snapshot_with_entries();
        let iterator = StorageIterator::open(&cache, 5, vec![0x01], 0).unwrap();
        assert!(iterator.value().is_err());
    }
}
