//! Compound-type handlers.
//!
//! Every child added to a compound registers a reference with the
//! engine's counter, and every removed child releases one, so the global
//! item budget sees nested items.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::stack_item::StackItem;

/// Registers the containment edges of a freshly built item: its own
/// direct children, and recursively those of nested structs created by a
/// struct clone (shared children contribute their one new edge only).
fn register_new_edges(engine: &ExecutionEngine, item: &StackItem) {
    match item {
        StackItem::Array(body) | StackItem::Struct(body) => {
            let children = body.borrow();
            for _ in 0..children.len() {
                engine.reference_counter().add_reference();
            }
            if matches!(item, StackItem::Struct(_)) {
                for child in children.iter() {
                    if matches!(child, StackItem::Struct(_)) {
                        register_new_edges(engine, child);
                    }
                }
            }
        }
        StackItem::Map(body) => {
            for _ in 0..body.borrow().len() * 2 {
                engine.reference_counter().add_reference();
            }
        }
        _ => {}
    }
}

fn check_count(engine: &ExecutionEngine, count: usize) -> VmResult<()> {
    if count > engine.limits().max_stack_size {
        return Err(VmError::LimitExceeded(format!(
            "compound of {count} items exceeds the stack budget"
        )));
    }
    Ok(())
}

pub fn pack(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = engine.pop()?.as_index()?;
    check_count(engine, count)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(engine.pop()?);
    }
    let array = StackItem::new_array(items);
    register_new_edges(engine, &array);
    engine.push(array)
}

pub fn pack_struct(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = engine.pop()?.as_index()?;
    check_count(engine, count)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(engine.pop()?);
    }
    let value = StackItem::new_struct(items);
    register_new_edges(engine, &value);
    engine.push(value)
}

pub fn pack_map(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = engine.pop()?.as_index()?;
    check_count(engine, count)?;
    let limits = *engine.limits();
    let mut entries: Vec<(StackItem, StackItem)> = Vec::with_capacity(count);
    for _ in 0..count {
        let key = engine.pop()?;
        let value = engine.pop()?;
        if !key.item_type().is_primitive() {
            return Err(VmError::InvalidType("map keys must be primitive".into()));
        }
        match StackItem::map_find(&entries, &key, &limits)? {
            Some(index) => entries[index] = (key, value),
            None => entries.push((key, value)),
        }
    }
    let map = StackItem::Map(std::rc::Rc::new(std::cell::RefCell::new(entries)));
    register_new_edges(engine, &map);
    engine.push(map)
}

pub fn unpack(engine: &mut ExecutionEngine) -> VmResult<()> {
    let compound = engine.pop()?;
    match &compound {
        StackItem::Array(body) | StackItem::Struct(body) => {
            let items = body.borrow();
            for item in items.iter().rev() {
                engine.push(item.clone())?;
            }
            engine.push(StackItem::from_int(items.len() as i64))
        }
        StackItem::Map(body) => {
            let entries = body.borrow();
            for (key, value) in entries.iter().rev() {
                engine.push(value.clone())?;
                engine.push(key.clone())?;
            }
            engine.push(StackItem::from_int(entries.len() as i64))
        }
        other => Err(VmError::InvalidType(format!(
            "UNPACK requires a compound, got {:?}",
            other.item_type()
        ))),
    }
}

pub fn new_array(engine: &mut ExecutionEngine, fixed: Option<usize>) -> VmResult<()> {
    let count = match fixed {
        Some(count) => count,
        None => engine.pop()?.as_index()?,
    };
    check_count(engine, count)?;
    let array = StackItem::new_array(vec![StackItem::Null; count]);
    register_new_edges(engine, &array);
    engine.push(array)
}

pub fn new_struct(engine: &mut ExecutionEngine, fixed: Option<usize>) -> VmResult<()> {
    let count = match fixed {
        Some(count) => count,
        None => engine.pop()?.as_index()?,
    };
    check_count(engine, count)?;
    let value = StackItem::new_struct(vec![StackItem::Null; count]);
    register_new_edges(engine, &value);
    engine.push(value)
}

pub fn new_map(engine: &mut ExecutionEngine) -> VmResult<()> {
    engine.push(StackItem::new_map())
}

pub fn size(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.pop()?;
    let size = match &item {
        StackItem::Array(body) | StackItem::Struct(body) => body.borrow().len(),
        StackItem::Map(body) => body.borrow().len(),
        other => other.byte_len()?,
    };
    engine.push(StackItem::from_int(size as i64))
}

pub fn has_key(engine: &mut ExecutionEngine) -> VmResult<()> {
    let key = engine.pop()?;
    let collection = engine.pop()?;
    let limits = *engine.limits();
    let result = match &collection {
        StackItem::Array(body) | StackItem::Struct(body) => {
            let index = key.as_index()?;
            index < body.borrow().len()
        }
        StackItem::Map(body) => StackItem::map_find(&body.borrow(), &key, &limits)?.is_some(),
        StackItem::ByteString(bytes) => key.as_index()? < bytes.len(),
        StackItem::Buffer(buffer) => key.as_index()? < buffer.borrow().len(),
        other => {
            return Err(VmError::InvalidType(format!(
                "HASKEY cannot inspect {:?}",
                other.item_type()
            )))
        }
    };
    engine.push(StackItem::Boolean(result))
}

pub fn keys(engine: &mut ExecutionEngine) -> VmResult<()> {
    let map = engine.pop()?;
    let StackItem::Map(body) = &map else {
        return Err(VmError::InvalidType("KEYS requires a map".into()));
    };
    let keys: Vec<StackItem> = body.borrow().iter().map(|(k, _)| k.clone()).collect();
    let array = StackItem::new_array(keys);
    register_new_edges(engine, &array);
    engine.push(array)
}

pub fn values(engine: &mut ExecutionEngine) -> VmResult<()> {
    let collection = engine.pop()?;
    let values: Vec<StackItem> = match &collection {
        StackItem::Array(body) | StackItem::Struct(body) => body.borrow().clone(),
        StackItem::Map(body) => body.borrow().iter().map(|(_, v)| v.clone()).collect(),
        other => {
            return Err(VmError::InvalidType(format!(
                "VALUES cannot enumerate {:?}",
                other.item_type()
            )))
        }
    };
    let array = StackItem::new_array(values);
    register_new_edges(engine, &array);
    engine.push(array)
}

pub fn pick_item(engine: &mut ExecutionEngine) -> VmResult<()> {
    let key = engine.pop()?;
    let collection = engine.pop()?;
    let limits = *engine.limits();
    let item = match &collection {
        StackItem::Array(body) | StackItem::Struct(body) => {
            let index = key.as_index()?;
            let items = body.borrow();
            items
                .get(index)
                .cloned()
                .ok_or_else(|| VmError::Catchable(format!("index {index} out of range")))?
        }
        StackItem::Map(body) => {
            let entries = body.borrow();
            match StackItem::map_find(&entries, &key, &limits)? {
                Some(index) => entries[index].1.clone(),
                None => return Err(VmError::Catchable("key not found in map".into())),
            }
        }
        StackItem::ByteString(bytes) => {
            let index = key.as_index()?;
            let byte = bytes
                .get(index)
                .copied()
                .ok_or_else(|| VmError::Catchable(format!("index {index} out of range")))?;
            StackItem::from_int(i64::from(byte))
        }
        StackItem::Buffer(buffer) => {
            let index = key.as_index()?;
            let bytes = buffer.borrow();
            let byte = bytes
                .get(index)
                .copied()
                .ok_or_else(|| VmError::Catchable(format!("index {index} out of range")))?;
            StackItem::from_int(i64::from(byte))
        }
        other => {
            return Err(VmError::InvalidType(format!(
                "PICKITEM cannot index {:?}",
                other.item_type()
            )))
        }
    };
    engine.push(item)
}

pub fn append(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.pop()?;
    let target = engine.pop()?;
    let limits = *engine.limits();
    let (StackItem::Array(body) | StackItem::Struct(body)) = &target else {
        return Err(VmError::InvalidType("APPEND requires an array or struct".into()));
    };
    let item = match &item {
        StackItem::Struct(_) => {
            let cloned = item.clone_struct(&limits)?;
            register_new_edges(engine, &cloned);
            cloned
        }
        other => other.clone(),
    };
    engine.reference_counter().add_reference();
    body.borrow_mut().push(item);
    Ok(())
}

pub fn set_item(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = engine.pop()?;
    let key = engine.pop()?;
    let collection = engine.pop()?;
    let limits = *engine.limits();
    match &collection {
        StackItem::Array(body) | StackItem::Struct(body) => {
            let index = key.as_index()?;
            let value = match &value {
                StackItem::Struct(_) => {
                    let cloned = value.clone_struct(&limits)?;
                    register_new_edges(engine, &cloned);
                    cloned
                }
                other => other.clone(),
            };
            let mut items = body.borrow_mut();
            let slot = items.get_mut(index).ok_or_else(|| {
                VmError::Catchable(format!("index {index} out of range"))
            })?;
            engine.reference_counter().add_reference();
            *slot = value;
            engine.reference_counter().remove_reference();
            Ok(())
        }
        StackItem::Map(body) => {
            let mut entries = body.borrow_mut();
            match StackItem::map_find(&entries, &key, &limits)? {
                Some(index) => {
                    engine.reference_counter().add_reference();
                    entries[index] = (key, value);
                    engine.reference_counter().remove_reference();
                }
                None => {
                    engine.reference_counter().add_reference();
                    engine.reference_counter().add_reference();
                    entries.push((key, value));
                }
            }
            Ok(())
        }
        StackItem::Buffer(buffer) => {
            let index = key.as_index()?;
            let byte = value.as_int()?;
            let byte = u8::try_from(&byte)
                .map_err(|_| VmError::InvalidOperation("byte value out of range".into()))?;
            let mut bytes = buffer.borrow_mut();
            let slot = bytes.get_mut(index).ok_or_else(|| {
                VmError::Catchable(format!("index {index} out of range"))
            })?;
            *slot = byte;
            Ok(())
        }
        other => Err(VmError::InvalidType(format!(
            "SETITEM cannot index {:?}",
            other.item_type()
        ))),
    }
}

pub fn reverse_items(engine: &mut ExecutionEngine) -> VmResult<()> {
    let collection = engine.pop()?;
    match &collection {
        StackItem::Array(body) | StackItem::Struct(body) => {
            body.borrow_mut().reverse();
            Ok(())
        }
        StackItem::Buffer(buffer) => {
            buffer.borrow_mut().reverse();
            Ok(())
        }
        other => Err(VmError::InvalidType(format!(
            "REVERSEITEMS cannot reverse {:?}",
            other.item_type()
        ))),
    }
}

pub fn remove(engine: &mut ExecutionEngine) -> VmResult<()> {
    let key = engine.pop()?;
    let collection = engine.pop()?;
    let limits = *engine.limits();
    match &collection {
        StackItem::Array(body) | StackItem::Struct(body) => {
            let index = key.as_index()?;
            let mut items = body.borrow_mut();
            if index >= items.len() {
                return Err(VmError::Catchable(format!("index {index} out of range")));
            }
            items.remove(index);
            engine.reference_counter().remove_reference();
            Ok(())
        }
        StackItem::Map(body) => {
            let mut entries = body.borrow_mut();
            if let Some(index) = StackItem::map_find(&entries, &key, &limits)? {
                entries.remove(index);
                engine.reference_counter().remove_reference();
                engine.reference_counter().remove_reference();
            }
            Ok(())
        }
        other => Err(VmError::InvalidType(format!(
            "REMOVE cannot modify {:?}",
            other.item_type()
        ))),
    }
}

pub fn clear_items(engine: &mut ExecutionEngine) -> VmResult<()> {
    let collection = engine.pop()?;
    match &collection {
        StackItem::Array(body) | StackItem::Struct(body) => {
            let mut items = body.borrow_mut();
            for _ in 0..items.len() {
                engine.reference_counter().remove_reference();
            }
            items.clear();
            Ok(())
        }
        StackItem::Map(body) => {
            let mut entries = body.borrow_mut();
            for _ in 0..entries.len() * 2 {
                engine.reference_counter().remove_reference();
            }
            entries.clear();
            Ok(())
        }
        other => Err(VmError::InvalidType(format!(
            "CLEARITEMS cannot clear {:?}",
            other.item_type()
        ))),
    }
}

pub fn pop_item(engine: &mut ExecutionEngine) -> VmResult<()> {
    let collection = engine.pop()?;
    let (StackItem::Array(body) | StackItem::Struct(body)) = &collection else {
        return Err(VmError::InvalidType("POPITEM requires an array or struct".into()));
    };
    let item = body
        .borrow_mut()
        .pop()
        .ok_or_else(|| VmError::Catchable("cannot pop from an empty array".into()))?;
    engine.reference_counter().remove_reference();
    engine.push(item)
}

/// Shared with the type handlers: register edges for a compound created
/// outside this module.
pub(crate) fn register_created(engine: &ExecutionEngine, item: &StackItem) {
    register_new_edges(engine, item);
}
