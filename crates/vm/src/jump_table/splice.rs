//! Splice handlers over byte runs.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::stack_item::StackItem;

fn check_item_size(engine: &ExecutionEngine, length: usize) -> VmResult<()> {
    if length > engine.limits().max_item_size {
        return Err(VmError::LimitExceeded(format!(
            "item of {length} bytes exceeds the size limit"
        )));
    }
    Ok(())
}

pub fn new_buffer(engine: &mut ExecutionEngine) -> VmResult<()> {
    let length = engine.pop()?.as_index()?;
    check_item_size(engine, length)?;
    engine.push(StackItem::from_buffer(vec![0u8; length]))
}

pub fn memcpy(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = engine.pop()?.as_index()?;
    let source_index = engine.pop()?.as_index()?;
    let source = engine.pop()?.as_bytes()?;
    let destination_index = engine.pop()?.as_index()?;
    let destination = engine.pop()?;

    let StackItem::Buffer(buffer) = destination else {
        return Err(VmError::InvalidType("MEMCPY destination must be a buffer".into()));
    };
    if source_index.checked_add(count).map_or(true, |end| end > source.len()) {
        return Err(VmError::InvalidOperation("MEMCPY source out of range".into()));
    }
    let mut destination = buffer.borrow_mut();
    if destination_index
        .checked_add(count)
        .map_or(true, |end| end > destination.len())
    {
        return Err(VmError::InvalidOperation("MEMCPY destination out of range".into()));
    }
    destination[destination_index..destination_index + count]
        .copy_from_slice(&source[source_index..source_index + count]);
    Ok(())
}

pub fn cat(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = engine.pop()?.as_bytes()?;
    let mut left = engine.pop()?.as_bytes()?;
    check_item_size(engine, left.len() + right.len())?;
    left.extend_from_slice(&right);
    engine.push(StackItem::from_buffer(left))
}

pub fn substr(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = engine.pop()?.as_index()?;
    let index = engine.pop()?.as_index()?;
    let source = engine.pop()?.as_bytes()?;
    if index.checked_add(count).map_or(true, |end| end > source.len()) {
        return Err(VmError::InvalidOperation("SUBSTR range out of bounds".into()));
    }
    engine.push(StackItem::from_buffer(source[index..index + count].to_vec()))
}

pub fn left(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = engine.pop()?.as_index()?;
    let source = engine.pop()?.as_bytes()?;
    if count > source.len() {
        return Err(VmError::InvalidOperation("LEFT count out of bounds".into()));
    }
    engine.push(StackItem::from_buffer(source[..count].to_vec()))
}

pub fn right(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = engine.pop()?.as_index()?;
    let source = engine.pop()?.as_bytes()?;
    if count > source.len() {
        return Err(VmError::InvalidOperation("RIGHT count out of bounds".into()));
    }
    engine.push(StackItem::from_buffer(source[source.len() - count..].to_vec()))
}
