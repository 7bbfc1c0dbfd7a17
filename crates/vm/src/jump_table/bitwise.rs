//! Bitwise-logic handlers. Integers use two's-complement semantics at the
//! 32-byte width; byte runs convert through the same representation.

use crate::error::VmResult;
use crate::execution_engine::ExecutionEngine;
use crate::stack_item::{check_integer_width, StackItem};

pub fn invert(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = engine.pop()?.as_int()?;
    engine.push(StackItem::Integer(!value))
}

pub fn and(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = engine.pop()?.as_int()?;
    let left = engine.pop()?.as_int()?;
    let result = left & right;
    check_integer_width(&result)?;
    engine.push(StackItem::Integer(result))
}

pub fn or(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = engine.pop()?.as_int()?;
    let left = engine.pop()?.as_int()?;
    let result = left | right;
    check_integer_width(&result)?;
    engine.push(StackItem::Integer(result))
}

pub fn xor(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = engine.pop()?.as_int()?;
    let left = engine.pop()?.as_int()?;
    let result = left ^ right;
    check_integer_width(&result)?;
    engine.push(StackItem::Integer(result))
}

pub fn equal(engine: &mut ExecutionEngine, expected: bool) -> VmResult<()> {
    let right = engine.pop()?;
    let left = engine.pop()?;
    let limits = *engine.limits();
    let result = left.equals(&right, &limits)?;
    engine.push(StackItem::Boolean(result == expected))
}
