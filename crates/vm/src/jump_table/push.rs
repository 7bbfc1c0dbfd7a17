//! Push-family handlers.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::op_code::OpCode;
use crate::stack_item::StackItem;
use std::rc::Rc;

pub fn push_int(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    engine.push(StackItem::Integer(instruction.token_integer()?))
}

pub fn push_bool(engine: &mut ExecutionEngine, value: bool) -> VmResult<()> {
    engine.push(StackItem::Boolean(value))
}

pub fn push_null(engine: &mut ExecutionEngine) -> VmResult<()> {
    engine.push(StackItem::Null)
}

pub fn push_data(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let data = instruction.operand.clone();
    if data.len() > engine.limits().max_item_size {
        return Err(VmError::LimitExceeded(format!(
            "pushed data of {} bytes exceeds the item size limit",
            data.len()
        )));
    }
    engine.push(StackItem::from_byte_string(data))
}

/// PUSHM1 and PUSH0..PUSH16.
pub fn push_constant(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let value: i32 = if instruction.opcode == OpCode::PUSHM1 {
        -1
    } else {
        i32::from(instruction.opcode as u8) - i32::from(OpCode::PUSH0 as u8)
    };
    engine.push(StackItem::from_int(value))
}

/// PUSHA: a pointer into the current script.
pub fn push_address(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let context = engine
        .current_context()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    let target = context
        .script()
        .branch_target(instruction, i64::from(instruction.token_i32()?))?;
    let script = Rc::clone(context.script());
    engine.push(StackItem::pointer(script, target))
}
