//! Type-inspection handlers.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::stack_item::{StackItem, StackItemType};

pub fn is_null(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.pop()?;
    engine.push(StackItem::Boolean(item.is_null()))
}

pub fn is_type(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let type_byte = instruction.token_u8()?;
    let target = StackItemType::from_byte(type_byte)
        .ok_or(VmError::InvalidOpcode(type_byte))?;
    if target == StackItemType::Any {
        return Err(VmError::InvalidOperation("ISTYPE cannot test Any".into()));
    }
    let item = engine.pop()?;
    engine.push(StackItem::Boolean(item.item_type() == target))
}

pub fn convert(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let type_byte = instruction.token_u8()?;
    let target = StackItemType::from_byte(type_byte)
        .ok_or(VmError::InvalidOpcode(type_byte))?;
    let item = engine.pop()?;
    let limits = *engine.limits();
    let converted = item.convert_to(target, &limits)?;
    if converted.item_type().is_compound() {
        super::compound::register_created(engine, &converted);
    }
    engine.push(converted)
}
