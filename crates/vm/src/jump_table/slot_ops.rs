//! Slot-access handlers.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::slot::Slot;

pub fn init_static_slot(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let count = instruction.token_u8()? as usize;
    if count == 0 {
        return Err(VmError::InvalidOperation("INITSSLOT of zero entries".into()));
    }
    let reference_counter = engine.reference_counter().clone();
    let context = engine
        .current_context()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    let mut statics = context.static_fields.borrow_mut();
    if statics.is_some() {
        return Err(VmError::InvalidOperation("statics already initialized".into()));
    }
    *statics = Some(Slot::new(count, reference_counter));
    Ok(())
}

pub fn init_slot(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let local_count = instruction.token_u8()? as usize;
    let argument_count = instruction.token_u8_at(1)? as usize;
    if local_count == 0 && argument_count == 0 {
        return Err(VmError::InvalidOperation("INITSLOT with no entries".into()));
    }
    {
        let context = engine
            .current_context()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        if context.local_variables.is_some() || context.arguments.is_some() {
            return Err(VmError::InvalidOperation("slots already initialized".into()));
        }
    }

    let reference_counter = engine.reference_counter().clone();
    let locals = if local_count > 0 {
        Some(Slot::new(local_count, reference_counter.clone()))
    } else {
        None
    };
    let arguments = if argument_count > 0 {
        let mut items = Vec::with_capacity(argument_count);
        for _ in 0..argument_count {
            items.push(engine.pop()?);
        }
        Some(Slot::with_items(items, reference_counter))
    } else {
        None
    };

    let context = engine
        .current_context_mut()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    context.local_variables = locals;
    context.arguments = arguments;
    Ok(())
}

pub fn load_static(engine: &mut ExecutionEngine, index: usize) -> VmResult<()> {
    let item = {
        let context = engine
            .current_context()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        let statics = context.static_fields.borrow();
        statics
            .as_ref()
            .ok_or_else(|| VmError::InvalidOperation("statics not initialized".into()))?
            .get(index)?
    };
    engine.push(item)
}

pub fn store_static(engine: &mut ExecutionEngine, index: usize) -> VmResult<()> {
    let item = engine.pop()?;
    let context = engine
        .current_context()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    let mut statics = context.static_fields.borrow_mut();
    statics
        .as_mut()
        .ok_or_else(|| VmError::InvalidOperation("statics not initialized".into()))?
        .set(index, item)
}

pub fn load_local(engine: &mut ExecutionEngine, index: usize) -> VmResult<()> {
    let item = {
        let context = engine
            .current_context()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        context
            .local_variables
            .as_ref()
            .ok_or_else(|| VmError::InvalidOperation("locals not initialized".into()))?
            .get(index)?
    };
    engine.push(item)
}

pub fn store_local(engine: &mut ExecutionEngine, index: usize) -> VmResult<()> {
    let item = engine.pop()?;
    let context = engine
        .current_context_mut()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    context
        .local_variables
        .as_mut()
        .ok_or_else(|| VmError::InvalidOperation("locals not initialized".into()))?
        .set(index, item)
}

pub fn load_argument(engine: &mut ExecutionEngine, index: usize) -> VmResult<()> {
    let item = {
        let context = engine
            .current_context()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        context
            .arguments
            .as_ref()
            .ok_or_else(|| VmError::InvalidOperation("arguments not initialized".into()))?
            .get(index)?
    };
    engine.push(item)
}

pub fn store_argument(engine: &mut ExecutionEngine, index: usize) -> VmResult<()> {
    let item = engine.pop()?;
    let context = engine
        .current_context_mut()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    context
        .arguments
        .as_mut()
        .ok_or_else(|| VmError::InvalidOperation("arguments not initialized".into()))?
        .set(index, item)
}
