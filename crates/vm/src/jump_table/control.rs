//! Flow-control handlers.

use crate::error::{VmError, VmResult};
use crate::exception_handling::{TryContext, TryState};
use crate::execution_engine::{ExecutionEngine, ExecutionHost};
use crate::instruction::Instruction;
use crate::op_code::OpCode;
use crate::stack_item::StackItem;
use std::cmp::Ordering;
use std::rc::Rc;

fn branch_offset(instruction: &Instruction) -> VmResult<i64> {
    match instruction.operand.len() {
        1 => Ok(i64::from(instruction.token_i8()?)),
        _ => Ok(i64::from(instruction.token_i32()?)),
    }
}

pub fn jmp(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    engine.branch_to(instruction, branch_offset(instruction)?)
}

pub fn jmp_if(
    engine: &mut ExecutionEngine,
    instruction: &Instruction,
    when: bool,
) -> VmResult<()> {
    let condition = engine.pop()?.as_bool()?;
    if condition == when {
        engine.branch_to(instruction, branch_offset(instruction)?)?;
    }
    Ok(())
}

/// The numeric conditional jumps: JMPEQ/NE/GT/GE/LT/LE.
pub fn jmp_compare(
    engine: &mut ExecutionEngine,
    instruction: &Instruction,
    ordering: Ordering,
    when: bool,
) -> VmResult<()> {
    let right = engine.pop()?.as_int()?;
    let left = engine.pop()?.as_int()?;
    if (left.cmp(&right) == ordering) == when {
        engine.branch_to(instruction, branch_offset(instruction)?)?;
    }
    Ok(())
}

pub fn call(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let context = engine
        .current_context()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    let target = context
        .script()
        .branch_target(instruction, branch_offset(instruction)?)?;
    let new_context = context.clone_for_call(target);
    engine.load_context(new_context)?;
    Ok(())
}

pub fn call_a(engine: &mut ExecutionEngine) -> VmResult<()> {
    let pointer = engine.pop()?;
    let StackItem::Pointer { script, position } = pointer else {
        return Err(VmError::InvalidType("CALLA requires a pointer".into()));
    };
    let context = engine
        .current_context()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    if !Rc::ptr_eq(&script, context.script()) {
        return Err(VmError::InvalidOperation(
            "CALLA pointer belongs to another script".into(),
        ));
    }
    let new_context = context.clone_for_call(position);
    engine.load_context(new_context)?;
    Ok(())
}

pub fn call_t(
    engine: &mut ExecutionEngine,
    host: &mut dyn ExecutionHost,
    instruction: &Instruction,
) -> VmResult<()> {
    let token = instruction.token_u16()?;
    host.on_call_token(engine, token)
}

pub fn abort(_engine: &mut ExecutionEngine, message: Option<String>) -> VmResult<()> {
    Err(VmError::Abort(
        message.unwrap_or_else(|| "ABORT executed".into()),
    ))
}

pub fn abort_msg(engine: &mut ExecutionEngine) -> VmResult<()> {
    let message = engine.pop()?.as_bytes()?;
    abort(engine, Some(String::from_utf8_lossy(&message).into_owned()))
}

pub fn assert(engine: &mut ExecutionEngine, message: Option<String>) -> VmResult<()> {
    if engine.pop()?.as_bool()? {
        Ok(())
    } else {
        Err(VmError::Abort(
            message.unwrap_or_else(|| "ASSERT failed".into()),
        ))
    }
}

pub fn assert_msg(engine: &mut ExecutionEngine) -> VmResult<()> {
    let message = engine.pop()?.as_bytes()?;
    assert(engine, Some(String::from_utf8_lossy(&message).into_owned()))
}

pub fn throw(engine: &mut ExecutionEngine) -> VmResult<()> {
    let exception = engine.pop()?;
    Err(VmError::Throw(exception))
}

pub fn try_op(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let (catch_offset, finally_offset) = if instruction.opcode == OpCode::TRY {
        (
            i64::from(instruction.token_i8()?),
            i64::from(instruction.token_i8_at(1)?),
        )
    } else {
        (
            i64::from(instruction.token_i32()?),
            i64::from(instruction.token_i32_at(4)?),
        )
    };
    let max_nesting = engine.limits().max_try_nesting_depth;
    let context = engine
        .current_context()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    if context.try_stack.len() >= max_nesting {
        return Err(VmError::LimitExceeded("try frames nested too deep".into()));
    }
    let catch_pointer = if catch_offset == 0 {
        None
    } else {
        Some(context.script().branch_target(instruction, catch_offset)?)
    };
    let finally_pointer = if finally_offset == 0 {
        None
    } else {
        Some(context.script().branch_target(instruction, finally_offset)?)
    };
    let context = engine
        .current_context_mut()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    context
        .try_stack
        .push(TryContext::new(catch_pointer, finally_pointer));
    Ok(())
}

pub fn end_try(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let relative = branch_offset(instruction)?;
    let context = engine
        .current_context()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    let target = context.script().branch_target(instruction, relative)?;

    let context = engine
        .current_context_mut()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    let frame = context
        .try_stack
        .last_mut()
        .ok_or_else(|| VmError::InvalidOperation("ENDTRY outside try".into()))?;
    if frame.state == TryState::Finally {
        return Err(VmError::InvalidOperation("ENDTRY inside finally".into()));
    }
    if let Some(finally_pointer) = frame.finally_pointer {
        frame.state = TryState::Finally;
        frame.end_pointer = target;
        context.set_instruction_pointer(finally_pointer)?;
    } else {
        context.try_stack.pop();
        context.set_instruction_pointer(target)?;
    }
    engine.is_jumping = true;
    Ok(())
}

pub fn syscall(
    engine: &mut ExecutionEngine,
    host: &mut dyn ExecutionHost,
    instruction: &Instruction,
) -> VmResult<()> {
    let hash = instruction.token_u32()?;
    host.on_syscall(engine, hash)
}
