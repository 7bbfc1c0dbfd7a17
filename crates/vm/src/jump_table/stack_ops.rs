//! Stack-manipulation handlers.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::stack_item::StackItem;

fn with_stack<T>(
    engine: &mut ExecutionEngine,
    f: impl FnOnce(&mut crate::evaluation_stack::EvaluationStack) -> VmResult<T>,
) -> VmResult<T> {
    let context = engine
        .current_context()
        .ok_or(VmError::InvalidOperation("no execution context".into()))?;
    let stack = std::rc::Rc::clone(&context.evaluation_stack);
    let mut stack = stack.borrow_mut();
    f(&mut stack)
}

pub fn depth(engine: &mut ExecutionEngine) -> VmResult<()> {
    let len = with_stack(engine, |stack| Ok(stack.len()))?;
    engine.push(StackItem::from_int(len as i64))
}

pub fn drop_top(engine: &mut ExecutionEngine) -> VmResult<()> {
    engine.pop().map(|_| ())
}

pub fn nip(engine: &mut ExecutionEngine) -> VmResult<()> {
    with_stack(engine, |stack| stack.remove(1).map(|_| ()))
}

pub fn xdrop(engine: &mut ExecutionEngine) -> VmResult<()> {
    let index = engine.pop()?.as_index()?;
    with_stack(engine, |stack| stack.remove(index).map(|_| ()))
}

pub fn clear(engine: &mut ExecutionEngine) -> VmResult<()> {
    with_stack(engine, |stack| {
        stack.clear();
        Ok(())
    })
}

pub fn dup(engine: &mut ExecutionEngine) -> VmResult<()> {
    let top = engine.peek(0)?;
    engine.push(top)
}

pub fn over(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.peek(1)?;
    engine.push(item)
}

pub fn pick(engine: &mut ExecutionEngine) -> VmResult<()> {
    let index = engine.pop()?.as_index()?;
    let item = engine.peek(index)?;
    engine.push(item)
}

pub fn tuck(engine: &mut ExecutionEngine) -> VmResult<()> {
    let top = engine.peek(0)?;
    with_stack(engine, |stack| stack.insert(2, top))
}

pub fn swap(engine: &mut ExecutionEngine) -> VmResult<()> {
    with_stack(engine, |stack| {
        let item = stack.remove(1)?;
        stack.push(item);
        Ok(())
    })
}

pub fn rot(engine: &mut ExecutionEngine) -> VmResult<()> {
    with_stack(engine, |stack| {
        let item = stack.remove(2)?;
        stack.push(item);
        Ok(())
    })
}

pub fn roll(engine: &mut ExecutionEngine) -> VmResult<()> {
    let index = engine.pop()?.as_index()?;
    if index == 0 {
        return Ok(());
    }
    with_stack(engine, |stack| {
        let item = stack.remove(index)?;
        stack.push(item);
        Ok(())
    })
}

pub fn reverse(engine: &mut ExecutionEngine, count: usize) -> VmResult<()> {
    with_stack(engine, |stack| stack.reverse(count))
}

pub fn reverse_n(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = engine.pop()?.as_index()?;
    with_stack(engine, |stack| stack.reverse(count))
}
