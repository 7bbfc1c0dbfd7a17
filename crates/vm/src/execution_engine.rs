//! The execution engine: invocation stack, dispatch loop, exception
//! unwinding and limits enforcement.

use crate::error::{VmError, VmResult};
use crate::evaluation_stack::EvaluationStack;
use crate::exception_handling::TryState;
use crate::execution_context::ExecutionContext;
use crate::instruction::Instruction;
use crate::jump_table;
use crate::limits::ExecutionEngineLimits;
use crate::reference_counter::ReferenceCounter;
use crate::script::Script;
use crate::stack_item::StackItem;
use crate::vm_state::VMState;
use std::rc::Rc;

/// Host hooks supplied by the application engine.
///
/// The raw VM prices nothing and knows no syscalls; a host charges gas in
/// [`ExecutionHost::pre_execute`] and resolves `SYSCALL`/`CALLT` itself.
pub trait ExecutionHost {
    /// Called before each instruction; an error faults the engine
    /// uncatchably (gas exhaustion).
    fn pre_execute(
        &mut self,
        _engine: &ExecutionEngine,
        _instruction: &Instruction,
    ) -> VmResult<()> {
        Ok(())
    }

    /// Resolves `SYSCALL` with the 32-bit method hash.
    fn on_syscall(&mut self, _engine: &mut ExecutionEngine, hash: u32) -> VmResult<()> {
        Err(VmError::InvalidOperation(format!(
            "syscall 0x{hash:08x} has no host"
        )))
    }

    /// Resolves `CALLT` with the method-token index.
    fn on_call_token(&mut self, _engine: &mut ExecutionEngine, token: u16) -> VmResult<()> {
        Err(VmError::InvalidOperation(format!(
            "call token {token} has no host"
        )))
    }
}

/// The host used when running bare scripts (tests, debugger).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl ExecutionHost for NullHost {}

/// The virtual machine.
pub struct ExecutionEngine {
    state: VMState,
    limits: ExecutionEngineLimits,
    reference_counter: ReferenceCounter,
    invocation_stack: Vec<ExecutionContext>,
    result_stack: EvaluationStack,
    uncaught_exception: Option<StackItem>,
    fault_reason: Option<VmError>,
    /// Set by handlers that changed the instruction pointer themselves.
    pub(crate) is_jumping: bool,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(ExecutionEngineLimits::default())
    }
}

impl ExecutionEngine {
    pub fn new(limits: ExecutionEngineLimits) -> Self {
        let reference_counter = ReferenceCounter::new();
        Self {
            state: VMState::NONE,
            limits,
            reference_counter: reference_counter.clone(),
            invocation_stack: Vec::new(),
            result_stack: EvaluationStack::new(reference_counter),
            uncaught_exception: None,
            fault_reason: None,
            is_jumping: false,
        }
    }

    pub fn state(&self) -> VMState {
        self.state
    }

    pub fn limits(&self) -> &ExecutionEngineLimits {
        &self.limits
    }

    pub fn reference_counter(&self) -> &ReferenceCounter {
        &self.reference_counter
    }

    /// The error that faulted the engine, when one did.
    pub fn fault_reason(&self) -> Option<&VmError> {
        self.fault_reason.as_ref()
    }

    /// The exception that was never caught, when the fault came from one.
    pub fn uncaught_exception(&self) -> Option<&StackItem> {
        self.uncaught_exception.as_ref()
    }

    pub fn invocation_stack(&self) -> &[ExecutionContext] {
        &self.invocation_stack
    }

    pub fn current_context(&self) -> Option<&ExecutionContext> {
        self.invocation_stack.last()
    }

    pub fn current_context_mut(&mut self) -> Option<&mut ExecutionContext> {
        self.invocation_stack.last_mut()
    }

    /// The first loaded context (the transaction entry script).
    pub fn entry_context(&self) -> Option<&ExecutionContext> {
        self.invocation_stack.first()
    }

    /// Items left for the caller after `HALT`, bottom to top.
    pub fn result_stack(&self) -> &EvaluationStack {
        &self.result_stack
    }

    pub fn result_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.result_stack
    }

    /// Validates and loads a script as a fresh context.
    pub fn load_script(&mut self, script: Script, rvcount: i32) -> VmResult<()> {
        let context = ExecutionContext::new(
            Rc::new(script),
            rvcount,
            self.reference_counter.clone(),
        );
        self.load_context(context)
    }

    /// Pushes a prepared context onto the invocation stack.
    pub fn load_context(&mut self, context: ExecutionContext) -> VmResult<()> {
        if self.invocation_stack.len() >= self.limits.max_invocation_stack_size {
            return Err(VmError::LimitExceeded("invocation stack overflow".into()));
        }
        self.invocation_stack.push(context);
        Ok(())
    }

    /// Pops the current context, transferring return values.
    pub(crate) fn unload_context(&mut self) -> VmResult<()> {
        let context = self
            .invocation_stack
            .pop()
            .ok_or(VmError::StackUnderflow)?;
        let stack = Rc::clone(&context.evaluation_stack);
        let stack_len = stack.borrow().len();
        if context.rvcount >= 0 && stack_len != context.rvcount as usize {
            return Err(VmError::InvalidOperation(format!(
                "context returned {stack_len} items, declared {}",
                context.rvcount
            )));
        }
        match self.invocation_stack.last() {
            Some(parent) => {
                if !Rc::ptr_eq(&stack, &parent.evaluation_stack) {
                    let parent_stack = Rc::clone(&parent.evaluation_stack);
                    let mut target = parent_stack.borrow_mut();
                    stack.borrow_mut().drain_to(&mut target);
                }
            }
            None => {
                stack.borrow_mut().drain_to(&mut self.result_stack);
                self.state = VMState::HALT;
            }
        }
        self.is_jumping = true;
        Ok(())
    }

    /// Pushes onto the current context's evaluation stack.
    pub fn push(&mut self, item: StackItem) -> VmResult<()> {
        let context = self
            .current_context()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        context.evaluation_stack.borrow_mut().push(item);
        Ok(())
    }

    /// Pops from the current context's evaluation stack.
    pub fn pop(&mut self) -> VmResult<StackItem> {
        let context = self
            .current_context()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        let item = context.evaluation_stack.borrow_mut().pop()?;
        Ok(item)
    }

    /// Peeks `depth` entries below the top of the current stack.
    pub fn peek(&self, depth: usize) -> VmResult<StackItem> {
        let context = self
            .current_context()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        let item = context.evaluation_stack.borrow().peek(depth)?;
        Ok(item)
    }

    /// Redirects the instruction pointer through a branch operand.
    pub(crate) fn branch_to(
        &mut self,
        instruction: &Instruction,
        relative: i64,
    ) -> VmResult<()> {
        let context = self
            .current_context()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        let target = context.script().branch_target(instruction, relative)?;
        let context = self
            .current_context_mut()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        context.set_instruction_pointer(target)?;
        self.is_jumping = true;
        Ok(())
    }

    /// Runs until the engine halts or faults.
    pub fn execute(&mut self, host: &mut dyn ExecutionHost) -> VMState {
        if self.state == VMState::BREAK {
            self.state = VMState::NONE;
        }
        while self.state == VMState::NONE {
            self.execute_next(host);
        }
        self.state
    }

    /// Executes one instruction and pauses (debugger mode).
    pub fn step(&mut self, host: &mut dyn ExecutionHost) -> VMState {
        if self.state == VMState::BREAK {
            self.state = VMState::NONE;
        }
        if self.state == VMState::NONE {
            self.execute_next(host);
        }
        if self.state == VMState::NONE {
            self.state = VMState::BREAK;
        }
        self.state
    }

    fn execute_next(&mut self, host: &mut dyn ExecutionHost) {
        let Some(context) = self.current_context() else {
            self.state = VMState::HALT;
            return;
        };
        let instruction = context.current_instruction();
        // The context that issued this instruction; a call pushes a new
        // frame on top of it, and it is this frame that advances.
        let context_index = self.invocation_stack.len() - 1;

        if let Err(error) = host.pre_execute(self, &instruction) {
            self.fault(error);
            return;
        }

        self.is_jumping = false;
        match jump_table::dispatch(self, host, &instruction) {
            Ok(()) => {
                if self.reference_counter.count() > self.limits.max_stack_size
                    && self.reference_counter.check_zero_referred() > self.limits.max_stack_size
                {
                    self.fault(VmError::LimitExceeded(format!(
                        "stack items exceed {}",
                        self.limits.max_stack_size
                    )));
                    return;
                }
                if self.state == VMState::NONE && !self.is_jumping {
                    if let Some(context) = self.invocation_stack.get_mut(context_index) {
                        context.move_next();
                    }
                }
            }
            Err(error) => {
                if error.is_catchable() && self.limits.catch_engine_exceptions {
                    self.execute_throw(error.into_exception_item());
                } else {
                    self.fault(error);
                }
            }
        }
    }

    /// Raises `exception` through the script's try frames; faults when
    /// nothing catches it.
    pub fn execute_throw(&mut self, exception: StackItem) {
        self.uncaught_exception = Some(exception);
        self.handle_exception();
    }

    fn handle_exception(&mut self) {
        enum Action {
            PopFrame,
            EnterCatch(usize),
            EnterFinally(usize),
            NextContext,
        }

        for index in (0..self.invocation_stack.len()).rev() {
            loop {
                let action = {
                    let context = &self.invocation_stack[index];
                    match context.try_stack.last() {
                        None => Action::NextContext,
                        Some(frame) if frame.state == TryState::Finally => Action::PopFrame,
                        Some(frame) if frame.state == TryState::Try && frame.has_catch() => {
                            match frame.catch_pointer {
                                Some(pointer) => Action::EnterCatch(pointer),
                                None => Action::PopFrame,
                            }
                        }
                        Some(frame) if frame.has_finally() => match frame.finally_pointer {
                            Some(pointer) => Action::EnterFinally(pointer),
                            None => Action::PopFrame,
                        },
                        Some(_) => Action::PopFrame,
                    }
                };
                match action {
                    Action::NextContext => break,
                    Action::PopFrame => {
                        self.invocation_stack[index].try_stack.pop();
                    }
                    Action::EnterCatch(pointer) => {
                        if let Some(frame) = self.invocation_stack[index].try_stack.last_mut() {
                            frame.state = TryState::Catch;
                        }
                        self.invocation_stack.truncate(index + 1);
                        let exception =
                            self.uncaught_exception.take().unwrap_or(StackItem::Null);
                        if let Some(context) = self.invocation_stack.last_mut() {
                            context.evaluation_stack.borrow_mut().push(exception);
                            if context.set_instruction_pointer(pointer).is_err() {
                                self.state = VMState::FAULT;
                                return;
                            }
                        }
                        self.is_jumping = true;
                        return;
                    }
                    Action::EnterFinally(pointer) => {
                        if let Some(frame) = self.invocation_stack[index].try_stack.last_mut() {
                            frame.state = TryState::Finally;
                        }
                        self.invocation_stack.truncate(index + 1);
                        if let Some(context) = self.invocation_stack.last_mut() {
                            if context.set_instruction_pointer(pointer).is_err() {
                                self.state = VMState::FAULT;
                                return;
                            }
                        }
                        // The exception stays pending until ENDFINALLY.
                        self.is_jumping = true;
                        return;
                    }
                }
            }
        }
        self.state = VMState::FAULT;
    }

    /// Re-raises a pending exception after a finally block, or resumes at
    /// the recorded end pointer.
    pub(crate) fn end_finally(&mut self) -> VmResult<()> {
        let context = self
            .current_context_mut()
            .ok_or(VmError::InvalidOperation("no execution context".into()))?;
        let frame = context
            .try_stack
            .pop()
            .ok_or_else(|| VmError::InvalidOperation("ENDFINALLY outside try".into()))?;
        if self.uncaught_exception.is_some() {
            self.handle_exception();
        } else {
            let context = self
                .current_context_mut()
                .ok_or(VmError::InvalidOperation("no execution context".into()))?;
            context.set_instruction_pointer(frame.end_pointer)?;
            self.is_jumping = true;
        }
        Ok(())
    }

    /// Stops the engine with a fault.
    pub fn fault(&mut self, error: VmError) {
        if self.fault_reason.is_none() {
            self.fault_reason = Some(error);
        }
        self.state = VMState::FAULT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(bytes: Vec<u8>) -> (VMState, Vec<StackItem>) {
        let mut engine = ExecutionEngine::default();
        let script = Script::new(bytes).expect("script validates");
        engine.load_script(script, -1).unwrap();
        let state = engine.execute(&mut NullHost);
        let items = engine.result_stack().items().to_vec();
        (state, items)
    }

    #[test]
    fn test_arithmetic_add() {
        // PUSH2 PUSH3 ADD.
        let (state, items) = run(vec![0x12, 0x13, 0x9E]);
        assert_eq!(state, VMState::HALT);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_int().unwrap(), 5.into());
    }

    #[test]
    fn test_conditional_jump_skips_branch() {
        // PUSH1, JMPIF +3 (to offset 5), PUSH2, RET, PUSH3.
        let (state, items) = run(vec![0x11, 0x26, 0x03, 0x12, 0x40, 0x13]);
        assert_eq!(state, VMState::HALT);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_int().unwrap(), 3.into());
    }

    #[test]
    fn test_invalid_script_fails_on_load() {
        let mut engine = ExecutionEngine::default();
        assert!(Script::new(vec![0x22, 0x7F]).is_err());
        // A valid empty script halts immediately with no results.
        engine.load_script(Script::new(vec![]).unwrap(), -1).unwrap();
        assert_eq!(engine.execute(&mut NullHost), VMState::HALT);
    }

    #[test]
    fn test_abort_faults() {
        let (state, _) = run(vec![0x38]);
        assert_eq!(state, VMState::FAULT);
    }

    #[test]
    fn test_throw_without_handler_faults() {
        // PUSH1 THROW.
        let (state, _) = run(vec![0x11, 0x3A]);
        assert_eq!(state, VMState::FAULT);
    }

    #[test]
    fn test_try_catch_handles_throw() {
        // offsets: 0:TRY 3:PUSH1 4:THROW 5:PUSH5 6:RET
        // TRY catch rel +4 targets the PUSH5 at offset 5; no finally.
        let (state, items) = run(vec![0x3B, 0x04, 0x00, 0x11, 0x3A, 0x15, 0x40]);
        assert_eq!(state, VMState::HALT);
        assert_eq!(items.len(), 2);
        // The caught exception item (integer 1) stays on the stack below
        // the PUSH5 result.
        assert_eq!(items[0].as_int().unwrap(), 1.into());
        assert_eq!(items[1].as_int().unwrap(), 5.into());
    }

    #[test]
    fn test_finally_runs_on_endtry() {
        // offsets: 0:TRY 3:PUSH1 4:ENDTRY 6:PUSH2 7:ENDFINALLY 8:PUSH3
        // TRY finally rel +5 targets 6; ENDTRY rel +3 targets 8.
        let (state, items) = run(vec![0x3B, 0x00, 0x05, 0x11, 0x3D, 0x03, 0x12, 0x3F, 0x13]);
        assert_eq!(state, VMState::HALT);
        let values: Vec<i64> = items
            .iter()
            .map(|i| i64::try_from(i.as_int().unwrap()).unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
