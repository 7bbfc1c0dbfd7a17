//! Execution context frames.

use crate::call_flags::CallFlags;
use crate::error::{VmError, VmResult};
use crate::evaluation_stack::EvaluationStack;
use crate::exception_handling::TryContext;
use crate::instruction::Instruction;
use crate::op_code::OpCode;
use crate::reference_counter::ReferenceCounter;
use crate::script::Script;
use crate::slot::Slot;
use std::cell::RefCell;
use std::rc::Rc;

/// Host-visible state attached to a context: the identity of the loaded
/// contract and the permissions it runs with.
#[derive(Debug, Clone)]
pub struct ContextState {
    /// Script hash of the loaded contract (little-endian bytes).
    pub script_hash: [u8; 20],
    /// Script hash of the calling contract, when any.
    pub calling_script_hash: Option<[u8; 20]>,
    /// Permissions granted to this context.
    pub call_flags: CallFlags,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            script_hash: [0u8; 20],
            calling_script_hash: None,
            call_flags: CallFlags::ALL,
        }
    }
}

/// One frame of the invocation stack.
#[derive(Debug)]
pub struct ExecutionContext {
    script: Rc<Script>,
    instruction_pointer: usize,
    /// Items handed back to the caller on unload; -1 means all.
    pub rvcount: i32,
    /// Shared with sibling frames created by `CALL`.
    pub evaluation_stack: Rc<RefCell<EvaluationStack>>,
    /// Shared with every frame of the same script load.
    pub static_fields: Rc<RefCell<Option<Slot>>>,
    pub local_variables: Option<Slot>,
    pub arguments: Option<Slot>,
    pub try_stack: Vec<TryContext>,
    pub state: ContextState,
}

impl ExecutionContext {
    /// A fresh frame over `script` with its own evaluation stack.
    pub fn new(script: Rc<Script>, rvcount: i32, reference_counter: ReferenceCounter) -> Self {
        Self {
            script,
            instruction_pointer: 0,
            rvcount,
            evaluation_stack: Rc::new(RefCell::new(EvaluationStack::new(reference_counter))),
            static_fields: Rc::new(RefCell::new(None)),
            local_variables: None,
            arguments: None,
            try_stack: Vec::new(),
            state: ContextState::default(),
        }
    }

    /// A sibling frame for `CALL`: same script, shared evaluation stack
    /// and statics, fresh position and try stack.
    pub fn clone_for_call(&self, position: usize) -> Self {
        Self {
            script: Rc::clone(&self.script),
            instruction_pointer: position,
            rvcount: -1,
            evaluation_stack: Rc::clone(&self.evaluation_stack),
            static_fields: Rc::clone(&self.static_fields),
            local_variables: None,
            arguments: None,
            try_stack: Vec::new(),
            state: self.state.clone(),
        }
    }

    pub fn script(&self) -> &Rc<Script> {
        &self.script
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    /// Moves the instruction pointer to a validated boundary.
    pub fn set_instruction_pointer(&mut self, position: usize) -> VmResult<()> {
        if !self.script.is_boundary(position) {
            return Err(VmError::InvalidOperation(format!(
                "jump to non-boundary offset {position}"
            )));
        }
        self.instruction_pointer = position;
        Ok(())
    }

    /// The instruction at the pointer. Past the end of the script this
    /// synthesizes RET, so falling off the end returns cleanly.
    pub fn current_instruction(&self) -> Instruction {
        match self.script.instruction_at(self.instruction_pointer) {
            Some(instruction) => instruction.clone(),
            None => {
                // Falling off the end behaves as RET.
                let mut ret = Instruction::decode(&[OpCode::RET as u8], 0)
                    .expect("RET always decodes");
                ret.offset = self.instruction_pointer;
                ret
            }
        }
    }

    /// Advances past the current instruction.
    pub fn move_next(&mut self) {
        let instruction = self.current_instruction();
        self.instruction_pointer = instruction.next_offset();
    }
}
