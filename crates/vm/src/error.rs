//! VM error types.

use crate::stack_item::StackItem;
use thiserror::Error;

/// Errors raised while executing a script.
///
/// `Throw` and `Catchable` unwind through the script's try/catch frames;
/// everything else faults the engine directly.
#[derive(Error, Debug, Clone)]
pub enum VmError {
    /// An item raised by the THROW opcode; script-visible.
    #[error("exception thrown by script")]
    Throw(StackItem),

    /// A host or engine failure the script's catch handlers may observe.
    #[error("catchable: {0}")]
    Catchable(String),

    /// The script bytes failed validation on load.
    #[error("bad script: {0}")]
    BadScript(String),

    /// An undefined opcode was encountered.
    #[error("invalid opcode 0x{0:02x}")]
    InvalidOpcode(u8),

    /// An operation was applied to an item of the wrong type.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// An operation violated its preconditions.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A pop or peek ran past the bottom of a stack.
    #[error("stack underflow")]
    StackUnderflow,

    /// An execution limit was exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// The gas budget ran out (raised by the host's pre-execute hook).
    #[error("insufficient gas")]
    OutOfGas,

    /// ABORT (or ABORTMSG) was executed.
    #[error("abort: {0}")]
    Abort(String),
}

impl VmError {
    /// Whether the script's try/catch frames may handle this error.
    pub fn is_catchable(&self) -> bool {
        matches!(self, VmError::Throw(_) | VmError::Catchable(_))
    }

    /// The stack item a catch handler receives.
    pub fn into_exception_item(self) -> StackItem {
        match self {
            VmError::Throw(item) => item,
            VmError::Catchable(message) => StackItem::from_byte_string(message.into_bytes()),
            other => StackItem::from_byte_string(other.to_string().into_bytes()),
        }
    }
}

/// Result type for VM operations.
pub type VmResult<T> = Result<T, VmError>;
