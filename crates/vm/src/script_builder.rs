//! Helper for building scripts programmatically: the node uses it for
//! verification scripts, native-contract hashes and test fixtures.

use crate::error::VmResult;
use crate::op_code::OpCode;
use crate::script::Script;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

/// Accumulates opcodes and operands into a script.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length of the script under construction.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Emits a bare opcode.
    pub fn emit(&mut self, opcode: OpCode) -> &mut Self {
        self.bytes.push(opcode as u8);
        self
    }

    /// Emits an opcode with a raw operand.
    pub fn emit_with(&mut self, opcode: OpCode, operand: &[u8]) -> &mut Self {
        self.bytes.push(opcode as u8);
        self.bytes.extend_from_slice(operand);
        self
    }

    /// Emits the shortest push for an integer.
    pub fn emit_push_int(&mut self, value: &BigInt) -> &mut Self {
        if let Some(small) = value.to_i64() {
            if (-1..=16).contains(&small) {
                let opcode = if small == -1 {
                    OpCode::PUSHM1 as u8
                } else {
                    OpCode::PUSH0 as u8 + small as u8
                };
                self.bytes.push(opcode);
                return self;
            }
        }
        let mut bytes = if value.is_zero() {
            vec![0u8]
        } else {
            value.to_signed_bytes_le()
        };
        let (opcode, width) = match bytes.len() {
            1 => (OpCode::PUSHINT8, 1),
            2 => (OpCode::PUSHINT16, 2),
            3..=4 => (OpCode::PUSHINT32, 4),
            5..=8 => (OpCode::PUSHINT64, 8),
            9..=16 => (OpCode::PUSHINT128, 16),
            17..=32 => (OpCode::PUSHINT256, 32),
            _ => (OpCode::PUSHINT256, 32),
        };
        let fill = if value.is_negative() { 0xFF } else { 0x00 };
        bytes.resize(width, fill);
        self.emit_with(opcode, &bytes)
    }

    /// Emits an i64 push.
    pub fn emit_push_i64(&mut self, value: i64) -> &mut Self {
        self.emit_push_int(&BigInt::from(value))
    }

    /// Emits a boolean push.
    pub fn emit_push_bool(&mut self, value: bool) -> &mut Self {
        self.emit(if value { OpCode::PUSHT } else { OpCode::PUSHF })
    }

    /// Emits a data push with the smallest length prefix.
    pub fn emit_push_bytes(&mut self, data: &[u8]) -> &mut Self {
        if data.len() <= u8::MAX as usize {
            self.bytes.push(OpCode::PUSHDATA1 as u8);
            self.bytes.push(data.len() as u8);
        } else if data.len() <= u16::MAX as usize {
            self.bytes.push(OpCode::PUSHDATA2 as u8);
            self.bytes.extend_from_slice(&(data.len() as u16).to_le_bytes());
        } else {
            self.bytes.push(OpCode::PUSHDATA4 as u8);
            self.bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        }
        self.bytes.extend_from_slice(data);
        self
    }

    /// Emits a UTF-8 string push.
    pub fn emit_push_string(&mut self, value: &str) -> &mut Self {
        self.emit_push_bytes(value.as_bytes())
    }

    /// Emits PUSHNULL.
    pub fn emit_push_null(&mut self) -> &mut Self {
        self.emit(OpCode::PUSHNULL)
    }

    /// Emits a SYSCALL with the 32-bit method id.
    pub fn emit_syscall(&mut self, hash: u32) -> &mut Self {
        self.bytes.push(OpCode::SYSCALL as u8);
        self.bytes.extend_from_slice(&hash.to_le_bytes());
        self
    }

    /// The raw script bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Validates and returns the finished script.
    pub fn into_script(self) -> VmResult<Script> {
        Script::new(self.bytes)
    }

    /// Validation failure mapped for callers that expect byte output.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_engine::{ExecutionEngine, NullHost};
    use crate::vm_state::VMState;

    #[test]
    fn test_small_int_uses_constant_opcodes() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_i64(5);
        assert_eq!(builder.to_bytes(), vec![OpCode::PUSH5 as u8]);
        let mut builder = ScriptBuilder::new();
        builder.emit_push_i64(-1);
        assert_eq!(builder.to_bytes(), vec![OpCode::PUSHM1 as u8]);
    }

    #[test]
    fn test_wide_int_uses_pushint() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_i64(300);
        assert_eq!(builder.to_bytes(), vec![OpCode::PUSHINT16 as u8, 0x2C, 0x01]);
    }

    #[test]
    fn test_built_script_executes() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_i64(20).emit_push_i64(22).emit(OpCode::ADD);
        let script = builder.into_script().unwrap();
        let mut engine = ExecutionEngine::default();
        engine.load_script(script, -1).unwrap();
        assert_eq!(engine.execute(&mut NullHost), VMState::HALT);
        assert_eq!(
            engine.result_stack().items()[0].as_int().unwrap(),
            42.into()
        );
    }

    #[test]
    fn test_push_bytes_prefix_widths() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_bytes(&[0xAB; 3]);
        assert_eq!(builder.to_bytes()[..2], [OpCode::PUSHDATA1 as u8, 3]);

        let mut builder = ScriptBuilder::new();
        builder.emit_push_bytes(&vec![0u8; 300]);
        assert_eq!(builder.to_bytes()[0], OpCode::PUSHDATA2 as u8);
    }
}
