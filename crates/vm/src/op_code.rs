//! The opcode table: one byte per instruction, with operand encodings.

/// How an opcode's immediate operand is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperandEncoding {
    /// Length-prefix width (0, 1, 2 or 4 bytes); the prefix value gives
    /// the number of data bytes that follow.
    pub prefix: usize,
    /// Fixed operand width when there is no prefix.
    pub size: usize,
}

const fn fixed(size: usize) -> OperandEncoding {
    OperandEncoding { prefix: 0, size }
}

const fn prefixed(prefix: usize) -> OperandEncoding {
    OperandEncoding { prefix, size: 0 }
}

const NONE: OperandEncoding = fixed(0);

macro_rules! define_op_codes {
    ($($name:ident = $value:literal, $operand:expr;)*) => {
        /// The VM instruction set.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum OpCode {
            $($name = $value,)*
        }

        impl OpCode {
            /// Decodes an opcode byte.
            pub fn from_byte(byte: u8) -> Option<OpCode> {
                match byte {
                    $($value => Some(OpCode::$name),)*
                    _ => None,
                }
            }

            /// The operand layout of this opcode.
            pub fn operand_encoding(self) -> OperandEncoding {
                match self {
                    $(OpCode::$name => $operand,)*
                }
            }
        }
    };
}

define_op_codes! {
    // Push family
    PUSHINT8 = 0x00, fixed(1);
    PUSHINT16 = 0x01, fixed(2);
    PUSHINT32 = 0x02, fixed(4);
    PUSHINT64 = 0x03, fixed(8);
    PUSHINT128 = 0x04, fixed(16);
    PUSHINT256 = 0x05, fixed(32);
    PUSHT = 0x08, NONE;
    PUSHF = 0x09, NONE;
    PUSHA = 0x0A, fixed(4);
    PUSHNULL = 0x0B, NONE;
    PUSHDATA1 = 0x0C, prefixed(1);
    PUSHDATA2 = 0x0D, prefixed(2);
    PUSHDATA4 = 0x0E, prefixed(4);
    PUSHM1 = 0x0F, NONE;
    PUSH0 = 0x10, NONE;
    PUSH1 = 0x11, NONE;
    PUSH2 = 0x12, NONE;
    PUSH3 = 0x13, NONE;
    PUSH4 = 0x14, NONE;
    PUSH5 = 0x15, NONE;
    PUSH6 = 0x16, NONE;
    PUSH7 = 0x17, NONE;
    PUSH8 = 0x18, NONE;
    PUSH9 = 0x19, NONE;
    PUSH10 = 0x1A, NONE;
    PUSH11 = 0x1B, NONE;
    PUSH12 = 0x1C, NONE;
    PUSH13 = 0x1D, NONE;
    PUSH14 = 0x1E, NONE;
    PUSH15 = 0x1F, NONE;
    PUSH16 = 0x20, NONE;

    // Flow control
    NOP = 0x21, NONE;
    JMP = 0x22, fixed(1);
    JMP_L = 0x23, fixed(4);
    JMPIFNOT = 0x24, fixed(1);
    JMPIFNOT_L = 0x25, fixed(4);
    JMPIF = 0x26, fixed(1);
    JMPIF_L = 0x27, fixed(4);
    JMPEQ = 0x28, fixed(1);
    JMPEQ_L = 0x29, fixed(4);
    JMPNE = 0x2A, fixed(1);
    JMPNE_L = 0x2B, fixed(4);
    JMPGT = 0x2C, fixed(1);
    JMPGT_L = 0x2D, fixed(4);
    JMPGE = 0x2E, fixed(1);
    JMPGE_L = 0x2F, fixed(4);
    JMPLT = 0x30, fixed(1);
    JMPLT_L = 0x31, fixed(4);
    JMPLE = 0x32, fixed(1);
    JMPLE_L = 0x33, fixed(4);
    CALL = 0x34, fixed(1);
    CALL_L = 0x35, fixed(4);
    CALLA = 0x36, NONE;
    CALLT = 0x37, fixed(2);
    ABORT = 0x38, NONE;
    ASSERT = 0x39, NONE;
    THROW = 0x3A, NONE;
    TRY = 0x3B, fixed(2);
    TRY_L = 0x3C, fixed(8);
    ENDTRY = 0x3D, fixed(1);
    ENDTRY_L = 0x3E, fixed(4);
    ENDFINALLY = 0x3F, NONE;
    RET = 0x40, NONE;
    SYSCALL = 0x41, fixed(4);

    // Stack manipulation
    DEPTH = 0x43, NONE;
    DROP = 0x45, NONE;
    NIP = 0x46, NONE;
    XDROP = 0x48, NONE;
    CLEAR = 0x49, NONE;
    DUP = 0x4A, NONE;
    OVER = 0x4B, NONE;
    PICK = 0x4D, NONE;
    TUCK = 0x4E, NONE;
    SWAP = 0x50, NONE;
    ROT = 0x51, NONE;
    ROLL = 0x52, NONE;
    REVERSE3 = 0x53, NONE;
    REVERSE4 = 0x54, NONE;
    REVERSEN = 0x55, NONE;

    // Slot access
    INITSSLOT = 0x56, fixed(1);
    INITSLOT = 0x57, fixed(2);
    LDSFLD0 = 0x58, NONE;
    LDSFLD1 = 0x59, NONE;
    LDSFLD2 = 0x5A, NONE;
    LDSFLD3 = 0x5B, NONE;
    LDSFLD4 = 0x5C, NONE;
    LDSFLD5 = 0x5D, NONE;
    LDSFLD6 = 0x5E, NONE;
    LDSFLD = 0x5F, fixed(1);
    STSFLD0 = 0x60, NONE;
    STSFLD1 = 0x61, NONE;
    STSFLD2 = 0x62, NONE;
    STSFLD3 = 0x63, NONE;
    STSFLD4 = 0x64, NONE;
    STSFLD5 = 0x65, NONE;
    STSFLD6 = 0x66, NONE;
    STSFLD = 0x67, fixed(1);
    LDLOC0 = 0x68, NONE;
    LDLOC1 = 0x69, NONE;
    LDLOC2 = 0x6A, NONE;
    LDLOC3 = 0x6B, NONE;
    LDLOC4 = 0x6C, NONE;
    LDLOC5 = 0x6D, NONE;
    LDLOC6 = 0x6E, NONE;
    LDLOC = 0x6F, fixed(1);
    STLOC0 = 0x70, NONE;
    STLOC1 = 0x71, NONE;
    STLOC2 = 0x72, NONE;
    STLOC3 = 0x73, NONE;
    STLOC4 = 0x74, NONE;
    STLOC5 = 0x75, NONE;
    STLOC6 = 0x76, NONE;
    STLOC = 0x77, fixed(1);
    LDARG0 = 0x78, NONE;
    LDARG1 = 0x79, NONE;
    LDARG2 = 0x7A, NONE;
    LDARG3 = 0x7B, NONE;
    LDARG4 = 0x7C, NONE;
    LDARG5 = 0x7D, NONE;
    LDARG6 = 0x7E, NONE;
    LDARG = 0x7F, fixed(1);
    STARG0 = 0x80, NONE;
    STARG1 = 0x81, NONE;
    STARG2 = 0x82, NONE;
    STARG3 = 0x83, NONE;
    STARG4 = 0x84, NONE;
    STARG5 = 0x85, NONE;
    STARG6 = 0x86, NONE;
    STARG = 0x87, fixed(1);

    // Splice
    NEWBUFFER = 0x88, NONE;
    MEMCPY = 0x89, NONE;
    CAT = 0x8B, NONE;
    SUBSTR = 0x8C, NONE;
    LEFT = 0x8D, NONE;
    RIGHT = 0x8E, NONE;

    // Bitwise logic
    INVERT = 0x90, NONE;
    AND = 0x91, NONE;
    OR = 0x92, NONE;
    XOR = 0x93, NONE;
    EQUAL = 0x97, NONE;
    NOTEQUAL = 0x98, NONE;

    // Arithmetic
    SIGN = 0x99, NONE;
    ABS = 0x9A, NONE;
    NEGATE = 0x9B, NONE;
    INC = 0x9C, NONE;
    DEC = 0x9D, NONE;
    ADD = 0x9E, NONE;
    SUB = 0x9F, NONE;
    MUL = 0xA0, NONE;
    DIV = 0xA1, NONE;
    MOD = 0xA2, NONE;
    POW = 0xA3, NONE;
    SQRT = 0xA4, NONE;
    MODMUL = 0xA5, NONE;
    MODPOW = 0xA6, NONE;
    SHL = 0xA8, NONE;
    SHR = 0xA9, NONE;
    NOT = 0xAA, NONE;
    BOOLAND = 0xAB, NONE;
    BOOLOR = 0xAC, NONE;
    NZ = 0xB1, NONE;
    NUMEQUAL = 0xB3, NONE;
    NUMNOTEQUAL = 0xB4, NONE;
    LT = 0xB5, NONE;
    LE = 0xB6, NONE;
    GT = 0xB7, NONE;
    GE = 0xB8, NONE;
    MIN = 0xB9, NONE;
    MAX = 0xBA, NONE;
    WITHIN = 0xBB, NONE;

    // Compound types
    PACKMAP = 0xBE, NONE;
    PACKSTRUCT = 0xBF, NONE;
    PACK = 0xC0, NONE;
    UNPACK = 0xC1, NONE;
    NEWARRAY0 = 0xC2, NONE;
    NEWARRAY = 0xC3, NONE;
    NEWARRAY_T = 0xC4, fixed(1);
    NEWSTRUCT0 = 0xC5, NONE;
    NEWSTRUCT = 0xC6, NONE;
    NEWMAP = 0xC8, NONE;
    SIZE = 0xCA, NONE;
    HASKEY = 0xCB, NONE;
    KEYS = 0xCC, NONE;
    VALUES = 0xCD, NONE;
    PICKITEM = 0xCE, NONE;
    APPEND = 0xCF, NONE;
    SETITEM = 0xD0, NONE;
    REVERSEITEMS = 0xD1, NONE;
    REMOVE = 0xD2, NONE;
    CLEARITEMS = 0xD3, NONE;
    POPITEM = 0xD4, NONE;

    // Types
    ISNULL = 0xD8, NONE;
    ISTYPE = 0xD9, fixed(1);
    CONVERT = 0xDB, fixed(1);

    // Extensions
    ABORTMSG = 0xE0, NONE;
    ASSERTMSG = 0xE1, NONE;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte_roundtrip() {
        assert_eq!(OpCode::from_byte(0x9E), Some(OpCode::ADD));
        assert_eq!(OpCode::from_byte(0x26), Some(OpCode::JMPIF));
        assert_eq!(OpCode::from_byte(0x40), Some(OpCode::RET));
        assert_eq!(OpCode::from_byte(0x42), None);
        assert_eq!(OpCode::from_byte(0xFF), None);
    }

    #[test]
    fn test_operand_encodings() {
        assert_eq!(OpCode::PUSHINT256.operand_encoding(), fixed(32));
        assert_eq!(OpCode::PUSHDATA2.operand_encoding(), prefixed(2));
        assert_eq!(OpCode::TRY_L.operand_encoding(), fixed(8));
        assert_eq!(OpCode::ADD.operand_encoding(), NONE);
        assert_eq!(OpCode::SYSCALL.operand_encoding(), fixed(4));
    }
}
