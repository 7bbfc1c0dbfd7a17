// Copyright (C) 2015-2025 The Neo Project.
//
// gas.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Opcode gas prices, in base units scaled by the policy's
//! execution-fee factor.

use neo3_vm::OpCode;

/// Base price of one opcode.
pub fn opcode_price(opcode: OpCode) -> i64 {
    use OpCode::*;
    match opcode {
        PUSHINT8 | PUSHINT16 | PUSHINT32 | PUSHINT64 | PUSHINT128 | PUSHINT256 => 1,
        PUSHT | PUSHF | PUSHNULL => 1,
        PUSHA => 4,
        PUSHDATA1 => 8,
        PUSHDATA2 => 13,
        PUSHDATA4 => 110,
        PUSHM1 | PUSH0 | PUSH1 | PUSH2 | PUSH3 | PUSH4 | PUSH5 | PUSH6 | PUSH7 | PUSH8
        | PUSH9 | PUSH10 | PUSH11 | PUSH12 | PUSH13 | PUSH14 | PUSH15 | PUSH16 => 1,
        NOP => 1,
        JMP | JMP_L | JMPIF | JMPIF_L | JMPIFNOT | JMPIFNOT_L | JMPEQ | JMPEQ_L | JMPNE
        | JMPNE_L | JMPGT | JMPGT_L | JMPGE | JMPGE_L | JMPLT | JMPLT_L | JMPLE | JMPLE_L => 2,
        CALL | CALL_L | CALLA => 512,
        CALLT => 32_768,
        ABORT | ABORTMSG => 0,
        ASSERT | ASSERTMSG => 1,
        THROW => 512,
        TRY | TRY_L | ENDTRY | ENDTRY_L | ENDFINALLY => 4,
        RET => 0,
        SYSCALL => 0,
        DEPTH | DROP | NIP | DUP | OVER | PICK | TUCK | SWAP | ROT => 2,
        XDROP | CLEAR | ROLL | REVERSEN => 16,
        REVERSE3 | REVERSE4 => 2,
        INITSSLOT => 16,
        INITSLOT => 64,
        LDSFLD0 | LDSFLD1 | LDSFLD2 | LDSFLD3 | LDSFLD4 | LDSFLD5 | LDSFLD6 | LDSFLD
        | STSFLD0 | STSFLD1 | STSFLD2 | STSFLD3 | STSFLD4 | STSFLD5 | STSFLD6 | STSFLD
        | LDLOC0 | LDLOC1 | LDLOC2 | LDLOC3 | LDLOC4 | LDLOC5 | LDLOC6 | LDLOC | STLOC0
        | STLOC1 | STLOC2 | STLOC3 | STLOC4 | STLOC5 | STLOC6 | STLOC | LDARG0 | LDARG1
        | LDARG2 | LDARG3 | LDARG4 | LDARG5 | LDARG6 | LDARG | STARG0 | STARG1 | STARG2
        | STARG3 | STARG4 | STARG5 | STARG6 | STARG => 2,
        NEWBUFFER => 256,
        MEMCPY | CAT | SUBSTR | LEFT | RIGHT => 2_048,
        INVERT => 4,
        AND | OR | XOR => 8,
        EQUAL | NOTEQUAL => 32,
        SIGN | ABS | NEGATE | INC | DEC => 4,
        ADD | SUB | MUL => 8,
        DIV | MOD | MODMUL => 32,
        POW | SQRT => 64,
        MODPOW => 2_048,
        SHL | SHR => 8,
        NOT => 4,
        BOOLAND | BOOLOR => 8,
        NZ => 4,
        NUMEQUAL | NUMNOTEQUAL | LT | LE | GT | GE | MIN | MAX | WITHIN => 8,
        PACKMAP | PACKSTRUCT | PACK | UNPACK => 2_048,
        NEWARRAY0 | NEWSTRUCT0 => 16,
        NEWARRAY | NEWARRAY_T | NEWSTRUCT => 512,
        NEWMAP => 8,
        SIZE => 4,
        HASKEY | PICKITEM => 64,
        KEYS => 16,
        VALUES => 8_192,
        APPEND | SETITEM | REVERSEITEMS => 8_192,
        REMOVE | CLEARITEMS | POPITEM => 16,
        ISNULL | ISTYPE => 2,
        CONVERT => 8_192,
    }
}

/// Price charged per byte of a stored key/value by `Storage.Put`.
pub const STORAGE_PRICE_DEFAULT: u32 = 100_000;
/// Default execution fee factor applied to opcode and syscall prices.
pub const EXEC_FEE_FACTOR_DEFAULT: u32 = 30;
/// Base price of one signature check, scaled by the fee factor.
pub const CHECK_SIG_PRICE: i64 = 1 << 15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_opcodes() {
        assert_eq!(opcode_price(OpCode::RET), 0);
        assert_eq!(opcode_price(OpCode::SYSCALL), 0);
        assert_eq!(opcode_price(OpCode::ABORT), 0);
    }

    #[test]
    fn test_relative_costs() {
        assert!(opcode_price(OpCode::CONVERT) > opcode_price(OpCode::ADD));
        assert!(opcode_price(OpCode::CALLT) > opcode_price(OpCode::CALL));
    }
}
