//! The opcode handlers, grouped by family.
//!
//! [`dispatch`] routes one decoded instruction to its handler. Handlers
//! never advance the instruction pointer; the engine does that unless a
//! handler jumped.

pub mod bitwise;
pub mod compound;
pub mod control;
pub mod numeric;
pub mod push;
pub mod slot_ops;
pub mod splice;
pub mod stack_ops;
pub mod types;

use crate::error::VmResult;
use crate::execution_engine::{ExecutionEngine, ExecutionHost};
use crate::instruction::Instruction;
use crate::op_code::OpCode;

/// Executes `instruction` against `engine`.
pub fn dispatch(
    engine: &mut ExecutionEngine,
    host: &mut dyn ExecutionHost,
    instruction: &Instruction,
) -> VmResult<()> {
    use OpCode::*;
    match instruction.opcode {
        // Push family
        PUSHINT8 | PUSHINT16 | PUSHINT32 | PUSHINT64 | PUSHINT128 | PUSHINT256 => {
            push::push_int(engine, instruction)
        }
        PUSHT => push::push_bool(engine, true),
        PUSHF => push::push_bool(engine, false),
        PUSHA => push::push_address(engine, instruction),
        PUSHNULL => push::push_null(engine),
        PUSHDATA1 | PUSHDATA2 | PUSHDATA4 => push::push_data(engine, instruction),
        PUSHM1 | PUSH0 | PUSH1 | PUSH2 | PUSH3 | PUSH4 | PUSH5 | PUSH6 | PUSH7 | PUSH8
        | PUSH9 | PUSH10 | PUSH11 | PUSH12 | PUSH13 | PUSH14 | PUSH15 | PUSH16 => {
            push::push_constant(engine, instruction)
        }

        // Flow control
        NOP => Ok(()),
        JMP | JMP_L => control::jmp(engine, instruction),
        JMPIF | JMPIF_L => control::jmp_if(engine, instruction, true),
        JMPIFNOT | JMPIFNOT_L => control::jmp_if(engine, instruction, false),
        JMPEQ | JMPEQ_L => control::jmp_compare(engine, instruction, std::cmp::Ordering::Equal, true),
        JMPNE | JMPNE_L => control::jmp_compare(engine, instruction, std::cmp::Ordering::Equal, false),
        JMPGT | JMPGT_L => control::jmp_compare(engine, instruction, std::cmp::Ordering::Greater, true),
        JMPLE | JMPLE_L => control::jmp_compare(engine, instruction, std::cmp::Ordering::Greater, false),
        JMPLT | JMPLT_L => control::jmp_compare(engine, instruction, std::cmp::Ordering::Less, true),
        JMPGE | JMPGE_L => control::jmp_compare(engine, instruction, std::cmp::Ordering::Less, false),
        CALL | CALL_L => control::call(engine, instruction),
        CALLA => control::call_a(engine),
        CALLT => control::call_t(engine, host, instruction),
        ABORT => control::abort(engine, None),
        ABORTMSG => control::abort_msg(engine),
        ASSERT => control::assert(engine, None),
        ASSERTMSG => control::assert_msg(engine),
        THROW => control::throw(engine),
        TRY | TRY_L => control::try_op(engine, instruction),
        ENDTRY | ENDTRY_L => control::end_try(engine, instruction),
        ENDFINALLY => engine.end_finally(),
        RET => engine.unload_context(),
        SYSCALL => control::syscall(engine, host, instruction),

        // Stack manipulation
        DEPTH => stack_ops::depth(engine),
        DROP => stack_ops::drop_top(engine),
        NIP => stack_ops::nip(engine),
        XDROP => stack_ops::xdrop(engine),
        CLEAR => stack_ops::clear(engine),
        DUP => stack_ops::dup(engine),
        OVER => stack_ops::over(engine),
        PICK => stack_ops::pick(engine),
        TUCK => stack_ops::tuck(engine),
        SWAP => stack_ops::swap(engine),
        ROT => stack_ops::rot(engine),
        ROLL => stack_ops::roll(engine),
        REVERSE3 => stack_ops::reverse(engine, 3),
        REVERSE4 => stack_ops::reverse(engine, 4),
        REVERSEN => stack_ops::reverse_n(engine),

        // Slots
        INITSSLOT => slot_ops::init_static_slot(engine, instruction),
        INITSLOT => slot_ops::init_slot(engine, instruction),
        LDSFLD0 | LDSFLD1 | LDSFLD2 | LDSFLD3 | LDSFLD4 | LDSFLD5 | LDSFLD6 => {
            slot_ops::load_static(engine, (instruction.opcode as u8 - LDSFLD0 as u8) as usize)
        }
        LDSFLD => slot_ops::load_static(engine, instruction.token_u8()? as usize),
        STSFLD0 | STSFLD1 | STSFLD2 | STSFLD3 | STSFLD4 | STSFLD5 | STSFLD6 => {
            slot_ops::store_static(engine, (instruction.opcode as u8 - STSFLD0 as u8) as usize)
        }
        STSFLD => slot_ops::store_static(engine, instruction.token_u8()? as usize),
        LDLOC0 | LDLOC1 | LDLOC2 | LDLOC3 | LDLOC4 | LDLOC5 | LDLOC6 => {
            slot_ops::load_local(engine, (instruction.opcode as u8 - LDLOC0 as u8) as usize)
        }
        LDLOC => slot_ops::load_local(engine, instruction.token_u8()? as usize),
        STLOC0 | STLOC1 | STLOC2 | STLOC3 | STLOC4 | STLOC5 | STLOC6 => {
            slot_ops::store_local(engine, (instruction.opcode as u8 - STLOC0 as u8) as usize)
        }
        STLOC => slot_ops::store_local(engine, instruction.token_u8()? as usize),
        LDARG0 | LDARG1 | LDARG2 | LDARG3 | LDARG4 | LDARG5 | LDARG6 => {
            slot_ops::load_argument(engine, (instruction.opcode as u8 - LDARG0 as u8) as usize)
        }
        LDARG => slot_ops::load_argument(engine, instruction.token_u8()? as usize),
        STARG0 | STARG1 | STARG2 | STARG3 | STARG4 | STARG5 | STARG6 => {
            slot_ops::store_argument(engine, (instruction.opcode as u8 - STARG0 as u8) as usize)
        }
        STARG => slot_ops::store_argument(engine, instruction.token_u8()? as usize),

        // Splice
        NEWBUFFER => splice::new_buffer(engine),
        MEMCPY => splice::memcpy(engine),
        CAT => splice::cat(engine),
        SUBSTR => splice::substr(engine),
        LEFT => splice::left(engine),
        RIGHT => splice::right(engine),

        // Bitwise
        INVERT => bitwise::invert(engine),
        AND => bitwise::and(engine),
        OR => bitwise::or(engine),
        XOR => bitwise::xor(engine),
        EQUAL => bitwise::equal(engine, true),
        NOTEQUAL => bitwise::equal(engine, false),

        // Arithmetic
        SIGN => numeric::sign(engine),
        ABS => numeric::abs(engine),
        NEGATE => numeric::negate(engine),
        INC => numeric::increment(engine),
        DEC => numeric::decrement(engine),
        ADD => numeric::add(engine),
        SUB => numeric::sub(engine),
        MUL => numeric::mul(engine),
        DIV => numeric::div(engine),
        MOD => numeric::modulo(engine),
        POW => numeric::pow(engine),
        SQRT => numeric::sqrt(engine),
        MODMUL => numeric::mod_mul(engine),
        MODPOW => numeric::mod_pow(engine),
        SHL => numeric::shl(engine),
        SHR => numeric::shr(engine),
        NOT => numeric::not(engine),
        BOOLAND => numeric::bool_and(engine),
        BOOLOR => numeric::bool_or(engine),
        NZ => numeric::nz(engine),
        NUMEQUAL => numeric::num_equal(engine, true),
        NUMNOTEQUAL => numeric::num_equal(engine, false),
        LT => numeric::compare(engine, std::cmp::Ordering::Less, true),
        LE => numeric::compare(engine, std::cmp::Ordering::Greater, false),
        GT => numeric::compare(engine, std::cmp::Ordering::Greater, true),
        GE => numeric::compare(engine, std::cmp::Ordering::Less, false),
        MIN => numeric::min(engine),
        MAX => numeric::max(engine),
        WITHIN => numeric::within(engine),

        // Compound types
        PACKMAP => compound::pack_map(engine),
        PACKSTRUCT => compound::pack_struct(engine),
        PACK => compound::pack(engine),
        UNPACK => compound::unpack(engine),
        NEWARRAY0 => compound::new_array(engine, Some(0)),
        NEWARRAY | NEWARRAY_T => compound::new_array(engine, None),
        NEWSTRUCT0 => compound::new_struct(engine, Some(0)),
        NEWSTRUCT => compound::new_struct(engine, None),
        NEWMAP => compound::new_map(engine),
        SIZE => compound::size(engine),
        HASKEY => compound::has_key(engine),
        KEYS => compound::keys(engine),
        VALUES => compound::values(engine),
        PICKITEM => compound::pick_item(engine),
        APPEND => compound::append(engine),
        SETITEM => compound::set_item(engine),
        REVERSEITEMS => compound::reverse_items(engine),
        REMOVE => compound::remove(engine),
        CLEARITEMS => compound::clear_items(engine),
        POPITEM => compound::pop_item(engine),

        // Types
        ISNULL => types::is_null(engine),
        ISTYPE => types::is_type(engine, instruction),
        CONVERT => types::convert(engine, instruction),
    }
}
