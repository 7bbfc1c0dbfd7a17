//! Arithmetic handlers. Every result is validated against the 32-byte
//! integer width; division truncates toward zero and modulo follows the
//! sign of the dividend.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::stack_item::{check_integer_width, StackItem};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

fn push_checked(engine: &mut ExecutionEngine, value: BigInt) -> VmResult<()> {
    check_integer_width(&value)?;
    engine.push(StackItem::Integer(value))
}

fn pop_int(engine: &mut ExecutionEngine) -> VmResult<BigInt> {
    engine.pop()?.as_int()
}

pub fn sign(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_int(engine)?;
    let sign = match value.sign() {
        num_bigint::Sign::Minus => -1,
        num_bigint::Sign::NoSign => 0,
        num_bigint::Sign::Plus => 1,
    };
    engine.push(StackItem::from_int(sign))
}

pub fn abs(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_int(engine)?;
    push_checked(engine, value.abs())
}

pub fn negate(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_int(engine)?;
    push_checked(engine, -value)
}

pub fn increment(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_int(engine)?;
    push_checked(engine, value + 1)
}

pub fn decrement(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_int(engine)?;
    push_checked(engine, value - 1)
}

pub fn add(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    push_checked(engine, left + right)
}

pub fn sub(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    push_checked(engine, left - right)
}

pub fn mul(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    push_checked(engine, left * right)
}

pub fn div(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    if right.is_zero() {
        return Err(VmError::InvalidOperation("division by zero".into()));
    }
    push_checked(engine, left / right)
}

pub fn modulo(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    if right.is_zero() {
        return Err(VmError::InvalidOperation("modulo by zero".into()));
    }
    push_checked(engine, left % right)
}

pub fn pow(engine: &mut ExecutionEngine) -> VmResult<()> {
    let exponent = pop_int(engine)?;
    let base = pop_int(engine)?;
    let exponent = exponent
        .to_u32()
        .ok_or_else(|| VmError::InvalidOperation("invalid exponent".into()))?;
    push_checked(engine, num_traits::Pow::pow(base, exponent))
}

pub fn sqrt(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_int(engine)?;
    if value.is_negative() {
        return Err(VmError::InvalidOperation("square root of a negative".into()));
    }
    push_checked(engine, value.sqrt())
}

pub fn mod_mul(engine: &mut ExecutionEngine) -> VmResult<()> {
    let modulus = pop_int(engine)?;
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    if modulus.is_zero() {
        return Err(VmError::InvalidOperation("modulo by zero".into()));
    }
    push_checked(engine, left * right % modulus)
}

pub fn mod_pow(engine: &mut ExecutionEngine) -> VmResult<()> {
    let modulus = pop_int(engine)?;
    let exponent = pop_int(engine)?;
    let base = pop_int(engine)?;
    if modulus.is_zero() {
        return Err(VmError::InvalidOperation("modulo by zero".into()));
    }
    // Exponent -1 asks for the modular inverse; other negatives fail.
    let result = if exponent == BigInt::from(-1) {
        mod_inverse(&base, &modulus)
            .ok_or_else(|| VmError::InvalidOperation("no modular inverse".into()))?
    } else if exponent.is_negative() {
        return Err(VmError::InvalidOperation("negative exponent".into()));
    } else {
        base.modpow(&exponent, &modulus)
    };
    push_checked(engine, result)
}

/// Extended Euclid over a positive modulus.
fn mod_inverse(value: &BigInt, modulus: &BigInt) -> Option<BigInt> {
    let modulus = modulus.abs();
    let mut old_r = value % &modulus;
    if old_r.is_negative() {
        old_r += &modulus;
    }
    let mut r = modulus.clone();
    let (mut old_s, mut s) = (BigInt::from(1), BigInt::zero());
    while !r.is_zero() {
        let quotient = &old_r / &r;
        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }
    if old_r != BigInt::from(1) {
        return None;
    }
    let mut inverse = old_s % &modulus;
    if inverse.is_negative() {
        inverse += &modulus;
    }
    Some(inverse)
}

pub fn shl(engine: &mut ExecutionEngine) -> VmResult<()> {
    let shift = pop_int(engine)?;
    let value = pop_int(engine)?;
    let shift = check_shift(engine, &shift)?;
    if shift == 0 {
        return push_checked(engine, value);
    }
    push_checked(engine, value << shift)
}

pub fn shr(engine: &mut ExecutionEngine) -> VmResult<()> {
    let shift = pop_int(engine)?;
    let value = pop_int(engine)?;
    let shift = check_shift(engine, &shift)?;
    if shift == 0 {
        return push_checked(engine, value);
    }
    push_checked(engine, value >> shift)
}

fn check_shift(engine: &ExecutionEngine, shift: &BigInt) -> VmResult<u32> {
    let shift = shift
        .to_u32()
        .ok_or_else(|| VmError::InvalidOperation("invalid shift count".into()))?;
    if shift > engine.limits().max_shift {
        return Err(VmError::InvalidOperation(format!(
            "shift of {shift} exceeds the limit"
        )));
    }
    Ok(shift)
}

pub fn not(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = engine.pop()?.as_bool()?;
    engine.push(StackItem::Boolean(!value))
}

pub fn bool_and(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = engine.pop()?.as_bool()?;
    let left = engine.pop()?.as_bool()?;
    engine.push(StackItem::Boolean(left && right))
}

pub fn bool_or(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = engine.pop()?.as_bool()?;
    let left = engine.pop()?.as_bool()?;
    engine.push(StackItem::Boolean(left || right))
}

pub fn nz(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_int(engine)?;
    engine.push(StackItem::Boolean(!value.is_zero()))
}

pub fn num_equal(engine: &mut ExecutionEngine, expected: bool) -> VmResult<()> {
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    engine.push(StackItem::Boolean((left == right) == expected))
}

/// LT/LE/GT/GE: `when` selects whether the ordering matching `ordering`
/// (or, for the *-or-equal forms, its negation) yields true.
pub fn compare(engine: &mut ExecutionEngine, ordering: Ordering, when: bool) -> VmResult<()> {
    let right = engine.pop()?;
    let left = engine.pop()?;
    // A null operand makes every ordered comparison false.
    if left.is_null() || right.is_null() {
        return engine.push(StackItem::Boolean(false));
    }
    let result = (left.as_int()?.cmp(&right.as_int()?) == ordering) == when;
    engine.push(StackItem::Boolean(result))
}

pub fn min(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    push_checked(engine, left.min(right))
}

pub fn max(engine: &mut ExecutionEngine) -> VmResult<()> {
    let right = pop_int(engine)?;
    let left = pop_int(engine)?;
    push_checked(engine, left.max(right))
}

pub fn within(engine: &mut ExecutionEngine) -> VmResult<()> {
    let upper = pop_int(engine)?;
    let lower = pop_int(engine)?;
    let value = pop_int(engine)?;
    engine.push(StackItem::Boolean(lower <= value && value < upper))
}
