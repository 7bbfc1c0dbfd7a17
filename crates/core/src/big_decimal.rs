// Copyright (C) 2015-2025 The Neo Project.
//
// big_decimal.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Fixed-precision decimal built on an arbitrary-precision integer.
//!
//! Token amounts are integers scaled by the token's decimal count; this
//! type carries the raw value together with its scale so display and
//! parsing stay exact.

use crate::{CoreError, CoreResult};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::fmt;

/// An exact decimal: `value × 10^-decimals`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigDecimal {
    value: BigInt,
    decimals: u8,
}

impl BigDecimal {
    /// Creates a decimal from a raw scaled value.
    pub fn new(value: BigInt, decimals: u8) -> Self {
        Self { value, decimals }
    }

    /// The raw scaled value.
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    /// The scale (number of fractional digits).
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Sign of the value: -1, 0 or 1.
    pub fn sign(&self) -> i8 {
        if self.value.is_negative() {
            -1
        } else if self.value.is_zero() {
            0
        } else {
            1
        }
    }

    /// Rescales to `decimals` fractional digits.
    ///
    /// Fails when reducing the scale would discard non-zero digits.
    pub fn change_decimals(&self, decimals: u8) -> CoreResult<Self> {
        if decimals == self.decimals {
            return Ok(self.clone());
        }
        if decimals > self.decimals {
            let factor = BigInt::from(10u32).pow(u32::from(decimals - self.decimals));
            return Ok(Self::new(&self.value * factor, decimals));
        }
        let factor = BigInt::from(10u32).pow(u32::from(self.decimals - decimals));
        let (quotient, remainder) = (&self.value / &factor, &self.value % &factor);
        if !remainder.is_zero() {
            return Err(CoreError::InvalidOperation(
                "cannot reduce decimals without losing precision".into(),
            ));
        }
        Ok(Self::new(quotient, decimals))
    }

    /// Parses a decimal string (optionally with a fractional part and an
    /// `e` exponent) at the given scale.
    pub fn parse(s: &str, decimals: u8) -> CoreResult<Self> {
        let invalid = || CoreError::InvalidFormat(format!("invalid decimal: {s}"));

        let (mantissa_str, exponent) = match s.split_once(['e', 'E']) {
            Some((m, e)) => (m, e.parse::<i32>().map_err(|_| invalid())?),
            None => (s, 0i32),
        };
        let (integral, fraction) = match mantissa_str.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa_str, ""),
        };
        if integral.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let digits: String = format!("{integral}{fraction}");
        let value: BigInt = digits.parse().map_err(|_| invalid())?;
        let scale = exponent - fraction.len() as i32 + i32::from(decimals);
        if scale < 0 {
            return Err(invalid());
        }
        let factor = BigInt::from(10u32).pow(scale as u32);
        Ok(Self::new(value * factor, decimals))
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let divisor = BigInt::from(10u32).pow(u32::from(self.decimals));
        let (int_part, frac_part) = (&self.value / &divisor, &self.value % &divisor);
        if frac_part.is_zero() {
            return write!(f, "{int_part}");
        }
        let frac_abs = frac_part.abs().to_string();
        let padded = format!("{:0>width$}", frac_abs, width = self.decimals as usize);
        let trimmed = padded.trim_end_matches('0');
        let sign = if self.value.is_negative() && int_part.is_zero() {
            "-"
        } else {
            ""
        };
        write!(f, "{sign}{int_part}.{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(BigDecimal::new(BigInt::from(150_000_000), 8).to_string(), "1.5");
        assert_eq!(BigDecimal::new(BigInt::from(100_000_000), 8).to_string(), "1");
        assert_eq!(BigDecimal::new(BigInt::from(-5_000_000), 8).to_string(), "-0.05");
    }

    #[test]
    fn test_parse() {
        let parsed = BigDecimal::parse("1.5", 8).unwrap();
        assert_eq!(parsed.value(), &BigInt::from(150_000_000));
        let exponent = BigDecimal::parse("1e3", 0).unwrap();
        assert_eq!(exponent.value(), &BigInt::from(1000));
        assert!(BigDecimal::parse("1.123456789", 8).is_err());
        assert!(BigDecimal::parse("abc", 8).is_err());
    }

    #[test]
    fn test_change_decimals() {
        let value = BigDecimal::new(BigInt::from(100), 2);
        assert_eq!(value.change_decimals(4).unwrap().value(), &BigInt::from(10_000));
        assert_eq!(value.change_decimals(0).unwrap().value(), &BigInt::from(1));
        let odd = BigDecimal::new(BigInt::from(105), 2);
        assert!(odd.change_decimals(0).is_err());
    }
}
