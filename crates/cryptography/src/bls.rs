// Copyright (C) 2015-2025 The Neo Project.
//
// bls.rs file belongs to the neo project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! BLS12-381 operations backing the CryptoLib native contract.

use crate::{CryptoError, CryptoResult};
use bls12_381::{pairing, G1Affine, G1Projective, G2Affine, G2Projective, Gt, Scalar};

/// A point in one of the BLS12-381 groups.
///
/// Pairing results (`Gt`) exist only in memory; they have no compressed
/// wire encoding here and serializing one is an error the script sees.
#[derive(Debug, Clone, PartialEq)]
pub enum BlsPoint {
    G1(G1Affine),
    G2(G2Affine),
    Gt(Box<Gt>),
}

impl BlsPoint {
    /// Decodes a compressed point; 48 bytes selects G1, 96 selects G2.
    pub fn deserialize(data: &[u8]) -> CryptoResult<Self> {
        match data.len() {
            48 => {
                let bytes: [u8; 48] = data.try_into().expect("length checked");
                let point = G1Affine::from_compressed(&bytes);
                if point.is_some().into() {
                    Ok(BlsPoint::G1(point.unwrap()))
                } else {
                    Err(CryptoError::InvalidPoint("invalid G1 encoding".into()))
                }
            }
            96 => {
                let bytes: [u8; 96] = data.try_into().expect("length checked");
                let point = G2Affine::from_compressed(&bytes);
                if point.is_some().into() {
                    Ok(BlsPoint::G2(point.unwrap()))
                } else {
                    Err(CryptoError::InvalidPoint("invalid G2 encoding".into()))
                }
            }
            other => Err(CryptoError::InvalidPoint(format!(
                "unsupported bls point length {other}"
            ))),
        }
    }

    /// The compressed encoding. `Gt` values cannot be serialized.
    pub fn serialize(&self) -> CryptoResult<Vec<u8>> {
        match self {
            BlsPoint::G1(point) => Ok(point.to_compressed().to_vec()),
            BlsPoint::G2(point) => Ok(point.to_compressed().to_vec()),
            BlsPoint::Gt(_) => Err(CryptoError::Unsupported(
                "gt elements have no compressed encoding".into(),
            )),
        }
    }

    /// Group addition; both operands must live in the same group.
    pub fn add(&self, other: &BlsPoint) -> CryptoResult<BlsPoint> {
        match (self, other) {
            (BlsPoint::G1(a), BlsPoint::G1(b)) => {
                Ok(BlsPoint::G1((G1Projective::from(a) + b).into()))
            }
            (BlsPoint::G2(a), BlsPoint::G2(b)) => {
                Ok(BlsPoint::G2((G2Projective::from(a) + b).into()))
            }
            (BlsPoint::Gt(a), BlsPoint::Gt(b)) => Ok(BlsPoint::Gt(Box::new(**a + **b))),
            _ => Err(CryptoError::InvalidFormat(
                "bls add requires points of the same group".into(),
            )),
        }
    }

    /// Scalar multiplication by a 32-byte little-endian scalar, optionally
    /// negated first.
    pub fn mul(&self, scalar_le: &[u8], negate: bool) -> CryptoResult<BlsPoint> {
        let bytes: [u8; 32] = scalar_le
            .try_into()
            .map_err(|_| CryptoError::InvalidFormat("bls scalar must be 32 bytes".into()))?;
        let scalar = Scalar::from_bytes(&bytes);
        if bool::from(scalar.is_none()) {
            return Err(CryptoError::InvalidFormat("bls scalar out of range".into()));
        }
        let mut scalar = scalar.unwrap();
        if negate {
            scalar = -scalar;
        }
        match self {
            BlsPoint::G1(point) => Ok(BlsPoint::G1((G1Projective::from(point) * scalar).into())),
            BlsPoint::G2(point) => Ok(BlsPoint::G2((G2Projective::from(point) * scalar).into())),
            BlsPoint::Gt(value) => Ok(BlsPoint::Gt(Box::new(**value * scalar))),
        }
    }

    /// The pairing e(g1, g2).
    pub fn pairing(&self, other: &BlsPoint) -> CryptoResult<BlsPoint> {
        match (self, other) {
            (BlsPoint::G1(g1), BlsPoint::G2(g2)) => Ok(BlsPoint::Gt(Box::new(pairing(g1, g2)))),
            _ => Err(CryptoError::InvalidFormat(
                "pairing requires a G1 and a G2 point".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_roundtrip() {
        let g1 = BlsPoint::G1(G1Affine::generator());
        let bytes = g1.serialize().unwrap();
        assert_eq!(bytes.len(), 48);
        assert_eq!(BlsPoint::deserialize(&bytes).unwrap(), g1);

        let g2 = BlsPoint::G2(G2Affine::generator());
        let bytes = g2.serialize().unwrap();
        assert_eq!(bytes.len(), 96);
        assert_eq!(BlsPoint::deserialize(&bytes).unwrap(), g2);
    }

    #[test]
    fn test_pairing_bilinearity() {
        let g1 = BlsPoint::G1(G1Affine::generator());
        let g2 = BlsPoint::G2(G2Affine::generator());
        let mut two = [0u8; 32];
        two[0] = 2;

        // e(2·g1, g2) == e(g1, g2) + e(g1, g2) in additive Gt notation.
        let left = g1.mul(&two, false).unwrap().pairing(&g2).unwrap();
        let base = g1.pairing(&g2).unwrap();
        let right = base.add(&base).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_mismatched_groups_rejected() {
        let g1 = BlsPoint::G1(G1Affine::generator());
        let g2 = BlsPoint::G2(G2Affine::generator());
        assert!(g1.add(&g2).is_err());
        assert!(g2.pairing(&g1).is_err());
    }

    #[test]
    fn test_bad_encoding_rejected() {
        assert!(BlsPoint::deserialize(&[0u8; 47]).is_err());
        assert!(BlsPoint::deserialize(&[0xFFu8; 48]).is_err());
    }
}
